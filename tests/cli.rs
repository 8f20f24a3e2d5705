use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use hero_assets::ManifestEntry;
use image::{Rgba, RgbaImage};

fn run(bin: &str, root: &Path, extra: &[&str]) -> Output {
    Command::new(bin)
        .arg("--root")
        .arg(root)
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_scene(root: &Path) {
    let scene = RgbaImage::from_fn(40, 40, |x, y| {
        if (10..30).contains(&x) && (5..25).contains(&y) { Rgba([230, 20, 20, 255]) } else { Rgba([20, 30, 210, 255]) }
    });
    fs::create_dir_all(root.join("assets")).unwrap();
    scene.save(root.join("assets/hero.png")).unwrap();
    fs::write(root.join("two.json"), r#"{ "cluster": { "clusters": 2 } }"#).unwrap();
}

#[test]
fn test_missing_input_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();
    let out = run(env!("CARGO_BIN_EXE_hero-elements"), dir.path(), &[]);

    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    let expected = dir.path().join("assets/hero.png");
    assert!(stderr.contains(&expected.display().to_string()), "stderr: {stderr}");
    assert!(!dir.path().join("public").exists());
}

#[test]
fn test_undecodable_input_exits_with_code_1() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("assets")).unwrap();
    fs::write(dir.path().join("assets/hero.png"), b"not a png").unwrap();

    let out = run(env!("CARGO_BIN_EXE_hero-layers"), dir.path(), &[]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("hero.png"), "stderr: {stderr}");
}

#[test]
fn test_elements_manifest_lists_written_files() {
    let dir = tempfile::tempdir().unwrap();
    write_scene(dir.path());

    let out = run(env!("CARGO_BIN_EXE_hero-elements"), dir.path(), &["-c", "two.json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let out_dir = dir.path().join("public/hero");
    let text = fs::read_to_string(out_dir.join("hero_elements.json")).unwrap();
    let entries: Vec<ManifestEntry> = serde_json::from_str(&text).unwrap();
    assert_eq!(entries.len(), 2);
    for (idx, entry) in entries.iter().enumerate() {
        assert_eq!(entry.file, format!("hero_element_{idx}.png"));
        assert!(out_dir.join(&entry.file).is_file());
    }
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("hero_elements.json"));
}

#[test]
fn test_layers_without_manifest_flag_writes_only_pngs() {
    let dir = tempfile::tempdir().unwrap();
    write_scene(dir.path());

    let out = run(env!("CARGO_BIN_EXE_hero-layers"), dir.path(), &["-c", "two.json"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let out_dir = dir.path().join("public/hero");
    assert!(out_dir.join("hero_layer_0.png").is_file());
    assert!(out_dir.join("hero_layer_1.png").is_file());
    assert!(!out_dir.join("hero_layer_2.png").exists());
    assert!(!out_dir.join("hero_layers.json").exists());
}
