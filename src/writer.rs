use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{HeroError, Result};
use crate::image_io::save_png;
use crate::rank::RankedLayer;

/// One written layer, in draw order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub file: String,
    pub label: u32,
    pub component: u32,
}

/// Writes ranked layers as `<prefix>_<idx>.png` into one directory.
#[derive(Debug, Clone)]
pub struct LayerWriter {
    out_dir: PathBuf,
    prefix: String,
}

impl LayerWriter {
    pub fn new(out_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self { out_dir: out_dir.into(), prefix: prefix.into() }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn file_name(&self, idx: usize) -> String {
        format!("{}_{idx}.png", self.prefix)
    }

    /// Write every layer in order, then the manifest if one is requested.
    ///
    /// Any failed layer aborts the whole batch before the manifest is touched.
    pub fn write(&self, layers: &[RankedLayer], manifest: Option<&Path>) -> Result<Vec<ManifestEntry>> {
        fs::create_dir_all(&self.out_dir).map_err(|source| HeroError::Io {
            path: self.out_dir.clone(),
            source,
        })?;

        let mut entries = Vec::with_capacity(layers.len());
        for (idx, ranked) in layers.iter().enumerate() {
            let file = self.file_name(idx);
            let path = self.out_dir.join(&file);
            save_png(&ranked.layer.image, &path)?;
            info!(
                path = %path.display(),
                label = ranked.layer.label,
                component = ranked.layer.component,
                cy = ranked.key.cy,
                area = ranked.key.area,
                "wrote layer"
            );
            entries.push(ManifestEntry {
                file,
                label: ranked.layer.label,
                component: ranked.layer.component,
            });
        }

        if let Some(path) = manifest {
            write_manifest(path, &entries)?;
        }
        Ok(entries)
    }
}

/// Pretty JSON array of `entries`, in the given order.
pub fn write_manifest(path: &Path, entries: &[ManifestEntry]) -> Result<()> {
    let io_err = |source| HeroError::Io { path: path.to_path_buf(), source };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
    }
    let mut out = BufWriter::new(File::create(path).map_err(io_err)?);
    serde_json::to_writer_pretty(&mut out, entries)?;
    out.write_all(b"\n").map_err(io_err)?;
    out.flush().map_err(io_err)?;
    info!(path = %path.display(), entries = entries.len(), "wrote manifest");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::Layer;
    use crate::rank::RankKey;
    use image::{Rgba, RgbaImage};

    fn ranked(label: u32, component: u32) -> RankedLayer {
        RankedLayer {
            layer: Layer {
                image: RgbaImage::from_pixel(3, 3, Rgba([label as u8, 0, 0, 255])),
                label,
                component,
            },
            key: RankKey { cy: 1.0, area: 9 },
        }
    }

    #[test]
    fn test_manifest_matches_written_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LayerWriter::new(dir.path().join("out"), "hero_layer");
        let manifest = dir.path().join("out").join("layers.json");

        let entries = writer.write(&[ranked(4, 2), ranked(1, 1)], Some(&manifest)).unwrap();
        assert_eq!(entries[0].file, "hero_layer_0.png");
        assert_eq!(entries[1].file, "hero_layer_1.png");

        let text = fs::read_to_string(&manifest).unwrap();
        let parsed: Vec<ManifestEntry> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, entries);
        assert_eq!((parsed[0].label, parsed[0].component), (4, 2));
        for entry in &parsed {
            assert!(writer.out_dir().join(&entry.file).is_file());
        }
    }

    #[test]
    fn test_manifest_field_names() {
        let entry = ManifestEntry { file: "a.png".into(), label: 3, component: 7 };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, serde_json::json!({ "file": "a.png", "label": 3, "component": 7 }));
    }

    #[test]
    fn test_no_manifest_requested() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LayerWriter::new(dir.path(), "hero_element");
        let entries = writer.write(&[ranked(0, 1)], None).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(dir.path().join("hero_element_0.png").is_file());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_write_skips_manifest() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the output directory should be
        let blocked = dir.path().join("blocked");
        fs::write(&blocked, b"").unwrap();
        let writer = LayerWriter::new(&blocked, "hero_layer");
        let manifest = dir.path().join("manifest.json");

        assert!(writer.write(&[ranked(0, 1)], Some(&manifest)).is_err());
        assert!(!manifest.exists());
    }
}
