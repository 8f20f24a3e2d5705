use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hero_assets::cli::{CommonArgs, init_logging};
use hero_assets::{
    CentralClusterMatte, DiffusionInpainter, FallbackMatte, KMeansLabeler, MaskFileMatte, SeparateConfig,
    extract_foreground, load_config, load_rgba, save_png,
};

/// Separate the hero subject from its background.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Matte from an external matting tool; the central-cluster guess is used when it is missing
    #[arg(short, long, default_value = "assets/hero_matte.png")]
    matte: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.common.log_level);

    let config_path = args.common.config_path();
    let config: SeparateConfig = load_config(config_path.as_deref()).context("loading separate config")?;
    let image = load_rgba(&args.common.input_path())?;

    let matte = FallbackMatte::new(
        MaskFileMatte::new(args.common.resolve(&args.matte)),
        CentralClusterMatte::new(
            KMeansLabeler::new(config.cluster.clone()),
            config.center_fraction,
            config.mask_open_radius,
        ),
    );
    let inpainter = DiffusionInpainter::new(config.smoothing_passes);
    let parts = extract_foreground(&image, &matte, &inpainter, &config).context("foreground extraction failed")?;

    let out_dir = args.common.out_dir_path();
    let fg_path = out_dir.join("hero_foreground.png");
    let bg_path = out_dir.join("hero_background.png");
    save_png(&parts.foreground, &fg_path)?;
    println!("Saved → {}", fg_path.display());
    save_png(&parts.background, &bg_path)?;
    println!("Saved → {}", bg_path.display());

    Ok(())
}
