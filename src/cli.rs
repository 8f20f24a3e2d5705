//! Argument handling and logging shared by the `hero-*` binaries.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::config::{LayerConfig, load_config_over};
use crate::image_io::load_rgba;
use crate::kmeans::KMeansLabeler;
use crate::pipeline::extract_layers;
use crate::writer::LayerWriter;

/// Paths every tool resolves against the project root. Nothing is required.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Project root that relative paths are resolved against
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Source artwork
    #[arg(short, long, default_value = "assets/hero.png")]
    pub input: PathBuf,

    /// Output directory
    #[arg(short = 'd', long, default_value = "public/hero")]
    pub out_dir: PathBuf,

    /// Optional JSON config overriding the built-in defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl CommonArgs {
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.root.join(path) }
    }

    pub fn input_path(&self) -> PathBuf {
        self.resolve(&self.input)
    }

    pub fn out_dir_path(&self) -> PathBuf {
        self.resolve(&self.out_dir)
    }

    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.as_deref().map(|p| self.resolve(p))
    }
}

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Shared body of the layer tools: load, extract, write `<prefix>_<idx>.png`
/// and, when `manifest` names a file, the manifest next to them.
///
/// `defaults` is the tool's own preset; `--config` overrides it field by field.
pub fn run_layer_tool(common: &CommonArgs, defaults: LayerConfig, prefix: &str, manifest: Option<&str>) -> Result<()> {
    let config_path = common.config_path();
    let config = load_config_over(config_path.as_deref(), defaults).context("loading layer config")?;

    let image = load_rgba(&common.input_path())?;
    let oracle = KMeansLabeler::new(config.cluster.clone());
    let ranked = extract_layers(&image, &oracle, &config).context("layer extraction failed")?;

    let out_dir = common.out_dir_path();
    let manifest_path = manifest.map(|name| out_dir.join(name));
    let writer = LayerWriter::new(&out_dir, prefix);
    let entries = writer
        .write(&ranked, manifest_path.as_deref())
        .context("writing layers failed")?;

    for entry in &entries {
        println!("Saved → {}", out_dir.join(&entry.file).display());
    }
    if let Some(path) = &manifest_path {
        println!("Saved → {}", path.display());
    }
    Ok(())
}
