use anyhow::Result;
use clap::Parser;
use hero_assets::LayerConfig;
use hero_assets::cli::{CommonArgs, init_logging, run_layer_tool};

/// Extract the hero artwork's elements as transparent PNGs plus a manifest.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Skip writing `hero_elements.json`
    #[arg(long)]
    no_manifest: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.common.log_level);
    let manifest = (!args.no_manifest).then_some("hero_elements.json");
    run_layer_tool(&args.common, LayerConfig::default(), "hero_element", manifest)
}
