use anyhow::Result;
use clap::Parser;
use hero_assets::LayerConfig;
use hero_assets::cli::{CommonArgs, init_logging, run_layer_tool};

/// Split the hero artwork into one softened layer per colour cluster, sorted in draw order.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Also write `hero_layers.json` next to the layers
    #[arg(short, long)]
    manifest: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.common.log_level);
    let manifest = args.manifest.then_some("hero_layers.json");
    run_layer_tool(&args.common, LayerConfig::per_cluster(), "hero_layer", manifest)
}
