//! Build-time preparation of the site's hero artwork.
//!
//! Two pipelines share the same building blocks:
//!
//! * **Layers**: cluster the image by colour ([`KMeansLabeler`]), cut every
//!   cluster into 8-connected regions ([`build_layers`]), rank them in draw
//!   order ([`rank_layers`]) and write one transparent PNG per region
//!   ([`LayerWriter`]).
//! * **Separation**: mask the subject ([`ForegroundOracle`]), keep it as a
//!   transparent PNG and paint it out of an opaque background
//!   ([`Inpainter`]).

pub mod config;
pub mod error;
pub mod image_io;
pub mod kmeans;
pub mod label_map;
pub mod layers;
pub mod pipeline;
pub mod rank;
pub mod separate;
pub mod writer;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{ClusterConfig, LayerConfig, SeparateConfig, load_config, load_config_over};
pub use error::{HeroError, Result};
pub use image_io::{load_rgba, save_png};
pub use kmeans::KMeansLabeler;
pub use label_map::{LabelMap, LabelOracle, upscale_nearest};
pub use layers::{Layer, Region, apply_mask, build_layers, clamp_alpha, connected_regions};
pub use pipeline::{extract_foreground, extract_layers};
pub use rank::{RankKey, RankedLayer, rank_key, rank_layers};
pub use separate::{
    CentralClusterMatte, DiffusionInpainter, FallbackMatte, ForegroundOracle, Inpainter, MaskFileMatte, Separation,
    dominant_central_label, separate,
};
pub use writer::{LayerWriter, ManifestEntry, write_manifest};
