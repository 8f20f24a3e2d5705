use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while preparing hero assets.
#[derive(Debug, Error)]
pub enum HeroError {
    #[error("source image not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("unable to decode image {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unable to encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("unable to parse config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("image has zero width or height")]
    EmptyImage,
    #[error("dimension mismatch: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("foreground matte unavailable: {0}")]
    Matte(String),
    #[error("inpainting failed: {0}")]
    Inpaint(String),
}

pub type Result<T> = std::result::Result<T, HeroError>;
