use std::fs;
use std::path::Path;

use image::{ImageBuffer, ImageFormat, Pixel, PixelWithColorType, RgbaImage};
use tracing::debug;

use crate::error::{HeroError, Result};

/// Read a raster image as RGBA. Images without alpha come back fully opaque.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    if !path.is_file() {
        return Err(HeroError::MissingInput(path.to_path_buf()));
    }
    let img = image::open(path).map_err(|source| HeroError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let rgba = img.to_rgba8();
    if rgba.width() == 0 || rgba.height() == 0 {
        return Err(HeroError::EmptyImage);
    }
    debug!(path = %path.display(), width = rgba.width(), height = rgba.height(), "loaded source image");
    Ok(rgba)
}

/// Encode `image` as PNG at `path`, creating parent directories.
pub fn save_png<P>(image: &ImageBuffer<P, Vec<u8>>, path: &Path) -> Result<()>
where
    P: Pixel<Subpixel = u8> + PixelWithColorType,
{
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| HeroError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| HeroError::Encode {
            path: path.to_path_buf(),
            source,
        })
}
