use std::time::Instant;

use image::RgbaImage;
use tracing::info;

use crate::config::{LayerConfig, SeparateConfig};
use crate::error::{HeroError, Result};
use crate::label_map::LabelOracle;
use crate::layers::build_layers;
use crate::rank::{RankedLayer, rank_layers};
use crate::separate::{ForegroundOracle, Inpainter, Separation, separate};

/// Label, split and rank `image` into draw-ordered layers.
pub fn extract_layers<L: LabelOracle + ?Sized>(
    image: &RgbaImage,
    oracle: &L,
    config: &LayerConfig,
) -> Result<Vec<RankedLayer>> {
    config.validate()?;

    let start = Instant::now();
    let labels = oracle.label(image)?;
    if labels.dimensions() != image.dimensions() {
        return Err(HeroError::DimensionMismatch {
            expected: image.dimensions(),
            actual: labels.dimensions(),
        });
    }
    info!(
        labels = labels.distinct().len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "label map ready"
    );

    let start = Instant::now();
    let layers = build_layers(image, &labels, config)?;
    let ranked = rank_layers(layers, config.visibility_threshold, config.drop_invisible);
    info!(
        layers = ranked.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "layers ranked"
    );
    Ok(ranked)
}

/// Mask the subject of `image` with `matte` and repaint the background.
pub fn extract_foreground<M, I>(
    image: &RgbaImage,
    matte: &M,
    inpainter: &I,
    config: &SeparateConfig,
) -> Result<Separation>
where
    M: ForegroundOracle + ?Sized,
    I: Inpainter + ?Sized,
{
    config.validate()?;

    let start = Instant::now();
    let mask = matte.foreground_mask(image)?;
    info!(
        oracle = matte.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "foreground mask ready"
    );

    let start = Instant::now();
    let parts = separate(image, &mask, inpainter, config)?;
    info!(elapsed_ms = start.elapsed().as_millis() as u64, "background repaired");
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label_map::LabelMap;
    use image::Rgba;

    struct RowBands;

    impl LabelOracle for RowBands {
        fn label(&self, image: &RgbaImage) -> Result<LabelMap> {
            LabelMap::from_fn(image.width(), image.height(), |_, y| y / 10)
        }
    }

    struct WrongSize;

    impl LabelOracle for WrongSize {
        fn label(&self, _image: &RgbaImage) -> Result<LabelMap> {
            LabelMap::from_fn(2, 2, |_, _| 0)
        }
    }

    #[test]
    fn test_bands_ranked_top_to_bottom() {
        let img = RgbaImage::from_pixel(20, 30, Rgba([9, 9, 9, 255]));
        let ranked = extract_layers(&img, &RowBands, &LayerConfig::default()).unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].key.cy < w[1].key.cy));
    }

    #[test]
    fn test_oracle_size_checked() {
        let img = RgbaImage::new(5, 5);
        let result = extract_layers(&img, &WrongSize, &LayerConfig::default());
        assert!(matches!(result, Err(HeroError::DimensionMismatch { .. })));
    }
}
