use image::{GrayImage, Luma, Rgba, RgbaImage};
use imageproc::definitions::Image;
use imageproc::distance_transform::Norm;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::open;
use imageproc::region_labelling::{Connectivity, connected_components};
use tracing::{debug, info};

use crate::config::LayerConfig;
use crate::error::{HeroError, Result};
use crate::label_map::LabelMap;

/// One 8-connected component of a binary mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Cluster id the component belongs to.
    pub label: u32,
    /// Id assigned by the component labeller, 1-based.
    pub component: u32,
    /// Pixel count.
    pub area: usize,
}

/// A full-size copy of the source with everything outside one region made transparent.
#[derive(Debug, Clone)]
pub struct Layer {
    pub image: RgbaImage,
    pub label: u32,
    /// Component id of the region, or 0 when the whole cluster is one layer.
    pub component: u32,
}

/// 8-connected components of `mask` (nonzero = foreground).
///
/// Returns the per-pixel component ids (0 for background) and the area of
/// each component, indexed by `id - 1`. An all-zero mask yields no components
/// and the labeller is never run on it.
pub fn connected_regions(mask: &GrayImage) -> Option<(Image<Luma<u32>>, Vec<usize>)> {
    if mask.pixels().all(|p| p.0[0] == 0) {
        return None;
    }
    // the labeller cannot handle a single-pixel image
    if mask.width() * mask.height() == 1 {
        return Some((Image::from_pixel(1, 1, Luma([1])), vec![1]));
    }
    let ids = connected_components(mask, Connectivity::Eight, Luma([0u8]));
    let count = ids.pixels().map(|p| p.0[0]).max().unwrap_or(0) as usize;
    let mut areas = vec![0usize; count];
    for p in ids.pixels() {
        let id = p.0[0] as usize;
        if id > 0 {
            areas[id - 1] += 1;
        }
    }
    Some((ids, areas))
}

/// Components of one label that reach `min_area`, with the component id image.
fn label_regions(labels: &LabelMap, label: u32, min_area: f64) -> Option<(Image<Luma<u32>>, Vec<Region>)> {
    let (mask, count) = labels.mask(label);
    if (count as f64) < min_area {
        debug!(label, count, "label below minimum area");
        return None;
    }
    let (ids, areas) = connected_regions(&mask)?;
    let regions: Vec<Region> = areas
        .iter()
        .enumerate()
        .filter(|&(_, &area)| area > 0 && (area as f64) >= min_area)
        .map(|(idx, &area)| Region { label, component: idx as u32 + 1, area })
        .collect();
    debug!(label, components = areas.len(), kept = regions.len(), "label processed");
    Some((ids, regions))
}

/// Clean up a region mask: open with an L∞ kernel of `open_radius`, then
/// optionally blur its edges.
fn refine_mask(mask: GrayImage, config: &LayerConfig) -> GrayImage {
    let opened = if config.open_radius > 0 {
        open(&mask, Norm::LInf, config.open_radius)
    } else {
        mask
    };
    if config.feather_sigma > 0.0 {
        gaussian_blur_f32(&opened, config.feather_sigma)
    } else {
        opened
    }
}

/// Copy of `image` whose alpha becomes `alpha * mask / 255`.
pub fn apply_mask(image: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        let m = mask.get_pixel(x, y).0[0] as u32;
        let alpha = (a as u32 * m + 127) / 255;
        Rgba([r, g, b, alpha as u8])
    })
}

/// Copy of `image` whose alpha becomes `min(alpha, mask)`.
pub fn clamp_alpha(image: &RgbaImage, mask: &GrayImage) -> RgbaImage {
    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
        Rgba([r, g, b, a.min(mask.get_pixel(x, y).0[0])])
    })
}

/// Split `image` into one transparent layer per surviving region of `labels`.
///
/// Steps performed for every distinct label:
/// 1. Build the binary mask of that label.
/// 2. Find its 8-connected components.
/// 3. Drop components smaller than `min_area_ratio` of the image.
/// 4. Open each remaining component mask (and feather it if configured).
/// 5. Copy the source with alpha multiplied by the mask.
///
/// With `split_components` off, step 2 is skipped: every label that reaches
/// the minimum area yields one layer (component 0) whose alpha is
/// `min(alpha, mask)`.
pub fn build_layers(image: &RgbaImage, labels: &LabelMap, config: &LayerConfig) -> Result<Vec<Layer>> {
    config.validate()?;
    if image.dimensions() != labels.dimensions() {
        return Err(HeroError::DimensionMismatch {
            expected: image.dimensions(),
            actual: labels.dimensions(),
        });
    }

    let min_area = config.min_area(image.width(), image.height());
    let mut layers = Vec::new();

    if !config.split_components {
        for label in labels.distinct() {
            let (mask, count) = labels.mask(label);
            if count == 0 || (count as f64) < min_area {
                debug!(label, count, "label below minimum area");
                continue;
            }
            let mask = refine_mask(mask, config);
            layers.push(Layer { image: clamp_alpha(image, &mask), label, component: 0 });
        }
        info!(layers = layers.len(), min_area, "built per-cluster layers");
        return Ok(layers);
    }

    for label in labels.distinct() {
        let Some((ids, regions)) = label_regions(labels, label, min_area) else {
            continue;
        };
        for region in regions {
            let region_mask = GrayImage::from_fn(ids.width(), ids.height(), |x, y| {
                if ids.get_pixel(x, y).0[0] == region.component { Luma([255]) } else { Luma([0]) }
            });
            let region_mask = refine_mask(region_mask, config);
            layers.push(Layer {
                image: apply_mask(image, &region_mask),
                label: region.label,
                component: region.component,
            });
        }
    }

    info!(layers = layers.len(), min_area, "built layers");
    Ok(layers)
}
