use std::cmp::Ordering;

use image::RgbaImage;
use tracing::debug;

use crate::layers::Layer;

/// Sort key for draw order: vertical centre of the visible pixels and their count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankKey {
    pub cy: f64,
    pub area: u64,
}

impl RankKey {
    /// Top to bottom; at equal height the larger layer comes first.
    pub fn draw_order(&self, other: &RankKey) -> Ordering {
        self.cy.total_cmp(&other.cy).then_with(|| other.area.cmp(&self.area))
    }

    pub fn is_invisible(&self) -> bool {
        self.area == 0
    }
}

/// Key over the pixels whose alpha is strictly above `threshold`.
/// A layer with no such pixel gets `(0.0, 0)`.
pub fn rank_key(image: &RgbaImage, threshold: u8) -> RankKey {
    let mut area = 0u64;
    let mut row_sum = 0f64;
    for (_, y, p) in image.enumerate_pixels() {
        if p.0[3] > threshold {
            area += 1;
            row_sum += y as f64;
        }
    }
    if area == 0 {
        return RankKey { cy: 0.0, area: 0 };
    }
    RankKey { cy: row_sum / area as f64, area }
}

#[derive(Debug, Clone)]
pub struct RankedLayer {
    pub layer: Layer,
    pub key: RankKey,
}

/// Order layers for drawing. The sort is stable, so layers with identical
/// keys keep their build order.
pub fn rank_layers(layers: Vec<Layer>, threshold: u8, drop_invisible: bool) -> Vec<RankedLayer> {
    let mut ranked: Vec<RankedLayer> = layers
        .into_iter()
        .map(|layer| {
            let key = rank_key(&layer.image, threshold);
            RankedLayer { layer, key }
        })
        .filter(|r| {
            let keep = !(drop_invisible && r.key.is_invisible());
            if !keep {
                debug!(label = r.layer.label, component = r.layer.component, "dropping invisible layer");
            }
            keep
        })
        .collect();
    ranked.sort_by(|a, b| a.key.draw_order(&b.key));
    ranked
}
