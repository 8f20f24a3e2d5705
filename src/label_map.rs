use std::collections::BTreeSet;

use image::{GrayImage, Luma, RgbaImage};

use crate::error::{HeroError, Result};

/// Per-pixel cluster ids, row-major, same size as the image it labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMap {
    width: u32,
    height: u32,
    labels: Vec<u32>,
}

impl LabelMap {
    pub fn new(width: u32, height: u32, labels: Vec<u32>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HeroError::EmptyImage);
        }
        let expected = width as usize * height as usize;
        if labels.len() != expected {
            return Err(HeroError::InvalidConfig(format!(
                "label map of {width}x{height} needs {expected} labels, got {}",
                labels.len()
            )));
        }
        Ok(Self { width, height, labels })
    }

    /// Build a map by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Result<Self>
    where
        F: FnMut(u32, u32) -> u32,
    {
        let mut labels = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                labels.push(f(x, y));
            }
        }
        Self::new(width, height, labels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.labels
    }

    /// Label values present in the map, ascending.
    pub fn distinct(&self) -> Vec<u32> {
        self.labels.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
    }

    /// Binary mask (255 inside, 0 outside) of `label`, with its pixel count.
    pub fn mask(&self, label: u32) -> (GrayImage, usize) {
        let mut count = 0usize;
        let mask = GrayImage::from_fn(self.width, self.height, |x, y| {
            if self.get(x, y) == label {
                count += 1;
                Luma([255])
            } else {
                Luma([0])
            }
        });
        (mask, count)
    }
}

/// Resize a label map with nearest-neighbour sampling.
///
/// Labels are categorical, so every output value is copied from some input
/// pixel; no intermediate ids are ever produced.
pub fn upscale_nearest(map: &LabelMap, width: u32, height: u32) -> Result<LabelMap> {
    if map.dimensions() == (width, height) {
        return Ok(map.clone());
    }
    let (src_w, src_h) = (map.width as u64, map.height as u64);
    LabelMap::from_fn(width, height, |x, y| {
        let sx = ((x as u64 * src_w) / width as u64).min(src_w - 1) as u32;
        let sy = ((y as u64 * src_h) / height as u64).min(src_h - 1) as u32;
        map.get(sx, sy)
    })
}

/// Supplies a label map for an image. Ids are opaque and may change between runs.
pub trait LabelOracle {
    /// Must return a map with the same dimensions as `image`.
    fn label(&self, image: &RgbaImage) -> Result<LabelMap>;
}
