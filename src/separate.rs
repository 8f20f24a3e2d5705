//! Foreground / background separation.
//!
//! A [`ForegroundOracle`] supplies the subject mask and an [`Inpainter`]
//! repaints the hole it leaves in the background. [`MaskFileMatte`] reads a
//! matte produced by a dedicated matting tool; [`CentralClusterMatte`] is the
//! best-effort stand-in that assumes the subject is centred and distinct in
//! colour. [`FallbackMatte`] chains the two so callers never see the
//! difference.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, open};
use tracing::{debug, info, warn};

use crate::config::SeparateConfig;
use crate::error::{HeroError, Result};
use crate::label_map::{LabelMap, LabelOracle};
use crate::layers::apply_mask;

/// Produces a foreground matte the size of the image: 255 = subject,
/// 0 = background, values in between for soft edges.
pub trait ForegroundOracle {
    fn name(&self) -> &str;
    fn foreground_mask(&self, image: &RgbaImage) -> Result<GrayImage>;
}

/// Fills the masked pixels of an image with content derived from the rest.
pub trait Inpainter {
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage>;
}

// ------------------------------------------------------------
// Matting
// ------------------------------------------------------------

/// Matte read from disk. Uses the alpha channel when the file has one,
/// otherwise its luma.
#[derive(Debug, Clone)]
pub struct MaskFileMatte {
    path: PathBuf,
}

impl MaskFileMatte {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ForegroundOracle for MaskFileMatte {
    fn name(&self) -> &str {
        "matte file"
    }

    fn foreground_mask(&self, image: &RgbaImage) -> Result<GrayImage> {
        if !self.path.is_file() {
            return Err(HeroError::Matte(format!("{} does not exist", self.path.display())));
        }
        let matte = image::open(&self.path).map_err(|source| HeroError::Decode {
            path: self.path.clone(),
            source,
        })?;
        let gray: GrayImage = if matte.color().has_alpha() {
            let rgba = matte.to_rgba8();
            GrayImage::from_fn(rgba.width(), rgba.height(), |x, y| Luma([rgba.get_pixel(x, y).0[3]]))
        } else {
            matte.to_luma8()
        };
        let (w, h) = image.dimensions();
        let gray = if gray.dimensions() != (w, h) {
            debug!(from = ?gray.dimensions(), to = ?(w, h), "resizing matte");
            imageops::resize(&gray, w, h, FilterType::Nearest)
        } else {
            gray
        };
        Ok(gray)
    }
}

/// Subject = the most common cluster inside the centred square.
///
/// Only a fallback for when no real matte is available.
pub struct CentralClusterMatte<L> {
    oracle: L,
    center_fraction: f32,
    open_radius: u8,
}

impl<L: LabelOracle> CentralClusterMatte<L> {
    pub fn new(oracle: L, center_fraction: f32, open_radius: u8) -> Self {
        Self { oracle, center_fraction, open_radius }
    }
}

impl<L: LabelOracle> ForegroundOracle for CentralClusterMatte<L> {
    fn name(&self) -> &str {
        "central cluster"
    }

    fn foreground_mask(&self, image: &RgbaImage) -> Result<GrayImage> {
        let labels = self.oracle.label(image)?;
        if labels.dimensions() != image.dimensions() {
            return Err(HeroError::DimensionMismatch {
                expected: image.dimensions(),
                actual: labels.dimensions(),
            });
        }
        let label = dominant_central_label(&labels, self.center_fraction)
            .ok_or_else(|| HeroError::Matte("empty centre region".into()))?;
        let (mask, count) = labels.mask(label);
        debug!(label, count, "dominant central label");
        if self.open_radius > 0 {
            Ok(open(&mask, Norm::LInf, self.open_radius))
        } else {
            Ok(mask)
        }
    }
}

/// Try `primary`, fall back to `fallback` on any error.
///
/// [`name`](ForegroundOracle::name) reports whichever oracle produced the
/// most recent mask.
pub struct FallbackMatte<P, F> {
    primary: P,
    fallback: F,
    used_fallback: Cell<bool>,
}

impl<P: ForegroundOracle, F: ForegroundOracle> FallbackMatte<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback, used_fallback: Cell::new(false) }
    }
}

impl<P: ForegroundOracle, F: ForegroundOracle> ForegroundOracle for FallbackMatte<P, F> {
    fn name(&self) -> &str {
        if self.used_fallback.get() { self.fallback.name() } else { self.primary.name() }
    }

    fn foreground_mask(&self, image: &RgbaImage) -> Result<GrayImage> {
        match self.primary.foreground_mask(image) {
            Ok(mask) => {
                self.used_fallback.set(false);
                Ok(mask)
            }
            Err(err) => {
                self.used_fallback.set(true);
                warn!(
                    primary = self.primary.name(),
                    fallback = self.fallback.name(),
                    error = %err,
                    "matte unavailable, using fallback"
                );
                self.fallback.foreground_mask(image)
            }
        }
    }
}

/// Most frequent label in the centred square of side
/// `round(fraction * min(w, h))`. Ties go to the smaller id.
pub fn dominant_central_label(labels: &LabelMap, fraction: f32) -> Option<u32> {
    let (w, h) = labels.dimensions();
    let side = ((w.min(h) as f32 * fraction).round() as u32).clamp(1, w.min(h));
    let x0 = (w - side) / 2;
    let y0 = (h - side) / 2;

    let mut counts: HashMap<u32, usize> = HashMap::new();
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            *counts.entry(labels.get(x, y)).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|(la, ca), (lb, cb)| ca.cmp(cb).then_with(|| lb.cmp(la)))
        .map(|(label, _)| label)
}

/// 255 where `gray > threshold`, 0 elsewhere.
fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold { Luma([255]) } else { Luma([0]) }
    })
}

// ------------------------------------------------------------
// Inpainting
// ------------------------------------------------------------

/// Onion-peel fill: each pass paints the masked pixels that touch known
/// pixels with the mean of their known 8-neighbours, then a few averaging
/// passes smooth the filled area.
#[derive(Debug, Clone)]
pub struct DiffusionInpainter {
    pub smoothing_passes: usize,
}

impl Default for DiffusionInpainter {
    fn default() -> Self {
        Self { smoothing_passes: 8 }
    }
}

const NEIGHBOURS: [(i64, i64); 8] = [(-1, -1), (0, -1), (1, -1), (-1, 0), (1, 0), (-1, 1), (0, 1), (1, 1)];

impl DiffusionInpainter {
    pub fn new(smoothing_passes: usize) -> Self {
        Self { smoothing_passes }
    }

    /// Mean colour of the neighbours of `(x, y)` for which `known` holds.
    fn neighbour_mean(img: &RgbImage, x: u32, y: u32, known: impl Fn(usize) -> bool) -> Option<Rgb<u8>> {
        let (w, h) = (img.width() as i64, img.height() as i64);
        let mut sum = [0u32; 3];
        let mut n = 0u32;
        for (dx, dy) in NEIGHBOURS {
            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
            if nx < 0 || ny < 0 || nx >= w || ny >= h {
                continue;
            }
            if !known((ny * w + nx) as usize) {
                continue;
            }
            let p = img.get_pixel(nx as u32, ny as u32).0;
            sum[0] += p[0] as u32;
            sum[1] += p[1] as u32;
            sum[2] += p[2] as u32;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(Rgb([
            ((sum[0] + n / 2) / n) as u8,
            ((sum[1] + n / 2) / n) as u8,
            ((sum[2] + n / 2) / n) as u8,
        ]))
    }
}

impl Inpainter for DiffusionInpainter {
    fn inpaint(&self, image: &RgbImage, mask: &GrayImage) -> Result<RgbImage> {
        if image.dimensions() != mask.dimensions() {
            return Err(HeroError::DimensionMismatch {
                expected: image.dimensions(),
                actual: mask.dimensions(),
            });
        }
        let (w, h) = image.dimensions();
        let hole: Vec<bool> = mask.pixels().map(|p| p.0[0] > 0).collect();
        let mut remaining = hole.iter().filter(|&&m| m).count();
        if remaining == 0 {
            return Ok(image.clone());
        }
        if remaining == hole.len() {
            return Err(HeroError::Inpaint("mask covers the whole image".into()));
        }

        let mut out = image.clone();
        let mut known: Vec<bool> = hole.iter().map(|&m| !m).collect();
        let mut rings = 0usize;

        while remaining > 0 {
            let mut frontier = Vec::new();
            for y in 0..h {
                for x in 0..w {
                    let idx = y as usize * w as usize + x as usize;
                    if known[idx] {
                        continue;
                    }
                    if let Some(colour) = Self::neighbour_mean(&out, x, y, |i| known[i]) {
                        frontier.push((idx, x, y, colour));
                    }
                }
            }
            if frontier.is_empty() {
                break;
            }
            for &(idx, x, y, colour) in &frontier {
                out.put_pixel(x, y, colour);
                known[idx] = true;
            }
            remaining -= frontier.len();
            rings += 1;
        }

        for _ in 0..self.smoothing_passes {
            let snapshot = out.clone();
            for y in 0..h {
                for x in 0..w {
                    if !hole[y as usize * w as usize + x as usize] {
                        continue;
                    }
                    if let Some(colour) = Self::neighbour_mean(&snapshot, x, y, |_| true) {
                        out.put_pixel(x, y, colour);
                    }
                }
            }
        }

        debug!(rings, smoothing = self.smoothing_passes, "inpainted hole");
        Ok(out)
    }
}

// ------------------------------------------------------------
// Separation
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Separation {
    /// Source with alpha limited to the foreground mask.
    pub foreground: RgbaImage,
    /// Fully opaque source with the foreground painted out.
    pub background: RgbImage,
}

/// Split `image` into a transparent foreground and a repaired background.
///
/// The foreground keeps the soft matte as alpha. The inpainting hole is the
/// matte thresholded at `> 128`, then dilated by `inpaint_dilation`.
pub fn separate<I: Inpainter + ?Sized>(
    image: &RgbaImage,
    mask: &GrayImage,
    inpainter: &I,
    config: &SeparateConfig,
) -> Result<Separation> {
    if image.dimensions() != mask.dimensions() {
        return Err(HeroError::DimensionMismatch {
            expected: image.dimensions(),
            actual: mask.dimensions(),
        });
    }

    let foreground = apply_mask(image, mask);

    let hole = binarize(mask, 128);
    let hole = if config.inpaint_dilation > 0 {
        dilate(&hole, Norm::LInf, config.inpaint_dilation)
    } else {
        hole
    };
    let opaque = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y).0;
        Rgb([p[0], p[1], p[2]])
    });
    let background = inpainter.inpaint(&opaque, &hole)?;

    let fg_pixels = mask.pixels().filter(|p| p.0[0] > 128).count();
    info!(foreground_pixels = fg_pixels, "separated foreground");
    Ok(Separation { foreground, background })
}
