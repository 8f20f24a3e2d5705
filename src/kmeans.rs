use image::RgbaImage;
use image::imageops::{self, FilterType};
use kmeans_colors::get_kmeans;
use palette::{IntoColor, Lab, LinSrgb, Srgb};
use tracing::debug;

use crate::config::ClusterConfig;
use crate::error::{HeroError, Result};
use crate::label_map::{LabelMap, LabelOracle, upscale_nearest};

/// Colour clustering in CIE Lab with `kmeans_colors`.
///
/// Large images are clustered on a downscaled copy; the label map is then
/// brought back to full size with [`upscale_nearest`].
#[derive(Debug, Clone)]
pub struct KMeansLabeler {
    config: ClusterConfig,
}

impl KMeansLabeler {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Downscaled copy whose longest side equals `max_dimension`, or `None`
    /// when the image already fits.
    fn working_copy(&self, image: &RgbaImage) -> Option<RgbaImage> {
        let (orig_w, orig_h) = image.dimensions();
        let max_side = orig_w.max(orig_h);
        if max_side <= self.config.max_dimension {
            return None;
        }
        let ratio = self.config.max_dimension as f32 / max_side as f32;
        let w = ((orig_w as f32) * ratio).round().max(1.0) as u32;
        let h = ((orig_h as f32) * ratio).round().max(1.0) as u32;
        Some(imageops::resize(image, w, h, FilterType::Triangle))
    }
}

impl LabelOracle for KMeansLabeler {
    fn label(&self, image: &RgbaImage) -> Result<LabelMap> {
        self.config.validate()?;
        let (orig_w, orig_h) = image.dimensions();
        if orig_w == 0 || orig_h == 0 {
            return Err(HeroError::EmptyImage);
        }

        let working = self.working_copy(image);
        let source = working.as_ref().unwrap_or(image);
        let (work_w, work_h) = source.dimensions();

        let lab_pixels: Vec<Lab> = source
            .pixels()
            .map(|p| {
                let linear: LinSrgb<f32> = Srgb::<u8>::new(p[0], p[1], p[2]).into_linear();
                linear.into_color()
            })
            .collect();

        let kmeans = get_kmeans(
            self.config.clusters,
            self.config.max_iterations,
            self.config.convergence,
            false,
            &lab_pixels,
            self.config.seed,
        );
        debug!(
            clusters = self.config.clusters,
            score = kmeans.score,
            width = work_w,
            height = work_h,
            "k-means finished"
        );

        let labels: Vec<u32> = kmeans.indices.iter().map(|&i| i as u32).collect();
        let map = LabelMap::new(work_w, work_h, labels)?;
        upscale_nearest(&map, orig_w, orig_h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn two_tone(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, _| {
            if x < w / 2 {
                Rgba([220, 30, 30, 255])
            } else {
                Rgba([20, 40, 200, 255])
            }
        })
    }

    #[test]
    fn test_two_colors_two_labels() {
        let img = two_tone(40, 20);
        let oracle = KMeansLabeler::new(ClusterConfig { clusters: 2, ..ClusterConfig::default() });
        let map = oracle.label(&img).unwrap();

        assert_eq!(map.dimensions(), (40, 20));
        assert_eq!(map.distinct().len(), 2);
        let left = map.get(0, 0);
        let right = map.get(39, 0);
        assert_ne!(left, right);
        for y in 0..20 {
            for x in 0..40 {
                let expected = if x < 20 { left } else { right };
                assert_eq!(map.get(x, y), expected);
            }
        }
    }

    #[test]
    fn test_labels_within_cluster_range() {
        let img = RgbaImage::from_fn(32, 32, |x, y| Rgba([(x * 8) as u8, (y * 8) as u8, 90, 255]));
        let oracle = KMeansLabeler::new(ClusterConfig { clusters: 5, ..ClusterConfig::default() });
        let map = oracle.label(&img).unwrap();
        assert!(map.as_slice().iter().all(|&l| l < 5));
    }

    #[test]
    fn test_downscaled_map_is_full_size() {
        let img = two_tone(300, 200);
        let oracle = KMeansLabeler::new(ClusterConfig {
            clusters: 2,
            max_dimension: 64,
            ..ClusterConfig::default()
        });
        let map = oracle.label(&img).unwrap();
        assert_eq!(map.dimensions(), (300, 200));
        assert_ne!(map.get(10, 100), map.get(290, 100));
        assert_eq!(map.get(10, 10), map.get(100, 190));
    }

    #[test]
    fn test_invalid_cluster_count() {
        let img = two_tone(4, 4);
        let oracle = KMeansLabeler::new(ClusterConfig { clusters: 0, ..ClusterConfig::default() });
        assert!(matches!(oracle.label(&img), Err(HeroError::InvalidConfig(_))));
    }
}
