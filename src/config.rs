use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{HeroError, Result};

/// Settings for the colour clustering stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Number of k-means clusters (`K`).
    pub clusters: usize,
    /// Longest side of the working copy handed to k-means.
    pub max_dimension: u32,
    pub max_iterations: usize,
    pub convergence: f32,
    /// Seed for centroid initialisation. Same seed, same image, same labels.
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            clusters: 8,
            max_dimension: 512,
            max_iterations: 20,
            convergence: 1e-4,
            seed: 0,
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<()> {
        // kmeans_colors stores cluster indices as u8
        if self.clusters == 0 || self.clusters > 255 {
            return Err(HeroError::InvalidConfig(format!(
                "clusters must be in 1..=255, got {}",
                self.clusters
            )));
        }
        if self.max_dimension == 0 {
            return Err(HeroError::InvalidConfig("max_dimension must be positive".into()));
        }
        if self.max_iterations == 0 {
            return Err(HeroError::InvalidConfig("max_iterations must be positive".into()));
        }
        Ok(())
    }
}

/// Settings for splitting an image into ranked colour layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub cluster: ClusterConfig,
    /// Components smaller than this fraction of the image are dropped.
    pub min_area_ratio: f64,
    /// Alpha above which a pixel counts as visible when ranking.
    pub visibility_threshold: u8,
    /// Radius of the mask opening, 0 disables it.
    pub open_radius: u8,
    /// Gaussian sigma used to soften mask edges, 0 disables it.
    pub feather_sigma: f32,
    /// Remove layers with no visible pixel after masking.
    pub drop_invisible: bool,
    /// Cut every cluster into its 8-connected components. When off, each
    /// cluster becomes a single layer.
    pub split_components: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            min_area_ratio: 0.0012,
            visibility_threshold: 128,
            open_radius: 1,
            feather_sigma: 0.0,
            drop_invisible: true,
            split_components: true,
        }
    }
}

impl LayerConfig {
    /// One softened layer per colour cluster, used by `hero-layers`.
    pub fn per_cluster() -> Self {
        Self {
            cluster: ClusterConfig { clusters: 6, max_dimension: 400, ..ClusterConfig::default() },
            min_area_ratio: 0.0,
            open_radius: 0,
            feather_sigma: 0.5,
            split_components: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        if !(0.0..=1.0).contains(&self.min_area_ratio) {
            return Err(HeroError::InvalidConfig(format!(
                "min_area_ratio must be within [0, 1], got {}",
                self.min_area_ratio
            )));
        }
        if !self.feather_sigma.is_finite() || self.feather_sigma < 0.0 {
            return Err(HeroError::InvalidConfig(format!(
                "feather_sigma must be a non-negative number, got {}",
                self.feather_sigma
            )));
        }
        Ok(())
    }

    /// Minimum component size in pixels for an image of `width` x `height`.
    pub fn min_area(&self, width: u32, height: u32) -> f64 {
        self.min_area_ratio * (width as f64 * height as f64)
    }
}

/// Settings for the foreground / background separation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparateConfig {
    pub cluster: ClusterConfig,
    /// Side of the centred sampling square relative to the shorter image side.
    pub center_fraction: f32,
    pub mask_open_radius: u8,
    /// Extra pixels around the foreground that get repainted in the background.
    pub inpaint_dilation: u8,
    pub smoothing_passes: usize,
}

impl Default for SeparateConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig { clusters: 4, ..ClusterConfig::default() },
            center_fraction: 2.0 / 3.0,
            mask_open_radius: 1,
            inpaint_dilation: 3,
            smoothing_passes: 8,
        }
    }
}

impl SeparateConfig {
    pub fn validate(&self) -> Result<()> {
        self.cluster.validate()?;
        if !(self.center_fraction > 0.0 && self.center_fraction <= 1.0) {
            return Err(HeroError::InvalidConfig(format!(
                "center_fraction must be within (0, 1], got {}",
                self.center_fraction
            )));
        }
        Ok(())
    }
}

/// Load a JSON config file, or the defaults when no path is given.
///
/// Fields missing from the file keep their default values.
pub fn load_config<T>(path: Option<&Path>) -> Result<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    load_config_over(path, T::default())
}

/// Like [`load_config`], but fields missing from the file keep the values of
/// `base` instead of `T::default()`, at every nesting level.
pub fn load_config_over<T>(path: Option<&Path>, base: T) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let Some(path) = path else {
        return Ok(base);
    };
    let parse_error = |source| HeroError::ConfigParse {
        path: path.to_path_buf(),
        source,
    };
    let text = fs::read_to_string(path).map_err(|source| HeroError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let overrides: Value = serde_json::from_str(&text).map_err(parse_error)?;
    let mut merged = serde_json::to_value(base).map_err(parse_error)?;
    merge(&mut merged, overrides);
    serde_json::from_value(merged).map_err(parse_error)
}

fn merge(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            for (key, value) in overrides {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
