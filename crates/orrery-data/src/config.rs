//! Tunable thresholds for every pipeline stage
//!
//! One immutable [`PipelineConfig`] is built up front (defaults, then an
//! optional JSON file, then CLI overrides) and handed to each stage.

use serde::{Deserialize, Serialize};
use std::path::Path;
use anyhow::{Context, Result};

use crate::horizons::HORIZONS_API_URL;
use crate::sbdb::SBDB_QUERY_URL;

/// Star compiler selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarfieldConfig {
    /// Stars dimmer than this apparent magnitude are dropped
    pub max_mag: f64,
    /// Keep at most this many of the brightest stars
    pub max_stars: usize,
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self { max_mag: 9.0, max_stars: 10_000 }
    }
}

/// Small-body database query limits used when building the catalog.
///
/// These are deliberately generous; the save generator applies the strict policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub asteroid_min_diam_km: f64,
    pub asteroid_max_results: usize,
    pub tno_min_diam_km: f64,
    pub tno_max_results: usize,
    pub centaur_min_diam_km: f64,
    pub centaur_max_results: usize,
    /// NEOs are mostly small, so they are selected by absolute magnitude
    pub neo_max_h: f64,
    pub neo_max_results: usize,
    pub comet_min_diam_km: f64,
    pub comet_max_results: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            asteroid_min_diam_km: 40.0,
            asteroid_max_results: 5000,
            tno_min_diam_km: 40.0,
            tno_max_results: 5000,
            centaur_min_diam_km: 30.0,
            centaur_max_results: 2000,
            neo_max_h: 18.0,
            neo_max_results: 2000,
            comet_min_diam_km: 1.0,
            comet_max_results: 2000,
        }
    }
}

/// Inclusion policy thresholds
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Planets, dwarfs, TNOs, centaurs and asteroids at least this wide
    pub big_object_min_diam_km: f64,
    pub moon_min_diam_km: f64,
    pub asteroid_min_diam_km: f64,
    /// TNOs and dwarfs at least this bright (H at most this value)
    pub max_tno_abs_mag: f64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            big_object_min_diam_km: 300.0,
            moon_min_diam_km: 150.0,
            asteroid_min_diam_km: 200.0,
            max_tno_abs_mag: 3.5,
        }
    }
}

/// Save file generation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaveConfig {
    /// 1 engine distance unit = this many km
    pub km_per_unit: f64,
    /// Ephemeris requests in flight at once
    pub fetch_workers: usize,
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self { km_per_unit: 100.0, fetch_workers: 4 }
    }
}

/// Remote service endpoints and call policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub sbdb_url: String,
    pub horizons_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// Backoff grows linearly with the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            sbdb_url: SBDB_QUERY_URL.to_string(),
            horizons_url: HORIZONS_API_URL.to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

/// Configuration for all three stages
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub stars: StarfieldConfig,
    pub catalog: CatalogConfig,
    pub selection: SelectionConfig,
    pub save: SaveConfig,
    pub service: ServiceConfig,
}

impl PipelineConfig {
    /// Load from a JSON file; missing sections and fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config JSON: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Reject values that would make a stage meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.save.km_per_unit.is_finite() && self.save.km_per_unit > 0.0) {
            anyhow::bail!("km_per_unit must be positive, got {}", self.save.km_per_unit);
        }
        if self.save.fetch_workers == 0 {
            anyhow::bail!("fetch_workers must be at least 1");
        }
        if self.service.max_attempts == 0 {
            anyhow::bail!("max_attempts must be at least 1");
        }
        if self.stars.max_mag.is_nan() {
            anyhow::bail!("max_mag must be a number");
        }
        Ok(())
    }
}
