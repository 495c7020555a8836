//! Stage orchestration: each stage reads its input files, runs, and writes
//! its output, returning a summary of what happened

use indexmap::IndexMap;
use std::path::Path;
use anyhow::{Context, Result};

use crate::catalog::{self, CatalogBody};
use crate::config::PipelineConfig;
use crate::horizons::EphemerisSource;
use crate::save::{self, SaveEpoch};
use crate::sbdb::{self, SmallBodySource};
use crate::selection::{self, Selection};
use crate::starfield::Starfield;
use crate::stars::StarCatalog;

/// Star compiler counts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StarfieldSummary {
    /// Rows that parsed into a star
    pub parsed: usize,
    /// Rows dropped for malformed fields
    pub skipped: usize,
    /// Stars at or under the magnitude ceiling
    pub bright: usize,
    pub written: usize,
}

/// Catalog builder counts
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CatalogSummary {
    pub manual: usize,
    pub fetched: usize,
    pub written: usize,
}

impl CatalogSummary {
    pub fn duplicates(&self) -> usize {
        (self.manual + self.fetched).saturating_sub(self.written)
    }
}

/// Save generator counts
#[derive(Clone, Debug, PartialEq)]
pub struct SaveSummary {
    pub catalog: usize,
    pub sun_orbiting: usize,
    pub satellites: usize,
    pub small_bodies: usize,
    pub epoch: SaveEpoch,
}

/// Runs the three stages with one shared configuration
pub struct DataPipeline {
    config: PipelineConfig,
}

impl DataPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(PipelineConfig::default())
    }

    /// Star catalog CSV (optionally gzipped) to binary starfield
    pub fn compile_stars(&self, input: &Path, output: &Path) -> Result<StarfieldSummary> {
        let catalog = StarCatalog::load_csv(input)?;
        let parsed = catalog.len();
        let skipped = catalog.skipped();

        let bright = catalog.filter_by_magnitude(self.config.stars.max_mag);
        let bright_count = bright.len();
        let starfield = Starfield::new(bright.compile_brightest(self.config.stars.max_stars));
        starfield.save(output)?;

        let summary = StarfieldSummary { parsed, skipped, bright: bright_count, written: starfield.len() };
        tracing::info!(
            "Stars: {} parsed, {} skipped, {} at mag <= {}, {} written",
            summary.parsed, summary.skipped, summary.bright, self.config.stars.max_mag, summary.written
        );
        Ok(summary)
    }

    /// Fetch small bodies, merge with the curated list, write the catalog
    pub async fn build_catalog<S: SmallBodySource>(
        &self,
        source: &S,
        manual_path: &Path,
        output: &Path,
    ) -> Result<CatalogSummary> {
        let manual = catalog::load_manual_bodies(manual_path)?;
        let fetched = sbdb::fetch_small_bodies(source, &self.config.catalog)
            .await
            .context("Small-body query failed")?;

        let summary_base = (manual.len(), fetched.len());
        let merged = catalog::merge_catalog(manual, fetched);
        catalog::save_catalog(output, &merged)?;

        let summary = CatalogSummary { manual: summary_base.0, fetched: summary_base.1, written: merged.len() };
        tracing::info!(
            "Catalog: {} manual + {} fetched, {} duplicates dropped, {} written",
            summary.manual, summary.fetched, summary.duplicates(), summary.written
        );
        Ok(summary)
    }

    /// Apply the inclusion policy without touching the network
    pub fn preview_selection(&self, catalog_path: &Path) -> Result<(Selection, IndexMap<&'static str, usize>)> {
        let bodies = catalog::load_catalog(catalog_path)?;
        let tally = selection::rule_tally(&bodies, &self.config.selection);
        Ok((selection::select(bodies, &self.config.selection), tally))
    }

    /// Select bodies from the catalog, resolve their orbits, write the save file
    pub async fn generate_save<S: EphemerisSource>(
        &self,
        source: &S,
        catalog_path: &Path,
        output: &Path,
        epoch: SaveEpoch,
    ) -> Result<SaveSummary> {
        let bodies: Vec<CatalogBody> = catalog::load_catalog(catalog_path)?;
        let catalog_len = bodies.len();
        let selection = selection::select(bodies, &self.config.selection);

        let save = save::generate_save(source, selection, epoch, &self.config.save)
            .await
            .context("Ephemeris lookup failed")?;
        save.save(output)?;

        let summary = SaveSummary {
            catalog: catalog_len,
            sun_orbiting: save.sun_orbiting.len(),
            satellites: save.satellites.len(),
            small_bodies: save.small_bodies.len(),
            epoch: save.epoch,
        };
        tracing::info!(
            "Epoch used: {} (UTC), JD={:.8} (TDB)",
            summary.epoch.utc_label, summary.epoch.jd_tdb
        );
        Ok(summary)
    }
}
