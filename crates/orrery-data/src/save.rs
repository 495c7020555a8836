//! Save file generation: ephemeris resolution and text serialization
//!
//! Layout:
//! ```text
//! 0
//! # Epoch UTC: 2025-01-01 00:00:00.000
//! <n>                         planets and dwarfs, about the Sun
//! 0.0 0.0 0.0 r R G B a e i Om w M P name
//! <n>                         moons, about their parent
//! 0.0 0.0 0.0 r R G B a e i Om w M P name parent
//! <n>                         everything else, about the Sun
//! 0.0 0.0 0.0 r R G B a e i Om w M P name
//! ```

use futures_util::stream::{self, StreamExt, TryStreamExt};
use hifitime::Epoch;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use anyhow::{Context, Result};

use orrery_core::{km_to_units, OrbitalElements};

use crate::catalog::{CatalogBody, IdType, Tier};
use crate::config::SaveConfig;
use crate::error::EphemerisError;
use crate::horizons::{Center, ElementsQuery, EphemerisSource, Target, HALLEY_NAIF_ID};
use crate::selection::Selection;

/// The instant all elements are sampled at
#[derive(Clone, Debug, PartialEq)]
pub struct SaveEpoch {
    /// Julian date, TDB scale (what the ephemeris service expects)
    pub jd_tdb: f64,
    /// `YYYY-MM-DD HH:MM:SS.mmm` in UTC, for the header comment
    pub utc_label: String,
}

impl SaveEpoch {
    pub fn from_epoch(epoch: Epoch) -> Self {
        let (y, mo, d, h, mi, s, ns) = epoch.to_gregorian_utc();
        Self {
            jd_tdb: epoch.to_jde_tdb_days(),
            utc_label: format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
                y, mo, d, h, mi, s, ns / 1_000_000
            ),
        }
    }

    pub fn now() -> Result<Self> {
        let epoch = Epoch::now().map_err(|e| anyhow::anyhow!("System clock unavailable: {}", e))?;
        Ok(Self::from_epoch(epoch))
    }

    /// Any format hifitime accepts, e.g. `2025-01-01T00:00:00 UTC`
    pub fn parse(s: &str) -> Result<Self> {
        let epoch = Epoch::from_str(s.trim())
            .map_err(|e| anyhow::anyhow!("Invalid epoch {:?}: {}", s, e))?;
        Ok(Self::from_epoch(epoch))
    }
}

/// A catalog body with its resolved orbit, ready to be written
#[derive(Clone, Debug, PartialEq)]
pub struct SelectedBody {
    pub body: CatalogBody,
    pub elements: OrbitalElements,
    /// Semi-major axis in engine units
    pub a_units: f64,
    pub radius_units: f64,
}

/// Target and center for a body's lookup
pub fn lookup_for(body: &CatalogBody) -> Result<(Target, Center), EphemerisError> {
    if body.kind.tier() == Tier::Satellite {
        let parent = body
            .parent_id
            .clone()
            .ok_or_else(|| EphemerisError::MissingParent(body.name.clone()))?;
        return Ok((Target::Id(body.id.clone()), Center::Body(parent)));
    }
    let target = match body.id_type {
        IdType::Id => Target::Id(body.id.clone()),
        IdType::SmallBody => Target::SmallBody(body.id.clone()),
    };
    Ok((target, Center::Sun))
}

/// Fetch elements for one body and scale them to engine units
pub async fn resolve_body<S: EphemerisSource>(
    source: &S,
    body: CatalogBody,
    jd_tdb: f64,
    km_per_unit: f64,
) -> Result<SelectedBody, EphemerisError> {
    let (target, center) = lookup_for(&body)?;
    target.check()?;

    let query = ElementsQuery::new(target, center, jd_tdb);
    let reply = match source.elements(&query).await {
        Err(EphemerisError::AmbiguousTarget(_)) if query.target.is_halley() => {
            tracing::warn!("{} is ambiguous, retrying as id {}", query.target.label(), HALLEY_NAIF_ID);
            let retry = ElementsQuery::new(Target::Id(HALLEY_NAIF_ID.to_string()), Center::Sun, jd_tdb);
            source.elements(&retry).await?
        }
        other => other?,
    };

    if !reply.elements.is_finite() {
        return Err(EphemerisError::NoEphemeris {
            target: query.target.label().to_string(),
            detail: "non-finite orbital elements".into(),
        });
    }
    if !reply.elements.is_closed() {
        tracing::warn!("{} has an open orbit (e = {})", body.name, reply.elements.e);
    }

    let catalog_radius_km = body.radius_km.unwrap_or(0.0);
    let radius_km = if body.kind.tier() == Tier::SmallBody && body.id_type == IdType::SmallBody {
        match reply.radius_km.filter(|r| *r > 0.0) {
            Some(r) => r,
            None => {
                tracing::warn!(
                    "No radius from Horizons for {}; using catalog radius {} km",
                    body.name, catalog_radius_km
                );
                catalog_radius_km
            }
        }
    } else {
        catalog_radius_km
    };

    Ok(SelectedBody {
        a_units: reply.elements.semi_major_axis_units(km_per_unit),
        radius_units: km_to_units(radius_km, km_per_unit),
        elements: reply.elements,
        body,
    })
}

/// Resolved bodies per section, in catalog order
#[derive(Clone, Debug, PartialEq)]
pub struct SaveFile {
    pub epoch: SaveEpoch,
    pub sun_orbiting: Vec<SelectedBody>,
    pub satellites: Vec<SelectedBody>,
    pub small_bodies: Vec<SelectedBody>,
}

impl SaveFile {
    pub fn len(&self) -> usize {
        self.sun_orbiting.len() + self.satellites.len() + self.small_bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_to<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "0")?;
        writeln!(w, "# Epoch UTC: {}", self.epoch.utc_label)?;
        for section in [&self.sun_orbiting, &self.satellites, &self.small_bodies] {
            writeln!(w, "{}", section.len())?;
            for body in section {
                writeln!(w, "{}", format_record(body))?;
            }
        }
        w.flush()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create save file: {}", path.display()))?;
        self.write_to(std::io::BufWriter::new(file))
            .with_context(|| format!("Failed to write save file: {}", path.display()))?;
        tracing::info!("Wrote {:?} ({} bodies)", path, self.len());
        Ok(())
    }
}

/// Names become one whitespace-free token; the engine splits on spaces
pub fn save_token(name: &str) -> String {
    let token = name.split_whitespace().collect::<Vec<_>>().join("_");
    if token.is_empty() {
        "unnamed".to_string()
    } else {
        token
    }
}

/// One body line (without newline)
pub fn format_record(selected: &SelectedBody) -> String {
    let b = &selected.body;
    let el = &selected.elements;
    let [r, g, bl] = b.color;
    let mut line = format!(
        "0.0 0.0 0.0 {:.6} {} {} {} {:.6} {:.8} {:.6} {:.6} {:.6} {:.6} {:.8} {}",
        selected.radius_units,
        r, g, bl,
        selected.a_units,
        el.e,
        el.i_deg,
        el.omega_big_deg,
        el.omega_small_deg,
        el.m_deg,
        el.period_days,
        save_token(&b.name),
    );
    if b.kind.is_moon() {
        let parent = b.parent_name.as_deref().or(b.parent_id.as_deref()).unwrap_or_default();
        line.push(' ');
        line.push_str(&save_token(parent));
    }
    line
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:30}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Resolve every selected body with a bounded number of requests in flight.
///
/// Output order is catalog order regardless of completion order. The first
/// failed lookup aborts the run.
pub async fn generate_save<S: EphemerisSource>(
    source: &S,
    selection: Selection,
    epoch: SaveEpoch,
    config: &SaveConfig,
) -> Result<SaveFile, EphemerisError> {
    let total = selection.len();
    let workers = config.fetch_workers.max(1);
    let km_per_unit = config.km_per_unit;
    let jd_tdb = epoch.jd_tdb;
    tracing::info!("Resolving {} bodies at JD {:.8} TDB ({} workers)", total, jd_tdb, workers);

    let Selection { sun_orbiting, satellites, small_bodies } = selection;
    let sizes = (sun_orbiting.len(), satellites.len());
    let ordered = sun_orbiting.into_iter().chain(satellites).chain(small_bodies);

    let pb = progress_bar(total);
    let resolved: Result<Vec<SelectedBody>, EphemerisError> = stream::iter(ordered)
        .map(|body| async move {
            let name = body.name.clone();
            resolve_body(source, body, jd_tdb, km_per_unit)
                .await
                .map_err(|e| e.for_body(&name))
        })
        .buffered(workers)
        .inspect(|_| pb.inc(1))
        .try_collect()
        .await;
    pb.finish_and_clear();

    let mut resolved = resolved?;
    let small_bodies = resolved.split_off(sizes.0 + sizes.1);
    let satellites = resolved.split_off(sizes.0);

    Ok(SaveFile {
        epoch,
        sun_orbiting: resolved,
        satellites,
        small_bodies,
    })
}
