//! Unified body catalog: model, CSV persistence, merge and deduplication
//!
//! Columns: `kind,id,id_type,name,parent_id,parent_name,radius_km,H,R,G,B,always_include`

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use anyhow::{Context, Result};

use crate::error::CatalogError;

/// Channel value used when a curated row leaves R, G or B blank
pub const DEFAULT_CHANNEL: u8 = 200;

/// Taxonomy of catalog bodies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Planet,
    Dwarf,
    Moon,
    IrregularMoon,
    Asteroid,
    Tno,
    Centaur,
    Neo,
    Comet,
    Sun,
}

impl BodyKind {
    pub fn all() -> &'static [BodyKind] {
        &[
            Self::Planet, Self::Dwarf, Self::Moon, Self::IrregularMoon, Self::Asteroid,
            Self::Tno, Self::Centaur, Self::Neo, Self::Comet, Self::Sun,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planet => "planet",
            Self::Dwarf => "dwarf",
            Self::Moon => "moon",
            Self::IrregularMoon => "irregular_moon",
            Self::Asteroid => "asteroid",
            Self::Tno => "tno",
            Self::Centaur => "centaur",
            Self::Neo => "neo",
            Self::Comet => "comet",
            Self::Sun => "sun",
        }
    }

    pub fn is_moon(&self) -> bool {
        matches!(self, Self::Moon | Self::IrregularMoon)
    }

    /// Save file section this kind is written to
    pub fn tier(&self) -> Tier {
        match self {
            Self::Planet | Self::Dwarf => Tier::SunOrbiting,
            Self::Moon | Self::IrregularMoon => Tier::Satellite,
            _ => Tier::SmallBody,
        }
    }

    /// Placeholder display color (RGB)
    pub fn default_color(&self) -> [u8; 3] {
        match self {
            Self::Planet => [200, 200, 200],
            Self::Dwarf => [220, 210, 190],
            Self::Moon => [200, 200, 200],
            Self::IrregularMoon => [190, 190, 190],
            Self::Asteroid => [200, 200, 200],
            Self::Tno => [220, 180, 220],
            Self::Centaur => [210, 180, 200],
            Self::Neo => [255, 220, 180],
            Self::Comet => [230, 230, 255],
            Self::Sun => [255, 245, 200],
        }
    }
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for BodyKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::all().iter()
            .copied()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| CatalogError::UnknownKind(s.to_string()))
    }
}

/// Hierarchy tier in the save file
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Planets and dwarfs, orbiting the Sun
    SunOrbiting,
    /// Moons, orbiting their parent
    Satellite,
    /// Everything else, orbiting the Sun
    SmallBody,
}

/// How the `id` column is interpreted by the ephemeris service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    /// Numeric NAIF/Horizons identifier
    #[default]
    #[serde(rename = "id")]
    Id,
    /// Small-body designation ("1", "433", "67P", ...)
    #[serde(rename = "smallbody")]
    SmallBody,
}

impl IdType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::SmallBody => "smallbody",
        }
    }
}

impl FromStr for IdType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "id" => Ok(Self::Id),
            "smallbody" => Ok(Self::SmallBody),
            _ => Err(CatalogError::UnknownIdType(s.to_string())),
        }
    }
}

/// Catalog identity; unique after merging
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BodyId {
    pub id: String,
    pub id_type: IdType,
}

/// One row of the unified catalog
#[derive(Clone, Debug, PartialEq)]
pub struct CatalogBody {
    pub kind: BodyKind,
    pub id: String,
    pub id_type: IdType,
    pub name: String,
    /// Only meaningful for moons
    pub parent_id: Option<String>,
    pub parent_name: Option<String>,
    /// `None` means unknown, not zero
    pub radius_km: Option<f64>,
    /// Absolute magnitude
    pub h: Option<f64>,
    pub color: [u8; 3],
    /// Manual override: include regardless of the policy
    pub always_include: bool,
}

impl CatalogBody {
    /// Minimal body with the kind's placeholder color
    pub fn new(kind: BodyKind, id: impl Into<String>, id_type: IdType, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            id_type,
            name: name.into(),
            parent_id: None,
            parent_name: None,
            radius_km: None,
            h: None,
            color: kind.default_color(),
            always_include: false,
        }
    }

    pub fn identity(&self) -> BodyId {
        BodyId { id: self.id.clone(), id_type: self.id_type }
    }

    /// Diameter in km; unknown radius counts as zero
    pub fn diameter_km(&self) -> f64 {
        2.0 * self.radius_km.unwrap_or(0.0)
    }
}

/// CSV shape of a catalog row; every column is text so blanks survive
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRow {
    pub kind: String,
    pub id: String,
    pub id_type: String,
    pub name: String,
    pub parent_id: String,
    pub parent_name: String,
    pub radius_km: String,
    #[serde(rename = "H")]
    pub h: String,
    #[serde(rename = "R")]
    pub r: String,
    #[serde(rename = "G")]
    pub g: String,
    #[serde(rename = "B")]
    pub b: String,
    pub always_include: String,
}

impl TryFrom<CatalogRow> for CatalogBody {
    type Error = CatalogError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let kind: BodyKind = row.kind.parse()?;
        let id = row.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogError::MissingId);
        }

        Ok(Self {
            kind,
            id,
            id_type: row.id_type.parse()?,
            name: row.name.trim().to_string(),
            parent_id: non_empty(&row.parent_id),
            parent_name: non_empty(&row.parent_name),
            radius_km: optional_number("radius_km", &row.radius_km)?,
            h: optional_number("H", &row.h)?,
            color: [
                channel("R", &row.r)?,
                channel("G", &row.g)?,
                channel("B", &row.b)?,
            ],
            always_include: is_truthy(&row.always_include),
        })
    }
}

impl From<&CatalogBody> for CatalogRow {
    fn from(body: &CatalogBody) -> Self {
        let number = |v: Option<f64>| v.map(|x| x.to_string()).unwrap_or_default();
        Self {
            kind: body.kind.as_str().to_string(),
            id: body.id.clone(),
            id_type: body.id_type.as_str().to_string(),
            name: body.name.clone(),
            parent_id: body.parent_id.clone().unwrap_or_default(),
            parent_name: body.parent_name.clone().unwrap_or_default(),
            radius_km: number(body.radius_km),
            h: number(body.h),
            r: body.color[0].to_string(),
            g: body.color[1].to_string(),
            b: body.color[2].to_string(),
            always_include: if body.always_include { "true".into() } else { String::new() },
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn optional_number(field: &'static str, s: &str) -> Result<Option<f64>, CatalogError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(CatalogError::InvalidField { field, value: s.to_string() }),
    }
}

fn channel(field: &'static str, s: &str) -> Result<u8, CatalogError> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(DEFAULT_CHANNEL);
    }
    s.parse::<u8>().map_err(|_| CatalogError::InvalidField { field, value: s.to_string() })
}

/// `1`, `true`, `yes`, `y` (any case) switch the override on
pub fn is_truthy(s: &str) -> bool {
    matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "y")
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(reader)
}

/// Read a catalog, failing on the first malformed row
pub fn read_catalog<R: Read>(reader: R) -> Result<Vec<CatalogBody>, CatalogError> {
    let mut bodies = Vec::new();
    for (i, result) in csv_reader(reader).deserialize::<CatalogRow>().enumerate() {
        let body = result
            .map_err(CatalogError::from)
            .and_then(CatalogBody::try_from)
            .map_err(|e| CatalogError::Row { row: i + 1, source: Box::new(e) })?;
        bodies.push(body);
    }
    Ok(bodies)
}

/// Read curated rows, skipping (and logging) malformed ones
pub fn read_manual_bodies<R: Read>(reader: R) -> Result<Vec<CatalogBody>, CatalogError> {
    let mut bodies = Vec::new();
    for (i, result) in csv_reader(reader).deserialize::<CatalogRow>().enumerate() {
        match result.map_err(CatalogError::from).and_then(CatalogBody::try_from) {
            Ok(body) => bodies.push(body),
            Err(e) => tracing::warn!("Skipping manual row {}: {}", i + 1, e),
        }
    }
    Ok(bodies)
}

pub fn write_catalog<W: Write>(writer: W, bodies: &[CatalogBody]) -> Result<(), CatalogError> {
    let mut w = csv::Writer::from_writer(writer);
    if bodies.is_empty() {
        w.write_record(CATALOG_COLUMNS)?;
    }
    for body in bodies {
        w.serialize(CatalogRow::from(body))?;
    }
    w.flush()?;
    Ok(())
}

/// Header of the catalog CSV
pub const CATALOG_COLUMNS: [&str; 12] = [
    "kind", "id", "id_type", "name", "parent_id", "parent_name",
    "radius_km", "H", "R", "G", "B", "always_include",
];

/// Load a catalog file (save generator input)
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogBody>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open catalog: {}", path.display()))?;
    let bodies = read_catalog(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;
    tracing::info!("Loaded {} catalog bodies from {:?}", bodies.len(), path);
    Ok(bodies)
}

/// Load the optional manual overrides; a missing file is not an error
pub fn load_manual_bodies(path: &Path) -> Result<Vec<CatalogBody>> {
    if !path.exists() {
        tracing::info!("No manual bodies file at {:?}", path);
        return Ok(Vec::new());
    }
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open manual bodies: {}", path.display()))?;
    let bodies = read_manual_bodies(std::io::BufReader::new(file))
        .with_context(|| format!("Failed to parse manual bodies: {}", path.display()))?;
    tracing::info!("Loaded {} manual bodies from {:?}", bodies.len(), path);
    Ok(bodies)
}

pub fn save_catalog(path: &Path, bodies: &[CatalogBody]) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create catalog: {}", path.display()))?;
    write_catalog(std::io::BufWriter::new(file), bodies)?;
    tracing::info!("Wrote catalog {:?} ({} rows)", path, bodies.len());
    Ok(())
}

/// Keep the first body seen for each (id, id_type)
pub fn deduplicate(bodies: impl IntoIterator<Item = CatalogBody>) -> Vec<CatalogBody> {
    let mut unique: IndexMap<BodyId, CatalogBody> = IndexMap::new();
    for body in bodies {
        unique.entry(body.identity()).or_insert(body);
    }
    unique.into_values().collect()
}

/// Manual rows first so they win any identity clash with fetched rows
pub fn merge_catalog(manual: Vec<CatalogBody>, small_bodies: Vec<CatalogBody>) -> Vec<CatalogBody> {
    let total = manual.len() + small_bodies.len();
    let merged = deduplicate(manual.into_iter().chain(small_bodies));
    if merged.len() < total {
        tracing::info!("Dropped {} duplicate catalog rows", total - merged.len());
    }
    merged
}
