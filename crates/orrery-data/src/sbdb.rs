//! JPL Small-Body Database query client
//!
//! Each population (main belt, TNOs, centaurs, NEOs, comets) is one query
//! returning `{"fields": [...], "data": [[...], ...]}` with positional rows.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::catalog::{BodyKind, CatalogBody, IdType};
use crate::classify::{classify, SmallBodySignals};
use crate::config::{CatalogConfig, ServiceConfig};
use crate::error::ServiceError;
use crate::http::HttpService;

pub const SBDB_QUERY_URL: &str = "https://ssd-api.jpl.nasa.gov/sbdb_query.api";

/// Columns requested for every population
pub const SBDB_FIELDS: &str = "full_name,pdes,kind,class,neo,pha,H,diameter,albedo";

const SERVICE: &str = "SBDB";

/// One small-body row, keyed by field name
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SbdbRecord {
    pub full_name: Option<String>,
    pub pdes: Option<String>,
    pub kind: Option<String>,
    pub class: Option<String>,
    pub neo: Option<String>,
    pub h: Option<f64>,
    pub diameter_km: Option<f64>,
}

impl SbdbRecord {
    pub fn signals(&self) -> SmallBodySignals {
        SmallBodySignals::new(self.kind.as_deref(), self.class.as_deref(), self.neo.as_deref())
    }

    pub fn classify(&self) -> BodyKind {
        classify(&self.signals())
    }

    /// Catalog row keyed by the primary designation; `None` without one
    pub fn to_catalog_body(&self) -> Option<CatalogBody> {
        let pdes = self.pdes.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        let kind = self.classify();
        let name = self.full_name.as_deref().unwrap_or_default().trim();

        let mut body = CatalogBody::new(kind, pdes, IdType::SmallBody, name);
        body.radius_km = self.diameter_km.map(|d| d / 2.0);
        body.h = self.h;
        Some(body)
    }
}

#[derive(Debug, Deserialize)]
struct SbdbResponse {
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
    message: Option<String>,
}

static NULL: Value = Value::Null;

fn cell(row: &[Value], idx: Option<usize>) -> &Value {
    idx.and_then(|i| row.get(i)).unwrap_or(&NULL)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers arrive as strings with `full-prec`; junk becomes `None`
fn number(value: &Value) -> Option<f64> {
    let v = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// Decode a query response into records
pub fn parse_response(json: &str) -> Result<Vec<SbdbRecord>, ServiceError> {
    let response: SbdbResponse = serde_json::from_str(json)
        .map_err(|e| ServiceError::Malformed { service: SERVICE, detail: e.to_string() })?;

    if response.fields.is_empty() {
        if let Some(message) = response.message {
            return Err(ServiceError::Remote { service: SERVICE, message });
        }
    }

    let column = |name: &str| response.fields.iter().position(|f| f == name);
    let full_name = column("full_name");
    let pdes = column("pdes");
    let kind = column("kind");
    let class = column("class");
    let neo = column("neo");
    let h = column("H");
    let diameter = column("diameter");

    let records = response
        .data
        .iter()
        .map(|row| {
            SbdbRecord {
                full_name: text(cell(row, full_name)),
                pdes: text(cell(row, pdes)),
                kind: text(cell(row, kind)),
                class: text(cell(row, class)),
                neo: text(cell(row, neo)),
                h: number(cell(row, h)),
                diameter_km: number(cell(row, diameter)),
            }
        })
        .collect();
    Ok(records)
}

/// `diameter >= min AND diameter defined`
pub fn diameter_at_least(min_km: f64) -> String {
    serde_json::json!({ "AND": [format!("diameter|GE|{}", min_km), "diameter|DF"] }).to_string()
}

/// `H <= max AND H defined`
pub fn abs_mag_at_most(max_h: f64) -> String {
    serde_json::json!({ "AND": [format!("H|LE|{}", max_h), "H|DF"] }).to_string()
}

/// A named query against the database
#[derive(Clone, Debug, PartialEq)]
pub struct Population {
    pub name: &'static str,
    pub params: Vec<(&'static str, String)>,
}

impl Population {
    fn new(name: &'static str, filters: &[(&'static str, &str)], cdata: String, limit: usize) -> Self {
        let mut params = vec![("fields", SBDB_FIELDS.to_string())];
        params.extend(filters.iter().map(|(k, v)| (*k, v.to_string())));
        params.push(("sb-cdata", cdata));
        params.push(("limit", limit.to_string()));
        params.push(("full-prec", "true".to_string()));
        Self { name, params }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
    }
}

/// The five populations fetched for the catalog, in fetch order
pub fn populations(config: &CatalogConfig) -> Vec<Population> {
    vec![
        Population::new(
            "asteroids",
            &[("sb-kind", "a"), ("sb-class", "IMB,MBA,OMB,TJN,AST")],
            diameter_at_least(config.asteroid_min_diam_km),
            config.asteroid_max_results,
        ),
        Population::new(
            "TNOs",
            &[("sb-kind", "a"), ("sb-class", "TNO")],
            diameter_at_least(config.tno_min_diam_km),
            config.tno_max_results,
        ),
        Population::new(
            "centaurs",
            &[("sb-kind", "a"), ("sb-class", "CEN")],
            diameter_at_least(config.centaur_min_diam_km),
            config.centaur_max_results,
        ),
        Population::new(
            "NEOs",
            &[("sb-kind", "a"), ("sb-group", "neo")],
            abs_mag_at_most(config.neo_max_h),
            config.neo_max_results,
        ),
        Population::new(
            "comets",
            &[("sb-kind", "c")],
            diameter_at_least(config.comet_min_diam_km),
            config.comet_max_results,
        ),
    ]
}

/// Anything that can answer a population query
#[async_trait]
pub trait SmallBodySource: Send + Sync {
    async fn query(&self, population: &Population) -> Result<Vec<SbdbRecord>, ServiceError>;
}

/// Live database client
pub struct SbdbClient {
    service: HttpService,
}

impl SbdbClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self { service: HttpService::new(SERVICE, config.sbdb_url.clone(), config)? })
    }
}

#[async_trait]
impl SmallBodySource for SbdbClient {
    async fn query(&self, population: &Population) -> Result<Vec<SbdbRecord>, ServiceError> {
        let body = self.service.get_text(&population.params).await?;
        parse_response(&body)
    }
}

/// Fetch every population and convert the rows to catalog bodies.
///
/// Rows without a designation are dropped; duplicates across populations
/// are left for the merge step.
pub async fn fetch_small_bodies<S: SmallBodySource>(
    source: &S,
    config: &CatalogConfig,
) -> Result<Vec<CatalogBody>, ServiceError> {
    let mut bodies = Vec::new();
    for population in populations(config) {
        tracing::info!("Fetching {} from SBDB", population.name);
        let records = source.query(&population).await?;
        let fetched = records.len();
        bodies.extend(records.iter().filter_map(SbdbRecord::to_catalog_body));
        tracing::info!("  -> got {} rows for {}", fetched, population.name);
    }
    Ok(bodies)
}
