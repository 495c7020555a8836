//! JPL Horizons osculating-elements client
//!
//! One `EPHEM_TYPE=ELEMENTS` request per body at a single epoch. The reply
//! is JSON wrapping a plain-text report; the elements are the first CSV row
//! between `$$SOE` and `$$EOE`, with column names taken from the header line
//! that starts the table.

use async_trait::async_trait;
use serde::Deserialize;

use orrery_core::constants::SUN_NAIF_ID;
use orrery_core::OrbitalElements;

use crate::config::ServiceConfig;
use crate::error::{EphemerisError, ServiceError};
use crate::http::HttpService;

pub const HORIZONS_API_URL: &str = "https://ssd.jpl.nasa.gov/api/horizons.api";

/// Numeric id that resolves Halley when its designation is ambiguous
pub const HALLEY_NAIF_ID: &str = "90000030";

/// Numbered asteroids stop well below this; larger values are SPK ids
pub const MAX_NUMBERED_ASTEROID: u64 = 875_150;

const SERVICE: &str = "Horizons";

/// Substrings Horizons uses when a name matches several objects
const AMBIGUITY_MARKERS: [&str; 3] = [
    "Multiple major-bodies match",
    "Matching small-bodies",
    "Ambiguous target name",
];

/// What to look up
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Numeric NAIF/Horizons identifier
    Id(String),
    /// Small-body designation
    SmallBody(String),
}

impl Target {
    pub fn label(&self) -> &str {
        match self {
            Target::Id(id) | Target::SmallBody(id) => id,
        }
    }

    /// `COMMAND` value; small bodies get the trailing `;` designation marker
    pub fn command(&self) -> String {
        match self {
            Target::Id(id) => format!("'{}'", id),
            Target::SmallBody(des) => format!("'{};'", des),
        }
    }

    /// Purely numeric designations must be plausible asteroid numbers
    pub fn check(&self) -> Result<(), EphemerisError> {
        if let Target::SmallBody(des) = self {
            if !des.is_empty() && des.bytes().all(|b| b.is_ascii_digit()) {
                let too_large = des.parse::<u64>().map_or(true, |n| n > MAX_NUMBERED_ASTEROID);
                if too_large {
                    return Err(EphemerisError::SuspiciousSmallBodyId(des.clone()));
                }
            }
        }
        Ok(())
    }

    /// Comet 1P comes back ambiguous (one match per apparition)
    pub fn is_halley(&self) -> bool {
        match self {
            Target::SmallBody(des) => {
                let des = des.trim().to_ascii_uppercase();
                des == "1P" || des == "1P/HALLEY"
            }
            Target::Id(_) => false,
        }
    }
}

/// Body the elements are relative to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Center {
    Sun,
    Body(String),
}

impl Center {
    /// `CENTER` value: body center of the given body
    pub fn code(&self) -> String {
        match self {
            Center::Sun => format!("'500@{}'", SUN_NAIF_ID),
            Center::Body(id) => format!("'500@{}'", id),
        }
    }
}

/// Elements of `target` about `center` at a TDB Julian date
#[derive(Clone, Debug, PartialEq)]
pub struct ElementsQuery {
    pub target: Target,
    pub center: Center,
    pub jd_tdb: f64,
}

impl ElementsQuery {
    pub fn new(target: Target, center: Center, jd_tdb: f64) -> Self {
        Self { target, center, jd_tdb }
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("format", "json".to_string()),
            ("COMMAND", self.target.command()),
            ("OBJ_DATA", "'YES'".to_string()),
            ("MAKE_EPHEM", "'YES'".to_string()),
            ("EPHEM_TYPE", "'ELEMENTS'".to_string()),
            ("CENTER", self.center.code()),
            ("TLIST", format!("'{:.9}'", self.jd_tdb)),
            ("TLIST_TYPE", "'JD'".to_string()),
            ("REF_PLANE", "'ECLIPTIC'".to_string()),
            ("REF_SYSTEM", "'ICRF'".to_string()),
            ("OUT_UNITS", "'AU-D'".to_string()),
            ("CSV_FORMAT", "'YES'".to_string()),
        ]
    }
}

/// Elements plus the physical radius when the report carries one
#[derive(Clone, Debug, PartialEq)]
pub struct EphemerisReply {
    pub elements: OrbitalElements,
    pub radius_km: Option<f64>,
}

/// Anything that can answer an elements query
#[async_trait]
pub trait EphemerisSource: Send + Sync {
    async fn elements(&self, query: &ElementsQuery) -> Result<EphemerisReply, EphemerisError>;
}

#[derive(Debug, Deserialize)]
struct HorizonsEnvelope {
    result: Option<String>,
    error: Option<String>,
}

/// Live Horizons API client
pub struct HorizonsClient {
    service: HttpService,
}

impl HorizonsClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self { service: HttpService::new(SERVICE, config.horizons_url.clone(), config)? })
    }
}

#[async_trait]
impl EphemerisSource for HorizonsClient {
    async fn elements(&self, query: &ElementsQuery) -> Result<EphemerisReply, EphemerisError> {
        tracing::debug!("Horizons elements for {} about {:?}", query.target.label(), query.center);
        let body = self.service.get_text(&query.to_params()).await?;
        parse_elements_response(&body, query.target.label())
    }
}

/// Unwrap the JSON envelope and parse the report inside
pub fn parse_elements_response(json: &str, target: &str) -> Result<EphemerisReply, EphemerisError> {
    let envelope: HorizonsEnvelope = serde_json::from_str(json)
        .map_err(|e| ServiceError::Malformed { service: SERVICE, detail: e.to_string() })?;

    if let Some(message) = envelope.error {
        if is_ambiguous(&message) {
            return Err(EphemerisError::AmbiguousTarget(target.to_string()));
        }
        return Err(ServiceError::Remote { service: SERVICE, message }.into());
    }

    let report = envelope.result.ok_or_else(|| ServiceError::Malformed {
        service: SERVICE,
        detail: "missing result".to_string(),
    })?;
    parse_elements_report(&report, target)
}

fn is_ambiguous(text: &str) -> bool {
    AMBIGUITY_MARKERS.iter().any(|m| text.contains(m))
}

/// Parse the plain-text elements report
pub fn parse_elements_report(report: &str, target: &str) -> Result<EphemerisReply, EphemerisError> {
    let Some(soe) = report.find("$$SOE") else {
        if is_ambiguous(report) {
            return Err(EphemerisError::AmbiguousTarget(target.to_string()));
        }
        let detail = report.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("empty report");
        return Err(EphemerisError::NoEphemeris {
            target: target.to_string(),
            detail: detail.trim().to_string(),
        });
    };

    let (preamble, table) = report.split_at(soe);
    let header = preamble
        .lines()
        .rev()
        .find(|l| l.contains("JDTDB"))
        .ok_or_else(|| EphemerisError::NoEphemeris {
            target: target.to_string(),
            detail: "no column header before $$SOE".to_string(),
        })?;
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();

    let row = table
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|l| !l.is_empty())
        .filter(|l| !l.starts_with("$$EOE"))
        .ok_or_else(|| EphemerisError::NoEphemeris {
            target: target.to_string(),
            detail: "empty ephemeris table".to_string(),
        })?;
    let values: Vec<&str> = row.split(',').map(str::trim).collect();

    let value = |column: &'static str| -> Result<f64, EphemerisError> {
        columns
            .iter()
            .position(|c| *c == column)
            .and_then(|i| values.get(i))
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .ok_or(EphemerisError::MissingElement { target: target.to_string(), column })
    };

    let elements = OrbitalElements {
        a_au: value("A")?,
        e: value("EC")?,
        i_deg: value("IN")?,
        omega_big_deg: value("OM")?,
        omega_small_deg: value("W")?,
        m_deg: value("MA")?,
        period_days: value("PR")?,
    };

    Ok(EphemerisReply { elements, radius_km: parse_radius_km(preamble) })
}

/// Physical radius from the object data block (`RAD=` for small bodies,
/// `Mean Radius (km) =` for major bodies)
pub fn parse_radius_km(text: &str) -> Option<f64> {
    ["RAD=", "Mean Radius (km) ="]
        .iter()
        .find_map(|key| text.find(key).and_then(|i| leading_number(&text[i + key.len()..])))
}

fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let end = s.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(s.len());
    s[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CERES_REPORT: &str = "\
*******************************************************************************
JPL/HORIZONS                      1 Ceres (A801 AA)          2025-Jan-01 00:00:00
Rec #:       1 (+COV) Soln.date: 2024-Jun-21_14:05:38   # obs: 1150 (1995-2024)

  Asteroid physical parameters (km, seconds, rotational period in hours):
   GM= 62.6284             RAD= 469.7              ROTPER= 9.07417
   H= 3.34                 G= .120                 B-V= .713
*******************************************************************************
            JDTDB,            Calendar Date (TDB),                     EC,                     QR,                     IN,                     OM,                      W,                     Tp,                      N,                     MA,                     TA,                      A,                     AD,                     PR,
**************************************************************************************************************************************************************************************************************************************************************************************************************************************************************************
$$SOE
2460676.500000000, A.D. 2025-Jan-01 00:00:00.0000,  7.949814566267589E-02,  2.549215498498735E+00,  1.058766468683958E+01,  8.024935655839508E+01,  7.339402613418834E+01,  2.461606853099391E+06,  2.141148770398549E-01,  1.608307458014434E+02,  1.650046003823542E+02,  2.769378050626095E+00,  2.989540602753455E+00,  1.681339290938010E+03,
$$EOE
*******************************************************************************
";

    fn envelope(report: &str) -> String {
        serde_json::json!({
            "signature": { "source": "NASA/JPL Horizons API", "version": "1.2" },
            "result": report,
        })
        .to_string()
    }

    #[test]
    fn test_parse_ceres() {
        let reply = parse_elements_response(&envelope(CERES_REPORT), "1").unwrap();
        let el = &reply.elements;
        assert!((el.a_au - 2.769378050626095).abs() < 1e-12);
        assert!((el.e - 0.07949814566267589).abs() < 1e-12);
        assert!((el.i_deg - 10.58766468683958).abs() < 1e-9);
        assert!((el.omega_big_deg - 80.24935655839508).abs() < 1e-9);
        assert!((el.omega_small_deg - 73.39402613418834).abs() < 1e-9);
        assert!((el.m_deg - 160.8307458014434).abs() < 1e-9);
        assert!((el.period_days - 1681.33929093801).abs() < 1e-6);
        assert_eq!(reply.radius_km, Some(469.7));
    }

    #[test]
    fn test_major_body_radius() {
        let text = " Vol. Mean Radius (km) = 6371.01+-0.02   Mass x10^24 (kg)= 5.97219+-0.0006";
        assert_eq!(parse_radius_km(text), Some(6371.01));
        assert_eq!(parse_radius_km("RAD= n.a."), None);
        assert_eq!(parse_radius_km("nothing here"), None);
    }

    #[test]
    fn test_ambiguous_report() {
        let report = "\
 Multiple major-bodies match string \"1P*\"
  ID#      Name                               Designation  IAU/aliases/other
  -------  ---------------------------------- -----------  -------------------
";
        let err = parse_elements_response(&envelope(report), "1P").unwrap_err();
        assert!(matches!(err, EphemerisError::AmbiguousTarget(t) if t == "1P"));
    }

    #[test]
    fn test_ambiguous_error_field() {
        let json = r#"{"error": "Ambiguous target name; provide unique id"}"#;
        let err = parse_elements_response(json, "1P/Halley").unwrap_err();
        assert!(matches!(err, EphemerisError::AmbiguousTarget(_)));
    }

    #[test]
    fn test_remote_error() {
        let json = r#"{"error": "Cannot interpret date"}"#;
        let err = parse_elements_response(json, "499").unwrap_err();
        assert!(matches!(err, EphemerisError::Service(ServiceError::Remote { .. })));
    }

    #[test]
    fn test_no_table() {
        let err = parse_elements_report("No ephemeris for target \"Foo\" prior to A.D. 1600\n", "Foo").unwrap_err();
        assert!(matches!(err, EphemerisError::NoEphemeris { detail, .. } if detail.starts_with("No ephemeris")));
    }

    #[test]
    fn test_missing_column() {
        let report = CERES_REPORT.replace("PR,\n", "XX,\n");
        let err = parse_elements_report(&report, "1").unwrap_err();
        assert!(matches!(err, EphemerisError::MissingElement { column: "PR", .. }));
    }

    #[test]
    fn test_query_params() {
        let query = ElementsQuery::new(Target::Id("301".into()), Center::Body("399".into()), 2460676.5);
        let params = query.to_params();
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("format"), Some("json"));
        assert_eq!(get("COMMAND"), Some("'301'"));
        assert_eq!(get("CENTER"), Some("'500@399'"));
        assert_eq!(get("EPHEM_TYPE"), Some("'ELEMENTS'"));
        assert_eq!(get("TLIST"), Some("'2460676.500000000'"));
        assert_eq!(get("REF_PLANE"), Some("'ECLIPTIC'"));
        assert_eq!(get("OUT_UNITS"), Some("'AU-D'"));

        let sun = ElementsQuery::new(Target::SmallBody("67P".into()), Center::Sun, 2460676.5);
        let params = sun.to_params();
        assert!(params.contains(&("COMMAND", "'67P;'".to_string())));
        assert!(params.contains(&("CENTER", "'500@10'".to_string())));
    }

    #[test]
    fn test_small_body_id_sanity() {
        assert!(Target::SmallBody("875150".into()).check().is_ok());
        assert!(Target::SmallBody("2000001".into()).check().is_err());
        assert!(Target::SmallBody("67P".into()).check().is_ok());
        assert!(Target::Id("2000001".into()).check().is_ok());
    }

    #[test]
    fn test_halley_detection() {
        assert!(Target::SmallBody("1P".into()).is_halley());
        assert!(Target::SmallBody("1p/Halley".into()).is_halley());
        assert!(!Target::SmallBody("2P".into()).is_halley());
        assert!(!Target::Id("1P".into()).is_halley());
    }
}
