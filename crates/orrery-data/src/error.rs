//! Error types for the data pipeline stages

use thiserror::Error;

/// Errors reading or writing the binary starfield
#[derive(Error, Debug)]
pub enum StarfieldError {
    #[error("Bad starfield header: expected 'STAR', found {0:?}")]
    BadMagic([u8; 4]),

    #[error("Unsupported starfield version: {0}")]
    UnsupportedVersion(i32),

    #[error("Invalid star count in header: {0}")]
    InvalidCount(i32),

    #[error("Starfield payload is {found} bytes, expected {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Too many stars for an i32 count: {0}")]
    TooManyStars(usize),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors converting or parsing body catalog rows
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Unknown body kind: {0:?}")]
    UnknownKind(String),

    #[error("Unknown id type: {0:?}")]
    UnknownIdType(String),

    #[error("Invalid {field} value: {value:?}")]
    InvalidField { field: &'static str, value: String },

    #[error("Row has no id")]
    MissingId,

    #[error("Catalog row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors talking to a remote astronomy service
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Status { service: &'static str, status: u16, body: String },

    #[error("Malformed {service} response: {detail}")]
    Malformed { service: &'static str, detail: String },

    #[error("{service} reported an error: {message}")]
    Remote { service: &'static str, message: String },
}

impl ServiceError {
    /// Transport failures, throttling and server errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ServiceError::Status { status, .. } => *status == 429 || *status >= 500,
            ServiceError::Malformed { .. } | ServiceError::Remote { .. } => false,
        }
    }
}

/// Errors resolving orbital elements for a selected body
#[derive(Error, Debug)]
pub enum EphemerisError {
    #[error("Ambiguous target name {0:?}; provide a unique id")]
    AmbiguousTarget(String),

    #[error("No ephemeris for target {target:?}: {detail}")]
    NoEphemeris { target: String, detail: String },

    #[error("Suspicious small-body id {0:?} (too large); is it an SPK id instead of the IAU number?")]
    SuspiciousSmallBodyId(String),

    #[error("Moon {0:?} has no parent id to orbit")]
    MissingParent(String),

    #[error("Element {column} missing or invalid for {target:?}")]
    MissingElement { target: String, column: &'static str },

    #[error("Lookup for {body:?} failed: {source}")]
    Body {
        body: String,
        #[source]
        source: Box<EphemerisError>,
    },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl EphemerisError {
    /// Attach the display name of the body whose lookup failed
    pub fn for_body(self, body: &str) -> Self {
        EphemerisError::Body { body: body.to_string(), source: Box::new(self) }
    }

    /// The underlying error, without body annotations
    pub fn root(&self) -> &EphemerisError {
        match self {
            EphemerisError::Body { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retry_policy() {
        let throttled = ServiceError::Status { service: "SBDB", status: 429, body: String::new() };
        let unavailable = ServiceError::Status { service: "SBDB", status: 503, body: String::new() };
        let bad_request = ServiceError::Status { service: "SBDB", status: 400, body: String::new() };
        assert!(throttled.is_retryable());
        assert!(unavailable.is_retryable());
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn test_semantic_errors_are_not_retried() {
        let err = ServiceError::Remote { service: "Horizons", message: "no such object".into() };
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_body_annotation_keeps_root() {
        let err = EphemerisError::AmbiguousTarget("1P".into()).for_body("Halley");
        assert!(matches!(err.root(), EphemerisError::AmbiguousTarget(t) if t == "1P"));
        assert!(err.to_string().contains("Halley"));
    }
}
