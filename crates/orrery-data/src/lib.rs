pub mod catalog;
pub mod classify;
pub mod config;
pub mod error;
pub mod horizons;
pub mod http;
pub mod pipeline;
pub mod save;
pub mod sbdb;
pub mod selection;
pub mod starfield;
pub mod stars;

pub use catalog::{BodyKind, CatalogBody, IdType, Tier};
pub use config::PipelineConfig;
pub use error::{CatalogError, EphemerisError, ServiceError, StarfieldError};
pub use horizons::{EphemerisSource, HorizonsClient};
pub use pipeline::{CatalogSummary, DataPipeline, SaveSummary, StarfieldSummary};
pub use save::{SaveEpoch, SaveFile, SelectedBody};
pub use sbdb::{SbdbClient, SmallBodySource};
pub use selection::Selection;
pub use starfield::{CompiledStar, Starfield};
pub use stars::{generate_synthetic_stars, StarCatalog, StarRecord};
