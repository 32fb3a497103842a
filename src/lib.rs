// County Plans - Core Library
// ZIP → county resolution, per-county filing aggregation and colour scales

pub mod aggregate;
pub mod boundary;
pub mod config;
pub mod crosswalk;
pub mod db;
pub mod error;
pub mod filings;
pub mod pipeline;
pub mod reference;
pub mod scale;
pub mod taxonomy;
pub mod zip;

// Re-export commonly used types
pub use aggregate::{
    aggregate, AggregatedCounty, Aggregation, AggregationPolicy, IndustryFilter, UnresolvedSummary,
};
pub use boundary::{
    boundary_source_for, BoundarySource, CachedBoundarySource, CountyBoundaries, FileBoundarySource,
};
#[cfg(feature = "http")]
pub use boundary::HttpBoundarySource;
pub use config::{ConfigError, PipelineConfig};
pub use crosswalk::{resolve_crosswalk, CrosswalkEntry, ZipCountyMap};
pub use db::BoundaryCache;
pub use error::PipelineError;
pub use filings::{load_filings, FilingRecord};
pub use pipeline::{run_pipeline, AppContext};
pub use reference::{CountyNames, ReferenceData, StateCenter};
pub use scale::{log_scale, scale_dataset, ColorScale, CountyDataset, NICE_TICKS};
pub use taxonomy::{IndustryOption, IndustryTaxonomy};
pub use zip::{industry_prefix, normalize_zip};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
