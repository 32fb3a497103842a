// 🔁 Pipeline - explicit startup + one independent run per filter request
// AppContext is immutable after init and shared by reference across requests.

use crate::aggregate::{aggregate, AggregationPolicy, IndustryFilter};
use crate::boundary::{boundary_source_for, BoundarySource};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::filings::{load_filings, FilingRecord};
use crate::reference::ReferenceData;
use crate::scale::{scale_dataset, CountyDataset};
use tracing::info;

/// Reference tables + filing records, loaded once per process
#[derive(Debug, Clone)]
pub struct AppContext {
    pub reference: ReferenceData,
    pub filings: Vec<FilingRecord>,
}

impl AppContext {
    /// Load everything the configuration points at. Fails without partial state.
    pub fn init(config: &PipelineConfig) -> Result<Self> {
        let source = boundary_source_for(&config.boundary)?;
        Self::init_with_source(config, source.as_ref())
    }

    /// Same as [`init`](Self::init) with an injected boundary source
    pub fn init_with_source(config: &PipelineConfig, boundary_source: &dyn BoundarySource) -> Result<Self> {
        let reference = ReferenceData::load(config, boundary_source)?;
        let filings = load_filings(&config.data.filings)?;
        info!(
            filings = filings.len(),
            zips = reference.crosswalk.len(),
            boundaries = reference.boundaries.len(),
            "pipeline context ready"
        );
        Ok(AppContext { reference, filings })
    }

    pub fn new(reference: ReferenceData, filings: Vec<FilingRecord>) -> Self {
        AppContext { reference, filings }
    }

    /// One filter request: aggregate then scale. Pure; no I/O.
    pub fn run(&self, filter: &IndustryFilter, policy: AggregationPolicy) -> CountyDataset {
        run_pipeline(&self.filings, &self.reference, filter, policy)
    }
}

/// Aggregate and scale `filings` against already-loaded reference data
pub fn run_pipeline(
    filings: &[FilingRecord],
    reference: &ReferenceData,
    filter: &IndustryFilter,
    policy: AggregationPolicy,
) -> CountyDataset {
    let aggregation = aggregate(filings, &reference.crosswalk, &reference.county_names, filter);
    scale_dataset(aggregation, policy)
}
