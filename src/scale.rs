// 🎨 Color-Scale Deriver - log-compressed values + "nice" tick labels
// Per-county counts are heavily right-skewed; colour by log10(n + 1) and
// label the bar with round raw values that fall inside the data's range.

use crate::aggregate::{AggregatedCounty, Aggregation, AggregationPolicy, UnresolvedSummary};
use serde::{Deserialize, Serialize};

/// Candidate raw values for colourbar ticks, ascending
pub const NICE_TICKS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 2500, 5000];

/// log10(value + 1): zero maps to zero, strictly increasing
pub fn log_scale(value: u64) -> f64 {
    (value as f64 + 1.0).log10()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    /// Tick positions in log space
    pub tick_values: Vec<f64>,
    /// Raw-value labels, parallel to `tick_values`
    pub tick_labels: Vec<String>,
    pub domain_min: f64,
    pub domain_max: f64,
    /// Raw metric range behind the domain
    pub count_min: u64,
    pub count_max: u64,
}

impl ColorScale {
    /// Scale for an empty selection: no ticks, zero domain
    pub fn empty() -> Self {
        ColorScale {
            tick_values: Vec::new(),
            tick_labels: Vec::new(),
            domain_min: 0.0,
            domain_max: 0.0,
            count_min: 0,
            count_max: 0,
        }
    }

    /// Derive domain and ticks from the raw per-county values
    pub fn derive(values: &[u64]) -> Self {
        let (Some(&count_min), Some(&count_max)) = (values.iter().min(), values.iter().max()) else {
            return Self::empty();
        };

        // log_scale is monotonic, so the log domain comes from the raw extremes
        let domain_min = log_scale(count_min);
        let domain_max = log_scale(count_max);

        let (tick_values, tick_labels): (Vec<f64>, Vec<String>) = NICE_TICKS
            .iter()
            .map(|&tick| (log_scale(tick), tick))
            .filter(|(position, _)| domain_min <= *position && *position <= domain_max)
            .map(|(position, tick)| (position, tick.to_string()))
            .unzip();

        ColorScale {
            tick_values,
            tick_labels,
            domain_min,
            domain_max,
            count_min,
            count_max,
        }
    }

    pub fn has_ticks(&self) -> bool {
        !self.tick_values.is_empty()
    }
}

/// Display-ready output handed to the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountyDataset {
    pub counties: Vec<AggregatedCounty>,
    pub scale: ColorScale,
    pub policy: AggregationPolicy,
    pub unresolved: UnresolvedSummary,
    pub records_matched: u64,
}

impl CountyDataset {
    /// True when the selection matched no county (distinct from a load error)
    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }
}

/// Attach log values to every county and derive the matching scale
pub fn scale_dataset(aggregation: Aggregation, policy: AggregationPolicy) -> CountyDataset {
    let Aggregation {
        mut counties,
        unresolved,
        records_matched,
    } = aggregation;

    let values: Vec<u64> = counties.iter().map(|c| policy.value_of(c)).collect();
    for (county, value) in counties.iter_mut().zip(&values) {
        county.log_scaled_value = log_scale(*value);
    }

    CountyDataset {
        scale: ColorScale::derive(&values),
        counties,
        policy,
        unresolved,
        records_matched,
    }
}
