// 📊 Filing Aggregator - filter, resolve, group by county
// Unresolved ZIPs are counted, never silently dropped.

use crate::crosswalk::ZipCountyMap;
use crate::filings::FilingRecord;
use crate::reference::CountyNames;
use crate::zip::{industry_prefix, is_well_formed, normalize_zip};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// ============================================================================
// INDUSTRY FILTER
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndustryFilter {
    /// No selection: keep every record
    #[default]
    All,

    /// Keep records whose 2-character code group is in the set
    Prefixes(BTreeSet<String>),
}

impl IndustryFilter {
    /// Build from selected codes or prefixes.
    ///
    /// An empty selection means no filter. Selected codes shorter than two
    /// characters contribute nothing, so a selection made only of such codes
    /// matches no records.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes: Vec<S> = codes.into_iter().collect();
        if codes.is_empty() {
            return IndustryFilter::All;
        }
        IndustryFilter::Prefixes(
            codes
                .iter()
                .filter_map(|c| industry_prefix(c.as_ref()).map(str::to_string))
                .collect(),
        )
    }

    pub fn matches(&self, business_code: &str) -> bool {
        match self {
            IndustryFilter::All => true,
            IndustryFilter::Prefixes(prefixes) => {
                industry_prefix(business_code).is_some_and(|p| prefixes.contains(p))
            }
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, IndustryFilter::All)
    }
}

impl fmt::Display for IndustryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndustryFilter::All => write!(f, "all industries"),
            IndustryFilter::Prefixes(p) => {
                let list: Vec<&str> = p.iter().map(String::as_str).collect();
                write!(f, "industry groups [{}]", list.join(", "))
            }
        }
    }
}

// ============================================================================
// AGGREGATION POLICY
// ============================================================================

/// Which per-county metric drives the colour scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// Number of filings (the map's default)
    #[default]
    Count,

    /// Sum of plan participants
    Participants,
}

impl AggregationPolicy {
    pub fn value_of(&self, county: &AggregatedCounty) -> u64 {
        match self {
            AggregationPolicy::Count => county.filing_count,
            AggregationPolicy::Participants => county.participant_count,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AggregationPolicy::Count => "Number of Plans",
            AggregationPolicy::Participants => "Number of Participants",
        }
    }
}

impl FromStr for AggregationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "count" | "plans" => Ok(AggregationPolicy::Count),
            "participants" | "sum" => Ok(AggregationPolicy::Participants),
            other => Err(format!("unknown aggregation policy: {other}")),
        }
    }
}

// ============================================================================
// RESULT TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCounty {
    pub fips: String,
    pub county_name: Option<String>,
    pub filing_count: u64,
    /// Sum of participants over the county's filings (missing counts as 0)
    pub participant_count: u64,
    /// log10(metric + 1); filled in by the colour-scale stage
    pub log_scaled_value: f64,
}

/// Records that passed the filter but could not be placed in a county
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedSummary {
    pub total: u64,
    /// Normalized ZIP → number of records
    pub by_zip: BTreeMap<String, u64>,
}

impl UnresolvedSummary {
    fn record(&mut self, zip: String) {
        self.total += 1;
        *self.by_zip.entry(zip).or_insert(0) += 1;
    }

    /// Most frequent unresolved ZIPs, ties by ZIP
    pub fn top(&self, n: usize) -> Vec<(&str, u64)> {
        let mut zips: Vec<(&str, u64)> = self.by_zip.iter().map(|(z, c)| (z.as_str(), *c)).collect();
        zips.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        zips.truncate(n);
        zips
    }

    /// Unresolved records whose ZIP is not five digits even after padding
    pub fn malformed(&self) -> u64 {
        self.by_zip
            .iter()
            .filter(|(zip, _)| !is_well_formed(zip))
            .map(|(_, count)| count)
            .sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Ordered by FIPS; only counties with at least one record
    pub counties: Vec<AggregatedCounty>,
    pub unresolved: UnresolvedSummary,
    /// Records that passed the industry filter
    pub records_matched: u64,
}

impl Aggregation {
    pub fn resolved_total(&self) -> u64 {
        self.counties.iter().map(|c| c.filing_count).sum()
    }
}

// ============================================================================
// AGGREGATOR
// ============================================================================

#[derive(Default)]
struct Tally {
    filings: u64,
    participants: u64,
}

/// Filter, resolve and group filings per county
pub fn aggregate(
    filings: &[FilingRecord],
    crosswalk: &ZipCountyMap,
    county_names: &CountyNames,
    filter: &IndustryFilter,
) -> Aggregation {
    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    let mut unresolved = UnresolvedSummary::default();
    let mut records_matched = 0u64;

    for filing in filings.iter().filter(|f| filter.matches(&f.business_code)) {
        records_matched += 1;
        let zip = normalize_zip(&filing.sponsor_zip);

        match crosswalk.lookup(&zip) {
            Some(fips) => {
                let tally = tallies.entry(fips).or_default();
                tally.filings += 1;
                tally.participants = tally
                    .participants
                    .saturating_add(filing.participants.unwrap_or(0));
            }
            None => unresolved.record(zip),
        }
    }

    let counties: Vec<AggregatedCounty> = tallies
        .into_iter()
        .map(|(fips, tally)| AggregatedCounty {
            fips: fips.to_string(),
            county_name: county_names.get(fips).map(str::to_string),
            filing_count: tally.filings,
            participant_count: tally.participants,
            log_scaled_value: 0.0,
        })
        .collect();

    debug!(
        filter = %filter,
        matched = records_matched,
        counties = counties.len(),
        unresolved = unresolved.total,
        "aggregated filings"
    );

    Aggregation {
        counties,
        unresolved,
        records_matched,
    }
}
