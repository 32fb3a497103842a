// 📚 Reference Data Loader - crosswalk, county names, taxonomy, geometry
// Loaded once at startup into an immutable ReferenceData value.

use crate::boundary::{BoundarySource, CountyBoundaries};
use crate::config::PipelineConfig;
use crate::crosswalk::{load_crosswalk_entries, resolve_crosswalk, ZipCountyMap};
use crate::error::{PipelineError, Result};
use crate::taxonomy::IndustryTaxonomy;
use crate::zip::normalize_fips;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

/// Fail with DataLoad unless every required column is in the header row
pub fn require_columns<R: io::Read>(
    rdr: &mut csv::Reader<R>,
    table: &'static str,
    path: &Path,
    columns: &[&str],
) -> Result<()> {
    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::data_load(table, path, e))?;

    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|col| !headers.iter().any(|h| h.trim() == *col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::data_load(
            table,
            path,
            format!("missing required column(s): {}", missing.join(", ")),
        ))
    }
}

// ============================================================================
// COUNTY NAMES
// ============================================================================

pub const COUNTY_NAME_COLUMNS: [&str; 2] = ["fips", "county name"];

#[derive(Debug, Deserialize)]
struct CountyNameRow {
    fips: String,
    #[serde(rename = "county name")]
    name: Option<String>,
}

/// FIPS → county name. A missing FIPS is simply None.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountyNames {
    names: BTreeMap<String, String>,
}

impl CountyNames {
    pub fn from_pairs<I, F, N>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (F, N)>,
        F: AsRef<str>,
        N: Into<String>,
    {
        let mut names = BTreeMap::new();
        for (fips, name) in pairs {
            names
                .entry(normalize_fips(fips.as_ref()))
                .or_insert_with(|| name.into());
        }
        CountyNames { names }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)
            .map_err(|e| PipelineError::data_load("county name", path, e))?;
        require_columns(&mut rdr, "county name", path, &COUNTY_NAME_COLUMNS)?;

        let mut pairs = Vec::new();
        for (line_num, result) in rdr.deserialize().enumerate() {
            let row: CountyNameRow = result.map_err(|e| {
                PipelineError::data_load("county name", path, format!("line {}: {}", line_num + 2, e))
            })?;
            if let Some(name) = row.name.filter(|n| !n.trim().is_empty()) {
                pairs.push((row.fips, name));
            }
        }

        let names = Self::from_pairs(pairs);
        info!(path = %path.display(), counties = names.len(), "loaded county names");
        Ok(names)
    }

    pub fn get(&self, fips: &str) -> Option<&str> {
        self.names.get(fips).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ============================================================================
// STATE CENTERS (label anchors for the renderer)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateCenter {
    pub abbr: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStateCenter {
    abbr: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(alias = "state")]
    name: Option<String>,
}

/// Load state label anchors; entries missing abbr/lat/lon are skipped
pub fn load_state_centers(path: &Path) -> Result<Vec<StateCenter>> {
    let body = fs::read_to_string(path)
        .map_err(|e| PipelineError::data_load("state centers", path, e))?;
    let raw: Vec<RawStateCenter> = serde_json::from_str(&body)
        .map_err(|e| PipelineError::data_load("state centers", path, e))?;

    let centers: Vec<StateCenter> = raw
        .into_iter()
        .filter_map(|s| {
            Some(StateCenter {
                abbr: s.abbr?,
                lat: s.lat?,
                lon: s.lon?,
                name: s.name,
            })
        })
        .collect();

    info!(path = %path.display(), states = centers.len(), "loaded state centers");
    Ok(centers)
}

// ============================================================================
// REFERENCE DATA
// ============================================================================

/// Everything the aggregator reads; immutable after load
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub crosswalk: ZipCountyMap,
    pub county_names: CountyNames,
    pub taxonomy: IndustryTaxonomy,
    pub boundaries: CountyBoundaries,
    pub state_centers: Vec<StateCenter>,
}

impl ReferenceData {
    /// Load all reference tables. Any failure aborts with no partial state.
    pub fn load(config: &PipelineConfig, boundary_source: &dyn BoundarySource) -> Result<Self> {
        let entries = load_crosswalk_entries(&config.data.crosswalk)?;
        let crosswalk = resolve_crosswalk(&entries);
        info!(
            entries = entries.len(),
            zips = crosswalk.len(),
            counties = crosswalk.county_count(),
            "resolved crosswalk"
        );

        let county_names = CountyNames::load(&config.data.county_names)?;
        let taxonomy = IndustryTaxonomy::load(&config.data.business_codes)?;
        let state_centers = match &config.data.state_centers {
            Some(path) => load_state_centers(path)?,
            None => Vec::new(),
        };
        let boundaries = CountyBoundaries::load(boundary_source)?;

        Ok(ReferenceData {
            crosswalk,
            county_names,
            taxonomy,
            boundaries,
            state_centers,
        })
    }
}
