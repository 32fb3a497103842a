// 📄 Filing Records - one row per retirement-plan filing
// Accepts the short column names and the Form 5500-SF export names.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilingRecord {
    /// Raw sponsor ZIP; may be short, ZIP+4, or garbage
    #[serde(alias = "SF_SPONS_US_ZIP", default)]
    pub sponsor_zip: String,

    /// Business (industry) code, kept as text
    #[serde(alias = "SF_BUSINESS_CODE", default)]
    pub business_code: String,

    /// Participant count, when the export carries it
    #[serde(
        alias = "SF_TOT_PARTCP_BOY_CNT",
        default,
        deserialize_with = "lenient_count",
        skip_serializing_if = "Option::is_none"
    )]
    pub participants: Option<u64>,
}

impl FilingRecord {
    pub fn new(sponsor_zip: &str, business_code: &str) -> Self {
        FilingRecord {
            sponsor_zip: sponsor_zip.to_string(),
            business_code: business_code.to_string(),
            participants: None,
        }
    }

    /// Builder pattern: add participant count
    pub fn with_participants(mut self, participants: u64) -> Self {
        self.participants = Some(participants);
        self
    }
}

/// Blank or non-numeric counts become None; "12.0" is read as 12
fn lenient_count<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| {
        let s = s.trim();
        s.parse::<u64>().ok().or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v as u64)
        })
    }))
}

const ZIP_COLUMNS: [&str; 2] = ["sponsor_zip", "SF_SPONS_US_ZIP"];
const CODE_COLUMNS: [&str; 2] = ["business_code", "SF_BUSINESS_CODE"];

pub fn load_filings(path: &Path) -> Result<Vec<FilingRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| PipelineError::data_load("filings", path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::data_load("filings", path, e))?;
    for accepted in [ZIP_COLUMNS, CODE_COLUMNS] {
        if !headers.iter().any(|h| accepted.contains(&h.trim())) {
            return Err(PipelineError::data_load(
                "filings",
                path,
                format!("missing required column: one of {}", accepted.join(" / ")),
            ));
        }
    }

    let mut filings = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let record: FilingRecord = result.map_err(|e| {
            PipelineError::data_load("filings", path, format!("line {}: {}", line_num + 2, e))
        })?;
        filings.push(record);
    }

    info!(path = %path.display(), filings = filings.len(), "loaded filings");
    Ok(filings)
}
