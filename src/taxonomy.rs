// 🏭 Industry Taxonomy - labels for business-code groups
// Main_code values share a 2-digit prefix per industry group.

use crate::error::{PipelineError, Result};
use crate::reference::require_columns;
use crate::zip::industry_prefix;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

pub const TAXONOMY_COLUMNS: [&str; 2] = ["Main_Industry", "Main_code"];

#[derive(Debug, Deserialize)]
struct TaxonomyRow {
    #[serde(rename = "Main_Industry")]
    main_industry: Option<String>,
    #[serde(rename = "Main_code")]
    main_code: Option<String>,
}

/// A selectable industry: human-readable label + representative code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndustryOption {
    pub label: String,
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndustryTaxonomy {
    options: Vec<IndustryOption>,
}

impl IndustryTaxonomy {
    /// Build from raw (label, code) pairs.
    ///
    /// Rows with a blank label or code are dropped, duplicate labels keep
    /// their first code, and the result is sorted by label.
    pub fn from_pairs<I, L, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
        L: AsRef<str>,
        C: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let mut options: Vec<IndustryOption> = pairs
            .into_iter()
            .filter_map(|(label, code)| {
                let label = label.as_ref().trim();
                let code = code.as_ref().trim();
                if label.is_empty() || code.is_empty() {
                    return None;
                }
                Some(IndustryOption {
                    label: label.to_string(),
                    code: code.to_string(),
                })
            })
            .filter(|option| seen.insert(option.label.clone()))
            .collect();

        options.sort_by(|a, b| a.label.cmp(&b.label));
        IndustryTaxonomy { options }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)
            .map_err(|e| PipelineError::data_load("industry taxonomy", path, e))?;
        require_columns(&mut rdr, "industry taxonomy", path, &TAXONOMY_COLUMNS)?;

        let mut pairs = Vec::new();
        for (line_num, result) in rdr.deserialize().enumerate() {
            let row: TaxonomyRow = result.map_err(|e| {
                PipelineError::data_load(
                    "industry taxonomy",
                    path,
                    format!("line {}: {}", line_num + 2, e),
                )
            })?;
            if let (Some(label), Some(code)) = (row.main_industry, row.main_code) {
                pairs.push((label, code));
            }
        }

        let taxonomy = Self::from_pairs(pairs);
        info!(path = %path.display(), industries = taxonomy.len(), "loaded industry taxonomy");
        Ok(taxonomy)
    }

    pub fn options(&self) -> &[IndustryOption] {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn code_for(&self, label: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.code.as_str())
    }

    /// Industry label for any raw business code, matched on its 2-digit group
    pub fn label_for_code(&self, code: &str) -> Option<&str> {
        let prefix = industry_prefix(code)?;
        self.options
            .iter()
            .find(|o| industry_prefix(&o.code) == Some(prefix))
            .map(|o| o.label.as_str())
    }
}
