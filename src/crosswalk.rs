// 🧭 Crosswalk Resolver - ZIP → county (FIPS) by majority population
// A ZIP can span counties; we keep the county where most residents live.

use crate::error::{PipelineError, Result};
use crate::reference::require_columns;
use crate::zip::{normalize_fips, zero_pad, ZIP_WIDTH};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

// ============================================================================
// CROSSWALK ENTRY
// ============================================================================

/// One row of the HUD ZIP-to-county crosswalk
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CrosswalkEntry {
    pub zip: String,

    /// County FIPS code (the crosswalk calls it "geoid")
    #[serde(rename = "geoid")]
    pub fips: String,

    /// Share of the ZIP's residents living in this county (0.0 - 1.0).
    /// A blank cell is read as NaN.
    #[serde(rename = "res_ratio", deserialize_with = "blank_as_nan")]
    pub resident_ratio: f64,
}

fn blank_as_nan<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(f64::NAN),
        Some(s) => s
            .parse::<f64>()
            .map_err(|e| de::Error::custom(format!("invalid res_ratio {s:?}: {e}"))),
    }
}

impl CrosswalkEntry {
    pub fn new(zip: &str, fips: &str, resident_ratio: f64) -> Self {
        CrosswalkEntry {
            zip: zip.to_string(),
            fips: fips.to_string(),
            resident_ratio,
        }
    }
}

pub const CROSSWALK_COLUMNS: [&str; 3] = ["zip", "geoid", "res_ratio"];

/// Read raw crosswalk rows (ZIP and FIPS stay strings)
pub fn load_crosswalk_entries(path: &Path) -> Result<Vec<CrosswalkEntry>> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|e| PipelineError::data_load("crosswalk", path, e))?;
    require_columns(&mut rdr, "crosswalk", path, &CROSSWALK_COLUMNS)?;

    let mut entries = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let entry: CrosswalkEntry = result.map_err(|e| {
            PipelineError::data_load("crosswalk", path, format!("line {}: {}", line_num + 2, e))
        })?;
        entries.push(entry);
    }

    info!(path = %path.display(), rows = entries.len(), "loaded crosswalk");
    Ok(entries)
}

// ============================================================================
// RESOLUTION
// ============================================================================

/// Should `candidate` replace `current` as the county chosen for a ZIP?
///
/// Only a strictly greater ratio wins, so on exact ties the entry seen first
/// in table order is kept. NaN ranks below every real ratio.
pub fn prefers(current: &CrosswalkEntry, candidate: &CrosswalkEntry) -> bool {
    match (current.resident_ratio.is_nan(), candidate.resident_ratio.is_nan()) {
        (true, false) => true,
        (_, true) => false,
        (false, false) => candidate.resident_ratio > current.resident_ratio,
    }
}

/// Deterministic one-to-one ZIP → FIPS mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZipCountyMap {
    counties: BTreeMap<String, String>,
}

impl ZipCountyMap {
    /// Partial lookup; ZIPs outside the crosswalk resolve to None
    pub fn lookup(&self, zip: &str) -> Option<&str> {
        self.counties.get(zip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.counties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.counties.iter().map(|(z, f)| (z.as_str(), f.as_str()))
    }

    /// Number of distinct counties any ZIP resolves to
    pub fn county_count(&self) -> usize {
        let mut fips: Vec<&String> = self.counties.values().collect();
        fips.sort();
        fips.dedup();
        fips.len()
    }
}

/// Group entries by padded ZIP and keep the majority-population county.
///
/// Explicit fold in table order; the tie-break lives in [`prefers`].
pub fn resolve_crosswalk(entries: &[CrosswalkEntry]) -> ZipCountyMap {
    let chosen: BTreeMap<String, CrosswalkEntry> =
        entries.iter().fold(BTreeMap::new(), |mut best, entry| {
            let zip = zero_pad(entry.zip.trim(), ZIP_WIDTH);
            let replace = best
                .get(&zip)
                .map_or(true, |current| prefers(current, entry));
            if replace {
                best.insert(zip, entry.clone());
            }
            best
        });

    ZipCountyMap {
        counties: chosen
            .into_iter()
            .map(|(zip, entry)| (zip, normalize_fips(&entry.fips)))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_majority_county_wins() {
        let entries = vec![
            CrosswalkEntry::new("10001", "36047", 0.1),
            CrosswalkEntry::new("10001", "36061", 0.9),
            CrosswalkEntry::new("10001", "36081", 0.0),
        ];
        let map = resolve_crosswalk(&entries);
        assert_eq!(map.lookup("10001"), Some("36061"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_exact_tie_keeps_first_seen() {
        let entries = vec![
            CrosswalkEntry::new("20001", "11001", 0.5),
            CrosswalkEntry::new("20001", "24033", 0.5),
        ];
        assert_eq!(resolve_crosswalk(&entries).lookup("20001"), Some("11001"));

        let reversed: Vec<_> = entries.into_iter().rev().collect();
        assert_eq!(resolve_crosswalk(&reversed).lookup("20001"), Some("24033"));
    }

    #[test]
    fn test_prefers_in_isolation() {
        let low = CrosswalkEntry::new("1", "a", 0.2);
        let high = CrosswalkEntry::new("1", "b", 0.8);
        let tied = CrosswalkEntry::new("1", "c", 0.8);
        let nan = CrosswalkEntry::new("1", "d", f64::NAN);

        assert!(prefers(&low, &high));
        assert!(!prefers(&high, &low));
        assert!(!prefers(&high, &tied));
        assert!(prefers(&nan, &low));
        assert!(!prefers(&low, &nan));
        assert!(!prefers(&nan, &nan));
    }

    #[test]
    fn test_pads_zip_and_fips() {
        let entries = vec![CrosswalkEntry::new("501", "36103", 1.0), CrosswalkEntry::new("2134", "6037", 1.0)];
        let map = resolve_crosswalk(&entries);
        assert_eq!(map.lookup("00501"), Some("36103"));
        assert_eq!(map.lookup("02134"), Some("06037"));
        assert_eq!(map.lookup("501"), None);
    }

    #[test]
    fn test_padding_merges_groups() {
        // "501" and "00501" are the same ZIP once padded
        let entries = vec![
            CrosswalkEntry::new("501", "36103", 0.4),
            CrosswalkEntry::new("00501", "36059", 0.6),
        ];
        assert_eq!(resolve_crosswalk(&entries).lookup("00501"), Some("36059"));
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let entries = vec![
            CrosswalkEntry::new("30301", "13121", 0.7),
            CrosswalkEntry::new("30301", "13089", 0.3),
            CrosswalkEntry::new("60601", "17031", 1.0),
        ];
        let first = resolve_crosswalk(&entries);
        let survivors: Vec<CrosswalkEntry> = first
            .iter()
            .map(|(zip, fips)| CrosswalkEntry::new(zip, fips, 1.0))
            .collect();
        assert_eq!(resolve_crosswalk(&survivors), first);
        assert_eq!(first.county_count(), 2);
    }

    #[test]
    fn test_unknown_zip_is_absent() {
        let map = resolve_crosswalk(&[CrosswalkEntry::new("10001", "36061", 0.9)]);
        assert_eq!(map.lookup("99999"), None);
    }

    #[test]
    fn test_load_keeps_leading_zeros() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zip,geoid,res_ratio,bus_ratio").unwrap();
        writeln!(file, "00501,36103,1.0,1.0").unwrap();
        writeln!(file, "01001,25013,0.75,0.5").unwrap();
        file.flush().unwrap();

        let entries = load_crosswalk_entries(file.path()).unwrap();
        assert_eq!(entries[0], CrosswalkEntry::new("00501", "36103", 1.0));
        assert_eq!(entries[1].zip, "01001");
    }

    #[test]
    fn test_blank_ratio_loads_and_loses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zip,geoid,res_ratio").unwrap();
        writeln!(file, "00501,36103,").unwrap();
        writeln!(file, "00501,36059,0.2").unwrap();
        writeln!(file, "10001,36061,").unwrap();
        file.flush().unwrap();

        let entries = load_crosswalk_entries(file.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries[0].resident_ratio.is_nan());

        let map = resolve_crosswalk(&entries);
        assert_eq!(map.lookup("00501"), Some("36059"));
        // a ZIP whose only row is blank still resolves
        assert_eq!(map.lookup("10001"), Some("36061"));
    }

    #[test]
    fn test_load_rejects_garbage_ratio() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zip,geoid,res_ratio").unwrap();
        writeln!(file, "00501,36103,lots").unwrap();
        file.flush().unwrap();

        let err = load_crosswalk_entries(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::DataLoad { table: "crosswalk", .. }));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_load_rejects_missing_column() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "zip,geoid").unwrap();
        writeln!(file, "00501,36103").unwrap();
        file.flush().unwrap();

        let err = load_crosswalk_entries(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::DataLoad { table: "crosswalk", .. }));
        assert!(err.to_string().contains("res_ratio"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_crosswalk_entries(Path::new("/nonexistent/hud.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::DataLoad { .. }));
    }
}
