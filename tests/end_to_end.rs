use county_plans::{
    AggregationPolicy, AppContext, IndustryFilter, PipelineConfig, PipelineError,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const COUNTIES_GEOJSON: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        {"type": "Feature", "id": "36061", "properties": {},
         "geometry": {"type": "Polygon", "coordinates": []}}
    ]
}"#;

fn write_fixtures(dir: &Path) -> PipelineConfig {
    fs::write(
        dir.join("filings.csv"),
        "ACK_ID,SF_SPONS_US_ZIP,SF_BUSINESS_CODE\n\
         1,10001,11\n\
         2,10001,21\n\
         3,99999,11\n",
    )
    .unwrap();
    fs::write(
        dir.join("crosswalk.csv"),
        "zip,geoid,res_ratio\n10001,36061,0.9\n",
    )
    .unwrap();
    fs::write(
        dir.join("names.csv"),
        "fips,county name\n36061,New York County\n",
    )
    .unwrap();
    fs::write(
        dir.join("codes.csv"),
        "Main_Industry,Main_code\n\"Agriculture, Forestry, Fishing and Hunting\",110000\nMining,210000\n",
    )
    .unwrap();
    fs::write(dir.join("counties.geojson"), COUNTIES_GEOJSON).unwrap();

    let mut config = PipelineConfig::default();
    config.data.filings = dir.join("filings.csv");
    config.data.crosswalk = dir.join("crosswalk.csv");
    config.data.county_names = dir.join("names.csv");
    config.data.business_codes = dir.join("codes.csv");
    config.data.state_centers = None;
    config.boundary.file = Some(dir.join("counties.geojson"));
    config
}

#[test]
fn filtered_run_resolves_one_county_and_counts_unresolved() {
    let dir = TempDir::new().unwrap();
    let config = write_fixtures(dir.path());

    let ctx = AppContext::init(&config).expect("context loads");
    let dataset = ctx.run(&IndustryFilter::from_codes(["11"]), AggregationPolicy::Count);

    assert_eq!(dataset.counties.len(), 1);
    let county = &dataset.counties[0];
    assert_eq!(county.fips, "36061");
    assert_eq!(county.county_name.as_deref(), Some("New York County"));
    assert_eq!(county.filing_count, 1);
    assert_eq!(dataset.unresolved.total, 1);
    assert!(ctx.reference.boundaries.missing_from(&dataset).is_empty());
}

#[test]
fn unfiltered_run_matches_empty_selection() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::init(&write_fixtures(dir.path())).unwrap();

    let all = ctx.run(&IndustryFilter::All, AggregationPolicy::Count);
    let none_selected = ctx.run(&IndustryFilter::from_codes(Vec::<String>::new()), AggregationPolicy::Count);
    assert_eq!(all, none_selected);
    assert_eq!(all.counties[0].filing_count, 2);
    assert_eq!(all.records_matched, 3);
}

#[test]
fn taxonomy_is_loaded_sorted() {
    let dir = TempDir::new().unwrap();
    let ctx = AppContext::init(&write_fixtures(dir.path())).unwrap();

    let labels: Vec<&str> = ctx
        .reference
        .taxonomy
        .options()
        .iter()
        .map(|o| o.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Agriculture, Forestry, Fishing and Hunting", "Mining"]);
    assert_eq!(ctx.reference.taxonomy.label_for_code("212111"), Some("Mining"));
}

#[test]
fn missing_reference_table_aborts_startup() {
    let dir = TempDir::new().unwrap();
    let config = write_fixtures(dir.path());
    fs::remove_file(dir.path().join("names.csv")).unwrap();

    let err = AppContext::init(&config).unwrap_err();
    assert!(matches!(err, PipelineError::DataLoad { table: "county name", .. }));
}

#[test]
fn missing_boundaries_abort_startup() {
    let dir = TempDir::new().unwrap();
    let config = write_fixtures(dir.path());
    fs::remove_file(dir.path().join("counties.geojson")).unwrap();

    let err = AppContext::init(&config).unwrap_err();
    assert!(matches!(err, PipelineError::BoundaryFetch { .. }));
}

#[test]
fn cached_boundaries_survive_a_lost_source() {
    let dir = TempDir::new().unwrap();
    let mut config = write_fixtures(dir.path());
    config.boundary.cache = Some(dir.path().join("boundaries.db"));

    AppContext::init(&config).expect("first load fills the cache");
    fs::remove_file(dir.path().join("counties.geojson")).unwrap();

    let ctx = AppContext::init(&config).expect("second load uses the cache");
    assert!(ctx.reference.boundaries.contains("36061"));
}
