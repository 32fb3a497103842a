use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use county_plans::{
    AggregationPolicy, AppContext, BoundaryCache, CountyDataset, IndustryFilter, IndustryTaxonomy,
    PipelineConfig,
};

#[derive(Debug, Parser)]
#[command(name = "county-plans", version, about = "Retirement-plan filings per US county")]
struct Cli {
    /// TOML configuration file (default: ./county-plans.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Aggregate filings per county for an industry selection
    Map {
        /// Industry code or 2-digit group; repeat for several
        #[arg(long = "industry", value_name = "CODE")]
        industries: Vec<String>,

        /// Metric behind the colour scale: count | participants
        #[arg(long, default_value = "count")]
        metric: AggregationPolicy,

        /// Emit the full dataset as JSON
        #[arg(long)]
        json: bool,

        /// Rows shown in the table view
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// List selectable industries
    Industries,

    /// Load all reference data and report coverage
    Check,
}

fn main() {
    if let Err(error) = run() {
        eprintln!("❌ county-plans error: {error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    let config = PipelineConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?;

    match cli.command {
        Commands::Map {
            industries,
            metric,
            json,
            limit,
        } => run_map(&config, &industries, metric, json, limit),
        Commands::Industries => run_industries(&config),
        Commands::Check => run_check(&config),
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("COUNTY_PLANS_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn run_map(
    config: &PipelineConfig,
    industries: &[String],
    metric: AggregationPolicy,
    json: bool,
    limit: usize,
) -> Result<()> {
    let ctx = AppContext::init(config).context("failed to initialize pipeline context")?;
    let filter = IndustryFilter::from_codes(industries);
    let dataset = ctx.run(&filter, metric);

    if json {
        println!("{}", serde_json::to_string_pretty(&dataset)?);
        return Ok(());
    }

    println!("📊 {} by county ({})", metric.label(), filter);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if dataset.is_empty() && !filter.is_all() {
        println!("∅ Empty selection: no filings matched {}", filter);
    } else if dataset.is_empty() {
        println!("∅ No filings could be placed in a county");
    } else {
        print_table(&dataset, limit);
    }

    println!();
    println!("✓ Records matched: {}", dataset.records_matched);
    println!("✓ Counties: {}", dataset.counties.len());
    if dataset.unresolved.total > 0 {
        println!(
            "⚠️  {} records could not be mapped to a county",
            dataset.unresolved.total
        );
    }
    if dataset.scale.has_ticks() {
        println!("✓ Colorbar ticks: {}", dataset.scale.tick_labels.join(", "));
    } else {
        println!("✓ Colorbar ticks: none");
    }

    Ok(())
}

fn print_table(dataset: &CountyDataset, limit: usize) {
    let mut rows: Vec<_> = dataset.counties.iter().collect();
    rows.sort_by(|a, b| {
        dataset
            .policy
            .value_of(b)
            .cmp(&dataset.policy.value_of(a))
            .then(a.fips.cmp(&b.fips))
    });

    println!("{:<7} {:<32} {:>8} {:>12} {:>6}", "FIPS", "County", "Plans", "Participants", "log");
    for county in rows.into_iter().take(limit) {
        println!(
            "{:<7} {:<32} {:>8} {:>12} {:>6.3}",
            county.fips,
            county.county_name.as_deref().unwrap_or("-"),
            county.filing_count,
            county.participant_count,
            county.log_scaled_value
        );
    }
    if dataset.counties.len() > limit {
        println!("… {} more counties", dataset.counties.len() - limit);
    }
}

fn run_industries(config: &PipelineConfig) -> Result<()> {
    let taxonomy = IndustryTaxonomy::load(&config.data.business_codes)
        .context("failed to load industry taxonomy")?;

    for option in taxonomy.options() {
        println!("{:<8} {}", option.code, option.label);
    }
    println!("\n✓ {} industries", taxonomy.len());
    Ok(())
}

fn run_check(config: &PipelineConfig) -> Result<()> {
    println!("🔍 Loading reference data...");
    let ctx = AppContext::init(config).context("failed to initialize pipeline context")?;
    let reference = &ctx.reference;

    println!("✓ Filings: {}", ctx.filings.len());
    println!(
        "✓ Crosswalk: {} ZIPs → {} counties",
        reference.crosswalk.len(),
        reference.crosswalk.county_count()
    );
    println!("✓ County names: {}", reference.county_names.len());
    println!("✓ Industries: {}", reference.taxonomy.len());
    println!(
        "✓ Boundaries: {} counties ({} features skipped)",
        reference.boundaries.len(),
        reference.boundaries.skipped()
    );
    println!("✓ State labels: {}", reference.state_centers.len());
    if let Some(cache_path) = &config.boundary.cache {
        let cached = BoundaryCache::open(cache_path)
            .and_then(|cache| cache.count())
            .context("failed to read boundary cache")?;
        println!("✓ Boundary cache: {} entries ({})", cached, cache_path.display());
    }

    let dataset = ctx.run(&IndustryFilter::All, AggregationPolicy::Count);
    println!(
        "\n📊 All industries: {} counties, {} unresolved of {} records",
        dataset.counties.len(),
        dataset.unresolved.total,
        dataset.records_matched
    );
    for (zip, count) in dataset.unresolved.top(5) {
        println!("   unresolved ZIP {zip}: {count}");
    }
    let malformed = dataset.unresolved.malformed();
    if malformed > 0 {
        println!("⚠️  {malformed} unresolved records have a malformed ZIP");
    }

    let missing = reference.boundaries.missing_from(&dataset);
    if missing.is_empty() {
        println!("✓ Every county with data has a boundary polygon");
    } else {
        println!(
            "⚠️  {} counties have data but no polygon: {}",
            missing.len(),
            missing.iter().take(10).copied().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(())
}
