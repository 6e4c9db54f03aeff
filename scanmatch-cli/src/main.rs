use clap::Parser;
use scanmatch::image::io::load_raster;
use scanmatch::{
    AlternatingEnds, FindConfig, MatchResult, Matcher, MatcherConfig, Metric, PoolConfig,
    ScanMatchError, Striped,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "ScanMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum MetricConfig {
    Mse,
    Normalized,
}

impl From<MetricConfig> for Metric {
    fn from(value: MetricConfig) -> Self {
        match value {
            MetricConfig::Mse => Metric::Mse,
            MetricConfig::Normalized => Metric::Normalized,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum DistributorConfig {
    #[default]
    AlternatingEnds,
    Striped,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FindConfigJson {
    threshold: f64,
    timeout_ms: u64,
    metric: MetricConfig,
}

impl Default for FindConfigJson {
    fn default() -> Self {
        let cfg = FindConfig::default();
        Self {
            threshold: cfg.threshold,
            timeout_ms: cfg.timeout.as_millis() as u64,
            metric: MetricConfig::Mse,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PoolConfigJson {
    max_workers: usize,
    queue_capacity: usize,
    idle_timeout_ms: u64,
}

impl Default for PoolConfigJson {
    fn default() -> Self {
        let cfg = PoolConfig::default();
        Self {
            max_workers: cfg.max_workers,
            queue_capacity: cfg.queue_capacity,
            idle_timeout_ms: cfg.idle_timeout.as_millis() as u64,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    scan_path: String,
    template_path: String,
    output_path: Option<String>,
    distributor: DistributorConfig,
    worker_count: Option<usize>,
    find: FindConfigJson,
    pool: PoolConfigJson,
}

#[derive(Debug, Serialize)]
struct Output {
    found: bool,
    x: Option<usize>,
    y: Option<usize>,
    score: Option<f64>,
    elapsed_ms: u64,
}

impl Output {
    fn from_match(result: MatchResult) -> Self {
        Self {
            found: true,
            x: Some(result.x),
            y: Some(result.y),
            score: Some(result.score),
            elapsed_ms: result.elapsed.as_millis() as u64,
        }
    }

    fn not_found(timeout: Duration) -> Self {
        Self {
            found: false,
            x: None,
            y: None,
            score: None,
            elapsed_ms: timeout.as_millis() as u64,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.scan_path.is_empty() || config.template_path.is_empty() {
        return Err("scan_path and template_path must be set in the config".into());
    }
    if config.worker_count == Some(0) {
        return Err("worker_count must be at least 1".into());
    }

    let scan = load_raster(&config.scan_path)?;
    let template = load_raster(&config.template_path)?;
    tracing::info!(
        scan_width = scan.width(),
        scan_height = scan.height(),
        template_width = template.width(),
        template_height = template.height(),
        "rasters loaded"
    );

    let matcher = Matcher::with_config(
        &scan,
        MatcherConfig {
            pool: PoolConfig {
                max_workers: config.pool.max_workers,
                queue_capacity: config.pool.queue_capacity,
                idle_timeout: Duration::from_millis(config.pool.idle_timeout_ms),
            },
            worker_count: config.worker_count,
        },
    );
    let matcher = match config.distributor {
        DistributorConfig::AlternatingEnds => matcher.with_distributor(AlternatingEnds),
        DistributorConfig::Striped => matcher.with_distributor(Striped),
    };

    let timeout = Duration::from_millis(config.find.timeout_ms);
    let result = matcher.find_template(
        &template,
        FindConfig {
            threshold: config.find.threshold,
            timeout,
            metric: config.find.metric.into(),
        },
    );
    let output = match result {
        Ok(found) => {
            tracing::info!(x = found.x, y = found.y, score = found.score, "match found");
            Output::from_match(found)
        }
        Err(ScanMatchError::NoMatch { timeout }) => {
            tracing::info!(timeout_ms = timeout.as_millis() as u64, "no match");
            Output::not_found(timeout)
        }
        Err(err) => return Err(err.into()),
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
