use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::driver::session::BridgeCommand;
use crate::driver::{DEFAULT_IDLE_TIMEOUT, DEFAULT_SCROLL_LIMIT, DriverSettings};
use crate::error::CrawlError;
use crate::explorer::algorithm::{Algorithm, CrawlSettings};
use crate::explorer::randomized::DEFAULT_RANDOM_CLICKS;
use crate::orchestrator::ModelFormat;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "policy-crawler",
    version,
    about = "Crawl mobile apps for their privacy policy or their navigation model"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: policy-crawler.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Append crawl decisions as JSON lines to this file
    #[arg(long, global = true)]
    pub trace: Option<String>,
}

/// Which apps to crawl.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AppSelection {
    /// App id (package name); repeat for several apps
    #[arg(long = "app")]
    pub apps: Vec<String>,

    /// File with whitespace-separated app ids
    #[arg(long)]
    pub ids: Option<String>,

    /// Crawl the simulated app described in this YAML file instead of a device (dry run); repeatable
    #[arg(long = "simulate", value_name = "FILE")]
    pub simulated: Vec<String>,
}

/// Where results go.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Delivery {
    /// Directory for result files (default: out)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Send results to a collector at host:port instead of writing files
    #[arg(long)]
    pub collector: Option<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Xml,
    Json,
}

impl From<FormatArg> for ModelFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Xml => ModelFormat::Xml,
            FormatArg::Json => ModelFormat::Json,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search each app for its privacy policy text
    Search {
        #[command(flatten)]
        apps: AppSelection,

        #[command(flatten)]
        delivery: Delivery,

        /// Algorithm: BFS, DFS, RS or OS
        #[arg(short, long)]
        algorithm: Option<String>,

        /// Stop a frontier search after this many expanded pages
        #[arg(long)]
        max_expansions: Option<usize>,

        /// Run a breadth-first search when no OS strategy matched
        #[arg(long)]
        fallback: bool,

        /// Seed for the randomized search
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Extract the full navigation model of each app
    Model {
        #[command(flatten)]
        apps: AppSelection,

        #[command(flatten)]
        delivery: Delivery,

        /// Output format
        #[arg(long, value_enum, default_value = "xml")]
        format: FormatArg,

        /// Stop after this many expanded pages
        #[arg(long)]
        max_expansions: Option<usize>,
    },

    /// Receive results from a crawler and store them as files
    Collect {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:2000")]
        listen: String,

        /// Directory for received files (default: out)
        #[arg(short, long)]
        out: Option<String>,

        /// File extension for received payloads
        #[arg(long, default_value = "txt")]
        extension: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `policy-crawler.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    #[serde(default = "default_scroll_limit")]
    pub scroll_limit: usize,

    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,

    pub max_expansions: Option<usize>,

    #[serde(default)]
    pub fallback_to_frontier: bool,

    #[serde(default = "default_random_clicks")]
    pub random_clicks: usize,

    pub seed: Option<u64>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            scroll_limit: DEFAULT_SCROLL_LIMIT,
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT.as_millis() as u64,
            max_expansions: None,
            fallback_to_frontier: false,
            random_clicks: DEFAULT_RANDOM_CLICKS,
            seed: None,
        }
    }
}

/// The bridge process that speaks NDJSON to the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_bridge")]
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            program: default_bridge(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_out_dir")]
    pub dir: String,

    pub collector: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            collector: None,
        }
    }
}

// Serde default helpers
fn default_algorithm() -> String { "OS".to_string() }
fn default_scroll_limit() -> usize { DEFAULT_SCROLL_LIMIT }
fn default_idle_timeout_ms() -> u64 { DEFAULT_IDLE_TIMEOUT.as_millis() as u64 }
fn default_random_clicks() -> usize { DEFAULT_RANDOM_CLICKS }
fn default_bridge() -> String { "ui-bridge".to_string() }
fn default_out_dir() -> String { "out".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("policy-crawler.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = config_path, error = %e, "malformed config, using defaults");
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Values given on the command line; `None` defers to the config file.
#[derive(Debug, Clone, Default)]
pub struct CrawlOverrides {
    pub algorithm: Option<String>,
    pub max_expansions: Option<usize>,
    pub fallback: bool,
    pub seed: Option<u64>,
}

/// Resolve crawl settings: CLI > config file > defaults.
pub fn build_crawl_settings(overrides: &CrawlOverrides, config: &CrawlConfig) -> Result<CrawlSettings, CrawlError> {
    let label = overrides.algorithm.as_deref().unwrap_or(&config.algorithm);
    let algorithm: Algorithm = label.parse()?;
    if config.random_clicks == 0 {
        return Err(CrawlError::Configuration("random_clicks must be positive".into()));
    }
    Ok(CrawlSettings {
        algorithm,
        max_expansions: overrides.max_expansions.or(config.max_expansions),
        fallback_to_frontier: overrides.fallback || config.fallback_to_frontier,
        random_clicks: config.random_clicks,
        seed: overrides.seed.or(config.seed),
    })
}

pub fn build_driver_settings(config: &CrawlConfig) -> DriverSettings {
    DriverSettings {
        idle_timeout: Duration::from_millis(config.idle_timeout_ms),
        scroll_limit: config.scroll_limit,
    }
}

pub fn build_bridge_command(config: &DeviceConfig) -> BridgeCommand {
    BridgeCommand {
        program: config.program.clone(),
        args: config.args.clone(),
    }
}

/// App ids from `--app` flags followed by the ids file, duplicates removed.
pub fn resolve_app_ids(selection: &AppSelection) -> Result<Vec<String>, CrawlError> {
    let mut ids: Vec<String> = selection.apps.clone();
    if let Some(path) = &selection.ids {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CrawlError::Configuration(format!("cannot read ids file '{}': {}", path, e)))?;
        ids.extend(content.split_whitespace().map(str::to_string));
    }

    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));

    if ids.is_empty() {
        return Err(CrawlError::Configuration("no app ids given (use --app or --ids)".into()));
    }
    Ok(ids)
}
