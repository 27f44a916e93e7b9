//! CLI argument parsing and startup helpers.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use crate::config::{Config, FileConfig, Overrides};
use crate::routes::RouteStrategy;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "csp-headers",
    about = "Generate Content-Security-Policy headers for a static site build"
)]
pub struct Args {
    /// JSON config file (buildDir, exclude, policies, disablePolicies, ...)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Build output directory. Overrides buildDir from the config file
    #[arg(short, long)]
    pub build_dir: Option<PathBuf>,

    /// Glob pattern of HTML files to leave alone (repeatable)
    #[arg(short, long = "exclude")]
    pub exclude: Vec<String>,

    /// Directive to leave out of the headers entirely (repeatable)
    #[arg(long = "disable-policy")]
    pub disable_policy: Vec<String>,

    /// Directive for which no hashes are generated (repeatable)
    #[arg(long = "disable-generated-policy")]
    pub disable_generated_policy: Vec<String>,

    /// Number of documents processed at the same time
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Register worker routes for the processed pages with Cloudflare
    #[arg(long)]
    pub register_routes: bool,

    /// Cloudflare zone to register routes in
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    pub zone_id: Option<String>,

    /// Cloudflare API token. Prefer the CLOUDFLARE_TOKEN env var
    #[arg(long, env = "CLOUDFLARE_TOKEN", hide_env_values = true)]
    pub cloudflare_token: Option<String>,

    /// Route host prefix, e.g. "https://*.example.org"
    #[arg(long)]
    pub route_host: Option<String>,

    /// How route patterns are derived
    #[arg(long, value_enum)]
    pub route_strategy: Option<RouteStrategy>,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            build_dir: self.build_dir.clone(),
            exclude: self.exclude.clone(),
            disable_policies: self.disable_policy.clone(),
            disable_generated_policies: self.disable_generated_policy.clone(),
            concurrency: self.concurrency,
            register_routes: self.register_routes,
            zone_id: self.zone_id.clone(),
            token: self.cloudflare_token.clone(),
            route_host: self.route_host.clone(),
            route_strategy: self.route_strategy,
        }
    }
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load the config file (if any) and apply the command-line values.
/// Returns None and logs an error if the configuration is unusable.
pub fn load_config(args: &Args) -> Option<Config> {
    let file = match &args.config {
        Some(path) => match FileConfig::load(path) {
            Ok(file) => {
                info!(path = %path.display(), "Config loaded");
                file
            }
            Err(e) => {
                error!(error = %e, "Failed to load config file");
                return None;
            }
        },
        None => FileConfig::default(),
    };

    match Config::resolve(file, args.overrides()) {
        Ok(config) => {
            if let Some(cf) = &config.cloudflare {
                info!(zone = %cf.zone_id, host = %cf.host, strategy = ?cf.strategy, "Route registration enabled");
            }
            Some(config)
        }
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            None
        }
    }
}
