//! Run configuration: a JSON file with the same inputs the site build
//! passes in, overlaid with command-line values.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::csp::{Directive, PolicyMap};
use crate::error::{Error, Result};
use crate::headers::ExtraHeader;
use crate::routes::{CloudflareConfig, DEFAULT_API_BASE, DEFAULT_WORKER_SCRIPT, RouteStrategy};

pub const DEFAULT_CONCURRENCY: usize = 16;

/// Contents of the config file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileConfig {
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub policies: HashMap<String, String>,
    #[serde(default)]
    pub disable_policies: Vec<String>,
    #[serde(default)]
    pub disable_generated_policies: Vec<String>,
    #[serde(default)]
    pub extra_headers: Vec<ExtraHeader>,
    pub concurrency: Option<usize>,
    pub routes: Option<RoutesFileConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RoutesFileConfig {
    pub zone_id: Option<String>,
    pub host: Option<String>,
    pub script: Option<String>,
    pub strategy: Option<RouteStrategy>,
    pub api_base: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&text)
            .map_err(|e| Error::config(format!("{}: {e}", path.display())))
    }
}

/// Values given on the command line (or through the environment). They
/// take precedence over the file; list values are added to the file's.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub build_dir: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub disable_policies: Vec<String>,
    pub disable_generated_policies: Vec<String>,
    pub concurrency: Option<usize>,
    pub register_routes: bool,
    pub zone_id: Option<String>,
    pub token: Option<String>,
    pub route_host: Option<String>,
    pub route_strategy: Option<RouteStrategy>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub build_dir: PathBuf,
    pub exclude: Vec<String>,
    pub policies: PolicyMap,
    /// Directives never emitted.
    pub disable_policies: HashSet<Directive>,
    /// Directives for which no hashes are generated.
    pub disable_generated_policies: HashSet<Directive>,
    pub extra_headers: Vec<ExtraHeader>,
    pub concurrency: usize,
    pub cloudflare: Option<CloudflareConfig>,
}

impl Config {
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let build_dir = overrides
            .build_dir
            .clone()
            .or(file.build_dir)
            .ok_or_else(|| Error::config("build directory is required (buildDir or --build-dir)"))?;
        if !build_dir.is_dir() {
            return Err(Error::config(format!(
                "build directory {} does not exist or is not a directory",
                build_dir.display()
            )));
        }

        let concurrency = overrides
            .concurrency
            .or(file.concurrency)
            .unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(Error::config("concurrency must be at least 1"));
        }

        let mut exclude = file.exclude;
        exclude.extend(overrides.exclude.iter().cloned());

        let disable_policies = parse_directives(
            file.disable_policies
                .iter()
                .chain(overrides.disable_policies.iter()),
        )?;
        let disable_generated_policies = parse_directives(
            file.disable_generated_policies
                .iter()
                .chain(overrides.disable_generated_policies.iter()),
        )?;

        let cloudflare = if file.routes.is_some() || overrides.register_routes {
            let routes = file.routes.unwrap_or_default();
            Some(cloudflare_config(routes, &overrides)?)
        } else {
            None
        };

        Ok(Self {
            build_dir,
            exclude,
            policies: PolicyMap::merge(&normalize_policy_keys(file.policies)?),
            disable_policies,
            disable_generated_policies,
            extra_headers: file.extra_headers,
            concurrency,
            cloudflare,
        })
    }
}

/// Rewrite directive keys given in kebab-case to their camelCase key.
/// Keys that are not directives are kept as written.
fn normalize_policy_keys(policies: HashMap<String, String>) -> Result<HashMap<String, String>> {
    let mut normalized = HashMap::with_capacity(policies.len());
    for (key, value) in policies {
        let key = match key.parse::<Directive>() {
            Ok(directive) => directive.key().to_string(),
            Err(_) => key,
        };
        if let Some(previous) = normalized.insert(key.clone(), value.clone()) {
            if previous != value {
                return Err(Error::config(format!(
                    "policy {key} is given twice with different values"
                )));
            }
        }
    }
    Ok(normalized)
}

fn parse_directives<'a>(keys: impl Iterator<Item = &'a String>) -> Result<HashSet<Directive>> {
    keys.map(|k| k.parse::<Directive>().map_err(Error::config))
        .collect()
}

fn cloudflare_config(routes: RoutesFileConfig, overrides: &Overrides) -> Result<CloudflareConfig> {
    let zone_id = overrides
        .zone_id
        .clone()
        .or(routes.zone_id)
        .filter(|z| !z.trim().is_empty())
        .ok_or_else(|| Error::config("route registration needs a zone id (CLOUDFLARE_ZONE_ID)"))?;
    let token = overrides
        .token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::config("route registration needs an API token (CLOUDFLARE_TOKEN)"))?;
    let host = overrides
        .route_host
        .clone()
        .or(routes.host)
        .ok_or_else(|| Error::config("route registration needs a route host (routes.host)"))?;
    let api_base = routes.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
    let api_base = Url::parse(api_base)
        .map_err(|e| Error::config(format!("invalid routes.apiBase {api_base:?}: {e}")))?;

    Ok(CloudflareConfig {
        zone_id,
        token,
        host,
        script: routes
            .script
            .unwrap_or_else(|| DEFAULT_WORKER_SCRIPT.to_string()),
        strategy: overrides
            .route_strategy
            .or(routes.strategy)
            .unwrap_or_default(),
        api_base,
    })
}
