//! Register worker routes for the processed pages with the Cloudflare API.
//!
//! Which URL patterns get registered is decided by a [`RouteStrategy`]:
//! either one route per page (index pages get both the bare directory and
//! the slash form) or one route per header web path.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::extract::HeaderRecord;
use crate::path::strip_build_dir;

pub const DEFAULT_API_BASE: &str = "https://api.cloudflare.com/client/v4/";
pub const DEFAULT_WORKER_SCRIPT: &str = "nonce";

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStrategy {
    /// One route per HTML page.
    #[default]
    Pages,
    /// One route per generated header path (wildcards included).
    Headers,
}

/// Everything needed to talk to the routes API. Built once at startup.
#[derive(Clone)]
pub struct CloudflareConfig {
    pub zone_id: String,
    pub token: String,
    /// Route host prefix, e.g. `https://*.example.org`.
    pub host: String,
    pub script: String,
    pub strategy: RouteStrategy,
    pub api_base: Url,
}

impl fmt::Debug for CloudflareConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareConfig")
            .field("zone_id", &self.zone_id)
            .field("token", &"<redacted>")
            .field("host", &self.host)
            .field("script", &self.script)
            .field("strategy", &self.strategy)
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

impl CloudflareConfig {
    fn routes_url(&self) -> Result<Url> {
        let mut base = self.api_base.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("zones/{}/workers/routes", self.zone_id))
            .map_err(Error::remote)
    }

    fn authorization(&self) -> String {
        let token = self.token.trim();
        let token = token.strip_prefix("Bearer ").unwrap_or(token);
        format!("Bearer {token}")
    }
}

/// Derive route patterns, deduplicated in first-seen order.
pub fn derive_routes(
    strategy: RouteStrategy,
    host: &str,
    build_dir: &Path,
    pages: &[PathBuf],
    headers: &[HeaderRecord],
) -> Vec<String> {
    let host = host.trim_end_matches('/');
    let candidates: Vec<String> = match strategy {
        RouteStrategy::Pages => pages
            .iter()
            .filter_map(|page| strip_build_dir(page, build_dir).ok())
            .flat_map(|rel| page_routes(host, rel))
            .collect(),
        RouteStrategy::Headers => headers
            .iter()
            .map(|h| format!("{host}{}", h.web_path))
            .collect(),
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|r| seen.insert(r.clone()))
        .collect()
}

fn page_routes(host: &str, rel: &Path) -> Vec<String> {
    let rel = rel.to_string_lossy().replace('\\', "/");
    let stem = rel.strip_suffix(".html").unwrap_or(&rel);
    match stem.strip_suffix("index") {
        Some(dir) if dir.is_empty() || dir.ends_with('/') => {
            let dir = dir.trim_end_matches('/');
            if dir.is_empty() {
                vec![host.to_string(), format!("{host}/")]
            } else {
                vec![format!("{host}/{dir}"), format!("{host}/{dir}/")]
            }
        }
        _ => vec![format!("{host}/{stem}")],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerRoute {
    #[serde(default)]
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub script: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<Option<T>> {
        if self.success {
            return Ok(self.result);
        }
        let messages: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect();
        Err(Error::remote(if messages.is_empty() {
            "request was not successful".to_string()
        } else {
            messages.join(", ")
        }))
    }
}

#[derive(Serialize)]
struct NewRoute<'a> {
    pattern: &'a str,
    script: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub requested: usize,
    pub already_present: usize,
    pub created: usize,
}

pub struct RouteRegistrar {
    client: reqwest::Client,
    config: CloudflareConfig,
}

impl RouteRegistrar {
    pub fn new(config: CloudflareConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub async fn list_routes(&self) -> Result<Vec<WorkerRoute>> {
        let response = self
            .client
            .get(self.config.routes_url()?)
            .header(reqwest::header::AUTHORIZATION, self.config.authorization())
            .send()
            .await
            .map_err(Error::remote)?
            .error_for_status()
            .map_err(Error::remote)?;
        let body: ApiResponse<Vec<WorkerRoute>> = response.json().await.map_err(Error::remote)?;
        Ok(body.into_result()?.unwrap_or_default())
    }

    async fn create_route(&self, url: Url, pattern: &str) -> Result<()> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::AUTHORIZATION, self.config.authorization())
            .json(&NewRoute {
                pattern,
                script: &self.config.script,
            })
            .send()
            .await
            .map_err(Error::remote)?
            .error_for_status()
            .map_err(Error::remote)?;
        let body: ApiResponse<serde_json::Value> = response.json().await.map_err(Error::remote)?;
        body.into_result()?;
        debug!(pattern = %pattern, "Registered route");
        Ok(())
    }

    /// Register every pattern not already known to the zone. New routes are
    /// posted concurrently; the first failure is returned.
    pub async fn register(&self, patterns: &[String]) -> Result<RegistrationReport> {
        let existing: HashSet<String> = self
            .list_routes()
            .await?
            .into_iter()
            .map(|r| r.pattern)
            .collect();

        let missing: Vec<&String> = patterns.iter().filter(|p| !existing.contains(*p)).collect();
        let url = self.config.routes_url()?;
        try_join_all(missing.iter().map(|p| self.create_route(url.clone(), p))).await?;

        let report = RegistrationReport {
            requested: patterns.len(),
            already_present: patterns.len() - missing.len(),
            created: missing.len(),
        };
        info!(
            zone = %self.config.zone_id,
            created = report.created,
            already_present = report.already_present,
            "Registered worker routes"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csp::CspObject;
    use serde_json::json;

    fn config(api_base: &str) -> CloudflareConfig {
        CloudflareConfig {
            zone_id: "zone123".into(),
            token: "secret-token".into(),
            host: "https://*.example.org".into(),
            script: DEFAULT_WORKER_SCRIPT.into(),
            strategy: RouteStrategy::Pages,
            api_base: Url::parse(api_base).unwrap(),
        }
    }

    fn header(web_path: &str) -> HeaderRecord {
        HeaderRecord {
            web_path: web_path.into(),
            csp: CspObject::new(),
            is_global: web_path.ends_with('*'),
        }
    }

    #[test]
    fn page_routes_match_page_layout() {
        let pages: Vec<PathBuf> = [
            "serve/index.html",
            "serve/blog/index.html",
            "serve/blog/post.html",
            "serve/about.html",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        let routes = derive_routes(
            RouteStrategy::Pages,
            "https://*.example.org/",
            Path::new("serve"),
            &pages,
            &[],
        );
        assert_eq!(
            routes,
            vec![
                "https://*.example.org",
                "https://*.example.org/",
                "https://*.example.org/blog",
                "https://*.example.org/blog/",
                "https://*.example.org/blog/post",
                "https://*.example.org/about",
            ]
        );
    }

    #[test]
    fn page_named_like_index_is_a_plain_page() {
        let routes = derive_routes(
            RouteStrategy::Pages,
            "https://x.org",
            Path::new("b"),
            &[PathBuf::from("b/reindex.html")],
            &[],
        );
        assert_eq!(routes, vec!["https://x.org/reindex"]);
    }

    #[test]
    fn header_routes_are_deduplicated() {
        let routes = derive_routes(
            RouteStrategy::Headers,
            "https://*.example.org",
            Path::new("serve"),
            &[],
            &[header("/blog/*"), header("/"), header("/blog/*")],
        );
        assert_eq!(
            routes,
            vec!["https://*.example.org/blog/*", "https://*.example.org/"]
        );
    }

    #[test]
    fn routes_url_joins_zone() {
        assert_eq!(
            config(DEFAULT_API_BASE).routes_url().unwrap().as_str(),
            "https://api.cloudflare.com/client/v4/zones/zone123/workers/routes"
        );
        assert_eq!(
            config("http://127.0.0.1:9000/v4").routes_url().unwrap().as_str(),
            "http://127.0.0.1:9000/v4/zones/zone123/workers/routes"
        );
    }

    #[test]
    fn authorization_is_bearer_once() {
        let mut c = config(DEFAULT_API_BASE);
        assert_eq!(c.authorization(), "Bearer secret-token");
        c.token = "Bearer secret-token".into();
        assert_eq!(c.authorization(), "Bearer secret-token");
    }

    #[test]
    fn debug_redacts_token() {
        let printed = format!("{:?}", config(DEFAULT_API_BASE));
        assert!(!printed.contains("secret-token"), "got: {printed}");
        assert!(printed.contains("zone123"));
    }

    #[test]
    fn api_errors_are_surfaced() {
        let body: ApiResponse<Vec<WorkerRoute>> = serde_json::from_str(
            r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"}],"result":null}"#,
        )
        .unwrap();
        let err = body.into_result().unwrap_err();
        assert!(err.to_string().contains("Authentication error (10000)"), "got: {err}");
    }

    const ROUTES_PATH: &str = "/v4/zones/zone123/workers/routes";

    async fn stub_zone(existing: &[&str]) -> wiremock::MockServer {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let routes: Vec<_> = existing
            .iter()
            .enumerate()
            .map(|(i, p)| json!({ "id": format!("r{i}"), "pattern": p, "script": "nonce" }))
            .collect();
        Mock::given(method("GET"))
            .and(path(ROUTES_PATH))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "errors": [], "result": routes })),
            )
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn registrar(server: &wiremock::MockServer) -> RouteRegistrar {
        RouteRegistrar::new(config(&format!("{}/v4", server.uri())))
    }

    #[tokio::test]
    async fn register_posts_only_missing_routes() {
        use wiremock::matchers::{body_json, header, method, path};
        use wiremock::{Mock, ResponseTemplate};

        let server = stub_zone(&["https://*.example.org/"]).await;
        Mock::given(method("POST"))
            .and(path(ROUTES_PATH))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_json(json!({ "pattern": "https://*.example.org/blog/*", "script": "nonce" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true, "errors": [], "result": { "id": "new" } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let patterns = vec![
            "https://*.example.org/".to_string(),
            "https://*.example.org/blog/*".to_string(),
        ];
        let report = registrar(&server).register(&patterns).await.unwrap();

        assert_eq!(
            report,
            RegistrationReport {
                requested: 2,
                already_present: 1,
                created: 1,
            }
        );
        let posts = server
            .received_requests()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.method.as_str() == "POST")
            .count();
        assert_eq!(posts, 1);
    }

    #[tokio::test]
    async fn register_with_everything_present_posts_nothing() {
        let server = stub_zone(&["https://*.example.org/"]).await;
        let report = registrar(&server)
            .register(&["https://*.example.org/".to_string()])
            .await
            .unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.already_present, 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn rejected_create_fails_registration() {
        use wiremock::matchers::method;
        use wiremock::{Mock, ResponseTemplate};

        let server = stub_zone(&[]).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "errors": [{ "code": 10020, "message": "Invalid route pattern" }],
                "result": null
            })))
            .mount(&server)
            .await;

        let err = registrar(&server)
            .register(&["bad".to_string()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Invalid route pattern (10020)"), "got: {err}");
    }

    #[test]
    fn api_route_list_parses() {
        let body: ApiResponse<Vec<WorkerRoute>> = serde_json::from_str(
            r#"{"success":true,"errors":[],"result":[{"id":"r1","pattern":"https://*.example.org/","script":"nonce"}]}"#,
        )
        .unwrap();
        let routes = body.into_result().unwrap().unwrap();
        assert_eq!(routes[0].pattern, "https://*.example.org/");
        assert_eq!(routes[0].script.as_deref(), Some("nonce"));
    }
}
