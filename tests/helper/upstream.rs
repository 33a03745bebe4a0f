//! mockito-backed manifest host and npm registry

use indexmap::IndexMap;
use mockito::{Mock, Server, ServerGuard};
use serde::Serialize;

use dep_freshness::config::{CacheConfig, Config, FetchConfig, UpstreamConfig};

/// A manifest host and a registry, each on its own mock server
pub struct Upstream {
    pub manifests: ServerGuard,
    pub registry: ServerGuard,
}

impl Upstream {
    pub async fn start() -> Self {
        Self {
            manifests: Server::new_async().await,
            registry: Server::new_async().await,
        }
    }

    /// Config pointing at both mock servers, with long-lived caches
    pub fn config(&self) -> Config {
        Config {
            upstream: UpstreamConfig {
                manifest_base_url: self.manifests.url(),
                registry_base_url: self.registry.url(),
                ..UpstreamConfig::default()
            },
            fetch: FetchConfig {
                timeout: 2_000,
                concurrency: 4,
            },
            ..Config::default()
        }
    }

    /// Config whose caches expire immediately
    pub fn uncached_config(&self) -> Config {
        Config {
            cache: CacheConfig {
                manifest_ttl: 0,
                report_ttl: 0,
                package_ttl: 0,
                ..CacheConfig::default()
            },
            ..self.config()
        }
    }

    pub async fn manifest(&mut self, project: &str, body: &str) -> Mock {
        self.manifests
            .mock("GET", format!("/{}/HEAD/package.json", project).as_str())
            .with_status(200)
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn missing_manifest(&mut self, project: &str) -> Mock {
        self.manifests
            .mock("GET", format!("/{}/HEAD/package.json", project).as_str())
            .with_status(404)
            .with_body("404: Not Found")
            .create_async()
            .await
    }

    /// Registry document whose `dist-tags.latest` is `latest`
    pub async fn package(&mut self, name: &str, latest: &str) -> Mock {
        let versions =
            serde_json::Map::from_iter([(latest.to_string(), serde_json::json!({}))]);
        let body = serde_json::json!({
            "name": name,
            "dist-tags": { "latest": latest },
            "versions": versions,
        });
        self.registry
            .mock("GET", format!("/{}", name.replace('/', "%2F")).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await
    }

    pub async fn failing_package(&mut self, name: &str) -> Mock {
        self.registry
            .mock("GET", format!("/{}", name.replace('/', "%2F")).as_str())
            .with_status(503)
            .create_async()
            .await
    }
}

#[derive(Serialize)]
struct PackageJson<'a> {
    name: &'a str,
    version: &'a str,
    dependencies: IndexMap<&'a str, &'a str>,
}

/// package.json body declaring `deps` in the given order
pub fn manifest_body(deps: &[(&str, &str)]) -> String {
    let package = PackageJson {
        name: "fixture",
        version: "1.0.0",
        dependencies: deps.iter().copied().collect(),
    };
    serde_json::to_string(&package).unwrap()
}
