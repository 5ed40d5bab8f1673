use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use thiserror::Error;

use crate::model::config::RegistryConfig;

const USER_AGENT: &str = concat!("sftp-auto-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Looks up whether a project exists in the source-hosting registry.
pub trait RegistryClient {
    fn project_exists(
        &self,
        namespace: &str,
        name: &str,
        token: &str,
    ) -> Result<bool, RegistryError>;
}

/// GitHub REST lookup: `GET <api_base>/repos/<namespace>/<name>`, present
/// iff the response is 200.
pub struct GitHubRegistry {
    client: Client,
    api_base: String,
}

impl std::fmt::Debug for GitHubRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubRegistry")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| RegistryError::Client(err.to_string()))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn project_url(&self, namespace: &str, name: &str) -> String {
        format!("{}/repos/{namespace}/{name}", self.api_base)
    }
}

impl RegistryClient for GitHubRegistry {
    fn project_exists(
        &self,
        namespace: &str,
        name: &str,
        token: &str,
    ) -> Result<bool, RegistryError> {
        let url = self.project_url(namespace, name);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, "application/vnd.github.v3+json")
            .send()
            .map_err(|source| RegistryError::Request {
                url: url.clone(),
                source,
            })?;

        Ok(response.status() == StatusCode::OK)
    }
}
