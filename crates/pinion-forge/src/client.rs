use std::time::Duration;

use reqwest::{Client, ClientBuilder, StatusCode};
use semver::Version;
use tracing::debug;
use url::Url;

use pinion_types::Slug;

use crate::api::{ModuleData, ReleaseData};
use crate::error::Error;

/// A builder for a [`ForgeClient`].
#[derive(Debug, Clone)]
pub struct ForgeClientBuilder {
    user_agent: String,
    timeout: Duration,
}

impl Default for ForgeClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: "pinion".to_string(),
            timeout: Duration::from_secs(60 * 5),
        }
    }
}

impl ForgeClientBuilder {
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> ForgeClient {
        let client = ClientBuilder::new()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()
            .expect("Failed to build the HTTP client.");
        ForgeClient { client }
    }
}

/// A client for a forge-compatible module registry.
///
/// Transport and HTTP errors propagate; requests are not retried.
#[derive(Debug, Clone)]
pub struct ForgeClient {
    client: Client,
}

impl ForgeClient {
    /// Fetch the module record from `GET /v3/modules/{slug}`.
    pub async fn module_data(&self, endpoint: &Url, slug: &Slug) -> Result<ModuleData, Error> {
        let url = endpoint_join(endpoint, &format!("v3/modules/{slug}"))?;
        debug!("fetching module data for `{slug}` from {url}");
        self.get_json(url, slug).await
    }

    /// Fetch the release record from `GET /v3/releases/{slug}-{version}`.
    pub async fn release_data(
        &self,
        endpoint: &Url,
        slug: &Slug,
        version: &Version,
    ) -> Result<ReleaseData, Error> {
        let url = endpoint_join(endpoint, &format!("v3/releases/{slug}-{version}"))?;
        debug!("fetching release data for `{slug}` {version} from {url}");
        self.get_json(url, slug).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        slug: &Slug,
    ) -> Result<T, Error> {
        let response = self.client.get(url.clone()).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::ModuleNotFound(slug.clone()));
        }
        let text = response.error_for_status()?.text().await?;
        serde_json::from_str(&text).map_err(|source| Error::BadJson { source, url })
    }
}

fn endpoint_join(endpoint: &Url, path: &str) -> Result<Url, Error> {
    let base = endpoint.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}
