use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use semver::Version;
use serde::Serialize;
use tracing::debug;
use url::Url;

use pinion_types::{MetadataDependency, Slug};

use crate::api::{DeprecationStatus, ModuleData};
use crate::client::ForgeClient;
use crate::error::Error;

/// Per-run memoization of registry lookups, keyed by module slug (or
/// slug + version for release dependencies).
///
/// The cache grows monotonically within a resolution run; [`clear`]
/// resets it between runs. Release lists may shrink as the resolver
/// discards candidates ([`update_releases`]); everything else is cached
/// indefinitely.
///
/// [`clear`]: ForgeCache::clear
/// [`update_releases`]: ForgeCache::update_releases
#[derive(Debug)]
pub struct ForgeCache {
    client: ForgeClient,
    modules: FxHashMap<Slug, ModuleData>,
    releases: FxHashMap<Slug, Vec<Version>>,
    dependencies: FxHashMap<(Slug, Version), Vec<MetadataDependency>>,
}

impl ForgeCache {
    pub fn new(client: ForgeClient) -> Self {
        Self {
            client,
            modules: FxHashMap::default(),
            releases: FxHashMap::default(),
            dependencies: FxHashMap::default(),
        }
    }

    /// Forget everything; the next lookup hits the network again.
    pub fn clear(&mut self) {
        self.modules.clear();
        self.releases.clear();
        self.dependencies.clear();
    }

    /// The raw module record, fetched once per run.
    pub async fn module_data(&mut self, endpoint: &Url, slug: &Slug) -> Result<ModuleData, Error> {
        if let Some(data) = self.modules.get(slug) {
            return Ok(data.clone());
        }
        let data = self.client.module_data(endpoint, slug).await?;
        self.modules.insert(slug.clone(), data.clone());
        Ok(data)
    }

    /// The release list for a module, in registry order (descending by
    /// semver). Versions the registry reports that do not parse as semver
    /// are skipped.
    pub async fn releases(&mut self, endpoint: &Url, slug: &Slug) -> Result<Vec<Version>, Error> {
        if let Some(releases) = self.releases.get(slug) {
            return Ok(releases.clone());
        }
        let data = self.module_data(endpoint, slug).await?;
        let mut releases = Vec::with_capacity(data.releases.len());
        for release in &data.releases {
            match Version::parse(&release.version) {
                Ok(version) => releases.push(version),
                Err(err) => {
                    debug!(
                        "skipping unparsable release `{}` of `{slug}`: {err}",
                        release.version
                    );
                }
            }
        }
        self.releases.insert(slug.clone(), releases.clone());
        Ok(releases)
    }

    /// Replace the cached release list for a module.
    pub fn update_releases(&mut self, slug: &Slug, releases: Vec<Version>) {
        self.releases.insert(slug.clone(), releases);
    }

    /// The deprecation record, if the registry flags the module.
    pub async fn deprecation_status(
        &mut self,
        endpoint: &Url,
        slug: &Slug,
    ) -> Result<Option<DeprecationStatus>, Error> {
        Ok(self.module_data(endpoint, slug).await?.deprecation_status())
    }

    /// The dependencies a release declares, fetched once per
    /// (slug, version).
    pub async fn dependencies(
        &mut self,
        endpoint: &Url,
        slug: &Slug,
        version: &Version,
    ) -> Result<Vec<MetadataDependency>, Error> {
        let key = (slug.clone(), version.clone());
        if let Some(dependencies) = self.dependencies.get(&key) {
            return Ok(dependencies.clone());
        }
        let data = self.client.release_data(endpoint, slug, version).await?;
        let dependencies = data.metadata.dependencies;
        self.dependencies.insert(key, dependencies.clone());
        Ok(dependencies)
    }

    /// The cache contents, for diagnostic dumps.
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            modules: self
                .modules
                .iter()
                .map(|(slug, data)| (slug.to_string(), data.clone()))
                .collect(),
            releases: self
                .releases
                .iter()
                .map(|(slug, releases)| {
                    (
                        slug.to_string(),
                        releases.iter().map(ToString::to_string).collect(),
                    )
                })
                .collect(),
            dependencies: self
                .dependencies
                .iter()
                .map(|((slug, version), dependencies)| {
                    (format!("{slug}@{version}"), dependencies.clone())
                })
                .collect(),
        }
    }
}

/// A serializable view of the cache contents.
#[derive(Debug, Serialize)]
pub struct CacheSnapshot {
    pub modules: BTreeMap<String, ModuleData>,
    pub releases: BTreeMap<String, Vec<String>>,
    pub dependencies: BTreeMap<String, Vec<MetadataDependency>>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use semver::Version;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use pinion_types::Slug;

    use crate::client::ForgeClientBuilder;
    use crate::error::Error;
    use crate::ForgeCache;

    fn slug(s: &str) -> Slug {
        Slug::from_str(s).unwrap()
    }

    fn cache() -> ForgeCache {
        ForgeCache::new(ForgeClientBuilder::default().build())
    }

    async fn mount_module(server: &MockServer, slug: &str, body: serde_json::Value, hits: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/v3/modules/{slug}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn module_data_is_fetched_once() {
        let server = MockServer::start().await;
        mount_module(
            &server,
            "acme-base",
            json!({"slug": "acme-base", "releases": [{"version": "1.0.0"}]}),
            1,
        )
        .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let first = cache.module_data(&endpoint, &slug("acme-base")).await.unwrap();
        let second = cache.module_data(&endpoint, &slug("acme-base")).await.unwrap();
        assert_eq!(first.slug.as_deref(), Some("acme-base"));
        assert_eq!(second.releases.len(), 1);
    }

    #[tokio::test]
    async fn releases_keep_registry_order_and_skip_unparsable() {
        let server = MockServer::start().await;
        mount_module(
            &server,
            "acme-base",
            json!({"releases": [
                {"version": "2.0.0"},
                {"version": "not-a-version"},
                {"version": "1.0.0"}
            ]}),
            1,
        )
        .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let releases = cache.releases(&endpoint, &slug("acme-base")).await.unwrap();
        let rendered: Vec<_> = releases.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["2.0.0", "1.0.0"]);
    }

    #[tokio::test]
    async fn update_releases_replaces_the_list() {
        let server = MockServer::start().await;
        mount_module(
            &server,
            "acme-base",
            json!({"releases": [{"version": "2.0.0"}, {"version": "1.0.0"}]}),
            1,
        )
        .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let key = slug("acme-base");
        let mut releases = cache.releases(&endpoint, &key).await.unwrap();
        releases.remove(0);
        cache.update_releases(&key, releases);
        let shortened = cache.releases(&endpoint, &key).await.unwrap();
        assert_eq!(shortened, vec![Version::new(1, 0, 0)]);
    }

    #[tokio::test]
    async fn deprecation_status_is_derived_from_module_data() {
        let server = MockServer::start().await;
        mount_module(
            &server,
            "acme-old",
            json!({
                "deprecated_at": "2023-01-01 00:00:00 -0800",
                "deprecated_for": "abandoned",
                "superseded_by": {"slug": "acme-new"}
            }),
            1,
        )
        .await;
        mount_module(&server, "acme-live", json!({"releases": []}), 1).await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let status = cache
            .deprecation_status(&endpoint, &slug("acme-old"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.superseded_by.as_deref(), Some("acme-new"));
        assert!(cache
            .deprecation_status(&endpoint, &slug("acme-live"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn dependencies_default_to_empty_and_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/releases/acme-base-1.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "slug": "acme-base-1.0.0",
                "metadata": {}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let version = Version::new(1, 0, 0);
        let first = cache
            .dependencies(&endpoint, &slug("acme-base"), &version)
            .await
            .unwrap();
        let second = cache
            .dependencies(&endpoint, &slug("acme-base"), &version)
            .await
            .unwrap();
        assert!(first.is_empty());
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn missing_module_is_reported_as_such() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let err = cache
            .module_data(&endpoint, &slug("acme-gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ModuleNotFound(_)));
    }

    #[tokio::test]
    async fn server_errors_propagate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        let err = cache
            .module_data(&endpoint, &slug("acme-base"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Request(_)));
    }

    #[tokio::test]
    async fn clear_forgets_cached_lookups() {
        let server = MockServer::start().await;
        mount_module(&server, "acme-base", json!({"releases": []}), 2).await;
        let endpoint = Url::parse(&server.uri()).unwrap();

        let mut cache = cache();
        cache.module_data(&endpoint, &slug("acme-base")).await.unwrap();
        cache.clear();
        cache.module_data(&endpoint, &slug("acme-base")).await.unwrap();
    }
}
