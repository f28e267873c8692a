use std::str::FromStr;

use semver::Version;
use tracing::debug;
use url::Url;

use pinion_forge::{DeprecationStatus, ForgeCache};
use pinion_git::{GitReference, GitSource};
use pinion_puppetfile::{EntrySource, ModuleEntry};
use pinion_types::{MetadataDependency, ModuleMetadata, Slug, VersionRange};

use crate::error::ResolveError;
use crate::requirement::{Requirement, RequirementSource};

/// A module declaration: identity, origin, and the currently selected
/// version.
#[derive(Debug, Clone)]
pub struct Module {
    slug: Slug,
    kind: ModuleKind,
    version: Option<Version>,
}

/// Where a module's versions and dependencies come from.
#[derive(Debug, Clone)]
pub enum ModuleKind {
    /// Published on the forge at `endpoint`.
    Forge { endpoint: Url },
    /// Pinned to a repository; the version and dependencies were read
    /// from the repository's `metadata.json` at construction.
    Repo {
        url: Url,
        reference: Option<String>,
        dependencies: Vec<MetadataDependency>,
    },
}

impl Module {
    /// Construct a module from a manifest entry.
    ///
    /// A repository module is cloned into a temporary checkout to read
    /// `metadata.json`; the checkout is released before returning, on
    /// every path. A forge module without a literal version selects the
    /// newest release.
    pub async fn from_entry(
        entry: &ModuleEntry,
        forge: &Url,
        cache: &mut ForgeCache,
    ) -> Result<Self, ResolveError> {
        match &entry.source {
            EntrySource::Forge { version } => {
                let mut module = Self {
                    slug: entry.slug.clone(),
                    kind: ModuleKind::Forge {
                        endpoint: forge.clone(),
                    },
                    version: version.clone(),
                };
                if module.version.is_none() {
                    module.version = cache.releases(forge, &module.slug).await?.first().cloned();
                }
                Ok(module)
            }
            EntrySource::Git { url, reference } => {
                let metadata = read_repository_metadata(url, reference.as_deref()).await?;
                Ok(Self {
                    slug: entry.slug.clone(),
                    kind: ModuleKind::Repo {
                        url: url.clone(),
                        reference: reference.clone(),
                        dependencies: metadata.dependencies,
                    },
                    version: Some(metadata.version),
                })
            }
        }
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = Some(version);
    }

    /// The releases still selectable for this module, newest first.
    /// A repository module has no alternatives.
    pub async fn available_versions(
        &self,
        cache: &mut ForgeCache,
    ) -> Result<Vec<Version>, ResolveError> {
        match &self.kind {
            ModuleKind::Forge { endpoint } => Ok(cache.releases(endpoint, &self.slug).await?),
            ModuleKind::Repo { .. } => Ok(Vec::new()),
        }
    }

    pub async fn has_available_version(
        &self,
        cache: &mut ForgeCache,
    ) -> Result<bool, ResolveError> {
        Ok(!self.available_versions(cache).await?.is_empty())
    }

    /// Remove and return the current best candidate from the release
    /// list; later queries see the shortened list.
    pub async fn next_available_version(
        &self,
        cache: &mut ForgeCache,
    ) -> Result<Option<Version>, ResolveError> {
        let ModuleKind::Forge { endpoint } = &self.kind else {
            return Ok(None);
        };
        let mut releases = cache.releases(endpoint, &self.slug).await?;
        if releases.is_empty() {
            return Ok(None);
        }
        let head = releases.remove(0);
        cache.update_releases(&self.slug, releases);
        Ok(Some(head))
    }

    /// Reinsert a selected candidate at the head of the release list so
    /// it stays selectable for later queries.
    pub async fn push_available_version(
        &self,
        cache: &mut ForgeCache,
        version: Version,
    ) -> Result<(), ResolveError> {
        let ModuleKind::Forge { endpoint } = &self.kind else {
            return Ok(());
        };
        let mut releases = cache.releases(endpoint, &self.slug).await?;
        releases.insert(0, version);
        cache.update_releases(&self.slug, releases);
        Ok(())
    }

    /// Materialize this module's declared dependencies as requirements.
    /// Each target is constructed against `forge` without a version, so
    /// it starts at the newest available release.
    pub async fn dependencies(
        &self,
        forge: &Url,
        cache: &mut ForgeCache,
    ) -> Result<Vec<Requirement>, ResolveError> {
        let declared = match &self.kind {
            ModuleKind::Forge { endpoint } => {
                let version = self.version.clone().ok_or_else(|| {
                    ResolveError::StateInvariant(format!(
                        "dependency query for `{}` before a version was selected",
                        self.slug
                    ))
                })?;
                cache.dependencies(endpoint, &self.slug, &version).await?
            }
            ModuleKind::Repo { dependencies, .. } => dependencies.clone(),
        };

        let mut requirements = Vec::with_capacity(declared.len());
        for dependency in declared {
            let slug = Slug::from_str(&dependency.name).map_err(|err| {
                ResolveError::InvalidDependency {
                    module: self.slug.clone(),
                    name: dependency.name.clone(),
                    reason: err.to_string(),
                }
            })?;
            let range = match &dependency.version_requirement {
                Some(raw) => {
                    VersionRange::from_str(raw).map_err(|err| ResolveError::InvalidDependency {
                        module: self.slug.clone(),
                        name: dependency.name.clone(),
                        reason: err.to_string(),
                    })?
                }
                None => VersionRange::any(),
            };
            let entry = ModuleEntry {
                slug,
                source: EntrySource::Forge { version: None },
                comment: None,
            };
            let target = Module::from_entry(&entry, forge, cache).await?;
            requirements.push(Requirement {
                source: RequirementSource::Module(Box::new(self.clone())),
                target,
                range,
            });
        }
        Ok(requirements)
    }

    /// The registry's deprecation record; repository modules are never
    /// deprecated.
    pub async fn deprecation_status(
        &self,
        cache: &mut ForgeCache,
    ) -> Result<Option<DeprecationStatus>, ResolveError> {
        match &self.kind {
            ModuleKind::Forge { endpoint } => {
                Ok(cache.deprecation_status(endpoint, &self.slug).await?)
            }
            ModuleKind::Repo { .. } => Ok(None),
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.slug.fmt(f)
    }
}

async fn read_repository_metadata(
    url: &Url,
    reference: Option<&str>,
) -> Result<ModuleMetadata, ResolveError> {
    let checkout = tempfile::tempdir()?;
    let source = GitSource::new(
        url.clone(),
        reference.map_or(GitReference::DefaultBranch, GitReference::from_rev),
    );
    let destination = checkout.path().join("repository");
    source.fetch(&destination).await?;

    let text = fs_err::read_to_string(destination.join("metadata.json")).map_err(|source| {
        ResolveError::MetadataMissing {
            url: url.clone(),
            source,
        }
    })?;
    let metadata = serde_json::from_str(&text).map_err(|source| ResolveError::MetadataInvalid {
        url: url.clone(),
        source,
    })?;
    debug!("read metadata for `{url}`");
    Ok(metadata)
}
