use semver::Version;
use tracing::trace;

use pinion_forge::ForgeCache;
use pinion_types::{Slug, VersionRange};

use crate::error::ResolveError;
use crate::graph::DependencyGraph;
use crate::module::Module;

/// Where a requirement originates.
#[derive(Debug, Clone)]
pub enum RequirementSource {
    /// Declared at the top level of the manifest.
    Manifest,
    /// Declared as a dependency of another module.
    Module(Box<Module>),
}

/// A directed constraint: `source` needs `target` within `range`.
#[derive(Debug, Clone)]
pub struct Requirement {
    pub source: RequirementSource,
    pub target: Module,
    pub range: VersionRange,
}

impl Requirement {
    pub fn source_slug(&self) -> Option<&Slug> {
        match &self.source {
            RequirementSource::Manifest => None,
            RequirementSource::Module(module) => Some(module.slug()),
        }
    }

    pub fn source_module(&self) -> Option<&Module> {
        match &self.source {
            RequirementSource::Manifest => None,
            RequirementSource::Module(module) => Some(module),
        }
    }

    /// Find a version of the target that every incoming edge on its node
    /// accepts.
    ///
    /// If the current version already validates, it is kept. Otherwise
    /// candidates are popped off the release list until one validates;
    /// the chosen candidate is pushed back so later queries still see it.
    /// Exhausting the list is `NoVersionFound`.
    pub(crate) async fn select_version(
        &mut self,
        graph: &DependencyGraph,
        cache: &mut ForgeCache,
    ) -> Result<Version, ResolveError> {
        if let Some(version) = self.target.version() {
            if graph.is_valid(&self.target) {
                return Ok(version.clone());
            }
        }
        loop {
            let Some(candidate) = self.target.next_available_version(cache).await? else {
                return Err(ResolveError::NoVersionFound {
                    requirement: self.to_string(),
                });
            };
            trace!("trying `{}` {candidate}", self.target.slug());
            self.target.set_version(candidate.clone());
            if graph.is_valid(&self.target) {
                self.target.push_available_version(cache, candidate.clone()).await?;
                return Ok(candidate);
            }
        }
    }
}

impl std::fmt::Display for Requirement {
    /// `manifest => puppetlabs-stdlib (>= 8.0.0)`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.source {
            RequirementSource::Manifest => f.write_str("manifest")?,
            RequirementSource::Module(module) => module.slug().fmt(f)?,
        }
        write!(f, " => {} ({})", self.target.slug(), self.range)
    }
}
