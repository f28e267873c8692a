use thiserror::Error;
use url::Url;

use pinion_forge::DeprecationStatus;
use pinion_types::Slug;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Puppetfile(#[from] pinion_puppetfile::Error),

    #[error(transparent)]
    Forge(#[from] pinion_forge::Error),

    #[error(transparent)]
    Repository(#[from] pinion_git::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The clone succeeded but the repository has no readable
    /// `metadata.json`.
    #[error("repository `{url}` is missing metadata.json")]
    MetadataMissing {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("repository `{url}` has an unparsable metadata.json")]
    MetadataInvalid {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    /// The target's release list was exhausted without satisfying the
    /// graph. Demoted to a warning when the target is on the ignore list.
    #[error("no version satisfying `{requirement}` could be found")]
    NoVersionFound { requirement: String },

    /// The registry flags the module as deprecated. Demoted to a warning
    /// when the module is on the ignore list.
    #[error("module `{slug}` is deprecated: {status}")]
    ModuleDeprecated {
        slug: Slug,
        status: DeprecationStatus,
    },

    /// Registry metadata declared a dependency that cannot be understood.
    #[error("dependency `{name}` declared by `{module}` is invalid: {reason}")]
    InvalidDependency {
        module: Slug,
        name: String,
        reason: String,
    },

    /// A programming error: required state was absent where it must be
    /// present.
    #[error("resolver invariant violated: {0}")]
    StateInvariant(String),
}
