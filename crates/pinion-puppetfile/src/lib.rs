//! Parses and emits the Puppetfile manifest format.
//!
//! Supported:
//!  * `forge '<url>'`
//!  * `mod '<author>-<name>'[, '<version>']` (separator `-` or `/`)
//!  * `mod '<author>-<name>', :git => '<url>'[, :ref => '<ref>']`
//!    (`:tag`, `:branch`, and `:commit` are accepted as reference
//!    spellings and canonicalized to `:ref` on output)
//!  * full-line `#` comments, attached to the following `mod` entry
//!  * a sentinel line (default `## dependencies`) separating top-level
//!    modules from pre-resolved dependent modules
//!
//! Declarations may wrap onto continuation lines. Inline (same-line)
//! comments are not preserved.

use std::str::FromStr;

use semver::Version;
use thiserror::Error;
use url::Url;

use pinion_types::{InvalidSlugError, Slug};

mod emitter;
mod parser;

/// The registry queried when a manifest declares no `forge`.
pub const DEFAULT_FORGE_URL: &str = "https://forgeapi.puppetlabs.com";

/// The default marker separating top-level modules from dependent modules.
pub const DEFAULT_DEPENDENCY_SENTINEL: &str = "## dependencies";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid `mod` declaration on line {line}: {message}")]
    InvalidDeclaration { line: usize, message: String },

    #[error("invalid `forge` declaration on line {line}")]
    InvalidForge {
        line: usize,
        #[source]
        source: url::ParseError,
    },

    #[error("unexpected content on line {line}: `{content}`")]
    UnexpectedContent { line: usize, content: String },

    #[error("invalid module slug on line {line}")]
    Slug {
        line: usize,
        #[source]
        source: InvalidSlugError,
    },

    #[error("invalid version on line {line}")]
    Version {
        line: usize,
        #[source]
        source: semver::Error,
    },
}

/// A parsed manifest: the forge endpoint, the top-level modules, and the
/// dependent modules below the sentinel, each in declaration order.
#[derive(Debug, Clone)]
pub struct Puppetfile {
    pub forge: Url,
    pub modules: Vec<ModuleEntry>,
    pub dependencies: Vec<ModuleEntry>,
    /// The sentinel this manifest was parsed with (and will emit).
    pub sentinel: String,
}

/// One `mod` declaration.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    pub slug: Slug,
    pub source: EntrySource,
    /// Full-line comment block immediately above the entry, verbatim.
    pub comment: Option<String>,
}

/// Where a module's version and dependencies come from.
#[derive(Debug, Clone)]
pub enum EntrySource {
    /// Published on the forge, optionally pinned.
    Forge { version: Option<Version> },
    /// Pinned to a repository, optionally at a reference.
    Git {
        url: Url,
        reference: Option<String>,
    },
}

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// A line containing this text switches subsequent `mod` entries to
    /// the dependent-modules list.
    pub dependency_sentinel: String,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dependency_sentinel: DEFAULT_DEPENDENCY_SENTINEL.to_string(),
        }
    }
}

impl Puppetfile {
    /// Parse a manifest with the default sentinel.
    pub fn parse(text: &str) -> Result<Self, Error> {
        Self::parse_with(text, &ParseOptions::default())
    }

    /// Parse a manifest.
    pub fn parse_with(text: &str, options: &ParseOptions) -> Result<Self, Error> {
        parser::parse(text, options)
    }

    /// Emit the canonical text form: forge line, optional preamble,
    /// repository modules then forge modules (each sorted by slug), the
    /// sentinel, then dependent modules sorted by slug. Comment blocks are
    /// reproduced verbatim above their module.
    pub fn render(&self, preamble: Option<&str>) -> String {
        emitter::render(self, preamble)
    }
}

impl FromStr for Puppetfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
