//! Fetch module repositories with the `git` CLI.
//!
//! Only anonymous access is supported: interactive credential prompts are
//! disabled, so a repository that needs authentication fails the clone.

use std::path::Path;
use std::process::Output;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;
use url::Url;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to invoke `git`")]
    Spawn(#[source] std::io::Error),

    #[error("`git {operation}` for `{url}` failed:\n{stderr}")]
    Command {
        operation: &'static str,
        url: Url,
        stderr: String,
    },
}

/// A reference within a repository: a branch, tag, or commit.
#[derive(Debug, Clone, Default)]
pub enum GitReference {
    /// Whatever the remote's default branch points at.
    #[default]
    DefaultBranch,
    /// Anything `git checkout` accepts.
    Rev(String),
}

impl GitReference {
    pub fn from_rev(rev: impl Into<String>) -> Self {
        Self::Rev(rev.into())
    }
}

/// An anonymous clone + checkout of a module repository.
#[derive(Debug, Clone)]
pub struct GitSource {
    url: Url,
    reference: GitReference,
}

impl GitSource {
    pub fn new(url: Url, reference: GitReference) -> Self {
        Self { url, reference }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Clone the repository into `destination` and check out the
    /// reference, if any.
    pub async fn fetch(&self, destination: &Path) -> Result<(), Error> {
        debug!("cloning {} into {}", self.url, destination.display());
        let mut clone = Command::new("git");
        clone
            .arg("clone")
            .arg("--quiet")
            .arg(self.url.as_str())
            .arg(destination);
        self.run(clone, "clone").await?;

        if let GitReference::Rev(rev) = &self.reference {
            debug!("checking out `{rev}`");
            let mut checkout = Command::new("git");
            checkout
                .arg("-C")
                .arg(destination)
                .arg("checkout")
                .arg("--quiet")
                .arg(rev);
            self.run(checkout, "checkout").await?;
        }
        Ok(())
    }

    async fn run(&self, mut command: Command, operation: &'static str) -> Result<(), Error> {
        let Output { status, stderr, .. } = command
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(Error::Spawn)?;
        if !status.success() {
            return Err(Error::Command {
                operation,
                url: self.url.clone(),
                stderr: String::from_utf8_lossy(&stderr).into_owned(),
            });
        }
        Ok(())
    }
}
