use thiserror::Error;
use url::Url;

use pinion_types::Slug;

#[derive(Debug, Error)]
pub enum Error {
    /// An invalid URL was produced for a forge endpoint.
    #[error(transparent)]
    UrlParse(#[from] url::ParseError),

    /// The module was not found in the registry.
    #[error("module `{0}` was not found in the registry")]
    ModuleNotFound(Slug),

    /// A transport or HTTP error talking to the registry.
    #[error(transparent)]
    Request(#[from] reqwest::Error),

    #[error("received unexpected JSON from {url}")]
    BadJson {
        #[source]
        source: serde_json::Error,
        url: Url,
    },
}
