//! Client and per-run cache for the module forge's v3 API.

pub use crate::api::{
    DeprecationStatus, ModuleData, Release, ReleaseData, ReleaseMetadata, SupersededBy,
};
pub use crate::cache::{CacheSnapshot, ForgeCache};
pub use crate::client::{ForgeClient, ForgeClientBuilder};
pub use crate::error::Error;

mod api;
mod cache;
mod client;
mod error;
