//! Shared vocabulary types: module identities, version ranges, and the
//! `metadata.json` payload shapes consumed across the workspace.

pub use crate::metadata::{MetadataDependency, ModuleMetadata};
pub use crate::range::{InvalidRangeError, VersionRange};
pub use crate::slug::{InvalidSlugError, Slug};

mod metadata;
mod range;
mod slug;
