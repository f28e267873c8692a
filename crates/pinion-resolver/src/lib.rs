//! Transitive dependency resolution for Puppetfile manifests.
//!
//! The resolver seeds a FIFO requirement queue from the manifest's
//! top-level modules, then drains it one requirement at a time: check
//! deprecation, record the requirement as an edge in the dependency
//! graph, search the target's release list for a version every incoming
//! constraint accepts, and either expand the target's dependencies or
//! invalidate and re-queue the affected subgraph when the version
//! changed. When the queue empties, the graph is walked to emit a new
//! manifest with every module pinned.

pub use crate::dump::DiagnosticDump;
pub use crate::error::ResolveError;
pub use crate::graph::{DependencyGraph, GraphEdge, GraphKey, GraphNode};
pub use crate::module::{Module, ModuleKind};
pub use crate::requirement::{Requirement, RequirementSource};
pub use crate::resolver::{Resolver, ResolverOptions};
pub use crate::store::RequirementQueue;

mod dump;
mod error;
mod graph;
mod module;
mod requirement;
mod resolver;
mod store;
