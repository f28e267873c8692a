use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use rustc_hash::FxHashMap;

use pinion_types::{Slug, VersionRange};

use crate::module::Module;

/// Identity of a node: the manifest root, or a module keyed by slug.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GraphKey {
    Manifest,
    Module(Slug),
}

impl std::fmt::Display for GraphKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manifest => f.write_str("manifest"),
            Self::Module(slug) => slug.fmt(f),
        }
    }
}

#[derive(Debug, Clone)]
pub enum GraphNode {
    Manifest,
    Module(Module),
}

/// The constraint a requirement imposes on its target.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub range: VersionRange,
}

/// Directed graph of modules and version-constrained requirement edges,
/// with at most one edge per (source, target) identity.
///
/// Nodes are created before any edge touching them; the resolver drops
/// and re-adds nodes mid-run, so indices are stable.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: StableDiGraph<GraphNode, GraphEdge>,
    index: FxHashMap<GraphKey, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.graph.clear();
        self.index.clear();
    }

    pub fn has_node(&self, key: &GraphKey) -> bool {
        self.index.contains_key(key)
    }

    /// Insert the node if absent; either way, return its index.
    pub fn add_node(&mut self, key: GraphKey, node: GraphNode) -> NodeIndex {
        if let Some(index) = self.index.get(&key) {
            return *index;
        }
        let index = self.graph.add_node(node);
        self.index.insert(key, index);
        index
    }

    /// The module held by `slug`'s node, if present.
    pub fn module(&self, slug: &Slug) -> Option<&Module> {
        let index = self.index.get(&GraphKey::Module(slug.clone()))?;
        match &self.graph[*index] {
            GraphNode::Module(module) => Some(module),
            GraphNode::Manifest => None,
        }
    }

    /// Replace the module held by `slug`'s node; false if absent.
    pub fn set_module(&mut self, slug: &Slug, module: Module) -> bool {
        let Some(index) = self.index.get(&GraphKey::Module(slug.clone())) else {
            return false;
        };
        self.graph[*index] = GraphNode::Module(module);
        true
    }

    pub fn has_edge(&self, source: &GraphKey, target: &GraphKey) -> bool {
        let (Some(source), Some(target)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        self.graph.find_edge(*source, *target).is_some()
    }

    /// Add the edge unless one with the same identity exists; both
    /// endpoints must already be present. Returns whether it was added.
    pub fn add_edge(&mut self, source: &GraphKey, target: &GraphKey, edge: GraphEdge) -> bool {
        let (Some(&source), Some(&target)) = (self.index.get(source), self.index.get(target))
        else {
            return false;
        };
        if self.graph.find_edge(source, target).is_some() {
            return false;
        }
        self.graph.add_edge(source, target, edge);
        true
    }

    /// Incoming constraints on `slug`: (source identity, range) pairs.
    pub fn in_edges(&self, slug: &Slug) -> Vec<(GraphKey, VersionRange)> {
        let Some(&index) = self.index.get(&GraphKey::Module(slug.clone())) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| (self.key_of(edge.source()), edge.weight().range.clone()))
            .collect()
    }

    /// Slugs this node's own requirements point at.
    pub fn out_neighbors(&self, slug: &Slug) -> Vec<Slug> {
        let Some(&index) = self.index.get(&GraphKey::Module(slug.clone())) else {
            return Vec::new();
        };
        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge| match self.key_of(edge.target()) {
                GraphKey::Module(slug) => Some(slug),
                GraphKey::Manifest => None,
            })
            .collect()
    }

    /// Whether `slug` has an incoming edge from a source other than
    /// `from`.
    pub fn has_other_source(&self, slug: &Slug, from: &GraphKey) -> bool {
        self.in_edges(slug).iter().any(|(source, _)| source != from)
    }

    /// Whether `slug` is required directly by the manifest.
    pub fn has_manifest_source(&self, slug: &Slug) -> bool {
        let (Some(&manifest), Some(&target)) = (
            self.index.get(&GraphKey::Manifest),
            self.index.get(&GraphKey::Module(slug.clone())),
        ) else {
            return false;
        };
        self.graph.find_edge(manifest, target).is_some()
    }

    /// Drop `slug`'s node along with every incident edge.
    pub fn remove_node(&mut self, slug: &Slug) {
        if let Some(index) = self.index.remove(&GraphKey::Module(slug.clone())) {
            self.graph.remove_node(index);
        }
    }

    /// Every incoming range accepts the module's version; a module
    /// without a version is trivially valid.
    pub fn is_valid(&self, module: &Module) -> bool {
        let Some(version) = module.version() else {
            return true;
        };
        self.in_edges(module.slug())
            .iter()
            .all(|(_, range)| range.matches(version))
    }

    /// Whether every module node currently validates.
    pub fn is_satisfied(&self) -> bool {
        self.modules().all(|module| self.is_valid(module))
    }

    /// All module nodes, in arbitrary order.
    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.graph.node_weights().filter_map(|node| match node {
            GraphNode::Module(module) => Some(module),
            GraphNode::Manifest => None,
        })
    }

    /// All edges as (source, target, range), for serialization.
    pub fn edges(&self) -> Vec<(GraphKey, GraphKey, VersionRange)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    self.key_of(edge.source()),
                    self.key_of(edge.target()),
                    edge.weight().range.clone(),
                )
            })
            .collect()
    }

    fn key_of(&self, index: NodeIndex) -> GraphKey {
        match &self.graph[index] {
            GraphNode::Manifest => GraphKey::Manifest,
            GraphNode::Module(module) => GraphKey::Module(module.slug().clone()),
        }
    }
}
