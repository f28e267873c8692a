//! Diagnostic snapshot written when a resolution fails.

use serde::Serialize;

use pinion_forge::{CacheSnapshot, ForgeCache};

use crate::graph::DependencyGraph;
use crate::module::{Module, ModuleKind};

/// The forge cache and dependency graph of a failed run, in a cycle-safe
/// encoding: each module is serialized once under its node, and edges
/// refer to nodes by slug id.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticDump {
    forge_cache: CacheSnapshot,
    dependency_graph: GraphDump,
}

#[derive(Debug, Serialize)]
struct GraphDump {
    nodes: Vec<NodeDump>,
    edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
struct NodeDump {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    module: Option<ModuleDump>,
}

#[derive(Debug, Serialize)]
struct ModuleDump {
    slug: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repo_ref: Option<String>,
}

#[derive(Debug, Serialize)]
struct EdgeDump {
    source: String,
    target: String,
    range: String,
}

impl DiagnosticDump {
    pub(crate) fn new(cache: &ForgeCache, graph: &DependencyGraph) -> Self {
        let mut nodes: Vec<NodeDump> = graph
            .modules()
            .map(|module| NodeDump {
                id: module.slug().to_string(),
                module: Some(ModuleDump::new(module)),
            })
            .collect();
        nodes.push(NodeDump {
            id: "manifest".to_string(),
            module: None,
        });
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges: Vec<EdgeDump> = graph
            .edges()
            .into_iter()
            .map(|(source, target, range)| EdgeDump {
                source: source.to_string(),
                target: target.to_string(),
                range: range.to_string(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));

        Self {
            forge_cache: cache.snapshot(),
            dependency_graph: GraphDump { nodes, edges },
        }
    }

    /// Pretty-printed JSON, as written to the dump file.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl ModuleDump {
    fn new(module: &Module) -> Self {
        let (kind, repo_url, repo_ref) = match module.kind() {
            ModuleKind::Forge { .. } => ("forge", None, None),
            ModuleKind::Repo { url, reference, .. } => {
                ("repo", Some(url.to_string()), reference.clone())
            }
        };
        Self {
            slug: module.slug().to_string(),
            kind,
            version: module.version().map(ToString::to_string),
            repo_url,
            repo_ref,
        }
    }
}
