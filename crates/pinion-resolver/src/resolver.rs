use rustc_hash::{FxHashMap, FxHashSet};
use semver::Version;
use tracing::{debug, warn};

use pinion_forge::{ForgeCache, ForgeClient};
use pinion_puppetfile::{EntrySource, ModuleEntry, Puppetfile};
use pinion_types::{Slug, VersionRange};

use crate::dump::DiagnosticDump;
use crate::error::ResolveError;
use crate::graph::{DependencyGraph, GraphEdge, GraphKey, GraphNode};
use crate::module::{Module, ModuleKind};
use crate::requirement::{Requirement, RequirementSource};
use crate::store::RequirementQueue;

/// Policies for a resolution run.
#[derive(Debug, Clone, Default)]
pub struct ResolverOptions {
    /// Slugs omitted from the output manifest.
    pub hide: FxHashSet<Slug>,
    /// Slugs whose deprecation and no-version-found errors are demoted
    /// to warnings.
    pub ignore: FxHashSet<Slug>,
}

/// Drives the requirement queue against the dependency graph until every
/// transitively required module is pinned to a version satisfying all
/// declared ranges.
///
/// All run state (graph, queue, forge cache) lives here and is reset at
/// the start of each [`resolve`](Resolver::resolve) call.
pub struct Resolver {
    manifest: Puppetfile,
    options: ResolverOptions,
    cache: ForgeCache,
    graph: DependencyGraph,
    queue: RequirementQueue,
    /// Slugs declared top-level in the input manifest.
    top_level: FxHashSet<Slug>,
    /// Comment blocks from the input, re-attached on emission.
    comments: FxHashMap<Slug, String>,
}

impl Resolver {
    pub fn new(manifest: Puppetfile, client: ForgeClient, options: ResolverOptions) -> Self {
        Self {
            manifest,
            options,
            cache: ForgeCache::new(client),
            graph: DependencyGraph::new(),
            queue: RequirementQueue::new(),
            top_level: FxHashSet::default(),
            comments: FxHashMap::default(),
        }
    }

    /// Resolve the manifest into a new manifest with every module pinned.
    pub async fn resolve(&mut self) -> Result<Puppetfile, ResolveError> {
        self.graph.clear();
        self.cache.clear();
        self.queue = RequirementQueue::new();
        self.top_level.clear();
        self.comments.clear();

        self.seed().await?;
        while let Some(requirement) = self.queue.next() {
            self.step(requirement).await?;
        }
        if !self.graph.is_satisfied() {
            warn!("resolution finished with unsatisfied constraints on ignored modules");
        }
        Ok(self.emit())
    }

    /// Snapshot of the forge cache and dependency graph, for offline
    /// analysis of a failed run.
    pub fn diagnostics(&self) -> DiagnosticDump {
        DiagnosticDump::new(&self.cache, &self.graph)
    }

    /// The dependency graph as of the last [`resolve`](Resolver::resolve)
    /// call.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Enqueue one exact-version requirement per top-level module, in
    /// declaration order.
    async fn seed(&mut self) -> Result<(), ResolveError> {
        for entry in self.manifest.modules.iter().chain(&self.manifest.dependencies) {
            if let Some(comment) = &entry.comment {
                self.comments.insert(entry.slug.clone(), comment.clone());
            }
        }

        let forge = self.manifest.forge.clone();
        let entries: Vec<ModuleEntry> = self.manifest.modules.clone();
        for entry in &entries {
            self.top_level.insert(entry.slug.clone());
            let module = Module::from_entry(entry, &forge, &mut self.cache).await?;
            let range = module
                .version()
                .map(VersionRange::exact)
                .unwrap_or_else(VersionRange::any);
            debug!("requiring `{module}` at {range}");
            self.queue.add(Requirement {
                source: RequirementSource::Manifest,
                target: module,
                range,
            });
        }
        Ok(())
    }

    async fn step(&mut self, mut requirement: Requirement) -> Result<(), ResolveError> {
        debug!("processing {requirement}");

        // Deprecation gates both endpoints of the requirement.
        if let Some(source) = requirement.source_module() {
            let source = source.clone();
            self.check_deprecation(&source).await?;
        }
        self.check_deprecation(&requirement.target).await?;

        // Record the nodes and the edge.
        let source_key = match &requirement.source {
            RequirementSource::Manifest => {
                self.graph.add_node(GraphKey::Manifest, GraphNode::Manifest);
                GraphKey::Manifest
            }
            RequirementSource::Module(module) => {
                let key = GraphKey::Module(module.slug().clone());
                self.graph
                    .add_node(key.clone(), GraphNode::Module((**module).clone()));
                key
            }
        };
        let target_key = GraphKey::Module(requirement.target.slug().clone());
        self.graph
            .add_node(target_key.clone(), GraphNode::Module(requirement.target.clone()));
        self.graph.add_edge(
            &source_key,
            &target_key,
            GraphEdge {
                range: requirement.range.clone(),
            },
        );

        // Search for a version the graph accepts. The ignore list only
        // demotes a conflict between real releases; a target with no
        // release at all has no version to emit and stays fatal.
        let old_version = requirement.target.version().cloned();
        let new_version = match requirement.select_version(&self.graph, &mut self.cache).await {
            Ok(version) => version,
            Err(err @ ResolveError::NoVersionFound { .. })
                if self.options.ignore.contains(requirement.target.slug())
                    && requirement.target.version().is_some() =>
            {
                warn!("{err}; `{}` is ignored, skipping", requirement.target.slug());
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        if Some(&new_version) == old_version.as_ref() {
            self.expand(requirement).await
        } else {
            self.apply_version_change(requirement, new_version);
            Ok(())
        }
    }

    /// The target's version held: keep the graph's node current and
    /// enqueue the target's own dependencies.
    async fn expand(&mut self, requirement: Requirement) -> Result<(), ResolveError> {
        let slug = requirement.target.slug().clone();
        self.graph.set_module(&slug, requirement.target.clone());

        let forge = self.manifest.forge.clone();
        for mut dependency in requirement.target.dependencies(&forge, &mut self.cache).await? {
            // If the graph already holds a satisfying instance of the
            // dependency's target, adopt it; the requirement is still
            // enqueued so its edge gets recorded.
            if let Some(existing) = self.graph.module(dependency.target.slug()) {
                if self.graph.is_valid(existing) {
                    dependency.target = existing.clone();
                }
            }
            debug!("discovered {dependency}");
            self.queue.add(dependency);
        }
        Ok(())
    }

    /// The target was re-versioned: invalidate everything derived from
    /// its old version and re-queue its incoming requirements.
    fn apply_version_change(&mut self, mut requirement: Requirement, version: Version) {
        let slug = requirement.target.slug().clone();
        debug!("revising `{slug}` to {version}");
        requirement.target.set_version(version.clone());
        self.queue.update_target_version(&slug, &version);

        self.invalidate_children(&slug);
        self.queue.delete_source_requirements(&slug);

        for (source, range) in self.graph.in_edges(&slug) {
            let source = match source {
                GraphKey::Manifest => RequirementSource::Manifest,
                GraphKey::Module(source_slug) => match self.graph.module(&source_slug) {
                    Some(module) => RequirementSource::Module(Box::new(module.clone())),
                    None => continue,
                },
            };
            self.queue.add(Requirement {
                source,
                target: requirement.target.clone(),
                range,
            });
        }
        self.graph.remove_node(&slug);
    }

    /// Drop children of `slug` that no other source requires; their
    /// subgraphs were derived from the old version and will be re-derived
    /// after the change. A child that another source still requires
    /// survives.
    fn invalidate_children(&mut self, slug: &Slug) {
        let origin = GraphKey::Module(slug.clone());
        let mut stack: Vec<(GraphKey, Slug)> = self
            .graph
            .out_neighbors(slug)
            .into_iter()
            .map(|child| (origin.clone(), child))
            .collect();
        while let Some((parent, child)) = stack.pop() {
            if self.graph.has_other_source(&child, &parent) {
                continue;
            }
            debug!("invalidating `{child}`");
            let grandchildren = self.graph.out_neighbors(&child);
            let child_key = GraphKey::Module(child.clone());
            self.graph.remove_node(&child);
            self.queue.delete_source_requirements(&child);
            stack.extend(
                grandchildren
                    .into_iter()
                    .map(|grandchild| (child_key.clone(), grandchild)),
            );
        }
    }

    async fn check_deprecation(&mut self, module: &Module) -> Result<(), ResolveError> {
        let Some(status) = module.deprecation_status(&mut self.cache).await? else {
            return Ok(());
        };
        let slug = module.slug();
        if self.options.ignore.contains(slug) {
            warn!("module `{slug}` is deprecated ({status}); ignored");
            Ok(())
        } else {
            Err(ResolveError::ModuleDeprecated {
                slug: slug.clone(),
                status,
            })
        }
    }

    /// Walk the graph into a new manifest. A module lands in the
    /// top-level list iff it was top-level in the input or the manifest
    /// itself requires it; everything else is a dependent module. Hidden
    /// slugs are omitted.
    fn emit(&self) -> Puppetfile {
        let mut modules = Vec::new();
        let mut dependencies = Vec::new();
        for module in self.graph.modules() {
            let slug = module.slug();
            if self.options.hide.contains(slug) {
                continue;
            }
            let source = match module.kind() {
                ModuleKind::Forge { .. } => EntrySource::Forge {
                    version: module.version().cloned(),
                },
                ModuleKind::Repo { url, reference, .. } => EntrySource::Git {
                    url: url.clone(),
                    reference: reference.clone(),
                },
            };
            let entry = ModuleEntry {
                slug: slug.clone(),
                source,
                comment: self.comments.get(slug).cloned(),
            };
            if self.top_level.contains(slug) || self.graph.has_manifest_source(slug) {
                modules.push(entry);
            } else {
                dependencies.push(entry);
            }
        }
        Puppetfile {
            forge: self.manifest.forge.clone(),
            modules,
            dependencies,
            sentinel: self.manifest.sentinel.clone(),
        }
    }
}
