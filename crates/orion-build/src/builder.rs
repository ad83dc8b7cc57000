use crate::error::BuildError;
use crate::graph_version::{compute_graph_version, VersionToken};
use crate::layout::GraphLayout;
use crate::merge_strategy::MergeStrategy;
use crate::merger::AnyMerger;
use crate::source_registry::SourceRegistry;
use orion_biolink::{BiolinkModel, InfoResourceCatalog};
use orion_common::model::get_str;
use orion_common::props;
use orion_common::Config;
use orion_metadata::{GraphMetadata, StageStatus};
use orion_pipeline::{PipelineOptions, PipelineRelease, SourceFetcher, SourcePipeline};
use orion_spec::{DataSource, GraphSpecSet, SubGraphSource};
use orion_stream::jsonl::JsonlReader;
use orion_stream::kgx_writer::KgxWriter;
use orion_validate::{QcReport, Validator};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// The outcome of building one graph (directly requested, or as a subgraph
/// dependency of another), per `spec.md` §4.8.
#[derive(Debug, Clone)]
pub struct GraphBuildResult {
    pub graph_id: String,
    pub graph_version: String,
    pub nodes_path: PathBuf,
    pub edges_path: PathBuf,
    pub qc_report: QcReport,
}

type BuildFuture<'s> = Pin<Box<dyn Future<Output = Result<GraphBuildResult, BuildError>> + 's>>;

/// One source or subgraph's contribution to a graph's merge, tagged with
/// its `spec.md` §4.7 merge-strategy tier so the three-tier ordering
/// (primary, then connected_edge_subset, then dont_merge_edges) can be
/// applied uniformly regardless of whether the contribution came from a
/// direct source or an already-built subgraph.
struct Contribution {
    tier: MergeStrategy,
    nodes_path: PathBuf,
    edges_path: PathBuf,
    edge_merging_attributes: Vec<String>,
}

/// Resolves a [`GraphSpecSet`] entry to a concrete build: resolves source
/// and subgraph versions, drives each source's [`SourcePipeline`], merges
/// their outputs with the ordering and selection rules of `spec.md` §4.7,
/// and records graph-level metadata, per `spec.md` §4.8.
pub struct GraphBuilder<'a> {
    config: &'a Config,
    biolink: &'a BiolinkModel,
    info_resources: &'a dyn InfoResourceCatalog,
    registry: &'a dyn SourceRegistry,
    spec: &'a GraphSpecSet,
    options: PipelineOptions,
    latest_version_cache: HashMap<String, String>,
    built: HashMap<String, GraphBuildResult>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(
        config: &'a Config,
        biolink: &'a BiolinkModel,
        info_resources: &'a dyn InfoResourceCatalog,
        registry: &'a dyn SourceRegistry,
        spec: &'a GraphSpecSet,
        options: PipelineOptions,
    ) -> Self {
        GraphBuilder {
            config,
            biolink,
            info_resources,
            registry,
            spec,
            options,
            latest_version_cache: HashMap::new(),
            built: HashMap::new(),
        }
    }

    /// Builds `graph_id`, recursively building any subgraph it depends on
    /// first. Cycles in the subgraph dependency graph are rejected up front
    /// via [`GraphSpecSet::build_order`] (Kahn's algorithm), per the
    /// REDESIGN FLAG in `spec.md` §9.
    pub async fn build_graph(&mut self, graph_id: &str) -> Result<GraphBuildResult, BuildError> {
        self.spec.build_order(graph_id)?;
        self.ensure_graph(graph_id.to_string()).await
    }

    /// Returns a cached result if this graph id was already built earlier
    /// in this process (e.g. as a shared subgraph dependency of two
    /// different graphs in a `build all` invocation), else builds it.
    fn ensure_graph(&mut self, graph_id: String) -> BuildFuture<'_> {
        Box::pin(async move {
            if let Some(existing) = self.built.get(&graph_id) {
                return Ok(existing.clone());
            }
            let result = self.build_single(&graph_id).await?;
            self.built.insert(graph_id, result.clone());
            Ok(result)
        })
    }

    async fn resolve_latest_version(&mut self, source_id: &str) -> Result<String, BuildError> {
        if let Some(version) = self.latest_version_cache.get(source_id) {
            return Ok(version.clone());
        }
        let fetcher = self
            .registry
            .fetcher(source_id)
            .ok_or_else(|| BuildError::UnregisteredSource(source_id.to_string()))?;
        let version = fetcher.latest_version().await?;
        self.latest_version_cache
            .insert(source_id.to_string(), version.clone());
        Ok(version)
    }

    async fn run_source_pipeline(
        &mut self,
        source: &DataSource,
        source_version: &str,
    ) -> Result<PipelineRelease, BuildError> {
        let source_id = source.source_id.as_str();
        let fetcher = self
            .registry
            .fetcher(source_id)
            .ok_or_else(|| BuildError::UnregisteredSource(source_id.to_string()))?;
        let parser = self
            .registry
            .parser(source_id)
            .ok_or_else(|| BuildError::UnregisteredSource(source_id.to_string()))?;
        let parsing_version = source
            .parsing_version
            .clone()
            .unwrap_or_else(|| "latest".to_string());
        let default_provenance = self.registry.default_provenance(source_id);

        let mut pipeline = SourcePipeline::new(
            &self.config.storage_root,
            source_id,
            source_version,
            &parsing_version,
            source.normalization_scheme.clone(),
            self.biolink,
            self.config.node_norm_endpoint.to_string(),
            self.config.edge_norm_endpoint.to_string(),
            default_provenance,
            self.options,
        )?;

        let supplementer = self.registry.supplementer(source_id);
        let supplementation_version = self.registry.supplementation_version(source_id);
        let mut variant_normalizer = self.registry.variant_normalizer(source_id);
        let supplementer_tuple = supplementer
            .map(|s| (supplementation_version.as_str(), s, &mut *variant_normalizer));

        let release = pipeline
            .run(fetcher, parser, supplementer_tuple, self.info_resources)
            .await?;
        Ok(release)
    }

    async fn build_single(&mut self, graph_id: &str) -> Result<GraphBuildResult, BuildError> {
        let entry = self
            .spec
            .get(graph_id)
            .cloned()
            .ok_or_else(|| BuildError::UnknownGraph(graph_id.to_string()))?;

        let mut subgraph_results: Vec<(SubGraphSource, GraphBuildResult)> = Vec::new();
        for sub in &entry.subgraphs {
            let result = self.ensure_graph(sub.graph_id.clone()).await?;
            if let Some(expected) = &sub.graph_version {
                if expected != &result.graph_version {
                    return Err(BuildError::SubgraphVersionMismatch {
                        graph_id: graph_id.to_string(),
                        subgraph_id: sub.graph_id.clone(),
                        expected_version: expected.clone(),
                        found_version: result.graph_version.clone(),
                    });
                }
            }
            subgraph_results.push((sub.clone(), result));
        }

        let mut resolved_sources: Vec<(DataSource, String)> = Vec::new();
        for source in &entry.sources {
            let version = match &source.source_version {
                Some(v) => v.clone(),
                None => self.resolve_latest_version(&source.source_id).await?,
            };
            resolved_sources.push((source.clone(), version));
        }

        let source_tokens: Vec<VersionToken> = resolved_sources
            .iter()
            .map(|(s, v)| VersionToken::new(v.clone(), s.merge_strategy.clone()))
            .collect();
        let subgraph_tokens: Vec<VersionToken> = subgraph_results
            .iter()
            .map(|(s, r)| VersionToken::new(r.graph_version.clone(), s.merge_strategy.clone()))
            .collect();
        let graph_version = compute_graph_version(&source_tokens, &subgraph_tokens);

        let layout = GraphLayout::new(&self.config.graphs_root, graph_id, &graph_version);
        let mut graph_metadata =
            GraphMetadata::load_or_init(&self.config.graphs_root, graph_id, &graph_version)?;

        if graph_metadata.build_status(&graph_version) == StageStatus::Stable
            && layout.nodes_path().is_file()
            && layout.edges_path().is_file()
        {
            tracing::info!(graph_id, %graph_version, "graph already stable at this version, skipping build");
            let qc_report = load_qc_report(&layout.qc_results_path())?;
            return Ok(GraphBuildResult {
                graph_id: graph_id.to_string(),
                graph_version,
                nodes_path: layout.nodes_path(),
                edges_path: layout.edges_path(),
                qc_report,
            });
        }

        graph_metadata.update_build(&graph_version, |b| {
            b.build_status = StageStatus::InProgress;
        })?;

        let mut source_releases: BTreeMap<String, String> = BTreeMap::new();
        let mut built_sources: Vec<(DataSource, PipelineRelease)> = Vec::new();
        for (source, version) in &resolved_sources {
            match self.run_source_pipeline(source, version).await {
                Ok(release) => {
                    source_releases.insert(source.source_id.clone(), release.release_version.clone());
                    built_sources.push((source.clone(), release));
                }
                Err(err) => {
                    graph_metadata.update_build(&graph_version, |b| {
                        b.build_status = StageStatus::Failed;
                        b.build_error = Some(err.to_string());
                    })?;
                    return Err(err);
                }
            }
        }

        let result = self.merge_and_validate(graph_id, &graph_version, &layout, &entry, &built_sources, &subgraph_results);
        match result {
            Ok((qc_report,)) => {
                graph_metadata.update_build(&graph_version, |b| {
                    b.build_status = StageStatus::Stable;
                    b.source_releases = source_releases.clone();
                    b.build_info = serde_json::to_value(&qc_report).ok();
                })?;
                Ok(GraphBuildResult {
                    graph_id: graph_id.to_string(),
                    graph_version,
                    nodes_path: layout.nodes_path(),
                    edges_path: layout.edges_path(),
                    qc_report,
                })
            }
            Err(err) => {
                graph_metadata.update_build(&graph_version, |b| {
                    b.build_status = StageStatus::Failed;
                    b.build_error = Some(err.to_string());
                })?;
                Err(err)
            }
        }
    }

    /// Merges every contributing source/subgraph's normalized output into
    /// this graph's `nodes.jsonl`/`edges.jsonl`, then runs the Validator
    /// over the result, per `spec.md` §4.7/§4.9. Kept synchronous (no
    /// `.await`): once every source pipeline has produced its files, the
    /// remaining work is pure I/O and in-process merging.
    fn merge_and_validate(
        &self,
        graph_id: &str,
        graph_version: &str,
        layout: &GraphLayout,
        entry: &orion_spec::GraphEntry,
        built_sources: &[(DataSource, PipelineRelease)],
        subgraph_results: &[(SubGraphSource, GraphBuildResult)],
    ) -> Result<(QcReport,), BuildError> {
        let use_disk = entry.save_memory || built_sources.iter().any(|(s, _)| s.resource_hog);
        let (edge_merging_attributes, add_edge_id) = built_sources
            .iter()
            .find(|(s, _)| MergeStrategy::parse(s.merge_strategy.as_deref()) == MergeStrategy::Primary)
            .map(|(s, _)| (s.edge_merging_attributes.clone(), s.edge_id_addition))
            .unwrap_or_default();

        let spill_dir = layout.build_dir().join("spill");
        std::fs::create_dir_all(&spill_dir).map_err(orion_common::OrionError::from)?;
        let mut merger = AnyMerger::select(use_disk, &spill_dir, edge_merging_attributes, add_edge_id);

        let mut contributions: Vec<Contribution> = Vec::new();
        for (source, release) in built_sources {
            contributions.push(Contribution {
                tier: MergeStrategy::parse(source.merge_strategy.as_deref()),
                nodes_path: release.nodes_path.clone(),
                edges_path: release.edges_path.clone(),
                edge_merging_attributes: source.edge_merging_attributes.clone(),
            });
        }
        for (sub, result) in subgraph_results {
            contributions.push(Contribution {
                tier: MergeStrategy::parse(sub.merge_strategy.as_deref()),
                nodes_path: result.nodes_path.clone(),
                edges_path: result.edges_path.clone(),
                edge_merging_attributes: Vec::new(),
            });
        }
        // Stable sort: primary, connected_edge_subset, dont_merge_edges, in
        // that order, preserving declaration order within each tier, per
        // `spec.md` §4.7's required application order.
        contributions.sort_by_key(|c| c.tier);

        let mut frozen_node_ids: HashSet<String> = HashSet::new();
        let mut verbatim_edge_files: Vec<PathBuf> = Vec::new();

        for contribution in &contributions {
            match contribution.tier {
                MergeStrategy::Primary => {
                    for node in open_reader(&contribution.nodes_path)? {
                        let node = node.map_err(|source| BuildError::Stream {
                            path: contribution.nodes_path.display().to_string(),
                            source,
                        })?;
                        if let Some(id) = get_str(&node, props::ID) {
                            frozen_node_ids.insert(id.to_string());
                        }
                        merger.merge_node(node)?;
                    }
                    for edge in open_reader(&contribution.edges_path)? {
                        let edge = edge.map_err(|source| BuildError::Stream {
                            path: contribution.edges_path.display().to_string(),
                            source,
                        })?;
                        merger.merge_edge(edge, &contribution.edge_merging_attributes)?;
                    }
                }
                MergeStrategy::ConnectedEdgeSubset => {
                    let mut needed_node_ids: HashSet<String> = HashSet::new();
                    for edge in open_reader(&contribution.edges_path)? {
                        let edge = edge.map_err(|source| BuildError::Stream {
                            path: contribution.edges_path.display().to_string(),
                            source,
                        })?;
                        let subject = get_str(&edge, props::SUBJECT_ID).unwrap_or_default().to_string();
                        let object = get_str(&edge, props::OBJECT_ID).unwrap_or_default().to_string();
                        let subject_frozen = frozen_node_ids.contains(&subject);
                        let object_frozen = frozen_node_ids.contains(&object);
                        if !subject_frozen && !object_frozen {
                            continue;
                        }
                        if !subject_frozen {
                            needed_node_ids.insert(subject);
                        }
                        if !object_frozen {
                            needed_node_ids.insert(object);
                        }
                        merger.merge_edge(edge, &contribution.edge_merging_attributes)?;
                    }
                    for node in open_reader(&contribution.nodes_path)? {
                        let node = node.map_err(|source| BuildError::Stream {
                            path: contribution.nodes_path.display().to_string(),
                            source,
                        })?;
                        if let Some(id) = get_str(&node, props::ID) {
                            if needed_node_ids.contains(id) {
                                merger.merge_node(node)?;
                            }
                        }
                    }
                }
                MergeStrategy::DontMergeEdges => {
                    for node in open_reader(&contribution.nodes_path)? {
                        let node = node.map_err(|source| BuildError::Stream {
                            path: contribution.nodes_path.display().to_string(),
                            source,
                        })?;
                        merger.merge_node(node)?;
                    }
                    verbatim_edge_files.push(contribution.edges_path.clone());
                }
            }
        }

        merger.flush()?;

        {
            let mut writer = KgxWriter::nodes_and_edges(layout.nodes_path(), layout.edges_path())
                .map_err(|source| BuildError::Stream {
                    path: layout.build_dir().display().to_string(),
                    source,
                })?;
            for node in merger.drain_nodes()? {
                let node = node?;
                writer.write_node(&node).map_err(|source| BuildError::Stream {
                    path: layout.nodes_path().display().to_string(),
                    source,
                })?;
            }
            for edge in merger.drain_edges()? {
                let edge = edge?;
                writer.write_edge(&edge).map_err(|source| BuildError::Stream {
                    path: layout.edges_path().display().to_string(),
                    source,
                })?;
            }
            for path in &verbatim_edge_files {
                for edge in open_reader(path)? {
                    let edge = edge.map_err(|source| BuildError::Stream {
                        path: path.display().to_string(),
                        source,
                    })?;
                    writer.write_edge(&edge).map_err(|source| BuildError::Stream {
                        path: layout.edges_path().display().to_string(),
                        source,
                    })?;
                }
            }
            writer.flush().map_err(|source| BuildError::Stream {
                path: layout.edges_path().display().to_string(),
                source,
            })?;
        }

        let _ = std::fs::remove_dir_all(&spill_dir);
        tracing::info!(
            graph_id,
            %graph_version,
            merged_node_dupes = merger.merged_node_count(),
            merged_edge_dupes = merger.merged_edge_count(),
            "merged graph written"
        );

        let validator = Validator::new(self.biolink, self.info_resources);
        let qc_report = validator.validate(layout.nodes_path(), layout.edges_path(), true)?;

        let qc_bytes = serde_json::to_vec_pretty(&qc_report).map_err(orion_common::OrionError::from)?;
        std::fs::write(layout.qc_results_path(), qc_bytes).map_err(orion_common::OrionError::from)?;

        Ok((qc_report,))
    }
}

fn open_reader(path: &Path) -> Result<JsonlReader, BuildError> {
    JsonlReader::open(path).map_err(|source| BuildError::Stream {
        path: path.display().to_string(),
        source,
    })
}

fn load_qc_report(path: &Path) -> Result<QcReport, BuildError> {
    let bytes = std::fs::read(path).map_err(orion_common::OrionError::from)?;
    serde_json::from_slice(&bytes).map_err(|e| orion_common::OrionError::from(e).into())
}
