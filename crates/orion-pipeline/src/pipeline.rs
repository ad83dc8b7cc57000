use crate::collaborators::{SourceFetcher, SourceParser, VariantSupplementer};
use crate::error::PipelineError;
use crate::options::PipelineOptions;
use crate::paths::SourceLayout;
use orion_biolink::{BiolinkModel, InfoResourceCatalog};
use orion_kgx::{
    FileNormalizer, FileNormalizerOptions, FileNormalizerPaths, IdentityVariantNormalizer,
    NormalizationCounters, SequenceVariantNormalizer,
};
use orion_metadata::{store, SourceMetadata, StageStatus};
use orion_normalize::{EdgeNormalizer, NodeNormalizer};
use orion_spec::NormalizationScheme;
use orion_validate::{QcReport, Validator};
use std::path::PathBuf;

/// The result of carrying one source all the way through fetch, parse,
/// normalize, (optional) supplement, and QC/release, per `spec.md` §4.1's
/// stage pipeline.
#[derive(Debug, Clone)]
pub struct PipelineRelease {
    pub release_version: String,
    pub nodes_path: PathBuf,
    pub edges_path: PathBuf,
    pub has_sequence_variants: bool,
    pub qc_report: QcReport,
}

/// Orchestrates a single `(source_id, source_version)` through its storage
/// layout, gating each stage on its persisted [`StageStatus`] so a rerun
/// resumes exactly where a prior run stopped, per `spec.md` §4.1.
pub struct SourcePipeline<'a> {
    layout: SourceLayout,
    metadata: SourceMetadata,
    scheme: NormalizationScheme,
    parsing_version: String,
    biolink: &'a BiolinkModel,
    node_norm_endpoint: String,
    edge_norm_endpoint: String,
    default_provenance: String,
    options: PipelineOptions,
}

impl<'a> SourcePipeline<'a> {
    pub fn new(
        storage_root: &std::path::Path,
        source_id: &str,
        source_version: &str,
        parsing_version: &str,
        scheme: NormalizationScheme,
        biolink: &'a BiolinkModel,
        node_norm_endpoint: impl Into<String>,
        edge_norm_endpoint: impl Into<String>,
        default_provenance: impl Into<String>,
        options: PipelineOptions,
    ) -> Result<Self, PipelineError> {
        let layout = SourceLayout::new(storage_root, source_id, source_version);
        let mut metadata = SourceMetadata::load_or_init(layout.source_dir(), source_id, source_version)?;
        if options.fresh {
            metadata.clear()?;
        }
        Ok(SourcePipeline {
            layout,
            metadata,
            scheme,
            parsing_version: parsing_version.to_string(),
            biolink,
            node_norm_endpoint: node_norm_endpoint.into(),
            edge_norm_endpoint: edge_norm_endpoint.into(),
            default_provenance: default_provenance.into(),
            options,
        })
    }

    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    /// Downloads raw source data, per `spec.md` §4.2.
    pub async fn fetch(&mut self, fetcher: &dyn SourceFetcher) -> Result<(), PipelineError> {
        let source_id = self.layout.source_id().to_string();
        let gate = store::begin_stage(&source_id, "fetch", self.metadata.fetch_status())?;
        if gate == orion_metadata::StageGate::Skip {
            tracing::info!(source_id = %source_id, "fetch already stable, skipping");
            return Ok(());
        }
        self.metadata.set_fetch_status(StageStatus::InProgress)?;
        let raw_dir = self.layout.raw_dir();
        std::fs::create_dir_all(&raw_dir).map_err(orion_common::OrionError::from)?;

        match fetcher.fetch(self.layout.source_version(), &raw_dir).await {
            Ok(()) => {
                self.metadata.set_fetch_status(StageStatus::Stable)?;
                Ok(())
            }
            Err(err) => {
                self.metadata.set_fetch_error(err.to_string())?;
                self.metadata.set_fetch_status(StageStatus::Failed)?;
                Err(err.into())
            }
        }
    }

    /// Invokes the parser, writing `source_nodes.jsonl`/`source_edges.jsonl`
    /// and recording `has_sequence_variants`, per `spec.md` §4.2.
    pub async fn parse(&mut self, parser: &dyn SourceParser) -> Result<bool, PipelineError> {
        let source_id = self.layout.source_id().to_string();
        let status = self.metadata.parsing_status(&self.parsing_version);
        let gate = store::begin_stage(&source_id, "parse", status)?;
        if gate == orion_metadata::StageGate::Skip {
            return Ok(self.metadata.has_sequence_variants(&self.parsing_version));
        }
        self.metadata.update_parsing(&self.parsing_version, |p| {
            p.parsing_status = StageStatus::InProgress;
        })?;

        let nodes_out = self.layout.parsed_nodes(&self.parsing_version);
        let edges_out = self.layout.parsed_edges(&self.parsing_version);
        let raw_dir = self.layout.raw_dir();

        match parser.parse(&raw_dir, &nodes_out, &edges_out).await {
            Ok(outcome) => {
                self.metadata.update_parsing(&self.parsing_version, |p| {
                    p.parsing_status = StageStatus::Stable;
                    p.has_sequence_variants = Some(outcome.has_sequence_variants);
                })?;
                Ok(outcome.has_sequence_variants)
            }
            Err(err) => {
                self.metadata.update_parsing(&self.parsing_version, |p| {
                    p.parsing_status = StageStatus::Failed;
                    p.parsing_error = Some(err.to_string());
                })?;
                Err(err.into())
            }
        }
    }

    /// Normalizes the parsed node/edge files against the node- and
    /// edge-normalization services, per `spec.md` §4.3/§4.4.
    pub async fn normalize(
        &mut self,
        variant_normalizer: Option<&mut dyn SequenceVariantNormalizer>,
    ) -> Result<NormalizationCounters, PipelineError> {
        let source_id = self.layout.source_id().to_string();
        let composite = self.scheme.composite_version();
        let status = self.metadata.normalization_status(&self.parsing_version, &composite);
        let gate = store::begin_stage(&source_id, "normalize", status)?;
        if gate == orion_metadata::StageGate::Skip {
            return Ok(NormalizationCounters::default());
        }
        self.metadata.update_normalization(&self.parsing_version, &composite, |n| {
            n.normalization_status = StageStatus::InProgress;
        })?;

        let has_sequence_variants = self.metadata.has_sequence_variants(&self.parsing_version);
        let paths = FileNormalizerPaths {
            source_nodes: self.layout.parsed_nodes(&self.parsing_version),
            nodes_output: self.layout.normalized_nodes(&self.parsing_version, &composite),
            node_norm_map: self.layout.norm_node_map(&self.parsing_version, &composite),
            node_norm_failures: self.layout.norm_node_failures(&self.parsing_version, &composite),
            source_edges: self.layout.parsed_edges(&self.parsing_version),
            edges_output: self.layout.normalized_edges(&self.parsing_version, &composite),
            edge_norm_predicate_map: self.layout.norm_predicate_map(&self.parsing_version, &composite),
        };

        let strict = self.scheme.strict && !self.options.lenient;
        let node_normalizer = NodeNormalizer::new(
            self.node_norm_endpoint.clone(),
            strict,
            self.scheme.conflation,
            self.options.include_taxa,
        );
        let edge_normalizer = EdgeNormalizer::new(
            self.edge_norm_endpoint.clone(),
            self.scheme.edge_normalization_version.clone(),
        );
        let mut normalizer = FileNormalizer::new(
            paths,
            FileNormalizerOptions {
                has_sequence_variants,
                preserve_unconnected_nodes: self.options.preserve_unconnected_nodes,
                ..FileNormalizerOptions::default()
            },
            self.default_provenance.clone(),
            node_normalizer,
            self.node_norm_endpoint.clone(),
            edge_normalizer,
            self.biolink,
        );

        match normalizer.normalize_kgx_files(variant_normalizer).await {
            Ok(counters) => {
                let info = serde_json::to_value(&counters).unwrap_or(serde_json::Value::Null);
                self.metadata.update_normalization(&self.parsing_version, &composite, |n| {
                    n.normalization_status = StageStatus::Stable;
                    n.node_normalization_version = Some(self.scheme.node_normalization_version.clone());
                    n.edge_normalization_version = Some(self.scheme.edge_normalization_version.clone());
                    n.strict_normalization = Some(strict);
                    n.conflation = Some(self.scheme.conflation);
                    n.normalization_info = Some(info);
                })?;
                Ok(counters)
            }
            Err(err) => {
                self.metadata.update_normalization(&self.parsing_version, &composite, |n| {
                    n.normalization_status = StageStatus::Failed;
                    n.normalization_error = Some(err.to_string());
                })?;
                Err(err.into())
            }
        }
    }

    /// Annotates normalized `SequenceVariant` nodes via an external
    /// supplementer, then normalizes the supplement's own output through the
    /// same node/edge normalization pass, per `spec.md` §4.6.
    pub async fn supplement(
        &mut self,
        supplementation_version: &str,
        supplementer: &dyn VariantSupplementer,
    ) -> Result<NormalizationCounters, PipelineError> {
        let source_id = self.layout.source_id().to_string();
        let composite = self.scheme.composite_version();
        let status =
            self.metadata
                .supplementation_status(&self.parsing_version, &composite, supplementation_version);
        let gate = store::begin_stage(&source_id, "supplement", status)?;
        if gate == orion_metadata::StageGate::Skip {
            return Ok(NormalizationCounters::default());
        }
        self.metadata
            .update_supplementation(&self.parsing_version, &composite, supplementation_version, |s| {
                s.supplementation_status = StageStatus::InProgress;
            })?;

        let normalized_nodes = self.layout.normalized_nodes(&self.parsing_version, &composite);
        let normalized_edges = self.layout.normalized_edges(&self.parsing_version, &composite);
        let supp_nodes = self
            .layout
            .supp_nodes(&self.parsing_version, &composite, supplementation_version);
        let supp_edges = self
            .layout
            .supp_edges(&self.parsing_version, &composite, supplementation_version);

        if let Err(err) = supplementer
            .supplement(&normalized_nodes, &normalized_edges, &supp_nodes, &supp_edges)
            .await
        {
            self.metadata
                .update_supplementation(&self.parsing_version, &composite, supplementation_version, |s| {
                    s.supplementation_status = StageStatus::Failed;
                    s.supplementation_error = Some(err.to_string());
                })?;
            return Err(err.into());
        }

        let supp_norm_nodes = self
            .layout
            .supp_norm_nodes(&self.parsing_version, &composite, supplementation_version);
        let supp_norm_edges = self
            .layout
            .supp_norm_edges(&self.parsing_version, &composite, supplementation_version);

        let paths = FileNormalizerPaths {
            source_nodes: supp_nodes,
            nodes_output: supp_norm_nodes,
            node_norm_map: self
                .layout
                .norm_node_map(&self.parsing_version, &composite),
            node_norm_failures: self
                .layout
                .norm_node_failures(&self.parsing_version, &composite),
            source_edges: supp_edges,
            edges_output: supp_norm_edges,
            edge_norm_predicate_map: self
                .layout
                .norm_predicate_map(&self.parsing_version, &composite),
        };
        let strict = self.scheme.strict && !self.options.lenient;
        let node_normalizer = NodeNormalizer::new(
            self.node_norm_endpoint.clone(),
            strict,
            self.scheme.conflation,
            self.options.include_taxa,
        );
        let edge_normalizer = EdgeNormalizer::new(
            self.edge_norm_endpoint.clone(),
            self.scheme.edge_normalization_version.clone(),
        );
        let mut normalizer = FileNormalizer::new(
            paths,
            FileNormalizerOptions {
                preserve_unconnected_nodes: true,
                ..FileNormalizerOptions::default()
            },
            self.default_provenance.clone(),
            node_normalizer,
            self.node_norm_endpoint.clone(),
            edge_normalizer,
            self.biolink,
        );

        let mut identity = IdentityVariantNormalizer;
        match normalizer.normalize_kgx_files(Some(&mut identity)).await {
            Ok(counters) => {
                let info = serde_json::to_value(&counters).unwrap_or(serde_json::Value::Null);
                self.metadata
                    .update_supplementation(&self.parsing_version, &composite, supplementation_version, |s| {
                        s.supplementation_status = StageStatus::Stable;
                        s.supplementation_info = Some(info);
                    })?;
                Ok(counters)
            }
            Err(err) => {
                self.metadata
                    .update_supplementation(&self.parsing_version, &composite, supplementation_version, |s| {
                        s.supplementation_status = StageStatus::Failed;
                        s.supplementation_error = Some(err.to_string());
                    })?;
                Err(err.into())
            }
        }
    }

    /// Runs the QC validator over the source's final node/edge files (the
    /// supplemented output if supplementation ran, otherwise the plain
    /// normalized output) and mints a release version, per `spec.md` §4.9.
    pub fn qc_and_release(
        &mut self,
        supplementation_version: Option<&str>,
        info_resources: &dyn InfoResourceCatalog,
    ) -> Result<PipelineRelease, PipelineError> {
        let composite = self.scheme.composite_version();
        let has_sequence_variants = self.metadata.has_sequence_variants(&self.parsing_version);
        let supplementation_version = supplementation_version.unwrap_or("none");

        let (nodes_path, edges_path) = if has_sequence_variants && supplementation_version != "none" {
            (
                self.layout
                    .supp_norm_nodes(&self.parsing_version, &composite, supplementation_version),
                self.layout
                    .supp_norm_edges(&self.parsing_version, &composite, supplementation_version),
            )
        } else {
            (
                self.layout.normalized_nodes(&self.parsing_version, &composite),
                self.layout.normalized_edges(&self.parsing_version, &composite),
            )
        };

        let validator = Validator::new(self.biolink, info_resources);
        let qc_report = validator.validate(&nodes_path, &edges_path, self.options.preserve_unconnected_nodes)?;

        let release_version = self.metadata.generate_release(
            &self.parsing_version,
            &composite,
            supplementation_version,
            serde_json::to_value(&qc_report)
                .ok()
                .and_then(|v| v.as_object().cloned())
                .unwrap_or_default(),
        )?;

        Ok(PipelineRelease {
            release_version,
            nodes_path,
            edges_path,
            has_sequence_variants,
            qc_report,
        })
    }

    /// Runs fetch, parse, normalize, (conditionally) supplement, then
    /// QC/release in sequence — the full `spec.md` §4.1 stage pipeline for
    /// one source.
    pub async fn run(
        &mut self,
        fetcher: &dyn SourceFetcher,
        parser: &dyn SourceParser,
        supplementer: Option<(&str, &dyn VariantSupplementer, &mut dyn SequenceVariantNormalizer)>,
        info_resources: &dyn InfoResourceCatalog,
    ) -> Result<PipelineRelease, PipelineError> {
        self.fetch(fetcher).await?;
        let has_sequence_variants = self.parse(parser).await?;

        let mut applied_supplementation_version = None;
        if has_sequence_variants {
            if let Some((supp_version, supplementer, variant_normalizer)) = supplementer {
                self.normalize(Some(variant_normalizer)).await?;
                self.supplement(supp_version, supplementer).await?;
                applied_supplementation_version = Some(supp_version.to_string());
            } else {
                self.normalize(None).await?;
            }
        } else {
            self.normalize(None).await?;
        }

        self.qc_and_release(applied_supplementation_version.as_deref(), info_resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::ParseOutcome;
    use async_trait::async_trait;
    use orion_biolink::StaticInfoResourceCatalog;
    use orion_stream::jsonl::JsonlWriter;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixtureFetcher;

    #[async_trait]
    impl SourceFetcher for FixtureFetcher {
        async fn latest_version(&self) -> orion_common::OrionResult<String> {
            Ok("2024-01-01".to_string())
        }

        async fn fetch(&self, _source_version: &str, raw_dir: &std::path::Path) -> orion_common::OrionResult<()> {
            std::fs::write(raw_dir.join("raw.txt"), "fixture data")?;
            Ok(())
        }
    }

    struct FixtureParser;

    #[async_trait]
    impl SourceParser for FixtureParser {
        async fn parse(
            &self,
            _raw_dir: &std::path::Path,
            nodes_out: &std::path::Path,
            edges_out: &std::path::Path,
        ) -> orion_common::OrionResult<ParseOutcome> {
            let mut nw = JsonlWriter::create(nodes_out).unwrap();
            nw.write(json!({"id": "MONDO:1", "name": "", "category": ["biolink:Disease"]}).as_object().unwrap())
                .unwrap();
            nw.write(json!({"id": "MONDO:2", "name": "", "category": ["biolink:Disease"]}).as_object().unwrap())
                .unwrap();
            nw.flush().unwrap();

            let mut ew = JsonlWriter::create(edges_out).unwrap();
            ew.write(
                json!({"subject": "MONDO:1", "predicate": "related_to", "object": "MONDO:2", "primary_knowledge_source": "infores:test"})
                    .as_object()
                    .unwrap(),
            )
            .unwrap();
            ew.flush().unwrap();

            Ok(ParseOutcome { has_sequence_variants: false })
        }
    }

    async fn mock_normalization_services() -> (MockServer, MockServer) {
        let node_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_normalized_nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MONDO:1": {
                    "id": {"identifier": "MONDO:1", "label": "disease one"},
                    "type": ["biolink:Disease"],
                    "equivalent_identifiers": [{"identifier": "MONDO:1"}]
                },
                "MONDO:2": {
                    "id": {"identifier": "MONDO:2", "label": "disease two"},
                    "type": ["biolink:Disease"],
                    "equivalent_identifiers": [{"identifier": "MONDO:2"}]
                }
            })))
            .mount(&node_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"babel_version": "test-1"})))
            .mount(&node_server)
            .await;

        let edge_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve_predicate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "related_to": {"predicate": "related_to", "inverted": false}
            })))
            .mount(&edge_server)
            .await;

        (node_server, edge_server)
    }

    #[tokio::test]
    async fn runs_every_stage_and_mints_a_release() {
        let (node_server, edge_server) = mock_normalization_services().await;
        let storage = tempfile::tempdir().unwrap();
        let biolink = BiolinkModel::load().unwrap();
        let catalog = StaticInfoResourceCatalog::empty();

        let mut pipeline = SourcePipeline::new(
            storage.path(),
            "TEST",
            "2024-01-01",
            "p1",
            NormalizationScheme::default(),
            &biolink,
            format!("{}/", node_server.uri()),
            format!("{}/", edge_server.uri()),
            "infores:test",
            PipelineOptions::default(),
        )
        .unwrap();

        let release = pipeline
            .run(&FixtureFetcher, &FixtureParser, None, &catalog)
            .await
            .unwrap();

        assert_eq!(release.qc_report.node_count, 2);
        assert_eq!(release.qc_report.edge_count, 1);
        assert!(!release.has_sequence_variants);
        assert!(release.nodes_path.is_file());

        assert_eq!(pipeline.metadata().fetch_status(), StageStatus::Stable);
        assert_eq!(pipeline.metadata().parsing_status("p1"), StageStatus::Stable);
    }

    #[tokio::test]
    async fn fresh_option_clears_prior_stage_status() {
        let (node_server, edge_server) = mock_normalization_services().await;
        let storage = tempfile::tempdir().unwrap();
        let biolink = BiolinkModel::load().unwrap();
        let catalog = StaticInfoResourceCatalog::empty();

        {
            let mut pipeline = SourcePipeline::new(
                storage.path(),
                "TEST",
                "2024-01-01",
                "p1",
                NormalizationScheme::default(),
                &biolink,
                format!("{}/", node_server.uri()),
                format!("{}/", edge_server.uri()),
                "infores:test",
                PipelineOptions::default(),
            )
            .unwrap();
            pipeline.run(&FixtureFetcher, &FixtureParser, None, &catalog).await.unwrap();
        }

        let pipeline = SourcePipeline::new(
            storage.path(),
            "TEST",
            "2024-01-01",
            "p1",
            NormalizationScheme::default(),
            &biolink,
            format!("{}/", node_server.uri()),
            format!("{}/", edge_server.uri()),
            "infores:test",
            PipelineOptions { fresh: true, ..PipelineOptions::default() },
        )
        .unwrap();
        assert_eq!(pipeline.metadata().fetch_status(), StageStatus::NotStarted);
    }
}
