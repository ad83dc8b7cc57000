use crate::edge_file::{normalize_edge_file, remove_unconnected_nodes};
use crate::error::FileNormalizeError;
use crate::metadata::NormalizationCounters;
use crate::node_file::normalize_node_file;
use crate::variant::SequenceVariantNormalizer;
use orion_biolink::BiolinkModel;
use orion_normalize::{get_current_node_norm_version, EdgeNormalizer, NodeNormalizer};
use std::collections::HashMap;
use std::path::PathBuf;

/// File paths a [`FileNormalizer`] run reads and writes, per `spec.md` §4.5.
pub struct FileNormalizerPaths {
    pub source_nodes: PathBuf,
    pub nodes_output: PathBuf,
    pub node_norm_map: PathBuf,
    pub node_norm_failures: PathBuf,
    pub source_edges: PathBuf,
    pub edges_output: PathBuf,
    pub edge_norm_predicate_map: PathBuf,
}

/// Flags controlling which sides of an edge (or which predicates) are
/// treated as already normalized, and whether unconnected nodes survive.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileNormalizerOptions {
    pub edge_subject_pre_normalized: bool,
    pub edge_object_pre_normalized: bool,
    pub predicates_pre_normalized: bool,
    pub has_sequence_variants: bool,
    pub sequence_variants_pre_normalized: bool,
    pub preserve_unconnected_nodes: bool,
}

/// Orchestrates node and edge normalization for one source file pair, then
/// (unless `preserve_unconnected_nodes`) removes nodes the edge file no
/// longer references. Mirrors `orion/kgx_file_normalizer.py::KGXFileNormalizer`.
pub struct FileNormalizer<'a> {
    pub paths: FileNormalizerPaths,
    pub options: FileNormalizerOptions,
    pub default_provenance: String,
    pub node_normalizer: NodeNormalizer,
    pub node_norm_endpoint: String,
    pub edge_normalizer: EdgeNormalizer,
    pub biolink: &'a BiolinkModel,
    http_client: reqwest::Client,
}

impl<'a> FileNormalizer<'a> {
    pub fn new(
        paths: FileNormalizerPaths,
        options: FileNormalizerOptions,
        default_provenance: impl Into<String>,
        node_normalizer: NodeNormalizer,
        node_norm_endpoint: impl Into<String>,
        edge_normalizer: EdgeNormalizer,
        biolink: &'a BiolinkModel,
    ) -> Self {
        FileNormalizer {
            paths,
            options,
            default_provenance: default_provenance.into(),
            node_normalizer,
            node_norm_endpoint: node_norm_endpoint.into(),
            edge_normalizer,
            biolink,
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn normalize_kgx_files(
        &mut self,
        variant_normalizer: Option<&mut dyn SequenceVariantNormalizer>,
    ) -> Result<NormalizationCounters, FileNormalizeError> {
        let node_norm_version =
            get_current_node_norm_version(&self.http_client, &self.node_norm_endpoint).await.ok();

        let node_outcome = normalize_node_file(
            &self.paths.source_nodes,
            &self.paths.nodes_output,
            &self.node_normalizer,
            self.biolink,
            self.options.has_sequence_variants,
            self.options.sequence_variants_pre_normalized,
            variant_normalizer,
        )
        .await?;

        write_json_file(
            &self.paths.node_norm_map,
            &serde_json::json!({ "normalization_map": node_outcome.lookup }),
        )?;
        if !node_outcome.failed_ids.is_empty() || !node_outcome.variant_failures.is_empty() {
            write_failure_log(&self.paths.node_norm_failures, &node_outcome.failed_ids, &node_outcome.variant_failures)?;
        }

        let mut counters = node_outcome.counters;
        counters.node_norm_version = node_norm_version;
        counters.strict = self.node_normalizer.strict;
        counters.conflation = self.node_normalizer.conflate;

        let predicate_failures = normalize_edge_file(
            &self.paths.source_edges,
            &self.paths.edges_output,
            &mut self.edge_normalizer,
            &node_outcome.lookup,
            self.options.edge_subject_pre_normalized,
            self.options.edge_object_pre_normalized,
            self.options.predicates_pre_normalized,
            &self.default_provenance,
            &mut counters,
        )
        .await?;

        write_predicate_map(&self.paths.edge_norm_predicate_map, &self.edge_normalizer, &predicate_failures)?;

        if !self.options.preserve_unconnected_nodes {
            counters.unconnected_nodes_removed =
                remove_unconnected_nodes(&self.paths.nodes_output, &self.paths.edges_output)?;
        }

        Ok(counters)
    }
}

fn write_json_file(path: &std::path::Path, value: &serde_json::Value) -> Result<(), FileNormalizeError> {
    let text = serde_json::to_string_pretty(value).unwrap_or_default();
    std::fs::write(path, text).map_err(|source| FileNormalizeError::Stream {
        path: path.display().to_string(),
        source: orion_stream::jsonl::StreamError::Io(source),
    })
}

fn write_failure_log(
    path: &std::path::Path,
    regular_failures: &[String],
    variant_failures: &HashMap<String, String>,
) -> Result<(), FileNormalizeError> {
    let mut text = String::new();
    for id in regular_failures {
        text.push_str(id);
        text.push('\n');
    }
    for (id, err) in variant_failures {
        text.push_str(id);
        text.push('\t');
        text.push_str(err);
        text.push('\n');
    }
    std::fs::write(path, text).map_err(|source| FileNormalizeError::Stream {
        path: path.display().to_string(),
        source: orion_stream::jsonl::StreamError::Io(source),
    })
}

fn write_predicate_map(
    path: &std::path::Path,
    edge_normalizer: &EdgeNormalizer,
    failures: &[String],
) -> Result<(), FileNormalizeError> {
    let mut predicate_map = serde_json::Map::new();
    for (predicate, result) in edge_normalizer.entries() {
        predicate_map.insert(
            predicate.clone(),
            serde_json::json!({
                "predicate": result.predicate,
                "inverted": result.inverted,
                "properties": result.properties,
            }),
        );
    }
    let value = serde_json::json!({
        "predicate_map": predicate_map,
        "predicate_norm_failures": failures,
    });
    write_json_file(path, &value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_stream::jsonl::{read_jsonl, JsonlWriter};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn end_to_end_two_source_merge_candidate_normalizes_and_drops_unconnected_nodes() {
        let node_norm_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_normalized_nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "X:1": {
                    "id": {"identifier": "X:1", "label": "thing one"},
                    "type": ["biolink:NamedThing"],
                    "equivalent_identifiers": [{"identifier": "X:1"}]
                },
                "X:2": {
                    "id": {"identifier": "X:2", "label": "thing two"},
                    "type": ["biolink:NamedThing"],
                    "equivalent_identifiers": [{"identifier": "X:2"}]
                },
                "X:3": {
                    "id": {"identifier": "X:3", "label": "thing three"},
                    "type": ["biolink:NamedThing"],
                    "equivalent_identifiers": [{"identifier": "X:3"}]
                }
            })))
            .mount(&node_norm_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"babel_version": "test-1"})))
            .mount(&node_norm_server)
            .await;

        let edge_norm_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve_predicate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "related_to": {"predicate": "related_to", "inverted": false}
            })))
            .mount(&edge_norm_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let source_nodes = dir.path().join("source_nodes.jsonl");
        let source_edges = dir.path().join("source_edges.jsonl");

        let mut nw = JsonlWriter::create(&source_nodes).unwrap();
        nw.write(json!({"id": "X:1", "name": "", "category": ["biolink:NamedThing"]}).as_object().unwrap()).unwrap();
        nw.write(json!({"id": "X:2", "name": "", "category": ["biolink:NamedThing"]}).as_object().unwrap()).unwrap();
        nw.write(json!({"id": "X:3", "name": "", "category": ["biolink:NamedThing"]}).as_object().unwrap()).unwrap();
        nw.flush().unwrap();

        let mut ew = JsonlWriter::create(&source_edges).unwrap();
        ew.write(
            json!({"subject": "X:1", "predicate": "related_to", "object": "X:2", "primary_knowledge_source": "infores:a"})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        ew.flush().unwrap();

        let paths = FileNormalizerPaths {
            source_nodes,
            nodes_output: dir.path().join("nodes.jsonl"),
            node_norm_map: dir.path().join("node_norm_map.json"),
            node_norm_failures: dir.path().join("node_norm_failures.txt"),
            source_edges,
            edges_output: dir.path().join("edges.jsonl"),
            edge_norm_predicate_map: dir.path().join("predicate_map.json"),
        };

        let biolink = BiolinkModel::load().unwrap();
        let node_normalizer = NodeNormalizer::new(format!("{}/", node_norm_server.uri()), true, false, false);
        let edge_normalizer = EdgeNormalizer::new(format!("{}/", edge_norm_server.uri()), "latest");

        let mut normalizer = FileNormalizer::new(
            paths,
            FileNormalizerOptions::default(),
            "infores:default",
            node_normalizer,
            format!("{}/", node_norm_server.uri()),
            edge_normalizer,
            &biolink,
        );

        let counters = normalizer.normalize_kgx_files(None).await.unwrap();

        assert_eq!(counters.final_normalized_edges, 1);
        // X:3 is unreferenced by any edge and must be dropped.
        assert_eq!(counters.unconnected_nodes_removed, 1);
        let nodes = read_jsonl(&normalizer.paths.nodes_output).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n["id"] != "X:3"));
    }
}
