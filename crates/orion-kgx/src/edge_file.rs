use crate::error::FileNormalizeError;
use crate::invert::invert_edge;
use crate::metadata::NormalizationCounters;
use orion_common::model::Entity;
use orion_common::props::{
    AGGREGATOR_KNOWLEDGE_SOURCES, OBJECT_ID, ORIGINAL_OBJECT, ORIGINAL_SUBJECT, PREDICATE, PRIMARY_KNOWLEDGE_SOURCE,
    PUBLICATIONS, RETRIEVAL_SOURCES, SUBCLASS_OF, SUBJECT_ID,
};
use orion_normalize::EdgeNormalizer;
use orion_stream::jsonl::{chunk, JsonlReader, JsonlWriter, StreamError};
use std::collections::{HashMap, HashSet};
use std::path::Path;

pub const EDGE_NORMALIZATION_BATCH_SIZE: usize = 1_000_000;

fn stream_err(path: &Path, source: StreamError) -> FileNormalizeError {
    FileNormalizeError::Stream { path: path.display().to_string(), source }
}

/// Streams `source_edges_path` through `edge_normalizer`, rewriting endpoints
/// via `node_lookup` and writing the result to `edges_output_path`, per
/// `orion/kgx_file_normalizer.py::normalize_edge_file`.
#[allow(clippy::too_many_arguments)]
pub async fn normalize_edge_file(
    source_edges_path: impl AsRef<Path>,
    edges_output_path: impl AsRef<Path>,
    edge_normalizer: &mut EdgeNormalizer,
    node_lookup: &HashMap<String, Option<Vec<String>>>,
    edge_subject_pre_normalized: bool,
    edge_object_pre_normalized: bool,
    predicates_pre_normalized: bool,
    default_provenance: &str,
    counters: &mut NormalizationCounters,
) -> Result<Vec<String>, FileNormalizeError> {
    let source_path = source_edges_path.as_ref();
    let output_path = edges_output_path.as_ref();

    let reader = JsonlReader::open(source_path).map_err(|e| stream_err(source_path, e))?;
    let mut writer = JsonlWriter::create(output_path).map_err(|e| stream_err(output_path, e))?;

    let mut edge_norm_failures = Vec::new();
    let mut seen_failures = HashSet::new();

    for batch in chunk(reader, EDGE_NORMALIZATION_BATCH_SIZE) {
        let mut edges_subset = Vec::with_capacity(batch.len());
        for entity in batch {
            edges_subset.push(entity.map_err(|e| stream_err(source_path, e))?);
        }
        counters.source_edges += edges_subset.len() as u64;

        if !predicates_pre_normalized {
            let predicates: HashSet<String> = edges_subset
                .iter()
                .filter_map(|e| e.get(PREDICATE).and_then(|v| v.as_str()).map(str::to_string))
                .collect();
            let failed = edge_normalizer.normalize(&predicates, 1000).await?;
            for predicate in failed {
                if seen_failures.insert(predicate.clone()) {
                    edge_norm_failures.push(predicate);
                }
            }
        }

        for edge in edges_subset {
            let subject_id = edge.get(SUBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default();
            let object_id = edge.get(OBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default();

            let normalized_subject_ids = if edge_subject_pre_normalized {
                Some(vec![subject_id.to_string()])
            } else {
                node_lookup.get(subject_id).cloned().flatten()
            };
            let normalized_object_ids = if edge_object_pre_normalized {
                Some(vec![object_id.to_string()])
            } else {
                node_lookup.get(object_id).cloned().flatten()
            };

            let (normalized_subject_ids, normalized_object_ids) = match (normalized_subject_ids, normalized_object_ids)
            {
                (Some(s), Some(o)) if !s.is_empty() && !o.is_empty() => (s, o),
                _ => {
                    counters.edges_failed_due_to_nodes += 1;
                    continue;
                }
            };

            let (normalized_predicate, inverted, extra_properties) = if predicates_pre_normalized {
                (edge.get(PREDICATE).and_then(|v| v.as_str()).unwrap_or_default().to_string(), false, None)
            } else {
                let predicate = edge.get(PREDICATE).and_then(|v| v.as_str()).unwrap_or_default();
                match edge_normalizer.resolved(predicate) {
                    Some(result) => (result.predicate.clone(), result.inverted, Some(result.properties.clone())),
                    None => {
                        return Err(FileNormalizeError::MissingPredicateLookup { predicate: predicate.to_string() })
                    }
                }
            };

            let mut base_edge = edge.clone();
            if !base_edge.contains_key(RETRIEVAL_SOURCES) && !base_edge.contains_key(PRIMARY_KNOWLEDGE_SOURCE) {
                base_edge.insert(
                    PRIMARY_KNOWLEDGE_SOURCE.to_string(),
                    serde_json::Value::String(default_provenance.to_string()),
                );
            }

            let mut edge_count = 0u32;
            for norm_subject_id in &normalized_subject_ids {
                for norm_object_id in &normalized_object_ids {
                    if normalized_predicate == SUBCLASS_OF && norm_subject_id == norm_object_id {
                        counters.subclass_loops_removed += 1;
                        continue;
                    }
                    edge_count += 1;

                    let mut normalized_edge = base_edge.clone();
                    normalized_edge.insert(ORIGINAL_SUBJECT.to_string(), serde_json::Value::String(subject_id.to_string()));
                    normalized_edge.insert(ORIGINAL_OBJECT.to_string(), serde_json::Value::String(object_id.to_string()));
                    normalized_edge.insert(PREDICATE.to_string(), serde_json::Value::String(normalized_predicate.clone()));

                    if let Some(extra) = &extra_properties {
                        for (k, v) in extra {
                            normalized_edge.insert(k.clone(), v.clone());
                        }
                    }

                    normalized_edge.insert(SUBJECT_ID.to_string(), serde_json::Value::String(norm_subject_id.clone()));
                    normalized_edge.insert(OBJECT_ID.to_string(), serde_json::Value::String(norm_object_id.clone()));

                    dedupe_set_valued_properties(&mut normalized_edge);

                    let normalized_edge = if inverted { invert_edge(normalized_edge) } else { normalized_edge };

                    writer.write(&normalized_edge).map_err(|e| stream_err(output_path, e))?;
                    counters.final_normalized_edges += 1;
                }
            }

            if edge_count > 1 {
                counters.edge_splits += (edge_count - 1) as u64;
            }
        }
    }

    writer.flush().map_err(|e| stream_err(output_path, e))?;
    Ok(edge_norm_failures)
}

/// `aggregator_knowledge_sources` and `publications` are always sets: every
/// emitted edge gets them deduplicated and sorted, per
/// `EDGE_PROPERTIES_THAT_SHOULD_BE_SETS` in `orion/kgx_file_normalizer.py`.
fn dedupe_set_valued_properties(edge: &mut Entity) {
    for key in [AGGREGATOR_KNOWLEDGE_SOURCES, PUBLICATIONS] {
        if let Some(serde_json::Value::Array(items)) = edge.get(key).cloned() {
            let mut strings: Vec<String> =
                items.into_iter().filter_map(|v| v.as_str().map(str::to_string)).collect();
            strings.sort();
            strings.dedup();
            edge.insert(
                key.to_string(),
                serde_json::Value::Array(strings.into_iter().map(serde_json::Value::String).collect()),
            );
        }
    }
}

/// Rewrites `nodes_file_path` in place, dropping every node whose id does
/// not appear as a subject or object in `edges_file_path`, per
/// `orion/kgx_file_normalizer.py::remove_unconnected_nodes`. Returns the
/// number of nodes removed.
pub fn remove_unconnected_nodes(
    nodes_file_path: impl AsRef<Path>,
    edges_file_path: impl AsRef<Path>,
) -> Result<u64, FileNormalizeError> {
    let edges_path = edges_file_path.as_ref();
    let nodes_path = nodes_file_path.as_ref();

    let mut utilized_nodes: HashSet<String> = HashSet::new();
    for edge in JsonlReader::open(edges_path).map_err(|e| stream_err(edges_path, e))? {
        let edge = edge.map_err(|e| stream_err(edges_path, e))?;
        if let Some(id) = edge.get(SUBJECT_ID).and_then(|v| v.as_str()) {
            utilized_nodes.insert(id.to_string());
        }
        if let Some(id) = edge.get(OBJECT_ID).and_then(|v| v.as_str()) {
            utilized_nodes.insert(id.to_string());
        }
    }

    let temp_path = nodes_path.with_extension("temp");
    std::fs::rename(nodes_path, &temp_path).map_err(|source| stream_err(nodes_path, StreamError::Io(source)))?;

    let mut removed = 0u64;
    {
        let reader = JsonlReader::open(&temp_path).map_err(|e| stream_err(&temp_path, e))?;
        let mut writer = JsonlWriter::create(nodes_path).map_err(|e| stream_err(nodes_path, e))?;
        for node in reader {
            let node = node.map_err(|e| stream_err(&temp_path, e))?;
            let id = node.get("id").and_then(|v| v.as_str()).unwrap_or_default();
            if utilized_nodes.contains(id) {
                writer.write(&node).map_err(|e| stream_err(nodes_path, e))?;
            } else {
                removed += 1;
            }
        }
        writer.flush().map_err(|e| stream_err(nodes_path, e))?;
    }
    std::fs::remove_file(&temp_path).map_err(|source| stream_err(&temp_path, StreamError::Io(source)))?;

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_stream::jsonl::read_jsonl;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mocked_edge_normalizer(responses: serde_json::Value) -> (MockServer, EdgeNormalizer) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve_predicate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(responses))
            .mount(&server)
            .await;
        let normalizer = EdgeNormalizer::new(format!("{}/", server.uri()), "latest");
        (server, normalizer)
    }

    #[tokio::test]
    async fn inverts_edge_and_preserves_original_endpoints() {
        let (_server, mut normalizer) = mocked_edge_normalizer(json!({
            "p": {"predicate": "p_inv", "inverted": true}
        }))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source_edges.jsonl");
        let output_path = dir.path().join("edges.jsonl");
        let mut w = JsonlWriter::create(&source_path).unwrap();
        w.write(
            json!({"subject": "A", "predicate": "p", "object": "B", "subject_aspect_qualifier": "q"})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        w.flush().unwrap();

        let mut lookup = HashMap::new();
        lookup.insert("A".to_string(), Some(vec!["A".to_string()]));
        lookup.insert("B".to_string(), Some(vec!["B".to_string()]));

        let mut counters = NormalizationCounters::default();
        normalize_edge_file(
            &source_path, &output_path, &mut normalizer, &lookup, false, false, false, "infores:test", &mut counters,
        )
        .await
        .unwrap();

        let edges = read_jsonl(&output_path).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0]["subject"], "B");
        assert_eq!(edges[0]["object"], "A");
        assert_eq!(edges[0]["object_aspect_qualifier"], "q");
        assert_eq!(edges[0]["original_subject"], "A");
        assert_eq!(edges[0]["original_object"], "B");
    }

    #[tokio::test]
    async fn splits_edge_across_normalized_ids_and_counts_split() {
        let (_server, mut normalizer) = mocked_edge_normalizer(json!({
            "related_to": {"predicate": "related_to", "inverted": false}
        }))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source_edges.jsonl");
        let output_path = dir.path().join("edges.jsonl");
        let mut w = JsonlWriter::create(&source_path).unwrap();
        w.write(
            json!({"subject": "V:1", "predicate": "related_to", "object": "G:1", "primary_knowledge_source": "s"})
                .as_object()
                .unwrap(),
        )
        .unwrap();
        w.flush().unwrap();

        let mut lookup = HashMap::new();
        lookup.insert("V:1".to_string(), Some(vec!["V:1a".to_string(), "V:1b".to_string()]));
        lookup.insert("G:1".to_string(), Some(vec!["G:1".to_string()]));

        let mut counters = NormalizationCounters::default();
        normalize_edge_file(
            &source_path, &output_path, &mut normalizer, &lookup, false, false, false, "infores:test", &mut counters,
        )
        .await
        .unwrap();

        let edges = read_jsonl(&output_path).unwrap();
        assert_eq!(edges.len(), 2);
        assert!(edges.iter().all(|e| e["original_subject"] == "V:1"));
        assert_eq!(counters.edge_splits, 1);
    }

    #[tokio::test]
    async fn drops_subclass_of_self_loop() {
        let (_server, mut normalizer) = mocked_edge_normalizer(json!({
            "subclass_of": {"predicate": "subclass_of", "inverted": false}
        }))
        .await;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source_edges.jsonl");
        let output_path = dir.path().join("edges.jsonl");
        let mut w = JsonlWriter::create(&source_path).unwrap();
        w.write(json!({"subject": "A", "predicate": "subclass_of", "object": "A"}).as_object().unwrap())
            .unwrap();
        w.flush().unwrap();

        let mut lookup = HashMap::new();
        lookup.insert("A".to_string(), Some(vec!["A".to_string()]));

        let mut counters = NormalizationCounters::default();
        normalize_edge_file(
            &source_path, &output_path, &mut normalizer, &lookup, false, false, false, "infores:test", &mut counters,
        )
        .await
        .unwrap();

        let edges = read_jsonl(&output_path).unwrap();
        assert!(edges.is_empty());
        assert_eq!(counters.subclass_loops_removed, 1);
    }

    #[test]
    fn remove_unconnected_nodes_keeps_only_referenced_ids() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = dir.path().join("nodes.jsonl");
        let edges_path = dir.path().join("edges.jsonl");

        let mut nw = JsonlWriter::create(&nodes_path).unwrap();
        nw.write(json!({"id": "A"}).as_object().unwrap()).unwrap();
        nw.write(json!({"id": "B"}).as_object().unwrap()).unwrap();
        nw.write(json!({"id": "C"}).as_object().unwrap()).unwrap();
        nw.flush().unwrap();

        let mut ew = JsonlWriter::create(&edges_path).unwrap();
        ew.write(json!({"subject": "A", "object": "B", "predicate": "p"}).as_object().unwrap()).unwrap();
        ew.flush().unwrap();

        let removed = remove_unconnected_nodes(&nodes_path, &edges_path).unwrap();
        assert_eq!(removed, 1);
        let nodes = read_jsonl(&nodes_path).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().any(|n| n["id"] == "A"));
        assert!(nodes.iter().any(|n| n["id"] == "B"));
    }
}
