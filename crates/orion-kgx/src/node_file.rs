use crate::error::FileNormalizeError;
use crate::metadata::NormalizationCounters;
use crate::variant::{SequenceVariantNormalizer, VariantNormalization};
use orion_biolink::BiolinkModel;
use orion_common::model::Entity;
use orion_common::props::{CATEGORY, SEQUENCE_VARIANT};
use orion_normalize::NodeNormalizer;
use orion_stream::jsonl::{chunk, JsonlReader};
use orion_stream::KgxWriter;
use std::collections::HashMap;
use std::path::Path;

pub const NODE_NORMALIZATION_BATCH_SIZE: usize = 1_000_000;

fn stream_err(path: &Path, source: orion_stream::jsonl::StreamError) -> FileNormalizeError {
    FileNormalizeError::Stream { path: path.display().to_string(), source }
}

/// Outcome of normalizing one source's node file: the full id -> normalized-id(s)
/// lookup edge normalization needs, plus the accumulated counters.
pub struct NodeFileOutcome {
    pub lookup: HashMap<String, Option<Vec<String>>>,
    pub failed_ids: Vec<String>,
    pub variant_failures: HashMap<String, String>,
    pub counters: NormalizationCounters,
}

/// Streams `source_nodes_path` through `node_normalizer` (and, for sources
/// flagged `has_sequence_variants`, `variant_normalizer`), writing normalized
/// nodes to `nodes_output_path`, per `orion/kgx_file_normalizer.py::normalize_node_file`.
#[allow(clippy::too_many_arguments)]
pub async fn normalize_node_file(
    source_nodes_path: impl AsRef<Path>,
    nodes_output_path: impl AsRef<Path>,
    node_normalizer: &NodeNormalizer,
    biolink: &BiolinkModel,
    has_sequence_variants: bool,
    sequence_variants_pre_normalized: bool,
    mut variant_normalizer: Option<&mut dyn SequenceVariantNormalizer>,
) -> Result<NodeFileOutcome, FileNormalizeError> {
    let source_path = source_nodes_path.as_ref();
    let output_path = nodes_output_path.as_ref();

    let reader = JsonlReader::open(source_path).map_err(|e| stream_err(source_path, e))?;
    let mut writer = KgxWriter::nodes_only(output_path).map_err(|e| stream_err(output_path, e))?;

    let mut counters = NormalizationCounters::default();
    let mut lookup: HashMap<String, Option<Vec<String>>> = HashMap::new();
    let mut failed_ids = Vec::new();
    let mut variant_failures = HashMap::new();

    for batch in chunk(reader, NODE_NORMALIZATION_BATCH_SIZE) {
        let mut nodes_subset = Vec::with_capacity(batch.len());
        for entity in batch {
            nodes_subset.push(entity.map_err(|e| stream_err(source_path, e))?);
        }

        let (mut variant_nodes, mut regular_nodes): (Vec<Entity>, Vec<Entity>) = if has_sequence_variants {
            nodes_subset.into_iter().partition(|n| {
                n.get(CATEGORY)
                    .and_then(|v| v.as_array())
                    .map(|cats| cats.iter().any(|c| c.as_str() == Some(SEQUENCE_VARIANT)))
                    .unwrap_or(false)
            })
        } else {
            (Vec::new(), nodes_subset)
        };

        counters.node_count_pre_normalization += regular_nodes.len() as u64;
        if !regular_nodes.is_empty() {
            let outcome = node_normalizer.normalize(&mut regular_nodes, biolink, 1000).await?;
            lookup.extend(outcome.lookup);
            failed_ids.extend(outcome.failed_ids);
        }
        counters.node_count_post_normalization += regular_nodes.len() as u64;

        counters.variant_nodes_pre_norm += variant_nodes.len() as u64;
        if has_sequence_variants {
            if let Some(normalizer) = variant_normalizer.as_deref_mut() {
                let variant_ids: Vec<String> = variant_nodes
                    .iter()
                    .map(|n| n.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string())
                    .collect();
                let variant_node_types = normalizer.variant_node_types();

                if sequence_variants_pre_normalized {
                    for id in &variant_ids {
                        lookup.insert(id.clone(), Some(vec![id.clone()]));
                    }
                } else {
                    variant_nodes.clear();
                    for (variant_id, result) in normalizer.normalize_variants(&variant_ids) {
                        match result {
                            VariantNormalization::Resolved { normalized_ids, mut node } => {
                                node.insert(
                                    CATEGORY.to_string(),
                                    serde_json::Value::Array(
                                        variant_node_types.iter().cloned().map(serde_json::Value::String).collect(),
                                    ),
                                );
                                let split_count = normalized_ids.len();
                                if split_count > 1 {
                                    counters.variant_nodes_split_count += (split_count - 1) as u64;
                                }
                                lookup.insert(variant_id, Some(normalized_ids));
                                variant_nodes.push(node);
                            }
                            VariantNormalization::Failed { error } => {
                                variant_failures.insert(variant_id.clone(), error);
                                lookup.insert(variant_id, None);
                            }
                        }
                    }
                }
            }
        }
        counters.variant_nodes_post_norm += variant_nodes.len() as u64;

        if !regular_nodes.is_empty() {
            writer.write_nodes(regular_nodes.iter()).map_err(|e| stream_err(output_path, e))?;
        }
        if !variant_nodes.is_empty() {
            writer.write_nodes(variant_nodes.iter()).map_err(|e| stream_err(output_path, e))?;
        }
    }

    writer.flush().map_err(|e| stream_err(output_path, e))?;

    counters.node_normalization_failures = failed_ids.len() as u64;
    counters.variant_node_norm_failures = variant_failures.len() as u64;
    counters.all_nodes_post_norm = counters.node_count_post_normalization + counters.variant_nodes_post_norm;
    counters.discarded_duplicate_node_count = writer.repeat_node_count;
    counters.final_normalized_nodes = counters.all_nodes_post_norm - counters.discarded_duplicate_node_count;

    Ok(NodeFileOutcome { lookup, failed_ids, variant_failures, counters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_stream::jsonl::{read_jsonl, JsonlWriter};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn normalizes_regular_nodes_and_writes_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_normalized_nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MONDO:1": {
                    "id": {"identifier": "MONDO:1", "label": "disease one"},
                    "type": ["biolink:Disease"],
                    "equivalent_identifiers": [{"identifier": "MONDO:1"}]
                }
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("source_nodes.jsonl");
        let output_path = dir.path().join("nodes.jsonl");
        let mut w = JsonlWriter::create(&source_path).unwrap();
        w.write(json!({"id": "MONDO:1", "name": "", "category": ["biolink:Disease"]}).as_object().unwrap())
            .unwrap();
        w.flush().unwrap();

        let normalizer = NodeNormalizer::new(format!("{}/", server.uri()), true, false, false);
        let biolink = BiolinkModel::load().unwrap();

        let outcome = normalize_node_file(
            &source_path,
            &output_path,
            &normalizer,
            &biolink,
            false,
            false,
            None,
        )
        .await
        .unwrap();

        assert_eq!(outcome.counters.node_count_pre_normalization, 1);
        assert_eq!(outcome.counters.final_normalized_nodes, 1);
        let written = read_jsonl(&output_path).unwrap();
        assert_eq!(written[0]["id"], "MONDO:1");
    }
}
