use crate::error::NormalizeError;
use crate::retry::RetryPolicy;
use orion_biolink::BiolinkModel;
use orion_common::model::Entity;
use orion_common::props::{CATEGORY, CUSTOM_NODE_TYPES, EQUIVALENT_IDENTIFIERS, NAME};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct NodeIdSection {
    identifier: String,
    label: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NodeNormResultEntry {
    id: NodeIdSection,
    #[serde(rename = "type")]
    types: Vec<String>,
    equivalent_identifiers: Vec<EquivalentIdentifier>,
    information_content: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct EquivalentIdentifier {
    identifier: String,
}

/// Outcome of normalizing a batch of nodes: which input ids failed, and the
/// lookup table a caller (FileNormalizer) needs to rewrite edge endpoints
/// that referenced pre-normalization ids, per `spec.md` §4.3.
#[derive(Debug, Default)]
pub struct NodeNormalizationOutcome {
    pub failed_ids: Vec<String>,
    /// `None` means the id failed to normalize and (in strict mode) its node
    /// was dropped; `Some(ids)` is one or more post-normalization ids (more
    /// than one only for sequence-variant splits, handled separately).
    pub lookup: HashMap<String, Option<Vec<String>>>,
}

pub struct NodeNormalizer {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
    pub strict: bool,
    pub conflate: bool,
    pub include_taxa: bool,
}

impl NodeNormalizer {
    pub fn new(endpoint: impl Into<String>, strict: bool, conflate: bool, include_taxa: bool) -> Self {
        NodeNormalizer {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            retry: RetryPolicy::default(),
            strict,
            conflate,
            include_taxa,
        }
    }

    async fn hit_service(
        &self,
        curies: &[String],
    ) -> Result<HashMap<String, Option<NodeNormResultEntry>>, NormalizeError> {
        let url = format!("{}get_normalized_nodes", self.endpoint);
        let body = serde_json::json!({
            "curies": curies,
            "conflate": self.conflate,
            "drug_chemical_conflate": self.conflate,
            "description": true,
            "include_taxa": self.include_taxa,
        });

        let client = self.client.clone();
        self.retry
            .run(
                |_: &NormalizeError| true,
                || {
                    let client = client.clone();
                    let url = url.clone();
                    let body = body.clone();
                    async move {
                        let resp = client
                            .post(&url)
                            .json(&body)
                            .send()
                            .await
                            .map_err(|source| NormalizeError::Request {
                                endpoint: url.clone(),
                                source,
                            })?;
                        let status = resp.status();
                        if !status.is_success() {
                            return Err(NormalizeError::NodeServiceStatus {
                                endpoint: url.clone(),
                                status: status.as_u16(),
                            });
                        }
                        let bytes = resp.bytes().await.map_err(|source| NormalizeError::Request {
                            endpoint: url.clone(),
                            source,
                        })?;
                        if bytes.is_empty() {
                            return Err(NormalizeError::NodeServiceEmptyBody {
                                endpoint: url.clone(),
                                count: curies.len(),
                            });
                        }
                        serde_json::from_slice(&bytes).map_err(|_| NormalizeError::NodeServiceEmptyBody {
                            endpoint: url.clone(),
                            count: curies.len(),
                        })
                    }
                },
            )
            .await
    }

    /// Normalizes `nodes` in place, batching the lookup calls, per
    /// `orion/normalization.py`'s `normalize_node_data`. Strict mode drops
    /// nodes that failed to resolve; lenient mode keeps them, sanitizing
    /// `category` against `biolink` and moving invalid entries to
    /// `custom_node_types`.
    pub async fn normalize(
        &self,
        nodes: &mut Vec<Entity>,
        biolink: &BiolinkModel,
        batch_size: usize,
    ) -> Result<NodeNormalizationOutcome, NormalizeError> {
        let ids: Vec<String> = nodes
            .iter()
            .map(|n| n.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string())
            .collect();

        let mut results: HashMap<String, Option<NodeNormResultEntry>> = HashMap::new();
        for chunk in ids.chunks(batch_size.max(1)) {
            let chunk_results = self.hit_service(chunk).await?;
            results.extend(chunk_results);
        }

        let mut outcome = NodeNormalizationOutcome::default();
        let mut keep = Vec::with_capacity(nodes.len());

        for (node, node_id) in nodes.drain(..).zip(ids.into_iter()) {
            let mut node = node;

            if node.get(NAME).and_then(|v| v.as_str()).unwrap_or_default().is_empty() {
                let fallback = node_id.rsplit(':').next().unwrap_or(&node_id).to_string();
                node.insert(NAME.to_string(), serde_json::Value::String(fallback));
            }
            node.retain(|_, v| !v.is_null());

            if !self.strict {
                sanitize_categories(&mut node, biolink);
            }

            match results.get(&node_id) {
                Some(Some(normalized)) => {
                    let normalized_id = normalized.id.identifier.clone();
                    node.insert("id".to_string(), serde_json::Value::String(normalized_id.clone()));
                    node.insert(
                        CATEGORY.to_string(),
                        serde_json::Value::Array(
                            normalized.types.iter().cloned().map(serde_json::Value::String).collect(),
                        ),
                    );
                    node.insert(
                        EQUIVALENT_IDENTIFIERS.to_string(),
                        serde_json::Value::Array(
                            normalized
                                .equivalent_identifiers
                                .iter()
                                .map(|e| serde_json::Value::String(e.identifier.clone()))
                                .collect(),
                        ),
                    );
                    if let Some(label) = &normalized.id.label {
                        node.insert(NAME.to_string(), serde_json::Value::String(label.clone()));
                    }
                    if let Some(ic) = normalized.information_content {
                        node.insert(
                            "information_content".to_string(),
                            serde_json::Value::from(ic),
                        );
                    }
                    if let Some(desc) = &normalized.id.description {
                        node.insert("description".to_string(), serde_json::Value::String(desc.clone()));
                    }
                    outcome.lookup.insert(node_id.clone(), Some(vec![normalized_id]));
                    keep.push(node);
                }
                _ => {
                    outcome.failed_ids.push(node_id.clone());
                    if self.strict {
                        outcome.lookup.insert(node_id, None);
                    } else {
                        outcome.lookup.insert(node_id.clone(), Some(vec![node_id]));
                        keep.push(node);
                    }
                }
            }
        }

        *nodes = keep;
        Ok(outcome)
    }
}

fn sanitize_categories(node: &mut Entity, biolink: &BiolinkModel) {
    let current = node
        .get(CATEGORY)
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
        .unwrap_or_else(Vec::new);
    let (valid, invalid) = biolink.sanitize_categories(&current);
    if !invalid.is_empty() {
        node.insert(
            CUSTOM_NODE_TYPES.to_string(),
            serde_json::Value::Array(invalid.into_iter().map(serde_json::Value::String).collect()),
        );
    }
    node.insert(
        CATEGORY.to_string(),
        serde_json::Value::Array(valid.into_iter().map(serde_json::Value::String).collect()),
    );
}

pub const DEFAULT_NODE_NORM_ENDPOINT: &str = "https://nodenormalization-sri.renci.org/";

pub async fn get_current_node_norm_version(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<String, NormalizeError> {
    let url = format!("{endpoint}status");
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|source| NormalizeError::Request { endpoint: url.clone(), source })?;
    let status: serde_json::Value = resp
        .json()
        .await
        .map_err(|source| NormalizeError::Request { endpoint: url.clone(), source })?;
    Ok(status
        .get("babel_version")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_biolink::BiolinkModel;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn node(id: &str) -> Entity {
        let v = json!({"id": id, "name": "", "category": ["biolink:NamedThing"]});
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn strict_mode_drops_unresolved_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_normalized_nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MONDO:1": {
                    "id": {"identifier": "MONDO:1", "label": "disease one"},
                    "type": ["biolink:Disease"],
                    "equivalent_identifiers": [{"identifier": "MONDO:1"}]
                },
                "FAKE:2": null
            })))
            .mount(&server)
            .await;

        let normalizer = NodeNormalizer::new(format!("{}/", server.uri()), true, false, false);
        let biolink = BiolinkModel::load().unwrap();
        let mut nodes = vec![node("MONDO:1"), node("FAKE:2")];
        let outcome = normalizer.normalize(&mut nodes, &biolink, 1000).await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0]["id"], "MONDO:1");
        assert_eq!(outcome.failed_ids, vec!["FAKE:2".to_string()]);
        assert_eq!(outcome.lookup.get("FAKE:2"), Some(&None));
    }

    #[tokio::test]
    async fn lenient_mode_keeps_unresolved_nodes_with_sanitized_categories() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/get_normalized_nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "FAKE:2": null })))
            .mount(&server)
            .await;

        let normalizer = NodeNormalizer::new(format!("{}/", server.uri()), false, false, false);
        let biolink = BiolinkModel::load().unwrap();
        let mut nodes = vec![node("FAKE:2")];
        let outcome = normalizer.normalize(&mut nodes, &biolink, 1000).await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(outcome.lookup.get("FAKE:2"), Some(&Some(vec!["FAKE:2".to_string()])));
    }
}
