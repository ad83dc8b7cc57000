use crate::error::NormalizeError;
use crate::retry::RetryPolicy;
use orion_common::props::FALLBACK_EDGE_PREDICATE;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

pub const DEFAULT_EDGE_NORM_ENDPOINT: &str = "https://bl-lookup-sri.renci.org/";

/// The resolved replacement for one input predicate, per `spec.md` §6's
/// predicate normalization service contract.
#[derive(Debug, Clone)]
pub struct EdgeNormalizationResult {
    pub predicate: String,
    pub inverted: bool,
    pub properties: serde_json::Map<String, Value>,
}

impl EdgeNormalizationResult {
    fn fallback() -> Self {
        EdgeNormalizationResult {
            predicate: FALLBACK_EDGE_PREDICATE.to_string(),
            inverted: false,
            properties: serde_json::Map::new(),
        }
    }
}

pub struct EdgeNormalizer {
    client: reqwest::Client,
    endpoint: String,
    version: String,
    retry: RetryPolicy,
    lookup: HashMap<String, EdgeNormalizationResult>,
}

impl EdgeNormalizer {
    pub fn new(endpoint: impl Into<String>, version: impl Into<String>) -> Self {
        EdgeNormalizer {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            version: version.into(),
            retry: RetryPolicy::default(),
            lookup: HashMap::new(),
        }
    }

    pub fn resolved(&self, predicate: &str) -> Option<&EdgeNormalizationResult> {
        self.lookup.get(predicate)
    }

    /// Every predicate resolved so far, for writing the predicate map file.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &EdgeNormalizationResult)> {
        self.lookup.iter()
    }

    /// Resolves every predicate present in `predicates` that hasn't already
    /// been cached, in `block_size`-sized GET requests, per
    /// `orion/normalization.py`'s `normalize_edge_data`. Returns the
    /// predicates that fell back to [`FALLBACK_EDGE_PREDICATE`].
    pub async fn normalize(
        &mut self,
        predicates: &HashSet<String>,
        block_size: usize,
    ) -> Result<Vec<String>, NormalizeError> {
        let to_resolve: Vec<&String> = predicates.iter().filter(|p| !self.lookup.contains_key(*p)).collect();

        let mut resolved: HashMap<String, Value> = HashMap::new();
        for chunk in to_resolve.chunks(block_size.max(1)) {
            let mut url = format!(
                "{}resolve_predicate?version={}&predicate=",
                self.endpoint, self.version
            );
            url.push_str(
                &chunk
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join("&predicate="),
            );

            let endpoint = self.endpoint.clone();
            let client = self.client.clone();
            let response = self
                .retry
                .run(
                    |_: &NormalizeError| true,
                    || {
                        let url = url.clone();
                        let endpoint = endpoint.clone();
                        let client = client.clone();
                        async move {
                            let resp = client.get(&url).send().await.map_err(|source| {
                                NormalizeError::Request { endpoint: endpoint.clone(), source }
                            })?;
                            match resp.status().as_u16() {
                                200 => resp
                                    .json::<HashMap<String, Value>>()
                                    .await
                                    .map(Some)
                                    .map_err(|source| NormalizeError::Request { endpoint, source }),
                                404 => Ok(None),
                                status => Err(NormalizeError::EdgeServiceStatus { endpoint, status }),
                            }
                        }
                    },
                )
                .await?;

            if let Some(map) = response {
                resolved.extend(map);
            }
        }

        let mut failed = Vec::new();
        for predicate in to_resolve {
            let mut entry = match resolved.get(predicate) {
                Some(Value::Object(obj)) if obj.contains_key("predicate") || obj.contains_key("identifier") => {
                    obj.clone()
                }
                _ => {
                    failed.push(predicate.clone());
                    self.lookup.insert(predicate.clone(), EdgeNormalizationResult::fallback());
                    continue;
                }
            };

            let normalized_predicate = entry
                .remove("predicate")
                .or_else(|| entry.remove("identifier"))
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| FALLBACK_EDGE_PREDICATE.to_string());
            entry.remove("label");
            let inverted = entry
                .remove("inverted")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);

            self.lookup.insert(
                predicate.clone(),
                EdgeNormalizationResult {
                    predicate: normalized_predicate,
                    inverted,
                    properties: entry,
                },
            );
        }

        Ok(failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn resolves_predicates_and_caches_them() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve_predicate"))
            .and(query_param("version", "latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "biolink:affects": {"predicate": "biolink:affects", "inverted": false},
                "biolink:treated_by": {"predicate": "biolink:treats", "inverted": true}
            })))
            .mount(&server)
            .await;

        let mut normalizer = EdgeNormalizer::new(format!("{}/", server.uri()), "latest");
        let mut predicates = HashSet::new();
        predicates.insert("biolink:affects".to_string());
        predicates.insert("biolink:treated_by".to_string());

        let failed = normalizer.normalize(&predicates, 100).await.unwrap();
        assert!(failed.is_empty());
        assert_eq!(normalizer.resolved("biolink:affects").unwrap().predicate, "biolink:affects");
        let treated = normalizer.resolved("biolink:treated_by").unwrap();
        assert_eq!(treated.predicate, "biolink:treats");
        assert!(treated.inverted);
    }

    #[tokio::test]
    async fn unresolved_predicate_falls_back() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/resolve_predicate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let mut normalizer = EdgeNormalizer::new(format!("{}/", server.uri()), "latest");
        let mut predicates = HashSet::new();
        predicates.insert("biolink:totally_unknown".to_string());

        let failed = normalizer.normalize(&predicates, 100).await.unwrap();
        assert_eq!(failed, vec!["biolink:totally_unknown".to_string()]);
        assert_eq!(
            normalizer.resolved("biolink:totally_unknown").unwrap().predicate,
            FALLBACK_EDGE_PREDICATE
        );
    }
}
