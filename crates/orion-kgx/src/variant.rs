use orion_common::model::Entity;

/// One sequence-variant node after annotation: either resolved to a set of
/// normalized ids (more than one only for ambiguous splits) or failed.
#[derive(Debug, Clone)]
pub enum VariantNormalization {
    Resolved { normalized_ids: Vec<String>, node: Entity },
    Failed { error: String },
}

/// Hook for resolving `SequenceVariant` nodes, kept separate from
/// [`orion_normalize::NodeNormalizer`] because the original service
/// (`GeneticsNormalizer`) is a distinct external system with its own
/// request/response shape. `FileNormalizer` only needs the id-splitting
/// behavior this trait exposes; the concrete HTTP-backed implementation
/// lives with the rest of the supplementation orchestration.
pub trait SequenceVariantNormalizer {
    fn variant_node_types(&self) -> Vec<String>;

    fn normalize_variants(&mut self, variant_ids: &[String]) -> Vec<(String, VariantNormalization)>;
}

/// A normalizer for sources whose variant nodes arrive already normalized
/// (`sequence_variants_pre_normalized=true`): every id maps to itself.
#[derive(Default)]
pub struct IdentityVariantNormalizer;

impl SequenceVariantNormalizer for IdentityVariantNormalizer {
    fn variant_node_types(&self) -> Vec<String> {
        vec![orion_common::props::SEQUENCE_VARIANT.to_string()]
    }

    fn normalize_variants(&mut self, variant_ids: &[String]) -> Vec<(String, VariantNormalization)> {
        variant_ids
            .iter()
            .map(|id| {
                let mut node = serde_json::Map::new();
                node.insert("id".to_string(), serde_json::Value::String(id.clone()));
                (
                    id.clone(),
                    VariantNormalization::Resolved { normalized_ids: vec![id.clone()], node },
                )
            })
            .collect()
    }
}
