use orion_common::hash::stable_hash_hex;
use orion_common::model::Entity;
use orion_common::props::{is_qualifier, OBJECT_ID, PREDICATE, PRIMARY_KNOWLEDGE_SOURCE, SUBJECT_ID};

/// Identity key for node dedup: just the node's `id`, per `spec.md` §3.
pub fn node_key(node: &Entity) -> String {
    node.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string()
}

/// Identity key for edge dedup, per `spec.md` §3: `(subject, predicate,
/// object, primary_knowledge_source, sorted qualifiers)`, optionally extended
/// with caller-supplied additional attributes, hashed with xxhash (matching
/// `orion/merging.py`'s `edge_key_function`, grounded on the xxhash crate
/// used throughout this pipeline rather than the original's `xxh64`).
pub fn edge_key(edge: &Entity, custom_key_attributes: &[String]) -> String {
    let mut qualifiers: Vec<(String, String)> = edge
        .iter()
        .filter(|(k, _)| is_qualifier(k))
        .map(|(k, v)| (k.clone(), value_as_key_fragment(v)))
        .collect();
    qualifiers.sort();

    let mut buf = String::new();
    buf.push_str(edge.get(SUBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default());
    buf.push_str(edge.get(PREDICATE).and_then(|v| v.as_str()).unwrap_or_default());
    buf.push_str(edge.get(OBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default());
    buf.push_str(edge.get(PRIMARY_KNOWLEDGE_SOURCE).and_then(|v| v.as_str()).unwrap_or_default());
    for (key, value) in &qualifiers {
        buf.push_str(key);
        buf.push_str(value);
    }
    for attr in custom_key_attributes {
        buf.push_str(edge.get(attr).map(value_as_key_fragment).unwrap_or_default().as_str());
    }

    stable_hash_hex(&buf)
}

fn value_as_key_fragment(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn edge(subject: &str, predicate: &str, object: &str) -> Entity {
        json!({
            "subject": subject,
            "predicate": predicate,
            "object": object,
            "primary_knowledge_source": "infores:test",
        })
        .as_object()
        .unwrap()
        .clone()
    }

    #[test]
    fn identical_edges_share_a_key() {
        let a = edge("MONDO:1", "biolink:affects", "MONDO:2");
        let b = edge("MONDO:1", "biolink:affects", "MONDO:2");
        assert_eq!(edge_key(&a, &[]), edge_key(&b, &[]));
    }

    #[test]
    fn differing_qualifiers_produce_different_keys() {
        let mut a = edge("MONDO:1", "biolink:affects", "MONDO:2");
        let mut b = a.clone();
        a.insert("qualified_predicate".to_string(), json!("biolink:causes"));
        b.insert("qualified_predicate".to_string(), json!("biolink:prevents"));
        assert_ne!(edge_key(&a, &[]), edge_key(&b, &[]));
    }

    #[test]
    fn custom_key_attributes_distinguish_otherwise_identical_edges() {
        let mut a = edge("MONDO:1", "biolink:affects", "MONDO:2");
        let mut b = a.clone();
        a.insert("dataset".to_string(), json!("A"));
        b.insert("dataset".to_string(), json!("B"));
        let attrs = vec!["dataset".to_string()];
        assert_ne!(edge_key(&a, &attrs), edge_key(&b, &attrs));
    }
}
