use orion_common::model::Entity;
use orion_common::props::{RETRIEVAL_SOURCE_ID, RETRIEVAL_SOURCE_ROLE, RETRIEVAL_SOURCES};
use serde_json::Value;

/// Merges `b` into `a` in place and returns `a`, per `orion/merging.py`'s
/// `entity_merging_function`:
/// - scalars: first-writer-wins (`a`'s value survives if both set it)
/// - list + list: concatenated
/// - list + scalar: scalar appended to the list
/// - scalar + list (no existing scalar): take `b`'s list as-is
/// - lists of maps: regrouped by a per-property key function (recursively
///   merging entries that collide), falling back to the map's JSON text
/// - lists of scalars: deduplicated and sorted
pub fn merge_entities(mut a: Entity, b: Entity) -> Entity {
    for (key, b_value) in b {
        if is_present(&b_value) && a.contains_key(&key) {
            let a_value = a.get(&key).cloned().unwrap();
            let merged = merge_values(&key, a_value, b_value);
            a.insert(key, merged);
        } else {
            // Mirrors the original: an absent key (or a falsy b value, even
            // when a already has a truthy one) is always overwritten from b.
            a.insert(key, b_value);
        }
    }
    a
}

fn is_present(value: &Value) -> bool {
    !matches!(value, Value::Null) && !is_falsy_scalar(value)
}

fn is_falsy_scalar(value: &Value) -> bool {
    matches!(value, Value::String(s) if s.is_empty())
        || matches!(value, Value::Array(a) if a.is_empty())
        || matches!(value, Value::Bool(false))
}

fn merge_values(key: &str, a_value: Value, b_value: Value) -> Value {
    let a_is_list = a_value.is_array();
    let b_is_list = b_value.is_array();

    let combined = match (a_is_list, b_is_list) {
        (true, true) => {
            let mut items = a_value.as_array().cloned().unwrap_or_default();
            items.extend(b_value.as_array().cloned().unwrap_or_default());
            Value::Array(items)
        }
        (true, false) => {
            let mut items = a_value.as_array().cloned().unwrap_or_default();
            items.push(b_value);
            Value::Array(items)
        }
        (false, true) => {
            let mut items = b_value.as_array().cloned().unwrap_or_default();
            if is_present(&a_value) {
                items.insert(0, a_value);
            }
            Value::Array(items)
        }
        (false, false) => return a_value,
    };

    let Value::Array(items) = combined else {
        unreachable!()
    };

    if items.first().map(Value::is_object).unwrap_or(false) {
        dedupe_maps(key, items)
    } else {
        dedupe_scalars(items)
    }
}

fn dedupe_maps(key: &str, items: Vec<Value>) -> Value {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: std::collections::HashMap<String, Entity> = std::collections::HashMap::new();
    for item in items {
        let Value::Object(map) = item else { continue };
        let item_key = map_key_function(key, &map);
        if let Some(existing) = grouped.remove(&item_key) {
            grouped.insert(item_key.clone(), merge_entities(existing, map));
        } else {
            order.push(item_key.clone());
            grouped.insert(item_key, map);
        }
    }
    Value::Array(
        order
            .into_iter()
            .filter_map(|k| grouped.remove(&k).map(Value::Object))
            .collect(),
    )
}

/// Grouping key for one entry of a list-of-maps property. `retrieval_sources`
/// entries are duplicates if they share a resource id and role; every other
/// list-of-maps property falls back to the entry's canonical JSON text.
fn map_key_function(property: &str, entry: &Entity) -> String {
    if property == RETRIEVAL_SOURCES {
        let id = entry.get(RETRIEVAL_SOURCE_ID).and_then(|v| v.as_str()).unwrap_or_default();
        let role = entry.get(RETRIEVAL_SOURCE_ROLE).and_then(|v| v.as_str()).unwrap_or_default();
        return format!("{id}{role}");
    }
    serde_json::to_string(entry).unwrap_or_default()
}

fn dedupe_scalars(items: Vec<Value>) -> Value {
    let mut seen = std::collections::BTreeSet::new();
    let mut out = Vec::new();
    for item in items {
        let sort_key = match &item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if seen.insert(sort_key) {
            out.push(item);
        }
    }
    out.sort_by(|a, b| {
        let ka = match a {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let kb = match b {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        ka.cmp(&kb)
    });
    Value::Array(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(v: Value) -> Entity {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn first_writer_wins_on_plain_scalars() {
        let a = entity(json!({"name": "Disease A"}));
        let b = entity(json!({"name": "Disease B"}));
        let merged = merge_entities(a, b);
        assert_eq!(merged["name"], "Disease A");
    }

    #[test]
    fn missing_property_is_copied_from_b() {
        let a = entity(json!({"id": "MONDO:1"}));
        let b = entity(json!({"id": "MONDO:1", "name": "Disease B"}));
        let merged = merge_entities(a, b);
        assert_eq!(merged["name"], "Disease B");
    }

    #[test]
    fn lists_concatenate_and_scalars_dedupe_sorted() {
        let a = entity(json!({"xrefs": ["MESH:2", "MESH:1"]}));
        let b = entity(json!({"xrefs": ["MESH:1", "MESH:3"]}));
        let merged = merge_entities(a, b);
        assert_eq!(merged["xrefs"], json!(["MESH:1", "MESH:2", "MESH:3"]));
    }

    #[test]
    fn scalar_appended_to_existing_list() {
        let a = entity(json!({"publications": ["PMID:1"]}));
        let b = entity(json!({"publications": "PMID:2"}));
        let merged = merge_entities(a, b);
        assert_eq!(merged["publications"], json!(["PMID:1", "PMID:2"]));
    }

    #[test]
    fn retrieval_sources_regroup_by_resource_and_role() {
        let a = entity(json!({
            "retrieval_sources": [
                {"resource_id": "infores:ctd", "resource_role": "primary_knowledge_source", "upstream_resource_ids": ["a"]}
            ]
        }));
        let b = entity(json!({
            "retrieval_sources": [
                {"resource_id": "infores:ctd", "resource_role": "primary_knowledge_source", "upstream_resource_ids": ["b"]}
            ]
        }));
        let merged = merge_entities(a, b);
        let sources = merged["retrieval_sources"].as_array().unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(
            sources[0]["upstream_resource_ids"],
            json!(["a", "b"])
        );
    }
}
