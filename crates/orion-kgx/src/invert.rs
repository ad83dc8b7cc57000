use orion_common::model::Entity;
use orion_common::props::{OBJECT_ID, ORIGINAL_OBJECT, ORIGINAL_SUBJECT, SUBJECT_ID};

/// Swaps subject/object on every property whose key contains the substring
/// `subject` or `object`, matching `orion/kgx_file_normalizer.py::invert_edge`:
/// not just the `subject`/`object` fields themselves but qualifiers like
/// `subject_aspect_qualifier` <-> `object_aspect_qualifier`. `original_subject`/
/// `original_object` are left untouched here — they record the pre-inversion
/// endpoints and are (re)stamped by the caller after inversion, per `spec.md`
/// §8 S2.
pub fn invert_edge(edge: Entity) -> Entity {
    let mut inverted = Entity::new();
    for (key, value) in edge {
        if key == ORIGINAL_SUBJECT || key == ORIGINAL_OBJECT {
            inverted.insert(key, value);
        } else if key.contains(SUBJECT_ID) {
            inverted.insert(key.replacen(SUBJECT_ID, OBJECT_ID, 1), value);
        } else if key.contains(OBJECT_ID) {
            inverted.insert(key.replacen(OBJECT_ID, SUBJECT_ID, 1), value);
        } else {
            inverted.insert(key, value);
        }
    }
    inverted
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn swaps_subject_and_object_and_their_qualifiers() {
        let edge = json!({
            "subject": "A",
            "object": "B",
            "predicate": "p_inv",
            "subject_aspect_qualifier": "q",
            "original_subject": "A",
            "original_object": "B"
        })
        .as_object()
        .unwrap()
        .clone();

        let inverted = invert_edge(edge);
        assert_eq!(inverted["subject"], "B");
        assert_eq!(inverted["object"], "A");
        assert_eq!(inverted["object_aspect_qualifier"], "q");
        assert_eq!(inverted["original_subject"], "A");
        assert_eq!(inverted["original_object"], "B");
    }
}
