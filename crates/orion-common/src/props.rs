//! Canonical property-name constants shared by every crate that reads or
//! writes node/edge JSON maps.
//!
//! Mirrors `orion/biolink_constants.py` in the original implementation: a
//! single source of truth for the well-known keys, so that string literals
//! never drift between the normalizer, the merger, and the validator.

pub const ID: &str = "id";
pub const NAME: &str = "name";
pub const CATEGORY: &str = "category";
pub const EQUIVALENT_IDENTIFIERS: &str = "equivalent_identifiers";
pub const CUSTOM_NODE_TYPES: &str = "custom_node_types";
pub const NAMED_THING: &str = "NamedThing";
pub const SEQUENCE_VARIANT: &str = "SequenceVariant";

pub const SUBJECT_ID: &str = "subject";
pub const OBJECT_ID: &str = "object";
pub const PREDICATE: &str = "predicate";
pub const ORIGINAL_SUBJECT: &str = "original_subject";
pub const ORIGINAL_OBJECT: &str = "original_object";
pub const PRIMARY_KNOWLEDGE_SOURCE: &str = "primary_knowledge_source";
pub const AGGREGATOR_KNOWLEDGE_SOURCES: &str = "aggregator_knowledge_sources";
pub const RETRIEVAL_SOURCES: &str = "retrieval_sources";
pub const RETRIEVAL_SOURCE_ID: &str = "resource_id";
pub const RETRIEVAL_SOURCE_ROLE: &str = "resource_role";
pub const PUBLICATIONS: &str = "publications";
pub const SUBCLASS_OF: &str = "subclass_of";
pub const RELATED_TO: &str = "related_to";
pub const EDGE_ID: &str = "id";

/// Edge (or node) properties whose values are always treated as sets: after
/// any append, the list is deduplicated and sorted. Distinct from "list of
/// maps" properties such as `retrieval_sources`, which are grouped by a key
/// function instead of sorted as scalars.
pub const SET_VALUED_PROPERTIES: &[&str] = &[AGGREGATOR_KNOWLEDGE_SOURCES, PUBLICATIONS];

/// Properties whose value is always a list, even when there is exactly one
/// element, per the KGX schema whitelist referenced in `spec.md` §3 and §9.
pub const LIST_VALUED_PROPERTIES: &[&str] = &[
    CATEGORY,
    EQUIVALENT_IDENTIFIERS,
    CUSTOM_NODE_TYPES,
    AGGREGATOR_KNOWLEDGE_SOURCES,
    RETRIEVAL_SOURCES,
    PUBLICATIONS,
    "xrefs",
    "synonyms",
];

/// True if `key` is a qualifier property, i.e. part of edge identity beyond
/// the base subject/predicate/object/primary_knowledge_source tuple.
///
/// The original biolink toolkit answers this from the biolink model's
/// `qualifier` slot hierarchy; we approximate it the same way the rest of
/// the pipeline treats qualifiers: any property whose name ends in
/// `_qualifier`.
pub fn is_qualifier(key: &str) -> bool {
    key.ends_with("_qualifier")
}
