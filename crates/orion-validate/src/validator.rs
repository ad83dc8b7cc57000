use crate::report::{top_n, QcReport, Warning};
use crate::ValidateError;
use orion_biolink::{BiolinkModel, InfoResourceCatalog, InforesStatus};
use orion_common::curie::Curie;
use orion_common::props::{
    AGGREGATOR_KNOWLEDGE_SOURCES, CATEGORY, ID, NAMED_THING, OBJECT_ID, PREDICATE,
    PRIMARY_KNOWLEDGE_SOURCE, SUBCLASS_OF, SUBJECT_ID,
};
use orion_stream::jsonl::JsonlReader;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Validates a merged graph's node/edge files, streaming both in two passes
/// and producing a [`QcReport`]. Never returns an error for data-quality
/// problems — those become [`Warning`] entries, per `spec.md` §7 ("QC
/// findings are informational and never abort a build"). The only errors
/// this returns are I/O or malformed-JSON failures reading the files
/// themselves.
pub struct Validator<'a> {
    biolink: &'a BiolinkModel,
    info_resources: &'a dyn InfoResourceCatalog,
}

impl<'a> Validator<'a> {
    pub fn new(biolink: &'a BiolinkModel, info_resources: &'a dyn InfoResourceCatalog) -> Self {
        Validator {
            biolink,
            info_resources,
        }
    }

    /// Runs both passes and returns the accumulated report.
    ///
    /// `preserve_unconnected_nodes`, when false, causes nodes untouched by
    /// any edge to be flagged with an `unconnected_node` warning (the
    /// pipeline itself is responsible for actually dropping them, via
    /// `orion_kgx::remove_unconnected_nodes`, before this runs on the final
    /// output).
    pub fn validate(
        &self,
        nodes_path: impl AsRef<Path>,
        edges_path: impl AsRef<Path>,
        preserve_unconnected_nodes: bool,
    ) -> Result<QcReport, ValidateError> {
        let nodes_path = nodes_path.as_ref();
        let edges_path = edges_path.as_ref();
        let mut report = QcReport::default();
        let mut leaf_categories: HashMap<String, Vec<String>> = HashMap::new();

        let reader = JsonlReader::open(nodes_path).map_err(|source| ValidateError::Stream {
            path: nodes_path.display().to_string(),
            source,
        })?;
        for node in reader {
            let node = node.map_err(|source| ValidateError::Stream {
                path: nodes_path.display().to_string(),
                source,
            })?;
            report.node_count += 1;
            let id = node.get(ID).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let categories: Vec<String> = node
                .get(CATEGORY)
                .and_then(|v| v.as_array())
                .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or_default();

            if !categories.iter().any(|c| c == NAMED_THING) {
                report.warnings.push(Warning::new(
                    id.clone(),
                    "missing_named_thing",
                    "node category list does not include NamedThing",
                ));
            }
            for category in &categories {
                *report.category_counts.entry(category.clone()).or_insert(0) += 1;
                if !self.biolink.is_valid_category(category) {
                    report.warnings.push(Warning::new(
                        id.clone(),
                        "invalid_category",
                        format!("'{category}' is not a known biolink category"),
                    ));
                }
            }
            if let Some(curie) = Curie::parse(&id) {
                *report.prefix_counts.entry(curie.prefix.to_string()).or_insert(0) += 1;
                for category in &categories {
                    *report
                        .category_prefix_counts
                        .entry(category.clone())
                        .or_default()
                        .entry(curie.prefix.to_string())
                        .or_insert(0) += 1;
                }
            }

            let leaves = self
                .biolink
                .leaf_categories(categories.iter().map(String::as_str));
            leaf_categories.insert(id, leaves);
        }

        let mut referenced: HashSet<String> = HashSet::new();
        let reader = JsonlReader::open(edges_path).map_err(|source| ValidateError::Stream {
            path: edges_path.display().to_string(),
            source,
        })?;
        for edge in reader {
            let edge = edge.map_err(|source| ValidateError::Stream {
                path: edges_path.display().to_string(),
                source,
            })?;
            report.edge_count += 1;
            let edge_id = edge.get(ID).and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let subject = edge.get(SUBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default();
            let object = edge.get(OBJECT_ID).and_then(|v| v.as_str()).unwrap_or_default();
            let predicate = edge.get(PREDICATE).and_then(|v| v.as_str()).unwrap_or_default();

            referenced.insert(subject.to_string());
            referenced.insert(object.to_string());
            *report.predicate_counts.entry(predicate.to_string()).or_insert(0) += 1;

            if !self.biolink.is_valid_predicate(predicate) {
                report.warnings.push(Warning::new(
                    edge_id.clone(),
                    "invalid_predicate",
                    format!("'{predicate}' is not a known biolink predicate"),
                ));
            }
            if predicate == SUBCLASS_OF && subject == object {
                report.warnings.push(Warning::new(
                    edge_id.clone(),
                    "subclass_of_self_loop",
                    format!("'{subject}' is declared subclass_of itself"),
                ));
            }
            if !leaf_categories.contains_key(subject) {
                report.warnings.push(Warning::new(
                    edge_id.clone(),
                    "dangling_subject",
                    format!("subject '{subject}' has no corresponding node"),
                ));
            }
            if !leaf_categories.contains_key(object) {
                report.warnings.push(Warning::new(
                    edge_id.clone(),
                    "dangling_object",
                    format!("object '{object}' has no corresponding node"),
                ));
            }

            if let Some(primary) = edge.get(PRIMARY_KNOWLEDGE_SOURCE).and_then(|v| v.as_str()) {
                self.check_infores(&edge_id, primary, &mut report.warnings);
            }
            if let Some(aggregators) = edge.get(AGGREGATOR_KNOWLEDGE_SOURCES).and_then(|v| v.as_array()) {
                for source in aggregators.iter().filter_map(|v| v.as_str()) {
                    self.check_infores(&edge_id, source, &mut report.warnings);
                }
            }
        }

        if !preserve_unconnected_nodes {
            for id in leaf_categories.keys() {
                if !referenced.contains(id) {
                    report
                        .warnings
                        .push(Warning::new(id.clone(), "unconnected_node", "node is not touched by any edge"));
                }
            }
        }

        report.top_categories = top_n(&report.category_counts, 20);
        report.top_predicates = top_n(&report.predicate_counts, 20);
        Ok(report)
    }

    fn check_infores(&self, edge_id: &str, infores_id: &str, warnings: &mut Vec<Warning>) {
        match self.info_resources.status(infores_id) {
            InforesStatus::Valid => {}
            InforesStatus::Deprecated => warnings.push(Warning::new(
                edge_id.to_string(),
                "deprecated_knowledge_source",
                format!("'{infores_id}' is a deprecated infores identifier"),
            )),
            InforesStatus::Invalid => warnings.push(Warning::new(
                edge_id.to_string(),
                "invalid_knowledge_source",
                format!("'{infores_id}' is not a registered infores identifier"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orion_biolink::StaticInfoResourceCatalog;
    use orion_stream::jsonl::JsonlWriter;
    use serde_json::json;

    fn write_jsonl(path: &Path, objects: &[serde_json::Value]) {
        let mut writer = JsonlWriter::create(path).unwrap();
        for obj in objects {
            writer.write(obj.as_object().unwrap()).unwrap();
        }
        writer.flush().unwrap();
    }

    #[test]
    fn reports_counts_and_flags_dangling_edge_endpoints() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = dir.path().join("nodes.jsonl");
        let edges_path = dir.path().join("edges.jsonl");

        write_jsonl(
            &nodes_path,
            &[json!({"id": "NCBIGene:1", "category": ["Gene", "NamedThing"]})],
        );
        write_jsonl(
            &edges_path,
            &[json!({
                "id": "e1",
                "subject": "NCBIGene:1",
                "object": "MONDO:123",
                "predicate": "related_to",
                "primary_knowledge_source": "infores:ctd",
            })],
        );

        let biolink = BiolinkModel::load().unwrap();
        let catalog = StaticInfoResourceCatalog::empty();
        let validator = Validator::new(&biolink, &catalog);
        let report = validator.validate(&nodes_path, &edges_path, false).unwrap();

        assert_eq!(report.node_count, 1);
        assert_eq!(report.edge_count, 1);
        assert!(report.warnings.iter().any(|w| w.warning_kind == "dangling_object"));
        assert!(report
            .warnings
            .iter()
            .any(|w| w.warning_kind == "invalid_knowledge_source"));
    }

    #[test]
    fn flags_unconnected_nodes_unless_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = dir.path().join("nodes.jsonl");
        let edges_path = dir.path().join("edges.jsonl");
        write_jsonl(
            &nodes_path,
            &[json!({"id": "NCBIGene:1", "category": ["Gene", "NamedThing"]})],
        );
        write_jsonl(&edges_path, &[]);

        let biolink = BiolinkModel::load().unwrap();
        let catalog = StaticInfoResourceCatalog::empty();
        let validator = Validator::new(&biolink, &catalog);

        let report = validator.validate(&nodes_path, &edges_path, false).unwrap();
        assert!(report.warnings.iter().any(|w| w.warning_kind == "unconnected_node"));

        let report = validator.validate(&nodes_path, &edges_path, true).unwrap();
        assert!(!report.warnings.iter().any(|w| w.warning_kind == "unconnected_node"));
    }

    #[test]
    fn flags_subclass_of_self_loop() {
        let dir = tempfile::tempdir().unwrap();
        let nodes_path = dir.path().join("nodes.jsonl");
        let edges_path = dir.path().join("edges.jsonl");
        write_jsonl(
            &nodes_path,
            &[json!({"id": "MONDO:1", "category": ["Disease", "NamedThing"]})],
        );
        write_jsonl(
            &edges_path,
            &[json!({
                "id": "e1",
                "subject": "MONDO:1",
                "object": "MONDO:1",
                "predicate": "subclass_of",
            })],
        );

        let biolink = BiolinkModel::load().unwrap();
        let catalog = StaticInfoResourceCatalog::empty();
        let validator = Validator::new(&biolink, &catalog);
        let report = validator.validate(&nodes_path, &edges_path, true).unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| w.warning_kind == "subclass_of_self_loop"));
    }
}
