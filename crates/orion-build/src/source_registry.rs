use orion_kgx::{IdentityVariantNormalizer, SequenceVariantNormalizer};
use orion_pipeline::{SourceFetcher, SourceParser, VariantSupplementer};
use std::collections::HashMap;

/// Looks up the external collaborators a [`crate::GraphBuilder`] needs for a
/// given `source_id`: the fetcher/parser/supplementer trait objects
/// `orion-pipeline` requires but cannot construct itself, since concrete
/// implementations of these are out of scope per `spec.md` §1. Mirrors the
/// same "parser must be known" precondition `orion/build_manager.py`
/// enforces before invoking a source's pipeline.
pub trait SourceRegistry: Send + Sync {
    fn fetcher(&self, source_id: &str) -> Option<&dyn SourceFetcher>;

    fn parser(&self, source_id: &str) -> Option<&dyn SourceParser>;

    /// `None` when the source has no variant-supplementation step at all
    /// (most sources); distinct from a source that has sequence variants
    /// but whose supplementer is a no-op, which the registry still returns
    /// `Some` for.
    fn supplementer(&self, source_id: &str) -> Option<&dyn VariantSupplementer>;

    /// A fresh variant normalizer instance for this source's normalization
    /// pass. Returned as an owned box (rather than borrowed) since
    /// `SequenceVariantNormalizer::normalize_variants` takes `&mut self` and
    /// a registry may be shared across concurrently-building sources.
    fn variant_normalizer(&self, source_id: &str) -> Box<dyn SequenceVariantNormalizer>;

    /// The supplementation version label to record for this source's
    /// annotation pass, e.g. the deployed annotator's own version string.
    fn supplementation_version(&self, source_id: &str) -> String;

    /// Default `primary_knowledge_source` to fill in when a source's parser
    /// emits edges lacking one.
    fn default_provenance(&self, source_id: &str) -> String;
}

/// One source's collaborators, as registered with a [`StaticSourceRegistry`].
/// Parsers are themselves out of scope of this crate (`spec.md` §1), so this
/// only stores the trait objects a caller already built elsewhere; the
/// variant normalizer is a factory rather than an instance because
/// `SequenceVariantNormalizer::normalize_variants` takes `&mut self`.
pub struct SourceRegistration {
    pub fetcher: Box<dyn SourceFetcher>,
    pub parser: Box<dyn SourceParser>,
    pub supplementer: Option<Box<dyn VariantSupplementer>>,
    pub supplementation_version: String,
    pub default_provenance: String,
    pub variant_normalizer: Box<dyn Fn() -> Box<dyn SequenceVariantNormalizer> + Send + Sync>,
}

/// An in-memory [`SourceRegistry`] populated by the caller, analogous to
/// [`orion_biolink::StaticInfoResourceCatalog`]: a plain `HashMap` keyed by
/// `source_id`, rather than anything that discovers sources dynamically,
/// since concrete parsers/fetchers are external collaborators this crate
/// never constructs on its own.
#[derive(Default)]
pub struct StaticSourceRegistry {
    sources: HashMap<String, SourceRegistration>,
}

impl StaticSourceRegistry {
    pub fn new() -> Self {
        StaticSourceRegistry::default()
    }

    pub fn register(&mut self, source_id: impl Into<String>, registration: SourceRegistration) -> &mut Self {
        self.sources.insert(source_id.into(), registration);
        self
    }
}

impl SourceRegistry for StaticSourceRegistry {
    fn fetcher(&self, source_id: &str) -> Option<&dyn SourceFetcher> {
        self.sources.get(source_id).map(|r| r.fetcher.as_ref())
    }

    fn parser(&self, source_id: &str) -> Option<&dyn SourceParser> {
        self.sources.get(source_id).map(|r| r.parser.as_ref())
    }

    fn supplementer(&self, source_id: &str) -> Option<&dyn VariantSupplementer> {
        self.sources
            .get(source_id)
            .and_then(|r| r.supplementer.as_deref())
    }

    fn variant_normalizer(&self, source_id: &str) -> Box<dyn SequenceVariantNormalizer> {
        match self.sources.get(source_id) {
            Some(r) => (r.variant_normalizer)(),
            None => Box::new(IdentityVariantNormalizer),
        }
    }

    fn supplementation_version(&self, source_id: &str) -> String {
        self.sources
            .get(source_id)
            .map(|r| r.supplementation_version.clone())
            .unwrap_or_default()
    }

    fn default_provenance(&self, source_id: &str) -> String {
        self.sources
            .get(source_id)
            .map(|r| r.default_provenance.clone())
            .unwrap_or_else(|| format!("infores:{source_id}"))
    }
}
