use orion_biolink::{BiolinkModel, InfoResourceCatalog, StaticInfoResourceCatalog};
use orion_build::StaticSourceRegistry;
use orion_common::Config;
use orion_pipeline::{PipelineOptions, PipelineRelease, SourcePipeline};
use orion_spec::NormalizationScheme;

/// `orion source <source_id...> [-t] [-f] [-l]`, per `spec.md` §6's CLI
/// surface: runs the per-source pipeline only, without any graph merge.
#[derive(Debug, clap::Args)]
pub struct SourceArgs {
    /// One or more source ids to run the pipeline for.
    #[clap(required = true)]
    pub source_id: Vec<String>,

    /// `-t/--test`: use local fixtures instead of live normalization
    /// services, matching `load_manager.py`'s `--test_mode`.
    #[clap(short = 't', long = "test")]
    pub test: bool,

    /// `-f/--fresh`: clear persisted stage state before running.
    #[clap(short = 'f', long = "fresh")]
    pub fresh: bool,

    /// `-l/--lenient`: keep nodes that fail node normalization instead of
    /// dropping them.
    #[clap(short = 'l', long = "lenient")]
    pub lenient: bool,
}

pub async fn run(args: SourceArgs) -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    let biolink = BiolinkModel::load()?;
    let info_resources = StaticInfoResourceCatalog::empty();
    let registry = StaticSourceRegistry::new();
    let options = PipelineOptions {
        lenient: args.lenient,
        fresh: args.fresh,
        test_mode: args.test || config.test_mode,
        ..PipelineOptions::default()
    };

    let mut any_failed = false;
    for source_id in &args.source_id {
        match run_one(&config, &biolink, &info_resources, &registry, source_id, options).await {
            Ok(release) => println!("{source_id}\t{}", release.release_version),
            Err(err) => {
                any_failed = true;
                tracing::error!(source_id = %source_id, error = ?err, "source pipeline did not reach stable");
            }
        }
    }

    if any_failed {
        anyhow::bail!("one or more requested sources did not reach stable");
    }
    Ok(())
}

async fn run_one(
    config: &Config,
    biolink: &BiolinkModel,
    info_resources: &dyn InfoResourceCatalog,
    registry: &StaticSourceRegistry,
    source_id: &str,
    options: PipelineOptions,
) -> Result<PipelineRelease, anyhow::Error> {
    use orion_build::SourceRegistry;

    let fetcher = registry
        .fetcher(source_id)
        .ok_or_else(|| anyhow::anyhow!("source '{source_id}' has no registered fetcher/parser"))?;
    let parser = registry
        .parser(source_id)
        .ok_or_else(|| anyhow::anyhow!("source '{source_id}' has no registered fetcher/parser"))?;

    let source_version = fetcher.latest_version().await?;
    let parsing_version = "latest".to_string();
    let scheme = NormalizationScheme {
        strict: !options.lenient,
        ..NormalizationScheme::default()
    };
    let default_provenance = registry.default_provenance(source_id);

    let mut pipeline = SourcePipeline::new(
        &config.storage_root,
        source_id,
        &source_version,
        &parsing_version,
        scheme,
        biolink,
        config.node_norm_endpoint.to_string(),
        config.edge_norm_endpoint.to_string(),
        default_provenance,
        options,
    )?;

    let supplementer = registry.supplementer(source_id);
    let supplementation_version = registry.supplementation_version(source_id);
    let mut variant_normalizer = registry.variant_normalizer(source_id);
    let supplementer_tuple =
        supplementer.map(|s| (supplementation_version.as_str(), s, &mut *variant_normalizer));

    let release = pipeline.run(fetcher, parser, supplementer_tuple, info_resources).await?;
    Ok(release)
}
