use orion_biolink::{BiolinkModel, StaticInfoResourceCatalog};
use orion_build::{GraphBuilder, StaticSourceRegistry};
use orion_common::config::GraphSpecSource;
use orion_common::Config;
use orion_pipeline::PipelineOptions;
use orion_spec::GraphSpecSet;
use std::path::{Path, PathBuf};

/// `orion build <graph_id|"all"> [--graph-specs-dir DIR]`, per `spec.md` §6's
/// CLI surface.
#[derive(Debug, clap::Args)]
pub struct BuildArgs {
    /// Graph id to build, or the literal `all` to build every graph declared
    /// in the loaded graph spec.
    pub graph_id: String,

    /// Directory to look for the file named by `ORION_GRAPH_SPEC` in,
    /// overriding the package-relative default the way `build_manager.py`'s
    /// `--graph_specs_dir` flag does.
    #[clap(long)]
    pub graph_specs_dir: Option<PathBuf>,
}

pub async fn run(args: BuildArgs) -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;
    let spec_path = resolve_graph_spec_path(&config, args.graph_specs_dir.as_deref())?;
    let yaml = std::fs::read_to_string(&spec_path)
        .map_err(|source| anyhow::anyhow!("failed to read graph spec {}: {source}", spec_path.display()))?;
    let spec = GraphSpecSet::parse_yaml(&yaml)?;

    let biolink = BiolinkModel::load()?;
    let info_resources = StaticInfoResourceCatalog::empty();
    let registry = StaticSourceRegistry::new();
    let options = PipelineOptions {
        test_mode: config.test_mode,
        ..PipelineOptions::default()
    };

    let requested: Vec<String> = if args.graph_id == "all" {
        spec.graph_ids().map(str::to_string).collect()
    } else {
        vec![args.graph_id.clone()]
    };
    if requested.is_empty() {
        anyhow::bail!("no graphs declared in the loaded graph spec");
    }

    let mut builder = GraphBuilder::new(&config, &biolink, &info_resources, &registry, &spec, options);

    // Each graph is independent: a failure in one must not prevent the
    // others from being attempted, per `spec.md` §7's orchestrator policy.
    let mut any_failed = false;
    for graph_id in &requested {
        match builder.build_graph(graph_id).await {
            Ok(result) => println!("{}\t{}", result.graph_id, result.graph_version),
            Err(err) => {
                any_failed = true;
                tracing::error!(graph_id = %graph_id, error = ?err, "graph build did not reach stable");
            }
        }
    }

    if any_failed {
        anyhow::bail!("one or more requested graphs did not reach stable");
    }
    Ok(())
}

fn resolve_graph_spec_path(config: &Config, graph_specs_dir: Option<&Path>) -> Result<PathBuf, anyhow::Error> {
    match (&config.graph_spec, graph_specs_dir) {
        (GraphSpecSource::File(path), Some(dir)) => {
            let name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("ORION_GRAPH_SPEC has no file name component"))?;
            Ok(dir.join(name))
        }
        (GraphSpecSource::File(path), None) => Ok(path.clone()),
        (GraphSpecSource::Url(_), _) => anyhow::bail!(
            "ORION_GRAPH_SPEC_URL fetching is out of scope of this CLI; set ORION_GRAPH_SPEC to a local file instead"
        ),
    }
}
