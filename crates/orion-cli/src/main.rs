mod commands;

use clap::Parser;
use commands::{build, source};
use orion_common::logging::{init_logging, LogArgs};
use std::future::Future;

/// `orion` drives the knowledge-graph build pipeline: `build` assembles one
/// or all graphs from a graph spec, `source` runs a single source's pipeline
/// in isolation, per `spec.md` §6's CLI surface.
#[derive(Debug, Parser)]
#[clap(author, name = "orion", version)]
struct Orion {
    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
#[clap(rename_all = "kebab-case")]
enum Subcommand {
    /// Build one graph, or every graph in the spec with `all`.
    Build(InternalSubcommandArgs<build::BuildArgs>),
    /// Run the fetch/parse/normalize/supplement/QC pipeline for one or more
    /// sources, without merging into any graph.
    Source(InternalSubcommandArgs<source::SourceArgs>),
}

/// A wrapper type for subcommand arguments that defines the logging flags
/// shared by every subcommand, mirroring `flowctl`'s
/// `InternalSubcommandArgs<T>`.
#[derive(Debug, clap::Args)]
struct InternalSubcommandArgs<T: clap::Args + std::fmt::Debug> {
    #[clap(flatten)]
    log_args: LogArgs,

    #[clap(flatten)]
    args: T,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Orion::parse();
    match cli.subcommand {
        Subcommand::Build(args) => run_internal(args, build::run).await,
        Subcommand::Source(args) => run_internal(args, source::run).await,
    }
}

/// Initializes logging once for the selected subcommand, runs it, and logs
/// (without swallowing) any error that surfaces, matching `flowctl`'s
/// `run_internal` — generalized to an async `run_fn` since every subcommand
/// here drives an async pipeline.
async fn run_internal<T, F, Fut>(subcommand_args: InternalSubcommandArgs<T>, run_fn: F) -> Result<(), anyhow::Error>
where
    T: clap::Args + std::fmt::Debug,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<(), anyhow::Error>>,
{
    let InternalSubcommandArgs { log_args, args } = subcommand_args;

    init_logging(&log_args);
    let result = run_fn(args).await;
    if let Err(err) = result.as_ref() {
        tracing::error!(error = ?err, "subcommand failed");
    }
    result
}
