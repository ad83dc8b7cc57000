use crate::error::{OrionError, OrionResult};
use std::path::PathBuf;

/// The graph specification is named either by a local file or by a URL, but
/// never both — this is enforced at load time, not by the type.
#[derive(Debug, Clone)]
pub enum GraphSpecSource {
    File(PathBuf),
    Url(url::Url),
}

/// Process-wide configuration, read once from the environment at startup and
/// threaded explicitly through the components that need it, rather than
/// re-read ad hoc from `std::env` throughout the codebase.
#[derive(Debug, Clone)]
pub struct Config {
    /// `ORION_STORAGE`: root directory for per-source storage.
    pub storage_root: PathBuf,
    /// `ORION_GRAPHS`: root directory for per-graph output.
    pub graphs_root: PathBuf,
    /// `ORION_GRAPH_SPEC` xor `ORION_GRAPH_SPEC_URL`.
    pub graph_spec: GraphSpecSource,
    /// `NODE_NORMALIZATION_ENDPOINT`.
    pub node_norm_endpoint: url::Url,
    /// `EDGE_NORMALIZATION_ENDPOINT`.
    pub edge_norm_endpoint: url::Url,
    /// `ORION_LOGS`: optional path to a log file, in addition to stderr.
    pub logs_path: Option<PathBuf>,
    /// `BL_VERSION`: biolink model version to validate against.
    pub biolink_version: String,
    /// `ORION_TEST_MODE`: when set, normalizers and fetchers use local
    /// fixtures instead of live services.
    pub test_mode: bool,
}

impl Config {
    /// Loads configuration from the process environment, per `spec.md` §6.
    pub fn from_env() -> OrionResult<Self> {
        let storage_root = require_path("ORION_STORAGE")?;
        let graphs_root = require_path("ORION_GRAPHS")?;

        let graph_spec = match (
            std::env::var("ORION_GRAPH_SPEC").ok(),
            std::env::var("ORION_GRAPH_SPEC_URL").ok(),
        ) {
            (Some(path), None) => GraphSpecSource::File(PathBuf::from(path)),
            (None, Some(url)) => GraphSpecSource::Url(url::Url::parse(&url).map_err(|e| {
                OrionError::Configuration(format!("invalid ORION_GRAPH_SPEC_URL: {e}"))
            })?),
            (None, None) => {
                return Err(OrionError::Configuration(
                    "exactly one of ORION_GRAPH_SPEC or ORION_GRAPH_SPEC_URL must be set"
                        .to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(OrionError::Configuration(
                    "ORION_GRAPH_SPEC and ORION_GRAPH_SPEC_URL are mutually exclusive".to_string(),
                ))
            }
        };

        let node_norm_endpoint = require_url("NODE_NORMALIZATION_ENDPOINT")?;
        let edge_norm_endpoint = require_url("EDGE_NORMALIZATION_ENDPOINT")?;
        let logs_path = std::env::var("ORION_LOGS").ok().map(PathBuf::from);
        let biolink_version =
            std::env::var("BL_VERSION").unwrap_or_else(|_| "master".to_string());
        let test_mode = std::env::var("ORION_TEST_MODE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Config {
            storage_root,
            graphs_root,
            graph_spec,
            node_norm_endpoint,
            edge_norm_endpoint,
            logs_path,
            biolink_version,
            test_mode,
        })
    }
}

fn require_path(var: &str) -> OrionResult<PathBuf> {
    std::env::var(var)
        .map(PathBuf::from)
        .map_err(|_| OrionError::Configuration(format!("missing required env var {var}")))
}

fn require_url(var: &str) -> OrionResult<url::Url> {
    let raw = std::env::var(var)
        .map_err(|_| OrionError::Configuration(format!("missing required env var {var}")))?;
    url::Url::parse(&raw)
        .map_err(|e| OrionError::Configuration(format!("invalid URL in {var}: {e}")))
}
