//! Harness configuration and environment overrides.
//!
//! Configuration is read once at startup: defaults derive from the current
//! working directory, and a small set of `SYNBENCH_*` environment variables
//! override them. Nothing in the engine re-reads the environment after that.

use std::env;
use std::path::PathBuf;

/// Environment variable overriding the artifact output path.
pub const ENV_OUTPUT: &str = "SYNBENCH_OUTPUT";

/// Environment variable overriding the scratch directory for file kernels.
pub const ENV_SCRATCH: &str = "SYNBENCH_SCRATCH";

/// Environment variable naming a `host:port` completion-notification target.
pub const ENV_NOTIFY: &str = "SYNBENCH_NOTIFY";

/// Environment variable consulted for the reporting hostname, before the
/// conventional `HOSTNAME` fallback.
pub const ENV_HOST: &str = "SYNBENCH_HOST";

/// Settings shared by every rank of a run.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Where the coordinating rank writes the final artifact.
    pub output_path: PathBuf,
    /// Directory the file kernels read and write under.
    pub scratch_dir: PathBuf,
    /// Optional `host:port` to notify when the run completes.
    pub notify: Option<String>,
}

impl HarnessConfig {
    /// Build a configuration from defaults plus `SYNBENCH_*` overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(path) = env::var_os(ENV_OUTPUT) {
            config.output_path = PathBuf::from(path);
        }
        if let Some(dir) = env::var_os(ENV_SCRATCH) {
            config.scratch_dir = PathBuf::from(dir);
        }
        if let Ok(target) = env::var(ENV_NOTIFY) {
            if !target.is_empty() {
                config.notify = Some(target);
            }
        }
        config
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            output_path: cwd.join("synbench-results.json"),
            scratch_dir: cwd.join("synbench-scratch"),
            notify: None,
        }
    }
}

/// Hostname reported in the per-rank document.
///
/// Resolution order: `SYNBENCH_HOST`, then the conventional `HOSTNAME`,
/// then `"localhost"`.
pub fn reported_hostname() -> String {
    env::var(ENV_HOST)
        .or_else(|_| env::var("HOSTNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}
