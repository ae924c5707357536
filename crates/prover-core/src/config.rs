use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Placeholder in prover arguments replaced by the path of the file under verification.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder in prover arguments replaced by a per-run log file path.
pub const LOG_PLACEHOLDER: &str = "{log}";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: String,
    pub blob_root: String,
    pub prover: ProverConfig,
}

/// How the external prover is invoked.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProverConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    /// Cap on each of stdout, stderr and the side log; larger output fails the run.
    pub max_output_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: "prover.db".to_string(),
            blob_root: "files".to_string(),
            prover: ProverConfig::default(),
        }
    }
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            program: "frama-c".to_string(),
            args: ["-wp", "-wp-print", "-wp-log", "r:{log}", "{input}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 300,
            max_output_bytes: 16 * 1024 * 1024,
        }
    }
}

impl ProverConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// True when the prover writes its report to a side log file.
    pub fn uses_log_file(&self) -> bool {
        self.args.iter().any(|arg| arg.contains(LOG_PLACEHOLDER))
    }

    /// Expand `{input}` and `{log}` in every argument.
    pub fn expand_args(&self, input: &Path, log: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let log = log.to_string_lossy();
        self.args
            .iter()
            .map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(LOG_PLACEHOLDER, &log)
            })
            .collect()
    }
}

/// Load `Config.toml` (optional) overlaid with `PROVER_*` environment variables.
/// Nested keys use a double underscore, e.g. `PROVER_PROVER__TIMEOUT_SECS`.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("PROVER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
