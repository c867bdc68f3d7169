//! Optional `pricing.toml` settings.
//!
//! ```toml
//! [claims]
//! expiration_secs = 3600
//! signing_key = "keys/pricing.secret"
//! authorities = ["OWNER"]
//!
//! [log]
//! filter = "pricing_core=info"
//!
//! [migrate]
//! extensions = ["yml", "yaml"]
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "pricing.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub claims: ClaimsConfig,
    pub log: LogConfig,
    pub migrate: MigrateConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClaimsConfig {
    pub expiration_secs: i64,
    /// Path to an Ed25519 `.secret` file written by `pricing keygen`.
    pub signing_key: Option<PathBuf>,
    /// Copied verbatim into the `authorities` claim.
    pub authorities: Option<toml::Value>,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        ClaimsConfig {
            expiration_secs: pricing_eval::DEFAULT_EXPIRATION_SECS,
            signing_key: None,
            authorities: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: "warn".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrateConfig {
    pub extensions: Vec<String>,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        MigrateConfig {
            extensions: vec!["yml".to_owned(), "yaml".to_owned()],
        }
    }
}

impl MigrateConfig {
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
    }
}

/// Read `path`, or `pricing.toml` in the working directory when no path is
/// given and that file exists. Missing default file means defaults.
pub fn load(path: Option<&Path>) -> Result<CliConfig, String> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(CliConfig::default());
            }
            default
        }
    };
    let content = std::fs::read_to_string(&path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
