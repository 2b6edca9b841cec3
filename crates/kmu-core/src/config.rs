//! Tool configuration.
//!
//! Configuration can be loaded from:
//! - TOML files (default: ~/.config/kmu/kmu.toml)
//! - Environment variables (KMU_* prefixed)
//!
//! # Example
//!
//! ```rust,no_run
//! use kmu_core::config::KmuConfig;
//!
//! // Load from default path or fall back to env vars
//! let config = KmuConfig::load().expect("Failed to load config");
//!
//! // Or explicitly from a file
//! let config = KmuConfig::from_file(std::path::Path::new("kmu.toml")).expect("Failed to load");
//! ```

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use kmu_crypto::{DigestAlgorithm, KdfParams, DEFAULT_DIGEST_TAG};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by the library helpers and the `kmu` tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmuConfig {
    /// Digest tag used for new signatures.
    #[serde(default = "KmuConfig::default_digest")]
    pub digest_algorithm: String,
    /// Admin contact for new transaction containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_contact: Option<String>,
    /// Write containers in pretty (line-split) form.
    #[serde(default = "KmuConfig::default_pretty")]
    pub pretty: bool,
    /// Key derivation cost for protecting keys.
    #[serde(default)]
    pub kdf: KdfParams,
}

impl Default for KmuConfig {
    fn default() -> Self {
        Self {
            digest_algorithm: Self::default_digest(),
            admin_contact: None,
            pretty: Self::default_pretty(),
            kdf: KdfParams::default(),
        }
    }
}

impl KmuConfig {
    fn default_digest() -> String {
        DEFAULT_DIGEST_TAG.to_string()
    }

    fn default_pretty() -> bool {
        true
    }

    /// Get the default config file path.
    ///
    /// Returns: ~/.config/kmu/kmu.toml
    pub fn default_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        path.push("kmu");
        path.push("kmu.toml");
        path
    }

    /// Load from the default path, falling back to environment variables.
    pub fn load() -> ConfigResult<Self> {
        let path = Self::default_config_path();

        if path.exists() {
            info!("Loading kmu config from: {}", path.display());
            Self::from_file(&path)
        } else {
            debug!(
                "Config file not found at {}, using environment variables",
                path.display()
            );
            Self::from_env()
        }
    }

    /// Load configuration from a TOML file with a `[kmu]` table.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&Self::substitute_env_vars(&content)?)
    }

    fn from_toml(content: &str) -> ConfigResult<Self> {
        #[derive(Deserialize)]
        struct TomlRoot {
            #[serde(default)]
            kmu: Option<KmuConfig>,
        }

        let root: TomlRoot = toml::from_str(content)?;
        let config = root.kmu.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = KdfParams::default();
        let number = |name: &str, default: u32| -> ConfigResult<u32> {
            match get(name) {
                Some(v) => v
                    .parse()
                    .map_err(|_| ConfigError::Validation(format!("{} must be a number, got: {}", name, v))),
                None => Ok(default),
            }
        };

        let config = Self {
            digest_algorithm: get("KMU_DIGEST_ALGORITHM").unwrap_or_else(Self::default_digest),
            admin_contact: get("KMU_ADMIN_CONTACT").filter(|s| !s.is_empty()),
            kdf: KdfParams {
                memory_kib: number("KMU_KDF_MEMORY_KIB", defaults.memory_kib)?,
                iterations: number("KMU_KDF_ITERATIONS", defaults.iterations)?,
                parallelism: number("KMU_KDF_PARALLELISM", defaults.parallelism)?,
            },
            pretty: get("KMU_PRETTY")
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"))
                .unwrap_or_else(Self::default_pretty),
        };
        config.validate()?;
        Ok(config)
    }

    /// Resolved digest algorithm.
    pub fn digest(&self) -> ConfigResult<DigestAlgorithm> {
        DigestAlgorithm::from_tag(&self.digest_algorithm).map_err(|e| ConfigError::Validation(e.to_string()))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.digest()?;

        self.kdf
            .validate()
            .map_err(|e| ConfigError::Validation(format!("Invalid KDF parameters: {}", e)))?;

        if let Some(ref contact) = self.admin_contact {
            if contact.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "admin_contact cannot be blank".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Substitute environment variables in the format ${VAR_NAME}.
    fn substitute_env_vars(content: &str) -> ConfigResult<String> {
        let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(re
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_env_var_substitution_with_value() {
        let content = "admin_contact = \"${TEST_KMU_SUBSTITUTION_VAR}\"";

        env::set_var("TEST_KMU_SUBSTITUTION_VAR", "ops@example.com");
        let result = KmuConfig::substitute_env_vars(content).unwrap();
        env::remove_var("TEST_KMU_SUBSTITUTION_VAR");

        assert_eq!(result, "admin_contact = \"ops@example.com\"");
    }

    #[test]
    fn test_env_var_substitution_missing() {
        let content = "admin_contact = \"${NONEXISTENT_KMU_TEST_VAR_12345}\"";
        let result = KmuConfig::substitute_env_vars(content).unwrap();
        assert_eq!(result, content);
    }

    #[test]
    fn test_from_toml() {
        let config = KmuConfig::from_toml(
            r#"
[kmu]
digest_algorithm = "SHA3-384"
admin_contact = "admin@example.com"
pretty = false

[kmu.kdf]
memory_kib = 1024
iterations = 1
parallelism = 1
"#,
        )
        .unwrap();

        assert_eq!(config.digest().unwrap(), DigestAlgorithm::Sha3_384);
        assert_eq!(config.admin_contact.as_deref(), Some("admin@example.com"));
        assert_eq!(config.kdf.memory_kib, 1024);
        assert!(!config.pretty);
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = KmuConfig::from_toml("").unwrap();
        assert_eq!(config, KmuConfig::default());
        assert_eq!(config.digest().unwrap(), DigestAlgorithm::CubeHash256);
    }

    #[test]
    fn test_unknown_digest_rejected() {
        let result = KmuConfig::from_toml("[kmu]\ndigest_algorithm = \"MD5\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[kmu]\npretty = false").unwrap();

        let config = KmuConfig::from_file(file.path()).unwrap();
        assert!(!config.pretty);
    }

    #[test]
    fn test_from_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let result = KmuConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = [
            ("KMU_DIGEST_ALGORITHM", "CubeHash-512"),
            ("KMU_KDF_ITERATIONS", "5"),
            ("KMU_PRETTY", "false"),
        ]
        .into_iter()
        .collect();

        let config = KmuConfig::from_vars(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.digest().unwrap(), DigestAlgorithm::CubeHash512);
        assert_eq!(config.kdf.iterations, 5);
        assert_eq!(config.kdf.memory_kib, KdfParams::default().memory_kib);
        assert!(!config.pretty);
        assert_eq!(config.admin_contact, None);
    }

    #[test]
    fn test_from_vars_bad_number() {
        let result = KmuConfig::from_vars(|name| {
            (name == "KMU_KDF_MEMORY_KIB").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_serialize_config() {
        let serialized = toml::to_string(&KmuConfig::default()).unwrap();
        assert!(serialized.contains("digest_algorithm"));
        assert!(serialized.contains("memory_kib"));
    }
}
