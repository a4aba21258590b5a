//! Configuration infrastructure
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional file, then `URL_REWRITE_*` environment variables
//! (`URL_REWRITE_RECONCILE__BATCH_SIZE=5000`).

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::entities::{EntityKind, EntityKindDescriptor, SqlIdentifier};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub reconcile: ReconcileConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx SQLite URL, e.g. `sqlite:data/catalog.db` or `sqlite::memory:`
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Maximum rewrite ids per delete statement
    pub batch_size: usize,

    /// Table holding generated rewrites
    pub rewrite_table: SqlIdentifier,

    /// Entity kinds to reconcile and where their live ids come from
    pub kinds: Vec<EntityKindDescriptor>,
}

impl ReconcileConfig {
    #[must_use]
    pub fn descriptor(&self, kind: EntityKind) -> Option<&EntityKindDescriptor> {
        self.kinds.iter().find(|descriptor| descriptor.kind == kind)
    }
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    /// Enable console output
    pub console_output: bool,

    /// Enable file output
    pub file_output: bool,

    /// Directory for log files; next to the executable when unset
    pub log_dir: Option<PathBuf>,

    /// Number of log files to keep (older files will be deleted)
    pub max_files: u32,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            reconcile: ReconcileConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::MAX_CONNECTIONS,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            rewrite_table: SqlIdentifier::trusted(defaults::REWRITE_TABLE),
            kinds: EntityKind::ALL
                .into_iter()
                .map(EntityKindDescriptor::default_for)
                .collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: None,
            max_files: defaults::LOG_MAX_FILES,
            module_filters: HashMap::from([
                ("sqlx".to_string(), "warn".to_string()),
                ("catalog_url_rewrite".to_string(), defaults::LOG_LEVEL.to_string()),
            ]),
        }
    }
}

impl AppConfig {
    /// Load defaults, the optional file at `path` and the environment
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Self::load`], reading variables from `env` instead of the process
    fn load_with_env(
        path: Option<&Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(defaults::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Per-user configuration file location
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(defaults::APP_DIR_NAME).join("config.toml"))
    }

    /// Check values the type system does not
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "database.url must not be empty".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Validation {
                message: "database.max_connections must be greater than 0".to_string(),
            });
        }

        if self.reconcile.batch_size == 0 {
            return Err(ConfigError::Validation {
                message: "reconcile.batch_size must be greater than 0".to_string(),
            });
        }

        if self.reconcile.kinds.is_empty() {
            return Err(ConfigError::Validation {
                message: "reconcile.kinds must list at least one entity kind".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for descriptor in &self.reconcile.kinds {
            if !seen.insert(descriptor.kind) {
                return Err(ConfigError::Validation {
                    message: format!("reconcile.kinds lists '{}' more than once", descriptor.kind),
                });
            }
        }

        Ok(())
    }
}

/// Default configuration values
pub mod defaults {
    /// Default database location
    pub const DATABASE_URL: &str = "sqlite:data/catalog.db";

    /// Default pool size
    pub const MAX_CONNECTIONS: u32 = 5;

    /// Default maximum ids per delete statement
    pub const BATCH_SIZE: usize = crate::application::reconciler::DEFAULT_BATCH_SIZE;

    /// Default rewrite table
    pub const REWRITE_TABLE: &str = "url_rewrite";

    /// Prefix of environment overrides
    pub const ENV_PREFIX: &str = "URL_REWRITE";

    /// Directory name under the user config dir
    pub const APP_DIR_NAME: &str = "catalog-url-rewrite";

    // Log configuration defaults
    /// Default log level
    pub const LOG_LEVEL: &str = "info";

    /// Default JSON format setting
    pub const LOG_JSON_FORMAT: bool = false;

    /// Default console output setting
    pub const LOG_CONSOLE_OUTPUT: bool = true;

    /// Default file output setting
    pub const LOG_FILE_OUTPUT: bool = false;

    /// Default maximum log files to keep
    pub const LOG_MAX_FILES: u32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::load_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(config.reconcile.batch_size, 10_000);
        assert_eq!(config.reconcile.rewrite_table.as_str(), "url_rewrite");
        assert_eq!(config.reconcile.kinds.len(), 2);
        assert!(config.reconcile.descriptor(EntityKind::Product).is_some());
    }

    #[test]
    fn file_overrides_defaults() {
        let file = toml_file(
            r#"
            [reconcile]
            batch_size = 500

            [[reconcile.kinds]]
            kind = "category"
            entity_table = "catalog_category_entity"
            link_field = "entity_id"

            [[reconcile.kinds]]
            kind = "product"
            entity_table = "catalog_product_entity"
            link_field = "row_id"
            "#,
        );

        let config = AppConfig::load_with_env(Some(file.path()), Some(HashMap::new())).unwrap();

        assert_eq!(config.reconcile.batch_size, 500);
        let product = config.reconcile.descriptor(EntityKind::Product).unwrap();
        assert_eq!(product.link_field.as_str(), "row_id");
        assert_eq!(config.database.url, defaults::DATABASE_URL);
    }

    #[test]
    fn environment_overrides_file() {
        let file = toml_file("[reconcile]\nbatch_size = 500\n");
        let env = HashMap::from([
            ("URL_REWRITE_RECONCILE__BATCH_SIZE".to_string(), "250".to_string()),
            ("URL_REWRITE_DATABASE__URL".to_string(), "sqlite::memory:".to_string()),
        ]);

        let config = AppConfig::load_with_env(Some(file.path()), Some(env)).unwrap();

        assert_eq!(config.reconcile.batch_size, 250);
        assert_eq!(config.database.url, "sqlite::memory:");
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let file = toml_file("[reconcile]\nbatch_size = 0\n");
        let err = AppConfig::load_with_env(Some(file.path()), Some(HashMap::new())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn duplicate_kinds_are_rejected() {
        let mut config = AppConfig::default();
        config
            .reconcile
            .kinds
            .push(EntityKindDescriptor::default_for(EntityKind::Category));
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn unsafe_table_name_fails_to_load() {
        let file = toml_file("[reconcile]\nrewrite_table = \"url_rewrite; DROP TABLE x\"\n");
        let err = AppConfig::load_with_env(Some(file.path()), Some(HashMap::new())).unwrap_err();
        assert!(matches!(err, ConfigError::FileLoad { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = AppConfig::load_with_env(Some(Path::new("/nonexistent/url-rewrite.toml")), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileLoad { .. }));
    }
}
