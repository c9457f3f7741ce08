use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the tax forms backend
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TaxFormsConfig {
    /// Database settings
    pub database: DatabaseConfig,
    /// Observability settings
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level filter, e.g. "info" or "tax_forms=debug"
    pub log_level: String,
    /// Emit JSON log lines instead of compact text
    pub json_logs: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tax-forms.db".to_string(),
            max_connections: 5,
            auto_migrate: true,
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            json_logs: true,
        }
    }
}

impl TaxFormsConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (tax-forms.toml, .tax-forms-rc)
    /// 3. Environment variables (prefixed with TAX_FORMS__, e.g. TAX_FORMS__DATABASE__URL)
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&TaxFormsConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if Path::new("tax-forms.toml").exists() {
            builder = builder.add_source(File::with_name("tax-forms"));
        }

        if Path::new(".tax-forms-rc").exists() {
            builder = builder.add_source(File::new(".tax-forms-rc", config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("TAX_FORMS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<TaxFormsConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = TaxFormsConfig::load_env_file();
        TaxFormsConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static TaxFormsConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
