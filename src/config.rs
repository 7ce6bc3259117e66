//! Designer configuration
//!
//! Everything is sourced from environment variables so the CLI behaves the
//! same whether it runs from a checkout or a deployed toolbox. Defaults are
//! chosen for local development.

use std::path::PathBuf;

/// Configuration for a designer session
#[derive(Debug, Clone)]
pub struct DesignerConfig {
    /// Root directory for generated artifacts (translations, models, migrations)
    pub artifact_dir: PathBuf,
    /// Locale used when recording translations during design
    pub default_locale: String,
    /// Application environment, used to gate the designer to development setups
    pub app_env: String,
    /// Postgres connection string for the metadata store (database feature)
    pub database_url: Option<String>,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./generated"),
            default_locale: "en".to_string(),
            app_env: "local".to_string(),
            database_url: None,
        }
    }
}

impl DesignerConfig {
    /// Build a configuration from the process environment.
    ///
    /// Recognized variables: `DESIGNER_ARTIFACT_DIR`, `DESIGNER_LOCALE`,
    /// `APP_ENV`, `DATABASE_URL`.
    pub fn from_env() -> Self {
        Self {
            artifact_dir: std::env::var("DESIGNER_ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./generated")),
            default_locale: std::env::var("DESIGNER_LOCALE").unwrap_or_else(|_| "en".to_string()),
            app_env: std::env::var("APP_ENV").unwrap_or_else(|_| "production".to_string()),
            database_url: std::env::var("DATABASE_URL").ok(),
        }
    }

    /// The designer only runs against development environments unless forced.
    pub fn is_development(&self) -> bool {
        matches!(self.app_env.as_str(), "local" | "dev" | "development")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DesignerConfig::default();
        assert_eq!(config.default_locale, "en");
        assert!(config.is_development());
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_environment_gate() {
        let mut config = DesignerConfig::default();
        for env in ["local", "dev", "development"] {
            config.app_env = env.to_string();
            assert!(config.is_development(), "{env} should be a dev environment");
        }

        config.app_env = "production".to_string();
        assert!(!config.is_development());
    }
}
