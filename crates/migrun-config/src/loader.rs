use std::path::{Path, PathBuf};

use migrun_common::{Error, Result};
use tracing::debug;

use crate::model::AppConfig;

/// Reads `AppConfig` from TOML or YAML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// `~/.migrun/config.toml`, falling back to the working directory when no
    /// home directory is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".migrun")
            .join("config.toml")
    }

    /// Load and validate the config at `path`. The parser is picked by extension.
    pub fn load(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config: AppConfig = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        config.validate()?;
        debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Like [`ConfigLoader::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<AppConfig> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no config at {}, using defaults", path.display());
            Ok(AppConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn loads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "config.toml",
            r#"
[database]
path = "/var/lib/app/app.db"

[migrations]
table = "schema_history"
"#,
        );

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(
            config.database.path.as_deref(),
            Some(Path::new("/var/lib/app/app.db"))
        );
        assert_eq!(config.migrations.table, "schema_history");
        assert_eq!(config.migrations.identifier_width, 3);
    }

    #[test]
    fn loads_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "config.yml",
            "migrations:\n  identifier_width: 4\nlog:\n  level: debug\n",
        );

        let config = ConfigLoader::load(&path).unwrap();
        assert_eq!(config.migrations.table, "migrations");
        assert_eq!(config.migrations.identifier_width, 4);
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "config.ini", "table=migrations");
        let err = ConfigLoader::load(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config extension"));
    }

    #[test]
    fn rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "config.toml", "[migrations]\ntable = \"bad name\"\n");
        assert!(ConfigLoader::load(&path).is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigLoader::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.migrations.table, "migrations");
    }
}
