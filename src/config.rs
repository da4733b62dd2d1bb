use crate::storage::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://items.db";

/// Contents of `itemstore.toml`; every field optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ItemstoreConfig {
    pub backend: Option<Backend>,
    pub data_file: Option<String>,
    pub database_url: Option<String>,
    /// Accept unverifiable server certificates (explicit trust downgrade)
    pub tls_insecure: Option<bool>,
    pub lock_documents: Option<bool>,
}

/// Fully resolved settings used to open a store
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub backend: Backend,
    pub data_file: PathBuf,
    pub database_url: String,
    pub tls_insecure: bool,
    pub lock_documents: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Document,
            data_file: PathBuf::from(DEFAULT_DATA_FILE),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            tls_insecure: false,
            lock_documents: false,
        }
    }
}

impl Settings {
    /// Layer a config file over the defaults
    pub fn from_config(config: &ItemstoreConfig) -> Self {
        let mut settings = Self::default();
        settings.merge(config);
        settings
    }

    pub fn merge(&mut self, config: &ItemstoreConfig) {
        if let Some(backend) = config.backend {
            self.backend = backend;
        }
        if let Some(data_file) = &config.data_file {
            self.data_file = PathBuf::from(data_file);
        }
        if let Some(url) = &config.database_url {
            self.database_url = url.clone();
        }
        if let Some(tls_insecure) = config.tls_insecure {
            self.tls_insecure = tls_insecure;
        }
        if let Some(lock) = config.lock_documents {
            self.lock_documents = lock;
        }
    }

    /// Apply `ITEMSTORE_*` overrides read through `lookup`
    pub fn apply_env_with(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> crate::Result<()> {
        let env = env_config(lookup)?;
        self.merge(&env);
        Ok(())
    }

    /// Apply overrides from the process environment (after loading `.env` if present)
    pub fn apply_env(&mut self) -> crate::Result<()> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        self.apply_env_with(|key| std::env::var(key).ok())
    }
}

fn env_config(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<ItemstoreConfig> {
    let backend = lookup("ITEMSTORE_BACKEND")
        .map(|v| Backend::from_str(&v))
        .transpose()?;
    let database_url = lookup("ITEMSTORE_DATABASE_URL").or_else(|| lookup("DATABASE_URL"));

    Ok(ItemstoreConfig {
        backend,
        data_file: lookup("ITEMSTORE_DATA_FILE"),
        database_url,
        tls_insecure: lookup("ITEMSTORE_TLS_INSECURE")
            .map(|v| parse_flag("ITEMSTORE_TLS_INSECURE", &v))
            .transpose()?,
        lock_documents: lookup("ITEMSTORE_LOCK_DOCUMENTS")
            .map(|v| parse_flag("ITEMSTORE_LOCK_DOCUMENTS", &v))
            .transpose()?,
    })
}

fn parse_flag(key: &str, value: &str) -> crate::Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(crate::Error::Config(format!("{key}: expected a boolean, got {other}"))),
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("itemstore.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ItemstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ItemstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ItemstoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Create the parent directory of a storage file if needed
pub fn ensure_parent_dir(file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = file.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("itemstore.toml"))).unwrap().is_none());
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("itemstore.toml");
        let config = ItemstoreConfig {
            backend: Some(Backend::Relational),
            database_url: Some("sqlite://shop.db".to_string()),
            ..ItemstoreConfig::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        let loaded = load_config(Some(&path)).unwrap().unwrap();
        assert_eq!(loaded, config);

        let settings = Settings::from_config(&loaded);
        assert_eq!(settings.backend, Backend::Relational);
        assert_eq!(settings.database_url, "sqlite://shop.db");
        assert_eq!(settings.data_file, PathBuf::from(DEFAULT_DATA_FILE));
        assert!(!settings.tls_insecure);
    }

    #[test]
    fn test_env_overrides_file() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("ITEMSTORE_BACKEND", "relational"),
            ("DATABASE_URL", "sqlite://from-env.db"),
            ("ITEMSTORE_TLS_INSECURE", "true"),
        ]);
        let mut settings = Settings::from_config(&ItemstoreConfig {
            backend: Some(Backend::Document),
            database_url: Some("sqlite://from-file.db".to_string()),
            ..ItemstoreConfig::default()
        });

        settings
            .apply_env_with(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(settings.backend, Backend::Relational);
        assert_eq!(settings.database_url, "sqlite://from-env.db");
        assert!(settings.tls_insecure);
        assert!(!settings.lock_documents);
    }

    #[test]
    fn test_bad_env_flag() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env_with(|key| (key == "ITEMSTORE_LOCK_DOCUMENTS").then(|| "maybe".to_string()))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Invalid);
    }
}
