use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::DeletePolicy;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Applied uniformly when deleting goals that still have relations.
    pub delete_policy: DeletePolicy,
}

/// Optional settings read from northstar.toml in the data directory.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    delete_policy: Option<DeletePolicy>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("northstar.db")
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join("northstar.toml")
    }

    /// Merges settings from northstar.toml when the file is present.
    pub fn load_overrides(&mut self) -> Result<()> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(());
        }

        let raw = std::fs::read_to_string(&path)?;
        let file: ConfigFile = toml::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid {}: {e}", path.display())))?;

        if let Some(delete_policy) = file.delete_policy {
            self.delete_policy = delete_policy;
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            delete_policy: DeletePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_absent_file_is_noop() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..Default::default()
        };
        config.load_overrides().unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Block);
    }

    #[test]
    fn test_overrides_delete_policy() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("northstar.toml"),
            "delete_policy = \"cascade\"\n",
        )
        .unwrap();

        let mut config = ServerConfig {
            data_dir: temp.path().to_path_buf(),
            ..Default::default()
        };
        config.load_overrides().unwrap();
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
    }
}
