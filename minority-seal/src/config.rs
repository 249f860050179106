use crate::error::{Result, SealError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MARKER: &str = "encrypted_";
pub const DEFAULT_PREVIEW_LEN: usize = 20;
pub const DEFAULT_CAPACITY: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Devnet,
    Localnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://fullnode.mainnet.sui.io:443",
            Network::Testnet => "https://fullnode.testnet.sui.io:443",
            Network::Devnet => "https://fullnode.devnet.sui.io:443",
            Network::Localnet => "http://127.0.0.1:9000",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = SealError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "devnet" => Ok(Network::Devnet),
            "localnet" | "local" => Ok(Network::Localnet),
            other => Err(SealError::config(format!("Unknown network: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SealConfig {
    pub network: Network,
    /// Prefix every sealed choice starts with.
    pub marker: String,
    pub preview_len: usize,
    pub kdf_iterations: u32,
    pub default_capacity: usize,
}

impl Default for SealConfig {
    fn default() -> Self {
        Self {
            network: Network::Testnet,
            marker: DEFAULT_MARKER.to_string(),
            preview_len: DEFAULT_PREVIEW_LEN,
            kdf_iterations: 10_000,
            default_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SealConfig {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Fullnode endpoint for the configured network.
    pub fn rpc_url(&self) -> &'static str {
        self.network.default_rpc_url()
    }

    pub fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(SealError::config("Ciphertext marker cannot be empty"));
        }

        if self.preview_len == 0 {
            return Err(SealError::config("Preview length must be greater than 0"));
        }

        if self.kdf_iterations == 0 {
            return Err(SealError::config("KDF iterations must be greater than 0"));
        }

        if self.default_capacity < 2 {
            return Err(SealError::config("Room capacity must be at least 2"));
        }

        Ok(())
    }

    /// Load from a JSON file; a missing file yields the defaults.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_network_urls() {
        let config = SealConfig::new(Network::Localnet);
        assert_eq!(config.rpc_url(), "http://127.0.0.1:9000");
        assert_eq!(config.marker, DEFAULT_MARKER);
        assert!(config.validate().is_ok());
        assert_eq!("DEVNET".parse::<Network>().unwrap(), Network::Devnet);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SealConfig::default();
        config.marker.clear();
        assert!(config.validate().is_err());

        let mut config = SealConfig::default();
        config.kdf_iterations = 0;
        assert!(config.validate().is_err());

        let mut config = SealConfig::default();
        config.default_capacity = 1;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let temp_dir = tempdir().unwrap();
        let config = SealConfig::load(&temp_dir.path().join("config.json"))
            .await
            .unwrap();
        assert_eq!(config.preview_len, DEFAULT_PREVIEW_LEN);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let mut config = SealConfig::new(Network::Devnet);
        config.kdf_iterations = 42;
        config.save(&path).await.unwrap();

        let loaded = SealConfig::load(&path).await.unwrap();
        assert_eq!(loaded.network, Network::Devnet);
        assert_eq!(loaded.kdf_iterations, 42);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        tokio::fs::write(&path, r#"{"network":"mainnet"}"#).await.unwrap();

        let loaded = SealConfig::load(&path).await.unwrap();
        assert_eq!(loaded.network, Network::Mainnet);
        assert_eq!(loaded.rpc_url(), "https://fullnode.mainnet.sui.io:443");
        assert_eq!(loaded.marker, DEFAULT_MARKER);
    }
}
