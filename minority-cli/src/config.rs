use minority_seal::SealConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    pub data_dir: PathBuf,
    pub seal: SealConfig,
    pub verbose: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            seal: SealConfig::default(),
            verbose: false,
        }
    }
}

impl CliConfig {
    /// Read `<data_dir>/config.json`, falling back to defaults.
    pub async fn load(data_dir: &Path, verbose: bool) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(data_dir).await?;
        let seal = SealConfig::load(&data_dir.join(CONFIG_FILE)).await?;

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            seal,
            verbose,
        })
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minority")
}
