use std::path::PathBuf;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Listening history snapshot (CSV)
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// Candidate track catalog snapshot (CSV)
    #[serde(default = "default_catalog_path")]
    pub catalog_path: PathBuf,

    /// Where the reconciled history is written. Defaults to `history_path`,
    /// which overwrites the original snapshot.
    #[serde(default)]
    pub reconciled_path: Option<PathBuf>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_history_path() -> PathBuf {
    PathBuf::from("spotify_history_with_features.csv")
}

fn default_catalog_path() -> PathBuf {
    PathBuf::from("dataset.csv")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Destination of the reconciled history snapshot
    pub fn reconciled_path(&self) -> &PathBuf {
        self.reconciled_path.as_ref().unwrap_or(&self.history_path)
    }

    /// Socket address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
