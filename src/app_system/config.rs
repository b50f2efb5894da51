use std::path::PathBuf;

use tracing::debug;

use crate::error::ConfigError;

pub const REMOTE_URL_VAR: &str = "COMBO_REMOTE_URL";
pub const REMOTE_KEY_VAR: &str = "COMBO_REMOTE_KEY";
pub const DATA_DIR_VAR: &str = "COMBO_DATA_DIR";
pub const CHANNEL_BUFFER_VAR: &str = "COMBO_CHANNEL_BUFFER";

const DEFAULT_DATA_DIR: &str = "./combo-data";
const DEFAULT_CHANNEL_BUFFER: usize = 100;

/// Credentials for the hosted store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Present only when both the URL and the key are set.
    pub remote: Option<RemoteConfig>,
    pub data_dir: PathBuf,
    /// Mailbox size of each collection actor.
    pub channel_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            remote: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
        }
    }
}

impl StoreConfig {
    /// Reads the process environment, after loading a `.env` file if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let remote = match (read(REMOTE_URL_VAR), read(REMOTE_KEY_VAR)) {
            (Some(url), Some(key)) => Some(RemoteConfig { url, key }),
            _ => None,
        };

        let data_dir = read(DATA_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let channel_buffer = match read(CHANNEL_BUFFER_VAR) {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: CHANNEL_BUFFER_VAR,
                        value,
                    })
                }
            },
            None => DEFAULT_CHANNEL_BUFFER,
        };

        Ok(Self {
            remote,
            data_dir,
            channel_buffer,
        })
    }
}
