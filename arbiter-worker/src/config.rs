use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use ubyte::ByteUnit;
use validator::Validate;

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Config {
    #[validate]
    pub worker: Worker,

    #[validate]
    pub redis: Redis,

    #[validate]
    pub executor: Executor,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Worker {
    #[validate(length(min = 1))]
    pub queue_key: String,

    #[validate(length(min = 1))]
    pub result_key_prefix: String,

    /// Seconds before a stored verdict expires.
    #[validate(range(min = 1))]
    pub result_expiry: u64,

    /// Fixed delay between retries after a transport failure, milliseconds.
    #[validate(range(min = 100, max = 60000))]
    pub retry_delay: u64,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Redis {
    #[validate(length(min = 1))]
    pub url: String,

    #[validate(range(max = 64))]
    pub max_open: u64,
}

#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct Executor {
    pub workspace_root: PathBuf,

    /// Memory ceiling applied to every sandbox, compile and run alike.
    pub memory_limit: ByteUnit,

    /// Wall-clock limit per test case, milliseconds.
    #[validate(range(min = 100, max = 60000))]
    pub time_limit: u64,

    /// Wall-clock limit for the compile step, milliseconds.
    #[validate(range(min = 1000, max = 600000))]
    pub compile_time_limit: u64,
}

impl Config {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config> {
        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
impl Config {
    pub fn default_for_tests() -> Config {
        Config {
            worker: Worker {
                queue_key: "submission_queue".to_owned(),
                result_key_prefix: "submission".to_owned(),
                result_expiry: 3600,
                retry_delay: 5000,
            },
            redis: Redis {
                url: "redis://localhost:6379".to_owned(),
                max_open: 4,
            },
            executor: Executor {
                workspace_root: std::env::temp_dir().join("arbiter-workspaces"),
                memory_limit: ByteUnit::Mebibyte(256),
                time_limit: 2000,
                compile_time_limit: 10000,
            },
        }
    }
}
