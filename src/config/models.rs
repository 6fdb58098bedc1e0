// src/config/models.rs
use serde::{Deserialize, Serialize};

use crate::listener::DEFAULT_BACKLOG;

fn default_port() -> u16 {
    9999
}

fn default_backlog() -> i32 {
    DEFAULT_BACKLOG
}

fn default_reuse_address() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub listener: ListenerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_backlog")]
    pub backlog: i32,
    #[serde(default = "default_reuse_address")]
    pub reuse_address: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            backlog: default_backlog(),
            reuse_address: default_reuse_address(),
        }
    }
}

impl ListenerConfig {
    /// Settings for `port` with the stock backlog and reuse flags.
    pub fn for_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listener.backlog < 1 {
            anyhow::bail!(
                "listener.backlog must be at least 1, got {}",
                self.listener.backlog
            );
        }
        Ok(())
    }
}
