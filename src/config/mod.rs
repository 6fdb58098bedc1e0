// src/config/mod.rs
mod models;

pub use models::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a file (YAML or JSON)
pub async fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .context("Failed to read config file")?;

    let ext = path.extension().and_then(|s| s.to_str());
    let config: Config = if ext == Some("yaml") || ext == Some("yml") {
        serde_yaml::from_str(&contents).context("Failed to parse YAML config")?
    } else {
        serde_json::from_str(&contents).context("Failed to parse JSON config")?
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_yaml_file() {
        let path = std::env::temp_dir().join(format!("tcp-acceptor-{}.yaml", std::process::id()));
        tokio::fs::write(&path, "listener:\n  port: 7100\n")
            .await
            .unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.listener.port, 7100);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let result = load_config("/nonexistent/tcp-acceptor.yaml").await;
        assert!(result.is_err());
    }
}
