use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL; the in-memory store is used when absent
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    #[serde(default)]
    pub pod: PodConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

/// Proof-of-delivery file storage
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PodConfig {
    pub upload_dir: String,
    /// URL prefix stored on each POD record
    pub public_base: String,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            upload_dir: "./uploads/pod".to_string(),
            public_base: "/api/tms/pod/files".to_string(),
        }
    }
}

fn default_max_connections() -> u32 {
    10
}

impl AppConfig {
    /// Load `{config_dir}/{env}.yaml`
    pub fn load(config_dir: impl AsRef<Path>, env: &str) -> anyhow::Result<Self> {
        let config_path = config_dir.as_ref().join(format!("{env}.yaml"));
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    pub fn from_yaml_str(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: tms.log
use_json: false
rotation: daily
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert!(config.postgres_url.is_none());
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.pod.public_base, "/api/tms/pod/files");
    }

    #[test]
    fn test_pod_section_overrides() {
        let yaml = format!(
            "{MINIMAL}postgres_url: postgres://tms@localhost/tms\npod:\n  upload_dir: /var/tms\n  public_base: /files\n"
        );
        let config = AppConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(config.postgres_url.as_deref(), Some("postgres://tms@localhost/tms"));
        assert_eq!(config.pod.upload_dir, "/var/tms");
        assert_eq!(config.pod.public_base, "/files");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(dir.path(), "nope").unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("dev.yaml"), MINIMAL).unwrap();
        let config = AppConfig::load(dir.path(), "dev").unwrap();
        assert_eq!(config.log_file, "tms.log");
    }
}
