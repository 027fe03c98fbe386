use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::server::stun::DEFAULT_STUN_PORT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tls: TlsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface the listeners bind to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port serving the controller page and the signaling socket
    #[serde(default = "default_https_port")]
    pub https_port: u16,
    /// Port for the plain-HTTP redirect helper (0 = disabled)
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Port for the built-in STUN server (0 = disabled)
    #[serde(default = "default_stun_port")]
    pub stun_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS. Browsers refuse screen capture on plain-HTTP origins
    /// other than localhost, so turn this off for local testing only.
    #[serde(default = "default_tls_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cert_file")]
    pub cert_file: PathBuf,
    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_https_port() -> u16 {
    443
}

fn default_http_port() -> u16 {
    80
}

fn default_stun_port() -> u16 {
    DEFAULT_STUN_PORT
}

fn default_tls_enabled() -> bool {
    true
}

fn default_cert_file() -> PathBuf {
    get_lancast_dir().join("cert.pem")
}

fn default_key_file() -> PathBuf {
    get_lancast_dir().join("key.pem")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            https_port: default_https_port(),
            http_port: default_http_port(),
            stun_port: default_stun_port(),
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tls_enabled(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            tls: TlsConfig::default(),
        }
    }
}

impl Config {
    /// Load config from file, or create default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = get_config_path();

        if config_path.exists() {
            let content =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}

/// Get the lancast directory (~/.lancast)
pub fn get_lancast_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lancast")
}

/// Get the config file path (~/.lancast/config.toml)
pub fn get_config_path() -> PathBuf {
    get_lancast_dir().join("config.toml")
}
