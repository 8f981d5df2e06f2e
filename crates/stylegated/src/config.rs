//! TOML configuration for the stylegate daemon
//!
//! Every section is optional. Without a config file the daemon listens on
//! port 5000 and resolves the built-in candidate endpoints for all four
//! capabilities. A `[capabilities]` table, when present, replaces that
//! built-in set entirely.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Deserializer};
use stylegate_api::StagingArea;
use stylegate_client::ClientOptions;
use stylegate_core::Capability;
use stylegate_proxy::{RemoteConnector, DEFAULT_API_NAME};
use stylegate_registry::{CapabilityConfig, RetryPolicy};

/// `[server]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// `[storage]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Staged inputs (uploads and downloaded person images)
    pub uploads_dir: PathBuf,
    /// Published results, also served under `/results`
    pub public_dir: PathBuf,
    /// Person image used by plain try-on requests
    pub base_image: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_dir: PathBuf::from("uploads"),
            public_dir: PathBuf::from("public"),
            base_image: PathBuf::from("public/image.JPEG"),
        }
    }
}

/// `[resolver]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            backoff_secs: policy.backoff.as_secs(),
        }
    }
}

/// `[client]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Bearer token for private hosted spaces
    pub hf_token: Option<String>,
    /// Where remote file outputs land before publishing
    pub download_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            connect_timeout_secs: 10,
            hf_token: None,
            download_dir: None,
        }
    }
}

/// `[capabilities.<name>]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapabilityToml {
    /// Candidate endpoints in preference order: URLs or `owner/space` ids
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_api_name")]
    pub api_name: String,
}

fn default_api_name() -> String {
    DEFAULT_API_NAME.to_string()
}

fn default_capabilities() -> BTreeMap<Capability, CapabilityToml> {
    let entry = |endpoints: &[&str]| CapabilityToml {
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        api_name: default_api_name(),
    };

    BTreeMap::from([
        (
            Capability::VirtualTryon,
            entry(&[
                "https://7395458a587bc50ec3.gradio.live/",
                "https://virtual-try-on.hf.space/",
            ]),
        ),
        (
            Capability::Chatbot,
            entry(&[
                "https://fe81ff40040ecfff3c.gradio.live/",
                "https://fashion-chatbot.hf.space/",
            ]),
        ),
        (Capability::TextToDress, entry(&["dhaan-ish/text-to-cloth"])),
        (
            Capability::Occasion,
            entry(&[
                "https://8c8e6f96c1fe2aefb7.gradio.live/",
                "https://fashion-occasion.hf.space/",
            ]),
        ),
    ])
}

/// Capability tables keyed by name; unknown names are an error
fn deserialize_capabilities<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<Capability, CapabilityToml>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, CapabilityToml>::deserialize(deserializer)?
        .into_iter()
        .map(|(name, entry)| {
            name.parse::<Capability>()
                .map(|capability| (capability, entry))
                .map_err(serde::de::Error::custom)
        })
        .collect()
}

/// Top-level daemon configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(
        default = "default_capabilities",
        deserialize_with = "deserialize_capabilities"
    )]
    pub capabilities: BTreeMap<Capability, CapabilityToml>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            resolver: ResolverConfig::default(),
            client: ClientConfig::default(),
            capabilities: default_capabilities(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: GatewayConfig = toml::from_str(content)?;
        if config.resolver.max_attempts == 0 {
            anyhow::bail!("resolver.max_attempts must be at least 1");
        }
        Ok(config)
    }

    /// Fill the token from the environment when the file does not set one
    pub fn with_env_token(mut self, token: Option<String>) -> Self {
        if self.client.hf_token.is_none() {
            self.client.hf_token = token.filter(|t| !t.is_empty());
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.resolver.max_attempts,
            backoff: Duration::from_secs(self.resolver.backoff_secs),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            timeout: Duration::from_secs(self.client.timeout_secs),
            connect_timeout: Duration::from_secs(self.client.connect_timeout_secs),
            hf_token: self.client.hf_token.clone(),
            download_dir: self
                .client
                .download_dir
                .clone()
                .unwrap_or(defaults.download_dir),
        }
    }

    /// Connector carrying the client options and per-capability api names
    pub fn connector(&self) -> RemoteConnector {
        self.capabilities.iter().fold(
            RemoteConnector::new(self.client_options()),
            |connector, (capability, entry)| connector.with_api_name(*capability, &entry.api_name),
        )
    }

    pub fn capability_configs(&self) -> Vec<CapabilityConfig> {
        self.capabilities
            .iter()
            .map(|(capability, entry)| CapabilityConfig::new(*capability, entry.endpoints.clone()))
            .collect()
    }

    pub fn staging_area(&self) -> StagingArea {
        StagingArea::new(
            &self.storage.uploads_dir,
            &self.storage.public_dir,
            &self.storage.base_image,
        )
    }
}
