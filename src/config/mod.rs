mod file_config;

pub use file_config::{CatalogConfig, DiscoveryConfig, FileConfig, LlmConfig};

use crate::catalog::SpotifyOptions;
use crate::discovery::{CatalogCredentials, Credentials, PipelineSettings};
use crate::llm::CompletionOptions;
use crate::secrets::SecretSource;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub session_ttl_secs: u64,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub spotify_client_secret_command: Option<String>,
    pub spotify_market: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_api_key_command: Option<String>,
    pub openai_base_url: Option<String>,
    pub openai_model: Option<String>,
    pub verify_concurrency: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub port: u16,
    pub bind_address: String,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub session_ttl_secs: u64,

    // Feature configs (with defaults)
    pub catalog: CatalogSettings,
    pub llm: LlmSettings,
    pub discovery: DiscoverySettings,
}

/// Settings for the catalog (Spotify Web API) client.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub client_id: Option<String>,
    pub client_secret: SecretSource,
    pub api_base_url: String,
    pub accounts_base_url: String,
    pub market: String,
    pub timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        let spotify = SpotifyOptions::default();
        Self {
            client_id: None,
            client_secret: SecretSource::None,
            api_base_url: spotify.api_base_url,
            accounts_base_url: spotify.accounts_base_url,
            market: spotify.market,
            timeout_secs: spotify.timeout.as_secs(),
        }
    }
}

/// Settings for the LLM provider.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: SecretSource,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: SecretSource::None,
            temperature: 0.7,
            max_tokens: 1000,
            timeout_secs: 120,
        }
    }
}

/// Settings for the discovery pipeline.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub verify_concurrency: usize,
    pub related_artists_limit: usize,
    pub profile_albums_limit: usize,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        let defaults = PipelineSettings::default();
        Self {
            verify_concurrency: defaults.verify_concurrency,
            related_artists_limit: defaults.related_artists_limit,
            profile_albums_limit: defaults.profile_albums_limit,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let port = file.port.unwrap_or(cli.port);
        let bind_address = file
            .bind_address
            .unwrap_or_else(|| cli.bind_address.clone());

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());
        let session_ttl_secs = file.session_ttl_secs.unwrap_or(cli.session_ttl_secs);
        if session_ttl_secs == 0 {
            bail!("session_ttl_secs must be at least 1");
        }

        // Catalog settings - merge file config with CLI and defaults
        let catalog_file = file.catalog.unwrap_or_default();
        let catalog_defaults = CatalogSettings::default();
        let catalog = CatalogSettings {
            client_id: catalog_file
                .client_id
                .or_else(|| cli.spotify_client_id.clone())
                .filter(|id| !id.trim().is_empty()),
            client_secret: SecretSource::from_parts(
                catalog_file
                    .client_secret
                    .or_else(|| cli.spotify_client_secret.clone()),
                catalog_file
                    .client_secret_command
                    .or_else(|| cli.spotify_client_secret_command.clone()),
            ),
            api_base_url: catalog_file
                .api_base_url
                .unwrap_or(catalog_defaults.api_base_url),
            accounts_base_url: catalog_file
                .accounts_base_url
                .unwrap_or(catalog_defaults.accounts_base_url),
            market: catalog_file
                .market
                .or_else(|| cli.spotify_market.clone())
                .unwrap_or(catalog_defaults.market),
            timeout_secs: catalog_file
                .timeout_secs
                .unwrap_or(catalog_defaults.timeout_secs),
        };

        // LLM settings
        let llm_file = file.llm.unwrap_or_default();
        let llm_defaults = LlmSettings::default();
        let llm = LlmSettings {
            base_url: llm_file
                .base_url
                .or_else(|| cli.openai_base_url.clone())
                .unwrap_or(llm_defaults.base_url),
            model: llm_file
                .model
                .or_else(|| cli.openai_model.clone())
                .unwrap_or(llm_defaults.model),
            api_key: SecretSource::from_parts(
                llm_file.api_key.or_else(|| cli.openai_api_key.clone()),
                llm_file
                    .api_key_command
                    .or_else(|| cli.openai_api_key_command.clone()),
            ),
            temperature: llm_file.temperature.unwrap_or(llm_defaults.temperature),
            max_tokens: llm_file.max_tokens.unwrap_or(llm_defaults.max_tokens),
            timeout_secs: llm_file.timeout_secs.unwrap_or(llm_defaults.timeout_secs),
        };

        if !(0.0..=2.0).contains(&llm.temperature) {
            bail!("llm.temperature must be between 0.0 and 2.0, got {}", llm.temperature);
        }
        if llm.max_tokens == 0 {
            bail!("llm.max_tokens must be greater than 0");
        }

        // Discovery settings
        let discovery_file = file.discovery.unwrap_or_default();
        let discovery_defaults = DiscoverySettings::default();
        let discovery = DiscoverySettings {
            verify_concurrency: discovery_file
                .verify_concurrency
                .or(cli.verify_concurrency)
                .unwrap_or(discovery_defaults.verify_concurrency),
            related_artists_limit: discovery_file
                .related_artists_limit
                .unwrap_or(discovery_defaults.related_artists_limit),
            profile_albums_limit: discovery_file
                .profile_albums_limit
                .unwrap_or(discovery_defaults.profile_albums_limit),
        };

        if discovery.verify_concurrency == 0 {
            bail!("discovery.verify_concurrency must be at least 1");
        }

        Ok(Self {
            port,
            bind_address,
            logging_level,
            frontend_dir_path,
            session_ttl_secs,
            catalog,
            llm,
            discovery,
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            catalog: CatalogCredentials {
                client_id: self.catalog.client_id.clone(),
                client_secret: self.catalog.client_secret.clone(),
            },
            llm_api_key: self.llm.api_key.clone(),
        }
    }

    pub fn spotify_options(&self) -> SpotifyOptions {
        SpotifyOptions {
            api_base_url: self.catalog.api_base_url.clone(),
            accounts_base_url: self.catalog.accounts_base_url.clone(),
            market: self.catalog.market.clone(),
            timeout: Duration::from_secs(self.catalog.timeout_secs),
        }
    }

    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.llm.temperature,
            max_tokens: Some(self.llm.max_tokens),
            timeout: Duration::from_secs(self.llm.timeout_secs),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            verify_concurrency: self.discovery.verify_concurrency,
            related_artists_limit: self.discovery.related_artists_limit,
            profile_albums_limit: self.discovery.profile_albums_limit,
        }
    }
}

fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
