//! Client wiring for discovery queries.
//!
//! Queries use the server's default credentials unless the browser session
//! supplied its own. Default clients are built once so the catalog access
//! token is shared between queries.

use super::error::DiscoveryError;
use super::pipeline::{DiscoveryPipeline, PipelineSettings};
use super::requester::RecommendationRequester;
use crate::catalog::{CatalogClient, SpotifyClient, SpotifyOptions};
use crate::llm::{CompletionOptions, LlmProvider, OpenAIProvider};
use crate::secrets::SecretSource;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Catalog credentials: client id plus client secret.
#[derive(Debug, Clone, Default)]
pub struct CatalogCredentials {
    pub client_id: Option<String>,
    pub client_secret: SecretSource,
}

impl CatalogCredentials {
    pub fn is_configured(&self) -> bool {
        self.client_id
            .as_deref()
            .map(|id| !id.trim().is_empty())
            .unwrap_or(false)
            && self.client_secret.is_configured()
    }
}

/// Server-side default credentials.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub catalog: CatalogCredentials,
    pub llm_api_key: SecretSource,
}

/// Credentials typed in by the user for one browser session. Blank values
/// fall back to the server defaults.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOverrides {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub spotify_client_id: Option<String>,
    #[serde(default)]
    pub spotify_client_secret: Option<String>,
}

impl std::fmt::Debug for CredentialOverrides {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialOverrides")
            .field("openai_api_key", &self.openai_api_key.as_ref().map(|_| "<redacted>"))
            .field("spotify_client_id", &self.spotify_client_id)
            .field(
                "spotify_client_secret",
                &self.spotify_client_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CredentialOverrides {
    /// Drops blank values.
    pub fn normalized(&self) -> Self {
        Self {
            openai_api_key: non_blank(&self.openai_api_key),
            spotify_client_id: non_blank(&self.spotify_client_id),
            spotify_client_secret: non_blank(&self.spotify_client_secret),
        }
    }

    fn overrides_catalog(&self) -> bool {
        self.spotify_client_id.is_some() || self.spotify_client_secret.is_some()
    }
}

/// Which credentials a session ends up with, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CredentialStatus {
    pub catalog_configured: bool,
    pub llm_configured: bool,
    pub catalog_overridden: bool,
    pub llm_overridden: bool,
}

/// Builds API clients from credentials.
pub trait ClientFactory: Send + Sync {
    fn catalog_client(
        &self,
        credentials: &CatalogCredentials,
    ) -> Result<Arc<dyn CatalogClient>, DiscoveryError>;

    fn llm_provider(&self, api_key: &SecretSource) -> Result<Arc<dyn LlmProvider>, DiscoveryError>;
}

/// Production factory: Spotify for the catalog, an OpenAI-compatible API
/// for the model.
pub struct ApiClientFactory {
    pub spotify: SpotifyOptions,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl ClientFactory for ApiClientFactory {
    fn catalog_client(
        &self,
        credentials: &CatalogCredentials,
    ) -> Result<Arc<dyn CatalogClient>, DiscoveryError> {
        let client = SpotifyClient::new(
            credentials.client_id.clone().unwrap_or_default(),
            credentials.client_secret.clone(),
            self.spotify.clone(),
        )?;
        Ok(Arc::new(client))
    }

    fn llm_provider(&self, api_key: &SecretSource) -> Result<Arc<dyn LlmProvider>, DiscoveryError> {
        Ok(Arc::new(OpenAIProvider::new(
            self.llm_base_url.clone(),
            self.llm_model.clone(),
            api_key.clone(),
        )))
    }
}

/// Everything needed to start discovery queries.
pub struct DiscoveryServices {
    factory: Arc<dyn ClientFactory>,
    defaults: Credentials,
    default_catalog: Option<Arc<dyn CatalogClient>>,
    default_llm: Option<Arc<dyn LlmProvider>>,
    completion: CompletionOptions,
    pipeline: PipelineSettings,
}

impl DiscoveryServices {
    pub fn new(
        factory: Arc<dyn ClientFactory>,
        defaults: Credentials,
        completion: CompletionOptions,
        pipeline: PipelineSettings,
    ) -> Result<Self, DiscoveryError> {
        let default_catalog = if defaults.catalog.is_configured() {
            Some(factory.catalog_client(&defaults.catalog)?)
        } else {
            None
        };
        let default_llm = if defaults.llm_api_key.is_configured() {
            Some(factory.llm_provider(&defaults.llm_api_key)?)
        } else {
            None
        };

        Ok(Self {
            factory,
            defaults,
            default_catalog,
            default_llm,
            completion,
            pipeline,
        })
    }

    pub fn status(&self, overrides: &CredentialOverrides) -> CredentialStatus {
        let overrides = overrides.normalized();
        CredentialStatus {
            catalog_configured: self.catalog_credentials(&overrides).is_configured(),
            llm_configured: overrides.openai_api_key.is_some()
                || self.defaults.llm_api_key.is_configured(),
            catalog_overridden: overrides.overrides_catalog(),
            llm_overridden: overrides.openai_api_key.is_some(),
        }
    }

    fn catalog_credentials(&self, overrides: &CredentialOverrides) -> CatalogCredentials {
        CatalogCredentials {
            client_id: overrides
                .spotify_client_id
                .clone()
                .or_else(|| self.defaults.catalog.client_id.clone()),
            client_secret: match &overrides.spotify_client_secret {
                Some(secret) => SecretSource::Static(secret.clone()),
                None => self.defaults.catalog.client_secret.clone(),
            },
        }
    }

    /// Catalog client for a session.
    pub fn catalog(
        &self,
        overrides: &CredentialOverrides,
    ) -> Result<Arc<dyn CatalogClient>, DiscoveryError> {
        let overrides = overrides.normalized();
        if !overrides.overrides_catalog() {
            if let Some(client) = &self.default_catalog {
                return Ok(client.clone());
            }
        }

        let credentials = self.catalog_credentials(&overrides);
        if !credentials.is_configured() {
            return Err(DiscoveryError::Credentials(
                "Spotify client id and client secret are required".to_string(),
            ));
        }
        debug!("Building catalog client from session credentials");
        self.factory.catalog_client(&credentials)
    }

    /// Model provider for a session.
    pub fn llm(&self, overrides: &CredentialOverrides) -> Result<Arc<dyn LlmProvider>, DiscoveryError> {
        let overrides = overrides.normalized();
        match (&overrides.openai_api_key, &self.default_llm) {
            (Some(key), _) => {
                debug!("Building model provider from session credentials");
                self.factory
                    .llm_provider(&SecretSource::Static(key.clone()))
            }
            (None, Some(provider)) => Ok(provider.clone()),
            (None, None) => Err(DiscoveryError::Credentials(
                "An OpenAI API key is required".to_string(),
            )),
        }
    }

    /// Pipeline wired with the session's effective credentials. Fails
    /// before any network call when credentials are missing.
    pub fn pipeline(&self, overrides: &CredentialOverrides) -> Result<DiscoveryPipeline, DiscoveryError> {
        let catalog = self.catalog(overrides)?;
        let llm = self.llm(overrides)?;
        Ok(DiscoveryPipeline::new(
            catalog,
            RecommendationRequester::new(llm, self.completion.clone()),
            self.pipeline.clone(),
        ))
    }
}
