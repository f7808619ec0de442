//! In-memory catalog and model used instead of the real APIs.

use super::fixtures::{find_by_id, find_by_name, model_answer};
use async_trait::async_trait;
use discovery_server::catalog::{
    AlbumRecord, ArtistRecord, CatalogClient, CatalogError, TrackRecord,
};
use discovery_server::discovery::{CatalogCredentials, ClientFactory, DiscoveryError};
use discovery_server::llm::{Completion, CompletionOptions, FinishReason, LlmError, LlmProvider};
use discovery_server::secrets::SecretSource;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Catalog backed by the fixture artists.
#[derive(Default)]
pub struct FakeCatalog {
    related_unavailable: bool,
    failing_searches: HashSet<String>,
    /// Every name searched, in call order.
    pub searches: Mutex<Vec<String>>,
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Related-artists lookups fail with a server error.
    pub fn with_related_unavailable(mut self) -> Self {
        self.related_unavailable = true;
        self
    }

    /// Searching `name` fails with a server error.
    pub fn with_failing_search(mut self, name: &str) -> Self {
        self.failing_searches.insert(name.to_lowercase());
        self
    }

    pub fn searched(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

fn unknown(id: &str) -> CatalogError {
    CatalogError::Api {
        status: 404,
        message: format!("no artist {}", id),
    }
}

#[async_trait]
impl CatalogClient for FakeCatalog {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRecord>, CatalogError> {
        self.searches.lock().unwrap().push(name.to_string());
        if self.failing_searches.contains(&name.to_lowercase()) {
            return Err(CatalogError::Api {
                status: 500,
                message: "search backend down".to_string(),
            });
        }
        Ok(find_by_name(name).map(|a| a.record()))
    }

    async fn artist(&self, id: &str) -> Result<ArtistRecord, CatalogError> {
        find_by_id(id).map(|a| a.record()).ok_or_else(|| unknown(id))
    }

    async fn top_tracks(&self, id: &str) -> Result<Vec<TrackRecord>, CatalogError> {
        find_by_id(id).map(|a| a.tracks()).ok_or_else(|| unknown(id))
    }

    async fn related_artists(&self, id: &str) -> Result<Vec<ArtistRecord>, CatalogError> {
        if self.related_unavailable {
            return Err(CatalogError::Api {
                status: 500,
                message: "related artists unavailable".to_string(),
            });
        }
        let artist = find_by_id(id).ok_or_else(|| unknown(id))?;
        Ok(artist
            .related
            .iter()
            .filter_map(|id| find_by_id(id))
            .map(|a| a.record())
            .collect())
    }

    async fn albums(&self, id: &str, limit: usize) -> Result<Vec<AlbumRecord>, CatalogError> {
        let artist = find_by_id(id).ok_or_else(|| unknown(id))?;
        Ok(artist.albums().into_iter().take(limit).collect())
    }

    async fn verify_credentials(&self) -> Result<(), CatalogError> {
        Ok(())
    }
}

/// What the fake model does when asked.
#[derive(Clone)]
pub enum ModelScript {
    Answer(String),
    RateLimited,
    RejectKey,
}

/// Model returning a scripted answer and remembering every prompt.
pub struct ScriptedModel {
    script: ModelScript,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn answering(answer: impl Into<String>) -> Self {
        Self::with_script(ModelScript::Answer(answer.into()))
    }

    /// Answers with the fixture recommendations.
    pub fn standard() -> Self {
        Self::answering(model_answer())
    }

    pub fn with_script(script: ModelScript) -> Self {
        Self {
            script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());

        match &self.script {
            ModelScript::Answer(answer) => Ok(Completion {
                text: answer.clone(),
                finish_reason: FinishReason::Stop,
                usage: None,
            }),
            ModelScript::RateLimited => Err(LlmError::RateLimited),
            ModelScript::RejectKey => Err(LlmError::Credentials("invalid key".to_string())),
        }
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        match &self.script {
            ModelScript::RejectKey => Err(LlmError::Credentials("invalid key".to_string())),
            _ => Ok(()),
        }
    }
}

/// Hands out the same fakes for any credentials and records which
/// credentials were asked for.
pub struct FakeClientFactory {
    pub catalog: Arc<FakeCatalog>,
    pub model: Arc<ScriptedModel>,
    pub catalog_client_ids: Mutex<Vec<Option<String>>>,
    pub llm_keys: Mutex<Vec<String>>,
}

impl FakeClientFactory {
    pub fn new(catalog: FakeCatalog, model: ScriptedModel) -> Self {
        Self {
            catalog: Arc::new(catalog),
            model: Arc::new(model),
            catalog_client_ids: Mutex::new(Vec::new()),
            llm_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn standard() -> Self {
        Self::new(FakeCatalog::new(), ScriptedModel::standard())
    }
}

impl ClientFactory for FakeClientFactory {
    fn catalog_client(
        &self,
        credentials: &CatalogCredentials,
    ) -> Result<Arc<dyn CatalogClient>, DiscoveryError> {
        self.catalog_client_ids
            .lock()
            .unwrap()
            .push(credentials.client_id.clone());
        Ok(self.catalog.clone())
    }

    fn llm_provider(&self, api_key: &SecretSource) -> Result<Arc<dyn LlmProvider>, DiscoveryError> {
        let key = match api_key {
            SecretSource::Static(key) => key.clone(),
            _ => "<not static>".to_string(),
        };
        self.llm_keys.lock().unwrap().push(key);
        Ok(self.model.clone())
    }
}
