//! The discovery query driver.
//!
//! A query walks `Idle -> FetchingArtist -> BuildingPrompt ->
//! RequestingModel -> ParsingResponse -> VerifyingRecommendations -> Ready`.
//! Any failure sends it straight back to `Idle`; nothing is retried.

use super::enrich::{verify_and_enrich, EnrichOptions};
use super::error::DiscoveryError;
use super::models::{ArtistProfile, DiscoveryResult};
use super::prompt::build_prompt;
use super::requester::RecommendationRequester;
use super::response::parse_model_response;
use crate::catalog::CatalogClient;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStage {
    Idle,
    FetchingArtist,
    BuildingPrompt,
    RequestingModel,
    ParsingResponse,
    VerifyingRecommendations,
    Ready,
}

impl DiscoveryStage {
    pub fn description(&self) -> &'static str {
        match self {
            DiscoveryStage::Idle => "Waiting for a search",
            DiscoveryStage::FetchingArtist => "Looking up the artist in the catalog",
            DiscoveryStage::BuildingPrompt => "Preparing the analysis",
            DiscoveryStage::RequestingModel => "Asking the model for similar artists",
            DiscoveryStage::ParsingResponse => "Reading the model's answer",
            DiscoveryStage::VerifyingRecommendations => "Checking recommendations in the catalog",
            DiscoveryStage::Ready => "Done",
        }
    }
}

/// Progress notifications for a running query.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscoveryEvent {
    Stage {
        stage: DiscoveryStage,
        message: String,
    },
    Warning {
        message: String,
    },
    Completed {
        result: Box<DiscoveryResult>,
    },
    Failed {
        kind: String,
        message: String,
    },
}

/// Query-scoped state, passed through every stage.
pub struct DiscoveryContext {
    query: String,
    stage: DiscoveryStage,
    warnings: Vec<String>,
    events: Option<UnboundedSender<DiscoveryEvent>>,
    started_at: Instant,
}

impl DiscoveryContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            stage: DiscoveryStage::Idle,
            warnings: Vec::new(),
            events: None,
            started_at: Instant::now(),
        }
    }

    /// Forward progress events to `sender`. A closed receiver is ignored.
    pub fn with_events(mut self, sender: UnboundedSender<DiscoveryEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn stage(&self) -> DiscoveryStage {
        self.stage
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    fn advance(&mut self, stage: DiscoveryStage) {
        info!(
            query = %self.query,
            from = ?self.stage,
            to = ?stage,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "Discovery stage"
        );
        self.stage = stage;
        self.emit(DiscoveryEvent::Stage {
            stage,
            message: stage.description().to_string(),
        });
    }

    fn warn(&mut self, message: String) {
        warn!(query = %self.query, "{}", message);
        self.emit(DiscoveryEvent::Warning {
            message: message.clone(),
        });
        self.warnings.push(message);
    }

    fn fail(&mut self, error: &DiscoveryError) {
        warn!(query = %self.query, stage = ?self.stage, error = %error, "Discovery failed");
        self.stage = DiscoveryStage::Idle;
        self.emit(DiscoveryEvent::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Candidates verified at the same time.
    pub verify_concurrency: usize,
    /// Related artists fetched for the seed artist.
    pub related_artists_limit: usize,
    /// Albums fetched for the seed artist profile.
    pub profile_albums_limit: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            verify_concurrency: 1,
            related_artists_limit: 10,
            profile_albums_limit: 5,
        }
    }
}

pub struct DiscoveryPipeline {
    catalog: Arc<dyn CatalogClient>,
    requester: RecommendationRequester,
    settings: PipelineSettings,
}

impl DiscoveryPipeline {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        requester: RecommendationRequester,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            requester,
            settings,
        }
    }

    /// Runs the whole query. On success the context ends in `Ready`, on
    /// failure in `Idle`.
    pub async fn run(&self, ctx: &mut DiscoveryContext) -> Result<DiscoveryResult, DiscoveryError> {
        match self.run_stages(ctx).await {
            Ok(result) => {
                ctx.advance(DiscoveryStage::Ready);
                ctx.emit(DiscoveryEvent::Completed {
                    result: Box::new(result.clone()),
                });
                Ok(result)
            }
            Err(err) => {
                ctx.fail(&err);
                Err(err)
            }
        }
    }

    async fn run_stages(&self, ctx: &mut DiscoveryContext) -> Result<DiscoveryResult, DiscoveryError> {
        ctx.advance(DiscoveryStage::FetchingArtist);
        let query = ctx.query().trim().to_string();
        let profile = self.fetch_artist_profile(&query, ctx).await?;

        ctx.advance(DiscoveryStage::BuildingPrompt);
        let prompt = build_prompt(&profile);

        ctx.advance(DiscoveryStage::RequestingModel);
        let answer = self.requester.request(&prompt).await?;

        ctx.advance(DiscoveryStage::ParsingResponse);
        let model = parse_model_response(&answer)?;

        ctx.advance(DiscoveryStage::VerifyingRecommendations);
        let options = EnrichOptions {
            concurrency: self.settings.verify_concurrency,
            exclude_artist_id: Some(profile.artist.id.clone()),
        };
        let outcome = verify_and_enrich(self.catalog.as_ref(), &model.recommendations, &options).await;
        for warning in outcome.warnings {
            ctx.warn(warning);
        }

        Ok(DiscoveryResult {
            query,
            profile,
            analysis: model.analysis,
            recommendations: outcome.recommendations,
            warnings: ctx.warnings().to_vec(),
        })
    }

    /// Loads the seed artist with everything the prompt needs.
    ///
    /// Related artists are optional: any failure there leaves the list
    /// empty and adds a warning.
    pub async fn fetch_artist_profile(
        &self,
        name: &str,
        ctx: &mut DiscoveryContext,
    ) -> Result<ArtistProfile, DiscoveryError> {
        let found = self
            .catalog
            .search_artist(name)
            .await?
            .ok_or_else(|| DiscoveryError::NotFound(name.to_string()))?;

        let mut artist = self.catalog.artist(&found.id).await?;
        artist.top_tracks = self.catalog.top_tracks(&found.id).await?;
        let albums = self
            .catalog
            .albums(&found.id, self.settings.profile_albums_limit)
            .await?;

        let related_artists = match self.catalog.related_artists(&found.id).await {
            Ok(related) => {
                if related.is_empty() {
                    ctx.warn(format!("No related artists available for '{}'", artist.name));
                }
                related
                    .into_iter()
                    .take(self.settings.related_artists_limit)
                    .collect()
            }
            Err(err) => {
                ctx.warn(format!(
                    "Related artists unavailable for '{}': {}",
                    artist.name, err
                ));
                Vec::new()
            }
        };

        Ok(ArtistProfile {
            artist,
            related_artists,
            albums,
        })
    }
}
