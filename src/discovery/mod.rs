//! Similar-artist discovery.
//!
//! The seed artist is looked up in the catalog, described to a language
//! model, and the model's suggestions are checked back against the catalog
//! before being shown.

mod enrich;
mod error;
mod models;
mod pipeline;
mod prompt;
mod requester;
mod response;
mod services;

pub use enrich::{sort_by_recency, verify_and_enrich, EnrichOptions, EnrichmentOutcome};
pub use error::{DiscoveryError, ModelResponseError};
pub use models::{
    ArtistProfile, DiscoveryResult, EnrichedRecommendation, ModelRecommendations,
    RecommendationCandidate, SimilarityType,
};
pub use pipeline::{
    DiscoveryContext, DiscoveryEvent, DiscoveryPipeline, DiscoveryStage, PipelineSettings,
};
pub use prompt::{build_prompt, RECOMMENDATION_COUNT};
pub use requester::RecommendationRequester;
pub use response::{extract_json_payload, parse_model_response};
pub use services::{
    ApiClientFactory, CatalogCredentials, ClientFactory, CredentialOverrides, CredentialStatus,
    Credentials, DiscoveryServices,
};
