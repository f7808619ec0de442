//! Verification of model suggestions against the catalog.
//!
//! Every candidate is searched by name; unmatched names are dropped and
//! reported as warnings. Survivors carry real catalog data and are ordered
//! by their most recent release.

use super::models::{EnrichedRecommendation, RecommendationCandidate};
use crate::catalog::CatalogClient;
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Top tracks kept on each recommendation card.
pub const TOP_TRACKS_PER_RECOMMENDATION: usize = 3;

#[derive(Debug, Clone)]
pub struct EnrichOptions {
    /// Candidates verified at the same time. 1 means sequential.
    pub concurrency: usize,
    /// Catalog id of the seed artist, never recommended back.
    pub exclude_artist_id: Option<String>,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            exclude_artist_id: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentOutcome {
    pub recommendations: Vec<EnrichedRecommendation>,
    pub warnings: Vec<String>,
}

enum Verification {
    Matched(Box<EnrichedRecommendation>),
    Dropped(String),
}

async fn verify_candidate(
    catalog: &dyn CatalogClient,
    candidate: &RecommendationCandidate,
) -> Verification {
    let artist = match catalog.search_artist(&candidate.name).await {
        Ok(Some(artist)) => artist,
        Ok(None) => {
            warn!(name = %candidate.name, "Recommended artist not found in the catalog");
            return Verification::Dropped(format!(
                "Artist '{}' was not found in the catalog",
                candidate.name
            ));
        }
        Err(err) => {
            warn!(name = %candidate.name, error = %err, "Catalog search failed for recommendation");
            return Verification::Dropped(format!(
                "Could not verify '{}': {}",
                candidate.name, err
            ));
        }
    };

    let top_tracks = match catalog.top_tracks(&artist.id).await {
        Ok(tracks) => tracks,
        Err(err) => {
            warn!(name = %candidate.name, error = %err, "Top tracks lookup failed for recommendation");
            return Verification::Dropped(format!(
                "Could not load tracks for '{}': {}",
                artist.name, err
            ));
        }
    };

    let latest_release_date = match catalog.recent_release_date(&artist.id).await {
        Ok(date) => date,
        Err(err) => {
            debug!(artist_id = %artist.id, error = %err, "Release date lookup failed");
            None
        }
    };

    let mut artist = artist;
    artist.top_tracks = top_tracks
        .into_iter()
        .take(TOP_TRACKS_PER_RECOMMENDATION)
        .collect();

    Verification::Matched(Box::new(EnrichedRecommendation {
        name: artist.name.clone(),
        suggested_name: candidate.name.clone(),
        reason: candidate.reason.clone(),
        similarity_type: candidate.similarity_type,
        confidence: candidate.confidence,
        artist,
        latest_release_date,
    }))
}

/// Most recent release first. Missing dates compare lowest, so they end up
/// last; equal keys keep their relative order.
pub fn sort_by_recency(recommendations: &mut [EnrichedRecommendation]) {
    recommendations.sort_by(|a, b| b.latest_release_date.cmp(&a.latest_release_date));
}

/// Verifies `candidates` against the catalog and returns the matched ones,
/// sorted by recency.
pub async fn verify_and_enrich(
    catalog: &dyn CatalogClient,
    candidates: &[RecommendationCandidate],
    options: &EnrichOptions,
) -> EnrichmentOutcome {
    // Boxed up front so the spawned query future stays `Send`.
    let pending: Vec<_> = candidates
        .iter()
        .map(|candidate| verify_candidate(catalog, candidate).boxed())
        .collect();

    // `buffered` yields in input order whatever the completion order.
    let verifications: Vec<Verification> = stream::iter(pending)
        .buffered(options.concurrency.max(1))
        .collect()
        .await;

    let mut outcome = EnrichmentOutcome::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for verification in verifications {
        match verification {
            Verification::Dropped(warning) => outcome.warnings.push(warning),
            Verification::Matched(rec) => {
                if options.exclude_artist_id.as_deref() == Some(rec.artist.id.as_str()) {
                    outcome.warnings.push(format!(
                        "'{}' is the searched artist and was skipped",
                        rec.suggested_name
                    ));
                } else if !seen_ids.insert(rec.artist.id.clone()) {
                    outcome.warnings.push(format!(
                        "'{}' duplicates an earlier recommendation ({}) and was skipped",
                        rec.suggested_name, rec.name
                    ));
                } else {
                    outcome.recommendations.push(*rec);
                }
            }
        }
    }

    sort_by_recency(&mut outcome.recommendations);

    debug!(
        candidates = candidates.len(),
        kept = outcome.recommendations.len(),
        "Recommendations verified"
    );
    outcome
}
