use crate::catalog::{AlbumRecord, ArtistRecord, ReleaseDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The seed artist together with the context the prompt is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistProfile {
    pub artist: ArtistRecord,
    pub related_artists: Vec<ArtistRecord>,
    pub albums: Vec<AlbumRecord>,
}

/// Why the model considers an artist similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SimilarityType {
    SameGenre,
    HistoricalInfluence,
    CreativeApproach,
    Surprising,
}

impl SimilarityType {
    pub const ALL: [SimilarityType; 4] = [
        SimilarityType::SameGenre,
        SimilarityType::HistoricalInfluence,
        SimilarityType::CreativeApproach,
        SimilarityType::Surprising,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityType::SameGenre => "same-genre",
            SimilarityType::HistoricalInfluence => "historical-influence",
            SimilarityType::CreativeApproach => "creative-approach",
            SimilarityType::Surprising => "surprising",
        }
    }

    /// Lenient parse of the value written by the model: case, spaces and
    /// underscores are normalized before matching.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == '_' || c == ' ' { '-' } else { c })
            .collect();
        match normalized.as_str() {
            "same-genre" => Some(SimilarityType::SameGenre),
            "historical-influence" => Some(SimilarityType::HistoricalInfluence),
            "creative-approach" => Some(SimilarityType::CreativeApproach),
            "surprising" | "surprising-discovery" | "surprise" => Some(SimilarityType::Surprising),
            _ => None,
        }
    }
}

impl fmt::Display for SimilarityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An artist suggested by the model, not yet checked against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    pub name: String,
    pub reason: String,
    pub similarity_type: SimilarityType,
    /// 0-100.
    pub confidence: u8,
}

/// Parsed model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRecommendations {
    pub analysis: String,
    pub recommendations: Vec<RecommendationCandidate>,
}

/// A candidate matched to a real catalog artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecommendation {
    /// Name as published by the catalog.
    pub name: String,
    /// Name as written by the model.
    pub suggested_name: String,
    pub reason: String,
    pub similarity_type: SimilarityType,
    pub confidence: u8,
    pub artist: ArtistRecord,
    pub latest_release_date: Option<ReleaseDate>,
}

/// Everything produced by one discovery query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub query: String,
    pub profile: ArtistProfile,
    pub analysis: String,
    pub recommendations: Vec<EnrichedRecommendation>,
    pub warnings: Vec<String>,
}
