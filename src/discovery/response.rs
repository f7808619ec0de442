//! Parsing of the model's answer into typed candidates.

use super::error::ModelResponseError;
use super::models::{ModelRecommendations, RecommendationCandidate, SimilarityType};
use serde::Deserialize;

/// Returns the JSON payload of a model answer.
///
/// The first ```` ```json ```` block wins, then the first plain fenced
/// block; unfenced text is returned as is. The result is trimmed.
pub fn extract_json_payload(text: &str) -> &str {
    let inner = if let Some((_, rest)) = text.split_once("```json") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    inner.trim()
}

#[derive(Deserialize)]
struct RawModelResponse {
    analysis: String,
    recommendations: Vec<RawCandidate>,
}

#[derive(Deserialize)]
struct RawCandidate {
    name: String,
    reason: String,
    similarity_type: String,
    confidence: serde_json::Number,
}

fn parse_confidence(value: &serde_json::Number) -> Option<u8> {
    let value = match value.as_u64() {
        Some(v) => v as f64,
        None => value.as_f64()?,
    };
    if (0.0..=100.0).contains(&value) {
        Some(value.round() as u8)
    } else {
        None
    }
}

impl RawCandidate {
    fn validate(self, index: usize) -> Result<RecommendationCandidate, ModelResponseError> {
        let invalid = |reason: String| ModelResponseError::InvalidCandidate { index, reason };

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(invalid("empty artist name".to_string()));
        }
        let similarity_type = SimilarityType::parse(&self.similarity_type).ok_or_else(|| {
            invalid(format!("unknown similarity type '{}'", self.similarity_type))
        })?;
        let confidence = parse_confidence(&self.confidence)
            .ok_or_else(|| invalid(format!("confidence {} outside 0-100", self.confidence)))?;

        Ok(RecommendationCandidate {
            name,
            reason: self.reason.trim().to_string(),
            similarity_type,
            confidence,
        })
    }
}

/// Parses the raw model answer, fenced or not.
pub fn parse_model_response(text: &str) -> Result<ModelRecommendations, ModelResponseError> {
    let payload = extract_json_payload(text);
    if payload.is_empty() {
        return Err(ModelResponseError::Empty);
    }

    let raw: RawModelResponse = serde_json::from_str(payload)?;
    let recommendations = raw
        .recommendations
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| candidate.validate(index))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ModelRecommendations {
        analysis: raw.analysis.trim().to_string(),
        recommendations,
    })
}
