use crate::catalog::CatalogError;
use crate::llm::LlmError;
use thiserror::Error;

/// The model answered, but not with the JSON shape the prompt asked for.
#[derive(Debug, Error)]
pub enum ModelResponseError {
    #[error("the model returned an empty response")]
    Empty,

    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("recommendation #{index} is invalid: {reason}")]
    InvalidCandidate { index: usize, reason: String },
}

/// Why a discovery query stopped.
///
/// None of these are fatal for the process: the query is aborted and the
/// error is reported to the user.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("{0}")]
    Credentials(String),

    #[error("Artist '{0}' was not found in the catalog")]
    NotFound(String),

    #[error("Unusable model response: {0}")]
    ModelResponse(#[from] ModelResponseError),

    #[error("{0}")]
    Transient(String),
}

impl DiscoveryError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryError::Credentials(_) => "credentials",
            DiscoveryError::NotFound(_) => "not_found",
            DiscoveryError::ModelResponse(_) => "model_response",
            DiscoveryError::Transient(_) => "transient",
        }
    }
}

impl From<CatalogError> for DiscoveryError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Credentials(msg) => {
                DiscoveryError::Credentials(format!("Catalog credentials: {}", msg))
            }
            other => DiscoveryError::Transient(format!("Catalog request failed: {}", other)),
        }
    }
}

impl From<LlmError> for DiscoveryError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Credentials(msg) => {
                DiscoveryError::Credentials(format!("Model API credentials: {}", msg))
            }
            other => DiscoveryError::Transient(format!("Model request failed: {}", other)),
        }
    }
}
