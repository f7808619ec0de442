//! Music catalog access.
//!
//! The discovery pipeline only talks to the catalog through the
//! `CatalogClient` trait; `SpotifyClient` is the production implementation.

mod models;
mod spotify;

pub use models::{latest_release_date, AlbumRecord, ArtistRecord, ReleaseDate, TrackRecord};
pub use spotify::{SpotifyClient, SpotifyOptions};

use crate::secrets::SecretError;
use async_trait::async_trait;
use thiserror::Error;

/// Number of albums/singles inspected when looking for the latest release.
pub const RELEASE_LOOKUP_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog credentials missing or rejected: {0}")]
    Credentials(String),

    #[error("Catalog rate limit hit")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Catalog API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid catalog response: {0}")]
    InvalidResponse(String),
}

impl CatalogError {
    /// The catalog refused a sub-resource for this artist (not supported or
    /// not available for these credentials).
    pub fn is_declined(&self) -> bool {
        matches!(self, CatalogError::Api { status: 403 | 404, .. })
    }
}

impl From<SecretError> for CatalogError {
    fn from(err: SecretError) -> Self {
        CatalogError::Credentials(err.to_string())
    }
}

/// Read access to a remote music catalog.
///
/// All calls are single-shot: implementations do not retry.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Best match for `name`, or `None` when the search is empty.
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRecord>, CatalogError>;

    /// Full artist record by catalog id. `top_tracks` is left empty.
    async fn artist(&self, id: &str) -> Result<ArtistRecord, CatalogError>;

    async fn top_tracks(&self, id: &str) -> Result<Vec<TrackRecord>, CatalogError>;

    /// Related artists. Declined lookups yield an empty list.
    async fn related_artists(&self, id: &str) -> Result<Vec<ArtistRecord>, CatalogError>;

    /// Albums and singles of the artist, at most `limit`.
    async fn albums(&self, id: &str, limit: usize) -> Result<Vec<AlbumRecord>, CatalogError>;

    /// Latest release date among the artist's most recent albums and singles.
    async fn recent_release_date(&self, id: &str) -> Result<Option<ReleaseDate>, CatalogError> {
        let albums = self.albums(id, RELEASE_LOOKUP_LIMIT).await?;
        Ok(latest_release_date(&albums))
    }

    /// Cheap authenticated call used to test the configured credentials.
    async fn verify_credentials(&self) -> Result<(), CatalogError>;
}
