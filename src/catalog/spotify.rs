//! Spotify Web API client.
//!
//! Authenticates with the client-credentials grant and caches the access
//! token until shortly before it expires.

use super::models::{AlbumRecord, ArtistRecord, ReleaseDate, TrackRecord};
use super::{CatalogClient, CatalogError};
use crate::secrets::SecretSource;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_ACCOUNTS_BASE: &str = "https://accounts.spotify.com";

/// Tokens are refreshed this long before their announced expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SpotifyOptions {
    pub api_base_url: String,
    pub accounts_base_url: String,
    /// Market used for top-tracks lookups (ISO 3166-1 alpha-2).
    pub market: String,
    pub timeout: Duration,
}

impl Default for SpotifyOptions {
    fn default() -> Self {
        Self {
            api_base_url: SPOTIFY_API_BASE.to_string(),
            accounts_base_url: SPOTIFY_ACCOUNTS_BASE.to_string(),
            market: "US".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: Client,
    options: SpotifyOptions,
    client_id: String,
    client_secret: SecretSource,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretSource,
        options: SpotifyOptions,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| CatalogError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let options = SpotifyOptions {
            api_base_url: options.api_base_url.trim_end_matches('/').to_string(),
            accounts_base_url: options.accounts_base_url.trim_end_matches('/').to_string(),
            ..options
        };

        Ok(Self {
            client,
            options,
            client_id: client_id.into(),
            client_secret,
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() + TOKEN_EXPIRY_MARGIN < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn request_token(&self) -> Result<CachedToken, CatalogError> {
        if self.client_id.trim().is_empty() {
            return Err(CatalogError::Credentials("client id is not set".to_string()));
        }
        let secret = self
            .client_secret
            .resolve()
            .await?
            .ok_or_else(|| CatalogError::Credentials("client secret is not set".to_string()))?;

        let basic = BASE64.encode(format!("{}:{}", self.client_id, secret));
        let url = format!("{}/api/token", self.options.accounts_base_url);

        debug!("Requesting catalog access token");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Basic {}", basic))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            return Err(CatalogError::Credentials(
                body.error_description
                    .or(body.error)
                    .unwrap_or_else(|| format!("token request rejected with status {}", status)),
            ));
        }
        let response = check_status(response).await?;

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(format!("token response: {}", e)))?;

        Ok(CachedToken {
            value: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.options.api_base_url, path);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(map_send_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; the next call fetches a new one.
            self.token.lock().await.take();
            return Err(CatalogError::Credentials(
                "catalog rejected the access token".to_string(),
            ));
        }
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| CatalogError::InvalidResponse(format!("{}: {}", path, e)))
    }
}

fn map_send_error(e: reqwest::Error) -> CatalogError {
    if e.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::Connection(e.to_string())
    }
}

async fn check_status(response: Response) -> Result<Response, CatalogError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(CatalogError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorResponse>(&body)
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or(body);
        return Err(CatalogError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response)
}

fn encode_id(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

#[async_trait]
impl CatalogClient for SpotifyClient {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRecord>, CatalogError> {
        let body: SearchResponse = self
            .get(
                "/search",
                &[
                    ("q", name.to_string()),
                    ("type", "artist".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let artist = body
            .artists
            .and_then(|page| page.items.into_iter().next())
            .map(ArtistRecord::from);
        debug!(query = %name, found = artist.is_some(), "Catalog artist search");
        Ok(artist)
    }

    async fn artist(&self, id: &str) -> Result<ArtistRecord, CatalogError> {
        let artist: SpotifyArtist = self.get(&format!("/artists/{}", encode_id(id)), &[]).await?;
        Ok(artist.into())
    }

    async fn top_tracks(&self, id: &str) -> Result<Vec<TrackRecord>, CatalogError> {
        let body: TopTracksResponse = self
            .get(
                &format!("/artists/{}/top-tracks", encode_id(id)),
                &[("market", self.options.market.clone())],
            )
            .await?;
        Ok(body.tracks.into_iter().map(TrackRecord::from).collect())
    }

    async fn related_artists(&self, id: &str) -> Result<Vec<ArtistRecord>, CatalogError> {
        let result: Result<RelatedArtistsResponse, CatalogError> = self
            .get(&format!("/artists/{}/related-artists", encode_id(id)), &[])
            .await;

        match result {
            Ok(body) => Ok(body.artists.into_iter().map(ArtistRecord::from).collect()),
            Err(err) if err.is_declined() => {
                warn!(artist_id = %id, error = %err, "Related artists unavailable, continuing without them");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    async fn albums(&self, id: &str, limit: usize) -> Result<Vec<AlbumRecord>, CatalogError> {
        let body: Paging<SpotifyAlbum> = self
            .get(
                &format!("/artists/{}/albums", encode_id(id)),
                &[
                    ("include_groups", "album,single".to_string()),
                    ("limit", limit.clamp(1, 50).to_string()),
                ],
            )
            .await?;
        Ok(body
            .items
            .into_iter()
            .take(limit)
            .map(AlbumRecord::from)
            .collect())
    }

    async fn verify_credentials(&self) -> Result<(), CatalogError> {
        self.search_artist("test").await.map(|_| ())
    }
}

// Spotify API types

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize, Default)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

#[derive(Deserialize)]
struct Paging<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct SearchResponse {
    artists: Option<Paging<SpotifyArtist>>,
}

#[derive(Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    tracks: Vec<SpotifyTrack>,
}

#[derive(Deserialize)]
struct RelatedArtistsResponse {
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize, Default)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Deserialize)]
struct Followers {
    total: Option<u64>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    popularity: u32,
    followers: Option<Followers>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl From<SpotifyArtist> for ArtistRecord {
    fn from(artist: SpotifyArtist) -> Self {
        ArtistRecord {
            id: artist.id,
            name: artist.name,
            genres: artist.genres,
            popularity: artist.popularity.min(100) as u8,
            followers: artist.followers.and_then(|f| f.total).unwrap_or(0),
            images: artist.images.into_iter().map(|i| i.url).collect(),
            top_tracks: Vec::new(),
            external_url: artist.external_urls.spotify,
        }
    }
}

#[derive(Deserialize)]
struct SpotifyTrackAlbum {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyTrack {
    name: String,
    album: Option<SpotifyTrackAlbum>,
    #[serde(default)]
    external_urls: ExternalUrls,
}

impl From<SpotifyTrack> for TrackRecord {
    fn from(track: SpotifyTrack) -> Self {
        TrackRecord {
            name: track.name,
            album_name: track.album.map(|a| a.name).unwrap_or_default(),
            external_url: track.external_urls.spotify,
        }
    }
}

#[derive(Deserialize)]
struct SpotifyAlbum {
    id: String,
    name: String,
    album_type: Option<String>,
    release_date: Option<String>,
}

impl From<SpotifyAlbum> for AlbumRecord {
    fn from(album: SpotifyAlbum) -> Self {
        AlbumRecord {
            id: album.id,
            name: album.name,
            album_type: album.album_type.unwrap_or_else(|| "album".to_string()),
            release_date: album.release_date.as_deref().and_then(ReleaseDate::parse),
        }
    }
}
