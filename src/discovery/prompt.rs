//! Prompt construction for similar-artist suggestions.

use super::models::{ArtistProfile, SimilarityType};

/// Number of recommendations requested from the model.
pub const RECOMMENDATION_COUNT: usize = 8;
pub const MAX_PROMPT_TRACKS: usize = 5;
pub const MAX_PROMPT_RELATED_ARTISTS: usize = 5;

/// Placeholder listing every accepted `similarity_type` in the schema example.
pub fn similarity_choices() -> String {
    SimilarityType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join("|")
}

/// The JSON shape the model must answer with.
pub fn response_schema_example() -> String {
    format!(
        r#"{{
  "analysis": "Analysis of the artist's style in 2-3 sentences",
  "recommendations": [
    {{
      "name": "Artist name",
      "reason": "Why this recommendation (1 sentence)",
      "similarity_type": "{}",
      "confidence": 85
    }}
  ]
}}"#,
        similarity_choices()
    )
}

/// Formats `value` with comma thousands separators.
pub fn format_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn join_or(items: Vec<&str>, fallback: &str) -> String {
    if items.is_empty() {
        fallback.to_string()
    } else {
        items.join(", ")
    }
}

/// Builds the instruction sent to the model for `profile`.
pub fn build_prompt(profile: &ArtistProfile) -> String {
    let artist = &profile.artist;
    let genres = join_or(
        artist.genres.iter().map(String::as_str).collect(),
        "Not specified",
    );
    let top_tracks = join_or(
        artist
            .top_tracks
            .iter()
            .take(MAX_PROMPT_TRACKS)
            .map(|t| t.name.as_str())
            .collect(),
        "None available",
    );
    let related = join_or(
        profile
            .related_artists
            .iter()
            .take(MAX_PROMPT_RELATED_ARTISTS)
            .map(|a| a.name.as_str())
            .collect(),
        "None available",
    );

    format!(
        "You are a music discovery expert. Analyze this artist and recommend {count} similar but less well-known artists.

ARTIST TO ANALYZE:
- Name: {name}
- Genres: {genres}
- Popularity: {popularity}/100
- Followers: {followers}
- Top tracks: {top_tracks}
- Related artists in the catalog: {related}

MISSION:
Recommend {count} similar artists following this split:
- 3 artists in the same genre but less mainstream ({same_genre})
- 2 artists from a different era with similar influences ({historical})
- 2 artists with a close creative approach ({creative})
- 1 surprising but coherent artist ({surprising})

RESPONSE FORMAT (JSON):
{schema}

IMPORTANT: Choose artists that really exist on Spotify and avoid the most famous ones. Answer with the JSON object only.",
        count = RECOMMENDATION_COUNT,
        name = artist.name,
        genres = genres,
        popularity = artist.popularity,
        followers = format_thousands(artist.followers),
        top_tracks = top_tracks,
        related = related,
        same_genre = SimilarityType::SameGenre,
        historical = SimilarityType::HistoricalInfluence,
        creative = SimilarityType::CreativeApproach,
        surprising = SimilarityType::Surprising,
        schema = response_schema_example(),
    )
}
