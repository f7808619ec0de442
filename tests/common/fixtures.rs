//! Test data shared by the in-memory fakes and the fake upstream APIs.

use super::constants::*;
use discovery_server::catalog::{AlbumRecord, ArtistRecord, ReleaseDate, TrackRecord};
use serde_json::json;

/// An artist known to the test catalog.
#[derive(Debug, Clone)]
pub struct FixtureArtist {
    pub id: &'static str,
    pub name: &'static str,
    pub genres: Vec<&'static str>,
    pub popularity: u8,
    pub followers: u64,
    /// Release dates of the artist's albums, in catalog order.
    pub release_dates: Vec<&'static str>,
    pub top_tracks: Vec<(&'static str, &'static str)>,
    pub related: Vec<&'static str>,
}

impl FixtureArtist {
    pub fn record(&self) -> ArtistRecord {
        ArtistRecord {
            id: self.id.to_string(),
            name: self.name.to_string(),
            genres: self.genres.iter().map(|g| g.to_string()).collect(),
            popularity: self.popularity,
            followers: self.followers,
            images: vec![format!("https://images.test/{}.jpg", self.id)],
            top_tracks: Vec::new(),
            external_url: Some(format!("https://open.spotify.test/artist/{}", self.id)),
        }
    }

    pub fn tracks(&self) -> Vec<TrackRecord> {
        self.top_tracks
            .iter()
            .map(|(name, album)| TrackRecord {
                name: name.to_string(),
                album_name: album.to_string(),
                external_url: None,
            })
            .collect()
    }

    pub fn albums(&self) -> Vec<AlbumRecord> {
        self.release_dates
            .iter()
            .enumerate()
            .map(|(i, date)| AlbumRecord {
                id: format!("{}-album-{}", self.id, i),
                name: format!("{} Album {}", self.name, i + 1),
                album_type: "album".to_string(),
                release_date: ReleaseDate::parse(date),
            })
            .collect()
    }

    /// The artist as the Spotify Web API serializes it.
    pub fn spotify_json(&self) -> serde_json::Value {
        json!({
            "id": self.id,
            "name": self.name,
            "genres": self.genres,
            "popularity": self.popularity,
            "followers": { "href": null, "total": self.followers },
            "images": [{ "url": format!("https://images.test/{}.jpg", self.id), "height": 640, "width": 640 }],
            "external_urls": { "spotify": format!("https://open.spotify.test/artist/{}", self.id) },
            "type": "artist",
        })
    }
}

fn top_tracks_for(prefix: &'static str) -> Vec<(&'static str, &'static str)> {
    match prefix {
        "radiohead" => vec![
            ("Creep", "Pablo Honey"),
            ("Karma Police", "OK Computer"),
            ("No Surprises", "OK Computer"),
            ("Reckoner", "In Rainbows"),
            ("Weird Fishes", "In Rainbows"),
            ("Everything In Its Right Place", "Kid A"),
        ],
        "bcnr" => vec![
            ("Up Song", "Live at Bush Hall"),
            ("Track X", "Ants From Up There"),
            ("Concorde", "Ants From Up There"),
            ("Sunglasses", "For the first time"),
        ],
        "portishead" => vec![
            ("Glory Box", "Dummy"),
            ("Roads", "Dummy"),
            ("Sour Times", "Dummy"),
            ("Machine Gun", "Third"),
        ],
        "talk-talk" => vec![
            ("It's My Life", "It's My Life"),
            ("Life's What You Make It", "The Colour of Spring"),
            ("Such a Shame", "It's My Life"),
            ("New Grass", "Laughing Stock"),
        ],
        _ => vec![
            ("One Day Like This", "The Seldom Seen Kid"),
            ("Grounds for Divorce", "The Seldom Seen Kid"),
            ("Magnificent (She Says)", "Little Fictions"),
            ("Lippy Kids", "Build a Rocket Boys!"),
        ],
    }
}

/// Every artist of the test catalog.
pub fn fixture_artists() -> Vec<FixtureArtist> {
    vec![
        FixtureArtist {
            id: SEED_ARTIST_ID,
            name: SEED_ARTIST_NAME,
            genres: SEED_ARTIST_GENRES.to_vec(),
            popularity: 82,
            followers: 9_123_456,
            release_dates: vec!["2016-05-08", "2007-10-10", "2000-10-02"],
            top_tracks: top_tracks_for("radiohead"),
            related: vec![RELATED_ARTIST_ID],
        },
        FixtureArtist {
            id: RELATED_ARTIST_ID,
            name: RELATED_ARTIST_NAME,
            genres: vec!["alternative rock"],
            popularity: 78,
            followers: 7_000_000,
            release_dates: vec!["2022-08-26"],
            top_tracks: vec![("Uprising", "The Resistance")],
            related: vec![],
        },
        FixtureArtist {
            id: NEWEST_ARTIST_ID,
            name: NEWEST_ARTIST_NAME,
            genres: vec!["experimental rock", "post-rock"],
            popularity: 58,
            followers: 420_000,
            release_dates: vec!["2022-02-04", NEWEST_RELEASE_DATE],
            top_tracks: top_tracks_for("bcnr"),
            related: vec![],
        },
        FixtureArtist {
            id: MIDDLE_ARTIST_ID,
            name: MIDDLE_ARTIST_NAME,
            genres: vec!["trip hop", "bristol sound"],
            popularity: 61,
            followers: 1_500_000,
            release_dates: vec![MIDDLE_RELEASE_DATE, "1994-08-22"],
            top_tracks: top_tracks_for("portishead"),
            related: vec![],
        },
        FixtureArtist {
            id: OLDEST_ARTIST_ID,
            name: OLDEST_ARTIST_NAME,
            genres: vec!["art rock", "new wave"],
            popularity: 55,
            followers: 610_000,
            release_dates: vec!["1988", OLDEST_RELEASE_DATE],
            top_tracks: top_tracks_for("talk-talk"),
            related: vec![],
        },
        FixtureArtist {
            id: UNDATED_ARTIST_ID,
            name: UNDATED_ARTIST_NAME,
            genres: vec!["britpop"],
            popularity: 57,
            followers: 800_000,
            release_dates: vec![],
            top_tracks: top_tracks_for("elbow"),
            related: vec![],
        },
    ]
}

pub fn find_by_name(name: &str) -> Option<FixtureArtist> {
    fixture_artists()
        .into_iter()
        .find(|a| a.name.eq_ignore_ascii_case(name.trim()))
}

pub fn find_by_id(id: &str) -> Option<FixtureArtist> {
    fixture_artists().into_iter().find(|a| a.id == id)
}

/// The recommendations document the fake model answers with.
pub fn model_recommendations_json() -> serde_json::Value {
    json!({
        "analysis": "Radiohead blend art rock ambition with electronic textures and anxious melody.",
        "recommendations": [
            {
                "name": MIDDLE_ARTIST_NAME,
                "reason": "Dark, textured songs built on atmosphere.",
                "similarity_type": "same-genre",
                "confidence": 88
            },
            {
                "name": UNKNOWN_ARTIST_NAME,
                "reason": "A band that only exists in the model's imagination.",
                "similarity_type": "surprising",
                "confidence": 40
            },
            {
                "name": OLDEST_ARTIST_NAME,
                "reason": "Pioneered the move from synth pop to post-rock.",
                "similarity_type": "historical-influence",
                "confidence": 80
            },
            {
                "name": UNDATED_ARTIST_NAME,
                "reason": "Melancholic British guitar music.",
                "similarity_type": "same-genre",
                "confidence": 70
            },
            {
                "name": NEWEST_ARTIST_NAME,
                "reason": "Restless arrangements and shifting structures.",
                "similarity_type": "creative-approach",
                "confidence": 75
            }
        ]
    })
}

/// The model answer as a chat model usually writes it: prose around a
/// fenced JSON block.
pub fn model_answer() -> String {
    format!(
        "Here are some artists you might enjoy:\n```json\n{}\n```\nHappy listening!",
        serde_json::to_string_pretty(&model_recommendations_json())
            .expect("Failed to serialize fixture")
    )
}
