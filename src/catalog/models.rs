//! Typed catalog records.
//!
//! These are the shapes the rest of the server works with. Raw catalog
//! payloads are converted into them at the client boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A track as shown on artist cards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub name: String,
    pub album_name: String,
    pub external_url: Option<String>,
}

/// An artist as returned by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistRecord {
    pub id: String,
    pub name: String,
    pub genres: Vec<String>,
    /// 0-100, as computed by the catalog.
    pub popularity: u8,
    pub followers: u64,
    /// Image URLs, largest first.
    pub images: Vec<String>,
    pub top_tracks: Vec<TrackRecord>,
    pub external_url: Option<String>,
}

impl ArtistRecord {
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// An album or single with its release date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub id: String,
    pub name: String,
    pub album_type: String,
    pub release_date: Option<ReleaseDate>,
}

/// Release date as published by the catalog.
///
/// The catalog reports dates at year (`1997`), month (`1997-06`) or day
/// (`1997-06-16`) precision. Ordering is chronological, with missing
/// components counting as the first month/day. The original string is kept
/// for display and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseDate {
    raw: String,
    date: NaiveDate,
}

impl ReleaseDate {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut parts = raw.splitn(3, '-');
        let year: i32 = parts.next()?.parse().ok()?;
        let month: u32 = match parts.next() {
            Some(m) => m.parse().ok()?,
            None => 1,
        };
        let day: u32 = match parts.next() {
            Some(d) => d.parse().ok()?,
            None => 1,
        };
        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        Some(Self {
            raw: raw.to_string(),
            date,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Ord for ReleaseDate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date
            .cmp(&other.date)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ReleaseDate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ReleaseDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for ReleaseDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for ReleaseDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        ReleaseDate::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid release date: {}", raw)))
    }
}

/// Latest release date among `albums`, if any of them has one.
pub fn latest_release_date(albums: &[AlbumRecord]) -> Option<ReleaseDate> {
    albums
        .iter()
        .filter_map(|album| album.release_date.clone())
        .max()
}
