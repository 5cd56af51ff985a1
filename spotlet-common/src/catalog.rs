//! Catalog track models
//!
//! Only the fields playback needs are modelled; unknown JSON fields are
//! ignored by serde.

use serde::{Deserialize, Serialize};

/// Image reference (artwork)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ApiImage {
    pub url: String,
}

/// Artist summary as embedded in tracks
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
}

/// Album summary
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Album {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<ApiImage>,
}

/// Track object returned by the catalog API
///
/// Tracks listed under an album arrive without their `album` object.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AudioTrack {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub album: Option<Album>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// Lightweight reference to a playable audio item
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct TrackRef {
    /// Display name of the track
    pub name: String,
    /// Primary artist display name
    pub artist_name: Option<String>,
    /// Preview clip URL; tracks without one cannot be started
    pub preview_url: Option<String>,
    pub artwork_url: Option<String>,
}

impl TrackRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_artist(mut self, artist_name: impl Into<String>) -> Self {
        self.artist_name = Some(artist_name.into());
        self
    }

    pub fn with_preview(mut self, preview_url: impl Into<String>) -> Self {
        self.preview_url = Some(preview_url.into());
        self
    }

    pub fn with_artwork(mut self, artwork_url: impl Into<String>) -> Self {
        self.artwork_url = Some(artwork_url.into());
        self
    }

    /// Build from a catalog track: first artist, first album image
    pub fn from_track(track: &AudioTrack) -> Self {
        Self {
            name: track.name.clone(),
            artist_name: track.artists.first().map(|a| a.name.clone()),
            preview_url: track.preview_url.clone().filter(|url| !url.is_empty()),
            artwork_url: track
                .album
                .as_ref()
                .and_then(|album| album.images.first())
                .map(|image| image.url.clone()),
        }
    }

    /// Build from a track listed on an album page, attaching that album
    pub fn from_album_track(track: &AudioTrack, album: &Album) -> Self {
        let mut track = track.clone();
        track.album = Some(album.clone());
        Self::from_track(&track)
    }

    pub fn is_playable(&self) -> bool {
        self.preview_url.as_deref().is_some_and(|url| !url.is_empty())
    }
}

impl From<&AudioTrack> for TrackRef {
    fn from(track: &AudioTrack) -> Self {
        Self::from_track(track)
    }
}
