//! Tracks as handed out by the station service.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "sid": "1395452",
//!     "ssid": "0b0f",
//!     "aid": "1397577",
//!     "title": "Track Title",
//!     "artist": "Artist Name",
//!     "albumtitle": "Album Title",
//!     "album": "/subject/1397577/",
//!     "picture": "https://img.example/mpic/s1397577.jpg",
//!     "url": "https://mr.example/stream/p1395452.mp3",
//!     "length": 215,
//!     "like": 0,
//!     "kbps": "192",
//!     "company": "EMI",
//!     "public_time": "2004",
//!     "rating_avg": 4.3
//! }
//! ```
//!
//! `length`, `like`, `kbps` and `public_time` arrive as numbers or strings
//! depending on the endpoint.

use std::{fmt, time::Duration};

use serde::Deserialize;
use serde_with::{
    formats::Flexible, serde_as, DefaultOnError, DisplayFromStr, DurationSeconds, PickFirst,
};

use super::{lenient_flag, lenient_string};

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Track {
    #[serde(rename = "sid", default, deserialize_with = "lenient_string")]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub artist: String,

    #[serde(rename = "albumtitle", default)]
    pub album_title: String,

    /// Album page; relative to the service's web site for most tracks.
    #[serde(rename = "album", default)]
    pub album_page: String,

    /// Album art.
    #[serde(rename = "picture", default)]
    pub album_art: String,

    /// Stream location.
    #[serde(default)]
    pub url: String,

    #[serde(rename = "length", default)]
    #[serde_as(deserialize_as = "DefaultOnError<DurationSeconds<f64, Flexible>>")]
    pub duration: Duration,

    /// Unknown until the service reports it or the user rates the track.
    #[serde(rename = "like", default, deserialize_with = "lenient_flag")]
    pub liked: Option<bool>,

    /// Bitrate in kbps, `0` when not reported.
    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError<PickFirst<(_, DisplayFromStr)>>")]
    pub kbps: u32,

    #[serde(default)]
    pub company: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub public_time: String,

    #[serde(default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub rating_avg: f64,
}

impl Track {
    /// Web site that relative album pages are resolved against.
    const ALBUM_PAGE_BASE: &'static str = "https://www.douban.com";

    /// The album page as an absolute URL.
    #[must_use]
    pub fn album_url(&self) -> String {
        if self.album_page.starts_with("http") {
            self.album_page.clone()
        } else {
            format!("{}{}", Self::ALBUM_PAGE_BASE, self.album_page)
        }
    }

    /// Multi-line description of all metadata.
    #[must_use]
    pub fn details(&self) -> String {
        let liked = match self.liked {
            Some(true) => "yes",
            Some(false) => "no",
            None => "unknown",
        };

        [
            ("Title", self.title.clone()),
            ("Artist", self.artist.clone()),
            ("Album", self.album_title.clone()),
            ("Public", self.public_time.clone()),
            ("Company", self.company.clone()),
            ("Url", self.album_url()),
            ("Length", format!("{}s", self.duration.as_secs())),
            ("Kbps", self.kbps.to_string()),
            ("Rate", format!("{:.1}", self.rating_avg)),
            ("Like", liked.to_owned()),
        ]
        .iter()
        .map(|(key, value)| format!("{key:>10}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)?;
        if !self.public_time.is_empty() {
            write!(f, " ({})", self.public_time)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_loose_types() {
        let body = r#"{
            "sid": 1395452, "title": "Song", "artist": "Band",
            "albumtitle": "Record", "album": "/subject/1397577/",
            "picture": "https://img.example/p.jpg",
            "url": "https://mr.example/p1395452.mp3",
            "length": "215", "like": "1", "kbps": "192",
            "public_time": 2004, "rating_avg": 4.3
        }"#;
        let track: Track = serde_json::from_str(body).unwrap();

        assert_eq!(track.id, "1395452");
        assert_eq!(track.duration, Duration::from_secs(215));
        assert_eq!(track.liked, Some(true));
        assert_eq!(track.kbps, 192);
        assert_eq!(track.public_time, "2004");
        assert_eq!(track.album_url(), "https://www.douban.com/subject/1397577/");
    }

    #[test]
    fn missing_fields_default() {
        let track: Track = serde_json::from_str(r#"{"sid": "7", "length": "n/a"}"#).unwrap();
        assert_eq!(track.id, "7");
        assert_eq!(track.duration, Duration::ZERO);
        assert_eq!(track.liked, None);
        assert_eq!(track.kbps, 0);
    }

    #[test]
    fn display() {
        let track = Track {
            title: "Song".to_owned(),
            artist: "Band".to_owned(),
            public_time: "2004".to_owned(),
            ..Track::default()
        };
        assert_eq!(track.to_string(), "Song - Band (2004)");
        assert!(track.details().contains("      Like: unknown"));
    }
}
