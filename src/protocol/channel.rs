//! Channels of the station service.
//!
//! # Wire Format
//!
//! Public channel list:
//! ```json
//! {
//!     "channels": [
//!         {"channel_id": 0, "name": "Personal", "intro": "", "seq_id": 0},
//!         {"channel_id": "61", "name": "New songs", "intro": "...", "seq_id": 1}
//!     ]
//! }
//! ```
//!
//! Channels of a logged in user:
//! ```json
//! {
//!     "data": {
//!         "res": {
//!             "fav_chls": [{"id": 153, "name": "...", "intro": "..."}],
//!             "rec_chls": [{"id": 76, "name": "...", "intro": "..."}]
//!         }
//!     }
//! }
//! ```

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use serde::Deserialize;
use serde_with::{serde_as, DefaultOnError};

/// Channel identifier as received over the wire.
///
/// The station service sends channel identifiers as JSON numbers in some
/// responses and as strings in others. Identifiers compare, hash and format
/// by their [normalized](Self::normalize) form, so `5` and `"5"` are the same
/// channel.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ChannelId {
    Int(i64),
    Text(String),
}

impl ChannelId {
    /// Identifier sent for channels that cannot be resolved.
    pub const UNRESOLVED: &'static str = "0";

    /// Returns the canonical string form used in refill requests.
    ///
    /// Surrounding whitespace is dropped and an empty identifier becomes
    /// [`UNRESOLVED`](Self::UNRESOLVED). Normalizing is idempotent.
    #[must_use]
    pub fn normalize(&self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    Self::UNRESOLVED.to_owned()
                } else {
                    s.to_owned()
                }
            }
        }
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl PartialEq for ChannelId {
    fn eq(&self, other: &Self) -> bool {
        self.normalize() == other.normalize()
    }
}

impl Eq for ChannelId {}

impl Hash for ChannelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalize().hash(state);
    }
}

impl From<i64> for ChannelId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ChannelId {
    fn from(id: &str) -> Self {
        Self::Text(id.to_owned())
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalize())
    }
}

#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Channel {
    /// Identifiers of unknown shape decode as channel `0`.
    #[serde(rename = "channel_id", alias = "id", default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub id: ChannelId,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "intro", default)]
    pub description: String,

    /// Set when the channel is one of the user's favorites.
    #[serde(skip)]
    pub favorite: bool,
}

impl Channel {
    #[must_use]
    pub fn new(id: impl Into<ChannelId>, name: &str, description: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_owned(),
            description: description.to_owned(),
            favorite: false,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.description.is_empty() {
            write!(f, " {}", self.description)?;
        }
        if self.favorite {
            write!(f, " *")?;
        }
        Ok(())
    }
}

/// Public channel list.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelList {
    #[serde(default)]
    pub channels: Vec<Channel>,
}

/// Favorite and recommended channels of a logged in user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct LoginChannels {
    #[serde(default)]
    data: LoginChannelsData,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
struct LoginChannelsData {
    #[serde(default)]
    res: LoginChannelsResult,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
struct LoginChannelsResult {
    #[serde(rename = "fav_chls", default)]
    favorites: Vec<Channel>,
    #[serde(rename = "rec_chls", default)]
    recommendations: Vec<Channel>,
}

impl LoginChannels {
    #[must_use]
    pub fn new(favorites: Vec<Channel>, recommendations: Vec<Channel>) -> Self {
        Self {
            data: LoginChannelsData {
                res: LoginChannelsResult {
                    favorites,
                    recommendations,
                },
            },
        }
    }

    #[must_use]
    pub fn favorites(&self) -> &[Channel] {
        &self.data.res.favorites
    }

    #[must_use]
    pub fn recommendations(&self) -> &[Channel] {
        &self.data.res.recommendations
    }
}
