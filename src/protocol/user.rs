//! Login response of the station service.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "user_id": "1234567",
//!     "user_name": "listener",
//!     "email": "listener@example.com",
//!     "token": "5f0c8a...",
//!     "expire": "1400000000",
//!     "r": 0,
//!     "err": "ok"
//! }
//! ```
//!
//! A rejected login carries `r != 0` and a message in `err`, with the user
//! fields missing.

use serde::Deserialize;
use veil::Redact;

use super::lenient_string;

/// Identity and credentials of a logged in user.
#[derive(Clone, Default, PartialEq, Eq, Hash, Deserialize, Redact)]
pub struct User {
    #[serde(default, deserialize_with = "lenient_string")]
    pub user_id: String,

    #[serde(rename = "user_name", default)]
    pub name: String,

    #[serde(default)]
    pub email: String,

    #[redact]
    #[serde(default)]
    pub token: String,

    /// Token expiry as seconds since the Unix epoch.
    #[serde(default, deserialize_with = "lenient_string")]
    pub expire: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub r: i64,

    #[serde(default)]
    pub err: String,

    #[serde(flatten)]
    pub user: User,
}
