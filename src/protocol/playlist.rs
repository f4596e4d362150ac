//! Refill responses of the station service.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "r": 0,
//!     "is_show_quick_start": 0,
//!     "song": [{"sid": "1395452", "title": "...", "...": "..."}]
//! }
//! ```
//!
//! On failure `r` is nonzero and `err` holds the reason:
//!
//! ```json
//! {"r": 1, "err": "invalid_channel"}
//! ```

use serde::Deserialize;

use super::song::Track;
use crate::error::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub r: i64,

    #[serde(rename = "song", default)]
    pub tracks: Vec<Track>,

    #[serde(default)]
    pub err: String,
}

impl Response {
    /// The tracks of a successful response.
    ///
    /// # Errors
    ///
    /// Returns `Unavailable` carrying the server message if `r` is nonzero.
    pub fn into_result(self) -> Result<Vec<Track>> {
        if self.r == 0 {
            Ok(self.tracks)
        } else {
            Err(Error::unavailable(format!(
                "station service refused refill (r = {}): {}",
                self.r, self.err
            )))
        }
    }
}

/// Lower bound of the cache-busting token.
const TOKEN_MIN: u64 = 0x10_0000_0000;

/// Width of the cache-busting token range.
const TOKEN_SPAN: u64 = 0xF0_0000_0000;

/// Generates the cache-busting `r` parameter of refill requests: always
/// exactly ten lowercase hex digits.
///
/// Uses `fastrand`, which is fast but not cryptographically secure. That is
/// fine for a token whose only job is to defeat caches.
#[must_use]
pub fn random_token() -> String {
    format!("{:x}", fastrand::u64(TOKEN_MIN..TOKEN_MIN + TOKEN_SPAN))
}
