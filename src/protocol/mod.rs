//! Wire types of the station service.
//!
//! # Submodules
//!
//! * [`channel`] - Channels, channel identifiers and channel listings
//! * [`playlist`] - Refill responses
//! * [`song`] - Tracks as handed out in refill responses
//! * [`user`] - Login responses
//!
//! The station service is loose with its JSON types: the same field can
//! arrive as a number in one response and as a string in the next. The
//! helpers in this module absorb that at the decoding boundary, so the rest
//! of the crate works with one representation per field.

pub mod channel;
pub mod playlist;
pub mod song;
pub mod user;

use std::fmt::Debug;

use serde::{Deserialize, Deserializer};

use crate::error::Result;

/// Parses and logs JSON responses from the station service.
///
/// # Logging
///
/// * Success: Logs parsed structure at TRACE level
/// * Parse Error: Logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: Logs error and raw text at ERROR level
///
/// # Errors
///
/// Returns error if the body is not valid JSON or does not match `T`.
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{origin}: {result:#?}");
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{origin}: {json:#?}");
            } else {
                error!("{origin}: failed parsing response ({e:?})");
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}

/// Any scalar the station service may put where a string or number belongs.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }

    /// Truthiness of a flag; `None` when it cannot be told.
    fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(n) => Some(*n != 0),
            Self::Float(n) => Some(*n != 0.0),
            Self::Text(s) => s.trim().parse::<i64>().ok().map(|n| n != 0),
        }
    }
}

/// Deserializes a string, number or `null` into a string. `null` becomes an
/// empty string.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.map(Scalar::into_string).unwrap_or_default())
}

/// Deserializes a 0/1 flag that may arrive as boolean, number or string.
pub(crate) fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Scalar>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(Scalar::as_flag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_string")]
        id: String,
        #[serde(default, deserialize_with = "lenient_flag")]
        like: Option<bool>,
    }

    #[test]
    fn numbers_and_strings_decode_alike() {
        let a: Loose = json(r#"{"id": 1234, "like": 1}"#, "test").unwrap();
        let b: Loose = json(r#"{"id": "1234", "like": "1"}"#, "test").unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.like, Some(true));
        assert_eq!(b.like, Some(true));
    }

    #[test]
    fn missing_and_null_fields() {
        let missing: Loose = json("{}", "test").unwrap();
        assert_eq!(missing.id, "");
        assert_eq!(missing.like, None);

        let null: Loose = json(r#"{"id": null, "like": null}"#, "test").unwrap();
        assert_eq!(null.id, "");
        assert_eq!(null.like, None);

        let unknown: Loose = json(r#"{"like": "maybe"}"#, "test").unwrap();
        assert_eq!(unknown.like, None);
    }
}
