//! Playlist refills.
//!
//! Every playback decision that needs fresh tracks goes through a refill: an
//! [`Operation`] tells the station service what just happened to the current
//! track, and the tracks it answers with are merged into the [`Queue`].
//!
//! Refills are tried exactly once. A failed or empty refill leaves the queue
//! as it was.

use std::{fmt, time::Duration};

use crate::{
    error::Result,
    gateway::Api,
    protocol::user::User,
    queue::Queue,
};

/// What happened to the current track, as reported to the station service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Tuned to a channel.
    New,
    /// Skipped the current track.
    Skip,
    /// Never play the current track again.
    Trash,
    /// The current track played to its end.
    End,
    /// The queue ran dry.
    LastNeedsMore,
    Like,
    Unlike,
}

impl Operation {
    /// Wire code of the `type` parameter.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::New => "n",
            Self::Skip => "s",
            Self::Trash => "b",
            Self::End => "e",
            Self::LastNeedsMore => "p",
            Self::Like => "r",
            Self::Unlike => "u",
        }
    }

    /// Whether a non-empty answer replaces the queue. Otherwise the answer
    /// is appended behind the track that is playing now.
    #[must_use]
    pub fn replaces_queue(self) -> bool {
        matches!(self, Self::New | Self::Skip | Self::Trash | Self::End)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::New => "new",
            Self::Skip => "skip",
            Self::Trash => "trash",
            Self::End => "end",
            Self::LastNeedsMore => "last needs more",
            Self::Like => "like",
            Self::Unlike => "unlike",
        };
        write!(f, "{name}")
    }
}

/// Everything the station service needs to know for one refill.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub operation: Operation,
    /// Normalized channel identifier.
    pub channel: String,
    /// Identifier of the track playing now, `"0"` if none.
    pub track_id: String,
    /// How long the track playing now has been playing.
    pub elapsed: Duration,
    pub user: Option<User>,
}

impl Request {
    /// Track identifier sent when nothing is playing.
    pub const NO_TRACK: &'static str = "0";
}

/// Requests tracks from the station service and merges them into the queue.
///
/// Returns the number of tracks received. Zero tracks is not an error and
/// leaves the queue untouched.
///
/// # Errors
///
/// Returns an error if the request fails, the response cannot be decoded or
/// the service refuses the request. The queue is left untouched.
pub async fn refill(api: &mut dyn Api, queue: &mut Queue, request: &Request) -> Result<usize> {
    debug!(
        "refill ({}) on channel {} after track {}",
        request.operation, request.channel, request.track_id
    );

    let tracks = api.playlist(request).await?;
    let count = tracks.len();
    if count == 0 {
        debug!("refill ({}) returned no tracks", request.operation);
    } else {
        queue.merge(request.operation, tracks);
        debug!(
            "refill ({}) returned {count} tracks, {} queued",
            request.operation,
            queue.len()
        );
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes() {
        let codes: Vec<_> = [
            Operation::Trash,
            Operation::End,
            Operation::New,
            Operation::LastNeedsMore,
            Operation::Skip,
            Operation::Unlike,
            Operation::Like,
        ]
        .into_iter()
        .map(Operation::code)
        .collect();
        assert_eq!(codes, ["b", "e", "n", "p", "s", "u", "r"]);
    }

    #[test]
    fn merge_policy() {
        assert!(Operation::New.replaces_queue());
        assert!(Operation::Skip.replaces_queue());
        assert!(Operation::Trash.replaces_queue());
        assert!(Operation::End.replaces_queue());
        assert!(!Operation::Like.replaces_queue());
        assert!(!Operation::Unlike.replaces_queue());
        assert!(!Operation::LastNeedsMore.replaces_queue());
    }
}
