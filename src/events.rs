//! Events emitted by the audio output.
//!
//! Events are forwarded into the playback engine's mailbox, where they are
//! ordered with user commands. Each carries the [`Generation`] of the load
//! it belongs to, so the engine can drop events of a track it already
//! replaced.
//!
//! # Example
//!
//! ```rust
//! use fmtuner::events::Event;
//!
//! fn describe(event: &Event) -> &str {
//!     match event {
//!         Event::EndOfStream(_) => "track finished",
//!         Event::Error(..) => "track failed",
//!     }
//! }
//! ```

/// Number of a load handed to the audio output. Strictly increasing.
pub type Generation = u64;

/// Events of the audio output.
///
/// * [`EndOfStream`](Self::EndOfStream) - The loaded track played to its end
/// * [`Error`](Self::Error) - The loaded track could not be played on
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    EndOfStream(Generation),

    /// Carries a description of the failure.
    Error(Generation, String),
}

impl Event {
    /// The load this event belongs to.
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::EndOfStream(generation) | Self::Error(generation, _) => *generation,
        }
    }
}
