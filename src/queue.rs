//! Tracks lined up for the current channel.

use std::collections::VecDeque;

use crate::{protocol::song::Track, refill::Operation};

/// Pending tracks plus the track playing now.
///
/// The track playing now is kept apart from the pending tracks: it stays
/// put when the queue runs dry, and the [playlist](Self::playlist) view
/// always shows it at position 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Queue {
    pending: VecDeque<Track>,
    now_playing: Option<Track>,
}

impl Queue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the front track to "now playing" and returns it.
    ///
    /// Returns `None` when nothing is pending, in which case the track
    /// playing now is kept.
    pub fn dequeue_next(&mut self) -> Option<&Track> {
        let next = self.pending.pop_front()?;
        self.now_playing = Some(next);
        self.now_playing.as_ref()
    }

    #[must_use]
    pub fn now_playing(&self) -> Option<&Track> {
        self.now_playing.as_ref()
    }

    /// Number of pending tracks, not counting the one playing now.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending tracks, front first.
    pub fn pending(&self) -> impl Iterator<Item = &Track> {
        self.pending.iter()
    }

    /// The track playing now, if any, followed by the pending tracks.
    pub fn playlist(&self) -> impl Iterator<Item = &Track> {
        self.now_playing.iter().chain(self.pending.iter())
    }

    /// Replaces all pending tracks.
    pub fn replace(&mut self, tracks: Vec<Track>) {
        self.pending = tracks.into();
    }

    /// Appends tracks behind the pending ones.
    pub fn append(&mut self, tracks: Vec<Track>) {
        self.pending.extend(tracks);
    }

    /// Merges the answer to a refill. Empty answers change nothing.
    pub fn merge(&mut self, operation: Operation, tracks: Vec<Track>) {
        if tracks.is_empty() {
            return;
        }

        if operation.replaces_queue() {
            self.replace(tracks);
        } else {
            self.append(tracks);
        }
    }

    /// Records a rating of the track playing now. Returns `false` when
    /// nothing is playing.
    pub fn set_liked(&mut self, liked: bool) -> bool {
        match self.now_playing {
            Some(ref mut track) => {
                track.liked = Some(liked);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter()
            .map(|id| Track {
                id: (*id).to_owned(),
                ..Track::default()
            })
            .collect()
    }

    fn ids(queue: &Queue) -> Vec<&str> {
        queue.playlist().map(|track| track.id.as_str()).collect()
    }

    #[test]
    fn dequeue_on_empty_keeps_now_playing() {
        let mut queue = Queue::new();
        assert!(queue.dequeue_next().is_none());
        assert!(queue.now_playing().is_none());

        queue.replace(tracks(&["1"]));
        assert_eq!(queue.dequeue_next().map(|t| t.id.as_str()), Some("1"));
        assert!(queue.dequeue_next().is_none());
        assert_eq!(queue.now_playing().map(|t| t.id.as_str()), Some("1"));
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn replacing_operations_drop_pending() {
        for operation in [Operation::New, Operation::Skip, Operation::Trash, Operation::End] {
            let mut queue = Queue::new();
            queue.replace(tracks(&["1", "2", "3"]));
            queue.dequeue_next();
            queue.merge(operation, tracks(&["a", "b"]));
            assert_eq!(ids(&queue), ["1", "a", "b"], "{operation}");
        }
    }

    #[test]
    fn preserving_operations_keep_now_playing_first() {
        for operation in [Operation::Like, Operation::Unlike, Operation::LastNeedsMore] {
            let mut queue = Queue::new();
            queue.replace(tracks(&["1", "2"]));
            queue.dequeue_next();
            queue.merge(operation, tracks(&["a", "b"]));
            assert_eq!(ids(&queue), ["1", "2", "a", "b"], "{operation}");
            assert_eq!(queue.len(), 3);
        }
    }

    #[test]
    fn empty_answers_change_nothing() {
        let mut queue = Queue::new();
        queue.replace(tracks(&["1", "2"]));
        let before = queue.clone();
        queue.merge(Operation::New, Vec::new());
        queue.merge(Operation::Like, Vec::new());
        assert_eq!(queue, before);
    }

    #[test]
    fn duplicates_are_accepted() {
        let mut queue = Queue::new();
        queue.append(tracks(&["1"]));
        queue.append(tracks(&["1"]));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn liking_needs_a_track() {
        let mut queue = Queue::new();
        assert!(!queue.set_liked(true));

        queue.replace(tracks(&["1"]));
        queue.dequeue_next();
        assert!(queue.set_liked(true));
        assert_eq!(queue.now_playing().and_then(|t| t.liked), Some(true));
    }
}
