//! Playback session shapes
//!
//! A session is either idle, a single track, or a queue. Each shape owns its
//! engine, so a single-track session can never carry queue state and vice
//! versa.

use crate::engine::MediaEngine;
use spotlet_common::TrackRef;

/// Current playback shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackMode {
    Idle,
    Single,
    Queue,
}

pub enum PlaybackSession {
    Idle,
    Single {
        track: TrackRef,
        engine: Box<dyn MediaEngine>,
    },
    Queue {
        /// Playable tracks only, in requested order
        tracks: Vec<TrackRef>,
        /// Index into `tracks`; advancing from the last track moves it one
        /// past the end
        current_index: usize,
        engine: Box<dyn MediaEngine>,
    },
}

impl PlaybackSession {
    pub fn mode(&self) -> PlaybackMode {
        match self {
            PlaybackSession::Idle => PlaybackMode::Idle,
            PlaybackSession::Single { .. } => PlaybackMode::Single,
            PlaybackSession::Queue { .. } => PlaybackMode::Queue,
        }
    }

    /// Track exposed to the presentation layer
    ///
    /// `None` when idle or when the queue index has run past the end.
    pub fn current_track(&self) -> Option<&TrackRef> {
        match self {
            PlaybackSession::Idle => None,
            PlaybackSession::Single { track, .. } => Some(track),
            PlaybackSession::Queue {
                tracks,
                current_index,
                ..
            } => tracks.get(*current_index),
        }
    }

    pub fn engine(&self) -> Option<&dyn MediaEngine> {
        match self {
            PlaybackSession::Idle => None,
            PlaybackSession::Single { engine, .. } | PlaybackSession::Queue { engine, .. } => {
                Some(engine.as_ref())
            }
        }
    }

    pub fn engine_mut(&mut self) -> Option<&mut Box<dyn MediaEngine>> {
        match self {
            PlaybackSession::Idle => None,
            PlaybackSession::Single { engine, .. } | PlaybackSession::Queue { engine, .. } => {
                Some(engine)
            }
        }
    }
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackSession::Idle => write!(f, "Idle"),
            PlaybackSession::Single { track, engine } => f
                .debug_struct("Single")
                .field("track", &track.name)
                .field("state", &engine.transport_state())
                .finish(),
            PlaybackSession::Queue {
                tracks,
                current_index,
                engine,
            } => f
                .debug_struct("Queue")
                .field("tracks", &tracks.len())
                .field("current_index", current_index)
                .field("state", &engine.transport_state())
                .finish(),
        }
    }
}
