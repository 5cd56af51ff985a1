//! spotlet-player library - preview playback session
//!
//! Owns the single global playback session (one track or an ordered queue)
//! and translates transport intents into media engine calls:
//! - [`engine`]: media engine and backend collaborator traits
//! - [`presenter`]: now-playing presentation and control delegate traits
//! - [`session`]: the playback session shapes
//! - [`controller`]: the session controller

pub mod controller;
pub mod engine;
pub mod error;
pub mod presenter;
pub mod session;

pub use controller::PlaybackController;
pub use engine::{MediaBackend, MediaEngine, TransportState};
pub use error::{PlaybackError, Result};
pub use presenter::{NowPlaying, NowPlayingSource, PlayerPresenter, TransportControls};
pub use session::{PlaybackMode, PlaybackSession};
pub use spotlet_common::TrackRef;
