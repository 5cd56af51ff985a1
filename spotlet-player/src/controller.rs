//! Playback session controller
//!
//! Owns the one playback session of the process and maps transport intents
//! onto the engine:
//!
//! | Intent        | Single                     | Queue                                   |
//! |---------------|----------------------------|-----------------------------------------|
//! | play/pause    | toggle engine              | toggle engine                           |
//! | advance       | pause (no next track)      | next item, `current_index += 1`         |
//! | rewind        | restart the track          | new engine over the first track, index 0 |
//! | volume        | applied                    | ignored                                 |
//!
//! Advancing from the last queued track leaves `current_index` one past the
//! end; metadata is then empty. Rewind always returns to the first track,
//! not the previous one.
//!
//! Operations take `&mut self`; share the controller behind a mutex so
//! transport calls stay strictly ordered.

use crate::engine::{MediaBackend, TransportState};
use crate::error::{PlaybackError, Result};
use crate::presenter::{NowPlaying, NowPlayingSource, PlayerPresenter, TransportControls};
use crate::session::{PlaybackMode, PlaybackSession};
use spotlet_common::config::PlayerConfig;
use spotlet_common::TrackRef;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct PlaybackController {
    backend: Arc<dyn MediaBackend>,
    presenter: Option<Arc<dyn PlayerPresenter>>,
    /// Volume applied to every new engine
    default_volume: f32,
    session: PlaybackSession,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn MediaBackend>, config: &PlayerConfig) -> Self {
        Self {
            backend,
            presenter: None,
            default_volume: config.default_volume.clamp(0.0, 1.0),
            session: PlaybackSession::Idle,
        }
    }

    pub fn with_presenter(mut self, presenter: Arc<dyn PlayerPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn mode(&self) -> PlaybackMode {
        self.session.mode()
    }

    /// Queue position; `None` outside queue mode
    pub fn current_index(&self) -> Option<usize> {
        match &self.session {
            PlaybackSession::Queue { current_index, .. } => Some(*current_index),
            _ => None,
        }
    }

    pub fn current_track(&self) -> Option<&TrackRef> {
        self.session.current_track()
    }

    /// Engine transport state; `Idle` when no session exists
    pub fn transport_state(&self) -> TransportState {
        self.session
            .engine()
            .map(|engine| engine.transport_state())
            .unwrap_or_default()
    }

    /// Replace the session with a single track and start playing it
    ///
    /// A track without a preview URL is rejected and the current session is
    /// left as it was.
    pub fn start_single(&mut self, track: TrackRef) -> Result<()> {
        let Some(url) = track.preview_url.clone().filter(|url| !url.is_empty()) else {
            debug!(track = %track.name, "Ignoring single playback of track without preview");
            return Err(PlaybackError::Unplayable(track.name));
        };

        self.stop_current();

        let mut engine = self.backend.open_single(&url);
        engine.set_volume(self.default_volume);
        engine.play();

        info!(track = %track.name, "Started single-track playback");
        self.session = PlaybackSession::Single { track, engine };
        self.notify_present();
        Ok(())
    }

    /// Replace the session with a queue of the playable tracks and start it
    ///
    /// Tracks without a preview URL are left out; the rest keep their
    /// relative order and indices refer to the filtered list.
    pub fn start_queue(&mut self, tracks: Vec<TrackRef>) -> Result<()> {
        let requested = tracks.len();
        let tracks: Vec<TrackRef> = tracks.into_iter().filter(TrackRef::is_playable).collect();
        if tracks.is_empty() {
            debug!(requested, "Ignoring queue playback without playable tracks");
            return Err(PlaybackError::EmptyQueue);
        }

        self.stop_current();

        let urls: Vec<String> = tracks
            .iter()
            .filter_map(|track| track.preview_url.clone())
            .collect();
        let mut engine = self.backend.open_queue(&urls);
        engine.set_volume(self.default_volume);
        engine.play();

        info!(
            requested,
            playable = tracks.len(),
            "Started queue playback"
        );
        self.session = PlaybackSession::Queue {
            tracks,
            current_index: 0,
            engine,
        };
        self.notify_present();
        Ok(())
    }

    /// Pause when playing, resume when paused; otherwise nothing
    pub fn toggle_play_pause(&mut self) {
        let Some(engine) = self.session.engine_mut() else {
            return;
        };

        match engine.transport_state() {
            TransportState::Playing => engine.pause(),
            TransportState::Paused => engine.play(),
            TransportState::Idle | TransportState::Finished => {
                debug!("Play/pause ignored, engine not started or finished")
            }
        }
    }

    /// Skip forward (queue) or pause (single track)
    pub fn advance(&mut self) {
        match &mut self.session {
            PlaybackSession::Idle => {}
            PlaybackSession::Single { engine, .. } => engine.pause(),
            PlaybackSession::Queue {
                tracks,
                current_index,
                engine,
            } => {
                engine.advance_to_next_item();
                *current_index += 1;
                if *current_index >= tracks.len() {
                    warn!(
                        current_index = *current_index,
                        tracks = tracks.len(),
                        "Advanced past the end of the queue"
                    );
                }
                self.notify_refresh();
            }
        }
    }

    /// Restart the single track, or restart the queue from its first track
    pub fn rewind(&mut self) {
        match &mut self.session {
            PlaybackSession::Idle => {}
            PlaybackSession::Single { engine, .. } => {
                engine.pause();
                engine.seek_to_start();
                engine.play();
            }
            PlaybackSession::Queue {
                tracks,
                current_index,
                engine,
            } => {
                let Some(first_url) = tracks.first().and_then(|t| t.preview_url.clone()) else {
                    return;
                };

                engine.pause();
                let mut replacement = self.backend.open_queue(&[first_url]);
                replacement.play();
                replacement.set_volume(self.default_volume);
                *engine = replacement;
                *current_index = 0;
                self.notify_refresh();
            }
        }
    }

    /// Set the single-track engine volume; no effect in queue mode
    pub fn set_volume(&mut self, value: f32) {
        match &mut self.session {
            PlaybackSession::Single { engine, .. } => engine.set_volume(value.clamp(0.0, 1.0)),
            PlaybackSession::Queue { .. } => debug!(value, "Volume change ignored in queue mode"),
            PlaybackSession::Idle => {}
        }
    }

    /// Metadata of the exposed track; all fields absent without one
    pub fn current_metadata(&self) -> NowPlaying {
        match self.session.current_track() {
            Some(track) => NowPlaying {
                name: Some(track.name.clone()),
                artist_name: track.artist_name.clone(),
                artwork_url: track.artwork_url.clone(),
            },
            None => NowPlaying::default(),
        }
    }

    fn stop_current(&mut self) {
        if let Some(engine) = self.session.engine_mut() {
            engine.pause();
        }
    }

    fn notify_present(&self) {
        if let Some(presenter) = &self.presenter {
            presenter.present(&self.current_metadata());
        }
    }

    fn notify_refresh(&self) {
        if let Some(presenter) = &self.presenter {
            presenter.refresh(&self.current_metadata());
        }
    }
}

impl TransportControls for PlaybackController {
    fn did_tap_play_pause(&mut self) {
        self.toggle_play_pause();
    }

    fn did_tap_forward(&mut self) {
        self.advance();
    }

    fn did_tap_backward(&mut self) {
        self.rewind();
    }

    fn did_slide_slider(&mut self, value: f32) {
        self.set_volume(value);
    }
}

impl NowPlayingSource for PlaybackController {
    fn song_name(&self) -> Option<String> {
        self.current_metadata().name
    }

    fn subtitle(&self) -> Option<String> {
        self.current_metadata().artist_name
    }

    fn image_url(&self) -> Option<String> {
        self.current_metadata().artwork_url
    }
}
