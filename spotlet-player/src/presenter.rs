//! Presentation-side interfaces
//!
//! The presentation layer receives [`NowPlaying`] pushes through
//! [`PlayerPresenter`], reads metadata through [`NowPlayingSource`], and
//! sends user intents back through [`TransportControls`].

/// Metadata of the track currently exposed by the session
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NowPlaying {
    pub name: Option<String>,
    pub artist_name: Option<String>,
    pub artwork_url: Option<String>,
}

impl NowPlaying {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.artist_name.is_none() && self.artwork_url.is_none()
    }
}

/// Receives now-playing updates
pub trait PlayerPresenter: Send + Sync {
    /// A new session started; show the player
    fn present(&self, now_playing: &NowPlaying);

    /// The exposed track changed within the session
    fn refresh(&self, now_playing: &NowPlaying);
}

/// Player control intents
pub trait TransportControls {
    fn did_tap_play_pause(&mut self);
    fn did_tap_forward(&mut self);
    fn did_tap_backward(&mut self);
    fn did_slide_slider(&mut self, value: f32);
}

/// Pull-style metadata access for the player view
pub trait NowPlayingSource {
    fn song_name(&self) -> Option<String>;
    /// Primary artist
    fn subtitle(&self) -> Option<String>;
    fn image_url(&self) -> Option<String>;
}
