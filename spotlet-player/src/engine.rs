//! Media engine collaborator
//!
//! The controller never decodes audio itself. A [`MediaBackend`] opens an
//! engine over one preview URL or an ordered list of them, and the engine
//! reports its transport state.

/// Transport state of an engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Created but never started
    #[default]
    Idle,
    Playing,
    Paused,
    /// Every queued item has been played or skipped
    Finished,
}

/// One loaded player (single item or queue)
pub trait MediaEngine: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Drop the current item and move to the next one; with nothing left
    /// the engine becomes `Finished`
    fn advance_to_next_item(&mut self);

    /// Move the current item's playhead back to zero
    fn seek_to_start(&mut self);

    fn transport_state(&self) -> TransportState;

    /// Volume in 0.0-1.0
    fn set_volume(&mut self, volume: f32);

    fn volume(&self) -> f32;

    /// Remaining items, current one first
    fn queued_urls(&self) -> Vec<String>;
}

/// Factory for engines
pub trait MediaBackend: Send + Sync {
    fn open_single(&self, url: &str) -> Box<dyn MediaEngine>;

    fn open_queue(&self, urls: &[String]) -> Box<dyn MediaEngine>;
}
