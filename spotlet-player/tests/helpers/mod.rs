//! Test helpers for playback controller tests
//!
//! - FakeBackend: opens in-memory engines and keeps a probe per engine
//! - RecordingPresenter: records every now-playing push

#![allow(dead_code)]

use spotlet_player::{MediaBackend, MediaEngine, NowPlaying, PlayerPresenter, TransportState, TrackRef};
use std::sync::{Arc, Mutex};

/// Observable state of one fake engine
#[derive(Debug, Default)]
pub struct EngineProbe {
    pub urls: Vec<String>,
    /// Index of the current item in `urls`
    pub position: usize,
    pub state: TransportState,
    pub volume: f32,
    pub ops: Vec<&'static str>,
}

pub struct FakeEngine {
    probe: Arc<Mutex<EngineProbe>>,
}

impl MediaEngine for FakeEngine {
    fn play(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.ops.push("play");
        if probe.state != TransportState::Finished {
            probe.state = TransportState::Playing;
        }
    }

    fn pause(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.ops.push("pause");
        if probe.state == TransportState::Playing {
            probe.state = TransportState::Paused;
        }
    }

    fn advance_to_next_item(&mut self) {
        let mut probe = self.probe.lock().unwrap();
        probe.ops.push("advance");
        probe.position += 1;
        if probe.position >= probe.urls.len() {
            probe.state = TransportState::Finished;
        }
    }

    fn seek_to_start(&mut self) {
        self.probe.lock().unwrap().ops.push("seek_to_start");
    }

    fn transport_state(&self) -> TransportState {
        self.probe.lock().unwrap().state
    }

    fn set_volume(&mut self, volume: f32) {
        let mut probe = self.probe.lock().unwrap();
        probe.ops.push("set_volume");
        probe.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.probe.lock().unwrap().volume
    }

    fn queued_urls(&self) -> Vec<String> {
        let probe = self.probe.lock().unwrap();
        probe.urls.iter().skip(probe.position).cloned().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    Single,
    Queue,
}

#[derive(Default)]
pub struct FakeBackend {
    opened: Mutex<Vec<(EngineKind, Arc<Mutex<EngineProbe>>)>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn open(&self, kind: EngineKind, urls: Vec<String>) -> Box<dyn MediaEngine> {
        let probe = Arc::new(Mutex::new(EngineProbe {
            urls,
            ..Default::default()
        }));
        self.opened.lock().unwrap().push((kind, probe.clone()));
        Box::new(FakeEngine { probe })
    }

    pub fn opened_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }

    pub fn engine(&self, index: usize) -> (EngineKind, Arc<Mutex<EngineProbe>>) {
        let opened = self.opened.lock().unwrap();
        let (kind, probe) = &opened[index];
        (*kind, probe.clone())
    }

    pub fn last_engine(&self) -> (EngineKind, Arc<Mutex<EngineProbe>>) {
        let count = self.opened_count();
        self.engine(count - 1)
    }
}

impl MediaBackend for FakeBackend {
    fn open_single(&self, url: &str) -> Box<dyn MediaEngine> {
        self.open(EngineKind::Single, vec![url.to_string()])
    }

    fn open_queue(&self, urls: &[String]) -> Box<dyn MediaEngine> {
        self.open(EngineKind::Queue, urls.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PresenterCall {
    Present(NowPlaying),
    Refresh(NowPlaying),
}

#[derive(Default)]
pub struct RecordingPresenter {
    pub calls: Mutex<Vec<PresenterCall>>,
}

impl RecordingPresenter {
    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl PlayerPresenter for RecordingPresenter {
    fn present(&self, now_playing: &NowPlaying) {
        self.calls
            .lock()
            .unwrap()
            .push(PresenterCall::Present(now_playing.clone()));
    }

    fn refresh(&self, now_playing: &NowPlaying) {
        self.calls
            .lock()
            .unwrap()
            .push(PresenterCall::Refresh(now_playing.clone()));
    }
}

pub fn track(name: &str) -> TrackRef {
    TrackRef::new(name)
        .with_artist(format!("{} artist", name))
        .with_preview(format!("https://p.example/{}.mp3", name))
        .with_artwork(format!("https://i.example/{}.jpg", name))
}

pub fn unplayable(name: &str) -> TrackRef {
    TrackRef::new(name).with_artist(format!("{} artist", name))
}
