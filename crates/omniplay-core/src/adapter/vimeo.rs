//! Vimeo embed playback
//!
//! The player has no muted flag, so mute runs the player at volume 0 while
//! the canonical state keeps the user's volume. The player echoes every
//! volume write back, late and in order; echoes of the adapter's own writes
//! are dropped and only changes made inside the iframe are adopted.

use super::{
    classify_error, mark_ended, mark_paused, mark_playing, time_update, AdapterContext,
    PlaybackAdapter, Readiness, SeekTracker, SignalOutcome,
};
use crate::{
    backend::{BackendKind, BackendSignal, VimeoEvent, VimeoPlayer},
    error::{Error, Result},
    events::EventType,
    quality::QualityTable,
    source::Candidate,
    types::{NetworkState, PlaybackState, ReadyState, SessionPhase, TimeRanges},
};
use std::collections::VecDeque;
use tracing::{debug, info, trace};

/// Writes older than this are assumed to have been echoed already
const MAX_PENDING_ECHOES: usize = 16;

pub struct VimeoAdapter {
    player: Box<dyn VimeoPlayer>,
    readiness: Readiness,
    seeks: SeekTracker,
    /// Volumes written to the player whose echo has not arrived yet
    written: VecDeque<f64>,
    table: QualityTable,
    buffered_end: f64,
    released: bool,
}

impl VimeoAdapter {
    pub fn new(player: Box<dyn VimeoPlayer>) -> Self {
        Self {
            player,
            readiness: Readiness::new(),
            seeks: SeekTracker::default(),
            written: VecDeque::new(),
            table: QualityTable::empty(),
            buffered_end: 0.0,
            released: false,
        }
    }

    fn handle_player(&mut self, event: VimeoEvent, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match event {
            VimeoEvent::Ready => {
                cx.emit(EventType::LoadStart);
                self.backend_volume(cx.state.effective_volume());
                self.player.request_duration();
            }
            VimeoEvent::Duration(duration) => {
                let playable = self.readiness.set_duration(duration, cx);
                // The embed buffers on its own; metadata means it can play through
                let reached = self.readiness.reach(ReadyState::HaveEnoughData, cx);
                return SignalOutcome::from_playable(playable || reached);
            }
            VimeoEvent::TimeUpdate { seconds } => time_update(cx, seconds),
            VimeoEvent::Progress { seconds } => {
                self.buffered_end = seconds;
                cx.emit(EventType::Progress);
            }
            VimeoEvent::Play => mark_playing(cx),
            VimeoEvent::Pause => mark_paused(cx),
            VimeoEvent::Ended => {
                if cx.looping {
                    debug!("Vimeo loop restart");
                    self.seeks.issue(0.0, cx);
                    self.player.set_current_time(0.0);
                    self.player.play();
                } else {
                    mark_ended(cx);
                }
            }
            VimeoEvent::Seeked { seconds } => self.seeks.confirm(seconds, cx),
            VimeoEvent::VolumeChange { volume } => {
                if self.take_echo(volume) {
                    trace!(volume, "Vimeo volume echo");
                    return SignalOutcome::Handled;
                }
                if cx.state.muted || volume == cx.state.volume {
                    return SignalOutcome::Handled;
                }
                cx.state.volume = volume;
                cx.emit(EventType::VolumeChange);
            }
            VimeoEvent::Error { name, message } => {
                return classify_error(cx, BackendKind::Vimeo, &name, &message);
            }
        }
        SignalOutcome::Handled
    }

    /// Consume the echo of one of our own writes, with any skipped before it
    fn take_echo(&mut self, volume: f64) -> bool {
        match self.written.iter().position(|written| *written == volume) {
            Some(at) => {
                self.written.drain(..=at);
                true
            }
            None => false,
        }
    }
}

impl PlaybackAdapter for VimeoAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Vimeo
    }

    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()> {
        let video_id = candidate
            .vimeo_id()
            .ok_or_else(|| Error::SourceNotSupported(format!("no Vimeo id in {}", candidate.locator)))?;
        info!(video_id, "Vimeo source");
        cx.state.network_state = NetworkState::Loading;
        cx.transition(SessionPhase::Loading);
        self.player.load_video(video_id);
        Ok(())
    }

    fn play(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if !cx.state.paused {
            return Ok(());
        }
        if cx.state.ended {
            self.seek(0.0, cx)?;
        }
        self.player.play();
        Ok(())
    }

    fn pause(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if !cx.state.paused {
            self.player.pause();
        }
        Ok(())
    }

    fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) -> Result<()> {
        self.seeks.issue(time, cx);
        self.player.set_current_time(time);
        Ok(())
    }

    fn backend_volume(&mut self, volume: f64) {
        if self.written.len() == MAX_PENDING_ECHOES {
            self.written.pop_front();
        }
        self.written.push_back(volume);
        self.player.set_volume(volume);
    }

    fn quality_table(&self) -> &QualityTable {
        &self.table
    }

    fn buffered(&mut self, _state: &PlaybackState) -> TimeRanges {
        TimeRanges::from_zero(self.buffered_end)
    }

    fn handle_signal(&mut self, signal: BackendSignal, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match signal {
            BackendSignal::Vimeo(event) => self.handle_player(event, cx),
            other => {
                debug!(signal = ?other, "Foreign signal ignored by Vimeo adapter");
                SignalOutcome::Handled
            }
        }
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.player.pause();
        self.player.unload();
        debug!("Vimeo player unloaded");
    }
}
