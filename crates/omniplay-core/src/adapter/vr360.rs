//! 360° VR view embed playback
//!
//! The embed acknowledges nothing reliably, so play, pause and seek update
//! the canonical state as soon as the call is made. Player events only
//! reconcile changes made from inside the iframe.

use super::{
    begin_seek, classify_error, confirm_seek, mark_ended, mark_paused, mark_playing, time_update,
    AdapterContext, PlaybackAdapter, Readiness, SignalOutcome,
};
use crate::{
    backend::{BackendKind, BackendSignal, Vr360Event, Vr360Player},
    error::{Error, Result},
    events::EventType,
    quality::QualityTable,
    source::Candidate,
    types::{NetworkState, PlaybackState, ReadyState, SessionPhase, TimeRanges},
};
use tracing::{debug, info};

/// Position jump treated as a seek made inside the embed
const SCRUB_THRESHOLD: f64 = 2.0;

pub struct Vr360Adapter {
    player: Box<dyn Vr360Player>,
    readiness: Readiness,
    table: QualityTable,
    released: bool,
}

impl Vr360Adapter {
    pub fn new(player: Box<dyn Vr360Player>) -> Self {
        Self {
            player,
            readiness: Readiness::new(),
            table: QualityTable::empty(),
            released: false,
        }
    }

    fn handle_player(&mut self, event: Vr360Event, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match event {
            Vr360Event::Ready { duration } => {
                self.player.set_volume(cx.state.volume);
                self.player.mute(cx.state.muted);
                let playable = self.readiness.set_duration(duration, cx);
                let reached = self.readiness.reach(ReadyState::HaveEnoughData, cx);
                return SignalOutcome::from_playable(playable || reached);
            }
            Vr360Event::Play => mark_playing(cx),
            Vr360Event::Pause => mark_paused(cx),
            Vr360Event::TimeUpdate { current_time } => {
                let jump = (current_time - cx.state.current_time).abs();
                if !cx.state.seeking && jump > SCRUB_THRESHOLD {
                    debug!(from = cx.state.current_time, to = current_time, "Scrub inside embed");
                    begin_seek(cx);
                    confirm_seek(cx, current_time);
                } else {
                    time_update(cx, current_time);
                }
            }
            Vr360Event::Ended => {
                if cx.looping {
                    debug!("VR view loop restart");
                    begin_seek(cx);
                    self.player.set_current_time(0.0);
                    confirm_seek(cx, 0.0);
                    self.player.play();
                } else {
                    let end = cx.state.duration;
                    if !end.is_nan() {
                        time_update(cx, end);
                    }
                    mark_ended(cx);
                }
            }
            Vr360Event::Error { code, message } => {
                return classify_error(cx, BackendKind::Vr360, &code, &message);
            }
        }
        SignalOutcome::Handled
    }
}

impl PlaybackAdapter for Vr360Adapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Vr360
    }

    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()> {
        let url = candidate
            .vr360_url()
            .ok_or_else(|| Error::SourceNotSupported(format!("not a 360° source: {}", candidate.locator)))?;
        info!(%url, "VR view source");
        cx.state.network_state = NetworkState::Loading;
        cx.transition(SessionPhase::Loading);
        cx.emit(EventType::LoadStart);
        cx.emit(EventType::Progress);
        self.player.load(&url);
        Ok(())
    }

    fn play(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if !cx.state.paused {
            return Ok(());
        }
        if cx.state.ended {
            self.seek(0.0, cx)?;
        }
        mark_playing(cx);
        self.player.play();
        Ok(())
    }

    fn pause(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if cx.state.paused {
            return Ok(());
        }
        mark_paused(cx);
        self.player.pause();
        Ok(())
    }

    fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) -> Result<()> {
        begin_seek(cx);
        self.player.set_current_time(time);
        confirm_seek(cx, time);
        Ok(())
    }

    fn backend_volume(&mut self, volume: f64) {
        self.player.set_volume(volume);
    }

    fn backend_mute(&mut self, muted: bool) -> bool {
        self.player.mute(muted);
        true
    }

    fn quality_table(&self) -> &QualityTable {
        &self.table
    }

    fn buffered(&mut self, state: &PlaybackState) -> TimeRanges {
        if state.has_duration() {
            TimeRanges::from_zero(state.duration)
        } else {
            TimeRanges::default()
        }
    }

    fn handle_signal(&mut self, signal: BackendSignal, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match signal {
            BackendSignal::Vr360(event) => self.handle_player(event, cx),
            other => {
                debug!(signal = ?other, "Foreign signal ignored by VR view adapter");
                SignalOutcome::Handled
            }
        }
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.player.stop();
        debug!("VR view stopped");
    }
}
