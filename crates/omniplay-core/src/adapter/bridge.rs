//! Media element event bridge
//!
//! Native progressive playback and both streaming engines render into a
//! media element, so they share one translation from element events to
//! canonical state.

use super::{
    begin_seek, classify_error, mark_ended, mark_paused, mark_play, mark_playing, time_update,
    AdapterContext, Readiness, SeekTracker, SignalOutcome,
};
use crate::{
    backend::{BackendKind, ElementEvent},
    events::EventType,
    types::{NetworkState, ReadyState},
};
use tracing::trace;

#[derive(Debug, Default)]
pub struct ElementBridge {
    readiness: Readiness,
    seeks: SeekTracker,
}

impl ElementBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a seek the adapter is about to write to the element
    pub fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) {
        self.seeks.issue(time, cx);
    }

    pub fn handle(&mut self, event: ElementEvent, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        trace!(?event, "Element event");
        match event {
            ElementEvent::LoadStart => {
                cx.state.network_state = NetworkState::Loading;
                cx.emit(EventType::LoadStart);
            }
            ElementEvent::Progress => cx.emit(EventType::Progress),
            ElementEvent::LoadedMetadata { duration } => {
                let playable = self.readiness.set_duration(duration, cx);
                let reached = self.readiness.reach(ReadyState::HaveMetadata, cx);
                return SignalOutcome::from_playable(playable || reached);
            }
            ElementEvent::DurationChange { duration } => {
                return SignalOutcome::from_playable(self.readiness.set_duration(duration, cx));
            }
            // Announced together with canplay
            ElementEvent::LoadedData => {}
            ElementEvent::CanPlay => {
                return SignalOutcome::from_playable(self.readiness.reach(ReadyState::HaveFutureData, cx));
            }
            ElementEvent::CanPlayThrough => {
                return SignalOutcome::from_playable(self.readiness.reach(ReadyState::HaveEnoughData, cx));
            }
            ElementEvent::Play => mark_play(cx),
            ElementEvent::Playing => mark_playing(cx),
            ElementEvent::Pause => mark_paused(cx),
            ElementEvent::Waiting => cx.emit(EventType::Waiting),
            ElementEvent::Seeking => begin_seek(cx),
            ElementEvent::Seeked { current_time } => self.seeks.confirm(current_time, cx),
            ElementEvent::TimeUpdate { current_time } => time_update(cx, current_time),
            // The element is only written through the adapter, so this is an echo
            ElementEvent::VolumeChange { volume, muted } => {
                trace!(volume, muted, "Element volume echo");
            }
            ElementEvent::Ended => mark_ended(cx),
            ElementEvent::Error { code, message } => {
                return classify_error(cx, BackendKind::Native, &code.to_string(), &message);
            }
        }
        SignalOutcome::Handled
    }
}
