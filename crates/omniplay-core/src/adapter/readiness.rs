//! Ready-state progression
//!
//! Backends report readiness in whatever order they like. The tracker
//! buffers those reports until the duration is known, then walks the
//! canonical sequence exactly once per session:
//!
//! ```text
//! HAVE_NOTHING ──► HAVE_METADATA ──► HAVE_FUTURE_DATA ──► HAVE_ENOUGH_DATA
//!                  loadedmetadata    loadeddata, canplay   canplaythrough
//! ```

use super::AdapterContext;
use crate::{
    events::EventType,
    types::{NetworkState, ReadyState, SessionPhase},
};
use tracing::debug;

#[derive(Debug, Default)]
pub struct Readiness {
    /// Highest level the backend has reported
    target: ReadyState,
    playable: bool,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a duration report; fires `durationchange` when it changed
    pub fn set_duration(&mut self, duration: f64, cx: &mut AdapterContext<'_>) -> bool {
        if duration.is_nan() || duration < 0.0 {
            return false;
        }
        if cx.state.duration != duration {
            cx.state.duration = duration;
            cx.emit(EventType::DurationChange);
        }
        self.flush(cx)
    }

    /// Record that the backend reached `level`. Returns true when the
    /// session became playable with this report.
    pub fn reach(&mut self, level: ReadyState, cx: &mut AdapterContext<'_>) -> bool {
        if level > self.target {
            self.target = level;
        }
        self.flush(cx)
    }

    pub fn is_playable(&self) -> bool {
        self.playable
    }

    fn flush(&mut self, cx: &mut AdapterContext<'_>) -> bool {
        if !cx.state.has_duration() {
            if self.target > ReadyState::HaveNothing {
                debug!(target_level = %self.target, "Readiness buffered until duration is known");
            }
            return false;
        }

        let mut became_playable = false;
        while cx.state.ready_state < self.target {
            match cx.state.ready_state {
                ReadyState::HaveNothing => {
                    cx.state.ready_state = ReadyState::HaveMetadata;
                    cx.state.network_state = NetworkState::Idle;
                    cx.transition(SessionPhase::MetadataReady);
                    cx.emit(EventType::LoadedMetadata);
                }
                ReadyState::HaveMetadata | ReadyState::HaveCurrentData => {
                    cx.state.ready_state = ReadyState::HaveFutureData;
                    cx.emit(EventType::LoadedData);
                    cx.emit(EventType::CanPlay);
                    cx.transition(SessionPhase::Playable);
                    if !self.playable {
                        self.playable = true;
                        became_playable = true;
                    }
                }
                ReadyState::HaveFutureData => {
                    cx.state.ready_state = ReadyState::HaveEnoughData;
                    cx.emit(EventType::CanPlayThrough);
                }
                ReadyState::HaveEnoughData => break,
            }
        }
        became_playable
    }
}
