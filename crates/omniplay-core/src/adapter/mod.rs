//! Playback adapters
//!
//! One adapter per backend kind, all behind [`PlaybackAdapter`]. Adapters
//! mutate the canonical [`PlaybackState`] through an [`AdapterContext`] and
//! record canonical events as they go; the element dispatches the batch
//! once the adapter returns.
//!
//! Play/pause acknowledgment per backend:
//! - native, DASH, HLS: `paused` follows the media element's `play`/`pause` events
//! - Vimeo: `paused` follows the player's `play`/`pause` events
//! - VR view: optimistic; `paused` flips on the call, player events only
//!   reconcile toggles made inside the iframe
//!
//! Seek confirmation follows the same split: VR view confirms immediately,
//! the others on the backend's `seeked`.

mod bridge;
mod dash;
mod hls;
mod native;
mod readiness;
mod vimeo;
mod vr360;

pub use bridge::ElementBridge;
pub use dash::DashAdapter;
pub use hls::HlsAdapter;
pub use native::NativeAdapter;
pub use readiness::Readiness;
pub use vimeo::VimeoAdapter;
pub use vr360::Vr360Adapter;

use crate::{
    backend::{BackendKind, BackendPlayer, BackendSignal, PlayerOptions},
    config::ErrorMap,
    error::{MediaError, Result},
    events::{EventBatch, EventType},
    quality::{NativeLevel, Quality, QualityTable},
    source::Candidate,
    types::{check_volume, PlaybackState, SessionPhase, TimeRanges},
};
use tracing::{debug, trace};

/// Mutable view of the element handed to an adapter
pub struct AdapterContext<'a> {
    pub state: &'a mut PlaybackState,
    pub phase: &'a mut SessionPhase,
    pub error_map: &'a ErrorMap,
    pub looping: bool,
    events: &'a mut EventBatch,
}

impl<'a> AdapterContext<'a> {
    pub fn new(
        state: &'a mut PlaybackState,
        phase: &'a mut SessionPhase,
        error_map: &'a ErrorMap,
        looping: bool,
        events: &'a mut EventBatch,
    ) -> Self {
        Self {
            state,
            phase,
            error_map,
            looping,
            events,
        }
    }

    /// Record a canonical event with the current state
    pub fn emit(&mut self, event: EventType) {
        self.events.push(event, self.state);
    }

    /// Move the session state machine. Invalid moves are ignored.
    pub fn transition(&mut self, next: SessionPhase) -> bool {
        if *self.phase == next {
            return false;
        }
        if !self.phase.can_transition_to(next) {
            debug!(from = %self.phase, to = %next, "Phase transition ignored");
            return false;
        }
        *self.phase = next;
        true
    }
}

/// What the element must do after an adapter handled a backend signal
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Handled,
    /// The session reached `HAVE_FUTURE_DATA` for the first time
    Playable,
    /// The backend reported a classified fatal error
    Failed(MediaError),
}

impl SignalOutcome {
    fn from_playable(playable: bool) -> Self {
        if playable {
            SignalOutcome::Playable
        } else {
            SignalOutcome::Handled
        }
    }
}

/// Canonical contract every backend adapter implements
pub trait PlaybackAdapter: Send {
    fn kind(&self) -> BackendKind;

    /// Point the backend at a candidate; readiness arrives through signals
    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()>;

    fn play(&mut self, cx: &mut AdapterContext<'_>) -> Result<()>;

    fn pause(&mut self, cx: &mut AdapterContext<'_>) -> Result<()>;

    fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) -> Result<()>;

    /// Push a volume to the backend
    fn backend_volume(&mut self, volume: f64);

    /// Apply a native mute flag. Returns false when the backend has none.
    fn backend_mute(&mut self, _muted: bool) -> bool {
        false
    }

    fn set_volume(&mut self, volume: f64, cx: &mut AdapterContext<'_>) -> Result<()> {
        let volume = check_volume(volume)?;
        if cx.state.volume == volume {
            return Ok(());
        }
        cx.state.volume = volume;
        // While muted the new value only updates the cache
        if !cx.state.muted {
            self.backend_volume(volume);
        }
        cx.emit(EventType::VolumeChange);
        Ok(())
    }

    fn set_muted(&mut self, muted: bool, cx: &mut AdapterContext<'_>) -> Result<()> {
        if cx.state.muted == muted {
            return Ok(());
        }
        cx.state.muted = muted;
        if !self.backend_mute(muted) {
            self.backend_volume(cx.state.effective_volume());
        }
        cx.emit(EventType::VolumeChange);
        Ok(())
    }

    /// Empty for backends without a quality concept
    fn quality_table(&self) -> &QualityTable;

    fn current_quality(&self) -> Quality {
        Quality::Auto
    }

    /// Backend-specific quality selection; the value was validated by the caller
    fn set_quality(&mut self, _quality: Quality, _cx: &mut AdapterContext<'_>) -> Result<()> {
        Ok(())
    }

    fn set_loop(&mut self, _looping: bool) {}

    fn buffered(&mut self, state: &PlaybackState) -> TimeRanges;

    fn handle_signal(&mut self, signal: BackendSignal, cx: &mut AdapterContext<'_>) -> SignalOutcome;

    /// Release the backend player. Safe to call more than once.
    fn teardown(&mut self);
}

/// Wrap a freshly created player in the adapter for its kind
pub fn create_adapter(player: BackendPlayer, options: &PlayerOptions) -> Box<dyn PlaybackAdapter> {
    match player {
        BackendPlayer::Native(media) => Box::new(NativeAdapter::new(media)),
        BackendPlayer::Dash(engine) => Box::new(DashAdapter::new(engine)),
        BackendPlayer::Hls(engine) => Box::new(HlsAdapter::new(engine, options.hls_start_level)),
        BackendPlayer::Vimeo(player) => Box::new(VimeoAdapter::new(player)),
        BackendPlayer::Vr360(player) => Box::new(Vr360Adapter::new(player)),
    }
}

// ============================================================================
// Shared transitions
// ============================================================================

pub(crate) fn begin_seek(cx: &mut AdapterContext<'_>) {
    if !cx.state.seeking {
        cx.state.seeking = true;
        cx.emit(EventType::Seeking);
    }
}

/// Seek confirmed by the backend; fires the fixed post-seek sequence
pub(crate) fn confirm_seek(cx: &mut AdapterContext<'_>, time: f64) {
    cx.state.seeking = false;
    cx.state.current_time = time;
    if cx.state.ended && (!cx.state.has_duration() || time < cx.state.duration) {
        cx.state.ended = false;
        if *cx.phase == SessionPhase::Ended {
            cx.transition(SessionPhase::Paused);
        }
    }
    cx.emit(EventType::TimeUpdate);
    cx.emit(EventType::Seeked);
    cx.emit(EventType::CanPlay);
    cx.emit(EventType::CanPlayThrough);
}

/// Seek confirmations closer than this to the target belong to it
const SEEK_TOLERANCE: f64 = 1e-3;

/// Seeks issued to a backend that have not been confirmed yet.
///
/// A seek issued while another is in flight supersedes it. Backends that
/// still confirm the superseded target only move the position; the post-seek
/// sequence fires once, for the latest target.
#[derive(Debug, Default)]
pub(crate) struct SeekTracker {
    outstanding: usize,
    target: Option<f64>,
}

impl SeekTracker {
    pub fn issue(&mut self, time: f64, cx: &mut AdapterContext<'_>) {
        self.outstanding += 1;
        self.target = Some(time);
        begin_seek(cx);
    }

    pub fn confirm(&mut self, time: f64, cx: &mut AdapterContext<'_>) {
        let superseded = self.outstanding > 1
            && self.target.is_some_and(|target| (target - time).abs() > SEEK_TOLERANCE);
        if superseded {
            self.outstanding -= 1;
            trace!(time, latest = ?self.target, "Superseded seek confirmed");
            cx.state.current_time = time;
            return;
        }
        self.outstanding = 0;
        self.target = None;
        confirm_seek(cx, time);
    }
}

/// Playback requested or acknowledged
pub(crate) fn mark_play(cx: &mut AdapterContext<'_>) {
    if cx.state.paused {
        cx.state.paused = false;
        cx.state.ended = false;
        cx.emit(EventType::Play);
    }
}

/// Playback actually running
pub(crate) fn mark_playing(cx: &mut AdapterContext<'_>) {
    mark_play(cx);
    if cx.transition(SessionPhase::Playing) {
        cx.emit(EventType::Playing);
    }
}

pub(crate) fn mark_paused(cx: &mut AdapterContext<'_>) {
    if !cx.state.paused {
        cx.state.paused = true;
        cx.transition(SessionPhase::Paused);
        cx.emit(EventType::Pause);
    }
}

pub(crate) fn mark_ended(cx: &mut AdapterContext<'_>) {
    mark_paused(cx);
    if !cx.state.ended {
        cx.state.ended = true;
        cx.transition(SessionPhase::Ended);
        cx.emit(EventType::Ended);
    }
}

/// Update the position from a backend time report
pub(crate) fn time_update(cx: &mut AdapterContext<'_>, time: f64) {
    if cx.state.current_time != time {
        cx.state.current_time = time;
        cx.emit(EventType::TimeUpdate);
    }
}

/// Classify a backend error code; unmapped codes are non-fatal
pub(crate) fn classify_error(
    cx: &AdapterContext<'_>,
    backend: BackendKind,
    code: &str,
    message: &str,
) -> SignalOutcome {
    match cx.error_map.classify(backend, code) {
        Some(kind) => SignalOutcome::Failed(MediaError::new(kind, format!("{} ({})", message, code))),
        None => SignalOutcome::Handled,
    }
}

/// Quality levels held back until metadata has been announced
#[derive(Debug, Default)]
pub(crate) struct LevelPublisher {
    pending: Option<Vec<NativeLevel>>,
    table: QualityTable,
}

impl LevelPublisher {
    pub fn table(&self) -> &QualityTable {
        &self.table
    }

    pub fn offer(&mut self, levels: Vec<NativeLevel>, cx: &mut AdapterContext<'_>) -> bool {
        self.pending = Some(levels);
        self.flush(cx)
    }

    /// Publish pending levels once `loadedmetadata` has fired.
    ///
    /// Returns true when a different table replaced the previous one.
    pub fn flush(&mut self, cx: &mut AdapterContext<'_>) -> bool {
        if cx.state.ready_state < crate::types::ReadyState::HaveMetadata {
            return false;
        }
        let Some(levels) = self.pending.take() else {
            return false;
        };
        let table = QualityTable::from_native(&levels);
        if table == self.table {
            return false;
        }
        self.table = table;
        if !self.table.is_empty() {
            cx.emit(EventType::BitrateLoaded);
        }
        true
    }

    /// Whether a pinned selection fell out of the published table
    pub fn orphans(&self, current: Quality) -> bool {
        current != Quality::Auto && !self.table.contains(current)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Owns everything an [`AdapterContext`] borrows
    pub struct Harness {
        pub state: PlaybackState,
        pub phase: SessionPhase,
        pub error_map: ErrorMap,
        pub looping: bool,
        pub events: EventBatch,
    }

    impl Harness {
        pub fn new() -> Self {
            Self {
                state: PlaybackState::default(),
                phase: SessionPhase::Empty,
                error_map: ErrorMap::default(),
                looping: false,
                events: EventBatch::new(),
            }
        }

        pub fn cx(&mut self) -> AdapterContext<'_> {
            AdapterContext::new(
                &mut self.state,
                &mut self.phase,
                &self.error_map,
                self.looping,
                &mut self.events,
            )
        }

        /// Event types recorded since the last call
        pub fn take(&mut self) -> Vec<EventType> {
            std::mem::take(&mut self.events).types()
        }
    }
}
