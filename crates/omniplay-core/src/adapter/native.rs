//! Progressive playback through the native media element

use super::{AdapterContext, ElementBridge, PlaybackAdapter, SignalOutcome};
use crate::{
    backend::{BackendKind, BackendSignal, NativeMedia},
    error::Result,
    quality::QualityTable,
    source::Candidate,
    types::{NetworkState, PlaybackState, SessionPhase, TimeRanges},
};
use tracing::{debug, info};

pub struct NativeAdapter {
    media: Box<dyn NativeMedia>,
    bridge: ElementBridge,
    table: QualityTable,
    released: bool,
}

impl NativeAdapter {
    pub fn new(media: Box<dyn NativeMedia>) -> Self {
        Self {
            media,
            bridge: ElementBridge::new(),
            table: QualityTable::empty(),
            released: false,
        }
    }
}

impl PlaybackAdapter for NativeAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()> {
        info!(uri = %candidate.uri, mime = ?candidate.mime_type, "Native source");
        // The element honors `#t=` itself, so the annotated uri is passed through
        self.media.set_src(&candidate.uri, candidate.mime_type);
        self.media.set_loop(cx.looping);
        self.media.set_volume(cx.state.volume);
        self.media.set_muted(cx.state.muted);
        cx.state.network_state = NetworkState::Loading;
        cx.transition(SessionPhase::Loading);
        self.media.load();
        Ok(())
    }

    fn play(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if !cx.state.paused {
            return Ok(());
        }
        self.media.play();
        Ok(())
    }

    fn pause(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if cx.state.paused {
            return Ok(());
        }
        self.media.pause();
        Ok(())
    }

    fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) -> Result<()> {
        self.bridge.seek(time, cx);
        self.media.set_current_time(time);
        Ok(())
    }

    fn backend_volume(&mut self, volume: f64) {
        self.media.set_volume(volume);
    }

    fn backend_mute(&mut self, muted: bool) -> bool {
        self.media.set_muted(muted);
        true
    }

    fn quality_table(&self) -> &QualityTable {
        &self.table
    }

    fn set_loop(&mut self, looping: bool) {
        self.media.set_loop(looping);
    }

    fn buffered(&mut self, _state: &PlaybackState) -> TimeRanges {
        self.media.buffered()
    }

    fn handle_signal(&mut self, signal: BackendSignal, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match signal {
            BackendSignal::Native(event) => self.bridge.handle(event, cx),
            other => {
                debug!(signal = ?other, "Foreign signal ignored by native adapter");
                SignalOutcome::Handled
            }
        }
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.media.pause();
        self.media.remove();
        debug!("Native element released");
    }
}
