//! DASH playback through the DASH engine

use super::{
    classify_error, AdapterContext, ElementBridge, LevelPublisher, PlaybackAdapter,
    SignalOutcome,
};
use crate::{
    backend::{BackendKind, BackendSignal, DashEngine, DashEvent},
    error::Result,
    quality::{Quality, QualityTable},
    source::Candidate,
    types::{NetworkState, PlaybackState, SessionPhase, TimeRanges},
};
use tracing::{debug, info};

pub struct DashAdapter {
    engine: Box<dyn DashEngine>,
    bridge: ElementBridge,
    levels: LevelPublisher,
    current: Quality,
    released: bool,
}

impl DashAdapter {
    pub fn new(engine: Box<dyn DashEngine>) -> Self {
        Self {
            engine,
            bridge: ElementBridge::new(),
            levels: LevelPublisher::default(),
            current: Quality::Auto,
            released: false,
        }
    }

    fn handle_engine(&mut self, event: DashEvent, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match event {
            DashEvent::StreamInitialized => {
                let levels = self.engine.bitrate_info_list();
                debug!(levels = levels.len(), "DASH stream initialized");
                let published = self.levels.offer(levels, cx);
                self.reconcile_quality(published);
                SignalOutcome::Handled
            }
            DashEvent::QualityChangeRendered { quality_index } => {
                debug!(quality_index, selection = %self.current, "DASH quality rendered");
                SignalOutcome::Handled
            }
            DashEvent::Error { code, message } => {
                classify_error(cx, BackendKind::Dash, &code.to_string(), &message)
            }
            DashEvent::Media(event) => {
                let outcome = self.bridge.handle(event, cx);
                let published = self.levels.flush(cx);
                self.reconcile_quality(published);
                outcome
            }
        }
    }

    fn reconcile_quality(&mut self, published: bool) {
        if published && self.levels.orphans(self.current) {
            info!(quality = %self.current, "Pinned DASH quality withdrawn; back to auto");
            self.engine.set_auto_switch_quality(true);
            self.current = Quality::Auto;
        }
    }
}

impl PlaybackAdapter for DashAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Dash
    }

    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()> {
        info!(uri = %candidate.locator, "DASH source");
        let media = self.engine.media();
        media.set_volume(cx.state.volume);
        media.set_muted(cx.state.muted);
        media.set_loop(cx.looping);
        cx.state.network_state = NetworkState::Loading;
        cx.transition(SessionPhase::Loading);
        // Autoplay is driven by the element once the session is playable
        self.engine.initialize(&candidate.locator, false);
        Ok(())
    }

    fn play(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if cx.state.paused {
            self.engine.media().play();
        }
        Ok(())
    }

    fn pause(&mut self, cx: &mut AdapterContext<'_>) -> Result<()> {
        if !cx.state.paused {
            self.engine.media().pause();
        }
        Ok(())
    }

    fn seek(&mut self, time: f64, cx: &mut AdapterContext<'_>) -> Result<()> {
        self.bridge.seek(time, cx);
        self.engine.media().set_current_time(time);
        Ok(())
    }

    fn backend_volume(&mut self, volume: f64) {
        self.engine.media().set_volume(volume);
    }

    fn backend_mute(&mut self, muted: bool) -> bool {
        self.engine.media().set_muted(muted);
        true
    }

    fn quality_table(&self) -> &QualityTable {
        self.levels.table()
    }

    fn current_quality(&self) -> Quality {
        self.current
    }

    fn set_quality(&mut self, quality: Quality, _cx: &mut AdapterContext<'_>) -> Result<()> {
        match quality {
            Quality::Auto => self.engine.set_auto_switch_quality(true),
            Quality::Level(index) => {
                self.engine.set_auto_switch_quality(false);
                self.engine.set_quality_for(index);
            }
        }
        info!(quality = %quality, "DASH quality selected");
        self.current = quality;
        Ok(())
    }

    fn set_loop(&mut self, looping: bool) {
        self.engine.media().set_loop(looping);
    }

    fn buffered(&mut self, _state: &PlaybackState) -> TimeRanges {
        self.engine.media().buffered()
    }

    fn handle_signal(&mut self, signal: BackendSignal, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match signal {
            BackendSignal::Dash(event) => self.handle_engine(event, cx),
            other => {
                debug!(signal = ?other, "Foreign signal ignored by DASH adapter");
                SignalOutcome::Handled
            }
        }
    }

    fn teardown(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.engine.media().pause();
        self.engine.reset();
        debug!("DASH engine reset");
    }
}
