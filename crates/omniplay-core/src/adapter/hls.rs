//! HLS playback through the HLS engine

use super::{
    classify_error, AdapterContext, ElementBridge, LevelPublisher, PlaybackAdapter,
    SignalOutcome,
};
use crate::{
    backend::{BackendKind, BackendSignal, HlsEngine, HlsEvent, HLS_AUTO_LEVEL},
    error::{Error, Result},
    quality::{Quality, QualityTable},
    source::Candidate,
    types::{NetworkState, PlaybackState, SessionPhase, TimeRanges},
};
use tracing::{debug, info};

pub struct HlsAdapter {
    engine: Box<dyn HlsEngine>,
    bridge: ElementBridge,
    levels: LevelPublisher,
    current: Quality,
    start_level: i32,
    released: bool,
}

impl HlsAdapter {
    pub fn new(engine: Box<dyn HlsEngine>, start_level: i32) -> Self {
        Self {
            engine,
            bridge: ElementBridge::new(),
            levels: LevelPublisher::default(),
            current: Quality::Auto,
            start_level,
            released: false,
        }
    }

    fn handle_engine(&mut self, event: HlsEvent, cx: &mut AdapterContext<'_>) -> SignalOutcome {
        match event {
            HlsEvent::ManifestParsed { levels } => {
                debug!(levels = levels.len(), "HLS manifest parsed");
                let published = self.levels.offer(levels, cx);
                self.reconcile_quality(published);
                SignalOutcome::Handled
            }
            HlsEvent::LevelSwitched { level } => {
                debug!(level, selection = %self.current, "HLS level switched");
                SignalOutcome::Handled
            }
            HlsEvent::Error {
                error_type,
                details,
                fatal,
            } => {
                if !fatal {
                    // The engine recovers from these by itself
                    debug!(%error_type, %details, "Non-fatal HLS error");
                    return SignalOutcome::Handled;
                }
                classify_error(cx, BackendKind::Hls, &error_type, &details)
            }
            HlsEvent::Media(event) => {
                let outcome = self.bridge.handle(event, cx);
                let published = self.levels.flush(cx);
                self.reconcile_quality(published);
                outcome
            }
        }
    }

    /// A new level list may no longer offer the pinned level
    fn reconcile_quality(&mut self, published: bool) {
        if published && self.levels.orphans(self.current) {
            info!(quality = %self.current, "Pinned HLS level withdrawn; back to auto");
            self.engine.set_current_level(HLS_AUTO_LEVEL);
            self.current = Quality::Auto;
        }
    }
}

impl PlaybackAdapter for HlsAdapter {
    fn kind(&self) -> BackendKind {
        BackendKind::Hls
    }

    fn set_source(&mut self, candidate: &Candidate, cx: &mut AdapterContext<'_>) -> Result<()> {
        info!(uri = %candidate.locator, start_level = self.start_level, "HLS source");
        self.engine.set_start_level(self.start_level);
        self.engine.attach_media();
        let media = self.engine.media();
        media.set_volume(cx.state.volume);
        media.set_muted(cx.state.muted);
        media.set_loop(cx.looping);
        cx.state.network_state = NetworkState::Loading;
        cx.transition(SessionPhase::Loading);
        self.engine.load_source(&candidate.locator);
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
        let level = match quality {
            Quality::Auto => HLS_AUTO_LEVEL,
            Quality::Level(index) => i32::try_from(index)
                .map_err(|_| Error::invalid_argument(format!("level {} out of range", index)))?,
        };
        info!(quality = %quality, level, "HLS level selected");
        self.engine.set_current_level(level);
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
            BackendSignal::Hls(event) => self.handle_engine(event, cx),
            other => {
                debug!(signal = ?other, "Foreign signal ignored by HLS adapter");
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
        self.engine.detach_media();
        self.engine.destroy();
        debug!("HLS engine destroyed");
    }
}
