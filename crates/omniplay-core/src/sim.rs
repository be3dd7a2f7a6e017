//! Scripted backends
//!
//! Deterministic, headless stand-ins for the five backend runtimes. Each
//! player records the calls it receives and, unless the script turns it
//! off, answers them the way the real runtime would: metadata after a
//! load, acknowledgments after play, pause and seek. Failures are injected
//! per backend kind.

use crate::{
    activator::Activator,
    backend::{
        BackendKind, BackendPlayer, BackendRuntime, BackendSignal, DashEngine, DashEvent,
        ElementEvent, HlsEngine, HlsEvent, NativeMedia, PlayerOptions, RuntimeLoader, SignalSink,
        VimeoEvent, VimeoPlayer, Vr360Event, Vr360Player,
    },
    error::{Error, Result},
    quality::NativeLevel,
    source::HLS_MIME_TYPE,
    types::TimeRanges,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// What the scripted players report
#[derive(Debug, Clone)]
pub struct SimScript {
    /// Media duration in seconds
    pub duration: f64,
    /// Levels reported by the streaming engines
    pub levels: Vec<NativeLevel>,
    /// Answer calls with the events a real runtime would fire
    pub auto_respond: bool,
}

impl Default for SimScript {
    fn default() -> Self {
        Self {
            duration: 60.0,
            levels: vec![
                NativeLevel::new(0).with_resolution(640, 360).with_bitrate(800_000),
                NativeLevel::new(1).with_resolution(1280, 720).with_bitrate(2_500_000),
                NativeLevel::new(2).with_resolution(1920, 1080).with_bitrate(5_000_000),
            ],
            auto_respond: true,
        }
    }
}

impl SimScript {
    /// Players stay silent; every event is injected by the caller
    pub fn manual() -> Self {
        Self {
            auto_respond: false,
            ..Default::default()
        }
    }
}

/// One call received by a scripted player
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimCall {
    pub backend: BackendKind,
    pub call: String,
}

/// Network error code each backend reports for a failed fetch
pub fn network_error_code(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Native => "2",
        BackendKind::Dash => "27",
        BackendKind::Hls => "networkError",
        BackendKind::Vimeo => "NotFoundError",
        BackendKind::Vr360 => "NetworkError",
    }
}

#[derive(Default)]
struct SimState {
    load_counts: HashMap<BackendKind, usize>,
    load_failures: HashSet<BackendKind>,
    unsupported: HashSet<BackendKind>,
    playback_failures: HashMap<BackendKind, String>,
    native_hls: bool,
    calls: Vec<SimCall>,
    sinks: HashMap<BackendKind, SignalSink>,
}

struct Shared {
    script: SimScript,
    state: Mutex<SimState>,
    gates: HashMap<BackendKind, watch::Sender<bool>>,
}

impl Shared {
    fn record(&self, backend: BackendKind, call: impl Into<String>) {
        let call = call.into();
        debug!(backend = %backend, call = %call, "Scripted call");
        self.state.lock().calls.push(SimCall { backend, call });
    }

    fn playback_failure(&self, backend: BackendKind) -> Option<String> {
        self.state.lock().playback_failures.get(&backend).cloned()
    }
}

/// Handle to the scripted runtimes and their injected behavior
#[derive(Clone)]
pub struct SimBackends {
    shared: Arc<Shared>,
}

impl SimBackends {
    pub fn new() -> Self {
        Self::with_script(SimScript::default())
    }

    pub fn with_script(script: SimScript) -> Self {
        let gates = BackendKind::ALL
            .iter()
            .map(|kind| (*kind, watch::channel(true).0))
            .collect();
        Self {
            shared: Arc::new(Shared {
                script,
                state: Mutex::new(SimState::default()),
                gates,
            }),
        }
    }

    /// Activator with every scripted runtime registered
    pub fn activator(&self) -> Arc<Activator> {
        self.activator_for(&BackendKind::ALL)
    }

    /// Activator with only the given runtimes registered
    pub fn activator_for(&self, kinds: &[BackendKind]) -> Arc<Activator> {
        let activator = Activator::new();
        for kind in kinds {
            activator.register(Arc::new(SimLoader {
                kind: *kind,
                shared: self.shared.clone(),
            }));
        }
        Arc::new(activator)
    }

    /// Runtime load for `kind` fails with a network error
    pub fn fail_load(&self, kind: BackendKind) {
        self.shared.state.lock().load_failures.insert(kind);
    }

    /// Runtime for `kind` loads but reports itself unsupported
    pub fn set_unsupported(&self, kind: BackendKind) {
        self.shared.state.lock().unsupported.insert(kind);
    }

    /// Players of `kind` report a fatal error with `code` when loading media
    pub fn fail_playback(&self, kind: BackendKind, code: impl Into<String>) {
        self.shared.state.lock().playback_failures.insert(kind, code.into());
    }

    /// The native runtime claims it can play HLS playlists
    pub fn set_native_hls(&self, enabled: bool) {
        self.shared.state.lock().native_hls = enabled;
    }

    /// Block runtime loads of `kind` until [`release`](Self::release)
    pub fn hold(&self, kind: BackendKind) {
        if let Some(gate) = self.shared.gates.get(&kind) {
            gate.send_replace(false);
        }
    }

    pub fn release(&self, kind: BackendKind) {
        if let Some(gate) = self.shared.gates.get(&kind) {
            gate.send_replace(true);
        }
    }

    /// Number of runtime loads started for `kind`
    pub fn load_count(&self, kind: BackendKind) -> usize {
        self.shared.state.lock().load_counts.get(&kind).copied().unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<SimCall> {
        self.shared.state.lock().calls.clone()
    }

    pub fn calls_for(&self, kind: BackendKind) -> Vec<String> {
        self.shared
            .state
            .lock()
            .calls
            .iter()
            .filter(|c| c.backend == kind)
            .map(|c| c.call.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.shared.state.lock().calls.clear();
    }

    /// Send a native event through the most recent player of `kind`
    pub fn inject(&self, kind: BackendKind, signal: impl Into<BackendSignal>) -> bool {
        let sink = self.shared.state.lock().sinks.get(&kind).cloned();
        match sink {
            Some(sink) => sink.send(signal),
            None => false,
        }
    }
}

impl Default for SimBackends {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Runtimes
// ============================================================================

struct SimLoader {
    kind: BackendKind,
    shared: Arc<Shared>,
}

#[async_trait]
impl RuntimeLoader for SimLoader {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn load(&self) -> Result<Arc<dyn BackendRuntime>> {
        *self.shared.state.lock().load_counts.entry(self.kind).or_default() += 1;

        let mut gate = self
            .shared
            .gates
            .get(&self.kind)
            .map(|gate| gate.subscribe())
            .ok_or_else(|| Error::Internal(format!("no gate for {}", self.kind)))?;

        tokio::task::yield_now().await;
        let opened = gate.wait_for(|open| *open).await.is_ok();
        if !opened {
            return Err(Error::Network(format!("{} runtime load abandoned", self.kind)));
        }

        if self.shared.state.lock().load_failures.contains(&self.kind) {
            return Err(Error::Network(format!("failed to fetch the {} runtime", self.kind)));
        }

        Ok(Arc::new(SimRuntime {
            kind: self.kind,
            shared: self.shared.clone(),
        }))
    }
}

struct SimRuntime {
    kind: BackendKind,
    shared: Arc<Shared>,
}

impl BackendRuntime for SimRuntime {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn is_supported(&self) -> bool {
        !self.shared.state.lock().unsupported.contains(&self.kind)
    }

    fn can_play_type(&self, mime_type: &str) -> bool {
        if self.kind != BackendKind::Native {
            return false;
        }
        if mime_type == HLS_MIME_TYPE {
            return self.shared.state.lock().native_hls;
        }
        mime_type.starts_with("video/") || mime_type.starts_with("audio/")
    }

    fn create(&self, options: &PlayerOptions, sink: SignalSink) -> Result<BackendPlayer> {
        self.shared
            .record(self.kind, format!("create({})", options.mount_id));
        self.shared.state.lock().sinks.insert(self.kind, sink.clone());

        let port = Port {
            kind: self.kind,
            shared: self.shared.clone(),
            sink,
        };
        let player = match self.kind {
            BackendKind::Native => BackendPlayer::Native(Box::new(SimMedia::new(port, BackendSignal::Native))),
            BackendKind::Hls => BackendPlayer::Hls(Box::new(SimHls {
                media: SimMedia::new(port.clone(), |event| HlsEvent::Media(event).into()),
                port,
            })),
            BackendKind::Dash => BackendPlayer::Dash(Box::new(SimDash {
                media: SimMedia::new(port.clone(), |event| DashEvent::Media(event).into()),
                port,
            })),
            BackendKind::Vimeo => BackendPlayer::Vimeo(Box::new(SimVimeo { port })),
            BackendKind::Vr360 => BackendPlayer::Vr360(Box::new(SimVr360 { port })),
        };
        Ok(player)
    }
}

// ============================================================================
// Players
// ============================================================================

/// Call log and event channel shared by one player
#[derive(Clone)]
struct Port {
    kind: BackendKind,
    shared: Arc<Shared>,
    sink: SignalSink,
}

impl Port {
    fn record(&self, call: impl Into<String>) {
        self.shared.record(self.kind, call);
    }

    fn auto(&self) -> bool {
        self.shared.script.auto_respond
    }

    fn duration(&self) -> f64 {
        self.shared.script.duration
    }

    fn failure(&self) -> Option<String> {
        self.shared.playback_failure(self.kind)
    }

    fn emit(&self, signal: impl Into<BackendSignal>) {
        self.sink.send(signal);
    }
}

/// Media element, standalone or inside a streaming engine
struct SimMedia {
    port: Port,
    wrap: fn(ElementEvent) -> BackendSignal,
    current_time: f64,
    volume: f64,
    muted: bool,
    loaded: bool,
}

impl SimMedia {
    fn new(port: Port, wrap: fn(ElementEvent) -> BackendSignal) -> Self {
        Self {
            port,
            wrap,
            current_time: 0.0,
            volume: 1.0,
            muted: false,
            loaded: false,
        }
    }

    fn emit(&self, event: ElementEvent) {
        self.port.emit((self.wrap)(event));
    }

    /// Fire the metadata and readiness sequence of a successful load
    fn announce_ready(&mut self) {
        let duration = self.port.duration();
        self.loaded = true;
        self.emit(ElementEvent::LoadStart);
        self.emit(ElementEvent::DurationChange { duration });
        self.emit(ElementEvent::LoadedMetadata { duration });
        self.emit(ElementEvent::LoadedData);
        self.emit(ElementEvent::CanPlay);
        self.emit(ElementEvent::CanPlayThrough);
        self.emit(ElementEvent::Progress);
    }
}

impl NativeMedia for SimMedia {
    fn set_src(&mut self, uri: &str, mime_type: Option<&str>) {
        self.port
            .record(format!("set_src({}, {})", uri, mime_type.unwrap_or("-")));
    }

    fn load(&mut self) {
        self.port.record("load");
        if !self.port.auto() {
            return;
        }
        // Engine-owned elements fail through their engine
        if self.port.kind == BackendKind::Native {
            if let Some(code) = self.port.failure() {
                self.emit(ElementEvent::Error {
                    code: code.parse().unwrap_or(4),
                    message: "scripted playback failure".into(),
                });
                return;
            }
        }
        self.announce_ready();
    }

    fn play(&mut self) {
        self.port.record("play");
        if !self.port.auto() {
            return;
        }
        if self.current_time >= self.port.duration() {
            self.set_current_time(0.0);
        }
        self.emit(ElementEvent::Play);
        self.emit(ElementEvent::Playing);
    }

    fn pause(&mut self) {
        self.port.record("pause");
        if self.port.auto() {
            self.emit(ElementEvent::Pause);
        }
    }

    fn set_current_time(&mut self, time: f64) {
        self.port.record(format!("set_current_time({})", time));
        self.current_time = time;
        if self.port.auto() {
            self.emit(ElementEvent::Seeking);
            self.emit(ElementEvent::Seeked { current_time: time });
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.port.record(format!("set_volume({})", volume));
        self.volume = volume;
        if self.port.auto() {
            self.emit(ElementEvent::VolumeChange {
                volume,
                muted: self.muted,
            });
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.port.record(format!("set_muted({})", muted));
        self.muted = muted;
        if self.port.auto() {
            self.emit(ElementEvent::VolumeChange {
                volume: self.volume,
                muted,
            });
        }
    }

    fn set_loop(&mut self, looping: bool) {
        self.port.record(format!("set_loop({})", looping));
    }

    fn buffered(&self) -> TimeRanges {
        if self.loaded {
            TimeRanges::from_zero(self.port.duration())
        } else {
            TimeRanges::default()
        }
    }

    fn remove(&mut self) {
        self.port.record("remove");
    }
}

struct SimHls {
    port: Port,
    media: SimMedia,
}

impl HlsEngine for SimHls {
    fn set_start_level(&mut self, level: i32) {
        self.port.record(format!("set_start_level({})", level));
    }

    fn load_source(&mut self, url: &str) {
        self.port.record(format!("load_source({})", url));
        if !self.port.auto() {
            return;
        }
        if let Some(code) = self.port.failure() {
            self.port.emit(HlsEvent::Error {
                error_type: code,
                details: "manifestLoadError".into(),
                fatal: true,
            });
            return;
        }
        self.port.emit(HlsEvent::ManifestParsed {
            levels: self.port.shared.script.levels.clone(),
        });
        self.media.announce_ready();
    }

    fn attach_media(&mut self) {
        self.port.record("attach_media");
    }

    fn set_current_level(&mut self, level: i32) {
        self.port.record(format!("set_current_level({})", level));
        if self.port.auto() {
            if let Ok(level) = usize::try_from(level) {
                self.port.emit(HlsEvent::LevelSwitched { level });
            }
        }
    }

    fn media(&mut self) -> &mut dyn NativeMedia {
        &mut self.media
    }

    fn detach_media(&mut self) {
        self.port.record("detach_media");
    }

    fn destroy(&mut self) {
        self.port.record("destroy");
    }
}

struct SimDash {
    port: Port,
    media: SimMedia,
}

impl DashEngine for SimDash {
    fn initialize(&mut self, url: &str, autoplay: bool) {
        self.port.record(format!("initialize({}, {})", url, autoplay));
        if !self.port.auto() {
            return;
        }
        if let Some(code) = self.port.failure() {
            self.port.emit(DashEvent::Error {
                code: code.parse().unwrap_or(27),
                message: "scripted manifest failure".into(),
            });
            return;
        }
        self.port.emit(DashEvent::StreamInitialized);
        self.media.announce_ready();
    }

    fn bitrate_info_list(&self) -> Vec<NativeLevel> {
        self.port.shared.script.levels.clone()
    }

    fn set_auto_switch_quality(&mut self, enabled: bool) {
        self.port.record(format!("set_auto_switch_quality({})", enabled));
    }

    fn set_quality_for(&mut self, quality_index: usize) {
        self.port.record(format!("set_quality_for({})", quality_index));
        if self.port.auto() {
            self.port.emit(DashEvent::QualityChangeRendered { quality_index });
        }
    }

    fn media(&mut self) -> &mut dyn NativeMedia {
        &mut self.media
    }

    fn reset(&mut self) {
        self.port.record("reset");
    }
}

struct SimVimeo {
    port: Port,
}

impl VimeoPlayer for SimVimeo {
    fn load_video(&mut self, video_id: u64) {
        self.port.record(format!("load_video({})", video_id));
        if !self.port.auto() {
            return;
        }
        match self.port.failure() {
            Some(name) => self.port.emit(VimeoEvent::Error {
                name,
                message: "scripted embed failure".into(),
            }),
            None => self.port.emit(VimeoEvent::Ready),
        }
    }

    fn play(&mut self) {
        self.port.record("play");
        if self.port.auto() {
            self.port.emit(VimeoEvent::Play);
        }
    }

    fn pause(&mut self) {
        self.port.record("pause");
        if self.port.auto() {
            self.port.emit(VimeoEvent::Pause);
        }
    }

    fn set_current_time(&mut self, time: f64) {
        self.port.record(format!("set_current_time({})", time));
        if self.port.auto() {
            self.port.emit(VimeoEvent::Seeked { seconds: time });
        }
    }

    fn set_volume(&mut self, volume: f64) {
        self.port.record(format!("set_volume({})", volume));
        if self.port.auto() {
            self.port.emit(VimeoEvent::VolumeChange { volume });
        }
    }

    fn request_duration(&mut self) {
        self.port.record("request_duration");
        if self.port.auto() {
            self.port.emit(VimeoEvent::Duration(self.port.duration()));
        }
    }

    fn unload(&mut self) {
        self.port.record("unload");
    }
}

struct SimVr360 {
    port: Port,
}

impl Vr360Player for SimVr360 {
    fn load(&mut self, url: &str) {
        self.port.record(format!("load({})", url));
        if !self.port.auto() {
            return;
        }
        match self.port.failure() {
            Some(code) => self.port.emit(Vr360Event::Error {
                code,
                message: "scripted embed failure".into(),
            }),
            None => self.port.emit(Vr360Event::Ready {
                duration: self.port.duration(),
            }),
        }
    }

    fn play(&mut self) {
        self.port.record("play");
        if self.port.auto() {
            self.port.emit(Vr360Event::Play);
        }
    }

    fn pause(&mut self) {
        self.port.record("pause");
        if self.port.auto() {
            self.port.emit(Vr360Event::Pause);
        }
    }

    fn set_current_time(&mut self, time: f64) {
        self.port.record(format!("set_current_time({})", time));
    }

    fn set_volume(&mut self, volume: f64) {
        self.port.record(format!("set_volume({})", volume));
    }

    fn mute(&mut self, muted: bool) {
        self.port.record(format!("mute({})", muted));
    }

    fn stop(&mut self) {
        self.port.record("stop");
    }
}
