//! Media element - the uniform host surface
//!
//! Coordinates:
//! - Source parsing and the fallback plan
//! - Backend activation with generation checks
//! - Session lifecycle and mount point ownership
//! - Canonical state and event dispatch
//!
//! Backend players report through a channel tagged with the session
//! generation. Signals from a torn down session are dropped on arrival.

use crate::{
    activator::Activator,
    adapter::{create_adapter, AdapterContext, PlaybackAdapter, SignalOutcome},
    backend::{BackendKind, BackendRuntime, MountPoint, PlayerOptions, SignalSink, TaggedSignal},
    config::MediaConfig,
    error::{Error, ErrorKind, MediaError, Result},
    events::{EventBatch, EventHub, EventType, Listener, MediaEvent},
    fallback::{AttemptRecord, FallbackCoordinator, PlannedAttempt},
    quality::{Quality, QualityController, QualityTable},
    source::{self, CanPlay, Candidate, CandidateKind, ParseOptions, HLS_MIME_TYPE},
    types::{
        Generation, Namespace, NetworkState, PlaybackState, ReadyState, SessionPhase, TimeRanges,
    },
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, instrument, warn};

type Outbox = Vec<(EventType, PlaybackState)>;

/// Active backend session
struct Session {
    /// Backend the fallback plan attempted (differs from the adapter on the native HLS path)
    planned: BackendKind,
    candidate: Candidate,
    adapter: Box<dyn PlaybackAdapter>,
}

struct Inner {
    config: MediaConfig,
    src: String,
    state: PlaybackState,
    phase: SessionPhase,
    generation: Generation,
    coordinator: Option<FallbackCoordinator>,
    session: Option<Session>,
    mount: MountPoint,
    /// `play()` requested before the session was playable
    pending_play: bool,
    disposed: bool,
}

enum Step {
    Attempt(PlannedAttempt),
    Stop,
}

impl Inner {
    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            media_type: self.config.media_type,
            time_fragments: self.config.time_fragments,
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            return Err(Error::InvalidState("media element has been disposed".into()));
        }
        Ok(())
    }

    fn set_phase(&mut self, next: SessionPhase) {
        if self.phase.can_transition_to(next) {
            self.phase = next;
        }
    }

    fn emit(&self, event: EventType, out: &mut Outbox) {
        out.push((event, self.state.clone()));
    }

    /// Run `f` against the live adapter; its events go out as one batch
    fn with_adapter<R>(
        &mut self,
        out: &mut Outbox,
        f: impl FnOnce(&mut dyn PlaybackAdapter, &mut AdapterContext<'_>) -> R,
    ) -> Option<R> {
        let session = self.session.as_mut()?;
        let mut batch = EventBatch::new();
        let result = {
            let mut cx = AdapterContext::new(
                &mut self.state,
                &mut self.phase,
                &self.config.error_map,
                self.config.looping,
                &mut batch,
            );
            f(session.adapter.as_mut(), &mut cx)
        };
        batch.append_to(out);
        Some(result)
    }

    fn teardown_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.adapter.teardown();
            info!(backend = %session.adapter.kind(), uri = %session.candidate.uri, "Session torn down");
        }
        self.mount.detach();
    }

    /// Surface a terminal error for the current source
    fn fail(&mut self, error: MediaError, out: &mut Outbox) {
        warn!(error = %error, src = %self.src, "Media error");
        self.teardown_session();
        self.pending_play = false;
        self.state.network_state = match error.kind {
            ErrorKind::SourceNotSupported => NetworkState::NoSource,
            _ => NetworkState::Idle,
        };
        self.state.seeking = false;
        self.state.error = Some(error);
        self.set_phase(SessionPhase::Errored);
        self.emit(EventType::Error, out);
    }

    fn next_step(&mut self, generation: Generation, out: &mut Outbox) -> Step {
        if self.generation != generation {
            return Step::Stop;
        }
        let Some(coordinator) = self.coordinator.as_mut() else {
            return Step::Stop;
        };
        match coordinator.next_attempt() {
            Some(planned) => Step::Attempt(planned),
            None => {
                info!(src = %self.src, "All candidates exhausted");
                self.fail(MediaError::source_not_supported(), out);
                Step::Stop
            }
        }
    }

    fn start_session(
        &mut self,
        runtime: Arc<dyn BackendRuntime>,
        planned: &PlannedAttempt,
        sink: SignalSink,
        out: &mut Outbox,
    ) -> Result<()> {
        let candidate = &planned.candidate;
        self.state.reset_for_source();
        self.phase = SessionPhase::Empty;
        self.mount.attach(sink.generation())?;

        if matches!(candidate.kind, CandidateKind::Vimeo | CandidateKind::Vr360) {
            if candidate.query_flag("autoplay") {
                self.config.autoplay = true;
            }
            if candidate.query_flag("loop") {
                self.config.looping = true;
            }
        }

        let options = PlayerOptions {
            mount_id: self.mount.id().to_string(),
            media_type: self.config.media_type,
            autoplay: self.config.autoplay,
            looping: self.config.looping,
            hls_start_level: self.config.hls_start_level,
        };
        let generation = sink.generation();
        let player = match runtime.create(&options, sink) {
            Ok(player) => player,
            Err(err) => {
                self.mount.detach();
                return Err(err);
            }
        };

        let mut adapter = create_adapter(player, &options);
        let mut batch = EventBatch::new();
        let started = {
            let mut cx = AdapterContext::new(
                &mut self.state,
                &mut self.phase,
                &self.config.error_map,
                self.config.looping,
                &mut batch,
            );
            adapter.set_source(candidate, &mut cx)
        };
        batch.append_to(out);

        if let Err(err) = started {
            adapter.teardown();
            self.mount.detach();
            return Err(err);
        }

        info!(
            backend = %adapter.kind(),
            uri = %candidate.uri,
            generation = %generation,
            mount = %self.mount.id(),
            "Session started"
        );
        self.session = Some(Session {
            planned: planned.backend,
            candidate: candidate.clone(),
            adapter,
        });
        Ok(())
    }

    fn on_signal(&mut self, tagged: TaggedSignal, out: &mut Outbox) -> Option<Generation> {
        if tagged.generation != self.generation || self.session.is_none() {
            debug!(signal_generation = %tagged.generation, current = %self.generation, "Stale backend signal dropped");
            return None;
        }

        let outcome = self.with_adapter(out, |adapter, cx| adapter.handle_signal(tagged.signal, cx))?;
        match outcome {
            SignalOutcome::Handled => None,
            SignalOutcome::Playable => {
                self.on_playable(out);
                None
            }
            SignalOutcome::Failed(error) => self.on_failure(error, out),
        }
    }

    /// First transition into `HAVE_FUTURE_DATA`
    fn on_playable(&mut self, out: &mut Outbox) {
        let start_offset = self.session.as_ref().and_then(|session| {
            // The native element applies `#t=` on its own
            if session.adapter.kind() == BackendKind::Native {
                return None;
            }
            session.candidate.start_offset.filter(|offset| *offset > 0.0)
        });
        if let Some(offset) = start_offset {
            debug!(offset, "Seeking to start offset");
            if let Some(Err(err)) = self.with_adapter(out, |adapter, cx| adapter.seek(offset, cx)) {
                warn!(error = %err, "Start offset seek failed");
            }
        }

        if self.config.autoplay || self.pending_play {
            self.pending_play = false;
            debug!(autoplay = self.config.autoplay, "Starting playback");
            if let Some(Err(err)) = self.with_adapter(out, |adapter, cx| adapter.play(cx)) {
                warn!(error = %err, "Deferred play failed");
            }
        }
    }

    fn on_failure(&mut self, error: MediaError, out: &mut Outbox) -> Option<Generation> {
        match error.kind {
            kind if kind.triggers_fallback() => {
                let backend = self.session.as_ref().map(|s| s.planned)?;
                info!(backend = %backend, error = %error, "Backend failed; falling back");
                self.pending_play |= !self.state.paused;
                if let Some(coordinator) = self.coordinator.as_mut() {
                    coordinator.record_failure(backend, kind);
                }
                self.teardown_session();
                self.generation = self.generation.next();
                self.state.reset_for_source();
                self.phase = SessionPhase::Empty;
                Some(self.generation)
            }
            ErrorKind::PlaybackAborted if self.state.paused => {
                debug!(error = %error, "Abort while not playing ignored");
                None
            }
            _ => {
                self.fail(error, out);
                None
            }
        }
    }
}

/// One logical media slot backed by whichever backend can play the source
pub struct MediaElement {
    namespace: Namespace,
    hub: Arc<EventHub>,
    activator: Arc<Activator>,
    inner: Mutex<Inner>,
    signal_tx: mpsc::UnboundedSender<TaggedSignal>,
    signal_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TaggedSignal>>,
    phase_tx: watch::Sender<SessionPhase>,
    pending: Mutex<VecDeque<(EventType, PlaybackState)>>,
    draining: AtomicBool,
}

impl MediaElement {
    /// Create an element dispatching through the process-wide hub
    pub fn new(config: MediaConfig, activator: Arc<Activator>) -> Self {
        Self::with_hub(config, activator, EventHub::global())
    }

    pub fn with_hub(config: MediaConfig, activator: Arc<Activator>, hub: Arc<EventHub>) -> Self {
        let namespace = Namespace::new();
        hub.register(namespace);

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (phase_tx, _) = watch::channel(SessionPhase::Empty);

        let state = PlaybackState {
            volume: config.volume,
            muted: config.muted,
            ..Default::default()
        };

        debug!(namespace = %namespace, "Media element created");

        Self {
            namespace,
            hub,
            activator,
            inner: Mutex::new(Inner {
                config,
                src: String::new(),
                state,
                phase: SessionPhase::Empty,
                generation: Generation::default(),
                coordinator: None,
                session: None,
                mount: MountPoint::new(),
                pending_play: false,
                disposed: false,
            }),
            signal_tx,
            signal_rx: tokio::sync::Mutex::new(signal_rx),
            phase_tx,
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Mutate under the lock, then deliver the produced events in order
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner, &mut Outbox) -> R) -> R {
        let (result, phase) = {
            let mut inner = self.inner.lock();
            let mut out = Vec::new();
            let result = f(&mut *inner, &mut out);
            // Queue while still locked so events keep mutation order
            self.pending.lock().extend(out);
            (result, inner.phase)
        };

        self.phase_tx.send_if_modified(|current| {
            if *current == phase {
                return false;
            }
            *current = phase;
            true
        });
        self.flush_events();
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Inner) -> R) -> R {
        f(&*self.inner.lock())
    }

    /// Deliver queued events. A listener that calls back into the element
    /// queues behind the events still being delivered.
    fn flush_events(&self) {
        loop {
            if self.draining.swap(true, Ordering::AcqRel) {
                return;
            }
            loop {
                let batch: Vec<_> = self.pending.lock().drain(..).collect();
                if batch.is_empty() {
                    break;
                }
                self.hub.dispatch(self.namespace, batch);
            }
            self.draining.store(false, Ordering::Release);
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    // ========================================================================
    // Source
    // ========================================================================

    pub fn src(&self) -> String {
        self.read(|inner| inner.src.clone())
    }

    /// URI of the candidate the active session plays
    pub fn current_src(&self) -> String {
        self.read(|inner| {
            inner
                .session
                .as_ref()
                .map(|session| session.candidate.uri.clone())
                .unwrap_or_default()
        })
    }

    /// Capability probe; never touches element state
    pub fn can_play_src(&self, raw: &str) -> CanPlay {
        let options = self.read(Inner::parse_options);
        source::can_play_src(raw, &options)
    }

    /// Assign a composite source and resolve it to a backend session.
    ///
    /// Resolution failures are reported through the `error` event and
    /// [`error`](Self::error), not through the returned result.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn set_src(&self, src: &str) -> Result<()> {
        let activator = self.activator.clone();
        let generation = self.with_inner(|inner, out| -> Result<Option<Generation>> {
            inner.ensure_live()?;
            inner.generation = inner.generation.next();
            inner.teardown_session();
            inner.coordinator = None;
            inner.pending_play = false;
            inner.src = src.to_string();
            inner.state.reset_for_source();
            inner.phase = SessionPhase::Empty;

            if src.trim().is_empty() {
                debug!("Source cleared");
                return Ok(None);
            }

            let spec = source::parse(src, &inner.parse_options());
            let coordinator = FallbackCoordinator::new(&spec, |kind| activator.supports(kind));
            if coordinator.is_empty() {
                inner.fail(MediaError::source_not_supported(), out);
                return Ok(None);
            }

            info!(src = %src, candidates = spec.candidates.len(), generation = %inner.generation, "Source assigned");
            inner.state.network_state = NetworkState::Loading;
            inner.coordinator = Some(coordinator);
            Ok(Some(inner.generation))
        })?;

        if let Some(generation) = generation {
            self.resolve(generation).await;
        }
        Ok(())
    }

    /// Walk the fallback plan until a session starts or the plan is exhausted
    async fn resolve(&self, mut generation: Generation) {
        loop {
            let planned = match self.with_inner(|inner, out| inner.next_step(generation, out)) {
                Step::Attempt(planned) => planned,
                Step::Stop => return,
            };

            let runtime = self.runtime_for(&planned).await;

            let started = self.with_inner(|inner, out| {
                if inner.generation != generation {
                    debug!(stale = %generation, current = %inner.generation, "Stale activation dropped");
                    return None;
                }
                inner.generation = inner.generation.next();
                generation = inner.generation;

                let result = runtime.and_then(|runtime| {
                    let sink = SignalSink::new(generation, self.signal_tx.clone());
                    inner.start_session(runtime, &planned, sink, out)
                });
                match result {
                    Ok(()) => Some(true),
                    Err(err) => {
                        let kind = err.kind().unwrap_or(ErrorKind::CapabilityError);
                        warn!(backend = %planned.backend, error = %err, "Candidate could not start");
                        if let Some(coordinator) = inner.coordinator.as_mut() {
                            coordinator.record_failure(planned.backend, kind);
                        }
                        Some(false)
                    }
                }
            });

            match started {
                Some(false) => continue,
                Some(true) | None => return,
            }
        }
    }

    /// Activate the runtime for an attempt, taking the native HLS path when
    /// the HLS engine cannot run here
    async fn runtime_for(&self, planned: &PlannedAttempt) -> Result<Arc<dyn BackendRuntime>> {
        let runtime = self.activator.activate(planned.backend).await?;
        if runtime.is_supported() {
            return Ok(runtime);
        }

        if planned.backend == BackendKind::Hls && self.activator.supports(BackendKind::Native) {
            let native = self.activator.activate(BackendKind::Native).await?;
            if native.can_play_type(HLS_MIME_TYPE) {
                info!(uri = %planned.candidate.uri, "HLS engine unsupported; playing playlist natively");
                return Ok(native);
            }
        }

        Err(Error::Capability(format!(
            "{} runtime is not supported in this environment",
            planned.backend
        )))
    }

    // ========================================================================
    // Backend signals
    // ========================================================================

    async fn handle_signal(&self, tagged: TaggedSignal) {
        if let Some(generation) = self.with_inner(|inner, out| inner.on_signal(tagged, out)) {
            self.resolve(generation).await;
        }
    }

    /// Handle every queued backend signal, including those queued while
    /// handling. Returns the number handled.
    pub async fn process_signals(&self) -> usize {
        let mut handled = 0;
        loop {
            let next = self.signal_rx.lock().await.try_recv().ok();
            let Some(tagged) = next else {
                return handled;
            };
            self.handle_signal(tagged).await;
            handled += 1;
        }
    }

    /// Wait for one backend signal and handle it
    pub async fn next_signal(&self) -> bool {
        let next = self.signal_rx.lock().await.recv().await;
        match next {
            Some(tagged) => {
                self.handle_signal(tagged).await;
                true
            }
            None => false,
        }
    }

    /// Handle backend signals until the element is disposed
    pub async fn run(&self) {
        while !self.is_disposed() && self.next_signal().await {}
    }

    // ========================================================================
    // Playback
    // ========================================================================

    pub fn play(&self) -> Result<()> {
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            if inner.phase == SessionPhase::Errored {
                return Err(Error::InvalidState("media element is in an error state".into()));
            }
            if inner.session.is_none() || !inner.phase.is_playable() {
                debug!(phase = %inner.phase, "Play deferred until playable");
                inner.pending_play = true;
                return Ok(());
            }
            inner.with_adapter(out, |adapter, cx| adapter.play(cx)).unwrap_or(Ok(()))
        })
    }

    pub fn pause(&self) -> Result<()> {
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            inner.pending_play = false;
            if !inner.phase.is_playable() {
                return Ok(());
            }
            inner.with_adapter(out, |adapter, cx| adapter.pause(cx)).unwrap_or(Ok(()))
        })
    }

    pub fn set_current_time(&self, time: f64) -> Result<()> {
        if !time.is_finite() || time < 0.0 {
            return Err(Error::invalid_argument(format!("cannot seek to {}", time)));
        }
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            if inner.session.is_none() || inner.state.ready_state < ReadyState::HaveMetadata {
                return Err(Error::InvalidState("no media loaded to seek in".into()));
            }
            let duration = inner.state.duration;
            let target = if duration.is_finite() { time.min(duration) } else { time };
            inner
                .with_adapter(out, |adapter, cx| adapter.seek(target, cx))
                .unwrap_or(Ok(()))
        })
    }

    pub fn current_time(&self) -> f64 {
        self.read(|inner| inner.state.current_time)
    }

    /// NaN until known
    pub fn duration(&self) -> f64 {
        self.read(|inner| inner.state.duration)
    }

    pub fn paused(&self) -> bool {
        self.read(|inner| inner.state.paused)
    }

    pub fn ended(&self) -> bool {
        self.read(|inner| inner.state.ended)
    }

    pub fn seeking(&self) -> bool {
        self.read(|inner| inner.state.seeking)
    }

    pub fn ready_state(&self) -> ReadyState {
        self.read(|inner| inner.state.ready_state)
    }

    pub fn network_state(&self) -> NetworkState {
        self.read(|inner| inner.state.network_state)
    }

    pub fn error(&self) -> Option<MediaError> {
        self.read(|inner| inner.state.error.clone())
    }

    pub fn buffered(&self) -> TimeRanges {
        self.with_inner(|inner, _| {
            let state = &inner.state;
            inner
                .session
                .as_mut()
                .map(|session| session.adapter.buffered(state))
                .unwrap_or_default()
        })
    }

    // ========================================================================
    // Volume
    // ========================================================================

    pub fn volume(&self) -> f64 {
        self.read(|inner| inner.state.volume)
    }

    /// Set the volume. Values outside `[0, 1]` are rejected and change nothing.
    pub fn set_volume(&self, volume: f64) -> Result<()> {
        let volume = crate::types::check_volume(volume)?;
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            if let Some(result) = inner.with_adapter(out, |adapter, cx| adapter.set_volume(volume, cx)) {
                return result;
            }
            if inner.state.volume != volume {
                inner.state.volume = volume;
                inner.emit(EventType::VolumeChange, out);
            }
            Ok(())
        })
    }

    pub fn muted(&self) -> bool {
        self.read(|inner| inner.state.muted)
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            if let Some(result) = inner.with_adapter(out, |adapter, cx| adapter.set_muted(muted, cx)) {
                return result;
            }
            if inner.state.muted != muted {
                inner.state.muted = muted;
                inner.emit(EventType::VolumeChange, out);
            }
            Ok(())
        })
    }

    // ========================================================================
    // Flags
    // ========================================================================

    pub fn autoplay(&self) -> bool {
        self.read(|inner| inner.config.autoplay)
    }

    pub fn set_autoplay(&self, autoplay: bool) {
        self.with_inner(|inner, _| inner.config.autoplay = autoplay);
    }

    pub fn looping(&self) -> bool {
        self.read(|inner| inner.config.looping)
    }

    pub fn set_loop(&self, looping: bool) {
        self.with_inner(|inner, _| {
            inner.config.looping = looping;
            if let Some(session) = inner.session.as_mut() {
                session.adapter.set_loop(looping);
            }
        });
    }

    // ========================================================================
    // Quality
    // ========================================================================

    /// Quality levels of the active backend; empty when it has none
    pub fn qualities(&self) -> QualityTable {
        self.read(|inner| {
            inner
                .session
                .as_ref()
                .map(|session| session.adapter.quality_table().clone())
                .unwrap_or_default()
        })
    }

    pub fn quality(&self) -> Quality {
        self.read(|inner| {
            inner
                .session
                .as_ref()
                .filter(|session| !session.adapter.quality_table().is_empty())
                .map(|session| session.adapter.current_quality())
                .unwrap_or_default()
        })
    }

    pub fn set_quality(&self, quality: Quality) -> Result<()> {
        self.with_inner(|inner, out| {
            inner.ensure_live()?;
            inner
                .with_adapter(out, |adapter, cx| QualityController::select(adapter, quality, cx))
                .unwrap_or(Ok(()))
        })
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Snapshot of the canonical state
    pub fn state(&self) -> PlaybackState {
        self.read(|inner| inner.state.clone())
    }

    pub fn phase(&self) -> SessionPhase {
        self.read(|inner| inner.phase)
    }

    /// Watch session phase changes
    pub fn subscribe_phase(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    /// Backend driving the active session
    pub fn active_backend(&self) -> Option<BackendKind> {
        self.read(|inner| inner.session.as_ref().map(|session| session.adapter.kind()))
    }

    /// Attempts made for the current source, in order
    pub fn attempts(&self) -> Vec<AttemptRecord> {
        self.read(|inner| {
            inner
                .coordinator
                .as_ref()
                .map(|coordinator| coordinator.attempts().to_vec())
                .unwrap_or_default()
        })
    }

    pub fn generation(&self) -> Generation {
        self.read(|inner| inner.generation)
    }

    pub fn mount_id(&self) -> String {
        self.read(|inner| inner.mount.id().to_string())
    }

    pub fn is_disposed(&self) -> bool {
        self.read(|inner| inner.disposed)
    }

    // ========================================================================
    // Events
    // ========================================================================

    pub fn add_event_listener(&self, event: EventType, listener: Listener) -> bool {
        self.hub.add_listener(self.namespace, event, listener)
    }

    pub fn remove_event_listener(&self, event: EventType, listener: &Listener) -> bool {
        self.hub.remove_listener(self.namespace, event, listener)
    }

    /// Ordered stream of every event; `None` once disposed
    pub fn subscribe(&self) -> Option<broadcast::Receiver<MediaEvent>> {
        self.hub.subscribe(self.namespace)
    }

    /// Tear down the session and release the namespace
    pub fn dispose(&self) {
        let released = self.with_inner(|inner, _| {
            if inner.disposed {
                return false;
            }
            inner.disposed = true;
            inner.generation = inner.generation.next();
            inner.teardown_session();
            inner.coordinator = None;
            inner.pending_play = false;
            true
        });
        if released {
            self.hub.unregister(self.namespace);
            info!(namespace = %self.namespace, "Media element disposed");
        }
    }
}

impl Drop for MediaElement {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("MediaElement")
            .field("namespace", &self.namespace)
            .field("src", &inner.src)
            .field("phase", &inner.phase)
            .field("generation", &inner.generation)
            .finish()
    }
}
