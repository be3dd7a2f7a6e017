//! Canonical event channel
//!
//! Every media element owns one [`Namespace`]. Events are routed through an
//! [`EventHub`] dispatch table keyed by namespace, so concurrent elements
//! never see each other's events. Each event carries a snapshot of the
//! playback state taken when it was emitted.

use crate::types::{Namespace, PlaybackState};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tokio::sync::broadcast;
use tracing::{debug, trace};

const CHANNEL_CAPACITY: usize = 256;

/// Canonical event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    LoadStart,
    Progress,
    LoadedMetadata,
    LoadedData,
    CanPlay,
    CanPlayThrough,
    DurationChange,
    Play,
    Playing,
    Pause,
    Waiting,
    Seeking,
    Seeked,
    TimeUpdate,
    VolumeChange,
    Ended,
    Error,
    BitrateLoaded,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LoadStart => "loadstart",
            EventType::Progress => "progress",
            EventType::LoadedMetadata => "loadedmetadata",
            EventType::LoadedData => "loadeddata",
            EventType::CanPlay => "canplay",
            EventType::CanPlayThrough => "canplaythrough",
            EventType::DurationChange => "durationchange",
            EventType::Play => "play",
            EventType::Playing => "playing",
            EventType::Pause => "pause",
            EventType::Waiting => "waiting",
            EventType::Seeking => "seeking",
            EventType::Seeked => "seeked",
            EventType::TimeUpdate => "timeupdate",
            EventType::VolumeChange => "volumechange",
            EventType::Ended => "ended",
            EventType::Error => "error",
            EventType::BitrateLoaded => "bitrateloaded",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event delivered to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaEvent {
    pub namespace: Namespace,
    /// Per-namespace sequence number
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub event: EventType,
    /// Playback state at emission time
    pub state: PlaybackState,
}

/// Host listener
pub type Listener = Arc<dyn Fn(&MediaEvent) + Send + Sync>;

/// Events produced while handling one backend event or host call.
///
/// Holds at most one event per type; a repeated type within the same batch
/// is dropped. Order of first emission is preserved.
#[derive(Debug, Default)]
pub struct EventBatch {
    events: Vec<(EventType, PlaybackState)>,
}

impl EventBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event with the state it was fired in. Returns false for a repeat.
    pub fn push(&mut self, event: EventType, state: &PlaybackState) -> bool {
        if self.events.iter().any(|(seen, _)| *seen == event) {
            trace!(event = %event, "Duplicate event in batch dropped");
            return false;
        }
        self.events.push((event, state.clone()));
        true
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn types(&self) -> Vec<EventType> {
        self.events.iter().map(|(event, _)| *event).collect()
    }

    /// Move all events into `other`, keeping order
    pub fn append_to(self, other: &mut Vec<(EventType, PlaybackState)>) {
        other.extend(self.events);
    }
}

struct Route {
    listeners: HashMap<EventType, Vec<Listener>>,
    tx: broadcast::Sender<MediaEvent>,
    sequence: u64,
}

impl Route {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            listeners: HashMap::new(),
            tx,
            sequence: 0,
        }
    }
}

/// Dispatch table keyed by namespace
pub struct EventHub {
    routes: RwLock<HashMap<Namespace, Route>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// Process-wide hub
    pub fn global() -> Arc<EventHub> {
        static GLOBAL: OnceLock<Arc<EventHub>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(EventHub::new())).clone()
    }

    pub fn register(&self, namespace: Namespace) {
        self.routes.write().entry(namespace).or_insert_with(Route::new);
        debug!(namespace = %namespace, "Event namespace registered");
    }

    pub fn unregister(&self, namespace: Namespace) {
        if self.routes.write().remove(&namespace).is_some() {
            debug!(namespace = %namespace, "Event namespace unregistered");
        }
    }

    pub fn is_registered(&self, namespace: Namespace) -> bool {
        self.routes.read().contains_key(&namespace)
    }

    /// Register a listener. Adding the same listener twice is a no-op.
    pub fn add_listener(&self, namespace: Namespace, event: EventType, listener: Listener) -> bool {
        let mut routes = self.routes.write();
        let Some(route) = routes.get_mut(&namespace) else {
            return false;
        };
        let listeners = route.listeners.entry(event).or_default();
        if listeners.iter().any(|known| Arc::ptr_eq(known, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Remove a listener. Removing an unknown listener is a no-op.
    pub fn remove_listener(&self, namespace: Namespace, event: EventType, listener: &Listener) -> bool {
        let mut routes = self.routes.write();
        let Some(listeners) = routes
            .get_mut(&namespace)
            .and_then(|route| route.listeners.get_mut(&event))
        else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|known| !Arc::ptr_eq(known, listener));
        before != listeners.len()
    }

    pub fn subscribe(&self, namespace: Namespace) -> Option<broadcast::Receiver<MediaEvent>> {
        self.routes.read().get(&namespace).map(|route| route.tx.subscribe())
    }

    /// Deliver events in order. Listeners run after the table lock is released.
    pub fn dispatch(&self, namespace: Namespace, events: Vec<(EventType, PlaybackState)>) -> usize {
        if events.is_empty() {
            return 0;
        }

        let deliveries: Vec<(MediaEvent, Vec<Listener>)> = {
            let mut routes = self.routes.write();
            let Some(route) = routes.get_mut(&namespace) else {
                debug!(namespace = %namespace, "Dispatch to unregistered namespace dropped");
                return 0;
            };

            events
                .into_iter()
                .map(|(event, state)| {
                    route.sequence += 1;
                    let record = MediaEvent {
                        namespace,
                        sequence: route.sequence,
                        timestamp: Utc::now(),
                        event,
                        state,
                    };
                    // No receivers is fine
                    let _ = route.tx.send(record.clone());
                    let listeners = route.listeners.get(&event).cloned().unwrap_or_default();
                    (record, listeners)
                })
                .collect()
        };

        let count = deliveries.len();
        for (record, listeners) in deliveries {
            trace!(namespace = %namespace, event = %record.event, seq = record.sequence, "Dispatch");
            for listener in listeners {
                listener(&record);
            }
        }
        count
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}
