//! Backend runtime boundary
//!
//! Third-party playback runtimes (the browser media element, the DASH and
//! HLS engines and the two embedded players) are external collaborators.
//! This module fixes the surface we drive them through:
//! - [`RuntimeLoader`]: fetches a runtime once (the script-tag step)
//! - [`BackendRuntime`]: a loaded runtime, able to create players
//! - [`BackendPlayer`]: one player handle, tagged by backend kind
//! - [`SignalSink`]: where a player reports its native events

mod element;
mod embeds;
mod engines;

pub use element::{ElementEvent, NativeMedia};
pub use embeds::{VimeoEvent, VimeoPlayer, Vr360Event, Vr360Player};
pub use engines::{DashEngine, DashEvent, HlsEngine, HlsEvent, HLS_AUTO_LEVEL};

use crate::{
    error::{Error, Result},
    types::{Generation, MediaType},
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Playback engine kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BackendKind {
    /// Progressive download through the native media element
    Native,
    /// DASH manifest engine
    Dash,
    /// HLS manifest engine
    Hls,
    /// Vimeo iframe player
    Vimeo,
    /// 360° VR view iframe player
    Vr360,
}

impl BackendKind {
    pub const ALL: [BackendKind; 5] = [
        BackendKind::Native,
        BackendKind::Dash,
        BackendKind::Hls,
        BackendKind::Vimeo,
        BackendKind::Vr360,
    ];

    /// Backends with a selectable quality ladder
    pub fn has_quality_levels(self) -> bool {
        matches!(self, BackendKind::Dash | BackendKind::Hls)
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Dash => write!(f, "dash"),
            BackendKind::Hls => write!(f, "hls"),
            BackendKind::Vimeo => write!(f, "vimeo"),
            BackendKind::Vr360 => write!(f, "vr360"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "html5" => Ok(BackendKind::Native),
            "dash" => Ok(BackendKind::Dash),
            "hls" => Ok(BackendKind::Hls),
            "vimeo" => Ok(BackendKind::Vimeo),
            "vr360" | "vrview" => Ok(BackendKind::Vr360),
            other => Err(Error::invalid_argument(format!("unknown backend kind '{}'", other))),
        }
    }
}

/// Exclusive container a session renders into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    id: String,
    owner: Option<Generation>,
}

impl MountPoint {
    pub fn new() -> Self {
        Self {
            id: format!("player_{}", Uuid::new_v4().simple()),
            owner: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Claim the mount point for a session
    pub fn attach(&mut self, generation: Generation) -> Result<()> {
        if let Some(owner) = self.owner {
            return Err(Error::InvalidState(format!(
                "mount point {} still attached to {}",
                self.id, owner
            )));
        }
        self.owner = Some(generation);
        Ok(())
    }

    /// Release the mount point. Detaching an empty mount point is a no-op.
    pub fn detach(&mut self) {
        self.owner = None;
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::new()
    }
}

/// Options handed to a runtime when it creates a player
#[derive(Debug, Clone)]
pub struct PlayerOptions {
    pub mount_id: String,
    pub media_type: MediaType,
    pub autoplay: bool,
    pub looping: bool,
    pub hls_start_level: i32,
}

/// Native event from any backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendSignal {
    Native(ElementEvent),
    Dash(DashEvent),
    Hls(HlsEvent),
    Vimeo(VimeoEvent),
    Vr360(Vr360Event),
}

impl From<ElementEvent> for BackendSignal {
    fn from(event: ElementEvent) -> Self {
        BackendSignal::Native(event)
    }
}

impl From<DashEvent> for BackendSignal {
    fn from(event: DashEvent) -> Self {
        BackendSignal::Dash(event)
    }
}

impl From<HlsEvent> for BackendSignal {
    fn from(event: HlsEvent) -> Self {
        BackendSignal::Hls(event)
    }
}

impl From<VimeoEvent> for BackendSignal {
    fn from(event: VimeoEvent) -> Self {
        BackendSignal::Vimeo(event)
    }
}

impl From<Vr360Event> for BackendSignal {
    fn from(event: Vr360Event) -> Self {
        BackendSignal::Vr360(event)
    }
}

/// Backend signal stamped with the generation of the session that produced it
#[derive(Debug, Clone)]
pub struct TaggedSignal {
    pub generation: Generation,
    pub signal: BackendSignal,
}

/// Channel end a player reports native events through
#[derive(Debug, Clone)]
pub struct SignalSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<TaggedSignal>,
}

impl SignalSink {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<TaggedSignal>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Queue a native event. Returns false once the element is gone.
    pub fn send(&self, signal: impl Into<BackendSignal>) -> bool {
        self.tx
            .send(TaggedSignal {
                generation: self.generation,
                signal: signal.into(),
            })
            .is_ok()
    }
}

/// Player handle, one variant per backend kind
pub enum BackendPlayer {
    Native(Box<dyn NativeMedia>),
    Dash(Box<dyn DashEngine>),
    Hls(Box<dyn HlsEngine>),
    Vimeo(Box<dyn VimeoPlayer>),
    Vr360(Box<dyn Vr360Player>),
}

impl BackendPlayer {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendPlayer::Native(_) => BackendKind::Native,
            BackendPlayer::Dash(_) => BackendKind::Dash,
            BackendPlayer::Hls(_) => BackendKind::Hls,
            BackendPlayer::Vimeo(_) => BackendKind::Vimeo,
            BackendPlayer::Vr360(_) => BackendKind::Vr360,
        }
    }
}

impl std::fmt::Debug for BackendPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BackendPlayer({})", self.kind())
    }
}

/// A loaded backend runtime
pub trait BackendRuntime: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Whether the runtime can play in this environment
    fn is_supported(&self) -> bool {
        true
    }

    /// `canPlayType` of the native element runtime
    fn can_play_type(&self, _mime_type: &str) -> bool {
        false
    }

    /// Create a player rendering into the given mount point
    fn create(&self, options: &PlayerOptions, sink: SignalSink) -> Result<BackendPlayer>;
}

/// Fetches a backend runtime
#[async_trait]
pub trait RuntimeLoader: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Load the runtime. A failure is reported as a network error.
    async fn load(&self) -> Result<Arc<dyn BackendRuntime>>;
}
