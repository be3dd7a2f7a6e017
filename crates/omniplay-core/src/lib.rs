//! Omniplay Core - one media element over many playback backends
//!
//! This crate provides the source resolution and backend normalization engine:
//! - Composite `|`-delimited source parsing and classification
//! - Lazy, shared activation of backend runtimes
//! - Fallback across candidates on backend failure
//! - Uniform quality selection over DASH and HLS engines
//! - One canonical event stream with per-instance namespaces
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         MediaElement                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐           │
//! │  │    Source    │  │   Fallback   │  │   Backend    │           │
//! │  │    Parser    │─►│ Coordinator  │─►│  Activator   │           │
//! │  └──────────────┘  └──────┬───────┘  └──────┬───────┘           │
//! │                           │                 │                   │
//! │                    ┌──────┴─────────────────┴──────┐            │
//! │                    │        Playback Adapter       │            │
//! │                    │ native │ dash │ hls │ vimeo │ vr360        │
//! │                    └──────┬────────────────┬───────┘            │
//! │                           │                │                    │
//! │  ┌──────────────┐  ┌──────┴──────┐  ┌──────┴───────┐            │
//! │  │   Quality    │  │  Readiness  │  │    Event     │            │
//! │  │  Controller  │  │   Tracker   │  │     Hub      │            │
//! │  └──────────────┘  └─────────────┘  └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use omniplay_core::{sim::SimBackends, MediaConfig, MediaElement};
//!
//! # async fn demo() -> omniplay_core::Result<()> {
//! let backends = SimBackends::new();
//! let element = MediaElement::new(MediaConfig::default(), backends.activator());
//! element.set_src("https://cdn.example.com/a.mpd|https://cdn.example.com/a.mp4").await?;
//! element.process_signals().await;
//! element.play()?;
//! # Ok(())
//! # }
//! ```

pub mod activator;
pub mod adapter;
pub mod backend;
pub mod config;
pub mod element;
pub mod error;
pub mod events;
pub mod fallback;
pub mod quality;
pub mod sim;
pub mod source;
pub mod types;

pub use activator::Activator;
pub use adapter::{PlaybackAdapter, SignalOutcome};
pub use backend::{BackendKind, BackendRuntime, RuntimeLoader};
pub use config::{ErrorMap, MediaConfig};
pub use element::MediaElement;
pub use error::{Error, ErrorKind, MediaError, Result};
pub use events::{EventHub, EventType, Listener, MediaEvent};
pub use fallback::{AttemptRecord, FallbackCoordinator, PlannedAttempt};
pub use quality::{NativeLevel, Quality, QualityController, QualityLevel, QualityTable};
pub use source::{can_play_src, parse, CanPlay, Candidate, CandidateKind, ParseOptions, SourceSpec};
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library with default configuration
pub fn init() {
    tracing::info!(version = VERSION, "Omniplay Core initialized");
}
