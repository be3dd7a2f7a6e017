//! Core types for Omniplay

use crate::error::{Error, MediaError, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-instance event namespace token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Namespace(pub Uuid);

impl Namespace {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MediaElement::{}", self.0)
    }
}

/// Session generation token.
///
/// Bumped on every `src` assignment and every backend switch. Work started
/// under an older generation must not touch the current session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Kind of media the element presents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    #[default]
    Video,
    Audio,
}

/// `HTMLMediaElement.readyState`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    HaveNothing = 0,
    HaveMetadata = 1,
    HaveCurrentData = 2,
    HaveFutureData = 3,
    HaveEnoughData = 4,
}

impl std::fmt::Display for ReadyState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadyState::HaveNothing => write!(f, "HAVE_NOTHING"),
            ReadyState::HaveMetadata => write!(f, "HAVE_METADATA"),
            ReadyState::HaveCurrentData => write!(f, "HAVE_CURRENT_DATA"),
            ReadyState::HaveFutureData => write!(f, "HAVE_FUTURE_DATA"),
            ReadyState::HaveEnoughData => write!(f, "HAVE_ENOUGH_DATA"),
        }
    }
}

/// `HTMLMediaElement.networkState`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NetworkState {
    #[default]
    Empty = 0,
    Idle = 1,
    Loading = 2,
    NoSource = 3,
}

/// Session state machine states
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No source assigned
    #[default]
    Empty,
    /// Backend activated, waiting for metadata
    Loading,
    /// Duration and dimensions known
    MetadataReady,
    /// Enough data to start playback
    Playable,
    /// Playback running
    Playing,
    /// Playback paused
    Paused,
    /// Reached the end of the media
    Ended,
    /// Terminal for the session
    Errored,
}

impl SessionPhase {
    /// Check if transition to target state is valid
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;
        if *self == target {
            return false;
        }
        matches!(
            (self, target),
            // Errored is reachable from anywhere but never left in place
            (Empty | Loading | MetadataReady | Playable | Playing | Paused | Ended, Errored) |
            (Empty, Loading) |
            (Loading, MetadataReady) |
            (MetadataReady, Playable) |
            (Playable, Playing) | (Playable, Paused) |
            (Playing, Paused) | (Playing, Ended) |
            (Paused, Playing) | (Paused, Ended) |
            (Ended, Playing) | (Ended, Paused)
        )
    }

    /// Session has become playable at some point
    pub fn is_playable(&self) -> bool {
        matches!(
            self,
            SessionPhase::Playable | SessionPhase::Playing | SessionPhase::Paused | SessionPhase::Ended
        )
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Empty => write!(f, "empty"),
            SessionPhase::Loading => write!(f, "loading"),
            SessionPhase::MetadataReady => write!(f, "metadata-ready"),
            SessionPhase::Playable => write!(f, "playable"),
            SessionPhase::Playing => write!(f, "playing"),
            SessionPhase::Paused => write!(f, "paused"),
            SessionPhase::Ended => write!(f, "ended"),
            SessionPhase::Errored => write!(f, "errored"),
        }
    }
}

/// Canonical mirror of the playback state the host reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub network_state: NetworkState,
    pub ready_state: ReadyState,
    pub paused: bool,
    pub ended: bool,
    pub seeking: bool,
    pub current_time: f64,
    /// NaN until known
    pub duration: f64,
    /// User-facing volume; kept while muted
    pub volume: f64,
    pub muted: bool,
    pub error: Option<MediaError>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            network_state: NetworkState::Empty,
            ready_state: ReadyState::HaveNothing,
            paused: true,
            ended: false,
            seeking: false,
            current_time: 0.0,
            duration: f64::NAN,
            volume: 1.0,
            muted: false,
            error: None,
        }
    }
}

impl PlaybackState {
    /// Reset the media-dependent fields for a fresh source, keeping volume and mute
    pub fn reset_for_source(&mut self) {
        *self = Self {
            volume: self.volume,
            muted: self.muted,
            ..Self::default()
        };
    }

    /// Volume the backend should actually be running at
    pub fn effective_volume(&self) -> f64 {
        if self.muted {
            0.0
        } else {
            self.volume
        }
    }

    pub fn has_duration(&self) -> bool {
        !self.duration.is_nan()
    }
}

/// Validate a volume value against `[0, 1]`
pub fn check_volume(volume: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&volume) {
        return Err(Error::invalid_argument(format!(
            "volume {} must be between 0.0 and 1.0",
            volume
        )));
    }
    Ok(volume)
}

/// Buffered time ranges (`HTMLMediaElement.buffered`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeRanges {
    ranges: Vec<(f64, f64)>,
}

impl TimeRanges {
    pub fn new(ranges: Vec<(f64, f64)>) -> Self {
        Self { ranges }
    }

    /// Single range starting at zero
    pub fn from_zero(end: f64) -> Self {
        Self::new(vec![(0.0, end)])
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn start(&self, index: usize) -> Result<f64> {
        self.get(index).map(|(start, _)| start)
    }

    pub fn end(&self, index: usize) -> Result<f64> {
        self.get(index).map(|(_, end)| end)
    }

    fn get(&self, index: usize) -> Result<(f64, f64)> {
        self.ranges.get(index).copied().ok_or(Error::IndexSize {
            index,
            length: self.ranges.len(),
        })
    }
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns quality tier name
    pub fn quality_name(&self) -> &'static str {
        match self.height {
            0..=240 => "240p",
            241..=360 => "360p",
            361..=480 => "480p",
            481..=720 => "720p",
            721..=1080 => "1080p",
            1081..=1440 => "1440p",
            _ => "4K",
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        assert!(SessionPhase::Empty.can_transition_to(SessionPhase::Loading));
        assert!(SessionPhase::Loading.can_transition_to(SessionPhase::MetadataReady));
        assert!(SessionPhase::Playable.can_transition_to(SessionPhase::Playing));
        assert!(SessionPhase::Playing.can_transition_to(SessionPhase::Paused));
        assert!(SessionPhase::Ended.can_transition_to(SessionPhase::Playing));
        assert!(SessionPhase::Playing.can_transition_to(SessionPhase::Errored));

        assert!(!SessionPhase::Empty.can_transition_to(SessionPhase::Playing));
        assert!(!SessionPhase::Loading.can_transition_to(SessionPhase::Playable));
        assert!(!SessionPhase::Errored.can_transition_to(SessionPhase::Loading));
        assert!(!SessionPhase::Errored.can_transition_to(SessionPhase::Playing));
    }

    #[test]
    fn test_ready_state_ordering() {
        assert!(ReadyState::HaveNothing < ReadyState::HaveMetadata);
        assert!(ReadyState::HaveFutureData < ReadyState::HaveEnoughData);
        assert_eq!(ReadyState::HaveEnoughData as u8, 4);
    }

    #[test]
    fn test_check_volume() {
        assert!(check_volume(0.0).is_ok());
        assert!(check_volume(1.0).is_ok());
        assert!(matches!(check_volume(1.5), Err(Error::InvalidArgument(_))));
        assert!(matches!(check_volume(-0.1), Err(Error::InvalidArgument(_))));
        assert!(check_volume(f64::NAN).is_err());
    }

    #[test]
    fn test_time_ranges_bounds() {
        let ranges = TimeRanges::from_zero(12.5);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges.start(0).unwrap(), 0.0);
        assert_eq!(ranges.end(0).unwrap(), 12.5);
        assert!(matches!(ranges.end(1), Err(Error::IndexSize { index: 1, length: 1 })));
    }

    #[test]
    fn test_reset_keeps_volume() {
        let mut state = PlaybackState {
            volume: 0.3,
            muted: true,
            current_time: 42.0,
            paused: false,
            ..Default::default()
        };
        state.reset_for_source();
        assert_eq!(state.volume, 0.3);
        assert!(state.muted);
        assert_eq!(state.current_time, 0.0);
        assert!(state.paused);
        assert!(state.duration.is_nan());
    }

    #[test]
    fn test_resolution_quality_name() {
        assert_eq!(Resolution::new(1280, 720).quality_name(), "720p");
        assert_eq!(Resolution::new(3840, 2160).quality_name(), "4K");
    }
}
