//! Media element configuration

use crate::{
    backend::BackendKind,
    error::{ErrorKind, Result},
    types::{check_volume, MediaType},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// Media element configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Video or audio session
    pub media_type: MediaType,
    /// Start playback as soon as the session is playable
    pub autoplay: bool,
    /// Restart from zero on end
    pub looping: bool,
    /// Start muted
    pub muted: bool,
    /// Initial volume (0.0 - 1.0)
    pub volume: f64,
    /// Recognize `#t=start[,end]` annotations on candidates
    pub time_fragments: bool,
    /// HLS engine start level (-1 = adaptive)
    pub hls_start_level: i32,
    /// Backend error code classification
    pub error_map: ErrorMap,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            media_type: MediaType::Video,
            autoplay: false,
            looping: false,
            muted: false,
            volume: 1.0,
            time_fragments: true,
            hls_start_level: -1,
            error_map: ErrorMap::default(),
        }
    }
}

impl MediaConfig {
    /// Audio-only session with default settings
    pub fn audio() -> Self {
        Self {
            media_type: MediaType::Audio,
            ..Default::default()
        }
    }

    /// Load from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: MediaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        check_volume(self.volume)?;
        Ok(())
    }
}

/// Maps backend-native error codes onto the fallback taxonomy.
///
/// Codes drift between backend versions, so the table is data rather than
/// code. Codes missing from the table are logged and treated as non-fatal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorMap {
    entries: HashMap<BackendKind, HashMap<String, ErrorKind>>,
}

impl Default for ErrorMap {
    fn default() -> Self {
        use ErrorKind::*;

        let mut map = Self::empty();
        // HTML media element MediaError codes
        map.insert(BackendKind::Native, "1", PlaybackAborted);
        map.insert(BackendKind::Native, "2", NetworkError);
        map.insert(BackendKind::Native, "3", CapabilityError);
        map.insert(BackendKind::Native, "4", CapabilityError);
        // hls.js fatal error types
        map.insert(BackendKind::Hls, "networkError", NetworkError);
        map.insert(BackendKind::Hls, "mediaError", CapabilityError);
        map.insert(BackendKind::Hls, "muxError", CapabilityError);
        map.insert(BackendKind::Hls, "keySystemError", CapabilityError);
        // dash.js error codes
        for code in ["11", "18", "26", "27", "28"] {
            map.insert(BackendKind::Dash, code, NetworkError);
        }
        for code in ["24", "25"] {
            map.insert(BackendKind::Dash, code, CapabilityError);
        }
        // Vimeo player error names
        map.insert(BackendKind::Vimeo, "NotFoundError", NetworkError);
        map.insert(BackendKind::Vimeo, "UnsupportedError", CapabilityError);
        map.insert(BackendKind::Vimeo, "PrivacyError", CapabilityError);
        map.insert(BackendKind::Vimeo, "PasswordError", CapabilityError);
        // VR view
        map.insert(BackendKind::Vr360, "NetworkError", NetworkError);
        map.insert(BackendKind::Vr360, "UnsupportedError", CapabilityError);
        map
    }
}

impl ErrorMap {
    /// Table with no entries
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, backend: BackendKind, code: impl Into<String>, kind: ErrorKind) {
        self.entries
            .entry(backend)
            .or_default()
            .insert(code.into(), kind);
    }

    /// Classify a backend error code, logging codes the table does not know
    pub fn classify(&self, backend: BackendKind, code: &str) -> Option<ErrorKind> {
        let kind = self
            .entries
            .get(&backend)
            .and_then(|codes| codes.get(code))
            .copied();

        if kind.is_none() {
            warn!(backend = %backend, code = code, "Unmapped backend error code");
        }

        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = MediaConfig::default();
        assert_eq!(config.media_type, MediaType::Video);
        assert_eq!(config.volume, 1.0);
        assert_eq!(config.hls_start_level, -1);
        assert!(config.time_fragments);
        assert!(!config.autoplay);
    }

    #[test]
    fn test_default_error_map() {
        let map = ErrorMap::default();
        assert_eq!(map.classify(BackendKind::Hls, "networkError"), Some(ErrorKind::NetworkError));
        assert_eq!(map.classify(BackendKind::Dash, "27"), Some(ErrorKind::NetworkError));
        assert_eq!(map.classify(BackendKind::Dash, "24"), Some(ErrorKind::CapabilityError));
        assert_eq!(map.classify(BackendKind::Native, "1"), Some(ErrorKind::PlaybackAborted));
        assert_eq!(map.classify(BackendKind::Hls, "otherError"), None);
    }

    #[test]
    fn test_config_from_json() {
        let config = MediaConfig::from_json(
            r#"{
                "media_type": "audio",
                "autoplay": true,
                "volume": 0.25,
                "error_map": { "Dash": { "99": "capability_error" } }
            }"#,
        )
        .unwrap();

        assert_eq!(config.media_type, MediaType::Audio);
        assert!(config.autoplay);
        assert_eq!(config.volume, 0.25);
        assert!(config.time_fragments);
        assert_eq!(
            config.error_map.classify(BackendKind::Dash, "99"),
            Some(ErrorKind::CapabilityError)
        );
        // A provided table replaces the defaults
        assert_eq!(config.error_map.classify(BackendKind::Dash, "27"), None);
    }

    #[test]
    fn test_config_rejects_bad_volume() {
        assert!(MediaConfig::from_json(r#"{ "volume": 3.0 }"#).is_err());
        assert!(MediaConfig::from_json("not json").is_err());
    }
}
