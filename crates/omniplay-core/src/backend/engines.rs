//! Adaptive streaming engine surfaces (dash.js and hls.js shaped)

use super::{ElementEvent, NativeMedia};
use crate::quality::NativeLevel;

/// `hls.currentLevel` value handing level choice back to the engine
pub const HLS_AUTO_LEVEL: i32 = -1;

/// HLS engine bound to a media element
pub trait HlsEngine: Send {
    fn set_start_level(&mut self, level: i32);
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self);
    /// Pin a level index, or [`HLS_AUTO_LEVEL`]
    fn set_current_level(&mut self, level: i32);
    /// Element the engine renders into
    fn media(&mut self) -> &mut dyn NativeMedia;
    fn detach_media(&mut self);
    fn destroy(&mut self);
}

/// HLS engine events
#[derive(Debug, Clone, PartialEq)]
pub enum HlsEvent {
    ManifestParsed { levels: Vec<NativeLevel> },
    LevelSwitched { level: usize },
    Error {
        error_type: String,
        details: String,
        fatal: bool,
    },
    /// Event from the attached media element
    Media(ElementEvent),
}

/// DASH engine bound to a media element
pub trait DashEngine: Send {
    fn initialize(&mut self, url: &str, autoplay: bool);
    /// Video bitrate list, available once the stream is initialized
    fn bitrate_info_list(&self) -> Vec<NativeLevel>;
    fn set_auto_switch_quality(&mut self, enabled: bool);
    fn set_quality_for(&mut self, quality_index: usize);
    /// Element the engine renders into
    fn media(&mut self) -> &mut dyn NativeMedia;
    fn reset(&mut self);
}

/// DASH engine events
#[derive(Debug, Clone, PartialEq)]
pub enum DashEvent {
    StreamInitialized,
    QualityChangeRendered { quality_index: usize },
    Error { code: i64, message: String },
    /// Event from the attached media element
    Media(ElementEvent),
}
