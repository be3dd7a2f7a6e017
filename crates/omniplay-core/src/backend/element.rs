//! Native media element surface

use crate::types::TimeRanges;

/// Control surface of a native media element
pub trait NativeMedia: Send {
    fn set_src(&mut self, uri: &str, mime_type: Option<&str>);
    fn load(&mut self);
    fn play(&mut self);
    fn pause(&mut self);
    fn set_current_time(&mut self, time: f64);
    fn set_volume(&mut self, volume: f64);
    fn set_muted(&mut self, muted: bool);
    fn set_loop(&mut self, looping: bool);
    fn buffered(&self) -> TimeRanges;
    /// Stop loading and detach from the mount point
    fn remove(&mut self);
}

/// Events fired by a native media element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    LoadStart,
    Progress,
    LoadedMetadata { duration: f64 },
    DurationChange { duration: f64 },
    LoadedData,
    CanPlay,
    CanPlayThrough,
    Play,
    Playing,
    Pause,
    Waiting,
    Seeking,
    Seeked { current_time: f64 },
    TimeUpdate { current_time: f64 },
    VolumeChange { volume: f64, muted: bool },
    Ended,
    /// `MediaError.code` of the element
    Error { code: u16, message: String },
}
