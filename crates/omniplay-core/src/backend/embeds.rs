//! Embedded iframe player surfaces

/// Vimeo iframe player
///
/// Vimeo has no muted flag; mute is emulated by the adapter with volume.
pub trait VimeoPlayer: Send {
    fn load_video(&mut self, video_id: u64);
    fn play(&mut self);
    fn pause(&mut self);
    fn set_current_time(&mut self, time: f64);
    fn set_volume(&mut self, volume: f64);
    /// Ask for the duration; answered with [`VimeoEvent::Duration`]
    fn request_duration(&mut self);
    fn unload(&mut self);
}

/// Vimeo player events
#[derive(Debug, Clone, PartialEq)]
pub enum VimeoEvent {
    Ready,
    Duration(f64),
    TimeUpdate { seconds: f64 },
    /// Seconds buffered from zero
    Progress { seconds: f64 },
    Play,
    Pause,
    Ended,
    Seeked { seconds: f64 },
    VolumeChange { volume: f64 },
    Error { name: String, message: String },
}

/// 360° VR view iframe player
pub trait Vr360Player: Send {
    /// Load an equirectangular video; answered with [`Vr360Event::Ready`]
    fn load(&mut self, url: &str);
    fn play(&mut self);
    fn pause(&mut self);
    fn set_current_time(&mut self, time: f64);
    fn set_volume(&mut self, volume: f64);
    fn mute(&mut self, muted: bool);
    fn stop(&mut self);
}

/// VR view events
#[derive(Debug, Clone, PartialEq)]
pub enum Vr360Event {
    Ready { duration: f64 },
    Play,
    Pause,
    TimeUpdate { current_time: f64 },
    Ended,
    Error { code: String, message: String },
}
