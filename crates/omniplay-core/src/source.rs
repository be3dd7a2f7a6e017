//! Source descriptor parsing
//!
//! A composite source is a `|`-delimited list of candidate URIs. Each
//! candidate is classified by the backend that can play it:
//! - `*.mpd` → DASH manifest
//! - `*.m3u8` → HLS manifest
//! - `*.mp4`, `*.webm` (video) or `*.mp3`, `*.aac`, `*.wav`, `*.ogg`, `*.oga`
//!   (audio) → native progressive download
//! - `vimeo.com/<id>`, `player.vimeo.com/video/<id>` → Vimeo embed
//! - `vr360://…(.mp4|.m3u8|.mpd)` → 360° view embed
//!
//! Parsing is a pure function of its inputs.

use crate::{backend::BackendKind, types::MediaType};
use serde::{Deserialize, Serialize};
use url::Url;

const TIME_FRAGMENT: &str = "#t=";
const VR360_SCHEME: &str = "vr360://";
const EMBED_FLAGS: [&str; 2] = ["autoplay", "loop"];

/// Mime type for natively played HLS
pub const HLS_MIME_TYPE: &str = "application/vnd.apple.mpegurl";

const VIDEO_FORMATS: &[(&str, &str)] = &[("mp4", "video/mp4"), ("webm", "video/webm")];

const AUDIO_FORMATS: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("aac", "audio/mp4"),
    ("wav", "audio/vnd.wave"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
];

/// Candidate classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    NativeProgressive,
    ManifestDash,
    ManifestHls,
    Vimeo,
    Vr360,
    Unknown,
}

impl CandidateKind {
    /// Backend that plays this kind
    pub fn backend(self) -> Option<BackendKind> {
        match self {
            CandidateKind::NativeProgressive => Some(BackendKind::Native),
            CandidateKind::ManifestDash => Some(BackendKind::Dash),
            CandidateKind::ManifestHls => Some(BackendKind::Hls),
            CandidateKind::Vimeo => Some(BackendKind::Vimeo),
            CandidateKind::Vr360 => Some(BackendKind::Vr360),
            CandidateKind::Unknown => None,
        }
    }

    pub fn is_manifest(self) -> bool {
        matches!(self, CandidateKind::ManifestDash | CandidateKind::ManifestHls)
    }

    /// Resolution priority; lower is tried first
    pub fn priority(self) -> u8 {
        match self {
            CandidateKind::ManifestDash => 0,
            CandidateKind::ManifestHls => 1,
            CandidateKind::Vimeo | CandidateKind::Vr360 => 2,
            CandidateKind::NativeProgressive => 3,
            CandidateKind::Unknown => u8::MAX,
        }
    }
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateKind::NativeProgressive => write!(f, "native-progressive"),
            CandidateKind::ManifestDash => write!(f, "manifest-dash"),
            CandidateKind::ManifestHls => write!(f, "manifest-hls"),
            CandidateKind::Vimeo => write!(f, "vimeo"),
            CandidateKind::Vr360 => write!(f, "vr360"),
            CandidateKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// One URI extracted from a composite source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    /// Position in the composite string
    pub index: usize,
    /// Segment as written (annotation included)
    pub uri: String,
    /// Segment without the time annotation
    pub locator: String,
    /// Lowercased file extension
    pub extension: Option<String>,
    pub kind: CandidateKind,
    /// Mime type for native playback
    pub mime_type: Option<&'static str>,
    pub start_offset: Option<f64>,
    pub end_offset: Option<f64>,
}

impl Candidate {
    /// Numeric video id for Vimeo candidates
    pub fn vimeo_id(&self) -> Option<u64> {
        vimeo_video_id(&self.locator)
    }

    /// Playable URL for 360° candidates
    pub fn vr360_url(&self) -> Option<String> {
        let rest = self.locator.strip_prefix(VR360_SCHEME)?;
        let raw = format!("https://{}", rest);
        let Ok(mut url) = Url::parse(&raw) else {
            return Some(raw);
        };

        // Embed flags are applied by the element, not the player
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| !EMBED_FLAGS.contains(&key.as_ref()))
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
        Some(url.to_string())
    }

    /// Whether an absolute locator carries `name=1` (or `name=true`) in its query
    pub fn query_flag(&self, name: &str) -> bool {
        let Ok(url) = Url::parse(&self.locator) else {
            return false;
        };
        url.query_pairs()
            .any(|(key, value)| key == name && matches!(value.as_ref(), "1" | "true"))
    }
}

/// Parse options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub media_type: MediaType,
    /// Recognize `#t=start[,end]` annotations
    pub time_fragments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            media_type: MediaType::Video,
            time_fragments: true,
        }
    }
}

/// Parsed composite source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSpec {
    pub raw: String,
    pub candidates: Vec<Candidate>,
}

impl SourceSpec {
    /// Any candidate classified to a backend
    pub fn is_supported(&self) -> bool {
        self.candidates.iter().any(|c| c.kind != CandidateKind::Unknown)
    }

    pub fn has_manifest(&self) -> bool {
        self.candidates.iter().any(|c| c.kind.is_manifest())
    }

    /// Candidates of a kind in declaration order
    pub fn of_kind(&self, kind: CandidateKind) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(move |c| c.kind == kind)
    }

    /// Native candidate played when everything else has failed.
    ///
    /// The first native-progressive candidate; failing that, the first
    /// unclassified segment handed to the native element as-is.
    pub fn last_resort(&self) -> Option<&Candidate> {
        self.of_kind(CandidateKind::NativeProgressive)
            .next()
            .or_else(|| self.of_kind(CandidateKind::Unknown).next())
    }
}

/// Result of the capability probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CanPlay {
    Probably,
    No,
}

impl CanPlay {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanPlay::Probably => "probably",
            CanPlay::No => "",
        }
    }
}

impl std::fmt::Display for CanPlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split and classify a composite source string
pub fn parse(raw: &str, options: &ParseOptions) -> SourceSpec {
    let candidates = raw
        .split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .enumerate()
        .map(|(index, segment)| parse_candidate(index, segment, options))
        .collect();

    SourceSpec {
        raw: raw.to_string(),
        candidates,
    }
}

/// Side-effect free capability probe over every segment
pub fn can_play_src(raw: &str, options: &ParseOptions) -> CanPlay {
    if parse(raw, options).is_supported() {
        CanPlay::Probably
    } else {
        CanPlay::No
    }
}

fn parse_candidate(index: usize, segment: &str, options: &ParseOptions) -> Candidate {
    let (locator, offsets) = match split_time_fragment(segment) {
        Some((locator, start, end)) if options.time_fragments => (locator, Some((start, end))),
        Some((locator, _, _)) => (locator, None),
        None => (segment, None),
    };

    let extension = extension_of(locator);
    let (kind, mime_type) = classify(locator, extension.as_deref(), options.media_type);

    Candidate {
        index,
        uri: segment.to_string(),
        locator: locator.to_string(),
        extension,
        kind,
        mime_type,
        start_offset: offsets.map(|(start, _)| start),
        end_offset: offsets.and_then(|(_, end)| end),
    }
}

fn classify(
    locator: &str,
    extension: Option<&str>,
    media_type: MediaType,
) -> (CandidateKind, Option<&'static str>) {
    if vimeo_video_id(locator).is_some() {
        return (CandidateKind::Vimeo, None);
    }

    if locator.starts_with(VR360_SCHEME) {
        return match extension {
            Some("mp4" | "m3u8" | "mpd") => (CandidateKind::Vr360, None),
            _ => (CandidateKind::Unknown, None),
        };
    }

    let Some(extension) = extension else {
        return (CandidateKind::Unknown, None);
    };

    match extension {
        "mpd" => (CandidateKind::ManifestDash, None),
        "m3u8" => (CandidateKind::ManifestHls, Some(HLS_MIME_TYPE)),
        ext => {
            let formats = match media_type {
                MediaType::Video => VIDEO_FORMATS,
                MediaType::Audio => AUDIO_FORMATS,
            };
            formats
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, mime)| (CandidateKind::NativeProgressive, Some(*mime)))
                .unwrap_or((CandidateKind::Unknown, None))
        }
    }
}

/// Lowercased suffix after the last `.` of the final path segment
fn extension_of(locator: &str) -> Option<String> {
    let path = locator.split(['?', '#']).next().unwrap_or(locator);
    let file = path.rsplit('/').next().unwrap_or(path);
    let (_, ext) = file.rsplit_once('.')?;
    if ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Split a trailing `#t=start[,end]` annotation off a segment
fn split_time_fragment(segment: &str) -> Option<(&str, f64, Option<f64>)> {
    let at = segment.rfind(TIME_FRAGMENT)?;
    let spec = segment[at + TIME_FRAGMENT.len()..].trim();

    let (start, end) = match spec.split_once(',') {
        Some((start, end)) => (start, Some(end)),
        None => (spec, None),
    };

    let start = if start.is_empty() {
        0.0
    } else {
        parse_offset(start)?
    };
    let end = match end {
        Some(end) => Some(parse_offset(end)?),
        None => None,
    };

    Some((&segment[..at], start, end))
}

fn parse_offset(value: &str) -> Option<f64> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Trailing numeric id of a Vimeo URL
pub fn vimeo_video_id(locator: &str) -> Option<u64> {
    let rest = locator
        .find("player.vimeo.com/video/")
        .map(|at| &locator[at + "player.vimeo.com/video/".len()..])
        .or_else(|| locator.find("vimeo.com/").map(|at| &locator[at + "vimeo.com/".len()..]))?;

    let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
