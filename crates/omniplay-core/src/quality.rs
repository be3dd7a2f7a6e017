//! Quality level normalization
//!
//! DASH reports bitrate info by quality index, HLS reports levels with
//! resolution and bitrate. Both are folded into one ascending table with an
//! `auto` entry appended last.

use crate::{
    adapter::{AdapterContext, PlaybackAdapter},
    error::{Error, Result},
    types::Resolution,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Level descriptor as a backend reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeLevel {
    /// Backend-side index used to select this level
    pub index: usize,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Bits per second
    pub bitrate: Option<u64>,
}

impl NativeLevel {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            width: None,
            height: None,
            bitrate: None,
        }
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    fn base_label(&self) -> String {
        match (self.width, self.height, self.bitrate) {
            (Some(width), Some(height), _) => Resolution::new(width, height).quality_name().to_string(),
            (None, Some(height), _) => format!("{}p", height),
            (_, None, Some(bitrate)) => kbps(bitrate),
            _ => format!("Level {}", self.index),
        }
    }

    fn sort_key(&self) -> (u32, u64, usize) {
        (self.height.unwrap_or(0), self.bitrate.unwrap_or(0), self.index)
    }
}

fn kbps(bitrate: u64) -> String {
    format!("{} kbps", bitrate / 1000)
}

/// Selectable quality value; `Auto` hands selection back to the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quality {
    #[default]
    Auto,
    Level(usize),
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Quality::Auto => write!(f, "auto"),
            Quality::Level(index) => write!(f, "{}", index),
        }
    }
}

impl std::str::FromStr for Quality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Quality::Auto);
        }
        s.parse::<usize>()
            .map(Quality::Level)
            .map_err(|_| Error::invalid_argument(format!("invalid quality value '{}'", s)))
    }
}

/// One selectable entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityLevel {
    pub label: String,
    pub value: Quality,
}

/// Ordered quality levels plus the `auto` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityTable {
    levels: Vec<QualityLevel>,
}

impl QualityTable {
    /// Table of a backend without a quality concept
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the canonical table from backend descriptors
    pub fn from_native(native: &[NativeLevel]) -> Self {
        if native.is_empty() {
            return Self::empty();
        }

        let mut sorted: Vec<&NativeLevel> = native.iter().collect();
        sorted.sort_by_key(|level| level.sort_key());

        let mut label_counts: HashMap<String, usize> = HashMap::new();
        for level in &sorted {
            *label_counts.entry(level.base_label()).or_default() += 1;
        }

        let mut levels: Vec<QualityLevel> = sorted
            .iter()
            .map(|level| {
                let base = level.base_label();
                let label = match level.bitrate {
                    Some(bitrate) if label_counts[&base] > 1 && level.height.is_some() => {
                        format!("{} ({})", base, kbps(bitrate))
                    }
                    _ => base,
                };
                QualityLevel {
                    label,
                    value: Quality::Level(level.index),
                }
            })
            .collect();

        levels.push(QualityLevel {
            label: "auto".to_string(),
            value: Quality::Auto,
        });

        Self { levels }
    }

    pub fn levels(&self) -> &[QualityLevel] {
        &self.levels
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn contains(&self, value: Quality) -> bool {
        self.levels.iter().any(|level| level.value == value)
    }

    pub fn label_of(&self, value: Quality) -> Option<&str> {
        self.levels
            .iter()
            .find(|level| level.value == value)
            .map(|level| level.label.as_str())
    }
}

/// Translates canonical quality selections into adapter calls
pub struct QualityController;

impl QualityController {
    /// Apply a selection to the active adapter.
    ///
    /// An empty table means the backend has no quality concept and any
    /// selection is ignored. Otherwise the value must be in the table.
    pub fn select<A>(adapter: &mut A, value: Quality, cx: &mut AdapterContext<'_>) -> Result<()>
    where
        A: PlaybackAdapter + ?Sized,
    {
        let table = adapter.quality_table();
        if table.is_empty() {
            debug!(backend = %adapter.kind(), quality = %value, "No quality levels; selection ignored");
            return Ok(());
        }

        if !table.contains(value) {
            return Err(Error::invalid_argument(format!(
                "quality {} is not in the quality table",
                value
            )));
        }

        adapter.set_quality(value, cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder() -> Vec<NativeLevel> {
        vec![
            NativeLevel::new(0).with_resolution(1920, 1080).with_bitrate(5_000_000),
            NativeLevel::new(1).with_resolution(640, 360).with_bitrate(800_000),
            NativeLevel::new(2).with_resolution(1280, 720).with_bitrate(2_500_000),
        ]
    }

    #[test]
    fn test_table_sorted_ascending_with_auto_last() {
        let table = QualityTable::from_native(&ladder());
        let labels: Vec<&str> = table.levels().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["360p", "720p", "1080p", "auto"]);

        let values: Vec<Quality> = table.levels().iter().map(|l| l.value).collect();
        assert_eq!(
            values,
            vec![Quality::Level(1), Quality::Level(2), Quality::Level(0), Quality::Auto]
        );
    }

    #[test]
    fn test_bitrate_only_levels() {
        let table = QualityTable::from_native(&[
            NativeLevel::new(0).with_bitrate(1_200_000),
            NativeLevel::new(1).with_bitrate(400_000),
        ]);
        assert_eq!(table.levels()[0].label, "400 kbps");
        assert_eq!(table.levels()[1].label, "1200 kbps");
        assert_eq!(table.label_of(Quality::Auto), Some("auto"));
    }

    #[test]
    fn test_duplicate_heights_get_bitrate_suffix() {
        let table = QualityTable::from_native(&[
            NativeLevel::new(0).with_resolution(1280, 720).with_bitrate(3_000_000),
            NativeLevel::new(1).with_resolution(1280, 720).with_bitrate(1_500_000),
        ]);
        assert_eq!(table.levels()[0].label, "720p (1500 kbps)");
        assert_eq!(table.levels()[1].label, "720p (3000 kbps)");
    }

    #[test]
    fn test_empty_table_has_no_auto_entry() {
        let table = QualityTable::from_native(&[]);
        assert!(table.is_empty());
        assert!(!table.contains(Quality::Auto));
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("auto".parse::<Quality>().unwrap(), Quality::Auto);
        assert_eq!("3".parse::<Quality>().unwrap(), Quality::Level(3));
        assert!("-1".parse::<Quality>().is_err());
    }
}
