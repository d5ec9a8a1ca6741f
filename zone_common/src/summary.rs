//! Decoding of the out-of-band analysis metadata and the derived display stats.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DETECTION_SUMMARY_HEADER: &str = "X-Detection-Summary";
pub const ZONE_SUMMARY_HEADER: &str = "X-Zone-Summary";
pub const ZONE_DENSITY_HEADER: &str = "X-Zone-Density";
pub const FRAME_DENSITY_HEADER: &str = "X-Frame-Density";
pub const PROCESSING_TIME_HEADER: &str = "X-Processing-Time";

const PERSON: &str = "person";
const NO_VALUE: &str = "-";
const SEE_ZONE_SUMMARY: &str = "See zone summary";
const DEFAULT_PROCESSING_TIME: &str = "0.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummaryEntry {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub count: u64,
    /// 0-100 scale.
    #[serde(default)]
    pub avg_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneSummaryEntry {
    pub zone_name: String,
    #[serde(default)]
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDensityEntry {
    pub zone_name: String,
    #[serde(default)]
    pub zone_density: Option<f64>,
}

/// Metadata carried in the response headers of one analysis call.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AnalysisMetadata {
    pub detections: Vec<DetectionSummaryEntry>,
    pub zone_summary: Vec<ZoneSummaryEntry>,
    pub zone_density: Vec<ZoneDensityEntry>,
    pub frame_density: Option<f64>,
    pub processing_time: Option<String>,
}

fn parse_json_list<T: for<'de> Deserialize<'de>>(header: &str, raw: Option<&str>) -> Vec<T> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_str(raw) {
        Ok(list) => list,
        Err(e) => {
            warn!("ignoring malformed {header} header: {e}");
            Vec::new()
        }
    }
}

impl AnalysisMetadata {
    /// Builds metadata from a header lookup. Each header is decoded on its own; a malformed
    /// one is treated as absent and never fails the others.
    pub fn from_headers<'a, F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<&'a str>,
    {
        let frame_density = lookup(FRAME_DENSITY_HEADER)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .and_then(|raw| match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    warn!("ignoring malformed {FRAME_DENSITY_HEADER} header: {raw:?}");
                    None
                }
            });

        Self {
            detections: parse_json_list(DETECTION_SUMMARY_HEADER, lookup(DETECTION_SUMMARY_HEADER)),
            zone_summary: parse_json_list(ZONE_SUMMARY_HEADER, lookup(ZONE_SUMMARY_HEADER)),
            zone_density: parse_json_list(ZONE_DENSITY_HEADER, lookup(ZONE_DENSITY_HEADER)),
            frame_density,
            processing_time: lookup(PROCESSING_TIME_HEADER)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    fn person(&self) -> Option<&DetectionSummaryEntry> {
        self.detections
            .iter()
            .find(|d| d.object.eq_ignore_ascii_case(PERSON))
    }

    pub fn person_count(&self) -> u64 {
        self.person().map_or(0, |p| p.count)
    }

    pub fn total_count(&self) -> u64 {
        self.detections.iter().map(|d| d.count).sum()
    }

    /// Person average confidence rounded to two decimals, 0 when no person was seen.
    pub fn person_confidence(&self) -> f64 {
        self.person()
            .map_or(0.0, |p| (p.avg_confidence * 100.0).round() / 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DensityLevel {
    Low,
    Medium,
    High,
}

impl DensityLevel {
    pub fn from_density(density: f64) -> Self {
        if density < 0.0001 {
            DensityLevel::Low
        } else if density < 0.001 {
            DensityLevel::Medium
        } else {
            DensityLevel::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DensityLevel::Low => "Low",
            DensityLevel::Medium => "Medium",
            DensityLevel::High => "High",
        }
    }
}

/// Headline numbers shown after one successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub total_detected: u64,
    pub confidence: f64,
    pub processing_time: String,
    /// Density in exponent notation, or a placeholder.
    pub density: String,
    pub density_level: Option<DensityLevel>,
}

impl Default for Stats {
    fn default() -> Self {
        Self {
            total_detected: 0,
            confidence: 0.0,
            processing_time: DEFAULT_PROCESSING_TIME.to_string(),
            density: NO_VALUE.to_string(),
            density_level: None,
        }
    }
}

impl Stats {
    pub fn derive(meta: &AnalysisMetadata, kind: MediaKind) -> Self {
        let total_detected = match kind {
            MediaKind::Video => meta.person_count(),
            MediaKind::Image => meta.total_count(),
        };

        let (density, density_level) = match meta.frame_density {
            Some(d) => (format!("{d:.3e}"), Some(DensityLevel::from_density(d))),
            None => match meta.zone_density.first() {
                Some(ZoneDensityEntry {
                    zone_density: Some(d),
                    ..
                }) => (format!("{d:.3e}"), Some(DensityLevel::from_density(*d))),
                Some(_) => (SEE_ZONE_SUMMARY.to_string(), None),
                None if !meta.zone_summary.is_empty() => (SEE_ZONE_SUMMARY.to_string(), None),
                None => (NO_VALUE.to_string(), None),
            },
        };

        Self {
            total_detected,
            confidence: meta.person_confidence(),
            processing_time: meta
                .processing_time
                .clone()
                .unwrap_or_else(|| DEFAULT_PROCESSING_TIME.to_string()),
            density,
            density_level,
        }
    }

    pub fn density_label(&self) -> &'static str {
        self.density_level.map_or(NO_VALUE, |l| l.as_str())
    }
}
