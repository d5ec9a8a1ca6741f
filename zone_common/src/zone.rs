use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{round_px, Rect};

pub const DEFAULT_ZONE_COLOR: &str = "#3B82F6";
pub const DEFAULT_ZONE_THICKNESS: u32 = 3;
pub const MIN_THICKNESS: u32 = 1;
pub const MAX_THICKNESS: u32 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ZoneError {
    #[error("Please enter a zone name")]
    EmptyName,
    #[error("Alert threshold must be a number")]
    InvalidThreshold,
    #[error("No rectangle is waiting to be saved")]
    NoPendingRect,
    #[error("No zone at position {0}")]
    NoSuchZone(usize),
    #[error("zone layout i/o: {0}")]
    Io(String),
}

/// Fields of the zone configuration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneForm {
    pub name: String,
    pub color: String,
    pub thickness: u32,
    pub description: String,
    pub alert_threshold: String,
}

impl Default for ZoneForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: DEFAULT_ZONE_COLOR.to_string(),
            thickness: DEFAULT_ZONE_THICKNESS,
            description: String::new(),
            alert_threshold: String::new(),
        }
    }
}

impl ZoneForm {
    pub fn set_thickness(&mut self, thickness: i64) {
        self.thickness = thickness.clamp(MIN_THICKNESS as i64, MAX_THICKNESS as i64) as u32;
    }

    fn validate(&self) -> Result<(), ZoneError> {
        if self.name.trim().is_empty() {
            return Err(ZoneError::EmptyName);
        }
        let threshold = self.alert_threshold.trim();
        if !threshold.is_empty() && threshold.parse::<f64>().is_err() {
            return Err(ZoneError::InvalidThreshold);
        }
        Ok(())
    }
}

/// A finalized zone of interest in canvas-native pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    /// Creation time in milliseconds since the epoch.
    pub id: i64,
    pub name: String,
    pub rect: Rect,
    pub color: String,
    pub thickness: u32,
    pub description: String,
    pub alert_threshold: String,
}

/// Integer pixel position on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

/// Backend-facing shape of a zone, sent JSON-encoded in the `zones` form field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedZone {
    pub name: String,
    pub top_left: PixelPoint,
    pub bottom_right: PixelPoint,
    pub color: String,
    pub thickness: u32,
    pub description: String,
    #[serde(rename = "alertThreshold")]
    pub alert_threshold: String,
}

impl Zone {
    pub fn serialize(&self) -> SerializedZone {
        let tl = self.rect.top_left();
        let br = self.rect.bottom_right();
        SerializedZone {
            name: self.name.clone(),
            top_left: PixelPoint {
                x: round_px(tl.x),
                y: round_px(tl.y),
            },
            bottom_right: PixelPoint {
                x: round_px(br.x),
                y: round_px(br.y),
            },
            color: self.color.clone(),
            thickness: self.thickness,
            description: self.description.clone(),
            alert_threshold: self.alert_threshold.clone(),
        }
    }
}

/// Ordered zones for the currently loaded media.
#[derive(Debug, Default, Clone)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
    last_id: i64,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_zones(zones: Vec<Zone>) -> Self {
        let last_id = zones.iter().map(|z| z.id).max().unwrap_or(0);
        Self { zones, last_id }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Zone> {
        self.zones.get(index)
    }

    /// Ids are creation timestamps, bumped when two zones land in the same millisecond.
    fn next_id(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        self.last_id = now.max(self.last_id + 1);
        self.last_id
    }

    /// Appends a zone built from a normalized rectangle and the submitted form.
    pub fn add(&mut self, rect: Rect, form: &ZoneForm) -> Result<&Zone, ZoneError> {
        form.validate()?;
        let zone = Zone {
            id: self.next_id(),
            name: form.name.trim().to_string(),
            rect,
            color: form.color.clone(),
            thickness: form.thickness.clamp(MIN_THICKNESS, MAX_THICKNESS),
            description: form.description.clone(),
            alert_threshold: form.alert_threshold.trim().to_string(),
        };
        tracing::debug!(id = zone.id, name = %zone.name, "zone added");
        self.zones.push(zone);
        Ok(&self.zones[self.zones.len() - 1])
    }

    pub fn delete(&mut self, index: usize) -> Result<Zone, ZoneError> {
        if index >= self.zones.len() {
            return Err(ZoneError::NoSuchZone(index));
        }
        Ok(self.zones.remove(index))
    }

    pub fn clear(&mut self) {
        self.zones.clear();
    }

    pub fn serialize(&self) -> Vec<SerializedZone> {
        self.zones.iter().map(Zone::serialize).collect()
    }

    /// JSON text for the `zones` multipart field.
    pub fn to_wire_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.serialize())
    }

    /// Save zones to a JSON layout file.
    pub fn save_to(&self, path: &Path) -> Result<(), ZoneError> {
        let json =
            serde_json::to_string_pretty(&self.zones).map_err(|e| ZoneError::Io(e.to_string()))?;
        fs::write(path, json).map_err(|e| ZoneError::Io(format!("{}: {e}", path.display())))
    }

    /// Load zones from a JSON layout file. A missing file is an empty layout.
    pub fn load_from(path: &Path) -> Result<Self, ZoneError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = fs::read_to_string(path)
            .map_err(|e| ZoneError::Io(format!("{}: {e}", path.display())))?;
        let zones: Vec<Zone> =
            serde_json::from_str(&json).map_err(|e| ZoneError::Io(e.to_string()))?;
        Ok(Self::from_zones(zones))
    }
}
