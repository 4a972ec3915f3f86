//! Core data models for drones, survey sites and missions.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::{SurveyError, SurveyResult};
use crate::geometry::polygon_area;

const MAX_MODEL_LEN: usize = 50;
const MAX_SITE_NAME_LEN: usize = 100;

// ========== GEOJSON ==========

/// A GeoJSON position: `[lng, lat]` or `[lng, lat, alt]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position {
    pub lng: f64,
    pub lat: f64,
    pub alt: Option<f64>,
}

impl Position {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat, alt: None }
    }

    pub fn with_alt(lng: f64, lat: f64, alt: f64) -> Self {
        Self {
            lng,
            lat,
            alt: Some(alt),
        }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [lng, lat] => Ok(Self::new(*lng, *lat)),
            [lng, lat, alt] => Ok(Self::with_alt(*lng, *lat, *alt)),
            other => Err(format!(
                "position must have 2 or 3 numbers, got {}",
                other.len()
            )),
        }
    }
}

impl From<Position> for Vec<f64> {
    fn from(position: Position) -> Self {
        match position.alt {
            Some(alt) => vec![position.lng, position.lat, alt],
            None => vec![position.lng, position.lat],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineStringType {
    #[default]
    LineString,
}

/// GeoJSON LineString used for planned and actual flight paths.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    #[serde(rename = "type", default)]
    pub kind: LineStringType,
    pub coordinates: Vec<Position>,
}

impl LineString {
    pub fn new(coordinates: Vec<Position>) -> Self {
        Self {
            kind: LineStringType::LineString,
            coordinates,
        }
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }
}

/// Site location: a GeoJSON Point or Polygon (outer ring first, holes ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Location {
    Point { coordinates: Position },
    Polygon { coordinates: Vec<Vec<Position>> },
}

impl Location {
    /// Parse a caller-supplied GeoJSON object, accepting only Point and Polygon.
    pub fn from_geojson(value: &serde_json::Value) -> SurveyResult<Self> {
        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| SurveyError::invalid_argument("location.type", "missing geometry type"))?;

        if kind != "Point" && kind != "Polygon" {
            return Err(SurveyError::invalid_argument(
                "location.type",
                format!("must be Point or Polygon, got {kind}"),
            ));
        }

        let location: Location = serde_json::from_value(value.clone())
            .map_err(|e| SurveyError::invalid_argument("location.coordinates", e.to_string()))?;

        if let Location::Polygon { coordinates } = &location {
            if coordinates.is_empty() {
                return Err(SurveyError::invalid_argument(
                    "location.coordinates",
                    "polygon needs an outer ring",
                ));
            }
        }

        Ok(location)
    }

    pub fn outer_ring(&self) -> Option<&[Position]> {
        match self {
            Location::Point { .. } => None,
            Location::Polygon { coordinates } => coordinates.first().map(Vec::as_slice),
        }
    }
}

// ========== DRONES ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DroneStatus {
    /// Free to take a mission
    #[default]
    Available,
    /// Bound to a pending or in-progress mission
    InMission,
    /// Out of service
    Maintenance,
}

impl DroneStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::InMission => "IN_MISSION",
            Self::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for DroneStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DroneStatus {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(Self::Available),
            "IN_MISSION" => Ok(Self::InMission),
            "MAINTENANCE" => Ok(Self::Maintenance),
            other => Err(SurveyError::invalid_argument(
                "status",
                format!("unknown drone status {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drone {
    pub id: Uuid,
    pub model: String,
    pub status: DroneStatus,
    /// Battery charge percentage, unknown until reported
    pub battery_level: Option<f64>,
    pub last_heartbeat: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDroneRequest {
    pub model: String,
    #[serde(default)]
    pub status: Option<DroneStatus>,
    #[serde(default)]
    pub battery_level: Option<f64>,
}

impl CreateDroneRequest {
    pub fn into_drone(self) -> SurveyResult<Drone> {
        let model = self.model.trim().to_string();
        if model.is_empty() || model.len() > MAX_MODEL_LEN {
            return Err(SurveyError::invalid_argument(
                "model",
                format!("must be 1-{MAX_MODEL_LEN} characters"),
            ));
        }

        let status = self.status.unwrap_or_default();
        if status == DroneStatus::InMission {
            return Err(SurveyError::invalid_argument(
                "status",
                "IN_MISSION is assigned by mission creation",
            ));
        }

        if let Some(level) = self.battery_level {
            validate_battery("battery_level", level)?;
        }

        Ok(Drone {
            id: Uuid::new_v4(),
            model,
            status,
            battery_level: self.battery_level,
            last_heartbeat: None,
        })
    }
}

/// Maintenance toggle for a drone that is not flying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DroneStatusUpdate {
    pub status: DroneStatus,
}

pub(crate) fn validate_battery(field: &str, level: f64) -> SurveyResult<()> {
    if !(0.0..=100.0).contains(&level) {
        return Err(SurveyError::invalid_argument(
            field,
            format!("{level} is outside 0-100"),
        ));
    }
    Ok(())
}

// ========== SITES ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub location: Location,
    /// Area in square meters
    pub area: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub location: serde_json::Value,
    pub area: f64,
}

impl CreateSiteRequest {
    /// Build the site record. For polygons the Shoelace area of the outer
    /// ring replaces whatever area the caller sent.
    pub fn into_site(self) -> SurveyResult<Site> {
        let name = self.name.trim().to_string();
        if name.is_empty() || name.len() > MAX_SITE_NAME_LEN {
            return Err(SurveyError::invalid_argument(
                "name",
                format!("must be 1-{MAX_SITE_NAME_LEN} characters"),
            ));
        }

        let location = Location::from_geojson(&self.location)?;
        let area = match location.outer_ring() {
            Some(ring) => {
                let points: Vec<(f64, f64)> = ring.iter().map(|p| (p.lng, p.lat)).collect();
                polygon_area(&points)
            }
            None => {
                if !self.area.is_finite() || self.area < 0.0 {
                    return Err(SurveyError::invalid_argument(
                        "area",
                        "must be a non-negative number",
                    ));
                }
                self.area
            }
        };

        Ok(Site {
            id: Uuid::new_v4(),
            name,
            location,
            area,
        })
    }
}

// ========== MISSIONS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissionStatus {
    Pending,
    InProgress,
    Completed,
    Aborted,
}

impl MissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Aborted => "ABORTED",
        }
    }

    /// Pending and in-progress missions hold their drone.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionStatus {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "ABORTED" => Ok(Self::Aborted),
            other => Err(SurveyError::invalid_argument(
                "status",
                format!("unknown mission status {other}"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: Uuid,
    pub drone_id: Uuid,
    pub site_id: Uuid,
    pub status: MissionStatus,
    pub progress: f64,
    /// Ground-track distance in meters, set on completion
    pub distance: Option<f64>,
    pub planned_path: LineString,
    pub actual_path: Option<LineString>,
    /// Store revision, bumped on every write
    #[serde(skip)]
    pub revision: i64,
}

impl Mission {
    pub fn actual_len(&self) -> usize {
        self.actual_path.as_ref().map_or(0, LineString::len)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMissionRequest {
    pub drone_id: Uuid,
    pub site_id: Uuid,
    pub planned_path: LineString,
}

// ========== TELEMETRY ==========

/// One position report received on a telemetry session.
///
/// Only `lat`, `lng` and `alt` feed the actual path and are checked strictly.
/// The vehicle fields are best effort: values of the wrong type are dropped
/// instead of failing the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryReport {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub alt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub battery: Option<f64>,
    /// Sender clock, RFC 3339 or a naive ISO 8601 time taken as UTC
    #[serde(default, deserialize_with = "lenient_text")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub heading: Option<f64>,
}

impl TelemetryReport {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            lat,
            lng,
            alt: None,
            battery: None,
            timestamp: None,
            speed: None,
            heading: None,
        }
    }

    /// Position appended to the actual path; altitude defaults to 0.
    pub fn position(&self) -> Position {
        Position::with_alt(self.lng, self.lat, self.alt.unwrap_or(0.0))
    }

    /// Battery level, if reported and within 0-100.
    pub fn battery_level(&self) -> Option<f64> {
        self.battery.filter(|level| (0.0..=100.0).contains(level))
    }

    /// Parsed sender timestamp. Naive times are read as UTC.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.timestamp.as_deref()?.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()).filter(|n| n.is_finite()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_str().map(str::to_owned)))
}

/// Frame sent back to the telemetry sender for each report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TelemetryReply {
    Ack { progress: f64 },
    Rejected { reason: String },
}
