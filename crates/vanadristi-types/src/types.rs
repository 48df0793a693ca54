//! Core types for VanaDristi API resources.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{ParseError, ParseResult};

// ============================================================================
// Plants
// ============================================================================

/// A monitored plant as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    /// Server-assigned identifier.
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Botanical or common species, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    /// Where the plant lives (room, balcony, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at: String,
}

impl Plant {
    /// Parse [`Plant::created_at`].
    pub fn parsed_created_at(&self) -> ParseResult<OffsetDateTime> {
        parse_timestamp(&self.created_at)
    }
}

/// Body of a create-plant request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPlant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NewPlant {
    /// Create a request with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            species: None,
            location: None,
        }
    }

    /// Set the species.
    #[must_use]
    pub fn species(mut self, species: impl Into<String>) -> Self {
        self.species = Some(species.into());
        self
    }

    /// Set the location.
    #[must_use]
    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Partial update of a plant. Absent fields are not sent and stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl PlantUpdate {
    /// Returns true if the update carries no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.species.is_none() && self.location.is_none()
    }
}

/// The plant currently selected to receive live sensor-driven updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationTarget {
    #[serde(rename = "_id", alias = "plant_id")]
    pub id: String,
}

/// Body of a set-observation-target request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTargetRequest {
    pub plant_id: String,
}

// ============================================================================
// Sensor data
// ============================================================================

/// A single sensor snapshot for a plant.
///
/// The server has shipped two shapes for this resource. Both deserialize into
/// this one type: `light_intensity` is accepted for `light`, and a nested
/// `soil_data.Soil_Moisture` is accepted for `soil_moisture`. Serialization
/// always uses the canonical field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawSensorData")]
pub struct SensorData {
    pub plant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plant_name: Option<String>,
    pub timestamp: String,
    /// Air temperature in °C.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity in %.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Soil moisture in %.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    /// Light intensity in lux.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<f64>,
}

impl SensorData {
    /// Parse [`SensorData::timestamp`].
    pub fn parsed_timestamp(&self) -> ParseResult<OffsetDateTime> {
        parse_timestamp(&self.timestamp)
    }

    /// Returns true if no measurement field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.humidity.is_none()
            && self.soil_moisture.is_none()
            && self.light.is_none()
    }
}

#[derive(Deserialize)]
struct RawSensorData {
    #[serde(default)]
    plant_id: String,
    #[serde(default)]
    plant_name: Option<String>,
    #[serde(default)]
    timestamp: String,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    soil_moisture: Option<f64>,
    #[serde(default)]
    soil_data: Option<RawSoilData>,
    #[serde(default)]
    light: Option<f64>,
    #[serde(default)]
    light_intensity: Option<f64>,
}

#[derive(Deserialize)]
struct RawSoilData {
    #[serde(default, rename = "Soil_Moisture", alias = "soil_moisture")]
    soil_moisture: Option<f64>,
}

impl From<RawSensorData> for SensorData {
    fn from(raw: RawSensorData) -> Self {
        let nested_moisture = raw.soil_data.and_then(|s| s.soil_moisture);
        Self {
            plant_id: raw.plant_id,
            plant_name: raw.plant_name,
            timestamp: raw.timestamp,
            temperature: raw.temperature,
            humidity: raw.humidity,
            soil_moisture: raw.soil_moisture.or(nested_moisture),
            light: raw.light.or(raw.light_intensity),
        }
    }
}

/// Daily sensor aggregate for a plant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendData {
    /// The day this aggregate covers (server date string).
    #[serde(rename = "_id")]
    pub date: String,
    pub avg_temp: f64,
    pub avg_moisture: f64,
    pub avg_humidity: f64,
}

// ============================================================================
// AI analysis and chat
// ============================================================================

/// Result of a server-side health analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysisResult {
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub actions: Vec<String>,
    #[serde(default)]
    pub watering_recommendation: String,
    #[serde(default)]
    pub notes: String,
}

impl AiAnalysisResult {
    /// Classify the free-text diagnosis.
    #[must_use]
    pub fn kind(&self) -> DiagnosisKind {
        DiagnosisKind::from_diagnosis(&self.diagnosis)
    }
}

/// Response of `GET /ai/analysis`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysisResponse {
    #[serde(default)]
    pub status: String,
    pub ai_result: AiAnalysisResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_data_used: Option<SensorData>,
}

/// One entry of the server's analysis log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryItem {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub plant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sensor_data: Option<SensorData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_result_parsed: Option<AiAnalysisResult>,
}

/// Body of `POST /ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub plant_id: String,
    pub question: String,
}

/// Reply of `POST /ai/chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

/// A message in a local chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "type")]
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            text: text.into(),
        }
    }
}

/// Broad category of an AI diagnosis, used to pick an icon and color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosisKind {
    Healthy,
    NeedsWater,
    Overwatered,
    EnvironmentalStress,
    Other,
    Unknown,
}

impl DiagnosisKind {
    /// Classify a diagnosis string (case-insensitive, surrounding whitespace ignored).
    ///
    /// # Examples
    ///
    /// ```
    /// use vanadristi_types::DiagnosisKind;
    ///
    /// assert_eq!(DiagnosisKind::from_diagnosis("Healthy"), DiagnosisKind::Healthy);
    /// assert_eq!(DiagnosisKind::from_diagnosis("needs water"), DiagnosisKind::NeedsWater);
    /// assert_eq!(DiagnosisKind::from_diagnosis("Root rot"), DiagnosisKind::Other);
    /// assert_eq!(DiagnosisKind::from_diagnosis(""), DiagnosisKind::Unknown);
    /// ```
    #[must_use]
    pub fn from_diagnosis(diagnosis: &str) -> Self {
        let normalized = diagnosis.trim().to_lowercase();
        match normalized.as_str() {
            "" => Self::Unknown,
            "healthy" => Self::Healthy,
            "needs water" => Self::NeedsWater,
            "overwatered" => Self::Overwatered,
            "environmental stress (light/temp)" => Self::EnvironmentalStress,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DiagnosisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Healthy => "healthy",
            Self::NeedsWater => "needs water",
            Self::Overwatered => "overwatered",
            Self::EnvironmentalStress => "environmental stress",
            Self::Other => "attention needed",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Identification
// ============================================================================

/// Result of a server-side photo identification.
///
/// Only `common_name` and `scientific_name` are required; every other field
/// defaults to empty so older, smaller payloads still parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentificationResult {
    pub common_name: String,
    pub scientific_name: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub lifespan: String,
    #[serde(default)]
    pub growth_habit: String,
    #[serde(default)]
    pub flowering_season: String,
    #[serde(default)]
    pub fruiting_season: String,
    #[serde(default)]
    pub toxicity: String,
    #[serde(default)]
    pub edible_or_medicinal: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub uses: Vec<String>,
    #[serde(default)]
    pub symbolism_or_cultural_value: String,
    #[serde(default)]
    pub environmental_preferences: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub propagation_methods: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub common_diseases: Vec<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub similar_species: Vec<String>,
    #[serde(default)]
    pub conservation_status: String,
    #[serde(default)]
    pub fun_fact: String,
    #[serde(default)]
    pub care_summary: String,
    #[serde(default)]
    pub diagnosis_from_image: String,
    #[serde(default)]
    pub image_url: String,
}

impl IdentificationResult {
    /// Returns true if the edibility note warns about toxicity.
    #[must_use]
    pub fn is_toxic(&self) -> bool {
        self.edible_or_medicinal.to_lowercase().contains("toxic")
    }
}

/// Accept either a single string or a list of strings.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) if s.trim().is_empty() => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

// ============================================================================
// Timestamps
// ============================================================================

/// Parse a server timestamp.
///
/// Accepts RFC 3339 as well as the naive `YYYY-MM-DD HH:MM:SS[.ffffff]` form
/// (with either a space or `T` separator). Naive timestamps are UTC.
///
/// # Examples
///
/// ```
/// use vanadristi_types::parse_timestamp;
///
/// let ts = parse_timestamp("2025-03-14 09:26:53.589").unwrap();
/// assert_eq!(ts.hour(), 9);
/// assert!(parse_timestamp("yesterday").is_err());
/// ```
pub fn parse_timestamp(raw: &str) -> ParseResult<OffsetDateTime> {
    let trimmed = raw.trim();
    if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(ts);
    }

    let normalized = trimmed.replacen('T', " ", 1);
    let without_fraction = normalized.split('.').next().unwrap_or_default();
    PrimitiveDateTime::parse(
        without_fraction,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|_| ParseError::InvalidTimestamp(raw.to_string()))
}
