//! Shared types for the VanaDristi plant-monitoring API.
//!
//! This crate mirrors the records exchanged with the VanaDristi REST server
//! and is used by both the client library (vanadristi-core) and the CLI.
//!
//! # Features
//!
//! - Plant, sensor, trend, AI analysis, chat and identification records
//! - Tolerant deserialization of the older server shapes
//! - Lenient server timestamp parsing
//! - Client-side routes
//!
//! # Example
//!
//! ```
//! use vanadristi_types::{Plant, SensorData};
//!
//! let plant: Plant = serde_json::from_str(
//!     r#"{"_id":"p1","name":"Fern","created_at":"2025-01-01 10:00:00"}"#,
//! ).unwrap();
//! assert_eq!(plant.name, "Fern");
//! ```

pub mod error;
pub mod route;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use route::Route;
pub use types::{
    AiAnalysisResponse, AiAnalysisResult, ChatHistoryItem, ChatMessage, ChatReply, ChatRequest,
    ChatRole, DiagnosisKind, IdentificationResult, NewPlant, ObservationTarget, Plant,
    PlantUpdate, SensorData, SetTargetRequest, TrendData, parse_timestamp,
};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn parse_timestamp_never_panics(raw in ".{0,40}") {
            let _ = parse_timestamp(&raw);
        }

        #[test]
        fn plant_detail_path_parses_back(id in "[A-Za-z0-9_-]{1,24}") {
            let route = Route::PlantDetail(id.clone());
            prop_assert_eq!(Route::parse(&route.path()).unwrap(), route);
        }

        #[test]
        fn diagnosis_kind_is_case_insensitive(upper in proptest::bool::ANY) {
            let text = if upper { "NEEDS WATER" } else { "needs water" };
            prop_assert_eq!(DiagnosisKind::from_diagnosis(text), DiagnosisKind::NeedsWater);
        }
    }
}
