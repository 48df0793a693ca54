//! Canonical cache keys.
//!
//! | Data | Key |
//! |------|-----|
//! | All plants | `["plants"]` |
//! | One plant | `["plant", id]` |
//! | Observation target | `["plants", "latest"]` |
//! | Latest reading | `["sensor", "latest", id]` |
//! | Trends | `["sensor", "trends", id]` |
//! | AI analysis | `["ai", "analysis", id]` |
//! | Latest stored analysis | `["chatHistory", "latest"]` |
//! | Identification history | `["identifications"]` |
//!
//! The observation target lives under `["plants"]`, so invalidating the plant
//! list by prefix refreshes it too.

use crate::cache::QueryKey;
use crate::query_key;

pub fn plants() -> QueryKey {
    query_key!["plants"]
}

pub fn plant(id: &str) -> QueryKey {
    query_key!["plant", id]
}

pub fn observation_target() -> QueryKey {
    query_key!["plants", "latest"]
}

pub fn latest_sensor(plant_id: &str) -> QueryKey {
    query_key!["sensor", "latest", plant_id]
}

pub fn sensor_trends(plant_id: &str) -> QueryKey {
    query_key!["sensor", "trends", plant_id]
}

pub fn ai_analysis(plant_id: &str) -> QueryKey {
    query_key!["ai", "analysis", plant_id]
}

pub fn latest_analysis() -> QueryKey {
    query_key!["chatHistory", "latest"]
}

pub fn identifications() -> QueryKey {
    query_key!["identifications"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_is_under_plants() {
        assert!(observation_target().starts_with(&plants()));
        assert!(!plant("p1").starts_with(&plants()));
    }

    #[test]
    fn test_sensor_keys_share_prefix() {
        let sensor = QueryKey::new(["sensor"]);
        assert!(latest_sensor("p1").starts_with(&sensor));
        assert!(sensor_trends("p1").starts_with(&sensor));
        assert_ne!(latest_sensor("p1"), latest_sensor("p2"));
    }
}
