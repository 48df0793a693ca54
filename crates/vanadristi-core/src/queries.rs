//! Query definitions for every read the application makes.
//!
//! Queries that take a plant id are disabled while the id is blank, so a view
//! with nothing selected never issues a request.

use std::time::Duration;

use async_trait::async_trait;
use vanadristi_types::{
    AiAnalysisResponse, ChatHistoryItem, IdentificationResult, ObservationTarget, Plant,
    SensorData, TrendData,
};

use crate::cache::QueryKey;
use crate::client::ApiClient;
use crate::error::Result;
use crate::keys;
use crate::query::Query;
use crate::retry::RetryConfig;

/// Refetch interval of the dashboard's live panels.
pub const DASHBOARD_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

fn has_id(id: &str) -> bool {
    !id.trim().is_empty()
}

/// All plants.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetPlants;

#[async_trait]
impl Query for GetPlants {
    type Output = Vec<Plant>;

    fn key(&self) -> QueryKey {
        keys::plants()
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.list_plants().await
    }
}

/// One plant by id.
#[derive(Debug, Clone)]
pub struct GetPlant {
    pub id: String,
}

impl GetPlant {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Query for GetPlant {
    type Output = Plant;

    fn key(&self) -> QueryKey {
        keys::plant(&self.id)
    }

    fn enabled(&self) -> bool {
        has_id(&self.id)
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.get_plant(&self.id).await
    }
}

/// The plant under observation, `None` when unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetObservationTarget;

#[async_trait]
impl Query for GetObservationTarget {
    type Output = Option<ObservationTarget>;

    fn key(&self) -> QueryKey {
        keys::observation_target()
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.latest_plant().await
    }
}

/// Latest sensor reading of a plant.
#[derive(Debug, Clone)]
pub struct GetLatestSensorData {
    pub plant_id: String,
}

impl GetLatestSensorData {
    pub fn new(plant_id: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
        }
    }
}

#[async_trait]
impl Query for GetLatestSensorData {
    type Output = SensorData;

    fn key(&self) -> QueryKey {
        keys::latest_sensor(&self.plant_id)
    }

    fn enabled(&self) -> bool {
        has_id(&self.plant_id)
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.latest_sensor_data(&self.plant_id).await
    }
}

/// Daily sensor averages of a plant.
#[derive(Debug, Clone)]
pub struct GetSensorTrends {
    pub plant_id: String,
}

impl GetSensorTrends {
    pub fn new(plant_id: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
        }
    }
}

#[async_trait]
impl Query for GetSensorTrends {
    type Output = Vec<TrendData>;

    fn key(&self) -> QueryKey {
        keys::sensor_trends(&self.plant_id)
    }

    fn enabled(&self) -> bool {
        has_id(&self.plant_id)
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.sensor_trends(&self.plant_id).await
    }
}

/// AI analysis of a plant. Retried once; the model call is flaky.
#[derive(Debug, Clone)]
pub struct GetAiAnalysis {
    pub plant_id: String,
}

impl GetAiAnalysis {
    pub fn new(plant_id: impl Into<String>) -> Self {
        Self {
            plant_id: plant_id.into(),
        }
    }
}

#[async_trait]
impl Query for GetAiAnalysis {
    type Output = AiAnalysisResponse;

    fn key(&self) -> QueryKey {
        keys::ai_analysis(&self.plant_id)
    }

    fn enabled(&self) -> bool {
        has_id(&self.plant_id)
    }

    fn retry(&self) -> RetryConfig {
        RetryConfig::once()
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.ai_analysis(&self.plant_id).await
    }
}

/// Newest stored analysis, `None` when there is none.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetLatestAnalysis;

#[async_trait]
impl Query for GetLatestAnalysis {
    type Output = Option<ChatHistoryItem>;

    fn key(&self) -> QueryKey {
        keys::latest_analysis()
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        Ok(client.chat_history(1).await?.into_iter().next())
    }
}

/// Past identifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetIdentifications;

#[async_trait]
impl Query for GetIdentifications {
    type Output = Vec<IdentificationResult>;

    fn key(&self) -> QueryKey {
        keys::identifications()
    }

    async fn fetch(&self, client: &ApiClient) -> Result<Self::Output> {
        client.identifications().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_id_disables_query() {
        assert!(!GetPlant::new("").enabled());
        assert!(!GetLatestSensorData::new("   ").enabled());
        assert!(!GetSensorTrends::new("").enabled());
        assert!(!GetAiAnalysis::new("").enabled());
        assert!(GetPlant::new("p1").enabled());
        assert!(GetPlants.enabled());
    }

    #[test]
    fn test_only_analysis_retries() {
        assert_eq!(GetAiAnalysis::new("p1").retry().max_retries, 1);
        assert_eq!(GetPlants.retry().max_retries, 0);
        assert_eq!(GetLatestSensorData::new("p1").retry().max_retries, 0);
    }

    #[test]
    fn test_refetch_interval_wrapper_keeps_key() {
        let query = GetLatestSensorData::new("p1").with_refetch_interval(DASHBOARD_REFETCH_INTERVAL);
        assert_eq!(query.key(), keys::latest_sensor("p1"));
        assert_eq!(query.refetch_interval(), Some(Duration::from_secs(60)));
        assert_eq!(GetLatestSensorData::new("p1").refetch_interval(), None);
    }
}
