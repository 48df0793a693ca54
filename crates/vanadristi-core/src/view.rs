//! View-models derived from query states.
//!
//! Views never look at a raw [`QueryState`]; they render one of four cases:
//! a skeleton while loading, an inline alert on error, an empty state, or
//! the data.

use std::sync::Arc;

use time::OffsetDateTime;
use vanadristi_types::{ChatHistoryItem, DiagnosisKind, Plant, SensorData};

use crate::error::Result;
use crate::queries::{DASHBOARD_REFETCH_INTERVAL, GetLatestAnalysis, GetPlants};
use crate::query::Query;
use crate::sync::{QueryClient, QueryState};

/// A list screen.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView<T> {
    Loading,
    Error(String),
    /// Nothing to show; also used for a disabled query.
    Empty,
    Ready(Arc<Vec<T>>),
}

impl<T> From<QueryState<Vec<T>>> for ListView<T> {
    fn from(state: QueryState<Vec<T>>) -> Self {
        match state {
            QueryState::Idle => Self::Empty,
            QueryState::Loading => Self::Loading,
            QueryState::Error(e) => Self::Error(e.message),
            QueryState::Success(items) if items.is_empty() => Self::Empty,
            QueryState::Success(items) => Self::Ready(items),
        }
    }
}

impl<T> ListView<T> {
    /// Items when ready, otherwise nothing.
    pub fn items(&self) -> &[T] {
        match self {
            Self::Ready(items) => items,
            _ => &[],
        }
    }
}

/// A single-record screen or card.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailView<T> {
    Loading,
    Error(String),
    Empty,
    Ready(Arc<T>),
}

impl<T> From<QueryState<T>> for DetailView<T> {
    fn from(state: QueryState<T>) -> Self {
        match state {
            QueryState::Idle => Self::Empty,
            QueryState::Loading => Self::Loading,
            QueryState::Error(e) => Self::Error(e.message),
            QueryState::Success(value) => Self::Ready(value),
        }
    }
}

impl<T: Clone> DetailView<T> {
    /// For queries whose value may be absent, e.g. the observation target.
    pub fn from_optional(state: QueryState<Option<T>>) -> Self {
        match state {
            QueryState::Idle => Self::Empty,
            QueryState::Loading => Self::Loading,
            QueryState::Error(e) => Self::Error(e.message),
            QueryState::Success(value) => match value.as_ref() {
                Some(inner) => Self::Ready(Arc::new(inner.clone())),
                None => Self::Empty,
            },
        }
    }
}

impl<T> DetailView<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// One metric line of a sensor card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRow {
    pub label: &'static str,
    /// Value with one decimal place and unit, or "N/A".
    pub value: String,
}

/// Display form of a [`SensorData`].
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSummary {
    pub plant_name: Option<String>,
    pub observed_at: Option<OffsetDateTime>,
    pub rows: Vec<SensorRow>,
}

fn metric(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, unit),
        None => "N/A".to_string(),
    }
}

impl From<&SensorData> for SensorSummary {
    fn from(data: &SensorData) -> Self {
        Self {
            plant_name: data.plant_name.clone(),
            observed_at: data.parsed_timestamp().ok(),
            rows: vec![
                SensorRow {
                    label: "Temperature",
                    value: metric(data.temperature, " °C"),
                },
                SensorRow {
                    label: "Humidity",
                    value: metric(data.humidity, " %"),
                },
                SensorRow {
                    label: "Soil Moisture",
                    value: metric(data.soil_moisture, " %"),
                },
                SensorRow {
                    label: "Light",
                    value: metric(data.light, " lux"),
                },
            ],
        }
    }
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub plants: ListView<Plant>,
    pub latest_analysis: DetailView<ChatHistoryItem>,
}

impl Dashboard {
    /// Queries the dashboard renders, with its refetch interval.
    pub fn queries() -> (
        impl Query<Output = Vec<Plant>> + Clone,
        impl Query<Output = Option<ChatHistoryItem>> + Clone,
    ) {
        (
            GetPlants.with_refetch_interval(DASHBOARD_REFETCH_INTERVAL),
            GetLatestAnalysis.with_refetch_interval(DASHBOARD_REFETCH_INTERVAL),
        )
    }

    /// Fetch both panels concurrently.
    pub async fn load(client: &QueryClient) -> Result<Self> {
        let (plants, analysis) = Self::queries();
        let (plants, analysis) =
            futures::join!(client.query_state(&plants), client.query_state(&analysis));
        Ok(Self::from_states(plants, analysis))
    }

    pub fn from_states(
        plants: QueryState<Vec<Plant>>,
        analysis: QueryState<Option<ChatHistoryItem>>,
    ) -> Self {
        Self {
            plants: plants.into(),
            latest_analysis: DetailView::from_optional(analysis),
        }
    }

    /// Number of monitored plants; 0 until loaded.
    pub fn plant_count(&self) -> usize {
        self.plants.items().len()
    }

    /// The reading the latest analysis was based on.
    pub fn latest_reading(&self) -> Option<&SensorData> {
        self.latest_analysis.value()?.sensor_data.as_ref()
    }

    pub fn sensor_summary(&self) -> Option<SensorSummary> {
        self.latest_reading().map(SensorSummary::from)
    }

    /// Health class of the latest analysis.
    pub fn diagnosis(&self) -> Option<DiagnosisKind> {
        self.latest_analysis
            .value()?
            .ai_result_parsed
            .as_ref()
            .map(|result| result.kind())
    }
}
