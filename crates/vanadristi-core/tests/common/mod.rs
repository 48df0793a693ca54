//! In-process fake of the VanaDristi API for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;
use vanadristi_core::{ApiClient, CacheConfig, QueryCache, QueryClient};

/// Route client logs through the test harness so they show for failing
/// tests. `RUST_LOG` overrides the default `warn` level.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
pub struct FakeState {
    plants: Mutex<Vec<Value>>,
    target: Mutex<Option<String>>,
    identifications: Mutex<Vec<Value>>,
    hits: Mutex<HashMap<String, usize>>,
    next_id: AtomicU32,
    /// Number of upcoming analysis requests answered with 500.
    pub analysis_failures: AtomicU32,
    pub fail_identify: AtomicBool,
    pub fail_chat: AtomicBool,
    pub identify_delay_ms: AtomicU64,
    pub plants_delay_ms: AtomicU64,
}

impl FakeState {
    fn hit(&self, route: &str) {
        *self.hits.lock().unwrap().entry(route.to_string()).or_default() += 1;
    }

    /// How many times `route` (e.g. `"GET /plants/"`) was requested.
    pub fn hits(&self, route: &str) -> usize {
        self.hits.lock().unwrap().get(route).copied().unwrap_or(0)
    }

    pub fn add_plant(&self, name: &str) -> String {
        let id = format!("p{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.plants.lock().unwrap().push(json!({
            "_id": id,
            "name": name,
            "species": "Ocimum",
            "created_at": "2025-06-01 08:30:00.123456",
        }));
        id
    }

    pub fn set_target(&self, id: Option<&str>) {
        *self.target.lock().unwrap() = id.map(String::from);
    }

    pub fn identification_count(&self) -> usize {
        self.identifications.lock().unwrap().len()
    }
}

type AppState = Arc<FakeState>;

pub struct FakeApi {
    pub base_url: String,
    pub state: AppState,
}

impl FakeApi {
    pub async fn start() -> Self {
        init_tracing();
        let state = AppState::default();
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}/api/v1", addr),
            state,
        }
    }

    pub fn api(&self) -> ApiClient {
        ApiClient::new(&self.base_url).unwrap()
    }

    pub fn client(&self) -> QueryClient {
        self.client_with(CacheConfig::default())
    }

    pub fn client_with(&self, cache: CacheConfig) -> QueryClient {
        QueryClient::new(self.api(), QueryCache::new(cache))
    }
}

/// A URL on which nothing listens.
pub fn unreachable_client() -> QueryClient {
    init_tracing();
    QueryClient::new(
        ApiClient::new("http://127.0.0.1:9/api/v1").unwrap(),
        QueryCache::default(),
    )
}

fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/plants/", get(list_plants).post(create_plant))
        .route(
            "/plants/latest",
            get(get_target).post(set_target).delete(clear_target),
        )
        .route(
            "/plants/{id}",
            get(get_plant).put(update_plant).delete(delete_plant),
        )
        .route("/sensor/latest/{id}", get(latest_sensor))
        .route("/sensor/trends/{id}", get(sensor_trends))
        .route("/ai/analysis", get(analysis))
        .route("/ai/chat_history", get(chat_history))
        .route("/ai/chat", post(chat))
        .route("/ai/identifications", get(identifications))
        .route("/ai/identify", post(identify));

    Router::new().nest("/api/v1", api).with_state(state)
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": detail }))).into_response()
}

async fn list_plants(State(state): State<AppState>) -> Json<Value> {
    state.hit("GET /plants/");
    let delay = state.plants_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Json(Value::Array(state.plants.lock().unwrap().clone()))
}

async fn create_plant(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    state.hit("POST /plants/");
    let Some(name) = body.get("name").and_then(Value::as_str) else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "detail": "name is required" })),
        )
            .into_response();
    };
    let id = state.add_plant(name);
    let plant = state
        .plants
        .lock()
        .unwrap()
        .iter()
        .find(|p| p["_id"] == id.as_str())
        .cloned()
        .unwrap();
    (StatusCode::CREATED, Json(plant)).into_response()
}

async fn get_plant(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.hit("GET /plants/{id}");
    let plants = state.plants.lock().unwrap();
    match plants.iter().find(|p| p["_id"] == id.as_str()) {
        Some(plant) => Json(plant.clone()).into_response(),
        None => not_found("Plant not found"),
    }
}

async fn update_plant(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    state.hit("PUT /plants/{id}");
    let mut plants = state.plants.lock().unwrap();
    let Some(plant) = plants.iter_mut().find(|p| p["_id"] == id.as_str()) else {
        return not_found("Plant not found");
    };
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            if !value.is_null() {
                plant[key] = value.clone();
            }
        }
    }
    Json(plant.clone()).into_response()
}

async fn delete_plant(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.hit("DELETE /plants/{id}");
    let mut plants = state.plants.lock().unwrap();
    let before = plants.len();
    plants.retain(|p| p["_id"] != id.as_str());
    if plants.len() == before {
        return not_found("Plant not found");
    }
    // Empty body on purpose.
    StatusCode::NO_CONTENT.into_response()
}

async fn get_target(State(state): State<AppState>) -> Response {
    state.hit("GET /plants/latest");
    match state.target.lock().unwrap().clone() {
        Some(id) => Json(json!({ "_id": id })).into_response(),
        None => not_found("No latest plant set"),
    }
}

async fn set_target(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    state.hit("POST /plants/latest");
    let id = body["plant_id"].as_str().map(String::from);
    *state.target.lock().unwrap() = id;
    // Plain-text acknowledgement, not JSON.
    (StatusCode::OK, "ok").into_response()
}

async fn clear_target(State(state): State<AppState>) -> Response {
    state.hit("DELETE /plants/latest");
    *state.target.lock().unwrap() = None;
    Json(json!({ "message": "cleared" })).into_response()
}

async fn latest_sensor(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    state.hit("GET /sensor/latest/{id}");
    if id == "missing" {
        return not_found("No sensor data");
    }
    // Older server shape.
    Json(json!({
        "plant_id": id,
        "plant_name": "Tulsi",
        "timestamp": "2025-06-01 08:30:00.123",
        "temperature": 26.4,
        "humidity": 61,
        "soil_data": { "Soil_Moisture": 38.5 },
        "light_intensity": 840.0,
    }))
    .into_response()
}

async fn sensor_trends(State(state): State<AppState>, Path(_id): Path<String>) -> Json<Value> {
    state.hit("GET /sensor/trends/{id}");
    Json(json!([
        { "_id": "2025-06-01", "avg_temp": 25.0, "avg_moisture": 40.0, "avg_humidity": 60.0 },
        { "_id": "2025-06-02", "avg_temp": 26.0, "avg_moisture": 35.5, "avg_humidity": 58.0 },
    ]))
}

#[derive(Deserialize)]
struct AnalysisParams {
    plant_id: String,
}

async fn analysis(State(state): State<AppState>, Query(params): Query<AnalysisParams>) -> Response {
    state.hit("GET /ai/analysis");
    let remaining = state.analysis_failures.load(Ordering::SeqCst);
    if remaining > 0 {
        state.analysis_failures.store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "model timeout" })),
        )
            .into_response();
    }
    Json(json!({
        "status": "ok",
        "ai_result": {
            "diagnosis": "Needs water",
            "confidence": 0.87,
            "actions": ["Water 200 ml"],
            "watering_recommendation": "Water today",
            "notes": format!("Soil of {} is dry", params.plant_id),
        }
    }))
    .into_response()
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: usize,
}

async fn chat_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Json<Value> {
    state.hit("GET /ai/chat_history");
    let items = vec![json!({
        "timestamp": "2025-06-01 09:00:00",
        "plant_id": "p1",
        "sensor_data": { "plant_id": "p1", "timestamp": "2025-06-01 08:59:00", "temperature": 24.0 },
        "ai_result_parsed": { "diagnosis": "Healthy", "notes": "All good" },
    })];
    Json(Value::Array(items.into_iter().take(params.limit).collect()))
}

async fn chat(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    state.hit("POST /ai/chat");
    if state.fail_chat.load(Ordering::SeqCst) {
        return StatusCode::BAD_GATEWAY.into_response();
    }
    let question = body["question"].as_str().unwrap_or_default();
    Json(json!({ "response": format!("You asked: {}", question) })).into_response()
}

async fn identifications(State(state): State<AppState>) -> Json<Value> {
    state.hit("GET /ai/identifications");
    Json(Value::Array(state.identifications.lock().unwrap().clone()))
}

async fn identify(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    state.hit("POST /ai/identify");
    let delay = state.identify_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if state.fail_identify.load(Ordering::SeqCst) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "identification service unavailable" })),
        )
            .into_response();
    }

    let mut image_len = 0;
    let mut file_name = String::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("image") {
            file_name = field.file_name().unwrap_or_default().to_string();
            image_len = field.bytes().await.unwrap().len();
        }
    }
    if image_len == 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "image field missing" })),
        )
            .into_response();
    }

    let result = json!({
        "common_name": "Holy Basil",
        "scientific_name": "Ocimum tenuiflorum",
        "family": "Lamiaceae",
        "uses": "Medicinal tea",
        "similar_species": ["Ocimum basilicum"],
        "image_url": format!("https://img.example/{}", file_name),
    });
    state.identifications.lock().unwrap().push(result.clone());
    Json(result).into_response()
}
