//! HTTP client for the VanaDristi REST API.
//!
//! [`ApiClient`] has one method per server endpoint. It is cheap to clone
//! (the connection pool is shared) and is handed explicitly to whatever
//! needs it; there is no global instance.
//!
//! # Example
//!
//! ```no_run
//! use vanadristi_core::ApiClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ApiClient::new("http://localhost:8000/api/v1")?;
//!
//! for plant in client.list_plants().await? {
//!     println!("{} ({})", plant.name, plant.id);
//! }
//!
//! if let Some(target) = client.latest_plant().await? {
//!     let reading = client.latest_sensor_data(&target.id).await?;
//!     println!("{:?}", reading.temperature);
//! }
//! # Ok(())
//! # }
//! ```

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::debug;
use vanadristi_types::{
    AiAnalysisResponse, ChatHistoryItem, ChatReply, ChatRequest, IdentificationResult, NewPlant,
    ObservationTarget, Plant, PlantUpdate, SensorData, SetTargetRequest, TrendData,
};

use crate::capture::ImagePayload;
use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// HTTP client for the VanaDristi API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with the default timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root including the version prefix
    ///   (e.g., "http://localhost:8000/api/v1")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::from_config(&ClientConfig::new(base_url))
    }

    /// Create a client from a [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(Error::Request)?;

        Self::with_client(&config.base_url, client)
    }

    /// Create a client with a custom reqwest Client.
    pub fn with_client(base_url: &str, client: Client) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;
        Ok(Self { client, base_url })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of `collection/id`, with `id` percent-encoded as one path segment.
    fn item_url(&self, collection: &[&str], id: &str) -> Result<String> {
        let mut url = Url::parse(&self.base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(collection)
            .push(id);
        Ok(url.into())
    }

    // ----- plants -----

    /// List every registered plant.
    pub async fn list_plants(&self) -> Result<Vec<Plant>> {
        self.get_json(&self.url("/plants/")).await
    }

    /// Fetch one plant.
    pub async fn get_plant(&self, id: &str) -> Result<Plant> {
        self.get_json(&self.item_url(&["plants"], id)?).await
    }

    /// Register a plant.
    pub async fn create_plant(&self, plant: &NewPlant) -> Result<Plant> {
        let url = self.url("/plants/");
        self.send_json(&url, self.client.post(&url).json(plant)).await
    }

    /// Change some fields of a plant.
    pub async fn update_plant(&self, id: &str, update: &PlantUpdate) -> Result<Plant> {
        let url = self.item_url(&["plants"], id)?;
        self.send_json(&url, self.client.put(&url).json(update)).await
    }

    /// Delete a plant.
    pub async fn delete_plant(&self, id: &str) -> Result<()> {
        let url = self.item_url(&["plants"], id)?;
        self.send_ignoring_body(&url, self.client.delete(&url)).await
    }

    // ----- observation target -----

    /// The plant currently under observation.
    ///
    /// The server answers 404 when no target is set; that is `Ok(None)`.
    pub async fn latest_plant(&self) -> Result<Option<ObservationTarget>> {
        match self.get_json(&self.url("/plants/latest")).await {
            Ok(target) => Ok(Some(target)),
            Err(e) if e.is_not_found() => {
                debug!("No observation target set");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Choose the plant the sensors observe.
    pub async fn set_latest_plant(&self, plant_id: &str) -> Result<()> {
        let url = self.url("/plants/latest");
        let body = SetTargetRequest {
            plant_id: plant_id.to_string(),
        };
        self.send_ignoring_body(&url, self.client.post(&url).json(&body))
            .await
    }

    /// Clear the observation target.
    pub async fn clear_latest_plant(&self) -> Result<()> {
        let url = self.url("/plants/latest");
        self.send_ignoring_body(&url, self.client.delete(&url)).await
    }

    // ----- sensor -----

    /// Most recent reading for a plant.
    pub async fn latest_sensor_data(&self, plant_id: &str) -> Result<SensorData> {
        self.get_json(&self.item_url(&["sensor", "latest"], plant_id)?)
            .await
    }

    /// Daily averages for a plant.
    pub async fn sensor_trends(&self, plant_id: &str) -> Result<Vec<TrendData>> {
        self.get_json(&self.item_url(&["sensor", "trends"], plant_id)?)
            .await
    }

    // ----- ai -----

    /// Run an AI analysis of a plant's latest readings.
    pub async fn ai_analysis(&self, plant_id: &str) -> Result<AiAnalysisResponse> {
        let url = self.url("/ai/analysis");
        let request = self.client.get(&url).query(&[("plant_id", plant_id)]);
        self.send_json(&url, request).await
    }

    /// Stored analyses, newest first.
    pub async fn chat_history(&self, limit: u32) -> Result<Vec<ChatHistoryItem>> {
        let url = self.url("/ai/chat_history");
        let request = self.client.get(&url).query(&[("limit", limit)]);
        self.send_json(&url, request).await
    }

    /// Ask the assistant a question about a plant.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply> {
        let url = self.url("/ai/chat");
        self.send_json(&url, self.client.post(&url).json(request))
            .await
    }

    /// Past identification results.
    pub async fn identifications(&self) -> Result<Vec<IdentificationResult>> {
        self.get_json(&self.url("/ai/identifications")).await
    }

    /// Upload an image for species identification.
    ///
    /// The image is sent as the multipart field `image`.
    pub async fn identify(&self, image: &ImagePayload) -> Result<IdentificationResult> {
        let url = self.url("/ai/identify");
        let part = Part::bytes(image.bytes.to_vec())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)?;
        let form = Form::new().part("image", part);
        self.send_json(&url, self.client.post(&url).multipart(form))
            .await
    }

    // ----- internal HTTP helpers -----

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send_json(url, self.client.get(url)).await
    }

    async fn send_json<T: DeserializeOwned>(&self, url: &str, request: RequestBuilder) -> Result<T> {
        let body = self.send(url, request).await?;
        serde_json::from_slice(&body).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }

    async fn send_ignoring_body(&self, url: &str, request: RequestBuilder) -> Result<()> {
        self.send(url, request).await.map(|_| ())
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Bytes> {
        let response = request.send().await.map_err(|e| Error::NotReachable {
            url: url.to_string(),
            source: e,
        })?;

        let status = response.status();
        let body = response.bytes().await?;
        debug!("{} -> {}", url, status);

        if status.is_success() {
            Ok(body)
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            })
        }
    }
}

fn normalize_base_url(base_url: &str) -> Result<String> {
    let base_url = base_url.trim().trim_end_matches('/').to_string();

    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(Error::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {}",
            base_url
        )));
    }
    Url::parse(&base_url).map_err(|e| Error::InvalidUrl(format!("{}: {}", base_url, e)))?;

    Ok(base_url)
}

/// Pull a human-readable message out of an error body.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .map(String::from)
            .unwrap_or_else(|| status.to_string())
    };

    let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) else {
        return fallback();
    };

    ["detail", "error", "message"]
        .iter()
        .find_map(|field| match value.get(field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .unwrap_or_else(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = ApiClient::new("http://localhost:8000/api/v1").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
    }

    #[test]
    fn test_client_normalizes_url() {
        let client = ApiClient::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000/api/v1");
        assert_eq!(client.url("/plants/"), "http://localhost:8000/api/v1/plants/");
    }

    #[test]
    fn test_item_url_encodes_id() {
        let client = ApiClient::new("http://localhost:8000/api/v1/").unwrap();
        assert_eq!(
            client.item_url(&["plants"], "p1").unwrap(),
            "http://localhost:8000/api/v1/plants/p1"
        );
        assert_eq!(
            client.item_url(&["plants"], "a/b?c#d").unwrap(),
            "http://localhost:8000/api/v1/plants/a%2Fb%3Fc%23d"
        );
        assert_eq!(
            client.item_url(&["sensor", "trends"], "../latest").unwrap(),
            "http://localhost:8000/api/v1/sensor/trends/..%2Flatest"
        );
    }

    #[test]
    fn test_client_rejects_unparseable_url() {
        assert!(matches!(
            ApiClient::new("http://bad host:80"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_client_invalid_url() {
        let result = ApiClient::new("localhost:8000");
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_client_rejects_invalid_config() {
        let config = ClientConfig::new("http://localhost").timeout_secs(0);
        assert!(matches!(
            ApiClient::from_config(&config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_error_message_fields() {
        let status = StatusCode::NOT_FOUND;
        assert_eq!(
            error_message(status, br#"{"detail":"Plant not found"}"#),
            "Plant not found"
        );
        assert_eq!(error_message(status, br#"{"error":"nope"}"#), "nope");
        assert_eq!(error_message(status, br#"{"message":"gone"}"#), "gone");
        assert_eq!(error_message(status, b"<html>"), "Not Found");
        assert_eq!(error_message(status, b""), "Not Found");
    }

    #[test]
    fn test_error_message_structured_detail() {
        let body = br#"{"detail":[{"loc":["body","name"],"msg":"field required"}]}"#;
        let message = error_message(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert!(message.contains("field required"));
    }
}
