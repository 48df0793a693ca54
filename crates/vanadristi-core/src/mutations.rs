//! Mutation definitions.
//!
//! | Mutation | Request | Invalidates |
//! |----------|---------|-------------|
//! | [`CreatePlant`] | `POST /plants/` | `["plants"]` |
//! | [`UpdatePlant`] | `PUT /plants/{id}` | `["plants"]`, `["plant", id]` |
//! | [`DeletePlant`] | `DELETE /plants/{id}` | `["plants"]` |
//! | [`SetObservationTarget`] | `POST /plants/latest` | `["plants", "latest"]` |
//! | [`ClearObservationTarget`] | `DELETE /plants/latest` | `["plants", "latest"]` |
//! | [`PostChatMessage`] | `POST /ai/chat` | nothing |
//! | [`IdentifyPlant`] | `POST /ai/identify` | `["identifications"]` |
//!
//! Inputs are passed through unchecked; validation is the server's job.

use async_trait::async_trait;
use vanadristi_types::{ChatReply, ChatRequest, IdentificationResult, NewPlant, Plant, PlantUpdate};

use crate::cache::QueryKey;
use crate::capture::ImagePayload;
use crate::client::ApiClient;
use crate::error::Result;
use crate::keys;
use crate::mutation::Mutation;

#[derive(Debug, Clone, Copy, Default)]
pub struct CreatePlant;

#[async_trait]
impl Mutation for CreatePlant {
    type Input = NewPlant;
    type Output = Plant;

    fn name(&self) -> &'static str {
        "create_plant"
    }

    fn invalidates(&self, _input: &NewPlant) -> Vec<QueryKey> {
        vec![keys::plants()]
    }

    async fn execute(&self, client: &ApiClient, input: &NewPlant) -> Result<Plant> {
        client.create_plant(input).await
    }
}

/// Input of [`UpdatePlant`].
#[derive(Debug, Clone)]
pub struct UpdatePlantInput {
    pub id: String,
    pub update: PlantUpdate,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UpdatePlant;

#[async_trait]
impl Mutation for UpdatePlant {
    type Input = UpdatePlantInput;
    type Output = Plant;

    fn name(&self) -> &'static str {
        "update_plant"
    }

    fn invalidates(&self, input: &UpdatePlantInput) -> Vec<QueryKey> {
        vec![keys::plants(), keys::plant(&input.id)]
    }

    async fn execute(&self, client: &ApiClient, input: &UpdatePlantInput) -> Result<Plant> {
        client.update_plant(&input.id, &input.update).await
    }
}

/// Input is the plant id.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletePlant;

#[async_trait]
impl Mutation for DeletePlant {
    type Input = String;
    type Output = ();

    fn name(&self) -> &'static str {
        "delete_plant"
    }

    fn invalidates(&self, _input: &String) -> Vec<QueryKey> {
        vec![keys::plants()]
    }

    async fn execute(&self, client: &ApiClient, id: &String) -> Result<()> {
        client.delete_plant(id).await
    }
}

/// Input is the plant id.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetObservationTarget;

#[async_trait]
impl Mutation for SetObservationTarget {
    type Input = String;
    type Output = ();

    fn name(&self) -> &'static str {
        "set_observation_target"
    }

    fn invalidates(&self, _input: &String) -> Vec<QueryKey> {
        vec![keys::observation_target()]
    }

    async fn execute(&self, client: &ApiClient, plant_id: &String) -> Result<()> {
        client.set_latest_plant(plant_id).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClearObservationTarget;

#[async_trait]
impl Mutation for ClearObservationTarget {
    type Input = ();
    type Output = ();

    fn name(&self) -> &'static str {
        "clear_observation_target"
    }

    fn invalidates(&self, _input: &()) -> Vec<QueryKey> {
        vec![keys::observation_target()]
    }

    async fn execute(&self, client: &ApiClient, _input: &()) -> Result<()> {
        client.clear_latest_plant().await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PostChatMessage;

#[async_trait]
impl Mutation for PostChatMessage {
    type Input = ChatRequest;
    type Output = ChatReply;

    fn name(&self) -> &'static str {
        "post_chat_message"
    }

    fn invalidates(&self, _input: &ChatRequest) -> Vec<QueryKey> {
        Vec::new()
    }

    async fn execute(&self, client: &ApiClient, input: &ChatRequest) -> Result<ChatReply> {
        client.chat(input).await
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifyPlant;

#[async_trait]
impl Mutation for IdentifyPlant {
    type Input = ImagePayload;
    type Output = IdentificationResult;

    fn name(&self) -> &'static str {
        "identify_plant"
    }

    fn invalidates(&self, _input: &ImagePayload) -> Vec<QueryKey> {
        vec![keys::identifications()]
    }

    async fn execute(
        &self,
        client: &ApiClient,
        image: &ImagePayload,
    ) -> Result<IdentificationResult> {
        client.identify(image).await
    }
}
