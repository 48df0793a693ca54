//! Interactive flows that span several requests.
//!
//! - [`IdentificationWorkflow`]: camera or file to identification result
//! - [`TargetSelection`]: choosing which plant the sensors observe
//! - [`ChatSession`]: conversation with the AI assistant about one plant

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};
use vanadristi_types::{AiAnalysisResult, ChatMessage, ChatRequest, IdentificationResult};

use crate::capture::{Camera, CaptureConstraints, CaptureSession, ImagePayload};
use crate::error::{Error, Result};
use crate::mutations::{ClearObservationTarget, IdentifyPlant, PostChatMessage, SetObservationTarget};
use crate::queries::GetObservationTarget;
use crate::sync::{MutationHandle, QueryClient, QueryError};

/// Where an identification stands.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentificationState {
    Idle,
    /// Camera open, waiting for the shutter.
    Capturing,
    /// Image uploaded, waiting for the server.
    AwaitingResult,
    Success(Arc<IdentificationResult>),
    Error(String),
}

/// Drives one identification from image to result.
///
/// Only one submission runs at a time. Submitting again while a result is
/// pending fails with [`Error::SubmissionInFlight`] and leaves the first
/// request running.
#[derive(Debug)]
pub struct IdentificationWorkflow {
    mutation: MutationHandle<IdentifyPlant>,
    state: IdentificationState,
    preview: Option<ImagePayload>,
    drag_over: bool,
}

impl IdentificationWorkflow {
    pub fn new(client: &QueryClient) -> Self {
        Self {
            mutation: client.mutation(IdentifyPlant),
            state: IdentificationState::Idle,
            preview: None,
            drag_over: false,
        }
    }

    pub fn state(&self) -> &IdentificationState {
        &self.state
    }

    /// The image most recently submitted.
    pub fn preview(&self) -> Option<&ImagePayload> {
        self.preview.as_ref()
    }

    /// The result, once there is one.
    pub fn result(&self) -> Option<&Arc<IdentificationResult>> {
        match &self.state {
            IdentificationState::Success(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_drag_over(&self) -> bool {
        self.drag_over
    }

    /// The underlying mutation, shared with this workflow.
    pub fn mutation(&self) -> &MutationHandle<IdentifyPlant> {
        &self.mutation
    }

    /// Open the rear camera.
    pub async fn open_camera(&mut self, camera: &dyn Camera) -> Result<CaptureSession> {
        match CaptureSession::open(camera, CaptureConstraints::default()).await {
            Ok(session) => {
                self.state = IdentificationState::Capturing;
                Ok(session)
            }
            Err(e) => {
                self.state = IdentificationState::Error(e.to_string());
                Err(e)
            }
        }
    }

    /// Close the camera without taking a picture.
    pub fn cancel_capture(&mut self, session: CaptureSession) {
        session.cancel();
        if self.state == IdentificationState::Capturing {
            self.state = IdentificationState::Idle;
        }
    }

    /// Take a picture and submit it.
    pub async fn capture(
        &mut self,
        session: &mut CaptureSession,
    ) -> Result<Arc<IdentificationResult>> {
        let payload = match session.capture() {
            Ok(payload) => payload,
            Err(e) => {
                self.state = IdentificationState::Error(e.to_string());
                return Err(e);
            }
        };
        self.submit(payload).await
    }

    /// Submit a picked file.
    pub async fn select_file(&mut self, path: impl AsRef<Path>) -> Result<Arc<IdentificationResult>> {
        let payload = match ImagePayload::from_path(path).await {
            Ok(payload) => payload,
            Err(e) => {
                self.state = IdentificationState::Error(e.to_string());
                return Err(e);
            }
        };
        self.submit(payload).await
    }

    /// Submit a dropped file.
    pub async fn drop_file(&mut self, path: impl AsRef<Path>) -> Result<Arc<IdentificationResult>> {
        self.drag_over = false;
        self.select_file(path).await
    }

    pub fn drag_enter(&mut self) {
        self.drag_over = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_over = false;
    }

    /// Upload an image for identification.
    ///
    /// Rejected with [`Error::SubmissionInFlight`] while any holder of the
    /// shared mutation has a request pending; state and preview are then
    /// left as they were.
    pub async fn submit(&mut self, payload: ImagePayload) -> Result<Arc<IdentificationResult>> {
        debug!("Submitting {} ({} bytes)", payload.file_name, payload.len());
        let previous_state =
            std::mem::replace(&mut self.state, IdentificationState::AwaitingResult);
        let previous_preview = self.preview.replace(payload.clone());

        match self.mutation.mutate(&payload).await {
            Ok(result) => {
                info!("Identified {}", result.common_name);
                self.state = IdentificationState::Success(Arc::clone(&result));
                Ok(result)
            }
            Err(Error::SubmissionInFlight) => {
                self.state = previous_state;
                self.preview = previous_preview;
                Err(Error::SubmissionInFlight)
            }
            Err(e) => {
                self.state = IdentificationState::Error(QueryError::from(&e).message);
                Err(e)
            }
        }
    }

    /// Forget the image and result and start over.
    pub fn clear(&mut self) {
        self.state = IdentificationState::Idle;
        self.preview = None;
        self.drag_over = false;
        self.mutation.reset();
    }
}

/// The observation target being edited.
///
/// `committed` is what the server has; `pending` is the local choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSelection {
    committed: Option<String>,
    pending: Option<String>,
}

impl TargetSelection {
    pub fn new(committed: Option<String>) -> Self {
        Self {
            pending: committed.clone(),
            committed,
        }
    }

    /// Start from the server's current target.
    pub async fn load(client: &QueryClient) -> Result<Self> {
        let target = client.fetch(&GetObservationTarget).await?;
        Ok(Self::new((*target).as_ref().map(|t| t.id.clone())))
    }

    pub fn committed(&self) -> Option<&str> {
        self.committed.as_deref()
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Returns true when the local choice differs from the server.
    pub fn is_dirty(&self) -> bool {
        self.pending != self.committed
    }

    pub fn select(&mut self, plant_id: impl Into<String>) {
        self.pending = Some(plant_id.into());
    }

    /// Drop the local choice.
    pub fn cancel(&mut self) {
        self.pending = self.committed.clone();
    }

    /// Send the local choice to the server.
    pub async fn save(&mut self, client: &QueryClient) -> Result<()> {
        if !self.is_dirty() {
            return Ok(());
        }
        match self.pending.clone() {
            Some(id) => {
                client.mutate(&SetObservationTarget, &id).await?;
                self.committed = Some(id);
                Ok(())
            }
            None => self.remove(client).await,
        }
    }

    /// Clear the target on the server.
    pub async fn remove(&mut self, client: &QueryClient) -> Result<()> {
        client.mutate(&ClearObservationTarget, &()).await?;
        self.committed = None;
        self.pending = None;
        Ok(())
    }

    /// Take a fresh value from the server. An unedited choice follows it.
    pub fn sync(&mut self, committed: Option<String>) {
        if !self.is_dirty() {
            self.pending = committed.clone();
        }
        self.committed = committed;
    }
}

/// Reply shown when the assistant cannot answer.
pub const CHAT_ERROR_REPLY: &str = "Sorry, I couldn't process that. Please try again.";

/// Opening message when no analysis exists.
pub const CHAT_GREETING: &str =
    "Hello! I couldn't find a recent analysis, but I'm ready to help. How is your plant doing today?";

/// A conversation about one plant.
#[derive(Debug, Clone)]
pub struct ChatSession {
    plant_id: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    /// Open with the analysis summary, or a greeting without one.
    pub fn start(plant_id: impl Into<String>, analysis: Option<&AiAnalysisResult>) -> Self {
        let opening = match analysis {
            Some(result) => format!("*Diagnosis:* {}. {}", result.diagnosis, result.notes),
            None => CHAT_GREETING.to_string(),
        };
        Self {
            plant_id: plant_id.into(),
            messages: vec![ChatMessage::ai(opening)],
        }
    }

    pub fn plant_id(&self) -> &str {
        &self.plant_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Ask a question. Blank input is ignored.
    ///
    /// Returns the assistant's message, which is [`CHAT_ERROR_REPLY`] when
    /// the request failed.
    pub async fn send(&mut self, client: &QueryClient, question: &str) -> Option<&ChatMessage> {
        if question.trim().is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(question));
        let request = ChatRequest {
            plant_id: self.plant_id.clone(),
            question: question.to_string(),
        };
        let reply = match client.mutate(&PostChatMessage, &request).await {
            Ok(reply) => ChatMessage::ai(reply.response),
            Err(e) => {
                debug!("Chat failed: {}", e);
                ChatMessage::ai(CHAT_ERROR_REPLY)
            }
        };
        self.messages.push(reply);
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vanadristi_types::ChatRole;

    #[test]
    fn test_target_selection_dirty_tracking() {
        let mut selection = TargetSelection::new(Some("p1".into()));
        assert!(!selection.is_dirty());

        selection.select("p2");
        assert!(selection.is_dirty());
        assert_eq!(selection.pending(), Some("p2"));

        selection.cancel();
        assert!(!selection.is_dirty());
        assert_eq!(selection.pending(), Some("p1"));
    }

    #[test]
    fn test_sync_follows_server_unless_dirty() {
        let mut selection = TargetSelection::new(None);
        selection.sync(Some("p1".into()));
        assert_eq!(selection.pending(), Some("p1"));

        selection.select("p2");
        selection.sync(Some("p3".into()));
        assert_eq!(selection.committed(), Some("p3"));
        assert_eq!(selection.pending(), Some("p2"));
    }

    #[test]
    fn test_chat_opening_message() {
        let analysis = AiAnalysisResult {
            diagnosis: "Needs water".into(),
            notes: "Soil is dry".into(),
            ..Default::default()
        };
        let session = ChatSession::start("p1", Some(&analysis));
        assert_eq!(session.messages()[0].text, "*Diagnosis:* Needs water. Soil is dry");
        assert_eq!(session.messages()[0].role, ChatRole::Ai);

        let session = ChatSession::start("p1", None);
        assert_eq!(session.messages()[0].text, CHAT_GREETING);
    }

    #[tokio::test]
    async fn test_chat_ignores_blank_input() {
        let client = QueryClient::new(
            crate::ApiClient::new("http://127.0.0.1:9").unwrap(),
            crate::QueryCache::default(),
        );
        let mut session = ChatSession::start("p1", None);
        assert!(session.send(&client, "   ").await.is_none());
        assert_eq!(session.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_workflow_drag_flags() {
        let client = QueryClient::new(
            crate::ApiClient::new("http://127.0.0.1:9").unwrap(),
            crate::QueryCache::default(),
        );
        let mut workflow = IdentificationWorkflow::new(&client);
        workflow.drag_enter();
        assert!(workflow.is_drag_over());
        workflow.drag_leave();
        assert!(!workflow.is_drag_over());
        assert_eq!(workflow.state(), &IdentificationState::Idle);
    }
}
