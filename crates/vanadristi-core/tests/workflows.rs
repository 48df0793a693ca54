//! Identification, target selection and chat flows against the fake server.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::FakeApi;
use vanadristi_core::queries::GetIdentifications;
use vanadristi_core::workflow::{CHAT_ERROR_REPLY, CHAT_GREETING};
use vanadristi_core::{
    CaptureError, ChatSession, Dashboard, Error, IdentificationState, IdentificationWorkflow,
    ImagePayload, MockCamera, TargetSelection,
};
use vanadristi_types::ChatRole;

#[tokio::test]
async fn test_camera_capture_identifies_and_releases() {
    let server = FakeApi::start().await;
    let client = server.client();
    let camera = MockCamera::new(16, 16);
    let mut workflow = IdentificationWorkflow::new(&client);

    let mut session = workflow.open_camera(&camera).await.unwrap();
    assert_eq!(workflow.state(), &IdentificationState::Capturing);
    assert_eq!(camera.active_tracks(), 1);

    let result = workflow.capture(&mut session).await.unwrap();
    assert_eq!(result.common_name, "Holy Basil");
    assert_eq!(result.scientific_name, "Ocimum tenuiflorum");
    assert_eq!(camera.active_tracks(), 0);

    let preview = workflow.preview().unwrap();
    assert_eq!(preview.file_name, "capture.jpg");
    assert_eq!(preview.mime, "image/jpeg");
    assert_eq!(server.state.identification_count(), 1);

    // Cancelling after a capture is still safe.
    workflow.cancel_capture(session);
    assert_eq!(camera.active_tracks(), 0);
    assert!(workflow.result().is_some());
}

#[tokio::test]
async fn test_cancel_before_capture_releases_camera() {
    let server = FakeApi::start().await;
    let client = server.client();
    let camera = MockCamera::new(4, 4);
    let mut workflow = IdentificationWorkflow::new(&client);

    let session = workflow.open_camera(&camera).await.unwrap();
    workflow.cancel_capture(session);

    assert_eq!(camera.active_tracks(), 0);
    assert_eq!(workflow.state(), &IdentificationState::Idle);
    assert_eq!(server.state.hits("POST /ai/identify"), 0);
}

#[tokio::test]
async fn test_camera_permission_denied() {
    let server = FakeApi::start().await;
    let client = server.client();
    let camera = MockCamera::new(4, 4);
    camera.set_failure(Some(CaptureError::PermissionDenied)).await;
    let mut workflow = IdentificationWorkflow::new(&client);

    let err = workflow.open_camera(&camera).await.unwrap_err();
    assert!(matches!(err, Error::Capture(CaptureError::PermissionDenied)));
    assert!(matches!(workflow.state(), IdentificationState::Error(_)));
    assert_eq!(camera.active_tracks(), 0);
}

#[tokio::test]
async fn test_file_upload_and_history() {
    let server = FakeApi::start().await;
    let client = server.client();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("basil.png");
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

    assert!(client.fetch(&GetIdentifications).await.unwrap().is_empty());

    let mut workflow = IdentificationWorkflow::new(&client);
    workflow.drag_enter();
    workflow.drop_file(&path).await.unwrap();
    assert!(!workflow.is_drag_over());
    assert_eq!(workflow.preview().unwrap().mime, "image/png");

    let history = client.fetch(&GetIdentifications).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history[0].image_url.ends_with("basil.png"));
}

#[tokio::test]
async fn test_failed_identification_keeps_no_result() {
    let server = FakeApi::start().await;
    server.state.fail_identify.store(true, Ordering::SeqCst);
    let client = server.client();
    let mut workflow = IdentificationWorkflow::new(&client);

    let image = ImagePayload::from_bytes(vec![1, 2, 3], "leaf.jpg", "image/jpeg");
    let err = workflow.submit(image).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(
        workflow.state(),
        &IdentificationState::Error("identification service unavailable".into())
    );
    assert!(workflow.result().is_none());
    assert_eq!(server.state.identification_count(), 0);
    // Mutations are not retried.
    assert_eq!(server.state.hits("POST /ai/identify"), 1);
}

#[tokio::test]
async fn test_network_failure_is_error_state() {
    let client = common::unreachable_client();
    let mut workflow = IdentificationWorkflow::new(&client);

    let image = ImagePayload::from_bytes(vec![1], "leaf.jpg", "image/jpeg");
    assert!(workflow.submit(image).await.is_err());
    assert!(matches!(workflow.state(), IdentificationState::Error(_)));
    assert!(workflow.result().is_none());
}

#[tokio::test]
async fn test_duplicate_submission_is_rejected() {
    let server = FakeApi::start().await;
    server.state.identify_delay_ms.store(200, Ordering::SeqCst);
    let client = server.client();
    let workflow = IdentificationWorkflow::new(&client);
    let handle = workflow.mutation().clone();
    let image = ImagePayload::from_bytes(vec![1, 2], "leaf.jpg", "image/jpeg");

    let first = {
        let handle = handle.clone();
        let image = image.clone();
        tokio::spawn(async move { handle.mutate(&image).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(handle.is_pending());

    let second = handle.mutate(&image).await;
    assert!(matches!(second, Err(Error::SubmissionInFlight)));

    let first = first.await.unwrap().unwrap();
    assert_eq!(first.common_name, "Holy Basil");
    assert_eq!(server.state.hits("POST /ai/identify"), 1);
}

#[tokio::test]
async fn test_rejected_submission_keeps_previous_result() {
    let server = FakeApi::start().await;
    let client = server.client();
    let mut workflow = IdentificationWorkflow::new(&client);
    let first = ImagePayload::from_bytes(vec![1, 2], "first.jpg", "image/jpeg");
    workflow.submit(first).await.unwrap();
    let before = workflow.state().clone();

    // Another holder of the shared mutation starts a slow upload.
    server.state.identify_delay_ms.store(200, Ordering::SeqCst);
    let handle = workflow.mutation().clone();
    let other = {
        let image = ImagePayload::from_bytes(vec![3], "other.jpg", "image/jpeg");
        tokio::spawn(async move { handle.mutate(&image).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = ImagePayload::from_bytes(vec![4, 5], "second.jpg", "image/jpeg");
    let result = workflow.submit(second).await;
    assert!(matches!(result, Err(Error::SubmissionInFlight)));
    assert_eq!(workflow.state(), &before);
    assert_eq!(workflow.preview().unwrap().file_name, "first.jpg");

    other.await.unwrap().unwrap();
    assert_eq!(server.state.hits("POST /ai/identify"), 2);
}

#[tokio::test]
async fn test_clear_resets_workflow() {
    let server = FakeApi::start().await;
    let client = server.client();
    let mut workflow = IdentificationWorkflow::new(&client);

    let image = ImagePayload::from_bytes(vec![1, 2], "leaf.jpg", "image/jpeg");
    workflow.submit(image).await.unwrap();
    workflow.clear();

    assert_eq!(workflow.state(), &IdentificationState::Idle);
    assert!(workflow.preview().is_none());
    assert!(!workflow.mutation().is_pending());
}

#[tokio::test]
async fn test_target_selection_save_and_remove() {
    let server = FakeApi::start().await;
    let first = server.state.add_plant("Fern");
    let second = server.state.add_plant("Mint");
    server.state.set_target(Some(&first));
    let client = server.client();

    let mut selection = TargetSelection::load(&client).await.unwrap();
    assert_eq!(selection.committed(), Some(first.as_str()));

    selection.select(&second);
    assert!(selection.is_dirty());
    selection.save(&client).await.unwrap();
    assert!(!selection.is_dirty());

    let reloaded = TargetSelection::load(&client).await.unwrap();
    assert_eq!(reloaded.committed(), Some(second.as_str()));

    selection.remove(&client).await.unwrap();
    assert_eq!(selection.committed(), None);
    assert_eq!(TargetSelection::load(&client).await.unwrap().committed(), None);
}

#[tokio::test]
async fn test_chat_round_trip() {
    let server = FakeApi::start().await;
    let client = server.client();
    let mut session = ChatSession::start("p1", None);
    assert_eq!(session.messages()[0].text, CHAT_GREETING);

    let reply = session.send(&client, "Why are the leaves yellow?").await.unwrap();
    assert_eq!(reply.text, "You asked: Why are the leaves yellow?");
    assert_eq!(session.messages().len(), 3);
    assert_eq!(session.messages()[1].role, ChatRole::User);

    server.state.fail_chat.store(true, Ordering::SeqCst);
    let reply = session.send(&client, "Still there?").await.unwrap();
    assert_eq!(reply.text, CHAT_ERROR_REPLY);
    assert_eq!(reply.role, ChatRole::Ai);
}

#[tokio::test]
async fn test_dashboard_load() {
    let server = FakeApi::start().await;
    server.state.add_plant("Fern");
    server.state.add_plant("Mint");
    let client = server.client();

    let dashboard = Dashboard::load(&client).await.unwrap();
    assert_eq!(dashboard.plant_count(), 2);
    let summary = dashboard.sensor_summary().unwrap();
    assert_eq!(summary.rows[0].value, "24.0 °C");
    assert_eq!(summary.rows[1].value, "N/A");
}
