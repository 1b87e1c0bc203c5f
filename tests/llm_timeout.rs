//! A slow model endpoint surfaces as a timeout and aborts the submission.

mod common;

use std::sync::Arc;
use std::time::Duration;

use rig::client::CompletionClient;
use rig::providers::openai;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{MemoryRecorder, RecordingNotifier, staff};
use support_intake::classifier::LlmClassifier;
use support_intake::error::{ClassifierStage, IntakeError, LlmError};
use support_intake::intake::{IntakeDeps, IntakeFlow, Submission};
use support_intake::llm::{ChatMessage, CompletionRequest, LlmProvider, RigAdapter};

const CALL_TIMEOUT: Duration = Duration::from_millis(200);

async fn slow_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    server
}

fn provider(server: &MockServer) -> Arc<dyn LlmProvider> {
    let client: openai::CompletionsClient = openai::CompletionsClient::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .build()
        .unwrap();
    let model = client.completion_model("gpt-4o-mini");
    Arc::new(RigAdapter::new(model, "gpt-4o-mini", "openai", CALL_TIMEOUT))
}

#[tokio::test]
async fn slow_completion_times_out() {
    let server = slow_server().await;
    let llm = provider(&server);

    let err = llm
        .complete(CompletionRequest::new(vec![ChatMessage::user("hello")]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LlmError::Timeout { ref provider, timeout } if provider == "openai" && timeout == CALL_TIMEOUT
    ));
}

#[tokio::test]
async fn timed_out_department_call_logs_nothing() {
    let server = slow_server().await;
    let staff = staff();
    let departments = staff
        .roster
        .department_names()
        .into_iter()
        .map(String::from)
        .collect();

    let recorder = Arc::new(MemoryRecorder::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let flow = IntakeFlow::start(IntakeDeps {
        classifier: Arc::new(LlmClassifier::new(provider(&server), departments)),
        recorder: recorder.clone(),
        notifier: notifier.clone(),
        staff,
    })
    .await
    .unwrap();

    let err = flow
        .submit(Submission {
            email: "customer@example.com".into(),
            query: "I was charged twice".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IntakeError::ClassifierUnavailable {
            stage: ClassifierStage::Department,
            source: LlmError::Timeout { .. },
        }
    ));
    assert!(recorder.rows().is_empty());
    assert!(notifier.sent().is_empty());
    assert!(flow.workload().await.values().all(|&n| n == 0));
}
