// End-to-end tests over real HTTP against a wiremock server:
// streaming generation, single-shot generation, documents and feedback.

use career_copilot::client::{ClientError, GenerationClient, GenerationError};
use career_copilot::documents::DocumentsClient;
use career_copilot::feedback::FeedbackClient;
use career_copilot::model::{DocumentField, Feedback, FinalDocuments};
use career_copilot::options::{ClientOptions, SecretString};
use career_copilot::session::{GenerationObserver, SessionOutcome, SessionState, Transcript};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Infrastructure
// ---------------------------------------------------------------------------

const JOB: &str = "Senior Rust engineer, streaming systems";

const STREAM_BODY: &str = "event: partial\ndata: {\"cover_letter_chunk\":\"Dear \"}\n\n\
event: partial\ndata: {\"cover_letter_chunk\":\"Hiring Manager,\",\"resume_chunk\":\"Rust, Tokio\"}\n\n\
event: final\ndata: {\"document_url\":\"https://docs.example/abc\",\"cover_letter_text\":\"Dear Hiring Manager,\",\"resume_text\":\"Rust, Tokio\"}\n\n";

fn token() -> SecretString {
    SecretString::new("test-token".to_string())
}

fn options(server: &MockServer) -> ClientOptions {
    ClientOptions::default().with_base_url(server.uri())
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

#[derive(Default)]
struct Recorder {
    data: Vec<(DocumentField, String, Transcript)>,
    completed: Vec<FinalDocuments>,
    errors: Vec<String>,
}

impl GenerationObserver for Recorder {
    fn on_data(&mut self, field: DocumentField, chunk: &str, transcript: &Transcript) {
        self.data.push((field, chunk.to_string(), transcript.clone()));
    }

    fn on_complete(&mut self, documents: &FinalDocuments) {
        self.completed.push(documents.clone());
    }

    fn on_error(&mut self, error: &GenerationError) {
        self.errors.push(error.to_string());
    }
}

async fn run_stream(server: &MockServer) -> (Recorder, SessionOutcome) {
    let client = GenerationClient::new(options(server)).unwrap();
    let mut recorder = Recorder::default();
    let outcome = client
        .run(JOB, token(), &mut recorder, CancellationToken::new())
        .await;
    (recorder, outcome)
}

// ---------------------------------------------------------------------------
// Streaming generation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_sends_bearer_and_body_and_completes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .and(header("authorization", "Bearer test-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "job_description": JOB })))
        .respond_with(sse(STREAM_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let (recorder, outcome) = run_stream(&server).await;

    assert_eq!(recorder.data.len(), 3);
    let last = &recorder.data[2].2;
    assert_eq!(last.cover_letter, "Dear Hiring Manager,");
    assert_eq!(last.resume, "Rust, Tokio");
    assert_eq!(recorder.completed.len(), 1);
    assert!(recorder.errors.is_empty());
    match outcome {
        SessionOutcome::Completed(docs) => assert_eq!(docs.document_url, "https://docs.example/abc"),
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn stream_error_frame_fails_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(sse("event: error\ndata: Rate limit exceeded\n\n"))
        .mount(&server)
        .await;

    let (recorder, outcome) = run_stream(&server).await;

    assert_eq!(recorder.errors, vec!["Rate limit exceeded"]);
    assert!(recorder.completed.is_empty());
    assert_eq!(outcome.state(), SessionState::Failed);
}

#[tokio::test]
async fn stream_without_terminal_frame_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(sse("event: partial\ndata: {\"resume_chunk\":\"half\"}\n\n"))
        .mount(&server)
        .await;

    let (recorder, outcome) = run_stream(&server).await;

    assert_eq!(recorder.data.len(), 1);
    assert!(matches!(
        outcome,
        SessionOutcome::Failed(GenerationError::Protocol(m)) if m == "stream ended without terminal result"
    ));
}

#[tokio::test]
async fn stream_unauthorized_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token" })))
        .mount(&server)
        .await;

    let (recorder, outcome) = run_stream(&server).await;

    assert_eq!(recorder.errors.len(), 1);
    match outcome {
        SessionOutcome::Failed(GenerationError::Transport(ClientError::Status { status, message })) => {
            assert_eq!(status.as_u16(), 401);
            assert_eq!(message, "Invalid token");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn spawned_session_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate-stream"))
        .respond_with(sse(STREAM_BODY))
        .mount(&server)
        .await;

    let client = GenerationClient::new(options(&server)).unwrap();
    let mut session = client.start(JOB, token());

    let mut chunks = Vec::new();
    while let Some(update) = session.next_update().await {
        chunks.push(update.chunk);
    }
    assert_eq!(chunks, vec!["Dear ", "Hiring Manager,", "Rust, Tokio"]);
    assert!(matches!(session.outcome().await, SessionOutcome::Completed(_)));
}

// ---------------------------------------------------------------------------
// Single-call endpoints
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_returns_documents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "document_url": "https://docs.example/xyz",
            "cover_letter_text": "Dear team,",
            "resume_text": "Summary"
        })))
        .mount(&server)
        .await;

    let client = GenerationClient::new(options(&server)).unwrap();
    let docs = client.generate(JOB, &token()).await.unwrap();
    assert_eq!(docs.document_url, "https://docs.example/xyz");
    assert_eq!(docs.resume_text, "Summary");
}

#[tokio::test]
async fn generate_surfaces_server_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "detail": "model unavailable" })))
        .mount(&server)
        .await;

    let client = GenerationClient::new(options(&server)).unwrap();
    let err = client.generate(JOB, &token()).await.unwrap_err();
    assert_eq!(err.to_string(), "transport error: HTTP 500 Internal Server Error: model unavailable");
}

#[tokio::test]
async fn list_documents_accepts_both_shapes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "a1", "file_name": "resume.pdf", "uploaded_at": "2024-05-01" },
            { "id": "b2", "file_name": "letter.docx" }
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/documents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "documents": [{ "id": "c3", "file_name": "cv.txt" }]
        })))
        .mount(&server)
        .await;

    let client = DocumentsClient::new(options(&server)).unwrap();

    let first = client.list(&token()).await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].file_name, "resume.pdf");
    assert_eq!(first[0].extra.get("uploaded_at"), Some(&json!("2024-05-01")));

    let second = client.list(&token()).await.unwrap();
    assert_eq!(second[0].id, "c3");
}

#[tokio::test]
async fn delete_document() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/a1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/documents/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Document not found" })))
        .mount(&server)
        .await;

    let client = DocumentsClient::new(options(&server)).unwrap();
    client.delete("a1", &token()).await.unwrap();

    let err = client.delete("missing", &token()).await.unwrap_err();
    assert!(matches!(err, ClientError::Status { message, .. } if message == "Document not found"));

    assert!(matches!(client.delete("", &token()).await, Err(ClientError::Config(_))));
}

#[tokio::test]
async fn delete_document_escapes_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/documents/a%2Fb"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = DocumentsClient::new(options(&server)).unwrap();
    client.delete("a/b", &token()).await.unwrap();
}

#[tokio::test]
async fn submit_feedback() {
    let feedback = Feedback {
        feedback: "Too formal".to_string(),
        job_description: JOB.to_string(),
        generated_content: json!({ "cover_letter_text": "Dear Sir or Madam," }),
    };

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/feedback"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "feedback": "Too formal",
            "job_description": JOB,
            "generated_content": { "cover_letter_text": "Dear Sir or Madam," }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = FeedbackClient::new(options(&server)).unwrap();
    client.submit(&token(), &feedback).await.unwrap();

    let empty = Feedback {
        feedback: "  ".to_string(),
        ..feedback
    };
    assert!(matches!(client.submit(&token(), &empty).await, Err(ClientError::Config(_))));
}
