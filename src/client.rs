//! Error types and the `GenerationClient` entry point.

use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::http::{authorized, error_for_status, with_request_timeout};
use crate::model::{ErrorEvent, ErrorOrigin, FinalDocuments, GenerationRequest};
use crate::options::{ClientOptions, SecretString};
use crate::session::{self, GenerationObserver, SessionHandle, SessionOutcome};
use crate::transport::{HttpTransport, Transport};

/// Path of the streaming generation endpoint.
pub const GENERATE_STREAM_PATH: &str = "/generate-stream";

/// Path of the single-shot generation endpoint.
pub const GENERATE_PATH: &str = "/generate";

/// Errors raised by the HTTP layer.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A non-terminal frame that could not be decoded. Never fatal: the frame
/// is logged and skipped.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("frame has no data line")]
    MissingData,

    #[error("malformed partial payload: {0}")]
    MalformedPartial(#[source] serde_json::Error),
}

/// Terminal failure of a generation, delivered to the caller exactly once.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// The server reported an error frame
    #[error("{0}")]
    Server(String),

    /// The stream was unusable: no terminal frame, or a malformed one
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("transport error: {0}")]
    Transport(#[from] ClientError),
}

impl From<ErrorEvent> for GenerationError {
    fn from(event: ErrorEvent) -> Self {
        match event.origin {
            ErrorOrigin::Server => GenerationError::Server(event.message),
            ErrorOrigin::Protocol => GenerationError::Protocol(event.message),
        }
    }
}

/// Client for the generation service.
///
/// Generic over the [`Transport`] so sessions can be driven by something
/// other than a live HTTP connection.
///
/// # Example
/// ```no_run
/// use career_copilot::client::GenerationClient;
/// use career_copilot::options::ClientOptions;
/// use career_copilot::session::SessionOutcome;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = GenerationClient::new(ClientOptions::from_env())?;
/// let mut session = client.start("Senior Rust engineer", "id-token".into());
/// while let Some(update) = session.next_update().await {
///     print!("{}", update.chunk);
/// }
/// match session.outcome().await {
///     SessionOutcome::Completed(docs) => println!("{}", docs.document_url),
///     SessionOutcome::Failed(e) => eprintln!("{}", e),
///     SessionOutcome::Cancelled => {}
/// }
/// # Ok(())
/// # }
/// ```
pub struct GenerationClient<T = HttpTransport> {
    transport: Arc<T>,
    options: ClientOptions,
    http: reqwest::Client,
}

impl GenerationClient<HttpTransport> {
    /// Create a client talking to the configured service over HTTP.
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(options.clone())?;
        let http = transport.http_client().clone();
        Ok(Self {
            transport: Arc::new(transport),
            options,
            http,
        })
    }
}

impl<T: Transport + 'static> GenerationClient<T> {
    /// Create a client with a custom transport for streaming sessions.
    /// Single-call requests still go over HTTP using `options`.
    pub fn with_transport(transport: T, options: ClientOptions) -> Result<Self, ClientError> {
        let http = crate::http::build_http_client(&options)?;
        Ok(Self {
            transport: Arc::new(transport),
            options,
            http,
        })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Start a streaming generation on a background task.
    pub fn start(&self, job_description: impl Into<String>, token: SecretString) -> SessionHandle {
        session::spawn(
            Arc::clone(&self.transport),
            GenerationRequest::new(job_description),
            token,
        )
    }

    /// Drive a streaming generation on the current task, reporting to
    /// `observer`. Cancelling `cancel` stops the session silently.
    pub async fn run<O: GenerationObserver>(
        &self,
        job_description: impl Into<String>,
        token: SecretString,
        observer: &mut O,
        cancel: CancellationToken,
    ) -> SessionOutcome {
        session::drive(
            &*self.transport,
            GenerationRequest::new(job_description),
            token,
            observer,
            cancel,
        )
        .await
    }

    /// Generate both documents in one non-streaming call.
    pub async fn generate(
        &self,
        job_description: impl Into<String>,
        token: &SecretString,
    ) -> Result<FinalDocuments, GenerationError> {
        let url = self.options.endpoint(GENERATE_PATH);
        info!(url = %url, "requesting single-shot generation");

        let req = authorized(self.http.post(&url), token, &self.options)
            .json(&GenerationRequest::new(job_description));
        let req = with_request_timeout(req, &self.options);
        let response = error_for_status(req.send().await.map_err(ClientError::from)?).await?;
        let documents = response
            .json::<FinalDocuments>()
            .await
            .map_err(ClientError::from)?;
        Ok(documents)
    }
}
