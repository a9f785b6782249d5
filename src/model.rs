//! Data models for generation requests, decoded stream events and the
//! documents/feedback resources.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenerationRequest {
    pub job_description: String,
}

impl GenerationRequest {
    pub fn new(job_description: impl Into<String>) -> Self {
        Self {
            job_description: job_description.into(),
        }
    }
}

/// Which generated document a partial chunk belongs to.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DocumentField {
    CoverLetter,
    Resume,
}

/// Authoritative result carried by the `final` frame, and the response body
/// of single-shot generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FinalDocuments {
    pub document_url: String,
    pub cover_letter_text: String,
    pub resume_text: String,
}

/// Where a terminal error originated.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorOrigin {
    /// The server sent an `error` frame.
    Server,
    /// The stream itself was unusable: a malformed `final` frame, or no
    /// terminal frame at all.
    Protocol,
}

/// A terminal error event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: String,
    pub origin: ErrorOrigin,
}

impl ErrorEvent {
    pub fn server(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: ErrorOrigin::Server,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            origin: ErrorOrigin::Protocol,
        }
    }
}

/// A typed event decoded from one protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEvent {
    /// Incremental text for one document field
    Partial { field: DocumentField, text: String },

    /// Final result; terminal
    Final(FinalDocuments),

    /// Error result; terminal
    Error(ErrorEvent),
}

impl DecodedEvent {
    /// Whether this event ends the session.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DecodedEvent::Partial { .. })
    }

    /// Short tag used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            DecodedEvent::Partial { .. } => "partial",
            DecodedEvent::Final(_) => "final",
            DecodedEvent::Error(_) => "error",
        }
    }
}

/// Payload of a `partial` frame. Either field may be absent.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct PartialPayload {
    #[serde(default)]
    pub cover_letter_chunk: Option<String>,
    #[serde(default)]
    pub resume_chunk: Option<String>,
}

/// One stored document as returned by the documents resource.
///
/// Only `id` and `file_name` are guaranteed; anything else the backend
/// returns is kept in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub file_name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// User feedback about a generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub feedback: String,
    pub job_description: String,
    pub generated_content: Value,
}
