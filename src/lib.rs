//! # career_copilot - Streaming client for the career copilot service
//!
//! Consumes the generation endpoint's chunked server-sent-event body and
//! turns it into typed progress and result events while the transfer is
//! still running.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Chunk-boundary independent framing, including splits inside UTF-8
//!   sequences and JSON payloads
//! - At most one terminal outcome per session; malformed progress frames
//!   are absorbed
//! - Cooperative cancellation that silences every further callback
//! - Thin clients for the documents and feedback resources
//!
//! ## Architecture
//!
//! Data flows leaf to root, cancellation flows back down:
//!
//! 1. **`transport`**: opens the request and yields byte chunks
//! 2. **`sse`**: buffers chunks and cuts blank-line delimited frames
//! 3. **`classify`**: turns a frame into `DecodedEvent`s
//! 4. **`dispatch`**: delivers events in order, first terminal event wins
//! 5. **`session`**: owns one request end to end and accumulates text
//!
//! ## Example
//! ```no_run
//! use career_copilot::client::GenerationClient;
//! use career_copilot::model::FinalDocuments;
//! use career_copilot::options::{ClientOptions, SecretString};
//! use career_copilot::session::{GenerationObserver, Transcript};
//! use career_copilot::client::GenerationError;
//! use career_copilot::model::DocumentField;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Printer;
//!
//! impl GenerationObserver for Printer {
//!     fn on_data(&mut self, _field: DocumentField, chunk: &str, _transcript: &Transcript) {
//!         print!("{}", chunk);
//!     }
//!
//!     fn on_complete(&mut self, documents: &FinalDocuments) {
//!         println!("\n{}", documents.document_url);
//!     }
//!
//!     fn on_error(&mut self, error: &GenerationError) {
//!         eprintln!("\n{}", error);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = GenerationClient::new(ClientOptions::from_env())?;
//!     let token = SecretString::new("firebase-id-token".to_string());
//!
//!     client
//!         .run("Backend engineer, Rust", token, &mut Printer, CancellationToken::new())
//!         .await;
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod client;
pub mod dispatch;
pub mod documents;
pub mod feedback;
pub mod http;
pub mod model;
pub mod options;
pub mod session;
pub mod sse;
pub mod transport;

// Re-exports for convenience
pub use client::{ClientError, GenerationClient, GenerationError};
pub use model::{DecodedEvent, DocumentField, FinalDocuments};
pub use session::{GenerationObserver, SessionHandle, SessionOutcome, SessionState};
