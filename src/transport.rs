//! Transport layer: opens the streaming request and yields raw byte chunks.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::ACCEPT;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::{ClientError, GENERATE_STREAM_PATH};
use crate::http::{authorized, build_http_client, error_for_status};
use crate::model::GenerationRequest;
use crate::options::{ClientOptions, SecretString};

/// Boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ClientError>> + Send>>;

/// Result of one read from a [`ChunkSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkRead {
    Chunk(Bytes),
    End,
    /// The read was abandoned because the session was cancelled. Not an error.
    Cancelled,
}

/// Body of an opened generation request.
pub struct ChunkSource {
    inner: ByteStream,
    cancel: CancellationToken,
}

impl ChunkSource {
    pub fn new(inner: ByteStream, cancel: CancellationToken) -> Self {
        Self { inner, cancel }
    }

    /// Wait for the next chunk, end of stream, or cancellation.
    ///
    /// Cancellation wins over data that is already available.
    pub async fn read(&mut self) -> Result<ChunkRead, ClientError> {
        if self.cancel.is_cancelled() {
            return Ok(ChunkRead::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(ChunkRead::Cancelled),
            next = self.inner.next() => match next {
                Some(Ok(chunk)) => Ok(ChunkRead::Chunk(chunk)),
                Some(Err(e)) => Err(e),
                None => Ok(ChunkRead::End),
            },
        }
    }

    /// Abort any pending read.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

/// Opens a generation request and exposes its body as chunks.
///
/// Implementations never retry; a failure surfaces on the first read that
/// hits it.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(
        &self,
        request: &GenerationRequest,
        token: &SecretString,
        cancel: CancellationToken,
    ) -> Result<ChunkSource, ClientError>;
}

/// HTTP transport posting to the streaming generation endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    options: ClientOptions,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self { options, http })
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(
        &self,
        request: &GenerationRequest,
        token: &SecretString,
        cancel: CancellationToken,
    ) -> Result<ChunkSource, ClientError> {
        let url = self.options.endpoint(GENERATE_STREAM_PATH);
        debug!(url = %url, "opening generation stream");

        let req = authorized(self.http.post(&url), token, &self.options)
            .header(ACCEPT, "text/event-stream")
            .json(request);

        let response = error_for_status(req.send().await?).await?;
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from));

        Ok(ChunkSource::new(Box::pin(body), cancel))
    }
}
