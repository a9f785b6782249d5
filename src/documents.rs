//! Client for the user's stored documents.

use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::client::ClientError;
use crate::http::{authorized, build_http_client, error_for_status, with_request_timeout};
use crate::model::DocumentSummary;
use crate::options::{ClientOptions, SecretString};

pub const DOCUMENTS_PATH: &str = "/documents";

/// The list endpoint may answer with a bare array or wrap it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentList {
    Bare(Vec<DocumentSummary>),
    Wrapped { documents: Vec<DocumentSummary> },
}

/// Lists and deletes documents, authenticated with a bearer token.
#[derive(Debug, Clone)]
pub struct DocumentsClient {
    options: ClientOptions,
    http: reqwest::Client,
}

impl DocumentsClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self { options, http })
    }

    /// Fetch every document belonging to the token's user.
    pub async fn list(&self, token: &SecretString) -> Result<Vec<DocumentSummary>, ClientError> {
        let url = self.options.endpoint(DOCUMENTS_PATH);
        let req = with_request_timeout(authorized(self.http.get(&url), token, &self.options), &self.options);

        let response = error_for_status(req.send().await?).await?;
        let documents = match response.json::<DocumentList>().await? {
            DocumentList::Bare(documents) | DocumentList::Wrapped { documents } => documents,
        };
        debug!(count = documents.len(), "listed documents");
        Ok(documents)
    }

    /// URL of one document, with `id` escaped as a single path segment.
    fn document_url(&self, id: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.options.endpoint(DOCUMENTS_PATH))
            .map_err(|e| ClientError::Config(format!("invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Config("base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    /// Delete one document by id.
    pub async fn delete(&self, id: &str, token: &SecretString) -> Result<(), ClientError> {
        if id.is_empty() {
            return Err(ClientError::Config("document id is required".to_string()));
        }
        let url = self.document_url(id)?;
        let req = with_request_timeout(authorized(self.http.delete(url), token, &self.options), &self.options);

        error_for_status(req.send().await?).await?;
        debug!(id, "deleted document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> DocumentsClient {
        DocumentsClient::new(ClientOptions::default().with_base_url(base_url.to_string())).unwrap()
    }

    #[test]
    fn test_document_url_escapes_id() {
        let client = client("http://api.test");
        assert_eq!(client.document_url("a1").unwrap().as_str(), "http://api.test/documents/a1");
        assert_eq!(
            client.document_url("a/b?c#d").unwrap().as_str(),
            "http://api.test/documents/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn test_document_url_keeps_base_path() {
        let client = client("http://api.test/v1/");
        assert_eq!(client.document_url("x").unwrap().as_str(), "http://api.test/v1/documents/x");
    }
}
