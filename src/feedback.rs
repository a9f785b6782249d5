//! Client for submitting feedback on generated content.

use tracing::debug;

use crate::client::ClientError;
use crate::http::{authorized, build_http_client, error_for_status, with_request_timeout};
use crate::model::Feedback;
use crate::options::{ClientOptions, SecretString};

pub const FEEDBACK_PATH: &str = "/feedback";

#[derive(Debug, Clone)]
pub struct FeedbackClient {
    options: ClientOptions,
    http: reqwest::Client,
}

impl FeedbackClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let http = build_http_client(&options)?;
        Ok(Self { options, http })
    }

    pub async fn submit(&self, token: &SecretString, feedback: &Feedback) -> Result<(), ClientError> {
        if feedback.feedback.trim().is_empty() {
            return Err(ClientError::Config("feedback text is empty".to_string()));
        }
        let url = self.options.endpoint(FEEDBACK_PATH);
        let req = authorized(self.http.post(&url), token, &self.options).json(feedback);

        error_for_status(with_request_timeout(req, &self.options).send().await?).await?;
        debug!("feedback submitted");
        Ok(())
    }
}
