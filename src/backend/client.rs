use std::time::Duration;

use reqwest::Response;
use tracing::{debug, info};

use super::messages::{
    CreateCallRequest, CreateCallResponse, EndCallAck, HealthStatus, SpeechAck, SpeechSubmission,
};
use crate::error::BackendError;

/// Call backend operations the session controller depends on
#[async_trait::async_trait]
pub trait CallBackend: Send + Sync {
    /// Create a call; the backend assigns the session id
    async fn create_call(&self, display_name: &str) -> Result<CreateCallResponse, BackendError>;

    /// Forward recognized speech for a session
    async fn submit_speech(
        &self,
        session_id: &str,
        speech: &SpeechSubmission,
    ) -> Result<SpeechAck, BackendError>;

    /// Tell the backend the call is over
    async fn end_call(&self, session_id: &str) -> Result<EndCallAck, BackendError>;
}

/// HTTP implementation of [`CallBackend`]
#[derive(Debug, Clone)]
pub struct HttpCallBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCallBackend {
    /// Create a client for `base_url`. A zero timeout means none.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let mut builder = reqwest::Client::builder().user_agent("goq-client");
        if !timeout.is_zero() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Query backend liveness
    pub async fn health(&self) -> Result<HealthStatus, BackendError> {
        let response = self.client.get(self.url("/health")).send().await?;
        Ok(ensure_success(response)?.json().await?)
    }
}

fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if !status.is_success() {
        return Err(BackendError::Status(status.as_u16()));
    }
    Ok(response)
}

#[async_trait::async_trait]
impl CallBackend for HttpCallBackend {
    async fn create_call(&self, display_name: &str) -> Result<CreateCallResponse, BackendError> {
        info!("Requesting new call for {}", display_name);

        let response = self
            .client
            .post(self.url("/start_call"))
            .json(&CreateCallRequest {
                user_name: display_name.to_string(),
            })
            .send()
            .await?;

        let created: CreateCallResponse = ensure_success(response)?.json().await?;
        if created.session_id.trim().is_empty() {
            return Err(BackendError::InvalidResponse(
                "empty session_id in start_call response".to_string(),
            ));
        }

        info!("Call started: session {}", created.session_id);
        Ok(created)
    }

    async fn submit_speech(
        &self,
        session_id: &str,
        speech: &SpeechSubmission,
    ) -> Result<SpeechAck, BackendError> {
        debug!("Submitting speech for session {}: {}", session_id, speech.text);

        let response = self
            .client
            .post(self.url(&format!("/bland_webhook/{}", session_id)))
            .json(speech)
            .send()
            .await?;

        let ack: SpeechAck = ensure_success(response)?.json().await?;
        debug!("Speech processed for session {}: {}", session_id, ack.status);
        Ok(ack)
    }

    async fn end_call(&self, session_id: &str) -> Result<EndCallAck, BackendError> {
        let response = self
            .client
            .post(self.url(&format!("/end_call/{}", session_id)))
            .send()
            .await?;

        let response = ensure_success(response)?;
        // The body is informational only
        let ack: EndCallAck = response.json().await.unwrap_or_default();
        info!("Call ended for session {}", session_id);
        Ok(ack)
    }
}
