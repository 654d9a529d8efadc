use std::time::Duration;

use coherence_domain::{BackendError, ChatBackend, Completion, Context, ModelId};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use tracing::{debug, info, warn};

use crate::request::Request;
use crate::response::Response;
use crate::{Error, Result};

/// Longest slice of an error body carried into a backend failure.
const ERROR_BODY_CHARS: usize = 500;

/// Non-streaming client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    base_url: Url,
    authorization: Option<HeaderValue>,
}

impl OpenAiBackend {
    /// An empty `api_key` is accepted here; every call then fails with a
    /// missing-credential error.
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        // A base without a trailing slash would lose its last segment on join
        let api_url = match api_url.ends_with('/') {
            true => api_url.to_string(),
            false => format!("{api_url}/"),
        };
        let base_url = Url::parse(&api_url)
            .map_err(|source| Error::InvalidUrl { url: api_url.clone(), source })?;
        let authorization = match api_key.trim() {
            "" => None,
            key => Some(
                HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|_| Error::InvalidCredential)?,
            ),
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self { client, base_url, authorization })
    }

    fn url(&self, path: &str) -> std::result::Result<Url, BackendError> {
        // Remove leading slash to avoid double slashes
        let path = path.trim_start_matches('/');
        self.base_url.join(path).map_err(|error| {
            BackendError::transport(format!("failed to append {path} to {}: {error}", self.base_url))
        })
    }

    fn headers(&self) -> std::result::Result<HeaderMap, BackendError> {
        let authorization = self
            .authorization
            .clone()
            .ok_or_else(|| BackendError::missing_credential("no API key configured"))?;

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(reqwest::header::CONNECTION, HeaderValue::from_static("keep-alive"));
        Ok(headers)
    }
}

fn transport_error(error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::timeout(error)
    } else {
        BackendError::transport(error)
    }
}

#[async_trait::async_trait]
impl ChatBackend for OpenAiBackend {
    async fn chat(
        &self,
        model: &ModelId,
        context: Context,
    ) -> std::result::Result<Completion, BackendError> {
        let headers = self.headers()?;
        let url = self.url("chat/completions")?;
        let request = Request::new(model, context);

        info!(model = %model, url = %url, messages = request.messages.len(), "Connecting Upstream");

        let response = self
            .client
            .post(url)
            .headers(headers)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Upstream returned an error status");
            let message = body.chars().take(ERROR_BODY_CHARS).collect::<String>();
            return Err(BackendError::status(status.as_u16(), message));
        }

        let response: Response = serde_json::from_str(&body)
            .map_err(|error| BackendError::malformed(format!("invalid completion body: {error}")))?;
        let completion = Completion::try_from(response)?;

        debug!(total_tokens = completion.usage.total_tokens, "Received completion");
        Ok(completion)
    }
}
