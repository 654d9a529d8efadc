use std::collections::VecDeque;
use std::time::Duration;

use coherence_domain::{BackendError, ChatBackend, Completion, Context, ModelId};
use tokio::sync::Mutex;

/// Replays canned completions in order and records every request it saw.
#[derive(Default)]
pub struct MockBackend {
    responses: Mutex<VecDeque<Result<Completion, BackendError>>>,
    requests: Mutex<Vec<Context>>,
    delay: Option<Duration>,
}

impl MockBackend {
    pub fn new(responses: Vec<Result<Completion, BackendError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), ..Default::default() }
    }

    pub fn replies(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|reply| Ok(Completion::new(reply))).collect())
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn requests(&self) -> Vec<Context> {
        self.requests.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, _model: &ModelId, context: Context) -> Result<Completion, BackendError> {
        self.requests.lock().await.push(context);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::malformed("no scripted response left")))
    }
}
