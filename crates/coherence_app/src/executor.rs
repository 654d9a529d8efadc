use std::sync::Arc;
use std::time::Duration;

use coherence_config::HarnessConfig;
use coherence_domain::{
    BackendError, ChatBackend, Completion, ConversationKey, ModelId, PersonaContract, Result,
    Temperature,
};
use derive_setters::Setters;
use tracing::{debug, warn};

use crate::ConversationStore;

/// Request parameters shared by every turn of a batch.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(into)]
pub struct TurnSettings {
    pub persona: PersonaContract,
    pub model: ModelId,
    pub temperature: Temperature,
    pub max_tokens: usize,
    pub timeout: Duration,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for TurnSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            persona: PersonaContract::default(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        }
    }
}

/// Drives one request/response cycle against the backend.
pub struct TurnExecutor<B> {
    backend: Arc<B>,
    store: Arc<ConversationStore>,
    settings: TurnSettings,
}

impl<B: ChatBackend> TurnExecutor<B> {
    pub fn new(backend: Arc<B>, store: Arc<ConversationStore>, settings: TurnSettings) -> Self {
        Self { backend, store, settings }
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    /// Sends `message` as the next candidate turn of `key`, encoding the
    /// history with `key.strategy`.
    ///
    /// The exchange is recorded only when the backend answers in time. A
    /// failure or timeout returns [`coherence_domain::Error::Backend`] and
    /// leaves the conversation exactly as it was.
    pub async fn execute(&self, key: &ConversationKey, message: &str) -> Result<Completion> {
        let history = self.store.history(key);
        let context = key
            .strategy
            .build(&self.settings.persona, &history, message)
            .temperature(self.settings.temperature)
            .max_tokens(self.settings.max_tokens);

        debug!(
            conversation = %key,
            history = history.len(),
            messages = context.messages.len(),
            "Dispatching turn"
        );

        let completion = tokio::time::timeout(
            self.settings.timeout,
            self.backend.chat(&self.settings.model, context),
        )
        .await
        .unwrap_or_else(|_| {
            Err(BackendError::timeout(format!(
                "no response within {}s",
                self.settings.timeout.as_secs_f32()
            )))
        })
        .inspect_err(|error| warn!(conversation = %key, error = %error, "Backend call failed"))?;

        self.store.record_exchange(key, message, &completion.content)?;
        Ok(completion)
    }
}
