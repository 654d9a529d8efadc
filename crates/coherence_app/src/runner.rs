use coherence_config::RetryConfig;
use coherence_domain::{
    ChatBackend, ConversationKey, ConversationResult, ConversationStatus, EncodingStrategy, Error,
    Result, Scenario, Turn,
};
use tracing::{debug, info, warn};

use crate::{TurnExecutor, ViolationDetector, retry_with_config};

/// Plays a scripted conversation turn by turn and scores every response.
pub struct ScenarioRunner<B> {
    executor: TurnExecutor<B>,
    detector: ViolationDetector,
    retry: RetryConfig,
}

impl<B: ChatBackend> ScenarioRunner<B> {
    pub fn new(executor: TurnExecutor<B>, detector: ViolationDetector) -> Self {
        Self { executor, detector, retry: RetryConfig::default() }
    }

    /// Retry policy applied around each turn; disabled by default.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn executor(&self) -> &TurnExecutor<B> {
        &self.executor
    }

    pub fn detector(&self) -> &ViolationDetector {
        &self.detector
    }

    /// The key a scenario runs under: its id, the strategy and the model it
    /// targets.
    pub fn key(&self, scenario: &Scenario, strategy: EncodingStrategy) -> ConversationKey {
        ConversationKey::new(&scenario.id, strategy, self.executor.settings().model.as_str())
    }

    /// Runs every candidate turn of `scenario` in order.
    ///
    /// A scenario without candidate turns fails with
    /// [`Error::EmptyScenario`], and a key that already has history fails
    /// with [`Error::ConversationInProgress`]. A backend failure stops the
    /// conversation at that turn and yields an aborted result that keeps
    /// everything gathered before it.
    pub async fn run(
        &self,
        scenario: &Scenario,
        strategy: EncodingStrategy,
    ) -> Result<ConversationResult> {
        let messages = scenario.candidate_turns().collect::<Vec<_>>();
        if messages.is_empty() {
            return Err(Error::EmptyScenario(scenario.id.clone()));
        }

        let key = self.key(scenario, strategy);
        if !self.executor.store().history(&key).is_empty() {
            return Err(Error::ConversationInProgress(key.to_string()));
        }
        info!(conversation = %key, turns = messages.len(), "Starting conversation");

        let mut turns = Vec::with_capacity(messages.len() * 2);
        let mut findings = Vec::new();
        let mut usage = Vec::with_capacity(messages.len());
        let mut status = ConversationStatus::Completed;

        for (index, message) in messages.into_iter().enumerate() {
            let turn_index = index + 1;
            let outcome =
                retry_with_config(&self.retry, || self.executor.execute(&key, message)).await;

            let completion = match outcome {
                Ok(completion) => completion,
                Err(Error::Backend(error)) => {
                    warn!(conversation = %key, turn = turn_index, error = %error, "Aborting conversation");
                    status = ConversationStatus::Aborted { turn_index, error };
                    break;
                }
                Err(error) => return Err(error),
            };

            let detected = self.detector.detect(&completion.content, turn_index);
            debug!(conversation = %key, turn = turn_index, findings = detected.len(), "Scored response");

            turns.push(Turn::candidate(message));
            turns.push(Turn::agent(&completion.content));
            findings.extend(detected);
            usage.push(completion.usage);
        }

        let result = ConversationResult::new(&key, turns, findings, usage, status);
        info!(
            conversation = %key,
            passed = result.passed(),
            findings = result.findings().len(),
            aborted = result.is_aborted(),
            "Finished conversation"
        );
        Ok(result)
    }
}
