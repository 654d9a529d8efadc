use std::collections::HashSet;

use coherence_domain::{
    AggregateMetrics, ChatBackend, Comparison, ConversationResult, EncodingStrategy, Error,
    Scenario,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{MetricsAggregator, ScenarioRunner};

/// A scenario that produced no result, with the reason it was left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedScenario {
    pub scenario_id: String,
    /// Absent when the entry was rejected before any strategy ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<EncodingStrategy>,
    pub reason: String,
}

impl SkippedScenario {
    pub fn new(
        scenario_id: impl Into<String>,
        strategy: Option<EncodingStrategy>,
        reason: impl ToString,
    ) -> Self {
        Self { scenario_id: scenario_id.into(), strategy, reason: reason.to_string() }
    }
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub results: Vec<ConversationResult>,
    #[serde(default)]
    pub skipped: Vec<SkippedScenario>,
}

impl BatchReport {
    pub fn skip(mut self, skipped: impl IntoIterator<Item = SkippedScenario>) -> Self {
        self.skipped.extend(skipped);
        self
    }

    /// Metrics over every result, or over one strategy's results.
    pub fn metrics(&self, strategy: Option<EncodingStrategy>) -> AggregateMetrics {
        match strategy {
            Some(strategy) => {
                MetricsAggregator::aggregate(&MetricsAggregator::partition(&self.results, strategy))
            }
            None => MetricsAggregator::aggregate(&self.results),
        }
    }

    pub fn compare(&self) -> Comparison {
        MetricsAggregator::compare(&self.results)
    }
}

/// Runs a batch of scenarios under one or more encoding strategies.
pub struct Evaluation<B> {
    runner: ScenarioRunner<B>,
}

impl<B: ChatBackend> Evaluation<B> {
    pub fn new(runner: ScenarioRunner<B>) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &ScenarioRunner<B> {
        &self.runner
    }

    /// Runs every scenario under every strategy concurrently.
    ///
    /// The conversation store is cleared first so histories never leak
    /// between batches. Conversations are keyed by scenario, strategy and
    /// model, so scenario ids must be unique within a batch: only the first
    /// scenario with a given id runs and later ones are skipped. A scenario
    /// that fails to run is reported in `skipped` and the rest of the batch
    /// carries on.
    pub async fn run(&self, scenarios: &[Scenario], strategies: &[EncodingStrategy]) -> BatchReport {
        self.runner.executor().store().reset_all();
        info!(
            scenarios = scenarios.len(),
            strategies = strategies.len(),
            "Starting batch"
        );

        let mut report = BatchReport::default();
        let mut seen = HashSet::new();
        let mut runnable = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            if seen.insert(scenario.id.as_str()) {
                runnable.push(scenario);
            } else {
                let error = Error::DuplicateScenario(scenario.id.clone());
                warn!(scenario = %scenario.id, error = %error, "Skipping scenario");
                report.skipped.push(SkippedScenario::new(&scenario.id, None, error));
            }
        }

        let runs = runnable.into_iter().flat_map(move |scenario| {
            strategies.iter().map(move |strategy| async move {
                (scenario, *strategy, self.runner.run(scenario, *strategy).await)
            })
        });

        for (scenario, strategy, outcome) in join_all(runs).await {
            match outcome {
                Ok(result) => report.results.push(result),
                Err(error) => {
                    warn!(scenario = %scenario.id, strategy = %strategy, error = %error, "Skipping scenario");
                    report
                        .skipped
                        .push(SkippedScenario::new(&scenario.id, Some(strategy), error));
                }
            }
        }

        info!(
            results = report.results.len(),
            skipped = report.skipped.len(),
            "Finished batch"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use coherence_domain::{ConversationKey, Role, ScenarioTurn, Turn};
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::mock::MockBackend;
    use crate::{ConversationStore, TurnExecutor, TurnSettings, ViolationDetector};

    fn evaluation(backend: MockBackend) -> Evaluation<MockBackend> {
        let executor = TurnExecutor::new(
            Arc::new(backend),
            Arc::new(ConversationStore::new()),
            TurnSettings::default(),
        );
        Evaluation::new(ScenarioRunner::new(executor, ViolationDetector::default()))
    }

    fn scenario(id: &str, messages: &[&str]) -> Scenario {
        Scenario::new(id, messages.iter().map(ScenarioTurn::candidate).collect())
    }

    #[tokio::test]
    async fn test_runs_every_scenario_under_every_strategy() {
        let fixture = evaluation(MockBackend::replies(&["The hiring team will follow up."; 6]));
        let scenarios = vec![scenario("pay", &["What's the rate?"]), scenario("visa", &["Sponsor me?", "Please?"])];

        let actual = fixture
            .run(&scenarios, &[EncodingStrategy::TranscriptEmbedded, EncodingStrategy::NativeSequence])
            .await;

        assert_eq!(actual.results.len(), 4);
        assert_eq!(actual.skipped, vec![]);
        assert!(actual.results.iter().all(|result| *result.passed()));
        assert_eq!(fixture.runner().executor().store().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_scenario_is_skipped() {
        let fixture = evaluation(MockBackend::replies(&["Thanks for asking!"]));
        let scenarios = vec![scenario("empty", &[]), scenario("hello", &["Hi"])];

        let actual = fixture.run(&scenarios, &[EncodingStrategy::NativeSequence]).await;

        assert_eq!(actual.results.len(), 1);
        assert_eq!(actual.results[0].conversation_id(), "hello");
        assert_eq!(actual.skipped.len(), 1);
        assert_eq!(actual.skipped[0].scenario_id, "empty");
        assert_eq!(actual.skipped[0].strategy, Some(EncodingStrategy::NativeSequence));
    }

    #[tokio::test]
    async fn test_store_is_reset_between_batches() {
        let fixture = evaluation(MockBackend::replies(&["First answer.", "Second answer."]));
        let scenarios = vec![scenario("repeat", &["Hello?"])];
        let key = ConversationKey::new("repeat", EncodingStrategy::NativeSequence, "gpt-4.1");

        fixture.run(&scenarios, &[EncodingStrategy::NativeSequence]).await;
        let actual = fixture.run(&scenarios, &[EncodingStrategy::NativeSequence]).await;

        assert_eq!(
            actual.results[0].turns(),
            &vec![Turn::candidate("Hello?"), Turn::agent("Second answer.")]
        );
        assert_eq!(fixture.runner().executor().store().history(&key).len(), 2);
    }

    #[tokio::test]
    async fn test_scenarios_sharing_an_id_never_share_history() {
        let backend = Arc::new(MockBackend::replies(&["Answer one.", "Answer two.", "Answer three."]));
        let executor = TurnExecutor::new(
            backend.clone(),
            Arc::new(ConversationStore::new()),
            TurnSettings::default(),
        );
        let fixture = Evaluation::new(ScenarioRunner::new(executor, ViolationDetector::default()));
        let scenarios = vec![
            scenario("dup", &["first-1", "first-2"]),
            scenario("dup", &["second-1", "second-2"]),
        ];

        let actual = fixture.run(&scenarios, &[EncodingStrategy::NativeSequence]).await;

        assert_eq!(actual.results.len(), 1);
        assert_eq!(
            actual.results[0].turns(),
            &vec![
                Turn::candidate("first-1"),
                Turn::agent("Answer one."),
                Turn::candidate("first-2"),
                Turn::agent("Answer two."),
            ]
        );
        assert_eq!(
            actual.skipped,
            vec![SkippedScenario::new(
                "dup",
                None,
                Error::DuplicateScenario("dup".to_string())
            )]
        );

        let sent = backend
            .requests()
            .await
            .iter()
            .map(|context| {
                context
                    .dialogue()
                    .filter(|message| message.has_role(Role::User))
                    .map(|message| message.content.clone())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let expected = vec![vec!["first-1".to_string()], vec!["first-1".to_string(), "first-2".to_string()]];
        assert_eq!(sent, expected);

        let key = ConversationKey::new("dup", EncodingStrategy::NativeSequence, "gpt-4.1");
        assert_eq!(fixture.runner().executor().store().history(&key).len(), 4);
    }

    #[test]
    fn test_report_serializes_skipped_without_strategy() {
        let fixture = BatchReport::default().skip([SkippedScenario::new(
            "scenario-2",
            None,
            "Scenario 'scenario-2' is malformed: missing field `turns`",
        )]);

        let actual = serde_json::to_value(&fixture).unwrap();

        let expected = serde_json::json!({
            "results": [],
            "skipped": [{
                "scenario_id": "scenario-2",
                "reason": "Scenario 'scenario-2' is malformed: missing field `turns`"
            }]
        });
        assert_eq!(actual, expected);
    }
}
