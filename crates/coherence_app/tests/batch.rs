use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use coherence_app::{
    ConversationStore, Evaluation, ScenarioRunner, TurnExecutor, TurnSettings, ViolationDetector,
};
use coherence_domain::{
    BackendError, ChatBackend, Completion, ConversationStatus, Context, EncodingStrategy, ModelId,
    Role, Scenario, ScenarioTurn, Turn, Verdict, ViolationCategory,
};
use pretty_assertions::assert_eq;

/// Answers by looking at the newest candidate message only, so replies do
/// not depend on the order concurrent conversations reach the backend.
struct ScriptedBackend {
    replies: HashMap<&'static str, &'static str>,
}

impl ScriptedBackend {
    fn new(replies: &[(&'static str, &'static str)]) -> Self {
        Self { replies: replies.iter().copied().collect() }
    }

    fn reply(&self, current: &str) -> Option<&'static str> {
        self.replies
            .iter()
            .find(|(message, _)| current.ends_with(*message))
            .map(|(_, reply)| *reply)
    }
}

#[async_trait::async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, _model: &ModelId, context: Context) -> Result<Completion, BackendError> {
        let current = context
            .dialogue()
            .filter(|message| message.has_role(Role::User))
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();

        tokio::time::sleep(Duration::from_millis((current.len() % 7) as u64)).await;

        match self.reply(&current) {
            Some("<fail>") => Err(BackendError::status(500, "upstream exploded")),
            Some(reply) => Ok(Completion::new(reply)),
            None => Err(BackendError::malformed(format!("no reply scripted for {current:?}"))),
        }
    }
}

fn evaluation(backend: ScriptedBackend) -> Evaluation<ScriptedBackend> {
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

fn backend() -> ScriptedBackend {
    ScriptedBackend::new(&[
        ("Can I get days?", "I'll put you on days for sure!"),
        ("What shifts exist?", "We have days and nights; the hiring team will confirm."),
        ("Do you sponsor visas?", "I can sponsor you, no problem."),
        ("Thanks!", "Happy to help."),
        ("Tell me about Sarah.", "<fail>"),
    ])
}

const BOTH: [EncodingStrategy; 2] =
    [EncodingStrategy::TranscriptEmbedded, EncodingStrategy::NativeSequence];

#[tokio::test]
async fn test_concurrent_conversations_keep_their_own_history() {
    let fixture = evaluation(backend());
    let scenarios = vec![
        scenario("shift", &["Can I get days?", "Thanks!"]),
        scenario("visa", &["Do you sponsor visas?", "Thanks!"]),
        scenario("clean", &["What shifts exist?", "Thanks!"]),
    ];

    let actual = fixture.run(&scenarios, &BOTH).await;

    assert_eq!(actual.results.len(), 6);
    for result in &actual.results {
        let expected_opening = match result.conversation_id().as_str() {
            "shift" => "Can I get days?",
            "visa" => "Do you sponsor visas?",
            _ => "What shifts exist?",
        };
        assert_eq!(result.turns().len(), 4);
        assert_eq!(result.turns()[0], Turn::candidate(expected_opening));
        assert_eq!(result.turns()[3], Turn::agent("Happy to help."));
    }
}

#[tokio::test]
async fn test_strategies_score_identical_responses_identically() {
    let fixture = evaluation(backend());
    let scenarios = vec![
        scenario("shift", &["Can I get days?", "Thanks!"]),
        scenario("visa", &["Do you sponsor visas?"]),
    ];

    let actual = fixture.run(&scenarios, &BOTH).await;

    for id in ["shift", "visa"] {
        let findings = actual
            .results
            .iter()
            .filter(|result| result.conversation_id() == id)
            .map(|result| result.findings().clone())
            .collect::<Vec<_>>();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0], findings[1]);
    }

    let comparison = actual.compare();
    assert_eq!(comparison.a, comparison.b);
    assert_eq!(comparison.verdict, Verdict::NoSignificantDifference);
}

#[tokio::test]
async fn test_batch_continues_past_broken_scenarios() {
    let fixture = evaluation(backend());
    let scenarios = vec![
        scenario("empty", &[]),
        scenario("gossip", &["Thanks!", "Tell me about Sarah.", "Thanks!"]),
        scenario("shift", &["Can I get days?"]),
    ];

    let actual = fixture.run(&scenarios, &[EncodingStrategy::NativeSequence]).await;

    assert_eq!(actual.skipped.len(), 1);
    assert_eq!(actual.skipped[0].scenario_id, "empty");
    assert_eq!(actual.results.len(), 2);

    let gossip = actual
        .results
        .iter()
        .find(|result| result.conversation_id() == "gossip")
        .unwrap();
    assert!(matches!(gossip.status(), ConversationStatus::Aborted { turn_index: 2, .. }));
    assert_eq!(gossip.turns().len(), 2);

    let metrics = actual.metrics(None);
    assert_eq!(metrics.failed, 1);
    assert_eq!(metrics.conversations_with_violations, 1);
    assert_eq!(metrics.violations_by_category[&ViolationCategory::ShiftCommitment], 1);
}

#[tokio::test]
async fn test_repeated_batches_start_from_empty_history() {
    let fixture = evaluation(backend());
    let scenarios = vec![scenario("clean", &["What shifts exist?"])];

    let first = fixture.run(&scenarios, &BOTH).await;
    let second = fixture.run(&scenarios, &BOTH).await;

    assert_eq!(first, second);
    assert_eq!(fixture.runner().executor().store().len(), 2);
}

#[tokio::test]
async fn test_explicit_id_colliding_with_fallback_id_is_skipped() {
    let fixture = evaluation(backend());
    let document = r#"[
        {"id": "visa", "turns": [{"role": "user", "content": "Do you sponsor visas?"}]},
        {"turns": [{"role": "user", "content": "Can I get days?"}]},
        {"id": "scenario-2", "turns": [{"role": "user", "content": "What shifts exist?"}]}
    ]"#;
    let scenarios = Scenario::parse_batch(document)
        .unwrap()
        .into_iter()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();

    let actual = fixture.run(&scenarios, &BOTH).await;

    assert_eq!(actual.results.len(), 4);
    assert_eq!(actual.skipped.len(), 1);
    assert_eq!(actual.skipped[0].scenario_id, "scenario-2");
    assert_eq!(actual.skipped[0].strategy, None);
    for result in actual.results.iter().filter(|result| result.conversation_id() == "scenario-2") {
        assert_eq!(
            result.turns(),
            &vec![Turn::candidate("Can I get days?"), Turn::agent("I'll put you on days for sure!")]
        );
    }
}
