use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use coherence_app::{
    BatchReport, ConversationStore, Evaluation, MetricsAggregator, ScenarioRunner, SkippedScenario,
    TurnExecutor, TurnSettings, ViolationDetector,
};
use coherence_config::HarnessConfig;
use coherence_domain::{
    AggregateMetrics, Comparison, ConversationResult, EncodingStrategy, Error, Scenario,
    TaxonomyPreset, ViolationTaxonomy,
};
use coherence_provider::OpenAiBackend;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: BatchReport,
    pub metrics: AggregateMetrics,
    /// Present when both strategies were evaluated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeOutput {
    pub metrics: AggregateMetrics,
    pub comparison: Comparison,
}

/// Files accepted by `analyze`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultsDocument {
    Results(Vec<ConversationResult>),
    Report(BatchReport),
}

/// Splits a scenario file into runnable scenarios and rejected entries.
pub fn parse_scenarios(json: &str) -> Result<(Vec<Scenario>, Vec<SkippedScenario>)> {
    let mut scenarios = Vec::new();
    let mut skipped = Vec::new();
    for entry in Scenario::parse_batch(json)? {
        match entry {
            Ok(scenario) => scenarios.push(scenario),
            Err(error) => {
                let scenario_id = match &error {
                    Error::MalformedScenario { scenario, .. } => scenario.clone(),
                    _ => "<unknown>".to_string(),
                };
                warn!(scenario = %scenario_id, error = %error, "Rejected scenario");
                skipped.push(SkippedScenario::new(scenario_id, None, error));
            }
        }
    }
    Ok((scenarios, skipped))
}

pub async fn run(
    path: &Path,
    strategy: Option<EncodingStrategy>,
    taxonomy: Option<TaxonomyPreset>,
) -> Result<RunOutput> {
    let mut config = HarnessConfig::load().context("Failed to load configuration")?;
    if strategy.is_some() {
        config.strategy = strategy;
    }
    if let Some(taxonomy) = taxonomy {
        config.taxonomy = taxonomy;
    }
    let api_key = config.credential()?;

    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read scenarios from {}", path.display()))?;
    let (scenarios, rejected) = parse_scenarios(&json)
        .with_context(|| format!("Failed to parse scenarios from {}", path.display()))?;

    let backend = OpenAiBackend::new(&config.api_url, &api_key, config.timeout())?;
    let executor = TurnExecutor::new(
        Arc::new(backend),
        Arc::new(ConversationStore::new()),
        TurnSettings::from(&config),
    );
    let runner = ScenarioRunner::new(executor, ViolationDetector::new(config.taxonomy.into()))
        .retry(config.retry.clone());

    let strategies = config.strategies();
    info!(model = %config.model, scenarios = scenarios.len(), "Running evaluation");
    let report = Evaluation::new(runner)
        .run(&scenarios, &strategies)
        .await
        .skip(rejected);

    let metrics = report.metrics(None);
    let comparison = (strategies.len() > 1).then(|| report.compare());
    Ok(RunOutput { report, metrics, comparison })
}

pub async fn analyze(path: &Path, taxonomy: Option<TaxonomyPreset>) -> Result<AnalyzeOutput> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read results from {}", path.display()))?;
    analyze_document(&json, taxonomy)
        .with_context(|| format!("Failed to analyze results in {}", path.display()))
}

pub fn analyze_document(json: &str, taxonomy: Option<TaxonomyPreset>) -> Result<AnalyzeOutput> {
    let mut results = match serde_json::from_str(json)? {
        ResultsDocument::Results(results) => results,
        ResultsDocument::Report(report) => report.results,
    };
    if let Some(preset) = taxonomy {
        let detector = ViolationDetector::new(ViolationTaxonomy::from(preset));
        results = results.iter().map(|result| detector.rescore(result)).collect();
    }

    Ok(AnalyzeOutput {
        metrics: MetricsAggregator::aggregate(&results),
        comparison: MetricsAggregator::compare(&results),
    })
}

#[cfg(test)]
mod tests {
    use coherence_domain::{ConversationKey, ConversationStatus, Turn, Verdict, ViolationCategory};
    use pretty_assertions::assert_eq;

    use super::*;

    fn results() -> Vec<ConversationResult> {
        [EncodingStrategy::TranscriptEmbedded, EncodingStrategy::NativeSequence]
            .into_iter()
            .map(|strategy| {
                ConversationResult::new(
                    &ConversationKey::new("pay", strategy, "gpt-4.1"),
                    vec![Turn::candidate("Top rate?"), Turn::agent("I promise you the top rate.")],
                    vec![],
                    vec![],
                    ConversationStatus::Completed,
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_scenarios_keeps_good_entries() {
        let fixture = r#"[
            {"id": "ok", "turns": [{"role": "user", "content": "Hi"}]},
            {"id": "bad"}
        ]"#;

        let (scenarios, skipped) = parse_scenarios(fixture).unwrap();

        assert_eq!(scenarios.len(), 1);
        assert_eq!(scenarios[0].id, "ok");
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].scenario_id, "bad");
        assert_eq!(skipped[0].strategy, None);
    }

    #[test]
    fn test_parse_scenarios_rejects_broken_file() {
        assert!(parse_scenarios("[").is_err());
    }

    #[test]
    fn test_analyze_plain_results() {
        let fixture = serde_json::to_string(&results()).unwrap();

        let actual = analyze_document(&fixture, None).unwrap();

        assert_eq!(actual.metrics.total_conversations, 2);
        assert_eq!(actual.metrics.conversations_with_violations, 0);
        assert_eq!(actual.comparison.verdict, Verdict::NoSignificantDifference);
    }

    #[test]
    fn test_analyze_report_with_rescoring() {
        let report = BatchReport { results: results(), skipped: vec![] };
        let fixture = serde_json::to_string(&report).unwrap();

        let actual = analyze_document(&fixture, Some(TaxonomyPreset::RedTeam)).unwrap();

        assert_eq!(actual.metrics.conversations_with_violations, 2);
        assert_eq!(actual.metrics.violations_by_category[&ViolationCategory::SalaryCommitment], 2);
        assert_eq!(actual.metrics.violations_by_category[&ViolationCategory::Guarantee], 2);
        assert_eq!(actual.comparison.verdict, Verdict::NoSignificantDifference);
    }
}
