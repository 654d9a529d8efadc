use coherence_domain::{
    AggregateMetrics, Comparison, ConversationResult, EncodingStrategy, MAX_EXAMPLES,
    ROLE_CONFUSION_MARKERS, ROLE_INDICATORS, Usage, ViolationExample, first_match, rate,
};

/// Turns many conversation results into rate metrics.
pub struct MetricsAggregator;

impl MetricsAggregator {
    /// Computes counts and percentages over `results`.
    ///
    /// A conversation counts once toward `conversations_with_violations` no
    /// matter how many findings it has, whereas `violations_by_category`
    /// counts every finding. Aborted conversations count toward `failed`
    /// whether or not they had findings before the abort. An empty slice
    /// yields all-zero metrics.
    pub fn aggregate(results: &[ConversationResult]) -> AggregateMetrics {
        let mut metrics = AggregateMetrics {
            total_conversations: results.len(),
            ..Default::default()
        };

        for result in results {
            metrics.total_turns += result.responses().count();

            if !result.findings().is_empty() {
                metrics.conversations_with_violations += 1;
            }
            for finding in result.findings() {
                *metrics.violations_by_category.entry(finding.category).or_default() += 1;
            }

            if result
                .responses()
                .any(|turn| first_match(&turn.content, ROLE_INDICATORS).is_some())
            {
                metrics.role_consistent += 1;
            }
            if result
                .responses()
                .any(|turn| first_match(&turn.content, ROLE_CONFUSION_MARKERS).is_some())
            {
                metrics.role_confusion += 1;
            }

            if result.is_aborted() {
                metrics.failed += 1;
            }

            if metrics.examples.len() < MAX_EXAMPLES
                && let Some(example) = Self::example(result)
            {
                metrics.examples.push(example);
            }
        }

        metrics.usage = results.iter().map(ConversationResult::total_usage).sum::<Usage>();
        metrics.violation_rate = rate(metrics.conversations_with_violations, metrics.total_conversations);
        metrics.role_consistency_rate = rate(metrics.role_consistent, metrics.total_conversations);
        metrics.failure_rate = rate(metrics.failed, metrics.total_conversations);
        metrics
    }

    /// Aggregates each strategy's results separately and compares them with
    /// transcript-embedded as A and native-sequence as B.
    pub fn compare(results: &[ConversationResult]) -> Comparison {
        let a = Self::aggregate(&Self::partition(results, EncodingStrategy::TranscriptEmbedded));
        let b = Self::aggregate(&Self::partition(results, EncodingStrategy::NativeSequence));
        Comparison::new(a, b)
    }

    pub fn partition(
        results: &[ConversationResult],
        strategy: EncodingStrategy,
    ) -> Vec<ConversationResult> {
        results
            .iter()
            .filter(|result| *result.strategy() == strategy)
            .cloned()
            .collect()
    }

    /// The first finding of a conversation with the response that caused it.
    fn example(result: &ConversationResult) -> Option<ViolationExample> {
        let finding = result.findings().first()?;
        let response = result.response(finding.turn_index)?;
        Some(ViolationExample::new(
            result.conversation_id(),
            finding.category,
            finding.turn_index,
            &response.content,
        ))
    }
}
