use std::collections::HashSet;

use coherence_domain::{ConversationResult, ViolationFinding, ViolationTaxonomy, first_match};

/// Lexical scorer for agent responses.
///
/// Matching is a case-insensitive substring search, so paraphrased
/// violations are missed and benign mentions of a trigger phrase are
/// flagged. Each category is reported at most once per response.
#[derive(Debug, Clone, Default)]
pub struct ViolationDetector {
    taxonomy: ViolationTaxonomy,
}

impl ViolationDetector {
    pub fn new(taxonomy: ViolationTaxonomy) -> Self {
        Self { taxonomy }
    }

    pub fn taxonomy(&self) -> &ViolationTaxonomy {
        &self.taxonomy
    }

    /// Findings for one response, in taxonomy order. The evidence is the
    /// first trigger phrase of the category found in the text.
    pub fn detect(&self, response: &str, turn_index: usize) -> Vec<ViolationFinding> {
        let mut seen = HashSet::new();
        self.taxonomy
            .rules()
            .iter()
            .filter_map(|rule| {
                first_match(response, &rule.patterns)
                    .map(|evidence| ViolationFinding::new(rule.category, turn_index, evidence))
            })
            .filter(|finding| seen.insert(finding.category))
            .collect()
    }

    /// Scores a recorded conversation again with this detector's taxonomy,
    /// replacing the findings it was stored with.
    pub fn rescore(&self, result: &ConversationResult) -> ConversationResult {
        let findings = result
            .responses()
            .enumerate()
            .flat_map(|(index, turn)| self.detect(&turn.content, index + 1))
            .collect();
        ConversationResult::new(
            &result.key(),
            result.turns().clone(),
            findings,
            result.usage().clone(),
            result.status().clone(),
        )
    }
}
