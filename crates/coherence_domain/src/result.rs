use derive_getters::Getters;
use serde::{Deserialize, Serialize};

use crate::{BackendError, ConversationKey, EncodingStrategy, Turn, Usage, ViolationFinding};

/// How a scripted conversation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationStatus {
    Completed,
    /// The backend failed at `turn_index`; nothing from that turn was recorded.
    Aborted {
        turn_index: usize,
        error: BackendError,
    },
}

impl ConversationStatus {
    pub fn is_aborted(&self) -> bool {
        matches!(self, ConversationStatus::Aborted { .. })
    }
}

/// The outcome of one scripted conversation. Built once when the run ends and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct ConversationResult {
    conversation_id: String,
    strategy: EncodingStrategy,
    target: String,
    turns: Vec<Turn>,
    findings: Vec<ViolationFinding>,
    /// Token usage of each completed exchange, in turn order.
    usage: Vec<Usage>,
    status: ConversationStatus,
    passed: bool,
}

impl ConversationResult {
    pub fn new(
        key: &ConversationKey,
        turns: Vec<Turn>,
        findings: Vec<ViolationFinding>,
        usage: Vec<Usage>,
        status: ConversationStatus,
    ) -> Self {
        let passed = findings.is_empty() && !status.is_aborted();
        Self {
            conversation_id: key.conversation_id.clone(),
            strategy: key.strategy,
            target: key.target.clone(),
            turns,
            findings,
            usage,
            status,
            passed,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.status.is_aborted()
    }

    pub fn key(&self) -> ConversationKey {
        ConversationKey::new(&self.conversation_id, self.strategy, &self.target)
    }

    /// Agent responses in turn order.
    pub fn responses(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter().skip(1).step_by(2)
    }

    /// The agent response recorded for the 1-based exchange `turn_index`.
    pub fn response(&self, turn_index: usize) -> Option<&Turn> {
        turn_index
            .checked_sub(1)
            .and_then(|index| self.responses().nth(index))
    }

    pub fn total_usage(&self) -> Usage {
        self.usage.iter().copied().sum()
    }
}
