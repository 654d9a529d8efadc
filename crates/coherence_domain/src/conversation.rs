use derive_more::derive::Display;
use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter, EnumString};

use crate::{Error, Result};

/// Who produced a turn. Candidates speak first, agents answer.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Candidate,
    Agent,
}

/// One recorded utterance. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Speaker,
    pub content: String,
}

impl Turn {
    pub fn candidate(content: impl ToString) -> Self {
        Self { role: Speaker::Candidate, content: content.to_string() }
    }

    pub fn agent(content: impl ToString) -> Self {
        Self { role: Speaker::Agent, content: content.to_string() }
    }
}

/// How accumulated history is presented to the model.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum_macros::Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum EncodingStrategy {
    /// History serialized into one user message next to the current turn.
    #[serde(alias = "json_history")]
    #[strum(to_string = "transcript_embedded", serialize = "json_history")]
    TranscriptEmbedded,
    /// History replayed as role-tagged messages.
    #[serde(alias = "multi_message")]
    #[strum(to_string = "native_sequence", serialize = "multi_message")]
    NativeSequence,
}

/// Isolation key for a conversation. Two scenarios that share a label but
/// run under a different strategy or target never share history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub conversation_id: String,
    pub strategy: EncodingStrategy,
    pub target: String,
}

impl ConversationKey {
    pub fn new(
        conversation_id: impl ToString,
        strategy: EncodingStrategy,
        target: impl ToString,
    ) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            strategy,
            target: target.to_string(),
        }
    }
}

impl std::fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}", self.conversation_id, self.target, self.strategy)
    }
}

/// Ordered log of turns for one conversation key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub key: ConversationKey,
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new(key: ConversationKey) -> Self {
        Self { key, turns: Vec::new() }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The speaker allowed to record the next turn.
    pub fn expected_speaker(&self) -> Speaker {
        if self.turns.len() % 2 == 0 {
            Speaker::Candidate
        } else {
            Speaker::Agent
        }
    }

    /// Appends a turn, rejecting anything that would break strict
    /// candidate/agent alternation.
    pub fn push(&mut self, turn: Turn) -> Result<()> {
        let expected = self.expected_speaker();
        if turn.role != expected {
            return Err(Error::OutOfOrderTurn {
                key: self.key.to_string(),
                expected,
                actual: turn.role,
            });
        }
        self.turns.push(turn);
        Ok(())
    }
}
