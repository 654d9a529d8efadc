use coherence_domain::{Conversation, ConversationKey, Result, Turn};
use dashmap::DashMap;
use tracing::debug;

/// Per-conversation turn logs for one evaluation batch.
///
/// Conversations are isolated by their full [`ConversationKey`], so two
/// scenarios sharing a label but running under another strategy or target
/// never see each other's history. Entries are created lazily and only
/// removed wholesale by [`ConversationStore::reset_all`].
#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: DashMap<ConversationKey, Conversation>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the conversation, creating an empty one on first
    /// use of `key`.
    pub fn get_or_create(&self, key: &ConversationKey) -> Conversation {
        self.conversations
            .entry(key.clone())
            .or_insert_with(|| {
                debug!(conversation = %key, "Creating conversation");
                Conversation::new(key.clone())
            })
            .value()
            .clone()
    }

    /// Turns recorded so far for `key`.
    pub fn history(&self, key: &ConversationKey) -> Vec<Turn> {
        self.get_or_create(key).turns().to_vec()
    }

    /// Appends one turn, enforcing candidate/agent alternation.
    pub fn append(&self, key: &ConversationKey, turn: Turn) -> Result<()> {
        let mut conversation = self
            .conversations
            .entry(key.clone())
            .or_insert_with(|| Conversation::new(key.clone()));
        conversation.push(turn)?;
        debug!(conversation = %key, turns = conversation.len(), "Appended turn");
        Ok(())
    }

    /// Records a candidate message and the agent's reply as one unit. Either
    /// both turns are stored or neither is.
    pub fn record_exchange(&self, key: &ConversationKey, candidate: &str, agent: &str) -> Result<()> {
        let mut entry = self
            .conversations
            .entry(key.clone())
            .or_insert_with(|| Conversation::new(key.clone()));

        let mut updated = entry.value().clone();
        updated.push(Turn::candidate(candidate))?;
        updated.push(Turn::agent(agent))?;
        *entry = updated;

        debug!(conversation = %key, turns = entry.len(), "Recorded exchange");
        Ok(())
    }

    /// Drops every conversation. Meant for batch boundaries, never between
    /// turns of a running conversation.
    pub fn reset_all(&self) {
        debug!(conversations = self.conversations.len(), "Resetting conversation store");
        self.conversations.clear();
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
