use derive_more::derive::Display;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EncodingStrategy, Error, PersonaContract, Result, Speaker, Turn};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        ModelId(value.to_string())
    }
}

/// Sampling temperature accepted by chat-completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Display, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Temperature(f32);

impl Temperature {
    pub fn new(value: f32) -> Result<Self> {
        if (0.0..=2.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::InvalidTemperature(value))
        }
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Temperature {
    fn default() -> Self {
        Self(0.7)
    }
}

impl TryFrom<f32> for Temperature {
    type Error = Error;

    fn try_from(value: f32) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Temperature> for f32 {
    fn from(value: Temperature) -> Self {
        value.0
    }
}

/// Wire-level role of a message sent to the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[display("system")]
    System,
    #[display("user")]
    User,
    #[display("assistant")]
    Assistant,
}

impl From<Speaker> for Role {
    fn from(value: Speaker) -> Self {
        match value {
            Speaker::Candidate => Role::User,
            Speaker::Agent => Role::Assistant,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextMessage {
    pub role: Role,
    pub content: String,
}

impl ContextMessage {
    pub fn system(content: impl ToString) -> Self {
        Self { role: Role::System, content: content.to_string() }
    }

    pub fn user(content: impl ToString) -> Self {
        Self { role: Role::User, content: content.to_string() }
    }

    pub fn assistant(content: impl ToString) -> Self {
        Self { role: Role::Assistant, content: content.to_string() }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

impl From<&Turn> for ContextMessage {
    fn from(turn: &Turn) -> Self {
        Self { role: turn.role.into(), content: turn.content.clone() }
    }
}

/// The exact request payload handed to a model backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into, strip_option)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ContextMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Temperature>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl Context {
    pub fn add_message(mut self, message: impl Into<ContextMessage>) -> Self {
        let message = message.into();
        debug!(role = %message.role, "Adding message to context");
        self.messages.push(message);
        self
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|message| message.has_role(Role::System))
            .map(|message| message.content.as_str())
    }

    /// Messages after the system instructions.
    pub fn dialogue(&self) -> impl Iterator<Item = &ContextMessage> {
        self.messages.iter().filter(|message| !message.has_role(Role::System))
    }
}

impl EncodingStrategy {
    /// Builds the model request for `current` given the accumulated
    /// `history`. The persona always travels out of band as the system
    /// message; only the encoding of the history differs between strategies.
    pub fn build(&self, persona: &PersonaContract, history: &[Turn], current: &str) -> Context {
        let context = Context::default().add_message(ContextMessage::system(persona.system_prompt()));
        match self {
            EncodingStrategy::TranscriptEmbedded => {
                context.add_message(ContextMessage::user(embed_transcript(history, current)))
            }
            EncodingStrategy::NativeSequence => history
                .iter()
                .fold(context, |context, turn| context.add_message(ContextMessage::from(turn)))
                .add_message(ContextMessage::user(current)),
        }
    }
}

/// One history entry of the embedded transcript, serialized role first.
#[derive(Serialize)]
struct TranscriptEntry<'a> {
    role: Role,
    content: &'a str,
}

fn embed_transcript(history: &[Turn], current: &str) -> String {
    let entries = history
        .iter()
        .map(|turn| TranscriptEntry { role: turn.role.into(), content: &turn.content })
        .collect::<Vec<_>>();
    // Serializing plain strings and enum variants cannot fail
    let history = serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string());

    format!("Conversation history:\n{history}\n\nCurrent candidate message:\n{current}")
}
