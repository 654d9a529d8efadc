use std::iter::Sum;
use std::ops::Add;

use serde::{Deserialize, Serialize};

use crate::{BackendError, Context, ModelId};

/// Token accounting reported by the backend for one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            prompt_tokens: self.prompt_tokens + rhs.prompt_tokens,
            completion_tokens: self.completion_tokens + rhs.completion_tokens,
            total_tokens: self.total_tokens + rhs.total_tokens,
        }
    }
}

impl Sum for Usage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Usage::default(), |acc, usage| acc + usage)
    }
}

/// Text produced by the model for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    #[serde(default)]
    pub usage: Usage,
}

impl Completion {
    pub fn new(content: impl ToString) -> Self {
        Self { content: content.to_string(), usage: Usage::default() }
    }

    pub fn usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }
}

/// An opaque language-model endpoint: one request in, one completion or one
/// structured failure out.
#[async_trait::async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat(&self, model: &ModelId, context: Context) -> Result<Completion, BackendError>;
}
