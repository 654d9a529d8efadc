use serde::{Deserialize, Serialize};

use crate::ViolationCategory;

/// A forbidden behavior detected in one agent response.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ViolationFinding {
    pub category: ViolationCategory,
    /// 1-based index of the scenario turn that produced the response.
    pub turn_index: usize,
    /// The trigger phrase that matched.
    pub evidence: String,
}

impl ViolationFinding {
    pub fn new(category: ViolationCategory, turn_index: usize, evidence: impl ToString) -> Self {
        Self { category, turn_index, evidence: evidence.to_string() }
    }
}
