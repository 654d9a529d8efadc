use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// One scripted turn as it appears in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioTurn {
    pub role: String,
    pub content: String,
}

impl ScenarioTurn {
    pub fn candidate(content: impl ToString) -> Self {
        Self { role: "user".to_string(), content: content.to_string() }
    }

    /// Only candidate turns are sent; any other role is skipped.
    pub fn is_candidate(&self) -> bool {
        matches!(self.role.as_str(), "user" | "candidate")
    }
}

/// An adversarial script: the ordered candidate messages to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct Scenario {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub turns: Vec<ScenarioTurn>,
}

#[derive(Deserialize)]
struct RawScenario {
    id: Option<String>,
    #[serde(default)]
    description: String,
    turns: Vec<ScenarioTurn>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScenarioDocument {
    List(Vec<Value>),
    Wrapped { scenarios: Vec<Value> },
}

impl Scenario {
    pub fn new(id: impl ToString, turns: Vec<ScenarioTurn>) -> Self {
        Self { id: id.to_string(), description: String::new(), turns }
    }

    /// Parses a single scenario. A missing id falls back to `fallback_id`.
    pub fn parse(json: &str, fallback_id: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|error| Error::MalformedScenario {
            scenario: fallback_id.to_string(),
            reason: error.to_string(),
        })?;
        Self::from_value(value, fallback_id)
    }

    /// Parses a scenario file holding either a list of scenarios or an object
    /// with a `scenarios` list. A document that is not valid JSON fails as a
    /// whole; a malformed entry only fails its own slot.
    pub fn parse_batch(json: &str) -> Result<Vec<Result<Self>>> {
        let document: ScenarioDocument =
            serde_json::from_str(json).map_err(|error| Error::MalformedScenario {
                scenario: "<batch>".to_string(),
                reason: error.to_string(),
            })?;
        let entries = match document {
            ScenarioDocument::List(entries) => entries,
            ScenarioDocument::Wrapped { scenarios } => scenarios,
        };

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(index, value)| Self::from_value(value, &format!("scenario-{}", index + 1)))
            .collect())
    }

    fn from_value(value: Value, fallback_id: &str) -> Result<Self> {
        let label = value
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or(fallback_id)
            .to_string();
        let raw: RawScenario = serde_json::from_value(value)
            .map_err(|error| Error::MalformedScenario { scenario: label, reason: error.to_string() })?;
        Ok(Self {
            id: raw.id.unwrap_or_else(|| fallback_id.to_string()),
            description: raw.description,
            turns: raw.turns,
        })
    }

    pub fn candidate_turns(&self) -> impl Iterator<Item = &str> {
        self.turns
            .iter()
            .filter(|turn| turn.is_candidate())
            .map(|turn| turn.content.as_str())
    }
}
