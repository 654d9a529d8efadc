use coherence_domain::{Context, ContextMessage, ModelId, Role};
use serde::Serialize;

/// Body of a non-streaming `chat/completions` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl From<ContextMessage> for Message {
    fn from(message: ContextMessage) -> Self {
        Self { role: message.role, content: message.content }
    }
}

impl Request {
    pub fn new(model: &ModelId, context: Context) -> Self {
        Self {
            model: model.as_str().to_string(),
            messages: context.messages.into_iter().map(Message::from).collect(),
            temperature: context.temperature.map(|temperature| temperature.value()),
            max_tokens: context.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use coherence_domain::Temperature;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serialization() {
        let context = Context::default()
            .add_message(ContextMessage::system("Be brief."))
            .add_message(ContextMessage::user("Hi"))
            .temperature(Temperature::new(0.5).unwrap())
            .max_tokens(300usize);

        let actual = serde_json::to_value(Request::new(&ModelId::new("gpt-4.1"), context)).unwrap();
        let expected = json!({
            "model": "gpt-4.1",
            "messages": [
                {"role": "system", "content": "Be brief."},
                {"role": "user", "content": "Hi"}
            ],
            "temperature": 0.5,
            "max_tokens": 300
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_request_omits_unset_sampling() {
        let context = Context::default().add_message(ContextMessage::user("Hi"));
        let actual = serde_json::to_value(Request::new(&ModelId::new("m"), context)).unwrap();
        assert_eq!(actual.get("temperature"), None);
        assert_eq!(actual.get("max_tokens"), None);
    }
}
