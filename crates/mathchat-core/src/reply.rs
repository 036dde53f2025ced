//! Normalization of the model's final reply into a single string.
//!
//! The upstream reply shape is not contractually fixed: depending on the model
//! and Ollama version, the assistant message content arrives as a plain string,
//! as a list of content blocks, or wrapped in a message object. The variants
//! here cover the observed shapes; anything else is stringified verbatim so a
//! reply is never dropped.

use serde_json::Value;

/// One element of a block-style `content` list. Only `text` matters;
/// other keys (type tags, annotations) and non-mapping elements are ignored.
#[derive(Debug, Clone)]
pub struct ContentBlock {
    pub text: Option<Value>,
}

/// The model's final reply, classified by shape.
#[derive(Debug, Clone)]
pub enum AgentReply {
    /// A bare string.
    Text(String),
    /// A mapping with a non-empty `content` list whose first block carries `text`.
    ContentList(Vec<ContentBlock>),
    /// A message object exposing a `content` attribute of some other shape.
    ObjectWithContent(Value),
    /// Anything else; stringified as-is.
    Unknown(Value),
}

impl AgentReply {
    /// Classifies a raw reply value. Precedence matters and mirrors the
    /// upstream variants in the order they were observed:
    /// content-list mapping, then plain string, then any object with a
    /// `content` attribute, then unknown.
    pub fn from_value(value: Value) -> Self {
        if let Some(content) = value.as_object().and_then(|m| m.get("content")) {
            if let Some(blocks) = content.as_array() {
                // Only the first block's shape gates the classification;
                // later elements may be anything and must not lose the reply.
                if first_block_text(content).is_some() {
                    let blocks = blocks
                        .iter()
                        .map(|b| ContentBlock { text: b.get("text").cloned() })
                        .collect();
                    return AgentReply::ContentList(blocks);
                }
            }
            return AgentReply::ObjectWithContent(content.clone());
        }

        if let Value::String(s) = value {
            return AgentReply::Text(s);
        }

        AgentReply::Unknown(value)
    }

    /// Extracts exactly one textual value from the reply.
    pub fn into_text(self) -> String {
        match self {
            AgentReply::ContentList(blocks) => blocks
                .first()
                .and_then(|b| b.text.as_ref())
                .map(stringify)
                .unwrap_or_default(),
            AgentReply::Text(s) => s,
            AgentReply::ObjectWithContent(content) => {
                first_block_text(&content).unwrap_or_else(|| stringify(&content))
            }
            AgentReply::Unknown(value) => stringify(&value),
        }
    }
}

/// Extracts the `text` of the first block when `content` is a non-empty array
/// whose first element is a mapping carrying a `text` key.
fn first_block_text(content: &Value) -> Option<String> {
    content
        .as_array()?
        .first()?
        .as_object()?
        .get("text")
        .map(stringify)
}

/// Stringifies a JSON value: strings come out unquoted, everything else
/// is rendered as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_list_mapping_extracts_first_text() {
        let reply = AgentReply::from_value(json!({"content": [{"text": "hello"}]}));
        assert!(matches!(reply, AgentReply::ContentList(_)));
        assert_eq!(reply.into_text(), "hello");
    }

    #[test]
    fn later_non_mapping_elements_do_not_lose_the_reply() {
        let reply = AgentReply::from_value(json!({
            "content": [{"text": "hello"}, "trailing annotation"]
        }));
        assert_eq!(reply.into_text(), "hello");
    }

    #[test]
    fn later_blocks_without_text_do_not_lose_the_reply() {
        let reply = AgentReply::from_value(json!({
            "content": [{"text": "hello"}, {"type": "image"}, 42]
        }));
        assert_eq!(reply.into_text(), "hello");
    }

    #[test]
    fn content_list_uses_only_the_first_block() {
        let reply = AgentReply::from_value(json!({
            "content": [{"text": "first"}, {"text": "second"}]
        }));
        assert_eq!(reply.into_text(), "first");
    }

    #[test]
    fn plain_string_passes_through_unchanged() {
        let reply = AgentReply::from_value(json!("hi"));
        assert!(matches!(reply, AgentReply::Text(_)));
        assert_eq!(reply.into_text(), "hi");
    }

    #[test]
    fn object_content_with_text_block() {
        let reply = AgentReply::ObjectWithContent(json!([{"text": "x"}]));
        assert_eq!(reply.into_text(), "x");
    }

    #[test]
    fn object_content_of_other_shape_is_stringified() {
        let reply = AgentReply::ObjectWithContent(json!("raw"));
        assert_eq!(reply.into_text(), "raw");

        let reply = AgentReply::from_value(json!({"content": "raw"}));
        assert!(matches!(reply, AgentReply::ObjectWithContent(_)));
        assert_eq!(reply.into_text(), "raw");
    }

    #[test]
    fn non_string_text_value_is_stringified() {
        let reply = AgentReply::from_value(json!({"content": [{"text": 42}]}));
        assert_eq!(reply.into_text(), "42");
    }

    #[test]
    fn unknown_shapes_are_never_dropped() {
        let reply = AgentReply::from_value(json!({"foo": 1, "bar": [true]}));
        assert!(matches!(reply, AgentReply::Unknown(_)));
        assert!(!reply.into_text().is_empty());
    }

    #[test]
    fn empty_content_list_falls_back_to_stringified_content() {
        let reply = AgentReply::from_value(json!({"content": []}));
        assert_eq!(reply.into_text(), "[]");
    }
}
