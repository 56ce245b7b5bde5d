//! Structural classification of raw records
//!
//! Records carry no reliable version tag, so the generation is decided by
//! probing which fields are present and what type they have. Probes run in a
//! fixed order; the first one that matches wins.

use serde_json::Value;

/// The record shapes the normalizer understands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaGeneration<'a> {
    /// `conversation` array of messages with a direct `text` field
    Legacy(&'a [Value]),
    /// `conversation` array whose messages carry a serialized `richText` tree
    RichText(&'a [Value]),
    /// `fullConversationHeadersOnly` array; message bodies live under separate keys
    HeadersOnly(&'a [Value]),
    /// `allComposers` array of lightweight composer headers
    Registry(&'a [Value]),
    /// A single composer header without any conversation field
    Header,
    /// A single message object (a split-out bubble)
    Message,
    Unusable(&'static str),
}

impl SchemaGeneration<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaGeneration::Legacy(_) => "legacy",
            SchemaGeneration::RichText(_) => "rich-text",
            SchemaGeneration::HeadersOnly(_) => "headers-only",
            SchemaGeneration::Registry(_) => "registry",
            SchemaGeneration::Header => "header",
            SchemaGeneration::Message => "message",
            SchemaGeneration::Unusable(_) => "unusable",
        }
    }
}

pub fn classify(value: &Value) -> SchemaGeneration<'_> {
    match value {
        Value::Array(items) => classify_message_list(items),
        Value::Object(map) => {
            if let Some(Value::Array(headers)) = map.get("allComposers") {
                return SchemaGeneration::Registry(headers);
            }

            let conversation = map.get("conversation").and_then(Value::as_array);
            if let Some(messages) = conversation
                && !messages.is_empty()
            {
                return classify_message_list(messages);
            }

            if let Some(Value::Array(headers)) = map.get("fullConversationHeadersOnly")
                && !headers.is_empty()
            {
                return SchemaGeneration::HeadersOnly(headers);
            }

            if let Some(messages) = conversation {
                // Present but empty: a conversation that never got a message
                return SchemaGeneration::Legacy(messages);
            }

            if is_message(value) {
                return SchemaGeneration::Message;
            }

            if map.contains_key("composerId") {
                return SchemaGeneration::Header;
            }

            SchemaGeneration::Unusable("object matches no known record shape")
        }
        Value::Null => SchemaGeneration::Unusable("record is null"),
        _ => SchemaGeneration::Unusable("record is neither an object nor an array"),
    }
}

fn classify_message_list(items: &[Value]) -> SchemaGeneration<'_> {
    // Stray non-object entries are dropped later by the message parser
    if !items.is_empty() && !items.iter().any(Value::is_object) {
        return SchemaGeneration::Unusable("message list has no object entries");
    }
    if items.iter().any(|m| m.get("richText").is_some_and(|r| !r.is_null())) {
        SchemaGeneration::RichText(items)
    } else {
        SchemaGeneration::Legacy(items)
    }
}

fn is_message(value: &Value) -> bool {
    value.get("type").is_some_and(|t| !t.is_null())
        && (value.get("text").is_some_and(Value::is_string) || value.get("richText").is_some())
}
