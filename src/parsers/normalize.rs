//! Record normalization entry points
//!
//! A record of unknown generation is parsed once into a JSON value, classified
//! by [`classify`], and handed to the parser owned by its generation. Anything
//! that does not fit comes back as [`ExtractError::MalformedRecord`]; callers
//! skip it and carry on.

use serde::Deserialize;
use serde_json::Value;

use super::deserializers::{deserialize_optional_millis, first_str, timestamp_millis};
use super::message::{TextSource, parse_message, parse_messages};
use super::schema::{SchemaGeneration, classify};
use crate::error::ExtractError;
use crate::models::{NormalizedConversation, NormalizedMessage, RawRecord, SourceTier};

/// Records above this size are rejected without parsing
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Key prefix of full conversation records in the global blob table
pub const COMPOSER_DATA_PREFIX: &str = "composerData:";

/// A normalized conversation plus the split-out bubbles it still references
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub conversation: NormalizedConversation,
    /// Bubble ids of a headers-only record, in conversation order
    pub pending_bubbles: Vec<String>,
}

/// Normalize raw bytes handed in by a caller
///
/// Returns the conversation, or [`ExtractError::MalformedRecord`] when the
/// bytes are not JSON or match no known generation. Registry documents list
/// many headers and are rejected here; use [`normalize_registry`] for them.
///
/// # Examples
///
/// ```
/// use composer_history::normalize_record;
///
/// let raw = br#"{"composerId":"abc","createdAt":1000,"conversation":[{"type":1,"text":"Hello"}]}"#;
/// let conversation = normalize_record(raw)?;
/// assert_eq!(conversation.id, "abc");
/// assert_eq!(conversation.messages.len(), 1);
/// # Ok::<(), composer_history::ExtractError>(())
/// ```
pub fn normalize_record(raw: &[u8]) -> Result<NormalizedConversation, ExtractError> {
    extract(&RawRecord::detached(raw)).map(|e| e.conversation)
}

/// Normalize a record read from a store; the key supplies the id when the body lacks one
pub fn extract(record: &RawRecord) -> Result<Extracted, ExtractError> {
    let key = record.key();
    let value = parse_json(&record.value, key)?;
    let generation = classify(&value);
    tracing::trace!("Record {} classified as {}", key.unwrap_or("<detached>"), generation.name());

    let (messages, pending_bubbles) = match generation {
        SchemaGeneration::Legacy(raw) => (parse_messages(raw, TextSource::Plain), Vec::new()),
        SchemaGeneration::RichText(raw) => (parse_messages(raw, TextSource::RichText), Vec::new()),
        SchemaGeneration::HeadersOnly(headers) => (Vec::new(), bubble_ids(headers)),
        SchemaGeneration::Message => (parse_message(&value, TextSource::RichText).into_iter().collect(), Vec::new()),
        SchemaGeneration::Header => (Vec::new(), Vec::new()),
        SchemaGeneration::Registry(headers) => {
            return Err(ExtractError::malformed_record(
                key,
                format!("composer registry with {} headers is not a single conversation", headers.len()),
            ));
        }
        SchemaGeneration::Unusable(reason) => return Err(ExtractError::malformed_record(key, reason)),
    };

    let conversation = NormalizedConversation::new(conversation_id(&value, key), created_at(&value), SourceTier::Direct)
        .with_name(first_str(&value, &["name"]).map(str::to_string))
        .with_messages(messages);

    Ok(Extracted { conversation, pending_bubbles })
}

/// Normalize one split-out bubble into a message
pub fn normalize_bubble(record: &RawRecord) -> Result<Option<NormalizedMessage>, ExtractError> {
    let value = parse_json(&record.value, record.key())?;
    Ok(parse_message(&value, TextSource::RichText))
}

#[derive(Debug, Deserialize)]
struct ComposerHeader {
    #[serde(rename = "composerId", alias = "id")]
    composer_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "createdAt", default, deserialize_with = "deserialize_optional_millis")]
    created_at: Option<i64>,
    #[serde(rename = "lastUpdatedAt", default, deserialize_with = "deserialize_optional_millis")]
    last_updated_at: Option<i64>,
}

/// Normalize a composer registry into metadata-only conversations
///
/// Individual headers that fail to parse are skipped; a document that is not a
/// registry at all is an error.
pub fn normalize_registry(raw: &[u8]) -> Result<Vec<NormalizedConversation>, ExtractError> {
    let value = parse_json(raw, None)?;
    let SchemaGeneration::Registry(headers) = classify(&value) else {
        return Err(ExtractError::malformed_record(None, "not a composer registry"));
    };

    let mut conversations = Vec::with_capacity(headers.len());
    for header in headers {
        match ComposerHeader::deserialize(header) {
            Ok(header) if !header.composer_id.is_empty() => {
                conversations.push(
                    NormalizedConversation::new(
                        header.composer_id,
                        header.created_at.or(header.last_updated_at).unwrap_or_default(),
                        SourceTier::LocalRegistry,
                    )
                    .with_name(header.name),
                );
            }
            Ok(_) => tracing::debug!("Skipping registry header with empty composerId"),
            Err(e) => tracing::debug!("Skipping malformed registry header: {}", e),
        }
    }
    Ok(conversations)
}

fn parse_json(raw: &[u8], key: Option<&str>) -> Result<Value, ExtractError> {
    if raw.len() > MAX_RECORD_BYTES {
        return Err(ExtractError::malformed_record(
            key,
            format!("record too large ({} bytes, max {})", raw.len(), MAX_RECORD_BYTES),
        ));
    }
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(ExtractError::malformed_record(key, "empty record"));
    }
    serde_json::from_slice(raw).map_err(|e| ExtractError::malformed_record(key, e))
}

fn conversation_id(value: &Value, key: Option<&str>) -> String {
    first_str(value, &["composerId", "id", "bubbleId"])
        .map(str::to_string)
        .or_else(|| key.and_then(|k| k.strip_prefix(COMPOSER_DATA_PREFIX)).map(str::to_string))
        .unwrap_or_default()
}

fn created_at(value: &Value) -> i64 {
    value.get("createdAt").and_then(timestamp_millis).unwrap_or_default()
}

fn bubble_ids(headers: &[Value]) -> Vec<String> {
    headers.iter().filter_map(|h| first_str(h, &["bubbleId"])).map(str::to_string).collect()
}
