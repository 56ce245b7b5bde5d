//! Per-message reconstruction shared by the legacy and rich-text generations

use serde_json::Value;
use tracing::debug;

use super::code_blocks::{apply_edits, checkpoint_edits, parse_code_blocks};
use super::deserializers::{sender_role, timestamp_millis};
use super::rich_text::{RichTextContent, parse_rich_text};
use crate::models::{NormalizedMessage, Timing};

/// Which text source a message parser reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    /// Direct `text` field only
    Plain,
    /// `richText` document, falling back to `text` when it is absent or broken
    RichText,
}

/// Reconstruct one message; `None` when the sender is unknown or nothing is left
pub fn parse_message(raw: &Value, source: TextSource) -> Option<NormalizedMessage> {
    let role = raw.get("type").and_then(sender_role)?;

    let rich = match (source, raw.get("richText")) {
        (TextSource::RichText, Some(doc)) if !doc.is_null() => match parse_rich_text(doc) {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Falling back to plain text for message: {:?}", e);
                None
            }
        },
        _ => None,
    };

    let plain_text = || raw.get("text").and_then(Value::as_str).unwrap_or_default().trim().to_string();
    let (text, rich_blocks) = match rich {
        Some(RichTextContent { text, code_blocks }) if !text.is_empty() => (text, code_blocks),
        Some(RichTextContent { code_blocks, .. }) => (plain_text(), code_blocks),
        None => (plain_text(), Vec::new()),
    };

    let mut code_blocks = parse_code_blocks(raw);
    code_blocks.extend(rich_blocks);
    if let Some(checkpoint) = raw.get("checkpoint") {
        code_blocks = apply_edits(code_blocks, &checkpoint_edits(checkpoint));
    }

    let message = NormalizedMessage { role, text, code_blocks, timing: parse_timing(raw) };
    message.has_content().then_some(message)
}

/// Reconstruct every message of a list, dropping content-free turns
pub fn parse_messages(raw: &[Value], source: TextSource) -> Vec<NormalizedMessage> {
    raw.iter().filter_map(|m| parse_message(m, source)).collect()
}

fn parse_timing(raw: &Value) -> Option<Timing> {
    let info = raw.get("timingInfo")?;
    let field = |keys: &[&str]| keys.iter().filter_map(|k| info.get(*k)).find_map(timestamp_millis);

    let start = field(&["clientStartTime", "clientRpcSendTime"]);
    let end = field(&["clientEndTime", "clientSettleTime"]);
    match (start, end) {
        (Some(start), Some(end)) => Some(Timing { start, end: end.max(start) }),
        (Some(t), None) | (None, Some(t)) => Some(Timing { start: t, end: t }),
        (None, None) => None,
    }
}
