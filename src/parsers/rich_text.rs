//! Rich-text document reconstruction
//!
//! Messages of the rich-text generation carry a serialized editor document: a
//! `root` node with nested block and inline nodes. Plain text is recovered by a
//! depth-first walk that concatenates `text` nodes in document order; `code`
//! nodes are lifted out into separate [`CodeBlock`]s instead of being inlined.

use serde_json::Value;

use crate::models::CodeBlock;

/// Trees deeper than this are rejected as pathological
pub const MAX_DEPTH: usize = 64;

const DEFAULT_LANGUAGE: &str = "plaintext";

/// Node kinds the walker distinguishes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeKind<'a> {
    Text(&'a str),
    LineBreak,
    /// Block containers start on a new line
    Container { block: bool, children: &'a [Value] },
    Code { language: Option<&'a str>, children: &'a [Value] },
    /// Unrecognized node; its children are still visited
    Unknown(&'a [Value]),
}

pub fn node_kind(node: &Value) -> NodeKind<'_> {
    let children = children_of(node);
    match node.get("type").and_then(Value::as_str).unwrap_or_default() {
        "text" => NodeKind::Text(node.get("text").and_then(Value::as_str).unwrap_or_default()),
        "linebreak" => NodeKind::LineBreak,
        "paragraph" | "blockquote" | "listitem" | "listItem" | "list" | "heading" | "quote" => {
            NodeKind::Container { block: true, children }
        }
        "root" | "link" => NodeKind::Container { block: false, children },
        "code" => NodeKind::Code { language: code_language(node), children },
        // Leaves such as `code-highlight`, `tab` or `mention` carry their own text
        _ => match node.get("text").and_then(Value::as_str) {
            Some(text) => NodeKind::Text(text),
            None => NodeKind::Unknown(children),
        },
    }
}

fn children_of(node: &Value) -> &[Value] {
    node.get("children")
        .or_else(|| node.get("content"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn code_language(node: &Value) -> Option<&str> {
    node.get("language")
        .and_then(Value::as_str)
        .or_else(|| node.get("attrs").and_then(|a| a.get("language")).and_then(Value::as_str))
        .filter(|l| !l.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RichTextError {
    /// Not valid JSON, or no `root` node
    Invalid(String),
    DepthExceeded,
}

/// Text and code recovered from one document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichTextContent {
    pub text: String,
    pub code_blocks: Vec<CodeBlock>,
}

/// Reconstruct a `richText` field, given either as a JSON string or inline
pub fn parse_rich_text(raw: &Value) -> Result<RichTextContent, RichTextError> {
    let owned;
    let document = match raw {
        Value::String(s) => {
            owned = serde_json::from_str::<Value>(s).map_err(|e| RichTextError::Invalid(e.to_string()))?;
            &owned
        }
        other => other,
    };

    let root = match document.get("root") {
        Some(root) => root,
        None if document.get("type").and_then(Value::as_str) == Some("root") => document,
        None => return Err(RichTextError::Invalid("document has no root node".to_string())),
    };

    let mut walker = Walker::default();
    walker.visit(root, 0)?;
    Ok(RichTextContent { text: walker.text.trim().to_string(), code_blocks: walker.code_blocks })
}

#[derive(Default)]
struct Walker {
    text: String,
    code_blocks: Vec<CodeBlock>,
}

impl Walker {
    fn visit(&mut self, node: &Value, depth: usize) -> Result<(), RichTextError> {
        if depth > MAX_DEPTH {
            return Err(RichTextError::DepthExceeded);
        }

        match node_kind(node) {
            NodeKind::Text(text) => self.text.push_str(text),
            NodeKind::LineBreak => self.text.push('\n'),
            NodeKind::Container { block, children } => {
                if block && !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.text.push('\n');
                }
                self.visit_all(children, depth)?;
            }
            NodeKind::Code { language, children } => {
                let mut inner = Walker::default();
                inner.visit_all(children, depth)?;
                // Code nested inside code stays inline in the outer block
                let mut code = inner.text;
                for nested in inner.code_blocks {
                    code.push_str(&nested.code);
                }
                if !code.trim().is_empty() {
                    self.code_blocks.push(CodeBlock {
                        code: code.trim_end_matches('\n').to_string(),
                        language: language.unwrap_or(DEFAULT_LANGUAGE).to_string(),
                        file_path: None,
                        line_start: None,
                        line_end: None,
                    });
                }
            }
            NodeKind::Unknown(children) => self.visit_all(children, depth)?,
        }
        Ok(())
    }

    fn visit_all(&mut self, children: &[Value], depth: usize) -> Result<(), RichTextError> {
        for child in children {
            self.visit(child, depth + 1)?;
        }
        Ok(())
    }
}
