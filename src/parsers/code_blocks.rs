//! Code block extraction and inline diff synthesis
//!
//! Some message generations store rendered `codeBlocks`; others store only a
//! checkpoint of per-file line-range replacements. Both end up as [`CodeBlock`]s.

use std::path::Path;

use serde_json::Value;

use super::deserializers::{first_line, first_str};
use crate::models::CodeBlock;
use crate::utils::decode_folder_uri;

const DEFAULT_LANGUAGE: &str = "plaintext";

/// Language id inferred from a file extension
pub fn language_for_path(path: &str) -> &'static str {
    let ext = Path::new(path).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("rs") => "rust",
        Some("py") => "python",
        Some("ts") => "typescript",
        Some("tsx") => "typescriptreact",
        Some("js" | "mjs" | "cjs") => "javascript",
        Some("jsx") => "javascriptreact",
        Some("go") => "go",
        Some("java") => "java",
        Some("c" | "h") => "c",
        Some("cpp" | "cc" | "cxx" | "hpp") => "cpp",
        Some("cs") => "csharp",
        Some("rb") => "ruby",
        Some("php") => "php",
        Some("swift") => "swift",
        Some("kt" | "kts") => "kotlin",
        Some("md") => "markdown",
        Some("json") => "json",
        Some("yaml" | "yml") => "yaml",
        Some("toml") => "toml",
        Some("sh" | "bash" | "zsh") => "shellscript",
        Some("html" | "htm") => "html",
        Some("css") => "css",
        Some("sql") => "sql",
        _ => DEFAULT_LANGUAGE,
    }
}

/// File path from a `uri` field (object with `path`/`fsPath`, or a URI string)
pub fn uri_path(uri: &Value) -> Option<String> {
    match uri {
        Value::String(s) => decode_folder_uri(s),
        Value::Object(_) => first_str(uri, &["fsPath", "path"])
            .map(str::to_string)
            .or_else(|| first_str(uri, &["external"]).and_then(decode_folder_uri)),
        _ => None,
    }
}

/// Rendered code blocks stored on a message
pub fn parse_code_blocks(message: &Value) -> Vec<CodeBlock> {
    let Some(blocks) = message.get("codeBlocks").and_then(Value::as_array) else {
        return Vec::new();
    };

    blocks
        .iter()
        .filter_map(|block| {
            let code = first_str(block, &["content", "code"])?;
            if code.trim().is_empty() {
                return None;
            }
            let file_path =
                block.get("uri").and_then(uri_path).or_else(|| first_str(block, &["filePath"]).map(str::to_string));
            let language = first_str(block, &["languageId", "language"])
                .map(str::to_string)
                .unwrap_or_else(|| file_path.as_deref().map(language_for_path).unwrap_or(DEFAULT_LANGUAGE).to_string());
            let range = block.get("range").unwrap_or(block);
            Some(CodeBlock {
                code: code.to_string(),
                language,
                file_path,
                line_start: first_line(range, &["startLineNumber", "startLine", "lineStart"]),
                line_end: first_line(range, &["endLineNumber", "endLine", "lineEnd"]),
            })
        })
        .collect()
}

/// One line-range replacement against a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdit {
    pub file_path: String,
    pub start_line: u32,
    pub lines: Vec<String>,
}

impl FileEdit {
    fn line_end(&self) -> u32 {
        let added = u32::try_from(self.lines.len()).unwrap_or(u32::MAX);
        self.start_line.saturating_add(added.saturating_sub(1))
    }
}

/// Line-range replacements recorded in a message's `checkpoint`
pub fn checkpoint_edits(checkpoint: &Value) -> Vec<FileEdit> {
    let Some(files) = checkpoint.get("files").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut edits = Vec::new();
    for file in files {
        let Some(file_path) = file.get("uri").and_then(uri_path) else {
            continue;
        };
        let Some(diffs) = file.get("originalModelDiffWrtV0").and_then(Value::as_array) else {
            continue;
        };
        for diff in diffs {
            let start_line = diff.get("original").and_then(|o| first_line(o, &["startLineNumber"])).unwrap_or(1);
            let lines = diff
                .get("modified")
                .and_then(Value::as_array)
                .map(|lines| lines.iter().filter_map(Value::as_str).map(str::to_string).collect())
                .unwrap_or_default();
            edits.push(FileEdit { file_path: file_path.clone(), start_line, lines });
        }
    }
    edits
}

/// Materialize checkpoint edits into the block list
///
/// A block that already references the edited file has its content and line
/// range replaced; otherwise a new block is appended with the language taken
/// from the file extension. Edits apply in order, so the last edit to a file wins.
pub fn apply_edits(blocks: Vec<CodeBlock>, edits: &[FileEdit]) -> Vec<CodeBlock> {
    let mut blocks = blocks;
    for edit in edits {
        let synthesized = CodeBlock {
            code: edit.lines.join("\n"),
            language: language_for_path(&edit.file_path).to_string(),
            file_path: Some(edit.file_path.clone()),
            line_start: Some(edit.start_line),
            line_end: Some(edit.line_end()),
        };

        match blocks.iter_mut().find(|b| b.file_path.as_deref() == Some(edit.file_path.as_str())) {
            Some(existing) => {
                existing.code = synthesized.code;
                existing.line_start = synthesized.line_start;
                existing.line_end = synthesized.line_end;
            }
            None => blocks.push(synthesized),
        }
    }
    blocks
}
