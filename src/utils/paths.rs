use std::borrow::Cow;
use std::env;
use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use percent_encoding::percent_decode_str;

const FILE_SCHEME: &str = "file://";

/// Decodes a workspace folder URI into a filesystem path
///
/// Strips the `file://` scheme, percent-decodes the remainder and drops the
/// spurious slash VS Code-style URIs put in front of a Windows drive letter.
/// Non-`file` schemes (e.g. `vscode-remote://host/path`) decode to their path
/// component. Returns `None` for an empty or path-less URI.
///
/// # Examples
///
/// ```
/// use composer_history::decode_folder_uri;
///
/// assert_eq!(decode_folder_uri("file:///a/b/c").as_deref(), Some("/a/b/c"));
/// assert_eq!(decode_folder_uri("file:///c%3A/Users/x").as_deref(), Some("c:/Users/x"));
/// ```
pub fn decode_folder_uri(uri: &str) -> Option<String> {
    let uri = uri.trim();
    let without_scheme = match uri.strip_prefix(FILE_SCHEME) {
        Some(rest) => rest,
        None => match uri.split_once("://") {
            // Skip the authority of other schemes
            Some((_, rest)) => rest.find('/').map(|i| &rest[i..])?,
            None => uri,
        },
    };

    let decoded = percent_decode_str(without_scheme).decode_utf8_lossy();
    let decoded: &str = match decoded {
        Cow::Borrowed(s) => s,
        Cow::Owned(ref s) => s.as_str(),
    };

    let path = strip_drive_slash(decoded);
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

/// `/C:/Users/x` -> `C:/Users/x`
fn strip_drive_slash(path: &str) -> &str {
    let bytes = path.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        &path[1..]
    } else {
        path
    }
}

/// Final segment of a decoded folder path, accepting either separator
///
/// ```
/// use composer_history::display_name;
///
/// assert_eq!(display_name("/a/b/c"), "c");
/// assert_eq!(display_name("C:\\Users\\x\\"), "x");
/// ```
pub fn display_name(folder_path: &str) -> String {
    let trimmed = folder_path.trim_end_matches(['/', '\\']);
    let name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    if name.is_empty() { folder_path.to_string() } else { name.to_string() }
}

/// Validates that a file's size is within `max_bytes`
///
/// Takes an open file handle so the check applies to the same file that is
/// subsequently read.
pub fn validate_file_size(file: &File, path: &Path, max_bytes: u64) -> Result<()> {
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to read file metadata: {}", path.display()))?;

    let file_size = metadata.len();
    if file_size > max_bytes {
        bail!("File too large: {} ({} bytes, max {} bytes)", path.display(), file_size, max_bytes);
    }

    Ok(())
}

/// Formats a path with ~ substitution for the home directory
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && !home.is_empty()
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
