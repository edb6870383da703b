//! Pure helpers shared by every rule source: title extraction, content
//! fingerprints, and the recognised-file filter.
//!
//! Nothing in here touches I/O. Sources call these while assembling
//! [`RuleDocument`](crate::models::RuleDocument)s.

use sha2::{Digest, Sha256};

/// File extension that marks a rule document.
pub const RULE_EXTENSION: &str = ".md";

/// Returns `true` when `name` is a rule document (`*.md`).
///
/// A bare `".md"` has no stem and is not treated as a rule.
pub fn is_rule_file(name: &str) -> bool {
    name.len() > RULE_EXTENSION.len() && name.ends_with(RULE_EXTENSION)
}

/// Strips the rule extension from a file name (`"foo.md"` → `"foo"`).
pub fn strip_rule_extension(name: &str) -> &str {
    name.strip_suffix(RULE_EXTENSION).unwrap_or(name)
}

/// Derives the display title of a rule.
///
/// Scans `content` line by line for the first level-1 heading (`#`, then
/// whitespace, then text) and returns the trimmed heading text. When no such
/// heading exists, falls back to `name` without its `.md` extension.
///
/// ```
/// use rules_mcp::extract::extract_title;
///
/// assert_eq!(extract_title("# Hello World\nbody", "hello.md"), "Hello World");
/// assert_eq!(extract_title("no heading here", "foo.md"), "foo");
/// ```
pub fn extract_title(content: &str, name: &str) -> String {
    content
        .lines()
        .find_map(heading_text)
        .map(str::to_string)
        .unwrap_or_else(|| strip_rule_extension(name).to_string())
}

fn heading_text(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then_some(text)
}

/// SHA-256 of the document body, hex encoded.
///
/// Used as the fingerprint for sources that cannot supply their own
/// version identifier (the local directory source).
pub fn content_fingerprint(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    hex::encode(hasher.finalize())
}
