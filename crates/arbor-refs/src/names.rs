//! Branch and tag name validation following git-style conventions.
//!
//! Valid names:
//! - Must be non-empty
//! - Must not contain whitespace, `/`, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not start or end with `.`
//! - Must not end with `.lock`
//! - Must not be `HEAD` or look like a (partial) commit id
//!
//! Refs are single files directly under `refs/heads` or `refs/tags`, so a
//! name is always one path component.

use arbor_types::is_hex_prefix;

use crate::error::{RefError, RefResult};

/// Characters that are forbidden anywhere in a ref name.
const FORBIDDEN_CHARS: &[char] = &[
    ' ', '\t', '\n', '\r', '/', '~', '^', ':', '?', '*', '[', '\\',
];

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use arbor_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("master").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> RefResult<()> {
    check(name).map_err(|reason| RefError::InvalidBranchName {
        name: name.to_string(),
        reason,
    })
}

/// Validate a tag name. Same rules as branch names.
pub fn validate_tag_name(name: &str) -> RefResult<()> {
    check(name).map_err(|reason| RefError::InvalidTagName {
        name: name.to_string(),
        reason,
    })
}

fn check(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".into());
    }

    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(format!("contains forbidden character: {ch:?}"));
    }

    if name.contains("..") {
        return Err("must not contain '..'".into());
    }

    // Reflog syntax.
    if name.contains("@{") {
        return Err("must not contain '@{'".into());
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err("must not start or end with '.'".into());
    }

    if name.ends_with(".lock") {
        return Err("must not end with '.lock'".into());
    }

    // Resolution classifies these before looking at refs.
    if name == "HEAD" {
        return Err("'HEAD' is reserved".into());
    }
    if is_hex_prefix(name) {
        return Err("must not look like a commit id".into());
    }

    Ok(())
}
