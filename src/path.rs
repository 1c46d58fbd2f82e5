//! Unix path resolution for the virtual filesystem
//!
//! Every public filesystem and git operation funnels its path arguments
//! through [`resolve`], so the rest of the crate only ever sees absolute,
//! normalized paths of the form `/a/b/c` (or `/` for the root).
//!
//! ## Rules
//!
//! - An empty input resolves to the current working directory
//! - Absolute inputs ignore the working directory
//! - Repeated slashes produce empty segments, which are dropped
//! - `.` is a no-op, `..` pops one segment and is a no-op at the root
//!
//! ```rust
//! use termfs::path::resolve;
//!
//! assert_eq!(resolve("../etc//hostname", "/home/user"), "/home/etc/hostname");
//! assert_eq!(resolve("..", "/"), "/");
//! assert_eq!(resolve("", "/tmp"), "/tmp");
//! ```

use crate::error::{Result, TermfsError};

/// Path of the filesystem root
pub const ROOT: &str = "/";

/// Resolve `path` against `cwd` into a normalized absolute path
///
/// Pure and idempotent: `resolve(&resolve(p, cwd), cwd) == resolve(p, cwd)`.
/// `cwd` is expected to be absolute; if it is not, it is treated as if it
/// were rooted at `/`.
pub fn resolve(path: &str, cwd: &str) -> String {
    if path.is_empty() {
        return normalize(cwd);
    }

    let mut segments: Vec<&str> = Vec::new();
    if !path.starts_with('/') {
        push_segments(&mut segments, cwd);
    }
    push_segments(&mut segments, path);

    join_segments(&segments)
}

/// Normalize an absolute path without reference to any working directory
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    push_segments(&mut segments, path);
    join_segments(&segments)
}

fn push_segments<'a>(segments: &mut Vec<&'a str>, path: &'a str) {
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(seg),
        }
    }
}

fn join_segments(segments: &[&str]) -> String {
    if segments.is_empty() {
        return ROOT.to_string();
    }
    let mut out = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for seg in segments {
        out.push('/');
        out.push_str(seg);
    }
    out
}

/// Split an absolute normalized path into its segments
///
/// The root yields no segments.
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Parent of an absolute normalized path; the root is its own parent
pub fn parent_path(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => ROOT.to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// Last segment of an absolute normalized path; empty for the root
pub fn base_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Append a single name to an absolute directory path
pub fn join_path(dir: &str, name: &str) -> String {
    if dir == ROOT {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Whether `path` equals `ancestor` or lies underneath it
///
/// Compares whole segments, so `/tmpfoo` is not within `/tmp`.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == ROOT {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Validate a branch name
///
/// Rejects empty names, whitespace and control characters, the characters
/// `~ ^ : ? * [ \`, `..`, a leading `-` or `/`, a trailing `/` or `.`, and
/// the `.lock` suffix.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TermfsError::invalid_branch_name(name, "name must not be empty"));
    }

    for ch in name.chars() {
        if ch.is_whitespace() || ch.is_control() {
            return Err(TermfsError::invalid_branch_name(
                name,
                "name must not contain whitespace or control characters",
            ));
        }
        if matches!(ch, '~' | '^' | ':' | '?' | '*' | '[' | '\\') {
            return Err(TermfsError::invalid_branch_name(
                name,
                format!("name contains invalid character {:?}", ch),
            ));
        }
    }

    if name.contains("..") {
        return Err(TermfsError::invalid_branch_name(name, "name must not contain '..'"));
    }
    if name.starts_with('-') || name.starts_with('/') {
        return Err(TermfsError::invalid_branch_name(name, "name must not start with '-' or '/'"));
    }
    if name.ends_with('/') || name.ends_with('.') || name.ends_with(".lock") {
        return Err(TermfsError::invalid_branch_name(
            name,
            "name must not end with '/', '.' or '.lock'",
        ));
    }

    Ok(())
}
