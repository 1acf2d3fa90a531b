//! Validation for logical stream names
//!
//! Stream names are relative, case-sensitive, forward-slash separated keys.
//! Producers traditionally address streams with a leading slash
//! (`/content/0`); a single leading slash is accepted and stripped so both
//! spellings resolve to the same stream.

use crate::error::{ArchiveError, Result};

/// Normalize a stream name to its canonical registry key.
///
/// # Rules
/// - An optional single leading `/` is stripped
/// - The remainder must be non-empty
/// - Segments are separated by `/`; empty segments are rejected
/// - `.` and `..` segments are rejected (no escaping the archive namespace)
/// - Backslashes and NUL bytes are rejected
///
/// # Examples
///
/// ```
/// use rptdoc::validation::normalize_stream_name;
///
/// assert_eq!(normalize_stream_name("/content/0").unwrap(), "content/0");
/// assert_eq!(normalize_stream_name("content/0").unwrap(), "content/0");
///
/// assert!(normalize_stream_name("").is_err());
/// assert!(normalize_stream_name("../escape").is_err());
/// ```
pub fn normalize_stream_name(name: &str) -> Result<String> {
    let name = name.strip_prefix('/').unwrap_or(name);

    if name.is_empty() {
        return Err(ArchiveError::InvalidStreamName(
            "stream name is empty".to_string(),
        ));
    }

    if name.contains('\\') {
        return Err(ArchiveError::InvalidStreamName(format!(
            "'{}' contains a backslash; stream names use forward slashes",
            name
        )));
    }

    if name.contains('\0') {
        return Err(ArchiveError::InvalidStreamName(
            "stream name contains a NUL byte".to_string(),
        ));
    }

    if name.ends_with('/') {
        return Err(ArchiveError::InvalidStreamName(format!(
            "'{}' ends with a separator",
            name
        )));
    }

    for segment in name.split('/') {
        if segment.is_empty() {
            return Err(ArchiveError::InvalidStreamName(format!(
                "'{}' contains an empty path segment",
                name
            )));
        }
        if segment == "." || segment == ".." {
            return Err(ArchiveError::InvalidStreamName(format!(
                "'{}' contains a relative path segment",
                name
            )));
        }
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert_eq!(normalize_stream_name("content").unwrap(), "content");
        assert_eq!(normalize_stream_name("content/0").unwrap(), "content/0");
        assert_eq!(normalize_stream_name("/toc/0").unwrap(), "toc/0");
        assert_eq!(
            normalize_stream_name("Design.Page/0").unwrap(),
            "Design.Page/0"
        );
    }

    #[test]
    fn test_leading_slash_is_stripped() {
        assert_eq!(
            normalize_stream_name("/content/0").unwrap(),
            normalize_stream_name("content/0").unwrap()
        );
    }

    #[test]
    fn test_invalid_names() {
        assert!(normalize_stream_name("").is_err());
        assert!(normalize_stream_name("/").is_err());
        assert!(normalize_stream_name("content/").is_err());
        assert!(normalize_stream_name("content//0").is_err());
        assert!(normalize_stream_name("../escape").is_err());
        assert!(normalize_stream_name("a/../b").is_err());
        assert!(normalize_stream_name("a/./b").is_err());
        assert!(normalize_stream_name("a\\b").is_err());
        assert!(normalize_stream_name("a\0b").is_err());
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_ne!(
            normalize_stream_name("Content").unwrap(),
            normalize_stream_name("content").unwrap()
        );
    }
}
