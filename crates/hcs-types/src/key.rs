//! Key validation and listing-prefix normalisation.
//!
//! Stored keys are slash-delimited paths such as `sys/policy/root`:
//! - Must be non-empty
//! - Must not start or end with `/`
//! - Must not contain empty segments (`//`)
//! - Must not contain `.` or `..` segments (`.` is the root bucket name)
//!
//! Listing prefixes are looser: `""`, `"foo"` and `"foo/"` are all accepted
//! and name the same directory level.

use crate::error::TypeError;

/// Separator between path segments.
pub const KEY_SEPARATOR: char = '/';

/// Validate a key for storage, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use hcs_types::validate_key;
///
/// assert!(validate_key("foo").is_ok());
/// assert!(validate_key("foo/bar").is_ok());
/// assert!(validate_key("").is_err());
/// assert!(validate_key("foo/").is_err());
/// ```
pub fn validate_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() {
        return Err(invalid(key, "key must not be empty"));
    }
    if key.starts_with(KEY_SEPARATOR) {
        return Err(invalid(key, "key must not start with '/'"));
    }
    if key.ends_with(KEY_SEPARATOR) {
        return Err(invalid(key, "key must not end with '/'"));
    }
    for segment in key.split(KEY_SEPARATOR) {
        if segment.is_empty() {
            return Err(invalid(key, "path segments must not be empty"));
        }
        if segment == "." || segment == ".." {
            return Err(invalid(key, "path segments must not be '.' or '..'"));
        }
    }
    Ok(())
}

/// Strip a single trailing `/` from a listing prefix.
///
/// `"foo/"` and `"foo"` both name the directory `foo`; `""` and `"/"` name the
/// root.
pub fn normalize_prefix(prefix: &str) -> &str {
    let trimmed = prefix.strip_suffix(KEY_SEPARATOR).unwrap_or(prefix);
    trimmed.strip_prefix(KEY_SEPARATOR).unwrap_or(trimmed)
}

fn invalid(key: &str, reason: &str) -> TypeError {
    TypeError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
