//! Environment lookups shared by the configuration structs.
//!
//! Values are trimmed and blank values count as unset. Numbers that fail to
//! parse fall back to the caller's default with a warning.

use std::str::FromStr;

/// Trimmed value of `key`, `None` when unset or blank
pub fn env_string(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

/// Parsed value of `key`, or `default` when unset, blank or malformed
pub fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    parse_or_default(key, std::env::var(key).ok(), default)
}

pub fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `key` only names the variable in the warning
pub fn parse_or_default<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    match non_blank(raw) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring malformed {}={:?}, using default", key, raw);
            default
        }),
        None => default,
    }
}
