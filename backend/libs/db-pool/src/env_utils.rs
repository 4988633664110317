//! Environment variable parsing utilities
//!
//! Missing variables fall back to a default; variables that are present but
//! do not parse are reported instead of being silently replaced.

use std::str::FromStr;

/// Parse an environment variable, using `default` when it is unset or empty.
///
/// # Example
/// ```ignore
/// let port: u16 = parse_env_or("HTTP_PORT", 8080)?;
/// ```
pub fn parse_env_or<T: FromStr>(key: &str, default: T) -> Result<T, String> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("Failed to parse environment variable {}={:?}", key, raw)),
        _ => Ok(default),
    }
}

/// Parse a required environment variable.
///
/// # Example
/// ```ignore
/// let database_url = parse_env_required::<String>("DATABASE_URL")?;
/// ```
pub fn parse_env_required<T: FromStr>(key: &str) -> Result<T, String> {
    let raw = std::env::var(key).map_err(|_| format!("Environment variable {} not found", key))?;
    if raw.trim().is_empty() {
        return Err(format!("Environment variable {} is empty", key));
    }
    raw.trim()
        .parse()
        .map_err(|_| format!("Failed to parse environment variable {}", key))
}

/// Read a string variable with a fallback.
pub fn env_string_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
