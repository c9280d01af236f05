//! URL validation and name derivation for submitted transfers

use crate::error::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use url::Url;

/// Schemes accepted by [`validate_url`]
pub const SUPPORTED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parse a submitted URL, accepting only absolute http(s) URLs
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`Error::InvalidInput`] for empty input, unparseable text, or any other scheme.
pub fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("URL is empty".to_string()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| Error::InvalidInput(format!("'{trimmed}' is not a valid URL: {e}")))?;

    if !SUPPORTED_SCHEMES.contains(&url.scheme()) {
        return Err(Error::InvalidInput(format!(
            "unsupported scheme '{}': only http and https URLs are accepted",
            url.scheme()
        )));
    }

    Ok(url)
}

/// Human-readable name for a transfer
///
/// Uses the last non-empty path segment, percent-decoded. Falls back to
/// `download_<unix-millis>` when the URL has no usable segment.
///
/// ```
/// use transfer_tracker::utils::display_name_for;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/a/b/file%20one.zip?x=1").unwrap();
/// assert_eq!(display_name_for(&url), "file one.zip");
/// ```
pub fn display_name_for(url: &Url) -> String {
    last_path_segment(url).unwrap_or_else(fallback_display_name)
}

/// Last non-empty, percent-decoded path segment of `url`
pub fn last_path_segment(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.filter(|s| !s.is_empty()).next_back()?;
    let decoded = urlencoding::decode(segment).ok()?;
    let name = decoded.trim();

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Name used when the URL has no path segment
pub fn fallback_display_name() -> String {
    format!("download_{}", Utc::now().timestamp_millis())
}

/// Output path suggested to the backend for a transfer
///
/// The display name is reduced to a single safe file name: path separators and
/// characters reserved on common filesystems become `_`.
pub fn destination_hint(destination_dir: &Path, display_name: &str) -> PathBuf {
    let sanitized: String = display_name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let file_name = match sanitized.trim() {
        "" | "." | ".." => fallback_display_name(),
        name => name.to_string(),
    };

    destination_dir.join(file_name)
}
