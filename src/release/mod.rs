//! Release version resolution
//! Turns a user-supplied version token (or the `latest` sentinel) into a
//! concrete release tag by querying the release-metadata endpoint.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// HTTP user agent sent with metadata requests (GitHub rejects requests
/// without one).
pub const USER_AGENT: &str = concat!("fritz-mcp-installer/", env!("CARGO_PKG_VERSION"));

const METADATA_TIMEOUT: Duration = Duration::from_secs(30);

/// What the user asked for: a concrete tag, or whatever is newest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Latest,
    Explicit(String),
}

impl VersionSpec {
    /// Interpret a version token. `latest` (any case) is the sentinel;
    /// every other non-empty string is taken verbatim, unvalidated.
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("latest") {
            VersionSpec::Latest
        } else {
            VersionSpec::Explicit(trimmed.to_string())
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Latest => write!(f, "latest"),
            VersionSpec::Explicit(tag) => write!(f, "{}", tag),
        }
    }
}

/// Release metadata payload, GitHub-shaped
#[derive(Debug, Deserialize)]
struct ReleaseInfo {
    tag_name: String,
}

/// Resolve a version spec to a concrete tag.
///
/// Explicit specs resolve without touching the network; `latest` performs
/// exactly one GET against the metadata endpoint.
pub fn resolve_version(spec: &VersionSpec, releases_api_url: &str) -> Result<String> {
    match spec {
        VersionSpec::Explicit(tag) => Ok(tag.clone()),
        VersionSpec::Latest => {
            let body = fetch_release_metadata(releases_api_url)?;
            extract_tag_name(&body).with_context(|| {
                format!(
                    "could not determine the latest release from {} \
                     (set the version explicitly with --version or FRITZ_MCP_VERSION)",
                    releases_api_url
                )
            })
        }
    }
}

fn fetch_release_metadata(url: &str) -> Result<String> {
    let client = reqwest::blocking::Client::builder()
        .timeout(METADATA_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(url)
        .send()
        .with_context(|| format!("release metadata request failed: {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!(
            "release metadata endpoint returned status {} for {}",
            response.status(),
            url
        );
    }

    response
        .text()
        .context("failed to read release metadata response body")
}

/// Pull the newest tag out of a metadata payload.
///
/// Tries structured JSON first, then falls back to a tolerant text scan
/// for a `"tag_name": "<tag>"` pair so resolution still works on payloads
/// that are not valid JSON. Returns `None` on empty or unusable content.
pub fn extract_tag_name(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }

    if let Ok(info) = serde_json::from_str::<ReleaseInfo>(body) {
        if !info.tag_name.is_empty() {
            return Some(info.tag_name);
        }
    }

    scan_tag_name(body)
}

/// Tolerant fallback: locate `"tag_name"` and take the next quoted string.
fn scan_tag_name(body: &str) -> Option<String> {
    let key_pos = body.find("\"tag_name\"")?;
    let after_key = &body[key_pos + "\"tag_name\"".len()..];
    let colon = after_key.find(':')?;
    let after_colon = &after_key[colon + 1..];
    let open = after_colon.find('"')?;
    let value = &after_colon[open + 1..];
    let close = value.find('"')?;
    let tag = &value[..close];

    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}
