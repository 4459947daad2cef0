//! Asset download with bounded retry
//! A small transport seam plus a reusable retry combinator, so the backoff
//! schedule is testable without real network calls or real delays.

use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

use crate::release::USER_AGENT;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Materializes a URL's content at a local path.
///
/// Implementations must fully overwrite the destination on every call;
/// a failed attempt may leave a partial file behind, and the next attempt
/// has to truncate it rather than append.
pub trait Transport {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Production transport over the blocking HTTP client
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        let mut response = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("download failed: {}", url))?;

        // File::create truncates, so a retry never appends to a partial
        // write from the previous attempt.
        let mut file = File::create(dest)
            .with_context(|| format!("failed to create {}", dest.display()))?;

        let bytes = response
            .copy_to(&mut file)
            .with_context(|| format!("failed to write {}", dest.display()))?;

        if bytes == 0 {
            anyhow::bail!("empty response from {}", url);
        }

        Ok(())
    }
}

/// Attempt cap and backoff schedule for one download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    delays: Vec<Duration>,
}

impl RetryPolicy {
    /// The release-download policy: 3 attempts, waiting 2s then 4s
    /// between them.
    pub fn standard() -> Self {
        Self {
            max_attempts: 3,
            delays: vec![
                Duration::ZERO,
                Duration::from_secs(2),
                Duration::from_secs(4),
            ],
        }
    }

    /// A policy with custom parameters; the delay table is clamped to one
    /// entry per attempt so no tier can be unreachable.
    pub fn new(max_attempts: usize, mut delays: Vec<Duration>) -> Self {
        assert!(max_attempts > 0, "retry policy needs at least one attempt");
        delays.truncate(max_attempts);
        Self {
            max_attempts,
            delays,
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Delay to wait before the given 1-based attempt. Attempts past the
    /// end of the table reuse its last entry.
    pub fn delay_before(&self, attempt: usize) -> Duration {
        if attempt <= 1 {
            return self.delays.first().copied().unwrap_or(Duration::ZERO);
        }
        let index = (attempt - 1).min(self.delays.len().saturating_sub(1));
        self.delays.get(index).copied().unwrap_or(Duration::ZERO)
    }
}

/// Run `op` up to the policy's attempt cap, sleeping through `sleep`
/// between attempts.
///
/// Returns the first success or the last failure; never terminates the
/// process — turning repeated failure into an exit is the pipeline's call.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    sleep: &mut dyn FnMut(Duration),
    op: &mut dyn FnMut(usize) -> Result<T>,
) -> Result<T> {
    let mut last_err = None;

    for attempt in 1..=policy.max_attempts() {
        let delay = policy.delay_before(attempt);
        if attempt > 1 && !delay.is_zero() {
            sleep(delay);
        }

        match op(attempt) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err),
        }
    }

    let err = last_err.expect("at least one attempt was made");
    Err(err.context(format!(
        "giving up after {} attempts",
        policy.max_attempts()
    )))
}

/// Download a URL to a destination path with the given retry policy.
pub fn download(
    transport: &dyn Transport,
    url: &str,
    dest: &Path,
    policy: &RetryPolicy,
) -> Result<()> {
    with_retry(
        policy,
        &mut |delay| std::thread::sleep(delay),
        &mut |_attempt| transport.fetch(url, dest),
    )
}
