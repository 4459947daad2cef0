//! Release checksum verification
//! Parses the SHA256SUMS manifest published with each release and checks a
//! downloaded asset against it before anything gets installed.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use thiserror::Error;

/// Why a downloaded asset failed verification
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    /// The manifest has no entry for this filename.
    #[error("no checksum found for '{0}' in the manifest")]
    ChecksumNotFound(String),

    /// The manifest entry exists but is not a 64-char hex digest.
    #[error("malformed checksum for '{file}': '{entry}' is not a SHA-256 digest")]
    MalformedChecksum { file: String, entry: String },

    /// The digests differ.
    #[error("checksum mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },
}

/// One parsed manifest line: digest plus filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub digest: String,
    pub file_name: String,
}

/// The checksum manifest for one release
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Parse manifest text: one asset per line, whitespace separated,
    /// first field the digest, a later field the filename. Lines that do
    /// not have at least two fields are ignored.
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let digest = fields.next()?;
                // sha256sum writes "<digest>  <file>"; some tools prefix
                // the filename with a binary-mode '*'.
                let file_name = fields.last()?.trim_start_matches('*');
                if file_name.is_empty() {
                    return None;
                }
                Some(ManifestEntry {
                    digest: digest.to_string(),
                    file_name: file_name.to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Expected digest for a filename; exact match, first entry wins.
    pub fn expected_digest(&self, file_name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.file_name == file_name)
            .map(|entry| entry.digest.as_str())
    }
}

/// True if the string is a well-formed SHA-256 hex digest.
pub fn is_valid_digest(digest: &str) -> bool {
    digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Pure verification core: compare an expected digest against the actual
/// digest of `bytes`. No filesystem or network access.
///
/// The expected digest must be well-formed before any comparison happens;
/// the comparison itself is ASCII case-insensitive since producer and
/// consumer tools disagree on hex letter case.
pub fn verify_bytes(expected: &str, file_name: &str, bytes: &[u8]) -> Result<(), VerifyError> {
    check_digest(expected, file_name, &sha256_hex_of(bytes))
}

/// Verify a file on disk against its manifest entry.
pub fn verify_file(manifest: &Manifest, path: &Path) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());

    let expected = manifest
        .expected_digest(&file_name)
        .ok_or_else(|| VerifyError::ChecksumNotFound(file_name.clone()))?
        .to_string();

    let actual = sha256_hex_of_file(path)
        .with_context(|| format!("failed to hash {}", path.display()))?;

    check_digest(&expected, &file_name, &actual)?;
    Ok(())
}

fn check_digest(expected: &str, file_name: &str, actual: &str) -> Result<(), VerifyError> {
    if !is_valid_digest(expected) {
        return Err(VerifyError::MalformedChecksum {
            file: file_name.to_string(),
            entry: expected.to_string(),
        });
    }

    if expected.eq_ignore_ascii_case(actual) {
        Ok(())
    } else {
        Err(VerifyError::Mismatch {
            expected: expected.to_lowercase(),
            actual: actual.to_string(),
        })
    }
}

fn sha256_hex_of(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn sha256_hex_of_file(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}
