//! Release archive extraction
//! Pulls the expected executable out of the downloaded tar archive into
//! the scratch directory.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::{Path, PathBuf};

/// Extract the named member from a compressed tar archive into `dest_dir`
/// and return its path.
///
/// The release archives contain exactly one executable at a fixed name;
/// the member is matched by its file name so a leading directory component
/// in the archive does not break extraction. A missing member is an error
/// distinct from a decode failure.
pub fn extract_binary(archive: &Path, member_name: &str, dest_dir: &Path) -> Result<PathBuf> {
    let tar_bytes = decompress(archive)
        .with_context(|| format!("failed to extract {}", archive.display()))?;

    let mut tar = tar::Archive::new(Cursor::new(tar_bytes));
    let entries = tar
        .entries()
        .with_context(|| format!("failed to read archive {}", archive.display()))?;

    for entry in entries {
        let mut entry =
            entry.with_context(|| format!("corrupt archive {}", archive.display()))?;
        let path = entry.path().context("archive entry has an invalid path")?;

        let matches = path
            .file_name()
            .map(|name| name == member_name)
            .unwrap_or(false);
        if !matches {
            continue;
        }

        let dest = dest_dir.join(member_name);
        entry
            .unpack(&dest)
            .with_context(|| format!("failed to unpack {} to {}", member_name, dest.display()))?;
        return Ok(dest);
    }

    anyhow::bail!(
        "archive {} does not contain the expected file '{}'",
        archive.display(),
        member_name
    )
}

/// Decompress the archive into raw tar bytes, dispatching on extension.
fn decompress(archive: &Path) -> Result<Vec<u8>> {
    let name = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let file = File::open(archive)
        .with_context(|| format!("failed to open {}", archive.display()))?;
    let mut reader = BufReader::new(file);

    if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        let mut tar_bytes = Vec::new();
        lzma_rs::xz_decompress(&mut reader, &mut tar_bytes)
            .map_err(|e| anyhow::anyhow!("xz decode error: {:?}", e))?;
        Ok(tar_bytes)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        let mut tar_bytes = Vec::new();
        flate2::bufread::GzDecoder::new(reader)
            .read_to_end(&mut tar_bytes)
            .context("gzip decode error")?;
        Ok(tar_bytes)
    } else {
        anyhow::bail!("unrecognized archive format: {}", name)
    }
}
