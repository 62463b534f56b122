//! List command implementation

use anyhow::{Context, Result};
use extpack_bundle::archive::{file_sha256, list_entries};
use std::path::Path;

/// List the contents of a packaged extension.
pub fn run(archive: &Path) -> Result<()> {
    let entries = list_entries(archive)
        .with_context(|| format!("Failed to open: {}", archive.display()))?;
    let checksum = file_sha256(archive)
        .with_context(|| format!("Failed to hash: {}", archive.display()))?;

    println!("Archive: {}", archive.display());
    println!("SHA256: {checksum}");

    println!("\nFiles:");
    let mut total = 0;
    for entry in &entries {
        println!("  {:>10}  {}  {}", entry.size, &entry.checksum[..12], entry.name);
        total += entry.size;
    }
    println!("\n{} files, {total} bytes", entries.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use extpack_bundle::archive::write_archive;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn run___shows_archive_contents() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_dir.path().join("unzipped");
        fs::create_dir_all(staging.join("scripts")).unwrap();
        fs::write(staging.join("package.json"), b"{}").unwrap();
        fs::write(staging.join("scripts/main.lua"), b"print('hi')").unwrap();
        let archive = temp_dir.path().join("ext.zip");
        write_archive(&staging, &archive).unwrap();

        run(&archive).unwrap();
    }

    #[test]
    fn run___missing_archive___returns_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = run(&temp_dir.path().join("missing.zip"));

        assert!(result.is_err());
    }
}
