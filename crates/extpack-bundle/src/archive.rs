//! Zip archive writing and inspection.
//!
//! Archives are reproducible: entries are written in sorted order with a
//! fixed timestamp, so packaging the same staging tree twice yields the same
//! bytes.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One file stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// SHA256 of the uncompressed contents, hex encoded.
    pub checksum: String,
}

/// Zip every file below `source_dir` into `output_path`.
///
/// Entry names are relative to `source_dir`, so the archive layout does not
/// depend on where the directory lives. Returns the number of files written.
pub fn write_archive(source_dir: &Path, output_path: &Path) -> io::Result<usize> {
    let file = File::create(output_path)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(io::Error::other)?;
        let name = archive_name(relative)?;

        zip.start_file(name, options).map_err(io::Error::other)?;
        let mut source = File::open(entry.path())?;
        io::copy(&mut source, &mut zip)?;
        count += 1;
    }

    let mut writer = zip.finish().map_err(io::Error::other)?;
    writer.flush()?;
    Ok(count)
}

/// List the files of an archive with their checksums.
pub fn list_entries(archive_path: &Path) -> io::Result<Vec<ArchiveEntry>> {
    let mut archive = ZipArchive::new(File::open(archive_path)?).map_err(io::Error::other)?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(io::Error::other)?;
        if file.is_dir() {
            continue;
        }

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            size: contents.len() as u64,
            checksum: compute_sha256(&contents),
        });
    }

    Ok(entries)
}

/// Compute SHA256 hash of data and return as hex string.
pub fn compute_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA256 of a file's contents, hex encoded.
pub fn file_sha256(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    let mut file = File::open(path)?;
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Relative path to a `/`-separated archive entry name.
fn archive_name(relative: &Path) -> io::Result<String> {
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 path in staging: {}", relative.display()),
                )
            })
        })
        .collect::<io::Result<Vec<_>>>()?;

    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("scripts/ui")).unwrap();
        fs::write(root.join("package.json"), b"{}").unwrap();
        fs::write(root.join("scripts/main.lua"), b"print('hi')").unwrap();
        fs::write(root.join("scripts/ui/dialog.lua"), b"return {}").unwrap();
    }

    #[test]
    fn compute_sha256___returns_consistent_hash() {
        let hash1 = compute_sha256(b"hello world");
        let hash2 = compute_sha256(b"hello world");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 is 32 bytes = 64 hex chars
    }

    #[test]
    fn file_sha256___matches_in_memory_hash() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("data.bin");
        fs::write(&path, b"hello world").unwrap();

        assert_eq!(file_sha256(&path).unwrap(), compute_sha256(b"hello world"));
    }

    #[test]
    fn write_archive___stores_relative_sorted_paths() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("unzipped");
        sample_tree(&source);
        let output = temp_dir.path().join("out.zip");

        let count = write_archive(&source, &output).unwrap();

        let names: Vec<String> = list_entries(&output)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(count, 3);
        assert_eq!(
            names,
            vec!["package.json", "scripts/main.lua", "scripts/ui/dialog.lua"]
        );
    }

    #[test]
    fn write_archive___same_tree___identical_bytes() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("unzipped");
        sample_tree(&source);

        write_archive(&source, &temp_dir.path().join("a.zip")).unwrap();
        write_archive(&source, &temp_dir.path().join("b.zip")).unwrap();

        assert_eq!(
            fs::read(temp_dir.path().join("a.zip")).unwrap(),
            fs::read(temp_dir.path().join("b.zip")).unwrap()
        );
    }

    #[test]
    fn write_archive___empty_directory___empty_archive() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("empty");
        fs::create_dir(&source).unwrap();
        let output = temp_dir.path().join("empty.zip");

        assert_eq!(write_archive(&source, &output).unwrap(), 0);
        assert!(list_entries(&output).unwrap().is_empty());
    }

    #[test]
    fn list_entries___reports_size_and_checksum() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("unzipped");
        sample_tree(&source);
        let output = temp_dir.path().join("out.zip");
        write_archive(&source, &output).unwrap();

        let entries = list_entries(&output).unwrap();

        let main = entries.iter().find(|e| e.name == "scripts/main.lua").unwrap();
        assert_eq!(main.size, 11);
        assert_eq!(main.checksum, compute_sha256(b"print('hi')"));
    }

    #[test]
    fn list_entries___not_a_zip___returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bogus.zip");
        fs::write(&path, b"not a zip").unwrap();

        assert!(list_entries(&path).is_err());
    }
}
