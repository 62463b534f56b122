//! One-time retrieval of the platform runtime dependency.
//!
//! The dependency is considered valid as soon as its file exists; content is
//! never re-checked. A truncated file left behind by something other than
//! this module would therefore be trusted forever.

use crate::config::RuntimeDependencySection;
use crate::{PipelineError, PipelineResult, Platform};
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::ZipArchive;

/// Transport used to retrieve the dependency bundle.
pub trait Downloader: Send + Sync {
    /// Stream the body of `url` into `sink`, returning the number of bytes
    /// written. Non-success responses are errors.
    fn download(&self, url: &str, sink: &mut dyn Write) -> io::Result<u64>;
}

/// Blocking HTTP downloader.
///
/// A client is created per download so no blocking client outlives the call
/// or gets dropped inside an async context.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpDownloader;

impl Downloader for HttpDownloader {
    fn download(&self, url: &str, sink: &mut dyn Write) -> io::Result<u64> {
        let mut response = reqwest::blocking::get(url)
            .and_then(|r| r.error_for_status())
            .map_err(io::Error::other)?;

        response.copy_to(sink).map_err(io::Error::other)
    }
}

/// The runtime library a platform needs next to the native artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeDependency {
    /// File name on disk and inside the downloaded bundle.
    pub file_name: String,
    pub url: String,
}

impl RuntimeDependency {
    /// Dependency required by `platform`, if any.
    #[must_use]
    pub fn for_platform(platform: Platform, section: &RuntimeDependencySection) -> Option<Self> {
        platform.requires_runtime_dependency().then(|| Self {
            file_name: platform.library_name(&section.name),
            url: section.url.clone(),
        })
    }

    /// Where the cached copy lives in the working tree.
    #[must_use]
    pub fn cache_path(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.file_name)
    }
}

/// Fetches a [`RuntimeDependency`] at most once per working tree.
pub struct DependencyFetcher<'a> {
    downloader: &'a dyn Downloader,
}

impl<'a> DependencyFetcher<'a> {
    pub fn new(downloader: &'a dyn Downloader) -> Self {
        Self { downloader }
    }

    /// Make sure the dependency exists under `project_root`.
    ///
    /// Returns its path. When the file is already present no download is
    /// attempted. Otherwise the bundle is downloaded to a temporary file,
    /// the single required entry is extracted, and only a fully written
    /// file is moved into place. The temporary bundle is removed on every
    /// exit path.
    pub fn ensure(&self, dependency: &RuntimeDependency, project_root: &Path) -> PipelineResult<PathBuf> {
        let target = dependency.cache_path(project_root);
        if target.exists() {
            debug!(path = %target.display(), "runtime dependency already present");
            return Ok(target);
        }

        info!(url = %dependency.url, file = %dependency.file_name, "runtime dependency not found, downloading");

        let failed = |message: String| PipelineError::DependencyFetchFailed {
            url: dependency.url.clone(),
            message,
        };

        let mut bundle = NamedTempFile::new_in(project_root)
            .map_err(|e| failed(format!("cannot create download file: {e}")))?;

        let size = self
            .downloader
            .download(&dependency.url, bundle.as_file_mut())
            .map_err(|e| failed(e.to_string()))?;
        debug!(bytes = size, "dependency bundle downloaded");

        let extracted = extract_entry(bundle.as_file_mut(), &dependency.file_name, project_root)
            .map_err(|e| failed(e.to_string()))?;

        extracted
            .persist(&target)
            .map_err(|e| failed(format!("cannot store {}: {}", target.display(), e.error)))?;

        info!(path = %target.display(), "runtime dependency installed");
        Ok(target)
    }
}

/// Copy one named entry of a zip file into a new temporary file in `dir`.
fn extract_entry(bundle: &mut File, name: &str, dir: &Path) -> io::Result<NamedTempFile> {
    bundle.seek(SeekFrom::Start(0))?;
    let mut archive = ZipArchive::new(bundle).map_err(io::Error::other)?;
    let mut entry = archive.by_name(name).map_err(|e| match e {
        zip::result::ZipError::FileNotFound => io::Error::new(
            io::ErrorKind::NotFound,
            format!("{name} not found in downloaded bundle"),
        ),
        other => io::Error::other(other),
    })?;

    let mut extracted = NamedTempFile::new_in(dir)?;
    io::copy(&mut entry, extracted.as_file_mut())?;
    extracted.as_file_mut().flush()?;
    Ok(extracted)
}
