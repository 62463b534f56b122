//! Staging, archiving and publishing of the distributable extension.
//!
//! A run assembles everything inside a fresh work directory created next to
//! the output directory. Nothing under the output directory changes until
//! the new archive is completely written; it is then moved over the old one
//! with a rename. Failures before that point leave the previous output
//! exactly as it was, and the work directory is removed on every exit path.

use crate::archive::{file_sha256, write_archive};
use crate::config::ExtensionSection;
use crate::target::BuildConfiguration;
use crate::{PipelineError, PipelineResult, STAGING_DIR};
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use walkdir::WalkDir;

/// File names produced for one build configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveNames {
    /// `<name><suffix>.zip`
    pub archive: String,
    /// `<name><suffix>.<archive_extension>`
    pub installable: String,
}

impl ArchiveNames {
    /// Names for `configuration`; the platform suffix only appears in CI
    /// mode.
    #[must_use]
    pub fn new(extension: &ExtensionSection, configuration: &BuildConfiguration) -> Self {
        let stem = format!("{}{}", extension.name, configuration.archive_suffix());
        Self {
            archive: format!("{stem}.zip"),
            installable: format!("{stem}.{}", extension.archive_extension),
        }
    }
}

/// Inputs staged alongside the metadata and scripts.
#[derive(Debug, Clone, Copy)]
pub struct PackageInputs<'a> {
    /// The verified native artifact.
    pub artifact: &'a Path,
    /// The runtime dependency, when the platform needs one.
    pub dependency: Option<&'a Path>,
    /// Extensions root to install into.
    pub install_root: Option<&'a Path>,
}

/// Outputs of a successful packaging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedPackage {
    pub staging_dir: PathBuf,
    pub archive: PathBuf,
    pub installable: PathBuf,
    /// SHA256 of the archive bytes.
    pub checksum: String,
    /// Directory the extension was installed to, if requested.
    pub installed: Option<PathBuf>,
}

/// Assembles and publishes the extension archive.
#[derive(Debug, Clone)]
pub struct Packager<'a> {
    project_root: &'a Path,
    extension: &'a ExtensionSection,
}

impl<'a> Packager<'a> {
    pub fn new(project_root: &'a Path, extension: &'a ExtensionSection) -> Self {
        Self {
            project_root,
            extension,
        }
    }

    /// The directory published archives land in.
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.project_root.join(&self.extension.output_dir)
    }

    /// Stage, archive and publish.
    pub fn package(
        &self,
        configuration: &BuildConfiguration,
        inputs: PackageInputs<'_>,
    ) -> PipelineResult<PublishedPackage> {
        let names = ArchiveNames::new(self.extension, configuration);
        let output_dir = self.output_dir();
        let work_parent = output_dir.parent().unwrap_or(self.project_root);
        fs::create_dir_all(work_parent)
            .map_err(PipelineError::packaging("creating output parent directory"))?;

        // Removed on drop, whichever way this function exits.
        let work = tempfile::Builder::new()
            .prefix(".extpack-")
            .tempdir_in(work_parent)
            .map_err(PipelineError::packaging("creating work directory"))?;

        let staging = work.path().join(STAGING_DIR);
        fs::create_dir(&staging).map_err(PipelineError::packaging("creating staging directory"))?;

        self.stage(&staging, inputs)?;

        let archive = work.path().join(&names.archive);
        let count = write_archive(&staging, &archive)
            .map_err(PipelineError::packaging("writing archive"))?;
        let checksum =
            file_sha256(&archive).map_err(PipelineError::packaging("hashing archive"))?;
        debug!(files = count, sha256 = %checksum, "archive written");

        fs::copy(&archive, work.path().join(&names.installable))
            .map_err(PipelineError::packaging("copying installable archive"))?;

        let published = publish(&work, &output_dir, &names)?;

        let installed = match inputs.install_root {
            Some(root) => Some(self.install(&published.staging_dir, root)?),
            None => None,
        };

        info!(archive = %published.archive.display(), sha256 = %checksum, "extension packaged");

        Ok(PublishedPackage {
            checksum,
            installed,
            ..published
        })
    }

    /// Copy metadata, artifact, dependency and scripts into `staging`.
    fn stage(&self, staging: &Path, inputs: PackageInputs<'_>) -> PipelineResult<()> {
        for name in &self.extension.metadata {
            let source = self.project_root.join(name);
            copy_into(&source, staging).map_err(PipelineError::packaging("copying metadata"))?;
        }

        copy_into(inputs.artifact, staging)
            .map_err(PipelineError::packaging("copying native artifact"))?;

        if let Some(dependency) = inputs.dependency {
            copy_into(dependency, staging)
                .map_err(PipelineError::packaging("copying runtime dependency"))?;
        }

        let scripts = self.project_root.join(&self.extension.scripts);
        let scripts_name = scripts.file_name().map(ToOwned::to_owned).ok_or_else(|| {
            PipelineError::InvalidConfig(format!("invalid scripts path: {}", scripts.display()))
        })?;
        copy_tree(&scripts, &staging.join(scripts_name))
            .map_err(PipelineError::packaging("copying scripts"))?;

        Ok(())
    }

    /// Replace `<install_root>/<name>` with a copy of the published staging tree.
    ///
    /// The copy is assembled in a sibling temp directory first; the old
    /// installation is removed only once the new one is complete, never
    /// merged with it.
    fn install(&self, staging: &Path, install_root: &Path) -> PipelineResult<PathBuf> {
        let destination = install_root.join(&self.extension.name);

        fs::create_dir_all(install_root)
            .map_err(PipelineError::packaging("creating install directory"))?;
        let work = tempfile::Builder::new()
            .prefix(".extpack-")
            .tempdir_in(install_root)
            .map_err(PipelineError::packaging("creating install work directory"))?;
        let fresh = work.path().join(&self.extension.name);

        copy_tree(staging, &fresh).map_err(PipelineError::packaging("copying installation"))?;
        remove_path(&destination)
            .map_err(PipelineError::packaging("removing previous installation"))?;
        fs::rename(&fresh, &destination)
            .map_err(PipelineError::packaging("moving installation into place"))?;

        info!(path = %destination.display(), "extension installed");
        Ok(destination)
    }
}

/// Move the finished work directory contents into `output_dir`.
///
/// Archives are renamed over their previous versions, so readers see either
/// the old or the new file, never a partial one. Entries of an earlier run
/// that this run does not produce are deleted afterwards.
fn publish(work: &TempDir, output_dir: &Path, names: &ArchiveNames) -> PipelineResult<PublishedPackage> {
    fs::create_dir_all(output_dir).map_err(PipelineError::packaging("creating output directory"))?;

    let staging_dir = output_dir.join(STAGING_DIR);
    remove_path(&staging_dir).map_err(PipelineError::packaging("removing previous staging"))?;
    fs::rename(work.path().join(STAGING_DIR), &staging_dir)
        .map_err(PipelineError::packaging("publishing staging directory"))?;

    let archive = output_dir.join(&names.archive);
    let installable = output_dir.join(&names.installable);
    fs::rename(work.path().join(&names.archive), &archive)
        .map_err(PipelineError::packaging("publishing archive"))?;
    fs::rename(work.path().join(&names.installable), &installable)
        .map_err(PipelineError::packaging("publishing installable archive"))?;

    let keep: HashSet<OsString> = [STAGING_DIR, names.archive.as_str(), names.installable.as_str()]
        .into_iter()
        .map(OsString::from)
        .collect();
    prune(output_dir, &keep).map_err(PipelineError::packaging("removing stale output"))?;

    Ok(PublishedPackage {
        staging_dir,
        archive,
        installable,
        checksum: String::new(),
        installed: None,
    })
}

/// Delete every entry of `dir` whose name is not in `keep`.
fn prune(dir: &Path, keep: &HashSet<OsString>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !keep.contains(&entry.file_name()) {
            debug!(path = %entry.path().display(), "removing stale output");
            remove_path(&entry.path())?;
        }
    }
    Ok(())
}

/// Copy a file into `dir`, keeping its name.
fn copy_into(source: &Path, dir: &Path) -> io::Result<()> {
    let name = source.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not a file path: {}", source.display()),
        )
    })?;

    fs::copy(source, dir.join(name)).map_err(|e| {
        io::Error::new(e.kind(), format!("{}: {e}", source.display()))
    })?;
    Ok(())
}

/// Recursively copy `source` to `destination`, following symlinks.
fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    if !source.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("directory not found: {}", source.display()),
        ));
    }

    for entry in WalkDir::new(source).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source).map_err(io::Error::other)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Remove a file or directory tree; a missing path is not an error.
fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
