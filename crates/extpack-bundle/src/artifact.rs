//! Native artifact location.

use crate::config::{ArtifactKind, NativeSection};
use crate::target::{BuildConfiguration, BuildProfile};
use crate::{PipelineError, PipelineResult};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where the toolchain is expected to have left the native artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    pub expected_source_path: PathBuf,
    pub required_prefix: &'static str,
    /// File extension without the dot; empty for Unix executables.
    pub required_suffix: &'static str,
}

impl ArtifactDescriptor {
    /// Compute the descriptor for a build. Pure: reads nothing from disk.
    ///
    /// Layout follows cargo: `<crate>/target/{debug,release}` for local
    /// builds and `<crate>/target/<tag>/release` for cross-compiled CI
    /// builds.
    #[must_use]
    pub fn locate(project_root: &Path, native: &NativeSection, config: &BuildConfiguration) -> Self {
        let platform = config.platform();
        let (required_prefix, required_suffix, file_name) = match native.kind {
            ArtifactKind::Library => (
                platform.library_prefix(),
                platform.library_extension(),
                platform.library_name(&native.name),
            ),
            ArtifactKind::Executable => (
                "",
                platform.executable_extension(),
                platform.executable_name(&native.name),
            ),
        };

        let target_dir = project_root.join(&native.crate_dir).join("target");
        let output_dir = match config.profile() {
            BuildProfile::Debug => target_dir.join("debug"),
            BuildProfile::Release => target_dir.join("release"),
            BuildProfile::CiRelease(tag) => target_dir.join(tag).join("release"),
        };

        Self {
            expected_source_path: output_dir.join(file_name),
            required_prefix,
            required_suffix,
        }
    }

    /// Confirm the artifact exists right now.
    ///
    /// This is the pipeline's check that a build really happened, independent
    /// of the toolchain's exit status.
    pub fn verify(&self) -> PipelineResult<&Path> {
        let path = self.expected_source_path.as_path();
        if path.is_file() {
            debug!(path = %path.display(), "native artifact found");
            Ok(path)
        } else {
            Err(PipelineError::ArtifactNotFound {
                path: path.to_path_buf(),
            })
        }
    }
}
