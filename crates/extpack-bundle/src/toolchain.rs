//! Native build invocation.

use crate::target::BuildProfile;
use crate::{PipelineError, PipelineResult};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// An external toolchain that compiles the native artifact.
///
/// Success is judged by the toolchain alone; the output is never inspected.
pub trait Toolchain: Send + Sync {
    /// Fail with [`PipelineError::ToolchainUnavailable`] if the toolchain is
    /// not installed.
    fn ensure_available(&self) -> PipelineResult<()>;

    /// Compile the crate in `crate_dir` for `profile`, blocking until done.
    fn build(&self, profile: &BuildProfile, crate_dir: &Path) -> PipelineResult<()>;
}

/// The cargo toolchain found on `PATH`.
#[derive(Debug, Clone)]
pub struct Cargo {
    rustc: String,
    cargo: String,
}

impl Cargo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rustc: "rustc".to_string(),
            cargo: "cargo".to_string(),
        }
    }

    /// Use specific `rustc`/`cargo` binaries instead of the ones on `PATH`.
    #[must_use]
    pub fn with_programs(rustc: impl Into<String>, cargo: impl Into<String>) -> Self {
        Self {
            rustc: rustc.into(),
            cargo: cargo.into(),
        }
    }

    /// Arguments passed to cargo for a profile.
    #[must_use]
    pub fn build_args(profile: &BuildProfile) -> Vec<&'static str> {
        if profile.is_release() {
            vec!["build", "--release"]
        } else {
            vec!["build"]
        }
    }

    fn unavailable(tool: &str) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
        move |source| PipelineError::ToolchainUnavailable {
            tool: tool.to_string(),
            source,
        }
    }
}

impl Default for Cargo {
    fn default() -> Self {
        Self::new()
    }
}

impl Toolchain for Cargo {
    fn ensure_available(&self) -> PipelineResult<()> {
        let output = Command::new(&self.rustc)
            .arg("--version")
            .output()
            .map_err(Self::unavailable(&self.rustc))?;

        // rustup proxies exist even without an installed toolchain.
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Self::unavailable(&self.rustc)(std::io::Error::other(format!(
                "`{} --version` exited with {}: {}",
                self.rustc,
                output.status,
                stderr.trim()
            ))));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        debug!(version = %version.trim(), "rust toolchain detected");
        Ok(())
    }

    fn build(&self, profile: &BuildProfile, crate_dir: &Path) -> PipelineResult<()> {
        info!(profile = %profile, dir = %crate_dir.display(), "building native library");

        // A missing working directory would surface as a spawn error and be
        // mistaken for a missing toolchain.
        if !crate_dir.is_dir() {
            return Err(PipelineError::InvalidConfig(format!(
                "native crate directory {} does not exist",
                crate_dir.display()
            )));
        }

        let status = Command::new(&self.cargo)
            .args(Self::build_args(profile))
            .current_dir(crate_dir)
            .status()
            .map_err(Self::unavailable(&self.cargo))?;

        if status.success() {
            Ok(())
        } else {
            Err(PipelineError::ToolchainBuildFailed {
                code: status.code(),
            })
        }
    }
}
