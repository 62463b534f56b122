//! Error types for pipeline operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort a packaging pipeline run.
///
/// Every stage fails fast: the first error ends the run and nothing after the
/// failing stage executes.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Bad or missing selectors; the pipeline never starts.
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// `extpack.toml` could not be read or is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The external compiler is not installed.
    #[error("Toolchain unavailable: `{tool}` could not be started ({source})")]
    ToolchainUnavailable {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiler ran and reported failure.
    #[error("Native build failed with exit code: {}", format_code(.code))]
    ToolchainBuildFailed { code: Option<i32> },

    /// The compiler reported success but the expected output is absent.
    #[error("Artifact not found: {}", .path.display())]
    ArtifactNotFound { path: PathBuf },

    /// The runtime dependency could not be retrieved.
    #[error("Dependency fetch failed for {url}: {message}")]
    DependencyFetchFailed { url: String, message: String },

    /// Filesystem or archive error while staging, archiving or publishing.
    #[error("Packaging failed while {step}: {source}")]
    PackagingFailed {
        step: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Name of the pipeline stage that produced this error.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidTarget(_) => "target resolution",
            Self::InvalidConfig(_) => "configuration",
            Self::ToolchainUnavailable { .. } | Self::ToolchainBuildFailed { .. } => "native build",
            Self::ArtifactNotFound { .. } => "artifact lookup",
            Self::DependencyFetchFailed { .. } => "dependency fetch",
            Self::PackagingFailed { .. } => "packaging",
        }
    }

    pub(crate) fn packaging(step: &'static str) -> impl FnOnce(std::io::Error) -> Self {
        move |source| Self::PackagingFailed { step, source }
    }
}

fn format_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none (terminated by signal)".to_string(), |c| c.to_string())
}
