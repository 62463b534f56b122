//! Target resolution: command-line selectors to a normalized build configuration.

use crate::config::InstallSection;
use crate::{PipelineError, PipelineResult, Platform};
use std::fmt;
use std::path::PathBuf;

/// Raw selectors as accepted on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selectors {
    /// `--release`
    pub release: bool,
    /// `--ci [TAG]`: `Some(None)` when the flag was given without its tag.
    pub ci: Option<Option<String>>,
    /// `--replace`: install the staged extension in place.
    pub install: bool,
}

impl Selectors {
    /// Local debug build, no install.
    #[must_use]
    pub fn local() -> Self {
        Self::default()
    }

    /// CI build for the given target tag.
    #[must_use]
    pub fn ci(tag: impl Into<String>) -> Self {
        Self {
            ci: Some(Some(tag.into())),
            ..Self::default()
        }
    }
}

/// Build profile of the native artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BuildProfile {
    Debug,
    Release,
    /// Release build produced by an external CI step for the given target tag.
    CiRelease(String),
}

impl BuildProfile {
    /// Whether the artifact is an optimized build.
    #[must_use]
    pub fn is_release(&self) -> bool {
        !matches!(self, Self::Debug)
    }
}

impl fmt::Display for BuildProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Release => write!(f, "release"),
            Self::CiRelease(tag) => write!(f, "release ({tag})"),
        }
    }
}

/// Where the native artifact comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildMode {
    /// Built here by invoking the toolchain.
    Local,
    /// Already produced by a prior CI step.
    Ci,
}

/// Normalized configuration for one pipeline run.
///
/// Only [`resolve`] creates values, which keeps `mode == Ci` exactly when the
/// profile is [`BuildProfile::CiRelease`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BuildConfiguration {
    profile: BuildProfile,
    platform: Platform,
    mode: BuildMode,
}

impl BuildConfiguration {
    #[must_use]
    pub fn profile(&self) -> &BuildProfile {
        &self.profile
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn mode(&self) -> BuildMode {
        self.mode
    }

    /// Suffix for archive names: the platform tag in CI mode, nothing locally.
    #[must_use]
    pub fn archive_suffix(&self) -> &'static str {
        match self.mode {
            BuildMode::Ci => self.platform.archive_suffix(),
            BuildMode::Local => "",
        }
    }
}

/// Output of target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub configuration: BuildConfiguration,
    /// Extensions root to install into, when install-in-place was requested.
    pub install_root: Option<PathBuf>,
}

/// Resolve selectors into a [`BuildRequest`].
///
/// `host` is the platform this process runs on and `env` looks up
/// environment variables; both are injected so resolution has no side
/// effects. A CI tag always selects a release artifact, whatever `--release`
/// says.
pub fn resolve<E>(
    selectors: &Selectors,
    host: Option<Platform>,
    install: &InstallSection,
    env: E,
) -> PipelineResult<BuildRequest>
where
    E: Fn(&str) -> Option<String>,
{
    let configuration = match &selectors.ci {
        Some(tag) => {
            let tag = tag
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| {
                    PipelineError::InvalidTarget(
                        "Please provide a target name after --ci flag".to_string(),
                    )
                })?;
            let platform = Platform::from_target_tag(tag).ok_or_else(|| {
                PipelineError::InvalidTarget(format!(
                    "CI target '{tag}' does not name a windows, linux or darwin platform"
                ))
            })?;

            BuildConfiguration {
                profile: BuildProfile::CiRelease(tag.to_string()),
                platform,
                mode: BuildMode::Ci,
            }
        }
        None => {
            let platform = host.ok_or_else(|| {
                PipelineError::InvalidTarget(format!(
                    "host platform '{}' is not supported",
                    std::env::consts::OS
                ))
            })?;

            BuildConfiguration {
                profile: if selectors.release {
                    BuildProfile::Release
                } else {
                    BuildProfile::Debug
                },
                platform,
                mode: BuildMode::Local,
            }
        }
    };

    let install_root = if selectors.install {
        Some(install_root(host, install, &env)?)
    } else {
        None
    };

    Ok(BuildRequest {
        configuration,
        install_root,
    })
}

/// Extensions directory of the host application on this machine.
fn install_root<E>(
    host: Option<Platform>,
    install: &InstallSection,
    env: &E,
) -> PipelineResult<PathBuf>
where
    E: Fn(&str) -> Option<String>,
{
    let (var, relative) = match host {
        Some(Platform::Windows) => ("APPDATA", &install.windows),
        _ => ("HOME", &install.unix),
    };

    let base = env(var).filter(|v| !v.is_empty()).ok_or_else(|| {
        PipelineError::InvalidTarget(format!("--replace requires the {var} environment variable"))
    })?;

    Ok(PathBuf::from(base).join(relative))
}
