//! `extpack.toml` project configuration.
//!
//! Every field has a default, so a project without a configuration file
//! packages the `aseprite-dmi` layout: a cargo crate in `lib/`, Lua scripts in
//! `scripts/` and output in `dist/`.

use crate::{CONFIG_FILE, PipelineError, PipelineResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Top-level `extpack.toml` structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionConfig {
    pub extension: ExtensionSection,
    pub native: NativeSection,
    pub runtime_dependency: RuntimeDependencySection,
    pub install: InstallSection,
    pub watch: WatchSection,
}

/// What the extension is called and what goes into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionSection {
    /// Base name of the archive and of the install directory.
    pub name: String,
    /// Extension of the installable copy of the archive.
    pub archive_extension: String,
    /// Files copied verbatim into the root of the archive.
    pub metadata: Vec<String>,
    /// Script directory, copied recursively.
    pub scripts: String,
    /// Output directory, replaced on every successful run.
    pub output_dir: String,
}

impl Default for ExtensionSection {
    fn default() -> Self {
        Self {
            name: "aseprite-dmi".to_string(),
            archive_extension: "aseprite-extension".to_string(),
            metadata: vec![
                "package.json".to_string(),
                "LICENSE".to_string(),
                "README.md".to_string(),
            ],
            scripts: "scripts".to_string(),
            output_dir: "dist".to_string(),
        }
    }
}

/// Kind of artifact the native crate produces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A dynamic library (`cdylib`).
    #[default]
    Library,
    /// A standalone executable.
    Executable,
}

/// The cargo crate that builds the native artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NativeSection {
    /// Crate directory relative to the project root.
    pub crate_dir: String,
    /// Artifact base name, without platform prefix or suffix.
    pub name: String,
    pub kind: ArtifactKind,
}

impl Default for NativeSection {
    fn default() -> Self {
        Self {
            crate_dir: "lib".to_string(),
            name: "dmi".to_string(),
            kind: ArtifactKind::Library,
        }
    }
}

/// Lua runtime shipped next to the native library on Windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeDependencySection {
    /// Library base name; the file inside the download is its Windows name.
    pub name: String,
    /// Zip bundle containing the library.
    pub url: String,
}

impl Default for RuntimeDependencySection {
    fn default() -> Self {
        Self {
            name: "lua54".to_string(),
            url: "https://netix.dl.sourceforge.net/project/luabinaries/5.4.2/Windows%20Libraries/Dynamic/lua-5.4.2_Win64_dllw6_lib.zip".to_string(),
        }
    }
}

/// Install-in-place locations, relative to the platform's config root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallSection {
    /// Relative to `%APPDATA%`.
    pub windows: String,
    /// Relative to `$HOME`.
    pub unix: String,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            windows: "Aseprite/extensions".to_string(),
            unix: ".config/aseprite/extensions".to_string(),
        }
    }
}

/// Watch-mode path patterns and poll cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    /// Regexes selecting paths that trigger a rebuild.
    pub patterns: Vec<String>,
    /// Regexes excluding paths even when a pattern matches.
    pub ignore: Vec<String>,
    pub poll_interval_ms: u64,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            patterns: vec![
                r".*lib.*\.rs".to_string(),
                r".*scripts.*\.lua".to_string(),
                r".*\.toml".to_string(),
                r"\..package\.json".to_string(),
            ],
            ignore: vec![
                r"\./dist/.*".to_string(),
                r"\./\.extpack-.*".to_string(),
                r".*/target/.*".to_string(),
            ],
            poll_interval_ms: 1000,
        }
    }
}

impl WatchSection {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ExtensionConfig {
    /// Load configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::InvalidConfig(format!("Failed to read {}: {e}", path.display()))
        })?;

        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> PipelineResult<Self> {
        toml::from_str(content).map_err(|e| PipelineError::InvalidConfig(e.to_string()))
    }

    /// Load `extpack.toml` from a project root, falling back to defaults
    /// when the file does not exist. The result is validated.
    pub fn load(project_root: &Path) -> PipelineResult<Self> {
        let path = project_root.join(CONFIG_FILE);
        let config = if path.is_file() {
            Self::from_file(&path)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> PipelineResult<()> {
        let invalid = |msg: String| Err(PipelineError::InvalidConfig(msg));

        if self.extension.name.is_empty() {
            return invalid("extension name cannot be empty".to_string());
        }
        if self.extension.archive_extension.is_empty() {
            return invalid("archive extension cannot be empty".to_string());
        }
        if self.extension.output_dir.is_empty() {
            return invalid("output directory cannot be empty".to_string());
        }
        self.validate_output_dir()?;
        if self.native.name.is_empty() {
            return invalid("native artifact name cannot be empty".to_string());
        }
        if self.runtime_dependency.name.is_empty() || self.runtime_dependency.url.is_empty() {
            return invalid("runtime dependency needs both a name and a url".to_string());
        }
        if self.watch.poll_interval_ms == 0 {
            return invalid("watch poll interval must be greater than zero".to_string());
        }

        for pattern in self.watch.patterns.iter().chain(&self.watch.ignore) {
            if let Err(e) = Regex::new(pattern) {
                return invalid(format!("invalid watch pattern '{pattern}': {e}"));
            }
        }

        Ok(())
    }

    /// The output directory is pruned on every run, so it must be a plain
    /// relative path that shares no files with the project inputs.
    fn validate_output_dir(&self) -> PipelineResult<()> {
        let output_dir = &self.extension.output_dir;
        let output = Path::new(output_dir);
        if !output.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(PipelineError::InvalidConfig(format!(
                "output directory '{output_dir}' must be a relative path below the project root"
            )));
        }

        let inputs = [&self.extension.scripts, &self.native.crate_dir]
            .into_iter()
            .chain(&self.extension.metadata);
        for input in inputs {
            let input_path = normalized(input);
            if input_path.starts_with(output) || output.starts_with(&input_path) {
                return Err(PipelineError::InvalidConfig(format!(
                    "output directory '{output_dir}' overlaps project input '{input}'"
                )));
            }
        }

        Ok(())
    }
}

/// `path` without `.` components.
fn normalized(path: &str) -> PathBuf {
    Path::new(path)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
