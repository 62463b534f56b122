//! One end-to-end packaging run.

use crate::artifact::ArtifactDescriptor;
use crate::config::ExtensionConfig;
use crate::fetch::{DependencyFetcher, Downloader, HttpDownloader, RuntimeDependency};
use crate::packager::{PackageInputs, Packager, PublishedPackage};
use crate::target::{self, BuildMode, Selectors};
use crate::toolchain::{Cargo, Toolchain};
use crate::{PipelineResult, Platform};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

type EnvLookup = dyn Fn(&str) -> Option<String> + Send + Sync;

/// Resolves, builds, fetches and packages a project.
///
/// Each stage runs only after the previous one succeeded, so a failed run
/// never touches the output directory.
pub struct Pipeline {
    project_root: PathBuf,
    config: ExtensionConfig,
    toolchain: Box<dyn Toolchain>,
    downloader: Box<dyn Downloader>,
    host: Option<Platform>,
    env: Box<EnvLookup>,
}

impl Pipeline {
    /// Pipeline for the current host using cargo and HTTP downloads.
    pub fn new(project_root: impl Into<PathBuf>, config: ExtensionConfig) -> Self {
        Self {
            project_root: project_root.into(),
            config,
            toolchain: Box::new(Cargo::new()),
            downloader: Box::new(HttpDownloader),
            host: Platform::current(),
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    #[must_use]
    pub fn with_toolchain(mut self, toolchain: impl Toolchain + 'static) -> Self {
        self.toolchain = Box::new(toolchain);
        self
    }

    #[must_use]
    pub fn with_downloader(mut self, downloader: impl Downloader + 'static) -> Self {
        self.downloader = Box::new(downloader);
        self
    }

    /// Pretend to run on `host`; `None` models an unsupported host.
    #[must_use]
    pub fn with_host(mut self, host: Option<Platform>) -> Self {
        self.host = host;
        self
    }

    /// Replace environment variable lookup.
    #[must_use]
    pub fn with_env<E>(mut self, env: E) -> Self
    where
        E: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Box::new(env);
        self
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Run every stage once for `selectors`.
    pub fn run(&self, selectors: &Selectors) -> PipelineResult<PublishedPackage> {
        let request = target::resolve(selectors, self.host, &self.config.install, &*self.env)?;
        let configuration = &request.configuration;
        info!(
            profile = %configuration.profile(),
            platform = %configuration.platform(),
            "starting build"
        );

        match configuration.mode() {
            BuildMode::Local => {
                self.toolchain.ensure_available()?;
                let crate_dir = self.project_root.join(&self.config.native.crate_dir);
                self.toolchain.build(configuration.profile(), &crate_dir)?;
            }
            BuildMode::Ci => debug!("using prebuilt CI artifact, skipping native build"),
        }

        let descriptor =
            ArtifactDescriptor::locate(&self.project_root, &self.config.native, configuration);
        let artifact = descriptor.verify()?;

        let dependency = match RuntimeDependency::for_platform(
            configuration.platform(),
            &self.config.runtime_dependency,
        ) {
            Some(dependency) => Some(
                DependencyFetcher::new(self.downloader.as_ref())
                    .ensure(&dependency, &self.project_root)?,
            ),
            None => None,
        };

        let inputs = PackageInputs {
            artifact,
            dependency: dependency.as_deref(),
            install_root: request.install_root.as_deref(),
        };
        Packager::new(&self.project_root, &self.config.extension).package(configuration, inputs)
    }
}
