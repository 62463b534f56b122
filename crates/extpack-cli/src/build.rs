//! Build command implementation

use anyhow::{Context, Result};
use extpack_bundle::{ExtensionConfig, Pipeline, PipelineError, Selectors};
use std::path::{Path, PathBuf};

/// Run the build command
pub fn run(path: Option<PathBuf>, selectors: &Selectors) -> Result<()> {
    let project_root = project_root(path)?;
    let config = load_config(&project_root)?;

    println!("Building extension in: {}", project_root.display());

    let published = Pipeline::new(&project_root, config)
        .run(selectors)
        .map_err(with_stage)?;

    println!("Archive: {}", published.archive.display());
    println!("Installable: {}", published.installable.display());
    println!("SHA256: {}", published.checksum);
    if let Some(installed) = &published.installed {
        println!("Installed to: {}", installed.display());
    }
    println!("Build completed successfully.");

    Ok(())
}

/// Resolve the project directory, defaulting to the current one.
pub fn project_root(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = path.unwrap_or_else(|| PathBuf::from("."));
    path.canonicalize()
        .with_context(|| format!("Project directory not found: {}", path.display()))
}

pub fn load_config(project_root: &Path) -> Result<ExtensionConfig> {
    ExtensionConfig::load(project_root)
        .with_context(|| format!("Invalid configuration in {}", project_root.display()))
}

/// Attach the failing stage to a pipeline error.
pub fn with_stage(error: PipelineError) -> anyhow::Error {
    let stage = error.stage();
    anyhow::Error::new(error).context(format!("Build failed during {stage}"))
}
