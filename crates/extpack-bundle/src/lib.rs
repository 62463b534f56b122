//! Build and packaging pipeline for native host-application extensions.
//!
//! An extension is a zip archive holding a native library, the Lua scripts
//! that load it, a few metadata files and, on Windows, the Lua runtime the
//! library links against. This crate turns a project tree into that archive:
//!
//! ```text
//! resolve target ─▶ build native crate ─▶ verify artifact
//!                                              │
//!             publish ◀─ archive ◀─ stage ◀─ fetch runtime (Windows)
//! ```
//!
//! # Output layout
//!
//! ```text
//! dist/
//! ├── unzipped/                      # staging tree, archived as-is
//! │   ├── package.json
//! │   ├── LICENSE
//! │   ├── README.md
//! │   ├── libdmi.so                  # dmi.dll + lua54.dll on Windows
//! │   └── scripts/
//! ├── aseprite-dmi.zip
//! └── aseprite-dmi.aseprite-extension
//! ```
//!
//! # Example
//!
//! ```no_run
//! use extpack_bundle::{ExtensionConfig, Pipeline, Selectors};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = ExtensionConfig::load(root)?;
//! let published = Pipeline::new(root, config).run(&Selectors::local())?;
//! println!("{}", published.archive.display());
//! # Ok::<(), extpack_bundle::PipelineError>(())
//! ```

mod error;
mod platform;

pub mod archive;
pub mod artifact;
pub mod config;
pub mod fetch;
pub mod packager;
pub mod pipeline;
pub mod target;
pub mod toolchain;
pub mod watch;

pub use artifact::ArtifactDescriptor;
pub use config::ExtensionConfig;
pub use error::PipelineError;
pub use fetch::{DependencyFetcher, Downloader, HttpDownloader, RuntimeDependency};
pub use packager::{ArchiveNames, Packager, PublishedPackage};
pub use pipeline::Pipeline;
pub use platform::Platform;
pub use target::{BuildConfiguration, BuildMode, BuildProfile, BuildRequest, Selectors};
pub use toolchain::{Cargo, Toolchain};
pub use watch::{PathFilter, WatchState};

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Optional project configuration file, looked up in the project root.
pub const CONFIG_FILE: &str = "extpack.toml";

/// Staging directory name inside the output directory.
pub const STAGING_DIR: &str = "unzipped";
