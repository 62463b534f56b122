//! Rebuild coordination for watch mode.
//!
//! Two actors share a [`WatchState`]: the filesystem observer, which only
//! ever records that something changed, and the poll loop, which turns a
//! recorded change into exactly one pipeline run. Changes reported while a
//! run is in progress are dropped rather than queued.

use crate::config::ExtensionConfig;
use crate::{PipelineError, PipelineResult};
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};

const PENDING_CHANGE: u8 = 0b01;
const BUILD_IN_PROGRESS: u8 = 0b10;

/// Shared flags between the change observer and the rebuild loop.
///
/// Both flags live in one atomic word, so accepting a change and starting a
/// build can never interleave: a change is either recorded before the build
/// claims it or rejected because the build is already running.
#[derive(Debug, Default)]
pub struct WatchState {
    flags: AtomicU8,
}

impl WatchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a relevant filesystem change.
    ///
    /// Returns `false` when the change was dropped because a build is
    /// running. Any number of calls before the next poll collapse into one
    /// pending change.
    pub fn record_change(&self) -> bool {
        self.flags
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |flags| {
                (flags & BUILD_IN_PROGRESS == 0).then_some(flags | PENDING_CHANGE)
            })
            .is_ok()
    }

    /// Run `rebuild` if a change is pending.
    ///
    /// Clearing the pending flag and setting the in-progress flag happen in
    /// one step. The in-progress flag is held for the whole run, including
    /// an unwinding panic. Returns `None` when there was nothing to do.
    pub fn poll<R>(&self, rebuild: impl FnOnce() -> R) -> Option<R> {
        self.flags
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |flags| {
                (flags & PENDING_CHANGE != 0).then_some(BUILD_IN_PROGRESS)
            })
            .ok()?;

        let _guard = InProgressGuard(&self.flags);
        Some(rebuild())
    }

    #[must_use]
    pub fn has_pending_change(&self) -> bool {
        self.flags.load(Ordering::SeqCst) & PENDING_CHANGE != 0
    }

    #[cfg(test)]
    fn is_building(&self) -> bool {
        self.flags.load(Ordering::SeqCst) & BUILD_IN_PROGRESS != 0
    }
}

struct InProgressGuard<'a>(&'a AtomicU8);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_and(!BUILD_IN_PROGRESS, Ordering::SeqCst);
    }
}

/// Decides which changed paths should trigger a rebuild.
///
/// Paths are matched as `./<relative path>` with `/` separators, so
/// patterns behave the same on every platform. Matching is case-sensitive
/// and anchored at the start of the path.
#[derive(Debug, Clone)]
pub struct PathFilter {
    root: PathBuf,
    include: Vec<Regex>,
    ignore: Vec<Regex>,
}

impl PathFilter {
    pub fn new(root: impl Into<PathBuf>, include: &[String], ignore: &[String]) -> PipelineResult<Self> {
        Ok(Self {
            root: root.into(),
            include: compile(include)?,
            ignore: compile(ignore)?,
        })
    }

    /// Filter for a project, always ignoring the configured output directory
    /// and the packager's work directories next to it.
    pub fn from_config(root: impl Into<PathBuf>, config: &ExtensionConfig) -> PipelineResult<Self> {
        let mut filter = Self::new(root, &config.watch.patterns, &config.watch.ignore)?;

        let output = Path::new(&config.extension.output_dir);
        let parent = output.parent().map(slash_prefix).unwrap_or_default();
        let generated = [
            format!(r"\./{}", regex::escape(&slash_prefix(output))),
            format!(r"\./{}\.extpack-", regex::escape(&parent)),
        ];
        filter.ignore.extend(compile(&generated)?);
        Ok(filter)
    }

    /// `./relative/path` form of a path under the root.
    #[must_use]
    pub fn relative_form(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut form = String::from(".");
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    form.push('/');
                    form.push_str(part.to_str()?);
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(form)
    }

    /// Whether a change to `path` should trigger a rebuild.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let Some(form) = self.relative_form(path) else {
            return false;
        };

        self.include.iter().any(|r| r.is_match(&form)) && !self.ignore.iter().any(|r| r.is_match(&form))
    }
}

/// `a/b` form of a relative path, with a trailing `/` unless empty.
fn slash_prefix(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(format!("{}/", part.to_string_lossy())),
            _ => None,
        })
        .collect()
}

fn compile(patterns: &[String]) -> PipelineResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("^(?:{p})"))
                .map_err(|e| PipelineError::InvalidConfig(format!("invalid watch pattern '{p}': {e}")))
        })
        .collect()
}

#[cfg(test)]
#[path = "watch/watch_tests.rs"]
mod watch_tests;
