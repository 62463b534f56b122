//! Watch command implementation
//!
//! A notify watcher thread records relevant changes into a shared
//! [`WatchState`]; a tokio interval polls that state and runs the pipeline on
//! a blocking thread, awaiting it before the next tick.

use crate::build::{load_config, project_root, with_stage};
use crate::shutdown::{ShutdownHandle, ShutdownSignal};
use anyhow::{Context, Result};
use extpack_bundle::{
    PathFilter, Pipeline, PipelineResult, PublishedPackage, Selectors, WatchState,
};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Run the watch command until Ctrl-C
pub fn run(path: Option<PathBuf>, selectors: Selectors) -> Result<()> {
    let project_root = project_root(path)?;
    let config = load_config(&project_root)?;
    let filter = PathFilter::from_config(&project_root, &config).map_err(with_stage)?;
    let period = config.watch.poll_interval();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        let state = Arc::new(WatchState::new());
        let mut watcher = observe(&project_root, filter, Arc::clone(&state))?;

        let shutdown = ShutdownHandle::new();
        shutdown.trigger_on_ctrl_c();

        println!("Watching {} for changes...", project_root.display());
        println!("Press Ctrl+C to stop\n");

        let pipeline = Arc::new(Pipeline::new(&project_root, config));
        let rebuild = move || pipeline.run(&selectors);
        let runs = poll_loop(state, shutdown.signal(), period, rebuild).await;

        if let Err(e) = watcher.unwatch(&project_root) {
            debug!(error = %e, "unwatch failed");
        }
        info!(runs, "watch stopped");
        println!("Stopped watching.");
        Ok::<(), anyhow::Error>(())
    })
}

/// Start watching `root`, recording relevant changes into `state`.
fn observe(root: &Path, filter: PathFilter, state: Arc<WatchState>) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if !is_relevant_kind(&event.kind) {
                return;
            }
            if let Some(path) = event.paths.iter().find(|p| filter.matches(p)) {
                if state.record_change() {
                    debug!(path = %path.display(), "change detected");
                } else {
                    debug!(path = %path.display(), "change ignored, build in progress");
                }
            }
        }
        Err(e) => warn!(error = %e, "watch error"),
    })
    .context("Failed to create file watcher")?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to start watching {}", root.display()))?;

    Ok(watcher)
}

/// Create, modify (including renames) and remove events trigger rebuilds.
fn is_relevant_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Poll `state` every `period` until shutdown, running `rebuild` for each
/// pending change. Returns the number of rebuilds performed.
async fn poll_loop<F>(
    state: Arc<WatchState>,
    mut shutdown: ShutdownSignal,
    period: Duration,
    rebuild: F,
) -> usize
where
    F: Fn() -> PipelineResult<PublishedPackage> + Send + Sync + 'static,
{
    let rebuild = Arc::new(rebuild);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = 0;

    loop {
        tokio::select! {
            _ = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        let state = Arc::clone(&state);
        let rebuild = Arc::clone(&rebuild);
        let outcome = tokio::task::spawn_blocking(move || state.poll(|| rebuild())).await;

        match outcome {
            Ok(None) => continue,
            Ok(Some(Ok(published))) => {
                info!(archive = %published.archive.display(), "rebuilt");
                println!("Build completed successfully.");
            }
            Ok(Some(Err(e))) => error!(stage = e.stage(), error = %e, "build failed"),
            Err(e) => error!(error = %e, "build task panicked"),
        }
        runs += 1;

        if shutdown.is_triggered() {
            break;
        }
    }

    runs
}
