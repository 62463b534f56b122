#![allow(non_snake_case)]

use super::*;
use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::thread;
use test_case::test_case;

// WatchState tests

#[test]
fn WatchState___new___idle() {
    let state = WatchState::new();

    assert!(!state.has_pending_change());
    assert!(!state.is_building());
}

#[test]
fn WatchState___poll___nothing_pending___does_not_run() {
    let state = WatchState::new();
    let runs = Cell::new(0);

    let outcome = state.poll(|| runs.set(runs.get() + 1));

    assert!(outcome.is_none());
    assert_eq!(runs.get(), 0);
}

#[test]
fn WatchState___burst_of_changes___single_run() {
    let state = WatchState::new();
    let runs = Cell::new(0);

    for _ in 0..25 {
        assert!(state.record_change());
    }
    state.poll(|| runs.set(runs.get() + 1));
    state.poll(|| runs.set(runs.get() + 1));
    state.poll(|| runs.set(runs.get() + 1));

    assert_eq!(runs.get(), 1);
}

#[test]
fn WatchState___poll___clears_pending_and_holds_in_progress_while_running() {
    let state = WatchState::new();
    state.record_change();

    let observed = state.poll(|| (state.has_pending_change(), state.is_building()));

    assert_eq!(observed, Some((false, true)));
    assert!(!state.is_building());
}

#[test]
fn WatchState___changes_during_build___are_dropped() {
    let state = WatchState::new();
    state.record_change();

    let accepted = state.poll(|| (0..10).map(|_| state.record_change()).collect::<Vec<_>>());

    assert_eq!(accepted, Some(vec![false; 10]));
    assert!(!state.has_pending_change());
    assert!(state.poll(|| ()).is_none());
}

#[test]
fn WatchState___change_after_build___triggers_next_run() {
    let state = WatchState::new();
    state.record_change();
    state.poll(|| ());

    state.record_change();

    assert_eq!(state.poll(|| "rebuilt"), Some("rebuilt"));
}

#[test]
fn WatchState___failed_run___clears_in_progress() {
    let state = WatchState::new();
    state.record_change();

    let outcome: Option<PipelineResult<()>> =
        state.poll(|| Err(PipelineError::ToolchainBuildFailed { code: Some(101) }));

    assert!(matches!(outcome, Some(Err(_))));
    assert!(!state.is_building());
    assert!(state.record_change());
}

#[test]
fn WatchState___panicking_run___clears_in_progress() {
    let state = WatchState::new();
    state.record_change();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        state.poll(|| panic!("pipeline exploded"));
    }));

    assert!(result.is_err());
    assert!(!state.is_building());
}

#[test]
fn WatchState___concurrent_observer___never_overlaps_runs() {
    let state = Arc::new(WatchState::new());
    let observer = {
        let state = Arc::clone(&state);
        thread::spawn(move || {
            for _ in 0..10_000 {
                state.record_change();
            }
        })
    };

    let active = AtomicBool::new(false);
    let mut runs = 0;
    while !observer.is_finished() || state.has_pending_change() {
        state.poll(|| {
            assert!(!active.swap(true, Ordering::SeqCst), "overlapping runs");
            runs += 1;
            active.store(false, Ordering::SeqCst);
        });
    }
    observer.join().unwrap();

    assert!(runs >= 1);
    assert!(!state.is_building());
}

#[test]
fn WatchState___concurrent_observer___never_pending_while_building() {
    let state = Arc::new(WatchState::new());
    let stop = Arc::new(AtomicBool::new(false));
    let observer = {
        let state = Arc::clone(&state);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                state.record_change();
            }
        })
    };

    let mut runs = 0;
    while runs < 200 {
        state.poll(|| {
            for _ in 0..50 {
                assert!(!state.has_pending_change(), "change accepted during a build");
                std::hint::spin_loop();
            }
            runs += 1;
        });
    }
    stop.store(true, Ordering::SeqCst);
    observer.join().unwrap();

    assert!(!state.is_building());
}

// PathFilter tests

fn default_filter() -> PathFilter {
    PathFilter::from_config("/proj", &ExtensionConfig::default()).unwrap()
}

#[test_case("/proj/lib/src/lib.rs", true; "native source")]
#[test_case("/proj/lib/src/userdata/editor.rs", true; "nested native source")]
#[test_case("/proj/scripts/main.lua", true; "script")]
#[test_case("/proj/scripts/classes/widget.lua", true; "nested script")]
#[test_case("/proj/lib/Cargo.toml", true; "cargo manifest")]
#[test_case("/proj/extpack.toml", true; "project config")]
#[test_case("/proj/package.json", true; "extension manifest")]
#[test_case("/proj/README.md", false; "readme")]
#[test_case("/proj/scripts/notes.txt", false; "non lua script file")]
#[test_case("/proj/scripts/MAIN.LUA", false; "case sensitive")]
#[test_case("/proj/lib/target/debug/build/out/bindings.rs", false; "build output")]
#[test_case("/proj/dist/unzipped/scripts/main.lua", false; "packaged output")]
#[test_case("/proj/.extpack-a1b2/unzipped/scripts/main.lua", false; "work directory")]
#[test_case("/elsewhere/lib/src/lib.rs", false; "outside root")]
fn PathFilter___matches___default_patterns(path: &str, expected: bool) {
    assert_eq!(default_filter().matches(Path::new(path)), expected);
}

#[test]
fn PathFilter___relative_form___uses_dot_slash_prefix() {
    let filter = default_filter();

    assert_eq!(
        filter.relative_form(Path::new("/proj/scripts/main.lua")),
        Some("./scripts/main.lua".to_string())
    );
    assert_eq!(filter.relative_form(Path::new("/other/file")), None);
}

#[test]
fn PathFilter___from_config___ignores_custom_output_dir() {
    let mut config = ExtensionConfig::default();
    config.extension.output_dir = "build/out".to_string();

    let filter = PathFilter::from_config("/proj", &config).unwrap();

    assert!(!filter.matches(Path::new("/proj/build/out/unzipped/scripts/a.lua")));
    assert!(filter.matches(Path::new("/proj/scripts/a.lua")));
}

#[test]
fn PathFilter___from_config___nested_output_ignores_sibling_work_dirs() {
    let mut config = ExtensionConfig::default();
    config.extension.output_dir = "build/dist".to_string();

    let filter = PathFilter::from_config("/proj", &config).unwrap();

    assert!(!filter.matches(Path::new("/proj/build/.extpack-Ab12/unzipped/scripts/main.lua")));
    assert!(!filter.matches(Path::new("/proj/build/dist/unzipped/scripts/main.lua")));
    assert!(filter.matches(Path::new("/proj/build/scripts/main.lua")));
}

#[test]
fn PathFilter___patterns_are_anchored_at_start() {
    let filter =
        PathFilter::new("/proj", &[r"scripts/.*\.lua".to_string()], &[]).unwrap();

    // The relative form starts with "./", so an unanchored-looking pattern
    // without a leading wildcard does not match.
    assert!(!filter.matches(Path::new("/proj/scripts/main.lua")));
}

#[test]
fn PathFilter___new___invalid_pattern___invalid_config() {
    let result = PathFilter::new("/proj", &["(".to_string()], &[]);

    assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
}
