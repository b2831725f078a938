//! Watch mode: rebuild all units when watched files change.
//!
//! The change router is an explicit two-state machine. While a build is in
//! flight, further change events only set a "rebuild requested" flag; when
//! the build finishes, one follow-up build runs if the flag is set. Rapid
//! successive saves therefore coalesce into a single rebuild instead of
//! piling up concurrent builds. Pending debounced events are drained into
//! the router *before* the finalization check, so an event arriving during
//! a build is never lost.
//!
//! Each re-triggered build re-loads the unit registry, so provider output
//! changes take effect per build cycle. The watch subscriptions themselves
//! are fixed at session start.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

use crate::build::AggregateBuild;
use crate::config::WatchConfig;
use crate::registry::{CompilationUnit, PatternSet, RegistryError, UnitRegistry};

/// Error during watch mode.
///
/// All variants are fatal: unit-level build failures never surface here,
/// they are reported in each cycle's summary and the loop keeps running.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize the file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to subscribe to a watch root
    #[error("failed to watch {path}: {source}")]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// Watcher channel closed unexpectedly
    #[error("watch channel error: {0}")]
    Channel(String),
    /// Unit registry could not be loaded for a build cycle
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Router state: either waiting for changes or building.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// No build in flight
    Idle,
    /// An aggregate build is in progress
    Building {
        /// A change arrived mid-build; rebuild once this one finishes
        rebuild_requested: bool,
    },
}

/// Change-to-rebuild state machine.
///
/// The router alone decides when a build starts; callers report events and
/// build completion and act on the returned decision. Single-threaded by
/// construction: the run loop owns it, so the rebuild flag has exactly one
/// writer.
#[derive(Debug)]
pub struct ChangeRouter {
    state: RouterState,
}

impl ChangeRouter {
    /// Create a router in the idle state.
    pub fn new() -> Self {
        Self { state: RouterState::Idle }
    }

    /// Current state.
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Report a relevant change event.
    ///
    /// Returns `true` when the caller must start an aggregate build now.
    /// While building, the event is coalesced into the rebuild flag.
    pub fn on_change(&mut self) -> bool {
        match self.state {
            RouterState::Idle => {
                self.state = RouterState::Building { rebuild_requested: false };
                true
            }
            RouterState::Building { .. } => {
                self.state = RouterState::Building { rebuild_requested: true };
                false
            }
        }
    }

    /// Report that the in-flight build finished.
    ///
    /// Returns `true` when a rebuild was requested mid-build: the caller
    /// must start another build immediately (the router stays in the
    /// building state with a cleared flag). Otherwise the router returns
    /// to idle.
    pub fn on_build_finished(&mut self) -> bool {
        match self.state {
            RouterState::Building { rebuild_requested: true } => {
                self.state = RouterState::Building { rebuild_requested: false };
                true
            }
            _ => {
                self.state = RouterState::Idle;
                false
            }
        }
    }
}

impl Default for ChangeRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the directories to subscribe to for a set of units.
///
/// Each watch pattern contributes its literal (glob-free) prefix, resolved
/// against the project root; nested roots are folded into their ancestors.
pub fn watch_roots(root: &Path, units: &[CompilationUnit]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = Vec::new();

    for unit in units {
        for pattern in unit.watch.includes() {
            let prefix = literal_prefix(pattern);
            let resolved = crate::config::resolve_path(root, &prefix);
            // A pattern with no glob part points at a file; watch its parent
            let dir = if !pattern.contains(['*', '?', '[', '{']) {
                resolved.parent().map(Path::to_path_buf).unwrap_or(resolved)
            } else {
                resolved
            };
            if !roots.contains(&dir) {
                roots.push(dir);
            }
        }
    }

    // Drop roots already covered by an ancestor
    let mut folded: Vec<PathBuf> = Vec::new();
    roots.sort();
    for candidate in roots {
        if !folded.iter().any(|r| candidate.starts_with(r)) {
            folded.push(candidate);
        }
    }
    folded
}

/// The leading path components of a pattern before any glob metacharacter.
fn literal_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in pattern.split('/') {
        if component.contains(['*', '?', '[', '{']) {
            break;
        }
        if component == "." {
            continue;
        }
        prefix.push(component);
    }
    prefix
}

/// Check an event path against the union of all units' watch patterns.
pub fn is_relevant(root: &Path, watch_sets: &[PatternSet], path: &Path) -> bool {
    let rel = path.strip_prefix(root).unwrap_or(path);
    watch_sets.iter().any(|set| set.matches(rel))
}

/// Clear the terminal screen.
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format a duration for display.
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Current wall-clock time for log lines. Hours are UTC, not local time.
fn timestamp() -> String {
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    format!("{:02}:{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60, secs % 60)
}

/// Run one aggregate build cycle against a freshly loaded registry.
///
/// Unit-level failures land in the summary; only a registry failure
/// escapes, and that one is fatal for the session.
fn run_cycle(
    registry: &UnitRegistry,
    build: &AggregateBuild,
    clear: bool,
) -> Result<(), WatchError> {
    if clear && atty::is(atty::Stream::Stdout) {
        clear_screen();
    }

    println!("[{}] Building...", timestamp());
    let start = Instant::now();

    let loaded = registry.load()?;
    for rejection in &loaded.rejected {
        eprintln!("[{}] Skipping invalid {}", timestamp(), rejection);
    }

    let result = build.run(&loaded.units);
    println!("[{}] {} ({})", timestamp(), result.summary(), format_duration(start.elapsed()));
    Ok(())
}

/// Watch for file changes and rebuild all units automatically.
///
/// Blocks until the process is externally terminated or the watcher
/// channel fails. Build failures never stop the loop; registry and watcher
/// failures do.
pub fn watch_and_rebuild(
    registry: UnitRegistry,
    build: AggregateBuild,
    config: WatchConfig,
) -> Result<(), WatchError> {
    // The watch subscription is derived from the session-start unit list;
    // later loads refresh the pipelines but not the subscriptions.
    let initial = registry.load()?;
    for rejection in &initial.rejected {
        eprintln!("[{}] Skipping invalid {}", timestamp(), rejection);
    }

    let watch_sets: Vec<PatternSet> = initial.units.iter().map(|u| u.watch.clone()).collect();
    let roots = watch_roots(build.root(), &initial.units);

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;

    for dir in &roots {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|e| WatchError::Subscribe { path: dir.clone(), source: e })?;
    }

    let mut router = ChangeRouter::new();

    // Initial build so the output tree is current before the first change
    router.on_change();
    loop {
        run_cycle(&registry, &build, config.clear_screen)?;
        drain_pending(&rx, build.root(), &watch_sets, &mut router);
        if !router.on_build_finished() {
            break;
        }
    }

    for dir in &roots {
        println!("[{}] Watching {} for changes...", timestamp(), dir.display());
    }
    if roots.is_empty() {
        println!("[{}] No units to watch; waiting...", timestamp());
    }

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let relevant: Vec<_> = events
                    .iter()
                    .filter(|e| {
                        matches!(e.kind, DebouncedEventKind::Any)
                            && is_relevant(build.root(), &watch_sets, &e.path)
                    })
                    .collect();

                if relevant.is_empty() {
                    continue;
                }

                for event in &relevant {
                    if let Some(name) = event.path.file_name() {
                        println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                    }
                }

                if router.on_change() {
                    loop {
                        run_cycle(&registry, &build, config.clear_screen)?;
                        // Fold events that arrived mid-build into the router
                        // before deciding whether this cycle was the last.
                        drain_pending(&rx, build.root(), &watch_sets, &mut router);
                        if !router.on_build_finished() {
                            break;
                        }
                    }
                    println!("[{}] Watching for changes...", timestamp());
                }
            }
            Ok(Err(error)) => {
                // Watcher-reported error (non-fatal): log and keep watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}

/// Drain already-queued debounced events into the router without blocking.
fn drain_pending(
    rx: &std::sync::mpsc::Receiver<notify_debouncer_mini::DebounceEventResult>,
    root: &Path,
    watch_sets: &[PatternSet],
    router: &mut ChangeRouter,
) {
    while let Ok(batch) = rx.try_recv() {
        match batch {
            Ok(events) => {
                let relevant = events.iter().any(|e| {
                    matches!(e.kind, DebouncedEventKind::Any)
                        && is_relevant(root, watch_sets, &e.path)
                });
                if relevant {
                    router.on_change();
                }
            }
            Err(error) => {
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify_debouncer_mini::DebouncedEvent;

    fn unit(watch: &[&str]) -> CompilationUnit {
        let entries: Vec<String> = watch.iter().map(|s| s.to_string()).collect();
        let set = PatternSet::from_entries(&entries).unwrap();
        CompilationUnit {
            source: set.clone(),
            destination: PathBuf::from("out"),
            watch: set,
        }
    }

    #[test]
    fn test_router_starts_idle() {
        let router = ChangeRouter::new();
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_router_idle_change_starts_build() {
        let mut router = ChangeRouter::new();
        assert!(router.on_change());
        assert_eq!(router.state(), RouterState::Building { rebuild_requested: false });
    }

    #[test]
    fn test_router_coalesces_changes_while_building() {
        let mut router = ChangeRouter::new();
        assert!(router.on_change());

        // k events during the build: none starts a second concurrent build
        for _ in 0..5 {
            assert!(!router.on_change());
        }

        // exactly one follow-up rebuild
        assert!(router.on_build_finished());
        assert!(!router.on_build_finished());
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_router_finish_without_request_goes_idle() {
        let mut router = ChangeRouter::new();
        router.on_change();
        assert!(!router.on_build_finished());
        assert_eq!(router.state(), RouterState::Idle);
    }

    #[test]
    fn test_router_change_during_finalization_preserved() {
        let mut router = ChangeRouter::new();
        router.on_change();
        router.on_change(); // arrives during the build
        assert!(router.on_build_finished()); // rebuild runs

        // another event lands during the follow-up build
        router.on_change();
        assert!(router.on_build_finished());
        assert!(!router.on_build_finished());
    }

    #[test]
    fn test_router_ready_again_after_idle() {
        let mut router = ChangeRouter::new();
        router.on_change();
        router.on_build_finished();
        assert!(router.on_change());
    }

    #[test]
    fn test_literal_prefix() {
        assert_eq!(literal_prefix("static/less/*.less"), PathBuf::from("static/less"));
        assert_eq!(literal_prefix("static/less/**"), PathBuf::from("static/less"));
        assert_eq!(literal_prefix("*.less"), PathBuf::from(""));
        assert_eq!(literal_prefix("a/b/c.less"), PathBuf::from("a/b/c.less"));
        assert_eq!(literal_prefix("./static/less/*.less"), PathBuf::from("static/less"));
    }

    #[test]
    fn test_watch_roots_union() {
        let root = Path::new("/project");
        let units = [unit(&["a/less/**"]), unit(&["b/less/*.less"])];

        let roots = watch_roots(root, &units);
        assert_eq!(roots, [PathBuf::from("/project/a/less"), PathBuf::from("/project/b/less")]);
    }

    #[test]
    fn test_watch_roots_folds_nested() {
        let root = Path::new("/project");
        let units = [unit(&["static/**"]), unit(&["static/less/*.less"])];

        let roots = watch_roots(root, &units);
        assert_eq!(roots, [PathBuf::from("/project/static")]);
    }

    #[test]
    fn test_watch_roots_literal_file_pattern_watches_parent() {
        let root = Path::new("/project");
        let units = [unit(&["static/less/site.less"])];

        let roots = watch_roots(root, &units);
        assert_eq!(roots, [PathBuf::from("/project/static/less")]);
    }

    #[test]
    fn test_is_relevant_matches_watch_patterns() {
        let root = Path::new("/project");
        let sets = [
            PatternSet::from_entries(&["a/**".to_string()]).unwrap(),
            PatternSet::from_entries(&["b/*.less".to_string()]).unwrap(),
        ];

        assert!(is_relevant(root, &sets, Path::new("/project/a/deep/x.less")));
        assert!(is_relevant(root, &sets, Path::new("/project/b/y.less")));
        assert!(!is_relevant(root, &sets, Path::new("/project/c/z.less")));
    }

    #[test]
    fn test_is_relevant_respects_exclusions() {
        let root = Path::new("/project");
        let sets = [PatternSet::from_entries(&[
            "less/**".to_string(),
            "!less/generated/**".to_string(),
        ])
        .unwrap()];

        assert!(is_relevant(root, &sets, Path::new("/project/less/site.less")));
        assert!(!is_relevant(root, &sets, Path::new("/project/less/generated/out.less")));
    }

    #[test]
    fn test_drain_pending_registers_relevant_events() {
        let (tx, rx) = channel();
        let sets = [PatternSet::from_entries(&["a/**".to_string()]).unwrap()];
        let mut router = ChangeRouter::new();
        router.on_change();

        tx.send(Ok(vec![DebouncedEvent {
            path: PathBuf::from("/p/a/x.less"),
            kind: DebouncedEventKind::Any,
        }]))
        .unwrap();

        drain_pending(&rx, Path::new("/p"), &sets, &mut router);
        assert!(router.on_build_finished());
    }

    #[test]
    fn test_drain_pending_survives_error_batches() {
        let (tx, rx) = channel();
        let sets = [PatternSet::from_entries(&["a/**".to_string()]).unwrap()];
        let mut router = ChangeRouter::new();
        router.on_change();

        // An error batch must not end the drain before later event batches
        tx.send(Err(notify::Error::generic("backend overflow"))).unwrap();
        tx.send(Ok(vec![DebouncedEvent {
            path: PathBuf::from("/p/a/x.less"),
            kind: DebouncedEventKind::Any,
        }]))
        .unwrap();

        drain_pending(&rx, Path::new("/p"), &sets, &mut router);
        assert!(router.on_build_finished());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
