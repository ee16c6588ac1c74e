//! Watch mode
//!
//! Watches the directory holding every source path and re-copies an entry
//! when its source changes. Watching the directory rather than the file
//! keeps the watch alive across editors that save by writing a temporary
//! file and renaming it over the source, or by deleting and recreating it.
//! Notifications are forwarded from the notify thread over a channel to a
//! single tokio task that owns the cooldown state, so the gate needs no
//! locking. Copies run on the blocking pool.
//!
//! Entries that share a source path share one watch and one cooldown; a
//! change re-copies all of them.

mod cooldown;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use courier_config::Bundle;
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

pub use cooldown::{CooldownGate, PathState};

use crate::error::PublishError;
use crate::publish::copy_file;

/// What the notify backend delivers
pub type WatchEvent = notify::Result<notify::Event>;

/// A watched entry: where it is copied from and to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub bundle: String,
    pub source: PathBuf,
    pub destination: PathBuf,
}

/// Watch targets indexed by watched path
#[derive(Debug)]
struct Targets {
    targets: Vec<WatchTarget>,
    /// Watched path -> indices into `targets`
    by_path: HashMap<PathBuf, Vec<usize>>,
    /// Watched paths in manifest order
    order: Vec<PathBuf>,
}

impl Targets {
    fn new(bundles: &[Bundle], output_root: &Path) -> Self {
        let mut targets = Vec::new();
        let mut by_path: HashMap<PathBuf, Vec<usize>> = HashMap::new();
        let mut order = Vec::new();

        for bundle in bundles {
            for entry in &bundle.entries {
                let source = bundle.source_path(entry);
                let key = watch_key(&source);

                let indices = by_path.entry(key.clone()).or_default();
                if indices.is_empty() {
                    order.push(key);
                }
                indices.push(targets.len());

                targets.push(WatchTarget {
                    bundle: bundle.name.clone(),
                    source,
                    destination: entry.destination_path(output_root),
                });
            }
        }

        Self {
            targets,
            by_path,
            order,
        }
    }

    /// Find the watched path an event path refers to. Backends may report
    /// canonical paths, so fall back to canonicalising the event path.
    fn lookup(&self, path: &Path) -> Option<(&Path, &[usize])> {
        if let Some((key, indices)) = self.by_path.get_key_value(path) {
            return Some((key.as_path(), indices.as_slice()));
        }
        let canonical = fs::canonicalize(path).ok().or_else(|| {
            // The file itself may already be gone
            let parent = fs::canonicalize(path.parent()?).ok()?;
            Some(parent.join(path.file_name()?))
        })?;
        self.by_path
            .get_key_value(&canonical)
            .map(|(key, indices)| (key.as_path(), indices.as_slice()))
    }
}

fn watch_key(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// What an event means for one of the paths it names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    Changed,
    Removed,
    Ignored,
}

/// Classify the `index`-th of `paths` paths carried by an event of `kind`.
///
/// Creation alone is not a change; the content arrives afterwards as a
/// modify or close-after-write event. A rename counts for the path the file
/// ends up at.
fn effect(kind: &EventKind, index: usize, paths: usize) -> Effect {
    match kind {
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => Effect::Removed,
            RenameMode::Both if index + 1 < paths => Effect::Removed,
            _ => Effect::Changed,
        },
        EventKind::Modify(_) => Effect::Changed,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Effect::Changed,
        EventKind::Access(_) | EventKind::Create(_) => Effect::Ignored,
        EventKind::Remove(_) => Effect::Removed,
        EventKind::Any | EventKind::Other => Effect::Changed,
    }
}

/// The event-processing side of watch mode.
///
/// Owns the cooldown state and the change callback. [`watch`] and
/// [`watch_events`] drive it from a channel; it can also be fed directly.
pub struct WatchLoop<F> {
    targets: Targets,
    gate: CooldownGate,
    on_change: F,
}

impl<F> WatchLoop<F>
where
    F: FnMut(&WatchTarget, &Result<u64, PublishError>),
{
    pub fn new(bundles: &[Bundle], output_root: &Path, cooldown: Duration, on_change: F) -> Self {
        Self {
            targets: Targets::new(bundles, output_root),
            gate: CooldownGate::new(cooldown),
            on_change,
        }
    }

    /// Paths this loop reacts to, in manifest order
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.targets.order
    }

    /// Process one notification received at `now`.
    ///
    /// Returns the number of copies attempted. Copy failures are logged
    /// and handed to the callback; they never stop the loop.
    pub fn handle_event(&mut self, event: WatchEvent, now: Instant) -> usize {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, paths = ?e.paths, "File watcher error");
                return 0;
            }
        };

        let mut copies = 0;
        let count = event.paths.len();
        for (index, path) in event.paths.iter().enumerate() {
            let change = effect(&event.kind, index, count);
            if change == Effect::Ignored {
                trace!(kind = ?event.kind, path = %path.display(), "Ignoring event");
                continue;
            }

            let Some((key, indices)) = self.targets.lookup(path) else {
                trace!(path = %path.display(), "Event for unwatched path");
                continue;
            };

            if change == Effect::Removed {
                info!(source = %key.display(), "Source removed, waiting for it to return");
                continue;
            }

            if !self.gate.admit(key, now) {
                debug!(path = %key.display(), "Change ignored during cooldown");
                continue;
            }

            debug!(source = %key.display(), "Source updated");

            for &index in indices {
                let target = &self.targets.targets[index];
                let outcome = copy_file(&target.source, &target.destination);

                match &outcome {
                    Ok(bytes) => debug!(
                        bundle = %target.bundle,
                        destination = %target.destination.display(),
                        bytes,
                        "Re-copied"
                    ),
                    Err(e) => error!(
                        bundle = %target.bundle,
                        source = %target.source.display(),
                        error = %e,
                        "Failed to re-copy asset"
                    ),
                }

                (self.on_change)(target, &outcome);
                copies += 1;
            }
        }

        copies
    }

    async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<WatchEvent>,
        mut shutdown: oneshot::Receiver<()>,
    ) where
        F: Send + 'static,
    {
        loop {
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            let now = Instant::now();
            let handled = tokio::task::spawn_blocking(move || {
                self.handle_event(event, now);
                self
            })
            .await;

            match handled {
                Ok(watch_loop) => self = watch_loop,
                Err(e) => {
                    error!(error = %e, "Watch event handler failed");
                    return;
                }
            }
        }
        debug!("Watch loop stopped");
    }
}

/// Handle to a running watch.
///
/// Keep it alive for as long as watching should continue; dropping it
/// closes the watches and ends the loop.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
    watched: usize,
}

impl WatchHandle {
    /// Number of distinct source paths being watched
    pub fn watched_paths(&self) -> usize {
        self.watched
    }

    /// Close all watches and wait for the loop to exit. No callback runs
    /// after this returns.
    pub async fn stop(self) {
        let WatchHandle {
            watcher,
            shutdown,
            task,
            ..
        } = self;

        drop(watcher);
        let _ = shutdown.send(());
        if let Err(e) = task.await {
            warn!(error = %e, "Watch loop ended abnormally");
        }
    }

    /// Wait for the loop to exit on its own, which happens once the event
    /// source is closed. Events already queued are processed first.
    pub async fn finished(self) {
        let WatchHandle {
            watcher,
            shutdown,
            task,
            ..
        } = self;

        if let Err(e) = task.await {
            warn!(error = %e, "Watch loop ended abnormally");
        }
        drop(shutdown);
        drop(watcher);
    }
}

/// Watch every source in `bundles` and re-copy on change.
///
/// Must be called from within a tokio runtime. Fails if any source path
/// is missing or its directory cannot be watched, naming the path.
pub fn watch<F>(
    bundles: &[Bundle],
    output_root: &Path,
    cooldown: Duration,
    on_change: F,
) -> Result<WatchHandle, PublishError>
where
    F: FnMut(&WatchTarget, &Result<u64, PublishError>) + Send + 'static,
{
    let watch_loop = WatchLoop::new(bundles, output_root, cooldown, on_change);
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |event: WatchEvent| {
        // The receiver is gone once the loop has stopped
        let _ = tx.send(event);
    })
    .map_err(PublishError::WatcherInit)?;

    let mut dirs: Vec<(PathBuf, PathBuf)> = Vec::new();
    for path in watch_loop.watched_paths() {
        if let Err(e) = fs::metadata(path) {
            return Err(PublishError::Watch {
                path: path.clone(),
                source: notify::Error::io(e).add_path(path.clone()),
            });
        }
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dirs.iter().any(|(known, _)| *known == dir) {
            dirs.push((dir, path.clone()));
        }
    }

    for (dir, first) in &dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| PublishError::Watch {
                path: first.clone(),
                source: e,
            })?;
        debug!(dir = %dir.display(), "Watching");
    }

    info!(
        paths = watch_loop.watched_paths().len(),
        dirs = dirs.len(),
        cooldown_ms = cooldown.as_millis() as u64,
        "Watching for file system changes"
    );

    Ok(spawn(watch_loop, rx, Some(watcher)))
}

/// Run the watch loop on events from `events` instead of the filesystem.
///
/// Must be called from within a tokio runtime.
pub fn watch_events<F>(
    bundles: &[Bundle],
    output_root: &Path,
    cooldown: Duration,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    on_change: F,
) -> WatchHandle
where
    F: FnMut(&WatchTarget, &Result<u64, PublishError>) + Send + 'static,
{
    let watch_loop = WatchLoop::new(bundles, output_root, cooldown, on_change);
    spawn(watch_loop, events, None)
}

fn spawn<F>(
    watch_loop: WatchLoop<F>,
    events: mpsc::UnboundedReceiver<WatchEvent>,
    watcher: Option<RecommendedWatcher>,
) -> WatchHandle
where
    F: FnMut(&WatchTarget, &Result<u64, PublishError>) + Send + 'static,
{
    let watched = watch_loop.watched_paths().len();
    let (shutdown, shutdown_rx) = oneshot::channel();
    let task = tokio::spawn(watch_loop.run(events, shutdown_rx));

    WatchHandle {
        watcher,
        shutdown,
        task,
        watched,
    }
}
