//! Watch session over an OS filesystem event source
//!
//! Subscribes to notify events for a root directory, filters them down
//! to qualifying file changes (create/modify of a matching extension),
//! and forwards the paths to a callback. Runs until a shutdown signal
//! arrives on a watch channel; no sleep-polling.

use crate::WatchError;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// What a watch session observes: a root, a recursion flag, and the set
/// of file extensions that qualify. Immutable for the session lifetime.
#[derive(Debug, Clone)]
pub struct WatchTarget {
    root: PathBuf,
    recursive: bool,
    /// Lowercase, with leading dot (".md")
    extensions: Vec<String>,
}

impl WatchTarget {
    /// Build a target; extensions are normalized to lowercase dotted form
    pub fn new(
        root: PathBuf,
        recursive: bool,
        extensions: impl IntoIterator<Item = String>,
    ) -> Self {
        let extensions = extensions
            .into_iter()
            .map(|ext| {
                let ext = ext.to_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect();

        Self {
            root,
            recursive,
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn recursive(&self) -> bool {
        self.recursive
    }

    /// Case-insensitive extension match ("Doc.MD" qualifies for ".md")
    fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension() else {
            return false;
        };
        let dotted = format!(".{}", ext.to_string_lossy().to_lowercase());
        self.extensions.contains(&dotted)
    }
}

/// Watch session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Stopping,
    Stopped,
}

/// One watch session: event source -> filter -> change callback
///
/// In production the callback is `DebounceScheduler::notify`; tests may
/// substitute anything that records paths.
pub struct WatchSession<F> {
    target: WatchTarget,
    on_change: F,
    state: WatchState,
}

impl<F: FnMut(PathBuf)> WatchSession<F> {
    pub fn new(target: WatchTarget, on_change: F) -> Self {
        Self {
            target,
            on_change,
            state: WatchState::Idle,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Run the session until `shutdown` signals (or its sender drops)
    ///
    /// Fails fast with `NotADirectory` before subscribing when the root
    /// is missing or not a directory. A notify-level error delivered on
    /// the event channel is fatal for the session.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchError> {
        let root = self.target.root().to_path_buf();
        if !root.is_dir() {
            return Err(WatchError::NotADirectory(root));
        }

        // Bridge the notify callback thread into the async loop
        let (tx, mut rx) = mpsc::channel::<Result<Event, notify::Error>>(256);
        let mut watcher = notify::recommended_watcher(move |res| {
            // Receiver gone means the session is already shutting down
            let _ = tx.blocking_send(res);
        })?;

        let mode = if self.target.recursive() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&root, mode)?;

        self.state = WatchState::Watching;
        info!(
            "watching {} (recursive: {})",
            root.display(),
            self.target.recursive()
        );

        let result = loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    self.state = WatchState::Stopping;
                    info!("stopping watch on {}", root.display());
                    break Ok(());
                }
                event = rx.recv() => match event {
                    Some(Ok(event)) => self.handle_event(event),
                    Some(Err(e)) => {
                        self.state = WatchState::Stopping;
                        warn!("event source failed for {}: {}", root.display(), e);
                        break Err(WatchError::EventSource(e));
                    }
                    // Watcher backend dropped its side of the channel
                    None => {
                        self.state = WatchState::Stopping;
                        break Ok(());
                    }
                },
            }
        };

        // Stop event delivery before declaring the session stopped
        if let Err(e) = watcher.unwatch(&root) {
            debug!("unwatch {} failed: {}", root.display(), e);
        }
        drop(watcher);
        rx.close();

        self.state = WatchState::Stopped;
        debug!("watch on {} stopped", root.display());
        result
    }

    /// Filter a raw event and forward qualifying file paths
    fn handle_event(&mut self, event: Event) {
        if !is_change_kind(&event.kind) {
            return;
        }

        for path in event.paths {
            // Directory-level events never qualify
            if path.is_dir() {
                continue;
            }
            if !self.target.matches_extension(&path) {
                continue;
            }
            debug!("change detected: {}", path.display());
            (self.on_change)(path);
        }
    }
}

/// Creations and content modifications qualify; removals and
/// metadata-only events do not.
fn is_change_kind(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Name(_) | ModifyKind::Any) => true,
        EventKind::Modify(_) => false,
        _ => false,
    }
}
