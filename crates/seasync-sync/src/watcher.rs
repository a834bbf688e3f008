//! File watching and debounced change queue (C8)
//!
//! [`FileWatcher`] wraps the `notify` crate to monitor the sync root for
//! changes, converting raw OS events into [`ChangeEvent`] values. Hidden
//! paths (any `/.` segment) are dropped at the source.
//!
//! The [`DebouncedChangeQueue`] collects rapid-fire events and coalesces
//! them so that downstream consumers only see the final state of a path
//! after it has been quiet for the configured debounce window.
//!
//! ```text
//! inotify / FSEvents
//!       │
//!       ▼
//!  FileWatcher  ──→  mpsc::channel  ──→  DebouncedChangeQueue  ──→  SyncScheduler
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// ============================================================================
// ChangeEvent
// ============================================================================

/// A filesystem change event detected by the watcher
///
/// Internal representation decoupled from the `notify` crate's raw events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
    Renamed { old: PathBuf, new: PathBuf },
}

impl ChangeEvent {
    /// The primary path associated with this event
    ///
    /// For renames this is the new (destination) path.
    pub fn path(&self) -> &Path {
        match self {
            ChangeEvent::Created(p) => p,
            ChangeEvent::Modified(p) => p,
            ChangeEvent::Deleted(p) => p,
            ChangeEvent::Renamed { new, .. } => new,
        }
    }
}

/// True when any path segment starts with a dot
fn is_hidden_path(path: &Path) -> bool {
    path.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
    })
}

// ============================================================================
// FileWatcher
// ============================================================================

/// Watches the sync root recursively using the OS-native mechanism
///
/// Converts raw events into [`ChangeEvent`] values sent through an mpsc
/// channel. Debouncing is handled downstream by [`DebouncedChangeQueue`].
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Creates a new watcher and the receiving end of its event channel
    pub fn new() -> Result<(Self, mpsc::Receiver<ChangeEvent>)> {
        let (event_tx, event_rx) = mpsc::channel::<ChangeEvent>(1024);

        info!("Initializing file watcher");

        let watcher = RecommendedWatcher::new(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    if let Some(change) = map_notify_event(&event) {
                        if let Err(e) = event_tx.blocking_send(change) {
                            warn!(error = %e, "Failed to send change event (receiver dropped)");
                        }
                    }
                }
                Err(err) => {
                    error!(error = %err, "File watcher error");
                }
            },
            notify::Config::default(),
        )
        .context("Failed to create file watcher")?;

        Ok((Self { watcher }, event_rx))
    }

    /// Starts watching a directory recursively
    pub fn watch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Starting recursive watch");
        self.watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch path: {}", path.display()))
    }

    /// Stops watching a directory
    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        info!(path = %path.display(), "Stopping watch");
        self.watcher
            .unwatch(path)
            .with_context(|| format!("Failed to unwatch path: {}", path.display()))
    }
}

/// Converts a `notify::Event` into our internal `ChangeEvent`
///
/// Hidden paths and access events yield `None`.
fn map_notify_event(event: &notify::Event) -> Option<ChangeEvent> {
    let paths = &event.paths;
    let first = paths.first()?;

    if is_hidden_path(first) {
        return None;
    }

    match &event.kind {
        EventKind::Create(_) => Some(ChangeEvent::Created(first.clone())),

        EventKind::Modify(ModifyKind::Data(_)) => Some(ChangeEvent::Modified(first.clone())),

        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            if paths.len() >= 2 {
                let new = paths[1].clone();
                if is_hidden_path(&new) {
                    return None;
                }
                Some(ChangeEvent::Renamed {
                    old: first.clone(),
                    new,
                })
            } else {
                Some(ChangeEvent::Modified(first.clone()))
            }
        }

        EventKind::Remove(_) => Some(ChangeEvent::Deleted(first.clone())),

        EventKind::Modify(_) => Some(ChangeEvent::Modified(first.clone())),

        _ => {
            debug!(kind = ?event.kind, "Ignoring event kind");
            None
        }
    }
}

// ============================================================================
// DebouncedChangeQueue
// ============================================================================

/// Coalesces rapid filesystem changes into debounced events
///
/// When multiple events arrive for the same path in quick succession, only
/// the latest event type is kept and its timestamp is reset. Events are only
/// emitted by [`poll`](DebouncedChangeQueue::poll) once they have been quiet
/// longer than the debounce delay. This keeps the engine from reacting to
/// every intermediate save of a file being edited, including its own
/// executor's writes mid-cycle.
pub struct DebouncedChangeQueue {
    pending: HashMap<PathBuf, (ChangeEvent, Instant)>,
    debounce_delay: Duration,
}

impl DebouncedChangeQueue {
    pub fn new(debounce_delay: Duration) -> Self {
        Self {
            pending: HashMap::new(),
            debounce_delay,
        }
    }

    /// Inserts or updates a change event for the given path
    ///
    /// Rapid changes to the same file keep extending the debounce window
    /// until the changes stop.
    pub fn push(&mut self, event: ChangeEvent) {
        let path = event.path().to_path_buf();
        self.pending.insert(path, (event, Instant::now()));
    }

    /// Removes and returns all changes quiet for longer than the delay
    pub fn poll(&mut self) -> Vec<ChangeEvent> {
        let now = Instant::now();
        let settled_paths: Vec<PathBuf> = self
            .pending
            .iter()
            .filter(|(_, (_, ts))| now.duration_since(*ts) >= self.debounce_delay)
            .map(|(path, _)| path.clone())
            .collect();

        let mut settled = Vec::with_capacity(settled_paths.len());
        for path in &settled_paths {
            if let Some((event, _)) = self.pending.remove(path) {
                settled.push(event);
            }
        }

        if !settled.is_empty() {
            debug!(count = settled.len(), "Polled settled change events");
        }

        settled
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // Event mapping
    // ------------------------------------------------------------------

    #[test]
    fn test_map_create_event() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/sync/a.txt")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Created(PathBuf::from("/sync/a.txt")))
        );
    }

    #[test]
    fn test_map_remove_event() {
        let event = notify::Event {
            kind: EventKind::Remove(notify::event::RemoveKind::File),
            paths: vec![PathBuf::from("/sync/a.txt")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Deleted(PathBuf::from("/sync/a.txt")))
        );
    }

    #[test]
    fn test_map_rename_event() {
        let event = notify::Event {
            kind: EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            paths: vec![PathBuf::from("/sync/old.txt"), PathBuf::from("/sync/new.txt")],
            attrs: Default::default(),
        };
        assert_eq!(
            map_notify_event(&event),
            Some(ChangeEvent::Renamed {
                old: PathBuf::from("/sync/old.txt"),
                new: PathBuf::from("/sync/new.txt"),
            })
        );
    }

    #[test]
    fn test_map_access_event_ignored() {
        let event = notify::Event {
            kind: EventKind::Access(notify::event::AccessKind::Read),
            paths: vec![PathBuf::from("/sync/a.txt")],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }

    #[test]
    fn test_hidden_paths_are_dropped() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![PathBuf::from("/sync/.git/index.lock")],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());

        let event = notify::Event {
            kind: EventKind::Modify(ModifyKind::Data(notify::event::DataChange::Content)),
            paths: vec![PathBuf::from("/sync/docs/.swp")],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }

    #[test]
    fn test_map_event_no_paths() {
        let event = notify::Event {
            kind: EventKind::Create(notify::event::CreateKind::File),
            paths: vec![],
            attrs: Default::default(),
        };
        assert!(map_notify_event(&event).is_none());
    }

    // ------------------------------------------------------------------
    // DebouncedChangeQueue
    // ------------------------------------------------------------------

    #[test]
    fn test_push_coalesces_same_path() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(100));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.txt")));
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.txt")));
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_push_keeps_latest_event_type() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_secs(0));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.txt")));
        queue.push(ChangeEvent::Deleted(PathBuf::from("/a.txt")));

        std::thread::sleep(Duration::from_millis(10));
        let settled = queue.poll();
        assert_eq!(settled, vec![ChangeEvent::Deleted(PathBuf::from("/a.txt"))]);
    }

    #[test]
    fn test_poll_returns_nothing_for_recent_events() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_secs(60));
        queue.push(ChangeEvent::Created(PathBuf::from("/a.txt")));
        assert!(queue.poll().is_empty());
        assert_eq!(queue.pending_count(), 1);
    }

    #[test]
    fn test_poll_removes_settled_events() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(0));
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.txt")));

        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(queue.poll().len(), 1);
        assert!(queue.poll().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_coalescing_resets_timestamp() {
        let mut queue = DebouncedChangeQueue::new(Duration::from_millis(50));

        queue.push(ChangeEvent::Created(PathBuf::from("/a.txt")));
        std::thread::sleep(Duration::from_millis(30));

        // Update resets the debounce timer.
        queue.push(ChangeEvent::Modified(PathBuf::from("/a.txt")));
        std::thread::sleep(Duration::from_millis(30));
        assert!(queue.poll().is_empty());

        std::thread::sleep(Duration::from_millis(30));
        let settled = queue.poll();
        assert_eq!(
            settled,
            vec![ChangeEvent::Modified(PathBuf::from("/a.txt"))]
        );
    }
}
