//! File watcher for snapshot changes
//!
//! Watches the snapshot's directory with notify and reloads the store when
//! the upstream cleaning step rewrites the file. Adaptive debouncing
//! collapses the burst of events a single write produces; an event dropped
//! inside the delay schedules one trailing reload so the last write wins.

use crate::error::CoreError;
use crate::event::DataEvent;
use crate::store::TableStore;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

/// Configuration for the file watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Base debounce delay
    pub debounce_delay: Duration,

    /// Maximum debounce delay during burst
    pub max_debounce_delay: Duration,

    /// Burst detection threshold (events per second)
    pub burst_threshold: u32,

    /// Poll interval for backends without native events
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce_delay: Duration::from_millis(500),
            max_debounce_delay: Duration::from_secs(3),
            burst_threshold: 10,
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Watches the snapshot file and keeps the store current
pub struct FileWatcher {
    /// Notify watcher instance
    _watcher: RecommendedWatcher,

    /// Shutdown signal
    shutdown_tx: mpsc::Sender<()>,
}

impl FileWatcher {
    /// Start watching the store's snapshot file
    pub async fn start(store: Arc<TableStore>, config: WatcherConfig) -> Result<Self, CoreError> {
        let snapshot = store.snapshot_path().to_path_buf();
        let watch_dir = match snapshot.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (event_tx, mut event_rx) = mpsc::channel::<notify::Result<Event>>(100);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            Config::default().with_poll_interval(config.poll_interval),
        )
        .map_err(|e| CoreError::WatchError {
            message: "Failed to create file watcher".to_string(),
            source: Some(e),
        })?;

        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|e| CoreError::WatchError {
                message: format!("Failed to watch {}", watch_dir.display()),
                source: Some(e),
            })?;

        info!(
            snapshot = %snapshot.display(),
            dir = %watch_dir.display(),
            "File watcher started"
        );

        let event_bus = store.event_bus().clone();
        tokio::spawn(async move {
            let mut debounce_state = DebounceState::new(config);

            loop {
                let trailing = debounce_state.pending_deadline();

                tokio::select! {
                    Some(result) = event_rx.recv() => {
                        match result {
                            Ok(event) => {
                                if let Some(path) = Self::process_event(&event, &snapshot) {
                                    if debounce_state.should_emit(&path) {
                                        debug!(path = %path.display(), "Snapshot changed, reloading");
                                        store.reload().await;
                                    }
                                }
                            }
                            Err(e) => {
                                error!(error = %e, "File watcher error");
                                event_bus.publish(DataEvent::WatcherError(e.to_string()));
                            }
                        }
                    }
                    _ = sleep_until(trailing), if trailing.is_some() => {
                        if let Some(path) = debounce_state.fire_pending() {
                            debug!(path = %path.display(), "Trailing reload after debounce");
                            store.reload().await;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("File watcher shutting down");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            _watcher: watcher,
            shutdown_tx,
        })
    }

    /// Path of the changed snapshot, if this event touches it
    ///
    /// Matches on file name since notify reports absolute paths and the
    /// configured snapshot path may be relative.
    fn process_event(event: &Event, snapshot: &Path) -> Option<PathBuf> {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) => {}
            _ => return None,
        }

        let target = snapshot.file_name()?;
        let path = event
            .paths
            .iter()
            .find(|p| p.file_name() == Some(target))?;

        trace!(path = %path.display(), "Processing snapshot event");
        Some(path.clone())
    }

    /// Stop the watcher
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Sleep until `deadline`; never completes for `None`
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

/// Debounce state for adaptive debouncing
struct DebounceState {
    config: WatcherConfig,
    last_events: HashMap<PathBuf, Instant>,
    event_count_window: VecDeque<Instant>,
    /// Suppressed change still owed a reload, with its deadline
    pending: Option<(PathBuf, Instant)>,
}

impl DebounceState {
    fn new(config: WatcherConfig) -> Self {
        Self {
            config,
            last_events: HashMap::new(),
            event_count_window: VecDeque::new(),
            pending: None,
        }
    }

    fn pending_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, deadline)| *deadline)
    }

    /// Take the owed reload, restarting the debounce window for its path
    fn fire_pending(&mut self) -> Option<PathBuf> {
        let (path, _) = self.pending.take()?;
        self.last_events.insert(path.clone(), Instant::now());
        Some(path)
    }

    fn should_emit(&mut self, path: &Path) -> bool {
        let now = Instant::now();

        // Track event rate for burst detection
        self.event_count_window.push_back(now);
        while self
            .event_count_window
            .front()
            .is_some_and(|t| now.duration_since(*t) > Duration::from_secs(1))
        {
            self.event_count_window.pop_front();
        }

        let delay = if self.event_count_window.len() as u32 > self.config.burst_threshold {
            self.config.max_debounce_delay
        } else {
            self.config.debounce_delay
        };

        if let Some(last) = self.last_events.get(path) {
            if now.duration_since(*last) < delay {
                trace!(path = %path.display(), "Debouncing event");
                self.pending = Some((path.to_path_buf(), now + delay));
                return false;
            }
        }

        self.last_events.insert(path.to_path_buf(), now);
        self.pending = None;
        true
    }
}
