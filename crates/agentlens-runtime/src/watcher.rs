use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use agentlens_providers::{to_follow_event, Reader};
use agentlens_types::FollowEvent;
use notify::{Event, PollWatcher, RecursiveMode, Watcher};

use crate::{Error, Result};

/// `{start(replay), stop(), isActive}` contract shared by the JSONL tail
/// watcher and the database watcher.
pub trait SessionWatcher {
    fn start(&mut self, replay: bool) -> Result<()>;
    fn stop(&mut self);
    fn is_active(&self) -> bool;
}

/// Turns "file changed" notifications into `read_new()` calls on a
/// `Reader` and pushes the resulting events (as `FollowEvent`s) to a
/// subscriber callback. Shared by both watcher variants; they differ only
/// in which paths they watch and their debounce/catch-up intervals.
pub struct ReaderWatcher {
    reader: Option<Box<dyn Reader>>,
    provider_id: String,
    watch_paths: Vec<PathBuf>,
    debounce: Duration,
    catchup_interval: Duration,
    on_event: Option<Box<dyn FnMut(FollowEvent) + Send>>,
    active: Arc<AtomicBool>,
    worker: Option<std::thread::JoinHandle<()>>,
    _fs_watcher: Option<PollWatcher>,
}

impl ReaderWatcher {
    /// `watch_paths` are the filesystem paths to install OS watches on — one
    /// path for the JSONL tail watcher, the database file plus its `-wal`
    /// sidecar for the database watcher.
    pub fn new(
        reader: Box<dyn Reader>,
        provider_id: impl Into<String>,
        watch_paths: Vec<PathBuf>,
        debounce: Duration,
        catchup_interval: Duration,
        on_event: Box<dyn FnMut(FollowEvent) + Send>,
    ) -> Self {
        Self {
            reader: Some(reader),
            provider_id: provider_id.into(),
            watch_paths,
            debounce,
            catchup_interval,
            on_event: Some(on_event),
            active: Arc::new(AtomicBool::new(false)),
            worker: None,
            _fs_watcher: None,
        }
    }
}

impl SessionWatcher for ReaderWatcher {
    fn start(&mut self, replay: bool) -> Result<()> {
        let mut reader = self.reader.take().ok_or_else(|| {
            Error::InvalidOperation("watcher already started".to_string())
        })?;
        let mut on_event = self.on_event.take().ok_or_else(|| {
            Error::InvalidOperation("watcher already started".to_string())
        })?;

        if !replay {
            // Skip straight to end-of-file by draining whatever's already
            // there without delivering it.
            reader.read_all()?;
        }

        let (tx_fs, rx_fs) = channel::<Event>();
        let poll_config =
            notify::Config::default().with_poll_interval(self.debounce.min(Duration::from_millis(200)));
        let mut fs_watcher = PollWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    let _ = tx_fs.send(event);
                }
            },
            poll_config,
        )
        .map_err(|e| Error::InvalidOperation(format!("failed to start file watcher: {e}")))?;

        for path in &self.watch_paths {
            let watch_target = watch_target_for(path);
            fs_watcher
                .watch(&watch_target, RecursiveMode::NonRecursive)
                .map_err(|e| Error::InvalidOperation(format!("failed to watch {path:?}: {e}")))?;
        }

        let provider_id = self.provider_id.clone();
        let debounce = self.debounce;
        let catchup_interval = self.catchup_interval;
        let active = Arc::clone(&self.active);
        active.store(true, Ordering::SeqCst);

        let worker = std::thread::Builder::new()
            .name("agentlens-session-watcher".to_string())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    run_loop(&mut reader, &provider_id, &mut on_event, &rx_fs, debounce, catchup_interval, &active);
                    reader.flush();
                }));
                if result.is_err() {
                    active.store(false, Ordering::SeqCst);
                }
            })
            .map_err(Error::Io)?;

        self.worker = Some(worker);
        self._fs_watcher = Some(fs_watcher);
        Ok(())
    }

    fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        // Dropping the `PollWatcher` closes its OS handle; the worker's
        // `rx_fs.recv_timeout` then just times out repeatedly until it
        // observes `active == false` and exits, delivering any events
        // already in flight before tearing down.
        self._fs_watcher = None;
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

fn watch_target_for(path: &Path) -> PathBuf {
    // Watch the parent directory rather than the file itself: editors that
    // write atomically (write-temp, rename-over) replace the inode, and a
    // direct file watch would miss the rename.
    path.parent().map(Path::to_path_buf).unwrap_or_else(|| path.to_path_buf())
}

#[allow(clippy::too_many_arguments)]
fn run_loop(
    reader: &mut Box<dyn Reader>,
    provider_id: &str,
    on_event: &mut Box<dyn FnMut(FollowEvent) + Send>,
    rx_fs: &std::sync::mpsc::Receiver<Event>,
    debounce: Duration,
    catchup_interval: Duration,
    active: &Arc<AtomicBool>,
) {
    let mut last_pull = Instant::now();
    pull(reader, provider_id, on_event);

    while active.load(Ordering::SeqCst) {
        match rx_fs.recv_timeout(debounce) {
            Ok(_first) => {
                // Coalesce any further notifications that arrived while we
                // were already about to read — a single `filePosition`
                // cursor means repeat triggers never double-read.
                while rx_fs.try_recv().is_ok() {}
                pull(reader, provider_id, on_event);
                last_pull = Instant::now();
            }
            Err(RecvTimeoutError::Timeout) => {
                if last_pull.elapsed() >= catchup_interval {
                    pull(reader, provider_id, on_event);
                    last_pull = Instant::now();
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn pull(reader: &mut Box<dyn Reader>, provider_id: &str, on_event: &mut Box<dyn FnMut(FollowEvent) + Send>) {
    if let Ok(events) = reader.read_new() {
        for event in &events {
            on_event(to_follow_event(event, provider_id));
        }
    }
}

/// JSONL tail watcher: 100ms debounce, 30s catch-up poll.
pub fn jsonl_tail_watcher(
    reader: Box<dyn Reader>,
    provider_id: impl Into<String>,
    session_path: PathBuf,
    on_event: Box<dyn FnMut(FollowEvent) + Send>,
) -> ReaderWatcher {
    ReaderWatcher::new(
        reader,
        provider_id,
        vec![session_path],
        Duration::from_millis(100),
        Duration::from_secs(30),
        on_event,
    )
}

/// Database watcher: watches both the DB file and its
/// write-ahead-log sidecar, 200ms debounce, 2s catch-up poll.
pub fn database_watcher(
    reader: Box<dyn Reader>,
    provider_id: impl Into<String>,
    db_path: PathBuf,
    on_event: Box<dyn FnMut(FollowEvent) + Send>,
) -> ReaderWatcher {
    let wal_path = {
        let mut p = db_path.clone().into_os_string();
        p.push("-wal");
        PathBuf::from(p)
    };
    ReaderWatcher::new(
        reader,
        provider_id,
        vec![db_path, wal_path],
        Duration::from_millis(200),
        Duration::from_secs(2),
        on_event,
    )
}
