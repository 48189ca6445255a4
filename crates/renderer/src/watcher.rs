use std::fs;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, warn};

/// Longest uninterrupted sleep of the polling thread; bounds how long
/// [`FileWatcher::stop`] can block.
pub const SLEEP_QUANTUM: Duration = Duration::from_millis(10);

pub type WatchCallback = Box<dyn FnMut() + Send + 'static>;

/// Polls a file's modification time on a background thread and runs a
/// callback once per observed change.
///
/// The watcher starts out stopped. The callback runs on the watcher thread
/// and blocks further polling until it returns.
pub struct FileWatcher {
    path: PathBuf,
    interval: Duration,
    callback: Option<WatchCallback>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<WatchCallback>>,
}

impl FileWatcher {
    pub fn new(
        path: impl Into<PathBuf>,
        interval: Duration,
        callback: impl FnMut() + Send + 'static,
    ) -> Self {
        Self {
            path: path.into(),
            interval,
            callback: Some(Box::new(callback)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the polling thread is alive. A thread killed by a panicking
    /// callback reports `false`.
    pub fn is_running(&self) -> bool {
        self.worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Resumes a callback panic on the calling thread once the polling thread
    /// has died from it. Does nothing while the thread is alive or stopped.
    pub fn propagate_panic(&mut self) {
        if self.worker.as_ref().is_some_and(JoinHandle::is_finished) {
            self.stop();
        }
    }

    /// Starts polling. Returns whether the watcher is running afterwards.
    ///
    /// Calling this while already running does nothing. An empty or missing
    /// path leaves the watcher stopped with a warning.
    pub fn start(&mut self) -> bool {
        if self.worker.is_some() {
            return true;
        }
        if self.path.as_os_str().is_empty() {
            warn!("no file set to watch");
            return false;
        }
        if !self.path.exists() {
            warn!(path = %self.path.display(), "file to watch does not exist");
            return false;
        }
        let last_modified = match modified_time(&self.path) {
            Ok(time) => time,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "cannot read modification time");
                return false;
            }
        };
        let Some(callback) = self.callback.take() else {
            error!(path = %self.path.display(), "watcher callback was lost; cannot restart");
            return false;
        };

        self.running.store(true, Ordering::SeqCst);
        let path = self.path.clone();
        let interval = self.interval;
        let running = Arc::clone(&self.running);
        let spawned = thread::Builder::new()
            .name("scene-watcher".into())
            .spawn(move || poll_loop(&path, interval, &running, last_modified, callback));

        match spawned {
            Ok(worker) => {
                debug!(path = %self.path.display(), interval_ms = interval.as_millis() as u64, "file watcher started");
                self.worker = Some(worker);
                true
            }
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                error!(error = %err, "failed to spawn file watcher thread");
                false
            }
        }
    }

    /// Stops polling and waits for the watcher thread to exit.
    ///
    /// A reload already running is allowed to finish. Calling this while
    /// stopped does nothing. If the callback panicked, the panic resumes here.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(callback) => {
                self.callback = Some(callback);
                debug!(path = %self.path.display(), "file watcher stopped");
            }
            Err(payload) => {
                error!(path = %self.path.display(), "file watcher callback panicked");
                panic::resume_unwind(payload)
            }
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if thread::panicking() {
            self.running.store(false, Ordering::SeqCst);
            return;
        }
        self.stop();
    }
}

fn modified_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

fn poll_loop(
    path: &Path,
    interval: Duration,
    running: &AtomicBool,
    mut last_modified: SystemTime,
    mut callback: WatchCallback,
) -> WatchCallback {
    loop {
        // Editors that save via rename leave the path missing for a moment.
        if let Ok(current) = modified_time(path) {
            if current > last_modified {
                callback();
                last_modified = current;
            }
        }
        if !sleep_while_running(running, interval) {
            return callback;
        }
    }
}

/// Sleeps for `interval` in short slices. Returns `false` as soon as the
/// run flag is cleared.
fn sleep_while_running(running: &AtomicBool, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_QUANTUM.min(deadline - now));
    }
}
