use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::buffer::RollingDepthBuffer;
use super::error::{Result, SessionError};
use crate::diagnostics::stats::{DiagnosticSnapshot, DiagnosticStats};
use crate::sensor::source::FrameSource;
use crate::sensor::types::Frame;
use crate::store::{FrameStore, SnapshotRecord};

/// Receiving end of a session's live-frame notifications.
///
/// Holds only the most recent frame: a slow display sees the latest frame
/// when it next renders and silently skips the ones in between.
pub type FrameFeed = watch::Receiver<Option<Frame>>;

/// Lifecycle state of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Running,
}

/// Latest color frame and the depth window, always updated together.
struct Acquired {
    latest: Option<Frame>,
    depth: RollingDepthBuffer,
}

/// State the acquisition thread shares with the control side.
struct Shared {
    acquired: Mutex<Acquired>,
    stats: Mutex<DiagnosticStats>,
    feed: watch::Sender<Option<Frame>>,
}

/// Source handed back by the acquisition thread when it exits.
type Returned = Option<Box<dyn FrameSource>>;

/// Body of the acquisition thread, as given to the spawner.
type AcquisitionBody = Box<dyn FnOnce() -> Returned + Send>;

/// Who currently owns the frame source.
enum Worker {
    /// Source parked on the session, ready for the next `start()`.
    Idle(Box<dyn FrameSource>),
    /// Source moved onto the acquisition thread; handed back on join.
    Running {
        running: Arc<AtomicBool>,
        thread: JoinHandle<Returned>,
    },
    /// The acquisition thread panicked and took the source with it.
    Lost,
}

/// One sensor's acquisition loop, rolling depth window and output tree.
///
/// All operations take `&self`, so a session can be driven from any control
/// thread. The worker lock is held for the whole of `start`, `stop` and
/// `snapshot`, which makes them mutually exclusive: at most one snapshot is
/// in flight, and `stop` returns only after an in-flight persist finished
/// and the loop thread has been joined.
pub struct CaptureSession {
    name: String,
    source_description: String,
    shared: Arc<Shared>,
    worker: Mutex<Worker>,
    store: Mutex<FrameStore>,
}

impl CaptureSession {
    /// Create an idle session. Nothing is captured until `start()`.
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn FrameSource>,
        store: FrameStore,
        buffer_capacity: usize,
    ) -> Self {
        let (feed, _) = watch::channel(None);
        Self {
            name: name.into(),
            source_description: source.describe(),
            shared: Arc::new(Shared {
                acquired: Mutex::new(Acquired {
                    latest: None,
                    depth: RollingDepthBuffer::new(buffer_capacity),
                }),
                stats: Mutex::new(DiagnosticStats::new()),
                feed,
            }),
            worker: Mutex::new(Worker::Idle(source)),
            store: Mutex::new(store),
        }
    }

    /// Return the session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description of the frame source this session reads from.
    pub fn source_description(&self) -> &str {
        &self.source_description
    }

    /// Current state. A loop that died on its own is reported as idle.
    pub fn status(&self) -> SessionStatus {
        let mut worker = self.worker.lock();
        self.reap_dead_loop(&mut worker);
        match *worker {
            Worker::Running { .. } => SessionStatus::Running,
            Worker::Idle(_) | Worker::Lost => SessionStatus::Idle,
        }
    }

    /// Check if the acquisition loop is currently running.
    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }

    /// Subscribe to live-frame notifications for a display sink.
    pub fn subscribe(&self) -> FrameFeed {
        self.shared.feed.subscribe()
    }

    /// Most recent frame received in the current run, if any.
    pub fn latest_frame(&self) -> Option<Frame> {
        self.shared.acquired.lock().latest.clone()
    }

    /// Number of depth frames currently in the rolling window.
    pub fn buffered_depth_frames(&self) -> usize {
        self.shared.acquired.lock().depth.len()
    }

    /// Sequence number the next successful or failed snapshot will consume.
    pub fn next_sequence(&self) -> u64 {
        self.store.lock().next_sequence()
    }

    /// Take a snapshot of diagnostic stats for this session.
    pub fn diagnostics(&self) -> DiagnosticSnapshot {
        self.shared.stats.lock().snapshot()
    }

    /// Start acquiring on a dedicated thread.
    ///
    /// Clears the depth window and the latest frame first, so nothing from
    /// a previous run leaks into this run's average.
    pub fn start(&self) -> Result<()> {
        self.start_with(|builder, body| builder.spawn(body))
    }

    fn start_with<F>(&self, spawn: F) -> Result<()>
    where
        F: FnOnce(std::thread::Builder, AcquisitionBody) -> std::io::Result<JoinHandle<Returned>>,
    {
        let mut worker = self.worker.lock();
        self.reap_dead_loop(&mut worker);
        let source = match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Idle(source) => source,
            running @ Worker::Running { .. } => {
                *worker = running;
                return Err(SessionError::AlreadyRunning(self.name.clone()));
            }
            Worker::Lost => return Err(SessionError::SourceLost(self.name.clone())),
        };

        {
            let mut acquired = self.shared.acquired.lock();
            acquired.latest = None;
            acquired.depth.clear();
        }
        self.shared.stats.lock().reset();

        // The source only moves to the thread once it exists, so a failed
        // spawn leaves the session idle and restartable.
        let running = Arc::new(AtomicBool::new(true));
        let (handoff, inbox) = mpsc::sync_channel::<Box<dyn FrameSource>>(1);
        let body: AcquisitionBody = {
            let shared = Arc::clone(&self.shared);
            let running = Arc::clone(&running);
            let name = self.name.clone();
            Box::new(move || {
                let mut source = inbox.recv().ok()?;
                info!("acquisition starting for {name} ({})", source.describe());
                run_acquisition(source.as_mut(), &shared, &running);
                info!("acquisition exiting for {name}");
                Some(source)
            })
        };
        let builder = std::thread::Builder::new().name(format!("capture-{}", self.name));
        let thread = match spawn(builder, body) {
            Ok(thread) => thread,
            Err(e) => {
                error!("{}: failed to spawn acquisition thread: {e}", self.name);
                *worker = Worker::Idle(source);
                return Err(SessionError::Spawn(e));
            }
        };
        if let Err(mpsc::SendError(source)) = handoff.send(source) {
            *worker = Worker::Idle(source);
            return Err(SessionError::SourceLost(self.name.clone()));
        }

        *worker = Worker::Running { running, thread };
        Ok(())
    }

    /// Join a loop that exited without being asked to, which only happens
    /// when the source panicked. The session then counts as lost.
    fn reap_dead_loop(&self, worker: &mut Worker) {
        let finished = matches!(worker, Worker::Running { thread, .. } if thread.is_finished());
        if !finished {
            return;
        }
        if let Worker::Running { thread, .. } = std::mem::replace(worker, Worker::Lost) {
            match thread.join() {
                Ok(Some(source)) => *worker = Worker::Idle(source),
                Ok(None) | Err(_) => {
                    error!("acquisition thread for {} died, source lost", self.name);
                }
            }
        }
    }

    /// Stop acquiring and wait until the loop has fully drained.
    ///
    /// Blocks until any in-flight snapshot completes, then until the current
    /// capture call returns and the thread exits.
    pub fn stop(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        match std::mem::replace(&mut *worker, Worker::Lost) {
            Worker::Running { running, thread } => {
                running.store(false, Ordering::Release);
                match thread.join() {
                    Ok(Some(source)) => {
                        *worker = Worker::Idle(source);
                        Ok(())
                    }
                    Ok(None) | Err(_) => {
                        error!("acquisition thread for {} panicked", self.name);
                        Err(SessionError::SourceLost(self.name.clone()))
                    }
                }
            }
            idle @ Worker::Idle(_) => {
                *worker = idle;
                Err(SessionError::NotRunning(self.name.clone()))
            }
            Worker::Lost => Err(SessionError::SourceLost(self.name.clone())),
        }
    }

    /// Persist the latest color frame with raw and averaged depth.
    ///
    /// Fails with `Buffer(Empty)` until the first frame of this run has
    /// arrived. A store failure is returned to the caller but acquisition
    /// keeps running.
    pub fn snapshot(&self) -> Result<SnapshotRecord> {
        let mut worker = self.worker.lock();
        self.reap_dead_loop(&mut worker);
        match *worker {
            Worker::Running { .. } => {}
            Worker::Idle(_) => return Err(SessionError::NotRunning(self.name.clone())),
            Worker::Lost => return Err(SessionError::SourceLost(self.name.clone())),
        }

        // Consistent copy: both halves come from the same acquisition cycle.
        let (latest, depth) = {
            let acquired = self.shared.acquired.lock();
            (acquired.latest.clone(), acquired.depth.clone())
        };
        let depth = depth.snapshot()?;
        let frame = latest.ok_or_else(|| SessionError::NoFrame(self.name.clone()))?;

        let result = self
            .store
            .lock()
            .persist(frame.color(), &depth.raw, &depth.averaged);
        self.shared.stats.lock().record_snapshot(result.is_ok());
        drop(worker);

        match result {
            Ok(record) => {
                info!(
                    "{}: saved snapshot {} (depth averaged over {} frames)",
                    self.name, record.id, depth.frame_count
                );
                Ok(record)
            }
            Err(e) => {
                warn!("{}: snapshot failed: {e}", self.name);
                Err(e.into())
            }
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.stop();
        }
    }
}

/// Acquisition loop: runs on the session thread until `running` is cleared.
///
/// Misses are counted and retried immediately. Each frame is published to
/// the shared state under one lock (latest color + depth append) and then
/// pushed to the display feed.
fn run_acquisition(source: &mut dyn FrameSource, shared: &Shared, running: &AtomicBool) {
    while running.load(Ordering::Acquire) {
        let Some(frame) = source.capture() else {
            shared.stats.lock().record_miss();
            std::thread::yield_now();
            continue;
        };

        shared.stats.lock().record_frame(frame.byte_len());
        {
            let mut acquired = shared.acquired.lock();
            acquired.depth.append(frame.shared_depth());
            acquired.latest = Some(frame.clone());
        }
        shared.feed.send_replace(Some(frame));
    }
}
