use tokio_util::sync::{CancellationToken, DropGuard};

/// A task the `work` orchestrator spawns and later stops, such as a
/// [`WorkerPool`](crate::worker::WorkerPool).
pub trait Spawnable: Send {
    fn stop_handle(&self) -> StopHandle;

    fn spawn(self);
}

/// The spawned side of a stop signal. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    stop: CancellationToken,
    stopped: CancellationToken,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            stop: self.stop.clone(),
            stopped: self.stopped.clone(),
        }
    }

    pub async fn stop_requested(&self) {
        self.stop.cancelled().await
    }

    /// Marks the task stopped when the guard is dropped, unwinding included.
    pub fn stopped_on_drop(&self) -> DropGuard {
        self.stopped.clone().drop_guard()
    }
}

/// The orchestrator's side of a stop signal.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop: CancellationToken,
    stopped: CancellationToken,
}

impl StopHandle {
    pub fn request_stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    pub async fn stopped(&self) {
        self.stopped.cancelled().await
    }

    pub async fn stop(&self) {
        self.request_stop();
        self.stopped().await
    }
}
