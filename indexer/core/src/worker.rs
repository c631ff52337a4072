use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::mpsc::Sender;

use crate::{
    queue::{JobQueue, QueueError, QueueName},
    lifecycle::{Lifecycle, Spawnable, StopHandle},
    sync::SyncTask,
};

const DEFAULT_WORKER_COUNT: usize = 5;

/// A consumer that stopped because its queue failed. Sent to the orchestrator, which decides
/// whether the process goes on.
#[derive(Debug)]
pub struct PoolExit {
    pub queue: QueueName,
    pub worker: usize,
    pub error: QueueError,
}

/// A fixed number of consumers draining one queue. Each consumer pops a height, runs the sync
/// task for it, logs the outcome and moves on. A failed sync drops the job. A failed dequeue ends
/// the consumer and is reported as a [`PoolExit`].
///
/// Stop requests are honoured between jobs; a sync already started runs to completion.
#[derive(Debug)]
pub struct WorkerPool<Q, T> {
    queue: Q,
    queue_name: QueueName,
    task: Arc<T>,
    workers: usize,
    exits: Option<Sender<PoolExit>>,
    lifecycle: Lifecycle,
}

#[derive(Debug)]
pub struct WorkerPoolBuilder<Q, T> {
    queue: Q,
    queue_name: QueueName,
    task: T,
    workers: usize,
    exits: Option<Sender<PoolExit>>,
}

impl<Q, T> WorkerPoolBuilder<Q, T> {
    pub fn new(queue: Q, queue_name: QueueName, task: T) -> Self {
        Self {
            queue,
            queue_name,
            task,
            workers: DEFAULT_WORKER_COUNT,
            exits: None,
        }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Channel on which consumers report their exit on a queue failure.
    pub fn exits(mut self, exits: Sender<PoolExit>) -> Self {
        self.exits = Some(exits);
        self
    }

    pub fn build(self) -> WorkerPool<Q, T> {
        WorkerPool {
            queue: self.queue,
            queue_name: self.queue_name,
            task: Arc::new(self.task),
            workers: self.workers.max(1),
            exits: self.exits,
            lifecycle: Lifecycle::new(),
        }
    }
}

impl<Q, T> WorkerPool<Q, T>
where
    Q: JobQueue + Clone + 'static,
    T: SyncTask + 'static,
{
    async fn worker(
        id: usize,
        queue: Q,
        queue_name: QueueName,
        task: Arc<T>,
        lifecycle: Lifecycle,
    ) -> Result<(), QueueError> {
        debug!("Starting {} worker {}", task.entity(), id);

        loop {
            let height = tokio::select! {
                _ = lifecycle.stop_requested() => return Ok(()),
                job = queue.dequeue::<u64>(queue_name) => job?,
            };

            match task.sync(height).await {
                Ok(records) => info!(
                    "{} #{} processed successfully ({} records)",
                    task.entity(),
                    height,
                    records
                ),
                Err(e) => error!("Failed to sync {} at #{}: {}", task.entity(), height, e),
            }
        }
    }

    async fn run(self) {
        let _stopped = self.lifecycle.stopped_on_drop();
        let mut workers = Vec::with_capacity(self.workers);

        for id in 0..self.workers {
            let queue = self.queue.clone();
            let task = self.task.clone();
            let lifecycle = self.lifecycle.clone();
            let exits = self.exits.clone();
            let queue_name = self.queue_name;

            workers.push(tokio::spawn(async move {
                if let Err(error) =
                    Self::worker(id, queue, queue_name, task, lifecycle).await
                {
                    error!("Worker {} on {} stopped: {}", id, queue_name, error);
                    let exit = PoolExit {
                        queue: queue_name,
                        worker: id,
                        error,
                    };
                    if let Some(exits) = exits {
                        if exits.send(exit).await.is_err() {
                            warn!(
                                "Exit of worker {} on {} not reported: receiver dropped",
                                id, queue_name
                            );
                        }
                    }
                }
            }));
        }

        for result in futures_util::future::join_all(workers).await {
            if let Err(e) = result {
                error!("Worker task on {} panicked: {}", self.queue_name, e);
            }
        }

        debug!("Graceful shutdown of {} workers finished", self.queue_name);
    }
}

impl<Q, T> Spawnable for WorkerPool<Q, T>
where
    Q: JobQueue + Clone + 'static,
    T: SyncTask + 'static,
{
    fn stop_handle(&self) -> StopHandle {
        self.lifecycle.stop_handle()
    }

    fn spawn(self) {
        tokio::spawn(self.run());
    }
}
