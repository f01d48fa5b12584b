//! Background work off the main thread
//!
//! Jobs run on a small rayon pool. Each submitted job gets its own channel;
//! the main thread is the only consumer and drains it until the job
//! finishes or fails.

use std::sync::mpsc::{self, Receiver, Sender};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{AppError, Result};

#[derive(Debug, PartialEq)]
pub(crate) enum TaskEvent<T> {
    Progress(usize),
    Finished(T),
    Failed(String),
}

/// Handed to a running job so it can report intermediate counts
pub(crate) struct ProgressReporter<T> {
    tx: Sender<TaskEvent<T>>,
}

impl<T> ProgressReporter<T> {
    pub(crate) fn report(&self, value: usize) {
        // receiver gone means nobody is watching; the job keeps going
        let _ = self.tx.send(TaskEvent::Progress(value));
    }
}

pub(crate) struct WorkerPool {
    pool: ThreadPool,
}

impl WorkerPool {
    pub(crate) fn new(workers: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("ppms-worker-{i}"))
            .panic_handler(|_| log::error!("worker thread panicked"))
            .build()
            .map_err(|e| AppError::Config(format!("cannot start worker pool: {e}")))?;
        Ok(WorkerPool { pool })
    }

    pub(crate) fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `job` on the pool. The returned receiver yields progress events
    /// followed by exactly one `Finished` or `Failed`.
    pub(crate) fn submit<T, F>(&self, job: F) -> Receiver<TaskEvent<T>>
    where
        T: Send + 'static,
        F: FnOnce(&ProgressReporter<T>) -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            let reporter = ProgressReporter { tx };
            let event = match job(&reporter) {
                Ok(value) => TaskEvent::Finished(value),
                Err(e) => TaskEvent::Failed(e.to_string()),
            };
            let _ = reporter.tx.send(event);
        });
        rx
    }
}

/// Block until the job behind `rx` completes, forwarding progress events
pub(crate) fn drain<T>(rx: Receiver<TaskEvent<T>>, mut on_progress: impl FnMut(usize)) -> Result<T> {
    for event in rx {
        match event {
            TaskEvent::Progress(value) => on_progress(value),
            TaskEvent::Finished(value) => return Ok(value),
            TaskEvent::Failed(message) => return Err(AppError::Task(message)),
        }
    }
    Err(AppError::Task("worker stopped without a result".to_string()))
}
