//! # Task Queue
//!
//! A bounded pool of worker threads draining a FIFO queue of opaque
//! jobs. Grounded on `original_source/src/concurrency.h`'s `TaskQueue`
//! (condvar-guarded `std::queue` + worker threads), re-expressed per
//! the redesign note "worker-pool enqueue-and-get-a-future pattern" as
//! a channel of jobs plus a one-shot result channel per job, with
//! panics folded into an error on the handle instead of killing the
//! worker.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use lunarkv_common::{HkvError, HkvResult};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A handle to a job's eventual result. Dropping it without calling
/// [`JobHandle::join`] simply discards the result.
pub struct JobHandle<T> {
    receiver: Receiver<std::thread::Result<T>>,
}

impl<T> JobHandle<T> {
    /// Blocks until the job completes. A panicked job surfaces as a
    /// `Provider`-style logged error rather than propagating the panic.
    pub fn join(self) -> HkvResult<T> {
        self.receiver
            .recv()
            .map_err(|_| HkvError::Stopped)?
            .map_err(|_| HkvError::BadRequest("background job panicked".into()))
    }
}

/// A bounded worker pool consuming opaque jobs (spec C5).
pub struct TaskQueue {
    sender: Mutex<Option<Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    active_count: Arc<AtomicUsize>,
    queued_count: Arc<AtomicUsize>,
}

impl TaskQueue {
    /// Creates a stopped queue with `worker_count` threads to be
    /// spawned on [`TaskQueue::start`]. `worker_count` defaults to the
    /// host's parallelism when the caller passes 0.
    pub fn new(worker_count: usize) -> Arc<Self> {
        let worker_count = if worker_count == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            worker_count
        };

        let queue = Arc::new(TaskQueue {
            sender: Mutex::new(None),
            workers: Mutex::new(Vec::new()),
            active_count: Arc::new(AtomicUsize::new(0)),
            queued_count: Arc::new(AtomicUsize::new(0)),
        });
        queue.start(worker_count);
        queue
    }

    fn start(self: &Arc<Self>, worker_count: usize) {
        let (tx, rx) = mpsc::channel::<Job>();
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let rx = Arc::clone(&rx);
            let active = Arc::clone(&self.active_count);
            let queued = Arc::clone(&self.queued_count);

            workers.push(std::thread::spawn(move || loop {
                let job = {
                    let rx = rx.lock().unwrap();
                    rx.recv()
                };

                match job {
                    Ok(job) => {
                        queued.fetch_sub(1, Ordering::SeqCst);
                        active.fetch_add(1, Ordering::SeqCst);
                        let _ = panic::catch_unwind(AssertUnwindSafe(job));
                        active.fetch_sub(1, Ordering::SeqCst);
                    }
                    Err(_) => break, // sender dropped: queue stopped
                }
            }));
        }

        *self.sender.lock().unwrap() = Some(tx);
        *self.workers.lock().unwrap() = workers;
    }

    /// Submits a job and returns a handle for its result. Fails with
    /// `Stopped` once [`TaskQueue::stop`] has returned.
    pub fn enqueue<F, T>(&self, job: F) -> HkvResult<JobHandle<T>>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (result_tx, result_rx) = mpsc::channel();
        let guard = self.sender.lock().unwrap();
        let sender = guard.as_ref().ok_or(HkvError::Stopped)?;

        self.queued_count.fetch_add(1, Ordering::SeqCst);
        let task: Job = Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job));
            let _ = result_tx.send(result);
        });

        sender.send(task).map_err(|_| HkvError::Stopped)?;
        Ok(JobHandle { receiver: result_rx })
    }

    /// Signals workers to stop, lets queued jobs drain, then joins
    /// every thread. `enqueue` fails with `Stopped` after this returns.
    pub fn stop(&self) {
        *self.sender.lock().unwrap() = None;
        let workers = std::mem::take(&mut *self.workers.lock().unwrap());
        for worker in workers {
            let _ = worker.join();
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queued_count.load(Ordering::SeqCst)
    }

    pub fn active_count(&self) -> usize {
        self.active_count.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn runs_jobs_and_returns_results() {
        let queue = TaskQueue::new(2);
        let handle = queue.enqueue(|| 2 + 2).unwrap();
        assert_eq!(handle.join().unwrap(), 4);
    }

    #[test]
    fn panics_are_captured_not_fatal() {
        let queue = TaskQueue::new(1);
        let handle = queue.enqueue(|| -> i32 { panic!("boom") }).unwrap();
        assert!(handle.join().is_err());

        // the worker must still be alive afterwards
        let handle = queue.enqueue(|| 7).unwrap();
        assert_eq!(handle.join().unwrap(), 7);
    }

    #[test]
    fn stop_rejects_further_enqueue() {
        let queue = TaskQueue::new(1);
        queue.stop();
        assert!(queue.enqueue(|| 1).is_err());
    }

    #[test]
    fn active_count_tracks_in_flight_jobs() {
        let queue = TaskQueue::new(1);
        let handle = queue
            .enqueue(|| {
                std::thread::sleep(Duration::from_millis(50));
                1
            })
            .unwrap();
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(queue.active_count(), 1);
        handle.join().unwrap();
    }
}
