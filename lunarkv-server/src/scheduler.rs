//! # Scheduler
//!
//! A single runner thread polling at ~1 Hz for due recurring jobs.
//! Grounded on `original_source/src/concurrency.{h,cpp}`'s
//! `BackgroundProcessor` (`ScheduledTask{task,interval,next_run}`,
//! `processingLoop`'s 1-second `sleep_for`). Per the redesign note,
//! acceptable as-is: periodic cleanup and snapshot run on minute-scale
//! intervals, so a min-heap of next-due times would be over-engineering.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

struct ScheduledJob {
    task: Box<dyn Fn() + Send + Sync>,
    interval: Duration,
    next_due: Instant,
}

/// Holds recurring (job, interval, next-due) records and runs whichever
/// are due on every ~1 s tick, on its own thread rather than through
/// the task queue. A job that fails logs and continues; it never
/// propagates to the caller (see spec §7 propagation policy).
pub struct Scheduler {
    jobs: Arc<Mutex<Vec<ScheduledJob>>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            jobs: Arc::new(Mutex::new(Vec::new())),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Registers a recurring job. Safe to call while the scheduler is
    /// already running.
    pub fn schedule<F>(&self, interval: Duration, task: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut jobs = self.jobs.lock().unwrap();
        jobs.push(ScheduledJob {
            task: Box::new(task),
            interval,
            next_due: Instant::now() + interval,
        });
    }

    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }

        let jobs = Arc::clone(&self.jobs);
        let running = Arc::clone(&self.running);

        let join = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let now = Instant::now();
                let mut jobs = jobs.lock().unwrap();
                for job in jobs.iter_mut() {
                    if now >= job.next_due {
                        (job.task)();
                        job.next_due = now + job.interval;
                    }
                }
                drop(jobs);
                std::thread::sleep(Duration::from_secs(1));
            }
        });

        *self.handle.lock().unwrap() = Some(join);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().unwrap().take() {
            let _ = handle.join();
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn runs_due_jobs_repeatedly() {
        let scheduler = Scheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = Arc::clone(&counter);
        scheduler.schedule(Duration::from_millis(10), move || {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.start();
        std::thread::sleep(Duration::from_millis(50));
        scheduler.stop();

        assert!(counter.load(Ordering::SeqCst) >= 1);
    }
}
