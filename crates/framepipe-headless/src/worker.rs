// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A dedicated background thread running at most one job at a time.

use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

type Job = Box<dyn FnOnce() + Send + 'static>;

enum Command {
    Run(Job),
    Shutdown,
}

/// A single-slot blocking task queue backed by one thread.
///
/// [`set_work`](Self::set_work) never blocks on the job itself, only on the
/// previous one. [`wait`](Self::wait) blocks until the most recently set job
/// has finished.
pub struct FrameWorker {
    name: String,
    commands: Sender<Command>,
    completions: Receiver<()>,
    busy: bool,
    handle: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for FrameWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWorker")
            .field("name", &self.name)
            .field("busy", &self.busy)
            .finish()
    }
}

impl FrameWorker {
    /// Spawns the worker thread.
    ///
    /// ## Errors
    /// Returns the OS error if the thread cannot be spawned.
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let name = name.into();
        let (commands, command_rx) = crossbeam_channel::bounded(1);
        let (completion_tx, completions) = crossbeam_channel::bounded(1);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(command_rx, completion_tx))?;
        log::trace!("Worker '{name}' started.");

        Ok(Self {
            name,
            commands,
            completions,
            busy: false,
            handle: Some(handle),
        })
    }

    /// Returns the thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blocks until no job is outstanding. Returns immediately if idle.
    pub fn wait(&mut self) {
        if !self.busy {
            return;
        }
        if self.completions.recv().is_err() {
            log::error!("Worker '{}' exited with a job outstanding.", self.name);
        }
        self.busy = false;
    }

    /// Hands `job` to the worker thread after the previous job has finished.
    pub fn set_work<F>(&mut self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.wait();
        match self.commands.send(Command::Run(Box::new(job))) {
            Ok(()) => self.busy = true,
            Err(_) => log::error!("Worker '{}' is gone; job dropped.", self.name),
        }
    }

    /// Returns `true` while a job is set and not yet waited for.
    pub fn is_busy(&self) -> bool {
        self.busy
    }
}

impl Drop for FrameWorker {
    fn drop(&mut self) {
        self.wait();
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Worker '{}' panicked during shutdown.", self.name);
            }
        }
        log::trace!("Worker '{}' stopped.", self.name);
    }
}

fn worker_loop(commands: Receiver<Command>, completions: Sender<()>) {
    while let Ok(Command::Run(job)) = commands.recv() {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            log::error!("Frame job panicked: {}", panic_message(payload.as_ref()));
        }
        if completions.send(()).is_err() {
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn wait_on_idle_worker_returns_immediately() {
        let mut worker = FrameWorker::new("idle").unwrap();
        worker.wait();
        worker.wait();
        assert!(!worker.is_busy());
    }

    #[test]
    fn wait_returns_only_after_job_finished() {
        let mut worker = FrameWorker::new("slow").unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();

        worker.set_work(move || {
            thread::sleep(Duration::from_millis(30));
            flag.store(1, Ordering::SeqCst);
        });
        assert!(worker.is_busy());
        worker.wait();

        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert!(!worker.is_busy());
        worker.wait();
    }

    #[test]
    fn jobs_run_in_submission_order() {
        let mut worker = FrameWorker::new("ordered").unwrap();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..5 {
            let log = log.clone();
            worker.set_work(move || log.lock().unwrap().push(i));
        }
        worker.wait();
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn jobs_run_on_the_named_thread() {
        let mut worker = FrameWorker::new("framepipe-worker-7").unwrap();
        let seen = Arc::new(std::sync::Mutex::new(None));
        let slot = seen.clone();
        worker.set_work(move || {
            *slot.lock().unwrap() = thread::current().name().map(str::to_owned);
        });
        worker.wait();

        assert_eq!(worker.name(), "framepipe-worker-7");
        assert_eq!(seen.lock().unwrap().as_deref(), Some(worker.name()));
    }

    #[test]
    fn panicking_job_does_not_kill_worker() {
        let mut worker = FrameWorker::new("panicky").unwrap();
        worker.set_work(|| panic!("encode failed"));
        worker.wait();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        worker.set_work(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        worker.wait();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_drains_outstanding_job() {
        let ran = Arc::new(AtomicUsize::new(0));
        {
            let mut worker = FrameWorker::new("draining").unwrap();
            let counter = ran.clone();
            worker.set_work(move || {
                thread::sleep(Duration::from_millis(20));
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }
}
