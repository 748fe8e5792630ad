//! Bounded worker pool
//!
//! A fixed-capacity task channel served by a fixed set of worker threads.
//! Both enqueueing and the worker loop select against a shared `quit`
//! signal, so shutdown never deadlocks on a full or empty channel.

use super::DagError;
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::thread::JoinHandle;

/// A unit of work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-capacity worker pool
pub struct Workers {
    tasks_tx: Sender<Task>,
    tasks_rx: Receiver<Task>,
    quit_rx: Receiver<()>,
    capacity: usize,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Workers {
    /// Create a pool with a task channel of `capacity`, watching `quit`
    pub fn new(capacity: usize, quit_rx: Receiver<()>) -> Self {
        let (tasks_tx, tasks_rx) = bounded(capacity);
        Workers {
            tasks_tx,
            tasks_rx,
            quit_rx,
            capacity,
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Start `n` worker threads named `name-i`
    pub fn start(&self, name: &str, n: usize) {
        let mut handles = self.handles.lock();
        for i in 0..n {
            let tasks = self.tasks_rx.clone();
            let quit = self.quit_rx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || loop {
                    crossbeam_channel::select! {
                        recv(quit) -> _ => break,
                        recv(tasks) -> task => match task {
                            Ok(task) => task(),
                            Err(_) => break,
                        },
                    }
                })
                .expect("failed to spawn worker thread");
            handles.push(handle);
        }
    }

    /// Enqueue a task, blocking until the channel accepts it or `quit`
    /// fires
    pub fn enqueue(&self, task: Task) -> Result<(), DagError> {
        crossbeam_channel::select! {
            send(self.tasks_tx, task) -> res => res.map_err(|_| DagError::Terminated),
            recv(self.quit_rx) -> _ => Err(DagError::Terminated),
        }
    }

    /// Number of tasks waiting in the channel
    pub fn pending(&self) -> usize {
        self.tasks_rx.len()
    }

    /// True if pending work exceeds 75% of the channel capacity
    pub fn overloaded(&self) -> bool {
        self.pending() * 4 > self.capacity * 3
    }

    /// Empty the pending channel without closing it, dropping the tasks.
    /// Returns the number of tasks dropped.
    pub fn drain(&self) -> usize {
        let mut dropped = 0;
        while self.tasks_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }

    /// Join all worker threads. Call after `quit` has fired.
    pub fn join(&self) {
        for handle in self.handles.lock().drain(..) {
            let _ = handle.join();
        }
    }
}
