// Pagekeep Worker Pool
//
// A fixed set of reusable resources handed out to threads. A thread that
// holds a resource gets the same one back from every further `get()` until
// it calls `release()`. Threads without a resource wait until one is
// released; which waiter proceeds is unspecified.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

pub use pagekeep_error::{PoolError, PoolResult};

#[derive(Debug)]
struct PoolState<R> {
    available: Vec<R>,
    bound: HashMap<ThreadId, R>,
}

#[derive(Debug)]
pub struct WorkerPool<R: Clone> {
    state: Mutex<PoolState<R>>,
    released: Condvar,
    size: usize,
}

impl<R: Clone> WorkerPool<R> {
    /// Create a pool over `resources`; at least one is required
    pub fn new(resources: Vec<R>) -> PoolResult<Self> {
        if resources.is_empty() {
            return Err(PoolError::EmptyPool);
        }
        let size = resources.len();
        Ok(Self {
            state: Mutex::new(PoolState { available: resources, bound: HashMap::new() }),
            released: Condvar::new(),
            size,
        })
    }

    /// Resource bound to the calling thread, waiting for one if it holds none
    pub fn get(&self) -> R {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        loop {
            if let Some(resource) = state.bound.get(&thread) {
                return resource.clone();
            }
            if let Some(resource) = state.available.pop() {
                state.bound.insert(thread, resource.clone());
                trace!(?thread, "pool resource acquired");
                return resource;
            }
            self.released.wait(&mut state);
        }
    }

    /// Like `get`, but returns `None` instead of waiting
    pub fn try_get(&self) -> Option<R> {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        if let Some(resource) = state.bound.get(&thread) {
            return Some(resource.clone());
        }
        let resource = state.available.pop()?;
        state.bound.insert(thread, resource.clone());
        Some(resource)
    }

    /// Return the calling thread's resource. A no-op if it holds none.
    pub fn release(&self) {
        let thread = thread::current().id();
        let mut state = self.state.lock();
        if let Some(resource) = state.bound.remove(&thread) {
            state.available.push(resource);
            trace!(?thread, "pool resource released");
            self.released.notify_one();
        }
    }

    /// Resources not bound to any thread
    pub fn available(&self) -> usize {
        self.state.lock().available.len()
    }

    /// Resources currently bound to a thread
    pub fn in_use(&self) -> usize {
        self.state.lock().bound.len()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}
