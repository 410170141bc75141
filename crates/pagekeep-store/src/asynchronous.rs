// Asynchronous store
//
// Write-behind queue in front of a slower store. Callers return as soon as a
// write is queued; a dedicated writer thread commits queued writes in
// submission order.
//
// Guarantees:
// - at most one pending write per (session, page id); a newer write replaces
//   an older one that has not been committed yet
// - a pending write is visible to `get_page` until it is committed
// - once `remove_page` or `remove_all_pages` returns, no write submitted
//   before it can reach the delegate. Removal drops matching pending writes
//   and marks a matching write the writer has already taken as cancelled,
//   both under the commit lock; the writer checks the mark under the same
//   lock right before it writes.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, warn};

use pagekeep_core::PageId;
use pagekeep_error::{StoreError, StoreResult};

use crate::page::{PageContext, StoredPage};
use crate::store::PageStore;

type PendingKey = (String, PageId);

#[derive(Debug)]
struct PendingWrite {
    context: PageContext,
    page: StoredPage,
    seq: u64,
    /// Whether the key of this write is still waiting in the channel
    queued: bool,
}

/// The write the writer thread has taken and not finished yet
#[derive(Debug)]
struct InFlight {
    key: PendingKey,
    seq: u64,
    cancelled: bool,
}

#[derive(Debug, Default)]
struct Queue {
    pending: HashMap<PendingKey, PendingWrite>,
    in_flight: Option<InFlight>,
    next_seq: u64,
}

impl Queue {
    /// Drop pending writes matching `removed` and cancel a matching write in flight
    fn cancel(&mut self, removed: impl Fn(&PendingKey) -> bool) {
        self.pending.retain(|key, _| !removed(key));
        if let Some(in_flight) = self.in_flight.as_mut() {
            if removed(&in_flight.key) {
                in_flight.cancelled = true;
            }
        }
    }
}

struct Shared {
    delegate: Arc<dyn PageStore>,
    queue: Mutex<Queue>,
    /// Signalled whenever the pending set becomes empty
    drained: Condvar,
    commit: Mutex<()>,
}

impl Shared {
    /// Take the next write for `key`, leaving it readable until committed
    fn begin_write(&self, key: &PendingKey) -> Option<(PageContext, StoredPage, u64)> {
        let mut queue = self.queue.lock();
        let write = queue.pending.get_mut(key)?;
        if !write.queued {
            // stale wake-up: this write is already handled
            return None;
        }
        write.queued = false;
        let taken = (write.context.clone(), write.page.clone(), write.seq);
        queue.in_flight = Some(InFlight { key: key.clone(), seq: taken.2, cancelled: false });
        Some(taken)
    }

    /// Whether the write taken with `seq` was cancelled by a removal
    fn is_cancelled(&self, seq: u64) -> bool {
        self.queue
            .lock()
            .in_flight
            .as_ref()
            .map_or(true, |in_flight| in_flight.seq != seq || in_flight.cancelled)
    }

    fn finish_write(&self, key: &PendingKey, seq: u64) {
        let mut queue = self.queue.lock();
        queue.in_flight = None;
        if queue.pending.get(key).map_or(false, |write| write.seq == seq) {
            queue.pending.remove(key);
        }
        if queue.pending.is_empty() {
            self.drained.notify_all();
        }
    }

    fn commit(&self, key: &PendingKey) {
        let Some((context, page, seq)) = self.begin_write(key) else {
            return;
        };
        {
            let _commit = self.commit.lock();
            if self.is_cancelled(seq) {
                debug!(session_id = context.session_id(), page_id = key.1, "dropping write for removed page");
            } else if let Err(err) = self.delegate.add_page(&context, page) {
                error!(session_id = context.session_id(), page_id = key.1, error = %err, "background page write failed");
            }
        }
        self.finish_write(key, seq);
    }
}

/// Write-behind decorator of a page store
pub struct AsynchronousPageStore {
    shared: Arc<Shared>,
    capacity: usize,
    sender: Mutex<Option<Sender<PendingKey>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl AsynchronousPageStore {
    /// Wrap `delegate`, queueing at most `capacity` pending writes
    pub fn new(delegate: Arc<dyn PageStore>, capacity: usize) -> StoreResult<Self> {
        let shared = Arc::new(Shared {
            delegate,
            queue: Mutex::new(Queue::default()),
            drained: Condvar::new(),
            commit: Mutex::new(()),
        });
        let (sender, receiver) = unbounded();
        let writer = {
            let shared = shared.clone();
            thread::Builder::new()
                .name("pagekeep-page-writer".to_string())
                .spawn(move || run_writer(shared, receiver))
                .map_err(|e| StoreError::SyncError(format!("could not start page writer: {}", e)))?
        };
        Ok(Self {
            shared,
            capacity,
            sender: Mutex::new(Some(sender)),
            writer: Mutex::new(Some(writer)),
        })
    }

    /// Number of writes not yet committed
    pub fn pending_count(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }

    /// Block until every queued write has been committed or dropped
    pub fn flush(&self) {
        let mut queue = self.shared.queue.lock();
        while !queue.pending.is_empty() {
            self.shared.drained.wait(&mut queue);
        }
    }

    /// Stop accepting writes, drain the queue and join the writer
    fn shutdown(&self) {
        let sender = self.sender.lock().take();
        drop(sender);
        let writer = self.writer.lock().take();
        if let Some(writer) = writer {
            if writer.join().is_err() {
                error!("page writer thread panicked");
            }
        }
    }

    fn write_synchronously(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        let _commit = self.shared.commit.lock();
        self.shared.delegate.add_page(context, page)
    }
}

fn run_writer(shared: Arc<Shared>, receiver: Receiver<PendingKey>) {
    // iteration ends once the sender is gone and the channel is drained
    for key in receiver.iter() {
        shared.commit(&key);
    }
    debug!("page writer stopped");
}

impl PageStore for AsynchronousPageStore {
    fn can_be_asynchronous(&self, _context: &PageContext) -> bool {
        true
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        if !self.shared.delegate.can_be_asynchronous(context) {
            return self.write_synchronously(context, page);
        }
        let sender = match self.sender.lock().as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(StoreError::Destroyed("asynchronous page store".to_string())),
        };

        let key = (context.session_id().to_string(), page.page_id());
        let enqueue = {
            let mut queue = self.shared.queue.lock();
            let seq = queue.next_seq;
            let write = PendingWrite { context: context.clone(), page, seq, queued: true };
            match queue.pending.get(&key).map(|existing| existing.queued) {
                // replaces the uncommitted write; re-queued if the writer already took it
                Some(still_queued) => {
                    queue.pending.insert(key.clone(), write);
                    queue.next_seq += 1;
                    !still_queued
                }
                None if queue.pending.len() >= self.capacity => {
                    drop(queue);
                    warn!(session_id = context.session_id(), page_id = key.1, "write queue full, writing synchronously");
                    return self.write_synchronously(context, write.page);
                }
                None => {
                    queue.pending.insert(key.clone(), write);
                    queue.next_seq += 1;
                    true
                }
            }
        };
        if enqueue && sender.send(key.clone()).is_err() {
            // writer is gone; undo the queueing so flush does not wait forever
            let mut queue = self.shared.queue.lock();
            if let Some(write) = queue.pending.remove(&key) {
                drop(queue);
                return self.write_synchronously(&write.context, write.page);
            }
        }
        Ok(())
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        let key = (context.session_id().to_string(), page_id);
        if let Some(write) = self.shared.queue.lock().pending.get(&key) {
            return Ok(Some(write.page.clone()));
        }
        self.shared.delegate.get_page(context, page_id)
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        let _commit = self.shared.commit.lock();
        let key = (context.session_id().to_string(), page_id);
        {
            let mut queue = self.shared.queue.lock();
            queue.cancel(|pending| *pending == key);
            if queue.pending.is_empty() {
                self.shared.drained.notify_all();
            }
        }
        self.shared.delegate.remove_page(context, page_id)
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        let _commit = self.shared.commit.lock();
        {
            let mut queue = self.shared.queue.lock();
            queue.cancel(|(session_id, _)| session_id == context.session_id());
            if queue.pending.is_empty() {
                self.shared.drained.notify_all();
            }
        }
        debug!(session_id = context.session_id(), "removed pending writes of session");
        self.shared.delegate.remove_all_pages(context)
    }

    fn destroy(&self) {
        self.shutdown();
        self.shared.delegate.destroy();
    }
}

impl Drop for AsynchronousPageStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryPageStore;
    use crate::page::SerializedPage;

    fn page(id: PageId, version: u32) -> StoredPage {
        SerializedPage::new(id, version, "Home", vec![version as u8]).into()
    }

    #[test]
    fn test_flush_commits_everything() {
        let memory = Arc::new(MemoryPageStore::new());
        let store = AsynchronousPageStore::new(memory.clone(), 16).unwrap();
        let context = PageContext::new("s");
        for id in 1..=5 {
            store.add_page(&context, page(id, 1)).unwrap();
        }
        store.flush();
        assert_eq!(store.pending_count(), 0);
        assert_eq!(memory.page_ids(&context), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_last_write_wins() {
        let memory = Arc::new(MemoryPageStore::new());
        let store = AsynchronousPageStore::new(memory.clone(), 16).unwrap();
        let context = PageContext::new("s");
        for version in 1..=10 {
            store.add_page(&context, page(7, version)).unwrap();
        }
        // a pending write is readable before it is committed
        let read = store.get_page(&context, 7).unwrap().unwrap();
        assert!(read.as_serialized().is_some());
        store.flush();
        let stored = memory.get_page(&context, 7).unwrap().unwrap();
        assert_eq!(stored.as_serialized().unwrap().version, 10);
    }

    #[test]
    fn test_removed_sessions_leave_no_bookkeeping() {
        let memory = Arc::new(MemoryPageStore::new());
        let store = AsynchronousPageStore::new(memory.clone(), 16).unwrap();
        for n in 0..10_000 {
            let context = PageContext::new(format!("session-{}", n));
            if n % 100 == 0 {
                store.add_page(&context, page(1, 1)).unwrap();
            }
            store.remove_all_pages(&context).unwrap();
        }
        store.flush();
        let queue = store.shared.queue.lock();
        assert!(queue.pending.is_empty());
        assert!(queue.in_flight.is_none());
        drop(queue);
        assert_eq!(memory.session_count(), 0);
    }

    #[test]
    fn test_remove_page_cancels_taken_write() {
        let memory = Arc::new(MemoryPageStore::new());
        let store = AsynchronousPageStore::new(memory.clone(), 16).unwrap();
        let context = PageContext::new("s");
        let key = ("s".to_string(), 4);
        {
            // hold the commit lock so the writer stops between taking the write and committing it
            let _commit = store.shared.commit.lock();
            store.add_page(&context, page(4, 1)).unwrap();
            while store.shared.queue.lock().in_flight.is_none() {
                std::thread::yield_now();
            }
            let mut queue = store.shared.queue.lock();
            queue.cancel(|pending| *pending == key);
            assert!(queue.pending.is_empty());
            assert!(queue.in_flight.as_ref().map_or(false, |in_flight| in_flight.cancelled));
        }
        store.flush();
        assert!(memory.get_page(&context, 4).unwrap().is_none());
    }

    #[test]
    fn test_destroy_drains_queue() {
        let memory = Arc::new(MemoryPageStore::new());
        let store = AsynchronousPageStore::new(memory.clone(), 16).unwrap();
        let context = PageContext::new("s");
        store.add_page(&context, page(1, 1)).unwrap();
        store.shutdown();
        assert_eq!(memory.page_ids(&context), vec![1]);
        assert!(matches!(store.add_page(&context, page(2, 1)), Err(StoreError::Destroyed(_))));
    }
}
