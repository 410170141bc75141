// Write-behind queue racing session removal

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;

use pagekeep_core::PageId;
use pagekeep_error::StoreResult;
use pagekeep_store::{
    AsynchronousPageStore, MemoryPageStore, PageContext, PageStore, SerializedPage, StoredPage,
};

/// Durable store whose first write of (session, page) blocks until released
struct GatedStore {
    inner: MemoryPageStore,
    gate: (String, PageId),
    entered: Sender<()>,
    release: Receiver<()>,
    armed: Mutex<bool>,
    /// Session whose writes must not be queued
    synchronous: Option<String>,
}

impl GatedStore {
    fn new(gate: (&str, PageId), synchronous: Option<&str>) -> (Arc<Self>, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        let store = Arc::new(GatedStore {
            inner: MemoryPageStore::new(),
            gate: (gate.0.to_string(), gate.1),
            entered: entered_tx,
            release: release_rx,
            armed: Mutex::new(true),
            synchronous: synchronous.map(str::to_string),
        });
        (store, entered_rx, release_tx)
    }
}

impl PageStore for GatedStore {
    fn can_be_asynchronous(&self, context: &PageContext) -> bool {
        self.synchronous.as_deref() != Some(context.session_id())
    }

    fn add_page(&self, context: &PageContext, page: StoredPage) -> StoreResult<()> {
        let gated = context.session_id() == self.gate.0 && page.page_id() == self.gate.1;
        if gated && std::mem::replace(&mut *self.armed.lock(), false) {
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
        self.inner.add_page(context, page)
    }

    fn get_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<Option<StoredPage>> {
        self.inner.get_page(context, page_id)
    }

    fn remove_page(&self, context: &PageContext, page_id: PageId) -> StoreResult<()> {
        self.inner.remove_page(context, page_id)
    }

    fn remove_all_pages(&self, context: &PageContext) -> StoreResult<()> {
        self.inner.remove_all_pages(context)
    }

    fn destroy(&self) {
        self.inner.destroy();
    }
}

fn empty_page(id: PageId) -> StoredPage {
    SerializedPage::new(id, 0, "Home", Vec::new()).into()
}

#[test]
fn write_in_flight_does_not_resurrect_removed_session() {
    let (gated, entered_rx, release_tx) = GatedStore::new(("A", 1), None);
    let store = Arc::new(AsynchronousPageStore::new(gated.clone(), 100).unwrap());
    let a = PageContext::new("A");
    let b = PageContext::new("B");

    store.add_page(&a, empty_page(1)).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(5)).expect("writer reached the durable store");
    store.add_page(&a, empty_page(2)).unwrap();

    let remover = {
        let store = store.clone();
        let a = a.clone();
        thread::spawn(move || store.remove_all_pages(&a))
    };
    // give the remover a chance to queue up behind the in-flight write
    thread::sleep(Duration::from_millis(50));
    release_tx.send(()).unwrap();
    remover.join().unwrap().unwrap();

    store.add_page(&b, empty_page(3)).unwrap();
    store.flush();

    assert!(gated.get_page(&a, 1).unwrap().is_none());
    assert!(gated.get_page(&a, 2).unwrap().is_none());
    assert!(store.get_page(&a, 2).unwrap().is_none());
    assert!(gated.get_page(&b, 3).unwrap().is_some());
}

#[test]
fn taken_write_does_not_resurrect_removed_page() {
    let (gated, entered_rx, release_tx) = GatedStore::new(("admin", 9), Some("admin"));
    let store = Arc::new(AsynchronousPageStore::new(gated.clone(), 100).unwrap());
    let admin = PageContext::new("admin");
    let a = PageContext::new("A");

    // a synchronous write holds the commit lock while it is gated
    let blocker = {
        let store = store.clone();
        let admin = admin.clone();
        thread::spawn(move || store.add_page(&admin, empty_page(9)))
    };
    entered_rx.recv_timeout(Duration::from_secs(5)).expect("synchronous write reached the durable store");

    // the writer takes this write and then waits for the commit lock
    store.add_page(&a, empty_page(1)).unwrap();
    thread::sleep(Duration::from_millis(50));
    let remover = {
        let store = store.clone();
        let a = a.clone();
        thread::spawn(move || store.remove_page(&a, 1))
    };
    thread::sleep(Duration::from_millis(50));
    release_tx.send(()).unwrap();
    blocker.join().unwrap().unwrap();
    remover.join().unwrap().unwrap();
    store.flush();

    assert!(gated.get_page(&a, 1).unwrap().is_none());
    assert!(store.get_page(&a, 1).unwrap().is_none());
    assert!(gated.get_page(&admin, 9).unwrap().is_some());
}

#[test]
fn full_queue_writes_synchronously() {
    let (gated, entered_rx, release_tx) = GatedStore::new(("A", 1), None);
    let store = AsynchronousPageStore::new(gated.clone(), 2).unwrap();
    let a = PageContext::new("A");

    store.add_page(&a, empty_page(1)).unwrap();
    entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    // page 1 is in flight and still counts against the capacity
    store.add_page(&a, empty_page(2)).unwrap();
    assert_eq!(store.pending_count(), 2);

    let writer = {
        let gated = gated.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            release_tx.send(()).unwrap();
            gated
        })
    };
    // the queue is full: this write waits for the commit lock and lands directly
    store.add_page(&a, empty_page(3)).unwrap();
    assert!(gated.get_page(&a, 3).unwrap().is_some());
    writer.join().unwrap();

    store.flush();
    assert!(gated.get_page(&a, 1).unwrap().is_some());
    assert!(gated.get_page(&a, 2).unwrap().is_some());
}
