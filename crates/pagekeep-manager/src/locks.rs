// Page access locks
//
// A page is worked on by one request at a time. The lock of a page is owned
// by a request id; the owning request may lock it again freely, any other
// request blocks until the owner releases it. There is no timeout.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use pagekeep_core::PageId;

type LockKey = (String, PageId);

#[derive(Debug, Default)]
pub struct PageAccessLocks {
    owners: Mutex<HashMap<LockKey, u64>>,
    released: Condvar,
}

impl PageAccessLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock a page for `request_id`, waiting while another request owns it
    pub fn lock_page(&self, session_id: &str, page_id: PageId, request_id: u64) {
        let key = (session_id.to_string(), page_id);
        let mut owners = self.owners.lock();
        loop {
            match owners.get(&key) {
                None => {
                    owners.insert(key, request_id);
                    trace!(session_id, page_id, request_id, "page locked");
                    return;
                }
                Some(owner) if *owner == request_id => return,
                Some(owner) => {
                    trace!(session_id, page_id, request_id, owner = *owner, "waiting for page lock");
                    self.released.wait(&mut owners);
                }
            }
        }
    }

    /// Lock a page if it is free or already owned by `request_id`
    pub fn try_lock_page(&self, session_id: &str, page_id: PageId, request_id: u64) -> bool {
        let mut owners = self.owners.lock();
        let owner = owners.entry((session_id.to_string(), page_id)).or_insert(request_id);
        *owner == request_id
    }

    /// Release a page lock held by `request_id`. Locks of other requests are left alone.
    pub fn unlock_page(&self, session_id: &str, page_id: PageId, request_id: u64) {
        let key = (session_id.to_string(), page_id);
        let mut owners = self.owners.lock();
        if owners.get(&key) == Some(&request_id) {
            owners.remove(&key);
            self.released.notify_all();
        }
    }

    /// Release every lock `request_id` holds
    pub fn unlock_all(&self, request_id: u64) {
        let mut owners = self.owners.lock();
        let before = owners.len();
        owners.retain(|_, owner| *owner != request_id);
        if owners.len() != before {
            self.released.notify_all();
        }
    }

    /// Request currently owning a page
    pub fn owner(&self, session_id: &str, page_id: PageId) -> Option<u64> {
        self.owners.lock().get(&(session_id.to_string(), page_id)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_owner_may_relock() {
        let locks = PageAccessLocks::new();
        locks.lock_page("s", 1, 10);
        locks.lock_page("s", 1, 10);
        assert!(locks.try_lock_page("s", 1, 10));
        assert!(!locks.try_lock_page("s", 1, 11));
        assert!(locks.try_lock_page("s", 2, 11));
        assert!(locks.try_lock_page("other", 1, 11));
    }

    #[test]
    fn test_unlock_by_non_owner_is_ignored() {
        let locks = PageAccessLocks::new();
        locks.lock_page("s", 1, 10);
        locks.unlock_page("s", 1, 11);
        assert_eq!(locks.owner("s", 1), Some(10));
        locks.unlock_all(10);
        assert_eq!(locks.owner("s", 1), None);
    }

    #[test]
    fn test_second_request_waits_for_release() {
        let locks = Arc::new(PageAccessLocks::new());
        locks.lock_page("s", 1, 1);

        let waiter = {
            let locks = locks.clone();
            thread::spawn(move || {
                locks.lock_page("s", 1, 2);
                locks.owner("s", 1)
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert_eq!(locks.owner("s", 1), Some(1));
        locks.unlock_all(1);
        assert_eq!(waiter.join().unwrap(), Some(2));
    }
}
