// Session lifecycle
//
// A session partitions every stored page. Invalidating it marks it for
// destruction at the end of the current request; destruction runs the
// invalidation hook, which removes the session's pages from every store.
// The hook runs at most once per session instance.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use pagekeep_store::PageContext;

/// Hook run when a session is destroyed
pub trait SessionInvalidationListener: Send + Sync {
    fn session_destroyed(&self, session_id: &str);
}

struct SessionState {
    id: String,
    invalidated: bool,
    destroyed: bool,
    listener: Option<Arc<dyn SessionInvalidationListener>>,
}

pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new(id: impl Into<String>, listener: Option<Arc<dyn SessionInvalidationListener>>) -> Self {
        Self {
            state: Mutex::new(SessionState {
                id: id.into(),
                invalidated: false,
                destroyed: false,
                listener,
            }),
        }
    }

    pub fn id(&self) -> String {
        self.state.lock().id.clone()
    }

    /// Store partition key of this session
    pub fn context(&self) -> PageContext {
        PageContext::new(self.id())
    }

    /// Mark the session for destruction at the end of the request
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        if !state.destroyed {
            debug!(session_id = %state.id, "session invalidated");
            state.invalidated = true;
        }
    }

    pub fn is_invalidated(&self) -> bool {
        self.state.lock().invalidated
    }

    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// End-of-request hook: destroys the session if it was invalidated
    pub fn end_request(&self) {
        if self.is_invalidated() {
            self.destroy();
        }
    }

    /// Destroy the session right away
    pub fn invalidate_now(&self) {
        self.invalidate();
        self.destroy();
    }

    /// Destroy the data of this session and continue under `new_id`
    pub fn replace_session(&self, new_id: impl Into<String>) {
        let (old_id, listener) = {
            let mut state = self.state.lock();
            let listener = state.listener.clone();
            let old_id = std::mem::replace(&mut state.id, new_id.into());
            state.invalidated = false;
            state.destroyed = false;
            (old_id, listener)
        };
        info!(session_id = %old_id, "session replaced");
        if let Some(listener) = listener {
            listener.session_destroyed(&old_id);
        }
    }

    fn destroy(&self) {
        // the destroyed flag flips under the lock so only one caller runs the hook
        let (id, listener) = {
            let mut state = self.state.lock();
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            (state.id.clone(), state.listener.clone())
        };
        info!(session_id = %id, "session destroyed");
        if let Some(listener) = listener {
            listener.session_destroyed(&id);
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Session")
            .field("id", &state.id)
            .field("invalidated", &state.invalidated)
            .field("destroyed", &state.destroyed)
            .finish()
    }
}
