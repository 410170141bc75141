// Pagekeep Manager Library
//
// Request-level coordination of the page lifecycle: resolving pages through
// the store pipeline, serializing access to a page across requests, and
// cleaning up after destroyed sessions.

pub mod config;
pub mod locks;
pub mod manager;
pub mod session;

pub use config::ManagerSettings;
pub use locks::PageAccessLocks;
pub use manager::{PageManager, RequestScope};
pub use session::{Session, SessionInvalidationListener};
