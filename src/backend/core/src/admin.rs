//! Thread-scoped administrative request marker.
//!
//! While a thread is executing a privileged management operation it carries
//! an opaque payload in a thread-local cell. Access evaluation consults the
//! cell through [`AccessContext::current`](crate::access::AccessContext::current).
//!
//! The cell holds at most one value: `start` overwrites, `finish` and `abort`
//! clear unconditionally. Prefer [`AdminRequest::enter`] or
//! [`AdminRequest::scope`], which clear the cell on every exit path including
//! unwinding, so a pooled thread never carries a stale marker into the next
//! request it serves.

use std::any::Any;
use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::{debug, warn};

/// Opaque payload describing the administrative request.
pub type AdminPayload = Arc<dyn Any + Send + Sync>;

thread_local! {
    static CURRENT_ADMIN_REQUEST: RefCell<Option<AdminPayload>> = RefCell::new(None);
}

/// Namespace for the thread-local administrative request operations.
pub struct AdminRequest;

impl AdminRequest {
    /// Mark the calling thread as running an administrative request.
    pub fn start<T: Any + Send + Sync>(payload: T) {
        Self::start_shared(Arc::new(payload));
    }

    /// Same as [`start`](Self::start) with an already shared payload.
    pub fn start_shared(payload: AdminPayload) {
        CURRENT_ADMIN_REQUEST.with(|cell| {
            let previous = cell.borrow_mut().replace(payload);
            if previous.is_some() {
                debug!("Admin request restarted on thread with an active request");
            }
        });
    }

    /// Payload of the calling thread's admin request, if any.
    pub fn get() -> Option<AdminPayload> {
        CURRENT_ADMIN_REQUEST.with(|cell| cell.borrow().clone())
    }

    /// Payload downcast to a concrete type. `None` if absent or of another type.
    pub fn get_as<T: Any + Send + Sync>() -> Option<Arc<T>> {
        Self::get().and_then(|payload| payload.downcast::<T>().ok())
    }

    pub fn is_active() -> bool {
        CURRENT_ADMIN_REQUEST.with(|cell| cell.borrow().is_some())
    }

    /// End the admin request normally.
    pub fn finish() {
        Self::clear();
    }

    /// End the admin request after a failure.
    pub fn abort() {
        if Self::clear() {
            warn!("Admin request aborted");
        }
    }

    /// Start an admin request that ends when the returned guard is dropped.
    #[must_use = "the admin request ends as soon as the guard is dropped"]
    pub fn enter<T: Any + Send + Sync>(payload: T) -> AdminRequestGuard {
        Self::start(payload);
        AdminRequestGuard {
            _not_send: PhantomData,
        }
    }

    /// Run `f` as an admin request. The marker is cleared when `f` returns or
    /// unwinds.
    pub fn scope<T, R, F>(payload: T, f: F) -> R
    where
        T: Any + Send + Sync,
        F: FnOnce() -> R,
    {
        let _guard = Self::enter(payload);
        f()
    }

    fn clear() -> bool {
        CURRENT_ADMIN_REQUEST.with(|cell| cell.borrow_mut().take().is_some())
    }
}

/// Clears the calling thread's admin request on drop.
///
/// Not `Send`: it must be dropped on the thread that created it.
#[derive(Debug)]
pub struct AdminRequestGuard {
    _not_send: PhantomData<*const ()>,
}

impl AdminRequestGuard {
    /// End the request explicitly after a failure.
    pub fn abort(self) {
        AdminRequest::abort();
    }
}

impl Drop for AdminRequestGuard {
    fn drop(&mut self) {
        AdminRequest::clear();
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic;
    use std::sync::mpsc;
    use std::sync::Barrier;
    use std::thread;

    #[derive(Debug, PartialEq)]
    struct Op(&'static str);

    #[test]
    fn test_start_get_finish() {
        assert!(AdminRequest::get().is_none());
        AdminRequest::start(Op("reload"));
        assert_eq!(AdminRequest::get_as::<Op>().as_deref(), Some(&Op("reload")));
        AdminRequest::finish();
        assert!(AdminRequest::get().is_none());
    }

    #[test]
    fn test_last_start_wins_and_single_finish_clears() {
        AdminRequest::start(Op("first"));
        AdminRequest::start(Op("second"));
        assert_eq!(AdminRequest::get_as::<Op>().as_deref(), Some(&Op("second")));
        AdminRequest::abort();
        assert!(!AdminRequest::is_active());
    }

    #[test]
    fn test_get_as_wrong_type() {
        AdminRequest::scope(42_u32, || {
            assert!(AdminRequest::is_active());
            assert!(AdminRequest::get_as::<Op>().is_none());
            assert_eq!(AdminRequest::get_as::<u32>().as_deref(), Some(&42));
        });
        assert!(!AdminRequest::is_active());
    }

    #[test]
    fn test_guard_clears_on_panic() {
        let result = panic::catch_unwind(|| {
            let _guard = AdminRequest::enter(Op("boom"));
            panic!("operation failed");
        });
        assert!(result.is_err());
        assert!(AdminRequest::get().is_none());
    }

    #[test]
    fn test_threads_are_isolated() {
        let barrier = Arc::new(Barrier::new(2));

        let a = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                let _guard = AdminRequest::enter(Op("a"));
                barrier.wait();
                barrier.wait();
                AdminRequest::get_as::<Op>().map(|op| op.0)
            })
        };
        let b = {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let seen = AdminRequest::get();
                barrier.wait();
                seen.is_none()
            })
        };

        assert_eq!(a.join().unwrap(), Some("a"));
        assert!(b.join().unwrap());
    }

    #[test]
    fn test_reused_thread_does_not_leak() {
        let (tx, rx) = mpsc::channel::<Box<dyn FnOnce() -> bool + Send>>();
        let (result_tx, result_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            for job in rx {
                let outcome = panic::catch_unwind(panic::AssertUnwindSafe(job)).unwrap_or(false);
                result_tx.send(outcome).unwrap();
            }
        });

        tx.send(Box::new(|| AdminRequest::scope(Op("job-1"), AdminRequest::is_active)))
        .unwrap();
        tx.send(Box::new(|| -> bool {
            let _guard = AdminRequest::enter(Op("job-2"));
            panic!("job 2 failed")
        }))
        .unwrap();
        tx.send(Box::new(|| AdminRequest::get().is_none())).unwrap();
        drop(tx);

        let results: Vec<bool> = result_rx.iter().collect();
        worker.join().unwrap();
        assert_eq!(results, vec![true, false, true]);
    }
}
