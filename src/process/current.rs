//! The current thread, as task-local state.
//!
//! Set once when a task starts on a host thread (or when the embedder
//! bootstraps itself with [`super::init_kernel_thread`]) and cleared when
//! the task dies; never nullable in between.

use std::cell::RefCell;

use super::ThreadRef;

thread_local! {
    static CURRENT: RefCell<Option<ThreadRef>> = RefCell::new(None);
}

/// The thread the kernel currently executes on behalf of.
pub fn get() -> ThreadRef {
    try_get().expect("no current thread; this host thread is not a kernel thread")
}

pub fn try_get() -> Option<ThreadRef> {
    CURRENT.with(|current| current.borrow().clone())
}

pub(super) fn set(new_current: ThreadRef) {
    CURRENT.with(|current| {
        let mut current = current.borrow_mut();
        debug_assert!(current.is_none());
        *current = Some(new_current);
    });
}

pub(super) fn reset() {
    CURRENT.with(|current| {
        *current.borrow_mut() = None;
    });
}
