//! The thread/joiner rendezvous record.
//!
//! Mirrors [`super::WaitStatus`] at thread granularity: the thread holds
//! one strong reference, the process's join-status list holds the other,
//! and a successful joiner takes over the list's reference until it has
//! consumed the completion signal.

use crate::prelude::*;
use crate::sync::Semaphore;

#[derive(Debug)]
pub struct JoinStatus {
    tid: pid_t,
    /// Set under the process thread lock by the one joiner that claims
    /// this record; later joiners see it and fail.
    waited_on: AtomicBool,
    sema: Semaphore,
}

impl JoinStatus {
    pub fn new(tid: pid_t) -> Self {
        Self {
            tid,
            waited_on: AtomicBool::new(false),
            sema: Semaphore::new(0),
        }
    }

    pub fn tid(&self) -> pid_t {
        self.tid
    }

    pub fn waited_on(&self) -> bool {
        self.waited_on.load(Ordering::Acquire)
    }

    pub fn set_waited_on(&self) {
        self.waited_on.store(true, Ordering::Release);
    }

    /// Thread side: announce completion. Happens-after every effect of the
    /// thread, so the joiner observes all of them.
    pub fn mark_done(&self) {
        self.sema.up();
    }

    /// Joiner side: block until the thread is done.
    pub fn wait_done(&self) {
        self.sema.down();
    }
}
