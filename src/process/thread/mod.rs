//! Threads.
//!
//! A `Thread` is the kernel-side identity of one flow of control. The
//! process behind it, its join-status record and its user stack are
//! attached as the thread works through its lifecycle; all three are gone
//! again by the time the thread dies.

use std::fmt;

use super::{JoinStatus, ProcessRef};
use crate::prelude::*;
use crate::vm::FrameRef;

pub use self::builder::ThreadBuilder;
pub use self::id::ThreadId;
pub use self::name::ThreadName;

mod builder;
mod id;
mod name;

pub struct Thread {
    // Immutable
    tid: ThreadId,
    // Mutable
    name: RwLock<ThreadName>,
    inner: Mutex<ThreadInner>,
    // The process this thread belongs to. Mutated only by the owning
    // thread: set before any of the process's state can be observed
    // through this thread, cleared before the process storage goes away.
    process: RwLock<Option<ProcessRef>>,
    join_status: Mutex<Option<Arc<JoinStatus>>>,
    stack: Mutex<Option<UserStack>>,
}

/// A user stack page: the frame, the user address it is mapped at, and the
/// offset slot that address was derived from.
#[derive(Debug, Clone)]
pub struct UserStack {
    pub kpage: FrameRef,
    pub upage: u32,
    pub slot: usize,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ThreadStatus {
    Init,
    Running,
    Exited,
}

impl Thread {
    pub fn tid(&self) -> pid_t {
        self.tid.as_u32()
    }

    pub fn name(&self) -> ThreadName {
        self.name.read().unwrap().clone()
    }

    pub fn status(&self) -> ThreadStatus {
        self.inner.lock().unwrap().status()
    }

    /// The owning process. Panics when the thread has none; every thread
    /// that executes user code or system calls does.
    pub fn process(&self) -> ProcessRef {
        self.try_process()
            .expect("thread has no process attached")
    }

    pub fn try_process(&self) -> Option<ProcessRef> {
        self.process.read().unwrap().clone()
    }

    pub fn set_process(&self, process: ProcessRef) {
        *self.process.write().unwrap() = Some(process);
    }

    /// Detaches the process, returning the last handle through this
    /// thread. The caller drops it only after the teardown ordering of
    /// `process_exit` is complete.
    pub fn clear_process(&self) -> Option<ProcessRef> {
        self.process.write().unwrap().take()
    }

    pub fn join_status(&self) -> Option<Arc<JoinStatus>> {
        self.join_status.lock().unwrap().clone()
    }

    pub fn set_join_status(&self, join_status: Arc<JoinStatus>) {
        *self.join_status.lock().unwrap() = Some(join_status);
    }

    pub fn user_stack(&self) -> Option<UserStack> {
        self.stack.lock().unwrap().clone()
    }

    pub fn set_user_stack(&self, stack: UserStack) {
        *self.stack.lock().unwrap() = Some(stack);
    }

    pub fn take_user_stack(&self) -> Option<UserStack> {
        self.stack.lock().unwrap().take()
    }

    pub(super) fn start(&self) {
        self.inner.lock().unwrap().start();
    }

    pub(super) fn exit(&self) {
        self.inner.lock().unwrap().exit();
    }
}

impl PartialEq for Thread {
    fn eq(&self, other: &Self) -> bool {
        self.tid() == other.tid()
    }
}

// Process and Thread refer to each other, so a derived Debug would
// recurse without bound.
impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("tid", &self.tid())
            .field("name", &self.name())
            .field("status", &self.status())
            .finish()
    }
}

#[derive(Debug)]
enum ThreadInner {
    Init,
    Running,
    Exited,
}

impl ThreadInner {
    fn new() -> Self {
        Self::Init
    }

    fn status(&self) -> ThreadStatus {
        match self {
            Self::Init => ThreadStatus::Init,
            Self::Running => ThreadStatus::Running,
            Self::Exited => ThreadStatus::Exited,
        }
    }

    fn start(&mut self) {
        debug_assert!(self.status() == ThreadStatus::Init);
        *self = Self::Running;
    }

    fn exit(&mut self) {
        *self = Self::Exited;
    }
}

impl Thread {
    pub(super) fn new(tid: ThreadId, name: ThreadName) -> Self {
        Self {
            tid,
            name: RwLock::new(name),
            inner: Mutex::new(ThreadInner::new()),
            process: RwLock::new(None),
            join_status: Mutex::new(None),
            stack: Mutex::new(None),
        }
    }
}
