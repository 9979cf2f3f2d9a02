//! The process control block.
//!
//! Everything a process owns hangs off this one structure: address space,
//! executable, descriptor table, children, and the thread-table domain
//! that the process thread lock guards as a unit.

use std::fmt;

use super::{ThreadName, ThreadRef, WaitStatus};
use crate::fs::{FileRef, FileTable};
use crate::prelude::*;
use crate::process::task::UserImageRef;
use crate::vm::PageDirRef;

pub use self::builder::ProcessBuilder;
pub use self::thread_table::{ThreadTable, UserThreadEntry, MAIN_STACK_SLOT, NUM_SLOTS};

mod builder;
mod thread_table;

pub struct Process {
    // Immutable
    pid: pid_t,
    name: ThreadName,
    main_thread: Weak<super::Thread>,
    // Address space. The pointer is detached before the directory is
    // destroyed; see `process_exit` for the ordering.
    pagedir: RwLock<Option<PageDirRef>>,
    // The executable, held open with writes denied for the process's
    // lifetime, and its simulated text.
    bin_file: Mutex<Option<FileRef>>,
    image: RwLock<Option<UserImageRef>>,
    // Rendezvous records
    wait_status: RwLock<Option<Arc<WaitStatus>>>,
    children: Mutex<Vec<Arc<WaitStatus>>>,
    // Owned by the syscall layer
    files: Mutex<FileTable>,
    // The process thread lock and everything beneath it
    threads: Mutex<ThreadTable>,
    exiting: AtomicBool,
}

impl Process {
    /// A process's pid is its main thread's tid.
    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn name(&self) -> &ThreadName {
        &self.name
    }

    pub fn main_thread(&self) -> Option<ThreadRef> {
        self.main_thread.upgrade()
    }

    pub fn is_main_thread(&self, thread: &ThreadRef) -> bool {
        thread.tid() == self.pid
    }

    pub fn pagedir(&self) -> Option<PageDirRef> {
        self.pagedir.read().unwrap().clone()
    }

    pub fn set_pagedir(&self, pagedir: PageDirRef) {
        *self.pagedir.write().unwrap() = Some(pagedir);
    }

    /// Detaches the page directory from the PCB. Teardown activates the
    /// kernel directory before destroying what this returns.
    pub fn take_pagedir(&self) -> Option<PageDirRef> {
        self.pagedir.write().unwrap().take()
    }

    pub fn set_bin_file(&self, file: FileRef) {
        *self.bin_file.lock().unwrap() = Some(file);
    }

    pub fn take_bin_file(&self) -> Option<FileRef> {
        self.bin_file.lock().unwrap().take()
    }

    pub fn image(&self) -> Option<UserImageRef> {
        self.image.read().unwrap().clone()
    }

    pub fn set_image(&self, image: Option<UserImageRef>) {
        *self.image.write().unwrap() = image;
    }

    pub fn wait_status(&self) -> Option<Arc<WaitStatus>> {
        self.wait_status.read().unwrap().clone()
    }

    pub fn set_wait_status(&self, wait_status: Arc<WaitStatus>) {
        *self.wait_status.write().unwrap() = Some(wait_status);
    }

    pub fn take_wait_status(&self) -> Option<Arc<WaitStatus>> {
        self.wait_status.write().unwrap().take()
    }

    /// Wait-status records of children not yet waited for.
    pub fn children(&self) -> &Mutex<Vec<Arc<WaitStatus>>> {
        &self.children
    }

    pub fn files(&self) -> &Mutex<FileTable> {
        &self.files
    }

    /// Takes the process thread lock, giving access to the user-thread
    /// table, the join-status list, the sync-object tables and the
    /// stack-offset bitmap. Nothing beneath this guard may block, except
    /// where the lifecycle code documents that it drops the guard first.
    pub fn thread_table(&self) -> MutexGuard<'_, ThreadTable> {
        self.threads.lock().unwrap()
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting.load(Ordering::Acquire)
    }

    pub fn set_exiting(&self) {
        self.exiting.store(true, Ordering::Release);
    }
}

// Process and Thread refer to each other, so a derived Debug would
// recurse without bound.
impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid())
            .field("name", &self.name)
            .field(
                "children",
                &self
                    .children
                    .lock()
                    .unwrap()
                    .iter()
                    .map(|ws| ws.pid())
                    .collect::<Vec<pid_t>>(),
            )
            .field("exiting", &self.is_exiting())
            .finish()
    }
}
