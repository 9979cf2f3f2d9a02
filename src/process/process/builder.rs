use super::super::{ThreadRef, WaitStatus};
use super::thread_table::ThreadTable;
use super::Process;
use crate::fs::FileTable;
use crate::prelude::*;
use crate::process::ProcessRef;

/// Builds a PCB around its main thread.
///
/// The new process starts with no page directory, so an activation racing
/// with construction lands on the kernel-only directory; the loader
/// installs the real one later. The main thread's user-thread entry and
/// join-status record are created here, with the thread counter at 1 and
/// stack slots 0 and 1 already taken.
#[derive(Debug)]
pub struct ProcessBuilder {
    main_thread: ThreadRef,
    wait_status: Option<Arc<WaitStatus>>,
}

impl ProcessBuilder {
    pub fn new(main_thread: &ThreadRef) -> Self {
        Self {
            main_thread: main_thread.clone(),
            wait_status: None,
        }
    }

    pub fn wait_status(mut self, wait_status: Arc<WaitStatus>) -> Self {
        self.wait_status = Some(wait_status);
        self
    }

    pub fn build(self) -> Result<ProcessRef> {
        let pid = self.main_thread.tid();
        let name = self.main_thread.name();
        let threads = ThreadTable::new(pid, Arc::downgrade(&self.main_thread));

        Ok(Arc::new(Process {
            pid,
            name,
            main_thread: Arc::downgrade(&self.main_thread),
            pagedir: RwLock::new(None),
            bin_file: Mutex::new(None),
            image: RwLock::new(None),
            wait_status: RwLock::new(self.wait_status),
            children: Mutex::new(Vec::new()),
            files: Mutex::new(FileTable::new()),
            threads: Mutex::new(threads),
            exiting: AtomicBool::new(false),
        }))
    }
}
