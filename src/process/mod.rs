//! Processes and user threads.
//!
//! A process is a set of user threads sharing one address space, one file
//! descriptor table and one table of user-visible synchronization objects.
//! The process's pid is the tid of its main thread.

use crate::prelude::*;

pub use self::do_exit::process_exit;
pub use self::do_pthread::{pthread_execute, pthread_exit, pthread_exit_main, pthread_join};
pub use self::do_spawn::process_execute;
pub use self::do_wait::process_wait;
pub use self::join_status::JoinStatus;
pub use self::process::{Process, ProcessBuilder, ThreadTable, UserThreadEntry};
pub use self::thread::{Thread, ThreadBuilder, ThreadId, ThreadName, ThreadStatus, UserStack};
pub use self::wait_status::WaitStatus;

pub mod current;
mod do_exit;
mod do_pthread;
mod do_spawn;
mod do_wait;
mod join_status;
mod process;
pub mod syscalls;
pub mod task;
mod thread;
pub mod user_sync;
mod wait_status;

#[allow(non_camel_case_types)]
pub type pid_t = u32;

pub type ProcessRef = Arc<Process>;
pub type ThreadRef = Arc<Thread>;

/// Turns the calling host thread into a kernel thread with a minimal
/// process behind it, so that it can spawn user programs and wait for
/// them. Idempotent per thread.
///
/// This is the bootstrap the kernel main thread performs before running
/// the first user program; the minimal process needs little more than a
/// children list.
pub fn init_kernel_thread() -> ThreadRef {
    if let Some(thread) = current::try_get() {
        return thread;
    }
    let thread = ThreadBuilder::new()
        .name(ThreadName::new("main"))
        .build()
        .expect("kernel thread bootstrap cannot fail");
    let process = ProcessBuilder::new(&thread)
        .build()
        .expect("kernel process bootstrap cannot fail");
    thread.set_process(process);
    current::set(thread.clone());
    thread
}

/// Sets up the CPU side of the current thread's address space: its page
/// directory if it has one, otherwise the kernel-only directory. Runs on
/// every entry to user code, mirroring the per-context-switch activation.
pub fn process_activate() {
    let thread = current!();
    let pagedir = thread.try_process().and_then(|process| process.pagedir());
    crate::vm::page_dir::activate(pagedir.as_ref());
}
