//! Process creation.
//!
//! `process_execute` runs in the parent; `start_process` runs in the new
//! thread. The two meet over an `ExecInfo`: the parent sleeps on the
//! load-done semaphore until the child has either loaded its executable or
//! given up, and on success links the child's wait-status record into its
//! children list.

use super::task::{self, IntrFrame};
use super::{ProcessBuilder, ThreadBuilder, ThreadName, WaitStatus};
use crate::prelude::*;
use crate::sync::Semaphore;
use crate::vm::page_dir;

mod init_stack;
mod load_elf;

pub(super) use self::init_stack::push;

/// Shared between `process_execute` in the parent and `start_process` in
/// the child.
struct ExecInfo {
    cmd_line: String,
    /// Upped when loading is complete, successfully or not.
    load_done: Semaphore,
    /// The child's wait-status record, for the parent to adopt.
    wait_status: Mutex<Option<Arc<WaitStatus>>>,
    success: AtomicBool,
}

/// Extracts the program name: the leading space-delimited token.
fn program_name(cmd_line: &str) -> &str {
    cmd_line.trim_start_matches(' ').split(' ').next().unwrap_or("")
}

/// Spawns a thread running the user program named by the leading token of
/// `cmd_line`. The thread may be scheduled, and may even exit, before this
/// returns. Returns the new process's pid.
pub fn process_execute(cmd_line: &str) -> Result<pid_t> {
    let exec = Arc::new(ExecInfo {
        cmd_line: cmd_line.to_string(),
        load_done: Semaphore::new(0),
        wait_status: Mutex::new(None),
        success: AtomicBool::new(false),
    });

    let new_thread = ThreadBuilder::new()
        .name(ThreadName::new(program_name(cmd_line)))
        .build()?;
    let new_pid = new_thread.tid();

    let exec2 = exec.clone();
    task::spawn(new_thread, move || start_process(&exec2))?;

    exec.load_done.down();
    if !exec.success.load(Ordering::Acquire) {
        return_errno!(ENOEXEC, "child failed to load");
    }

    let wait_status = exec
        .wait_status
        .lock()
        .unwrap()
        .take()
        .expect("a successful child published its wait status");
    let parent = current!().process();
    parent.children().lock().unwrap().push(wait_status);

    Ok(new_pid)
}

/// Thread body that builds the PCB, loads the executable and drops to user
/// mode.
fn start_process(exec: &ExecInfo) {
    let thread = current!();

    let loaded: Result<IntrFrame> = (|| {
        // The PCB is attached before anything else so that an activation
        // from this point on sees it; its page directory starts out unset,
        // which activates the kernel-only directory.
        let process = ProcessBuilder::new(&thread).build()?;
        thread.set_process(process.clone());
        let main_join_status = process
            .thread_table()
            .find_join_status(thread.tid())
            .expect("the builder created main's join status");
        thread.set_join_status(main_join_status);

        let wait_status = Arc::new(WaitStatus::new(thread.tid()));
        process.set_wait_status(wait_status.clone());
        *exec.wait_status.lock().unwrap() = Some(wait_status);

        let mut frame = IntrFrame::new_user();
        load_elf::load(&exec.cmd_line, &process, &mut frame)?;
        Ok(frame)
    })();

    match loaded {
        Ok(frame) => {
            exec.success.store(true, Ordering::Release);
            exec.load_done.up();
            task::exec_user(frame)
        }
        Err(e) => {
            debug!("process load failed: {}", e);
            // Unwind in reverse order: detach the half-built PCB first so
            // nothing can activate its directory, then let the references
            // go. The parent sees `success == false` and drops the
            // wait-status record with the ExecInfo.
            if let Some(process) = thread.clear_process() {
                if let Some(pagedir) = process.take_pagedir() {
                    page_dir::activate(None);
                    pagedir.destroy();
                }
                // Close the executable without the file-system lock: an
                // exec-ing parent holds that lock while it sleeps on
                // load-done, which this path has not signaled yet.
                drop(process.take_bin_file());
            }
            exec.success.store(false, Ordering::Release);
            exec.load_done.up();
            task::thread_exit()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_token_is_the_program_name() {
        assert_eq!(program_name("echo hello world"), "echo");
        assert_eq!(program_name("  echo  x"), "echo");
        assert_eq!(program_name("echo"), "echo");
        assert_eq!(program_name(""), "");
    }
}
