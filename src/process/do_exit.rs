//! Process teardown.

use crate::fs::console;
use crate::prelude::*;
use crate::vm::page_dir;

use super::task;

/// Releases every resource of the current process and terminates the
/// calling thread. This is the single exit funnel: voluntary exits arrive
/// here through the exit system calls, kernel-imposed deaths (bad user
/// pointer, bad syscall, fault) come straight in with the exit code still
/// at its default of -1.
pub fn process_exit() -> ! {
    let thread = current!();
    let process = match thread.try_process() {
        Some(process) => process,
        // A thread without a process has nothing to release.
        None => task::thread_exit(),
    };

    // Close the executable, re-allowing writes to it.
    if let Some(bin_file) = process.take_bin_file() {
        crate::fs::safe_file_close(bin_file);
    }

    // Drop this process's reference to each child's wait status. A child
    // both parents have released disappears here.
    process.children().lock().unwrap().clear();

    // Free the join-status list and the user-thread table wholesale. The
    // stack frames behind the entries go with the address space below.
    process.thread_table().clear_for_exit();

    // Close whatever file descriptors are still open.
    let handles = {
        let files = process.files().lock().unwrap();
        files.handles()
    };
    for handle in handles {
        let _ = crate::fs::syscalls::do_close(handle);
    }

    // Destroy the address space. The order is load-bearing: the directory
    // is detached from the PCB first so a mid-teardown activation cannot
    // find it, then the kernel-only directory is activated, and only then
    // is the directory destroyed.
    if let Some(pagedir) = process.take_pagedir() {
        page_dir::activate(None);
        pagedir.destroy();
    }

    // Tell the parent, as the last thing we do. The exit code is settled
    // before the dead signal, so the parent's wait reads a final value.
    if let Some(wait_status) = process.take_wait_status() {
        console::print_fmt(format_args!(
            "{}: exit({})\n",
            process.name(),
            wait_status.exit_code()
        ));
        wait_status.mark_dead();
    }

    // Detach the PCB from the thread before the storage goes away, for
    // the same reason the page directory was detached first.
    drop(process);
    let pcb = thread.clear_process();
    drop(pcb);

    task::thread_exit()
}
