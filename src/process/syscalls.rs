//! Process-related system call implementations.
//!
//! Thin marshalling over the lifecycle operations: user failures become
//! -1 in the return register at the dispatch layer; these bodies only
//! surface errors.

use super::{
    process_execute, process_wait, pthread_execute, pthread_exit, pthread_exit_main, pthread_join,
};
use crate::fs::fs_lock;
use crate::prelude::*;
use crate::util::mem_util::copy_cstring_from_user;

/// `exec(path)`: the command line is copied in from user memory before
/// anything else can fail.
pub fn do_exec(cmd_line_uaddr: u32) -> Result<i32> {
    let cmd_line = copy_cstring_from_user(cmd_line_uaddr)?;
    debug!("exec: {:?}", cmd_line);
    let guard = fs_lock();
    let result = process_execute(&cmd_line);
    drop(guard);
    match result {
        Ok(pid) => Ok(pid as i32),
        Err(_) => Ok(-1),
    }
}

/// `wait(pid)`.
pub fn do_wait(pid: pid_t) -> Result<i32> {
    match process_wait(pid) {
        Ok(exit_code) => Ok(exit_code),
        Err(_) => Ok(-1),
    }
}

/// `exit(code)`: stores the exit code, then leaves through the thread
/// exit paths. A non-main thread marks the process exiting and only takes
/// itself down; the main thread winds up the whole process.
pub fn do_exit(exit_code: i32) -> ! {
    let thread = current!();
    let process = thread.process();
    if let Some(wait_status) = process.wait_status() {
        wait_status.set_exit_code(exit_code);
    }
    if process.is_main_thread(&thread) {
        drop(process);
        pthread_exit_main()
    } else {
        process.set_exiting();
        drop(process);
        pthread_exit()
    }
}

/// `pt_create(stub, fn, arg)`.
pub fn do_pt_create(sfun: u32, tfun: u32, arg: u32) -> Result<i32> {
    match pthread_execute(sfun, tfun, arg) {
        Ok(tid) => Ok(tid as i32),
        Err(_) => Ok(-1),
    }
}

/// `pt_exit()`.
pub fn do_pt_exit() -> ! {
    pthread_exit()
}

/// `pt_join(tid)`.
pub fn do_pt_join(tid: pid_t) -> Result<i32> {
    match pthread_join(tid) {
        Ok(tid) => Ok(tid as i32),
        Err(_) => Ok(-1),
    }
}

/// `get_tid()`.
pub fn do_get_tid() -> Result<i32> {
    Ok(current!().tid() as i32)
}
