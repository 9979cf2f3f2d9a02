//! Parent waits for child.

use crate::prelude::*;

/// Waits for the child `child_pid` to die and returns its exit code.
///
/// The record is removed from the children list before blocking, so a
/// second wait on the same pid fails immediately instead of blocking, as
/// does a wait on a pid that was never this process's child.
pub fn process_wait(child_pid: pid_t) -> Result<i32> {
    let process = current!().process();

    let wait_status = {
        let mut children = process.children().lock().unwrap();
        let i = children
            .iter()
            .position(|ws| ws.pid() == child_pid)
            .ok_or_else(|| errno!(ECHILD, "not an unwaited child of this process"))?;
        children.remove(i)
    };

    wait_status.wait_dead();
    let exit_code = wait_status.exit_code();
    debug!("waited child {}: exit code = {}", child_pid, exit_code);
    // Dropping the record releases the parent-side reference; the storage
    // goes when the child's side is gone too.
    Ok(exit_code)
}
