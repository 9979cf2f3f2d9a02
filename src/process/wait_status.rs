//! The parent/child rendezvous record.
//!
//! One record is shared between exactly two owners: the parent (through
//! its children list) and the child (through its PCB). Each side holds a
//! strong reference and the storage goes away when the second side drops
//! theirs, so there is no separate reference count to maintain.

use crate::prelude::*;
use crate::sync::Semaphore;

#[derive(Debug)]
pub struct WaitStatus {
    pid: pid_t,
    /// The child's exit code. -1 until the child says otherwise, so a
    /// kernel-imposed death reports -1 without any extra bookkeeping.
    exit_code: Mutex<i32>,
    /// Signaled exactly once, when the child is dead. The exit code is
    /// stored strictly before the signal, so a parent that consumed the
    /// signal reads a settled value.
    dead: Semaphore,
}

impl WaitStatus {
    pub fn new(pid: pid_t) -> Self {
        Self {
            pid,
            exit_code: Mutex::new(-1),
            dead: Semaphore::new(0),
        }
    }

    pub fn pid(&self) -> pid_t {
        self.pid
    }

    pub fn exit_code(&self) -> i32 {
        *self.exit_code.lock().unwrap()
    }

    pub fn set_exit_code(&self, exit_code: i32) {
        *self.exit_code.lock().unwrap() = exit_code;
    }

    /// Child side: announce death. Runs after the exit code is final.
    pub fn mark_dead(&self) {
        self.dead.up();
    }

    /// Parent side: block until the child is dead, consuming the signal.
    pub fn wait_dead(&self) {
        self.dead.down();
    }
}
