//! Primitive synchronization objects.
//!
//! These are the thread-level semaphore and lock the rest of the subsystem
//! builds on. The counted semaphore is a condvar over a counter; the lock
//! is a mutual-exclusion object that remembers its holder so ownership can
//! be checked without blocking.

use std::sync::{Condvar, Mutex};

use crate::process::pid_t;

/// Counting semaphore. `down` blocks while the value is zero.
#[derive(Debug)]
pub struct Semaphore {
    value: Mutex<usize>,
    cond: Condvar,
}

impl Semaphore {
    pub fn new(value: usize) -> Self {
        Self {
            value: Mutex::new(value),
            cond: Condvar::new(),
        }
    }

    pub fn down(&self) {
        let mut value = self.value.lock().unwrap();
        while *value == 0 {
            value = self.cond.wait(value).unwrap();
        }
        *value -= 1;
    }

    pub fn up(&self) {
        let mut value = self.value.lock().unwrap();
        *value += 1;
        self.cond.notify_one();
    }

    pub fn value(&self) -> usize {
        *self.value.lock().unwrap()
    }
}

/// Mutual-exclusion lock with an owner record.
///
/// Unlike a host mutex, the guard is not lexically scoped: user code
/// acquires and releases through system calls, possibly far apart and on
/// different control paths. The holder is tracked by thread id.
#[derive(Debug)]
pub struct KLock {
    holder: Mutex<Option<pid_t>>,
    cond: Condvar,
}

impl KLock {
    pub fn new() -> Self {
        Self {
            holder: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Blocks until the lock is free, then takes it for `tid`.
    ///
    /// The caller must not already hold the lock.
    pub fn acquire(&self, tid: pid_t) {
        let mut holder = self.holder.lock().unwrap();
        debug_assert!(*holder != Some(tid));
        while holder.is_some() {
            holder = self.cond.wait(holder).unwrap();
        }
        *holder = Some(tid);
    }

    /// Releases the lock held by `tid`. Returns false if `tid` is not the
    /// holder.
    pub fn release(&self, tid: pid_t) -> bool {
        let mut holder = self.holder.lock().unwrap();
        if *holder != Some(tid) {
            return false;
        }
        *holder = None;
        self.cond.notify_one();
        true
    }

    pub fn held_by(&self, tid: pid_t) -> bool {
        *self.holder.lock().unwrap() == Some(tid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn sema_up_before_down() {
        let sema = Semaphore::new(0);
        sema.up();
        sema.down();
        assert_eq!(sema.value(), 0);
    }

    #[test]
    fn sema_rendezvous() {
        let sema = Arc::new(Semaphore::new(0));
        let sema2 = sema.clone();
        let handle = thread::spawn(move || sema2.down());
        sema.up();
        handle.join().unwrap();
    }

    #[test]
    fn lock_hand_off() {
        let lock = Arc::new(KLock::new());
        lock.acquire(1);
        assert!(lock.held_by(1));
        assert!(!lock.release(2));
        let lock2 = lock.clone();
        let contender = thread::spawn(move || {
            lock2.acquire(2);
            lock2.release(2)
        });
        assert!(lock.release(1));
        assert!(contender.join().unwrap());
    }
}
