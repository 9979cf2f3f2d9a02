//! User-visible locks and semaphores.
//!
//! User code names these objects by a one-byte handle it keeps in its own
//! memory: the slot index in one of the process's two 256-entry tables.
//! Slot allocation and ownership records live under the process thread
//! lock; the blocking operations themselves run with that lock released,
//! so one user lock being contended never stalls the whole table.
//!
//! Failures are reported as `false` to the caller; only an unreadable or
//! unwritable handle pointer is fatal, like any other bad user pointer.

use crate::prelude::*;
use crate::sync::{KLock, Semaphore};
use crate::util::mem_util::{copy_byte_from_user, copy_byte_to_user};

/// `lock_init(&h)`: claims the first uninitialized lock slot, records the
/// creator as its owner and writes the slot index through `h`.
pub fn do_lock_init(handle_uaddr: u32) -> Result<bool> {
    if handle_uaddr == 0 {
        return Ok(false);
    }
    let thread = current!();
    let process = thread.process();

    let slot = {
        let mut table = process.thread_table();
        let slot = match table.locks.iter().position(|s| !s.initialized) {
            Some(slot) => slot,
            None => return Ok(false),
        };
        let lock_slot = &mut table.locks[slot];
        lock_slot.initialized = true;
        lock_slot.holder = thread.tid();
        lock_slot.lock = Some(Arc::new(KLock::new()));
        slot
    };
    copy_byte_to_user(handle_uaddr, slot as u8)?;
    Ok(true)
}

/// `lock_acquire(&h)`: blocks until the lock is free. Fails on a null or
/// uninitialized handle, or when the caller already holds the lock.
pub fn do_lock_acquire(handle_uaddr: u32) -> Result<bool> {
    if handle_uaddr == 0 {
        return Ok(false);
    }
    let thread = current!();
    let process = thread.process();
    let slot = copy_byte_from_user(handle_uaddr)? as usize;

    let lock = {
        let table = process.thread_table();
        let lock_slot = &table.locks[slot];
        if !lock_slot.initialized {
            return Ok(false);
        }
        lock_slot.lock.clone().unwrap()
    };
    if lock.held_by(thread.tid()) {
        return Ok(false);
    }
    // Block outside the process thread lock; the holder needs it to get
    // back out.
    lock.acquire(thread.tid());

    let mut table = process.thread_table();
    table.locks[slot].holder = thread.tid();
    Ok(true)
}

/// `lock_release(&h)`: fails unless the caller owns the lock.
pub fn do_lock_release(handle_uaddr: u32) -> Result<bool> {
    if handle_uaddr == 0 {
        return Ok(false);
    }
    let thread = current!();
    let process = thread.process();
    let slot = copy_byte_from_user(handle_uaddr)? as usize;

    let lock = {
        let table = process.thread_table();
        let lock_slot = &table.locks[slot];
        if !lock_slot.initialized || lock_slot.holder != thread.tid() {
            return Ok(false);
        }
        lock_slot.lock.clone().unwrap()
    };
    if !lock.release(thread.tid()) {
        return Ok(false);
    }

    let mut table = process.thread_table();
    table.locks[slot].holder = 0;
    Ok(true)
}

/// `sema_init(&h, val)`: claims the first uninitialized semaphore slot
/// with initial value `val` and writes the slot index through `h`.
pub fn do_sema_init(handle_uaddr: u32, val: i32) -> Result<bool> {
    if handle_uaddr == 0 || val < 0 {
        return Ok(false);
    }
    let process = current!().process();

    let slot = {
        let mut table = process.thread_table();
        let slot = match table.semaphores.iter().position(|s| !s.initialized) {
            Some(slot) => slot,
            None => return Ok(false),
        };
        let sema_slot = &mut table.semaphores[slot];
        sema_slot.initialized = true;
        sema_slot.sema = Some(Arc::new(Semaphore::new(val as usize)));
        slot
    };
    copy_byte_to_user(handle_uaddr, slot as u8)?;
    Ok(true)
}

fn lookup_sema(handle_uaddr: u32) -> Result<Option<Arc<Semaphore>>> {
    if handle_uaddr == 0 {
        return Ok(None);
    }
    let process = current!().process();
    let slot = copy_byte_from_user(handle_uaddr)? as usize;
    let table = process.thread_table();
    let sema_slot = &table.semaphores[slot];
    if !sema_slot.initialized {
        return Ok(None);
    }
    Ok(sema_slot.sema.clone())
}

/// `sema_down(&h)`: may block, with the process thread lock released.
pub fn do_sema_down(handle_uaddr: u32) -> Result<bool> {
    match lookup_sema(handle_uaddr)? {
        Some(sema) => {
            sema.down();
            Ok(true)
        }
        None => Ok(false),
    }
}

/// `sema_up(&h)`.
pub fn do_sema_up(handle_uaddr: u32) -> Result<bool> {
    match lookup_sema(handle_uaddr)? {
        Some(sema) => {
            sema.up();
            Ok(true)
        }
        None => Ok(false),
    }
}
