//! The thread-table domain of a process.
//!
//! One mutex (the *process thread lock*) guards this whole structure: the
//! user-thread entries, the join-status list, both user sync-object
//! tables, the stack-offset bitmap and the thread naming counter. Keeping
//! them in one guarded value makes the locking discipline a type-level
//! fact rather than a convention.

use bitvec::prelude::*;

use super::super::{JoinStatus, Thread};
use crate::prelude::*;
use crate::sync::{KLock, Semaphore};

/// Number of stack-offset slots, and also the size of each user
/// sync-object table. Slot `i` names the user page at
/// `PHYS_BASE - i * PAGE_SIZE`.
pub const NUM_SLOTS: usize = 256;

/// The main thread's stack lives in offset slot 1; slot 0 would sit on
/// `PHYS_BASE` itself and is unusable.
pub const MAIN_STACK_SLOT: usize = 1;

/// One live user thread, keyed by tid. The table owns the entry; the
/// thread keeps only a weak handle back (and vice versa), so neither side
/// can keep the other alive.
#[derive(Debug)]
pub struct UserThreadEntry {
    pub tid: pid_t,
    pub thread: Weak<Thread>,
    pub waited_on: bool,
    pub completed: bool,
    pub initialized: bool,
    pub kpage: Option<crate::vm::FrameRef>,
    pub upage: Option<u32>,
}

impl UserThreadEntry {
    fn new(tid: pid_t, thread: Weak<Thread>) -> Self {
        Self {
            tid,
            thread,
            waited_on: false,
            completed: false,
            initialized: false,
            kpage: None,
            upage: None,
        }
    }
}

/// A user-visible lock slot. `holder` starts as the creator's tid.
#[derive(Debug, Default)]
pub struct UserLockSlot {
    pub initialized: bool,
    pub holder: pid_t,
    pub lock: Option<Arc<KLock>>,
}

/// A user-visible semaphore slot.
#[derive(Debug, Default)]
pub struct UserSemaSlot {
    pub initialized: bool,
    pub sema: Option<Arc<Semaphore>>,
}

pub struct ThreadTable {
    entries: Vec<UserThreadEntry>,
    join_statuses: Vec<Arc<JoinStatus>>,
    pub(in crate::process) locks: Vec<UserLockSlot>,
    pub(in crate::process) semaphores: Vec<UserSemaSlot>,
    stack_slots: BitArr!(for NUM_SLOTS, in u32, Lsb0),
    user_thread_counter: u32,
}

impl ThreadTable {
    pub(super) fn new(main_tid: pid_t, main_thread: Weak<Thread>) -> Self {
        let mut stack_slots = bitarr![u32, Lsb0; 0; NUM_SLOTS];
        stack_slots.set(0, true);
        stack_slots.set(MAIN_STACK_SLOT, true);

        let mut main_entry = UserThreadEntry::new(main_tid, main_thread);
        main_entry.initialized = true;

        Self {
            entries: vec![main_entry],
            join_statuses: vec![Arc::new(JoinStatus::new(main_tid))],
            locks: (0..NUM_SLOTS).map(|_| UserLockSlot::default()).collect(),
            semaphores: (0..NUM_SLOTS).map(|_| UserSemaSlot::default()).collect(),
            stack_slots,
            user_thread_counter: 1,
        }
    }

    // User-thread entries

    pub fn get_entry(&self, tid: pid_t) -> Option<&UserThreadEntry> {
        self.entries.iter().find(|entry| entry.tid == tid)
    }

    pub fn get_entry_mut(&mut self, tid: pid_t) -> Option<&mut UserThreadEntry> {
        self.entries.iter_mut().find(|entry| entry.tid == tid)
    }

    /// Adds an entry for `tid` unless one exists. Both the spawner and the
    /// spawned thread run this; whoever gets the lock first creates, the
    /// other updates, keeping at most one entry per tid.
    pub fn ensure_entry(&mut self, tid: pid_t, thread: Weak<Thread>) -> &mut UserThreadEntry {
        if let Some(i) = self.entries.iter().position(|entry| entry.tid == tid) {
            return &mut self.entries[i];
        }
        self.entries.push(UserThreadEntry::new(tid, thread));
        self.entries.last_mut().unwrap()
    }

    pub fn remove_entry(&mut self, tid: pid_t) -> Option<UserThreadEntry> {
        let i = self.entries.iter().position(|entry| entry.tid == tid)?;
        Some(self.entries.swap_remove(i))
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    // Join-status list

    pub fn push_join_status(&mut self, join_status: Arc<JoinStatus>) {
        self.join_statuses.push(join_status);
    }

    pub fn find_join_status(&self, tid: pid_t) -> Option<Arc<JoinStatus>> {
        self.join_statuses
            .iter()
            .find(|js| js.tid() == tid)
            .cloned()
    }

    /// Claims the join-status for `tid` on behalf of a joiner: marks it
    /// waited-on and removes it from the list, so at most one join per
    /// thread can ever succeed.
    pub fn take_join_status(&mut self, tid: pid_t) -> Option<Arc<JoinStatus>> {
        let i = self
            .join_statuses
            .iter()
            .position(|js| js.tid() == tid && !js.waited_on())?;
        let join_status = self.join_statuses.swap_remove(i);
        join_status.set_waited_on();
        Some(join_status)
    }

    /// A peer (not `self_tid`) still in the join-status list, if any.
    pub fn next_unjoined_peer(&self, self_tid: pid_t) -> Option<pid_t> {
        self.join_statuses
            .iter()
            .find(|js| js.tid() != self_tid && !js.waited_on())
            .map(|js| js.tid())
    }

    // Stack-offset bitmap

    /// Claims the lowest free offset slot. Slots 0 and 1 are permanently
    /// taken, so the result is always at least 2.
    pub fn alloc_stack_slot(&mut self) -> Result<usize> {
        let slot = self
            .stack_slots
            .iter_zeros()
            .next()
            .ok_or_else(|| errno!(ENOMEM, "no free stack slots"))?;
        self.stack_slots.set(slot, true);
        Ok(slot)
    }

    pub fn free_stack_slot(&mut self, slot: usize) {
        debug_assert!(slot > MAIN_STACK_SLOT && slot < NUM_SLOTS);
        self.stack_slots.set(slot, false);
    }

    pub fn used_stack_slots(&self) -> usize {
        self.stack_slots.count_ones()
    }

    // Thread naming counter

    /// Pre-increments and returns the per-process thread counter used to
    /// derive spawned thread names.
    pub fn next_thread_count_id(&mut self) -> u32 {
        self.user_thread_counter += 1;
        self.user_thread_counter
    }

    // Sync-object tables

    /// Returns every sync slot to the uninitialized state. Runs when the
    /// main thread winds the process down.
    pub fn reset_sync_tables(&mut self) {
        for slot in self.locks.iter_mut() {
            *slot = UserLockSlot::default();
        }
        for slot in self.semaphores.iter_mut() {
            *slot = UserSemaSlot::default();
        }
    }

    /// Drops the join-status list and every user-thread entry. The
    /// address-space teardown that follows frees the stack frames, so the
    /// entries are not unmapped one by one.
    pub fn clear_for_exit(&mut self) {
        self.join_statuses.clear();
        self.entries.clear();
    }
}

impl Debug for ThreadTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTable")
            .field("entries", &self.entries)
            .field("join_statuses", &self.join_statuses.len())
            .field("used_stack_slots", &self.used_stack_slots())
            .field("user_thread_counter", &self.user_thread_counter)
            .finish()
    }
}
