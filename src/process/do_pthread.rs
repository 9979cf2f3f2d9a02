//! User-thread lifecycle: create, join, exit.
//!
//! `pthread_execute` runs in the spawning thread, `start_pthread` in the
//! new one; they meet over a load-done semaphore like process creation
//! does. A spawned thread gets a stack page at the user address named by
//! the lowest free offset slot, a join-status record its peers can wait
//! on, and an entry in the process's user-thread table.

use super::do_spawn::push;
use super::task::{self, IntrFrame};
use super::{JoinStatus, ProcessRef, ThreadBuilder, ThreadName, UserStack};
use crate::prelude::*;
use crate::sync::Semaphore;
use crate::vm::page_alloc::{alloc_user_frame, AllocFlags};
use crate::vm::{PAGE_SIZE, PHYS_BASE};

/// Shared between `pthread_execute` and `start_pthread`.
struct PthreadArgs {
    /// User address of the stub the new thread starts in.
    sfun: u32,
    /// User function and argument the stub finds on its stack.
    tfun: u32,
    arg: u32,
    pcb: ProcessRef,
    load_done: Semaphore,
    success: AtomicBool,
}

/// Spawns a user thread running the stub `sfun` with `tfun` and `arg` on
/// its stack. The thread may be scheduled, and may even exit, before this
/// returns. Returns the new tid.
pub fn pthread_execute(sfun: u32, tfun: u32, arg: u32) -> Result<pid_t> {
    let thread = current!();
    let process = thread.process();

    let args = Arc::new(PthreadArgs {
        sfun,
        tfun,
        arg,
        pcb: process.clone(),
        load_done: Semaphore::new(0),
        success: AtomicBool::new(false),
    });

    // The counter is bumped under the process thread lock; the captured
    // value names the thread for its lifetime.
    let thread_count_id = process.thread_table().next_thread_count_id();
    let name = format!("{}-{}", process.name(), thread_count_id);

    let new_thread = ThreadBuilder::new()
        .name(ThreadName::new(&name))
        .build()?;
    let new_tid = new_thread.tid();

    let args2 = args.clone();
    task::spawn(new_thread, move || start_pthread(&args2))?;

    args.load_done.down();
    if !args.success.load(Ordering::Acquire) {
        return_errno!(EAGAIN, "thread stack setup failed");
    }

    // Whichever side gets the lock first creates the entry; the other
    // finds it already there.
    let mut table = process.thread_table();
    table.ensure_entry(new_tid, Weak::new());
    drop(table);

    Ok(new_tid)
}

/// Thread body that installs its stack and drops into the stub.
fn start_pthread(args: &PthreadArgs) {
    let thread = current!();
    thread.set_process(args.pcb.clone());

    let mut frame = IntrFrame::new_user();
    let stack = match setup_thread(args, &mut frame) {
        Ok(stack) => stack,
        Err(e) => {
            debug!("thread setup failed: {}", e);
            args.success.store(false, Ordering::Release);
            args.load_done.up();
            task::thread_exit();
        }
    };

    super::process_activate();

    // Register ourselves before releasing the spawner: user-thread entry
    // (created here or by the spawner, whoever gets the lock first), stack
    // bookkeeping, and the join-status record peers will look for. Once
    // `pthread_execute` returns, this thread is visible to joiners, so a
    // main thread that exits right away still waits for it.
    {
        let mut table = args.pcb.thread_table();
        let entry = table.ensure_entry(thread.tid(), Arc::downgrade(&thread));
        entry.thread = Arc::downgrade(&thread);
        entry.initialized = true;
        entry.kpage = Some(stack.kpage.clone());
        entry.upage = Some(stack.upage);

        let join_status = Arc::new(JoinStatus::new(thread.tid()));
        table.push_join_status(join_status.clone());
        thread.set_join_status(join_status);
    }
    thread.set_user_stack(stack);

    args.success.store(true, Ordering::Release);
    args.load_done.up();

    task::exec_user(frame)
}

/// Builds the new thread's user stack: one zeroed page at the address
/// named by the lowest free offset slot, with `arg`, the user function
/// and a null return address pushed for the stub.
fn setup_thread(args: &PthreadArgs, frame: &mut IntrFrame) -> Result<UserStack> {
    frame.eip = args.sfun;

    let kpage = alloc_user_frame(AllocFlags::ZERO)?;
    let slot = args.pcb.thread_table().alloc_stack_slot()?;
    let upage = PHYS_BASE - slot as u32 * PAGE_SIZE;

    let pagedir = args
        .pcb
        .pagedir()
        .ok_or_else(|| errno!(ENOMEM, "process has no address space"))?;
    if let Err(e) = pagedir.set_page(upage, kpage.clone(), true) {
        args.pcb.thread_table().free_stack_slot(slot);
        return Err(e);
    }

    let esp = kpage.with_bytes(|page| -> Result<u32> {
        let mut ofs = PAGE_SIZE as usize - 12;
        let full = || errno!(ENOMEM, "thread frame does not fit its page");
        push(page, &mut ofs, &args.arg.to_le_bytes()).ok_or_else(full)?;
        push(page, &mut ofs, &args.tfun.to_le_bytes()).ok_or_else(full)?;
        push(page, &mut ofs, &0u32.to_le_bytes()).ok_or_else(full)?;
        Ok(upage + ofs as u32)
    })?;
    frame.esp = esp;

    Ok(UserStack { kpage, upage, slot })
}

/// Waits for thread `tid` of the same process to die. Fails immediately
/// if no such thread exists or it has already been claimed by a joiner.
pub fn pthread_join(tid: pid_t) -> Result<pid_t> {
    let process = current!().process();

    // Claim the record under the process thread lock, then block with the
    // lock released.
    let join_status = process
        .thread_table()
        .take_join_status(tid)
        .ok_or_else(|| errno!(ESRCH, "no joinable thread with that tid"))?;
    join_status.wait_done();
    Ok(tid)
}

/// Terminates the current user thread: its table entry, stack page and
/// offset slot are released and any joiner is woken. The main thread is
/// redirected to [`pthread_exit_main`].
pub fn pthread_exit() -> ! {
    let thread = current!();
    let process = thread.process();

    if process.is_main_thread(&thread) {
        pthread_exit_main();
    }

    {
        let mut table = process.thread_table();
        if let Some(entry) = table.get_entry_mut(thread.tid()) {
            entry.completed = true;
        }
        table.remove_entry(thread.tid());
    }

    // Unmap the stack and free its frame, then give the offset slot back
    // under the process thread lock.
    if let Some(stack) = thread.take_user_stack() {
        if let Some(pagedir) = process.pagedir() {
            pagedir.clear_page(stack.upage);
        }
        let slot = stack.slot;
        drop(stack);
        process.thread_table().free_stack_slot(slot);
    }

    // Wake a joiner, as the last thing we do.
    if let Some(join_status) = thread.join_status() {
        join_status.mark_done();
    }

    task::thread_exit()
}

/// The main thread's exit: joins every peer, resets the user sync-object
/// tables, frees its own stack and takes the whole process down.
pub fn pthread_exit_main() -> ! {
    let thread = current!();
    let process = thread.process();

    if let Some(join_status) = thread.join_status() {
        join_status.mark_done();
    }

    // Join peers one at a time, re-scanning after each: the lock cannot be
    // held across a join, and every successful join removes the record it
    // consumed, so the scan converges.
    loop {
        let peer = process.thread_table().next_unjoined_peer(thread.tid());
        match peer {
            Some(tid) => {
                let _ = pthread_join(tid);
            }
            None => break,
        }
    }

    process.thread_table().reset_sync_tables();

    // Main's stack page goes now; its offset slot (1) stays reserved for
    // the lifetime of the process.
    if let Some(stack) = thread.take_user_stack() {
        if let Some(pagedir) = process.pagedir() {
            pagedir.clear_page(stack.upage);
        }
    }

    drop(process);
    super::do_exit::process_exit()
}
