//! The initial user stack.
//!
//! One page at the top of user memory holds everything `main` expects:
//! the command line broken into NUL-terminated argument strings, the argv
//! pointer array with its null sentinel, then argv, argc and a null
//! return address, with the final stack pointer 16-byte aligned.
//!
//! The layout is built in the kernel view of the frame before the page is
//! handed to the process, so no user-mode access rules apply yet.

use super::super::process::MAIN_STACK_SLOT;
use super::super::UserStack;
use crate::prelude::*;
use crate::process::ProcessRef;
use crate::vm::page_alloc::{alloc_user_frame, AllocFlags, FrameRef};
use crate::vm::{PageDirRef, PAGE_SIZE, PHYS_BASE};

/// Pushes `buf` onto the downward-growing stack inside `page`, rounded up
/// to a word boundary. `ofs` is the page-relative stack pointer. Returns
/// the page offset of the pushed object, or `None` when the page is full.
pub(in crate::process) fn push(page: &mut [u8], ofs: &mut usize, buf: &[u8]) -> Option<usize> {
    let padsize = align_up(buf.len(), 4);
    if *ofs < padsize {
        return None;
    }
    *ofs -= padsize;
    let at = *ofs + (padsize - buf.len());
    page[at..at + buf.len()].copy_from_slice(buf);
    Some(at)
}

/// Maps a zeroed page at the top of user memory, fills it from
/// `cmd_line` and returns the initial user stack pointer. Also records
/// the stack on the main thread and its user-thread entry.
pub(super) fn setup_stack(
    cmd_line: &str,
    process: &ProcessRef,
    pagedir: &PageDirRef,
) -> Result<u32> {
    let kpage = alloc_user_frame(AllocFlags::ZERO)?;
    let upage = PHYS_BASE - PAGE_SIZE;
    pagedir.set_page(upage, kpage.clone(), true)?;
    let esp = init_cmd_line(&kpage, upage, cmd_line)?;

    let thread = current!();
    thread.set_user_stack(UserStack {
        kpage: kpage.clone(),
        upage,
        slot: MAIN_STACK_SLOT,
    });
    let mut table = process.thread_table();
    if let Some(entry) = table.get_entry_mut(thread.tid()) {
        entry.kpage = Some(kpage);
        entry.upage = Some(upage);
    }
    Ok(esp)
}

/// Lays out the argv frame in `kpage` (to be mapped at `upage`) and
/// returns the resulting stack pointer.
fn init_cmd_line(kpage: &FrameRef, upage: u32, cmd_line: &str) -> Result<u32> {
    kpage.with_bytes(|page| {
        let mut ofs = PAGE_SIZE as usize;

        // The whole command line, with terminator, goes in first.
        let mut cmd = cmd_line.as_bytes().to_vec();
        cmd.push(0);
        let cmd_ofs = push(page, &mut ofs, &cmd)
            .ok_or_else(|| errno!(ENOMEM, "command line does not fit the stack page"))?;

        // Break it into tokens in place, recording each token's user
        // address.
        let mut arguments: Vec<u32> = Vec::new();
        {
            let bytes = &mut page[cmd_ofs..cmd_ofs + cmd.len()];
            let mut in_token = false;
            for (i, byte) in bytes.iter_mut().enumerate() {
                if *byte == b' ' {
                    *byte = 0;
                    in_token = false;
                } else if *byte == 0 {
                    in_token = false;
                } else if !in_token {
                    arguments.push(upage + (cmd_ofs + i) as u32);
                    in_token = true;
                }
            }
        }
        let argc = arguments.len();
        if argc > crate::config::max_args() {
            return_errno!(E2BIG, "too many command line arguments");
        }

        // Pad so that after the sentinel, the argv entries, argv, argc and
        // the return address, the final stack pointer is 16-byte aligned.
        let consumed = PAGE_SIZE as usize - ofs;
        let adjustment = (consumed + (argc + 1) * 4 + 4 + 4) % 16;
        ofs -= 16 - adjustment;

        let full = || errno!(ENOMEM, "argument frame does not fit the stack page");

        // argv[argc] sentinel, then the argument pointers.
        push(page, &mut ofs, &0u32.to_le_bytes()).ok_or_else(full)?;
        for uaddr in &arguments {
            push(page, &mut ofs, &uaddr.to_le_bytes()).ok_or_else(full)?;
        }
        // The pointers went in first-to-last, which on a downward stack
        // reads back reversed; flip them so argv[0] is the first token.
        reverse_words(&mut page[ofs..ofs + argc * 4]);
        let argv_uaddr = upage + ofs as u32;

        push(page, &mut ofs, &argv_uaddr.to_le_bytes()).ok_or_else(full)?;
        push(page, &mut ofs, &(argc as u32).to_le_bytes()).ok_or_else(full)?;
        push(page, &mut ofs, &0u32.to_le_bytes()).ok_or_else(full)?;

        Ok(upage + ofs as u32)
    })
}

fn reverse_words(bytes: &mut [u8]) {
    debug_assert_eq!(bytes.len() % 4, 0);
    let n = bytes.len() / 4;
    for i in 0..n / 2 {
        for b in 0..4 {
            bytes.swap(i * 4 + b, (n - 1 - i) * 4 + b);
        }
    }
}
