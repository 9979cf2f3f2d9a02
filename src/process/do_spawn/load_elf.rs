//! The ELF32 loader.
//!
//! Reads the executable named by the command line into a fresh address
//! space: header validation, one mapping pass per loadable segment, and
//! the initial stack. Only static i386 executables are accepted.

use goblin::elf::header::{ELFCLASS32, ELFDATA2LSB, ELFMAG, EM_386, ET_EXEC, EV_CURRENT};
use goblin::elf::program_header::{
    PF_W, PT_DYNAMIC, PT_GNU_STACK, PT_INTERP, PT_LOAD, PT_NOTE, PT_NULL, PT_PHDR, PT_SHLIB,
};
use scroll::{Pread, LE};

use super::init_stack;
use crate::fs::{console, ramfs};
use crate::prelude::*;
use crate::process::task::IntrFrame;
use crate::process::ProcessRef;
use crate::vm::page_alloc::{alloc_user_frame, AllocFlags};
use crate::vm::{is_user_vaddr, pg_ofs, pg_round_down, PageDir, PageDirRef, PAGE_SIZE};

const SIZEOF_EHDR: usize = 52;
const SIZEOF_PHDR: usize = 32;
const MAX_PHNUM: u16 = 1024;

bitflags! {
    /// Segment permission bits from `p_flags`.
    pub struct SegFlags: u32 {
        const W = PF_W;
    }
}

/// The executable-header fields the loader consumes.
#[derive(Debug, Clone, Copy)]
struct ElfHeader {
    e_entry: u32,
    e_phoff: u32,
    e_phnum: u16,
}

/// One program header.
#[derive(Debug, Clone, Copy)]
struct ProgramHeader {
    p_type: u32,
    p_offset: u32,
    p_vaddr: u32,
    p_filesz: u32,
    p_memsz: u32,
    p_flags: u32,
}

/// Loads the executable named by the leading token of `cmd_line` into the
/// process's (fresh) address space and fills in the frame's entry point
/// and initial stack pointer.
pub fn load(cmd_line: &str, process: &ProcessRef, frame: &mut IntrFrame) -> Result<()> {
    // Allocate and activate the page directory before any mapping.
    let pagedir = PageDir::new();
    process.set_pagedir(pagedir.clone());
    crate::process::process_activate();

    let file_name = super::program_name(cmd_line);

    let file = match ramfs::open(file_name) {
        Ok(file) => file,
        Err(e) => {
            console::print_fmt(format_args!("load: {}: open failed\n", file_name));
            return Err(e);
        }
    };
    // Writes stay denied for as long as the process runs the binary.
    file.deny_write();
    process.set_image(file.inode().image());
    process.set_bin_file(file.clone());

    let ehdr = match read_ehdr(&file) {
        Ok(ehdr) => ehdr,
        Err(e) => {
            console::print_fmt(format_args!(
                "load: {}: error loading executable\n",
                file_name
            ));
            return Err(e);
        }
    };

    // Program headers, in file order.
    let file_len = file.len() as u32;
    let mut file_ofs = ehdr.e_phoff;
    for _ in 0..ehdr.e_phnum {
        if file_ofs > file_len {
            return_errno!(ENOEXEC, "program header table past end of file");
        }
        let phdr = read_phdr(&file, file_ofs)?;
        file_ofs += SIZEOF_PHDR as u32;

        match phdr.p_type {
            PT_NULL | PT_NOTE | PT_PHDR | PT_GNU_STACK => {}
            PT_DYNAMIC | PT_INTERP | PT_SHLIB => {
                return_errno!(ENOEXEC, "dynamic executables are not supported");
            }
            PT_LOAD => {
                validate_segment(&phdr, file_len)?;
                map_segment(&file, &phdr, &pagedir)?;
            }
            _ => {
                // Unknown segment types are ignored.
            }
        }
    }

    frame.esp = init_stack::setup_stack(cmd_line, process, &pagedir)?;
    frame.eip = ehdr.e_entry;

    debug!(
        "loaded {}: entry = {:#x}, esp = {:#x}",
        file_name, frame.eip, frame.esp
    );
    Ok(())
}

fn read_ehdr(file: &FileRef) -> Result<ElfHeader> {
    let mut buf = [0u8; SIZEOF_EHDR];
    if file.read_at(0, &mut buf)? != SIZEOF_EHDR {
        return_errno!(ENOEXEC, "file too short for an ELF header");
    }
    // e_ident: magic, then class/data/version all 1.
    if &buf[0..4] != &ELFMAG[..]
        || buf[4] != ELFCLASS32
        || buf[5] != ELFDATA2LSB
        || buf[6] != EV_CURRENT
    {
        return_errno!(ENOEXEC, "bad ELF identification");
    }
    let e_type = le16(&buf, 16)?;
    let e_machine = le16(&buf, 18)?;
    let e_version = le32(&buf, 20)?;
    let e_entry = le32(&buf, 24)?;
    let e_phoff = le32(&buf, 28)?;
    let e_phentsize = le16(&buf, 42)?;
    let e_phnum = le16(&buf, 44)?;

    if e_type != ET_EXEC || e_machine != EM_386 || e_version != EV_CURRENT as u32 {
        return_errno!(ENOEXEC, "not a static i386 executable");
    }
    if e_phentsize as usize != SIZEOF_PHDR || e_phnum > MAX_PHNUM {
        return_errno!(ENOEXEC, "bad program header table shape");
    }
    Ok(ElfHeader {
        e_entry,
        e_phoff,
        e_phnum,
    })
}

fn read_phdr(file: &FileRef, ofs: u32) -> Result<ProgramHeader> {
    let mut buf = [0u8; SIZEOF_PHDR];
    if file.read_at(ofs as usize, &mut buf)? != SIZEOF_PHDR {
        return_errno!(ENOEXEC, "truncated program header");
    }
    Ok(ProgramHeader {
        p_type: le32(&buf, 0)?,
        p_offset: le32(&buf, 4)?,
        p_vaddr: le32(&buf, 8)?,
        p_filesz: le32(&buf, 16)?,
        p_memsz: le32(&buf, 20)?,
        p_flags: le32(&buf, 24)?,
    })
}

fn le16(buf: &[u8], ofs: usize) -> Result<u16> {
    buf.pread_with::<u16>(ofs, LE)
        .map_err(|_| errno!(ENOEXEC, "malformed ELF field"))
}

fn le32(buf: &[u8], ofs: usize) -> Result<u32> {
    buf.pread_with::<u32>(ofs, LE)
        .map_err(|_| errno!(ENOEXEC, "malformed ELF field"))
}

/// Is `phdr` a valid, loadable segment of a `file_len`-byte file?
fn validate_segment(phdr: &ProgramHeader, file_len: u32) -> Result<()> {
    // p_offset and p_vaddr must share a page offset.
    if pg_ofs(phdr.p_offset) != pg_ofs(phdr.p_vaddr) {
        return_errno!(ENOEXEC, "segment offset and vaddr disagree");
    }
    // p_offset must point within the file.
    if phdr.p_offset > file_len {
        return_errno!(ENOEXEC, "segment starts past end of file");
    }
    if phdr.p_memsz < phdr.p_filesz {
        return_errno!(ENOEXEC, "segment memory size below file size");
    }
    if phdr.p_memsz == 0 {
        return_errno!(ENOEXEC, "empty segment");
    }
    // The region must start and end in user space and must not wrap
    // around into kernel addresses.
    let end = phdr
        .p_vaddr
        .checked_add(phdr.p_memsz)
        .ok_or_else(|| errno!(ENOEXEC, "segment wraps around"))?;
    if !is_user_vaddr(phdr.p_vaddr) || !is_user_vaddr(end) {
        return_errno!(ENOEXEC, "segment escapes user space");
    }
    // Mapping page 0 would let null pointers reach mapped memory.
    if phdr.p_vaddr < PAGE_SIZE {
        return_errno!(ENOEXEC, "segment maps page zero");
    }
    Ok(())
}

/// Maps one validated PT_LOAD segment.
fn map_segment(file: &FileRef, phdr: &ProgramHeader, pagedir: &PageDirRef) -> Result<()> {
    let writable = SegFlags::from_bits_truncate(phdr.p_flags).contains(SegFlags::W);
    let file_page = pg_round_down(phdr.p_offset);
    let mem_page = pg_round_down(phdr.p_vaddr);
    let page_offset = pg_ofs(phdr.p_vaddr);
    let (read_bytes, zero_bytes) = if phdr.p_filesz > 0 {
        let read_bytes = page_offset + phdr.p_filesz;
        let zero_bytes = crate::vm::pg_round_up(page_offset + phdr.p_memsz) - read_bytes;
        (read_bytes, zero_bytes)
    } else {
        (0, crate::vm::pg_round_up(page_offset + phdr.p_memsz))
    };
    load_segment(file, file_page, mem_page, read_bytes, zero_bytes, writable, pagedir)
}

/// Reads `read_bytes` from `file` at `file_ofs` into pages mapped from
/// `upage` on, zeroing the remaining `zero_bytes`.
fn load_segment(
    file: &FileRef,
    file_ofs: u32,
    upage: u32,
    read_bytes: u32,
    zero_bytes: u32,
    writable: bool,
    pagedir: &PageDirRef,
) -> Result<()> {
    debug_assert_eq!((read_bytes + zero_bytes) % PAGE_SIZE, 0);
    debug_assert_eq!(pg_ofs(upage), 0);
    debug_assert_eq!(pg_ofs(file_ofs), 0);

    let mut file_ofs = file_ofs as usize;
    let mut upage = upage;
    let mut read_bytes = read_bytes;
    let mut zero_bytes = zero_bytes;

    while read_bytes > 0 || zero_bytes > 0 {
        let page_read_bytes = min(read_bytes, PAGE_SIZE) as usize;
        let page_zero_bytes = PAGE_SIZE as usize - page_read_bytes;

        let kpage = alloc_user_frame(AllocFlags::empty())?;
        let n = kpage.with_bytes(|page| file.read_at(file_ofs, &mut page[..page_read_bytes]))?;
        if n != page_read_bytes {
            return_errno!(EIO, "short read from executable");
        }
        kpage.zero(page_read_bytes, page_zero_bytes);

        pagedir.set_page(upage, kpage, writable)?;

        read_bytes -= page_read_bytes as u32;
        zero_bytes -= page_zero_bytes as u32;
        upage += PAGE_SIZE;
        file_ofs += page_read_bytes;
    }
    Ok(())
}
