//! Shared harness for the end-to-end tests: a tiny ELF image builder, a
//! program installer, and typed wrappers over the raw syscall ABI.

#![allow(dead_code)]

use std::sync::{Mutex, MutexGuard};

use userproc::config::Config;
use userproc::fs::{console, ramfs};
use userproc::process::task::{UserContext, UserImageBuilder, UserImage};
use userproc::process::{self, ThreadRef};

/// Base of the text segment every test executable maps.
pub const TEXT_BASE: u32 = 0x0804_8000;
/// Where `main` lives.
pub const MAIN_ENTRY: u32 = TEXT_BASE;
/// The canonical thread stub all tests share.
pub const STUB_ENTRY: u32 = TEXT_BASE + 0x40;

/// Boots the kernel once and turns the calling test thread into a kernel
/// thread that can exec and wait.
pub fn setup() -> ThreadRef {
    userproc::boot(&Config::default());
    process::init_kernel_thread()
}

lazy_static::lazy_static! {
    static ref CONSOLE_MUTEX: Mutex<()> = Mutex::new(());
}

/// Serializes tests that assert on console output, draining whatever
/// earlier tests left behind. Assertions must use `contains`, since
/// unrelated processes may interleave their own lines.
pub fn console_guard() -> MutexGuard<'static, ()> {
    let guard = CONSOLE_MUTEX.lock().unwrap();
    console::take_output();
    guard
}

pub fn console_string() -> String {
    String::from_utf8_lossy(&console::take_output()).into_owned()
}

/// A minimal static i386 executable: one read-only PT_LOAD of one page at
/// `TEXT_BASE`, entry at `entry`.
pub fn elf_exec(entry: u32) -> Vec<u8> {
    let mut image = Vec::new();

    // Executable header.
    image.extend_from_slice(b"\x7fELF\x01\x01\x01"); // magic, class, data, version
    image.resize(16, 0); // ident padding
    put16(&mut image, 2); // e_type = ET_EXEC
    put16(&mut image, 3); // e_machine = EM_386
    put32(&mut image, 1); // e_version
    put32(&mut image, entry); // e_entry
    put32(&mut image, 52); // e_phoff
    put32(&mut image, 0); // e_shoff
    put32(&mut image, 0); // e_flags
    put16(&mut image, 52); // e_ehsize
    put16(&mut image, 32); // e_phentsize
    put16(&mut image, 1); // e_phnum
    put16(&mut image, 0); // e_shentsize
    put16(&mut image, 0); // e_shnum
    put16(&mut image, 0); // e_shstrndx

    // One loadable segment: file page 1 -> TEXT_BASE, read + execute.
    put32(&mut image, 1); // p_type = PT_LOAD
    put32(&mut image, 0x1000); // p_offset
    put32(&mut image, TEXT_BASE); // p_vaddr
    put32(&mut image, 0); // p_paddr
    put32(&mut image, 0x1000); // p_filesz
    put32(&mut image, 0x1000); // p_memsz
    put32(&mut image, 5); // p_flags = R | X
    put32(&mut image, 0x1000); // p_align

    // The "machine code": one page of int3.
    image.resize(0x1000, 0);
    image.resize(0x2000, 0xcc);
    image
}

fn put16(image: &mut Vec<u8>, val: u16) {
    image.extend_from_slice(&val.to_le_bytes());
}

fn put32(image: &mut Vec<u8>, val: u32) {
    image.extend_from_slice(&val.to_le_bytes());
}

/// Builds and installs a test program: ELF bytes in the file system plus
/// the simulated text entries, including the shared thread stub.
pub struct Program {
    name: String,
    image: UserImageBuilder,
}

impl Program {
    pub fn new(name: &str) -> Self {
        let image = UserImage::builder().entry(STUB_ENTRY, |ctx| {
            // The stub finds a null return address at esp with the user
            // function and its argument above, calls the function with a
            // conventional frame, then exits the thread.
            let tfun = ctx.read_u32(ctx.esp() + 4);
            let arg = ctx.read_u32(ctx.esp() + 8);
            ctx.push_u32(arg);
            ctx.push_u32(0);
            ctx.call(tfun);
            sys::pt_exit(ctx);
        });
        Self {
            name: name.to_string(),
            image,
        }
    }

    /// Registers `f` as the program's main entry.
    pub fn main(mut self, f: impl Fn(&UserContext) + Send + Sync + 'static) -> Self {
        self.image = self.image.entry(MAIN_ENTRY, f);
        self
    }

    /// Registers `f` at an arbitrary text address (a thread function).
    pub fn func(mut self, addr: u32, f: impl Fn(&UserContext) + Send + Sync + 'static) -> Self {
        self.image = self.image.entry(addr, f);
        self
    }

    pub fn install(self) {
        ramfs::create_with_data(&self.name, &elf_exec(MAIN_ENTRY)).unwrap();
        ramfs::register_image(&self.name, self.image.build()).unwrap();
    }
}

/// The argument a thread function receives through the stub's frame.
pub fn thread_arg(ctx: &UserContext) -> u32 {
    ctx.read_u32(ctx.esp() + 4)
}

/// Typed wrappers over the raw user-mode syscall ABI.
pub mod sys {
    use userproc::process::task::UserContext;
    use userproc::syscall::SyscallNum as N;

    use super::STUB_ENTRY;

    pub fn halt(ctx: &UserContext) {
        ctx.syscall(N::Halt as u32, &[]);
    }

    pub fn exit(ctx: &UserContext, code: i32) {
        ctx.syscall(N::Exit as u32, &[code as u32]);
    }

    pub fn exec(ctx: &UserContext, cmd_line: &str) -> i32 {
        let cmd = ctx.push_cstr(cmd_line);
        ctx.syscall(N::Exec as u32, &[cmd])
    }

    pub fn wait(ctx: &UserContext, pid: i32) -> i32 {
        ctx.syscall(N::Wait as u32, &[pid as u32])
    }

    pub fn create(ctx: &UserContext, path: &str, size: u32) -> bool {
        let path = ctx.push_cstr(path);
        ctx.syscall(N::Create as u32, &[path, size]) != 0
    }

    pub fn remove(ctx: &UserContext, path: &str) -> bool {
        let path = ctx.push_cstr(path);
        ctx.syscall(N::Remove as u32, &[path]) != 0
    }

    pub fn open(ctx: &UserContext, path: &str) -> i32 {
        let path = ctx.push_cstr(path);
        ctx.syscall(N::Open as u32, &[path])
    }

    pub fn filesize(ctx: &UserContext, fd: i32) -> i32 {
        ctx.syscall(N::Filesize as u32, &[fd as u32])
    }

    pub fn read(ctx: &UserContext, fd: i32, buf: u32, n: u32) -> i32 {
        ctx.syscall(N::Read as u32, &[fd as u32, buf, n])
    }

    pub fn write(ctx: &UserContext, fd: i32, buf: u32, n: u32) -> i32 {
        ctx.syscall(N::Write as u32, &[fd as u32, buf, n])
    }

    pub fn write_str(ctx: &UserContext, fd: i32, s: &str) -> i32 {
        let buf = ctx.push_cstr(s);
        write(ctx, fd, buf, s.len() as u32)
    }

    pub fn seek(ctx: &UserContext, fd: i32, pos: u32) -> i32 {
        ctx.syscall(N::Seek as u32, &[fd as u32, pos])
    }

    pub fn tell(ctx: &UserContext, fd: i32) -> i32 {
        ctx.syscall(N::Tell as u32, &[fd as u32])
    }

    pub fn close(ctx: &UserContext, fd: i32) -> i32 {
        ctx.syscall(N::Close as u32, &[fd as u32])
    }

    pub fn practice(ctx: &UserContext, n: i32) -> i32 {
        ctx.syscall(N::Practice as u32, &[n as u32])
    }

    pub fn compute_e(ctx: &UserContext, n: i32) -> i32 {
        ctx.syscall(N::ComputeE as u32, &[n as u32])
    }

    pub fn pt_create(ctx: &UserContext, tfun: u32, arg: u32) -> i32 {
        ctx.syscall(N::PtCreate as u32, &[STUB_ENTRY, tfun, arg])
    }

    pub fn pt_exit(ctx: &UserContext) {
        ctx.syscall(N::PtExit as u32, &[]);
    }

    pub fn pt_join(ctx: &UserContext, tid: i32) -> i32 {
        ctx.syscall(N::PtJoin as u32, &[tid as u32])
    }

    pub fn lock_init(ctx: &UserContext, handle: u32) -> bool {
        ctx.syscall(N::LockInit as u32, &[handle]) != 0
    }

    pub fn lock_acquire(ctx: &UserContext, handle: u32) -> bool {
        ctx.syscall(N::LockAcquire as u32, &[handle]) != 0
    }

    pub fn lock_release(ctx: &UserContext, handle: u32) -> bool {
        ctx.syscall(N::LockRelease as u32, &[handle]) != 0
    }

    pub fn sema_init(ctx: &UserContext, handle: u32, val: i32) -> bool {
        ctx.syscall(N::SemaInit as u32, &[handle, val as u32]) != 0
    }

    pub fn sema_down(ctx: &UserContext, handle: u32) -> bool {
        ctx.syscall(N::SemaDown as u32, &[handle]) != 0
    }

    pub fn sema_up(ctx: &UserContext, handle: u32) -> bool {
        ctx.syscall(N::SemaUp as u32, &[handle]) != 0
    }

    pub fn get_tid(ctx: &UserContext) -> i32 {
        ctx.syscall(N::GetTid as u32, &[])
    }
}
