//! System call dispatch.
//!
//! User code traps in with the call number in the word at `esp` and up to
//! three argument words above it. Dispatch copies the frame in, runs the
//! handler, and leaves the result in the return register. A frame that
//! cannot be read, a number outside the table, or an invalid handle in a
//! file operation terminates the process on the spot; every other failure
//! comes back to the caller as -1 (false, for the boolean calls).

use std::convert::TryFrom;

use crate::prelude::*;
use crate::process::process_exit;
use crate::util::mem_util::{copy_cstring_from_user, copy_u32_from_user};
use crate::{fs, process, shutdown};

/// The system call table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SyscallNum {
    Halt = 0,
    Exit = 1,
    Exec = 2,
    Wait = 3,
    Create = 4,
    Remove = 5,
    Open = 6,
    Filesize = 7,
    Read = 8,
    Write = 9,
    Seek = 10,
    Tell = 11,
    Close = 12,
    Practice = 13,
    ComputeE = 14,
    PtCreate = 15,
    PtExit = 16,
    PtJoin = 17,
    LockInit = 18,
    LockAcquire = 19,
    LockRelease = 20,
    SemaInit = 21,
    SemaDown = 22,
    SemaUp = 23,
    GetTid = 24,
}

impl SyscallNum {
    /// How many argument words follow the call number.
    pub fn num_args(&self) -> usize {
        use SyscallNum::*;
        match self {
            Halt | PtExit | GetTid => 0,
            Exit | Exec | Wait | Remove | Open | Filesize | Tell | Close | Practice | ComputeE
            | PtJoin | LockInit | LockAcquire | LockRelease | SemaDown | SemaUp => 1,
            Create | Seek | SemaInit => 2,
            Read | Write | PtCreate => 3,
        }
    }
}

impl TryFrom<u32> for SyscallNum {
    type Error = Error;

    fn try_from(raw: u32) -> Result<SyscallNum> {
        use SyscallNum::*;
        Ok(match raw {
            0 => Halt,
            1 => Exit,
            2 => Exec,
            3 => Wait,
            4 => Create,
            5 => Remove,
            6 => Open,
            7 => Filesize,
            8 => Read,
            9 => Write,
            10 => Seek,
            11 => Tell,
            12 => Close,
            13 => Practice,
            14 => ComputeE,
            15 => PtCreate,
            16 => PtExit,
            17 => PtJoin,
            18 => LockInit,
            19 => LockAcquire,
            20 => LockRelease,
            21 => SemaInit,
            22 => SemaDown,
            23 => SemaUp,
            24 => GetTid,
            _ => return_errno!(ENOSYS, "system call number out of range"),
        })
    }
}

/// Entry point from the software-interrupt path. `esp` is the user stack
/// pointer at the moment of the trap. Returns the value for `eax`.
pub fn handle_syscall(esp: u32) -> i32 {
    let frame = (|| -> Result<(SyscallNum, [u32; 3])> {
        let num = SyscallNum::try_from(copy_u32_from_user(esp)?)?;
        let mut args = [0u32; 3];
        for (i, arg) in args.iter_mut().enumerate().take(num.num_args()) {
            *arg = copy_u32_from_user(esp + 4 * (i as u32 + 1))?;
        }
        Ok((num, args))
    })();
    let (num, args) = match frame {
        Ok(frame) => frame,
        Err(e) => {
            debug!("unusable syscall frame: {}", e);
            process_exit()
        }
    };

    trace!("syscall {:?}, args = {:?}", num, &args[..num.num_args()]);
    match dispatch_syscall(num, args) {
        Ok(eax) => eax,
        // A bad pointer or bad file handle has no one to report to.
        Err(e) if e.errno() == EFAULT || e.errno() == EBADF => {
            debug!("fatal syscall error: {}", e);
            process_exit()
        }
        Err(e) => {
            debug!("syscall {:?} failed: {}", num, e);
            -1
        }
    }
}

fn dispatch_syscall(num: SyscallNum, args: [u32; 3]) -> Result<i32> {
    use SyscallNum::*;
    match num {
        Halt => shutdown::power_off(),
        Exit => process::syscalls::do_exit(args[0] as i32),
        Exec => process::syscalls::do_exec(args[0]),
        Wait => process::syscalls::do_wait(args[0]),
        Create => {
            let path = copy_cstring_from_user(args[0])?;
            fs::syscalls::do_create(&path, args[1] as usize).map(from_bool)
        }
        Remove => {
            let path = copy_cstring_from_user(args[0])?;
            fs::syscalls::do_remove(&path).map(from_bool)
        }
        Open => {
            let path = copy_cstring_from_user(args[0])?;
            fs::syscalls::do_open(&path)
        }
        Filesize => fs::syscalls::do_filesize(args[0] as i32),
        Read => fs::syscalls::do_read(args[0] as i32, args[1], args[2]),
        Write => fs::syscalls::do_write(args[0] as i32, args[1], args[2]),
        Seek => fs::syscalls::do_seek(args[0] as i32, args[1]),
        Tell => fs::syscalls::do_tell(args[0] as i32),
        Close => fs::syscalls::do_close(args[0] as i32),
        Practice => Ok(do_practice(args[0] as i32)),
        ComputeE => Ok(do_compute_e(args[0] as i32)),
        PtCreate => process::syscalls::do_pt_create(args[0], args[1], args[2]),
        PtExit => process::syscalls::do_pt_exit(),
        PtJoin => process::syscalls::do_pt_join(args[0]),
        LockInit => process::user_sync::do_lock_init(args[0]).map(from_bool),
        LockAcquire => process::user_sync::do_lock_acquire(args[0]).map(from_bool),
        LockRelease => process::user_sync::do_lock_release(args[0]).map(from_bool),
        SemaInit => process::user_sync::do_sema_init(args[0], args[1] as i32).map(from_bool),
        SemaDown => process::user_sync::do_sema_down(args[0]).map(from_bool),
        SemaUp => process::user_sync::do_sema_up(args[0]).map(from_bool),
        GetTid => process::syscalls::do_get_tid(),
    }
}

fn from_bool(ok: bool) -> i32 {
    ok as i32
}

pub fn do_practice(input: i32) -> i32 {
    input + 1
}

/// `⌊Σ_{k<n} 1/k!⌋`, computed in `f32` the way an x87 exercise would.
/// Zero or fewer terms is a caller error and reports -1.
pub fn do_compute_e(n: i32) -> i32 {
    if n <= 0 {
        return -1;
    }
    let mut sum: f32 = 0.0;
    let mut term: f32 = 1.0;
    for k in 0..n {
        sum += term;
        term /= (k + 1) as f32;
    }
    sum as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn practice_increments() {
        assert_eq!(do_practice(41), 42);
        assert_eq!(do_practice(-1), 0);
    }

    #[test]
    fn compute_e_converges() {
        assert_eq!(do_compute_e(-3), -1);
        assert_eq!(do_compute_e(0), -1);
        assert_eq!(do_compute_e(1), 1);
        assert_eq!(do_compute_e(2), 2);
        assert_eq!(do_compute_e(3), 2);
        assert_eq!(do_compute_e(20), 2);
    }

    #[test]
    fn call_numbers_round_trip() {
        assert_eq!(SyscallNum::try_from(0).unwrap(), SyscallNum::Halt);
        assert_eq!(SyscallNum::try_from(24).unwrap(), SyscallNum::GetTid);
        assert!(SyscallNum::try_from(25).is_err());
        assert_eq!(SyscallNum::Read.num_args(), 3);
        assert_eq!(SyscallNum::GetTid.num_args(), 0);
    }
}
