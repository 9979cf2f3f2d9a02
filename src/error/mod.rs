//! Errno-style error handling.
//!
//! Every fallible kernel path returns `Result<T>`; the syscall layer turns
//! the errno into the value placed in the user's return register.

use std::fmt;

pub use self::Errno::*;

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! errno {
    ($errno_expr: expr, $error_msg: expr) => {{
        let errno: crate::error::Errno = $errno_expr;
        let msg: &'static str = $error_msg;
        crate::error::Error::new(errno, msg, crate::error::ErrorLocation::new(file!(), line!()))
    }};
}

macro_rules! return_errno {
    ($errno_expr: expr, $error_msg: expr) => {{
        return Err(errno!($errno_expr, $error_msg));
    }};
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error {
    errno: Errno,
    msg: &'static str,
    location: ErrorLocation,
}

impl Error {
    pub fn new(errno: Errno, msg: &'static str, location: ErrorLocation) -> Self {
        Self {
            errno,
            msg,
            location,
        }
    }

    pub fn errno(&self) -> Errno {
        self.errno
    }

    pub fn msg(&self) -> &'static str {
        self.msg
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]", self.errno, self.msg, self.location)
    }
}

impl std::error::Error for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorLocation {
    file: &'static str,
    line: u32,
}

impl ErrorLocation {
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// The subset of Unix error numbers this kernel hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Errno {
    EPERM = 1,
    ENOENT = 2,
    ESRCH = 3,
    EINTR = 4,
    EIO = 5,
    E2BIG = 7,
    ENOEXEC = 8,
    EBADF = 9,
    ECHILD = 10,
    EAGAIN = 11,
    ENOMEM = 12,
    EACCES = 13,
    EFAULT = 14,
    EBUSY = 16,
    EEXIST = 17,
    EINVAL = 22,
    ENFILE = 23,
    EMFILE = 24,
    ETXTBSY = 26,
    ENOSPC = 28,
    ESPIPE = 29,
    EDEADLK = 35,
    ENAMETOOLONG = 36,
    ENOSYS = 38,
    EOVERFLOW = 75,
}

impl Errno {
    /// The value a failed system call leaves in the return register.
    pub fn as_retval(&self) -> i32 {
        -(*self as i32)
    }
}

impl fmt::Display for Errno {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match *self {
            EPERM => "Operation not permitted",
            ENOENT => "No such file or directory",
            ESRCH => "No such process",
            EINTR => "Interrupted system call",
            EIO => "I/O error",
            E2BIG => "Argument list too long",
            ENOEXEC => "Exec format error",
            EBADF => "Bad file number",
            ECHILD => "No child processes",
            EAGAIN => "Try again",
            ENOMEM => "Out of memory",
            EACCES => "Permission denied",
            EFAULT => "Bad address",
            EBUSY => "Device or resource busy",
            EEXIST => "File exists",
            EINVAL => "Invalid argument",
            ENFILE => "File table overflow",
            EMFILE => "Too many open files",
            ETXTBSY => "Text file busy",
            ENOSPC => "No space left on device",
            ESPIPE => "Illegal seek",
            EDEADLK => "Resource deadlock would occur",
            ENAMETOOLONG => "File name too long",
            ENOSYS => "Function not implemented",
            EOVERFLOW => "Value too large for defined data type",
        };
        write!(f, "errno = {} ({})", *self as u32, desc)
    }
}
