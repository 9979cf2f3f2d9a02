//! End-to-end process lifecycle scenarios: exec, wait, exit, the argv
//! frame, file system calls and kernel-imposed termination.

mod common;

use common::{sys, Program};
use userproc::fs::ramfs;
use userproc::process::{process_execute, process_wait};

#[test]
fn echo_prints_its_arguments() {
    common::setup();
    let _console = common::console_guard();

    Program::new("echo")
        .main(|ctx| {
            // The initial frame: null return address, argc, argv.
            assert_eq!(ctx.read_u32(ctx.esp()), 0);
            let argc = ctx.read_u32(ctx.esp() + 4);
            let argv = ctx.read_u32(ctx.esp() + 8);
            for i in 0..argc {
                let arg = ctx.read_u32(argv + 4 * i);
                let token = ctx.read_cstr(arg);
                sys::write_str(ctx, 1, &format!("[{}]", token));
            }
            // argv[argc] is the null sentinel.
            assert_eq!(ctx.read_u32(argv + 4 * argc), 0);
            assert_eq!(ctx.esp() % 16, 0);
            sys::exit(ctx, 0);
        })
        .install();

    let pid = process_execute("echo hello world").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 0);

    let output = common::console_string();
    assert!(output.contains("[echo][hello][world]"), "output: {:?}", output);
    assert!(output.contains("echo: exit(0)"), "output: {:?}", output);
}

#[test]
fn wait_returns_the_exit_code_once() {
    common::setup();

    Program::new("exit42")
        .main(|ctx| sys::exit(ctx, 42))
        .install();

    let pid = process_execute("exit42").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 42);
    // The record was consumed; a second wait fails without blocking.
    assert!(process_wait(pid).is_err());
    // So does waiting for something that was never our child.
    assert!(process_wait(987_654).is_err());
}

#[test]
fn concurrent_children_are_waited_in_any_order() {
    common::setup();

    Program::new("exit7").main(|ctx| sys::exit(ctx, 7)).install();
    Program::new("exit9").main(|ctx| sys::exit(ctx, 9)).install();

    let pid7 = process_execute("exit7").unwrap();
    let pid9 = process_execute("exit9").unwrap();
    let mut codes = vec![
        process_wait(pid9).unwrap(),
        process_wait(pid7).unwrap(),
    ];
    codes.sort();
    assert_eq!(codes, vec![7, 9]);
    assert!(process_wait(pid7).is_err());
    assert!(process_wait(pid9).is_err());
}

#[test]
fn exec_of_a_missing_program_fails() {
    common::setup();
    let _console = common::console_guard();
    assert!(process_execute("no-such-prog").is_err());
    assert!(common::console_string().contains("load: no-such-prog: open failed"));
}

#[test]
fn exec_of_a_corrupt_executable_fails() {
    common::setup();
    let _console = common::console_guard();
    ramfs::create_with_data("garbage", b"\x7fELFnot really an executable").unwrap();
    assert!(process_execute("garbage").is_err());
    assert!(common::console_string().contains("load: garbage: error loading executable"));
}

#[test]
fn a_program_can_exec_and_wait_for_its_own_child() {
    common::setup();

    Program::new("child")
        .main(|ctx| {
            let arg_count = {
                let argc = ctx.read_u32(ctx.esp() + 4);
                argc as i32
            };
            sys::exit(ctx, 10 + arg_count);
        })
        .install();
    Program::new("parent")
        .main(|ctx| {
            let pid = sys::exec(ctx, "child one two");
            assert!(pid > 0);
            let code = sys::wait(ctx, pid);
            // A second wait through the syscall surface returns -1.
            assert_eq!(sys::wait(ctx, pid), -1);
            sys::exit(ctx, code);
        })
        .install();

    let pid = process_execute("parent").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 13);
}

#[test]
fn file_system_calls_work_from_user_code() {
    common::setup();

    Program::new("filer")
        .main(|ctx| {
            assert!(sys::create(ctx, "filer.dat", 0));
            assert!(!sys::create(ctx, "filer.dat", 0));

            let fd = sys::open(ctx, "filer.dat");
            assert!(fd >= 2);
            assert_eq!(sys::write_str(ctx, fd, "hello files"), 11);
            assert_eq!(sys::filesize(ctx, fd), 11);
            assert_eq!(sys::tell(ctx, fd), 11);

            sys::seek(ctx, fd, 6);
            let buf = ctx.push_u32(0); // scratch word on the stack
            assert_eq!(sys::read(ctx, fd, buf, 4), 4);
            let mut back = [0u8; 4];
            ctx.read_bytes(buf, &mut back);
            assert_eq!(&back, b"file");

            assert_eq!(sys::close(ctx, fd), 0);
            // The handle is gone now; using it again is fatal, so only
            // re-open to prove the data stuck.
            let fd = sys::open(ctx, "filer.dat");
            assert_eq!(sys::filesize(ctx, fd), 11);

            assert!(sys::remove(ctx, "filer.dat"));
            assert_eq!(sys::open(ctx, "filer.dat"), -1);

            // Our own executable is open with writes denied.
            let exe = sys::open(ctx, "filer");
            assert!(exe >= 2);
            assert_eq!(sys::write_str(ctx, exe, "scribble"), 0);

            sys::exit(ctx, 0);
        })
        .install();

    let pid = process_execute("filer").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 0);
}

#[test]
fn stdin_feeds_user_reads() {
    common::setup();

    userproc::fs::console::feed_input(b"ok");
    Program::new("stdin-rd")
        .main(|ctx| {
            let buf = ctx.push_u32(0);
            assert_eq!(sys::read(ctx, 0, buf, 2), 2);
            let mut bytes = [0u8; 2];
            ctx.read_bytes(buf, &mut bytes);
            assert_eq!(&bytes, b"ok");
            sys::exit(ctx, 0);
        })
        .install();

    let pid = process_execute("stdin-rd").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 0);
}

#[test]
fn a_bad_buffer_pointer_kills_the_process() {
    common::setup();
    let _console = common::console_guard();

    Program::new("wild-ptr")
        .main(|ctx| {
            // Unmapped user address; the write never returns.
            sys::write(ctx, 1, 0x4000_0000, 16);
            unreachable!("the kernel should have killed us");
        })
        .install();

    let pid = process_execute("wild-ptr").unwrap();
    assert_eq!(process_wait(pid).unwrap(), -1);
    assert!(common::console_string().contains("wild-ptr: exit(-1)"));
}

#[test]
fn a_bad_syscall_number_kills_the_process() {
    common::setup();

    Program::new("bad-nr")
        .main(|ctx| {
            ctx.syscall(4242, &[]);
            unreachable!("the kernel should have killed us");
        })
        .install();

    let pid = process_execute("bad-nr").unwrap();
    assert_eq!(process_wait(pid).unwrap(), -1);
}

#[test]
fn practice_compute_e_and_tid() {
    common::setup();

    Program::new("misc")
        .main(|ctx| {
            assert_eq!(sys::practice(ctx, 6), 7);
            assert_eq!(sys::compute_e(ctx, 10), 2);
            assert_eq!(sys::compute_e(ctx, -1), -1);
            assert!(sys::get_tid(ctx) > 0);
            sys::exit(ctx, 0);
        })
        .install();

    let pid = process_execute("misc").unwrap();
    assert_eq!(process_wait(pid).unwrap(), 0);
}

#[test]
fn halt_latches_the_power_flag() {
    common::setup();

    Program::new("halter")
        .main(|ctx| {
            sys::halt(ctx);
            unreachable!("the machine should be off");
        })
        .install();

    // The halting thread never reports back, so poll the flag.
    process_execute("halter").unwrap();
    for _ in 0..500 {
        if userproc::shutdown::is_powered_off() {
            return;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    panic!("power-off flag never latched");
}

#[test]
fn threads_created_by_a_program_need_real_arguments() {
    common::setup();

    // A stub address with no code behind it is a wild jump: the process
    // dies with -1 rather than hanging its parent.
    Program::new("wild-stub")
        .main(|ctx| {
            let tid = ctx.syscall(userproc::syscall::SyscallNum::PtCreate as u32, &[
                0x0900_0000, // nothing mapped there
                0x0900_0004,
                0,
            ]);
            // Creation itself succeeds; the stub faults when scheduled
            // and takes the whole process with it.
            assert!(tid > 0);
            loop {
                std::thread::yield_now();
            }
        })
        .install();

    let pid = process_execute("wild-stub").unwrap();
    assert_eq!(process_wait(pid).unwrap(), -1);
}
