use std::{
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
    thread,
    time::{Duration, Instant},
};

use nix::{
    sys::{
        signal::{kill, raise, Signal},
        stat::fstat,
        wait::{waitpid, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};
use tush::{
    cmd::execution_plan::{CommandSyntaxError, ControlToken},
    dispatch, initialize,
    process::{status::ChildStatus, ProcessError},
    reap_background, DispatchError, Outcome,
};

// These tests fork, remap this process's stdin/stdout and reap with
// waitpid(-1), so they must not overlap.
static SERIAL: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    let guard = SERIAL.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    initialize().unwrap();
    guard
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

/// (device, inode) of one of our own descriptors.
fn target_of(fd: i32) -> (u64, u64) {
    let stat = fstat(fd).unwrap();
    (stat.st_dev as u64, stat.st_ino as u64)
}

fn kill_and_wait(pid: Pid) {
    let _ = kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}

#[test]
fn plain_command_runs_in_foreground() {
    let _guard = serial();

    assert_eq!(
        dispatch(&["true"]).unwrap(),
        Outcome::Completed(Some(ChildStatus::Exited(0)))
    );
    assert_eq!(
        dispatch(&["false"]).unwrap(),
        Outcome::Completed(Some(ChildStatus::Exited(1)))
    );
}

#[test]
fn missing_program_only_fails_the_child() {
    let _guard = serial();

    assert_eq!(
        dispatch(&["tush-test-no-such-program"]).unwrap(),
        Outcome::Completed(Some(ChildStatus::Exited(1)))
    );

    // the interpreter is still usable
    assert_eq!(
        dispatch(&["true"]).unwrap(),
        Outcome::Completed(Some(ChildStatus::Exited(0)))
    );
}

#[test]
fn syntax_errors_spawn_nothing() {
    let _guard = serial();

    let err = dispatch(&["ls", "|"]).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Syntax(CommandSyntaxError::MissingOperand(ControlToken::Pipe))
    ));
    assert!(!err.is_fatal());
    assert!(reap_background().unwrap().is_empty());
}

#[test]
fn output_redirection_writes_file_and_restores_stdout() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let before = target_of(1);

    let outcome = dispatch(&["echo", "hello", ">", path_str(&out)]).unwrap();

    assert_eq!(outcome, Outcome::Completed(Some(ChildStatus::Exited(0))));
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
    assert_eq!(target_of(1), before);

    // truncated, not appended
    dispatch(&["echo", "world", ">", path_str(&out)]).unwrap();
    assert_eq!(fs::read_to_string(&out).unwrap(), "world\n");
}

#[test]
fn input_redirection_feeds_file_and_restores_stdin() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    let copy = dir.path().join("copy.txt");
    fs::write(&input, "one\ntwo\nthree\n").unwrap();
    let before = target_of(0);

    let script = format!("cat > '{}'", copy.display());
    let outcome = dispatch(&["sh", "-c", &script, "<", path_str(&input)]).unwrap();

    assert_eq!(outcome, Outcome::Completed(Some(ChildStatus::Exited(0))));
    assert_eq!(fs::read_to_string(&copy).unwrap(), "one\ntwo\nthree\n");
    assert_eq!(target_of(0), before);
}

#[test]
fn missing_input_file_is_recoverable() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let before = target_of(0);

    let err = dispatch(&["cat", "<", path_str(&missing)]).unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Process(ProcessError::Open { .. })
    ));
    assert!(!err.is_fatal());
    assert_eq!(target_of(0), before);
}

#[test]
fn redirect_file_name_ends_the_command() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let outcome = dispatch(&["echo", "hi", ">", path_str(&out), "extra"]).unwrap();

    assert_eq!(outcome, Outcome::Completed(Some(ChildStatus::Exited(0))));
    assert_eq!(fs::read_to_string(&out).unwrap(), "hi\n");
}

#[test]
fn input_redirect_before_a_pipe_runs_only_the_first_command() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    fs::write(&input, "one\ntwo\nthree\n").unwrap();
    let before = target_of(0);

    // cat would fail on a `|` argument
    let outcome = dispatch(&["cat", "<", path_str(&input), "|", "wc", "-l"]).unwrap();

    assert_eq!(outcome, Outcome::Completed(Some(ChildStatus::Exited(0))));
    assert_eq!(target_of(0), before);
}

#[test]
fn pipeline_carries_bytes_between_stages() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let sink = format!("cat > '{}'", out.display());

    let outcome = dispatch(&["printf", "a b\\nc", "|", "sh", "-c", &sink]).unwrap();

    assert_eq!(
        outcome,
        Outcome::Pipeline(vec![
            Some(ChildStatus::Exited(0)),
            Some(ChildStatus::Exited(0))
        ])
    );
    assert_eq!(fs::read_to_string(&out).unwrap(), "a b\nc");
}

#[test]
fn pipeline_with_empty_output_reaches_end_of_stream() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let sink = format!("cat > '{}'", out.display());

    // would hang if any write end stayed open
    dispatch(&["true", "|", "sh", "-c", &sink]).unwrap();

    assert_eq!(fs::read_to_string(&out).unwrap(), "");
}

#[test]
fn pipeline_counts_lines() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("count.txt");
    let sink = format!("wc -l > '{}'", out.display());

    dispatch(&["printf", "1\\n2\\n3\\n", "|", "sh", "-c", &sink]).unwrap();

    assert_eq!(fs::read_to_string(&out).unwrap().trim(), "3");
}

#[test]
fn pipeline_waits_for_both_sides_when_one_is_missing() {
    let _guard = serial();

    let outcome = dispatch(&["tush-test-no-such-program", "|", "cat"]).unwrap();

    assert_eq!(
        outcome,
        Outcome::Pipeline(vec![
            Some(ChildStatus::Exited(1)),
            Some(ChildStatus::Exited(0))
        ])
    );
}

#[test]
fn background_returns_immediately_and_is_reaped() {
    let _guard = serial();

    let started = Instant::now();
    let outcome = dispatch(&["sleep", "1", "&"]).unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));

    let Outcome::Background(pid) = outcome else {
        panic!("expected a background launch, got {outcome:?}");
    };

    assert!(reap_background().unwrap().iter().all(|r| r.pid != pid));

    let deadline = Instant::now() + Duration::from_secs(10);
    let reaped = loop {
        if let Some(reaped) = reap_background().unwrap().into_iter().find(|r| r.pid == pid) {
            break reaped;
        }
        assert!(Instant::now() < deadline, "background child was never reaped");
        thread::sleep(Duration::from_millis(50));
    };

    // `&` never reached sleep, which would have rejected it
    assert_eq!(reaped.status, ChildStatus::Exited(0));
}

#[test]
fn reaper_never_blocks() {
    let _guard = serial();

    let started = Instant::now();
    assert!(reap_background().unwrap().is_empty());

    let pids = (0..3)
        .map(|_| match dispatch(&["sleep", "5", "&"]).unwrap() {
            Outcome::Background(pid) => pid,
            outcome => panic!("expected a background launch, got {outcome:?}"),
        })
        .collect::<Vec<_>>();

    assert!(reap_background().unwrap().is_empty());
    assert!(started.elapsed() < Duration::from_secs(1));

    for pid in pids {
        kill_and_wait(pid);
    }
}

#[cfg(target_os = "linux")]
#[test]
fn no_descriptor_leaks() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let count = || fs::read_dir("/proc/self/fd").unwrap().count();

    let baseline = count();

    for _ in 0..5 {
        dispatch(&["echo", "x", "|", "cat"]).unwrap();
        dispatch(&["echo", "x", ">", path_str(&out)]).unwrap();
        dispatch(&["cat", "<", path_str(&out)]).unwrap();
        let _ = dispatch(&["cat", "<", path_str(&dir.path().join("missing"))]);
    }

    assert_eq!(count(), baseline);
}

#[test]
fn interrupts_spare_background_launches() {
    let _guard = serial();

    let outcome = dispatch(&["sleep", "5", "&"]).unwrap();
    let Outcome::Background(pid) = outcome else {
        panic!("expected a background launch, got {outcome:?}");
    };

    // let it reach exec
    thread::sleep(Duration::from_millis(300));
    kill(pid, Signal::SIGINT).unwrap();

    thread::sleep(Duration::from_millis(100));
    assert_eq!(
        waitpid(pid, Some(WaitPidFlag::WNOHANG)).unwrap(),
        WaitStatus::StillAlive
    );

    // the interpreter itself ignores the interrupt
    raise(Signal::SIGINT).unwrap();

    kill_and_wait(pid);
}

/// Children of this process, read from `/proc/<pid>/stat`.
#[cfg(target_os = "linux")]
fn children_of_self() -> Vec<Pid> {
    let me = std::process::id().to_string();

    fs::read_dir("/proc")
        .unwrap()
        .filter_map(|entry| entry.ok()?.file_name().to_str()?.parse::<i32>().ok())
        .filter(|pid| {
            fs::read_to_string(format!("/proc/{pid}/stat"))
                .ok()
                .and_then(|stat| {
                    let fields = stat.rsplit(')').next()?.to_owned();
                    fields.split_whitespace().nth(1).map(str::to_owned)
                })
                .as_deref()
                == Some(me.as_str())
        })
        .map(Pid::from_raw)
        .collect()
}

/// Dispatches `line` on another thread and returns once `count` children
/// have started and had time to exec.
#[cfg(target_os = "linux")]
fn dispatch_in_background_thread(
    line: &[&str],
    count: usize,
) -> (thread::JoinHandle<Result<Outcome, DispatchError>>, Vec<Pid>) {
    let line = line.iter().map(|token| token.to_string()).collect::<Vec<_>>();
    let handle = thread::spawn(move || {
        let tokens = line.iter().map(String::as_str).collect::<Vec<_>>();
        dispatch(&tokens)
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    let pids = loop {
        let pids = children_of_self();
        if pids.len() == count {
            break pids;
        }
        assert!(Instant::now() < deadline, "children never started");
        thread::sleep(Duration::from_millis(20));
    };

    // let them reach exec
    thread::sleep(Duration::from_millis(300));

    (handle, pids)
}

#[cfg(target_os = "linux")]
#[test]
fn foreground_children_take_interrupts() {
    let _guard = serial();

    let (handle, pids) = dispatch_in_background_thread(&["sleep", "5"], 1);
    kill(pids[0], Signal::SIGINT).unwrap();

    assert_eq!(
        handle.join().unwrap().unwrap(),
        Outcome::Completed(Some(ChildStatus::Signaled(Signal::SIGINT)))
    );
}

#[cfg(target_os = "linux")]
#[test]
fn pipeline_stages_take_interrupts() {
    let _guard = serial();

    let (handle, pids) = dispatch_in_background_thread(&["sleep", "5", "|", "cat"], 2);
    for pid in pids {
        kill(pid, Signal::SIGINT).unwrap();
    }

    assert_eq!(
        handle.join().unwrap().unwrap(),
        Outcome::Pipeline(vec![
            Some(ChildStatus::Signaled(Signal::SIGINT)),
            Some(ChildStatus::Signaled(Signal::SIGINT))
        ])
    );
}

#[cfg(target_os = "linux")]
#[test]
fn redirected_children_take_interrupts() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");

    let (handle, pids) = dispatch_in_background_thread(&["sleep", "5", ">", path_str(&out)], 1);
    kill(pids[0], Signal::SIGINT).unwrap();

    assert_eq!(
        handle.join().unwrap().unwrap(),
        Outcome::Completed(Some(ChildStatus::Signaled(Signal::SIGINT)))
    );
}
