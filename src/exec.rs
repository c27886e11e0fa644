//! Bounded execution of external programs (syntax checkers, systemctl).

use command_group::{AsyncCommandGroup, AsyncGroupChild};
use std::fmt;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    /// Terminated by a signal, no exit code
    Signaled,
    TimedOut(Duration),
    LaunchFailed(String),
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStatus::Exited(code) => write!(f, "exit code {}", code),
            ProcessStatus::Signaled => write!(f, "terminated by signal"),
            ProcessStatus::TimedOut(limit) => {
                write!(f, "TIMEOUT after {}s (process killed)", limit.as_secs_f32())
            }
            ProcessStatus::LaunchFailed(reason) => write!(f, "failed to launch: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Command line as it would be typed, for the report
    pub command: String,
    pub status: ProcessStatus,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandOutcome {
    pub fn exit_code(&self) -> Option<i32> {
        match self.status {
            ProcessStatus::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code() == Some(0)
    }

    pub fn timed_out(&self) -> bool {
        matches!(self.status, ProcessStatus::TimedOut(_))
    }
}

/// Runs a program to completion or until `timeout` elapses.
///
/// Implementations never return an error: launch failures and timeouts are
/// reported through [`ProcessStatus`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> CommandOutcome;
}

/// Runs real processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn combine(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (true, true) => String::new(),
        (false, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], timeout: Duration) -> CommandOutcome {
        let command = command_line(program, args);
        debug!("Running `{}` (timeout {:?})", command, timeout);

        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Failed to start runtime for `{}`: {}", command, e);
                return CommandOutcome {
                    command,
                    status: ProcessStatus::LaunchFailed(e.to_string()),
                    output: String::new(),
                };
            }
        };
        runtime.block_on(run_bounded(program, args, timeout, command))
    }
}

async fn read_all<R: AsyncRead + Unpin>(pipe: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    buf
}

#[cfg(unix)]
fn kill_group(pgid: Option<u32>) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = pgid else {
        return;
    };
    if let Err(e) = kill(Pid::from_raw(-(pgid as i32)), Signal::SIGKILL) {
        if e != nix::errno::Errno::ESRCH {
            warn!("SIGKILL to process group {} failed: {}", pgid, e);
        }
    }
}

/// The deadline covers the process group and both pipes: a background
/// process that keeps stdout open counts as still running.
async fn run_bounded(
    program: &str,
    args: &[String],
    timeout: Duration,
    command: String,
) -> CommandOutcome {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child: AsyncGroupChild = match cmd.group_spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to launch `{}`: {}", command, e);
            return CommandOutcome {
                command,
                status: ProcessStatus::LaunchFailed(e.to_string()),
                output: String::new(),
            };
        }
    };
    let pgid = child.inner().id();
    let stdout = child.inner().stdout.take();
    let stderr = child.inner().stderr.take();

    let finished = tokio::time::timeout(timeout, async {
        tokio::join!(read_all(stdout), read_all(stderr), child.wait())
    })
    .await;

    let (stdout, stderr, status) = match finished {
        Ok(done) => done,
        Err(_) => {
            warn!("`{}` exceeded {:?}, killing its process group", command, timeout);
            #[cfg(unix)]
            kill_group(pgid);
            let _ = child.kill().await;
            let _ = child.wait().await;
            return CommandOutcome {
                command,
                status: ProcessStatus::TimedOut(timeout),
                output: String::new(),
            };
        }
    };

    let status = match status {
        Ok(status) => match status.code() {
            Some(code) => ProcessStatus::Exited(code),
            None => ProcessStatus::Signaled,
        },
        Err(e) => ProcessStatus::LaunchFailed(e.to_string()),
    };
    debug!("`{}` finished: {}", command, status);

    CommandOutcome {
        command,
        status,
        output: combine(&stdout, &stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn args(a: &[&str]) -> Vec<String> {
        a.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_command_line() {
        assert_eq!(
            command_line("systemctl", &args(&["restart", "bind9"])),
            "systemctl restart bind9"
        );
        assert_eq!(command_line("named-checkconf", &[]), "named-checkconf");
    }

    #[test]
    fn test_combine_output() {
        assert_eq!(combine(b"out\n", b""), "out");
        assert_eq!(combine(b"", b"err\n"), "err");
        assert_eq!(combine(b"out\n", b"err\n"), "out\nerr");
        assert_eq!(combine(b"\n", b" \n"), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_exit_codes_and_output() {
        let outcome = SystemRunner.run(
            "sh",
            &args(&["-c", "echo hello; echo oops >&2; exit 3"]),
            Duration::from_secs(10),
        );
        assert_eq!(outcome.status, ProcessStatus::Exited(3));
        assert_eq!(outcome.exit_code(), Some(3));
        assert!(!outcome.succeeded());
        assert_eq!(outcome.output, "hello\noops");
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_timeout() {
        let started = Instant::now();
        let outcome = SystemRunner.run("sleep", &args(&["5"]), Duration::from_millis(200));
        assert!(outcome.timed_out());
        assert_eq!(outcome.exit_code(), None);
        assert!(started.elapsed() < Duration::from_secs(4));
        assert!(outcome.status.to_string().starts_with("TIMEOUT"));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_background_child_holding_pipes_times_out() {
        let started = Instant::now();
        let outcome = SystemRunner.run(
            "sh",
            &args(&["-c", "sleep 6 & exit 0"]),
            Duration::from_millis(500),
        );
        assert!(outcome.timed_out(), "{}", outcome.status);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_system_runner_background_child_without_pipes_is_fine() {
        let outcome = SystemRunner.run(
            "sh",
            &args(&["-c", "sleep 6 >/dev/null 2>&1 & echo done"]),
            Duration::from_secs(3),
        );
        assert_eq!(outcome.status, ProcessStatus::Exited(0));
        assert_eq!(outcome.output, "done");
    }

    #[test]
    fn test_system_runner_launch_failure() {
        let outcome = SystemRunner.run(
            "/nonexistent/netprov-checker",
            &[],
            Duration::from_secs(1),
        );
        assert!(matches!(outcome.status, ProcessStatus::LaunchFailed(_)));
        assert!(!outcome.succeeded());
    }
}
