//! External process runner.
//!
//! Spawns the scan executable directly (no shell) with a fixed argument
//! template and the target as the final argument. The child runs in its own
//! process group so that a timeout or cancellation can kill the tool together
//! with anything it forked.

use crate::error::RunError;
use crate::runner::{ExitStatus, Runner, ScanResult};
use crate::types::ValidatedTarget;
use async_trait::async_trait;
use chrono::Utc;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Default cap on captured stderr.
pub const DEFAULT_STDERR_LIMIT: usize = 64 * 1024;

const TRUNCATION_NOTE: &str = "\n[stderr truncated]";

/// Runs the scan executable as a child process.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
    stderr_limit: usize,
}

impl ProcessRunner {
    /// Create a runner for `program` invoked as `program <args...> <target>`.
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            stderr_limit: DEFAULT_STDERR_LIMIT,
        }
    }

    /// Set the maximum number of stderr bytes kept.
    pub fn with_stderr_limit(mut self, limit: usize) -> Self {
        self.stderr_limit = limit;
        self
    }

    /// The argument vector that would be executed for `target`.
    pub fn argv(&self, target: &ValidatedTarget) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        argv.push(self.program.display().to_string());
        argv.extend(self.args.iter().cloned());
        argv.push(target.as_str().to_string());
        argv
    }

    fn command(&self, target: &ValidatedTarget) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(target.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn spawn(&self, target: &ValidatedTarget) -> Result<Child, RunError> {
        self.command(target)
            .spawn()
            .map_err(|e| RunError::SpawnFailure {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(
        &self,
        target: &ValidatedTarget,
        timeout: Duration,
    ) -> Result<ScanResult, RunError> {
        let started_at = Utc::now();
        let start = Instant::now();

        let mut child = self.spawn(target)?;
        let mut group = ProcessGroupGuard::new(child.id());
        debug!(pid = ?child.id(), argv = ?self.argv(target), "spawned scan tool");

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            group.kill();
            return Err(RunError::SpawnFailure {
                program: self.program.display().to_string(),
                reason: "child output pipes were not captured".to_string(),
            });
        };

        let limit = self.stderr_limit;
        let collected = tokio::time::timeout(timeout, async {
            tokio::try_join!(
                read_all(stdout),
                read_bounded(stderr, limit),
                child.wait()
            )
        })
        .await;

        let (stdout, (stderr, truncated), status) = match collected {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                group.kill();
                let _ = child.kill().await;
                return Err(RunError::ToolFailure {
                    exit_code: None,
                    stderr: format!("I/O error while collecting output: {}", e),
                });
            }
            Err(_) => {
                group.kill();
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "failed to reap timed out scan tool");
                }
                return Err(RunError::Timeout { after: timeout });
            }
        };
        // Anything the tool left behind in its group goes with it.
        group.kill();

        let mut stderr = String::from_utf8_lossy(&stderr).into_owned();
        if truncated {
            stderr.push_str(TRUNCATION_NOTE);
        }

        match ExitStatus::from_code(status.code()) {
            ExitStatus::Success => Ok(ScanResult {
                target: target.as_str().to_string(),
                output: String::from_utf8_lossy(&stdout).into_owned(),
                stderr,
                exit_status: ExitStatus::Success,
                started_at,
                duration: start.elapsed(),
            }),
            ExitStatus::Failure => Err(RunError::ToolFailure {
                exit_code: status.code(),
                stderr,
            }),
        }
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Keep at most `limit` bytes and drain the rest so the child never blocks
/// on a full pipe. Returns whether anything was dropped.
async fn read_bounded<R: AsyncRead + Unpin>(
    mut reader: R,
    limit: usize,
) -> io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    (&mut reader).take(limit as u64).read_to_end(&mut buf).await?;
    let dropped = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await?;
    Ok((buf, dropped > 0))
}

/// Kills the child's process group at most once.
///
/// Armed from spawn, so a dropped `run` future (client disconnect, shutdown)
/// takes the whole group down with it.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) has no memory-safety preconditions; a negative pid
    // addresses the process group we created at spawn.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %io::Error::last_os_error(), "process group kill failed");
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::types::validate;

    /// A stub scanner: `/bin/sh -c <script> stub <target>`, target is `$1`.
    fn stub(script: &str) -> ProcessRunner {
        ProcessRunner::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string(), "stub".to_string()],
        )
    }

    fn target(s: &str) -> ValidatedTarget {
        validate(s).unwrap()
    }

    #[cfg(target_os = "linux")]
    fn process_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => {
                // State follows the parenthesised command name.
                let state = stat
                    .rsplit_once(')')
                    .and_then(|(_, rest)| rest.trim_start().chars().next());
                !matches!(state, Some('Z') | Some('X') | None)
            }
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    async fn wait_until_dead(pid: i32) -> bool {
        for _ in 0..100 {
            if !process_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[test]
    fn test_argv_puts_target_last() {
        let runner = ProcessRunner::new("nmap", vec!["-F".to_string()]);
        assert_eq!(
            runner.argv(&target("scanme.nmap.org")),
            vec!["nmap", "-F", "scanme.nmap.org"]
        );
    }

    #[tokio::test]
    async fn test_success_returns_stdout_verbatim() {
        let runner = stub(r#"printf 'Nmap scan report for %s\n22/tcp open ssh\n' "$1""#);
        let result = runner
            .run(&target("scanme.nmap.org"), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(result.exit_status, ExitStatus::Success);
        assert_eq!(result.target, "scanme.nmap.org");
        assert_eq!(
            result.output,
            "Nmap scan report for scanme.nmap.org\n22/tcp open ssh\n"
        );
        assert!(result.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_target_is_a_single_argument() {
        let runner = stub(r#"printf '%s' "$#""#);
        let result = runner
            .run(&target("10.0.0.0/24"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(result.output, "1");
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_tool_failure() {
        let runner = stub("echo 'Failed to resolve' >&2; exit 1");
        let err = runner
            .run(&target("nonexistent.invalid"), Duration::from_secs(10))
            .await
            .unwrap_err();

        match err {
            RunError::ToolFailure { exit_code, stderr } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(stderr, "Failed to resolve\n");
            }
            other => panic!("expected ToolFailure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stderr_is_bounded() {
        let runner = stub("head -c 100000 /dev/zero | tr '\\0' x >&2; echo done").with_stderr_limit(16);
        let result = runner
            .run(&target("localhost"), Duration::from_secs(10))
            .await
            .unwrap();

        assert_eq!(result.output, "done\n");
        assert_eq!(result.stderr, format!("{}{}", "x".repeat(16), TRUNCATION_NOTE));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_failure() {
        let runner = ProcessRunner::new("/nonexistent/nmap", vec![]);
        let err = runner
            .run(&target("localhost"), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::SpawnFailure { ref program, .. } if program == "/nonexistent/nmap"));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_timeout_kills_process_and_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let pids = dir.path().join("pids");
        let script = format!(
            "sleep 30 & echo $! > {0}; echo $$ >> {0}; wait",
            pids.display()
        );
        let runner = stub(&script);

        let started = Instant::now();
        let err = runner
            .run(&target("localhost"), Duration::from_millis(300))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RunError::Timeout {
                after: Duration::from_millis(300)
            }
        );
        assert!(started.elapsed() < Duration::from_secs(5));

        let recorded = std::fs::read_to_string(&pids).unwrap();
        let recorded: Vec<i32> = recorded.lines().map(|l| l.trim().parse().unwrap()).collect();
        assert_eq!(recorded.len(), 2);
        for pid in recorded {
            assert!(wait_until_dead(pid).await, "process {} still running", pid);
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_completed_run_kills_detached_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let script = format!(
            "sleep 30 >/dev/null 2>&1 </dev/null & echo $! > {}; echo done",
            pidfile.display()
        );
        let runner = stub(&script);

        let result = runner
            .run(&target("localhost"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(result.output, "done\n");

        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_dead(pid).await, "process {} still running", pid);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_failed_run_kills_detached_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let script = format!(
            "sleep 30 >/dev/null 2>&1 </dev/null & echo $! > {}; exit 3",
            pidfile.display()
        );
        let runner = stub(&script);

        let err = runner
            .run(&target("localhost"), Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::ToolFailure { exit_code: Some(3), .. }));

        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_dead(pid).await, "process {} still running", pid);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_run_kills_process() {
        let dir = tempfile::tempdir().unwrap();
        let pidfile = dir.path().join("pid");
        let script = format!("echo $$ > {}; exec sleep 30", pidfile.display());
        let runner = stub(&script);
        let target = target("localhost");

        let run = runner.run(&target, Duration::from_secs(60));
        // Abandon the scan once the stub has started.
        let _ = tokio::time::timeout(Duration::from_millis(300), run).await;

        let pid: i32 = std::fs::read_to_string(&pidfile)
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_dead(pid).await, "process {} still running", pid);
    }
}
