use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Wall-clock limit for one test executable; `None` waits forever.
    pub wall_timeout: Option<Duration>,
}

/// Termination status and stdout of one executed test program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Exit code, or `128 + signal` for a signal-terminated process.
    pub exit_status: i32,
    pub exit_signal: Option<i32>,
    pub stdout: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    Finished(ExecutionResult),
    TimedOut { limit: Duration },
}

/// Run `artifact_path` in `cwd` and capture its stdout.
///
/// Stdin is empty and stderr is discarded. A nonzero exit is data; only a failure
/// to launch or wait on the process is an `Err`.
pub fn run_artifact_file(
    config: &RunnerConfig,
    artifact_path: &Path,
    cwd: &Path,
) -> Result<Execution> {
    let artifact_abs = std::fs::canonicalize(artifact_path)
        .with_context(|| format!("canonicalize artifact path: {}", artifact_path.display()))?;

    let mut cmd = Command::new(&artifact_abs);
    cmd.current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    // Own process group, so a timeout also reaches whatever the program forked.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt as _;
        cmd.process_group(0);
    }
    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawn artifact: {}", artifact_path.display()))?;

    let mut stdout = child.stdout.take().context("take stdout")?;
    let stdout_thread = std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf)?;
        Ok(buf)
    });

    let (status, timed_out) = match config.wall_timeout {
        Some(limit) => wait_child_with_wall_timeout(&mut child, limit)?,
        None => (child.wait().context("wait child")?, false),
    };
    let stdout_bytes = join_stdout_reader(stdout_thread)?;

    if timed_out {
        let limit = config.wall_timeout.unwrap_or_default();
        tracing::debug!(artifact = %artifact_path.display(), ?limit, "artifact timed out");
        return Ok(Execution::TimedOut { limit });
    }

    let (exit_status, exit_signal) = exit_status_of(status);
    tracing::debug!(
        artifact = %artifact_path.display(),
        exit_status,
        stdout_len = stdout_bytes.len(),
        "artifact finished"
    );
    Ok(Execution::Finished(ExecutionResult {
        exit_status,
        exit_signal,
        stdout: stdout_bytes,
    }))
}

fn wait_child_with_wall_timeout(child: &mut Child, limit: Duration) -> Result<(ExitStatus, bool)> {
    let deadline = Instant::now().checked_add(limit);

    loop {
        if let Some(status) = child.try_wait().context("try_wait child")? {
            return Ok((status, false));
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            hard_kill_pid_and_group(child.id());
            let _ = child.kill();
            let status = child.wait().context("wait child after kill")?;
            return Ok((status, true));
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

/// Kill the child's process group; the reader only sees EOF once every holder of
/// the stdout pipe is gone.
fn hard_kill_pid_and_group(pid: u32) {
    #[cfg(unix)]
    {
        let Ok(pid) = i32::try_from(pid) else {
            return;
        };
        unsafe {
            let _ = libc::killpg(pid, libc::SIGKILL);
        }
    }
    #[cfg(not(unix))]
    let _ = pid;
}

fn join_stdout_reader(
    handle: std::thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout reader thread panicked"))?
        .context("read child stdout")
}

/// Split a status into an integer exit status and the terminating signal, if any.
pub(crate) fn exit_status_of(status: ExitStatus) -> (i32, Option<i32>) {
    #[cfg(unix)]
    let exit_signal = {
        use std::os::unix::process::ExitStatusExt as _;
        status.signal()
    };
    #[cfg(not(unix))]
    let exit_signal: Option<i32> = None;

    let exit_status = match status.code() {
        Some(code) => code,
        None => exit_signal.map(|s| 128 + s).unwrap_or(1),
    };
    (exit_status, exit_signal)
}
