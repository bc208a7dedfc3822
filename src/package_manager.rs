//! External package manager invocation
//!
//! Installing into an Unreal project and publishing either engine's package
//! both shell out to npm. The [`PackageManager`] trait is the seam between the
//! orchestration logic and the subprocess, so the logic can be exercised with
//! a fake in tests.

use crate::config::SubprocessConfig;
use crate::{Error, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// How long to keep reading output once the process itself has exited or been
/// killed. Descendants that inherited the pipes can keep them open forever.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

pub trait PackageManager {
    /// Install `id@version` from `registry_url` into the project at `cwd`
    fn install_dependency(
        &self,
        id: &str,
        version: &str,
        registry_url: &str,
        cwd: &Path,
    ) -> Result<CommandOutput>;

    /// Publish the package in `cwd` to `registry_url`
    fn publish(&self, registry_url: &str, cwd: &Path) -> Result<CommandOutput>;
}

/// npm command line client
#[derive(Debug, Clone)]
pub struct NpmCli {
    program: String,
    timeout: Option<Duration>,
}

impl NpmCli {
    pub fn new(program: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &SubprocessConfig) -> Self {
        let timeout = match config.timeout_seconds {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self::new(config.program.clone(), timeout)
    }

    pub fn install_args(id: &str, version: &str, registry_url: &str) -> Vec<String> {
        let mut args = vec!["install".to_string(), format!("{}@{}", id, version)];
        if !registry_url.is_empty() {
            args.push(format!("--registry={}", registry_url));
        }
        args
    }

    pub fn publish_args(registry_url: &str) -> Vec<String> {
        let mut args = vec!["publish".to_string()];
        if !registry_url.is_empty() {
            args.push(format!("--registry={}", registry_url));
        }
        args
    }

    fn run(&self, args: &[String], cwd: &Path) -> Result<CommandOutput> {
        let command_line = format!("{} {}", self.program, args.join(" "));
        tracing::info!(command = %command_line, cwd = %cwd.display(), "running package manager");

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        own_process_group(&mut command);

        let child = command
            .spawn()
            .map_err(|e| Error::Other(format!("Failed to start `{}`: {}", self.program, e)))?;

        run_to_completion(child, &command_line, self.timeout)
    }
}

impl PackageManager for NpmCli {
    fn install_dependency(
        &self,
        id: &str,
        version: &str,
        registry_url: &str,
        cwd: &Path,
    ) -> Result<CommandOutput> {
        self.run(&Self::install_args(id, version, registry_url), cwd)
    }

    fn publish(&self, registry_url: &str, cwd: &Path) -> Result<CommandOutput> {
        self.run(&Self::publish_args(registry_url), cwd)
    }
}

/// Wait for `child`, collecting its output, killing it once `timeout` elapses
///
/// On timeout the whole process tree is killed. Output is read for at most
/// [`DRAIN_GRACE`] after the child is gone, so a descendant holding the pipes
/// open cannot stall the caller.
fn run_to_completion(
    mut child: Child,
    command_line: &str,
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    // Drain both pipes concurrently so a chatty process cannot block on a full pipe
    let stdout = child.stdout.take().map(Drain::spawn);
    let stderr = child.stderr.take().map(Drain::spawn);

    let status = wait_with_timeout(&mut child, timeout)?;

    let deadline = Instant::now() + DRAIN_GRACE;
    let output = CommandOutput {
        stdout: stdout.map(|d| d.finish(deadline)).unwrap_or_default(),
        stderr: stderr.map(|d| d.finish(deadline)).unwrap_or_default(),
    };

    match status {
        Some(status) if status.success() => Ok(output),
        Some(status) => Err(Error::CommandFailed {
            command: command_line.to_string(),
            status: describe_status(status),
            stderr: output.stderr,
        }),
        None => Err(Error::CommandTimedOut {
            command: command_line.to_string(),
            timeout: timeout.unwrap_or_default(),
        }),
    }
}

/// `Ok(None)` means the process tree was killed after the timeout
fn wait_with_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<Option<ExitStatus>> {
    let Some(timeout) = timeout else {
        return Ok(Some(child.wait()?));
    };

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if start.elapsed() >= timeout {
            tracing::warn!(pid = child.id(), ?timeout, "package manager timed out, killing it");
            kill_tree(child);
            // The direct child may already be gone if the tree kill reached it
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// Put the child in a new process group so a timeout can kill its descendants
#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill `child` and everything it started
fn kill_tree(child: &Child) {
    let pid = child.id().to_string();

    #[cfg(unix)]
    let result = Command::new("kill")
        .args(["-KILL", "--", &format!("-{}", pid)])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    #[cfg(windows)]
    let result = Command::new("taskkill")
        .args(["/F", "/T", "/PID", &pid])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    #[cfg(not(any(unix, windows)))]
    let result: std::io::Result<ExitStatus> = Err(std::io::ErrorKind::Unsupported.into());

    if let Err(e) = result {
        tracing::debug!(pid = %pid, error = %e, "could not kill process tree");
    }
}

/// Background reader for one output pipe
///
/// Bytes are collected into a shared buffer so whatever arrived before the
/// deadline is still returned when the pipe never reaches end of file.
struct Drain {
    buf: Arc<Mutex<Vec<u8>>>,
    done: Receiver<()>,
}

impl Drain {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let (tx, done) = mpsc::channel();

        let sink = Arc::clone(&buf);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match pipe.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut buf) => buf.extend_from_slice(&chunk[..n]),
                        Err(_) => break,
                    },
                }
            }
            let _ = tx.send(());
        });

        Self { buf, done }
    }

    /// Wait for end of file until `deadline`, then return what was read
    fn finish(self, deadline: Instant) -> String {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let _ = self.done.recv_timeout(remaining);
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => String::new(),
        }
    }
}

fn describe_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
