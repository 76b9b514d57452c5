//! Process runner
//!
//! Spawns exactly one child per call, captures its output and reports the
//! exit status as data. A non-zero exit is not an error here; callers decide
//! whether it is fatal. The child runs in its own process group, and the
//! whole group is killed when the call is abandoned or times out.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::errors::ConjureError;
use crate::process::window::OutputWindow;

const READ_CHUNK: usize = 512;

/// Callback receiving the bounded tail of output as it arrives
pub type ChunkCallback<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// A single command execution request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,

    /// Layered on top of the inherited environment
    pub env: HashMap<String, String>,

    /// Bytes written to the child's stdin, which is closed afterwards
    pub stdin: Option<Vec<u8>>,

    pub timeout: Option<Duration>,
    pub current_dir: Option<PathBuf>,
}

impl Invocation {
    /// Run an executable directly
    pub fn script(path: impl Into<PathBuf>) -> Self {
        Self {
            program: path.into(),
            args: Vec::new(),
            env: HashMap::new(),
            stdin: None,
            timeout: None,
            current_dir: None,
        }
    }

    /// Run a command line through `/bin/sh -c`
    pub fn shell(command: &str) -> Self {
        Self::script("/bin/sh").arg("-c").arg(command)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &HashMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(dir) = &self.current_dir {
            command.current_dir(dir);
        }

        #[cfg(unix)]
        command.process_group(0);

        command
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// What a finished process left behind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, -1 when the process was ended by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes external commands
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run to completion and capture output
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ConjureError>;

    /// Like [`ProcessRunner::run`], also invoking `on_chunk` with the bounded
    /// output tail whenever new text is decoded
    async fn run_streaming(
        &self,
        invocation: &Invocation,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<ProcessOutput, ConjureError>;
}

/// Production runner backed by `tokio::process`
#[derive(Debug, Clone, Default)]
pub struct TokioProcessRunner;

impl TokioProcessRunner {
    pub fn new() -> Self {
        Self
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        on_chunk: Option<ChunkCallback<'_>>,
    ) -> Result<ProcessOutput, ConjureError> {
        debug!("Running {}", invocation);

        let mut child = invocation.command().spawn().map_err(|e| {
            ConjureError::Process(format!("failed to spawn {}: {}", invocation, e))
        })?;
        let mut group = ProcessGroupGuard::new(child.id());

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let input = invocation.stdin.clone();

        let work = async {
            let feed_stdin = async move {
                if let (Some(mut pipe), Some(input)) = (stdin, input) {
                    // A child that never reads its stdin is not an error
                    if let Err(e) = pipe.write_all(&input).await {
                        debug!("stdin not fully consumed: {}", e);
                    }
                }
            };

            let (_, window, errors) = tokio::join!(
                feed_stdin,
                read_stdout(stdout, on_chunk),
                read_all(stderr)
            );
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, window?, errors?))
        };

        let finished = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| {
                ConjureError::Process(format!(
                    "{} timed out after {}s",
                    invocation,
                    limit.as_secs_f64()
                ))
            })?,
            None => work.await,
        };

        let (status, window, errors) = finished
            .map_err(|e| ConjureError::Process(format!("waiting for {}: {}", invocation, e)))?;
        group.disarm();

        if let Some(callback) = on_chunk {
            callback(&window.tail());
        }

        Ok(ProcessOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: window.into_text(),
            stderr: String::from_utf8_lossy(&errors).into_owned(),
        })
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput, ConjureError> {
        self.execute(invocation, None).await
    }

    async fn run_streaming(
        &self,
        invocation: &Invocation,
        on_chunk: ChunkCallback<'_>,
    ) -> Result<ProcessOutput, ConjureError> {
        self.execute(invocation, Some(on_chunk)).await
    }
}

async fn read_stdout<R>(
    pipe: Option<R>,
    on_chunk: Option<ChunkCallback<'_>>,
) -> Result<OutputWindow, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut window = OutputWindow::new();
    let Some(mut pipe) = pipe else {
        return Ok(window);
    };

    let mut buf = [0u8; READ_CHUNK];
    loop {
        let n = pipe.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        if window.push(&buf[..n]) {
            if let Some(callback) = on_chunk {
                callback(&window.tail());
            }
        }
    }
    window.finish();
    Ok(window)
}

async fn read_all<R>(pipe: Option<R>) -> Result<Vec<u8>, std::io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kills the child's process group on drop unless disarmed
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pgid: Option<u32>) -> Self {
        Self { pgid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

/// Signals the group without blocking the caller. `kill` is reaped on a
/// plain thread since this runs inside `Drop` on a runtime worker.
#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    let target = format!("-{}", pgid);
    let spawned = std::process::Command::new("kill")
        .args(["-KILL", "--", &target])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();

    match spawned {
        Ok(mut kill) => {
            debug!("Killing process group {}", pgid);
            std::thread::spawn(move || {
                if let Err(e) = kill.wait() {
                    warn!("Failed to reap kill for process group {}: {}", pgid, e);
                }
            });
        }
        Err(e) => warn!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}
