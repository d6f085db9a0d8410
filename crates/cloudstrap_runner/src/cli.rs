//! Process-based tool runner.
//!
//! Spawns the external tool as a child process, captures stdout and stderr,
//! optionally echoes them line by line, and waits for termination. A process
//! that outlives its timeout is interrupted, then killed, and whatever it
//! printed up to that point is still returned.

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{Invocation, RunConfig};
use crate::error::{RunnerError, RunnerResult};
use crate::runner::{ExecutionResult, ToolRunner};

/// Log output from tool execution.
#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: chrono::DateTime<Utc>,
    pub stream: LogStream,
    pub message: String,
}

/// Log stream type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}

/// Log handler callback type.
pub type LogHandler = Arc<dyn Fn(LogLine) + Send + Sync>;

/// Process runner options.
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Dry-run mode (log commands without executing)
    pub dry_run: bool,
    /// CI mode (timestamped log lines)
    pub ci_mode: bool,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            ci_mode: std::env::var("CI").is_ok(),
        }
    }
}

impl RunnerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    pub fn ci_mode(mut self) -> Self {
        self.ci_mode = true;
        self
    }
}

/// Tool runner backed by real child processes.
pub struct CliToolRunner {
    options: RunnerOptions,
    log_handler: Option<LogHandler>,
}

impl CliToolRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            options,
            log_handler: None,
        }
    }

    /// Set a log handler for streamed lines.
    pub fn with_log_handler(mut self, handler: LogHandler) -> Self {
        self.log_handler = Some(handler);
        self
    }

    /// Check if dry-run mode is enabled.
    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Drain one output stream into a shared buffer, echoing lines when asked.
    fn collect_stream<R>(&self, reader: R, stream: LogStream, echo: bool) -> Capture
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let ci_mode = self.options.ci_mode;
        let handler = self.log_handler.clone();
        let buffer = Arc::new(Mutex::new(String::new()));
        let sink = Arc::clone(&buffer);

        let handle = tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                {
                    let mut output = sink.lock();
                    output.push_str(&line);
                    output.push('\n');
                }
                if !echo {
                    continue;
                }
                let log_line = LogLine {
                    timestamp: Utc::now(),
                    stream,
                    message: line,
                };
                if ci_mode {
                    println!(
                        "[{}] [{}] {}",
                        log_line.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ"),
                        stream,
                        log_line.message
                    );
                } else {
                    match stream {
                        LogStream::Stdout => println!("{}", log_line.message),
                        LogStream::Stderr => eprintln!("{}", log_line.message),
                    }
                }
                if let Some(handler) = &handler {
                    handler(log_line);
                }
            }
        });

        Capture { buffer, handle }
    }

    async fn execute(
        &self,
        invocation: &Invocation,
        run_config: &RunConfig,
    ) -> RunnerResult<Finished> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args)
            .envs(&invocation.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.workdir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| RunnerError::SpawnFailed {
            program: invocation.program.clone(),
            message: e.to_string(),
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunnerError::ExecutionFailed("stderr was not captured".to_string()))?;

        let stdout_capture = self.collect_stream(stdout, LogStream::Stdout, run_config.stream_logs);
        let stderr_capture = self.collect_stream(stderr, LogStream::Stderr, run_config.stream_logs);

        if run_config.timeout_seconds == 0 {
            let status = child.wait().await?;
            return Ok(Finished {
                exit_code: status.code().unwrap_or(-1) as i64,
                stdout: stdout_capture.finish(None).await,
                stderr: stderr_capture.finish(None).await,
                timed_out: false,
            });
        }

        let timeout = Duration::from_secs(run_config.timeout_seconds);
        let (status, timed_out) = match tokio::time::timeout(timeout, child.wait()).await {
            Ok(status) => (status?, false),
            Err(_) => {
                warn!(
                    "{} exceeded its {}s timeout, stopping it",
                    invocation.program, run_config.timeout_seconds
                );
                (stop(&mut child, run_config.interrupt_grace_seconds).await?, true)
            }
        };

        // A killed process can leave descendants holding the pipes open.
        let drain = timed_out.then_some(OUTPUT_DRAIN);
        let stdout = stdout_capture.finish(drain).await;
        let mut stderr = stderr_capture.finish(drain).await;
        if timed_out {
            stderr.push_str(&format!(
                "{} timed out after {} seconds\n",
                invocation.program, run_config.timeout_seconds
            ));
        }

        Ok(Finished {
            exit_code: status.code().unwrap_or(-1) as i64,
            stdout,
            stderr,
            timed_out,
        })
    }
}

/// How long captured output may keep draining after a forced stop.
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);

/// Output collected from one stream of a running process.
struct Capture {
    buffer: Arc<Mutex<String>>,
    handle: JoinHandle<()>,
}

impl Capture {
    /// Wait for the stream to close (at most `limit`) and take what was read.
    async fn finish(mut self, limit: Option<Duration>) -> String {
        match limit {
            Some(limit) => {
                if tokio::time::timeout(limit, &mut self.handle).await.is_err() {
                    self.handle.abort();
                }
            }
            None => {
                let _ = (&mut self.handle).await;
            }
        }
        let output = std::mem::take(&mut *self.buffer.lock());
        output
    }
}

struct Finished {
    exit_code: i64,
    stdout: String,
    stderr: String,
    timed_out: bool,
}

/// Stop a process that outlived its timeout: SIGINT first so tools like
/// terraform can persist state, SIGKILL once `grace_seconds` have passed.
async fn stop(child: &mut Child, grace_seconds: u64) -> RunnerResult<ExitStatus> {
    if let Some(pid) = child.id() {
        if interrupt(pid).await {
            let grace = Duration::from_secs(grace_seconds);
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(status) => return Ok(status?),
                Err(_) => warn!("Process {} ignored SIGINT for {}s, killing it", pid, grace_seconds),
            }
        }
    }
    let _ = child.start_kill();
    Ok(child.wait().await?)
}

#[cfg(unix)]
async fn interrupt(pid: u32) -> bool {
    Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(not(unix))]
async fn interrupt(_pid: u32) -> bool {
    false
}

#[async_trait]
impl ToolRunner for CliToolRunner {
    async fn is_available(&self, program: &str) -> RunnerResult<bool> {
        if self.options.dry_run {
            info!("[DRY-RUN] Assuming {} is available", program);
            return Ok(true);
        }

        let status = Command::new(program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        Ok(status.map(|s| s.success()).unwrap_or(false))
    }

    async fn run(
        &self,
        invocation: &Invocation,
        run_config: &RunConfig,
    ) -> RunnerResult<ExecutionResult> {
        let command = invocation.command_line();
        debug!("Executing: {}", command);

        if self.options.dry_run {
            info!("[DRY-RUN] Would execute: {}", command);
            return Ok(ExecutionResult {
                stdout: format!("[DRY-RUN] Command: {}", command),
                command,
                exit_code: 0,
                stderr: String::new(),
                started_at: Utc::now(),
                finished_at: Utc::now(),
                duration_ms: 0,
                timed_out: false,
            });
        }

        let started_at = Utc::now();
        let Finished {
            exit_code,
            stdout,
            stderr,
            timed_out,
        } = self.execute(invocation, run_config).await?;
        let finished_at = Utc::now();
        let duration_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

        if timed_out {
            error!(
                "{} timed out after {}ms (exit code {})",
                invocation.program, duration_ms, exit_code
            );
        } else if exit_code == 0 {
            debug!("{} completed in {}ms", invocation.program, duration_ms);
        } else {
            error!(
                "{} exited with code {} after {}ms",
                invocation.program, exit_code, duration_ms
            );
        }

        Ok(ExecutionResult {
            command,
            exit_code,
            stdout,
            stderr,
            started_at,
            finished_at,
            duration_ms,
            timed_out,
        })
    }
}
