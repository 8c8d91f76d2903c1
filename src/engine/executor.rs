//! Blocking external process execution.
//!
//! The harness core never suspends; the only blocking point per case is the
//! pipeline invocation here. A timeout, when configured, is fatal for the
//! case with no retry.

use std::io::Read;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow, bail};
use tracing::debug;

/// External pipeline executor collaborator.
pub trait Executor {
    /// Run a single command line to completion, returning the combined
    /// stdout/stderr. Non-zero exit fails the case, with the raw output
    /// preserved as diagnostic context.
    fn call(&self, command: &str) -> Result<String>;

    /// `call` with a per-case timeout override. Implementations without
    /// timeout support just delegate.
    fn call_with_timeout(&self, command: &str, _timeout: Option<Duration>) -> Result<String> {
        self.call(command)
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How much trailing output to keep in failure messages.
const TAIL_BYTES: usize = 2048;

fn output_tail(output: &str) -> &str {
    let mut start = output.len().saturating_sub(TAIL_BYTES);
    while start < output.len() && !output.is_char_boundary(start) {
        start += 1;
    }
    &output[start..]
}

/// Spawns the command with captured output, polling for completion so an
/// optional timeout can kill a wedged pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor {
    pub timeout: Option<Duration>,
}

impl ProcessExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        ProcessExecutor { timeout }
    }
}

impl Executor for ProcessExecutor {
    fn call_with_timeout(&self, command: &str, timeout: Option<Duration>) -> Result<String> {
        match timeout {
            Some(timeout) => ProcessExecutor::with_timeout(Some(timeout)).call(command),
            None => self.call(command),
        }
    }

    fn call(&self, command: &str) -> Result<String> {
        debug!(command, "exec");

        let argv = shlex::split(command)
            .ok_or_else(|| anyhow!("unparseable command line: {command}"))?;
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command line"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn '{program}'"))?;

        // Drain both pipes off-thread so a chatty pipeline cannot deadlock
        // against a full pipe buffer while we poll for exit.
        let mut stdout = child.stdout.take().context("child stdout missing")?;
        let mut stderr = child.stderr.take().context("child stderr missing")?;
        let out_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf);
            buf
        });
        let err_reader = thread::spawn(move || {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf);
            buf
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait().context("failed to poll child")? {
                break status;
            }
            if let Some(timeout) = self.timeout {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = out_reader.join();
                    let _ = err_reader.join();
                    bail!("command timed out after {}s: {command}", timeout.as_secs());
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let mut output = out_reader.join().unwrap_or_default();
        output.push_str(&err_reader.join().unwrap_or_default());

        if !status.success() {
            bail!(
                "command exited with {status}: {command}\n{}",
                output_tail(&output)
            );
        }
        Ok(output)
    }
}
