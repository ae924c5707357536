use crate::config::ProverConfig;
use crate::error::Error;
use std::fs;
use std::io::{self, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use wait_timeout::ChildExt;

type Captured = io::Result<Vec<u8>>;

/// What one prover invocation printed.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Contents of the side log file, when the prover was asked to write one.
    pub log: Option<String>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The raw report kept as the run summary: the log when present, else stdout.
    pub fn raw_report(&self) -> &str {
        self.log.as_deref().unwrap_or(&self.stdout)
    }
}

/// Runs the external prover against a file on disk.
pub trait ToolRunner {
    fn run(&self, input: &Path) -> Result<ToolOutput, Error>;
}

/// `ToolRunner` that spawns the configured program and enforces its timeout.
///
/// The deadline covers both the process and its pipes: a descendant that
/// keeps stdout or stderr open past the deadline fails the run too.
#[derive(Debug, Clone)]
pub struct ProverCommand {
    config: ProverConfig,
}

impl ProverCommand {
    pub fn new(config: ProverConfig) -> Self {
        Self { config }
    }

    fn timed_out(&self, what: &str) -> Error {
        Error::VerificationFailed(format!(
            "'{}' {} within {}s",
            self.config.program,
            what,
            self.config.timeout_secs
        ))
    }
}

impl ToolRunner for ProverCommand {
    fn run(&self, input: &Path) -> Result<ToolOutput, Error> {
        let log_file = if self.config.uses_log_file() {
            Some(
                tempfile::Builder::new()
                    .prefix("prover-")
                    .suffix(".log")
                    .tempfile()?,
            )
        } else {
            None
        };
        let log_path = log_file
            .as_ref()
            .map(|f| f.path().to_path_buf())
            .unwrap_or_default();
        let args = self.config.expand_args(input, &log_path);
        debug!("Running {} {:?}", self.config.program, args);

        let mut child = Command::new(&self.config.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                Error::VerificationFailed(format!(
                    "failed to start '{}': {}",
                    self.config.program, e
                ))
            })?;

        let timeout = self.config.timeout();
        let deadline = Instant::now() + timeout;
        let limit = self.config.max_output_bytes;
        let stdout_rx = spawn_reader(child.stdout.take(), limit);
        let stderr_rx = spawn_reader(child.stderr.take(), limit);

        let status = match child.wait_timeout(timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                kill_and_reap(&mut child);
                return Err(self.timed_out("did not finish"));
            }
            Err(e) => {
                kill_and_reap(&mut child);
                return Err(Error::VerificationFailed(format!(
                    "failed to wait for '{}': {}",
                    self.config.program, e
                )));
            }
        };

        let stdout = match recv_until(&stdout_rx, deadline) {
            Some(captured) => decode(captured, "stdout")?,
            None => return Err(self.timed_out("left stdout open")),
        };
        let stderr = match recv_until(&stderr_rx, deadline) {
            Some(captured) => decode(captured, "stderr")?,
            None => return Err(self.timed_out("left stderr open")),
        };

        let log = match &log_file {
            Some(file) => {
                let captured = fs::File::open(file.path())
                    .and_then(|f| read_pipe_bounded(f, limit));
                Some(decode(captured, "log")?)
            }
            None => None,
        };

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout,
            stderr,
            log,
        })
    }
}

fn kill_and_reap(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill prover: {}", e);
    }
    let _ = child.wait();
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>, limit: u64) -> Receiver<Captured> {
    let (tx, rx) = mpsc::channel();
    match pipe {
        Some(pipe) => {
            thread::spawn(move || {
                let _ = tx.send(read_pipe_bounded(pipe, limit));
            });
        }
        None => {
            let _ = tx.send(Ok(Vec::new()));
        }
    }
    rx
}

/// Read at most `limit` bytes. Anything beyond is drained and discarded so
/// the writer never blocks, and the read reports an error.
fn read_pipe_bounded<R: Read>(mut reader: R, limit: u64) -> Captured {
    let mut buf = Vec::new();
    (&mut reader)
        .take(limit.saturating_add(1))
        .read_to_end(&mut buf)?;
    if buf.len() as u64 > limit {
        io::copy(&mut reader, &mut io::sink())?;
        return Err(io::Error::new(
            ErrorKind::Other,
            format!("output exceeds {} bytes", limit),
        ));
    }
    Ok(buf)
}

/// `None` when the reader has not finished by `deadline`.
fn recv_until(rx: &Receiver<Captured>, deadline: Instant) -> Option<Captured> {
    let remaining = deadline.saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining.max(Duration::from_millis(1))) {
        Ok(captured) => Some(captured),
        Err(RecvTimeoutError::Timeout) => None,
        Err(RecvTimeoutError::Disconnected) => Some(Err(io::Error::new(
            ErrorKind::Other,
            "reader thread panicked",
        ))),
    }
}

fn decode(captured: Captured, stream: &str) -> Result<String, Error> {
    let bytes = captured
        .map_err(|e| Error::VerificationFailed(format!("unreadable prover {}: {}", stream, e)))?;
    String::from_utf8(bytes)
        .map_err(|_| Error::VerificationFailed(format!("prover {} is not UTF-8 text", stream)))
}
