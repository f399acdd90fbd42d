//! The call contract of the external molecular-dynamics engine.
//!
//! A relaxation is two subprocess calls: *prepare* turns a control file, coordinates and a
//! topology into a run specification, *execute* runs it and leaves its artifacts under a
//! deterministic file stem. [`MdEngine`] is the seam; [`GromacsEngine`] drives `gmx grompp`
//! and `gmx mdrun`.

use super::config::EngineSettings;
use itertools::Itertools;
use std::fmt;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
const DRAIN_GRACE: Duration = Duration::from_millis(500);
const OUTPUT_TAIL_LINES: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Prepare,
    Execute,
}

impl fmt::Display for EnginePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnginePhase::Prepare => f.write_str("Prepare"),
            EnginePhase::Execute => f.write_str("Execute"),
        }
    }
}

/// Standard output and error of an engine call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

impl fmt::Display for CapturedOutput {
    /// Shows the last lines of each stream; the full text stays available on the struct.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- stdout (tail) ---")?;
        writeln!(f, "{}", tail(&self.stdout, OUTPUT_TAIL_LINES))?;
        writeln!(f, "--- stderr (tail) ---")?;
        write!(f, "{}", tail(&self.stderr, OUTPUT_TAIL_LINES))
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "termination by signal".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum ExternalEngineError {
    #[error("Failed to launch `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to wait for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("{phase} step `{command}` failed with {}\n{output}", describe_exit(.code))]
    NonZeroExit {
        phase: EnginePhase,
        command: String,
        code: Option<i32>,
        output: CapturedOutput,
    },
    #[error("{phase} step `{command}` did not finish within {}s and was killed\n{output}", .timeout.as_secs())]
    TimedOut {
        phase: EnginePhase,
        command: String,
        timeout: Duration,
        output: CapturedOutput,
    },
    #[error("Expected engine output '{}' is missing", .path.display())]
    MissingArtifact { path: PathBuf },
}

/// Inputs of one relaxation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Directory the engine runs in and writes its artifacts to.
    pub work_dir: PathBuf,
    /// Run control parameters (`.mdp`).
    pub control: PathBuf,
    /// Starting coordinates, also used as the restraint reference.
    pub coordinates: PathBuf,
    /// System topology (`.top`).
    pub topology: PathBuf,
    /// File stem of the run artifacts.
    pub stem: String,
    pub max_warnings: u32,
}

impl RunRequest {
    /// Path of the run artifact with the given extension (`tpr`, `gro`, `log`, ...).
    pub fn artifact(&self, extension: &str) -> PathBuf {
        self.work_dir.join(format!("{}.{extension}", self.stem))
    }

    /// The run specification produced by the prepare phase.
    pub fn run_spec(&self) -> PathBuf {
        self.artifact("tpr")
    }

    /// The final coordinates produced by the execute phase.
    pub fn final_coordinates(&self) -> PathBuf {
        self.artifact("gro")
    }

    /// Every intermediate the two phases leave behind, final coordinates excluded.
    pub fn intermediates(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = ["tpr", "trr", "edr", "log", "cpt"]
            .iter()
            .map(|ext| self.artifact(ext))
            .collect();
        paths.push(self.work_dir.join("mdout.mdp"));
        paths
    }
}

/// A molecular-dynamics engine able to run a short relaxation.
///
/// Both calls are synchronous. Implementations must not report success unless the phase's
/// artifact exists.
pub trait MdEngine: Send + Sync {
    fn prepare(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError>;
    fn execute(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError>;
}

/// [`MdEngine`] backed by the GROMACS command-line driver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GromacsEngine {
    settings: EngineSettings,
}

impl GromacsEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn command(&self, request: &RunRequest) -> Command {
        let mut command = Command::new(&self.settings.binary);
        command.current_dir(&request.work_dir);
        command
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl MdEngine for GromacsEngine {
    fn prepare(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError> {
        let coordinates = absolute(&request.coordinates);
        let mut command = self.command(request);
        command
            .arg("grompp")
            .arg("-f")
            .arg(absolute(&request.control))
            .arg("-c")
            .arg(&coordinates)
            .arg("-r")
            .arg(&coordinates)
            .arg("-p")
            .arg(absolute(&request.topology))
            .arg("-o")
            .arg(format!("{}.tpr", request.stem))
            .arg("-maxwarn")
            .arg(request.max_warnings.to_string());
        let output = run_with_timeout(&mut command, EnginePhase::Prepare, self.settings.timeout)?;
        require_artifact(&request.run_spec())?;
        Ok(output)
    }

    fn execute(&self, request: &RunRequest) -> Result<CapturedOutput, ExternalEngineError> {
        let mut command = self.command(request);
        command.arg("mdrun").arg("-deffnm").arg(&request.stem);
        let output = run_with_timeout(&mut command, EnginePhase::Execute, self.settings.timeout)?;
        require_artifact(&request.final_coordinates())?;
        Ok(output)
    }
}

pub(crate) fn require_artifact(path: &Path) -> Result<(), ExternalEngineError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ExternalEngineError::MissingArtifact {
            path: path.to_path_buf(),
        })
    }
}

fn describe_command(command: &Command) -> String {
    std::iter::once(command.get_program())
        .chain(command.get_args())
        .map(|s| s.to_string_lossy())
        .join(" ")
}

/// Forwards everything read from `pipe` in chunks until end of stream.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let mut chunk = [0u8; 8192];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if sender.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    receiver
}

/// Gathers a drained stream. Whatever arrived by the deadline is returned even if a surviving
/// descendant still holds the pipe open.
fn collect(receiver: Option<Receiver<Vec<u8>>>, deadline: Instant) -> String {
    let Some(receiver) = receiver else {
        return String::new();
    };
    let mut buffer = Vec::new();
    while let Ok(chunk) = receiver.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        buffer.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Runs a command to completion with stdin closed and both output streams captured.
///
/// With a timeout, the child is killed once the wall-clock limit is reached. Output is read on
/// helper threads so a chatty process cannot block on a full pipe. Once the child has exited or
/// been killed, output is collected for a short grace period only: processes the child spawned
/// may outlive it and keep the pipes open.
pub fn run_with_timeout(
    command: &mut Command,
    phase: EnginePhase,
    timeout: Option<Duration>,
) -> Result<CapturedOutput, ExternalEngineError> {
    let command_line = describe_command(command);
    debug!(command = %command_line, %phase, "Launching engine");

    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command
        .spawn()
        .map_err(|source| ExternalEngineError::Spawn {
            command: command_line.clone(),
            source,
        })?;
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let started = Instant::now();
    let status: Option<ExitStatus> = loop {
        match child.try_wait() {
            Ok(Some(status)) => break Some(status),
            Ok(None) if timeout.is_some_and(|limit| started.elapsed() >= limit) => {
                let _ = child.kill();
                let _ = child.wait();
                break None;
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(source) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ExternalEngineError::Wait {
                    command: command_line,
                    source,
                });
            }
        }
    };

    let deadline = Instant::now() + DRAIN_GRACE;
    let output = CapturedOutput {
        stdout: collect(stdout, deadline),
        stderr: collect(stderr, deadline),
    };

    match status {
        Some(status) if status.success() => {
            info!(%phase, elapsed_ms = started.elapsed().as_millis() as u64, "Engine step finished");
            Ok(output)
        }
        Some(status) => Err(ExternalEngineError::NonZeroExit {
            phase,
            command: command_line,
            code: status.code(),
            output,
        }),
        None => Err(ExternalEngineError::TimedOut {
            phase,
            command: command_line,
            timeout: timeout.unwrap_or_default(),
            output,
        }),
    }
}
