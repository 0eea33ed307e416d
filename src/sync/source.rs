use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use wait_timeout::ChildExt;

/// Why an external source produced nothing. Never surfaced past an importer.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{what} unavailable: {reason}")]
    Unavailable { what: String, reason: String },
    #[error("{what} timed out after {secs}s")]
    Timeout { what: String, secs: u64 },
    #[error("{what} exited with {status}: {stderr}")]
    Failed {
        what: String,
        status: String,
        stderr: String,
    },
    #[error("{what} returned malformed data: {reason}")]
    Malformed { what: String, reason: String },
}

/// Something that can hand back structured data from outside the store: a
/// subprocess, a file, an HTTP endpoint.
pub trait SourceClient {
    fn describe(&self) -> String;
    fn fetch(&self) -> Result<Value, SourceError>;
}

/// Runs a program and parses its stdout as JSON, killing it after `timeout`.
#[derive(Debug, Clone)]
pub struct CommandClient {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Duration,
}

impl CommandClient {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            cwd: None,
            timeout,
        }
    }

    /// Build from an argv vector such as `["openclaw", "cron", "list", "--json"]`.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec(), timeout))
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Run to completion and return trimmed stdout.
    pub fn run_text(&self) -> Result<String, SourceError> {
        let what = self.describe();
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| SourceError::Unavailable {
            what: what.clone(),
            reason: e.to_string(),
        })?;

        // Drain both pipes on threads so a chatty child cannot block on a full pipe.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(SourceError::Timeout {
                    what,
                    secs: self.timeout.as_secs(),
                });
            }
            Err(e) => {
                let _ = child.kill();
                return Err(SourceError::Unavailable {
                    what,
                    reason: e.to_string(),
                });
            }
        };

        let out = stdout.join().unwrap_or_default();
        let err = stderr.join().unwrap_or_default();
        if !status.success() {
            return Err(SourceError::Failed {
                what,
                status: status
                    .code()
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "signal".to_string()),
                stderr: err.trim().to_string(),
            });
        }
        Ok(out.trim().to_string())
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buf);
        }
        buf
    })
}

impl SourceClient for CommandClient {
    fn describe(&self) -> String {
        if self.args.is_empty() {
            format!("`{}`", self.program)
        } else {
            format!("`{} {}`", self.program, self.args.join(" "))
        }
    }

    fn fetch(&self) -> Result<Value, SourceError> {
        let out = self.run_text()?;
        parse_json(&self.describe(), &out)
    }
}

/// Reads a JSON document from disk.
#[derive(Debug, Clone)]
pub struct FileClient {
    path: PathBuf,
}

impl FileClient {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SourceClient for FileClient {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Value, SourceError> {
        let raw = fs::read_to_string(&self.path).map_err(|e| SourceError::Unavailable {
            what: self.describe(),
            reason: e.to_string(),
        })?;
        parse_json(&self.describe(), raw.trim())
    }
}

/// Empty output counts as an empty list.
fn parse_json(what: &str, text: &str) -> Result<Value, SourceError> {
    if text.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    serde_json::from_str(text).map_err(|e| SourceError::Malformed {
        what: what.to_string(),
        reason: e.to_string(),
    })
}
