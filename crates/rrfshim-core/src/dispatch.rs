//! Dispatches and the executors that carry them out

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;

use crate::command::quote_if_needed;
use crate::error::ExecutorError;

/// One invocation of a target command with its assembled parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatch {
    /// Target command name
    pub command: String,
    /// Target parameters in assembly order; each name appears once
    pub params: Vec<(String, String)>,
}

impl Dispatch {
    /// Create a dispatch without parameters
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            params: Vec::new(),
        }
    }

    /// Set a parameter unless it is already present
    ///
    /// Returns `false` when the name was already set and the value dropped.
    pub fn set_if_absent(&mut self, name: &str, value: impl Into<String>) -> bool {
        if self.get(name).is_some() {
            return false;
        }
        self.params.push((name.to_string(), value.into()));
        true
    }

    /// Look up an assembled parameter
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether no parameters were assembled
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }
}

impl fmt::Display for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        for (name, value) in &self.params {
            write!(f, " {}={}", name, quote_if_needed(value))?;
        }
        Ok(())
    }
}

/// Receiver of translated dispatches
///
/// Stands in for the host's command dispatch mechanism. Implementations must
/// handle dispatches in the order they are given.
pub trait CommandExecutor {
    /// Invoke the target command
    fn execute(&mut self, dispatch: &Dispatch) -> Result<(), ExecutorError>;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &mut E {
    fn execute(&mut self, dispatch: &Dispatch) -> Result<(), ExecutorError> {
        (**self).execute(dispatch)
    }
}

/// Executor that keeps every dispatch it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingExecutor {
    dispatches: Vec<Dispatch>,
}

impl RecordingExecutor {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches received so far, in order
    pub fn dispatches(&self) -> &[Dispatch] {
        &self.dispatches
    }

    /// Rendered text of the dispatches received so far
    pub fn lines(&self) -> Vec<String> {
        self.dispatches.iter().map(ToString::to_string).collect()
    }

    /// Forget recorded dispatches
    pub fn clear(&mut self) {
        self.dispatches.clear();
    }
}

impl CommandExecutor for RecordingExecutor {
    fn execute(&mut self, dispatch: &Dispatch) -> Result<(), ExecutorError> {
        self.dispatches.push(dispatch.clone());
        Ok(())
    }
}

/// Executor writing each dispatch as one text line
#[derive(Debug)]
pub struct WriterExecutor<W: Write> {
    writer: W,
}

impl<W: Write> WriterExecutor<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write a line that is not a dispatch (pass-through text)
    pub fn write_raw(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{}", line)
    }

    /// Write a line exactly as read, whatever its encoding
    pub fn write_raw_bytes(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(line)?;
        self.writer.write_all(b"\n")
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CommandExecutor for WriterExecutor<W> {
    fn execute(&mut self, dispatch: &Dispatch) -> Result<(), ExecutorError> {
        writeln!(self.writer, "{}", dispatch).map_err(|source| ExecutorError::Io {
            command: dispatch.command.clone(),
            source,
        })
    }
}
