//! Stream translation
//!
//! Runs a whole command stream through the translator: legacy commands are
//! replaced by their dispatches, every other line is forwarded as written.

use anyhow::Context;
use rrfshim_core::{CommandExecutor, Error, ExecutorError, Translator, WriterExecutor};
use serde::Serialize;
use std::io::{BufRead, Write};
use std::str;
use tracing::{debug, warn};

/// Executor that can also forward untranslated lines
pub trait StreamSink: CommandExecutor {
    /// Forward a line that is not a legacy command
    fn pass_through(&mut self, line: &str) -> Result<(), ExecutorError>;

    /// Forward a line that is not valid UTF-8
    ///
    /// The default replaces invalid sequences; writers override it to keep
    /// the original bytes.
    fn pass_through_bytes(&mut self, line: &[u8]) -> Result<(), ExecutorError> {
        self.pass_through(&String::from_utf8_lossy(line))
    }
}

impl<W: Write> StreamSink for WriterExecutor<W> {
    fn pass_through(&mut self, line: &str) -> Result<(), ExecutorError> {
        self.write_raw(line).map_err(|source| ExecutorError::Io {
            command: line.split_whitespace().next().unwrap_or_default().to_string(),
            source,
        })
    }

    fn pass_through_bytes(&mut self, line: &[u8]) -> Result<(), ExecutorError> {
        self.write_raw_bytes(line).map_err(|source| ExecutorError::Io {
            command: String::from_utf8_lossy(line)
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_string(),
            source,
        })
    }
}

/// Drop the trailing `\n` or `\r\n`
fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// What happened to a single input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Legacy command replaced by this many dispatches
    Translated(usize),
    /// Forwarded unchanged
    PassedThrough,
    /// Could not be read as a command; forwarded unchanged
    Malformed,
}

/// Counters for a translation session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub lines_read: usize,
    pub translated: usize,
    pub passed_through: usize,
    pub dispatches: usize,
    pub errors: usize,
}

/// Translates command streams with a fixed translator
pub struct TranslationSession {
    translator: Translator,
    stats: SessionStats,
}

impl TranslationSession {
    pub fn new(translator: Translator) -> Self {
        Self {
            translator,
            stats: SessionStats::default(),
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Handle one input line
    ///
    /// Unreadable lines are logged, counted and forwarded. Only sink failures
    /// are returned as errors.
    pub fn process_line<S>(&mut self, line: &str, sink: &mut S) -> Result<LineOutcome, Error>
    where
        S: StreamSink + ?Sized,
    {
        self.stats.lines_read += 1;

        match self.translator.dispatch_line(line, sink) {
            Ok(Some(count)) => {
                self.stats.translated += 1;
                self.stats.dispatches += count;
                Ok(LineOutcome::Translated(count))
            }
            Ok(None) => {
                sink.pass_through(line)?;
                self.stats.passed_through += 1;
                Ok(LineOutcome::PassedThrough)
            }
            Err(Error::Executor(e)) => Err(Error::Executor(e)),
            Err(e) => {
                warn!(line = self.stats.lines_read, error = %e, "forwarding unreadable line");
                self.stats.errors += 1;
                sink.pass_through(line)?;
                Ok(LineOutcome::Malformed)
            }
        }
    }

    /// Handle one raw input line that may not be valid UTF-8
    ///
    /// Undecodable lines are logged, counted and forwarded byte for byte.
    pub fn process_bytes<S>(&mut self, line: &[u8], sink: &mut S) -> Result<LineOutcome, Error>
    where
        S: StreamSink + ?Sized,
    {
        match str::from_utf8(line) {
            Ok(text) => self.process_line(text, sink),
            Err(e) => {
                self.stats.lines_read += 1;
                warn!(line = self.stats.lines_read, error = %e, "forwarding undecodable line");
                self.stats.errors += 1;
                sink.pass_through_bytes(line)?;
                Ok(LineOutcome::Malformed)
            }
        }
    }

    /// Handle every line of a reader
    ///
    /// Only read failures and sink failures stop the stream.
    pub fn process_reader<R, S>(&mut self, mut reader: R, sink: &mut S) -> anyhow::Result<SessionStats>
    where
        R: BufRead,
        S: StreamSink + ?Sized,
    {
        let mut buf = Vec::new();
        let mut number = 0usize;
        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .with_context(|| format!("Failed to read input line {}", number + 1))?;
            if read == 0 {
                break;
            }
            number += 1;
            self.process_bytes(trim_line_ending(&buf), sink)
                .with_context(|| format!("Failed to forward input line {}", number))?;
        }
        debug!(stats = ?self.stats, "stream finished");
        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrfshim_core::builtin_aliases;

    fn session() -> TranslationSession {
        TranslationSession::new(Translator::new(builtin_aliases()))
    }

    fn output(sink: WriterExecutor<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_process_line_outcomes() {
        let mut session = session();
        let mut sink = WriterExecutor::new(Vec::new());

        assert_eq!(
            session.process_line("M109 S200 T0", &mut sink).unwrap(),
            LineOutcome::Translated(2)
        );
        assert_eq!(
            session.process_line("G1 X10", &mut sink).unwrap(),
            LineOutcome::PassedThrough
        );
        assert_eq!(
            session.process_line("M106 128", &mut sink).unwrap(),
            LineOutcome::Malformed
        );

        let stats = session.stats();
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.dispatches, 2);
        assert_eq!(stats.passed_through, 1);
        assert_eq!(stats.errors, 1);

        assert_eq!(
            output(sink),
            "KTC_TOOL_SET_TEMPERATURE T=0 ACTV_TMP=200 CHNG_STATE=2\n\
             KTC_TEMPERATURE_WAIT_WITH_TOLERANCE T=0\n\
             G1 X10\n\
             M106 128\n"
        );
    }

    #[test]
    fn test_process_reader_keeps_blank_and_comment_lines() {
        let input = "; start\nM106 S255 P1\n\nG28\n";
        let mut session = session();
        let mut sink = WriterExecutor::new(Vec::new());

        let stats = session.process_reader(input.as_bytes(), &mut sink).unwrap();
        assert_eq!(stats.lines_read, 4);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.passed_through, 3);
        assert_eq!(
            output(sink),
            "; start\nKTC_SET_AND_SAVE_PARTFAN_SPEED P=1 S=255\n\nG28\n"
        );
    }

    #[test]
    fn test_process_reader_forwards_latin1_comment() {
        let input: &[u8] = b"M106 S128 T2\n; temp 210\xB0C\r\nM568 P1 S210\n";
        let mut session = session();
        let mut sink = WriterExecutor::new(Vec::new());

        let stats = session.process_reader(input, &mut sink).unwrap();
        assert_eq!(stats.lines_read, 3);
        assert_eq!(stats.translated, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(
            sink.into_inner(),
            b"KTC_SET_AND_SAVE_PARTFAN_SPEED P=2 S=128\n\
              ; temp 210\xB0C\n\
              KTC_TOOL_SET_TEMPERATURE T=1 ACTV_TMP=210\n"
                .to_vec()
        );
    }

    #[test]
    fn test_process_reader_without_final_newline() {
        let mut session = session();
        let mut sink = WriterExecutor::new(Vec::new());

        let stats = session.process_reader(&b"G28\r\nM106 S0"[..], &mut sink).unwrap();
        assert_eq!(stats.lines_read, 2);
        assert_eq!(output(sink), "G28\nKTC_SET_AND_SAVE_PARTFAN_SPEED S=0\n");
    }

    /// Accepts dispatches but cannot forward plain lines
    #[derive(Default)]
    struct ClosedPassThrough {
        executed: Vec<String>,
    }

    impl CommandExecutor for ClosedPassThrough {
        fn execute(&mut self, dispatch: &rrfshim_core::Dispatch) -> Result<(), ExecutorError> {
            self.executed.push(dispatch.to_string());
            Ok(())
        }
    }

    impl StreamSink for ClosedPassThrough {
        fn pass_through(&mut self, line: &str) -> Result<(), ExecutorError> {
            Err(ExecutorError::Io {
                command: line.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::BrokenPipe),
            })
        }
    }

    #[test]
    fn test_sink_failure_stops_stream() {
        let mut session = session();
        let mut sink = ClosedPassThrough::default();

        let err = session
            .process_reader(&b"M106 S1\nG28\nM106 S2\n"[..], &mut sink)
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to forward input line 2");
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::Executor(ExecutorError::Io { .. }))
        ));
        assert_eq!(sink.executed, vec!["KTC_SET_AND_SAVE_PARTFAN_SPEED S=1"]);

        let stats = session.stats();
        assert_eq!(stats.lines_read, 2);
        assert_eq!(stats.translated, 1);
        assert_eq!(stats.passed_through, 0);
    }

    #[test]
    fn test_undecodable_line_through_default_pass_through() {
        let mut session = session();
        let mut sink = ClosedPassThrough::default();

        let err = session.process_bytes(b"; \xFF", &mut sink).unwrap_err();
        match err {
            Error::Executor(ExecutorError::Io { command, .. }) => {
                assert_eq!(command, "; \u{FFFD}")
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(session.stats().errors, 1);
    }
}
