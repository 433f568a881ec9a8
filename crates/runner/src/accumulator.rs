//! Per-execution output accumulator and completion state machine
//!
//! Every completion trigger (terminal marker, crash marker, process exit,
//! deadline, cancellation) goes through [`RunAccumulator`]. Only the first
//! trigger produces a [`TestExecutionResult`]; later ones return `None` and
//! leave nothing changed.

use std::time::{Duration, Instant};

use drt_common::{Outcome, TestDescriptor, TestExecutionResult};
use tracing::debug;

use crate::protocol::{classify, LineKind};

pub struct RunAccumulator {
    descriptor: TestDescriptor,
    started: Instant,
    stdout: String,
    stderr: String,
    passed: bool,
    completed: bool,
    require_terminal_marker: bool,
}

impl RunAccumulator {
    pub fn new(descriptor: TestDescriptor) -> Self {
        Self {
            descriptor,
            started: Instant::now(),
            stdout: String::new(),
            stderr: String::new(),
            passed: false,
            completed: false,
            require_terminal_marker: false,
        }
    }

    /// Treat an exit without the terminal marker as unsuccessful even after a pass marker
    pub fn require_terminal_marker(mut self, require: bool) -> Self {
        self.require_terminal_marker = require;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn passed(&self) -> bool {
        self.passed
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Feed one stdout line. Returns the result if this line completed the run.
    pub fn on_stdout_line(&mut self, line: &str) -> Option<TestExecutionResult> {
        if self.completed {
            debug!(line, "stdout after completion dropped");
            return None;
        }

        let kind = classify(line);
        debug!(?kind, line, "classified");

        if kind.is_accumulated() {
            push_line(&mut self.stdout, line);
        }

        match kind {
            LineKind::PassSignal => {
                self.passed = true;
                None
            }
            LineKind::Terminal => {
                let outcome = if self.passed {
                    Outcome::Passed
                } else {
                    Outcome::Failed
                };
                self.complete(outcome, self.passed, None)
            }
            LineKind::CrashSignal => self.complete(Outcome::Crashed, false, None),
            LineKind::Content | LineKind::Ignored => None,
        }
    }

    /// Feed one stderr line
    pub fn on_stderr_line(&mut self, line: &str) {
        if !self.completed {
            push_line(&mut self.stderr, line);
        }
    }

    /// The process exited and its buffered output has been classified
    pub fn on_exit(&mut self, exit_code: Option<i32>) -> Option<TestExecutionResult> {
        let success = self.passed && !self.require_terminal_marker;
        self.complete(Outcome::Incomplete, success, exit_code)
    }

    pub fn on_timeout(&mut self) -> Option<TestExecutionResult> {
        self.complete(Outcome::TimedOut, false, None)
    }

    pub fn on_cancel(&mut self) -> Option<TestExecutionResult> {
        self.complete(Outcome::Cancelled, false, None)
    }

    /// Result for a run that ended before the browser was launched
    pub fn into_aborted(self, outcome: Outcome) -> TestExecutionResult {
        self.build(outcome, false, None)
    }

    fn complete(
        &mut self,
        outcome: Outcome,
        success: bool,
        exit_code: Option<i32>,
    ) -> Option<TestExecutionResult> {
        if self.completed {
            debug!(%outcome, "completion after result already produced ignored");
            return None;
        }
        self.completed = true;
        Some(self.build(outcome, success, exit_code))
    }

    fn build(&self, outcome: Outcome, success: bool, exit_code: Option<i32>) -> TestExecutionResult {
        TestExecutionResult {
            descriptor: self.descriptor.clone(),
            success,
            outcome,
            stdout: self.stdout.clone(),
            stderr: self.stderr.clone(),
            exit_code,
            duration_ms: millis(self.started.elapsed()),
        }
    }
}

/// Milliseconds, saturating at `u64::MAX`
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}
