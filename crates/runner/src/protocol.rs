//! Line protocol spoken by the rendering engine in dump-render-tree mode
//!
//! Each stdout line is classified on its own; there is no state carried
//! between lines.

/// End of test output
pub const TERMINAL_MARKER: &str = "#EOF";

/// Rendering engine crashed
pub const CRASH_MARKER: &str = "#CRASHED";

/// Emitted by the test controller when every test passed
pub const PASS_MARKER: &str = "PASS";

/// Lines the engine or harness prints on every run that carry no test output
pub const IGNORED_LINES: &[&str] = &[
    "CONSOLE MESSAGE: Warning: The unittestConfiguration has already been set. New unittestConfiguration ignored.",
    "Content-Type: text/plain",
    "#READY",
    "unittest-suite-wait-for-done",
];

/// Classification of a single output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Run is over
    Terminal,
    /// Rendering engine crashed
    CrashSignal,
    /// Test passed; also kept as output
    PassSignal,
    /// Known noise, dropped
    Ignored,
    /// Test output, kept verbatim
    Content,
}

impl LineKind {
    /// Whether a line of this kind belongs in the output accumulator
    pub fn is_accumulated(self) -> bool {
        matches!(self, LineKind::PassSignal | LineKind::Content)
    }
}

/// Classify one stdout line. Matching is exact and case-sensitive.
pub fn classify(line: &str) -> LineKind {
    match line {
        TERMINAL_MARKER => LineKind::Terminal,
        CRASH_MARKER => LineKind::CrashSignal,
        PASS_MARKER => LineKind::PassSignal,
        _ if IGNORED_LINES.contains(&line) => LineKind::Ignored,
        _ => LineKind::Content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("#EOF", LineKind::Terminal ; "terminal")]
    #[test_case("#CRASHED", LineKind::CrashSignal ; "crash")]
    #[test_case("PASS", LineKind::PassSignal ; "pass")]
    #[test_case("#READY", LineKind::Ignored ; "ready")]
    #[test_case("unittest-suite-wait-for-done", LineKind::Ignored ; "suite wait")]
    #[test_case("Content-Type: text/plain", LineKind::Ignored ; "content type")]
    #[test_case(IGNORED_LINES[0], LineKind::Ignored ; "harness warning")]
    #[test_case("FAIL: button renders label", LineKind::Content ; "failure text")]
    #[test_case("", LineKind::Content ; "blank")]
    fn test_classify(line: &str, expected: LineKind) {
        assert_eq!(classify(line), expected);
    }

    #[test_case("pass" ; "lowercase pass")]
    #[test_case("PASS " ; "trailing space")]
    #[test_case(" #EOF" ; "leading space")]
    #[test_case("#eof" ; "lowercase eof")]
    #[test_case("#CRASHED!" ; "crash suffix")]
    #[test_case("#READY now" ; "ready suffix")]
    fn test_near_misses_are_content(line: &str) {
        assert_eq!(classify(line), LineKind::Content);
    }

    #[test]
    fn test_only_pass_and_content_accumulate() {
        assert!(LineKind::Content.is_accumulated());
        assert!(LineKind::PassSignal.is_accumulated());
        assert!(!LineKind::Terminal.is_accumulated());
        assert!(!LineKind::CrashSignal.is_accumulated());
        assert!(!LineKind::Ignored.is_accumulated());
    }
}
