//! Core types for drt

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Directory under the project root that the dev server serves
pub const TEST_DIR: &str = "test";

/// A single browser test to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestDescriptor {
    /// Project root; the dev server runs with this as working directory
    pub project_root: PathBuf,

    /// Test entry file, relative to `<project_root>/test`
    pub test_file: PathBuf,

    /// Custom HTML harness to use instead of the built-in template
    #[serde(default)]
    pub html_harness: Option<PathBuf>,
}

impl TestDescriptor {
    pub fn new(project_root: impl Into<PathBuf>, test_file: impl Into<PathBuf>) -> Result<Self> {
        let project_root = project_root.into();
        let test_file = test_file.into();

        if test_file.is_absolute() {
            return Err(Error::InvalidDescriptor(format!(
                "test file must be relative to {}/{}: {}",
                project_root.display(),
                TEST_DIR,
                test_file.display()
            )));
        }
        if test_file.file_stem().is_none() {
            return Err(Error::InvalidDescriptor(format!(
                "test file has no file name: {}",
                test_file.display()
            )));
        }

        Ok(Self {
            project_root,
            test_file,
            html_harness: None,
        })
    }

    pub fn with_html_harness(mut self, harness: impl Into<PathBuf>) -> Self {
        self.html_harness = Some(harness.into());
        self
    }

    /// Test name without directory or extension
    pub fn test_name(&self) -> String {
        self.test_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// File name of the generated harness page
    pub fn harness_file_name(&self) -> String {
        format!("{}.html", self.test_name())
    }

    /// File name of the generated bootstrap script
    pub fn script_file_name(&self) -> String {
        format!("{}.dart", self.test_name())
    }

    /// Directory served by the dev server
    pub fn test_dir(&self) -> PathBuf {
        self.project_root.join(TEST_DIR)
    }

    /// Directory the harness files are generated into
    pub fn generated_dir(&self, generated_dir_name: &str) -> PathBuf {
        self.test_dir().join(generated_dir_name)
    }

    /// Path of the test file as the browser sees it, relative to the generated directory
    pub fn test_import_path(&self) -> String {
        let parts: Vec<String> = self
            .test_file
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        format!("../{}", parts.join("/"))
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}

/// How a test execution ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Terminal marker seen after a pass marker
    Passed,
    /// Terminal marker seen without a pass marker
    Failed,
    /// The rendering engine reported a crash
    Crashed,
    /// The process exited without emitting the terminal marker
    Incomplete,
    /// The configured deadline expired
    TimedOut,
    /// The caller cancelled the run
    Cancelled,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
            Outcome::Crashed => write!(f, "crashed"),
            Outcome::Incomplete => write!(f, "incomplete"),
            Outcome::TimedOut => write!(f, "timed out"),
            Outcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result of executing one test. Built once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionResult {
    pub descriptor: TestDescriptor,
    pub success: bool,
    pub outcome: Outcome,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl TestExecutionResult {
    pub fn test_name(&self) -> String {
        self.descriptor.test_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_names() {
        let desc = TestDescriptor::new("/work/app", "widgets/button_test.dart").unwrap();
        assert_eq!(desc.test_name(), "button_test");
        assert_eq!(desc.harness_file_name(), "button_test.html");
        assert_eq!(desc.script_file_name(), "button_test.dart");
        assert_eq!(desc.test_import_path(), "../widgets/button_test.dart");
        assert_eq!(
            desc.generated_dir("__drt_generated"),
            PathBuf::from("/work/app/test/__drt_generated")
        );
    }

    #[test]
    fn test_descriptor_rejects_absolute_test_file() {
        let err = TestDescriptor::new("/work/app", "/tmp/button_test.dart").unwrap_err();
        assert!(matches!(err, Error::InvalidDescriptor(_)));
    }

    #[test]
    fn test_descriptor_rejects_empty_test_file() {
        assert!(TestDescriptor::new("/work/app", "").is_err());
    }

    #[test]
    fn test_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&Outcome::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
        assert_eq!(Outcome::TimedOut.to_string(), "timed out");
    }
}
