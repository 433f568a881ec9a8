//! Run browser tests

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::error;

use drt_common::{DrtConfig, TestDescriptor};
use drt_runner::{ConfiguredBinaries, TestExecutor};

use crate::output::{print_captured, print_error, print_list, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Project root containing the `test/` directory
    #[arg(short, long, default_value = ".")]
    project: PathBuf,

    /// Test files, relative to `<project>/test`
    #[arg(required = true)]
    tests: Vec<PathBuf>,

    /// Custom HTML harness used instead of the built-in page
    #[arg(long)]
    html: Option<PathBuf>,

    /// Per-test deadline in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Report tests that exit without `#EOF` as failed even after PASS
    #[arg(long)]
    strict: bool,

    /// Print captured output for passing tests too
    #[arg(long)]
    show_output: bool,
}

/// How a `run` invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSummary {
    AllPassed,
    SomeFailed,
    SetupFailed,
}

impl RunSummary {
    pub fn exit_code(self) -> i32 {
        match self {
            RunSummary::AllPassed => 0,
            RunSummary::SomeFailed => 1,
            RunSummary::SetupFailed => 2,
        }
    }
}

pub async fn execute(args: RunArgs, mut config: DrtConfig, format: OutputFormat) -> Result<RunSummary> {
    if args.timeout.is_some() {
        config.browser.timeout_secs = args.timeout;
    }
    if args.strict {
        config.browser.require_terminal_marker = true;
    }

    let locator = ConfiguredBinaries::from_config(&config);
    let executor = TestExecutor::from_config(config, &locator)?;
    let cancel = super::ctrl_c_token();

    let mut results = Vec::new();
    let mut setup_failed = false;

    for test in &args.tests {
        if cancel.is_cancelled() {
            break;
        }

        let descriptor = match TestDescriptor::new(&args.project, test) {
            Ok(descriptor) => match &args.html {
                Some(html) => descriptor.with_html_harness(html),
                None => descriptor,
            },
            Err(e) => {
                print_error(&e.to_string());
                setup_failed = true;
                continue;
            }
        };

        match executor.run_test_with_cancel(&descriptor, cancel.clone()).await {
            Ok(result) => {
                if !result.success || args.show_output {
                    print_captured(&result);
                }
                results.push(result);
            }
            Err(e) => {
                error!(test = %test.display(), "Test could not run: {}", e);
                print_error(&format!("{}: {}", test.display(), e));
                setup_failed = true;
            }
        }
    }

    executor.registry().shutdown().await;

    print_list(&results, format);

    let summary = if setup_failed {
        RunSummary::SetupFailed
    } else if results.iter().all(|r| r.success) && results.len() == args.tests.len() {
        RunSummary::AllPassed
    } else {
        RunSummary::SomeFailed
    };
    Ok(summary)
}
