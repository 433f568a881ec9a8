//! drt runner
//!
//! Executes one browser test at a time against a shared, per-project dev
//! server and classifies the rendering engine's output into a single result.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  TestExecutor::run_test(descriptor)                         │
//! │    ├── HarnessGenerator::generate_page  ─┐                  │
//! │    ├── HarnessGenerator::generate_script ├─ awaited together│
//! │    ├── DevServerRegistry::acquire(project) ┘                │
//! │    ├── spawn <browser> --args --dump-render-tree ... <url>  │
//! │    └── RunAccumulator  <- protocol::classify(line)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  DevServerRegistry                                          │
//! │    └── one `<launcher> serve test --port P` per project     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod accumulator;
pub mod binaries;
pub mod executor;
pub mod harness;
pub mod process;
pub mod protocol;
pub mod server;

pub use accumulator::RunAccumulator;
pub use binaries::{BinaryLocator, ConfiguredBinaries};
pub use executor::TestExecutor;
pub use harness::{FileHarnessGenerator, HarnessGenerator};
pub use protocol::{classify, LineKind};
pub use server::{DevServerLauncher, DevServerRegistry, Readiness, ReadinessSignal};

pub use drt_common::{Error, Outcome, Result, TestDescriptor, TestExecutionResult};
