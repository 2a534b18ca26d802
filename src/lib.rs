//! modrun: end-to-end conformance test runner
//!
//! Drives an external compiler, assembler and linker over a corpus of test
//! programs, runs the resulting binaries and judges each test by its exit
//! code.

pub mod artifacts;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod error;
pub mod invoker;
pub mod pipeline;
pub mod test_case;
pub mod verdict;

// Re-export commonly used types
pub use artifacts::SharedArtifacts;
pub use config::{RunnerConfig, ToolchainConfig};
pub use driver::{discover, Driver, RunSummary};
pub use error::{RunnerError, RunnerResult};
pub use invoker::{Invocation, Invoker, ProcessInvoker, StageResult, Termination};
pub use pipeline::{Sequencer, Stage};
pub use test_case::TestCase;
pub use verdict::{Verdict, VerdictKind};
