//! テスト結果の判定と表示

use crate::pipeline::Stage;
use std::fmt;
use std::path::{Path, PathBuf};

/// The classified outcome of one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerdictKind {
    /// Compiler exited non-zero; carries its stdout
    CompileError { output: String },
    /// Assembler exited non-zero; carries stdout followed by stderr
    AssembleError { output: String },
    /// Linker exited non-zero; carries its stdout
    LinkError { output: String },
    /// The built executable could not be run, or died abnormally
    RuntimeCrash { reason: String },
    WrongResult { actual: i32, expected: i32 },
    /// Exit code was acceptable but stdout differed from the `.stdout` file
    /// (compared byte for byte)
    WrongOutput { expected: Vec<u8>, actual: Vec<u8> },
    /// The `.stdout` file could not be read, so the test cannot be judged
    UnreadableExpectation { reason: String },
    TimedOut { stage: Stage },
    /// `checked` is the exit code that matched the expectation, if any
    Pass { checked: Option<i32> },
}

impl fmt::Display for VerdictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictKind::CompileError { output } => write!(f, "FAILED (compiler error) {}", output),
            VerdictKind::AssembleError { output } => write!(f, "FAILED (assemble error) {}", output),
            VerdictKind::LinkError { output } => write!(f, "FAILED (linker error) {}", output),
            VerdictKind::RuntimeCrash { .. } => write!(f, "FAILED (bad binary)"),
            VerdictKind::WrongResult { actual, expected } => {
                write!(f, "FAILED (wrong result), got {} wanted {}", actual, expected)
            }
            VerdictKind::WrongOutput { .. } => write!(f, "FAILED (wrong output)"),
            VerdictKind::UnreadableExpectation { reason } => {
                write!(f, "FAILED (unreadable expected output) {}", reason)
            }
            VerdictKind::TimedOut { stage } => write!(f, "FAILED (timed out in {})", stage),
            VerdictKind::Pass { checked: Some(code) } => write!(f, "OK (correct result), got {}", code),
            VerdictKind::Pass { checked: None } => write!(f, "OK (compiled and ran ok)"),
        }
    }
}

/// One verdict line: the test path plus its outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub path: PathBuf,
    pub kind: VerdictKind,
}

impl Verdict {
    pub fn new(path: impl Into<PathBuf>, kind: VerdictKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_pass(&self) -> bool {
        matches!(self.kind, VerdictKind::Pass { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} test {}", self.path.display(), self.kind)
    }
}
