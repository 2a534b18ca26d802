//! Result classifier.
//!
//! Applied only once the executable has run to completion. The exit code is
//! the oracle; an optional `.stdout` sidecar adds an output comparison on
//! top of it.

use crate::test_case::TestCase;
use crate::verdict::VerdictKind;

/// 終了コード（と任意の標準出力）から判定を下す
///
/// `stdout` is `Some((expected, actual))` only when the test has an
/// expected-output file and the program's output was captured. Both sides
/// are raw bytes; no decoding or newline normalisation happens.
pub fn classify(case: &TestCase, exit_code: i32, stdout: Option<(&[u8], &[u8])>) -> VerdictKind {
    if let Some(expected) = case.expected_exit_code() {
        if exit_code != expected {
            return VerdictKind::WrongResult {
                actual: exit_code,
                expected,
            };
        }
    }

    if let Some((expected, actual)) = stdout {
        if expected != actual {
            return VerdictKind::WrongOutput {
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            };
        }
    }

    VerdictKind::Pass {
        checked: case.expected_exit_code().map(|_| exit_code),
    }
}
