//! テストケース記述子
//!
//! テストの期待値はファイル名にエンコードされています。
//!
//! - `<name>.<ext>`: コンパイルと実行が成功すればよい
//! - `<name>.<code>.<ext>`: 実行ファイルの終了コードが `<code>` と一致すること
//!
//! ファイル名を `.` で分割してちょうど3つの部分になる場合だけ、
//! 中央の部分を10進整数として解釈します。それ以外の分割数では期待値はありません。

use crate::error::{RunnerError, RunnerResult};
use std::path::{Path, PathBuf};

/// One test input file and its expectation, parsed once at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCase {
    path: PathBuf,
    name: String,
    expected_exit_code: Option<i32>,
    expected_stdout: Option<PathBuf>,
}

impl TestCase {
    /// ファイル名から期待値を解析する
    ///
    /// A three-segment name whose middle segment is not an integer is
    /// rejected rather than silently treated as "no expectation".
    pub fn from_path<P: AsRef<Path>>(path: P) -> RunnerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RunnerError::Discovery(format!("{:?} はファイル名を持ちません", path)))?;

        let expected_exit_code = parse_expected_exit_code(&file_name).map_err(|segment| {
            RunnerError::MalformedTestName {
                path: path.clone(),
                segment,
            }
        })?;

        let name = file_name
            .split('.')
            .next()
            .unwrap_or_default()
            .to_string();

        let expected_stdout = Some(stdout_sidecar(&path)).filter(|p| p.is_file());

        Ok(Self {
            path,
            name,
            expected_exit_code,
            expected_stdout,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File stem up to the first `.`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expected_exit_code(&self) -> Option<i32> {
        self.expected_exit_code
    }

    /// `<test file>.stdout`, when it exists next to the test
    pub fn expected_stdout(&self) -> Option<&Path> {
        self.expected_stdout.as_deref()
    }
}

/// `Ok(None)` when the name carries no expectation, `Err(segment)` when the
/// middle segment of a three-part name is not an integer.
///
/// Parsing is strict `i32`: surrounding whitespace, `_` separators and
/// values outside the `i32` range are all malformed.
pub fn parse_expected_exit_code(file_name: &str) -> Result<Option<i32>, String> {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() != 3 {
        return Ok(None);
    }

    let segment = parts[1];
    segment
        .parse::<i32>()
        .map(Some)
        .map_err(|_| segment.to_string())
}

fn stdout_sidecar(path: &Path) -> PathBuf {
    let mut sidecar = path.as_os_str().to_owned();
    sidecar.push(".stdout");
    PathBuf::from(sidecar)
}
