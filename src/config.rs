//! Runner configuration.
//!
//! The defaults reproduce the fixed layout the runner has always used: the
//! compiler at `./build/COMPILER`, `nasm -f elf64`, `ld`, and the corpus in
//! `test/exec/*.mod`. A JSON file or command line flags may override them.

use crate::error::{RunnerError, RunnerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 外部ツールチェインのコマンド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler; reads source on stdin, writes assembly on stdout
    pub compiler: PathBuf,
    /// Assembler, invoked as `<assembler> -f <format> <asm> -o <obj>`
    pub assembler: PathBuf,
    pub assembler_format: String,
    /// Linker, invoked as `<linker> <obj> -o <exe>`
    pub linker: PathBuf,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("./build/COMPILER"),
            assembler: PathBuf::from("nasm"),
            assembler_format: "elf64".to_string(),
            linker: PathBuf::from("ld"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub toolchain: ToolchainConfig,
    /// Directory scanned (non-recursively) for test files
    pub corpus_dir: PathBuf,
    /// Glob matched against file names inside `corpus_dir`
    pub pattern: String,
    /// Directory holding the shared intermediate files
    pub artifact_dir: PathBuf,
    /// Wall-clock limit per external invocation. `None` waits forever.
    pub timeout_secs: Option<u64>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            toolchain: ToolchainConfig::default(),
            corpus_dir: PathBuf::from("test/exec"),
            pattern: "*.mod".to_string(),
            artifact_dir: PathBuf::from("."),
            timeout_secs: None,
        }
    }
}

impl RunnerConfig {
    /// JSON設定ファイルを読み込む（省略されたフィールドはデフォルト値）
    pub fn load<P: AsRef<Path>>(path: P) -> RunnerResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| RunnerError::io(format!("設定ファイル {:?} を読み込めません", path), e))?;
        let config: RunnerConfig = serde_json::from_str(&text)
            .map_err(|e| RunnerError::Config(format!("{:?}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.pattern.is_empty() {
            return Err(RunnerError::Config("テストファイルのパターンが空です".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(RunnerError::Config("タイムアウトは1秒以上を指定してください".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
