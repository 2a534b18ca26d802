//! テストの探索と実行ドライバ
//!
//! コーパスディレクトリからテストファイルを探し、1つずつパイプラインに通して
//! 判定を即座に報告します。共有中間ファイルは実行全体を通して1回だけ確保され、
//! 正常終了・エラー・パニックのいずれの場合でも最後に削除されます。

use crate::artifacts::SharedArtifacts;
use crate::config::RunnerConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::invoker::Invoker;
use crate::pipeline::Sequencer;
use crate::test_case::TestCase;
use crate::verdict::Verdict;
use globset::{Glob, GlobMatcher};
use std::fmt;
use std::path::Path;
use walkdir::WalkDir;

/// Aggregate counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    fn record(&mut self, verdict: &Verdict) {
        if verdict.is_pass() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tests, {} passed, {} failed",
            self.total(),
            self.passed,
            self.failed
        )
    }
}

/// Find test files directly inside `corpus_dir` whose names match `pattern`.
///
/// Entries come back in directory enumeration order. Hidden files are
/// skipped unless the pattern itself starts with a dot. Every name is
/// parsed up front, so a malformed one fails the whole discovery.
pub fn discover<P: AsRef<Path>>(corpus_dir: P, pattern: &str) -> RunnerResult<Vec<TestCase>> {
    let corpus_dir = corpus_dir.as_ref();
    let matcher = compile_pattern(pattern)?;
    let include_hidden = pattern.starts_with('.');

    let mut cases = Vec::new();
    for entry in WalkDir::new(corpus_dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            RunnerError::Discovery(format!("{:?} を走査できません: {}", corpus_dir, e))
        })?;

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden && !include_hidden {
            continue;
        }
        if !matcher.is_match(entry.file_name()) || !entry.path().is_file() {
            continue;
        }

        cases.push(TestCase::from_path(entry.path())?);
    }

    log::info!("discovered {} tests in {:?}", cases.len(), corpus_dir);
    Ok(cases)
}

fn compile_pattern(pattern: &str) -> RunnerResult<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| RunnerError::Config(format!("不正なパターン '{}': {}", pattern, e)))
}

/// Drives a whole run: discovery, one pipeline pass per test, cleanup.
pub struct Driver<I: Invoker> {
    config: RunnerConfig,
    sequencer: Sequencer<I>,
}

impl<I: Invoker> Driver<I> {
    pub fn new(config: RunnerConfig, invoker: I) -> Self {
        let sequencer = Sequencer::new(invoker, config.toolchain.clone());
        Self { config, sequencer }
    }

    pub fn sequencer(&self) -> &Sequencer<I> {
        &self.sequencer
    }

    /// すべてのテストを実行し、判定が出るたびに `on_verdict` を呼ぶ
    ///
    /// The shared artifacts are removed exactly once before this returns,
    /// on success and on error alike (and by their guard on unwind). When
    /// both the run and the cleanup fail, the run's error is returned.
    pub fn run<F>(&mut self, mut on_verdict: F) -> RunnerResult<RunSummary>
    where
        F: FnMut(&Verdict),
    {
        let mut artifacts = SharedArtifacts::acquire(&self.config.artifact_dir)?;
        let outcome = self.run_all(&mut artifacts, &mut on_verdict);
        let cleanup = artifacts.release();

        match (outcome, cleanup) {
            (Ok(summary), Ok(())) => {
                log::info!("{}", summary);
                Ok(summary)
            }
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup_error)) => {
                log::error!("{}", cleanup_error);
                Err(e)
            }
        }
    }

    fn run_all(
        &mut self,
        artifacts: &mut SharedArtifacts,
        on_verdict: &mut dyn FnMut(&Verdict),
    ) -> RunnerResult<RunSummary> {
        let cases = discover(&self.config.corpus_dir, &self.config.pattern)?;

        let mut summary = RunSummary::default();
        for case in &cases {
            let verdict = self.sequencer.run(case, artifacts)?;
            summary.record(&verdict);
            on_verdict(&verdict);
        }
        Ok(summary)
    }
}
