//! パイプラインのステージ実行モジュール
//!
//! 1つのテストケースについて compile → assemble → link → execute を順番に実行します。
//! いずれかのツールが0以外で終了した時点で打ち切り、後続のステージは実行しません。

use crate::artifacts::SharedArtifacts;
use crate::classifier::classify;
use crate::config::ToolchainConfig;
use crate::error::{RunnerError, RunnerResult};
use crate::invoker::{Invocation, Invoker, OutputMode, StageResult, Termination};
use crate::test_case::TestCase;
use crate::verdict::{Verdict, VerdictKind};
use std::fmt;
use std::fs;

/// パイプラインのステージ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Compile,
    Assemble,
    Link,
    Execute,
}

impl Stage {
    /// Verdict for a tool that ran and exited non-zero.
    fn failure(self, result: &StageResult) -> VerdictKind {
        match self {
            Stage::Compile => VerdictKind::CompileError {
                output: result.stdout_lossy(),
            },
            Stage::Assemble => VerdictKind::AssembleError {
                output: format!("{}{}", result.stdout_lossy(), result.stderr_lossy()),
            },
            Stage::Link => VerdictKind::LinkError {
                output: result.stdout_lossy(),
            },
            Stage::Execute => VerdictKind::RuntimeCrash {
                reason: result.termination.to_string(),
            },
        }
    }

    /// Verdict for a tool that could not be started at all.
    fn spawn_failure(self, error: &std::io::Error) -> VerdictKind {
        let output = error.to_string();
        match self {
            Stage::Compile => VerdictKind::CompileError { output },
            Stage::Assemble => VerdictKind::AssembleError { output },
            Stage::Link => VerdictKind::LinkError { output },
            Stage::Execute => VerdictKind::RuntimeCrash { reason: output },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Compile => "compile",
            Stage::Assemble => "assemble",
            Stage::Link => "link",
            Stage::Execute => "execute",
        };
        f.write_str(name)
    }
}

/// Runs the four stages for one test at a time.
pub struct Sequencer<I: Invoker> {
    invoker: I,
    toolchain: ToolchainConfig,
}

impl<I: Invoker> Sequencer<I> {
    pub fn new(invoker: I, toolchain: ToolchainConfig) -> Self {
        Self { invoker, toolchain }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    /// テストケースを1つ実行して判定を返す
    ///
    /// Stage failures, and an unreadable expected-output file, become
    /// verdicts. `Err` is reserved for faults on the shared artifacts, which
    /// no later test can recover from.
    pub fn run(&mut self, case: &TestCase, artifacts: &mut SharedArtifacts) -> RunnerResult<Verdict> {
        artifacts.scrub()?;
        let kind = self.run_stages(case, artifacts)?;
        Ok(Verdict::new(case.path(), kind))
    }

    fn run_stages(&mut self, case: &TestCase, artifacts: &mut SharedArtifacts) -> RunnerResult<VerdictKind> {
        // 1. compile: ソースは標準入力から渡す
        let compile = Invocation::new(&self.toolchain.compiler).stdin_from(case.path());
        let compiled = match self.run_tool(case, Stage::Compile, &compile) {
            Ok(result) => result,
            Err(kind) => return Ok(kind),
        };
        artifacts
            .write_asm(&compiled.stdout)
            .map_err(|e| RunnerError::io(format!("{:?} に書き込めません", artifacts.asm()), e))?;

        // 2. assemble
        let assemble = Invocation::new(&self.toolchain.assembler)
            .arg("-f")
            .arg(&self.toolchain.assembler_format)
            .arg(artifacts.asm())
            .arg("-o")
            .arg(artifacts.object());
        if let Err(kind) = self.run_tool(case, Stage::Assemble, &assemble) {
            return Ok(kind);
        }

        // 3. link
        let link = Invocation::new(&self.toolchain.linker)
            .arg(artifacts.object())
            .arg("-o")
            .arg(artifacts.executable());
        if let Err(kind) = self.run_tool(case, Stage::Link, &link) {
            return Ok(kind);
        }

        // 4. execute
        self.execute(case, artifacts)
    }

    fn run_tool(&mut self, case: &TestCase, stage: Stage, invocation: &Invocation) -> Result<StageResult, VerdictKind> {
        log::debug!("{}: {} stage", case.path().display(), stage);
        let result = match self.invoker.invoke(invocation) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("could not run {:?}: {}", invocation.program, e);
                return Err(stage.spawn_failure(&e));
            }
        };

        match result.termination {
            Termination::Code(0) => Ok(result),
            Termination::TimedOut => Err(VerdictKind::TimedOut { stage }),
            _ => Err(stage.failure(&result)),
        }
    }

    fn execute(&mut self, case: &TestCase, artifacts: &SharedArtifacts) -> RunnerResult<VerdictKind> {
        let expected_stdout = match case.expected_stdout() {
            Some(path) => match fs::read(path) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    log::warn!("{}: cannot read {:?}: {}", case.path().display(), path, e);
                    return Ok(VerdictKind::UnreadableExpectation { reason: e.to_string() });
                }
            },
            None => None,
        };

        // 期待出力がなければ、出力はそのまま端末へ流す
        let mode = if expected_stdout.is_some() {
            OutputMode::CaptureStdout
        } else {
            OutputMode::Inherit
        };
        let invocation = Invocation::new(artifacts.executable()).output(mode);

        log::debug!("{}: {} stage", case.path().display(), Stage::Execute);
        let result = match self.invoker.invoke(&invocation) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("{}: bad binary: {}", case.path().display(), e);
                return Ok(Stage::Execute.spawn_failure(&e));
            }
        };

        let kind = match result.termination {
            Termination::Code(code) => classify(
                case,
                code,
                expected_stdout
                    .as_deref()
                    .map(|expected| (expected, result.stdout.as_slice())),
            ),
            Termination::TimedOut => VerdictKind::TimedOut { stage: Stage::Execute },
            Termination::Signal(_) => {
                log::warn!("{}: {}", case.path().display(), result.termination);
                Stage::Execute.failure(&result)
            }
        };
        Ok(kind)
    }
}
