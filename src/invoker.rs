//! Toolchain invoker.
//!
//! Every external program the runner touches (compiler, assembler, linker and
//! the built test binary) goes through an [`Invoker`]. The production
//! implementation, [`ProcessInvoker`], spawns exactly one child per call and
//! never retries.

use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

/// How the child's output streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// stdout/stderr are collected into the [`StageResult`]
    Capture,
    /// stdout is collected, stderr goes to the runner's terminal
    CaptureStdout,
    /// Both streams are inherited from the runner
    Inherit,
}

/// 外部コマンド1回分の呼び出し内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// File redirected to the child's stdin; `None` inherits the runner's
    pub stdin: Option<PathBuf>,
    pub output: OutputMode,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn stdin_from(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Code(i32),
    /// Killed by a signal (Unix only)
    Signal(i32),
    /// Killed by the runner after the configured wall-clock limit
    TimedOut,
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Code(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Termination::Code(code);
        }

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt as _;
            if let Some(signal) = status.signal() {
                return Termination::Signal(signal);
            }
        }

        Termination::Code(1)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Code(code) => write!(f, "exit code {}", code),
            Termination::Signal(signal) => write!(f, "signal {}", signal),
            Termination::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Outcome of one external invocation.
///
/// Captured streams are kept as raw bytes; nothing is decoded on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageResult {
    pub termination: Termination,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl StageResult {
    pub fn success(&self) -> bool {
        self.termination.success()
    }

    /// 診断メッセージ表示用に標準出力を文字列化する
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Seam between the pipeline and the operating system.
///
/// `Err` means the process could not be run at all (not found, not
/// executable, stdin file missing). A process that ran and failed is an
/// `Ok` carrying its [`Termination`].
pub trait Invoker {
    fn invoke(&mut self, invocation: &Invocation) -> io::Result<StageResult>;
}

/// How long the output readers get to drain once a timed-out child is killed.
const KILL_GRACE: Duration = Duration::from_millis(200);

/// Runs invocations as real child processes.
///
/// With a timeout set, each child leads its own process group (Unix), and
/// the limit covers both the wait and the draining of captured pipes. On
/// expiry the whole group is killed, so a tool that forked helpers cannot
/// keep the run waiting on a pipe.
#[derive(Debug, Clone, Default)]
pub struct ProcessInvoker {
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl Invoker for ProcessInvoker {
    fn invoke(&mut self, invocation: &Invocation) -> io::Result<StageResult> {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);

        match &invocation.stdin {
            Some(path) => {
                cmd.stdin(Stdio::from(File::open(path)?));
            }
            None => {
                cmd.stdin(Stdio::inherit());
            }
        }

        let (stdout, stderr) = match invocation.output {
            OutputMode::Capture => (Stdio::piped(), Stdio::piped()),
            OutputMode::CaptureStdout => (Stdio::piped(), Stdio::inherit()),
            OutputMode::Inherit => (Stdio::inherit(), Stdio::inherit()),
        };
        cmd.stdout(stdout).stderr(stderr);

        #[cfg(unix)]
        if self.timeout.is_some() {
            use std::os::unix::process::CommandExt as _;
            cmd.process_group(0);
        }

        log::debug!("spawning {:?} {:?}", invocation.program, invocation.args);
        let deadline = self.timeout.and_then(|limit| Instant::now().checked_add(limit));
        let mut child = cmd.spawn()?;

        // パイプが詰まらないよう、待機中も別スレッドで読み続ける
        let stdout_reader = child.stdout.take().map(OutputReader::spawn);
        let stderr_reader = child.stderr.take().map(OutputReader::spawn);

        let status = wait_until(&mut child, deadline)?;
        let stdout = OutputReader::collect(stdout_reader.as_ref(), deadline)?;
        let stderr = OutputReader::collect(stderr_reader.as_ref(), deadline)?;
        let (stdout, stderr) = match (status, stdout, stderr) {
            (Some(status), Some(stdout), Some(stderr)) => {
                return Ok(StageResult {
                    termination: Termination::from_status(status),
                    stdout,
                    stderr,
                })
            }
            (_, stdout, stderr) => (stdout, stderr),
        };

        // 子が期限を過ぎたか、終了後も孫プロセスがパイプを握ったまま期限を過ぎた
        log::warn!(
            "{:?} (pid {}) exceeded {:?}, killing its process group",
            invocation.program,
            child.id(),
            self.timeout.unwrap_or_default()
        );
        kill_process_group(&mut child)?;

        let grace = Instant::now().checked_add(KILL_GRACE);
        let drain = |collected: Option<Vec<u8>>, reader: Option<&OutputReader>| -> io::Result<Vec<u8>> {
            match collected {
                Some(bytes) => Ok(bytes),
                None => Ok(OutputReader::collect(reader, grace)?.unwrap_or_default()),
            }
        };
        Ok(StageResult {
            termination: Termination::TimedOut,
            stdout: drain(stdout, stdout_reader.as_ref())?,
            stderr: drain(stderr, stderr_reader.as_ref())?,
        })
    }
}

/// Drains one pipe on a background thread.
///
/// A reader that misses its deadline is abandoned; its thread exits on its
/// own once the last writer closes the pipe.
struct OutputReader(mpsc::Receiver<io::Result<Vec<u8>>>);

impl OutputReader {
    fn spawn<R: Read + Send + 'static>(mut pipe: R) -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let result = pipe.read_to_end(&mut buf).map(|_| buf);
            let _ = tx.send(result);
        });
        OutputReader(rx)
    }

    /// `Ok(None)` when `deadline` passes before the pipe reaches EOF. An
    /// absent reader (stream not captured) yields empty output.
    fn collect(reader: Option<&Self>, deadline: Option<Instant>) -> io::Result<Option<Vec<u8>>> {
        let Some(OutputReader(rx)) = reader else {
            return Ok(Some(Vec::new()));
        };
        let received = match deadline {
            None => rx.recv().ok(),
            Some(deadline) => match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(result) => Some(result),
                Err(mpsc::RecvTimeoutError::Timeout) => return Ok(None),
                Err(mpsc::RecvTimeoutError::Disconnected) => None,
            },
        };
        match received {
            Some(result) => result.map(Some),
            None => Err(io::Error::new(io::ErrorKind::Other, "output reader thread panicked")),
        }
    }
}

/// `None` when the deadline passes first; the child is left running.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Kills the child and everything left in its process group, then reaps it.
fn kill_process_group(child: &mut Child) -> io::Result<()> {
    #[cfg(unix)]
    if let Ok(pid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: kill(2) takes plain integers. The group id is the child's
        // pid, which stays reserved while any member of the group is alive.
        unsafe {
            let _ = libc::kill(-pid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    child.wait()?;
    Ok(())
}
