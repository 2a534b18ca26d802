//! Shared intermediate files.
//!
//! Every test in a run goes through the same three fixed paths: the assembly
//! text, the object file and the linked executable. [`SharedArtifacts`] owns
//! them for the lifetime of the run and removes them when it is released or
//! dropped, whichever comes first. Stages borrow it mutably, so only one
//! test can be writing to these paths at a time.

use crate::error::{RunnerError, RunnerResult};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const ASM_FILE: &str = "tmp.asm";
pub const OBJECT_FILE: &str = "tmp.o";
pub const EXECUTABLE_FILE: &str = "tmp";

#[derive(Debug)]
pub struct SharedArtifacts {
    asm: PathBuf,
    object: PathBuf,
    executable: PathBuf,
    released: bool,
}

impl SharedArtifacts {
    /// 中間ファイルの置き場所を確保する（ディレクトリがなければ作成）
    pub fn acquire<P: AsRef<Path>>(dir: P) -> RunnerResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| RunnerError::io(format!("中間ファイル用ディレクトリ {:?} を作成できません", dir), e))?;

        Ok(Self {
            asm: dir.join(ASM_FILE),
            object: dir.join(OBJECT_FILE),
            executable: dir.join(EXECUTABLE_FILE),
            released: false,
        })
    }

    pub fn asm(&self) -> &Path {
        &self.asm
    }

    pub fn object(&self) -> &Path {
        &self.object
    }

    /// Always has a directory component (`./tmp` by default), so running it
    /// never falls back to a `PATH` lookup.
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn paths(&self) -> [&Path; 3] {
        [self.asm.as_path(), self.object.as_path(), self.executable.as_path()]
    }

    /// Write the compiler's output verbatim as the assembly artifact.
    pub fn write_asm(&mut self, asm: &[u8]) -> io::Result<()> {
        fs::write(&self.asm, asm)
    }

    /// 前のテストの成果物を消す
    ///
    /// The assembly file is always rewritten by the compile stage; the
    /// object and executable are removed so that a tool that exits 0
    /// without producing output cannot leave a stale binary to be run.
    pub fn scrub(&mut self) -> RunnerResult<()> {
        remove_if_exists(&self.object)?;
        remove_if_exists(&self.executable)
    }

    /// Remove all three files, reporting the first failure.
    pub fn release(mut self) -> RunnerResult<()> {
        self.released = true;
        let mut first_error = None;
        for path in self.paths() {
            if let Err(e) = remove_if_exists(path) {
                log::warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for SharedArtifacts {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        for path in self.paths() {
            if let Err(e) = remove_if_exists(path) {
                log::warn!("{}", e);
            }
        }
    }
}

fn remove_if_exists(path: &Path) -> RunnerResult<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed {:?}", path);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(RunnerError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}
