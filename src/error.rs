//! 統一的なエラーハンドリングモジュール
//!
//! テストランナー全体で使用されるエラー型を提供します。
//! 個々のテストの失敗はここには含まれず、`Verdict`として扱われます。
//! ここに現れるのは、実行全体を中断させる環境レベルの障害だけです。

use std::path::PathBuf;
use thiserror::Error;

/// テストランナーの統一エラー型
#[derive(Error, Debug)]
pub enum RunnerError {
    /// ファイルI/Oエラー
    #[error("ファイル操作エラー: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// テストコーパスの探索エラー
    #[error("テスト探索エラー: {0}")]
    Discovery(String),

    /// 期待終了コードが整数として解釈できないファイル名
    #[error("不正なテストファイル名 {path:?}: 期待終了コード '{segment}' は整数ではありません")]
    MalformedTestName { path: PathBuf, segment: String },

    /// 設定ファイルまたはオプションのエラー
    #[error("設定エラー: {0}")]
    Config(String),

    /// 共有中間ファイルの削除エラー
    #[error("中間ファイル {path:?} を削除できません: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RunnerError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result型のエイリアス
pub type RunnerResult<T> = Result<T, RunnerError>;
