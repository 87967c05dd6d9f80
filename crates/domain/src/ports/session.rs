use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shellz_core::ShellzResult;

use crate::models::Shell;

/// 一次命令执行的输出
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutput {
    /// stdout 与 stderr 合并后的输出
    pub output: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// 已建立的会话
///
/// 获得会话后，无论成功还是失败都必须调用 `close`。
#[async_trait]
pub trait Session: Send {
    async fn exec(&mut self, command: &str) -> ShellzResult<CommandOutput>;
    async fn close(&mut self) -> ShellzResult<()>;
}

/// 为 shell 打开会话
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, shell: &Shell) -> ShellzResult<Box<dyn Session>>;
}
