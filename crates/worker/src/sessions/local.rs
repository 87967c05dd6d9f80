use async_trait::async_trait;
use shellz_core::{ShellzError, ShellzResult};
use shellz_domain::{CommandOutput, Session};
use tokio::process::Command;
use tracing::debug;

use super::process::run_captured;

/// 在本机通过 `sh -c` 执行命令
#[derive(Debug)]
pub struct LocalSession {
    shell: String,
    closed: bool,
}

impl LocalSession {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            closed: false,
        }
    }
}

#[async_trait]
impl Session for LocalSession {
    async fn exec(&mut self, command: &str) -> ShellzResult<CommandOutput> {
        if self.closed {
            return Err(ShellzError::session(&self.shell, "session already closed"));
        }
        debug!(shell = %self.shell, "sh -c {command}");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        run_captured(cmd)
            .await
            .map_err(|e| ShellzError::CommandExecution(format!("启动 sh 失败: {e}")))
    }

    async fn close(&mut self) -> ShellzResult<()> {
        self.closed = true;
        Ok(())
    }
}
