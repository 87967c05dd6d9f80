use async_trait::async_trait;
use shellz_core::{AppConfig, ShellzResult, SshConfig};
use shellz_domain::{Session, SessionFactory, Shell, ShellType};
use tracing::debug;

use crate::sessions::{LocalSession, SshSession};

/// 根据 shell 类型创建会话
#[derive(Debug, Clone, Default)]
pub struct DefaultSessionFactory {
    ssh: SshConfig,
}

impl DefaultSessionFactory {
    pub fn new(ssh: SshConfig) -> Self {
        Self { ssh }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.ssh.clone())
    }

    pub fn ssh_config(&self) -> &SshConfig {
        &self.ssh
    }
}

#[async_trait]
impl SessionFactory for DefaultSessionFactory {
    async fn open(&self, shell: &Shell) -> ShellzResult<Box<dyn Session>> {
        debug!(shell = %shell.name, kind = %shell.kind, "Creating session for {}", shell.endpoint());
        match shell.kind {
            ShellType::Local => Ok(Box::new(LocalSession::new(&shell.name))),
            ShellType::Ssh => Ok(Box::new(SshSession::connect(shell, &self.ssh).await?)),
        }
    }
}
