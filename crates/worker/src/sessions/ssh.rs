//! 基于 OpenSSH 控制主连接的会话
//!
//! `connect` 建立一个后台主连接（认证在这里完成），`exec` 通过控制套接字复用该连接，
//! `close` 发送 `-O exit` 结束主连接并删除临时目录。

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use shellz_core::{ShellzError, ShellzResult, SshConfig};
use shellz_domain::{CommandOutput, Session, Shell};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use super::process::run_captured;

const SOCKET_NAME: &str = "control.sock";
const MASTER_LOG: &str = "master.log";

/// 连接一个 ssh shell 所需的全部参数
#[derive(Clone)]
pub struct SshTarget {
    pub program: String,
    pub sshpass_program: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub key: Option<PathBuf>,
    pub password: Option<String>,
    pub connect_timeout_seconds: u64,
    pub strict_host_key_checking: String,
}

impl std::fmt::Debug for SshTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshTarget")
            .field("destination", &self.destination())
            .field("port", &self.port)
            .field("key", &self.key)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl SshTarget {
    pub fn from_shell(shell: &Shell, config: &SshConfig) -> ShellzResult<Self> {
        let identity = shell.identity.as_ref().ok_or_else(|| {
            ShellzError::session(&shell.name, "ssh shell 没有可用的身份")
        })?;

        Ok(Self {
            program: config.program.clone(),
            sshpass_program: config.sshpass_program.clone(),
            host: shell.host.clone(),
            port: shell.port,
            username: identity.username.clone(),
            key: identity.key_path(),
            password: identity.password.clone().filter(|p| !p.is_empty()),
            connect_timeout_seconds: config.connect_timeout_seconds,
            strict_host_key_checking: config.strict_host_key_checking.clone(),
        })
    }

    pub fn destination(&self) -> String {
        format!("{}@{}", self.username, self.host)
    }

    /// 所有调用共用的参数
    pub fn common_args(&self, socket: &Path) -> Vec<String> {
        let mut args = vec![
            "-S".to_string(),
            socket.display().to_string(),
            "-p".to_string(),
            self.port.to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_seconds),
            "-o".to_string(),
            format!("StrictHostKeyChecking={}", self.strict_host_key_checking),
        ];
        if let Some(key) = &self.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        if self.password.is_none() {
            args.push("-o".to_string());
            args.push("BatchMode=yes".to_string());
        }
        args
    }

    /// 建立后台主连接，认证成功后 ssh 进程转入后台
    pub fn master_args(&self, socket: &Path) -> Vec<String> {
        let mut args = vec![
            "-M".to_string(),
            "-f".to_string(),
            "-N".to_string(),
            "-o".to_string(),
            "ControlPersist=yes".to_string(),
        ];
        args.extend(self.common_args(socket));
        args.push(self.destination());
        args
    }

    pub fn exec_args(&self, socket: &Path, command: &str) -> Vec<String> {
        let mut args = self.common_args(socket);
        args.push(self.destination());
        args.push(command.to_string());
        args
    }

    pub fn exit_args(&self, socket: &Path) -> Vec<String> {
        let mut args = self.common_args(socket);
        args.push("-O".to_string());
        args.push("exit".to_string());
        args.push(self.destination());
        args
    }

    /// 只有主连接需要认证，密码通过 `SSHPASS` 环境变量交给 sshpass
    fn master_command(&self, socket: &Path) -> Command {
        match &self.password {
            Some(password) => {
                let mut cmd = Command::new(&self.sshpass_program);
                cmd.env("SSHPASS", password)
                    .arg("-e")
                    .arg(&self.program)
                    .args(self.master_args(socket));
                cmd
            }
            None => {
                let mut cmd = Command::new(&self.program);
                cmd.args(self.master_args(socket));
                cmd
            }
        }
    }
}

/// ssh 会话，持有控制套接字所在的临时目录
#[derive(Debug)]
pub struct SshSession {
    shell: String,
    target: SshTarget,
    control_dir: Option<TempDir>,
    socket: PathBuf,
}

impl SshSession {
    pub async fn connect(shell: &Shell, config: &SshConfig) -> ShellzResult<Self> {
        let target = SshTarget::from_shell(shell, config)?;
        let control_dir = tempfile::Builder::new().prefix("shellz-").tempdir()?;
        let socket = control_dir.path().join(SOCKET_NAME);
        let log_path = control_dir.path().join(MASTER_LOG);

        // 主连接转入后台后仍持有 stderr，输出写入控制目录中的日志文件
        let log = std::fs::File::create(&log_path)?;
        let mut cmd = target.master_command(&socket);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(log));

        debug!(shell = %shell.name, "Opening ssh control master to {}", target.destination());
        let status = cmd.status().await.map_err(|e| {
            ShellzError::session(&shell.name, format!("无法启动 {}: {e}", target.program))
        })?;

        if !status.success() {
            let detail = tokio::fs::read_to_string(&log_path).await.unwrap_or_default();
            return Err(ShellzError::session(
                &shell.name,
                format!("ssh 连接失败 ({status}): {}", detail.trim()),
            ));
        }

        Ok(Self {
            shell: shell.name.clone(),
            target,
            control_dir: Some(control_dir),
            socket,
        })
    }

    pub fn is_open(&self) -> bool {
        self.control_dir.is_some()
    }
}

#[async_trait]
impl Session for SshSession {
    async fn exec(&mut self, command: &str) -> ShellzResult<CommandOutput> {
        if !self.is_open() {
            return Err(ShellzError::session(&self.shell, "session already closed"));
        }
        let mut cmd = Command::new(&self.target.program);
        cmd.args(self.target.exec_args(&self.socket, command));
        run_captured(cmd)
            .await
            .map_err(|e| ShellzError::CommandExecution(format!("启动 {} 失败: {e}", self.target.program)))
    }

    async fn close(&mut self) -> ShellzResult<()> {
        let Some(control_dir) = self.control_dir.take() else {
            return Ok(());
        };

        let mut cmd = Command::new(&self.target.program);
        cmd.args(self.target.exit_args(&self.socket))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let status = cmd.status().await;
        drop(control_dir);

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ShellzError::session(
                &self.shell,
                format!("关闭控制连接失败: {status}"),
            )),
            Err(e) => Err(ShellzError::session(
                &self.shell,
                format!("关闭控制连接失败: {e}"),
            )),
        }
    }
}

impl Drop for SshSession {
    /// 未调用 `close` 时停止主连接
    ///
    /// 在 Tokio 运行时内异步执行，临时目录在 `-O exit` 结束后删除；
    /// 运行时之外同步执行。
    fn drop(&mut self) {
        let Some(control_dir) = self.control_dir.take() else {
            return;
        };
        warn!(shell = %self.shell, "ssh session dropped without close, stopping control master");

        let program = self.target.program.clone();
        let args = self.target.exit_args(&self.socket);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = Command::new(&program)
                        .args(&args)
                        .stdin(Stdio::null())
                        .stdout(Stdio::null())
                        .stderr(Stdio::null())
                        .status()
                        .await;
                    drop(control_dir);
                });
            }
            Err(_) => {
                let _ = std::process::Command::new(&program)
                    .args(&args)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status();
            }
        }
    }
}
