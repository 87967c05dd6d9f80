//! 每个 shell 上执行的任务函数
//!
//! 所有错误都在这里处理并记录，不会向分发器传播。

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use shellz_domain::{ExecOutcome, OutcomeStatus, RunReport, SessionFactory, Shell};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

pub struct ShellRunner {
    factory: Arc<dyn SessionFactory>,
    command: String,
    outcomes: Mutex<Vec<ExecOutcome>>,
}

impl ShellRunner {
    pub fn new(factory: Arc<dyn SessionFactory>, command: impl Into<String>) -> Self {
        Self {
            factory,
            command: command.into(),
            outcomes: Mutex::new(Vec::new()),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// 打开会话、执行命令、关闭会话并记录结果
    ///
    /// 会话一旦建立，无论命令成功与否都会关闭。
    pub async fn run(&self, shell: Shell) -> ExecOutcome {
        let started = Instant::now();
        let mut outcome = ExecOutcome::new(&shell, &self.command, Utc::now());

        match self.factory.open(&shell).await {
            Err(e) => {
                warn!(shell = %shell.name, "error while creating session for shell {}: {}", shell.name, e);
                outcome.status = OutcomeStatus::SessionFailed;
                outcome.error = Some(e.to_string());
            }
            Ok(mut session) => {
                let result = session.exec(&self.command).await;
                if let Err(e) = session.close().await {
                    warn!(shell = %shell.name, "error while closing session: {e}");
                }

                match result {
                    Ok(out) => {
                        outcome.exit_code = out.exit_code;
                        if out.success() {
                            info!(
                                shell = %shell.name,
                                kind = %shell.kind,
                                endpoint = %outcome.endpoint,
                                command = %self.command,
                                "{}:\n{}",
                                headline(&shell, &self.command),
                                out.output
                            );
                        } else {
                            let code = out
                                .exit_code
                                .map_or_else(|| "signal".to_string(), |c| c.to_string());
                            error!(
                                shell = %shell.name,
                                kind = %shell.kind,
                                endpoint = %outcome.endpoint,
                                command = %self.command,
                                exit_code = %code,
                                "{}:\n{}",
                                headline(&shell, &self.command),
                                out.output
                            );
                            outcome.status = OutcomeStatus::Failed;
                            outcome.error = Some(format!("command exited with {code}"));
                        }
                        outcome.output = out.output;
                    }
                    Err(e) => {
                        error!(
                            shell = %shell.name,
                            kind = %shell.kind,
                            endpoint = %outcome.endpoint,
                            command = %self.command,
                            "{}: {}",
                            headline(&shell, &self.command),
                            e
                        );
                        outcome.status = OutcomeStatus::Failed;
                        outcome.error = Some(e.to_string());
                    }
                }
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        self.outcomes.lock().await.push(outcome.clone());
        outcome
    }

    /// 已完成的结果，顺序为完成顺序
    pub async fn outcomes(&self) -> Vec<ExecOutcome> {
        self.outcomes.lock().await.clone()
    }

    /// 按 shell 名称排序的汇总报告
    pub async fn report(&self) -> RunReport {
        RunReport::new(self.command.clone(), self.outcomes().await)
    }
}

/// `name (type host:port) > command`
pub fn headline(shell: &Shell, command: &str) -> String {
    format!("{} ({} {}) > {}", shell.name, shell.kind, shell.endpoint(), command)
}
