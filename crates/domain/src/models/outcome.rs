use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shell::{Shell, ShellType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// 命令执行成功
    Succeeded,
    /// 会话已建立，命令失败或返回非零退出码
    Failed,
    /// 无法建立会话
    SessionFailed,
}

/// 单个 shell 上的执行结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecOutcome {
    pub shell: String,
    pub kind: ShellType,
    pub endpoint: String,
    pub command: String,
    pub status: OutcomeStatus,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl ExecOutcome {
    pub fn new(shell: &Shell, command: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            shell: shell.name.clone(),
            kind: shell.kind,
            endpoint: shell.endpoint(),
            command: command.to_string(),
            status: OutcomeStatus::Succeeded,
            output: String::new(),
            error: None,
            exit_code: None,
            started_at,
            duration_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }
}

/// 一次运行的汇总报告
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    pub command: String,
    pub outcomes: Vec<ExecOutcome>,
}

impl RunReport {
    /// 按 shell 名称排序，结果与完成顺序无关
    pub fn new(command: impl Into<String>, mut outcomes: Vec<ExecOutcome>) -> Self {
        outcomes.sort_by(|a, b| a.shell.cmp(&b.shell));
        Self {
            command: command.into(),
            outcomes,
        }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn get(&self, shell: &str) -> Option<&ExecOutcome> {
        self.outcomes.iter().find(|o| o.shell == shell)
    }
}
