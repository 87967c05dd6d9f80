use thiserror::Error;

/// Shellz 错误类型定义
#[derive(Debug, Error)]
pub enum ShellzError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("定义文件无效 {path}: {message}")]
    InvalidDefinition { path: String, message: String },

    #[error("重复的{kind}名称: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("shell {shell} 引用了未知的身份 {identity}")]
    UnknownIdentity { shell: String, identity: String },

    #[error("no shells found on the system, start creating json files inside {path}")]
    NoShells { path: String },

    #[error("can't find shell {name}")]
    ShellNotFound { name: String },

    #[error("no shell selected by the filter {filter}")]
    EmptySelection { filter: String },

    #[error("调度器已关闭，不再接受新的任务")]
    DispatcherClosed,

    #[error("会话错误 ({shell}): {message}")]
    Session { shell: String, message: String },

    #[error("命令执行错误: {0}")]
    CommandExecution(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ShellzError {
    pub fn session(shell: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            shell: shell.into(),
            message: message.into(),
        }
    }

    /// 启动阶段的致命错误：出现时不会提交任何任务
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::InvalidDefinition { .. }
                | Self::DuplicateName { .. }
                | Self::UnknownIdentity { .. }
                | Self::NoShells { .. }
                | Self::ShellNotFound { .. }
                | Self::EmptySelection { .. }
        )
    }
}

impl From<serde_json::Error> for ShellzError {
    fn from(e: serde_json::Error) -> Self {
        ShellzError::Serialization(e.to_string())
    }
}

/// 统一的Result类型
pub type ShellzResult<T> = std::result::Result<T, ShellzError>;
