use async_trait::async_trait;
use shellz_core::ShellzResult;

use crate::models::{Identities, Shells};

/// 已加载的身份与 shell
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub identities: Identities,
    pub shells: Shells,
}

/// 身份与 shell 定义的存储抽象
#[async_trait]
pub trait ShellStore: Send + Sync {
    async fn load(&self) -> ShellzResult<Inventory>;

    /// 用于错误提示的存储位置
    fn location(&self) -> String;
}
