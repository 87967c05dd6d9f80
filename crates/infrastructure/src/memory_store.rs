use async_trait::async_trait;
use shellz_core::ShellzResult;
use shellz_domain::{Identities, Identity, Inventory, Shell, ShellStore};

use crate::file_store::resolve_shells;

/// 内存中的存储，用于嵌入式调用和测试
#[derive(Debug, Clone, Default)]
pub struct InMemoryShellStore {
    identities: Identities,
    shells: Vec<Shell>,
}

impl InMemoryShellStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.insert(identity.name.clone(), identity);
        self
    }

    pub fn with_shell(mut self, shell: Shell) -> Self {
        self.shells.push(shell);
        self
    }

    pub fn with_shells<I: IntoIterator<Item = Shell>>(mut self, shells: I) -> Self {
        self.shells.extend(shells);
        self
    }
}

#[async_trait]
impl ShellStore for InMemoryShellStore {
    async fn load(&self) -> ShellzResult<Inventory> {
        let shells = resolve_shells(self.shells.clone(), &self.identities)?;
        Ok(Inventory {
            identities: self.identities.clone(),
            shells,
        })
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
