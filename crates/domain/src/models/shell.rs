use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use shellz_core::{ShellzError, ShellzResult};

use super::identity::Identity;

/// 按名称排序的 shell 集合，迭代顺序即提交顺序
pub type Shells = BTreeMap<String, Shell>;

/// 按名称索引的身份集合
pub type Identities = BTreeMap<String, Identity>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ShellType {
    #[default]
    Ssh,
    Local,
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellType::Ssh => f.write_str("ssh"),
            ShellType::Local => f.write_str("local"),
        }
    }
}

/// 一个可以打开会话的远程（或本地）shell
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shell {
    pub name: String,
    #[serde(default, alias = "address")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, rename = "identity", skip_serializing_if = "Option::is_none")]
    pub identity_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: ShellType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// 加载时根据 `identity_name` 解析
    #[serde(skip)]
    pub identity: Option<Identity>,
}

fn default_port() -> u16 {
    22
}

fn default_enabled() -> bool {
    true
}

impl Shell {
    pub fn new(name: impl Into<String>, kind: ShellType) -> Self {
        Self {
            name: name.into(),
            host: String::new(),
            port: default_port(),
            identity_name: None,
            kind,
            enabled: true,
            groups: Vec::new(),
            identity: None,
        }
    }

    pub fn with_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity_name = Some(identity.name.clone());
        self.identity = Some(identity);
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    /// `host:port`，本地 shell 为 `localhost`
    pub fn endpoint(&self) -> String {
        match self.kind {
            ShellType::Local => "localhost".to_string(),
            ShellType::Ssh => format!("{}:{}", self.host, self.port),
        }
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// 校验定义本身，身份解析由存储负责
    pub fn validate(&self) -> ShellzResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShellzError::Configuration("shell 名称不能为空".to_string()));
        }
        if self.kind == ShellType::Ssh {
            if self.host.trim().is_empty() {
                return Err(ShellzError::Configuration(format!(
                    "ssh shell {} 缺少 host",
                    self.name
                )));
            }
            if self.port == 0 {
                return Err(ShellzError::Configuration(format!(
                    "ssh shell {} 的端口无效",
                    self.name
                )));
            }
            if self.identity_name.as_deref().map_or(true, str::is_empty) {
                return Err(ShellzError::Configuration(format!(
                    "ssh shell {} 缺少 identity",
                    self.name
                )));
            }
        }
        Ok(())
    }
}
