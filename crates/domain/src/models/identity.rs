use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use shellz_core::config::expand_home;
use shellz_core::{ShellzError, ShellzResult};

/// 登录身份：用户名 + 私钥或密码
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Identity {
    /// 私钥路径，`~` 已展开
    pub fn key_path(&self) -> Option<PathBuf> {
        self.key
            .as_deref()
            .filter(|k| !k.is_empty())
            .map(expand_home)
    }

    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }

    pub fn validate(&self) -> ShellzResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShellzError::Configuration("身份名称不能为空".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(ShellzError::Configuration(format!(
                "身份 {} 缺少用户名",
                self.name
            )));
        }
        Ok(())
    }
}

// 密码不进入日志
impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("key", &self.key)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
