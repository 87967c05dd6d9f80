use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use shellz_core::config::paths::{IDENTS_DIR, SHELLS_DIR};
use shellz_core::{AppConfig, ShellzError, ShellzResult};
use shellz_domain::{Identities, Identity, Inventory, Shell, ShellStore, Shells};
use tracing::{debug, info};

/// 基于目录的身份与 shell 存储
///
/// 目录结构:
/// ```text
/// <home>/idents/*.json
/// <home>/shells/*.json
/// ```
/// 每个文件一个定义，按文件名顺序加载。
#[derive(Debug, Clone)]
pub struct FileShellStore {
    home: PathBuf,
}

impl FileShellStore {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.home_dir())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn idents_dir(&self) -> PathBuf {
        self.home.join(IDENTS_DIR)
    }

    pub fn shells_dir(&self) -> PathBuf {
        self.home.join(SHELLS_DIR)
    }

    pub async fn load_identities(&self) -> ShellzResult<Identities> {
        let mut identities = Identities::new();
        for path in json_files(&self.idents_dir()).await? {
            let identity: Identity = read_definition(&path).await?;
            identity.validate().map_err(|e| invalid(&path, e))?;
            if identities.contains_key(&identity.name) {
                return Err(ShellzError::DuplicateName {
                    kind: "身份",
                    name: identity.name,
                });
            }
            debug!("Loaded identity {} from {}", identity.name, path.display());
            identities.insert(identity.name.clone(), identity);
        }
        Ok(identities)
    }

    pub async fn load_shells(&self, identities: &Identities) -> ShellzResult<Shells> {
        let mut definitions = Vec::new();
        for path in json_files(&self.shells_dir()).await? {
            let shell: Shell = read_definition(&path).await?;
            shell.validate().map_err(|e| invalid(&path, e))?;
            definitions.push(shell);
        }
        resolve_shells(definitions, identities)
    }
}

#[async_trait]
impl ShellStore for FileShellStore {
    async fn load(&self) -> ShellzResult<Inventory> {
        let identities = self.load_identities().await?;
        let shells = self.load_shells(&identities).await?;
        info!(
            "Loaded {} identities and {} shells from {}",
            identities.len(),
            shells.len(),
            self.home.display()
        );
        Ok(Inventory { identities, shells })
    }

    fn location(&self) -> String {
        self.shells_dir().display().to_string()
    }
}

/// 解析 shell 引用的身份，跳过被禁用的 shell
///
/// 名称重复或引用未知身份都视为错误。
pub fn resolve_shells(definitions: Vec<Shell>, identities: &Identities) -> ShellzResult<Shells> {
    let mut shells = Shells::new();
    for mut shell in definitions {
        if shells.contains_key(&shell.name) {
            return Err(ShellzError::DuplicateName {
                kind: "shell",
                name: shell.name,
            });
        }

        if !shell.enabled {
            debug!("Skipping disabled shell {}", shell.name);
            continue;
        }

        if let Some(identity_name) = shell.identity_name.as_deref().filter(|n| !n.is_empty()) {
            let identity = identities.get(identity_name).ok_or_else(|| {
                ShellzError::UnknownIdentity {
                    shell: shell.name.clone(),
                    identity: identity_name.to_string(),
                }
            })?;
            shell.identity = Some(identity.clone());
        }

        shells.insert(shell.name.clone(), shell);
    }
    Ok(shells)
}

/// 列出目录中的 json 文件，目录不存在时返回空
async fn json_files(dir: &Path) -> ShellzResult<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_json = path.extension().is_some_and(|ext| ext == "json");
        if is_json && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

async fn read_definition<T: DeserializeOwned>(path: &Path) -> ShellzResult<T> {
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|e| ShellzError::InvalidDefinition {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn invalid(path: &Path, error: ShellzError) -> ShellzError {
    ShellzError::InvalidDefinition {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
