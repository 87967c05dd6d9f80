use std::path::{Path, PathBuf};

/// 默认的数据目录，身份与 shell 定义都存放在其中
pub const DEFAULT_HOME: &str = "~/.shellz";

/// 身份定义子目录
pub const IDENTS_DIR: &str = "idents";

/// shell 定义子目录
pub const SHELLS_DIR: &str = "shells";

/// 配置文件名
pub const CONFIG_FILE: &str = "config.toml";

/// 展开路径开头的 `~`
///
/// 无法获取 HOME 时原样返回。
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
