use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::paths::{expand_home, CONFIG_FILE, DEFAULT_HOME, IDENTS_DIR, SHELLS_DIR};
use crate::logging::LogConfig;

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub run: RunDefaults,
    pub dispatcher: DispatcherSettings,
    pub ssh: SshConfig,
    pub logging: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// 数据目录，支持 `~` 开头
    pub home: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    /// 未指定 `--run` 时执行的命令
    pub command: String,
    /// 未指定 `--on` 时的选择过滤器
    pub filter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// 并发上限，<= 0 表示每个任务一个worker
    pub concurrency: i64,
    /// 有界模式下的队列容量，0 表示自动
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    pub program: String,
    pub sshpass_program: String,
    pub connect_timeout_seconds: u64,
    pub strict_host_key_checking: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig {
                home: DEFAULT_HOME.to_string(),
            },
            run: RunDefaults {
                command: "uptime".to_string(),
                filter: "*".to_string(),
            },
            dispatcher: DispatcherSettings {
                concurrency: -1,
                queue_capacity: 0,
            },
            ssh: SshConfig::default(),
            logging: LogConfig::default(),
        }
    }
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            sshpass_program: "sshpass".to_string(),
            connect_timeout_seconds: 10,
            strict_host_key_checking: "accept-new".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Default configuration
    /// 2. Config file (TOML format), `<home>/config.toml` when no path is given
    /// 3. Environment variable overrides (prefix: SHELLZ_, nesting: `__`)
    /// 4. `home_override`, when given, always wins for `paths.home`
    pub fn load(config_path: Option<&Path>, home_override: Option<&Path>) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = ConfigBuilder::builder()
            .set_default("paths.home", defaults.paths.home.as_str())?
            .set_default("run.command", defaults.run.command.as_str())?
            .set_default("run.filter", defaults.run.filter.as_str())?
            .set_default("dispatcher.concurrency", defaults.dispatcher.concurrency)?
            .set_default("dispatcher.queue_capacity", defaults.dispatcher.queue_capacity as i64)?
            .set_default("ssh.program", defaults.ssh.program.as_str())?
            .set_default("ssh.sshpass_program", defaults.ssh.sshpass_program.as_str())?
            .set_default(
                "ssh.connect_timeout_seconds",
                defaults.ssh.connect_timeout_seconds as i64,
            )?
            .set_default(
                "ssh.strict_host_key_checking",
                defaults.ssh.strict_host_key_checking.as_str(),
            )?
            .set_default("logging.level", defaults.logging.level.as_directive())?
            .set_default("logging.format", "compact")?
            .set_default("logging.include_target", defaults.logging.include_target)?;

        match config_path {
            Some(path) => {
                if !path.exists() {
                    return Err(anyhow::anyhow!("配置文件不存在: {}", path.display()));
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                let home = home_override
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| expand_home(DEFAULT_HOME));
                builder = builder.add_source(
                    File::from(home.join(CONFIG_FILE))
                        .format(FileFormat::Toml)
                        .required(false),
                );
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("SHELLZ")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(home) = home_override {
            builder = builder.set_override("paths.home", home.to_string_lossy().to_string())?;
        }

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        if self.paths.home.trim().is_empty() {
            return Err(anyhow::anyhow!("数据目录不能为空"));
        }
        if self.run.command.trim().is_empty() {
            return Err(anyhow::anyhow!("默认命令不能为空"));
        }
        if self.run.filter.trim().is_empty() {
            return Err(anyhow::anyhow!("默认过滤器不能为空"));
        }
        self.ssh.validate().context("SSH配置验证失败")?;
        Ok(())
    }

    pub fn home_dir(&self) -> PathBuf {
        expand_home(&self.paths.home)
    }

    pub fn idents_dir(&self) -> PathBuf {
        self.home_dir().join(IDENTS_DIR)
    }

    pub fn shells_dir(&self) -> PathBuf {
        self.home_dir().join(SHELLS_DIR)
    }
}

impl SshConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.is_empty() {
            return Err(anyhow::anyhow!("ssh 程序路径不能为空"));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("连接超时时间必须大于0"));
        }
        let valid = ["yes", "no", "accept-new", "ask", "off"];
        if !valid.contains(&self.strict_host_key_checking.as_str()) {
            return Err(anyhow::anyhow!(
                "无效的 StrictHostKeyChecking: {}，支持: {:?}",
                self.strict_host_key_checking,
                valid
            ));
        }
        Ok(())
    }
}
