pub mod app_config;
pub mod paths;


pub use app_config::{AppConfig, DispatcherSettings, PathsConfig, RunDefaults, SshConfig};
pub use paths::{expand_home, DEFAULT_HOME};
