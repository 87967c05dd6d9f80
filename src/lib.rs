//! shellz：在多个 shell 上并发执行同一条命令

pub mod app;

pub use app::{run, write_report, ReportFormat, RunConfig};
