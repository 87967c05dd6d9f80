//! 驱动：加载 shell，按过滤器选择，分发到并发 worker 并汇总结果

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use shellz_core::{AppConfig, ShellzError, ShellzResult};
use shellz_dispatcher::{Dispatcher, DispatcherConfig};
use shellz_domain::{OutcomeStatus, RunReport, SessionFactory, Shell, ShellFilter, ShellStore};
use shellz_worker::ShellRunner;
use tracing::{debug, info, warn};

/// 汇总报告的输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// 一次运行的全部参数，在 `main` 中构造一次
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub command: String,
    pub filter: ShellFilter,
    /// `<= 0` 表示每个 shell 一个 worker
    pub concurrency: i64,
    pub queue_capacity: usize,
    pub report_format: ReportFormat,
}

impl RunConfig {
    pub fn new(command: impl Into<String>, filter: &str) -> Self {
        Self {
            command: command.into(),
            filter: ShellFilter::parse(filter),
            concurrency: -1,
            queue_capacity: 0,
            report_format: ReportFormat::default(),
        }
    }

    /// 以配置文件为默认值，命令行参数优先
    pub fn from_config(
        config: &AppConfig,
        command: Option<String>,
        filter: Option<String>,
        concurrency: Option<i64>,
    ) -> Self {
        Self {
            command: command.unwrap_or_else(|| config.run.command.clone()),
            filter: ShellFilter::parse(filter.as_deref().unwrap_or(&config.run.filter)),
            concurrency: concurrency.unwrap_or(config.dispatcher.concurrency),
            queue_capacity: config.dispatcher.queue_capacity,
            report_format: ReportFormat::default(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: i64) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig::from_limit(self.concurrency).with_queue_capacity(self.queue_capacity)
    }
}

/// 运行一次命令
///
/// 启动阶段的错误（加载失败、没有 shell、选择失败）在提交任何任务之前返回。
/// 单个 shell 上的失败只体现在报告中。
pub async fn run(
    config: &RunConfig,
    store: &dyn ShellStore,
    factory: Arc<dyn SessionFactory>,
) -> ShellzResult<RunReport> {
    let inventory = store.load().await?;
    if inventory.shells.is_empty() {
        return Err(ShellzError::NoShells {
            path: store.location(),
        });
    }
    debug!(
        "Loaded {} identities and {} shells from {}",
        inventory.identities.len(),
        inventory.shells.len(),
        store.location()
    );

    let selected = config.filter.select(&inventory.shells)?;
    let dispatcher_config = config.dispatcher_config();
    info!(
        "running {:?} on {} shells ({})",
        config.command,
        selected.len(),
        dispatcher_config.concurrency
    );

    let runner = Arc::new(ShellRunner::new(factory, config.command.clone()));
    let mut dispatcher = {
        let runner = Arc::clone(&runner);
        Dispatcher::with_config(dispatcher_config, move |shell: Shell| {
            let runner = Arc::clone(&runner);
            async move {
                runner.run(shell).await;
            }
        })
    };

    // BTreeMap 按名称排序，提交顺序是确定的
    dispatcher.submit_all(selected.into_values()).await?;
    dispatcher.wait().await;

    let stats = dispatcher.stats();
    if stats.panicked > 0 {
        warn!("{} jobs terminated abnormally", stats.panicked);
    }

    Ok(runner.report().await)
}

/// 将汇总报告写到 `out`
pub fn write_report<W: Write>(
    out: &mut W,
    report: &RunReport,
    format: ReportFormat,
) -> anyhow::Result<()> {
    match format {
        ReportFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, report).context("序列化报告失败")?;
            writeln!(out)?;
        }
        ReportFormat::Text => {
            for outcome in &report.outcomes {
                let status = match outcome.status {
                    OutcomeStatus::Succeeded => "ok",
                    OutcomeStatus::Failed => "failed",
                    OutcomeStatus::SessionFailed => "no session",
                };
                write!(
                    out,
                    "{:<20} {:<24} {:<10} {:>6}ms",
                    outcome.shell, outcome.endpoint, status, outcome.duration_ms
                )?;
                if let Some(error) = &outcome.error {
                    write!(out, "  {error}")?;
                }
                writeln!(out)?;
            }
            writeln!(
                out,
                "{} shells, {} succeeded, {} failed",
                report.total(),
                report.succeeded(),
                report.failed()
            )?;
        }
    }
    Ok(())
}
