use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use shellz::{ReportFormat, RunConfig};
use shellz_core::{init_logging, AppConfig, LogConfig, OutputFormat};
use shellz_infrastructure::FileShellStore;
use shellz_worker::DefaultSessionFactory;
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(name = "shellz")]
#[command(version)]
#[command(about = "在多个远程 shell 上并发执行同一条命令")]
struct Cli {
    /// 要执行的命令 [默认: uptime]
    #[arg(short, long, value_name = "COMMAND", allow_hyphen_values = true)]
    run: Option<String>,

    /// 逗号分隔的 shell 或分组名称，`*` 表示全部 [默认: *]
    #[arg(short, long, value_name = "LIST", allow_hyphen_values = true)]
    on: Option<String>,

    /// 输出调试日志
    #[arg(short, long)]
    debug: bool,

    /// 并发 worker 数，<= 0 表示每个 shell 一个 [默认: -1]
    #[arg(short = 'j', long, value_name = "N", allow_negative_numbers = true)]
    workers: Option<i64>,

    /// 配置文件路径 [默认: <home>/config.toml]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 数据目录 [默认: ~/.shellz]
    #[arg(long, value_name = "DIR")]
    home: Option<PathBuf>,

    /// 日志格式
    #[arg(long, value_name = "FORMAT", value_parser = ["pretty", "compact", "json"])]
    log_format: Option<String>,

    /// 汇总报告格式
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,
}

/// 接受单个 `-` 的长参数名
const LONG_FLAGS: &[&str] = &[
    "run",
    "on",
    "debug",
    "workers",
    "config",
    "home",
    "log-format",
    "report",
];

/// 需要取值的参数，其后的一项原样保留
const VALUE_FLAGS: &[&str] = &[
    "-r", "--run", "-o", "--on", "-j", "--workers", "-c", "--config", "--home", "--log-format",
    "--report",
];

/// 把 `-run uptime`、`-on=web` 这样的写法改写为 `--run`、`--on=web`
///
/// 遇到 `--` 之后的参数不再改写。
fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator,
    I::Item: Into<OsString>,
{
    let mut normalized = Vec::new();
    let mut expects_value = false;
    let mut passthrough = false;

    for arg in args.into_iter().map(Into::into) {
        if passthrough || expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            normalized.push(arg);
            continue;
        };
        if text == "--" {
            passthrough = true;
            normalized.push(arg);
            continue;
        }

        let rewritten = match text.strip_prefix('-') {
            Some(rest) if !rest.starts_with('-') => {
                let name = rest.split('=').next().unwrap_or(rest);
                LONG_FLAGS
                    .contains(&name)
                    .then(|| format!("--{rest}"))
            }
            _ => None,
        };
        let flag = rewritten.unwrap_or_else(|| text.to_string());
        expects_value = !flag.contains('=') && VALUE_FLAGS.contains(&flag.as_str());
        normalized.push(OsString::from(flag));
    }
    normalized
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_from(normalize_args(std::env::args_os()));

    let config = match AppConfig::load(cli.config.as_deref(), cli.home.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // 配置不可用时按默认日志输出错误
            let _ = init_logging(&LogConfig::default().with_debug(cli.debug));
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&log_config(&cli, &config)) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match execute(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn log_config(cli: &Cli, config: &AppConfig) -> LogConfig {
    let mut log = config.logging.clone().with_debug(cli.debug);
    if let Some(format) = cli.log_format.as_deref().and_then(|f| f.parse::<OutputFormat>().ok()) {
        log = log.with_format(format);
    }
    log
}

async fn execute(cli: Cli, config: AppConfig) -> Result<()> {
    let run_config = RunConfig::from_config(&config, cli.run, cli.on, cli.workers)
        .with_report_format(cli.report);
    debug!(?run_config, "Starting run");

    let store = FileShellStore::from_config(&config);
    let factory = Arc::new(DefaultSessionFactory::from_config(&config));

    let report = shellz::run(&run_config, &store, factory).await?;

    let stdout = std::io::stdout();
    shellz::write_report(&mut stdout.lock(), &report, run_config.report_format)
        .context("输出报告失败")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellz_core::LogLevel;
    use shellz_domain::ShellFilter;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_single_dash_long_flags() {
        let cli = parse(&["shellz", "-run", "df -h", "-on", "*", "-debug"]);
        assert_eq!(cli.run.as_deref(), Some("df -h"));
        assert_eq!(cli.on.as_deref(), Some("*"));
        assert!(cli.debug);

        let cli = parse(&["shellz", "-run=uptime", "-on=web,db", "-workers", "4"]);
        assert_eq!(cli.run.as_deref(), Some("uptime"));
        assert_eq!(cli.on.as_deref(), Some("web,db"));
        assert_eq!(cli.workers, Some(4));
    }

    #[test]
    fn test_double_dash_and_short_flags() {
        let cli = parse(&["shellz", "--run", "uptime", "--on", "a,b", "--debug"]);
        assert_eq!(cli.run.as_deref(), Some("uptime"));
        assert_eq!(cli.on.as_deref(), Some("a,b"));
        assert!(cli.debug);

        let cli = parse(&["shellz", "-r", "whoami", "-o", "media", "-d", "-j", "2"]);
        assert_eq!(cli.run.as_deref(), Some("whoami"));
        assert_eq!(cli.on.as_deref(), Some("media"));
        assert!(cli.debug);
        assert_eq!(cli.workers, Some(2));
    }

    #[test]
    fn test_values_are_never_rewritten() {
        // 命令本身恰好像一个参数名
        let cli = parse(&["shellz", "-run", "-debug", "-on", "-home"]);
        assert_eq!(cli.run.as_deref(), Some("-debug"));
        assert_eq!(cli.on.as_deref(), Some("-home"));
        assert!(!cli.debug);
        assert!(cli.home.is_none());
    }

    #[test]
    fn test_negative_workers() {
        assert_eq!(parse(&["shellz", "-j", "-1"]).workers, Some(-1));
        assert_eq!(parse(&["shellz", "--workers", "-1"]).workers, Some(-1));
        assert_eq!(parse(&["shellz", "-workers=-1"]).workers, Some(-1));
    }

    #[test]
    fn test_defaults_come_from_config() {
        let cli = parse(&["shellz"]);
        assert!(cli.run.is_none());
        assert!(cli.on.is_none());
        assert!(!cli.debug);
        assert_eq!(cli.report, ReportFormat::Text);

        let run = RunConfig::from_config(&AppConfig::default(), cli.run, cli.on, cli.workers);
        assert_eq!(run.command, "uptime");
        assert_eq!(run.filter, ShellFilter::All);
        assert_eq!(run.concurrency, -1);
    }

    #[test]
    fn test_report_and_log_format_flags() {
        let cli = parse(&["shellz", "--report", "json", "-log-format", "json"]);
        assert_eq!(cli.report, ReportFormat::Json);
        assert_eq!(cli.log_format.as_deref(), Some("json"));

        assert!(Cli::try_parse_from(["shellz", "--log-format", "xml"]).is_err());
    }

    #[test]
    fn test_log_config_applies_debug_and_format() {
        let config = AppConfig::default();

        let log = log_config(&parse(&["shellz"]), &config);
        assert_eq!(log.level, LogLevel::Info);
        assert_eq!(log.format, OutputFormat::Compact);

        let log = log_config(&parse(&["shellz", "-debug", "--log-format", "json"]), &config);
        assert_eq!(log.level, LogLevel::Debug);
        assert_eq!(log.format, OutputFormat::Json);
    }
}
