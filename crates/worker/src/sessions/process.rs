use std::process::Stdio;

use shellz_domain::CommandOutput;
use tokio::process::Command;

/// 运行命令并收集输出，stdout 在前、stderr 在后
pub async fn run_captured(mut cmd: Command) -> std::io::Result<CommandOutput> {
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let output = cmd.output().await?;

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }

    Ok(CommandOutput {
        output: text.trim_end().to_string(),
        exit_code: output.status.code(),
    })
}
