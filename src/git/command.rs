use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::infrastructure::error::{HistoryError, Result};

/// 在指定仓库中执行 git 命令
#[derive(Debug, Clone)]
pub struct GitCommand {
    git_binary: String,
    repo_path: PathBuf,
}

impl GitCommand {
    pub fn new(git_binary: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
            repo_path: repo_path.into(),
        }
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// 执行命令，非零退出码视为错误
    pub async fn run(&self, args: &[&str]) -> Result<String> {
        let output = self.output(args).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HistoryError::git_command(
                args.first().copied().unwrap_or_default(),
                stderr.trim(),
                output.status.code(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// 执行命令，非零退出码返回 `None`（例如引用不存在）
    pub async fn run_optional(&self, args: &[&str]) -> Result<Option<String>> {
        let output = self.output(args).await?;

        if !output.status.success() {
            tracing::trace!(
                args = ?args,
                code = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git 命令未返回结果"
            );
            return Ok(None);
        }

        Ok(Some(String::from_utf8_lossy(&output.stdout).trim().to_string()))
    }

    async fn output(&self, args: &[&str]) -> Result<std::process::Output> {
        tracing::trace!(args = ?args, repo = %self.repo_path.display(), "执行 git 命令");

        Command::new(&self.git_binary)
            .args(args)
            .current_dir(&self.repo_path)
            // 统计行按英文输出解析
            .env("LC_ALL", "C")
            .output()
            .await
            .map_err(|e| {
                HistoryError::git_command(
                    args.first().copied().unwrap_or_default(),
                    format!("无法启动 {}: {}", self.git_binary, e),
                    None,
                )
            })
    }
}
