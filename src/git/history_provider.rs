use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::command::GitCommand;
use super::log_parser::{parse_log, parse_name_status, short_ref_name, LOG_FORMAT};
use crate::infrastructure::error::Result;
use crate::scm::models::{HistoryItem, HistoryItemChange, HistoryItemGroup, HistoryItemGroupRef};
use crate::scm::provider::{HistoryItemsOptions, HistoryProvider};

/// 基于 git 命令行的历史记录提供者
pub struct GitHistoryProvider {
    git: GitCommand,
}

impl GitHistoryProvider {
    pub fn new(git_binary: impl Into<String>, repo_path: impl Into<PathBuf>) -> Self {
        Self {
            git: GitCommand::new(git_binary, repo_path),
        }
    }

    /// 从任意子目录定位仓库根目录
    pub async fn discover(git_binary: &str, path: &Path) -> Result<Self> {
        let probe = GitCommand::new(git_binary, path);
        let root = probe.run(&["rev-parse", "--show-toplevel"]).await?;
        Ok(Self::new(git_binary, PathBuf::from(root.trim())))
    }

    pub fn repo_path(&self) -> &Path {
        self.git.repo_path()
    }

    async fn resolve_revision(&self, reference: &str) -> Result<Option<String>> {
        let spec = format!("{}^{{commit}}", reference);
        self.git
            .run_optional(&["rev-parse", "--verify", "--quiet", &spec])
            .await
    }

    async fn group_ref(&self, full_name: &str) -> Result<HistoryItemGroupRef> {
        Ok(HistoryItemGroupRef {
            id: full_name.to_string(),
            name: short_ref_name(full_name).to_string(),
            revision: self.resolve_revision(full_name).await?,
        })
    }

    async fn resolve_upstream(&self, branch: &str) -> Result<Option<HistoryItemGroupRef>> {
        let spec = format!("{}@{{upstream}}", branch);
        match self
            .git
            .run_optional(&["rev-parse", "--symbolic-full-name", &spec])
            .await?
        {
            Some(upstream) if upstream.starts_with("refs/") => Ok(Some(self.group_ref(&upstream).await?)),
            _ => Ok(None),
        }
    }

    /// 基准：上游所在远程的默认分支（`refs/remotes/<remote>/HEAD` 的指向）
    async fn resolve_base(&self, branch: &str) -> Result<Option<HistoryItemGroupRef>> {
        let key = format!("branch.{}.remote", branch);
        let Some(remote) = self.git.run_optional(&["config", "--get", &key]).await? else {
            return Ok(None);
        };
        if remote.is_empty() || remote == "." {
            return Ok(None);
        }

        let remote_head = format!("refs/remotes/{}/HEAD", remote);
        match self
            .git
            .run_optional(&["symbolic-ref", "--quiet", &remote_head])
            .await?
        {
            Some(target) if !target.is_empty() => Ok(Some(self.group_ref(&target).await?)),
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl HistoryProvider for GitHistoryProvider {
    async fn current_history_item_group(&self) -> Result<Option<HistoryItemGroup>> {
        let Some(head) = self
            .git
            .run_optional(&["symbolic-ref", "--quiet", "HEAD"])
            .await?
        else {
            tracing::debug!(repo = %self.repo_path().display(), "分离 HEAD，没有当前分组");
            return Ok(None);
        };

        let name = short_ref_name(&head).to_string();
        let Some(revision) = self.resolve_revision("HEAD").await? else {
            tracing::debug!(branch = %name, "分支尚无提交");
            return Ok(None);
        };
        let remote = self.resolve_upstream(&name).await?;
        let base = self.resolve_base(&name).await?;

        Ok(Some(HistoryItemGroup {
            id: head,
            name,
            revision: Some(revision),
            remote,
            base,
        }))
    }

    async fn provide_history_items(&self, options: &HistoryItemsOptions) -> Result<Vec<HistoryItem>> {
        let format = format!("--format={}", LOG_FORMAT);
        let limit = format!("--max-count={}", options.limit);
        let skip = format!("--skip={}", options.skip);

        let mut args = vec![
            "log",
            "--topo-order",
            "--decorate=full",
            "--shortstat",
            format.as_str(),
            limit.as_str(),
            skip.as_str(),
        ];

        if options.group_ids.is_empty() {
            args.push("--all");
        } else {
            args.extend(options.group_ids.iter().map(String::as_str));
        }
        args.push("--");

        let output = self.git.run(&args).await?;
        let items = parse_log(&output)?;

        tracing::debug!(
            repo = %self.repo_path().display(),
            count = items.len(),
            skip = options.skip,
            "git log 完成"
        );
        Ok(items)
    }

    async fn provide_history_item_changes(
        &self,
        history_item_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<HistoryItemChange>> {
        let output = match parent_id {
            Some(parent_id) => {
                self.git
                    .run(&[
                        "diff",
                        "--name-status",
                        "-z",
                        "-M",
                        parent_id,
                        history_item_id,
                        "--",
                    ])
                    .await?
            }
            None => {
                self.git
                    .run(&[
                        "diff-tree",
                        "--root",
                        "--no-commit-id",
                        "-r",
                        "--name-status",
                        "-z",
                        "-M",
                        history_item_id,
                    ])
                    .await?
            }
        };

        parse_name_status(&output)
    }

    async fn resolve_history_item_group_common_ancestor(&self, group_ids: &[String]) -> Option<String> {
        if group_ids.len() < 2 {
            return None;
        }

        let mut args = vec!["merge-base"];
        if group_ids.len() > 2 {
            args.push("--octopus");
        }
        args.extend(group_ids.iter().map(String::as_str));

        match self.git.run_optional(&args).await {
            Ok(Some(ancestor)) if !ancestor.is_empty() => Some(ancestor),
            Ok(_) => {
                tracing::debug!(groups = ?group_ids, "没有共同祖先");
                None
            }
            Err(error) => {
                tracing::warn!(groups = ?group_ids, error = %error, "解析共同祖先失败");
                None
            }
        }
    }
}
