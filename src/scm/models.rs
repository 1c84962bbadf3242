// History models shared by providers, the view model and the tree

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::infrastructure::error::HistoryError;

/// 仓库标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepositoryId(pub String);

impl RepositoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 引用（分支 / 远程分支）的轻量描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemGroupRef {
    /// 完整引用名，例如 `refs/remotes/origin/main`
    pub id: String,
    /// 短名称，例如 `origin/main`
    pub name: String,
    pub revision: Option<String>,
}

/// 一条命名的提交谱系：本地分支及其上游和合并基准
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemGroup {
    pub id: String,
    pub name: String,
    pub revision: Option<String>,
    pub remote: Option<HistoryItemGroupRef>,
    pub base: Option<HistoryItemGroupRef>,
}

impl HistoryItemGroup {
    /// 过滤用的分组 id：本地、远程、基准（去重，保持顺序）
    pub fn group_ids(&self) -> Vec<String> {
        let mut ids = vec![self.id.clone()];
        for group_ref in [&self.remote, &self.base].into_iter().flatten() {
            if !ids.contains(&group_ref.id) {
                ids.push(group_ref.id.clone());
            }
        }
        ids
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryItemStatistics {
    pub files_changed: usize,
    pub insertions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Branch,
    RemoteBranch,
    Tag,
}

/// 提交上的引用装饰
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemLabel {
    pub title: String,
    pub kind: LabelKind,
}

/// 单个提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub parent_ids: Vec<String>,
    pub message: String,
    pub author: String,
    pub author_email: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub statistics: Option<HistoryItemStatistics>,
    pub labels: Vec<HistoryItemLabel>,
}

impl HistoryItem {
    /// 提交消息的第一行
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn short_id(&self) -> &str {
        let end = self
            .id
            .char_indices()
            .nth(8)
            .map(|(index, _)| index)
            .unwrap_or(self.id.len());
        &self.id[..end]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
    Unmerged,
    TypeChange,
}

impl ChangeType {
    /// 从 `git diff --name-status` 的状态字母解析
    pub fn from_status(status: &str) -> Result<Self, HistoryError> {
        match status.chars().next() {
            Some('A') => Ok(ChangeType::Added),
            Some('M') => Ok(ChangeType::Modified),
            Some('D') => Ok(ChangeType::Deleted),
            Some('R') => Ok(ChangeType::Renamed),
            Some('C') => Ok(ChangeType::Copied),
            Some('U') => Ok(ChangeType::Unmerged),
            Some('T') => Ok(ChangeType::TypeChange),
            _ => Err(HistoryError::parsing(
                format!("未知的变更状态: {}", status),
                "name-status",
            )),
        }
    }
}

/// 提交中的文件级变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemChange {
    pub path: PathBuf,
    pub original_path: Option<PathBuf>,
    pub status: ChangeType,
}

/// 提交图中的颜色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphColor {
    Local,
    Remote,
    Base,
    /// 通配颜色，仅在显示全部分组时使用
    Neutral,
    Lane(u8),
}

/// 提交图中的一条泳道，`id` 是该泳道指向的下一个提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swimlane {
    pub id: String,
    pub color: GraphColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryItemKind {
    Head,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColoredLabel {
    pub label: HistoryItemLabel,
    pub color: Option<GraphColor>,
}

/// 带渲染信息的提交
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryItemViewModel {
    pub history_item: HistoryItem,
    pub kind: HistoryItemKind,
    pub input_swimlanes: Vec<Swimlane>,
    pub output_swimlanes: Vec<Swimlane>,
    pub labels: Vec<ColoredLabel>,
}

impl HistoryItemViewModel {
    /// 该提交所在泳道的索引；不在任何输入泳道上时位于最右侧
    pub fn node_index(&self) -> usize {
        self.input_swimlanes
            .iter()
            .position(|lane| lane.id == self.history_item.id)
            .unwrap_or(self.input_swimlanes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_ref(id: &str, name: &str) -> HistoryItemGroupRef {
        HistoryItemGroupRef {
            id: id.to_string(),
            name: name.to_string(),
            revision: None,
        }
    }

    #[test]
    fn test_group_ids_deduplicate_remote_and_base() {
        let group = HistoryItemGroup {
            id: "refs/heads/main".to_string(),
            name: "main".to_string(),
            revision: None,
            remote: Some(group_ref("refs/remotes/origin/main", "origin/main")),
            base: Some(group_ref("refs/remotes/origin/main", "origin/main")),
        };
        assert_eq!(
            group.group_ids(),
            vec!["refs/heads/main".to_string(), "refs/remotes/origin/main".to_string()]
        );
    }

    #[test]
    fn test_change_type_from_status() {
        assert_eq!(ChangeType::from_status("R100").unwrap(), ChangeType::Renamed);
        assert_eq!(ChangeType::from_status("M").unwrap(), ChangeType::Modified);
        assert!(ChangeType::from_status("X").is_err());
    }

    #[test]
    fn test_subject_and_short_id() {
        let item = HistoryItem {
            id: "0123456789abcdef".to_string(),
            parent_ids: vec![],
            message: "feat: add graph\n\nlonger body".to_string(),
            author: "dev".to_string(),
            author_email: None,
            timestamp: Utc::now(),
            statistics: None,
            labels: vec![],
        };
        assert_eq!(item.subject(), "feat: add graph");
        assert_eq!(item.short_id(), "01234567");
    }
}
