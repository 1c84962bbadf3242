use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;

use crate::infrastructure::error::{HistoryError, Result};
use crate::scm::models::{
    ChangeType, HistoryItem, HistoryItemChange, HistoryItemLabel, HistoryItemStatistics, LabelKind,
};

const RECORD_SEPARATOR: char = '\x1e';
const FIELD_SEPARATOR: char = '\x1f';
const FIELD_COUNT: usize = 8;

/// `git log --format` 格式：记录以 0x1e 开头，字段以 0x1f 分隔
///
/// 正文后面再跟一个 0x1f，`--shortstat` 的统计行只会出现在它之后。
pub const LOG_FORMAT: &str = "%x1e%H%x1f%P%x1f%aN%x1f%aE%x1f%at%x1f%D%x1f%B%x1f";

static SHORTSTAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?\s*$",
    )
    .expect("shortstat pattern is valid")
});

/// 解析 `git log --format=LOG_FORMAT [--shortstat]` 的输出
pub fn parse_log(output: &str) -> Result<Vec<HistoryItem>> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<HistoryItem> {
    let fields: Vec<&str> = record.splitn(FIELD_COUNT, FIELD_SEPARATOR).collect();
    if fields.len() < FIELD_COUNT {
        return Err(HistoryError::parsing(
            format!("提交记录字段不足: 期望 {}，实际 {}", FIELD_COUNT, fields.len()),
            "git-log",
        ));
    }

    let id = fields[0].trim().to_string();
    let parent_ids = fields[1].split_whitespace().map(str::to_string).collect();
    let author = fields[2].trim().to_string();
    let author_email = Some(fields[3].trim())
        .filter(|email| !email.is_empty())
        .map(str::to_string);

    let seconds: i64 = fields[4].trim().parse().map_err(|_| {
        HistoryError::parsing(format!("无效的提交时间: {}", fields[4]), "git-log")
    })?;
    let timestamp = Utc
        .timestamp_opt(seconds, 0)
        .single()
        .ok_or_else(|| HistoryError::parsing(format!("提交时间超出范围: {}", seconds), "git-log"))?;

    let labels = parse_decorations(fields[5]);
    let message = fields[6].trim().to_string();
    let statistics = fields[7].lines().find_map(parse_shortstat);

    Ok(HistoryItem {
        id,
        parent_ids,
        message,
        author,
        author_email,
        timestamp,
        statistics,
        labels,
    })
}

pub fn parse_shortstat(line: &str) -> Option<HistoryItemStatistics> {
    let captures = SHORTSTAT_REGEX.captures(line)?;
    let number = |index: usize| {
        captures
            .get(index)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };

    Some(HistoryItemStatistics {
        files_changed: number(1),
        insertions: number(2),
        deletions: number(3),
    })
}

/// 解析 `--decorate=full` 下的 `%D` 装饰
///
/// 例如 `HEAD -> refs/heads/main, refs/remotes/origin/main, tag: refs/tags/v1.0`。
/// 远程的 `HEAD` 符号引用和游离的 `HEAD` 不生成标签。
pub fn parse_decorations(decorations: &str) -> Vec<HistoryItemLabel> {
    decorations
        .split(", ")
        .map(str::trim)
        .filter(|decoration| !decoration.is_empty())
        .filter_map(|decoration| {
            let decoration = decoration.strip_prefix("HEAD -> ").unwrap_or(decoration);

            if let Some(tag) = decoration.strip_prefix("tag: ") {
                let title = tag.strip_prefix("refs/tags/").unwrap_or(tag);
                return Some(HistoryItemLabel {
                    title: title.to_string(),
                    kind: LabelKind::Tag,
                });
            }
            if let Some(branch) = decoration.strip_prefix("refs/heads/") {
                return Some(HistoryItemLabel {
                    title: branch.to_string(),
                    kind: LabelKind::Branch,
                });
            }
            if let Some(remote) = decoration.strip_prefix("refs/remotes/") {
                if remote.ends_with("/HEAD") {
                    return None;
                }
                return Some(HistoryItemLabel {
                    title: remote.to_string(),
                    kind: LabelKind::RemoteBranch,
                });
            }
            None
        })
        .collect()
}

/// 解析 `git diff --name-status -z` 的输出
pub fn parse_name_status(output: &str) -> Result<Vec<HistoryItemChange>> {
    let mut fields = output.split('\0').filter(|field| !field.is_empty());
    let mut changes = Vec::new();

    while let Some(status) = fields.next() {
        let status_type = ChangeType::from_status(status.trim())?;
        let first_path = fields.next().ok_or_else(|| {
            HistoryError::parsing(format!("状态 {} 缺少路径", status), "name-status")
        })?;

        let change = match status_type {
            ChangeType::Renamed | ChangeType::Copied => {
                let new_path = fields.next().ok_or_else(|| {
                    HistoryError::parsing(format!("状态 {} 缺少目标路径", status), "name-status")
                })?;
                HistoryItemChange {
                    path: PathBuf::from(new_path),
                    original_path: Some(PathBuf::from(first_path)),
                    status: status_type,
                }
            }
            _ => HistoryItemChange {
                path: PathBuf::from(first_path),
                original_path: None,
                status: status_type,
            },
        };
        changes.push(change);
    }

    Ok(changes)
}

/// `refs/heads/main` -> `main`，`refs/remotes/origin/main` -> `origin/main`
pub fn short_ref_name(full_name: &str) -> &str {
    full_name
        .strip_prefix("refs/heads/")
        .or_else(|| full_name.strip_prefix("refs/remotes/"))
        .or_else(|| full_name.strip_prefix("refs/tags/"))
        .unwrap_or(full_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parents: &str, refs: &str, body: &str) -> String {
        format!(
            "\x1e{}\x1f{}\x1fJane Doe\x1fjane@example.com\x1f1700000000\x1f{}\x1f{}\x1f",
            id, parents, refs, body
        )
    }

    #[test]
    fn test_parse_log_with_shortstat() {
        let output = format!(
            "{}\n\n 2 files changed, 10 insertions(+), 3 deletions(-)\n{}\n",
            record("c1", "c2", "HEAD -> refs/heads/main", "feat: graph\n\nbody line\n"),
            record("c2", "", "", "init\n"),
        );

        let items = parse_log(&output).unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].id, "c1");
        assert_eq!(items[0].parent_ids, vec!["c2".to_string()]);
        assert_eq!(items[0].message, "feat: graph\n\nbody line");
        assert_eq!(items[0].author_email.as_deref(), Some("jane@example.com"));
        assert_eq!(items[0].timestamp.timestamp(), 1_700_000_000);
        assert_eq!(
            items[0].statistics,
            Some(HistoryItemStatistics {
                files_changed: 2,
                insertions: 10,
                deletions: 3,
            })
        );
        assert_eq!(items[0].labels[0].title, "main");

        assert!(items[1].parent_ids.is_empty());
        assert_eq!(items[1].message, "init");
        assert!(items[1].statistics.is_none());
    }

    #[test]
    fn test_message_ending_like_shortstat_is_kept() {
        let items = parse_log(&format!(
            "{}\n{}\n\n 1 file changed, 2 insertions(+)\n",
            record("c1", "c2", "", "chore: cleanup\n\n 3 files changed\n"),
            record("c2", "", "", " 4 files changed\n"),
        ))
        .unwrap();

        assert_eq!(items[0].message, "chore: cleanup\n\n 3 files changed");
        assert!(items[0].statistics.is_none());

        // 只有统计行之后的部分才算统计
        assert_eq!(items[1].message, "4 files changed");
        assert_eq!(
            items[1].statistics,
            Some(HistoryItemStatistics {
                files_changed: 1,
                insertions: 2,
                deletions: 0,
            })
        );
    }

    #[test]
    fn test_parse_merge_parents() {
        let items = parse_log(&record("m", "a b", "", "Merge branch 'feature'\n")).unwrap();
        assert_eq!(items[0].parent_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_truncated_record_is_error() {
        assert!(parse_log("\x1ec1\x1fc2").is_err());
    }

    #[test]
    fn test_parse_shortstat_variants() {
        assert_eq!(
            parse_shortstat(" 1 file changed, 1 insertion(+)"),
            Some(HistoryItemStatistics {
                files_changed: 1,
                insertions: 1,
                deletions: 0,
            })
        );
        assert_eq!(
            parse_shortstat(" 3 files changed, 4 deletions(-)"),
            Some(HistoryItemStatistics {
                files_changed: 3,
                insertions: 0,
                deletions: 4,
            })
        );
        assert!(parse_shortstat("fix: 3 files changed").is_none());
    }

    #[test]
    fn test_parse_decorations() {
        let labels = parse_decorations(
            "HEAD -> refs/heads/main, refs/remotes/origin/main, refs/remotes/origin/HEAD, tag: refs/tags/v1.0",
        );
        assert_eq!(
            labels,
            vec![
                HistoryItemLabel { title: "main".to_string(), kind: LabelKind::Branch },
                HistoryItemLabel { title: "origin/main".to_string(), kind: LabelKind::RemoteBranch },
                HistoryItemLabel { title: "v1.0".to_string(), kind: LabelKind::Tag },
            ]
        );
        assert!(parse_decorations("HEAD").is_empty());
        assert!(parse_decorations("").is_empty());
    }

    #[test]
    fn test_parse_name_status() {
        let output = "M\0src/lib.rs\0R087\0old.rs\0new.rs\0A\0docs/a b.md\0";
        let changes = parse_name_status(output).unwrap();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].status, ChangeType::Modified);
        assert_eq!(changes[1].status, ChangeType::Renamed);
        assert_eq!(changes[1].path, PathBuf::from("new.rs"));
        assert_eq!(changes[1].original_path, Some(PathBuf::from("old.rs")));
        assert_eq!(changes[2].path, PathBuf::from("docs/a b.md"));
    }

    #[test]
    fn test_parse_name_status_missing_path() {
        assert!(parse_name_status("M\0").is_err());
    }

    #[test]
    fn test_short_ref_name() {
        assert_eq!(short_ref_name("refs/heads/feature/x"), "feature/x");
        assert_eq!(short_ref_name("refs/remotes/origin/main"), "origin/main");
        assert_eq!(short_ref_name("HEAD"), "HEAD");
    }
}
