#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use scm_history::infrastructure::{HistoryError, Result};
use scm_history::scm::{
    ChangeType, HistoryItem, HistoryItemChange, HistoryItemGroup, HistoryItemGroupRef,
    HistoryItemLabel, HistoryItemsOptions, HistoryProvider, LabelKind, Repository, RepositoryId,
};

/// 可编程的历史提供者，记录每次分页请求
pub struct MockProvider {
    group: Mutex<Option<HistoryItemGroup>>,
    items: Vec<HistoryItem>,
    calls: Mutex<Vec<HistoryItemsOptions>>,
    group_calls: AtomicUsize,
    changes_calls: AtomicUsize,
    fail: AtomicBool,
    gate: Option<Arc<Semaphore>>,
    ancestor: Option<String>,
}

impl MockProvider {
    pub fn new(items: Vec<HistoryItem>) -> Self {
        Self {
            group: Mutex::new(Some(group("main", items.first().map(|item| item.id.as_str()), None, None))),
            items,
            calls: Mutex::new(Vec::new()),
            group_calls: AtomicUsize::new(0),
            changes_calls: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            gate: None,
            ancestor: None,
        }
    }

    /// 每次分页请求都要先从信号量取得一个许可
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_group(self, group: Option<HistoryItemGroup>) -> Self {
        *self.group.lock().unwrap() = group;
        self
    }

    pub fn with_ancestor(mut self, ancestor: &str) -> Self {
        self.ancestor = Some(ancestor.to_string());
        self
    }

    /// 模拟切换分支或分离 HEAD
    pub fn set_group(&self, group: Option<HistoryItemGroup>) {
        *self.group.lock().unwrap() = group;
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// 每次请求的 (limit, skip)
    pub fn calls(&self) -> Vec<(usize, usize)> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|options| (options.limit, options.skip))
            .collect()
    }

    pub fn requested_group_ids(&self) -> Vec<Vec<String>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|options| options.group_ids.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn group_calls(&self) -> usize {
        self.group_calls.load(Ordering::SeqCst)
    }

    pub fn changes_calls(&self) -> usize {
        self.changes_calls.load(Ordering::SeqCst)
    }

    /// 等待直到已发出指定数量的分页请求
    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.call_count() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("provider was not called in time");
    }
}

#[async_trait]
impl HistoryProvider for MockProvider {
    async fn current_history_item_group(&self) -> Result<Option<HistoryItemGroup>> {
        self.group_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.group.lock().unwrap().clone())
    }

    async fn provide_history_items(&self, options: &HistoryItemsOptions) -> Result<Vec<HistoryItem>> {
        self.calls.lock().unwrap().push(options.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(HistoryError::provider("mock", "log failed"));
        }

        Ok(self
            .items
            .iter()
            .skip(options.skip)
            .take(options.limit)
            .cloned()
            .collect())
    }

    async fn provide_history_item_changes(
        &self,
        history_item_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<HistoryItemChange>> {
        self.changes_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![HistoryItemChange {
            path: PathBuf::from(format!("{}.txt", history_item_id)),
            original_path: parent_id.map(|parent| PathBuf::from(format!("{}.txt", parent))),
            status: ChangeType::Modified,
        }])
    }

    async fn resolve_history_item_group_common_ancestor(&self, _group_ids: &[String]) -> Option<String> {
        self.ancestor.clone()
    }
}

pub fn commit(id: &str, parents: &[&str]) -> HistoryItem {
    HistoryItem {
        id: id.to_string(),
        parent_ids: parents.iter().map(|parent| parent.to_string()).collect(),
        message: format!("commit {}", id),
        author: "dev".to_string(),
        author_email: Some("dev@example.com".to_string()),
        timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        statistics: None,
        labels: vec![],
    }
}

pub fn with_labels(mut item: HistoryItem, labels: &[(&str, LabelKind)]) -> HistoryItem {
    item.labels = labels
        .iter()
        .map(|(title, kind)| HistoryItemLabel {
            title: title.to_string(),
            kind: *kind,
        })
        .collect();
    item
}

/// c1 -> c2 -> ... -> cN，c1 最新，cN 是根提交
pub fn linear_history(count: usize) -> Vec<HistoryItem> {
    (1..=count)
        .map(|index| {
            let id = format!("c{}", index);
            if index == count {
                commit(&id, &[])
            } else {
                commit(&id, &[&format!("c{}", index + 1)])
            }
        })
        .collect()
}

pub fn group(
    name: &str,
    revision: Option<&str>,
    remote: Option<&str>,
    base: Option<&str>,
) -> HistoryItemGroup {
    let remote_ref = |name: &str| HistoryItemGroupRef {
        id: format!("refs/remotes/{}", name),
        name: name.to_string(),
        revision: None,
    };
    HistoryItemGroup {
        id: format!("refs/heads/{}", name),
        name: name.to_string(),
        revision: revision.map(str::to_string),
        remote: remote.map(remote_ref),
        base: base.map(remote_ref),
    }
}

pub fn repository(id: &str, provider: Arc<MockProvider>) -> Arc<Repository> {
    Arc::new(Repository::new(
        RepositoryId::new(id),
        PathBuf::from(format!("/repos/{}", id)),
        provider,
    ))
}
