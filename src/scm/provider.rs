use async_trait::async_trait;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{HistoryItem, HistoryItemChange, HistoryItemGroup};
use crate::infrastructure::error::Result;

/// 分页请求参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItemsOptions {
    /// 为空表示全部分组
    pub group_ids: Vec<String>,
    pub limit: usize,
    pub skip: usize,
}

/// 历史记录提供者
///
/// 视图模型只消费这些调用；`limit` / `skip` 由提供者负责解释，
/// 调用方信任返回的正是下一页。
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// 当前分组；分离 HEAD 等没有分支的状态返回 `None`
    async fn current_history_item_group(&self) -> Result<Option<HistoryItemGroup>>;

    /// 按时间倒序返回一页提交
    async fn provide_history_items(&self, options: &HistoryItemsOptions) -> Result<Vec<HistoryItem>>;

    async fn provide_history_item_changes(
        &self,
        history_item_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<HistoryItemChange>>;

    /// 失败时记录日志并返回 `None`，不相交的历史同样返回 `None`
    async fn resolve_history_item_group_common_ancestor(&self, group_ids: &[String]) -> Option<String>;
}

/// 为提交变更列表加一层 LRU 缓存的提供者
///
/// 提交一旦创建就不可变，因此 `(提交, 父提交)` 的变更列表可以安全缓存；
/// 分页和当前分组直接透传。
pub struct CachedHistoryProvider {
    inner: Arc<dyn HistoryProvider>,
    changes: Mutex<LruCache<String, Vec<HistoryItemChange>>>,
}

impl CachedHistoryProvider {
    pub fn new(inner: Arc<dyn HistoryProvider>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            changes: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn generate_cache_key(history_item_id: &str, parent_id: Option<&str>) -> String {
        format!("{}:{}", history_item_id, parent_id.unwrap_or("root"))
    }

    pub async fn cached_changes_len(&self) -> usize {
        self.changes.lock().await.len()
    }
}

#[async_trait]
impl HistoryProvider for CachedHistoryProvider {
    async fn current_history_item_group(&self) -> Result<Option<HistoryItemGroup>> {
        self.inner.current_history_item_group().await
    }

    async fn provide_history_items(&self, options: &HistoryItemsOptions) -> Result<Vec<HistoryItem>> {
        self.inner.provide_history_items(options).await
    }

    async fn provide_history_item_changes(
        &self,
        history_item_id: &str,
        parent_id: Option<&str>,
    ) -> Result<Vec<HistoryItemChange>> {
        let cache_key = Self::generate_cache_key(history_item_id, parent_id);

        {
            let mut cache = self.changes.lock().await;
            if let Some(cached) = cache.get(&cache_key) {
                tracing::trace!(key = %cache_key, "变更列表命中缓存");
                return Ok(cached.clone());
            }
        }

        let changes = self
            .inner
            .provide_history_item_changes(history_item_id, parent_id)
            .await?;

        self.changes.lock().await.put(cache_key, changes.clone());
        Ok(changes)
    }

    async fn resolve_history_item_group_common_ancestor(&self, group_ids: &[String]) -> Option<String> {
        self.inner
            .resolve_history_item_group_common_ancestor(group_ids)
            .await
    }
}
