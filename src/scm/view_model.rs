use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::colors::ColorMap;
use super::graph::HistoryGraph;
use super::models::{HistoryItemGroup, HistoryItemViewModel, RepositoryId};
use super::provider::{HistoryItemsOptions, HistoryProvider};
use crate::infrastructure::error::{HistoryError, Result};

pub const MIN_PAGE_SIZE: usize = 1;
pub const MAX_PAGE_SIZE: usize = 1000;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// 历史过滤方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFilter {
    /// 所有引用
    All,
    /// 仅当前分组（本地、远程、基准）
    #[default]
    Auto,
}

impl std::str::FromStr for HistoryFilter {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "all" => Ok(HistoryFilter::All),
            "auto" => Ok(HistoryFilter::Auto),
            other => Err(HistoryError::config(format!("不支持的历史过滤方式: {}", other))),
        }
    }
}

/// 仓库选择：跟随活动仓库，或显式指定
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySelection {
    Auto,
    Repository(RepositoryId),
}

/// 被跟踪的仓库
pub struct Repository {
    pub id: RepositoryId,
    pub root: PathBuf,
    provider: Option<Arc<dyn HistoryProvider>>,
}

impl Repository {
    pub fn new(id: RepositoryId, root: PathBuf, provider: Arc<dyn HistoryProvider>) -> Self {
        Self {
            id,
            root,
            provider: Some(provider),
        }
    }

    /// 没有历史提供者的仓库，例如不支持历史的版本控制
    pub fn without_provider(id: RepositoryId, root: PathBuf) -> Self {
        Self {
            id,
            root,
            provider: None,
        }
    }

    pub fn provider(&self) -> Option<&Arc<dyn HistoryProvider>> {
        self.provider.as_ref()
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("has_provider", &self.provider.is_some())
            .finish()
    }
}

/// 视图模型变更通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    RepositoryAdded(RepositoryId),
    RepositoryRemoved(RepositoryId),
    RepositorySelectionChanged(Option<RepositoryId>),
    FilterChanged(HistoryFilter),
    RepositoryStateCleared(RepositoryId),
    HistoryItemsLoaded {
        repository: RepositoryId,
        appended: usize,
        total: usize,
    },
}

struct RepositoryState {
    current_group: HistoryItemGroup,
    graph: HistoryGraph,
    load_more: bool,
    load_more_in_progress: bool,
}

#[derive(Default)]
struct SelectionState {
    override_repository: Option<RepositoryId>,
    active_repository: Option<RepositoryId>,
}

#[derive(Default)]
struct Store {
    repositories: HashMap<RepositoryId, Arc<Repository>>,
    selection: SelectionState,
    filter: HistoryFilter,
    states: HashMap<RepositoryId, RepositoryState>,
    generations: HashMap<RepositoryId, u64>,
}

impl Store {
    /// 显式选择优先，其次是活动仓库；只解析仍被跟踪的仓库
    fn resolve_selection(&self) -> Option<RepositoryId> {
        [
            &self.selection.override_repository,
            &self.selection.active_repository,
        ]
        .into_iter()
        .flatten()
        .find(|id| self.repositories.contains_key(*id))
        .cloned()
    }

    fn generation(&self, id: &RepositoryId) -> u64 {
        self.generations.get(id).copied().unwrap_or(0)
    }

    fn invalidate(&mut self, id: &RepositoryId) -> bool {
        *self.generations.entry(id.clone()).or_insert(0) += 1;
        self.states.remove(id).is_some()
    }
}

/// 历史视图模型
///
/// 按仓库缓存逐页获取的提交，并为提交图分配颜色。
/// 存储锁从不跨越提供者调用；同一仓库的获取通过独立的锁串行化。
pub struct HistoryViewModel {
    store: RwLock<Store>,
    fetch_locks: Mutex<HashMap<RepositoryId, Arc<Mutex<()>>>>,
    page_size: usize,
    events: broadcast::Sender<HistoryEvent>,
}

impl HistoryViewModel {
    pub fn new(page_size: usize, filter: HistoryFilter) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: RwLock::new(Store {
                filter,
                ..Store::default()
            }),
            fetch_locks: Mutex::new(HashMap::new()),
            page_size: page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE),
            events,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: HistoryEvent) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(event);
    }

    /// 返回仓库已缓存的全部提交；需要时获取下一页并追加
    pub async fn get_history_items(&self, repository: &Repository) -> Result<Vec<HistoryItemViewModel>> {
        let Some(provider) = repository.provider() else {
            return Ok(Vec::new());
        };

        if let Some(view_models) = self.cached_view_models(&repository.id).await {
            return Ok(view_models);
        }

        let fetch_lock = self.fetch_lock(&repository.id).await;
        let _fetching = fetch_lock.lock().await;

        // 等待锁期间可能已有其他调用完成了获取
        if let Some(view_models) = self.cached_view_models(&repository.id).await {
            return Ok(view_models);
        }

        let (snapshot, generation, filter) = {
            let store = self.store.read().await;
            (
                store
                    .states
                    .get(&repository.id)
                    .map(|state| (state.current_group.clone(), state.graph.clone())),
                store.generation(&repository.id),
                store.filter,
            )
        };

        let Some(current_group) = provider.current_history_item_group().await? else {
            tracing::debug!(repository = %repository.id, "没有当前分组，返回空历史");
            let mut store = self.store.write().await;
            if store.generation(&repository.id) == generation {
                store.invalidate(&repository.id);
            }
            return Ok(Vec::new());
        };

        // 分组变化（切换分支、HEAD 移动、上游变化）后旧的偏移量不再有效，从头加载
        let mut graph = match snapshot {
            Some((group, graph)) if group == current_group => graph,
            Some(_) => {
                tracing::debug!(repository = %repository.id, "当前分组已变化，从第一页重新加载");
                HistoryGraph::new()
            }
            None => HistoryGraph::new(),
        };

        let options = HistoryItemsOptions {
            group_ids: match filter {
                HistoryFilter::All => Vec::new(),
                HistoryFilter::Auto => current_group.group_ids(),
            },
            limit: self.page_size,
            skip: graph.len(),
        };

        tracing::debug!(
            repository = %repository.id,
            limit = options.limit,
            skip = options.skip,
            groups = ?options.group_ids,
            "获取历史记录"
        );

        let page = provider.provide_history_items(&options).await?;
        let appended = page.len();

        let color_map = ColorMap::for_group(&current_group, filter == HistoryFilter::All);
        graph.extend(&page, &color_map, current_group.revision.as_deref());
        let view_models = graph.view_models().to_vec();
        let total = graph.len();

        {
            let mut store = self.store.write().await;
            if store.generation(&repository.id) != generation || store.filter != filter {
                tracing::debug!(repository = %repository.id, "状态已失效，丢弃过期的历史记录响应");
                return Ok(view_models);
            }

            let load_more_in_progress = store
                .states
                .get(&repository.id)
                .map(|state| state.load_more_in_progress)
                .unwrap_or(false);
            store.states.insert(
                repository.id.clone(),
                RepositoryState {
                    current_group,
                    graph,
                    load_more: false,
                    load_more_in_progress,
                },
            );
        }

        self.publish(HistoryEvent::HistoryItemsLoaded {
            repository: repository.id.clone(),
            appended,
            total,
        });

        Ok(view_models)
    }

    async fn cached_view_models(&self, id: &RepositoryId) -> Option<Vec<HistoryItemViewModel>> {
        let store = self.store.read().await;
        let state = store.states.get(id).filter(|state| !state.load_more)?;
        Some(state.graph.view_models().to_vec())
    }

    async fn fetch_lock(&self, id: &RepositoryId) -> Arc<Mutex<()>> {
        self.fetch_locks
            .lock()
            .await
            .entry(id.clone())
            .or_default()
            .clone()
    }

    /// 标记仓库需要加载下一页；尚无缓存状态时不做任何事
    pub async fn set_load_more(&self, id: &RepositoryId, load_more: bool) {
        let mut store = self.store.write().await;
        if let Some(state) = store.states.get_mut(id) {
            state.load_more = load_more;
        }
    }

    /// 加载下一页；没有状态或已有加载在进行时直接返回 `false`
    pub async fn load_more(&self, repository: &Repository) -> Result<bool> {
        {
            let mut store = self.store.write().await;
            let Some(state) = store.states.get_mut(&repository.id) else {
                return Ok(false);
            };
            if state.load_more_in_progress {
                tracing::debug!(repository = %repository.id, "已有加载更多的请求在进行中");
                return Ok(false);
            }
            state.load_more_in_progress = true;
            state.load_more = true;
        }

        let result = self.get_history_items(repository).await;

        {
            let mut store = self.store.write().await;
            if let Some(state) = store.states.get_mut(&repository.id) {
                state.load_more_in_progress = false;
            }
        }

        result.map(|_| true)
    }

    pub async fn is_load_more_in_progress(&self, id: &RepositoryId) -> bool {
        let store = self.store.read().await;
        store
            .states
            .get(id)
            .map(|state| state.load_more_in_progress)
            .unwrap_or(false)
    }

    /// 已缓存的提交数量
    pub async fn history_item_count(&self, id: &RepositoryId) -> usize {
        let store = self.store.read().await;
        store.states.get(id).map(|state| state.graph.len()).unwrap_or(0)
    }

    /// 丢弃仓库的缓存，下次获取将从头开始
    pub async fn clear_repository_state(&self, id: &RepositoryId) {
        let cleared = self.store.write().await.invalidate(id);
        if cleared {
            tracing::debug!(repository = %id, "已清除仓库历史状态");
        }
        self.publish(HistoryEvent::RepositoryStateCleared(id.clone()));
    }

    pub async fn add_repository(&self, repository: Arc<Repository>) {
        let id = repository.id.clone();
        let selection_changed = {
            let mut store = self.store.write().await;
            let before = store.resolve_selection();
            store.repositories.insert(id.clone(), repository);
            let after = store.resolve_selection();
            (before != after).then_some(after)
        };

        self.publish(HistoryEvent::RepositoryAdded(id));
        if let Some(selected) = selection_changed {
            self.publish(HistoryEvent::RepositorySelectionChanged(selected));
        }
    }

    /// 仓库关闭：丢弃状态并重置指向它的选择
    pub async fn remove_repository(&self, id: &RepositoryId) {
        let selection_changed = {
            let mut store = self.store.write().await;
            let before = store.resolve_selection();
            store.repositories.remove(id);
            store.invalidate(id);
            if store.selection.override_repository.as_ref() == Some(id) {
                store.selection.override_repository = None;
            }
            if store.selection.active_repository.as_ref() == Some(id) {
                store.selection.active_repository = None;
            }
            let after = store.resolve_selection();
            (before != after).then_some(after)
        };

        self.fetch_locks.lock().await.remove(id);
        tracing::debug!(repository = %id, "仓库已关闭");

        self.publish(HistoryEvent::RepositoryRemoved(id.clone()));
        if let Some(selected) = selection_changed {
            self.publish(HistoryEvent::RepositorySelectionChanged(selected));
        }
    }

    pub async fn repositories(&self) -> Vec<Arc<Repository>> {
        let store = self.store.read().await;
        let mut repositories: Vec<_> = store.repositories.values().cloned().collect();
        repositories.sort_by(|a, b| a.id.cmp(&b.id));
        repositories
    }

    /// 设置仓库选择；`Auto` 表示跟随活动仓库
    pub async fn set_repository(&self, selection: RepositorySelection) {
        self.update_selection(|selection_state| {
            selection_state.override_repository = match selection {
                RepositorySelection::Auto => None,
                RepositorySelection::Repository(id) => Some(id),
            };
        })
        .await;
    }

    /// 外部跟踪的活动仓库发生变化
    pub async fn set_active_repository(&self, id: Option<RepositoryId>) {
        self.update_selection(|selection_state| selection_state.active_repository = id)
            .await;
    }

    async fn update_selection(&self, update: impl FnOnce(&mut SelectionState)) {
        let selection_changed = {
            let mut store = self.store.write().await;
            let before = store.resolve_selection();
            update(&mut store.selection);
            let after = store.resolve_selection();
            (before != after).then_some(after)
        };

        if let Some(selected) = selection_changed {
            tracing::debug!(repository = ?selected, "仓库选择已变化");
            self.publish(HistoryEvent::RepositorySelectionChanged(selected));
        }
    }

    pub async fn selected_repository(&self) -> Option<Arc<Repository>> {
        let store = self.store.read().await;
        store
            .resolve_selection()
            .and_then(|id| store.repositories.get(&id).cloned())
    }

    pub async fn filter(&self) -> HistoryFilter {
        self.store.read().await.filter
    }

    /// 切换过滤方式会丢弃所有仓库的缓存
    pub async fn set_filter(&self, filter: HistoryFilter) {
        {
            let mut store = self.store.write().await;
            if store.filter == filter {
                return;
            }
            store.filter = filter;
            let ids: Vec<RepositoryId> = store.states.keys().cloned().collect();
            for id in &ids {
                store.invalidate(id);
            }
        }

        self.publish(HistoryEvent::FilterChanged(filter));
    }

    /// 当前分组与其远程、基准的共同祖先
    pub async fn resolve_common_ancestor(&self, repository: &Repository) -> Result<Option<String>> {
        let Some(provider) = repository.provider() else {
            return Ok(None);
        };

        let snapshot = {
            let store = self.store.read().await;
            store
                .states
                .get(&repository.id)
                .map(|state| state.current_group.clone())
        };
        let group = match snapshot {
            Some(group) => group,
            None => match provider.current_history_item_group().await? {
                Some(group) => group,
                None => return Ok(None),
            },
        };

        let group_ids = group.group_ids();
        if group_ids.len() < 2 {
            return Ok(None);
        }
        Ok(provider
            .resolve_history_item_group_common_ancestor(&group_ids)
            .await)
    }
}
