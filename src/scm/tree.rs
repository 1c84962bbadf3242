// History tree presentation: children accessor, open / context menu callbacks,
// and a controller that serializes structural updates

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use super::models::{HistoryItemChange, HistoryItemViewModel, RepositoryId};
use super::throttle::{Sequencer, Throttler};
use super::view_model::{HistoryEvent, HistoryViewModel};
use crate::infrastructure::error::{HistoryError, Result};

/// 树中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeElement {
    HistoryItem {
        repository: RepositoryId,
        view_model: HistoryItemViewModel,
    },
    /// 末尾的“加载更多”行
    LoadMore { repository: RepositoryId },
}

impl TreeElement {
    pub fn repository(&self) -> &RepositoryId {
        match self {
            TreeElement::HistoryItem { repository, .. } => repository,
            TreeElement::LoadMore { repository } => repository,
        }
    }
}

/// 右键菜单动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryItemAction {
    CopyId,
    CopyMessage,
    ViewChanges,
    LoadMore,
}

/// 树的数据源
pub struct HistoryTreeDataSource {
    view_model: Arc<HistoryViewModel>,
}

impl HistoryTreeDataSource {
    pub fn new(view_model: Arc<HistoryViewModel>) -> Self {
        Self { view_model }
    }

    pub fn view_model(&self) -> &Arc<HistoryViewModel> {
        &self.view_model
    }

    /// 所选仓库的提交行；最后一个提交仍有未结束的泳道时追加“加载更多”
    pub async fn children(&self) -> Result<Vec<TreeElement>> {
        let Some(repository) = self.view_model.selected_repository().await else {
            return Ok(Vec::new());
        };

        let view_models = self.view_model.get_history_items(&repository).await?;
        let has_more = view_models
            .last()
            .map(|last| !last.output_swimlanes.is_empty())
            .unwrap_or(false);

        let mut children: Vec<TreeElement> = view_models
            .into_iter()
            .map(|view_model| TreeElement::HistoryItem {
                repository: repository.id.clone(),
                view_model,
            })
            .collect();

        if has_more {
            children.push(TreeElement::LoadMore {
                repository: repository.id.clone(),
            });
        }

        Ok(children)
    }

    /// 打开提交：与第一个父提交比较的文件变更
    pub async fn open_item(&self, element: &TreeElement) -> Result<Vec<HistoryItemChange>> {
        let TreeElement::HistoryItem {
            repository,
            view_model,
        } = element
        else {
            return Ok(Vec::new());
        };

        let repositories = self.view_model.repositories().await;
        let repository = repositories
            .iter()
            .find(|candidate| &candidate.id == repository)
            .ok_or_else(|| HistoryError::RepositoryNotFound {
                repository: repository.to_string(),
            })?;

        let Some(provider) = repository.provider() else {
            return Ok(Vec::new());
        };

        let item = &view_model.history_item;
        provider
            .provide_history_item_changes(&item.id, item.parent_ids.first().map(String::as_str))
            .await
    }

    pub fn context_actions(element: &TreeElement) -> Vec<HistoryItemAction> {
        match element {
            TreeElement::HistoryItem { .. } => vec![
                HistoryItemAction::ViewChanges,
                HistoryItemAction::CopyId,
                HistoryItemAction::CopyMessage,
            ],
            TreeElement::LoadMore { .. } => vec![HistoryItemAction::LoadMore],
        }
    }

    /// 复制类动作对应的文本
    pub fn clipboard_text(element: &TreeElement, action: HistoryItemAction) -> Option<String> {
        let TreeElement::HistoryItem { view_model, .. } = element else {
            return None;
        };
        match action {
            HistoryItemAction::CopyId => Some(view_model.history_item.id.clone()),
            HistoryItemAction::CopyMessage => Some(view_model.history_item.message.clone()),
            _ => None,
        }
    }
}

/// 历史树控制器
///
/// 刷新、初次加载和加载更多都经过同一个串行队列；
/// 刷新期间到达的多次刷新请求被合并为一次后续刷新。
pub struct HistoryTreeController {
    data_source: HistoryTreeDataSource,
    rows: RwLock<Vec<TreeElement>>,
    last_error: RwLock<Option<HistoryError>>,
    sequencer: Sequencer,
    throttler: Throttler,
    clear_requested: AtomicBool,
    load_more_pending: AtomicBool,
}

impl HistoryTreeController {
    pub fn new(view_model: Arc<HistoryViewModel>) -> Self {
        Self {
            data_source: HistoryTreeDataSource::new(view_model),
            rows: RwLock::new(Vec::new()),
            last_error: RwLock::new(None),
            sequencer: Sequencer::new(),
            throttler: Throttler::new(),
            clear_requested: AtomicBool::new(false),
            load_more_pending: AtomicBool::new(false),
        }
    }

    pub fn data_source(&self) -> &HistoryTreeDataSource {
        &self.data_source
    }

    pub async fn rows(&self) -> Vec<TreeElement> {
        self.rows.read().await.clone()
    }

    pub async fn last_error(&self) -> Option<HistoryError> {
        self.last_error.read().await.clone()
    }

    /// 刷新树；`clear` 为真时先丢弃所选仓库的缓存（例如切换分支后）
    ///
    /// 返回本次调用实际执行的更新次数，被合并时为 0。
    pub async fn refresh(&self, clear: bool) -> usize {
        if clear {
            self.clear_requested.store(true, Ordering::SeqCst);
        }
        self.throttler.trigger(move || self.update_children()).await
    }

    async fn update_children(&self) {
        self.sequencer
            .queue(async {
                if self.clear_requested.swap(false, Ordering::SeqCst) {
                    if let Some(repository) = self.data_source.view_model.selected_repository().await {
                        self.data_source
                            .view_model
                            .clear_repository_state(&repository.id)
                            .await;
                    }
                }
                self.apply_children().await;
            })
            .await
    }

    async fn apply_children(&self) {
        match self.data_source.children().await {
            Ok(children) => {
                tracing::debug!(rows = children.len(), "历史树已更新");
                *self.rows.write().await = children;
                *self.last_error.write().await = None;
            }
            Err(error) => {
                tracing::error!(error = %error, "加载历史记录失败");
                self.rows.write().await.clear();
                *self.last_error.write().await = Some(error);
            }
        }
    }

    /// 加载所选仓库的下一页；已有加载在进行时返回 `false`
    pub async fn load_more(&self) -> Result<bool> {
        let Some(repository) = self.data_source.view_model.selected_repository().await else {
            return Ok(false);
        };

        if self.load_more_pending.swap(true, Ordering::SeqCst) {
            tracing::debug!(repository = %repository.id, "忽略重复的加载更多请求");
            return Ok(false);
        }

        let view_model = self.data_source.view_model.clone();
        let result = self
            .sequencer
            .queue(async {
                let loaded = view_model.load_more(&repository).await?;
                if loaded {
                    self.apply_children().await;
                }
                Ok::<bool, HistoryError>(loaded)
            })
            .await;

        self.load_more_pending.store(false, Ordering::SeqCst);
        result
    }

    /// 响应视图模型通知
    pub async fn handle_event(&self, event: &HistoryEvent) -> usize {
        match event {
            HistoryEvent::RepositorySelectionChanged(_) | HistoryEvent::FilterChanged(_) => {
                self.refresh(false).await
            }
            HistoryEvent::RepositoryRemoved(id) => {
                let showing_removed = self
                    .rows
                    .read()
                    .await
                    .first()
                    .map(|row| row.repository() == id)
                    .unwrap_or(false);
                if showing_removed {
                    self.refresh(false).await
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    /// 持续处理通知，直到视图模型被释放
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<HistoryEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    self.handle_event(&event).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "历史通知积压，执行完整刷新");
                    self.refresh(false).await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
