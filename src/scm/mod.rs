// Source control history: models, provider contract, graph and view model

pub mod colors;
pub mod graph;
pub mod models;
pub mod provider;
pub mod throttle;
pub mod tree;
pub mod view_model;

pub use colors::ColorMap;
pub use graph::{to_history_item_view_models, HistoryGraph};
pub use models::*;
pub use provider::{CachedHistoryProvider, HistoryItemsOptions, HistoryProvider};
pub use tree::{HistoryItemAction, HistoryTreeController, HistoryTreeDataSource, TreeElement};
pub use view_model::{
    HistoryEvent, HistoryFilter, HistoryViewModel, Repository, RepositorySelection,
};
