pub mod json;
pub mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::infrastructure::error::Result;
use crate::scm::models::HistoryItemChange;
use crate::scm::tree::TreeElement;

/// 历史行格式化器 trait
pub trait RowFormatter: Send + Sync {
    /// 格式化历史树的行
    fn format_rows(&self, rows: &[TreeElement]) -> Result<String>;

    /// 格式化单个提交的文件变更
    fn format_changes(&self, changes: &[HistoryItemChange]) -> Result<String>;

    /// 获取格式化器名称
    fn name(&self) -> &str;
}

/// 格式化辅助函数
pub mod utils {
    use crate::scm::models::{ChangeType, GraphColor};

    /// 将变更类型转换为状态字母
    pub fn change_type_to_letter(status: &ChangeType) -> &'static str {
        match status {
            ChangeType::Added => "A",
            ChangeType::Modified => "M",
            ChangeType::Deleted => "D",
            ChangeType::Renamed => "R",
            ChangeType::Copied => "C",
            ChangeType::Unmerged => "U",
            ChangeType::TypeChange => "T",
        }
    }

    /// 图颜色对应的 ANSI 前景色
    pub fn graph_color_to_ansi(color: GraphColor) -> &'static str {
        match color {
            GraphColor::Local => "\x1b[94m",
            GraphColor::Remote => "\x1b[95m",
            GraphColor::Base => "\x1b[93m",
            GraphColor::Neutral => "\x1b[90m",
            GraphColor::Lane(index) => match index % 5 {
                0 => "\x1b[32m",
                1 => "\x1b[36m",
                2 => "\x1b[33m",
                3 => "\x1b[35m",
                _ => "\x1b[31m",
            },
        }
    }
}
