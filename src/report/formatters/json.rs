use super::RowFormatter;
use crate::infrastructure::error::Result;
use crate::scm::models::HistoryItemChange;
use crate::scm::tree::TreeElement;

/// JSON 格式化器
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// 创建新的 JSON 格式化器（带缩进）
    pub fn new() -> Self {
        Self { pretty: true }
    }

    /// 单行输出，便于管道处理
    pub fn compact() -> Self {
        Self { pretty: false }
    }

    fn to_json<T: serde::Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl RowFormatter for JsonFormatter {
    fn format_rows(&self, rows: &[TreeElement]) -> Result<String> {
        self.to_json(rows)
    }

    fn format_changes(&self, changes: &[HistoryItemChange]) -> Result<String> {
        self.to_json(changes)
    }

    fn name(&self) -> &str {
        "json"
    }
}
