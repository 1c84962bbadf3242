pub mod formatters;

pub use formatters::*;

use crate::infrastructure::error::{HistoryError, Result};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(HistoryError::config(format!("不支持的输出格式: {}", other))),
        }
    }
}

/// 根据输出格式创建格式化器
pub fn formatter_for(format: OutputFormat, use_colors: bool) -> Box<dyn RowFormatter> {
    match format {
        OutputFormat::Text if use_colors => Box::new(TextFormatter::new()),
        OutputFormat::Text => Box::new(TextFormatter::new_no_color()),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
    }
}
