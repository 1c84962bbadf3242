use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::infrastructure::error::{HistoryError, Result};

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别 (trace / debug / info / warn / error)
    pub level: String,
    pub format: LogFormat,
    /// 为空时写入标准错误
    pub file: Option<PathBuf>,
    pub include_file_location: bool,
    /// 完整的 EnvFilter 指令，设置后覆盖 `level`
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
            file: None,
            include_file_location: false,
            filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn level(&self) -> Result<Level> {
        self.level
            .parse::<Level>()
            .map_err(|_| HistoryError::config(format!("无效的日志级别: {}", self.level)))
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 人类可读的格式
    Pretty,
    /// 紧凑格式
    Compact,
    /// JSON 格式
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = HistoryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(HistoryError::config(format!("不支持的日志格式: {}", other))),
        }
    }
}

/// 构建 EnvFilter：显式过滤指令优先，否则在 RUST_LOG 基础上追加 crate 级别
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Some(filter) = &config.filter {
        return EnvFilter::try_new(filter)
            .map_err(|e| HistoryError::config(format!("无效的日志过滤器: {}", e)));
    }

    let directive = format!("scm_history={}", config.level()?)
        .parse()
        .map_err(|e| HistoryError::config(format!("无效的日志指令: {}", e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

/// 设置日志系统
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let fmt_layer = match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    HistoryError::file_system(
                        format!("无法打开日志文件: {}", e),
                        Some(path.to_string_lossy().to_string()),
                    )
                })?;
            create_fmt_layer(config, std::sync::Mutex::new(file))
        }
        None => create_fmt_layer(config, std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| HistoryError::config(format!("日志系统已初始化: {}", e)))
}

fn create_fmt_layer<W>(config: &LoggingConfig, make_writer: W) -> Box<dyn Layer<Registry> + Send + Sync>
where
    W: for<'writer> fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(make_writer)
        .with_target(true)
        .with_level(true)
        .with_file(config.include_file_location)
        .with_line_number(config.include_file_location);

    match config.format {
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}
