use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 历史视图错误类型
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum HistoryError {
    #[error("配置错误: {message}")]
    Configuration { message: String },

    #[error("文件系统错误: {message}")]
    FileSystem { message: String, path: Option<String> },

    #[error("Git 命令失败: git {command} - {message}")]
    GitCommand {
        command: String,
        message: String,
        exit_code: Option<i32>,
    },

    #[error("解析错误: {message}")]
    Parsing { message: String, content_type: String },

    #[error("历史提供者错误: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("仓库不存在: {repository}")]
    RepositoryNotFound { repository: String },
}

impl HistoryError {
    /// 获取错误类别
    pub fn category(&self) -> ErrorCategory {
        match self {
            HistoryError::Configuration { .. } => ErrorCategory::Configuration,
            HistoryError::FileSystem { .. } => ErrorCategory::IO,
            HistoryError::GitCommand { .. } => ErrorCategory::ExternalService,
            HistoryError::Parsing { .. } => ErrorCategory::Data,
            HistoryError::Provider { .. } => ErrorCategory::ExternalService,
            HistoryError::RepositoryNotFound { .. } => ErrorCategory::Data,
        }
    }

    /// 创建配置错误
    pub fn config(message: impl Into<String>) -> Self {
        HistoryError::Configuration {
            message: message.into(),
        }
    }

    /// 创建文件系统错误
    pub fn file_system(message: impl Into<String>, path: Option<String>) -> Self {
        HistoryError::FileSystem {
            message: message.into(),
            path,
        }
    }

    /// 创建 Git 命令错误
    pub fn git_command(
        command: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        HistoryError::GitCommand {
            command: command.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// 创建解析错误
    pub fn parsing(message: impl Into<String>, content_type: impl Into<String>) -> Self {
        HistoryError::Parsing {
            message: message.into(),
            content_type: content_type.into(),
        }
    }

    /// 创建提供者错误
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        HistoryError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    Configuration,
    IO,
    ExternalService,
    Data,
}

pub type Result<T> = std::result::Result<T, HistoryError>;

impl From<std::io::Error> for HistoryError {
    fn from(error: std::io::Error) -> Self {
        HistoryError::FileSystem {
            message: error.to_string(),
            path: None,
        }
    }
}

impl From<serde_json::Error> for HistoryError {
    fn from(error: serde_json::Error) -> Self {
        HistoryError::Parsing {
            message: error.to_string(),
            content_type: "JSON".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_command_error_display() {
        let error = HistoryError::git_command("log", "fatal: bad revision", Some(128));
        assert_eq!(error.to_string(), "Git 命令失败: git log - fatal: bad revision");
        assert_eq!(error.category(), ErrorCategory::ExternalService);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: HistoryError = io.into();
        assert!(matches!(error, HistoryError::FileSystem { path: None, .. }));
        assert_eq!(error.category(), ErrorCategory::IO);
    }
}
