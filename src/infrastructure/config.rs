use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::infrastructure::error::{HistoryError, Result};
use crate::infrastructure::logging::LoggingConfig;
use crate::scm::HistoryFilter;

/// 应用程序配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// 历史视图配置
    pub history: HistoryConfig,

    /// 日志配置
    pub logging: LoggingConfig,
}

/// 历史视图配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HistoryConfig {
    /// 每页加载的提交数量，视图模型会限制在 [1, 1000]
    pub page_size: usize,
    pub filter: HistoryFilter,
    pub git_binary: String,
    /// 提交变更列表的 LRU 缓存容量
    pub changes_cache_size: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            filter: HistoryFilter::Auto,
            git_binary: "git".to_string(),
            changes_cache_size: 100,
        }
    }
}

/// 配置源
#[derive(Debug, Clone)]
pub enum ConfigSource {
    Default,
    /// `.env` 文件，不覆盖已有环境变量
    EnvFile(Option<PathBuf>),
    File(PathBuf),
    Environment,
    CommandLine(HashMap<String, String>),
}

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            _ => Err(HistoryError::config(format!(
                "不支持的配置文件格式: {}",
                path.display()
            ))),
        }
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: AppConfig,
    config_sources: Vec<ConfigSource>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            config_sources: vec![ConfigSource::Default],
        }
    }

    /// 添加配置源，后添加的优先级更高
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.config_sources.push(source);
        self
    }

    /// 加载配置
    pub fn load(&mut self) -> Result<&AppConfig> {
        let mut config = AppConfig::default();

        for source in &self.config_sources {
            match source {
                ConfigSource::Default => {}
                ConfigSource::EnvFile(path) => Self::load_env_file(path.as_deref()),
                ConfigSource::File(path) => Self::load_from_file(&mut config, path)?,
                ConfigSource::Environment => Self::load_from_environment(&mut config)?,
                ConfigSource::CommandLine(args) => Self::load_from_command_line(&mut config, args)?,
            }
        }

        Self::validate_config(&config)?;
        tracing::debug!(?config, "配置加载完成");

        self.config = config;
        Ok(&self.config)
    }

    fn load_env_file(path: Option<&Path>) {
        let loaded = match path {
            Some(path) => dotenvy::from_path(path).is_ok(),
            None => dotenvy::dotenv().is_ok(),
        };
        if loaded {
            tracing::debug!("已加载 .env 文件");
        }
    }

    /// 从文件加载配置，文件不存在时跳过
    fn load_from_file(config: &mut AppConfig, path: &Path) -> Result<()> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "配置文件不存在，跳过");
            return Ok(());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            HistoryError::file_system(
                format!("无法读取配置文件: {}", e),
                Some(path.to_string_lossy().to_string()),
            )
        })?;

        *config = Self::parse(&content, ConfigFormat::from_path(path)?)?;
        Ok(())
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<AppConfig> {
        match format {
            ConfigFormat::Toml => toml::from_str(content)
                .map_err(|e| HistoryError::config(format!("TOML 解析错误: {}", e))),
            ConfigFormat::Yaml => serde_yaml::from_str(content)
                .map_err(|e| HistoryError::config(format!("YAML 解析错误: {}", e))),
            ConfigFormat::Json => serde_json::from_str(content)
                .map_err(|e| HistoryError::config(format!("JSON 解析错误: {}", e))),
        }
    }

    /// 从环境变量加载配置
    fn load_from_environment(config: &mut AppConfig) -> Result<()> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter_map(|(key, value)| {
                key.strip_prefix("SCM_HISTORY_")
                    .map(|name| (name.to_ascii_lowercase(), value))
            })
            .collect();
        Self::apply_overrides(config, &vars)
    }

    fn load_from_command_line(config: &mut AppConfig, args: &HashMap<String, String>) -> Result<()> {
        Self::apply_overrides(config, args)
    }

    fn apply_overrides(config: &mut AppConfig, values: &HashMap<String, String>) -> Result<()> {
        if let Some(page_size) = values.get("page_size") {
            config.history.page_size = page_size
                .parse()
                .map_err(|_| HistoryError::config(format!("无效的分页大小: {}", page_size)))?;
        }
        if let Some(filter) = values.get("filter") {
            config.history.filter = filter.parse()?;
        }
        if let Some(git_binary) = values.get("git_binary") {
            config.history.git_binary = git_binary.clone();
        }
        if let Some(level) = values.get("log_level") {
            config.logging.level = level.clone();
        }
        if let Some(format) = values.get("log_format") {
            config.logging.format = format.parse()?;
        }
        if let Some(file) = values.get("log_file") {
            config.logging.file = Some(PathBuf::from(file));
        }
        Ok(())
    }

    fn validate_config(config: &AppConfig) -> Result<()> {
        if config.history.page_size == 0 {
            return Err(HistoryError::config("分页大小不能为 0"));
        }
        if config.history.git_binary.trim().is_empty() {
            return Err(HistoryError::config("git 可执行文件不能为空"));
        }
        if config.history.changes_cache_size == 0 {
            return Err(HistoryError::config("变更缓存容量不能为 0"));
        }
        config.logging.level()?;
        Ok(())
    }

    /// 获取配置
    pub fn get_config(&self) -> &AppConfig {
        &self.config
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(&self.config)
                .map_err(|e| HistoryError::config(format!("TOML 序列化错误: {}", e)))?,
            ConfigFormat::Yaml => serde_yaml::to_string(&self.config)
                .map_err(|e| HistoryError::config(format!("YAML 序列化错误: {}", e)))?,
            ConfigFormat::Json => serde_json::to_string_pretty(&self.config)?,
        };

        std::fs::write(path, content).map_err(|e| {
            HistoryError::file_system(
                format!("无法写入配置文件: {}", e),
                Some(path.to_string_lossy().to_string()),
            )
        })
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.history.page_size, 50);
        assert_eq!(config.history.filter, HistoryFilter::Auto);
        assert_eq!(config.history.git_binary, "git");
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = ConfigManager::parse(
            "[history]\npage_size = 20\nfilter = \"all\"\n",
            ConfigFormat::Toml,
        )
        .unwrap();
        assert_eq!(config.history.page_size, 20);
        assert_eq!(config.history.filter, HistoryFilter::All);
        assert_eq!(config.history.git_binary, "git");
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_parse_yaml() {
        let config = ConfigManager::parse(
            "logging:\n  level: debug\n  format: json\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, crate::infrastructure::logging::LogFormat::Json);
    }

    #[test]
    fn test_command_line_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, r#"{"history": {"page_size": 10}}"#).unwrap();

        let mut args = HashMap::new();
        args.insert("page_size".to_string(), "5".to_string());

        let mut manager = ConfigManager::new()
            .add_source(ConfigSource::File(path))
            .add_source(ConfigSource::CommandLine(args));
        let config = manager.load().unwrap();
        assert_eq!(config.history.page_size, 5);
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let mut manager = ConfigManager::new()
            .add_source(ConfigSource::File(PathBuf::from("/nonexistent/history.toml")));
        assert!(manager.load().is_ok());
        assert_eq!(manager.get_config().history.page_size, 50);
    }

    #[test]
    fn test_validation_rejects_zero_page_size() {
        let mut args = HashMap::new();
        args.insert("page_size".to_string(), "0".to_string());
        let mut manager = ConfigManager::new().add_source(ConfigSource::CommandLine(args));
        assert!(matches!(
            manager.load(),
            Err(HistoryError::Configuration { .. })
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        assert!(ConfigFormat::from_path(Path::new("config.ini")).is_err());
        assert_eq!(
            ConfigFormat::from_path(Path::new("config.yml")).unwrap(),
            ConfigFormat::Yaml
        );
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.toml");

        let manager = ConfigManager::new();
        manager.save_to_file(&path).unwrap();

        let mut reloaded = ConfigManager::new().add_source(ConfigSource::File(path));
        assert_eq!(reloaded.load().unwrap(), &AppConfig::default());
    }
}
