use clap::Parser;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Parser, Debug, Default)]
#[command(
    name = "scm-history",
    version,
    about = "源代码管理历史视图 - 分页查看提交图、引用标签和提交变更",
    long_about = "scm-history 按页获取当前分支（及其上游和基准分支）的提交历史，计算提交图的泳道与颜色，并以文本或 JSON 输出。支持查看单个提交的文件变更以及解析分支的共同祖先。"
)]
pub struct Args {
    /// 仓库路径（可以是仓库内任意子目录）
    #[arg(short = 'C', long = "repo", value_name = "PATH", default_value = ".")]
    pub repo: PathBuf,

    /// 每页提交数量（1-1000），覆盖配置文件
    #[arg(short = 'n', long = "page-size", value_name = "N")]
    pub page_size: Option<usize>,

    /// 加载的页数
    #[arg(long = "pages", value_name = "N", default_value_t = 1)]
    pub pages: usize,

    /// 显示所有引用的历史，而不仅是当前分支谱系
    #[arg(short = 'a', long = "all", default_value_t = false)]
    pub all: bool,

    /// 输出格式 (text, json)
    #[arg(short = 'f', long = "format", default_value = "text")]
    pub format: String,

    /// 禁用彩色输出
    #[arg(long = "no-color", default_value_t = false)]
    pub no_color: bool,

    /// 配置文件路径（toml / yaml / json）
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// 显示指定提交相对第一个父提交的文件变更
    #[arg(long = "changes", value_name = "COMMIT")]
    pub changes: Option<String>,

    /// 输出当前分支与其上游、基准分支的共同祖先
    #[arg(long = "merge-base", default_value_t = false)]
    pub merge_base: bool,
}

impl Args {
    /// 命令行中显式给出的配置项，作为优先级最高的配置源
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(page_size) = self.page_size {
            overrides.insert("page_size".to_string(), page_size.to_string());
        }
        if self.all {
            overrides.insert("filter".to_string(), "all".to_string());
        }
        if let Some(level) = &self.log_level {
            overrides.insert("log_level".to_string(), level.clone());
        }
        overrides
    }
}
