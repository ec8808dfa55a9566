use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use holder::logging::{LogFormat, LoggingConfig};

/// holder-demo - 演示分层惰性容器的解析、别名与逆序清理
#[derive(Parser, Debug)]
#[command(name = "holder-demo")]
#[command(about = "Wire a sample container tree, resolve through aliases, then tear it down")]
pub struct Args {
    /// 配置文件路径（默认 ~/.config/holder/config.toml）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 使用预设的日志配置，替换配置文件中的日志段
    #[arg(long, value_enum)]
    pub log_preset: Option<LogPreset>,

    /// 覆盖日志格式
    #[arg(long, value_parser = parse_format)]
    pub log_format: Option<LogFormat>,

    /// 清理时执行全部回调并汇总错误
    #[arg(long)]
    pub exhaustive: bool,

    /// 让缓存清理回调失败，用于观察清理中止行为
    #[arg(long)]
    pub fail_cache_close: bool,

    /// 额外打印一份只保留 `db.*` 条目的副本
    #[arg(long)]
    pub show_copy: bool,
}

fn parse_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|e: holder::errors::ConfigError| e.to_string())
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogPreset {
    Development,
    Production,
    Testing,
}

impl LogPreset {
    pub fn logging_config(self) -> LoggingConfig {
        match self {
            LogPreset::Development => LoggingConfig::development(),
            LogPreset::Production => LoggingConfig::production(),
            LogPreset::Testing => LoggingConfig::testing(),
        }
    }
}
