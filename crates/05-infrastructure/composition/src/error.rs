//! 组合层错误类型

use di_common::DigError;
use std::path::PathBuf;
use thiserror::Error;

/// 组合层错误
#[derive(Error, Debug)]
pub enum CompositionError {
    #[error("配置文件不存在: {}", .path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("配置加载失败: {source}")]
    Config {
        #[from]
        source: config::ConfigError,
    },

    #[error("日志初始化失败: {message}")]
    Logging { message: String },

    #[error("容器错误: {source}")]
    Dig {
        #[from]
        source: DigError,
    },
}
