//! 日志初始化

use crate::error::CompositionError;
use crate::settings::LoggingSettings;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: tracing::Level,
    /// `EnvFilter` 过滤指令，设置后覆盖 `level`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            filter: None,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            filter: None,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    /// 由配置节创建
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, CompositionError> {
        let level = settings
            .level
            .parse::<tracing::Level>()
            .map_err(|e| CompositionError::Logging {
                message: format!("无效的日志级别 {:?}: {}", settings.level, e),
            })?;
        Ok(Self {
            level,
            filter: settings.filter.clone(),
            show_target: settings.show_target,
            show_thread_ids: settings.show_thread_ids,
            show_file: settings.show_location,
            show_line_number: settings.show_location,
            json_format: settings.json,
        })
    }

    fn env_filter(&self) -> Result<EnvFilter, CompositionError> {
        match &self.filter {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| CompositionError::Logging {
                    message: format!("无效的过滤指令 {directives:?}: {e}"),
                })
            }
            None => Ok(EnvFilter::new(self.level.to_string())),
        }
    }
}

/// 初始化全局日志订阅者
///
/// 全局订阅者只能设置一次，重复初始化返回 [`CompositionError::Logging`]。
pub fn init_logging(config: &LoggingConfig) -> Result<(), CompositionError> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter()?)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| CompositionError::Logging {
        message: e.to_string(),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
