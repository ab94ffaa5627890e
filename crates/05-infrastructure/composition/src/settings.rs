//! 容器配置
//!
//! 配置文件示例（TOML）：
//!
//! ```toml
//! defer_acyclic_verification = true
//! recover_from_panics = true
//! group_order_seed = 42
//!
//! [logging]
//! level = "debug"
//! json = false
//! filter = "di_impl=debug"
//! ```

use di_impl::ContainerOptions;
use serde::{Deserialize, Serialize};

/// 容器配置，字段与 [`ContainerOptions`] 对应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerSettings {
    /// 推迟环检测到第一次调用
    pub defer_acyclic_verification: bool,
    /// 捕获 panic
    pub recover_from_panics: bool,
    /// 值组乱序种子
    pub group_order_seed: Option<u64>,
    /// 日志配置，缺省时不初始化日志
    pub logging: Option<LoggingSettings>,
}

impl ContainerSettings {
    /// 转换为容器选项
    pub fn to_options(&self) -> ContainerOptions {
        ContainerOptions::new()
            .defer_acyclic_verification(self.defer_acyclic_verification)
            .recover_from_panics(self.recover_from_panics)
            .group_order_seed(self.group_order_seed)
    }
}

/// 日志配置节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// 日志级别：trace、debug、info、warn、error
    pub level: String,
    /// 是否使用 JSON 格式
    pub json: bool,
    /// `EnvFilter` 过滤指令，优先于 `level`
    pub filter: Option<String>,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名和行号
    pub show_location: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            filter: None,
            show_target: true,
            show_thread_ids: false,
            show_location: false,
        }
    }
}
