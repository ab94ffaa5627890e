//! # 容器组合层
//!
//! 从配置文件和环境变量读取容器设置，初始化日志，并构建依赖注入容器。
//!
//! ## 主要功能
//!
//! - **容器构建器**: 使用构建者模式叠加配置源
//! - **配置绑定**: 将 TOML / JSON / YAML 文件与环境变量绑定到 [`ContainerSettings`]
//! - **日志初始化**: 基于 `tracing-subscriber` 的文本或 JSON 输出
//!
//! ## 基本使用
//!
//! ```rust,no_run
//! use di_composition::{ContainerBuilder, LoggingConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let container = ContainerBuilder::new()
//!         .add_config_toml("config/container.toml")?
//!         .add_config_env_vars("DI")
//!         .with_logging(LoggingConfig::development())
//!         .build()?;
//!     println!("{container:?}");
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod error;
pub mod logging;
pub mod settings;

// 重新导出主要类型
pub use builder::ContainerBuilder;
pub use error::CompositionError;
pub use logging::{init_logging, LoggingConfig};
pub use settings::{ContainerSettings, LoggingSettings};
