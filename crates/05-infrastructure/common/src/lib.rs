//! # DI Common
//!
//! 依赖注入引擎的公共基础类型。
//!
//! ## 核心类型
//!
//! - [`Key`] - 依赖键：类型 + 可选名称或值组
//! - [`TypeInfo`] - 类型信息
//! - [`Location`] - 提供者的源码位置
//! - [`GroupSpec`] - 值组描述字符串解析
//! - [`DigError`] - 错误分类

pub mod errors;
pub mod group;
pub mod key;
pub mod metadata;

pub use errors::*;
pub use group::*;
pub use key::*;
pub use metadata::*;
