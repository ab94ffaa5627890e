//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义依赖图、请求/响应描述和生产者的核心接口。
//!
//! ## 核心接口
//!
//! - [`Graph`] - 可做环检测的有向图
//! - [`Params`] / [`Dependency`] / [`GroupDependency`] - 生产者参数描述
//! - [`Results`] - 生产者返回值描述
//! - [`Producer`] - 生产者函数
//! - [`TimeSource`] - 时钟抽象
//!
//! 派生宏 `#[derive(Params)]` 与 `#[derive(Results)]` 在这里重新导出，
//! 生成的代码通过 `::di_abstractions` 路径引用本 crate。

extern crate self as di_abstractions;

pub mod callback;
pub mod graph;
pub mod param;
pub mod producer;
pub mod result;
pub mod value;

pub use callback::*;
pub use graph::{find_cycle, find_cycle_from, is_acyclic, Graph};
pub use param::*;
pub use producer::*;
pub use result::*;
pub use value::Value;

pub use di_common::{BoxError, DigError, DigResult, GroupSpec, Key, Location, TypeInfo};
pub use di_macros::{Params, Results};
