//! # 依赖注入具体实现
//!
//! 基于反射式依赖图的依赖注入容器：注册生产者、按需解析依赖、
//! 检测依赖循环，并支持作用域树、值组、装饰器与 panic 恢复。
//!
//! ## 主要类型
//!
//! - [`Container`] - 容器，拥有作用域树
//! - [`Scope`] - 作用域句柄，提供注册、装饰与调用
//! - [`Batch`] - 事务式批量注册
//! - [`ContainerOptions`] / [`ProvideOptions`] / [`DecorateOptions`] / [`InvokeOptions`] - 选项

mod container;
mod graph_holder;
mod node;
mod options;
mod recover;
mod resolve;
mod scope;
mod tree;
mod verify;

pub use container::Container;
pub use node::ScopeId;
pub use options::{ContainerOptions, DecorateOptions, InvokeOptions, ProvideOptions, ScopePolicy};
pub use scope::{Batch, Scope};

pub use di_abstractions::{
    As, Callback, CallbackInfo, DigError, DigResult, Key, Location, Params, Results, SystemClock,
    TimeSource,
};
