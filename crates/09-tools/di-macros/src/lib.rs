//! # DI Macros
//!
//! 这个 crate 提供了在编译时生成参数对象与结果对象描述的派生宏，
//! 取代运行时反射。生成的代码引用 `::di_abstractions`，使用方需要依赖该 crate
//! （它同时重新导出了这里的宏）。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use di_abstractions::{Params, Results};
//! use std::sync::Arc;
//!
//! #[derive(Params)]
//! struct HandlerParams {
//!     config: Arc<Config>,
//!     #[dig(name = "readonly")]
//!     replica: Option<Arc<Database>>,
//!     #[dig(group = "middleware,soft")]
//!     middleware: Vec<Arc<dyn Middleware>>,
//! }
//!
//! #[derive(Results)]
//! struct Databases {
//!     #[dig(name = "primary")]
//!     primary: Arc<Database>,
//!     #[dig(group = "health_checks")]
//!     check: Arc<dyn HealthCheck>,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod params;
mod results;
mod utils;

/// 为参数对象实现 `Params`
///
/// # 字段属性
///
/// - `#[dig(name = "..")]` - 按名称注入
/// - `#[dig(optional)]` - 可选依赖，字段必须是 `Option<..>`
/// - `#[dig(group = "name[,soft]")]` - 注入值组，字段为 `Vec<Arc<T>>`
/// - `#[dig(skip)]` - 不注入，使用 `Default`
///
/// 没有属性的字段委托给字段类型自身的 `Params` 实现，因此参数对象可以嵌套。
#[proc_macro_derive(Params, attributes(dig))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    params::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// 为结果对象实现 `Results`
///
/// # 字段属性
///
/// - `#[dig(name = "..")]` - 以名称登记
/// - `#[dig(group = "name[,flatten]")]` - 加入值组
#[proc_macro_derive(Results, attributes(dig))]
pub fn derive_results(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    results::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
