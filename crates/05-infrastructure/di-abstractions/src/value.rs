//! 类型擦除的值
//!
//! 容器内所有值都以 `Arc<dyn Any + Send + Sync>` 保存，内部装的是 `Arc<T>`，
//! 因此 `T` 可以是 `dyn Trait` 这样的非固定大小类型。

use std::any::Any;
use std::sync::Arc;

/// 类型擦除的值
pub type Value = Arc<dyn Any + Send + Sync>;

/// 擦除类型
pub fn wrap<T>(value: Arc<T>) -> Value
where
    T: ?Sized + Send + Sync + 'static,
{
    Arc::new(value)
}

/// 恢复类型，类型不符时返回 `None`
pub fn downcast<T>(value: &Value) -> Option<Arc<T>>
where
    T: ?Sized + Send + Sync + 'static,
{
    value.downcast_ref::<Arc<T>>().cloned()
}
