//! 依赖键
//!
//! 一个键由类型加上可选的名称或值组名组成，名称与值组互斥。

use crate::metadata::TypeInfo;
use std::fmt;

/// 依赖键
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    /// 值的类型
    pub type_info: TypeInfo,
    /// 命名值的名称
    pub name: Option<String>,
    /// 值组名称
    pub group: Option<String>,
}

impl Key {
    /// 按类型创建键
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>())
    }

    /// 创建命名键
    pub fn named<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self::of::<T>().with_name(Some(name.into()))
    }

    /// 创建值组键
    pub fn grouped<T: ?Sized + 'static>(group: impl Into<String>) -> Self {
        Self::of::<T>().with_group(Some(group.into()))
    }

    /// 从类型信息创建键
    pub fn new(type_info: TypeInfo) -> Self {
        Self {
            type_info,
            name: None,
            group: None,
        }
    }

    /// 设置名称
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// 设置值组
    #[must_use]
    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group;
        self
    }

    /// 是否为值组键
    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_info)?;
        if let Some(name) = &self.name {
            write!(f, "[name=\"{name}\"]")?;
        }
        if let Some(group) = &self.group {
            write!(f, "[group=\"{group}\"]")?;
        }
        Ok(())
    }
}
