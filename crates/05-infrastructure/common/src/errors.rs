//! 错误类型定义

use crate::key::Key;
use crate::metadata::Location;
use std::fmt;
use thiserror::Error;

/// 生产者失败时返回的错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 依赖注入结果类型
pub type DigResult<T> = Result<T, DigError>;

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DigError {
    #[error("检测到依赖图中存在循环: {0}")]
    CycleDetected(CyclePath),

    #[error("无效输入: {message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<Box<DigError>>,
    },

    #[error("无效的值组选项: {option:?}")]
    InvalidGroupOption { option: String },

    #[error("{key} 已在作用域 {scope:?} 中由 {existing} 提供")]
    AmbiguousProvider {
        key: Key,
        existing: Location,
        scope: String,
    },

    #[error("{}", describe_missing(.key, .requested_by.as_ref(), .scope))]
    NotFound {
        key: Key,
        requested_by: Option<Location>,
        scope: String,
    },

    #[error("{} 发生 panic: {payload}", describe_fault_location(.location.as_ref()))]
    RecoveredFault {
        location: Option<Location>,
        payload: String,
    },

    #[error("构造函数 {location} 执行失败: {source}")]
    ProducerFailed {
        location: Location,
        source: BoxError,
    },

    #[error("调用函数 {location} 执行失败: {source}")]
    InvokeFailed {
        location: Location,
        source: BoxError,
    },

    #[error("类型不匹配: {key} 无法转换为 {expected}")]
    TypeMismatch { key: Key, expected: &'static str },

    #[error("作用域不存在: {id}")]
    ScopeNotFound { id: usize },
}

fn describe_missing(key: &Key, requested_by: Option<&Location>, scope: &str) -> String {
    let mut message = format!("缺少依赖 {key}");
    if let Some(location) = requested_by {
        message.push_str(&format!("，由 {location} 请求"));
    }
    if !scope.is_empty() {
        message.push_str(&format!("（作用域 {scope:?}）"));
    }
    message
}

fn describe_fault_location(location: Option<&Location>) -> String {
    location.map_or_else(|| "未知函数".to_string(), |location| format!("函数 {location}"))
}

impl DigError {
    /// 创建无效输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            source: None,
        }
    }

    /// 在已有错误外包装一层无效输入上下文
    pub fn invalid_input_caused_by(message: impl Into<String>, source: DigError) -> Self {
        Self::InvalidInput {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 错误本身或其原因链中是否包含循环依赖错误
    pub fn is_cycle_detected(&self) -> bool {
        is_cycle_detected(self)
    }
}

/// 检查错误链中是否包含循环依赖错误
///
/// 包装层可能是任意实现了 `Error` 的类型，只要它通过 `source()` 暴露原因。
pub fn is_cycle_detected(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if let Some(DigError::CycleDetected(_)) = err.downcast_ref::<DigError>() {
            return true;
        }
        if let Some(boxed) = err.downcast_ref::<Box<DigError>>() {
            if boxed.is_cycle_detected() {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// 循环路径上的一项：被提供的键以及提供它的函数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePathEntry {
    /// 被提供的键
    pub key: Key,
    /// 提供者位置
    pub location: Location,
}

/// 完整的循环路径，首尾是同一个提供者
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePath {
    /// 检测到循环的作用域名称
    pub scope: String,
    /// 循环路径
    pub entries: Vec<CyclePathEntry>,
}

impl fmt::Display for CyclePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.scope.is_empty() {
            writeln!(f, "[scope {:?}]", self.scope)?;
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                f.write_str("\n\tdepends on ")?;
            }
            write!(f, "{} provided by {}", entry.key, entry.location)?;
        }
        Ok(())
    }
}
