//! 完成回调与时钟抽象

use std::sync::Arc;
use std::time::{Duration, Instant};

/// 一次生产者、装饰器或调用函数运行结束后的信息
#[derive(Debug, Clone, Copy)]
pub struct CallbackInfo<'a> {
    /// 函数的完整名称
    pub name: &'a str,
    /// 运行失败时的错误
    pub error: Option<&'a (dyn std::error::Error + 'static)>,
    /// 运行耗时
    pub runtime: Duration,
}

/// 完成回调
pub type Callback = Arc<dyn Fn(&CallbackInfo<'_>) + Send + Sync>;

/// 时间来源，测试中可替换为可控时钟
pub trait TimeSource: Send + Sync {
    /// 当前时刻
    fn now(&self) -> Instant;
}

/// 系统单调时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}
