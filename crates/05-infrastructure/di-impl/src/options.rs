//! 容器、注册、装饰与调用选项

use di_abstractions::{As, Callback, CallbackInfo, Location, SystemClock, TimeSource};
use std::fmt;
use std::sync::Arc;

/// 作用域策略，子作用域创建时从父作用域继承
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopePolicy {
    /// 注册时不做环检测，推迟到第一次调用
    pub defer_acyclic_verification: bool,
    /// 在调用入口捕获 panic 并转换为错误
    pub recover_from_panics: bool,
    /// 值组乱序的随机种子，`None` 表示按注册顺序
    pub group_order_seed: Option<u64>,
}

/// 容器选项
#[derive(Clone)]
pub struct ContainerOptions {
    pub(crate) policy: ScopePolicy,
    pub(crate) clock: Arc<dyn TimeSource>,
}

impl ContainerOptions {
    /// 创建默认选项
    pub fn new() -> Self {
        Self {
            policy: ScopePolicy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    /// 推迟环检测到第一次调用
    #[must_use]
    pub fn defer_acyclic_verification(mut self, enabled: bool) -> Self {
        self.policy.defer_acyclic_verification = enabled;
        self
    }

    /// 捕获生产者与调用函数中的 panic
    #[must_use]
    pub fn recover_from_panics(mut self, enabled: bool) -> Self {
        self.policy.recover_from_panics = enabled;
        self
    }

    /// 打乱值组顺序，用于发现依赖值组顺序的错误用法
    #[must_use]
    pub fn group_order_seed(mut self, seed: Option<u64>) -> Self {
        self.policy.group_order_seed = seed;
        self
    }

    /// 替换计时用的时钟
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// 当前策略
    pub fn policy(&self) -> ScopePolicy {
        self.policy
    }
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerOptions")
            .field("policy", &self.policy)
            .field("clock", &"<clock>")
            .finish()
    }
}

/// 注册选项
#[derive(Clone, Default)]
pub struct ProvideOptions {
    pub(crate) name: Option<String>,
    pub(crate) group: Option<String>,
    pub(crate) as_types: Vec<As>,
    pub(crate) export: bool,
    pub(crate) callback: Option<Callback>,
    pub(crate) location: Option<Location>,
}

impl ProvideOptions {
    /// 创建默认选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 以名称登记结果
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 将结果加入值组，格式为 `name[,flatten]`
    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// 以其他类型登记结果，可多次调用
    #[must_use]
    pub fn as_type(mut self, as_type: As) -> Self {
        self.as_types.push(as_type);
        self
    }

    /// 将生产者登记到根作用域，使所有作用域可见
    #[must_use]
    pub fn export(mut self, export: bool) -> Self {
        self.export = export;
        self
    }

    /// 生产者运行结束后的回调
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CallbackInfo<'_>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// 覆盖诊断用的源码位置
    #[must_use]
    pub fn location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Debug for ProvideOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideOptions")
            .field("name", &self.name)
            .field("group", &self.group)
            .field("as_types", &self.as_types)
            .field("export", &self.export)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// 装饰选项
#[derive(Clone, Default)]
pub struct DecorateOptions {
    pub(crate) callback: Option<Callback>,
}

impl DecorateOptions {
    /// 创建默认选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 装饰器运行结束后的回调
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CallbackInfo<'_>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

/// 调用选项
#[derive(Clone, Default)]
pub struct InvokeOptions {
    pub(crate) callback: Option<Callback>,
}

impl InvokeOptions {
    /// 创建默认选项
    pub fn new() -> Self {
        Self::default()
    }

    /// 调用函数运行结束后的回调
    #[must_use]
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: Fn(&CallbackInfo<'_>) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}
