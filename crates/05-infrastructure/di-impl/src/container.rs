//! 依赖注入容器

use crate::node::ScopeId;
use crate::options::{ContainerOptions, DecorateOptions, InvokeOptions, ProvideOptions};
use crate::scope::{Batch, Scope};
use crate::tree::ScopeTree;
use di_abstractions::{DigError, DigResult, Producer, Results};

/// 依赖注入容器
///
/// 容器拥有作用域树，根作用域随容器创建。所有操作都在调用线程上同步完成。
///
/// ```
/// use di_impl::{Container, InvokeOptions, ProvideOptions};
/// use std::sync::Arc;
///
/// struct Config {
///     port: u16,
/// }
///
/// let mut container = Container::new();
/// container
///     .provide(|| Ok::<_, std::io::Error>(Arc::new(Config { port: 8080 })), ProvideOptions::new())
///     .unwrap();
/// let port = container
///     .invoke(|config: Arc<Config>| Ok::<_, std::io::Error>(config.port), InvokeOptions::new())
///     .unwrap();
/// assert_eq!(port, 8080);
/// ```
pub struct Container {
    tree: ScopeTree,
}

impl Container {
    /// 使用默认选项创建容器
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// 使用给定选项创建容器
    pub fn with_options(options: ContainerOptions) -> Self {
        Self {
            tree: ScopeTree::new(options),
        }
    }

    /// 根作用域标识
    pub fn root(&self) -> ScopeId {
        ScopeTree::root()
    }

    /// 根作用域句柄
    pub fn root_scope(&mut self) -> Scope<'_> {
        Scope::new(&mut self.tree, ScopeTree::root())
    }

    /// 作用域句柄
    pub fn scope(&mut self, id: ScopeId) -> DigResult<Scope<'_>> {
        if !self.tree.contains(id) {
            return Err(DigError::ScopeNotFound { id: id.index() });
        }
        Ok(Scope::new(&mut self.tree, id))
    }

    /// 在 `parent` 下创建子作用域
    ///
    /// 内存开销见 [`Scope::child`]。
    pub fn child(&mut self, parent: ScopeId, name: impl Into<String>) -> DigResult<ScopeId> {
        Ok(self.scope(parent)?.child(name))
    }

    /// 作用域数量，包含根作用域
    pub fn scope_count(&self) -> usize {
        self.tree.scopes.len()
    }

    /// 向根作用域注册生产者
    #[track_caller]
    pub fn provide<F, Args>(&mut self, producer: F, options: ProvideOptions) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        self.root_scope().provide(producer, options)
    }

    /// 在根作用域中批量注册
    pub fn provide_all<B>(&mut self, build: B) -> DigResult<()>
    where
        B: FnOnce(&mut Batch<'_>) -> DigResult<()>,
    {
        self.root_scope().provide_all(build)
    }

    /// 在根作用域中注册装饰器
    #[track_caller]
    pub fn decorate<F, Args>(&mut self, decorator: F, options: DecorateOptions) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        self.root_scope().decorate(decorator, options)
    }

    /// 在根作用域中调用函数
    #[track_caller]
    pub fn invoke<F, Args>(&mut self, function: F, options: InvokeOptions) -> DigResult<F::Output>
    where
        F: Producer<Args>,
    {
        self.root_scope().invoke(function, options)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("scopes", &self.tree.scopes.len())
            .field("constructors", &self.tree.nodes.len())
            .field("decorators", &self.tree.decorators.len())
            .finish()
    }
}
