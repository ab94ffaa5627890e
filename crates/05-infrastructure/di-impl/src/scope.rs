//! 作用域句柄
//!
//! [`Scope`] 是对容器中某个作用域的可变借用，提供注册、装饰、调用和创建子作用域的操作。
//! 同一时刻只能持有一个句柄，解析过程中不可能重入容器。

use crate::node::{ErasedProducer, ScopeId};
use crate::options::{DecorateOptions, InvokeOptions, ProvideOptions, ScopePolicy};
use crate::recover::panic_message;
use crate::resolve::{notify, Resolver};
use crate::tree::{Checkpoint, DecoratorRegistration, Registration, ScopeTree};
use crate::verify::introduces_cycle;
use di_abstractions::{
    CallError, DigError, DigResult, Key, Location, ParamSpec, Producer, ResultOptions, ResultSpec,
    Results,
};
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// 容器中某个作用域的句柄
pub struct Scope<'c> {
    tree: &'c mut ScopeTree,
    id: ScopeId,
}

impl<'c> Scope<'c> {
    pub(crate) fn new(tree: &'c mut ScopeTree, id: ScopeId) -> Self {
        Self { tree, id }
    }

    /// 作用域标识
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// 作用域名称，根作用域为空字符串
    pub fn name(&self) -> &str {
        &self.tree.scope(self.id).name
    }

    /// 父作用域
    pub fn parent(&self) -> Option<ScopeId> {
        self.tree.scope(self.id).parent
    }

    /// 直接子作用域，按创建顺序
    pub fn children(&self) -> &[ScopeId] {
        &self.tree.scope(self.id).children
    }

    /// 继承自容器或父作用域的策略
    pub fn policy(&self) -> ScopePolicy {
        self.tree.scope(self.id).policy
    }

    /// 依赖图中的节点数量
    pub fn graph_order(&self) -> usize {
        self.tree.scope(self.id).graph.order()
    }

    /// 依赖图是否已校验为无环
    pub fn is_verified_acyclic(&self) -> bool {
        self.tree.scope(self.id).verified
    }

    /// 从本作用域能否找到 `key` 的生产者
    pub fn has_provider(&self, key: &Key) -> bool {
        !self.tree.visible_providers(self.id, key).is_empty()
    }

    /// 创建子作用域
    ///
    /// 子作用域复制父作用域的依赖图，并在每个可见节点上登记自己的下标。
    /// 作用域没有销毁操作，占用的内存随容器一起释放；按请求创建子作用域时，
    /// 内存随请求数线性增长，应为每批请求使用新的容器。
    pub fn child(&mut self, name: impl Into<String>) -> ScopeId {
        self.tree.new_child(self.id, name.into())
    }

    /// 注册生产者
    ///
    /// 生产者在第一次被需要时运行且最多运行一次。未推迟环检测时，
    /// 引入循环的注册会被完整撤销并返回循环错误。
    #[track_caller]
    pub fn provide<F, Args>(&mut self, producer: F, options: ProvideOptions) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        // 在闭包外取调用位置
        let location = match options.location.clone() {
            Some(location) => location,
            None => Location::caller::<F>(),
        };
        self.provide_all(move |batch| batch.provide_at(producer, options, location))
    }

    /// 在一个事务中注册多个生产者，任何一个失败都会撤销全部注册
    pub fn provide_all<B>(&mut self, build: B) -> DigResult<()>
    where
        B: FnOnce(&mut Batch<'_>) -> DigResult<()>,
    {
        let checkpoint = self.tree.checkpoint();
        let mut batch = Batch {
            tree: &mut *self.tree,
            scope: self.id,
            checkpoint,
            failed: false,
        };
        let outcome = build(&mut batch);
        let Batch {
            checkpoint, failed, ..
        } = batch;

        match outcome {
            Err(err) => {
                self.tree.rollback(checkpoint);
                Err(err)
            }
            Ok(()) if failed => {
                self.tree.rollback(checkpoint);
                Err(DigError::invalid_input("批量注册中有注册失败，已撤销全部注册"))
            }
            Ok(()) => Ok(()),
        }
    }

    /// 注册装饰器，覆盖本作用域及其后代看到的值
    #[track_caller]
    pub fn decorate<F, Args>(&mut self, decorator: F, options: DecorateOptions) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        let location = Location::caller::<F>();
        let params = F::param_list()?;
        let results = collect_results::<F::Output>(&ResultOptions::default())?;
        self.tree.register_decorator(
            self.id,
            DecoratorRegistration {
                decorator: erase(decorator),
                params,
                results,
                location,
                callback: options.callback,
            },
        )?;
        Ok(())
    }

    /// 解析参数并调用函数，返回函数的结果
    #[track_caller]
    pub fn invoke<F, Args>(&mut self, function: F, options: InvokeOptions) -> DigResult<F::Output>
    where
        F: Producer<Args>,
    {
        let location = Location::caller::<F>();
        let params = F::param_list()?;

        if !self.tree.scope(self.id).verified {
            debug!("调用前校验作用域 {:?} 的依赖图", self.name());
            self.tree.verify_scope(self.id, None)?;
        }
        self.tree.reset_transient_state();

        if !self.policy().recover_from_panics {
            return invoke_in(self.tree, self.id, &function, &params, &location, &options);
        }

        let tree = &mut *self.tree;
        let id = self.id;
        let caught = panic::catch_unwind(AssertUnwindSafe(|| {
            invoke_in(tree, id, &function, &params, &location, &options)
        }));
        caught.unwrap_or_else(|payload| {
            let location = self.tree.running.last().cloned();
            let payload = panic_message(payload.as_ref());
            warn!("调用过程中发生 panic，已恢复: {}", payload);
            self.tree.reset_transient_state();
            Err(DigError::RecoveredFault { location, payload })
        })
    }
}

fn invoke_in<F, Args>(
    tree: &mut ScopeTree,
    scope: ScopeId,
    function: &F,
    params: &[ParamSpec],
    location: &Location,
    options: &InvokeOptions,
) -> DigResult<F::Output>
where
    F: Producer<Args>,
{
    let mut args = Resolver::new(tree, scope).resolve_params(scope, params, location)?;

    let started = tree.clock.now();
    tree.running.push(location.clone());
    let produced = function.produce(&mut args);
    tree.running.pop();
    let runtime = tree.clock.now().saturating_duration_since(started);

    let result = produced.map_err(|err| match err {
        CallError::Arguments(err) => err,
        CallError::Failed(source) => DigError::InvokeFailed {
            location: location.clone(),
            source,
        },
    });
    notify(options.callback.as_ref(), location, result.as_ref().err(), runtime);
    result
}

/// 事务中的批量注册
pub struct Batch<'s> {
    tree: &'s mut ScopeTree,
    scope: ScopeId,
    checkpoint: Checkpoint,
    failed: bool,
}

impl Batch<'_> {
    /// 在事务中注册生产者
    #[track_caller]
    pub fn provide<F, Args>(&mut self, producer: F, options: ProvideOptions) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        let location = match options.location.clone() {
            Some(location) => location,
            None => Location::caller::<F>(),
        };
        self.provide_at(producer, options, location)
    }

    fn provide_at<F, Args>(
        &mut self,
        producer: F,
        options: ProvideOptions,
        location: Location,
    ) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        let result = self.register(producer, options, location);
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn register<F, Args>(
        &mut self,
        producer: F,
        options: ProvideOptions,
        location: Location,
    ) -> DigResult<()>
    where
        F: Producer<Args> + Send + Sync + 'static,
        F::Output: Results,
        Args: 'static,
    {
        if F::Output::OBJECT
            && (options.name.is_some() || options.group.is_some() || !options.as_types.is_empty())
        {
            return Err(DigError::invalid_input(format!(
                "{location} 返回结果对象，不能再指定 name、group 或 as 选项"
            )));
        }
        let params = F::param_list()?;
        let results = collect_results::<F::Output>(&ResultOptions {
            name: options.name,
            group: options.group,
            as_types: options.as_types,
        })
        .map_err(|err| DigError::invalid_input_caused_by(format!("无法注册 {location}"), err))?;

        let node = self.tree.register(
            self.scope,
            Registration {
                producer: erase(producer),
                params,
                results,
                location,
                export: options.export,
                callback: options.callback,
            },
            &mut self.checkpoint,
        )?;

        let target = self.tree.nodes[node.0].scope;
        let affected = self.tree.subtree(target);
        if self.tree.scope(self.scope).policy.defer_acyclic_verification {
            for scope in affected {
                self.tree.scopes[scope.0].verified = false;
            }
            return Ok(());
        }
        for scope in affected {
            let mark = self.tree.scope(scope).graph.snapshot_mark();
            self.tree.verify_scope(scope, mark).map_err(introduces_cycle)?;
        }
        Ok(())
    }
}

fn collect_results<R: Results>(options: &ResultOptions) -> DigResult<Vec<ResultSpec>> {
    let mut specs = Vec::new();
    R::collect(options, &mut specs)?;
    if specs.is_empty() {
        return Err(DigError::invalid_input(format!(
            "{} 不提供任何结果，至少需要一个返回值",
            std::any::type_name::<R>()
        )));
    }
    Ok(specs)
}

fn erase<F, Args>(producer: F) -> ErasedProducer
where
    F: Producer<Args> + Send + Sync + 'static,
    F::Output: Results,
    Args: 'static,
{
    Box::new(move |args| {
        let output = producer.produce(args)?;
        let mut values = Vec::new();
        output.into_values(&mut values);
        Ok(values)
    })
}
