//! 依赖解析
//!
//! 一次调用对应一个解析轮次。解析键 K 时从请求作用域向根查找，在每个作用域中
//! 依次检查：装饰后的值、尚未运行的装饰器、已缓存的值、本作用域的生产者。
//! 轮次内维护构造函数调用栈，重入同一节点视为循环。

use crate::node::{DecoratorId, DecoratorState, NodeId, ScopeId};
use crate::tree::ScopeTree;
use di_abstractions::{
    Argument, Arguments, CallError, Callback, CallbackInfo, DigError, DigResult, Key, Location,
    ParamSpec, Value,
};
use di_common::CyclePath;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// 单次解析轮次
pub(crate) struct Resolver<'t> {
    tree: &'t mut ScopeTree,
    stack: Vec<NodeId>,
    rng: Option<StdRng>,
    /// 轮次内每个值组使用同一个排列
    permutations: HashMap<Key, Vec<usize>>,
}

impl<'t> Resolver<'t> {
    pub(crate) fn new(tree: &'t mut ScopeTree, scope: ScopeId) -> Self {
        tree.passes += 1;
        let rng = tree.scopes[scope.0]
            .policy
            .group_order_seed
            .map(|seed| StdRng::seed_from_u64(seed.wrapping_add(tree.passes)));
        Self {
            tree,
            stack: Vec::new(),
            rng,
            permutations: HashMap::new(),
        }
    }

    /// 按参数列表顺序解析全部实参
    pub(crate) fn resolve_params(
        &mut self,
        scope: ScopeId,
        params: &[ParamSpec],
        requested_by: &Location,
    ) -> DigResult<Arguments> {
        let mut items = Vec::with_capacity(params.len());
        for param in params {
            let argument = match param {
                ParamSpec::Single { key, optional } => {
                    self.resolve_single(scope, key, *optional, requested_by)?
                }
                ParamSpec::Group { key, soft } => self.resolve_group(scope, key, *soft)?,
            };
            items.push((param.key().clone(), argument));
        }
        Ok(Arguments::new(items))
    }

    fn resolve_single(
        &mut self,
        scope: ScopeId,
        key: &Key,
        optional: bool,
        requested_by: &Location,
    ) -> DigResult<Argument> {
        for current in self.tree.chain(scope) {
            if let Some(value) = self.decorated_value(current, key)? {
                return Ok(Argument::Value(value));
            }

            let data = &self.tree.scopes[current.0];
            if let Some(value) = data.values.get(key) {
                return Ok(Argument::Value(value.clone()));
            }

            let Some(&provider) = data.providers.get(key).and_then(|ids| ids.first()) else {
                continue;
            };
            self.call_node(provider)?;
            let owner = self.tree.nodes[provider.0].scope;
            return self.tree.scopes[owner.0]
                .values
                .get(key)
                .cloned()
                .map(Argument::Value)
                .ok_or_else(|| DigError::TypeMismatch {
                    key: key.clone(),
                    expected: key.type_info.name,
                });
        }

        if optional {
            return Ok(Argument::Missing);
        }
        Err(DigError::NotFound {
            key: key.clone(),
            requested_by: Some(requested_by.clone()),
            scope: self.tree.scopes[scope.0].name.clone(),
        })
    }

    /// 作用域 `scope` 中 `key` 的装饰结果；装饰器尚未运行时先运行
    fn decorated_value(&mut self, scope: ScopeId, key: &Key) -> DigResult<Option<Value>> {
        let data = &self.tree.scopes[scope.0];
        if let Some(value) = data.decorated_values.get(key) {
            return Ok(Some(value.clone()));
        }
        let Some(&decorator) = data.decorators.get(key) else {
            return Ok(None);
        };
        if self.tree.decorators[decorator.0].state != DecoratorState::Ready {
            // 正在运行的装饰器看到的是未装饰的值
            return Ok(None);
        }
        self.call_decorator(decorator)?;
        Ok(self.tree.scopes[scope.0].decorated_values.get(key).cloned())
    }

    fn decorated_group(&mut self, scope: ScopeId, key: &Key) -> DigResult<Option<Vec<Value>>> {
        let data = &self.tree.scopes[scope.0];
        if let Some(values) = data.decorated_groups.get(key) {
            return Ok(Some(values.clone()));
        }
        let Some(&decorator) = data.decorators.get(key) else {
            return Ok(None);
        };
        if self.tree.decorators[decorator.0].state != DecoratorState::Ready {
            return Ok(None);
        }
        self.call_decorator(decorator)?;
        Ok(self.tree.scopes[scope.0].decorated_groups.get(key).cloned())
    }

    fn resolve_group(&mut self, scope: ScopeId, key: &Key, soft: bool) -> DigResult<Argument> {
        for current in self.tree.chain(scope) {
            if let Some(values) = self.decorated_group(current, key)? {
                return Ok(Argument::Group(values));
            }
        }

        let providers = self.tree.group_providers(scope, key);
        if !soft {
            for &provider in &providers {
                self.call_node(provider)?;
            }
        }

        let mut items = Vec::new();
        for provider in providers {
            let owner = self.tree.nodes[provider.0].scope;
            if let Some(entries) = self.tree.scopes[owner.0].groups.get(key) {
                for entry in entries.iter().filter(|entry| entry.node == provider) {
                    items.extend(entry.values.iter().cloned());
                }
            }
        }
        self.shuffle(key, &mut items);
        Ok(Argument::Group(items))
    }

    fn shuffle(&mut self, key: &Key, items: &mut Vec<Value>) {
        let Some(rng) = self.rng.as_mut() else {
            return;
        };
        let permutation = self.permutations.entry(key.clone()).or_default();
        if permutation.len() != items.len() {
            *permutation = (0..items.len()).collect();
            permutation.shuffle(rng);
        }
        let original = std::mem::take(items);
        items.extend(permutation.iter().map(|&index| original[index].clone()));
    }

    /// 运行构造函数（最多一次）
    fn call_node(&mut self, id: NodeId) -> DigResult<()> {
        let node = &self.tree.nodes[id.0];
        if node.called {
            return Ok(());
        }
        if let Some(start) = self.stack.iter().position(|&entry| entry == id) {
            return Err(self.runtime_cycle(start, id));
        }

        let orig_scope = node.orig_scope;
        let params = node.params.clone();
        let location = node.location.clone();

        self.stack.push(id);
        let outcome = self.run_node(id, orig_scope, &params, &location);
        self.stack.pop();
        outcome
    }

    fn run_node(
        &mut self,
        id: NodeId,
        orig_scope: ScopeId,
        params: &[ParamSpec],
        location: &Location,
    ) -> DigResult<()> {
        let mut args = self.resolve_params(orig_scope, params, location)?;
        debug!("调用构造函数 {}", location);

        let (produced, runtime) = self.timed(location, |tree| (tree.nodes[id.0].producer)(&mut args));
        let result = match produced {
            Ok(values) => self.tree.store_results(id, values),
            Err(err) => Err(producer_error(err, location)),
        };

        let callback = self.tree.nodes[id.0].callback.clone();
        notify(callback.as_ref(), location, result.as_ref().err(), runtime);
        result
    }

    /// 运行装饰器；失败时恢复为可重新运行
    fn call_decorator(&mut self, id: DecoratorId) -> DigResult<()> {
        let decorator = &mut self.tree.decorators[id.0];
        decorator.state = DecoratorState::OnStack;
        let scope = decorator.scope;
        let params = decorator.params.clone();
        let location = decorator.location.clone();

        let outcome = self.run_decorator(id, scope, &params, &location);
        self.tree.decorators[id.0].state = if outcome.is_ok() {
            DecoratorState::Called
        } else {
            DecoratorState::Ready
        };
        outcome
    }

    fn run_decorator(
        &mut self,
        id: DecoratorId,
        scope: ScopeId,
        params: &[ParamSpec],
        location: &Location,
    ) -> DigResult<()> {
        let mut args = self.resolve_params(scope, params, location)?;
        debug!("调用装饰器 {}", location);

        let (produced, runtime) =
            self.timed(location, |tree| (tree.decorators[id.0].decorator)(&mut args));
        let result = match produced {
            Ok(values) => self.tree.store_decorated(id, values),
            Err(err) => Err(producer_error(err, location)),
        };

        let callback = self.tree.decorators[id.0].callback.clone();
        notify(callback.as_ref(), location, result.as_ref().err(), runtime);
        result
    }

    /// 计时运行，并在运行期间登记位置供 panic 恢复使用
    fn timed<T>(&mut self, location: &Location, run: impl FnOnce(&ScopeTree) -> T) -> (T, Duration) {
        let started = self.tree.clock.now();
        self.tree.running.push(location.clone());
        let output = run(&*self.tree);
        self.tree.running.pop();
        let runtime = self.tree.clock.now().saturating_duration_since(started);
        (output, runtime)
    }

    fn runtime_cycle(&self, start: usize, id: NodeId) -> DigError {
        let mut entries: Vec<_> = self.stack[start..]
            .iter()
            .map(|&node| self.tree.path_entry(node))
            .collect();
        entries.push(self.tree.path_entry(id));
        let scope = self.tree.nodes[id.0].scope;
        DigError::CycleDetected(CyclePath {
            scope: self.tree.scopes[scope.0].name.clone(),
            entries,
        })
    }
}

fn producer_error(err: CallError, location: &Location) -> DigError {
    match err {
        CallError::Arguments(err) => err,
        CallError::Failed(source) => DigError::ProducerFailed {
            location: location.clone(),
            source,
        },
    }
}

/// 触发完成回调
pub(crate) fn notify(
    callback: Option<&Callback>,
    location: &Location,
    error: Option<&DigError>,
    runtime: Duration,
) {
    if let Some(callback) = callback {
        let name = location.qualified_name();
        callback(&CallbackInfo {
            name: &name,
            error: error.map(|err| err as &(dyn std::error::Error + 'static)),
            runtime,
        });
    }
}
