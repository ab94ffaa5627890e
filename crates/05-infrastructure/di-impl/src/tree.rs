//! 作用域树与注册表
//!
//! 容器内的全部状态都在 [`ScopeTree`] 中：作用域数组、构造函数节点数组、
//! 值组参数节点数组和装饰器数组。作用域通过父下标链接成树，根作用域下标为 0。

use crate::graph_holder::GraphHolder;
use crate::node::{
    ConstructorNode, DecoratorId, DecoratorNode, DecoratorState, ErasedProducer, GraphNode,
    GroupParamId, GroupParamNode, NodeId, ScopeId,
};
use crate::options::{ContainerOptions, ScopePolicy};
use di_abstractions::{
    Callback, DigError, DigResult, Key, Location, ParamList, ParamSpec, ResultSpec, ResultTarget,
    TimeSource, Value,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 某个生产者对值组的一次贡献
#[derive(Clone)]
pub(crate) struct GroupEntry {
    pub(crate) node: NodeId,
    pub(crate) values: Vec<Value>,
}

/// 单个作用域的注册表与缓存
pub(crate) struct ScopeData {
    pub(crate) name: String,
    pub(crate) parent: Option<ScopeId>,
    pub(crate) children: Vec<ScopeId>,
    /// 本作用域登记的生产者，按注册顺序
    pub(crate) providers: HashMap<Key, Vec<NodeId>>,
    pub(crate) decorators: HashMap<Key, DecoratorId>,
    /// 已生产的单值
    pub(crate) values: HashMap<Key, Value>,
    /// 已生产的值组贡献，按生产顺序
    pub(crate) groups: HashMap<Key, Vec<GroupEntry>>,
    pub(crate) decorated_values: HashMap<Key, Value>,
    pub(crate) decorated_groups: HashMap<Key, Vec<Value>>,
    pub(crate) graph: GraphHolder<GraphNode>,
    pub(crate) verified: bool,
    pub(crate) policy: ScopePolicy,
}

impl ScopeData {
    fn new(
        name: String,
        parent: Option<ScopeId>,
        policy: ScopePolicy,
        graph: GraphHolder<GraphNode>,
        verified: bool,
    ) -> Self {
        Self {
            name,
            parent,
            children: Vec::new(),
            providers: HashMap::new(),
            decorators: HashMap::new(),
            values: HashMap::new(),
            groups: HashMap::new(),
            decorated_values: HashMap::new(),
            decorated_groups: HashMap::new(),
            graph,
            verified,
            policy,
        }
    }
}

/// 待登记的生产者
pub(crate) struct Registration {
    pub(crate) producer: ErasedProducer,
    pub(crate) params: ParamList,
    pub(crate) results: Vec<ResultSpec>,
    pub(crate) location: Location,
    pub(crate) export: bool,
    pub(crate) callback: Option<Callback>,
}

/// 待登记的装饰器
pub(crate) struct DecoratorRegistration {
    pub(crate) decorator: ErasedProducer,
    pub(crate) params: ParamList,
    pub(crate) results: Vec<ResultSpec>,
    pub(crate) location: Location,
    pub(crate) callback: Option<Callback>,
}

/// 事务检查点：回滚时撤销检查点之后的全部登记
#[derive(Debug)]
pub(crate) struct Checkpoint {
    nodes: usize,
    group_params: usize,
    verified: Vec<bool>,
    registered: Vec<(ScopeId, Key)>,
}

/// 容器的全部状态
pub(crate) struct ScopeTree {
    pub(crate) scopes: Vec<ScopeData>,
    pub(crate) nodes: Vec<ConstructorNode>,
    pub(crate) group_params: Vec<GroupParamNode>,
    pub(crate) decorators: Vec<DecoratorNode>,
    pub(crate) clock: Arc<dyn TimeSource>,
    /// 正在运行的函数位置，panic 时取最内层
    pub(crate) running: Vec<Location>,
    /// 已开始的解析轮次
    pub(crate) passes: u64,
}

impl ScopeTree {
    pub(crate) fn new(options: ContainerOptions) -> Self {
        info!("创建依赖注入容器: {:?}", options.policy);
        let root = ScopeData::new(String::new(), None, options.policy, GraphHolder::new(), true);
        Self {
            scopes: vec![root],
            nodes: Vec::new(),
            group_params: Vec::new(),
            decorators: Vec::new(),
            clock: options.clock,
            running: Vec::new(),
            passes: 0,
        }
    }

    pub(crate) const fn root() -> ScopeId {
        ScopeId(0)
    }

    pub(crate) fn contains(&self, id: ScopeId) -> bool {
        id.0 < self.scopes.len()
    }

    pub(crate) fn scope(&self, id: ScopeId) -> &ScopeData {
        &self.scopes[id.0]
    }

    /// 创建子作用域，继承父作用域的策略、依赖图节点和校验状态
    pub(crate) fn new_child(&mut self, parent: ScopeId, name: String) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        let parent_data = &self.scopes[parent.0];
        let data = ScopeData::new(
            name,
            Some(parent),
            parent_data.policy,
            GraphHolder::inherit(&parent_data.graph),
            parent_data.verified,
        );

        for (index, node) in data.graph.nodes().iter().enumerate() {
            match *node {
                GraphNode::Constructor(node) => {
                    self.nodes[node.0].orders.insert(id, index);
                }
                GraphNode::Group(group) => {
                    self.group_params[group.0].orders.insert(id, index);
                }
            }
        }

        info!(
            "创建子作用域 {:?} (父作用域 {:?})",
            data.name, self.scopes[parent.0].name
        );
        self.scopes[parent.0].children.push(id);
        self.scopes.push(data);
        id
    }

    /// 从 `from` 到根的作用域链，`from` 在前
    pub(crate) fn chain(&self, from: ScopeId) -> Vec<ScopeId> {
        let mut chain = Vec::new();
        let mut current = Some(from);
        while let Some(id) = current {
            chain.push(id);
            current = self.scopes[id.0].parent;
        }
        chain
    }

    /// `root` 及其全部后代，先序
    pub(crate) fn subtree(&self, root: ScopeId) -> Vec<ScopeId> {
        let mut order = Vec::new();
        let mut pending = vec![root];
        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.scopes[id.0].children.iter().rev().copied());
        }
        order
    }

    /// 从 `from` 向上第一个登记了 `key` 的作用域中的生产者
    pub(crate) fn visible_providers(&self, from: ScopeId, key: &Key) -> &[NodeId] {
        for id in self.chain(from) {
            if let Some(providers) = self.scopes[id.0].providers.get(key) {
                if !providers.is_empty() {
                    return providers;
                }
            }
        }
        &[]
    }

    /// 作用域链上所有贡献值组 `key` 的生产者，根作用域在前，去重
    pub(crate) fn group_providers(&self, from: ScopeId, key: &Key) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        self.chain(from)
            .into_iter()
            .rev()
            .filter_map(|id| self.scopes[id.0].providers.get(key))
            .flatten()
            .copied()
            .filter(|node| seen.insert(*node))
            .collect()
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        for scope in &mut self.scopes {
            scope.graph.snapshot();
        }
        Checkpoint {
            nodes: self.nodes.len(),
            group_params: self.group_params.len(),
            verified: self.scopes.iter().map(|scope| scope.verified).collect(),
            registered: Vec::new(),
        }
    }

    /// 撤销检查点之后的全部登记，恢复注册表、依赖图和校验状态
    pub(crate) fn rollback(&mut self, checkpoint: Checkpoint) {
        warn!(
            "回滚注册: 撤销 {} 个构造函数",
            self.nodes.len().saturating_sub(checkpoint.nodes)
        );
        for (scope, key) in checkpoint.registered.into_iter().rev() {
            let providers = &mut self.scopes[scope.0].providers;
            if let Some(ids) = providers.get_mut(&key) {
                ids.pop();
                if ids.is_empty() {
                    providers.remove(&key);
                }
            }
        }
        for (scope, verified) in self.scopes.iter_mut().zip(checkpoint.verified) {
            scope.graph.rollback();
            scope.verified = verified;
        }
        self.nodes.truncate(checkpoint.nodes);
        self.group_params.truncate(checkpoint.group_params);
    }

    /// 登记生产者并把节点追加到目标作用域及其后代的依赖图
    pub(crate) fn register(
        &mut self,
        scope: ScopeId,
        registration: Registration,
        checkpoint: &mut Checkpoint,
    ) -> DigResult<NodeId> {
        let target = if registration.export {
            Self::root()
        } else {
            scope
        };
        self.check_ambiguity(target, &registration.results, &registration.location)?;

        let id = NodeId(self.nodes.len());
        let affected = self.subtree(target);

        let mut group_params = Vec::new();
        for param in &registration.params {
            if let ParamSpec::Group { key, soft } = param {
                let group = GroupParamId(self.group_params.len());
                let orders = affected
                    .iter()
                    .map(|&s| (s, self.scopes[s.0].graph.new_node(GraphNode::Group(group))))
                    .collect();
                self.group_params.push(GroupParamNode {
                    key: key.clone(),
                    soft: *soft,
                    orig_scope: scope,
                    orders,
                });
                group_params.push(group);
            }
        }

        let orders = affected
            .iter()
            .map(|&s| (s, self.scopes[s.0].graph.new_node(GraphNode::Constructor(id))))
            .collect();

        let node = ConstructorNode {
            producer: registration.producer,
            params: registration.params,
            group_params,
            results: registration.results,
            location: registration.location,
            called: false,
            scope: target,
            orig_scope: scope,
            orders,
            callback: registration.callback,
        };

        let keys: Vec<Key> = node.result_keys().cloned().collect();
        debug!(
            "注册构造函数 {} 到作用域 {:?}，提供 {} 个键",
            node.location,
            self.scopes[target.0].name,
            keys.len()
        );
        self.nodes.push(node);

        let providers = &mut self.scopes[target.0].providers;
        for key in keys {
            providers.entry(key.clone()).or_default().push(id);
            checkpoint.registered.push((target, key));
        }
        Ok(id)
    }

    fn check_ambiguity(&self, target: ScopeId, results: &[ResultSpec], location: &Location) -> DigResult<()> {
        let scope = &self.scopes[target.0];
        let mut seen = HashSet::new();
        for key in results.iter().flat_map(ResultSpec::keys) {
            if key.is_group() {
                continue;
            }
            if !seen.insert(key) {
                return Err(DigError::AmbiguousProvider {
                    key: key.clone(),
                    existing: location.clone(),
                    scope: scope.name.clone(),
                });
            }
            if let Some(existing) = scope.providers.get(key).and_then(|ids| ids.first()) {
                return Err(DigError::AmbiguousProvider {
                    key: key.clone(),
                    existing: self.nodes[existing.0].location.clone(),
                    scope: scope.name.clone(),
                });
            }
        }
        Ok(())
    }

    /// 登记装饰器；装饰器不进入依赖图
    pub(crate) fn register_decorator(
        &mut self,
        scope: ScopeId,
        registration: DecoratorRegistration,
    ) -> DigResult<DecoratorId> {
        let data = &self.scopes[scope.0];
        let mut seen = HashSet::new();
        for spec in &registration.results {
            for key in spec.keys() {
                if key.is_group() && spec.split.is_none() {
                    return Err(DigError::invalid_input(format!(
                        "装饰值组 {key} 需要返回带 flatten 选项的序列"
                    )));
                }
                if !seen.insert(key) || data.decorators.contains_key(key) {
                    return Err(DigError::invalid_input(format!(
                        "{key} 已在作用域 {:?} 中被装饰",
                        data.name
                    )));
                }
                if !key.is_group() && self.visible_providers(scope, key).is_empty() {
                    return Err(DigError::NotFound {
                        key: key.clone(),
                        requested_by: Some(registration.location.clone()),
                        scope: data.name.clone(),
                    });
                }
            }
        }

        let id = DecoratorId(self.decorators.len());
        let keys: Vec<Key> = registration
            .results
            .iter()
            .flat_map(ResultSpec::keys)
            .cloned()
            .collect();
        debug!("注册装饰器 {} 到作用域 {:?}", registration.location, data.name);
        self.decorators.push(DecoratorNode {
            decorator: registration.decorator,
            params: registration.params,
            results: registration.results,
            location: registration.location,
            scope,
            state: DecoratorState::Ready,
            callback: registration.callback,
        });
        let decorators = &mut self.scopes[scope.0].decorators;
        for key in keys {
            decorators.insert(key, id);
        }
        Ok(id)
    }

    /// 保存构造函数的产出，并将节点标记为已调用
    pub(crate) fn store_results(&mut self, id: NodeId, values: Vec<Value>) -> DigResult<()> {
        let node = &self.nodes[id.0];
        let (singles, grouped) = expand_results(&node.results, values)?;

        let scope = &mut self.scopes[node.scope.0];
        scope.values.extend(singles);
        for (key, values) in grouped {
            scope.groups.entry(key).or_default().push(GroupEntry { node: id, values });
        }
        self.nodes[id.0].called = true;
        Ok(())
    }

    /// 保存装饰器的产出，值组整体替换
    pub(crate) fn store_decorated(&mut self, id: DecoratorId, values: Vec<Value>) -> DigResult<()> {
        let decorator = &self.decorators[id.0];
        let (singles, grouped) = expand_results(&decorator.results, values)?;

        let scope = &mut self.scopes[decorator.scope.0];
        scope.decorated_values.extend(singles);
        scope.decorated_groups.extend(grouped);
        Ok(())
    }

    /// 清理上一次调用中断后残留的运行状态
    pub(crate) fn reset_transient_state(&mut self) {
        self.running.clear();
        for decorator in &mut self.decorators {
            if decorator.state == DecoratorState::OnStack {
                decorator.state = DecoratorState::Ready;
            }
        }
    }
}

type Expanded = (Vec<(Key, Value)>, Vec<(Key, Vec<Value>)>);

/// 按结果描述展开、转换产出的值，分成单值和值组两部分
fn expand_results(results: &[ResultSpec], values: Vec<Value>) -> DigResult<Expanded> {
    if values.len() != results.len() {
        return Err(DigError::invalid_input(format!(
            "产出 {} 个值，但声明了 {} 个结果",
            values.len(),
            results.len()
        )));
    }

    let mut singles = Vec::new();
    let mut grouped = Vec::new();
    for (spec, value) in results.iter().zip(values) {
        let items = match &spec.split {
            Some(split) => split(&value).ok_or_else(|| mismatch(spec, "Vec<Arc<_>>"))?,
            None => vec![value],
        };
        for target in &spec.targets {
            let converted = items
                .iter()
                .map(|item| convert(target, item))
                .collect::<DigResult<Vec<_>>>()?;
            if target.key.is_group() {
                grouped.push((target.key.clone(), converted));
            } else if let Some(value) = converted.into_iter().next() {
                singles.push((target.key.clone(), value));
            }
        }
    }
    Ok((singles, grouped))
}

fn convert(target: &ResultTarget, item: &Value) -> DigResult<Value> {
    match &target.convert {
        Some(conversion) => conversion(item).ok_or_else(|| DigError::TypeMismatch {
            key: target.key.clone(),
            expected: target.key.type_info.name,
        }),
        None => Ok(Arc::clone(item)),
    }
}

fn mismatch(spec: &ResultSpec, expected: &'static str) -> DigError {
    let key = spec
        .keys()
        .next()
        .cloned()
        .unwrap_or_else(Key::of::<()>);
    DigError::TypeMismatch { key, expected }
}
