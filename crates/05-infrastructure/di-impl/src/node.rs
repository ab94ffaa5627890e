//! 构造函数节点、值组参数节点与装饰器
//!
//! 节点保存在容器级的数组中，作用域和依赖图只保存下标。

use di_abstractions::{Arguments, Callback, CallError, Key, Location, ParamList, ResultSpec, Value};
use std::collections::HashMap;
use std::fmt;

/// 作用域标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) usize);

impl ScopeId {
    /// 数组下标
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GroupParamId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct DecoratorId(pub(crate) usize);

/// 依赖图中的节点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GraphNode {
    Constructor(NodeId),
    Group(GroupParamId),
}

/// 类型擦除的生产者调用
pub(crate) type ErasedProducer = Box<dyn Fn(&mut Arguments) -> Result<Vec<Value>, CallError> + Send + Sync>;

/// 已注册的生产者
pub(crate) struct ConstructorNode {
    pub(crate) producer: ErasedProducer,
    pub(crate) params: ParamList,
    /// 每个值组参数对应的节点，按参数出现顺序
    pub(crate) group_params: Vec<GroupParamId>,
    pub(crate) results: Vec<ResultSpec>,
    pub(crate) location: Location,
    /// 只在成功运行后置位
    pub(crate) called: bool,
    /// 结果登记所在的作用域（导出时为根作用域）
    pub(crate) scope: ScopeId,
    /// 注册时的作用域，参数从这里开始解析
    pub(crate) orig_scope: ScopeId,
    /// 在各作用域依赖图中的下标
    pub(crate) orders: HashMap<ScopeId, usize>,
    pub(crate) callback: Option<Callback>,
}

impl ConstructorNode {
    /// 诊断中代表该节点的键：第一个结果的第一个目标
    pub(crate) fn primary_key(&self) -> Option<&Key> {
        self.results.first().and_then(|spec| spec.keys().next())
    }

    pub(crate) fn result_keys(&self) -> impl Iterator<Item = &Key> {
        self.results.iter().flat_map(ResultSpec::keys)
    }
}

impl fmt::Debug for ConstructorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorNode")
            .field("location", &self.location)
            .field("params", &self.params)
            .field("results", &self.results)
            .field("called", &self.called)
            .field("scope", &self.scope)
            .field("orig_scope", &self.orig_scope)
            .finish_non_exhaustive()
    }
}

/// 值组参数节点，边指向所有贡献该值组的生产者
#[derive(Debug)]
pub(crate) struct GroupParamNode {
    pub(crate) key: Key,
    pub(crate) soft: bool,
    pub(crate) orig_scope: ScopeId,
    pub(crate) orders: HashMap<ScopeId, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecoratorState {
    Ready,
    OnStack,
    Called,
}

/// 已注册的装饰器，不进入依赖图
pub(crate) struct DecoratorNode {
    pub(crate) decorator: ErasedProducer,
    pub(crate) params: ParamList,
    pub(crate) results: Vec<ResultSpec>,
    pub(crate) location: Location,
    pub(crate) scope: ScopeId,
    pub(crate) state: DecoratorState,
    pub(crate) callback: Option<Callback>,
}

impl fmt::Debug for DecoratorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorNode")
            .field("location", &self.location)
            .field("params", &self.params)
            .field("results", &self.results)
            .field("scope", &self.scope)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
