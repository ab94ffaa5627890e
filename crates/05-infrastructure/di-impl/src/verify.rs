//! 作用域依赖图的环检测
//!
//! 边在检测时按当前注册表动态计算：构造函数节点的边指向其参数在
//! 注册作用域中可见的生产者，值组参数节点的边指向作用域链上所有贡献者
//! （软值组没有边）。只映射到被检测作用域中存在的节点。

use crate::node::{GraphNode, NodeId, ScopeId};
use crate::tree::ScopeTree;
use di_abstractions::{find_cycle, find_cycle_from, DigError, DigResult, Graph, Key, ParamSpec};
use di_common::{CyclePath, CyclePathEntry};
use tracing::debug;

/// 以某个作用域的视角看依赖图
pub(crate) struct ScopeGraph<'t> {
    tree: &'t ScopeTree,
    scope: ScopeId,
}

impl<'t> ScopeGraph<'t> {
    pub(crate) fn new(tree: &'t ScopeTree, scope: ScopeId) -> Self {
        Self { tree, scope }
    }

    fn order_of(&self, node: NodeId) -> Option<usize> {
        self.tree.nodes[node.0].orders.get(&self.scope).copied()
    }
}

impl Graph for ScopeGraph<'_> {
    fn order(&self) -> usize {
        self.tree.scope(self.scope).graph.order()
    }

    fn edges_from(&self, index: usize) -> Vec<usize> {
        match self.tree.scope(self.scope).graph.lookup(index) {
            Some(GraphNode::Constructor(id)) => {
                let node = &self.tree.nodes[id.0];
                let mut groups = node.group_params.iter();
                let mut edges = Vec::new();
                for param in &node.params {
                    match param {
                        ParamSpec::Single { key, .. } => edges.extend(
                            self.tree
                                .visible_providers(node.orig_scope, key)
                                .iter()
                                .filter_map(|&provider| self.order_of(provider)),
                        ),
                        ParamSpec::Group { .. } => {
                            let order = groups.next().and_then(|group| {
                                self.tree.group_params[group.0].orders.get(&self.scope).copied()
                            });
                            edges.extend(order);
                        }
                    }
                }
                edges
            }
            Some(GraphNode::Group(id)) => {
                let group = &self.tree.group_params[id.0];
                if group.soft {
                    return Vec::new();
                }
                self.tree
                    .group_providers(group.orig_scope, &group.key)
                    .into_iter()
                    .filter_map(|provider| self.order_of(provider))
                    .collect()
            }
            None => Vec::new(),
        }
    }
}

impl ScopeTree {
    /// 校验作用域依赖图无环，成功后标记为已校验
    ///
    /// 作用域已校验过且给出了新增节点的起始下标时，只从新增节点出发搜索；
    /// 发现环后再做一次完整搜索，以得到按下标顺序确定的环路径。
    pub(crate) fn verify_scope(&mut self, scope: ScopeId, new_from: Option<usize>) -> DigResult<()> {
        let cycle = {
            let graph = ScopeGraph::new(self, scope);
            let incremental = new_from.filter(|_| self.scopes[scope.0].verified);
            match incremental {
                Some(start) if find_cycle_from(&graph, start..graph.order()).is_none() => None,
                _ => find_cycle(&graph),
            }
        };

        match cycle {
            None => {
                self.scopes[scope.0].verified = true;
                Ok(())
            }
            Some(cycle) => {
                debug!("作用域 {:?} 的依赖图存在循环: {:?}", self.scopes[scope.0].name, cycle);
                Err(self.cycle_error(scope, &cycle))
            }
        }
    }

    fn cycle_error(&self, scope: ScopeId, cycle: &[usize]) -> DigError {
        let graph = &self.scopes[scope.0].graph;
        let entries = cycle
            .iter()
            .filter_map(|&index| match graph.lookup(index) {
                Some(GraphNode::Constructor(id)) => Some(self.path_entry(id)),
                _ => None,
            })
            .collect();
        DigError::CycleDetected(CyclePath {
            scope: self.scopes[scope.0].name.clone(),
            entries,
        })
    }

    pub(crate) fn path_entry(&self, id: NodeId) -> CyclePathEntry {
        let node = &self.nodes[id.0];
        CyclePathEntry {
            key: node.primary_key().cloned().unwrap_or_else(Key::of::<()>),
            location: node.location.clone(),
        }
    }
}

/// 注册引入循环时返回的错误
pub(crate) fn introduces_cycle(cause: DigError) -> DigError {
    DigError::invalid_input_caused_by("该函数引入了依赖循环", cause)
}
