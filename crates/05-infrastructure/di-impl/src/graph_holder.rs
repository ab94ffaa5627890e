//! 作用域的依赖图节点列表
//!
//! 节点下标在作用域内稠密且稳定。快照记录当前长度，回滚时截断到快照长度。

/// 节点列表与快照标记
#[derive(Debug, Clone)]
pub(crate) struct GraphHolder<N> {
    nodes: Vec<N>,
    snapshot: Option<usize>,
}

impl<N: Copy> GraphHolder<N> {
    pub(crate) fn new() -> Self {
        Self {
            nodes: Vec::new(),
            snapshot: None,
        }
    }

    /// 复制节点列表（保持相同下标），不复制快照
    pub(crate) fn inherit(parent: &Self) -> Self {
        Self {
            nodes: parent.nodes.clone(),
            snapshot: None,
        }
    }

    /// 追加节点并返回其下标
    pub(crate) fn new_node(&mut self, node: N) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub(crate) fn lookup(&self, index: usize) -> Option<N> {
        self.nodes.get(index).copied()
    }

    pub(crate) fn order(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn nodes(&self) -> &[N] {
        &self.nodes
    }

    /// 记录当前长度，覆盖之前的快照
    pub(crate) fn snapshot(&mut self) {
        self.snapshot = Some(self.nodes.len());
    }

    /// 快照之后新增的第一个下标
    pub(crate) fn snapshot_mark(&self) -> Option<usize> {
        self.snapshot
    }

    /// 截断到快照长度并清除快照；没有快照时不做任何事
    pub(crate) fn rollback(&mut self) {
        if let Some(len) = self.snapshot.take() {
            self.nodes.truncate(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_dense() {
        let mut holder = GraphHolder::new();
        assert_eq!(holder.new_node('a'), 0);
        assert_eq!(holder.new_node('b'), 1);
        assert_eq!(holder.order(), 2);
        assert_eq!(holder.lookup(1), Some('b'));
        assert_eq!(holder.lookup(2), None);
    }

    #[test]
    fn test_rollback_truncates_to_snapshot() {
        let mut holder = GraphHolder::new();
        holder.new_node(1);
        holder.snapshot();
        holder.new_node(2);
        holder.new_node(3);
        assert_eq!(holder.snapshot_mark(), Some(1));

        holder.rollback();
        assert_eq!(holder.nodes(), &[1]);
        assert_eq!(holder.snapshot_mark(), None);

        // 没有快照时回滚不改变任何东西
        holder.new_node(4);
        holder.rollback();
        assert_eq!(holder.nodes(), &[1, 4]);
    }

    #[test]
    fn test_inherit_keeps_indices_without_snapshot() {
        let mut parent = GraphHolder::new();
        parent.new_node(10);
        parent.snapshot();
        parent.new_node(20);

        let child = GraphHolder::inherit(&parent);
        assert_eq!(child.nodes(), parent.nodes());
        assert_eq!(child.snapshot_mark(), None);
    }
}
