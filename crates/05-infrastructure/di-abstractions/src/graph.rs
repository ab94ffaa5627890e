//! 有向图抽象与环检测
//!
//! 节点是 `0..order()` 的稠密下标。环检测按下标顺序从每个根做深度优先搜索，
//! `visited` 在所有根之间共享，`on_stack` 在每个根开始前清空。

/// 可做环检测的有向图
pub trait Graph {
    /// 节点数量
    fn order(&self) -> usize;

    /// 节点 `node` 的出边终点，顺序决定报告的环路径
    fn edges_from(&self, node: usize) -> Vec<usize>;
}

/// 整个图是否无环
pub fn is_acyclic<G: Graph + ?Sized>(graph: &G) -> bool {
    find_cycle(graph).is_none()
}

/// 查找第一条环路径
///
/// 返回的路径首尾是同一个节点，例如 `[0, 1, 2, 0]`。
pub fn find_cycle<G: Graph + ?Sized>(graph: &G) -> Option<Vec<usize>> {
    find_cycle_from(graph, 0..graph.order())
}

/// 只从给定的根出发查找环
///
/// 新增的节点若构成环，环必然经过某个新节点，所以增量校验只需以新节点为根。
pub fn find_cycle_from<G, I>(graph: &G, roots: I) -> Option<Vec<usize>>
where
    G: Graph + ?Sized,
    I: IntoIterator<Item = usize>,
{
    let order = graph.order();
    let mut search = CycleSearch {
        graph,
        visited: vec![false; order],
        on_stack: vec![false; order],
    };

    for root in roots {
        if root >= order || search.visited[root] {
            continue;
        }
        search.on_stack.iter_mut().for_each(|flag| *flag = false);
        let mut path = Vec::new();
        if let Some(cycle) = search.visit(root, &mut path) {
            return Some(cycle);
        }
    }
    None
}

struct CycleSearch<'g, G: ?Sized> {
    graph: &'g G,
    visited: Vec<bool>,
    on_stack: Vec<bool>,
}

impl<G: Graph + ?Sized> CycleSearch<'_, G> {
    fn visit(&mut self, node: usize, path: &mut Vec<usize>) -> Option<Vec<usize>> {
        path.push(node);
        self.visited[node] = true;
        self.on_stack[node] = true;

        for next in self.graph.edges_from(node) {
            if next >= self.visited.len() {
                continue;
            }
            if self.on_stack[next] {
                // 截断到该节点第一次出现的位置，再把它追加到末尾闭合路径
                let start = path.iter().rposition(|&n| n == next).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            if !self.visited[next] {
                if let Some(cycle) = self.visit(next, path) {
                    return Some(cycle);
                }
            }
        }

        self.on_stack[node] = false;
        path.pop();
        None
    }
}
