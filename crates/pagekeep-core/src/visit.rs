// Tree traversal
//
// This module provides pre-order and post-order traversal over any tree that
// can list the children of a node. Traversal only ever follows the
// parent-to-child ownership edges reported by `Traversable::children`, so
// side references between nodes can never make it loop.

use std::fmt;

/// A tree whose nodes can be enumerated from a root.
pub trait Traversable {
    /// Handle used to address a node of the tree
    type Node: Copy + Eq + fmt::Debug;

    /// Children of `node` in iteration order. Unknown nodes have no children.
    fn children(&self, node: Self::Node) -> &[Self::Node];

    /// Parent of `node`, `None` for the root or unknown nodes.
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Continue,
    DontGoDeeper,
    Stop,
}

/// Control object handed to a visitor for every visited node.
#[derive(Debug)]
pub struct Visit<R> {
    action: Action,
    result: Option<R>,
}

impl<R> Visit<R> {
    /// Create a visit that continues the traversal
    pub fn new() -> Self {
        Self { action: Action::Continue, result: None }
    }

    /// Abort the whole traversal without a result
    pub fn stop(&mut self) {
        self.action = Action::Stop;
    }

    /// Abort the whole traversal and return `result` from it
    pub fn stop_with(&mut self, result: R) {
        self.result = Some(result);
        self.action = Action::Stop;
    }

    /// Visit the siblings of the current node but not its descendants
    pub fn dont_go_deeper(&mut self) {
        if self.action != Action::Stop {
            self.action = Action::DontGoDeeper;
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.action == Action::Stop
    }

    pub fn is_dont_go_deeper(&self) -> bool {
        self.action == Action::DontGoDeeper
    }

    pub fn is_continue(&self) -> bool {
        self.action == Action::Continue
    }

    /// Clears a pending "don't go deeper" and reports whether it was set.
    fn take_dont_go_deeper(&mut self) -> bool {
        let skip = self.action == Action::DontGoDeeper;
        if skip {
            self.action = Action::Continue;
        }
        skip
    }

    fn into_result(self) -> Option<R> {
        self.result
    }
}

impl<R> Default for Visit<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Decides which nodes are handed to the visitor and which subtrees are entered.
///
/// The two decisions are independent: a node can be skipped while its
/// children are still visited, and a node can be visited while its subtree is
/// pruned.
pub trait VisitFilter<T: Traversable + ?Sized> {
    /// Whether `node` itself is passed to the visitor
    fn visit_object(&self, _tree: &T, _node: T::Node) -> bool {
        true
    }

    /// Whether the traversal descends into the children of `node`
    fn visit_children(&self, _tree: &T, _node: T::Node) -> bool {
        true
    }
}

/// Filter that accepts every node and every subtree.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllVisitFilter;

impl<T: Traversable + ?Sized> VisitFilter<T> for AllVisitFilter {}

/// Filter that hands only matching nodes to the visitor but still descends everywhere.
pub struct ObjectFilter<F>(pub F);

impl<T, F> VisitFilter<T> for ObjectFilter<F>
where
    T: Traversable + ?Sized,
    F: Fn(&T, T::Node) -> bool,
{
    fn visit_object(&self, tree: &T, node: T::Node) -> bool {
        (self.0)(tree, node)
    }
}

/// Filter that prunes the subtrees of nodes failing the predicate.
pub struct ChildrenFilter<F>(pub F);

impl<T, F> VisitFilter<T> for ChildrenFilter<F>
where
    T: Traversable + ?Sized,
    F: Fn(&T, T::Node) -> bool,
{
    fn visit_children(&self, tree: &T, node: T::Node) -> bool {
        (self.0)(tree, node)
    }
}

/// Pre-order cursor over a tree.
///
/// The cursor borrows nothing between calls. Children of a yielded node are
/// read on the following `next` call, so the caller may mutate the tree in
/// between, and `dont_go_deeper` prunes the node yielded last.
#[derive(Debug, Clone)]
pub struct PreOrderCursor<N> {
    stack: Vec<N>,
    last: Option<N>,
    skip_last: bool,
}

impl<N: Copy + Eq + fmt::Debug> PreOrderCursor<N> {
    /// Cursor over the descendants of `root`, excluding `root` itself
    pub fn children_of(root: N) -> Self {
        Self { stack: Vec::new(), last: Some(root), skip_last: false }
    }

    /// Cursor over `root` and all of its descendants
    pub fn starting_at(root: N) -> Self {
        Self { stack: vec![root], last: None, skip_last: false }
    }

    /// Skip the children of the node returned by the previous `next`
    pub fn dont_go_deeper(&mut self) {
        self.skip_last = true;
    }

    /// Advance to the next node in pre-order
    pub fn next<T>(&mut self, tree: &T) -> Option<N>
    where
        T: Traversable<Node = N> + ?Sized,
    {
        if let Some(last) = self.last.take() {
            if !self.skip_last {
                self.stack.extend(tree.children(last).iter().rev().copied());
            }
        }
        self.skip_last = false;

        let node = self.stack.pop()?;
        self.last = Some(node);
        Some(node)
    }
}

/// Visit every descendant of `root` in pre-order, excluding `root`.
pub fn visit_children<T, R, F>(tree: &T, root: T::Node, visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    visit_children_filtered(tree, root, &AllVisitFilter, visitor)
}

/// Visit the descendants of `root` in pre-order under a filter.
pub fn visit_children_filtered<T, R, V, F>(tree: &T, root: T::Node, filter: &V, visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    V: VisitFilter<T> + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    pre_order(tree, PreOrderCursor::children_of(root), filter, visitor)
}

/// Visit `root` and then all of its descendants in pre-order.
pub fn visit<T, R, F>(tree: &T, root: T::Node, visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    pre_order(tree, PreOrderCursor::starting_at(root), &AllVisitFilter, visitor)
}

fn pre_order<T, R, V, F>(tree: &T, mut cursor: PreOrderCursor<T::Node>, filter: &V, mut visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    V: VisitFilter<T> + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    let mut visit = Visit::new();
    while let Some(node) = cursor.next(tree) {
        if filter.visit_object(tree, node) {
            visitor(node, &mut visit);
            if visit.is_stopped() {
                return visit.into_result();
            }
            if visit.take_dont_go_deeper() {
                cursor.dont_go_deeper();
                continue;
            }
        }
        if !filter.visit_children(tree, node) {
            cursor.dont_go_deeper();
        }
    }
    visit.into_result()
}

/// Pre-order visit of the descendants of `root` with mutable access to the tree.
///
/// Children of a node are read after its visitor returns, so the visitor may
/// add or remove children of the node it is handed. Nodes removed before
/// they are reached are still passed to the visitor; `Traversable::children`
/// reports no children for them.
pub fn visit_children_mut<T, R, F>(tree: &mut T, root: T::Node, mut visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    F: FnMut(&mut T, T::Node, &mut Visit<R>),
{
    let mut cursor = PreOrderCursor::children_of(root);
    let mut visit = Visit::new();
    while let Some(node) = cursor.next(&*tree) {
        visitor(tree, node, &mut visit);
        if visit.is_stopped() {
            return visit.into_result();
        }
        if visit.take_dont_go_deeper() {
            cursor.dont_go_deeper();
        }
    }
    visit.into_result()
}

/// Visit `root` and its descendants bottom-up: every child before its parent.
pub fn visit_post_order<T, R, V, F>(tree: &T, root: T::Node, filter: &V, mut visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    V: VisitFilter<T> + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    let mut stack = vec![(root, false)];
    let mut visit = Visit::new();
    while let Some((node, expanded)) = stack.pop() {
        if !expanded {
            stack.push((node, true));
            if filter.visit_children(tree, node) {
                stack.extend(tree.children(node).iter().rev().map(|child| (*child, false)));
            }
            continue;
        }
        if filter.visit_object(tree, node) {
            visitor(node, &mut visit);
            if visit.is_stopped() {
                return visit.into_result();
            }
            // children are already behind us
            visit.take_dont_go_deeper();
        }
    }
    visit.into_result()
}

/// Bottom-up visit with mutable access to the tree.
///
/// The children of a node are collected before any of them is visited.
pub fn visit_post_order_mut<T, R, F>(tree: &mut T, root: T::Node, mut visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    F: FnMut(&mut T, T::Node, &mut Visit<R>),
{
    let mut stack = vec![(root, false)];
    let mut visit = Visit::new();
    while let Some((node, expanded)) = stack.pop() {
        if !expanded {
            stack.push((node, true));
            stack.extend(tree.children(node).iter().rev().map(|child| (*child, false)));
            continue;
        }
        visitor(tree, node, &mut visit);
        if visit.is_stopped() {
            return visit.into_result();
        }
        visit.take_dont_go_deeper();
    }
    visit.into_result()
}

/// Visit the ancestors of `node`, nearest first.
pub fn visit_parents<T, R, F>(tree: &T, node: T::Node, mut visitor: F) -> Option<R>
where
    T: Traversable + ?Sized,
    F: FnMut(T::Node, &mut Visit<R>),
{
    let mut visit = Visit::new();
    let mut current = tree.parent(node);
    while let Some(parent) = current {
        visitor(parent, &mut visit);
        if visit.is_stopped() {
            return visit.into_result();
        }
        visit.take_dont_go_deeper();
        current = tree.parent(parent);
    }
    visit.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Adjacency-list tree used by the traversal tests:
    ///
    /// ```text
    /// 0
    /// ├── 1
    /// │   ├── 3
    /// │   └── 4
    /// │       └── 7
    /// └── 2
    ///     ├── 5
    ///     └── 6
    /// ```
    struct TestTree {
        children: Vec<Vec<usize>>,
        parents: Vec<Option<usize>>,
    }

    impl TestTree {
        fn sample() -> Self {
            let children = vec![
                vec![1, 2],
                vec![3, 4],
                vec![5, 6],
                vec![],
                vec![7],
                vec![],
                vec![],
                vec![],
            ];
            let mut parents = vec![None; children.len()];
            for (parent, kids) in children.iter().enumerate() {
                for kid in kids {
                    parents[*kid] = Some(parent);
                }
            }
            Self { children, parents }
        }
    }

    impl Traversable for TestTree {
        type Node = usize;

        fn children(&self, node: usize) -> &[usize] {
            self.children.get(node).map(Vec::as_slice).unwrap_or(&[])
        }

        fn parent(&self, node: usize) -> Option<usize> {
            self.parents.get(node).copied().flatten()
        }
    }

    #[test]
    fn test_pre_order_excludes_root() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        let result: Option<()> = visit_children(&tree, 0, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![1, 3, 4, 7, 2, 5, 6]);
        assert_eq!(result, None);
    }

    #[test]
    fn test_visit_includes_root() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        visit::<_, (), _>(&tree, 2, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![2, 5, 6]);
    }

    #[test]
    fn test_dont_go_deeper_skips_descendants_only() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        visit_children::<_, (), _>(&tree, 0, |node, visit| {
            seen.push(node);
            if node == 1 {
                visit.dont_go_deeper();
            }
        });
        assert_eq!(seen, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_stop_with_result_ends_traversal() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        let found = visit_children(&tree, 0, |node, visit| {
            seen.push(node);
            if node == 4 {
                visit.stop_with(node * 10);
            }
        });
        assert_eq!(found, Some(40));
        assert_eq!(seen, vec![1, 3, 4]);
    }

    #[test]
    fn test_stop_without_result() {
        let tree = TestTree::sample();
        let mut count = 0;
        let result: Option<usize> = visit_children(&tree, 0, |_node, visit| {
            count += 1;
            visit.stop();
        });
        assert_eq!(count, 1);
        assert_eq!(result, None);
    }

    #[test]
    fn test_empty_container_visits_nothing() {
        let tree = TestTree::sample();
        let mut count = 0;
        let result: Option<u8> = visit_children(&tree, 3, |_node, _visit| count += 1);
        assert_eq!(count, 0);
        assert_eq!(result, None);
    }

    #[test]
    fn test_filters_are_independent() {
        let tree = TestTree::sample();

        // node 1 is hidden from the visitor but its subtree is still walked
        let mut seen = Vec::new();
        let skip_one = ObjectFilter(|_tree: &TestTree, node: usize| node != 1);
        visit_children_filtered::<_, (), _, _>(&tree, 0, &skip_one, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![3, 4, 7, 2, 5, 6]);

        // node 1 is visited but its subtree is pruned
        let mut seen = Vec::new();
        let prune_one = ChildrenFilter(|_tree: &TestTree, node: usize| node != 1);
        visit_children_filtered::<_, (), _, _>(&tree, 0, &prune_one, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![1, 2, 5, 6]);
    }

    #[test]
    fn test_post_order_visits_children_first() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        visit_post_order::<_, (), _, _>(&tree, 0, &AllVisitFilter, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![3, 7, 4, 1, 5, 6, 2, 0]);
    }

    #[test]
    fn test_post_order_stop() {
        let tree = TestTree::sample();
        let found = visit_post_order(&tree, 0, &AllVisitFilter, |node, visit| {
            if node == 4 {
                visit.stop_with("four");
            }
        });
        assert_eq!(found, Some("four"));
    }

    #[test]
    fn test_visit_parents_walks_to_root() {
        let tree = TestTree::sample();
        let mut seen = Vec::new();
        visit_parents::<_, (), _>(&tree, 7, |node, _visit| seen.push(node));
        assert_eq!(seen, vec![4, 1, 0]);
    }

    #[test]
    fn test_cursor_dont_go_deeper() {
        let tree = TestTree::sample();
        let mut cursor = PreOrderCursor::starting_at(0);
        let mut seen = Vec::new();
        while let Some(node) = cursor.next(&tree) {
            seen.push(node);
            if node == 2 {
                cursor.dont_go_deeper();
            }
        }
        assert_eq!(seen, vec![0, 1, 3, 4, 7, 2]);
    }

    #[test]
    fn test_mutable_visit_sees_children_added_by_visitor() {
        let mut tree = TestTree::sample();
        let mut seen = Vec::new();
        visit_children_mut::<_, (), _>(&mut tree, 0, |tree, node, _visit| {
            seen.push(node);
            if node == 3 {
                tree.children.push(Vec::new());
                tree.parents.push(Some(3));
                tree.children[3].push(8);
            }
        });
        assert_eq!(seen, vec![1, 3, 8, 4, 7, 2, 5, 6]);
    }
}
