//! Read-only flattening and slicing queries, all built on [`NodeTree::walk`].

use std::collections::BTreeMap;

use itertools::Itertools;
use tracing::instrument;

use crate::arena::{NodeId, NodeTree};
use crate::walk::always;

impl<D> NodeTree<D> {
    /// Paths of `start` and all its descendants, in pre-order.
    #[instrument(level = "debug", skip(self))]
    pub fn flat_paths(&self, start: NodeId) -> Vec<Vec<String>> {
        let mut paths = Vec::new();
        self.walk(start, |node| paths.push(node.path().to_vec()), |_| {}, always);
        paths
    }

    /// Payload of `start` and all its descendants keyed by path.
    #[instrument(level = "debug", skip(self))]
    pub fn flat_map(&self, start: NodeId) -> BTreeMap<Vec<String>, &D> {
        let mut flat = BTreeMap::new();
        self.walk(
            start,
            |node| {
                flat.insert(node.path().to_vec(), node.data());
            },
            |_| {},
            always,
        );
        flat
    }

    /// Descendants of `start` with the given absolute depth, in traversal order.
    #[instrument(level = "debug", skip(self))]
    pub fn nodes_at_depth(&self, start: NodeId, depth: usize) -> Vec<NodeId> {
        let mut found = Vec::new();
        self.walk(
            start,
            |node| {
                if node.depth() + 1 == depth {
                    found.extend(node.child_handles());
                }
            },
            |_| {},
            always,
        );
        found
    }

    /// Distinct ids among [`nodes_at_depth`](Self::nodes_at_depth), first-seen order.
    #[instrument(level = "debug", skip(self))]
    pub fn ids_at_depth(&self, start: NodeId, depth: usize) -> Vec<String> {
        self.nodes_at_depth(start, depth)
            .into_iter()
            .filter_map(|id| self.node(id))
            .map(|node| node.id().to_string())
            .unique()
            .collect()
    }

    /// Descendants of `start` without children, in traversal order.
    #[instrument(level = "debug", skip(self))]
    pub fn terminal_nodes(&self, start: NodeId) -> Vec<NodeId> {
        let mut terminals = Vec::new();
        self.walk(
            start,
            |node| {
                terminals.extend(
                    node.child_handles()
                        .filter(|&child| self.node(child).is_some_and(|c| c.is_terminal())),
                );
            },
            |_| {},
            always,
        );
        terminals
    }

    /// Deepest depth reached by a terminal descendant of `start`.
    ///
    /// A childless `start` is its own deepest point.
    #[instrument(level = "debug", skip(self))]
    pub fn max_depth(&self, start: NodeId) -> usize {
        self.terminal_nodes(start)
            .into_iter()
            .filter_map(|id| self.node(id))
            .map(|node| node.depth())
            .max()
            .unwrap_or_else(|| self.node(start).map_or(0, |node| node.depth()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    // ROOT
    // ├── A
    // │   ├── B
    // │   └── C
    // │       └── D
    // └── X
    //     └── B
    #[fixture]
    fn tree() -> NodeTree<String> {
        let mut tree = NodeTree::new();
        tree.setup([vec!["A", "B"], vec!["A", "C", "D"], vec!["X", "B"]]).unwrap();
        tree
    }

    fn paths(tree: &NodeTree<String>, nodes: &[NodeId]) -> Vec<String> {
        nodes
            .iter()
            .map(|&id| tree.node(id).unwrap().extended_path())
            .collect()
    }

    #[rstest]
    fn test_flat_paths_pre_order(tree: NodeTree<String>) {
        let paths = tree.flat_paths(tree.root());
        let rendered: Vec<String> = paths.iter().map(|p| p.join("/")).collect();
        assert_eq!(
            rendered,
            vec![
                "ROOT", "ROOT/A", "ROOT/A/B", "ROOT/A/C", "ROOT/A/C/D", "ROOT/X", "ROOT/X/B",
            ]
        );
    }

    #[rstest]
    fn test_flat_map_keys_by_path(mut tree: NodeTree<String>) {
        let d = tree.at_path(tree.root(), &["A", "C", "D"]).unwrap();
        tree.node_mut(d).unwrap().data_mut().push_str("leaf");
        let c = tree.at_path(tree.root(), &["A", "C"]).unwrap();

        let flat = tree.flat_map(c);

        assert_eq!(flat.len(), 2);
        let key: Vec<String> = ["ROOT", "A", "C", "D"].iter().map(|s| s.to_string()).collect();
        assert_eq!(flat[&key], "leaf");
    }

    #[rstest]
    fn test_nodes_and_ids_at_depth(tree: NodeTree<String>) {
        let root = tree.root();
        let at_two = tree.nodes_at_depth(root, 2);
        assert_eq!(paths(&tree, &at_two), vec!["ROOT/A/B", "ROOT/A/C", "ROOT/X/B"]);
        // B appears twice at depth 2 but is listed once
        assert_eq!(tree.ids_at_depth(root, 2), vec!["B", "C"]);
        assert_eq!(tree.ids_at_depth(root, 1), vec!["A", "X"]);
        assert!(tree.ids_at_depth(root, 0).is_empty());
        assert!(tree.ids_at_depth(root, 9).is_empty());
    }

    #[rstest]
    fn test_terminal_nodes(tree: NodeTree<String>) {
        let terminals = tree.terminal_nodes(tree.root());
        assert_eq!(paths(&tree, &terminals), vec!["ROOT/A/B", "ROOT/A/C/D", "ROOT/X/B"]);
    }

    #[rstest]
    fn test_max_depth(tree: NodeTree<String>) {
        let root = tree.root();
        assert_eq!(tree.max_depth(root), 3);
        let x = tree.at(root, "X").unwrap();
        assert_eq!(tree.max_depth(x), 2);
        let d = tree.at_path(root, &["A", "C", "D"]).unwrap();
        assert_eq!(tree.max_depth(d), 3);
    }

    #[test]
    fn test_queries_on_childless_root() {
        let tree: NodeTree<()> = NodeTree::new();
        let root = tree.root();
        assert_eq!(tree.flat_paths(root), vec![vec!["ROOT".to_string()]]);
        assert!(tree.terminal_nodes(root).is_empty());
        assert!(tree.nodes_at_depth(root, 1).is_empty());
        assert_eq!(tree.max_depth(root), 0);
    }
}
