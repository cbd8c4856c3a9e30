/*
Display conversion for both tree shapes.

termtree::Tree<String> is the common rendering target: the arena tree is converted with a
pre/post walk (push a subtree on the way down, attach it to its parent on the way up),
the shared loop structure by plain recursion over its lower levels.
 */
use std::cell::RefCell;

use termtree::Tree;
use tracing::instrument;

use crate::arena::{NodeId, NodeTree};
use crate::looping::LoopNode;
use crate::walk::always;

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> Tree<String>;
}

impl<D> NodeTree<D> {
    /// Display tree of `start` and its descendants, labelled by id.
    #[instrument(level = "debug", skip(self))]
    pub fn subtree_to_tree_string(&self, start: NodeId) -> Tree<String> {
        let stack = RefCell::new(Vec::new());
        self.walk(
            start,
            |node| stack.borrow_mut().push(Tree::new(node.id().to_string())),
            |_| {
                let mut stack = stack.borrow_mut();
                if stack.len() > 1 {
                    if let Some(done) = stack.pop() {
                        if let Some(parent) = stack.last_mut() {
                            parent.push(done);
                        }
                    }
                }
            },
            always,
        );
        stack
            .into_inner()
            .pop()
            .unwrap_or_else(|| Tree::new("Empty tree".to_string()))
    }
}

impl<D> TreeNodeConvert for NodeTree<D> {
    fn to_tree_string(&self) -> Tree<String> {
        self.subtree_to_tree_string(self.root())
    }
}

impl<A, M> TreeNodeConvert for LoopNode<A, M> {
    fn to_tree_string(&self) -> Tree<String> {
        // merged levels show their whole identity chain
        let label = self.nesting_level().join("/");

        let leaves: Vec<_> = self
            .lower_levels()
            .iter()
            .map(|c| c.to_tree_string())
            .collect();

        Tree::new(label).with_leaves(leaves)
    }
}
