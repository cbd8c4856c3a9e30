//! Recursive pre/post-order traversal, gated by a predicate.
//!
//! Every read-only query on [`NodeTree`] is expressed through [`NodeTree::walk`].

use tracing::instrument;

use crate::arena::{Node, NodeId, NodeMut, NodeTree};

/// Predicate accepting every node.
pub fn always<D>(_node: &Node<D>) -> bool {
    true
}

impl<D> NodeTree<D> {
    /// Depth-first walk of `start` and its descendants.
    ///
    /// For each node the predicate is evaluated once; when it holds, `pre` runs before
    /// the children are visited and `post` after. Rejected nodes are still descended
    /// into. Children are visited in id order. A stale `start` visits nothing.
    ///
    /// Callbacks receive nodes borrowed for the lifetime of the tree, so they may
    /// collect references to nodes or payloads.
    #[instrument(level = "trace", skip_all)]
    pub fn walk<'a, Pre, Post, P>(&'a self, start: NodeId, mut pre: Pre, mut post: Post, predicate: P)
    where
        Pre: FnMut(&'a Node<D>),
        Post: FnMut(&'a Node<D>),
        P: Fn(&Node<D>) -> bool,
    {
        self.walk_from(start, &mut pre, &mut post, &predicate);
    }

    /// Same as [`walk`](Self::walk), but starts at each direct child of `start`.
    #[instrument(level = "trace", skip_all)]
    pub fn walk_children<'a, Pre, Post, P>(&'a self, start: NodeId, mut pre: Pre, mut post: Post, predicate: P)
    where
        Pre: FnMut(&'a Node<D>),
        Post: FnMut(&'a Node<D>),
        P: Fn(&Node<D>) -> bool,
    {
        if let Some(node) = self.node(start) {
            for child in node.child_handles() {
                self.walk_from(child, &mut pre, &mut post, &predicate);
            }
        }
    }

    /// Walk with mutable access to each accepted node's payload.
    ///
    /// Callbacks get a [`NodeMut`], which changes the payload only; the structure stays
    /// as it is for the whole walk.
    #[instrument(level = "trace", skip_all)]
    pub fn walk_mut<Pre, Post, P>(&mut self, start: NodeId, mut pre: Pre, mut post: Post, predicate: P)
    where
        Pre: FnMut(&mut NodeMut<'_, D>),
        Post: FnMut(&mut NodeMut<'_, D>),
        P: Fn(&Node<D>) -> bool,
    {
        self.walk_mut_from(start, &mut pre, &mut post, &predicate);
    }

    fn walk_from<'a, Pre, Post, P>(&'a self, current: NodeId, pre: &mut Pre, post: &mut Post, predicate: &P)
    where
        Pre: FnMut(&'a Node<D>),
        Post: FnMut(&'a Node<D>),
        P: Fn(&Node<D>) -> bool,
    {
        let Some(node) = self.node(current) else {
            return;
        };
        let accepted = predicate(node);
        if accepted {
            pre(node);
        }
        for child in node.child_handles() {
            self.walk_from(child, pre, post, predicate);
        }
        if accepted {
            post(node);
        }
    }

    fn walk_mut_from<Pre, Post, P>(&mut self, current: NodeId, pre: &mut Pre, post: &mut Post, predicate: &P)
    where
        Pre: FnMut(&mut NodeMut<'_, D>),
        Post: FnMut(&mut NodeMut<'_, D>),
        P: Fn(&Node<D>) -> bool,
    {
        let Some(mut node) = self.node_mut(current) else {
            return;
        };
        let accepted = predicate(&*node);
        let children: Vec<NodeId> = node.child_handles().collect();
        if accepted {
            pre(&mut node);
        }
        for child in children {
            self.walk_mut_from(child, pre, post, predicate);
        }
        if accepted {
            if let Some(mut node) = self.node_mut(current) {
                post(&mut node);
            }
        }
    }
}
