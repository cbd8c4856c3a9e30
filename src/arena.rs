use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use generational_arena::{Arena, Index};
use tracing::{debug, info, instrument};

use crate::errors::{TreeError, TreeResult};
use crate::factory::{default_factory, ChildFactory};
use crate::walk::always;

/// Id of the root node of every tree.
pub const ROOT_ID: &str = "ROOT";

/// Delimiter used by [`Node::extended_path`].
pub const PATH_DELIMITER: &str = "/";

/// Handle of a node inside a [`NodeTree`].
///
/// Handles are generational: once a node is deleted its handle never resolves again,
/// even if the arena slot is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

/// Tree vertex: identity, position and an owned payload.
///
/// Position fields (`depth`, `path`, `parent`, children) are maintained by the owning
/// [`NodeTree`]; a node built with [`Node::new`] or [`Node::with_data`] is detached
/// until it is attached with [`NodeTree::add_child`].
#[derive(Debug, Clone)]
pub struct Node<D> {
    id: String,
    depth: usize,
    /// Ids from the root down to this node, root-inclusive
    path: Vec<String>,
    /// None for the root
    parent: Option<NodeId>,
    /// Children keyed by id, enumerated in natural id order
    children: BTreeMap<String, NodeId>,
    terminal: bool,
    data: D,
}

impl<D: Default> Node<D> {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_data(id, D::default())
    }
}

impl<D> Node<D> {
    pub fn with_data(id: impl Into<String>, data: D) -> Self {
        let id = id.into();
        Self {
            path: vec![id.clone()],
            id,
            depth: 0,
            parent: None,
            children: BTreeMap::new(),
            terminal: true,
            data,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// False from the moment the first child is attached.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Children as `(id, handle)` pairs in id order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(id, &child)| (id.as_str(), child))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn child_id(&self, id: &str) -> Option<NodeId> {
        self.children.get(id).copied()
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// Path joined with `/`, e.g. `ROOT/EU/DE`.
    pub fn extended_path(&self) -> String {
        self.extended_path_with(PATH_DELIMITER, 0)
    }

    /// Path joined with `delimiter`, padded with one delimiter per level missing
    /// between this node's depth and `level`.
    ///
    /// Splitting the result on the delimiter always yields at least `level + 1`
    /// columns, which keeps nodes of different depth aligned in columnar output.
    pub fn extended_path_with(&self, delimiter: &str, level: usize) -> String {
        let mut rendered = self.path.join(delimiter);
        for _ in self.depth..level {
            rendered.push_str(delimiter);
        }
        rendered
    }

    pub(crate) fn child_handles(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.values().copied()
    }
}

impl<D> fmt::Display for Node<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extended_path())
    }
}

/// Mutable access to a node attached to a [`NodeTree`].
///
/// Reads go through `Deref` to [`Node`]; only the payload can be changed, so the
/// position fields stay under the tree's control.
///
/// ```compile_fail
/// use looptree::{Node, NodeTree};
///
/// let mut tree: NodeTree<()> = NodeTree::new();
/// let root = tree.root();
/// *tree.node_mut(root).unwrap() = Node::new("other");
/// ```
#[derive(Debug)]
pub struct NodeMut<'a, D>(&'a mut Node<D>);

impl<D> NodeMut<'_, D> {
    pub fn data_mut(&mut self) -> &mut D {
        &mut self.0.data
    }
}

impl<D> Deref for NodeMut<'_, D> {
    type Target = Node<D>;

    fn deref(&self) -> &Node<D> {
        &*self.0
    }
}

/// Arena-based N-ary tree with exactly one root.
///
/// All nodes live in a generational arena owned by the tree. Every node exclusively
/// owns its subtree: deleting a node removes all its descendants from the arena.
/// Parent links are plain handles and carry no ownership.
#[derive(Debug)]
pub struct NodeTree<D> {
    arena: Arena<Node<D>>,
    root: NodeId,
}

impl<D: Default> Default for NodeTree<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Default> NodeTree<D> {
    pub fn new() -> Self {
        Self::with_root_data(D::default())
    }

    /// Returns the child `id` of `parent`, creating it with [`default_factory`] if absent.
    pub fn child(&mut self, parent: NodeId, id: &str) -> TreeResult<NodeId> {
        self.child_with(parent, id, &default_factory::<D>)
    }

    /// Follows `ids` down from `parent`, creating every missing node on the way.
    pub fn descend<S: AsRef<str>>(&mut self, parent: NodeId, ids: &[S]) -> TreeResult<NodeId> {
        self.descend_with(parent, ids, &default_factory::<D>)
    }

    /// Resets the tree to a single `ROOT` node with a fresh default payload.
    ///
    /// Handles from before the reset never resolve again.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) {
        self.arena.retain(|_, _| false);
        self.root = NodeId(self.arena.insert(Node::new(ROOT_ID)));
        debug!("Tree cleared");
    }
}

impl<D> NodeTree<D> {
    pub fn with_root_data(data: D) -> Self {
        let mut arena = Arena::new();
        let root = NodeId(arena.insert(Node::with_data(ROOT_ID, data)));
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node<D>> {
        self.arena.get(id.0)
    }

    /// Payload access to a live node; see [`NodeMut`].
    pub fn node_mut(&mut self, id: NodeId) -> Option<NodeMut<'_, D>> {
        self.arena.get_mut(id.0).map(NodeMut)
    }

    pub fn data_mut(&mut self, id: NodeId) -> Option<&mut D> {
        self.arena.get_mut(id.0).map(|node| &mut node.data)
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    fn get(&self, id: NodeId) -> TreeResult<&Node<D>> {
        self.arena.get(id.0).ok_or(TreeError::NodeNotFound)
    }

    fn get_mut(&mut self, id: NodeId) -> TreeResult<&mut Node<D>> {
        self.arena.get_mut(id.0).ok_or(TreeError::NodeNotFound)
    }

    /// Attaches a detached node below `parent`.
    ///
    /// A sibling with the same id wins: the insertion is logged and ignored, and the
    /// existing child's handle is returned.
    #[instrument(level = "trace", skip(self, node), fields(child = %node.id))]
    pub fn add_child(&mut self, parent: NodeId, mut node: Node<D>) -> TreeResult<NodeId> {
        let parent_node = self.get(parent)?;
        if let Some(&existing) = parent_node.children.get(&node.id) {
            info!(
                "Child '{}' already exists in {}, insertion ignored",
                node.id,
                parent_node.extended_path()
            );
            return Ok(existing);
        }

        let mut path = parent_node.path.clone();
        path.push(node.id.clone());
        node.depth = parent_node.depth + 1;
        node.path = path;
        node.parent = Some(parent);
        // a detached node carries no subtree
        node.children.clear();
        node.terminal = true;

        let key = node.id.clone();
        let child = NodeId(self.arena.insert(node));
        let parent_node = self.get_mut(parent)?;
        parent_node.children.insert(key, child);
        parent_node.terminal = false;
        Ok(child)
    }

    /// Returns the child `id` of `parent`, creating it with `factory` if absent.
    ///
    /// The created node always takes `id`, whatever id the factory assigned.
    pub fn child_with<F>(&mut self, parent: NodeId, id: &str, factory: &F) -> TreeResult<NodeId>
    where
        F: ChildFactory<D> + ?Sized,
    {
        if let Some(existing) = self.get(parent)?.child_id(id) {
            return Ok(existing);
        }
        let mut node = factory.create_child(id);
        node.id = id.to_string();
        debug!("Creating child '{}'", id);
        self.add_child(parent, node)
    }

    /// Follows `ids` down from `parent`, creating missing nodes with `factory`.
    ///
    /// An empty sequence resolves to `parent` itself.
    pub fn descend_with<S, F>(&mut self, parent: NodeId, ids: &[S], factory: &F) -> TreeResult<NodeId>
    where
        S: AsRef<str>,
        F: ChildFactory<D> + ?Sized,
    {
        self.get(parent)?;
        ids.iter()
            .try_fold(parent, |current, id| self.child_with(current, id.as_ref(), factory))
    }

    /// Strict lookup of the child `id` of `parent`; never creates.
    pub fn at(&self, parent: NodeId, id: &str) -> TreeResult<NodeId> {
        let node = self.get(parent)?;
        node.child_id(id).ok_or_else(|| TreeError::ChildNotFound {
            id: id.to_string(),
            node: node.extended_path(),
        })
    }

    /// Strict lookup along `ids`; fails at the first missing segment.
    pub fn at_path<S: AsRef<str>>(&self, parent: NodeId, ids: &[S]) -> TreeResult<NodeId> {
        self.get(parent)?;
        ids.iter()
            .try_fold(parent, |current, id| self.at(current, id.as_ref()))
    }

    pub fn exist(&self, parent: NodeId, id: &str) -> bool {
        self.node(parent)
            .is_some_and(|node| node.children.contains_key(id))
    }

    pub fn exist_path<S: AsRef<str>>(&self, parent: NodeId, ids: &[S]) -> bool {
        self.at_path(parent, ids).is_ok()
    }

    /// Deletes the child `id` of `parent` together with its subtree.
    ///
    /// A branch is never left as a childless stub: when `id` is the only child,
    /// `parent` itself is deleted from its own parent instead, repeating upwards
    /// until an ancestor with siblings is found. Collapsing into the root is
    /// refused with [`TreeError::CollapseAtRoot`] and the tree is left unchanged.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_child(&mut self, parent: NodeId, id: &str) -> TreeResult<()> {
        let child = self.at(parent, id)?;
        let (sibling_count, grandparent, parent_id) = {
            let node = self.get(parent)?;
            (node.children.len(), node.parent, node.id.clone())
        };

        if sibling_count > 1 {
            self.remove_subtree(child);
            self.get_mut(parent)?.children.remove(id);
            debug!("Deleted '{}' and its subtree", id);
            return Ok(());
        }

        match grandparent {
            Some(grandparent) => {
                debug!("'{}' is the only child, collapsing '{}'", id, parent_id);
                self.delete_child(grandparent, &parent_id)
            }
            None => Err(TreeError::CollapseAtRoot { id: id.to_string() }),
        }
    }

    fn remove_subtree(&mut self, top: NodeId) {
        let mut doomed = vec![top];
        self.walk(top, |node| doomed.extend(node.child_handles()), |_| {}, always);
        for id in doomed {
            self.arena.remove(id.0);
        }
    }
}
