//! Child factories: how a missing child is materialized from its id.

use crate::arena::Node;

/// Builds a detached node for a child id.
///
/// Implemented for every `Fn(&str) -> Node<D>`, so plain functions and closures can be
/// passed wherever a factory is expected.
pub trait ChildFactory<D> {
    fn create_child(&self, id: &str) -> Node<D>;
}

impl<D, F> ChildFactory<D> for F
where
    F: Fn(&str) -> Node<D>,
{
    fn create_child(&self, id: &str) -> Node<D> {
        self(id)
    }
}

/// Node with the given id and a default payload.
pub fn default_factory<D: Default>(id: &str) -> Node<D> {
    Node::new(id)
}
