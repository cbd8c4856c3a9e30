//! Arena-backed N-ary node tree with predicate-gated traversal, plus shared nesting
//! levels for multi-level calculation loops.
//!
//! - [`NodeTree`]: exclusive ownership, nodes addressed by [`NodeId`], children kept in
//!   id order, lazy child creation through a [`ChildFactory`].
//! - [`NodeTree::walk`]: the single recursive traversal every query is built on.
//! - [`LoopNode`]: `Rc`-shared structural levels driven by [`LoopNode::nested_loop`]
//!   and customised through [`NestingLevel`] hooks.

pub mod arena;
pub mod builder;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exitcode;
pub mod factory;
pub mod looping;
pub mod tree_traits;
pub mod util;
mod query;
mod walk;

pub use arena::{Node, NodeId, NodeMut, NodeTree, PATH_DELIMITER, ROOT_ID};
pub use errors::{TreeError, TreeResult};
pub use factory::{default_factory, ChildFactory};
pub use looping::{
    Bridge, InvolvedInstruments, LoopNode, LoopNodeRef, NestingLevel, StructuralLevel,
};
pub use tree_traits::TreeNodeConvert;
pub use walk::always;
