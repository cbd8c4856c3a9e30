//! Nested calculation loops over shared structural levels.
//!
//! A [`LoopNode`] is one structural level of a computation (e.g. counterparty,
//! netting set, collateral account). Levels are shared (`Rc`) so that external
//! collaborators can keep references into the structure after a pass; the parent
//! link is a `Weak` and never keeps a level alive.
//!
//! What a level does is supplied by a [`NestingLevel`] implementation. A pass over the
//! structure is [`LoopNode::nested_loop`]: `pre` on the way down, children in
//! registration order, `post` on the way back up. The argument `A` is threaded
//! through the whole pass mutably; the calculation mode `M` is opaque.

use std::any::Any;
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeSet;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, instrument, trace};

use crate::errors::{TreeError, TreeResult};
use crate::tree_traits::TreeNodeConvert;

/// Shared handle to a nesting level.
pub type LoopNodeRef<A, M> = Rc<LoopNode<A, M>>;

/// Opaque payload linking a level to externally computed data or functionality.
pub type Bridge = Rc<dyn Any>;

/// Currency and instrument identifiers relevant to a subtree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InvolvedInstruments {
    pub csa_involved_ccys: BTreeSet<String>,
    pub deal_involved_ccys: BTreeSet<String>,
    pub irates_instr_names: BTreeSet<String>,
    pub irates_options_instr_names: BTreeSet<String>,
    pub equity_instr_names: BTreeSet<String>,
    pub equity_options_instr_names: BTreeSet<String>,
    pub fx_instr_names: BTreeSet<String>,
    pub fx_options_instr_names: BTreeSet<String>,
}

impl InvolvedInstruments {
    pub fn is_empty(&self) -> bool {
        self.csa_involved_ccys.is_empty()
            && self.deal_involved_ccys.is_empty()
            && self.irates_instr_names.is_empty()
            && self.irates_options_instr_names.is_empty()
            && self.equity_instr_names.is_empty()
            && self.equity_options_instr_names.is_empty()
            && self.fx_instr_names.is_empty()
            && self.fx_options_instr_names.is_empty()
    }
}

/// Behaviour of one structural level. Every hook has a neutral default.
pub trait NestingLevel<A, M> {
    /// Runs before the children of `node` are looped.
    fn pre_nested_loop_operations(&self, _node: &LoopNode<A, M>, _argument: &mut A, _mode: &M) {}

    /// Runs after all children of `node` have been looped.
    fn post_nested_loop_operations(&self, _node: &LoopNode<A, M>, _argument: &mut A, _mode: &M) {}

    /// Whether this level (and so its whole subtree) takes part in a pass for `mode`.
    fn consider_for_computation(&self, _mode: &M) -> bool {
        true
    }

    /// Builds the lower levels of `node`, usually once before the first pass.
    fn create_tree(&self, _node: &LoopNodeRef<A, M>, _argument: &mut A, _mode: &M) -> TreeResult<()> {
        Ok(())
    }

    fn set_loop_zero_collat_updater(&self) {}

    fn set_zero_collat_updater(&self) {}

    /// Adds this level's own currencies and instruments; children are visited by the caller.
    fn collect_involved_instruments(&self, _node: &LoopNode<A, M>, _instruments: &mut InvolvedInstruments) {}
}

/// Level with no behaviour of its own, e.g. a root that only groups its children.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralLevel;

impl<A, M> NestingLevel<A, M> for StructuralLevel {}

pub struct LoopNode<A, M> {
    /// Identity chain; several merged levels contribute one label each
    nesting_ids: RefCell<Vec<String>>,
    children: RefCell<Vec<LoopNodeRef<A, M>>>,
    bridge: RefCell<Option<Bridge>>,
    parent: OnceCell<Weak<LoopNode<A, M>>>,
    level: Box<dyn NestingLevel<A, M>>,
}

impl<A, M> fmt::Debug for LoopNode<A, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopNode")
            .field("nesting_ids", &self.nesting_ids.borrow())
            .field("children", &self.children.borrow().len())
            .field("has_bridge", &self.bridge.borrow().is_some())
            .field("has_parent", &self.parent().is_some())
            .finish()
    }
}

impl<A, M> LoopNode<A, M> {
    pub fn new(id: impl Into<String>, level: impl NestingLevel<A, M> + 'static) -> LoopNodeRef<A, M> {
        Rc::new(Self {
            nesting_ids: RefCell::new(vec![id.into()]),
            children: RefCell::new(Vec::new()),
            bridge: RefCell::new(None),
            parent: OnceCell::new(),
            level: Box::new(level),
        })
    }

    /// Last label of the identity chain.
    pub fn id(&self) -> String {
        self.nesting_ids.borrow().last().cloned().unwrap_or_default()
    }

    /// Full identity chain, outermost label first.
    pub fn nesting_level(&self) -> Vec<String> {
        self.nesting_ids.borrow().clone()
    }

    pub fn insert_nesting_level_id(&self, id: impl Into<String>) {
        self.nesting_ids.borrow_mut().push(id.into());
    }

    pub fn insert_nesting_level_ids<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = ids.into_iter().map(Into::into).collect();
        self.nesting_ids.borrow_mut().extend(ids);
    }

    pub fn set_bridge(&self, bridge: Bridge) {
        *self.bridge.borrow_mut() = Some(bridge);
    }

    pub fn bridge(&self) -> Option<Bridge> {
        self.bridge.borrow().clone()
    }

    /// The bridge, if one is set and it is a `T`.
    pub fn bridge_as<T: Any>(&self) -> Option<Rc<T>> {
        self.bridge().and_then(|bridge| bridge.downcast::<T>().ok())
    }

    pub fn parent(&self) -> Option<LoopNodeRef<A, M>> {
        self.parent.get().and_then(Weak::upgrade)
    }

    /// Appends `child` as the last lower level and points it back at `self`.
    ///
    /// A level belongs to one parent for its whole life: a child that already has a
    /// parent is rejected and nothing is appended. So is `self` or any level above it,
    /// which would close a cycle.
    #[instrument(level = "trace", skip_all, fields(child = %child.id()))]
    pub fn add_lower_level(self: &Rc<Self>, child: LoopNodeRef<A, M>) -> TreeResult<()> {
        let mut ancestor = Some(self.clone());
        while let Some(level) = ancestor {
            if Rc::ptr_eq(&level, &child) {
                return Err(TreeError::LevelCycle { id: child.id() });
            }
            ancestor = level.parent();
        }
        child
            .parent
            .set(Rc::downgrade(self))
            .map_err(|_| TreeError::ParentAlreadySet { id: child.id() })?;
        self.children.borrow_mut().push(child);
        Ok(())
    }

    /// All lower levels in registration order.
    pub fn lower_levels(&self) -> Vec<LoopNodeRef<A, M>> {
        self.children.borrow().clone()
    }

    /// First lower level whose [`id`](Self::id) is `name`.
    pub fn lower_level(&self, name: &str) -> Option<LoopNodeRef<A, M>> {
        self.children
            .borrow()
            .iter()
            .find(|child| child.id() == name)
            .cloned()
    }

    pub fn check_lower_level(&self, name: &str) -> bool {
        self.children.borrow().iter().any(|child| child.id() == name)
    }

    pub fn consider_for_computation(&self, mode: &M) -> bool {
        self.level.consider_for_computation(mode)
    }

    /// Lets this level build its lower levels.
    #[instrument(level = "debug", skip_all, fields(level = %self.id()))]
    pub fn create_tree(self: &Rc<Self>, argument: &mut A, mode: &M) -> TreeResult<()> {
        self.level.create_tree(self, argument, mode)
    }

    /// One pass over this level and its lower levels.
    ///
    /// A level not considered for `mode` is skipped together with its subtree. The
    /// children list is snapshotted before descending, so hooks may register new lower
    /// levels; those take part from the next pass on.
    pub fn nested_loop(&self, argument: &mut A, mode: &M) {
        if !self.level.consider_for_computation(mode) {
            trace!("Skipping level '{}'", self.id());
            return;
        }
        self.level.pre_nested_loop_operations(self, argument, mode);
        for child in self.lower_levels() {
            child.nested_loop(argument, mode);
        }
        self.level.post_nested_loop_operations(self, argument, mode);
    }

    pub fn set_loop_zero_collat_updater(&self) {
        self.level.set_loop_zero_collat_updater();
    }

    pub fn set_zero_collat_updater(&self) {
        self.level.set_zero_collat_updater();
    }

    /// Currencies and instruments of this level and everything below it.
    pub fn involved_instruments(&self) -> InvolvedInstruments {
        let mut instruments = InvolvedInstruments::default();
        self.collect_instruments(&mut instruments);
        instruments
    }

    fn collect_instruments(&self, instruments: &mut InvolvedInstruments) {
        self.level.collect_involved_instruments(self, instruments);
        for child in self.lower_levels() {
            child.collect_instruments(instruments);
        }
    }

    /// Writes the nesting structure below this level to the log at debug level.
    pub fn dump_to_logger(&self) {
        for line in self.to_tree_string().to_string().lines() {
            debug!("{}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Ead,
        Cva,
    }

    /// Records its label on the way down and up.
    struct Recording {
        skip_in: Option<Mode>,
    }

    impl NestingLevel<Vec<String>, Mode> for Recording {
        fn pre_nested_loop_operations(&self, node: &LoopNode<Vec<String>, Mode>, argument: &mut Vec<String>, _mode: &Mode) {
            argument.push(format!("pre:{}", node.id()));
        }

        fn post_nested_loop_operations(&self, node: &LoopNode<Vec<String>, Mode>, argument: &mut Vec<String>, _mode: &Mode) {
            argument.push(format!("post:{}", node.id()));
        }

        fn consider_for_computation(&self, mode: &Mode) -> bool {
            self.skip_in != Some(*mode)
        }
    }

    type Node = LoopNodeRef<Vec<String>, Mode>;

    fn recording(id: &str, skip_in: Option<Mode>) -> Node {
        LoopNode::new(id, Recording { skip_in })
    }

    // root
    // ├── a
    // │   └── a1
    // └── b (skipped for Cva)
    //     └── b1
    fn sample() -> Node {
        let root = recording("root", None);
        let a = recording("a", None);
        let b = recording("b", Some(Mode::Cva));
        root.add_lower_level(a.clone()).unwrap();
        root.add_lower_level(b.clone()).unwrap();
        a.add_lower_level(recording("a1", None)).unwrap();
        b.add_lower_level(recording("b1", None)).unwrap();
        root
    }

    #[test]
    fn test_nested_loop_order() {
        let root = sample();
        let mut events = Vec::new();

        root.nested_loop(&mut events, &Mode::Ead);

        assert_eq!(
            events,
            vec![
                "pre:root", "pre:a", "pre:a1", "post:a1", "post:a", "pre:b", "pre:b1", "post:b1",
                "post:b", "post:root",
            ]
        );
    }

    #[test]
    fn test_nested_loop_skips_rejected_subtree() {
        let root = sample();
        let mut events = Vec::new();

        root.nested_loop(&mut events, &Mode::Cva);

        assert_eq!(events, vec!["pre:root", "pre:a", "pre:a1", "post:a1", "post:a", "post:root"]);
    }

    #[test]
    fn test_identity_chain() {
        let node: LoopNodeRef<(), Mode> = LoopNode::new("cpty", StructuralLevel);
        node.insert_nesting_level_id("netting_set");
        node.insert_nesting_level_ids(["csa", "account"]);

        assert_eq!(node.id(), "account");
        assert_eq!(node.nesting_level(), vec!["cpty", "netting_set", "csa", "account"]);
    }

    #[test]
    fn test_lower_level_lookup() {
        let root = sample();

        assert!(root.check_lower_level("a"));
        assert!(!root.check_lower_level("a1"));
        assert_eq!(root.lower_level("b").map(|b| b.id()), Some("b".to_string()));
        assert!(root.lower_level("zz").is_none());
        let ids: Vec<String> = root.lower_levels().iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_parent_is_weak_and_set_once() {
        let root = sample();
        let a = root.lower_level("a").unwrap();
        assert!(Rc::ptr_eq(&a.parent().unwrap(), &root));
        assert!(root.parent().is_none());

        let other = recording("other", None);
        let err = other.add_lower_level(a.clone()).unwrap_err();
        assert_eq!(err, TreeError::ParentAlreadySet { id: "a".to_string() });
        assert!(!other.check_lower_level("a"));

        // children do not keep their parent alive
        drop(root);
        assert!(a.parent().is_none());
    }

    #[test]
    fn test_add_lower_level_rejects_cycles() {
        let root = sample();
        let a = root.lower_level("a").unwrap();
        let a1 = a.lower_level("a1").unwrap();

        let err = a1.add_lower_level(a1.clone()).unwrap_err();
        assert_eq!(err, TreeError::LevelCycle { id: "a1".to_string() });

        let err = a1.add_lower_level(root.clone()).unwrap_err();
        assert_eq!(err, TreeError::LevelCycle { id: "root".to_string() });

        assert!(a1.lower_levels().is_empty());
        assert!(root.parent().is_none());
        assert_eq!(Rc::strong_count(&a1), 2);

        let mut events = Vec::new();
        root.nested_loop(&mut events, &Mode::Ead);
        assert_eq!(events.len(), 10);
    }

    #[test]
    fn test_nesting_ids_from_iterator_reading_the_node() {
        let node: LoopNodeRef<(), Mode> = LoopNode::new("cpty", StructuralLevel);

        node.insert_nesting_level_ids((0..2).map(|i| format!("{}-{}", node.id(), i)));

        assert_eq!(node.nesting_level(), vec!["cpty", "cpty-0", "cpty-1"]);
    }

    #[test]
    fn test_bridge_is_shared_and_opaque() {
        let first: LoopNodeRef<(), Mode> = LoopNode::new("first", StructuralLevel);
        let second: LoopNodeRef<(), Mode> = LoopNode::new("second", StructuralLevel);
        assert!(first.bridge().is_none());

        let bridge: Bridge = Rc::new(42_u32);
        first.set_bridge(bridge.clone());
        second.set_bridge(bridge);

        assert_eq!(first.bridge_as::<u32>().as_deref(), Some(&42));
        assert!(first.bridge_as::<String>().is_none());
        assert!(Rc::ptr_eq(&first.bridge().unwrap(), &second.bridge().unwrap()));
    }

    struct Builder {
        fan_out: usize,
        built: Cell<bool>,
    }

    impl NestingLevel<usize, Mode> for Builder {
        fn create_tree(&self, node: &LoopNodeRef<usize, Mode>, argument: &mut usize, _mode: &Mode) -> TreeResult<()> {
            for i in 0..self.fan_out {
                node.add_lower_level(LoopNode::new(format!("{}-{}", node.id(), i), StructuralLevel))?;
                *argument += 1;
            }
            self.built.set(true);
            Ok(())
        }
    }

    #[test]
    fn test_create_tree_hook() {
        let root = LoopNode::new(
            "ns",
            Builder {
                fan_out: 3,
                built: Cell::new(false),
            },
        );
        let mut created = 0;

        root.create_tree(&mut created, &Mode::Ead).unwrap();

        assert_eq!(created, 3);
        assert!(root.check_lower_level("ns-2"));
        assert!(Rc::ptr_eq(&root.lower_level("ns-0").unwrap().parent().unwrap(), &root));
    }

    #[test]
    fn test_default_hooks_are_neutral() {
        let root: LoopNodeRef<u32, Mode> = LoopNode::new("root", StructuralLevel);
        root.add_lower_level(LoopNode::new("child", StructuralLevel)).unwrap();
        let mut argument = 7;

        root.create_tree(&mut argument, &Mode::Ead).unwrap();
        root.set_loop_zero_collat_updater();
        root.set_zero_collat_updater();
        root.nested_loop(&mut argument, &Mode::Cva);

        assert!(root.consider_for_computation(&Mode::Cva));
        assert_eq!(argument, 7);
        assert!(root.involved_instruments().is_empty());
        root.dump_to_logger();
    }
}
