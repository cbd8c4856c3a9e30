use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("Child '{id}' not found in node: {node}")]
    ChildNotFound {
        id: String,
        node: String,
    },

    #[error("Node not found in tree (stale or foreign id)")]
    NodeNotFound,

    #[error("Cannot collapse '{id}' into the root: the root has no parent to delete it from")]
    CollapseAtRoot {
        id: String,
    },

    #[error("Parent already set for nesting level: {id}")]
    ParentAlreadySet {
        id: String,
    },

    #[error("Nesting level '{id}' would become a lower level of itself")]
    LevelCycle {
        id: String,
    },
}

pub type TreeResult<T> = Result<T, TreeError>;
