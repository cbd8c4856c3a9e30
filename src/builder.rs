//! Bulk construction of a [`NodeTree`] from id sequences.

use tracing::{debug, instrument};

use crate::arena::{NodeId, NodeTree};
use crate::errors::TreeResult;
use crate::factory::{default_factory, ChildFactory};

impl<D: Default> NodeTree<D> {
    /// Inserts every id sequence below the root, creating missing nodes with
    /// [`default_factory`].
    ///
    /// See [`setup_with`](Self::setup_with).
    pub fn setup<I, P, S>(&mut self, paths: I) -> TreeResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[S]>,
        S: AsRef<str>,
    {
        self.setup_with(paths, &default_factory::<D>)
    }
}

impl<D> NodeTree<D> {
    /// Inserts every id sequence below the root, creating missing nodes with `factory`.
    ///
    /// Sequences are root-exclusive (`["EU", "DE"]` ends at `ROOT/EU/DE`). Shared
    /// prefixes are reused; an empty sequence resolves to the root. Returns the node
    /// each sequence ends at.
    #[instrument(level = "debug", skip_all)]
    pub fn setup_with<I, P, S, F>(&mut self, paths: I, factory: &F) -> TreeResult<Vec<NodeId>>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<[S]>,
        S: AsRef<str>,
        F: ChildFactory<D> + ?Sized,
    {
        let root = self.root();
        let ends = paths
            .into_iter()
            .map(|path| self.descend_with(root, path.as_ref(), factory))
            .collect::<TreeResult<Vec<_>>>()?;
        debug!("Loaded {} paths, tree has {} nodes", ends.len(), self.node_count());
        Ok(ends)
    }
}

/// Parses one path per line, ids separated by `delimiter`.
///
/// Blank lines and lines starting with `#` are skipped; empty segments (from leading,
/// trailing or doubled delimiters) are dropped.
pub fn parse_path_lines(content: &str, delimiter: &str) -> Vec<Vec<String>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            line.split(delimiter)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        })
        .filter(|path| !path.is_empty())
        .collect()
}
