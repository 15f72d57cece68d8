//! Owned call trees of account updates
//!
//! A node owns its value and its ordered children; there is no sharing and
//! no cycles. Commitments are always recomputed from content.
//!
//! ```text
//! forest_commitment([])   = 0
//! forest_commitment(c:cs) = H(cons, [tree_hash(c), forest_commitment(cs)])
//! tree_hash(t)            = H(node, [commitment(t.root), forest_commitment(t.children)])
//! ```

use crate::account_update::AccountUpdate;
use crate::config::NetworkId;
use crate::hash::{prefixes, Hasher};
use crate::types::Field;
use serde::{Deserialize, Serialize};

/// Tree node owning a value and its children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateTree<T> {
    /// Node value
    pub root: T,
    /// Ordered children
    #[serde(default = "Vec::new")]
    pub children: Vec<AccountUpdateTree<T>>,
}

/// Ordered list of trees
pub type AccountUpdateForest<T> = Vec<AccountUpdateTree<T>>;

impl<T> AccountUpdateTree<T> {
    /// Node with children
    pub fn new(root: T, children: Vec<AccountUpdateTree<T>>) -> Self {
        Self { root, children }
    }

    /// Childless node
    pub fn leaf(root: T) -> Self {
        Self::new(root, Vec::new())
    }

    /// Number of nodes
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(|c| c.size()).sum::<usize>()
    }

    /// Visit nodes parent-first with their depth
    pub fn for_each_node<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a T, usize)) {
        f(&self.root, depth);
        for child in &self.children {
            child.for_each_node(depth + 1, f);
        }
    }

    /// Visit nodes children-first with their depth
    pub fn for_each_node_inverted<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a T, usize)) {
        for child in &self.children {
            child.for_each_node_inverted(depth + 1, f);
        }
        f(&self.root, depth);
    }

    /// Bottom-up fold: one aggregate per subtree
    pub fn reduce<R>(&self, f: &mut impl FnMut(&T, Vec<R>) -> R) -> R {
        let children = self.children.iter().map(|c| c.reduce(f)).collect();
        f(&self.root, children)
    }

    /// Same shape, mapped values
    pub fn map<U>(&self, f: &mut impl FnMut(&T) -> U) -> AccountUpdateTree<U> {
        let root = f(&self.root);
        AccountUpdateTree {
            root,
            children: self.children.iter().map(|c| c.map(f)).collect(),
        }
    }

    /// Same shape, fallible mapping in pre-order; stops at the first error
    pub fn try_map<U, E>(
        &self,
        f: &mut impl FnMut(&T) -> Result<U, E>,
    ) -> Result<AccountUpdateTree<U>, E> {
        let root = f(&self.root)?;
        let children = self
            .children
            .iter()
            .map(|c| c.try_map(f))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(AccountUpdateTree { root, children })
    }

    /// Pre-order flattening of a forest with call depths
    pub fn flatten_forest(forest: &[AccountUpdateTree<T>]) -> Vec<(&T, usize)> {
        let mut out = Vec::new();
        for tree in forest {
            tree.for_each_node(0, &mut |node, depth| out.push((node, depth)));
        }
        out
    }

    /// Rebuild a forest from pre-order `(value, depth)` pairs
    ///
    /// Returns `None` when a depth jumps by more than one level.
    pub fn unflatten_forest(nodes: Vec<(T, usize)>) -> Option<AccountUpdateForest<T>> {
        let mut iter = nodes.into_iter().peekable();
        let forest = Self::unflatten_level(&mut iter, 0)?;
        if iter.peek().is_some() {
            return None;
        }
        Some(forest)
    }

    fn unflatten_level(
        iter: &mut std::iter::Peekable<std::vec::IntoIter<(T, usize)>>,
        depth: usize,
    ) -> Option<AccountUpdateForest<T>> {
        let mut level = Vec::new();
        while let Some((_, d)) = iter.peek() {
            if *d < depth {
                break;
            }
            if *d > depth {
                return None;
            }
            let (root, _) = iter.next()?;
            let children = Self::unflatten_level(iter, depth + 1)?;
            level.push(AccountUpdateTree { root, children });
        }
        Some(level)
    }
}

impl AccountUpdateTree<AccountUpdate> {
    /// Commitment of this subtree
    pub fn tree_hash(&self, hasher: &dyn Hasher, network: NetworkId) -> Field {
        let node = self.root.commitment(hasher, network);
        let children = hash_forest(&self.children, hasher, network);
        hasher.hash(prefixes::ACCOUNT_UPDATE_NODE, &[node, children])
    }
}

/// Commitment of a forest, folded right-to-left from zero
pub fn hash_forest(
    forest: &[AccountUpdateTree<AccountUpdate>],
    hasher: &dyn Hasher,
    network: NetworkId,
) -> Field {
    forest.iter().rev().fold(Field::ZERO, |acc, tree| {
        hasher.hash(
            prefixes::ACCOUNT_UPDATE_CONS,
            &[tree.tree_hash(hasher, network), acc],
        )
    })
}

impl<T> From<T> for AccountUpdateTree<T> {
    fn from(root: T) -> Self {
        Self::leaf(root)
    }
}
