//! Hash-chained event and action logs
//!
//! The commitment of a list is a cons-fold of item hashes, seeded with the
//! list kind's empty hash and folded right-to-left so that the last item
//! sits innermost. Events and actions use disjoint prefixes.

use crate::codec::Codec;
use crate::hash::{prefixes, Hasher};
use crate::types::Field;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Which log a list belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListKind {
    /// Emitted events
    Events,
    /// Dispatched actions
    Actions,
}

impl ListKind {
    /// Seed prefix
    pub fn empty_prefix(&self) -> &'static str {
        match self {
            ListKind::Events => prefixes::EVENTS_EMPTY,
            ListKind::Actions => prefixes::ACTIONS_EMPTY,
        }
    }

    /// Cons prefix
    pub fn cons_prefix(&self) -> &'static str {
        match self {
            ListKind::Events => prefixes::EVENTS,
            ListKind::Actions => prefixes::ACTIONS,
        }
    }
}

/// Ordered items with a derived commitment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedList<T> {
    kind: ListKind,
    items: Vec<T>,
}

/// List whose items are raw field arrays
pub type GenericCommittedList = CommittedList<Vec<Field>>;

impl<T> CommittedList<T> {
    /// Empty list of the given kind
    pub fn empty(kind: ListKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
        }
    }

    /// List holding `items`
    pub fn from_items(kind: ListKind, items: Vec<T>) -> Self {
        Self { kind, items }
    }

    /// List kind
    pub fn kind(&self) -> ListKind {
        self.kind
    }

    /// Items in order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Append an item
    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// No items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Hash of one item
    pub fn item_hash(hasher: &dyn Hasher, codec: &Codec<T>, item: &T) -> Field {
        hasher.hash(prefixes::EVENT, &codec.encode(item))
    }

    /// Commitment of the whole list
    pub fn hash(&self, hasher: &dyn Hasher, codec: &Codec<T>) -> Field {
        self.items
            .iter()
            .rev()
            .fold(hasher.empty_hash(self.kind.empty_prefix()), |acc, item| {
                hasher.hash(
                    self.kind.cons_prefix(),
                    &[acc, Self::item_hash(hasher, codec, item)],
                )
            })
    }

    /// Project items to raw field arrays
    pub fn to_generic(&self, codec: &Codec<T>) -> GenericCommittedList {
        CommittedList {
            kind: self.kind,
            items: self.items.iter().map(|item| codec.encode(item)).collect(),
        }
    }

    /// Decode items from raw field arrays
    pub fn from_generic(generic: &GenericCommittedList, codec: &Codec<T>) -> Result<Self> {
        let items = generic
            .items
            .iter()
            .map(|fields| codec.decode(fields))
            .collect::<Result<Vec<T>>>()?;
        Ok(Self {
            kind: generic.kind,
            items,
        })
    }
}

impl GenericCommittedList {
    /// Commitment of a raw-field list
    pub fn generic_hash(&self, hasher: &dyn Hasher) -> Field {
        self.hash(hasher, &Codec::raw_fields())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;

    #[test]
    fn test_empty_hash_is_seed() {
        let h = Sha256Hasher;
        let list = GenericCommittedList::empty(ListKind::Events);
        assert_eq!(list.generic_hash(&h), h.empty_hash(prefixes::EVENTS_EMPTY));
    }

    #[test]
    fn test_fold_shape() {
        let h = Sha256Hasher;
        let a = vec![Field::from_u64(1)];
        let b = vec![Field::from_u64(2)];
        let list = GenericCommittedList::from_items(ListKind::Actions, vec![a.clone(), b.clone()]);

        let seed = h.empty_hash(prefixes::ACTIONS_EMPTY);
        let inner = h.hash(prefixes::ACTIONS, &[seed, h.hash(prefixes::EVENT, &b)]);
        let outer = h.hash(prefixes::ACTIONS, &[inner, h.hash(prefixes::EVENT, &a)]);
        assert_eq!(list.generic_hash(&h), outer);
    }

    #[test]
    fn test_kinds_do_not_collide() {
        let h = Sha256Hasher;
        let items = vec![vec![Field::from_u64(5)]];
        let events = GenericCommittedList::from_items(ListKind::Events, items.clone());
        let actions = GenericCommittedList::from_items(ListKind::Actions, items);
        assert_ne!(events.generic_hash(&h), actions.generic_hash(&h));
    }

    #[test]
    fn test_typed_generic_roundtrip() {
        let h = Sha256Hasher;
        let codec = Codec::<u64>::derived();
        let list = CommittedList::from_items(ListKind::Events, vec![3u64, 1, 4]);
        let generic = list.to_generic(&codec);
        assert_eq!(generic.generic_hash(&h), list.hash(&h, &codec));
        let back = CommittedList::from_generic(&generic, &codec).unwrap();
        assert_eq!(back, list);
    }
}
