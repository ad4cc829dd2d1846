use std::collections::HashMap;

use crate::model::EntityId;

/// Persistent set of selected entity ids.
///
/// Membership lives in a hash map from id to its slot in an insertion-ordered
/// vector, so lookups, inserts and removals are O(1) amortized. Removal leaves
/// a hole that is compacted once holes outnumber members. Order only drives
/// "recently selected" display and is ignored by equality.
///
/// The `&self` methods return a new set and leave the receiver untouched.
/// The `&mut` methods update in place and report whether anything changed;
/// the picker uses those so large selections are never copied.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    members: HashMap<EntityId, usize>,
    order: Vec<Option<EntityId>>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = EntityId>,
    {
        let mut set = Self::new();
        set.insert_all(ids);
        set
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.members.contains_key(id)
    }

    #[must_use]
    pub fn toggle(&self, id: &EntityId) -> Self {
        let mut next = self.clone();
        next.flip(id);
        next
    }

    /// Union with `ids`. Ids already present keep their original position.
    #[must_use]
    pub fn add_all<I>(&self, ids: I) -> Self
    where
        I: IntoIterator<Item = EntityId>,
    {
        let mut next = self.clone();
        next.insert_all(ids);
        next
    }

    #[must_use]
    pub fn remove(&self, id: &EntityId) -> Self {
        let mut next = self.clone();
        next.discard(id);
        next
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self::new()
    }

    /// Add `id` at the end. Returns false when it was already selected.
    pub fn insert(&mut self, id: EntityId) -> bool {
        if self.members.contains_key(&id) {
            return false;
        }
        self.members.insert(id.clone(), self.order.len());
        self.order.push(Some(id));
        true
    }

    /// Returns how many ids were new.
    pub fn insert_all<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = EntityId>,
    {
        ids.into_iter().filter(|id| self.insert(id.clone())).count()
    }

    pub fn discard(&mut self, id: &EntityId) -> bool {
        let Some(slot) = self.members.remove(id) else {
            return false;
        };
        self.order[slot] = None;
        while matches!(self.order.last(), Some(None)) {
            self.order.pop();
        }
        if self.order.len() > 2 * self.members.len() + 16 {
            self.compact();
        }
        true
    }

    /// Select `id` if absent, drop it otherwise. Always a change.
    pub fn flip(&mut self, id: &EntityId) {
        if !self.discard(id) {
            self.insert(id.clone());
        }
    }

    /// Returns false when the set was already empty.
    pub fn clear_in_place(&mut self) -> bool {
        if self.members.is_empty() {
            return false;
        }
        self.members.clear();
        self.order.clear();
        true
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.order.iter().flatten().cloned().collect()
    }

    /// Ids with the most recently selected first.
    pub fn recent(&self) -> Vec<EntityId> {
        self.order.iter().rev().flatten().cloned().collect()
    }

    /// The most recently selected id.
    pub fn last(&self) -> Option<&EntityId> {
        self.order.last().and_then(Option::as_ref)
    }

    fn compact(&mut self) {
        self.order.retain(Option::is_some);
        for (slot, id) in self.order.iter().enumerate() {
            if let Some(entry) = id.as_ref().and_then(|id| self.members.get_mut(id)) {
                *entry = slot;
            }
        }
    }
}

impl PartialEq for SelectionSet {
    fn eq(&self, other: &Self) -> bool {
        self.members.len() == other.members.len()
            && self.members.keys().all(|id| other.members.contains_key(id))
    }
}

impl Eq for SelectionSet {}

impl FromIterator<EntityId> for SelectionSet {
    fn from_iter<T: IntoIterator<Item = EntityId>>(iter: T) -> Self {
        Self::from_ids(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn ids(values: &[u64]) -> Vec<EntityId> {
        values.iter().copied().map(EntityId::Num).collect()
    }

    #[test]
    fn add_all_never_duplicates() {
        let set = SelectionSet::from_ids(ids(&[1, 2])).add_all(ids(&[2, 3, 3]));
        assert_eq!(set.len(), 3);
        assert_eq!(set.ids(), ids(&[1, 2, 3]));
    }

    #[test]
    fn removing_absent_id_is_a_no_op() {
        let set = SelectionSet::from_ids(ids(&[1]));
        let next = set.remove(&EntityId::Num(9));
        assert_eq!(next, set);
    }

    #[test]
    fn recent_lists_latest_selection_first() {
        let set = SelectionSet::new()
            .toggle(&EntityId::Num(5))
            .toggle(&EntityId::Key("k".into()))
            .toggle(&EntityId::Num(1));
        assert_eq!(
            set.recent(),
            vec![EntityId::Num(1), EntityId::Key("k".into()), EntityId::Num(5)]
        );
    }

    #[test]
    fn operations_leave_the_original_untouched() {
        let original = SelectionSet::from_ids(ids(&[1, 2]));
        let _ = original.toggle(&EntityId::Num(1));
        let _ = original.clear();
        assert_eq!(original.ids(), ids(&[1, 2]));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let left = SelectionSet::from_ids(ids(&[1, 2, 3]));
        let right = SelectionSet::from_ids(ids(&[3, 1, 2]));
        assert_eq!(left, right);
    }

    #[test]
    fn in_place_updates_report_changes_and_keep_order() {
        let mut set = SelectionSet::from_ids(ids(&[1, 2, 3]));
        assert!(!set.insert(EntityId::Num(2)));
        assert!(set.discard(&EntityId::Num(2)));
        assert!(!set.discard(&EntityId::Num(2)));
        assert_eq!(set.insert_all(ids(&[2, 3, 4])), 2);
        assert_eq!(set.ids(), ids(&[1, 3, 2, 4]));
        assert_eq!(set.last(), Some(&EntityId::Num(4)));

        set.flip(&EntityId::Num(1));
        assert_eq!(set.ids(), ids(&[3, 2, 4]));
        assert!(set.clear_in_place());
        assert!(!set.clear_in_place());
        assert_eq!(set.last(), None);
    }

    #[test]
    fn heavy_removal_keeps_order_after_compaction() {
        let mut set = SelectionSet::from_ids((0..100u64).map(EntityId::Num));
        for n in (0..100u64).filter(|n| n % 10 != 0) {
            assert!(set.discard(&EntityId::Num(n)));
        }
        assert_eq!(set.ids(), ids(&[0, 10, 20, 30, 40, 50, 60, 70, 80, 90]));

        set.insert(EntityId::Num(5));
        assert!(set.discard(&EntityId::Num(40)));
        assert!(set.contains(&EntityId::Num(90)));
        assert_eq!(set.recent()[..2].to_vec(), ids(&[5, 90]));
        assert!(set.discard(&EntityId::Num(90)));
        assert_eq!(set.last(), Some(&EntityId::Num(5)));
    }

    #[test]
    fn toggling_inside_a_large_selection_stays_cheap() {
        let mut set = SelectionSet::from_ids((0..200_000u64).map(EntityId::Num));
        let started = std::time::Instant::now();
        for n in 0..1_000u64 {
            set.flip(&EntityId::Num(n * 7));
            set.flip(&EntityId::Num(n * 7));
        }
        assert_eq!(set.len(), 200_000);
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(set.ids().len(), 200_000);
    }

    fn arb_set() -> impl Strategy<Value = SelectionSet> {
        prop::collection::vec(0u64..50, 0..30).prop_map(|values| SelectionSet::from_ids(ids(&values)))
    }

    proptest! {
        #[test]
        fn toggle_is_an_involution(set in arb_set(), id in 0u64..60) {
            let id = EntityId::Num(id);
            prop_assert_eq!(set.toggle(&id).toggle(&id), set);
        }

        #[test]
        fn add_all_is_idempotent(set in arb_set(), extra in prop::collection::vec(0u64..60, 0..20)) {
            let once = set.add_all(ids(&extra));
            let twice = once.add_all(ids(&extra));
            prop_assert_eq!(twice, once);
        }

        #[test]
        fn add_all_order_does_not_change_membership(
            set in arb_set(),
            extra in prop::collection::vec(0u64..60, 0..20),
        ) {
            let mut reversed = extra.clone();
            reversed.reverse();
            prop_assert_eq!(set.add_all(ids(&extra)), set.add_all(ids(&reversed)));
        }

        #[test]
        fn in_place_and_value_updates_agree(set in arb_set(), id in 0u64..60) {
            let id = EntityId::Num(id);
            let mut flipped = set.clone();
            flipped.flip(&id);
            prop_assert_eq!(flipped.ids(), set.toggle(&id).ids());
        }
    }
}
