use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Equality and hashing semantics used by an [`InternPool`].
///
/// Pools deliberately do not go through `T`'s own `PartialEq`/`Hash`
/// implementations: deduplication equality is not always the public equality.
/// `quarry-types` interns `Type` values with *interning* equality, which
/// treats type-variable references as unique by identity, while the public
/// `PartialEq` is structural. Keeping the two behind separate entry points
/// means neither can silently leak into the other.
pub trait InternStrategy<T: ?Sized> {
    fn hash(value: &T) -> u64;
    fn equals(a: &T, b: &T) -> bool;
}

/// Content equality, for entries whose public `Eq`/`Hash` already are the
/// interning semantics (strings, names, byte slices).
pub struct ContentEq;

impl<T: ?Sized + Hash + Eq> InternStrategy<T> for ContentEq {
    fn hash(value: &T) -> u64 {
        let mut h = DefaultHasher::new();
        value.hash(&mut h);
        h.finish()
    }

    fn equals(a: &T, b: &T) -> bool {
        a == b
    }
}

const EMPTY: u32 = u32::MAX;

/// An open-addressed, first-wins deduplication pool.
///
/// `intern` returns the first-ever-stored entry equal (per `S`) to its
/// argument; later equal inserts are no-ops that hand back the existing
/// `Arc`. Linear probing over a power-of-two table, resized by doubling at
/// roughly 2/3 load — probe cost matters more here than table size, so the
/// threshold is lower than a typical map's.
///
/// Entries additionally carry a stable 1-based ordinal (insertion order,
/// never reassigned) so a serializer can emit compact integer references via
/// [`position_of`](Self::position_of)/[`at_position`](Self::at_position).
/// [`modification_count`](Self::modification_count) lets a long-lived
/// consumer detect that the pool changed under it.
pub struct InternPool<T: ?Sized, S: InternStrategy<T> = ContentEq> {
    /// Canonical entries in insertion order; ordinal = index + 1.
    entries: Vec<Arc<T>>,
    /// Open-addressed table of indices into `entries`; `EMPTY` marks a free slot.
    table: Vec<u32>,
    mods: u64,
    _strategy: PhantomData<S>,
}

impl<T: ?Sized, S: InternStrategy<T>> InternPool<T, S> {
    pub fn new() -> Self {
        InternPool {
            entries: Vec::new(),
            table: vec![EMPTY; 16],
            mods: 0,
            _strategy: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of mutations so far; changes whenever an entry is admitted.
    pub fn modification_count(&self) -> u64 {
        self.mods
    }

    /// Intern `value`, returning the canonical entry.
    pub fn intern(&mut self, value: Arc<T>) -> Arc<T> {
        if let Some(existing) = self.find(&value) {
            return existing;
        }
        self.grow_if_needed();
        let ordinal = self.entries.len() as u32;
        let slot = self.free_slot(S::hash(&value));
        self.table[slot] = ordinal;
        self.entries.push(Arc::clone(&value));
        self.mods += 1;
        value
    }

    /// Look up the canonical entry equal to `value`, if any.
    pub fn find(&self, value: &T) -> Option<Arc<T>> {
        self.probe(value).map(|idx| Arc::clone(&self.entries[idx]))
    }

    /// The 1-based ordinal of the entry equal to `value`, if interned.
    pub fn position_of(&self, value: &T) -> Option<u32> {
        self.probe(value).map(|idx| idx as u32 + 1)
    }

    /// The entry at a 1-based ordinal previously returned by `position_of`.
    pub fn at_position(&self, position: u32) -> Option<Arc<T>> {
        if position == 0 {
            return None;
        }
        self.entries.get(position as usize - 1).map(Arc::clone)
    }

    /// Iterate canonical entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<T>> {
        self.entries.iter()
    }

    fn probe(&self, value: &T) -> Option<usize> {
        let mask = self.table.len() - 1;
        let mut slot = S::hash(value) as usize & mask;
        loop {
            match self.table[slot] {
                EMPTY => return None,
                idx => {
                    let entry = &self.entries[idx as usize];
                    if S::equals(entry, value) {
                        return Some(idx as usize);
                    }
                }
            }
            slot = (slot + 1) & mask;
        }
    }

    fn free_slot(&self, hash: u64) -> usize {
        let mask = self.table.len() - 1;
        let mut slot = hash as usize & mask;
        while self.table[slot] != EMPTY {
            slot = (slot + 1) & mask;
        }
        slot
    }

    fn grow_if_needed(&mut self) {
        if (self.entries.len() + 1) * 3 <= self.table.len() * 2 {
            return;
        }
        let new_capacity = self.table.len() * 2;
        self.table = vec![EMPTY; new_capacity];
        for (idx, entry) in self.entries.iter().enumerate() {
            let mask = new_capacity - 1;
            let mut slot = S::hash(entry) as usize & mask;
            while self.table[slot] != EMPTY {
                slot = (slot + 1) & mask;
            }
            self.table[slot] = idx as u32;
        }
    }
}

impl<T: ?Sized, S: InternStrategy<T>> Default for InternPool<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intern_is_idempotent_and_first_wins() {
        let mut pool: InternPool<str> = InternPool::new();
        let a: Arc<str> = Arc::from("java.lang.Object");
        let b: Arc<str> = Arc::from("java.lang.Object");
        assert!(!Arc::ptr_eq(&a, &b));

        let first = pool.intern(Arc::clone(&a));
        let second = pool.intern(b);
        assert!(Arc::ptr_eq(&first, &a));
        assert!(Arc::ptr_eq(&second, &a));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn positional_index_is_stable_across_growth() {
        let mut pool: InternPool<str> = InternPool::new();
        let names: Vec<String> = (0..100).map(|i| format!("com.acme.C{i}")).collect();
        for name in &names {
            pool.intern(Arc::from(name.as_str()));
        }
        assert_eq!(pool.len(), 100);
        for (i, name) in names.iter().enumerate() {
            assert_eq!(pool.position_of(name.as_str()), Some(i as u32 + 1));
            assert_eq!(&*pool.at_position(i as u32 + 1).unwrap(), name.as_str());
        }
        assert_eq!(pool.at_position(0), None);
        assert_eq!(pool.at_position(101), None);
        assert_eq!(pool.position_of("com.acme.Missing"), None);
    }

    #[test]
    fn modification_count_tracks_admissions_only() {
        let mut pool: InternPool<str> = InternPool::new();
        assert_eq!(pool.modification_count(), 0);
        pool.intern(Arc::from("a"));
        assert_eq!(pool.modification_count(), 1);
        pool.intern(Arc::from("a"));
        assert_eq!(pool.modification_count(), 1);
        pool.intern(Arc::from("b"));
        assert_eq!(pool.modification_count(), 2);
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut pool: InternPool<str> = InternPool::new();
        for name in ["c", "a", "b"] {
            pool.intern(Arc::from(name));
        }
        let seen: Vec<&str> = pool.iter().map(|e| &**e).collect();
        assert_eq!(seen, vec!["c", "a", "b"]);
    }

    proptest::proptest! {
        #[test]
        fn interning_any_order_yields_one_instance(values in proptest::collection::vec("[a-z]{1,8}", 1..50)) {
            let mut pool: InternPool<str> = InternPool::new();
            let mut canonical: std::collections::HashMap<String, Arc<str>> = Default::default();
            for v in &values {
                let interned = pool.intern(Arc::from(v.as_str()));
                let entry = canonical.entry(v.clone()).or_insert_with(|| Arc::clone(&interned));
                proptest::prop_assert!(Arc::ptr_eq(entry, &interned));
            }
            proptest::prop_assert_eq!(pool.len(), canonical.len());
        }
    }
}
