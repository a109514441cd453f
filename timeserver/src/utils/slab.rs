/// A token-indexed arena.
///
/// A `Slab` stores values in a contiguous array and hands out small
/// `usize` keys that stay valid until the value is removed. Freed keys are
/// reused, most recently freed first.
///
/// The reactor uses it as its registration table: the key doubles as the
/// poller token, so a readiness event leads straight back to the
/// connection state without any hashing.
pub(crate) struct Slab<T> {
    /// Occupied and vacant slots.
    entries: Vec<Option<T>>,
    /// Stack of vacant keys.
    free: Vec<usize>,
    /// Number of occupied slots.
    len: usize,
}

impl<T> Slab<T> {
    /// Creates an empty `Slab` with room for `capacity` values.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Key the next [`insert`](Self::insert) will use.
    pub(crate) fn vacant_key(&self) -> usize {
        self.free.last().copied().unwrap_or(self.entries.len())
    }

    /// Inserts a value and returns its key.
    pub(crate) fn insert(&mut self, value: T) -> usize {
        let key = match self.free.pop() {
            Some(key) => {
                self.entries[key] = Some(value);
                key
            }
            None => {
                self.entries.push(Some(value));
                self.entries.len() - 1
            }
        };

        self.len += 1;
        key
    }

    /// Removes and returns the value stored under `key`, if any.
    pub(crate) fn remove(&mut self, key: usize) -> Option<T> {
        let value = self.entries.get_mut(key)?.take()?;

        self.free.push(key);
        self.len -= 1;

        Some(value)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, key: usize) -> Option<&T> {
        self.entries.get(key)?.as_ref()
    }

    pub(crate) fn get_mut(&mut self, key: usize) -> Option<&mut T> {
        self.entries.get_mut(key)?.as_mut()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Keys of all occupied slots.
    pub(crate) fn keys(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(key, entry)| entry.as_ref().map(|_| key))
            .collect()
    }

    /// Iterates over occupied slots with their keys.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(key, entry)| entry.as_ref().map(|value| (key, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut slab = Slab::with_capacity(4);

        let a = slab.insert("a");
        let b = slab.insert("b");

        assert_ne!(a, b);
        assert_eq!(slab.len(), 2);
        assert_eq!(slab.get(a), Some(&"a"));
        assert_eq!(slab.remove(a), Some("a"));
        assert_eq!(slab.get(a), None);
        assert_eq!(slab.len(), 1);
    }

    #[test]
    fn removing_twice_is_harmless() {
        let mut slab = Slab::with_capacity(1);
        let key = slab.insert(7);

        assert_eq!(slab.remove(key), Some(7));
        assert_eq!(slab.remove(key), None);
        assert_eq!(slab.remove(99), None);
        assert_eq!(slab.len(), 0);
    }

    #[test]
    fn freed_keys_are_reused() {
        let mut slab = Slab::with_capacity(2);
        let first = slab.insert(1);
        let _second = slab.insert(2);

        slab.remove(first);
        assert_eq!(slab.vacant_key(), first);
        assert_eq!(slab.insert(3), first);
        assert_eq!(slab.vacant_key(), 2);
    }

    #[test]
    fn keys_and_iter_skip_vacant_slots() {
        let mut slab = Slab::with_capacity(3);
        let a = slab.insert('a');
        let b = slab.insert('b');
        let c = slab.insert('c');

        slab.remove(b);

        assert_eq!(slab.keys(), vec![a, c]);
        assert_eq!(
            slab.iter().map(|(_, v)| *v).collect::<Vec<_>>(),
            vec!['a', 'c']
        );

        if let Some(value) = slab.get_mut(c) {
            *value = 'z';
        }
        assert_eq!(slab.get(c), Some(&'z'));
    }
}
