use super::Handle;

pub struct AssetCache<T> {
    items: Vec<Option<T>>,
    generation: u32,
}

impl<T> AssetCache<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generation: 0,
        }
    }

    pub fn insert(&mut self, item: T) -> Handle<T> {
        let index = self.items.len();
        self.items.push(Some(item));
        Handle::new(index, self.generation)
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if handle.generation() != self.generation {
            return None;
        }
        self.items.get(handle.index()).and_then(Option::as_ref)
    }

    /// Takes the item out. Its slot is never reused, so the handle stays dead.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        if handle.generation() != self.generation {
            return None;
        }
        self.items.get_mut(handle.index()).and_then(Option::take)
    }

    /// Empties the cache and invalidates every handle issued so far.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.generation = self.generation.wrapping_add(1);
        self.items.drain(..).flatten()
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|item| item.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let mut cache = AssetCache::new();
        let h = cache.insert("checker");
        assert_eq!(cache.get(h), Some(&"checker"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn drain_invalidates_old_handles() {
        let mut cache = AssetCache::new();
        let old = cache.insert(1);
        assert_eq!(cache.drain().count(), 1);
        assert!(cache.is_empty());
        let new = cache.insert(2);
        assert_eq!(old.index(), new.index());
        assert_eq!(cache.get(old), None);
        assert_eq!(cache.get(new), Some(&2));
    }

    #[test]
    fn removed_handle_stays_dead() {
        let mut cache = AssetCache::new();
        let a = cache.insert('a');
        let b = cache.insert('b');
        assert_eq!(cache.remove(a), Some('a'));
        assert_eq!(cache.remove(a), None);
        assert_eq!(cache.get(a), None);
        assert_eq!(cache.len(), 1);
        let c = cache.insert('c');
        assert_ne!(a, c);
        assert_eq!(cache.get(b), Some(&'b'));
        assert_eq!(cache.drain().collect::<Vec<_>>(), vec!['b', 'c']);
    }
}
