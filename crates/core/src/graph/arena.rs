use std::collections::HashMap;
use std::hash::Hash;

/// Identifier types stored in an [`Arena`].
pub trait ArenaId: Copy + Eq + Hash + Ord {
    fn from_raw(raw: u64) -> Self;
    fn raw(self) -> u64;
}

/// Slot storage addressed by stable, monotonically assigned ids.
///
/// Freed slots are reused, ids never are, so a lookup with a removed id
/// returns `None` instead of aliasing whatever now occupies the slot.
#[derive(Debug, Clone)]
pub struct Arena<K, T> {
    slots: Vec<Option<T>>,
    index: HashMap<K, usize>,
    free: Vec<usize>,
    next_id: u64,
}

impl<K: ArenaId, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            free: Vec::new(),
            next_id: 1,
        }
    }
}

impl<K: ArenaId, T> Arena<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id and stores the value built from it.
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        let id = K::from_raw(self.next_id);
        self.next_id += 1;
        let value = build(id);

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(value);
                slot
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        };
        self.index.insert(id, slot);
        id
    }

    pub fn get(&self, id: K) -> Option<&T> {
        let slot = *self.index.get(&id)?;
        self.slots.get(slot)?.as_ref()
    }

    pub fn get_mut(&mut self, id: K) -> Option<&mut T> {
        let slot = *self.index.get(&id)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    pub fn remove(&mut self, id: K) -> Option<T> {
        let slot = self.index.remove(&id)?;
        let value = self.slots.get_mut(slot)?.take();
        self.free.push(slot);
        value
    }

    pub fn contains(&self, id: K) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Live ids in creation order.
    pub fn ids(&self) -> Vec<K> {
        let mut ids: Vec<K> = self.index.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }
}
