//! Generational slot arena (design note 2, "Back-references and weak handles")
//!
//! Plugin records and the dependency graph reference each other by stable
//! handle rather than by mutual ownership or by a raw `u64` id. Grounded on
//! the `NodeId`/`HashMap<NodeId, _>` pattern in `rf-realtime/graph.rs`,
//! upgraded with slot reuse and a generation counter so a handle into a
//! removed-then-replaced slot is detected as stale rather than silently
//! resolving to the wrong record.

use std::marker::PhantomData;

/// A stable reference into an `Arena<T>`. Copy, so it can be stored freely in
/// adjacency lists without borrowing the arena.
pub struct Handle<T> {
    index: usize,
    generation: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}
impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

enum Slot<T> {
    Occupied { generation: u64, value: T },
    Vacant { generation: u64 },
}

/// `Vec<Slot<T>>` plus a free-list, generalized from the fixed-index node map
/// `rf-realtime/graph.rs` uses for `ProcessingGraph::nodes`.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub fn insert(&mut self, value: T) -> Handle<T> {
        if let Some(index) = self.free.pop() {
            let generation = match self.slots[index] {
                Slot::Vacant { generation } => generation,
                Slot::Occupied { .. } => unreachable!("free index must be vacant"),
            };
            self.slots[index] = Slot::Occupied { generation, value };
            Handle {
                index,
                generation,
                _marker: PhantomData,
            }
        } else {
            let index = self.slots.len();
            self.slots.push(Slot::Occupied {
                generation: 0,
                value,
            });
            Handle {
                index,
                generation: 0,
                _marker: PhantomData,
            }
        }
    }

    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index)?;
        match slot {
            Slot::Occupied { generation, .. } if *generation == handle.generation => {
                let next_generation = generation.wrapping_add(1);
                let Slot::Occupied { value, .. } =
                    std::mem::replace(slot, Slot::Vacant { generation: next_generation })
                else {
                    unreachable!()
                };
                self.free.push(handle.index);
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        match self.slots.get(handle.index)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        match self.slots.get_mut(handle.index)? {
            Slot::Occupied { generation, value } if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| match slot {
            Slot::Occupied { generation, value } => Some((
                Handle {
                    index,
                    generation: *generation,
                    _marker: PhantomData,
                },
                value,
            )),
            Slot::Vacant { .. } => None,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get_round_trips() {
        let mut arena = Arena::new();
        let h = arena.insert("a");
        assert_eq!(arena.get(h), Some(&"a"));
    }

    #[test]
    fn removed_handle_is_stale_after_slot_reuse() {
        let mut arena: Arena<&str> = Arena::new();
        let h1 = arena.insert("a");
        arena.remove(h1).unwrap();
        let h2 = arena.insert("b");
        assert_eq!(h1.index, h2.index, "slot should be reused");
        assert!(arena.get(h1).is_none(), "stale handle must not resolve");
        assert_eq!(arena.get(h2), Some(&"b"));
    }

    #[test]
    fn len_excludes_removed_slots() {
        let mut arena = Arena::new();
        let h1 = arena.insert(1);
        let _h2 = arena.insert(2);
        assert_eq!(arena.len(), 2);
        arena.remove(h1);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn iter_skips_vacant_slots() {
        let mut arena = Arena::new();
        let h1 = arena.insert(1);
        let h2 = arena.insert(2);
        arena.remove(h1);
        let remaining: Vec<_> = arena.iter().map(|(h, v)| (h, *v)).collect();
        assert_eq!(remaining, vec![(h2, 2)]);
    }
}
