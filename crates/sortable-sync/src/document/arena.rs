use serde::Serialize;

/// Generational handle into the [`Arena`].
///
/// A freed slot is reused with a bumped generation, so a stale handle never
/// resolves to the node that replaced it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord, Serialize)]
pub struct NodeId {
    pub index: u32,
    pub generation: u32,
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot allocator with a free list.
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    pub fn alloc(&mut self, value: T) -> NodeId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            // Reuse freed slot, bump generation
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.value = Some(value);
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    /// Free a slot. Returns the value if the handle was live.
    pub fn free(&mut self, id: NodeId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        self.free_list.push(id.index);
        self.live -= 1;
        Some(value)
    }

    pub fn is_valid(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
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
    fn test_alloc_and_free() {
        let mut arena = Arena::new();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);

        assert_eq!(arena.free(a), Some("a"));
        assert!(!arena.is_valid(a));
        assert!(arena.is_valid(b));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_generation_increment() {
        let mut arena = Arena::new();
        let first = arena.alloc(1);
        arena.free(first);
        let second = arena.alloc(2);

        assert_eq!(first.index, second.index);
        assert_ne!(first.generation, second.generation);
        assert_eq!(arena.get(first), None);
        assert_eq!(arena.get(second), Some(&2));
    }

    #[test]
    fn test_double_free_is_noop() {
        let mut arena = Arena::new();
        let id = arena.alloc(());
        assert!(arena.free(id).is_some());
        assert!(arena.free(id).is_none());
        assert!(arena.is_empty());
    }
}
