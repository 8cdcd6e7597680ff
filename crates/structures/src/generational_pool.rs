use std::{marker::PhantomData, num::NonZeroU64};

/// Nonzero handle to an item in a generational pool. A handle is never reused
/// by the pool that created it, so a handle to a removed item stays invalid
/// even after its slot has been recycled.
///
/// The type parameter only tags the handle; it does not make the handle own
/// or borrow a `T`, so handles are `Send` and `Sync` regardless of `T`.
pub struct Handle<T>(NonZeroU64, PhantomData<fn() -> T>);

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Handle_ { index, generation } = (*self).into();
        f.debug_struct("Handle")
            .field("index", &index)
            .field("generation", &generation)
            .finish()
    }
}

impl<T> Handle<T> {
    /// The slot index of the handle. Two live handles never share an index,
    /// but a dead handle may share its index with a live one.
    #[must_use]
    pub fn index(&self) -> u32 {
        Handle_::from(*self).index
    }

    /// The packed representation of the handle, unique for the lifetime of the
    /// pool.
    #[must_use]
    pub fn to_bits(&self) -> u64 {
        self.0.get()
    }
}

struct Handle_ {
    index: u32,
    generation: u32,
}

impl<T> From<Handle<T>> for Handle_ {
    fn from(handle: Handle<T>) -> Self {
        let raw = handle.0.get();
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl<T> From<Handle_> for Handle<T> {
    fn from(handle: Handle_) -> Self {
        // Generations start at 1, so the packed value is never zero.
        let value = u64::from(handle.generation) << 32 | u64::from(handle.index);
        Self(
            NonZeroU64::new(value).expect("generation is never zero"),
            PhantomData,
        )
    }
}

enum Entry<T> {
    Occupied(T),
    Free { next: Option<u32> },
    /// The generation counter saturated; the slot is never handed out again.
    Retired,
}

struct Slot<T> {
    // Kept outside of the entry so that it survives the slot being freed.
    generation: u32,
    entry: Entry<T>,
}

/// An object pool that makes use of generational indices to avoid the ABA
/// problem.
pub struct GenerationalPool<T> {
    items: Vec<Slot<T>>,
    free_head: Option<u32>,
    len: usize,
}

impl<T> Default for GenerationalPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> GenerationalPool<T> {
    /// Initializes a new empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_head: None,
            len: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if the handle refers to a live item.
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Returns a reference to the item identified by the given handle.
    ///
    /// ## Returns
    ///
    /// `Some(&T)` if the handle is valid and `None` otherwise.
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let handle = Handle_::from(handle);
        let slot = self.items.get(handle.index as usize)?;

        match &slot.entry {
            Entry::Occupied(value) if slot.generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the item identified by the given handle.
    ///
    /// ## Returns
    ///
    /// `Some(&mut T)` if the handle is valid and `None` otherwise.
    #[must_use]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let handle = Handle_::from(handle);
        let slot = self.items.get_mut(handle.index as usize)?;

        match &mut slot.entry {
            Entry::Occupied(value) if slot.generation == handle.generation => Some(value),
            _ => None,
        }
    }

    /// Inserts a new value into the pool and returns a handle to it.
    ///
    /// ## Panics
    ///
    /// This function will panic if the pool would exceed `u32::MAX` slots.
    #[must_use]
    pub fn insert(&mut self, value: T) -> Handle<T> {
        self.len += 1;

        if let Some(index) = self.free_head {
            let slot = &mut self.items[index as usize];
            let Entry::Free { next } = slot.entry else {
                unreachable!("free list points at an occupied slot");
            };

            self.free_head = next;
            slot.entry = Entry::Occupied(value);
            Self::handle_(index, slot.generation)
        } else {
            let index = u32::try_from(self.items.len()).expect("max u32::MAX items!");

            self.items.push(Slot {
                generation: 1,
                entry: Entry::Occupied(value),
            });

            Self::handle_(index, 1)
        }
    }

    /// Removes the value identified by the given handle from the pool.
    ///
    /// ## Returns
    ///
    /// Returns the value if the handle is valid and `None` otherwise.
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        self.get(handle)?;

        let index = Handle_::from(handle).index;
        let slot = &mut self.items[index as usize];

        // If the slot is not saturated, we can reuse it.
        let replacement = if slot.generation < u32::MAX {
            slot.generation += 1;
            let next = self.free_head.replace(index);
            Entry::Free { next }
        } else {
            Entry::Retired
        };

        self.len -= 1;

        match std::mem::replace(&mut slot.entry, replacement) {
            Entry::Occupied(value) => Some(value),
            _ => unreachable!("validated above"),
        }
    }

    /// Iterates over all live items in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.entry {
                Entry::Occupied(value) => {
                    Some((Self::handle_(index as u32, slot.generation), value))
                }
                _ => None,
            })
    }

    /// Iterates mutably over all live items in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match &mut slot.entry {
                Entry::Occupied(value) => {
                    Some((Self::handle_(index as u32, slot.generation), value))
                }
                _ => None,
            })
    }

    /// Collects the handles of all live items. Useful when the pool must be
    /// mutated while walking it.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }

    #[inline]
    fn handle_(index: u32, generation: u32) -> Handle<T> {
        Handle_ { index, generation }.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove_one() {
        let mut pool = GenerationalPool::<u32>::new();

        let handle = pool.insert(42);

        assert_eq!(
            handle,
            Handle_ {
                index: 0,
                generation: 1
            }
            .into()
        );

        assert_eq!(pool.get(handle), Some(&42));
        assert_eq!(pool.get_mut(handle), Some(&mut 42));
        assert_eq!(pool.len(), 1);

        assert_eq!(pool.remove(handle), Some(42));
        assert!(!pool.contains(handle));
        assert!(pool.is_empty());
        assert_eq!(pool.free_head, Some(0));
        assert_eq!(pool.items[0].generation, 2);
    }

    #[test]
    fn handles() {
        let mut pool = GenerationalPool::<u32>::new();

        let handle = pool.insert(42);
        let handle2 = handle;

        assert_eq!(handle, handle2);
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.to_bits(), 1 << 32);

        assert_eq!(
            format!("{:?}", handle),
            "Handle { index: 0, generation: 1 }"
        );
    }

    #[test]
    fn insert_get_remove_many() {
        const COUNT: usize = 10;

        let mut pool = GenerationalPool::<u32>::new();
        let mut keys = vec![];

        for i in 0..COUNT {
            keys.push(pool.insert(i as u32));
        }

        for (i, k) in keys.iter().enumerate() {
            assert_eq!(pool.get(*k), Some(&(i as u32)));
        }

        assert_eq!(pool.iter().count(), COUNT);

        for (i, k) in keys.iter().enumerate() {
            assert_eq!(pool.remove(*k), Some(i as u32));
            assert!(!pool.contains(*k));
        }

        assert_eq!(pool.items.len(), COUNT);
        assert_eq!(pool.iter().count(), 0);
    }

    #[test]
    fn remove_twice() {
        let mut pool = GenerationalPool::<u32>::new();
        let handle = pool.insert(42);

        assert_eq!(pool.remove(handle), Some(42));
        assert_eq!(pool.remove(handle), None);

        let _ = pool.insert(43);
        assert_eq!(pool.remove(handle), None);
    }

    #[test]
    fn insert_remove_insert_get() {
        let mut pool = GenerationalPool::<u32>::new();

        let a = pool.insert(42);
        assert_eq!(pool.remove(a), Some(42));

        let b = pool.insert(43);
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.get(b), Some(&43));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
    }

    #[test]
    fn saturated_slot_is_retired() {
        let mut pool = GenerationalPool::<u32>::new();

        let a = pool.insert(1);
        pool.items[0].generation = u32::MAX;
        let a_max = Handle_ {
            index: a.index(),
            generation: u32::MAX,
        }
        .into();

        assert_eq!(pool.remove(a_max), Some(1));
        assert_eq!(pool.free_head, None);

        let b = pool.insert(2);
        assert_eq!(b.index(), 1);
    }

    #[test]
    fn drops_once() {
        use std::rc::Rc;

        let marker = Rc::new(());
        let mut pool = GenerationalPool::new();

        let a = pool.insert(marker.clone());
        assert_eq!(Rc::strong_count(&marker), 2);

        drop(pool.remove(a));
        assert_eq!(Rc::strong_count(&marker), 1);

        let _b = pool.insert(marker.clone());
        drop(pool);
        assert_eq!(Rc::strong_count(&marker), 1);
    }
}
