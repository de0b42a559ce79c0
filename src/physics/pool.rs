//! Fixed-capacity object pool.
//!
//! Slots are allocated once. A free-index stack hands them out and takes them
//! back, and an ordered active list keeps insertion order for iteration and
//! hit testing. Handles carry a generation so a released slot can't be reached
//! through an old handle.
//!
//! Invariant: `active_count() + free_count() == capacity()` at all times.

/// Reference to an acquired pool slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolHandle {
    index: u32,
    generation: u32,
}

impl PoolHandle {
    /// Slot index inside the pool.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
struct Slot<T> {
    value: T,
    generation: u32,
    in_use: bool,
}

/// Pool of reusable `T` instances with a soft active limit.
#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<Slot<T>>,
    /// Stack of free slot indices
    free: Vec<usize>,
    /// Acquired slot indices in acquisition order
    active: Vec<usize>,
    /// Maximum simultaneously active instances (<= capacity)
    limit: usize,
}

impl<T: Default> Pool<T> {
    /// Allocate `capacity` slots up front, all free.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                value: T::default(),
                generation: 0,
                in_use: false,
            })
            .collect();

        // Reverse so the first acquire pops slot 0
        let free = (0..capacity).rev().collect();

        Self {
            slots,
            free,
            active: Vec::with_capacity(capacity),
            limit: capacity,
        }
    }
}

impl<T> Pool<T> {
    /// Total allocated slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Set the soft active limit, clamped to capacity. Instances already active
    /// above a lowered limit stay until they are released.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.min(self.capacity());
    }

    /// How many more instances can be acquired right now.
    pub fn available(&self) -> usize {
        self.limit
            .saturating_sub(self.active.len())
            .min(self.free.len())
    }

    /// Take a free slot. Returns `None` when the limit is reached.
    ///
    /// The returned value holds whatever state its previous user left; callers
    /// reinitialize every field they rely on.
    pub fn acquire(&mut self) -> Option<(PoolHandle, &mut T)> {
        if self.available() == 0 {
            return None;
        }
        let index = self.free.pop()?;
        self.active.push(index);

        let slot = &mut self.slots[index];
        slot.in_use = true;
        let handle = PoolHandle {
            index: index as u32,
            generation: slot.generation,
        };
        Some((handle, &mut slot.value))
    }

    /// Return a slot to the free list. Returns false for stale handles or a
    /// second release of the same acquisition.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        if !self.is_live(handle) {
            log::warn!(
                "Ignoring release of stale pool handle (slot {}, generation {})",
                handle.index,
                handle.generation
            );
            return false;
        }

        let index = handle.index();
        if let Some(position) = self.active.iter().position(|&i| i == index) {
            self.active.remove(position);
        }
        self.free_slot(index);
        true
    }

    fn free_slot(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.in_use = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    fn is_live(&self, handle: PoolHandle) -> bool {
        self.slots
            .get(handle.index())
            .is_some_and(|slot| slot.in_use && slot.generation == handle.generation)
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        if self.is_live(handle) {
            Some(&self.slots[handle.index()].value)
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        if self.is_live(handle) {
            Some(&mut self.slots[handle.index()].value)
        } else {
            None
        }
    }

    /// Handle of the active instance at a slot index, if any.
    fn handle_at(&self, index: usize) -> PoolHandle {
        PoolHandle {
            index: index as u32,
            generation: self.slots[index].generation,
        }
    }

    /// Active instances in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = (PoolHandle, &T)> + '_ {
        self.active
            .iter()
            .map(move |&index| (self.handle_at(index), &self.slots[index].value))
    }

    /// Visit every active instance mutably; instances for which `keep` returns
    /// false are released in the same pass. Returns the number released.
    pub fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&mut T) -> bool,
    {
        let mut released = Vec::new();
        let slots = &mut self.slots;
        self.active.retain(|&index| {
            let kept = keep(&mut slots[index].value);
            if !kept {
                released.push(index);
            }
            kept
        });

        let count = released.len();
        for index in released {
            self.free_slot(index);
        }
        count
    }

    /// Release every active instance.
    pub fn clear(&mut self) {
        let active = std::mem::take(&mut self.active);
        for index in active {
            self.free_slot(index);
        }
    }
}
