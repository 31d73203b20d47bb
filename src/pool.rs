use std::ops::{Deref, DerefMut};
use std::panic::Location;

use parking_lot::Mutex;

use crate::backend::Field;

/// Initial capacity for pooled field buffers.
const FIELD_BUFFER_CAPACITY: usize = 32;

/// Thread-safe free-list pool of scratch buffers.
///
/// `acquire` hands out an exclusive [`PoolGuard`]; the item goes back to the
/// free list when the guard drops, on every exit path including unwinds.
/// There is no ordering guarantee between which physical buffer a given
/// call receives. An empty free list builds a fresh item, so checkout
/// cannot fail.
pub struct ScratchPool<T> {
    items: Mutex<Vec<T>>,
    make: fn() -> T,
}

impl<T> ScratchPool<T> {
    pub fn new(make: fn() -> T) -> ScratchPool<T> {
        ScratchPool { items: Mutex::new(Vec::new()), make }
    }

    /// Check out a scratch item for the duration of one call.
    pub fn acquire(&self) -> PoolGuard<'_, T> {
        let recycled = self.items.lock().pop();
        let item = recycled.unwrap_or_else(|| (self.make)());
        PoolGuard { pool: self, item: Some(item) }
    }

    /// Number of idle items currently on the free list.
    pub fn idle(&self) -> usize {
        self.items.lock().len()
    }

    fn release(&self, item: T) {
        self.items.lock().push(item);
    }
}

/// Exclusive handle to a pooled scratch item.
pub struct PoolGuard<'a, T> {
    pool: &'a ScratchPool<T>,
    item: Option<T>,
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.item.as_ref().expect("pool guard holds its item until drop")
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.item.as_mut().expect("pool guard holds its item until drop")
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            self.pool.release(item);
        }
    }
}

/// Single-slot call-site buffer, checked out per in-flight handle call.
#[derive(Default)]
pub struct FrameScratch {
    pub site: [Option<&'static Location<'static>>; 1],
}

impl FrameScratch {
    pub fn new() -> FrameScratch {
        FrameScratch::default()
    }
}

/// Reusable field buffer.
///
/// The consumer clears the length right after checkout; capacity is
/// retained across uses so steady-state handling does not reallocate.
pub struct FieldBuffer {
    pub fields: Vec<Field>,
}

impl FieldBuffer {
    pub fn new() -> FieldBuffer {
        FieldBuffer { fields: Vec::with_capacity(FIELD_BUFFER_CAPACITY) }
    }
}

impl Default for FieldBuffer {
    fn default() -> FieldBuffer {
        FieldBuffer::new()
    }
}
