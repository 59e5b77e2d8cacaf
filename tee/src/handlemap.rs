// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2026 VXD driver developers

//! Generation-checked slot map used for every id-to-object lookup on the
//! secure side (core contexts, stream contexts).  A [`Handle`] packs a slot
//! index and a generation counter into one `u32`, so a handle that survived
//! its object is detected instead of silently resolving to the slot's next
//! occupant.

use alloc::vec::Vec;

/// Opaque id handed across the trust boundary.  Index in the low half,
/// generation in the high half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Handle(u32);

impl Handle {
    pub const fn from_raw(raw: u32) -> Handle {
        Handle(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    const fn new(index: usize, generation: u16) -> Handle {
        Handle(((generation as u32) << 16) | (index as u32 & 0xffff))
    }

    const fn index(self) -> usize {
        (self.0 & 0xffff) as usize
    }

    const fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u16,
    value: Option<T>,
}

/// Arena of objects addressed by generation-checked [`Handle`]s.
#[derive(Debug)]
pub struct HandleMap<T> {
    slots: Vec<Slot<T>>,
}

impl<T> HandleMap<T> {
    pub const fn new() -> HandleMap<T> {
        HandleMap { slots: Vec::new() }
    }

    /// Stores `value` and returns its handle.  Free slots are reused;
    /// their generation was bumped at removal, so handles to the previous
    /// occupant stay dead.
    pub fn insert(&mut self, value: T) -> Handle {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_none() {
                slot.value = Some(value);
                return Handle::new(index, slot.generation);
            }
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        Handle::new(index, 0)
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Removes the object, invalidating every copy of its handle.
    pub fn remove(&mut self, handle: Handle) -> Option<T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation != handle.generation() || slot.value.is_none() {
            return None;
        }
        slot.generation = slot.generation.wrapping_add(1);
        slot.value.take()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.value.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for HandleMap<T> {
    fn default() -> Self {
        Self::new()
    }
}
