//! Fixed-capacity id → record tables.
//!
//! A [`ResourceTable`] is a flat array indexed directly by id. Slot 0 is
//! reserved so a zero id always means "unused"; valid ids are `1..=max`.
//! Allocation is first-fit from id 1, so released ids are handed out again
//! and callers must not assume ids grow monotonically.

use crate::error::{SaiError, SaiResult};

#[derive(Debug, Clone)]
pub struct ResourceTable<R> {
    name: &'static str,
    slots: Vec<Option<R>>,
    count: usize,
}

impl<R> ResourceTable<R> {
    /// Creates a table holding ids `1..=max`.
    pub fn new(name: &'static str, max: u32) -> Self {
        let mut slots = Vec::new();
        slots.resize_with(max as usize + 1, || None);
        Self {
            name,
            slots,
            count: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Highest valid id.
    pub fn max(&self) -> u32 {
        (self.slots.len() - 1) as u32
    }

    /// Occupied slots.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_full(&self) -> bool {
        self.count == self.slots.len() - 1
    }

    /// First free id without claiming it.
    pub fn next_free(&self) -> SaiResult<u32> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .map(|(id, _)| id as u32)
            .ok_or(SaiError::ResourceExhausted { table: self.name })
    }

    /// Stores `record` in the first free slot and returns its id.
    pub fn allocate(&mut self, record: R) -> SaiResult<u32> {
        let id = self.next_free()?;
        self.slots[id as usize] = Some(record);
        self.count += 1;
        Ok(id)
    }

    /// Stores `record` at an id chosen elsewhere (e.g. by the SDK).
    pub fn insert_at(&mut self, id: u32, record: R) -> SaiResult<()> {
        let name = self.name;
        let slot = self.slot_mut(id).ok_or_else(|| {
            SaiError::invalid_parameter(format!("{} id {} out of range", name, id))
        })?;
        if slot.is_some() {
            return Err(SaiError::already_exists(format!("{} {}", name, id)));
        }
        *slot = Some(record);
        self.count += 1;
        Ok(())
    }

    /// Frees `id`, dropping the whole record. Returns it if the slot was
    /// occupied.
    pub fn release(&mut self, id: u32) -> Option<R> {
        let record = self.slot_mut(id)?.take()?;
        self.count -= 1;
        Some(record)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_ok()
    }

    pub fn get(&self, id: u32) -> SaiResult<&R> {
        self.slot(id)
            .and_then(Option::as_ref)
            .ok_or_else(|| self.missing(id))
    }

    pub fn get_mut(&mut self, id: u32) -> SaiResult<&mut R> {
        let err = self.missing(id);
        self.slot_mut(id).and_then(Option::as_mut).ok_or(err)
    }

    /// Occupied slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &R)> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(id, slot)| slot.as_ref().map(|r| (id as u32, r)))
    }

    fn slot(&self, id: u32) -> Option<&Option<R>> {
        if id == 0 {
            return None;
        }
        self.slots.get(id as usize)
    }

    fn slot_mut(&mut self, id: u32) -> Option<&mut Option<R>> {
        if id == 0 {
            return None;
        }
        self.slots.get_mut(id as usize)
    }

    fn missing(&self, id: u32) -> SaiError {
        SaiError::not_found(format!("{} {}", self.name, id))
    }
}
