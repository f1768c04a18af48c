//! Arena allocator for heap records.
//!
//! Rather than hand out owning pointers, this is a `Vec<Option<HeapRecord>>`
//! with a free list, handing out `ObjectId` indices instead of pointers.
//! Bulk release (VM teardown) drops the whole `Vec`; freeing a single record
//! at frame exit is `Arena::free`, returning a slot to the free list for
//! reuse — no `unsafe` required.

use crate::array::ArrayStorage;
use crate::error::{VmError, VmResult};
use crate::function::{Lambda, NativeFn};
use crate::limits::VmLimits;
use crate::object::Object;
use crate::value::ObjectId;

/// One heap-resident record. Every record embeds an [`Object`] so property
/// access is uniform across arrays/functions/regexps — only the "special"
/// payload differs (array storage, lambda, regexp data).
#[derive(Debug, Clone)]
pub enum HeapRecord {
    Plain(Object),
    Array(Object, ArrayStorage),
    Function(Object, Lambda),
    Native(Object, NativeFn),
    RegExp(Object, RegExpData),
}

/// Minimal regexp payload: a source string and a flags byte. There is no
/// matching engine behind it; construction and property access work, but
/// nothing executes the pattern.
#[derive(Debug, Clone)]
pub struct RegExpData {
    pub source: String,
    pub flags: u8,
}

impl HeapRecord {
    pub fn object(&self) -> &Object {
        match self {
            HeapRecord::Plain(o)
            | HeapRecord::Array(o, _)
            | HeapRecord::Function(o, _)
            | HeapRecord::Native(o, _)
            | HeapRecord::RegExp(o, _) => o,
        }
    }

    pub fn object_mut(&mut self) -> &mut Object {
        match self {
            HeapRecord::Plain(o)
            | HeapRecord::Array(o, _)
            | HeapRecord::Function(o, _)
            | HeapRecord::Native(o, _)
            | HeapRecord::RegExp(o, _) => o,
        }
    }
}

#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Option<HeapRecord>>,
    free_list: Vec<u32>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, record: HeapRecord, limits: &VmLimits) -> VmResult<ObjectId> {
        if let Some(index) = self.free_list.pop() {
            self.slots[index as usize] = Some(record);
            return Ok(ObjectId(index));
        }

        if self.slots.len() >= limits.max_arena_records {
            return Err(VmError::memory_error(format!(
                "arena exhausted: {} records",
                limits.max_arena_records
            )));
        }

        let index = self.slots.len() as u32;
        self.slots.push(Some(record));
        log::trace!("arena: allocated record {index}");
        Ok(ObjectId(index))
    }

    pub fn get(&self, id: ObjectId) -> VmResult<&HeapRecord> {
        self.slots
            .get(id.0 as usize)
            .and_then(|s| s.as_ref())
            .ok_or_else(|| VmError::reference_error(format!("dangling heap reference {}", id.0)))
    }

    pub fn get_mut(&mut self, id: ObjectId) -> VmResult<&mut HeapRecord> {
        self.slots
            .get_mut(id.0 as usize)
            .and_then(|s| s.as_mut())
            .ok_or_else(|| VmError::reference_error(format!("dangling heap reference {}", id.0)))
    }

    /// Returns a slot to the free list for reuse.
    /// Only safe to call when no other `Value` still references `id` — the
    /// interpreter only does this for frame-local synthetic records.
    pub fn free(&mut self, id: ObjectId) {
        if let Some(slot) = self.slots.get_mut(id.0 as usize) {
            *slot = None;
            self.free_list.push(id.0);
            log::trace!("arena: freed record {}", id.0);
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_and_get_roundtrip() {
        let mut arena = Arena::new();
        let limits = VmLimits::default();
        let id = arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap();
        assert!(arena.get(id).is_ok());
    }

    #[test]
    fn freed_slot_is_reused() {
        let mut arena = Arena::new();
        let limits = VmLimits::default();
        let id1 = arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap();
        arena.free(id1);
        let id2 = arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn dangling_reference_is_reference_error() {
        let mut arena = Arena::new();
        let limits = VmLimits::default();
        let id = arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap();
        arena.free(id);
        assert!(arena.get(id).is_err());
    }

    #[test]
    fn arena_exhaustion_is_memory_error() {
        let mut arena = Arena::new();
        let limits = VmLimits {
            max_arena_records: 1,
            ..VmLimits::default()
        };
        arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap();
        let err = arena.alloc(HeapRecord::Plain(Object::new(None)), &limits).unwrap_err();
        assert!(matches!(err, VmError::MemoryError(_)));
    }
}
