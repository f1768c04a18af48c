//! Generic objects and the property table.
//!
//! An object owns a mutable `own` table plus a pointer to a read-only
//! `shared` table living on the prototype (consulted after `own` on lookup,
//! cloned into `own` on first write — see [`crate::property`]).

use hashbrown::HashMap;
use std::rc::Rc;

use crate::string_ref::JsString;
use crate::value::Value;

bitflags::bitflags! {
    /// Per-record flags (extensibility only; the richer per-frame flag set
    /// lives on [`crate::frame::FrameFlags`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ObjectFlags: u8 {
        /// Non-extensible objects silently drop new-property SETs.
        const NON_EXTENSIBLE = 0b0000_0001;
    }
}

bitflags::bitflags! {
    /// Property attribute bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const CONFIGURABLE = 0b001;
        const ENUMERABLE   = 0b010;
        const WRITABLE     = 0b100;
    }
}

impl Default for Attributes {
    fn default() -> Self {
        Attributes::CONFIGURABLE | Attributes::ENUMERABLE | Attributes::WRITABLE
    }
}

/// The kind of a property record.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    /// A plain data property.
    Property,
    /// A built-in method; subject to copy-on-first-access when found via
    /// the shared table.
    Method,
    /// A native getter invoked on read; writes are silently dropped.
    NativeGetter,
    /// A tombstone: the own binding was deleted but must still shadow the
    /// prototype's binding for `in` semantics.
    Whiteout,
}

/// One entry in a property table.
#[derive(Debug, Clone)]
pub struct PropertyRecord {
    pub name: JsString,
    pub value: Value,
    pub kind: PropertyKind,
    pub attributes: Attributes,
}

impl PropertyRecord {
    pub fn data(name: JsString, value: Value) -> Self {
        Self {
            name,
            value,
            kind: PropertyKind::Property,
            attributes: Attributes::default(),
        }
    }

    pub fn whiteout(name: JsString) -> Self {
        Self {
            name,
            value: Value::Undefined,
            kind: PropertyKind::Whiteout,
            attributes: Attributes::empty(),
        }
    }

    pub fn is_whiteout(&self) -> bool {
        matches!(self.kind, PropertyKind::Whiteout)
    }
}

/// A mutable, per-object property table.
#[derive(Debug, Clone, Default)]
pub struct PropertyTable {
    entries: HashMap<JsString, PropertyRecord>,
    /// Insertion order, needed for deterministic enumeration of
    /// generic-object own properties.
    order: Vec<JsString>,
}

impl PropertyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &JsString) -> Option<&PropertyRecord> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &JsString) -> Option<&mut PropertyRecord> {
        self.entries.get_mut(name)
    }

    pub fn insert(&mut self, record: PropertyRecord) {
        if !self.entries.contains_key(&record.name) {
            self.order.push(record.name.clone());
        }
        self.entries.insert(record.name.clone(), record);
    }

    /// Deletes a name outright (no whiteout). Used when the whiteout itself
    /// is being removed, or for array/primitive paths that don't need one.
    pub fn remove(&mut self, name: &JsString) -> Option<PropertyRecord> {
        let removed = self.entries.remove(name);
        if removed.is_some() {
            self.order.retain(|n| n != name);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enumerable own property names, in insertion order. Arrays enumerate
    /// indices in creation order; generic objects follow the same
    /// discipline here for determinism.
    pub fn enumerable_names(&self) -> Vec<JsString> {
        self.order
            .iter()
            .filter(|n| {
                self.entries
                    .get(*n)
                    .is_some_and(|r| !r.is_whiteout() && r.attributes.contains(Attributes::ENUMERABLE))
            })
            .cloned()
            .collect()
    }
}

/// A read-only, prototype-resident table of built-in methods, consulted
/// after `own` during lookup. Built once at VM init and shared by `Rc`
/// across every instance of a given prototype.
pub type SharedTable = Rc<HashMap<JsString, PropertyRecord>>;

pub fn build_shared_table(entries: impl IntoIterator<Item = (JsString, PropertyRecord)>) -> SharedTable {
    Rc::new(entries.into_iter().collect())
}

/// An object heap record: `{ own_hash, shared_hash, proto, flags }`.
#[derive(Debug, Clone)]
pub struct Object {
    pub own: PropertyTable,
    pub shared: Option<SharedTable>,
    pub proto: Option<crate::value::ObjectId>,
    pub flags: ObjectFlags,
}

impl Object {
    pub fn new(proto: Option<crate::value::ObjectId>) -> Self {
        Self {
            own: PropertyTable::new(),
            shared: None,
            proto,
            flags: ObjectFlags::empty(),
        }
    }

    pub fn with_shared(proto: Option<crate::value::ObjectId>, shared: SharedTable) -> Self {
        Self {
            own: PropertyTable::new(),
            shared: Some(shared),
            proto,
            flags: ObjectFlags::empty(),
        }
    }

    pub fn is_extensible(&self) -> bool {
        !self.flags.contains(ObjectFlags::NON_EXTENSIBLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_table_tracks_insertion_order() {
        let mut t = PropertyTable::new();
        t.insert(PropertyRecord::data(JsString::from_owned("b"), Value::Number(1.0)));
        t.insert(PropertyRecord::data(JsString::from_owned("a"), Value::Number(2.0)));
        let names: Vec<String> = t
            .enumerable_names()
            .into_iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn whiteout_is_not_enumerable() {
        let mut t = PropertyTable::new();
        let name = JsString::from_owned("x");
        t.insert(PropertyRecord::data(name.clone(), Value::Number(1.0)));
        t.insert(PropertyRecord::whiteout(name));
        assert!(t.enumerable_names().is_empty());
    }
}
