// src/collections.rs
//! Insertion-ordered Map<K, V> and Set<T> collections.
//!
//! Both collections keep an append-only log of entry slots next to a
//! hashbrown key index. Deleting an entry tombstones its slot in place
//! instead of compacting, so iteration cursors handed out earlier remain
//! valid across arbitrary mutation: a cursor is a log position, advancing
//! skips tombstones, and newly inserted entries append to the log where
//! every outstanding cursor will eventually reach them. Compaction of the
//! log is deferred until no cursors are outstanding.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::value::{Value, ValueKey};

/// Reference-counted map handle.
pub type RcMap = Rc<RefCell<ShrewMap>>;
/// Reference-counted set handle.
pub type RcSet = Rc<RefCell<ShrewSet>>;

/// A position token into a collection's entry log.
///
/// `current` is only meaningful after the owning collection's `advance`
/// has returned `true`; `next` is where the following advance resumes.
#[derive(Debug)]
pub struct EntryCursor {
    next: Cell<usize>,
    current: Cell<usize>,
}

impl EntryCursor {
    fn head() -> Self {
        Self {
            next: Cell::new(0),
            current: Cell::new(0),
        }
    }
}

#[derive(Debug)]
struct Slot {
    key: Value,
    value: Value,
    live: bool,
}

// =============================================================================
// ShrewMap - insertion-ordered Map<K, V>
// =============================================================================

/// An insertion-ordered map of Shrew values.
#[derive(Debug)]
pub struct ShrewMap {
    slots: Vec<Slot>,
    index: HashMap<ValueKey, usize, FxBuildHasher>,
    live: usize,
    cursors: usize,
}

impl ShrewMap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::with_hasher(FxBuildHasher),
            live: 0,
            cursors: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Insert or update. Updating an existing key rewrites the value in its
    /// original slot, so entry order (and what outstanding cursors see at
    /// that position) is preserved.
    pub fn insert(&mut self, key: Value, value: Value) {
        let lookup = ValueKey(key.clone());
        if let Some(&at) = self.index.get(&lookup) {
            self.slots[at].value = value;
            return;
        }
        let at = self.slots.len();
        self.slots.push(Slot {
            key,
            value,
            live: true,
        });
        self.index.insert(lookup, at);
        self.live += 1;
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        let at = *self.index.get(&ValueKey(key.clone()))?;
        Some(self.slots[at].value.clone())
    }

    pub fn has(&self, key: &Value) -> bool {
        self.index.contains_key(&ValueKey(key.clone()))
    }

    /// Remove a key, returning whether it was present. The slot is
    /// tombstoned in place; its key and value are released immediately.
    pub fn delete(&mut self, key: &Value) -> bool {
        match self.index.remove(&ValueKey(key.clone())) {
            Some(at) => {
                let slot = &mut self.slots[at];
                slot.live = false;
                slot.key = Value::Undefined;
                slot.value = Value::Undefined;
                self.live -= 1;
                self.maybe_compact();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.live = 0;
        if self.cursors == 0 {
            self.slots.clear();
        } else {
            for slot in &mut self.slots {
                slot.live = false;
                slot.key = Value::Undefined;
                slot.value = Value::Undefined;
            }
        }
    }

    // -------------------------------------------------------------------------
    // Cursor API
    // -------------------------------------------------------------------------

    /// Hand out a cursor at the head of the entry log. The collection
    /// defers log compaction until every cursor has been released.
    pub fn cursor(&mut self) -> EntryCursor {
        self.cursors += 1;
        EntryCursor::head()
    }

    /// Move `cursor` to the next live entry at or after its position.
    /// Returns `false` when the log is exhausted.
    pub fn advance(&self, cursor: &EntryCursor) -> bool {
        let mut pos = cursor.next.get();
        while pos < self.slots.len() {
            if self.slots[pos].live {
                cursor.current.set(pos);
                cursor.next.set(pos + 1);
                return true;
            }
            pos += 1;
        }
        cursor.next.set(pos);
        false
    }

    /// Key at the cursor's current entry. Only meaningful directly after a
    /// successful `advance`.
    pub fn key_at(&self, cursor: &EntryCursor) -> Value {
        self.slots
            .get(cursor.current.get())
            .map_or(Value::Undefined, |slot| slot.key.clone())
    }

    /// Value at the cursor's current entry.
    pub fn value_at(&self, cursor: &EntryCursor) -> Value {
        self.slots
            .get(cursor.current.get())
            .map_or(Value::Undefined, |slot| slot.value.clone())
    }

    /// Called by an iterator when it exhausts or is dropped.
    pub fn release_cursor(&mut self) {
        debug_assert!(self.cursors > 0);
        self.cursors = self.cursors.saturating_sub(1);
        self.maybe_compact();
    }

    /// Slots in the entry log, tombstones included.
    pub fn log_len(&self) -> usize {
        self.slots.len()
    }

    fn maybe_compact(&mut self) {
        if self.cursors > 0 {
            return;
        }
        let dead = self.slots.len() - self.live;
        if dead < 8 || dead * 2 < self.slots.len() {
            return;
        }
        tracing::debug!(
            slots = self.slots.len(),
            live = self.live,
            "compacting entry log"
        );
        self.slots.retain(|slot| slot.live);
        self.index.clear();
        for (at, slot) in self.slots.iter().enumerate() {
            self.index.insert(ValueKey(slot.key.clone()), at);
        }
    }
}

impl Default for ShrewMap {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ShrewSet - insertion-ordered Set<T>
// =============================================================================

/// An insertion-ordered set of Shrew values, backed by the same entry log
/// as the map; an element is its own key.
#[derive(Debug)]
pub struct ShrewSet {
    entries: ShrewMap,
}

impl ShrewSet {
    pub fn new() -> Self {
        Self {
            entries: ShrewMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a value, returning whether it was newly inserted.
    pub fn add(&mut self, value: Value) -> bool {
        if self.entries.has(&value) {
            return false;
        }
        self.entries.insert(value, Value::Undefined);
        true
    }

    pub fn has(&self, value: &Value) -> bool {
        self.entries.has(value)
    }

    pub fn delete(&mut self, value: &Value) -> bool {
        self.entries.delete(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn cursor(&mut self) -> EntryCursor {
        self.entries.cursor()
    }

    pub fn advance(&self, cursor: &EntryCursor) -> bool {
        self.entries.advance(cursor)
    }

    /// The element at the cursor's current entry. A set element is both its
    /// own key and its own value.
    pub fn value_at(&self, cursor: &EntryCursor) -> Value {
        self.entries.key_at(cursor)
    }

    pub fn release_cursor(&mut self) {
        self.entries.release_cursor();
    }

    pub fn log_len(&self) -> usize {
        self.entries.log_len()
    }
}

impl Default for ShrewSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Value {
        Value::Int(i)
    }

    #[test]
    fn map_insert_get_delete() {
        let mut map = ShrewMap::new();
        assert!(map.is_empty());
        map.insert(int(1), int(100));
        map.insert(int(2), int(200));
        assert_eq!(map.len(), 2);
        assert!(matches!(map.get(&int(1)), Some(Value::Int(100))));
        assert!(map.get(&int(3)).is_none());
        assert!(map.delete(&int(1)));
        assert!(!map.delete(&int(1)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn map_update_keeps_entry_order() {
        let mut map = ShrewMap::new();
        map.insert(int(1), int(10));
        map.insert(int(2), int(20));
        map.insert(int(1), int(11));

        let cursor = map.cursor();
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(1)));
        assert!(matches!(map.value_at(&cursor), Value::Int(11)));
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(2)));
        assert!(!map.advance(&cursor));
        map.release_cursor();
    }

    #[test]
    fn cursor_skips_tombstones() {
        let mut map = ShrewMap::new();
        map.insert(int(1), int(10));
        map.insert(int(2), int(20));
        map.insert(int(3), int(30));
        map.delete(&int(2));

        let cursor = map.cursor();
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(1)));
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(3)));
        assert!(!map.advance(&cursor));
        map.release_cursor();
    }

    #[test]
    fn cursor_sees_entries_inserted_after_creation() {
        let mut map = ShrewMap::new();
        map.insert(int(1), int(10));
        let cursor = map.cursor();
        map.insert(int(2), int(20));

        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(1)));
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(2)));
        assert!(!map.advance(&cursor));
        map.release_cursor();
    }

    #[test]
    fn deleting_current_entry_does_not_stall_cursor() {
        let mut map = ShrewMap::new();
        map.insert(int(1), int(10));
        map.insert(int(2), int(20));

        let cursor = map.cursor();
        assert!(map.advance(&cursor));
        map.delete(&int(1));
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(2)));
        map.release_cursor();
    }

    #[test]
    fn compaction_waits_for_cursor_release() {
        let mut map = ShrewMap::new();
        for i in 0..20 {
            map.insert(int(i), int(i * 10));
        }
        let cursor = map.cursor();
        for i in 0..16 {
            map.delete(&int(i));
        }
        // Tombstones pile up while the cursor is outstanding.
        assert_eq!(map.log_len(), 20);
        assert!(map.advance(&cursor));
        assert!(matches!(map.key_at(&cursor), Value::Int(16)));

        map.release_cursor();
        assert_eq!(map.log_len(), 4);
        assert_eq!(map.len(), 4);
        assert!(matches!(map.get(&int(18)), Some(Value::Int(180))));
    }

    #[test]
    fn set_add_has_delete() {
        let mut set = ShrewSet::new();
        assert!(set.add(int(1)));
        assert!(!set.add(int(1)));
        assert!(set.add(int(2)));
        assert!(set.has(&int(1)));
        assert!(set.delete(&int(1)));
        assert!(!set.has(&int(1)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn set_cursor_yields_elements_in_insertion_order() {
        let mut set = ShrewSet::new();
        set.add(int(3));
        set.add(int(1));
        set.add(int(2));

        let cursor = set.cursor();
        let mut seen = Vec::new();
        while set.advance(&cursor) {
            if let Value::Int(i) = set.value_at(&cursor) {
                seen.push(i);
            }
        }
        set.release_cursor();
        assert_eq!(seen, vec![3, 1, 2]);
    }

    #[test]
    fn clear_with_outstanding_cursor_tombstones_all() {
        let mut map = ShrewMap::new();
        map.insert(int(1), int(10));
        let cursor = map.cursor();
        map.clear();
        assert!(map.is_empty());
        assert!(!map.advance(&cursor));
        map.release_cursor();
    }
}
