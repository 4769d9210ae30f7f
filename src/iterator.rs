// src/iterator.rs
//! The Shrew iteration protocol.
//!
//! Three iterator families share one result shape and one brand mechanism:
//! sequence iterators walk arrays and typed views by index, keyed iterators
//! walk maps and sets through the collections' tombstone-tolerant cursor
//! API, and code point iterators decode text one logical character at a
//! time. Every family's step operation first proves the receiver carries
//! its own brand; exhaustion clears the target reference exactly once and
//! every later step reports completion.

use std::cell::RefCell;
use std::rc::Rc;

use crate::array::{RcArray, ShrewArray};
use crate::buffer::RcView;
use crate::collections::{EntryCursor, RcMap, RcSet};
use crate::errors::{IteratorFamily, RuntimeError, RuntimeResult, TargetKind};
use crate::text::{is_lead_surrogate, is_trail_surrogate, Text};
use crate::value::{to_length, Value};

/// Which of key, value, or both a step operation produces. Fixed at
/// iterator creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    Key,
    Value,
    KeyAndValue,
}

impl IterationKind {
    pub fn wants_key(self) -> bool {
        matches!(self, IterationKind::Key | IterationKind::KeyAndValue)
    }

    pub fn wants_value(self) -> bool {
        matches!(self, IterationKind::Value | IterationKind::KeyAndValue)
    }
}

// =============================================================================
// Step results
// =============================================================================

/// The `{value, done}` pair produced by every step. A fresh pair is built
/// per step; results are never aliased or reused.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub value: Value,
    pub done: bool,
}

impl StepResult {
    /// A non-terminal result carrying `value`.
    pub fn value(value: Value) -> Self {
        Self {
            value,
            done: false,
        }
    }

    /// A terminal result. Terminal results never carry a value.
    pub fn done() -> Self {
        Self {
            value: Value::Undefined,
            done: true,
        }
    }
}

// =============================================================================
// Iterator objects
// =============================================================================

#[derive(Debug, Clone)]
enum SequenceTarget {
    Array(RcArray),
    View(RcView),
}

#[derive(Debug, Clone)]
enum KeyedTarget {
    Map(RcMap),
    Set(RcSet),
}

/// Per-family internal state. The variant is the iterator's capability
/// tag: chosen exactly once at construction, never rewritten, and
/// pattern-matched by each family's step operation before any state is
/// touched. An enum variant either exists with all of its fields or not
/// at all, which is what makes construction atomic.
///
/// `target` (`text` for the code point family) doubles as the terminal
/// marker: it is cleared exactly once, when exhaustion is observed, and
/// never set again.
#[derive(Debug)]
enum IterState {
    Sequence {
        target: Option<SequenceTarget>,
        kind: IterationKind,
        index: u64,
    },
    Keyed {
        target: Option<KeyedTarget>,
        kind: IterationKind,
        cursor: EntryCursor,
    },
    CodePoint {
        text: Option<Text>,
        position: usize,
    },
}

/// Reference-counted iterator handle.
pub type RcIterator = Rc<IteratorObject>;

/// A Shrew iterator object. Never shared between consumers; two iterators
/// over the same target are fully independent.
#[derive(Debug)]
pub struct IteratorObject {
    label: &'static str,
    state: RefCell<IterState>,
}

impl IteratorObject {
    /// Display label ("Array Iterator", "Map Iterator", "Set Iterator",
    /// "String Iterator"), fixed at creation and surviving exhaustion.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// The family whose step operation this iterator accepts.
    pub fn family(&self) -> IteratorFamily {
        match &*self.state.borrow() {
            IterState::Sequence { .. } => IteratorFamily::Sequence,
            IterState::Keyed { .. } => IteratorFamily::Keyed,
            IterState::CodePoint { .. } => IteratorFamily::CodePoint,
        }
    }

    /// Whether the terminal state has been reached.
    pub fn is_exhausted(&self) -> bool {
        match &*self.state.borrow() {
            IterState::Sequence { target, .. } => target.is_none(),
            IterState::Keyed { target, .. } => target.is_none(),
            IterState::CodePoint { text, .. } => text.is_none(),
        }
    }
}

impl Drop for IteratorObject {
    fn drop(&mut self) {
        // An abandoned keyed iterator still holds a cursor on its
        // collection; give it back so compaction can resume.
        if let IterState::Keyed {
            target: Some(target),
            ..
        } = self.state.get_mut()
        {
            release_keyed_cursor(target);
        }
    }
}

fn release_keyed_cursor(target: &KeyedTarget) {
    match target {
        KeyedTarget::Map(map) => {
            if let Ok(mut map) = map.try_borrow_mut() {
                map.release_cursor();
            }
        }
        KeyedTarget::Set(set) => {
            if let Ok(mut set) = set.try_borrow_mut() {
                set.release_cursor();
            }
        }
    }
}

fn expect_iterator(receiver: &Value, expected: IteratorFamily) -> RuntimeResult<&RcIterator> {
    match receiver {
        Value::Iterator(iter) if iter.family() == expected => Ok(iter),
        _ => Err(RuntimeError::NotThisFamily { expected }),
    }
}

// =============================================================================
// Sequence iterator - arrays and typed views
// =============================================================================

fn new_sequence_iterator(target: SequenceTarget, kind: IterationKind) -> Value {
    tracing::trace!(?kind, "create sequence iterator");
    Value::Iterator(Rc::new(IteratorObject {
        label: "Array Iterator",
        state: RefCell::new(IterState::Sequence {
            target: Some(target),
            kind,
            index: 0,
        }),
    }))
}

/// Create a sequence iterator over an array or typed view value.
pub fn create_sequence_iterator(target: &Value, kind: IterationKind) -> RuntimeResult<Value> {
    let target = match target {
        Value::Array(array) => SequenceTarget::Array(array.clone()),
        Value::TypedView(view) => SequenceTarget::View(view.clone()),
        _ => {
            return Err(RuntimeError::WrongCollectionType {
                expected: TargetKind::Sequence,
            })
        }
    };
    Ok(new_sequence_iterator(target, kind))
}

fn sequence_element(target: &SequenceTarget, index: u64) -> Value {
    match target {
        SequenceTarget::Array(array) => array.get(index),
        SequenceTarget::View(view) => view.get(index),
    }
}

/// Step a sequence iterator.
///
/// Length is re-read from the live target on every step, so shrinking the
/// target terminates iteration early and growth makes new elements
/// reachable. The typed-view path checks for detachment and then uses the
/// view's exact element count; the array path coerces the array's length
/// value with `to_length`. The two length reads are deliberately separate:
/// unifying them would change detachment-error timing.
pub fn sequence_next(receiver: &Value) -> RuntimeResult<StepResult> {
    let iter = expect_iterator(receiver, IteratorFamily::Sequence)?;
    let mut state = iter.state.borrow_mut();
    let IterState::Sequence {
        target,
        kind,
        index,
    } = &mut *state
    else {
        return Err(RuntimeError::NotThisFamily {
            expected: IteratorFamily::Sequence,
        });
    };

    let seq = match target.clone() {
        Some(seq) => seq,
        None => return Ok(StepResult::done()),
    };
    let length = match &seq {
        SequenceTarget::View(view) => {
            if view.is_detached() {
                return Err(RuntimeError::DetachedBuffer);
            }
            view.len() as u64
        }
        SequenceTarget::Array(array) => to_length(&array.length_value()),
    };
    if *index >= length {
        *target = None;
        tracing::trace!("sequence iterator exhausted");
        return Ok(StepResult::done());
    }

    let i = *index;
    *index += 1;
    let produced = match *kind {
        IterationKind::Key => Value::Int(i as i64),
        IterationKind::Value => sequence_element(&seq, i),
        IterationKind::KeyAndValue => Value::Array(ShrewArray::pair(
            Value::Int(i as i64),
            sequence_element(&seq, i),
        )),
    };
    Ok(StepResult::value(produced))
}

// =============================================================================
// Keyed iterator - maps and sets
// =============================================================================

/// Create a keyed iterator. The target must brand-verify as a map or set.
pub fn create_keyed_iterator(target: &Value, kind: IterationKind) -> RuntimeResult<Value> {
    let (target, cursor, label) = match target {
        Value::Map(map) => {
            let cursor = map.borrow_mut().cursor();
            (KeyedTarget::Map(map.clone()), cursor, "Map Iterator")
        }
        Value::Set(set) => {
            let cursor = set.borrow_mut().cursor();
            (KeyedTarget::Set(set.clone()), cursor, "Set Iterator")
        }
        _ => {
            return Err(RuntimeError::WrongCollectionType {
                expected: TargetKind::KeyedCollection,
            })
        }
    };
    tracing::trace!(label, ?kind, "create keyed iterator");
    Ok(Value::Iterator(Rc::new(IteratorObject {
        label,
        state: RefCell::new(IterState::Keyed {
            target: Some(target),
            kind,
            cursor,
        }),
    })))
}

/// Step a keyed iterator. Advancing is delegated to the target collection,
/// which skips entries deleted before the cursor reached them and picks up
/// entries inserted after the iterator was created.
pub fn keyed_next(receiver: &Value) -> RuntimeResult<StepResult> {
    let iter = expect_iterator(receiver, IteratorFamily::Keyed)?;
    let mut state = iter.state.borrow_mut();
    let IterState::Keyed {
        target,
        kind,
        cursor,
    } = &mut *state
    else {
        return Err(RuntimeError::NotThisFamily {
            expected: IteratorFamily::Keyed,
        });
    };

    let keyed = match target.clone() {
        Some(keyed) => keyed,
        None => return Ok(StepResult::done()),
    };
    let advanced = match &keyed {
        KeyedTarget::Map(map) => map.borrow().advance(cursor),
        KeyedTarget::Set(set) => set.borrow().advance(cursor),
    };
    if !advanced {
        release_keyed_cursor(&keyed);
        *target = None;
        tracing::trace!("keyed iterator exhausted");
        return Ok(StepResult::done());
    }

    let produced = match &keyed {
        KeyedTarget::Map(map) => {
            let map = map.borrow();
            match *kind {
                IterationKind::Key => map.key_at(cursor),
                IterationKind::Value => map.value_at(cursor),
                IterationKind::KeyAndValue => Value::Array(ShrewArray::pair(
                    map.key_at(cursor),
                    map.value_at(cursor),
                )),
            }
        }
        KeyedTarget::Set(set) => {
            let element = set.borrow().value_at(cursor);
            match *kind {
                // A set element is its own key.
                IterationKind::Key | IterationKind::Value => element,
                IterationKind::KeyAndValue => {
                    Value::Array(ShrewArray::pair(element.clone(), element))
                }
            }
        }
    };
    Ok(StepResult::value(produced))
}

// =============================================================================
// Code point iterator - text
// =============================================================================

/// Create a code point iterator over a text value.
pub fn create_code_point_iterator(text: Text) -> Value {
    tracing::trace!(units = text.len(), "create code point iterator");
    Value::Iterator(Rc::new(IteratorObject {
        label: "String Iterator",
        state: RefCell::new(IterState::CodePoint {
            text: Some(text),
            position: 0,
        }),
    }))
}

/// Step a code point iterator: decode one logical character, consuming one
/// encoding unit, or two when a lead surrogate is followed by a trail
/// surrogate. An unpaired lead surrogate stands alone.
pub fn code_point_next(receiver: &Value) -> RuntimeResult<StepResult> {
    let iter = expect_iterator(receiver, IteratorFamily::CodePoint)?;
    let mut state = iter.state.borrow_mut();
    let IterState::CodePoint { text, position } = &mut *state else {
        return Err(RuntimeError::NotThisFamily {
            expected: IteratorFamily::CodePoint,
        });
    };

    let t = match text.clone() {
        Some(t) => t,
        None => return Ok(StepResult::done()),
    };
    let units = t.units();
    if *position >= units.len() {
        *text = None;
        tracing::trace!("code point iterator exhausted");
        return Ok(StepResult::done());
    }

    let first = units[*position];
    let mut decoded = vec![first];
    if is_lead_surrogate(first) && *position + 1 < units.len() {
        let second = units[*position + 1];
        if is_trail_surrogate(second) {
            decoded.push(second);
        }
    }
    *position += decoded.len();
    Ok(StepResult::value(Value::Text(Text::from_units(decoded))))
}

// =============================================================================
// Entry points and dispatch
// =============================================================================

fn expect_map(target: &Value) -> RuntimeResult<&Value> {
    match target {
        Value::Map(_) => Ok(target),
        _ => Err(RuntimeError::WrongCollectionType {
            expected: TargetKind::Map,
        }),
    }
}

fn expect_set(target: &Value) -> RuntimeResult<&Value> {
    match target {
        Value::Set(_) => Ok(target),
        _ => Err(RuntimeError::WrongCollectionType {
            expected: TargetKind::Set,
        }),
    }
}

/// A typed view is valid as an iteration target only while attached.
fn validate_typed_view(target: &Value) -> RuntimeResult<&Value> {
    match target {
        Value::TypedView(view) if view.is_detached() => Err(RuntimeError::DetachedBuffer),
        Value::TypedView(_) => Ok(target),
        _ => Err(RuntimeError::WrongCollectionType {
            expected: TargetKind::Sequence,
        }),
    }
}

pub fn array_keys(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(target, IterationKind::Key)
}

pub fn array_values(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(target, IterationKind::Value)
}

pub fn array_entries(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(target, IterationKind::KeyAndValue)
}

pub fn typed_view_keys(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(validate_typed_view(target)?, IterationKind::Key)
}

pub fn typed_view_values(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(validate_typed_view(target)?, IterationKind::Value)
}

pub fn typed_view_entries(target: &Value) -> RuntimeResult<Value> {
    create_sequence_iterator(validate_typed_view(target)?, IterationKind::KeyAndValue)
}

pub fn map_keys(target: &Value) -> RuntimeResult<Value> {
    create_keyed_iterator(expect_map(target)?, IterationKind::Key)
}

pub fn map_values(target: &Value) -> RuntimeResult<Value> {
    create_keyed_iterator(expect_map(target)?, IterationKind::Value)
}

pub fn map_entries(target: &Value) -> RuntimeResult<Value> {
    create_keyed_iterator(expect_map(target)?, IterationKind::KeyAndValue)
}

/// `keys` and `values` are the same operation on a set.
pub fn set_values(target: &Value) -> RuntimeResult<Value> {
    create_keyed_iterator(expect_set(target)?, IterationKind::Value)
}

pub fn set_entries(target: &Value) -> RuntimeResult<Value> {
    create_keyed_iterator(expect_set(target)?, IterationKind::KeyAndValue)
}

pub fn text_code_points(text: &Text) -> Value {
    create_code_point_iterator(text.clone())
}

/// The default iteration entry point: entries form for maps, values form
/// for sequences and sets, code points for text. A value that is already
/// an iterator is its own iterator — the shared, stateless behavior every
/// iterator instance exposes.
pub fn get_iterator(value: &Value) -> RuntimeResult<Value> {
    match value {
        Value::Array(_) => array_values(value),
        Value::TypedView(_) => typed_view_values(value),
        Value::Map(_) => map_entries(value),
        Value::Set(_) => set_values(value),
        Value::Text(text) => Ok(text_code_points(text)),
        Value::Iterator(_) => Ok(value.clone()),
        _ => Err(RuntimeError::WrongCollectionType {
            expected: TargetKind::Iterable,
        }),
    }
}

/// The step operation a consumer loop calls: dispatches to the receiver's
/// own family. Idempotent once a terminal result has been produced.
pub fn iterator_next(receiver: &Value) -> RuntimeResult<StepResult> {
    let family = match receiver {
        Value::Iterator(iter) => iter.family(),
        _ => {
            return Err(RuntimeError::NotThisFamily {
                expected: IteratorFamily::Any,
            })
        }
    };
    match family {
        IteratorFamily::Sequence => sequence_next(receiver),
        IteratorFamily::Keyed => keyed_next(receiver),
        IteratorFamily::CodePoint => code_point_next(receiver),
        IteratorFamily::Any => unreachable!("no iterator carries the Any brand"),
    }
}

/// Drain an iterator into a vector of step values. Test and host-side
/// convenience; errors from any step propagate immediately.
pub fn collect_values(receiver: &Value) -> RuntimeResult<Vec<Value>> {
    let mut values = Vec::new();
    loop {
        let step = iterator_next(receiver)?;
        if step.done {
            return Ok(values);
        }
        values.push(step.value);
    }
}
