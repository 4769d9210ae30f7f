// src/lib.rs
//! Shrew runtime: dynamic values, collections, and the iteration protocol.

pub mod array;
pub mod buffer;
pub mod collections;
pub mod errors;
pub mod iterator;
pub mod text;
pub mod value;

pub use array::{RcArray, ShrewArray};
pub use buffer::{ArrayBuffer, ElementType, RcBuffer, RcView, TypedView};
pub use collections::{EntryCursor, RcMap, RcSet, ShrewMap, ShrewSet};
pub use errors::{IteratorFamily, RuntimeError, RuntimeResult, TargetKind};
pub use iterator::{
    array_entries, array_keys, array_values, code_point_next, collect_values,
    create_code_point_iterator, create_keyed_iterator, create_sequence_iterator, get_iterator,
    iterator_next, keyed_next, map_entries, map_keys, map_values, sequence_next, set_entries,
    set_values, text_code_points, typed_view_entries, typed_view_keys, typed_view_values,
    IterationKind, IteratorObject, RcIterator, StepResult,
};
pub use text::{is_lead_surrogate, is_trail_surrogate, Text};
pub use value::{to_length, Value, ValueKey, MAX_SAFE_INTEGER};
