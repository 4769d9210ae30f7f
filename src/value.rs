// src/value.rs
//! The Shrew dynamic value type and key semantics for keyed collections.

use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::array::RcArray;
use crate::buffer::RcView;
use crate::collections::{RcMap, RcSet};
use crate::iterator::RcIterator;
use crate::text::Text;

/// Largest length a non-typed sequence can report (2^53 - 1).
pub const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

/// A Shrew runtime value. Heap variants are reference-counted; cloning a
/// `Value` never deep-copies.
#[derive(Debug, Clone)]
pub enum Value {
    Undefined,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Text),
    Array(RcArray),
    TypedView(RcView),
    Map(RcMap),
    Set(RcSet),
    Iterator(RcIterator),
}

impl Value {
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }
}

/// Coerce a length-like value to a non-negative count: negative or
/// non-numeric values become 0, everything clamps to [`MAX_SAFE_INTEGER`].
///
/// Used only by the sequence iterator's non-typed-view length path.
pub fn to_length(value: &Value) -> u64 {
    match value {
        Value::Int(i) if *i <= 0 => 0,
        Value::Int(i) => (*i as u64).min(MAX_SAFE_INTEGER),
        Value::Float(f) => {
            if f.is_nan() || *f <= 0.0 {
                0
            } else if *f >= MAX_SAFE_INTEGER as f64 {
                MAX_SAFE_INTEGER
            } else {
                f.trunc() as u64
            }
        }
        Value::Bool(b) => *b as u64,
        _ => 0,
    }
}

// =============================================================================
// ValueKey - map/set key semantics
// =============================================================================

/// Normalized numeric identity shared by `Int` and `Float` keys.
enum NumKey {
    Int(i64),
    Bits(u64),
    Nan,
}

fn num_key(f: f64) -> NumKey {
    if f.is_nan() {
        return NumKey::Nan;
    }
    // -0.0 and 0.0 collapse to the integer 0; any integral float in i64
    // range keys the same as the equivalent Int value.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        NumKey::Int(f as i64)
    } else {
        NumKey::Bits(f.to_bits())
    }
}

/// A `Value` usable as a collection key.
///
/// Equality is same-value-zero: `Int`/`Float` compare numerically with
/// `-0.0 == 0.0` and NaN equal to itself, text compares by unit content,
/// and heap values compare by identity.
#[derive(Debug, Clone)]
pub struct ValueKey(pub Value);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (&self.0, &other.0) {
            (Undefined, Undefined) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Int(a), Float(b)) | (Float(b), Int(a)) => matches!(num_key(*b), NumKey::Int(i) if i == *a),
            (Float(a), Float(b)) => match (num_key(*a), num_key(*b)) {
                (NumKey::Int(x), NumKey::Int(y)) => x == y,
                (NumKey::Bits(x), NumKey::Bits(y)) => x == y,
                (NumKey::Nan, NumKey::Nan) => true,
                _ => false,
            },
            (Text(a), Text(b)) => a.units() == b.units(),
            (Array(a), Array(b)) => Rc::ptr_eq(a, b),
            (TypedView(a), TypedView(b)) => Rc::ptr_eq(a, b),
            (Map(a), Map(b)) => Rc::ptr_eq(a, b),
            (Set(a), Set(b)) => Rc::ptr_eq(a, b),
            (Iterator(a), Iterator(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for ValueKey {}

impl Hash for ValueKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Value::*;
        match &self.0 {
            Undefined => state.write_u8(0),
            Bool(b) => {
                state.write_u8(1);
                state.write_u8(*b as u8);
            }
            Int(i) => {
                state.write_u8(2);
                state.write_i64(*i);
            }
            Float(f) => match num_key(*f) {
                NumKey::Int(i) => {
                    state.write_u8(2);
                    state.write_i64(i);
                }
                NumKey::Bits(bits) => {
                    state.write_u8(3);
                    state.write_u64(bits);
                }
                NumKey::Nan => state.write_u8(4),
            },
            Text(t) => {
                state.write_u8(5);
                t.units().hash(state);
            }
            Array(a) => {
                state.write_u8(6);
                state.write_usize(Rc::as_ptr(a) as usize);
            }
            TypedView(v) => {
                state.write_u8(7);
                state.write_usize(Rc::as_ptr(v) as usize);
            }
            Map(m) => {
                state.write_u8(8);
                state.write_usize(Rc::as_ptr(m) as usize);
            }
            Set(s) => {
                state.write_u8(9);
                state.write_usize(Rc::as_ptr(s) as usize);
            }
            Iterator(i) => {
                state.write_u8(10);
                state.write_usize(Rc::as_ptr(i) as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_length_clamps_and_zeroes() {
        assert_eq!(to_length(&Value::Int(5)), 5);
        assert_eq!(to_length(&Value::Int(-3)), 0);
        assert_eq!(to_length(&Value::Float(2.9)), 2);
        assert_eq!(to_length(&Value::Float(f64::NAN)), 0);
        assert_eq!(to_length(&Value::Float(f64::INFINITY)), MAX_SAFE_INTEGER);
        assert_eq!(to_length(&Value::Int(i64::MAX)), MAX_SAFE_INTEGER);
        assert_eq!(to_length(&Value::Undefined), 0);
        assert_eq!(to_length(&Value::Bool(true)), 1);
    }

    #[test]
    fn key_same_value_zero() {
        assert_eq!(ValueKey(Value::Float(0.0)), ValueKey(Value::Float(-0.0)));
        assert_eq!(ValueKey(Value::Int(2)), ValueKey(Value::Float(2.0)));
        assert_eq!(
            ValueKey(Value::Float(f64::NAN)),
            ValueKey(Value::Float(f64::NAN))
        );
        assert_ne!(ValueKey(Value::Int(1)), ValueKey(Value::Bool(true)));
    }

    #[test]
    fn key_text_by_content_heap_by_identity() {
        let a = Text::from("abc");
        let b = Text::from("abc");
        assert_eq!(ValueKey(Value::Text(a)), ValueKey(Value::Text(b)));

        let x = crate::array::ShrewArray::from_values(vec![Value::Int(1)]);
        let y = crate::array::ShrewArray::from_values(vec![Value::Int(1)]);
        assert_eq!(
            ValueKey(Value::Array(x.clone())),
            ValueKey(Value::Array(x.clone()))
        );
        assert_ne!(ValueKey(Value::Array(x)), ValueKey(Value::Array(y)));
    }
}
