// src/array.rs
//! Growable arrays of dynamic values.
//!
//! `ShrewArray` is the index-addressable sequence the sequence iterator
//! walks. Its length is live: scripts may grow or shrink the array between
//! iteration steps, and the iterator re-reads the length every step.

use std::cell::RefCell;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::value::Value;

/// Reference-counted array handle. All mutation goes through `&self`.
pub type RcArray = Rc<ShrewArray>;

/// A growable sequence of Shrew values. Small arrays (entry pairs and the
/// like) store their elements inline.
#[derive(Debug)]
pub struct ShrewArray {
    elements: RefCell<SmallVec<[Value; 4]>>,
}

impl ShrewArray {
    pub fn new() -> RcArray {
        Rc::new(Self {
            elements: RefCell::new(SmallVec::new()),
        })
    }

    pub fn from_values(values: Vec<Value>) -> RcArray {
        Rc::new(Self {
            elements: RefCell::new(SmallVec::from_vec(values)),
        })
    }

    /// A fresh two-element array, used for `entries`-style results.
    pub fn pair(first: Value, second: Value) -> RcArray {
        Rc::new(Self {
            elements: RefCell::new(SmallVec::from_buf_and_len(
                [first, second, Value::Undefined, Value::Undefined],
                2,
            )),
        })
    }

    pub fn push(&self, value: Value) {
        self.elements.borrow_mut().push(value);
    }

    /// The element at `index`, or `Undefined` when out of bounds.
    pub fn get(&self, index: u64) -> Value {
        let elements = self.elements.borrow();
        if index >= elements.len() as u64 {
            return Value::Undefined;
        }
        elements[index as usize].clone()
    }

    /// Store at `index`, padding any gap with `Undefined`.
    pub fn set(&self, index: usize, value: Value) {
        let mut elements = self.elements.borrow_mut();
        if index >= elements.len() {
            elements.resize(index + 1, Value::Undefined);
        }
        elements[index] = value;
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    /// Resize in place: truncates, or pads with `Undefined` when growing.
    pub fn set_len(&self, len: usize) {
        self.elements.borrow_mut().resize(len, Value::Undefined);
    }

    /// The array's length as a Shrew value, the way a script reads it.
    pub fn length_value(&self) -> Value {
        Value::Int(self.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_get_and_out_of_bounds() {
        let arr = ShrewArray::new();
        arr.push(Value::Int(10));
        arr.push(Value::Int(20));
        assert_eq!(arr.len(), 2);
        assert!(matches!(arr.get(1), Value::Int(20)));
        assert!(arr.get(5).is_undefined());
    }

    #[test]
    fn set_pads_gaps_with_undefined() {
        let arr = ShrewArray::new();
        arr.set(2, Value::Int(7));
        assert_eq!(arr.len(), 3);
        assert!(arr.get(0).is_undefined());
        assert!(matches!(arr.get(2), Value::Int(7)));
    }

    #[test]
    fn set_len_truncates_and_grows() {
        let arr = ShrewArray::from_values(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        arr.set_len(1);
        assert_eq!(arr.len(), 1);
        arr.set_len(3);
        assert!(arr.get(2).is_undefined());
    }
}
