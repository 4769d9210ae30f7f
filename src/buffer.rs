// src/buffer.rs
//! Detachable byte buffers and fixed-length typed views.
//!
//! A `TypedView` exposes a fixed element count over an `ArrayBuffer`. The
//! buffer can be detached at any time; views keep their shape but every
//! element read through a detached buffer is invalid, and the sequence
//! iterator checks for detachment before each step.

use std::cell::RefCell;
use std::rc::Rc;

use crate::value::Value;

pub type RcBuffer = Rc<ArrayBuffer>;
pub type RcView = Rc<TypedView>;

/// Byte storage that can be detached (storage dropped, length reads as 0).
/// Detachment is monotonic.
#[derive(Debug)]
pub struct ArrayBuffer {
    data: RefCell<Option<Vec<u8>>>,
}

impl ArrayBuffer {
    /// A zero-filled buffer of `byte_len` bytes.
    pub fn new(byte_len: usize) -> RcBuffer {
        Rc::new(Self {
            data: RefCell::new(Some(vec![0; byte_len])),
        })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> RcBuffer {
        Rc::new(Self {
            data: RefCell::new(Some(bytes)),
        })
    }

    pub fn byte_len(&self) -> usize {
        self.data.borrow().as_ref().map_or(0, Vec::len)
    }

    pub fn is_detached(&self) -> bool {
        self.data.borrow().is_none()
    }

    /// Drop the backing storage. Idempotent.
    pub fn detach(&self) {
        *self.data.borrow_mut() = None;
    }
}

/// Element types a typed view can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
}

impl ElementType {
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::Int8 | ElementType::Uint8 => 1,
            ElementType::Int16 | ElementType::Uint16 => 2,
            ElementType::Int32 | ElementType::Uint32 | ElementType::Float32 => 4,
            ElementType::Float64 => 8,
        }
    }
}

/// A fixed-length typed window over an `ArrayBuffer`.
///
/// The element count is exact and never re-derived from the buffer, so a
/// view's `len` is stable even across detachment; detachment is surfaced
/// through [`TypedView::is_detached`] instead.
#[derive(Debug)]
pub struct TypedView {
    buffer: RcBuffer,
    element: ElementType,
    byte_offset: usize,
    len: usize,
}

impl TypedView {
    /// Create a view of `len` elements starting at `byte_offset`. Returns
    /// `None` when the window does not fit the buffer's current storage.
    pub fn new(buffer: RcBuffer, element: ElementType, byte_offset: usize, len: usize) -> Option<RcView> {
        let end = byte_offset.checked_add(len.checked_mul(element.byte_size())?)?;
        if end > buffer.byte_len() {
            return None;
        }
        Some(Rc::new(Self {
            buffer,
            element,
            byte_offset,
            len,
        }))
    }

    /// Exact element count. Not a coerced property read.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn buffer(&self) -> &RcBuffer {
        &self.buffer
    }

    pub fn is_detached(&self) -> bool {
        self.buffer.is_detached()
    }

    /// Decode the element at `index` as a Shrew value. Out-of-bounds reads
    /// and reads through a detached buffer yield `Undefined`; the iterator
    /// rules both out before it gets here.
    pub fn get(&self, index: u64) -> Value {
        if index >= self.len as u64 {
            return Value::Undefined;
        }
        let data = self.buffer.data.borrow();
        let bytes = match data.as_ref() {
            Some(bytes) => bytes,
            None => return Value::Undefined,
        };
        let size = self.element.byte_size();
        let start = self.byte_offset + index as usize * size;
        let raw = &bytes[start..start + size];
        match self.element {
            ElementType::Int8 => Value::Int(raw[0] as i8 as i64),
            ElementType::Uint8 => Value::Int(raw[0] as i64),
            ElementType::Int16 => Value::Int(i16::from_le_bytes([raw[0], raw[1]]) as i64),
            ElementType::Uint16 => Value::Int(u16::from_le_bytes([raw[0], raw[1]]) as i64),
            ElementType::Int32 => {
                Value::Int(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64)
            }
            ElementType::Uint32 => {
                Value::Int(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as i64)
            }
            ElementType::Float32 => {
                Value::Float(f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64)
            }
            ElementType::Float64 => Value::Float(f64::from_le_bytes([
                raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
            ])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_decodes_elements() {
        let buf = ArrayBuffer::from_bytes(vec![1, 0, 2, 0, 0xFF, 0xFF]);
        let view = TypedView::new(buf, ElementType::Int16, 0, 3).unwrap();
        assert_eq!(view.len(), 3);
        assert_eq!(view.element(), ElementType::Int16);
        assert_eq!(view.buffer().byte_len(), 6);
        assert!(matches!(view.get(0), Value::Int(1)));
        assert!(matches!(view.get(1), Value::Int(2)));
        assert!(matches!(view.get(2), Value::Int(-1)));
        assert!(view.get(3).is_undefined());
    }

    #[test]
    fn view_must_fit_buffer() {
        let buf = ArrayBuffer::new(4);
        assert!(TypedView::new(buf.clone(), ElementType::Uint8, 2, 2).is_some());
        assert!(TypedView::new(buf, ElementType::Uint32, 2, 1).is_none());
    }

    #[test]
    fn detach_is_sticky() {
        let buf = ArrayBuffer::new(8);
        let view = TypedView::new(buf.clone(), ElementType::Float64, 0, 1).unwrap();
        assert!(!view.is_detached());
        buf.detach();
        buf.detach();
        assert!(view.is_detached());
        assert_eq!(buf.byte_len(), 0);
        // Shape survives detachment; only the storage is gone.
        assert_eq!(view.len(), 1);
        assert!(view.get(0).is_undefined());
    }
}
