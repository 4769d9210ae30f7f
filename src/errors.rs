// src/errors.rs
//! Runtime errors raised by the iteration protocol (R0xxx).
//!
//! All errors are synchronous and surface directly to the caller of the
//! creation or step operation; nothing is retried or suppressed.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

/// The iterator families a step operation can expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorFamily {
    /// Arrays and typed views (integer-indexed targets).
    Sequence,
    /// Maps and sets (insertion-ordered keyed targets).
    Keyed,
    /// Text, decoded one code point at a time.
    CodePoint,
    /// Any family; used by the dispatching step operation.
    Any,
}

impl fmt::Display for IteratorFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IteratorFamily::Sequence => "a sequence iterator",
            IteratorFamily::Keyed => "a keyed-collection iterator",
            IteratorFamily::CodePoint => "a code point iterator",
            IteratorFamily::Any => "an iterator",
        };
        f.write_str(name)
    }
}

/// What a creation entry point expected its target to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Map,
    Set,
    KeyedCollection,
    Sequence,
    Iterable,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TargetKind::Map => "a map",
            TargetKind::Set => "a set",
            TargetKind::KeyedCollection => "a keyed collection",
            TargetKind::Sequence => "a sequence",
            TargetKind::Iterable => "an iterable value",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum RuntimeError {
    #[error("receiver is not {expected}")]
    #[diagnostic(
        code(R0001),
        help("step operations only accept iterators created by their own family")
    )]
    NotThisFamily { expected: IteratorFamily },

    #[error("target is not {expected}")]
    #[diagnostic(code(R0002))]
    WrongCollectionType { expected: TargetKind },

    #[error("cannot advance an iterator over a detached buffer")]
    #[diagnostic(
        code(R0003),
        help("the view's backing storage was detached after the view was created")
    )]
    DetachedBuffer,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
