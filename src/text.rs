// src/text.rs
//! Immutable text values.
//!
//! Shrew text is a shared, immutable sequence of UTF-16 encoding units.
//! Lone surrogates are representable, so the code point iterator can be
//! exercised against malformed unit sequences the way scripts produce them.

use std::fmt;
use std::rc::Rc;

/// Reference-counted UTF-16 unit sequence. Cloning shares storage.
#[derive(Debug, Clone)]
pub struct Text {
    units: Rc<[u16]>,
}

impl Text {
    /// Build a text from raw encoding units, paired or not.
    pub fn from_units(units: Vec<u16>) -> Self {
        Self {
            units: units.into(),
        }
    }

    /// Length in encoding units (not code points).
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// The encoding unit at `index`, if in bounds.
    pub fn unit(&self, index: usize) -> Option<u16> {
        self.units.get(index).copied()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }
}

impl From<&str> for Text {
    fn from(s: &str) -> Self {
        Self {
            units: s.encode_utf16().collect(),
        }
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.units == other.units
    }
}

impl Eq for Text {}

impl fmt::Display for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf16_lossy(&self.units))
    }
}

/// Whether `unit` is in the lead (high) surrogate range.
pub fn is_lead_surrogate(unit: u16) -> bool {
    (0xD800..=0xDBFF).contains(&unit)
}

/// Whether `unit` is in the trail (low) surrogate range.
pub fn is_trail_surrogate(unit: u16) -> bool {
    (0xDC00..=0xDFFF).contains(&unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_supplementary_characters_as_pairs() {
        let t = Text::from("a\u{1F600}");
        assert_eq!(t.len(), 3);
        assert_eq!(t.unit(0), Some(0x61));
        assert!(is_lead_surrogate(t.unit(1).unwrap()));
        assert!(is_trail_surrogate(t.unit(2).unwrap()));
    }

    #[test]
    fn lone_surrogates_are_representable() {
        let t = Text::from_units(vec![0xD800]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.unit(0), Some(0xD800));
    }

    #[test]
    fn display_is_lossy_for_unpaired_units() {
        let t = Text::from_units(vec![0x68, 0xDC00, 0x69]);
        assert_eq!(t.to_string(), "h\u{FFFD}i");
    }
}
