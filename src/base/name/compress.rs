//! Name compression.

use super::dname::Name;
use std::collections::HashMap;

//------------ Compressor ----------------------------------------------------

/// Remembers where names have been written into a message.
///
/// A compressor is only valid for a single message. It maps each name
/// written so far, including all its non-root suffixes, to its position in
/// the message. Only positions that fit into the 14 bits of a compression
/// pointer are kept.
#[derive(Clone, Debug, Default)]
pub struct Compressor {
    names: HashMap<Name, u16>,
}

impl Compressor {
    /// Creates a new, empty compressor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the position of an earlier occurence of `name`.
    #[must_use]
    pub fn get(&self, name: &Name) -> Option<u16> {
        self.names.get(name).copied()
    }

    /// Records that `name` starts at position `pos`.
    ///
    /// Names already known keep their original position.
    pub fn insert(&mut self, name: Name, pos: usize) {
        if let Ok(pos) = u16::try_from(pos) {
            if pos <= 0x3FFF {
                self.names.entry(name).or_insert(pos);
            }
        }
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pointer_range() {
        let mut compressor = Compressor::new();
        let name: Name = "example.com.".parse().unwrap();
        compressor.insert(name.clone(), 0x4000);
        assert_eq!(compressor.get(&name), None);
        compressor.insert(name.clone(), 12);
        compressor.insert(name.clone(), 40);
        assert_eq!(compressor.get(&"EXAMPLE.com.".parse().unwrap()), Some(12));
    }
}
