//! Stream indices: guards against the NIL (all-ones) sentinel that means "absent".

use std::fmt::Display;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, LE, U16};

/// A reserved stream index meaning "no stream at all".
pub const NIL_STREAM_INDEX: u16 = 0xffff;

/// Identifies a stream in a PDB/MSF file. Never holds the NIL value.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
#[repr(transparent)]
pub struct Stream(u16);

impl Stream {
    /// Index of the PDB Information Stream (spec.md §3: "PDB Info Stream (index 1)").
    pub const PDB: Stream = Stream(1);
    /// Index of the Type Information Stream (spec.md §3: "TPI Stream (index 2)").
    pub const TPI: Stream = Stream(2);
    /// Index of the Debug Information Stream (spec.md §3: "DBI Stream (index 3)").
    pub const DBI: Stream = Stream(3);

    /// Validates that `index` is non-NIL and converts it to a `Stream` value.
    pub fn new(index: u32) -> Option<Stream> {
        if index as u16 as u32 != index || index as u16 == NIL_STREAM_INDEX {
            None
        } else {
            Some(Stream(index as u16))
        }
    }

    /// The raw stream index value.
    pub fn value(self) -> u16 {
        self.0
    }

    /// The stream index value, cast to `usize`, for indexing into the MSF stream table.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<Stream> for u32 {
    fn from(value: Stream) -> Self {
        value.value() as u32
    }
}

impl Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// This structure can be embedded directly in zerocopy wire structures.
#[derive(Copy, Clone, Eq, PartialEq, Debug, IntoBytes, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(transparent)]
pub struct StreamIndexU16(pub U16<LE>);

impl StreamIndexU16 {
    /// The value of a nil stream index.
    pub const NIL: Self = Self(U16::from_bytes(NIL_STREAM_INDEX.to_le_bytes()));

    /// `None` if this is the NIL sentinel (spec.md §4.3: "A stream index of all-ones indicates
    /// absence and is skipped silently").
    pub fn get(self) -> Option<u32> {
        let s = self.0.get();
        if s != NIL_STREAM_INDEX {
            Some(s as u32)
        } else {
            None
        }
    }
}
