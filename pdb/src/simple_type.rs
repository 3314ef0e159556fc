//! The Simple-Type Decoder (spec.md §4.5, C7).
//!
//! Splits a 32-bit simple-type index into `(kind, mode)` and maps it to the compact pack-format
//! descriptor the [`crate::projector`] module emits for scalar members. Grounded on
//! rizin's `get_simple_type_mode`/`get_simple_type_kind`/`simple_type_to_format`
//! (`original_source/.../pdb.c`).

use crate::types::TypeIndex;

/// The pointer-ness of a simple type index (spec.md §3: "Mode ∈ {Direct, NearPtr, FarPtr,
/// HugePtr, NearPtr32, FarPtr32, NearPtr64, NearPtr128}").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum SimpleMode {
    Direct,
    NearPtr,
    FarPtr,
    HugePtr,
    NearPtr32,
    FarPtr32,
    NearPtr64,
    NearPtr128,
    /// A mode value this decoder does not recognize; the upper bits are reserved per spec.md §3.
    Reserved(u8),
}

impl SimpleMode {
    fn from_bits(mode: u8) -> Self {
        match mode {
            0x0 => Self::Direct,
            0x1 => Self::NearPtr,
            0x2 => Self::FarPtr,
            0x3 => Self::HugePtr,
            0x4 => Self::NearPtr32,
            0x5 => Self::FarPtr32,
            0x6 => Self::NearPtr64,
            0x7 => Self::NearPtr128,
            other => Self::Reserved(other),
        }
    }
}

/// The decoded `(kind, mode)` pair for a simple-type index (spec.md §4.5).
#[derive(Copy, Clone, Debug)]
pub struct SimpleType {
    /// `kind = bits[7:0]` of the type index.
    pub kind: u8,
    /// `mode = bits[15:12]` of the type index.
    pub mode: SimpleMode,
}

impl SimpleType {
    /// Splits a simple-type index into its `(kind, mode)` parts. Does not check that `idx` is
    /// actually in the simple-type region (`idx.is_simple()`); callers are expected to check
    /// that first, matching spec.md §4.5's framing ("Inputs a 32-bit type index with top bit
    /// zero").
    pub fn decode(idx: TypeIndex) -> Self {
        let v = idx.0;
        let kind = (v & 0xff) as u8;
        let mode = ((v >> 12) & 0xf) as u8;
        Self {
            kind,
            mode: SimpleMode::from_bits(mode),
        }
    }
}

/// The outcome of projecting a [`SimpleType`] to a pack-format descriptor (spec.md §4.5's
/// "Formatting contract").
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SimpleFormat {
    /// A printable pack-format descriptor, e.g. `"n4"`.
    Descriptor(&'static str),
    /// Width is known and consumed, but there is no printable form (spec.md: "oversized or
    /// not-yet-supported kinds... yield 'skip'").
    Skip,
    /// No sensible byte layout at all (spec.md: "unknown kinds yield 'unparsable'").
    Unparsable,
}

/// Well-known simple-type `kind` values (spec.md §3's Kind enumeration), named for readability in
/// [`direct_mode_format`]'s match.
#[allow(missing_docs, non_upper_case_globals)]
mod kind {
    pub const None: u8 = 0x00;
    pub const Void: u8 = 0x03;
    pub const NotTranslated: u8 = 0x07;
    pub const HResult: u8 = 0x08;
    pub const SignedChar: u8 = 0x10;
    pub const UnsignedChar: u8 = 0x20;
    pub const NarrowChar: u8 = 0x70;
    pub const WideChar: u8 = 0x71;
    pub const SByte: u8 = 0x68;
    pub const Byte: u8 = 0x69;
    pub const Bool8: u8 = 0x30;
    pub const Bool16: u8 = 0x31;
    pub const Bool32: u8 = 0x32;
    pub const Bool64: u8 = 0x33;
    pub const Int16: u8 = 0x72;
    pub const UInt16: u8 = 0x73;
    pub const Char16: u8 = 0x7a;
    pub const Int32: u8 = 0x74;
    pub const UInt32: u8 = 0x75;
    pub const Char32: u8 = 0x7b;
    pub const Int64: u8 = 0x76;
    pub const UInt64: u8 = 0x77;
    pub const Int128: u8 = 0x78;
    pub const UInt128: u8 = 0x79;
    /// `short` aliased onto the 16-bit int kind (`PDB_INT16_SHORT`).
    pub const Int16Short: u8 = 0x11;
    /// `unsigned short` aliased onto the 16-bit uint kind (`PDB_UINT16_SHORT`).
    pub const UInt16Short: u8 = 0x21;
    /// `long` aliased onto the 32-bit int kind (`PDB_INT32_LONG`).
    pub const Int32Long: u8 = 0x12;
    /// `unsigned long` aliased onto the 32-bit uint kind (`PDB_UINT32_LONG`).
    pub const UInt32Long: u8 = 0x22;
    /// `__int64`/`long long` aliased onto the 64-bit int kind (`PDB_INT64_QUAD`).
    pub const Int64Quad: u8 = 0x13;
    /// `unsigned __int64`/`unsigned long long` aliased onto the 64-bit uint kind
    /// (`PDB_UINT64_QUAD`).
    pub const UInt64Quad: u8 = 0x23;
    /// `__int128` aliased onto the 128-bit int kind (`PDB_INT128_OCT`).
    pub const Int128Oct: u8 = 0x14;
    /// `unsigned __int128` aliased onto the 128-bit uint kind (`PDB_UINT128_OCT`).
    pub const UInt128Oct: u8 = 0x24;
    pub const Float32: u8 = 0x40;
    pub const Float64: u8 = 0x41;
    pub const Float32Pp: u8 = 0x45;
    pub const Float16: u8 = 0x46;
    pub const Float48: u8 = 0x44;
    pub const Float80: u8 = 0x42;
    pub const Float128: u8 = 0x43;
    pub const Complex32: u8 = 0x50;
    pub const Complex64: u8 = 0x51;
    pub const Complex80: u8 = 0x52;
    pub const Complex128: u8 = 0x53;
}

/// Kind → compact descriptor in Direct mode (spec.md §4.5's table).
fn direct_mode_format(k: u8) -> SimpleFormat {
    use SimpleFormat::*;
    match k {
        kind::SignedChar => Descriptor("c"),
        kind::UnsignedChar => Descriptor("b"),
        kind::SByte => Descriptor("n1"),
        kind::Byte | kind::Bool8 => Descriptor("N1"),
        kind::Int16 | kind::Int16Short => Descriptor("n2"),
        kind::UInt16 | kind::UInt16Short | kind::WideChar | kind::Char16 | kind::Bool16 => {
            Descriptor("N2")
        }
        kind::Int32 | kind::Int32Long => Descriptor("n4"),
        kind::UInt32 | kind::UInt32Long | kind::Char32 | kind::Bool32 => Descriptor("N4"),
        kind::Int64 | kind::Int64Quad => Descriptor("n8"),
        kind::UInt64 | kind::UInt64Quad | kind::Bool64 => Descriptor("N8"),
        // §9 open question: preserved as `f` per the source, flagged for review.
        kind::Float32 | kind::Float32Pp => Descriptor("f"),
        kind::Float64 => Descriptor("F"),
        kind::None | kind::Void | kind::HResult | kind::NotTranslated => Unparsable,
        kind::Int128
        | kind::UInt128
        | kind::Int128Oct
        | kind::UInt128Oct
        | kind::Float16
        | kind::Float48
        | kind::Float80
        | kind::Float128
        | kind::Complex32
        | kind::Complex64
        | kind::Complex80
        | kind::Complex128 => Skip,
        kind::NarrowChar => Descriptor("c"),
        _ => Unparsable,
    }
}

/// Pointer byte width for each non-direct mode (spec.md §4.5: "Pointer modes produce a pointer
/// descriptor of width: Near=2, Far/Huge/Near32/Far32=4, Near64=8, Near128=8 plus 8-byte padding
/// placeholder").
fn pointer_width(mode: SimpleMode) -> Option<u32> {
    match mode {
        SimpleMode::Direct => None,
        SimpleMode::NearPtr => Some(2),
        SimpleMode::FarPtr | SimpleMode::HugePtr | SimpleMode::NearPtr32 | SimpleMode::FarPtr32 => {
            Some(4)
        }
        SimpleMode::NearPtr64 => Some(8),
        // §9 open question: the source's `p8::` width placeholder is preserved literally by
        // `format_descriptor` below rather than widened to 16, pending the hook mentioned there.
        SimpleMode::NearPtr128 => Some(8),
        SimpleMode::Reserved(_) => None,
    }
}

impl SimpleType {
    /// Produces the pack-format descriptor for this simple type (spec.md §4.5/§4.6).
    pub fn format(self) -> SimpleFormat {
        match self.mode {
            SimpleMode::Direct => direct_mode_format(self.kind),
            SimpleMode::Reserved(_) => SimpleFormat::Unparsable,
            other => match pointer_width(other) {
                Some(_) => SimpleFormat::Descriptor(pointer_descriptor(other)),
                None => SimpleFormat::Unparsable,
            },
        }
    }
}

/// The literal descriptor string for a pointer mode, including the `Near128` placeholder
/// (spec.md §9: "The source's pack-format output for `Near128` is `p8::`... Leave a hook").
fn pointer_descriptor(mode: SimpleMode) -> &'static str {
    match mode {
        SimpleMode::NearPtr => "p2",
        SimpleMode::FarPtr | SimpleMode::HugePtr | SimpleMode::NearPtr32 | SimpleMode::FarPtr32 => {
            "p4"
        }
        SimpleMode::NearPtr64 => "p8",
        SimpleMode::NearPtr128 => "p8::",
        _ => "p4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_and_mode_stay_in_range() {
        // spec.md §8 invariant 5: "for every 32-bit t, kind(t) in [0,0xFF] and mode(t) in [0,0xF]".
        for raw in [0u32, 0x74, 0x1074, 0xffff_ffffu32] {
            let st = SimpleType::decode(TypeIndex(raw));
            assert!((0..=0xffu32).contains(&(st.kind as u32)));
        }
    }

    #[test]
    fn direct_int32_is_n4() {
        let st = SimpleType::decode(TypeIndex(0x74));
        assert_eq!(st.format(), SimpleFormat::Descriptor("n4"));
    }

    #[test]
    fn near_pointer_is_p2() {
        let st = SimpleType::decode(TypeIndex(0x1074));
        assert_eq!(st.format(), SimpleFormat::Descriptor("p2"));
    }

    #[test]
    fn void_is_unparsable() {
        let st = SimpleType::decode(TypeIndex(0x03));
        assert_eq!(st.format(), SimpleFormat::Unparsable);
    }

    #[test]
    fn int128_is_skip() {
        let st = SimpleType::decode(TypeIndex(0x78));
        assert_eq!(st.format(), SimpleFormat::Skip);
    }

    #[test]
    fn aliased_short_long_quad_widths_match_their_canonical_kinds() {
        let pairs = [
            (0x11u32, 0x72u32), // short -> int16
            (0x21, 0x73),       // unsigned short -> uint16
            (0x12, 0x74),       // long -> int32
            (0x22, 0x75),       // unsigned long -> uint32
            (0x13, 0x76),       // __int64 -> int64
            (0x23, 0x77),       // unsigned __int64 -> uint64
        ];
        for (aliased, canonical) in pairs {
            assert_eq!(
                SimpleType::decode(TypeIndex(aliased)).format(),
                SimpleType::decode(TypeIndex(canonical)).format(),
            );
        }
    }

    #[test]
    fn aliased_oct_128_is_skip() {
        for raw in [0x14u32, 0x24] {
            assert_eq!(SimpleType::decode(TypeIndex(raw)).format(), SimpleFormat::Skip);
        }
    }
}
