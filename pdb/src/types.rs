//! The Type Graph (spec.md §4.4, C6): a dense table of [`TypeData`] nodes, indexed by
//! [`TypeIndex`], decoded from the TPI (or IPI) stream's leaf records.
//!
//! spec.md §9 mandates replacing the original's per-record function-pointer table
//! (`get_name`/`get_val`/`get_members`/`is_forward_ref`) with a tagged enum matched by `match`.
//! [`TypeData`] is that enum; its capability accessors (`name`, `value`, `is_forward_ref`,
//! `print_type`) are plain methods, so a leaf kind that doesn't support a capability is a
//! compile-time absence of a match arm rather than a null function pointer.

pub mod fields;
pub mod number;
pub mod records;

use crate::leaf::Leaf;
use crate::parser::{Parser, ParserError};
use bstr::BStr;
use fields::FieldList;
use records::{Array, BitfieldFixed, Enum, Pointer, Struct, TypeModifier, Union};
use zerocopy::{byteorder::LE, FromBytes, Immutable, KnownLayout, Unaligned, U16, U32};

/// A 32-bit type index. Indices below [`TypeIndex::FIRST`] (0x1000) name simple types
/// (spec.md §3: "Simple type index") and are never looked up in the [`TypeGraph`]; indices at or
/// above it name a record in the TPI or IPI stream.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeIndex(pub u32);

impl TypeIndex {
    /// The first type index assigned to a TPI/IPI stream record (spec.md §3: "first type index
    /// (typically 0x1000)").
    pub const FIRST: TypeIndex = TypeIndex(0x1000);

    /// `true` if this index names a simple (built-in) type rather than a TPI/IPI record
    /// (spec.md §4.5: "Inputs a 32-bit type index with top bit zero (simple-type region)").
    pub fn is_simple(self) -> bool {
        self.0 < Self::FIRST.0
    }
}

impl std::fmt::Debug for TypeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

impl std::fmt::Display for TypeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// The fixed-size header at the start of a TPI (or IPI) stream (spec.md §4.4: "header giving
/// first type index and one-past-last").
#[derive(Copy, Clone, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct TypeStreamHeader {
    pub version: U32<LE>,
    pub header_size: U32<LE>,
    pub type_index_begin: U32<LE>,
    pub type_index_end: U32<LE>,
    pub type_record_bytes: U32<LE>,

    pub hash_stream_index: U16<LE>,
    pub hash_aux_stream_index: U16<LE>,
    pub hash_key_size: U32<LE>,
    pub num_hash_buckets: U32<LE>,

    pub hash_value_buffer_offset: U32<LE>,
    pub hash_value_buffer_length: U32<LE>,
    pub index_offset_buffer_offset: U32<LE>,
    pub index_offset_buffer_length: U32<LE>,
    pub hash_adj_buffer_offset: U32<LE>,
    pub hash_adj_buffer_length: U32<LE>,
}

/// One decoded leaf record, indexed by its `tpi_idx` in the owning [`TypeGraph`]
/// (spec.md §3: "A Type holds its `tpi_idx`, its `leaf_type` tag, and a variant payload").
pub struct Type {
    /// This type's own index, i.e. the index a reference elsewhere in the graph uses to name it.
    pub tpi_idx: TypeIndex,
    /// The leaf kind tag of the underlying record.
    pub leaf: Leaf,
    /// The decoded payload.
    pub data: TypeData,
}

/// The tagged variant payload of a [`Type`] (spec.md §3's "Type node (polymorphic over
/// leaf-kind)"). Unrecognized or malformed records become [`TypeData::Unknown`]; this is
/// deliberate: spec.md §7 requires that "the offending type is dropped" only at the *projection*
/// stage, not at decode time, so the graph stays densely indexed even across records this crate
/// cannot interpret.
pub enum TypeData {
    /// A record this crate does not (or cannot) decode further. Carries the raw bytes so a
    /// future consumer could still dump them.
    Unknown,
    /// `LF_POINTER`.
    Pointer {
        /// The type pointed to.
        pointee: TypeIndex,
        /// The pointer's byte width (spec.md §4.5: "Pointer modes produce a pointer descriptor of
        /// width...").
        size: u32,
    },
    /// `LF_CLASS`/`LF_STRUCTURE` and their `_19` extended-header forms (spec.md §3: "treated
    /// equivalently for projection").
    Struct {
        name: String,
        properties: records::UdtProperties,
        field_list: TypeIndex,
        size: i64,
    },
    /// `LF_UNION`.
    Union {
        name: String,
        properties: records::UdtProperties,
        field_list: TypeIndex,
        size: i64,
    },
    /// `LF_ENUM`.
    Enum {
        name: String,
        properties: records::UdtProperties,
        /// The underlying integer type (spec.md §4.6: "Enum base type: discovered by resolving
        /// `Enum.utype` to a simple type").
        utype: TypeIndex,
        field_list: TypeIndex,
    },
    /// `LF_BITFIELD`.
    Bitfield {
        underlying: TypeIndex,
        length_bits: u8,
        position_bits: u8,
    },
    /// `LF_ARRAY`.
    Array { element_type: TypeIndex, size: i64 },
    /// `LF_MODIFIER` (const/volatile) — not named directly in spec.md's data model, but members
    /// routinely reference a modified type, so it is resolved transparently wherever a referent
    /// is dereferenced (see [`TypeGraph::strip_modifiers`]).
    Modifier { underlying: TypeIndex },
    /// `LF_FIELDLIST`: the member/enumerator list attached to a struct, union, class, or enum.
    /// Stored as raw bytes; decoded on demand via [`fields::FieldList::iter`], since the
    /// projector only ever walks it once per aggregate.
    FieldList(Vec<u8>),
}

impl Type {
    /// The declared name of this type, if it has one (spec.md §3: "`get_name?`").
    pub fn name(&self) -> Option<&str> {
        match &self.data {
            TypeData::Struct { name, .. } | TypeData::Union { name, .. } | TypeData::Enum { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }

    /// The numeric value associated with this type, if any (spec.md §3: "`get_val?`"): a
    /// pointer's byte width, an array's element count, or a bitfield's declared size.
    pub fn value(&self) -> Option<i64> {
        match &self.data {
            TypeData::Pointer { size, .. } => Some(*size as i64),
            TypeData::Array { size, .. } => Some(*size),
            TypeData::Struct { size, .. } | TypeData::Union { size, .. } => Some(*size),
            _ => None,
        }
    }

    /// `true` if this is a forward declaration with no member list (spec.md §4.6: "Forward-
    /// reference policy").
    pub fn is_forward_ref(&self) -> bool {
        match &self.data {
            TypeData::Struct { properties, .. } | TypeData::Union { properties, .. } => {
                properties.is_forward_ref()
            }
            TypeData::Enum { properties, .. } => properties.is_forward_ref(),
            _ => false,
        }
    }

    /// `true` for the four aggregate kinds the projector ever walks (spec.md's implicit
    /// `is_printable_type` filter, named explicitly in `SPEC_FULL.md` §2: "only `Structure`,
    /// `Union`, `Enum`, and `Class`... is_aggregate").
    pub fn is_aggregate(&self) -> bool {
        matches!(
            &self.data,
            TypeData::Struct { .. } | TypeData::Union { .. } | TypeData::Enum { .. }
        )
    }

    /// The field-list type index for an aggregate, if applicable.
    pub fn field_list(&self) -> Option<TypeIndex> {
        match &self.data {
            TypeData::Struct { field_list, .. }
            | TypeData::Union { field_list, .. }
            | TypeData::Enum { field_list, .. } => Some(*field_list),
            _ => None,
        }
    }
}

/// The decoded contents of a TPI or IPI stream: a dense, owned table of [`Type`] nodes, indexed
/// by [`TypeIndex`] (spec.md §4.4, §9: "Model the Type Graph as a contiguous table indexed by
/// `tpi_idx`... avoid raw back-pointers").
///
/// Resolution is lazy: the graph itself never resolves a reference at construction time, so
/// forward references (a member naming an aggregate defined later in the stream) and cyclic
/// references need no special handling (spec.md §9: "Two passes are not necessary because
/// resolution is lazy at projection time").
pub struct TypeGraph {
    first_index: TypeIndex,
    types: Vec<Type>,
}

impl TypeGraph {
    /// Decodes every leaf record in a TPI/IPI stream's payload (the bytes following the
    /// [`TypeStreamHeader`]).
    pub fn parse(header: &TypeStreamHeader, record_bytes: &[u8]) -> Self {
        let first_index = TypeIndex(header.type_index_begin.get());
        let mut types = Vec::new();
        let mut next_idx = first_index.0;

        let mut bytes = record_bytes;
        while bytes.len() >= 4 {
            let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
            if len < 2 || bytes.len() < 2 + len {
                tracing::debug!(tpi_idx = next_idx, "truncated type record, stopping decode");
                break;
            }
            let record = &bytes[2..2 + len];
            bytes = &bytes[2 + len..];

            let tpi_idx = TypeIndex(next_idx);
            next_idx += 1;

            let mut p = Parser::new(record);
            let leaf = match p.u16() {
                Ok(v) => Leaf(v),
                Err(ParserError) => {
                    types.push(Type {
                        tpi_idx,
                        leaf: Leaf(0),
                        data: TypeData::Unknown,
                    });
                    continue;
                }
            };

            let data = decode_leaf(leaf, &mut p).unwrap_or_else(|err| {
                tracing::debug!(tpi_idx = tpi_idx.0, leaf = ?leaf, %err, "dropping unparsable type record");
                TypeData::Unknown
            });
            types.push(Type {
                tpi_idx,
                leaf,
                data,
            });
        }

        Self { first_index, types }
    }

    /// Looks up a type by its index (spec.md §3: "`stype_by_index(i) → Type?`"). Returns `None`
    /// for simple-type indices, out-of-range indices, and (deliberately) never panics: "Out-of-
    /// range indices in cross-references surface as lookup misses" (spec.md §4.4).
    pub fn stype_by_index(&self, idx: TypeIndex) -> Option<&Type> {
        if idx.is_simple() {
            return None;
        }
        let offset = idx.0.checked_sub(self.first_index.0)?;
        self.types.get(offset as usize)
    }

    /// Follows `LF_MODIFIER` (const/volatile) wrappers until a non-modifier type index is
    /// reached, or the chain cannot be followed further. Members, array elements, and pointees
    /// frequently reference a modified type; the projector wants the underlying kind.
    pub fn strip_modifiers(&self, mut idx: TypeIndex) -> TypeIndex {
        for _ in 0..64 {
            let Some(t) = self.stype_by_index(idx) else {
                return idx;
            };
            match &t.data {
                TypeData::Modifier { underlying } => idx = *underlying,
                _ => return idx,
            }
        }
        idx
    }

    /// Iterates all decoded types in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    /// The number of records in this graph.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// `true` if this graph has no records (e.g. an absent or empty TPI stream).
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Decodes a single leaf record's body. Internal plumbing only: malformed records are reported
/// with `anyhow`'s free-form `context`, matching the teacher's convention for sub-parsers that
/// never cross the crate boundary (see `DESIGN.md`); the caller adapts any `Err` into
/// [`TypeData::Unknown`] rather than letting decode failures abort the whole graph.
fn decode_leaf(leaf: Leaf, p: &mut Parser<'_>) -> anyhow::Result<TypeData> {
    use anyhow::Context;

    Ok(match leaf {
        Leaf::LF_POINTER => {
            let rec: Pointer<'_> = p.parse()?;
            TypeData::Pointer {
                pointee: rec.fixed.underlying(),
                size: rec.fixed.size(),
            }
        }

        Leaf::LF_CLASS | Leaf::LF_STRUCTURE => {
            let rec: Struct<'_> = p.parse().context("decoding LF_CLASS/LF_STRUCTURE body")?;
            TypeData::Struct {
                name: rec.name.to_string(),
                properties: rec.fixed.property(),
                field_list: rec.fixed.field_list(),
                size: rec.length.to_i64().unwrap_or(0),
            }
        }

        // `_19`/extended forms: spec.md §3 calls these out explicitly ("`Class/Structure(_19
        // variants)`") but §4.6 says they are "treated equivalently for projection" to the
        // regular forms, so they are normalised to the same `TypeData::Struct` variant here
        // rather than kept as a separate payload shape.
        Leaf::LF_CLASS2 | Leaf::LF_STRUCTURE2 => {
            let fixed: &records::Struct19Fixed =
                p.get().context("decoding LF_CLASS2/LF_STRUCTURE2 fixed header")?;
            let length = p.number()?;
            let name = p.strz()?;
            TypeData::Struct {
                name: name.to_string(),
                properties: records::UdtProperties::from_bits_retain(fixed.property.get() as u16),
                field_list: TypeIndex(fixed.field_list.get()),
                size: length.to_i64().unwrap_or(0),
            }
        }

        Leaf::LF_UNION => {
            let rec: Union<'_> = p.parse()?;
            TypeData::Union {
                name: rec.name.to_string(),
                properties: rec.fixed.property(),
                field_list: rec.fixed.fields(),
                size: rec.length.to_i64().unwrap_or(0),
            }
        }

        Leaf::LF_ENUM => {
            let rec: Enum<'_> = p.parse()?;
            TypeData::Enum {
                name: rec.name.to_string(),
                properties: rec.fixed.property(),
                utype: rec.fixed.underlying_type(),
                field_list: rec.fixed.fields(),
            }
        }

        Leaf::LF_BITFIELD => {
            let fixed: &BitfieldFixed = p.get()?;
            TypeData::Bitfield {
                underlying: fixed.underlying(),
                length_bits: fixed.length,
                position_bits: fixed.position,
            }
        }

        Leaf::LF_ARRAY => {
            let rec: Array<'_> = p.parse()?;
            TypeData::Array {
                element_type: rec.fixed.element_type(),
                size: rec.len.to_i64().unwrap_or(0),
            }
        }

        Leaf::LF_MODIFIER => {
            let rec: TypeModifier = p.parse()?;
            TypeData::Modifier {
                underlying: rec.underlying_type,
            }
        }

        Leaf::LF_FIELDLIST => TypeData::FieldList(p.take_rest().to_vec()),

        _ => TypeData::Unknown,
    })
}

impl TypeData {
    /// Reconstructs a [`FieldList`] view over this type's raw field-list bytes, if this variant
    /// carries one.
    pub fn as_field_list(&self) -> Option<FieldList<'_>> {
        match self {
            TypeData::FieldList(bytes) => Some(FieldList { bytes }),
            _ => None,
        }
    }
}

/// Borrows the raw bytes of an `LF_*` member name for display, used by the projector when a
/// member's referent has no name of its own (spec.md §4.6 step 3: "`type_0x<tpi_idx>` when the
/// referent lacks a name").
pub fn anonymous_type_name(idx: TypeIndex) -> String {
    format!("type_0x{:x}", idx.0)
}

#[allow(unused)]
fn _assert_bstr(_: &BStr) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_struct_record(name: &str, field_list: u32, length: u16) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes()); // num_elements
        body.extend_from_slice(&0u16.to_le_bytes()); // property (not forward ref)
        body.extend_from_slice(&field_list.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes()); // derivation_list
        body.extend_from_slice(&0u32.to_le_bytes()); // vtable_shape
        body.extend_from_slice(&length.to_le_bytes()); // LF_USHORT-range inline length
        body.extend_from_slice(name.as_bytes());
        body.push(0);

        let mut record = Vec::new();
        record.extend_from_slice(&Leaf::LF_STRUCTURE.0.to_le_bytes());
        record.extend_from_slice(&body);

        let mut out = Vec::new();
        out.extend_from_slice(&(record.len() as u16).to_le_bytes());
        out.extend_from_slice(&record);
        out
    }

    #[test]
    fn decodes_a_simple_struct() {
        let header = TypeStreamHeader {
            version: U32::new(20040203),
            header_size: U32::new(56),
            type_index_begin: U32::new(0x1000),
            type_index_end: U32::new(0x1002),
            type_record_bytes: U32::new(0),
            hash_stream_index: U16::new(0xffff),
            hash_aux_stream_index: U16::new(0xffff),
            hash_key_size: U32::new(0),
            num_hash_buckets: U32::new(0),
            hash_value_buffer_offset: U32::new(0),
            hash_value_buffer_length: U32::new(0),
            index_offset_buffer_offset: U32::new(0),
            index_offset_buffer_length: U32::new(0),
            hash_adj_buffer_offset: U32::new(0),
            hash_adj_buffer_length: U32::new(0),
        };

        let rec = make_struct_record("Foo", 0x1001, 16);
        let graph = TypeGraph::parse(&header, &rec);
        assert_eq!(graph.len(), 1);

        let t = graph.stype_by_index(TypeIndex(0x1000)).unwrap();
        assert_eq!(t.name(), Some("Foo"));
        assert!(!t.is_forward_ref());
        assert!(t.is_aggregate());
        assert_eq!(t.value(), Some(16));
    }

    #[test]
    fn out_of_range_lookup_is_a_miss_not_a_panic() {
        let header = TypeStreamHeader {
            version: U32::new(0),
            header_size: U32::new(56),
            type_index_begin: U32::new(0x1000),
            type_index_end: U32::new(0x1000),
            type_record_bytes: U32::new(0),
            hash_stream_index: U16::new(0xffff),
            hash_aux_stream_index: U16::new(0xffff),
            hash_key_size: U32::new(0),
            num_hash_buckets: U32::new(0),
            hash_value_buffer_offset: U32::new(0),
            hash_value_buffer_length: U32::new(0),
            index_offset_buffer_offset: U32::new(0),
            index_offset_buffer_length: U32::new(0),
            hash_adj_buffer_offset: U32::new(0),
            hash_adj_buffer_length: U32::new(0),
        };
        let graph = TypeGraph::parse(&header, &[]);
        assert!(graph.stype_by_index(TypeIndex(0x1234)).is_none());
        assert!(graph.stype_by_index(TypeIndex(0x10)).is_none());
    }
}
