//! Fixed-layout payloads for the aggregate and scalar-wrapper leaf kinds spec.md's data model
//! names: `Pointer`, `Class/Structure`, `Union`, `Enum`, `Bitfield`, `Array`.

use super::number::Number;
use crate::parser::{Parse, Parser, ParserError};
use crate::types::TypeIndex;
use bitflags::bitflags;
use bstr::BStr;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned, LE, U16, U32};

bitflags! {
    /// Bit flags packed into the `property` field shared by struct/union/enum/class records.
    ///
    /// See `CV_prop_t` in the public CodeView reference.
    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    pub struct UdtProperties: u16 {
        /// Forward declaration with no member list (spec.md §4.6: "Forward-reference policy:
        /// any type whose `is_forward_ref()` returns true is skipped").
        const FORWARD_REF = 0x80;
        /// A decorated unique name follows the regular name.
        const HAS_UNIQUE_NAME = 0x200;
        /// Packed/`#pragma pack`-affected layout.
        const PACKED = 0x1;
        /// Has constructors/destructors.
        const HAS_CTOR_DTOR = 0x2;
        /// Overloaded operators.
        const OVERLOADED_OPS = 0x4;
        /// Nested type.
        const IS_NESTED = 0x8;
        /// Contains nested types.
        const CONTAINS_NESTED = 0x10;
        /// Overloaded assignment.
        const OVERLOADED_ASSIGN = 0x20;
        /// Has casting operators.
        const HAS_CASTING_OPS = 0x40;
        /// Scoped (C++11 `enum class`) definition.
        const SCOPED = 0x400;
    }
}

impl UdtProperties {
    /// `true` if this is a forward declaration with no member list.
    pub fn is_forward_ref(self) -> bool {
        self.contains(Self::FORWARD_REF)
    }

    /// `true` if a decorated unique name follows the regular name.
    pub fn has_unique_name(self) -> bool {
        self.contains(Self::HAS_UNIQUE_NAME)
    }
}

/// `LF_ENUM`.
#[derive(Clone, Debug)]
pub struct Enum<'a> {
    pub fixed: &'a EnumFixed,
    pub name: &'a BStr,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct EnumFixed {
    pub count: U16<LE>,
    pub property: U16<LE>,
    pub underlying_type: U32<LE>,
    pub fields: U32<LE>,
}

impl EnumFixed {
    pub fn property(&self) -> UdtProperties {
        UdtProperties::from_bits_retain(self.property.get())
    }
    pub fn underlying_type(&self) -> TypeIndex {
        TypeIndex(self.underlying_type.get())
    }
    pub fn fields(&self) -> TypeIndex {
        TypeIndex(self.fields.get())
    }
}

impl<'a> Parse<'a> for Enum<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &EnumFixed = p.get()?;
        let name = p.strz()?;
        if fixed.property().has_unique_name() {
            let _ = p.strz()?;
        }
        Ok(Self { fixed, name })
    }
}

/// `LF_ARRAY`.
#[derive(Clone, Debug)]
pub struct Array<'a> {
    pub fixed: &'a ArrayFixed,
    pub len: Number<'a>,
    pub name: &'a BStr,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct ArrayFixed {
    pub element_type: U32<LE>,
    pub index_type: U32<LE>,
}

impl ArrayFixed {
    pub fn element_type(&self) -> TypeIndex {
        TypeIndex(self.element_type.get())
    }
}

impl<'a> Parse<'a> for Array<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            fixed: p.get()?,
            len: p.number()?,
            name: p.strz()?,
        })
    }
}

/// `LF_CLASS`, `LF_STRUCTURE`, `LF_CLASS2`, `LF_STRUCTURE2` (spec.md's `_19` variants: "carry an
/// extended header layout but are treated equivalently for projection").
#[derive(Clone, Debug)]
pub struct Struct<'a> {
    pub fixed: &'a StructFixed,
    pub length: Number<'a>,
    pub name: &'a BStr,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct StructFixed {
    pub num_elements: U16<LE>,
    pub property: U16<LE>,
    pub field_list: U32<LE>,
    pub derivation_list: U32<LE>,
    pub vtable_shape: U32<LE>,
}

impl StructFixed {
    pub fn property(&self) -> UdtProperties {
        UdtProperties::from_bits_retain(self.property.get())
    }
    pub fn field_list(&self) -> TypeIndex {
        TypeIndex(self.field_list.get())
    }
}

impl<'a> Parse<'a> for Struct<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &StructFixed = p.get()?;
        let length = p.number()?;
        let name = p.strz()?;
        if fixed.property().has_unique_name() {
            let _ = p.strz()?;
        }
        Ok(Self {
            fixed,
            length,
            name,
        })
    }
}

/// The "extended" (32-bit property field) forms `LF_CLASS2`/`LF_STRUCTURE2` share the same
/// logical fields as [`StructFixed`] but a wider property field; both are normalised to
/// [`Struct`] by [`crate::types::TypeData::parse`] before the projector ever sees them, so there
/// is deliberately no separate fixed-layout struct for them (spec.md §9: "treated equivalently").
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct Struct19Fixed {
    pub num_elements: U16<LE>,
    pub _pad0: U16<LE>,
    pub property: U32<LE>,
    pub field_list: U32<LE>,
    pub derivation_list: U32<LE>,
    pub vtable_shape: U32<LE>,
}

/// `LF_UNION`.
#[derive(Clone, Debug)]
pub struct Union<'a> {
    pub fixed: &'a UnionFixed,
    pub length: Number<'a>,
    pub name: &'a BStr,
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct UnionFixed {
    pub count: U16<LE>,
    pub property: U16<LE>,
    pub fields: U32<LE>,
}

impl UnionFixed {
    pub fn property(&self) -> UdtProperties {
        UdtProperties::from_bits_retain(self.property.get())
    }
    pub fn fields(&self) -> TypeIndex {
        TypeIndex(self.fields.get())
    }
}

impl<'a> Parse<'a> for Union<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed: &UnionFixed = p.get()?;
        let length = p.number()?;
        let name = p.strz()?;
        if fixed.property().has_unique_name() {
            let _ = p.strz()?;
        }
        Ok(Self {
            fixed,
            length,
            name,
        })
    }
}

/// `LF_POINTER`.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct PointerFixed {
    pub ty: U32<LE>,
    pub attr: U32<LE>,
}

impl PointerFixed {
    pub fn underlying(&self) -> TypeIndex {
        TypeIndex(self.ty.get())
    }

    /// Pointer byte width, decoded from the `size` sub-field (bits 13..=18) of `attr` when
    /// present, else derived from the `mode` sub-field per spec.md §4.5's width table.
    pub fn size(&self) -> u32 {
        let attr = self.attr.get();
        let encoded_size = (attr >> 13) & 0x3f;
        if encoded_size != 0 {
            return encoded_size;
        }
        match (attr >> 5) & 0x7 {
            0 => 2, // near
            4 => 8, // near64
            5 => 8, // near128 (open question: 16 once wide-pointer formatting exists)
            _ => 4, // far/huge/near32/far32
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pointer<'a> {
    pub fixed: &'a PointerFixed,
}

impl<'a> Parse<'a> for Pointer<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let fixed = p.get()?;
        let _variant = p.take_rest();
        Ok(Self { fixed })
    }
}

/// `LF_MODIFIER`: const/volatile/unaligned qualification of another type.
#[derive(Clone, Debug)]
pub struct TypeModifier {
    pub underlying_type: TypeIndex,
    pub attributes: u16,
}

impl<'a> Parse<'a> for TypeModifier {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            underlying_type: p.type_index()?,
            attributes: p.u16()?,
        })
    }
}

/// `LF_BITFIELD`: `type`, `length` (bits), `position` (starting bit offset).
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct BitfieldFixed {
    pub ty: U32<LE>,
    pub length: u8,
    pub position: u8,
}

impl BitfieldFixed {
    pub fn underlying(&self) -> TypeIndex {
        TypeIndex(self.ty.get())
    }
}
