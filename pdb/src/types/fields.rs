//! Decodes items within an `LF_FIELDLIST` record: the member/enumerator/nested-type list attached
//! to a struct, union, class, or enum.

use super::number::Number;
use crate::leaf::Leaf;
use crate::parser::{Parse, Parser, ParserError};
use crate::types::TypeIndex;
use bstr::BStr;

/// One field within an `LF_FIELDLIST` type string.
#[derive(Clone, Debug)]
#[allow(missing_docs)]
pub enum Field<'a> {
    BaseClass(u16, TypeIndex),
    Enumerate(Enumerate<'a>),
    /// Continuation link: the field list is split across more than one `LF_FIELDLIST` record.
    Index(TypeIndex),
    Member(Member<'a>),
    StaticMember(StaticMember<'a>),
    Method(Method<'a>),
    NestedType(NestedType<'a>),
    VFuncTable(TypeIndex),
    OneMethod(OneMethod<'a>),
}

/// `LF_MEMBER`: a data member of a struct, union, or class.
#[derive(Clone, Debug)]
pub struct Member<'a> {
    pub attr: u16,
    pub ty: TypeIndex,
    pub offset: Number<'a>,
    pub name: &'a BStr,
}

impl<'a> Parse<'a> for Member<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            attr: p.u16()?,
            ty: p.type_index()?,
            offset: p.number()?,
            name: p.strz()?,
        })
    }
}

/// `LF_STMEMBER`: a static data member.
#[derive(Clone, Debug)]
pub struct StaticMember<'a> {
    pub attr: u16,
    pub ty: TypeIndex,
    pub name: &'a BStr,
}

impl<'a> Parse<'a> for StaticMember<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            attr: p.u16()?,
            ty: p.type_index()?,
            name: p.strz()?,
        })
    }
}

/// `LF_ENUMERATE`: one case of an enum.
#[derive(Clone)]
pub struct Enumerate<'a> {
    pub attr: u16,
    pub value: Number<'a>,
    pub name: &'a BStr,
}

impl<'a> Parse<'a> for Enumerate<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            attr: p.u16()?,
            value: p.number()?,
            name: p.strz()?,
        })
    }
}

impl<'a> std::fmt::Debug for Enumerate<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.name, self.value)
    }
}

/// `LF_NESTEDTYPE`: a nested type definition.
#[derive(Clone, Debug)]
pub struct NestedType<'a> {
    pub nested_ty: TypeIndex,
    pub name: &'a BStr,
}

impl<'a> Parse<'a> for NestedType<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        p.skip(2)?; // padding
        Ok(Self {
            nested_ty: p.type_index()?,
            name: p.strz()?,
        })
    }
}

/// `LF_METHOD`: an overload set of methods sharing a name.
#[derive(Clone, Debug)]
pub struct Method<'a> {
    pub count: u16,
    pub methods: TypeIndex,
    pub name: &'a BStr,
}

impl<'a> Parse<'a> for Method<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        Ok(Self {
            count: p.u16()?,
            methods: p.type_index()?,
            name: p.strz()?,
        })
    }
}

/// `LF_ONEMETHOD`: a single (non-overloaded) method.
#[derive(Clone, Debug)]
pub struct OneMethod<'a> {
    pub attr: u16,
    pub ty: TypeIndex,
    pub name: &'a BStr,
}

/// Bit 0 of the `mprop` sub-field of `attr` distinguishes the virtual introducing-slot forms,
/// which carry a trailing `vbaseoff: u32` before the name.
fn introduces_virtual(attr: u16) -> bool {
    matches!((attr >> 2) & 0x7, 4 | 6)
}

impl<'a> Parse<'a> for OneMethod<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let attr = p.u16()?;
        let ty = p.type_index()?;
        if introduces_virtual(attr) {
            p.skip(4)?; // vbaseoff
        }
        let name = p.strz()?;
        Ok(Self { attr, ty, name })
    }
}

/// Represents the raw bytes of an `LF_FIELDLIST` record, decodable via [`FieldList::iter`].
#[derive(Clone)]
pub struct FieldList<'a> {
    pub bytes: &'a [u8],
}

impl<'a> FieldList<'a> {
    /// Iterates the fields within this `LF_FIELDLIST`.
    pub fn iter(&self) -> IterFields<'a> {
        IterFields { bytes: self.bytes }
    }
}

/// Iterates the fields within an `LF_FIELDLIST` type string.
pub struct IterFields<'a> {
    pub bytes: &'a [u8],
}

impl<'a> Iterator for IterFields<'a> {
    type Item = Field<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        let mut p = Parser::new(self.bytes);

        // Skip alignment padding bytes (LF_PAD*, 0xf0..=0xff).
        let rest = p.peek_rest();
        let mut padding_len = 0;
        while padding_len < rest.len() && rest[padding_len] >= 0xf0 {
            padding_len += 1;
        }
        if padding_len > 0 {
            let _ = p.skip(padding_len);
        }
        if p.is_empty() {
            return None;
        }

        match Field::parse(&mut p) {
            Ok(f) => {
                self.bytes = p.into_rest();
                Some(f)
            }
            Err(ParserError) => None,
        }
    }
}

impl<'a> Field<'a> {
    /// Parses one field. This requires a `Parser` (rather than just `&[u8]`) because field
    /// records have no length prefix of their own: decoding *is* how the next field's start is
    /// located.
    pub fn parse(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let item_kind = Leaf(p.u16()?);

        Ok(match item_kind {
            Leaf::LF_BCLASS | Leaf::LF_VBCLASS | Leaf::LF_IVBCLASS => {
                let attr = p.u16()?;
                let ty = p.type_index()?;
                // Remaining numeric-leaf offset(s) are not needed for member projection.
                let _ = p.number()?;
                if item_kind != Leaf::LF_BCLASS {
                    let _ = p.number()?;
                }
                Self::BaseClass(attr, ty)
            }

            Leaf::LF_ENUMERATE => Self::Enumerate(p.parse()?),

            Leaf::LF_INDEX => {
                p.skip(2)?; // padding
                Self::Index(p.type_index()?)
            }

            Leaf::LF_MEMBER => Self::Member(p.parse()?),
            Leaf::LF_STMEMBER => Self::StaticMember(p.parse()?),
            Leaf::LF_METHOD => Self::Method(p.parse()?),
            Leaf::LF_NESTEDTYPE | Leaf::LF_NESTEDTYPEEX => Self::NestedType(p.parse()?),

            Leaf::LF_VFUNCTAB => {
                p.skip(2)?; // padding
                Self::VFuncTable(p.type_index()?)
            }

            Leaf::LF_ONEMETHOD => Self::OneMethod(p.parse()?),

            unknown => {
                tracing::debug!(?unknown, "unrecognized field within LF_FIELDLIST");
                return Err(ParserError::new());
            }
        })
    }
}
