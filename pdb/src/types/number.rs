//! Numeric leaves (spec.md §4.4: "a short-form/long-form numeric-leaf encoding for sizes and
//! enumerate values").

use crate::leaf::Leaf;
use crate::parser::{Parse, Parser, ParserError};
use std::fmt::{Debug, Display};

/// A numeric constant embedded in a type or field record: an array length, a struct size, a
/// member offset, or an enumerator value.
#[derive(Copy, Clone)]
pub struct Number<'a> {
    bytes: &'a [u8],
}

impl<'a> Number<'a> {
    /// The representation tag of this value. For immediate values (`< 0x8000`) this *is* the
    /// value.
    pub fn kind(&self) -> Leaf {
        let mut p = Parser::new(self.bytes);
        Leaf(p.u16().unwrap())
    }

    /// Converts this value to an `i64`, if its representation fits.
    ///
    /// Used for member offsets, array lengths, and enumerator values; all of these are small
    /// enough in every real PDB to fit in 64 bits, so this crate does not carry the full
    /// 128-bit numeric-leaf range through the projector.
    pub fn to_i64(&self) -> Option<i64> {
        let mut p = Parser::new(self.bytes);
        let lf = Leaf(p.u16().ok()?);
        Some(if lf.is_immediate_numeric() {
            lf.0 as i64
        } else {
            match lf {
                Leaf::LF_CHAR => p.i8().ok()? as i64,
                Leaf::LF_SHORT => p.i16().ok()? as i64,
                Leaf::LF_USHORT => p.u16().ok()? as i64,
                Leaf::LF_LONG => p.i32().ok()? as i64,
                Leaf::LF_ULONG => p.u32().ok()? as i64,
                Leaf::LF_QUADWORD => p.i64().ok()?,
                Leaf::LF_UQUADWORD => p.u64().ok()? as i64,
                _ => return None,
            }
        })
    }

    /// Convenience wrapper for callers that want an unsigned count (array lengths, sizes).
    pub fn to_u64(&self) -> Option<u64> {
        Some(self.to_i64()? as u64)
    }
}

impl<'a> Parse<'a> for Number<'a> {
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError> {
        let start = p.peek_rest();

        let more_len = match Leaf(p.u16()?) {
            lf if lf.is_immediate_numeric() => 0,
            Leaf::LF_CHAR => 1,
            Leaf::LF_SHORT | Leaf::LF_USHORT => 2,
            Leaf::LF_LONG | Leaf::LF_ULONG | Leaf::LF_REAL32 => 4,
            Leaf::LF_REAL64 | Leaf::LF_QUADWORD | Leaf::LF_UQUADWORD | Leaf::LF_COMPLEX32
            | Leaf::LF_DATE => 8,
            Leaf::LF_REAL80 => 10,
            Leaf::LF_REAL48 => 6,
            Leaf::LF_REAL128 | Leaf::LF_COMPLEX64 | Leaf::LF_OCTWORD | Leaf::LF_UOCTWORD => 16,
            Leaf::LF_COMPLEX80 => 20,
            Leaf::LF_COMPLEX128 => 32,
            Leaf::LF_VARSTRING => p.u16()? as usize,
            Leaf::LF_UTF8STRING => {
                p.skip_strz()?;
                0
            }
            Leaf::LF_REAL16 => 2,
            lf => {
                tracing::warn!(?lf, "unrecognized numeric leaf");
                return Err(ParserError::new());
            }
        };

        p.skip(more_len)?;
        Ok(Self {
            bytes: &start[..start.len() - p.len()],
        })
    }
}

impl<'a> Debug for Number<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self.to_i64() {
            Some(v) => write!(fmt, "{v}"),
            None => write!(fmt, "<unsupported numeric leaf {:?}>", self.kind()),
        }
    }
}

impl<'a> Display for Number<'a> {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        Debug::fmt(self, fmt)
    }
}
