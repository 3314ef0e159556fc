//! A byte-oriented parser for CodeView-style records (TPI leaf records, DBI substreams).
//!
//! This is the internal replacement for the teacher's `ms-codeview` crate: that crate is not a
//! dependency of this workspace (see `DESIGN.md`), so the small part of its `Parser`/`Parse`
//! idiom this crate needs is reproduced here directly, grounded on `codeview/src/parser.rs`.

use bstr::BStr;
use std::mem::take;
use zerocopy::byteorder::{LE, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

/// Zero-sized type for representing parsing errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParserError;

impl ParserError {
    /// Constructs a `ParserError`, logging the event for diagnostic purposes.
    pub fn new() -> Self {
        tracing::debug!("ParserError");
        Self
    }
}

impl Default for ParserError {
    fn default() -> Self {
        Self::new()
    }
}

impl std::error::Error for ParserError {}

impl std::fmt::Display for ParserError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.write_str("parsing error")
    }
}

/// Types that can parse themselves from a [`Parser`].
pub trait Parse<'a>: Sized {
    /// Parses an instance of `Self`, advancing the parser.
    fn from_parser(p: &mut Parser<'a>) -> Result<Self, ParserError>;
}

/// A byte-oriented cursor over record bytes.
#[derive(Clone)]
pub struct Parser<'a> {
    bytes: &'a [u8],
}

impl<'a> Parser<'a> {
    /// Starts a new parser over `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Returns the unparsed bytes without advancing.
    pub fn peek_rest(&self) -> &'a [u8] {
        self.bytes
    }

    /// Takes the rest of the unparsed bytes, leaving the parser empty.
    pub fn take_rest(&mut self) -> &'a [u8] {
        take(&mut self.bytes)
    }

    /// Consumes the parser, returning the unparsed bytes.
    pub fn into_rest(self) -> &'a [u8] {
        self.bytes
    }

    /// `true` if there are no unparsed bytes left.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The number of unparsed bytes left.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Takes the next `n` bytes, advancing the parser.
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], ParserError> {
        if self.bytes.len() < n {
            return Err(ParserError::new());
        }
        let (lo, hi) = self.bytes.split_at(n);
        self.bytes = hi;
        Ok(lo)
    }

    /// Skips `n` bytes.
    pub fn skip(&mut self, n: usize) -> Result<(), ParserError> {
        self.bytes(n).map(|_| ())
    }

    /// Parses a reference to a `T`, requiring `size_of::<T>()` bytes.
    pub fn get<T: FromBytes + Unaligned + KnownLayout + Immutable>(
        &mut self,
    ) -> Result<&'a T, ParserError> {
        let (value, rest) = T::ref_from_prefix(self.bytes).map_err(|_| ParserError::new())?;
        self.bytes = rest;
        Ok(value)
    }

    /// Parses a slice of `n` items of `T`.
    pub fn slice<T: FromBytes + Unaligned + Immutable>(
        &mut self,
        len: usize,
    ) -> Result<&'a [T], ParserError> {
        let (lo, hi) =
            <[T]>::ref_from_prefix_with_elems(self.bytes, len).map_err(|_| ParserError::new())?;
        self.bytes = hi;
        Ok(lo)
    }

    /// Parses a `T` via its [`Parse`] implementation.
    pub fn parse<T: Parse<'a>>(&mut self) -> Result<T, ParserError> {
        T::from_parser(self)
    }

    /// Reads one byte.
    pub fn u8(&mut self) -> Result<u8, ParserError> {
        Ok(self.bytes(1)?[0])
    }

    /// Reads one signed byte.
    pub fn i8(&mut self) -> Result<i8, ParserError> {
        Ok(self.bytes(1)?[0] as i8)
    }

    /// Reads a little-endian `u16`.
    pub fn u16(&mut self) -> Result<u16, ParserError> {
        Ok(self.get::<U16<LE>>()?.get())
    }

    /// Reads a little-endian `i16`.
    pub fn i16(&mut self) -> Result<i16, ParserError> {
        Ok(self.u16()? as i16)
    }

    /// Reads a little-endian `u32`.
    pub fn u32(&mut self) -> Result<u32, ParserError> {
        Ok(self.get::<U32<LE>>()?.get())
    }

    /// Reads a little-endian `i32`.
    pub fn i32(&mut self) -> Result<i32, ParserError> {
        Ok(self.u32()? as i32)
    }

    /// Reads a little-endian `u64`.
    pub fn u64(&mut self) -> Result<u64, ParserError> {
        Ok(self.get::<U64<LE>>()?.get())
    }

    /// Reads a little-endian `i64`.
    pub fn i64(&mut self) -> Result<i64, ParserError> {
        Ok(self.u64()? as i64)
    }

    /// Reads a little-endian `u128`.
    pub fn u128(&mut self) -> Result<u128, ParserError> {
        let bytes: [u8; 16] = self.bytes(16)?.try_into().unwrap();
        Ok(u128::from_le_bytes(bytes))
    }

    /// Reads a little-endian `i128`.
    pub fn i128(&mut self) -> Result<i128, ParserError> {
        Ok(self.u128()? as i128)
    }

    /// Reads an `f32`.
    pub fn f32(&mut self) -> Result<f32, ParserError> {
        let bytes: [u8; 4] = self.bytes(4)?.try_into().unwrap();
        Ok(f32::from_le_bytes(bytes))
    }

    /// Reads an `f64`.
    pub fn f64(&mut self) -> Result<f64, ParserError> {
        let bytes: [u8; 8] = self.bytes(8)?.try_into().unwrap();
        Ok(f64::from_le_bytes(bytes))
    }

    /// Skips over a NUL-terminated string, without returning it.
    pub fn skip_strz(&mut self) -> Result<(), ParserError> {
        let i = self.bytes.iter().position(|&b| b == 0).ok_or_else(ParserError::new)?;
        self.bytes = &self.bytes[i + 1..];
        Ok(())
    }

    /// Reads a NUL-terminated string, without checking that it is UTF-8.
    pub fn strz(&mut self) -> Result<&'a BStr, ParserError> {
        let i = self.bytes.iter().position(|&b| b == 0).ok_or_else(ParserError::new)?;
        let s = &self.bytes[..i];
        self.bytes = &self.bytes[i + 1..];
        Ok(BStr::new(s))
    }

    /// Parses a numeric leaf (spec.md §4.4: "a short-form/long-form numeric-leaf encoding").
    pub fn number(&mut self) -> Result<crate::types::number::Number<'a>, ParserError> {
        self.parse()
    }

    /// Parses a 32-bit type index.
    pub fn type_index(&mut self) -> Result<crate::types::TypeIndex, ParserError> {
        Ok(crate::types::TypeIndex(self.u32()?))
    }
}
