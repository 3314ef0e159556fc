//! The Stream View (spec.md §4.2): presents a discontiguous page list as a contiguous logical
//! stream with a read cursor and a sticky error flag.

use crate::read::read_stream_core;
use crate::{Page, PageSize};
use std::io::{Read, Seek, SeekFrom};
use sync_file::ReadAt;

/// A read cursor over a single MSF stream.
///
/// Unlike a plain `Read` implementation, a read that runs past the end of the stream does not
/// return a short read or an `io::Error`: it sets a sticky `error` flag and the unfilled portion
/// of the destination buffer is left zeroed (spec.md §4.2: "Reads past end set the error flag and
/// return zero-filled bytes; callers check the flag between logical records, not after each
/// field."). Once set, `error` is never cleared; every subsequent read on this cursor also
/// short-circuits to zero-fill without touching the underlying file.
///
/// This matches the original C implementation's `stream_file.error` field, redesigned (per
/// spec.md §9) so the caller observes it explicitly via [`StreamReader::has_error`] rather than it
/// propagating through a process-wide flag.
pub struct StreamReader<'a, F> {
    file: &'a F,
    page_size: PageSize,
    stream_size: u32,
    page_list: &'a [Page],
    pos: u64,
    error: bool,
}

impl<'a, F: ReadAt> StreamReader<'a, F> {
    pub(crate) fn new(
        file: &'a F,
        page_size: PageSize,
        stream_size: u32,
        page_list: &'a [Page],
    ) -> Self {
        Self {
            file,
            page_size,
            stream_size,
            page_list,
            pos: 0,
            error: false,
        }
    }

    /// The size, in bytes, of the underlying stream.
    pub fn len(&self) -> u32 {
        self.stream_size
    }

    /// `true` if the stream has zero length.
    pub fn is_empty(&self) -> bool {
        self.stream_size == 0
    }

    /// `true` if a read on this cursor has ever run past the end of the stream.
    ///
    /// Per spec.md §7, a sticky error observed after a record boundary should be promoted by the
    /// caller to `BadStream`; this crate only exposes the flag, the PDB-layer parsers decide when
    /// to check it and what to do about it.
    pub fn has_error(&self) -> bool {
        self.error
    }

    /// Reads exactly `dst.len()` bytes, zero-filling (and setting the sticky error flag) if the
    /// read runs past the end of the stream.
    ///
    /// This never returns `Err`; callers that need to detect truncation should check
    /// [`StreamReader::has_error`] after reading a logical record.
    pub fn read_exact_into(&mut self, dst: &mut [u8]) -> crate::MsfResult<()> {
        let (n, new_pos) = read_stream_core(
            self.file,
            self.page_size,
            self.stream_size,
            self.page_list,
            self.pos,
            dst,
        )
        .map_err(|_| crate::MsfError::Truncated)?;

        self.pos = new_pos;
        if n < dst.len() {
            dst[n..].fill(0);
            self.error = true;
        }
        Ok(())
    }
}

impl<'a, F: ReadAt> Seek for StreamReader<'a, F> {
    fn seek(&mut self, from: SeekFrom) -> std::io::Result<u64> {
        let new_pos: i64 = match from {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::End(signed_offset) => signed_offset + self.stream_size as i64,
            SeekFrom::Current(signed_offset) => self.pos as i64 + signed_offset,
        };

        if new_pos < 0 {
            return Err(std::io::ErrorKind::InvalidInput.into());
        }
        self.pos = new_pos as u64;
        Ok(self.pos)
    }
}

impl<'a, F: ReadAt> Read for StreamReader<'a, F> {
    /// Plain `Read` access, for code that wants ordinary short-read-at-EOF semantics (e.g. a
    /// `zerocopy` parser that already checks lengths). This does **not** set the sticky error
    /// flag; use [`StreamReader::read_exact_into`] where the Stream View's zero-fill contract from
    /// spec.md §4.2 is required.
    fn read(&mut self, dst: &mut [u8]) -> std::io::Result<usize> {
        let (n, new_pos) = read_stream_core(
            self.file,
            self.page_size,
            self.stream_size,
            self.page_list,
            self.pos,
            dst,
        )?;
        self.pos = new_pos;
        Ok(n)
    }
}
