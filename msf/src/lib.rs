//! Reads Multi-Stream Files (MSF). MSF is the page-indexed container format used by Program
//! Database (PDB) files.
//!
//! An MSF file contains a set of numbered _streams_. Each stream is like a file: a sequence of
//! bytes. The bytes of a single stream are usually not stored contiguously on disk; instead, each
//! stream is described by an ordered list of page indices, and the job of this crate is to
//! reconstruct the logical byte sequence of a stream from that page list.
//!
//! This crate only understands the "Big MSF" (PDB7) superblock layout. The legacy "Small MSF"
//! (PDB 2.00 / "JG") layout is recognised only so that callers can reject it with a specific
//! error; this crate does not parse small-MSF streams.
//!
//! This crate is read-only. It does not support creating or modifying MSF files.
//!
//! # References
//! * <https://llvm.org/docs/PDB/index.html>
//! * <https://llvm.org/docs/PDB/MsfFile.html>

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod pages;
mod read;
mod stream_reader;

#[cfg(test)]
mod tests;

pub use error::{MsfError, MsfResult};
pub use stream_reader::StreamReader;

use pow2::{IntOnlyPow2, Pow2};
use std::mem::size_of;
use sync_file::ReadAt;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned, LE, U32};

use self::pages::num_pages_for_stream_size;

/// Identifies a page number in the MSF file.
type Page = u32;

/// The value of `magic` for "Big MSF" files (PDB7). This is the signature specified in spec.md
/// §4.1 and §6: 32 bytes, `"Microsoft C/C++ MSF 7.00\r\n\x1A""DS\0\0\0"`.
const MSF_BIG_MAGIC: [u8; 32] = *b"Microsoft C/C++ MSF 7.00\r\n\x1a\x44\x53\x00\x00\x00";

/// The signature used by the legacy "Small MSF" / PDB 2.00 ("JG") container, 44 bytes long.
/// Recognised only so that [`Msf::open`] can report [`MsfError::UnsupportedVersion`] instead of
/// [`MsfError::BadSignature`].
const MSF_SMALL_MAGIC: [u8; 0x2c] = *b"Microsoft C/C++ program database 2.00\r\n\x1a\x4a\x47\0\0";

/// The header of the PDB/MSF file (Big MSF / PDB7). This is at file offset 0, immediately
/// following [`MSF_BIG_MAGIC`].
#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct MsfHeader {
    /// The size of each page, in bytes. Must be a power of two.
    page_size: U32<LE>,

    /// Page number of the active Free Page Map. Unused by this (read-only) crate, but present in
    /// the on-disk layout so that later fields line up correctly.
    active_fpm: U32<LE>,

    /// The number of pages in this MSF file.
    num_file_pages: U32<LE>,

    /// Size of the root directory (Stream Directory), in bytes.
    root_size: U32<LE>,

    /// Reserved. Must be ignored by readers.
    reserved: U32<LE>,
    // Immediately following this header is the root-index page list: an array of u32 page
    // indices, `nip = ceil(ceil(root_size / page_size) * 4 / page_size)` entries long.
}

const MSF_HEADER_LEN: usize = size_of::<MsfHeader>();
static_assertions::const_assert_eq!(MSF_HEADER_LEN, 20);

/// The byte offset, within the file, of the root-index page list.
const ROOT_INDEX_PAGE_LIST_OFFSET: u64 = (32 + MSF_HEADER_LEN) as u64;

/// This size is used to mark a stream as "not present". Per spec.md §3, this is recorded as a
/// stream size of 0, not as a stream that is absent from the stream table.
pub const NIL_STREAM_SIZE: u32 = 0xffff_ffff;

/// Specifies a page size used in an MSF file. This value is always a power of 2.
pub type PageSize = Pow2;

/// The stream index of the Stream Directory (root) stream. Reserved; not addressable by
/// applications through [`Msf::get_stream_reader`].
pub const STREAM_DIR_STREAM: u32 = 0;

/// Converts a page number to a file offset.
fn page_to_offset(page: u32, page_size: PageSize) -> u64 {
    (page as u64) << page_size.exponent()
}

/// Reads and provides access to the streams of an MSF (PDB7) file.
///
/// Constructed by [`Msf::open`]. The container owns the stream table (sizes and page lists) for
/// the lifetime of the value; [`StreamReader`]s borrow from it.
pub struct Msf<F> {
    file: F,
    page_size: PageSize,
    num_file_pages: u32,

    /// Size of every stream, indexed by stream number. [`NIL_STREAM_SIZE`] is normalised to 0 at
    /// construction time (spec.md §3: "the sentinel value all-ones denotes 'not present', recorded
    /// as size 0").
    stream_sizes: Vec<u32>,

    /// Page lists for every stream, indexed by stream number. `stream_page_starts[i] ..
    /// stream_page_starts[i + 1]` is the range within `stream_pages` for stream `i`.
    stream_pages: Vec<Page>,
    stream_page_starts: Vec<u32>,
}

impl<F: ReadAt> Msf<F> {
    /// Opens an MSF file for read access, given a file (or any other type implementing
    /// [`ReadAt`]) that has already been opened.
    ///
    /// This reads the MSF File Header and materialises the root directory (the Stream
    /// Directory), so that [`Msf::get_stream_reader`] can be called for any stream index without
    /// further I/O against the directory.
    pub fn open(file: F) -> MsfResult<Self> {
        let _span = tracing::trace_span!("Msf::open").entered();

        let mut superblock: [u8; 32 + MSF_HEADER_LEN] = [0; 32 + MSF_HEADER_LEN];
        if file.read_exact_at(&mut superblock, 0).is_err() {
            return Err(MsfError::Truncated);
        }

        if !superblock.starts_with(&MSF_BIG_MAGIC) {
            let mut small_check = [0u8; MSF_SMALL_MAGIC.len()];
            if file.read_exact_at(&mut small_check, 0).is_ok() && small_check == MSF_SMALL_MAGIC {
                return Err(MsfError::UnsupportedVersion);
            }
            return Err(MsfError::BadSignature);
        }

        // unwrap: `superblock` is sized `32 + MSF_HEADER_LEN`, so this slice always has at least
        // `MSF_HEADER_LEN` bytes.
        let (msf_header, _) = MsfHeader::ref_from_prefix(&superblock[32..]).unwrap();
        let page_size_raw = msf_header.page_size.get();
        let num_file_pages = msf_header.num_file_pages.get();
        let root_size = msf_header.root_size.get();

        if page_size_raw == 0 {
            return Err(MsfError::BadContainer);
        }
        let Ok(page_size) = PageSize::try_from(page_size_raw) else {
            return Err(MsfError::BadContainer);
        };

        let np = num_pages_for_stream_size(root_size, page_size);
        let nip = num_pages_for_stream_size(np.saturating_mul(4), page_size);
        if nip == 0 {
            return Err(MsfError::BadContainer);
        }

        // Read the root-index page list: `nip` u32 page indices, starting right after the
        // superblock.
        let root_index_bytes_len = (nip as usize)
            .checked_mul(4)
            .ok_or(MsfError::BadContainer)?;
        let mut root_index_bytes = vec![0u8; root_index_bytes_len];
        file.read_exact_at(&mut root_index_bytes, ROOT_INDEX_PAGE_LIST_OFFSET)
            .map_err(|_| MsfError::Truncated)?;
        let root_index_pages: &[U32<LE>] =
            <[U32<LE>]>::ref_from_bytes(&root_index_bytes).map_err(|_| MsfError::BadContainer)?;

        // Read the root page list: concatenate the `nip` pages named by `root_index_pages`, then
        // take the first `np` u32 values out of that concatenation.
        let page_size_usize = usize::from(page_size);
        let mut root_page_list_scratch = vec![0u8; nip as usize * page_size_usize];
        for (i, idx) in root_index_pages.iter().enumerate() {
            let page = idx.get();
            if page >= num_file_pages {
                return Err(MsfError::CorruptDirectory);
            }
            let file_offset = page_to_offset(page, page_size);
            let dst = &mut root_page_list_scratch[i * page_size_usize..(i + 1) * page_size_usize];
            file.read_exact_at(dst, file_offset)
                .map_err(|_| MsfError::Truncated)?;
        }
        let (root_page_list_u32, _) =
            <[U32<LE>]>::ref_from_prefix_with_elems(&root_page_list_scratch, np as usize)
                .map_err(|_| MsfError::CorruptDirectory)?;
        let root_page_list: Vec<u32> = root_page_list_u32.iter().map(|v| v.get()).collect();

        // Now parse the root stream itself: num_streams, then stream_sizes, then per-stream page
        // lists (spec.md §4.1 "Root stream parse"), reading through a small sticky-error cursor
        // over the root page list.
        let mut root = RootCursor {
            file: &file,
            page_size,
            stream_size: root_size,
            page_list: &root_page_list,
            pos: 0,
            error: false,
        };

        let num_streams = root.read_u32() as usize;

        let mut stream_sizes = Vec::with_capacity(num_streams);
        for _ in 0..num_streams {
            let raw = root.read_u32();
            stream_sizes.push(if raw == NIL_STREAM_SIZE { 0 } else { raw });
        }

        let mut stream_pages: Vec<Page> = Vec::new();
        let mut stream_page_starts: Vec<u32> = Vec::with_capacity(num_streams + 1);
        for &size in &stream_sizes {
            stream_page_starts.push(stream_pages.len() as u32);
            let n = num_pages_for_stream_size(size, page_size);
            for _ in 0..n {
                stream_pages.push(root.read_u32());
            }
        }
        stream_page_starts.push(stream_pages.len() as u32);

        if root.error {
            return Err(MsfError::CorruptDirectory);
        }

        Ok(Self {
            file,
            page_size,
            num_file_pages,
            stream_sizes,
            stream_pages,
            stream_page_starts,
        })
    }
}

/// A minimal, sticky-error-flag cursor used only while materialising the root directory, before
/// a full [`Msf`] value (and hence [`Msf::get_stream_reader`]) exists.
///
/// This embodies the Stream View contract from spec.md §4.2 in miniature: reads past the end of
/// the stream set `error` and return zero-filled bytes, and the caller checks `error` once at a
/// record boundary (here: once, after the whole root directory has been read) rather than after
/// every field.
struct RootCursor<'a, F> {
    file: &'a F,
    page_size: PageSize,
    stream_size: u32,
    page_list: &'a [u32],
    pos: u32,
    error: bool,
}

impl<'a, F: ReadAt> RootCursor<'a, F> {
    fn read_u32(&mut self) -> u32 {
        if self.error || self.pos.saturating_add(4) > self.stream_size {
            self.error = true;
            return 0;
        }

        let page_slot = self.pos >> self.page_size.exponent();
        let byte_in_page = self.pos & (u32::from(self.page_size) - 1);
        let Some(&page) = self.page_list.get(page_slot as usize) else {
            self.error = true;
            return 0;
        };

        let mut buf = [0u8; 4];
        let file_offset = page_to_offset(page, self.page_size) + byte_in_page as u64;
        if self.file.read_exact_at(&mut buf, file_offset).is_err() {
            self.error = true;
            return 0;
        }

        self.pos += 4;
        u32::from_le_bytes(buf)
    }
}

impl<F: ReadAt> Msf<F> {
    /// The page size used by this MSF file.
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// The total number of streams in this file, including nil (absent) streams.
    pub fn num_streams(&self) -> u32 {
        self.stream_sizes.len() as u32
    }

    /// Returns `true` if `stream` names a valid stream index.
    pub fn is_valid_stream_index(&self, stream: u32) -> bool {
        (stream as usize) < self.stream_sizes.len()
    }

    /// The size, in bytes, of a stream. Returns 0 for nil streams and for streams whose declared
    /// size was the all-ones sentinel.
    pub fn stream_size(&self, stream: u32) -> u32 {
        self.stream_sizes
            .get(stream as usize)
            .copied()
            .unwrap_or(0)
    }

    fn stream_page_list(&self, stream: u32) -> &[Page] {
        let Some(&start) = self.stream_page_starts.get(stream as usize) else {
            return &[];
        };
        let end = self.stream_page_starts[stream as usize + 1];
        &self.stream_pages[start as usize..end as usize]
    }

    /// Returns a [`StreamReader`] over the given stream index.
    ///
    /// Streams with no pages (zero-length or nil) yield a reader whose `read` calls always return
    /// 0 bytes.
    pub fn get_stream_reader(&self, stream: u32) -> MsfResult<StreamReader<'_, F>> {
        if !self.is_valid_stream_index(stream) {
            return Err(MsfError::BadStream(stream));
        }
        let size = self.stream_size(stream);
        let pages = self.stream_page_list(stream);
        Ok(StreamReader::new(&self.file, self.page_size, size, pages))
    }

    /// Reads an entire stream into a freshly allocated `Vec<u8>`.
    pub fn read_stream_to_vec(&self, stream: u32) -> MsfResult<Vec<u8>> {
        let mut reader = self.get_stream_reader(stream)?;
        let mut out = vec![0u8; reader.len() as usize];
        reader.read_exact_into(&mut out)?;
        Ok(out)
    }

    /// The number of pages in the underlying file, as declared by the MSF superblock.
    pub fn num_file_pages(&self) -> u32 {
        self.num_file_pages
    }
}

/// Checks whether the header of a file appears to be a valid MSF file (either Big MSF or the
/// legacy Small MSF). This only inspects the signature.
pub fn is_file_header_msf(header: &[u8]) -> bool {
    header.starts_with(&MSF_BIG_MAGIC) || header.starts_with(&MSF_SMALL_MAGIC)
}
