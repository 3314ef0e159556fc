//! The DBI Stream (stream index 3; spec.md §3, §4.3, C4/C5).
//!
//! Besides its own fixed header, the DBI stream carries the "Optional Debug Header" substream: a
//! short array of dynamic stream indices naming the symbol-records, section-header, OMAP, and FPO
//! streams. spec.md §4.3 calls the process of resolving these into concrete parsers the
//! "Fixed-Index Dispatcher"'s "deferred-parser table".

use crate::error::{PdbError, PdbResult, StreamErrorCause};
use zerocopy::{byteorder::LE, FromBytes, Immutable, KnownLayout, Unaligned, U16, U32};

/// The fixed-size header of the DBI Stream. Field layout per the public LLVM PDB reference
/// (`DBIHeader` / LLVM's `DbiStreamHeader`); the teacher pack did not retain this struct's
/// definition verbatim (see `DESIGN.md`), so it is reproduced here from that documented layout.
#[derive(Copy, Clone, FromBytes, KnownLayout, Immutable, Unaligned, Debug)]
#[repr(C)]
pub struct DbiStreamHeader {
    pub version_signature: zerocopy::byteorder::I32<LE>,
    pub version_header: U32<LE>,
    pub age: U32<LE>,
    pub global_stream_index: U16<LE>,
    pub build_number: U16<LE>,
    pub public_stream_index: U16<LE>,
    pub pdb_dll_version: U16<LE>,
    pub sym_record_stream: U16<LE>,
    pub pdb_dll_rbld: U16<LE>,
    pub mod_info_size: U32<LE>,
    pub section_contribution_size: U32<LE>,
    pub section_map_size: U32<LE>,
    pub source_info_size: U32<LE>,
    pub type_server_map_size: U32<LE>,
    pub mfc_type_server_index: U32<LE>,
    pub optional_dbg_header_size: U32<LE>,
    pub ec_substream_size: U32<LE>,
    pub flags: U16<LE>,
    pub machine: U16<LE>,
    pub padding: U32<LE>,
}

const DBI_HEADER_LEN: usize = std::mem::size_of::<DbiStreamHeader>();
static_assertions::const_assert_eq!(DBI_HEADER_LEN, 64);

/// Stream index of the symbol-records stream (spec.md §3: "fixed header including the symbol-
/// records stream number"). A nil value means there are no global symbols in this PDB.
impl DbiStreamHeader {
    pub fn sym_record_stream(&self) -> Option<u32> {
        nonnil_u16(self.sym_record_stream.get())
    }
}

fn nonnil_u16(v: u16) -> Option<u32> {
    if v == 0xffff {
        None
    } else {
        Some(v as u32)
    }
}

/// Parses the fixed DBI header from the front of the DBI stream's bytes.
pub fn parse_dbi_header(data: &[u8]) -> PdbResult<DbiStreamHeader> {
    if data.len() < DBI_HEADER_LEN {
        return Err(PdbError::MissingStream("DBI"));
    }
    let (header, _) =
        DbiStreamHeader::ref_from_prefix(data).map_err(|_| PdbError::MissingStream("DBI"))?;
    Ok(*header)
}

/// The "Optional Debug Header" substream: an array of `u16` stream indices, immediately following
/// the DBI's other variable-length substreams (Modules, Section Contributions, Section Map,
/// Source Info, Type Server Map, EC). Order per spec.md §3's debug-header sub-record listing.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[allow(missing_docs)]
pub enum OptionalDebugStream {
    Fpo = 0,
    Exception = 1,
    Fixup = 2,
    OmapToSrc = 3,
    OmapFromSrc = 4,
    SectionHdr = 5,
    TokenRidMap = 6,
    Xdata = 7,
    Pdata = 8,
    FpoNew = 9,
    SectionHdrOrig = 10,
}

/// The decoded Optional Debug Header substream (spec.md §3/§4.3).
pub struct OptionalDebugHeader {
    streams: Vec<u16>,
}

impl OptionalDebugHeader {
    /// Parses the substream from its raw bytes: a flat array of little-endian `u16`s.
    pub fn parse(data: &[u8]) -> Self {
        let streams = data
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]))
            .collect();
        Self { streams }
    }

    /// Looks up the dynamic stream index for one of the well-known debug-header slots. Returns
    /// `None` both when the slot is out of range (older PDBs may not carry every slot) and when
    /// its value is the NIL sentinel (spec.md §4.3: "A stream index of all-ones indicates absence
    /// and is skipped silently").
    pub fn get(&self, which: OptionalDebugStream) -> Option<u32> {
        let idx = which as usize;
        let raw = *self.streams.get(idx)?;
        nonnil_u16(raw)
    }
}

/// The byte ranges of the DBI stream's variable-length substreams, computed from the fixed
/// header's declared sizes (spec.md §3: DBI header gives these as fixed substream lengths
/// immediately following the fixed 64-byte header, in a fixed order).
pub struct DbiSubstreamRanges {
    pub modules: std::ops::Range<usize>,
    pub section_contributions: std::ops::Range<usize>,
    pub section_map: std::ops::Range<usize>,
    pub source_info: std::ops::Range<usize>,
    pub type_server_map: std::ops::Range<usize>,
    pub optional_debug_header: std::ops::Range<usize>,
    pub ec_substream: std::ops::Range<usize>,
}

impl DbiSubstreamRanges {
    /// Lays out the substream ranges immediately following the fixed header, given the header's
    /// declared sizes. Returns [`PdbError::CorruptDirectory`] if the declared sizes overrun the
    /// stream (spec.md §7: "stream-table overruns... surface as CorruptDirectory").
    pub fn from_header(header: &DbiStreamHeader, stream_len: usize) -> PdbResult<Self> {
        let mut pos = DBI_HEADER_LEN;
        let mut next = |size: u32| -> PdbResult<std::ops::Range<usize>> {
            let size = size as usize;
            let end = pos
                .checked_add(size)
                .filter(|&e| e <= stream_len)
                .ok_or(PdbError::CorruptDirectory)?;
            let range = pos..end;
            pos = end;
            Ok(range)
        };

        Ok(Self {
            modules: next(header.mod_info_size.get())?,
            section_contributions: next(header.section_contribution_size.get())?,
            section_map: next(header.section_map_size.get())?,
            source_info: next(header.source_info_size.get())?,
            type_server_map: next(header.type_server_map_size.get())?,
            optional_debug_header: next(header.optional_dbg_header_size.get())?,
            ec_substream: next(header.ec_substream_size.get())?,
        })
    }
}

impl From<StreamErrorCause> for PdbError {
    fn from(cause: StreamErrorCause) -> Self {
        PdbError::BadStream(crate::stream_index::Stream::DBI.into(), cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_header() -> Vec<u8> {
        let mut h = vec![0u8; DBI_HEADER_LEN];
        h[0..4].copy_from_slice(&(-1i32).to_le_bytes()); // version_signature
        h[12..14].copy_from_slice(&5u16.to_le_bytes()); // global_stream_index
        h[18..20].copy_from_slice(&7u16.to_le_bytes()); // sym_record_stream
        h
    }

    #[test]
    fn parses_fixed_header() {
        let header = parse_dbi_header(&raw_header()).unwrap();
        assert_eq!(header.sym_record_stream(), Some(7));
    }

    #[test]
    fn nil_stream_index_is_none() {
        let mut data = vec![0xffu8; 4];
        // slot 3: OmapToSrc
        let header = OptionalDebugHeader::parse(&data);
        assert_eq!(header.get(OptionalDebugStream::OmapToSrc), None);

        data.clear();
        data.extend_from_slice(&[0u8; 6]); // fpo, exception, fixup all nonsense 0
        data.extend_from_slice(&9u16.to_le_bytes()); // omap_to_src
        let header = OptionalDebugHeader::parse(&data);
        assert_eq!(header.get(OptionalDebugStream::OmapToSrc), Some(9));
    }
}
