//! Reads Program Database (PDB) files: a PDB7 MSF container whose fixed streams (PDB Info, TPI,
//! DBI) name a handful of further, dynamically-indexed streams (symbol records, section headers,
//! OMAP tables) via the DBI's "Optional Debug Header" substream.
//!
//! The external surface is deliberately small (spec.md §6): open a PDB, then project its types and
//! global symbols in one of three render modes. Everything else — the MSF container, the TPI leaf
//! decoder, the DBI substream layout — is reachable for a caller that wants lower-level access, but
//! [`Pdb::open`] is the entry point a typical consumer (e.g. a disassembler's PDB-info command)
//! uses.
//!
//! # References
//! * <https://llvm.org/docs/PDB/index.html>
//! * <https://github.com/microsoft/microsoft-pdb>

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dbi;
pub mod error;
pub mod globals;
pub mod json;
pub mod leaf;
pub mod parser;
pub mod pdbi;
pub mod projector;
pub mod simple_type;
pub mod stream_index;
pub mod tpi;
pub mod types;

pub use error::{PdbError, PdbResult};
pub use projector::RenderMode;
pub use stream_index::Stream;

use dbi::{DbiSubstreamRanges, OptionalDebugHeader, OptionalDebugStream};
use globals::{GlobalSymbol, GlobalSymbolProjector, Omap, SectionHeader};
use json::JsonSink;
use sync_file::ReadAt;
use types::TypeGraph;

#[cfg(test)]
#[static_init::dynamic]
static INIT_LOGGER: () = {
    tracing_subscriber::fmt()
        .with_ansi(false)
        .with_test_writer()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(tracing::Level::DEBUG)
        .compact()
        .without_time()
        .finish();
};

/// The streams a PDB needs beyond its three fixed ones, resolved once at [`Pdb::open`] time via
/// the DBI's Optional Debug Header (spec.md §4.3's "Fixed-Index Dispatcher"'s "deferred-parser
/// table").
struct DependentStreams {
    symbol_records: Option<Vec<GlobalSymbol>>,
    section_headers: Vec<SectionHeader>,
    section_headers_orig: Vec<SectionHeader>,
    omap_from_src: Option<Omap>,
    /// FPO, new-FPO, OMAP-to-src, XDATA, PDATA, and the token-RID map (spec.md §3's DBI debug-
    /// header listing, C5's "FPO, FPO-new"): no operation in spec.md §6's external surface
    /// exposes these, so they are kept only as raw bytes (spec.md §4.3: "non-matches are
    /// retained as raw Streams" — applied here to matches with no consumer, too), rather than
    /// decoded further.
    raw: RawDependentStreams,
}

/// The DBI-dependent streams this crate reads but does not decode further (see
/// [`DependentStreams::raw`]).
#[derive(Default)]
struct RawDependentStreams {
    omap_to_src: Option<Vec<u8>>,
    fpo: Option<Vec<u8>>,
    fpo_new: Option<Vec<u8>>,
    xdata: Option<Vec<u8>>,
    pdata: Option<Vec<u8>>,
    token_rid_map: Option<Vec<u8>>,
}

impl DependentStreams {
    fn resolve<F: ReadAt>(
        msf: &msf::Msf<F>,
        debug_header: &OptionalDebugHeader,
        sym_record_stream: Option<u32>,
    ) -> PdbResult<Self> {
        let symbol_records = match sym_record_stream {
            Some(s) if msf.is_valid_stream_index(s) => {
                let bytes = msf.read_stream_to_vec(s)?;
                Some(globals::parse_global_symbols(&bytes))
            }
            _ => None,
        };

        let section_headers = read_optional_substream(msf, debug_header, OptionalDebugStream::SectionHdr)?
            .map(|b| globals::parse_section_headers(&b))
            .unwrap_or_default();
        let section_headers_orig =
            read_optional_substream(msf, debug_header, OptionalDebugStream::SectionHdrOrig)?
                .map(|b| globals::parse_section_headers(&b))
                .unwrap_or_default();
        let omap_from_src = read_optional_substream(msf, debug_header, OptionalDebugStream::OmapFromSrc)?
            .map(|b| Omap::parse(&b));

        let raw = RawDependentStreams {
            omap_to_src: read_optional_substream(msf, debug_header, OptionalDebugStream::OmapToSrc)?,
            fpo: read_optional_substream(msf, debug_header, OptionalDebugStream::Fpo)?,
            fpo_new: read_optional_substream(msf, debug_header, OptionalDebugStream::FpoNew)?,
            xdata: read_optional_substream(msf, debug_header, OptionalDebugStream::Xdata)?,
            pdata: read_optional_substream(msf, debug_header, OptionalDebugStream::Pdata)?,
            token_rid_map: read_optional_substream(msf, debug_header, OptionalDebugStream::TokenRidMap)?,
        };

        Ok(Self {
            symbol_records,
            section_headers,
            section_headers_orig,
            omap_from_src,
            raw,
        })
    }
}

fn read_optional_substream<F: ReadAt>(
    msf: &msf::Msf<F>,
    debug_header: &OptionalDebugHeader,
    which: OptionalDebugStream,
) -> PdbResult<Option<Vec<u8>>> {
    let Some(stream) = debug_header.get(which) else {
        return Ok(None);
    };
    if !msf.is_valid_stream_index(stream) {
        return Ok(None);
    }
    Ok(Some(msf.read_stream_to_vec(stream)?))
}

/// An open PDB file (spec.md §3/§6).
///
/// Constructed by [`Pdb::open`], which eagerly decodes the three fixed streams (PDB Info, TPI,
/// DBI) and whichever of DBI's dynamically-indexed streams (symbol records, section headers, OMAP)
/// are present. Nothing here keeps a raw [`msf::Msf`] stream-reader borrow alive past `open`: every
/// dependent stream is read to a `Vec<u8>` and decoded once, up front, matching spec.md §4.3's
/// framing of the Fixed-Index Dispatcher as doing its work "once, at open time".
pub struct Pdb<F> {
    msf: msf::Msf<F>,
    pdb_info: pdbi::PdbInfo,
    type_graph: TypeGraph,
    dependent: DependentStreams,
}

impl<F: ReadAt> Pdb<F> {
    /// Opens a PDB file for reading (spec.md §6: `open(buffer) → Parser | Error`).
    ///
    /// Reads the MSF superblock and root directory, then the PDB Info, TPI, and DBI streams
    /// (streams 1, 2, 3 — spec.md §3's "Fixed-Index Dispatcher"), then resolves whichever DBI-
    /// dependent streams the Optional Debug Header names.
    pub fn open(file: F) -> PdbResult<Self> {
        let _span = tracing::trace_span!("Pdb::open").entered();

        let msf = msf::Msf::open(file)?;

        let pdb_info_bytes = msf.read_stream_to_vec(Stream::PDB.into())?;
        let pdb_info = pdbi::PdbInfo::parse(&pdb_info_bytes)?;

        let tpi_bytes = msf.read_stream_to_vec(Stream::TPI.into())?;
        let type_graph = tpi::parse_type_stream(&tpi_bytes)?;

        let dbi_bytes = msf.read_stream_to_vec(Stream::DBI.into())?;
        let dependent = if dbi_bytes.is_empty() {
            // A PDB with no DBI stream has no globals to project (spec.md §8 scenario 1: "Minimal
            // PDB7... no errors"); this is not itself an error.
            DependentStreams {
                symbol_records: None,
                section_headers: Vec::new(),
                section_headers_orig: Vec::new(),
                omap_from_src: None,
                raw: RawDependentStreams::default(),
            }
        } else {
            let dbi_header = dbi::parse_dbi_header(&dbi_bytes)?;
            let ranges = DbiSubstreamRanges::from_header(&dbi_header, dbi_bytes.len())?;
            let debug_header = OptionalDebugHeader::parse(&dbi_bytes[ranges.optional_debug_header]);
            DependentStreams::resolve(&msf, &debug_header, dbi_header.sym_record_stream())?
        };

        Ok(Self {
            msf,
            pdb_info,
            type_graph,
            dependent,
        })
    }

    /// The decoded PDB Information Stream (version, timestamp, age, GUID).
    pub fn pdb_info(&self) -> &pdbi::PdbInfo {
        &self.pdb_info
    }

    /// The decoded Type Graph (every struct/union/enum/etc. record from the TPI stream).
    pub fn type_graph(&self) -> &TypeGraph {
        &self.type_graph
    }

    /// The raw bytes of the FPO stream, if present. Not decoded further: spec.md §6's external
    /// surface has no operation that consumes FPO unwind data, so this crate stops at exposing
    /// the bytes (spec.md component table C5).
    pub fn fpo_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.fpo.as_deref()
    }

    /// The raw bytes of the new-format FPO stream, if present. See [`Pdb::fpo_stream`].
    pub fn fpo_new_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.fpo_new.as_deref()
    }

    /// The raw bytes of the OMAP-to-src stream, if present (the inverse direction of
    /// [`Pdb::print_globals`]'s OMAP-from-src remap; not used by this crate's own projectors).
    pub fn omap_to_src_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.omap_to_src.as_deref()
    }

    /// The raw bytes of the XDATA stream, if present.
    pub fn xdata_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.xdata.as_deref()
    }

    /// The raw bytes of the PDATA stream, if present.
    pub fn pdata_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.pdata.as_deref()
    }

    /// The raw bytes of the token-RID map stream, if present.
    pub fn token_rid_map_stream(&self) -> Option<&[u8]> {
        self.dependent.raw.token_rid_map.as_deref()
    }

    /// Projects every printable type (spec.md §6 `parser.print_types(mode, json_sink?)`).
    ///
    /// `json_sink` is consulted only when `mode` is [`RenderMode::Json`]; passing `None` in JSON
    /// mode silently produces no output, matching spec.md §4.6's framing of JSON rendering as
    /// calling back into an external collaborator the crate never constructs itself.
    pub fn print_types(&self, mode: RenderMode, json_sink: Option<&mut dyn JsonSink>, mut emit: impl FnMut(&str)) {
        let projector = projector::TypeProjector::new(&self.type_graph);
        match mode {
            RenderMode::Declarative => projector.project_declarative(|line| emit(line)),
            RenderMode::PackFormat => projector.project_pack_format(|line| emit(line)),
            RenderMode::Json => {
                if let Some(sink) = json_sink {
                    projector.project_json(sink);
                }
            }
        }
    }

    /// Projects every resolvable global symbol (spec.md §6 `parser.print_globals(image_base,
    /// mode, json_sink?)`, §4.7). `demangle` is the external name-demangling collaborator spec.md
    /// §4.7 calls out ("demangles via an external callback with raw-name fallback"); pass
    /// `|_| None` to always fall back to the raw symbol name.
    pub fn print_globals(
        &self,
        image_base: u64,
        mode: globals::GlobalRenderMode,
        mut demangle: impl FnMut(&str) -> Option<String>,
        json_sink: Option<&mut dyn JsonSink>,
        mut emit: impl FnMut(&str),
    ) {
        let Some(globals) = &self.dependent.symbol_records else {
            return;
        };

        let projector = GlobalSymbolProjector::new(
            image_base,
            &self.dependent.section_headers,
            &self.dependent.section_headers_orig,
            self.dependent.omap_from_src.as_ref(),
        );
        let rendered = projector.project_all(globals, &mut demangle);

        match mode {
            globals::GlobalRenderMode::Human => {
                for g in &rendered {
                    emit(&g.to_human_line());
                }
            }
            globals::GlobalRenderMode::FlagScript => {
                for g in &rendered {
                    for line in g.to_flag_script_lines() {
                        emit(&line);
                    }
                }
            }
            globals::GlobalRenderMode::Json => {
                if let Some(sink) = json_sink {
                    for g in &rendered {
                        sink.open_object();
                        sink.key_number("address", g.address as i64);
                        sink.key_number("symtype", g.symtype as i64);
                        sink.key_string("section_name", &g.section_name);
                        sink.key_string("gdata_name", &g.name);
                        sink.end();
                    }
                }
            }
        }
    }

    /// Releases this PDB's resources (spec.md §6 `parser.close()`). The file handle `F` is
    /// dropped; since this crate never keeps a borrowed stream reader alive past `open`, there is
    /// nothing else to tear down.
    pub fn close(self) {
        drop(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_file::ReadAt;
    use std::sync::Mutex;

    /// A trivial in-memory [`ReadAt`] source, in the same style as the `msf` crate's own test
    /// helper of the same name.
    #[derive(Default)]
    struct TestFile {
        data: Mutex<Vec<u8>>,
    }

    impl ReadAt for TestFile {
        fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
            self.data.lock().unwrap().read_exact_at(buf, offset)
        }

        fn read_at(&self, buf: &mut [u8], offset: u64) -> std::io::Result<usize> {
            self.data.lock().unwrap().read_at(buf, offset)
        }
    }

    /// Builds the smallest possible well-formed PDB7 image (mirroring the `msf` crate's own
    /// `build_msf_image` test helper): one page for the superblock, one for the root directory,
    /// and one page per nonempty stream. spec.md §8 scenario 1: "Minimal PDB7... page_size=0x1000,
    /// 3 streams (PDB-Info, TPI empty, DBI empty)... no errors".
    fn build_msf_image(page_size: u32, streams: &[&[u8]]) -> Vec<u8> {
        let page_size_usize = page_size as usize;

        let mut stream_pages: Vec<Vec<u8>> = Vec::new();
        let mut stream_sizes: Vec<u32> = Vec::new();
        for &s in streams {
            stream_sizes.push(s.len() as u32);
            let mut padded = s.to_vec();
            padded.resize(s.len().div_ceil(page_size_usize).max(1) * page_size_usize, 0);
            stream_pages.push(padded);
        }

        let mut root_dir: Vec<u8> = Vec::new();
        root_dir.extend_from_slice(&(streams.len() as u32).to_le_bytes());
        for &size in &stream_sizes {
            root_dir.extend_from_slice(&size.to_le_bytes());
        }

        let mut next_page: u32 = 2;
        let mut stream_page_numbers: Vec<Vec<u32>> = Vec::new();
        for (size, padded) in stream_sizes.iter().zip(stream_pages.iter()) {
            let n = if *size == 0 { 0 } else { padded.len() / page_size_usize };
            let pages: Vec<u32> = (next_page..next_page + n as u32).collect();
            next_page += n as u32;
            stream_page_numbers.push(pages);
        }
        for pages in &stream_page_numbers {
            for &p in pages {
                root_dir.extend_from_slice(&p.to_le_bytes());
            }
        }
        assert!(root_dir.len() <= page_size_usize, "test root directory must fit in one page");

        let root_size = root_dir.len() as u32;
        let num_file_pages = next_page;

        let mut page0 = vec![0u8; page_size_usize];
        page0[..32].copy_from_slice(b"Microsoft C/C++ MSF 7.00\r\n\x1a\x44\x53\x00\x00\x00");
        page0[32..36].copy_from_slice(&page_size.to_le_bytes());
        page0[36..40].copy_from_slice(&1u32.to_le_bytes()); // active_fpm
        page0[40..44].copy_from_slice(&num_file_pages.to_le_bytes());
        page0[44..48].copy_from_slice(&root_size.to_le_bytes());
        page0[48..52].copy_from_slice(&0u32.to_le_bytes()); // reserved
        page0[52..56].copy_from_slice(&1u32.to_le_bytes()); // root-index page list: [page 1]

        let mut page1 = vec![0u8; page_size_usize];
        page1[..root_dir.len()].copy_from_slice(&root_dir);

        let mut image = vec![0u8; num_file_pages as usize * page_size_usize];
        image[0..page_size_usize].copy_from_slice(&page0);
        image[page_size_usize..2 * page_size_usize].copy_from_slice(&page1);
        for (pages, padded) in stream_page_numbers.iter().zip(stream_pages.iter()) {
            for (i, &p) in pages.iter().enumerate() {
                let src = &padded[i * page_size_usize..(i + 1) * page_size_usize];
                let dst_start = p as usize * page_size_usize;
                image[dst_start..dst_start + page_size_usize].copy_from_slice(src);
            }
        }

        image
    }

    fn open_image(image: Vec<u8>) -> PdbResult<Pdb<TestFile>> {
        Pdb::open(TestFile { data: Mutex::new(image) })
    }

    #[test]
    fn opens_a_minimal_pdb_with_no_errors() {
        // PDB Info needs a real fixed header; TPI and DBI are allowed to be fully empty.
        let mut pdbi = Vec::new();
        pdbi.extend_from_slice(&20000404u32.to_le_bytes()); // version (VC70)
        pdbi.extend_from_slice(&0u32.to_le_bytes()); // timestamp
        pdbi.extend_from_slice(&1u32.to_le_bytes()); // age
        pdbi.extend_from_slice(&[0u8; 16]); // guid

        // Stream 0 is the conventional Old MSF Directory placeholder; PDB Info, TPI, and DBI
        // occupy streams 1, 2, 3 per `stream_index::Stream`.
        let image = build_msf_image(0x1000, &[b"", &pdbi, b"", b""]);
        let pdb = open_image(image).expect("should open");
        assert_eq!(pdb.pdb_info().age(), 1);
        assert!(pdb.type_graph().is_empty());

        let mut lines = Vec::new();
        pdb.print_types(RenderMode::PackFormat, None, |l| lines.push(l.to_string()));
        assert!(lines.is_empty());
    }

    #[test]
    fn render_mode_from_char() {
        assert_eq!(RenderMode::try_from('d').unwrap(), RenderMode::Declarative);
        assert_eq!(RenderMode::try_from('j').unwrap(), RenderMode::Json);
        assert_eq!(RenderMode::try_from('r').unwrap(), RenderMode::PackFormat);
        assert!(RenderMode::try_from('x').is_err());
    }

    /// A DBI-matched stream with no projector consumer (here: FPO) is still retained as raw bytes
    /// (spec.md §4.3's "non-matches are retained as raw Streams", applied to this unprojected-but-
    /// matched case too — see `globals.rs`'s module doc comment).
    #[test]
    fn fpo_stream_is_retained_raw() {
        let mut pdbi = Vec::new();
        pdbi.extend_from_slice(&20000404u32.to_le_bytes());
        pdbi.extend_from_slice(&0u32.to_le_bytes());
        pdbi.extend_from_slice(&1u32.to_le_bytes());
        pdbi.extend_from_slice(&[0u8; 16]);

        let fpo_bytes = b"fpo-unwind-data-goes-here".to_vec();

        let mut dbi = vec![0u8; 64];
        dbi[0..4].copy_from_slice(&(-1i32).to_le_bytes()); // version_signature
        dbi[18..20].copy_from_slice(&0xffffu16.to_le_bytes()); // sym_record_stream: none
        dbi[44..48].copy_from_slice(&2u32.to_le_bytes()); // optional_dbg_header_size: one u16 slot (Fpo)
        dbi.extend_from_slice(&4u16.to_le_bytes()); // optional debug header: Fpo -> stream 4

        // Stream 0 is the Old MSF Directory placeholder; 1/2/3 are PDB Info/TPI/DBI per
        // `stream_index::Stream`, and 4 holds the FPO bytes the DBI's optional debug header
        // points at.
        let image = build_msf_image(0x1000, &[b"", &pdbi, b"", &dbi, &fpo_bytes]);
        let pdb = open_image(image).expect("should open");
        assert_eq!(pdb.fpo_stream(), Some(fpo_bytes.as_slice()));
        assert_eq!(pdb.fpo_new_stream(), None);
    }
}
