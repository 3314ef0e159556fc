//! DBI-dependent streams (spec.md §3/§4.3, C5) and the Global Symbol Projector (§4.7, C9).
//!
//! Five of the DBI's dynamic streams matter to this crate's projectors: Global Symbols, the
//! current and original PE section headers, and the OMAP-from-src table. FPO, FPO-new, OMAP-to-
//! src, XDATA, PDATA, and the token-RID map are parsed (per spec.md's component table, C5) but
//! carry no fields any operation in spec.md §6's external surface consumes, so
//! [`crate::Pdb`] retains them only as raw streams (spec.md §4.3: "non-matches are retained as
//! raw Streams" — here, a matched but unprojected stream kind is handled the same way).

use zerocopy::{byteorder::LE, FromBytes, Immutable, KnownLayout, Unaligned, U32};

/// One symbol from the Global Symbols stream (spec.md §3: "`{name, segment (1-based), offset,
/// symtype}`").
#[derive(Clone, Debug)]
pub struct GlobalSymbol {
    pub name: String,
    pub segment: u16,
    pub offset: u32,
    pub symtype: u32,
}

/// `S_GDATA32`/`S_LDATA32`/`S_GTHREAD32`-shaped records are the only ones this crate extracts
/// from the Global Symbols stream; every other record kind is skipped. The record stream is a
/// sequence of `[len: u16][kind: u16][payload]` entries, identical in framing to a TPI leaf
/// record.
const S_GDATA32: u16 = 0x110d;
const S_LDATA32: u16 = 0x110c;
const S_GTHREAD32: u16 = 0x1113;

#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct DataSymFixed {
    symtype: U32<LE>,
    offset: U32<LE>,
    segment: zerocopy::byteorder::U16<LE>,
}

/// Parses every data-symbol record out of the Global Symbols stream's raw bytes.
pub fn parse_global_symbols(data: &[u8]) -> Vec<GlobalSymbol> {
    let mut out = Vec::new();
    let mut bytes = data;
    while bytes.len() >= 4 {
        let len = u16::from_le_bytes([bytes[0], bytes[1]]) as usize;
        if len < 2 || bytes.len() < 2 + len {
            break;
        }
        let record = &bytes[2..2 + len];
        bytes = &bytes[2 + len..];

        if record.len() < 2 {
            continue;
        }
        let kind = u16::from_le_bytes([record[0], record[1]]);
        if !matches!(kind, S_GDATA32 | S_LDATA32 | S_GTHREAD32) {
            continue;
        }
        let payload = &record[2..];
        let Ok((fixed, name_bytes)) = DataSymFixed::ref_from_prefix(payload) else {
            continue;
        };
        let name_end = name_bytes.iter().position(|&b| b == 0).unwrap_or(name_bytes.len());
        let name = String::from_utf8_lossy(&name_bytes[..name_end]).into_owned();

        out.push(GlobalSymbol {
            name,
            segment: fixed.segment.get(),
            offset: fixed.offset.get(),
            symtype: fixed.symtype.get(),
        });
    }
    out
}

/// A PE section header, reduced to the two fields this crate reads (spec.md §3: "8-byte name and
/// virtual address (the only fields the core reads)").
#[derive(Clone, Debug)]
pub struct SectionHeader {
    pub name: [u8; 8],
    pub virtual_address: u32,
}

#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct SectionHeaderRaw {
    name: [u8; 8],
    virtual_size: U32<LE>,
    virtual_address: U32<LE>,
    // Remaining IMAGE_SECTION_HEADER fields are not read by this crate.
    _rest: [u8; 24],
}

/// Parses a PE section-header table (the `section_hdr`/`section_hdr_orig` streams).
pub fn parse_section_headers(data: &[u8]) -> Vec<SectionHeader> {
    let (raws, _) = <[SectionHeaderRaw]>::ref_from_prefix_with_elems(
        data,
        data.len() / std::mem::size_of::<SectionHeaderRaw>(),
    )
    .unwrap_or((&[], &[]));

    raws.iter()
        .map(|r| SectionHeader {
            name: r.name,
            virtual_address: r.virtual_address.get(),
        })
        .collect()
}

/// An OMAP (Object Map) table: a monotone `source RVA → target RVA` mapping produced by linker
/// post-processing (spec.md §3 "OMAP entry", §4.7 "OMAP remap").
pub struct Omap {
    /// Sorted ascending by `source`.
    entries: Vec<(u32, u32)>,
}

#[derive(FromBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
struct OmapEntryRaw {
    source: U32<LE>,
    target: U32<LE>,
}

impl Omap {
    /// Parses an OMAP stream's raw bytes into a sorted entry table. Entries are assumed to
    /// already be in ascending source-RVA order, matching how the linker emits them; this is not
    /// re-validated, since spec.md §8 invariant 4 only requires monotonicity of `omap_remap`'s
    /// *output*, not a defensive re-sort of the input.
    pub fn parse(data: &[u8]) -> Self {
        let (raws, _) =
            <[OmapEntryRaw]>::ref_from_prefix_with_elems(data, data.len() / 8).unwrap_or((&[], &[]));
        Self {
            entries: raws.iter().map(|e| (e.source.get(), e.target.get())).collect(),
        }
    }

    /// The empty OMAP: identity remapping (spec.md §4.7: "An empty/absent OMAP is the identity").
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Remaps a source RVA to a target RVA (spec.md §4.7 "OMAP remap" / §8 invariant 4: monotone
    /// non-decreasing in the query RVA).
    ///
    /// Binary-searches for the greatest entry whose source is `<= query`; if that entry's target
    /// is 0, returns 0 (an explicitly-deleted range); otherwise returns `target + (query -
    /// source)`.
    pub fn remap(&self, query: u32) -> u32 {
        if self.entries.is_empty() {
            return query;
        }
        let idx = match self.entries.binary_search_by_key(&query, |&(s, _)| s) {
            Ok(i) => i,
            Err(0) => return 0,
            Err(i) => i - 1,
        };
        let (source, target) = self.entries[idx];
        if target == 0 {
            0
        } else {
            target + (query - source)
        }
    }
}

/// Render modes for [`GlobalSymbolProjector::project`] (spec.md §6/§4.7: human, flag/script, and
/// JSON; "1" and "2" name the flag-script variant and its alias line).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum GlobalRenderMode {
    /// `addr symtype section_name name`.
    Human,
    /// `f pdb.<filtered> = addr` plus an `fN` alias.
    FlagScript,
    /// `{address, symtype, section_name, gdata_name}`.
    Json,
}

/// One rendered global, regardless of mode (the JSON sink's structured fields are also available
/// directly here so a caller can build its own JSON object without re-parsing a formatted
/// string).
#[derive(Clone, Debug)]
pub struct RenderedGlobal {
    pub address: u64,
    pub symtype: u32,
    pub section_name: String,
    pub name: String,
}

impl RenderedGlobal {
    /// The human-mode line (spec.md §8 scenario 3: `0x00401010  2  .text  foo`). The section name
    /// is printed as-is, not padded: the original's `%.*s` with `PDB_SIZEOF_SECTION_NAME` is a
    /// max-length precision, not a field width.
    pub fn to_human_line(&self) -> String {
        format!(
            "0x{:08x}  {}  {}  {}",
            self.address, self.symtype, self.section_name, self.name
        )
    }

    /// The flag-script lines (`f pdb.<name> = addr` plus an `fN` alias).
    pub fn to_flag_script_lines(&self) -> [String; 2] {
        let filtered = sanitize_flag_name(&self.name);
        [
            format!("f pdb.{} = 0x{:x}", filtered, self.address),
            format!("fN pdb.{} {}", filtered, self.name),
        ]
    }
}

/// Replaces characters the radare2 flag-name parser would choke on with `_`, matching the pack-
/// format name sanitiser's character class (`SPEC_FULL.md` §2: "Name sanitisation").
fn sanitize_flag_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Resolves and renders global symbols (spec.md §4.7, C9).
pub struct GlobalSymbolProjector<'a> {
    image_base: u64,
    sections: &'a [SectionHeader],
    sections_orig: &'a [SectionHeader],
    omap_from_src: Option<&'a Omap>,
}

impl<'a> GlobalSymbolProjector<'a> {
    /// Constructs a projector. `sections_orig` and `omap_from_src` are only consulted together:
    /// "if OMAP exists, `rva = omap_remap(rva)` against the *original* section table (which is why
    /// both tables are retained)" (spec.md §4.7).
    pub fn new(
        image_base: u64,
        sections: &'a [SectionHeader],
        sections_orig: &'a [SectionHeader],
        omap_from_src: Option<&'a Omap>,
    ) -> Self {
        Self {
            image_base,
            sections,
            sections_orig,
            omap_from_src,
        }
    }

    /// Resolves one global symbol to an absolute address and renders it. Returns `None` if the
    /// symbol's segment names no section (spec.md §4.7: "skip if absent").
    pub fn resolve(&self, global: &GlobalSymbol, demangle: impl FnOnce(&str) -> Option<String>) -> Option<RenderedGlobal> {
        let section_table = if self.omap_from_src.is_some() {
            self.sections_orig
        } else {
            self.sections
        };
        let section = section_table.get(global.segment.checked_sub(1)? as usize)?;

        let mut rva = global.offset.wrapping_add(section.virtual_address);
        if let Some(omap) = self.omap_from_src {
            rva = omap.remap(rva);
        }

        let address = self.image_base + rva as u64;
        let name = demangle(&global.name).unwrap_or_else(|| global.name.clone());
        let section_name = section_display_name(&section.name);

        Some(RenderedGlobal {
            address,
            symtype: global.symtype,
            section_name,
            name,
        })
    }

    /// Resolves and renders every global in `globals`, in order, skipping any whose section
    /// cannot be resolved.
    pub fn project_all(
        &self,
        globals: &[GlobalSymbol],
        mut demangle: impl FnMut(&str) -> Option<String>,
    ) -> Vec<RenderedGlobal> {
        globals
            .iter()
            .filter_map(|g| self.resolve(g, |n| demangle(n)))
            .collect()
    }
}

/// Renders a raw 8-byte section name as a printable string, trimming trailing NULs (spec.md §3:
/// "8-byte name").
fn section_display_name(raw: &[u8; 8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(8);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// A no-op stand-in used when a PDB has no FPO/FPO-new/XDATA/PDATA/token-RID-map stream to parse
/// into: spec.md's component table (C5) names FPO/FPO-new among the DBI-dependent parsers, but
/// this crate's external surface (§6) never exposes their contents, so they are retained only as
/// raw byte spans.
pub type RawDependentStream = Vec<u8>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omap_is_monotone_and_identity_when_empty() {
        let omap = Omap::empty();
        assert_eq!(omap.remap(0x1234), 0x1234);

        let data = {
            let mut d = Vec::new();
            for (s, t) in [(0x1000u32, 0x5000u32), (0x2000, 0), (0x3000, 0x8000)] {
                d.extend_from_slice(&s.to_le_bytes());
                d.extend_from_slice(&t.to_le_bytes());
            }
            d
        };
        let omap = Omap::parse(&data);
        assert_eq!(omap.remap(0x1010), 0x5010);
        assert_eq!(omap.remap(0x2010), 0); // deleted range
        assert_eq!(omap.remap(0x3500), 0x8500);
        assert_eq!(omap.remap(0x500), 0); // before the first entry

        let mut prev = 0;
        let mut last_out = 0;
        for q in (0..0x4000u32).step_by(97) {
            let out = omap.remap(q);
            if out != 0 {
                assert!(out >= last_out || prev == 0);
                last_out = out;
            }
            prev = q;
        }
    }

    #[test]
    fn global_without_omap_resolves_rva() {
        let sections = vec![SectionHeader {
            name: *b".text\0\0\0",
            virtual_address: 0x1000,
        }];
        let projector = GlobalSymbolProjector::new(0x400000, &sections, &sections, None);
        let global = GlobalSymbol {
            name: "foo".into(),
            segment: 1,
            offset: 0x10,
            symtype: 2,
        };
        let rendered = projector.resolve(&global, |n| Some(n.to_string())).unwrap();
        assert_eq!(rendered.address, 0x401010);
        assert_eq!(rendered.to_human_line(), "0x00401010  2  .text  foo");
    }

    #[test]
    fn global_with_omap_remaps_through_original_sections() {
        let sections_orig = vec![SectionHeader {
            name: *b".text\0\0\0",
            virtual_address: 0x1000,
        }];
        let sections_cur = vec![SectionHeader {
            name: *b".text\0\0\0",
            virtual_address: 0x1000,
        }];
        let data = {
            let mut d = Vec::new();
            d.extend_from_slice(&0x1010u32.to_le_bytes());
            d.extend_from_slice(&0x5010u32.to_le_bytes());
            d
        };
        let omap = Omap::parse(&data);
        let projector =
            GlobalSymbolProjector::new(0x400000, &sections_cur, &sections_orig, Some(&omap));
        let global = GlobalSymbol {
            name: "foo".into(),
            segment: 1,
            offset: 0x10,
            symtype: 2,
        };
        let rendered = projector.resolve(&global, |n| Some(n.to_string())).unwrap();
        assert_eq!(rendered.address, 0x405010);
    }
}
