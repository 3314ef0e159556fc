//! The Type Projector (spec.md §4.6, C8): walks an aggregate type and renders it in one of three
//! modes.
//!
//! spec.md §9 mandates a `&TypeGraph` passed explicitly to every call here, replacing the
//! original's reliance on a process-wide "current TPI stream" (`rz_bin_pdb_stype_by_index`).
//! There is deliberately no module-level state anywhere in this file.

use crate::json::JsonSink;
use crate::simple_type::{SimpleFormat, SimpleType};
use crate::types::{anonymous_type_name, Type, TypeData, TypeGraph, TypeIndex};

/// Selects which of the three renderings [`TypeProjector`] produces (spec.md §6: `mode ∈ {'d',
/// 'j', 'r'}`).
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RenderMode {
    /// Pretty-printed pseudo-C declaration.
    Declarative,
    /// A structured JSON object via [`JsonSink`].
    Json,
    /// `pf.<name> <format> <names>`.
    PackFormat,
}

impl TryFrom<char> for RenderMode {
    type Error = ();

    fn try_from(c: char) -> Result<Self, Self::Error> {
        match c {
            'd' => Ok(Self::Declarative),
            'j' => Ok(Self::Json),
            'r' => Ok(Self::PackFormat),
            _ => Err(()),
        }
    }
}

/// Replaces characters the radare2 `pf`-format parser would choke on with `_` before emitting a
/// `pf.<name>` line (`SPEC_FULL.md` §2 "Name sanitisation", grounded on rizin's
/// `rz_str_sanitize_sdb_key`): keep alphanumeric/underscore, replace everything else.
pub fn sanitize_pf_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// One projected struct/class/union member (used by both the declarative and JSON renderings).
struct ProjectedMember {
    /// The pack-format descriptor for this member's type.
    descriptor: String,
    /// The identifier, annotated per spec.md §4.6 step 3 where applicable (`(uint)`, `(int)`, or
    /// a compound `(TypeName)field` form).
    display_name: String,
    /// A human-readable type name, used only by the declarative rendering.
    type_name: String,
    /// The byte offset of this member within its owner, if known.
    offset: Option<i64>,
}

/// The outcome of walking one aggregate's member list.
struct ProjectedMembers {
    members: Vec<ProjectedMember>,
}

/// A single field's walk outcome: either it produced a member, or `project_one_member` could not
/// project it at all (`Unparsable`/unresolved referent).
enum MemberOutcome {
    Projected(ProjectedMember),
    Failed,
}

/// Walks the field list of an aggregate, producing one [`MemberOutcome`] per byte-layout field.
/// Shared by both the strict (pack-format) and lenient (declarative/JSON) callers below.
fn project_members_raw(graph: &TypeGraph, field_list: TypeIndex) -> Vec<MemberOutcome> {
    let Some(fl_type) = graph.stype_by_index(field_list) else {
        // An aggregate with no resolvable field list (e.g. index 0, or a forward ref that slipped
        // through) projects as having no members, not as a failure.
        return Vec::new();
    };
    let Some(fields) = fl_type.data.as_field_list() else {
        return Vec::new();
    };

    let mut outcomes = Vec::new();

    for field in fields.iter() {
        use crate::types::fields::Field;

        let (member_index, name, offset): (TypeIndex, String, Option<i64>) = match field {
            // Step 1: no byte layout, silently skipped.
            Field::Method(_) | Field::OneMethod(_) => continue,
            // Not part of a struct's byte layout for this projector's purposes.
            Field::BaseClass(..) | Field::StaticMember(_) | Field::Enumerate(_) | Field::Index(_) => {
                continue
            }
            Field::Member(m) => (m.ty, m.name.to_string(), m.offset.to_i64()),
            Field::NestedType(nt) => (nt.nested_ty, nt.name.to_string(), None),
            Field::VFuncTable(ty) => (ty, "vtable".to_string(), Some(0)),
        };

        match project_one_member(graph, member_index, &name) {
            Some(mut projected) => {
                projected.offset = offset;
                outcomes.push(MemberOutcome::Projected(projected));
            }
            None => outcomes.push(MemberOutcome::Failed),
        }
    }

    outcomes
}

/// Projects every member that can be projected, dropping ones that fail (`Unparsable`/unresolved
/// referent), matching the original's `print_types_regular`/`print_types_json`: every member
/// renders unconditionally and the type itself is never abandoned.
fn project_members(graph: &TypeGraph, field_list: TypeIndex) -> ProjectedMembers {
    let members = project_members_raw(graph, field_list)
        .into_iter()
        .filter_map(|o| match o {
            MemberOutcome::Projected(m) => Some(m),
            MemberOutcome::Failed => None,
        })
        .collect();
    ProjectedMembers { members }
}

/// Projects every member, but returns `None` if any member fails to produce a descriptor
/// ("abandon the whole type — partial projection is forbidden"), matching the original's
/// `print_types_format`. Pack-format is the only mode that abandons.
fn project_members_strict(graph: &TypeGraph, field_list: TypeIndex) -> Option<ProjectedMembers> {
    let raw = project_members_raw(graph, field_list);
    if raw.iter().any(|o| matches!(o, MemberOutcome::Failed)) {
        return None;
    }
    Some(ProjectedMembers {
        members: raw
            .into_iter()
            .filter_map(|o| match o {
                MemberOutcome::Projected(m) => Some(m),
                MemberOutcome::Failed => None,
            })
            .collect(),
    })
}

/// Dispatches on the underlying type of a single member, per spec.md §4.6 step 3. Returns `None`
/// if no descriptor can be produced at all (the "Unparsable" simple-type outcome, or an
/// unresolved/unsupported underlying type); `project_members_raw`'s caller decides whether that
/// drops just this member or abandons the whole type.
fn project_one_member(graph: &TypeGraph, member_index: TypeIndex, name: &str) -> Option<ProjectedMember> {
    let member_index = graph.strip_modifiers(member_index);

    if member_index.is_simple() {
        return match SimpleType::decode(member_index).format() {
            SimpleFormat::Descriptor(d) => Some(ProjectedMember {
                descriptor: d.to_string(),
                display_name: name.to_string(),
                type_name: simple_type_display_name(member_index),
                offset: None,
            }),
            // "skip keeps width without appending a name" (spec.md §4.6 step 3).
            SimpleFormat::Skip => Some(ProjectedMember {
                descriptor: String::new(),
                display_name: String::new(),
                type_name: simple_type_display_name(member_index),
                offset: None,
            }),
            SimpleFormat::Unparsable => None,
        };
    }

    let under = graph.stype_by_index(member_index)?;
    match &under.data {
        TypeData::Pointer { size, .. } => Some(ProjectedMember {
            descriptor: format!("p{size}"),
            display_name: name.to_string(),
            type_name: "void*".to_string(),
            offset: None,
        }),
        TypeData::Struct { .. } | TypeData::Union { .. } => {
            let type_name = aggregate_display_name(under);
            Some(ProjectedMember {
                descriptor: "?".to_string(),
                display_name: format!("({type_name}){name}"),
                type_name,
                offset: None,
            })
        }
        TypeData::Bitfield { .. } => Some(ProjectedMember {
            descriptor: "B".to_string(),
            display_name: format!("{name}(uint)"),
            type_name: "unsigned int".to_string(),
            offset: None,
        }),
        TypeData::Enum { .. } => Some(ProjectedMember {
            descriptor: "E".to_string(),
            display_name: format!("{name}(int)"),
            type_name: "int".to_string(),
            offset: None,
        }),
        TypeData::Array { size, .. } => Some(ProjectedMember {
            descriptor: format!("[{size}]"),
            display_name: name.to_string(),
            type_name: "array".to_string(),
            offset: None,
        }),
        _ => None,
    }
}

fn aggregate_display_name(t: &Type) -> String {
    t.name()
        .map(|s| s.to_string())
        .unwrap_or_else(|| anonymous_type_name(t.tpi_idx))
}

fn simple_type_display_name(idx: TypeIndex) -> String {
    format!("simple_0x{:x}", idx.0)
}

/// Resolves an `LF_ENUM`'s underlying type to a printable name (spec.md §4.6: "Enum base type:
/// discovered by resolving `Enum.utype` to a simple type and returning its printable name, or the
/// string `unknown_t` when resolution fails").
fn enum_base_type_name(utype: TypeIndex) -> String {
    if !utype.is_simple() {
        return "unknown_t".to_string();
    }
    match SimpleType::decode(utype).format() {
        SimpleFormat::Descriptor(_) | SimpleFormat::Skip => simple_c_name(utype),
        SimpleFormat::Unparsable => "unknown_t".to_string(),
    }
}

/// A human-readable C type name for common simple-type kinds, used only by the declarative and
/// JSON enum-base-type rendering (the pack-format descriptor table in [`crate::simple_type`] is
/// the one that matters for byte layout).
fn simple_c_name(idx: TypeIndex) -> String {
    match idx.0 & 0xff {
        0x74 => "int",
        0x75 => "unsigned int",
        0x76 => "__int64",
        0x77 => "unsigned __int64",
        0x72 => "short",
        0x73 => "unsigned short",
        0x10 => "signed char",
        0x20 => "unsigned char",
        _ => "unknown_t",
    }
    .to_string()
}

/// Projects PDB leaf records into the three rendering modes (spec.md §4.6).
pub struct TypeProjector<'a> {
    graph: &'a TypeGraph,
}

impl<'a> TypeProjector<'a> {
    /// Constructs a projector over a given Type Graph. Unlike the original's process-wide
    /// "current TPI", this reference is passed explicitly to every call (spec.md §9).
    pub fn new(graph: &'a TypeGraph) -> Self {
        Self { graph }
    }

    /// Projects every printable, non-forward-referenced aggregate type, calling `emit` once per
    /// type. Unlike pack-format, a member that fails to produce a descriptor is simply dropped
    /// from its type's member list rather than abandoning the type, matching the original's
    /// `print_types_regular`.
    pub fn project_declarative(&self, mut emit: impl FnMut(&str)) {
        for t in self.printable_types() {
            if let Some(line) = self.render_declarative(t) {
                emit(&line);
            }
        }
    }

    /// Projects every printable, non-forward-referenced aggregate type as a JSON object via
    /// `sink`. As with [`Self::project_declarative`], a member that fails to project is dropped,
    /// not abandoning the whole type, matching the original's `print_types_json`.
    pub fn project_json(&self, sink: &mut dyn JsonSink) {
        for t in self.printable_types() {
            self.render_json(t, sink);
        }
    }

    /// Projects every printable, non-forward-referenced aggregate type as a `pf.` line.
    pub fn project_pack_format(&self, mut emit: impl FnMut(&str)) {
        for t in self.printable_types() {
            if let Some(line) = self.render_pack_format(t) {
                emit(&line);
            }
        }
    }

    fn printable_types(&self) -> impl Iterator<Item = &'a Type> {
        self.graph
            .iter()
            .filter(|t| t.is_aggregate() && !t.is_forward_ref())
    }

    /// Renders one type in pack-format (`pf.<name> <format> <names>`), or `None` if the type
    /// cannot be projected at all (no members produce a descriptor) — spec.md §4.6 step 4:
    /// "abandon the whole type".
    fn render_pack_format(&self, t: &Type) -> Option<String> {
        match &t.data {
            TypeData::Struct { field_list, .. } => {
                let projected = project_members_strict(self.graph, *field_list)?;
                self.format_pack_line(t, &projected, false)
            }
            TypeData::Union { field_list, .. } => {
                let projected = project_members_strict(self.graph, *field_list)?;
                self.format_pack_line(t, &projected, true)
            }
            TypeData::Enum { .. } => {
                // Enums have no byte-level member layout; pack-format has no use for them, so
                // this mode simply has nothing to emit for an enum (not a failure).
                None
            }
            _ => None,
        }
    }

    /// Returns `None` for an empty/all-skipped aggregate (`print_types_format` emits nothing for
    /// these rather than a bare `pf.Name  ` line).
    fn format_pack_line(&self, t: &Type, projected: &ProjectedMembers, is_union: bool) -> Option<String> {
        let name = sanitize_pf_name(t.name().unwrap_or(&anonymous_type_name(t.tpi_idx)));
        let mut format = String::new();
        let mut names = Vec::new();
        for m in &projected.members {
            format.push_str(&m.descriptor);
            if !m.display_name.is_empty() {
                names.push(m.display_name.clone());
            }
        }
        if format.is_empty() {
            return None;
        }
        if is_union {
            format.insert(0, '0');
        }
        Some(format!("pf.{} {} {}", name, format, names.join(" ")))
    }

    /// Renders one type as a pretty-printed pseudo-C declaration.
    fn render_declarative(&self, t: &Type) -> Option<String> {
        match &t.data {
            TypeData::Struct { name, field_list, .. } | TypeData::Union { name, field_list, .. } => {
                let kind = if matches!(t.data, TypeData::Union { .. }) {
                    "union"
                } else {
                    "struct"
                };
                let projected = project_members(self.graph, *field_list);
                let mut out = format!("{kind} {name} {{\n");
                for m in &projected.members {
                    if m.display_name.is_empty() {
                        continue;
                    }
                    let offset = m.offset.unwrap_or(0);
                    out.push_str(&format!(
                        "    {} {}; // offset 0x{:x}\n",
                        m.type_name, m.display_name, offset
                    ));
                }
                out.push('}');
                Some(out)
            }
            TypeData::Enum { name, utype, .. } => {
                let base = enum_base_type_name(*utype);
                Some(format!("enum {name} : {base} {{ ... }}"))
            }
            _ => None,
        }
    }

    /// Renders one type as a JSON object via `sink`.
    fn render_json(&self, t: &Type, sink: &mut dyn JsonSink) {
        match &t.data {
            TypeData::Struct { name, field_list, size, .. }
            | TypeData::Union { name, field_list, size, .. } => {
                let kind_label = if matches!(t.data, TypeData::Union { .. }) {
                    "union"
                } else {
                    "structure"
                };
                let projected = project_members(self.graph, *field_list);
                sink.open_object();
                sink.key_string("type", kind_label);
                sink.key_string("name", name);
                sink.key_number("size", *size);
                sink.open_array("members");
                for m in &projected.members {
                    if m.display_name.is_empty() {
                        continue;
                    }
                    sink.open_object();
                    sink.key_string("member_type", &m.type_name);
                    sink.key_string("member_name", &m.display_name);
                    sink.key_number("offset", m.offset.unwrap_or(0));
                    sink.end();
                }
                sink.end();
                sink.end();
            }
            TypeData::Enum { name, utype, field_list, .. } => {
                let Some(enum_type) = self.graph.stype_by_index(*field_list) else {
                    return;
                };
                let Some(fields) = enum_type.data.as_field_list() else {
                    return;
                };
                sink.open_object();
                sink.key_string("name", name);
                sink.key_string("base_type", &enum_base_type_name(*utype));
                sink.open_array("cases");
                for field in fields.iter() {
                    if let crate::types::fields::Field::Enumerate(e) = field {
                        sink.open_object();
                        sink.key_string("name", &e.name.to_string());
                        sink.key_number("value", e.value.to_i64().unwrap_or(0));
                        sink.end();
                    }
                }
                sink.end();
                sink.end();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Leaf;
    use crate::types::TypeStreamHeader;
    use zerocopy::byteorder::{LE, U16, U32};

    fn header(begin: u32, end: u32) -> TypeStreamHeader {
        TypeStreamHeader {
            version: U32::new(0),
            header_size: U32::new(56),
            type_index_begin: U32::new(begin),
            type_index_end: U32::new(end),
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
        }
    }

    fn leaf_record(leaf: Leaf, body: &[u8]) -> Vec<u8> {
        let mut record = Vec::new();
        record.extend_from_slice(&leaf.0.to_le_bytes());
        record.extend_from_slice(body);
        let mut out = Vec::new();
        out.extend_from_slice(&(record.len() as u16).to_le_bytes());
        out.extend_from_slice(&record);
        out
    }

    fn member_field(ty: u32, offset: u16, name: &str) -> Vec<u8> {
        let mut f = Vec::new();
        f.extend_from_slice(&Leaf::LF_MEMBER.0.to_le_bytes());
        f.extend_from_slice(&0u16.to_le_bytes()); // attr
        f.extend_from_slice(&ty.to_le_bytes());
        f.extend_from_slice(&offset.to_le_bytes()); // inline Number (< 0x8000)
        f.extend_from_slice(name.as_bytes());
        f.push(0);
        f
    }

    /// Builds the type graph for `struct Foo { int a; long long b; struct S s; }` and checks the
    /// pack-format round trip named in spec.md §8 ("Round-trips").
    #[test]
    fn struct_round_trips_to_pack_format() {
        // Type 0x1000: struct S (empty field list -> no members; field_list index 0 means none).
        let s_fields = leaf_record(Leaf::LF_FIELDLIST, &[]);

        let mut s_body = Vec::new();
        s_body.extend_from_slice(&0u16.to_le_bytes()); // num_elements
        s_body.extend_from_slice(&0u16.to_le_bytes()); // property
        s_body.extend_from_slice(&0x1000u32.to_le_bytes()); // field_list -> itself unused (empty)
        s_body.extend_from_slice(&0u32.to_le_bytes());
        s_body.extend_from_slice(&0u32.to_le_bytes());
        s_body.extend_from_slice(&0u16.to_le_bytes()); // length 0
        s_body.extend_from_slice(b"S\0");
        let s_struct = leaf_record(Leaf::LF_STRUCTURE, &s_body);

        // Build densely: 0x1000 = S, 0x1001 = S's field list (empty), 0x1002 = Foo's field list,
        // 0x1003 = Foo struct. Field-list type indices above must match this layout.
        let mut field_list_body = Vec::new();
        field_list_body.extend_from_slice(&member_field(0x74, 0, "a"));
        field_list_body.extend_from_slice(&member_field(0x76, 4, "b"));
        field_list_body.extend_from_slice(&member_field(0x1000, 12, "s"));
        let foo_fields = leaf_record(Leaf::LF_FIELDLIST, &field_list_body);

        let mut foo_body = Vec::new();
        foo_body.extend_from_slice(&3u16.to_le_bytes());
        foo_body.extend_from_slice(&0u16.to_le_bytes());
        foo_body.extend_from_slice(&0x1002u32.to_le_bytes()); // points at foo_fields (0x1002)
        foo_body.extend_from_slice(&0u32.to_le_bytes());
        foo_body.extend_from_slice(&0u32.to_le_bytes());
        foo_body.extend_from_slice(&20u16.to_le_bytes());
        foo_body.extend_from_slice(b"Foo\0");
        let foo_struct = leaf_record(Leaf::LF_STRUCTURE, &foo_body);

        let mut record_bytes = Vec::new();
        record_bytes.extend_from_slice(&s_struct); // 0x1000
        record_bytes.extend_from_slice(&s_fields); // 0x1001
        record_bytes.extend_from_slice(&foo_fields); // 0x1002
        record_bytes.extend_from_slice(&foo_struct); // 0x1003

        let header = header(0x1000, 0x1004);
        let graph = TypeGraph::parse(&header, &record_bytes);

        let projector = TypeProjector::new(&graph);
        let mut lines = Vec::new();
        projector.project_pack_format(|l| lines.push(l.to_string()));

        let foo_line = lines.iter().find(|l| l.starts_with("pf.Foo")).unwrap();
        assert_eq!(foo_line, "pf.Foo n4n8? a b (S)s");
    }

    #[test]
    fn union_pack_format_starts_with_zero() {
        let mut field_list_body = Vec::new();
        field_list_body.extend_from_slice(&member_field(0x74, 0, "x")); // int
        field_list_body.extend_from_slice(&member_field(0x40, 0, "y")); // float
        let fields = leaf_record(Leaf::LF_FIELDLIST, &field_list_body);

        let mut union_body = Vec::new();
        union_body.extend_from_slice(&2u16.to_le_bytes());
        union_body.extend_from_slice(&0u16.to_le_bytes());
        union_body.extend_from_slice(&0x1000u32.to_le_bytes());
        union_body.extend_from_slice(&8u16.to_le_bytes());
        union_body.extend_from_slice(b"U\0");
        let union_rec = leaf_record(Leaf::LF_UNION, &union_body);

        let mut record_bytes = Vec::new();
        record_bytes.extend_from_slice(&fields); // 0x1000
        record_bytes.extend_from_slice(&union_rec); // 0x1001

        let header = header(0x1000, 0x1002);
        let graph = TypeGraph::parse(&header, &record_bytes);
        let projector = TypeProjector::new(&graph);

        let mut lines = Vec::new();
        projector.project_pack_format(|l| lines.push(l.to_string()));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "pf.U 0n4f x y");
    }

    /// spec.md §4.5's aliased `long` kind (0x12) is `Unparsable` only if the alias table is
    /// missing; here we use the genuinely unparsable `void` kind (0x03) to exercise the
    /// abandon-vs-drop split between pack-format and the other two modes.
    #[test]
    fn unparsable_member_abandons_pack_format_but_not_declarative() {
        let mut field_list_body = Vec::new();
        field_list_body.extend_from_slice(&member_field(0x74, 0, "a")); // int, parsable
        field_list_body.extend_from_slice(&member_field(0x03, 4, "v")); // void, unparsable
        let fields = leaf_record(Leaf::LF_FIELDLIST, &field_list_body);

        let mut struct_body = Vec::new();
        struct_body.extend_from_slice(&2u16.to_le_bytes());
        struct_body.extend_from_slice(&0u16.to_le_bytes());
        struct_body.extend_from_slice(&0x1000u32.to_le_bytes());
        struct_body.extend_from_slice(&0u32.to_le_bytes());
        struct_body.extend_from_slice(&0u32.to_le_bytes());
        struct_body.extend_from_slice(&8u16.to_le_bytes());
        struct_body.extend_from_slice(b"Foo\0");
        let struct_rec = leaf_record(Leaf::LF_STRUCTURE, &struct_body);

        let mut record_bytes = Vec::new();
        record_bytes.extend_from_slice(&fields); // 0x1000
        record_bytes.extend_from_slice(&struct_rec); // 0x1001

        let header = header(0x1000, 0x1002);
        let graph = TypeGraph::parse(&header, &record_bytes);
        let projector = TypeProjector::new(&graph);

        let mut pack_lines = Vec::new();
        projector.project_pack_format(|l| pack_lines.push(l.to_string()));
        assert!(pack_lines.is_empty(), "pack-format must abandon the whole type");

        let mut decl_lines = Vec::new();
        projector.project_declarative(|l| decl_lines.push(l.to_string()));
        assert_eq!(decl_lines.len(), 1);
        assert!(decl_lines[0].contains(" a;"), "the parsable member must still render");
    }

    struct RecordingSink {
        events: Vec<String>,
    }

    impl JsonSink for RecordingSink {
        fn open_object(&mut self) {
            self.events.push("open_object".to_string());
        }
        fn open_array(&mut self, key: &str) {
            self.events.push(format!("open_array:{key}"));
        }
        fn key_string(&mut self, key: &str, value: &str) {
            self.events.push(format!("{key}={value}"));
        }
        fn key_number(&mut self, key: &str, value: i64) {
            self.events.push(format!("{key}={value}"));
        }
        fn end(&mut self) {
            self.events.push("end".to_string());
        }
    }

    #[test]
    fn json_type_key_is_the_literal_kind_not_the_struct_name() {
        let fields = leaf_record(Leaf::LF_FIELDLIST, &member_field(0x74, 0, "a"));

        let mut struct_body = Vec::new();
        struct_body.extend_from_slice(&1u16.to_le_bytes());
        struct_body.extend_from_slice(&0u16.to_le_bytes());
        struct_body.extend_from_slice(&0x1000u32.to_le_bytes());
        struct_body.extend_from_slice(&0u32.to_le_bytes());
        struct_body.extend_from_slice(&0u32.to_le_bytes());
        struct_body.extend_from_slice(&4u16.to_le_bytes());
        struct_body.extend_from_slice(b"Foo\0");
        let struct_rec = leaf_record(Leaf::LF_STRUCTURE, &struct_body);

        let mut record_bytes = Vec::new();
        record_bytes.extend_from_slice(&fields); // 0x1000
        record_bytes.extend_from_slice(&struct_rec); // 0x1001

        let header = header(0x1000, 0x1002);
        let graph = TypeGraph::parse(&header, &record_bytes);
        let projector = TypeProjector::new(&graph);

        let mut sink = RecordingSink { events: Vec::new() };
        projector.project_json(&mut sink);

        assert!(sink.events.contains(&"type=structure".to_string()));
        assert!(sink.events.contains(&"name=Foo".to_string()));
    }

    #[test]
    fn forward_ref_produces_no_output() {
        let mut body = Vec::new();
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&0x80u16.to_le_bytes()); // forward ref bit
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u32.to_le_bytes());
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(b"Fwd\0");
        let rec = leaf_record(Leaf::LF_STRUCTURE, &body);

        let header = header(0x1000, 0x1001);
        let graph = TypeGraph::parse(&header, &rec);
        let projector = TypeProjector::new(&graph);

        let mut lines = Vec::new();
        projector.project_pack_format(|l| lines.push(l.to_string()));
        projector.project_declarative(|l| lines.push(l.to_string()));
        assert!(lines.is_empty());
    }
}
