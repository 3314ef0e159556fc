//! Leaf kind tags for CodeView type and field records.
//!
//! Grounded on the sibling `mspdb` generation's `types/kind.rs`, which is itself the closest
//! thing to a canonical reference for these codes available in this workspace.

/// Identifies a type or field record ("leaf").
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Leaf(pub u16);

macro_rules! cv_leaf {
    ( $( $code:expr, $name:ident ; )* ) => {
        #[allow(non_upper_case_globals)]
        #[allow(missing_docs)]
        impl Leaf {
            $( pub const $name: Leaf = Leaf($code); )*
        }

        static LEAF_NAMES: &[(Leaf, &str)] = &[
            $( (Leaf($code), stringify!($name)), )*
        ];
    }
}

cv_leaf! {
    0x1001, LF_MODIFIER;
    0x1002, LF_POINTER;
    0x1008, LF_PROCEDURE;
    0x1009, LF_MFUNCTION;
    0x000a, LF_VTSHAPE;
    0x1203, LF_FIELDLIST;
    0x1205, LF_BITFIELD;
    0x1206, LF_METHODLIST;
    0x1400, LF_BCLASS;
    0x1401, LF_VBCLASS;
    0x1402, LF_IVBCLASS;
    0x1404, LF_INDEX;
    0x1409, LF_VFUNCTAB;
    0x140c, LF_VFUNCOFF;
    0x1502, LF_ENUMERATE;
    0x1503, LF_ARRAY;
    0x1504, LF_CLASS;
    0x1505, LF_STRUCTURE;
    0x1506, LF_UNION;
    0x1507, LF_ENUM;
    0x150c, LF_FRIENDFCN;
    0x150d, LF_MEMBER;
    0x150e, LF_STMEMBER;
    0x150f, LF_METHOD;
    0x1510, LF_NESTEDTYPE;
    0x1511, LF_ONEMETHOD;
    0x1512, LF_NESTEDTYPEEX;
    0x1608, LF_CLASS2;
    0x1609, LF_STRUCTURE2;
    0x160a, LF_UNION2;
    // Numeric leaves (section 4). These encode the representation that follows a `Number` value
    // wider than the inline `u16` immediate range, not standalone records.
    0x8000, LF_CHAR;
    0x8001, LF_SHORT;
    0x8002, LF_USHORT;
    0x8003, LF_LONG;
    0x8004, LF_ULONG;
    0x8005, LF_REAL32;
    0x8006, LF_REAL64;
    0x8007, LF_REAL80;
    0x8008, LF_REAL128;
    0x8009, LF_QUADWORD;
    0x800a, LF_UQUADWORD;
    0x800b, LF_REAL48;
    0x800c, LF_COMPLEX32;
    0x800d, LF_COMPLEX64;
    0x800e, LF_COMPLEX80;
    0x800f, LF_COMPLEX128;
    0x8010, LF_VARSTRING;
    0x8017, LF_OCTWORD;
    0x8018, LF_UOCTWORD;
    0x801a, LF_DATE;
    0x801b, LF_UTF8STRING;
    0x801c, LF_REAL16;
}

impl std::fmt::Debug for Leaf {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        if let Some(&(_, name)) = LEAF_NAMES.iter().find(|ii| ii.0 == *self) {
            fmt.write_str(name)
        } else {
            write!(fmt, "Leaf(0x{:04x})", self.0)
        }
    }
}

impl Leaf {
    /// `true` if this value is an immediate numeric constant (spec.md §4.4: "values < 0x8000 are
    /// inline u16").
    pub fn is_immediate_numeric(self) -> bool {
        self.0 < 0x8000
    }

    /// `true` for `LF_CLASS`/`LF_STRUCTURE`/`LF_CLASS2`/`LF_STRUCTURE2` (the `_19` extended-header
    /// variants spec.md's data model calls out: "`Class/Structure(_19 variants)`").
    pub fn is_struct_or_class(self) -> bool {
        matches!(
            self,
            Leaf::LF_CLASS | Leaf::LF_STRUCTURE | Leaf::LF_CLASS2 | Leaf::LF_STRUCTURE2
        )
    }
}
