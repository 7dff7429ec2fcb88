#![allow(dead_code)]
//! Shared fixtures: a test hierarchy and a corpus of types spanning every
//! bit combination and specialization kind.

use crate::bits::Trep;
use crate::context::wait_handle;
use crate::hierarchy::{ClassRef, Hierarchy, HierarchyBuilder, RecordRef};
use crate::testing::set_trep;
use crate::types::{
    dval, ival, map_elems, mapn_arr, obj_exact, packed_arr, packedn_arr, sub_obj, sval, Type,
};
use crate::types::{cls_exact, exact_record, map_arr, sub_cls, sub_record};
use crate::context::set_ctx;
use crate::data::{MapElem, MapKey};
use once_cell::sync::Lazy;
use strata_common::Atom;

pub fn atom(s: &str) -> Atom {
    Atom::new(s)
}

/// The class/record graph the hierarchy-sensitive tests run against:
///
/// ```text
///   Base ── A ── AA*   (implements IAA)      IBase ── IA ── IAA
///        │    └─ AB*                               └─ IB
///        └─ B ── BA ── BAA ── BAADeriver
///             └─ BB*
///   TestClass ── TestClassDeriver
/// ```
///
/// Starred classes are known override-free. A implements IA.
pub static HIER: Lazy<Hierarchy> = Lazy::new(|| {
    let mut b = HierarchyBuilder::new();
    b.add_interface("IBase", &[]).unwrap();
    b.add_interface("IA", &["IBase"]).unwrap();
    b.add_interface("IB", &["IBase"]).unwrap();
    b.add_interface("IAA", &["IA"]).unwrap();
    b.add_class("Base", None, &[], false).unwrap();
    b.add_class("A", Some("Base"), &["IA"], false).unwrap();
    b.add_class("AA", Some("A"), &["IAA"], true).unwrap();
    b.add_class("AB", Some("A"), &[], true).unwrap();
    b.add_class("B", Some("Base"), &[], false).unwrap();
    b.add_class("BA", Some("B"), &[], false).unwrap();
    b.add_class("BB", Some("B"), &[], true).unwrap();
    b.add_class("BAA", Some("BA"), &[], false).unwrap();
    b.add_class("BAADeriver", Some("BAA"), &[], false).unwrap();
    b.add_class("TestClass", None, &[], false).unwrap();
    b.add_class("TestClassDeriver", Some("TestClass"), &[], false)
        .unwrap();
    b.add_record("UniqueRecBase", None, false).unwrap();
    b.add_record("UniqueRec", Some("UniqueRecBase"), true).unwrap();
    b.add_record("UniqueRecA", Some("UniqueRecBase"), true).unwrap();
    b.build()
});

pub fn cls(name: &str) -> ClassRef {
    HIER.resolve_class(name).expect("test class resolves")
}

pub fn rec(name: &str) -> RecordRef {
    HIER.resolve_record(name).expect("test record resolves")
}

/// Every named predefined bit pattern the domain exposes, plus a few
/// ad-hoc combinations.
pub fn predefined() -> Vec<Trep> {
    let mut out = vec![
        Trep::empty(),
        Trep::UNINIT,
        Trep::INIT_NULL,
        Trep::NULL,
        Trep::FALSE,
        Trep::TRUE,
        Trep::BOOL,
        Trep::INT,
        Trep::DBL,
        Trep::NUM,
        Trep::SSTR,
        Trep::CSTR,
        Trep::STR,
        Trep::FUNC,
        Trep::OBJ,
        Trep::RES,
        Trep::CLS,
        Trep::CLS_METH,
        Trep::LAZY_CLS,
        Trep::RECORD,
        Trep::UNC_ARR_KEY,
        Trep::ARR_KEY,
        Trep::SVEC_E,
        Trep::SVEC_N,
        Trep::SVEC,
        Trep::VEC_E,
        Trep::VEC_N,
        Trep::VEC,
        Trep::SDICT_E,
        Trep::SDICT_N,
        Trep::SDICT,
        Trep::DICT_E,
        Trep::DICT_N,
        Trep::DICT,
        Trep::SVARR,
        Trep::VARR,
        Trep::SDARR,
        Trep::DARR,
        Trep::SKEYSET_E,
        Trep::SKEYSET_N,
        Trep::SKEYSET,
        Trep::KEYSET_E,
        Trep::KEYSET_N,
        Trep::KEYSET,
        Trep::S_VECISH_N,
        Trep::VECISH_E,
        Trep::VECISH_N,
        Trep::VECISH,
        Trep::S_DICTISH_N,
        Trep::DICTISH_E,
        Trep::DICTISH_N,
        Trep::DICTISH,
        Trep::S_ARR_LIKE,
        Trep::ARR_LIKE_E,
        Trep::ARR_LIKE_N,
        Trep::ARR_LIKE,
        Trep::PRIM,
        Trep::INIT_PRIM,
        Trep::INIT_UNC,
        Trep::UNC,
        Trep::INIT_CELL,
        Trep::CELL,
        Trep::INT | Trep::OBJ,
        Trep::KEYSET_N | Trep::VECISH_N,
        Trep::KEYSET_N | Trep::DICTISH_N,
    ];
    let opts: Vec<Trep> = out
        .iter()
        .filter(|b| !b.is_empty() && !b.could_be(Trep::INIT_NULL))
        .map(|b| b.opt())
        .collect();
    out.extend(opts);
    out
}

/// A corpus of types spanning the predefined patterns and every payload
/// kind placed on each compatible pattern.
pub static ALL_CASES: Lazy<Vec<Type>> = Lazy::new(|| {
    let mut out = Vec::new();
    for b in predefined() {
        out.push(Type::from_bits(b));
        add_specialized(&mut out, b);
    }
    out
});

pub fn all_cases() -> &'static [Type] {
    &ALL_CASES
}

fn supports_only(b: Trep, kind: Trep) -> bool {
    b.could_be(kind) && (b & Trep::SUPPORT).subtype_of(kind)
}

fn add_specialized(out: &mut Vec<Type>, b: Trep) {
    if supports_only(b, Trep::STR) {
        out.push(set_trep(sval(atom("A")), b));
        out.push(set_trep(sval(atom("B")), b));
    }
    if supports_only(b, Trep::INT) {
        out.push(set_trep(ival(123), b));
        out.push(set_trep(ival(456), b));
    }
    if supports_only(b, Trep::DBL) {
        out.push(set_trep(dval(3.141), b));
        out.push(set_trep(dval(2.718), b));
    }
    if supports_only(b, Trep::OBJ) {
        out.push(set_trep(wait_handle(&HIER, Type::INT), b));
        out.push(set_trep(wait_handle(&HIER, Type::STR), b));
        for name in ["A", "AA", "AB", "IBase", "IA", "IAA", "IB"] {
            out.push(set_trep(obj_exact(cls(name)), b));
            out.push(set_trep(sub_obj(cls(name)), b));
        }
        out.push(set_trep(set_ctx(obj_exact(cls("A"))), b));
        out.push(set_trep(set_ctx(sub_obj(cls("A"))), b));
        if b.subtype_of(Trep::INIT_CELL) {
            out.push(set_trep(wait_handle(&HIER, sub_obj(cls("IA"))), b));
        }
    }
    if supports_only(b, Trep::CLS) {
        for name in ["A", "AA", "AB"] {
            out.push(set_trep(cls_exact(cls(name)), b));
            out.push(set_trep(sub_cls(cls(name)), b));
        }
        out.push(set_trep(set_ctx(cls_exact(cls("A"))), b));
        out.push(set_trep(set_ctx(sub_cls(cls("A"))), b));
    }
    if supports_only(b, Trep::RECORD) {
        for name in ["UniqueRecBase", "UniqueRec", "UniqueRecA"] {
            out.push(set_trep(exact_record(rec(name)), b));
            out.push(set_trep(sub_record(rec(name)), b));
        }
    }
    if supports_only(b, Trep::ARR_LIKE_N) {
        let arr = b.arr_like();
        let static_only = arr.subtype_of(Trep::S_ARR_LIKE);
        let (leaf, leaf_key) = if static_only {
            (Type::INIT_UNC, Type::UNC_ARR_KEY)
        } else {
            (Type::INIT_CELL, Type::ARR_KEY)
        };
        let (str_leaf, int_leaf) = if static_only {
            (Type::SSTR, Type::INT)
        } else {
            (Type::STR, Type::INT)
        };
        if arr.subtype_of(Trep::KEYSET) {
            out.push(set_trep(
                packed_arr(Trep::KEYSET_N, vec![ival(0), ival(1)]),
                b,
            ));
            out.push(set_trep(packedn_arr(Trep::KEYSET_N, Type::INT), b));
            out.push(set_trep(
                mapn_arr(Trep::KEYSET_N, int_leaf.clone(), int_leaf.clone()),
                b,
            ));
            out.push(set_trep(
                map_arr(
                    Trep::KEYSET_N,
                    map_elems([(MapKey::Int(1), MapElem::static_key(ival(1)))]),
                ),
                b,
            ));
            out.push(set_trep(
                map_arr(
                    Trep::KEYSET_N,
                    map_elems([(MapKey::Str(atom("A")), MapElem::static_key(sval(atom("A"))))]),
                ),
                b,
            ));
        } else if !arr.could_be(Trep::KEYSET) {
            out.push(set_trep(
                packed_arr(Trep::DICT_N, vec![int_leaf.clone(), str_leaf.clone()]),
                b,
            ));
            out.push(set_trep(packedn_arr(Trep::DICT_N, str_leaf.clone()), b));
            out.push(set_trep(packedn_arr(Trep::DICT_N, leaf.clone()), b));
            if !arr.subtype_of(Trep::VECISH) {
                out.push(set_trep(
                    mapn_arr(Trep::DICT_N, leaf_key.clone(), str_leaf.clone()),
                    b,
                ));
                out.push(set_trep(
                    map_arr(
                        Trep::DICT_N,
                        map_elems([(
                            MapKey::Str(atom("A")),
                            MapElem::static_key(int_leaf.clone()),
                        )]),
                    ),
                    b,
                ));
            }
        } else {
            // Keyset mixed with other families: only key-shaped leaves.
            out.push(set_trep(packedn_arr(Trep::KEYSET_N, Type::INT), b));
            out.push(set_trep(
                mapn_arr(Trep::KEYSET_N, leaf_key.clone(), leaf_key.clone()),
                b,
            ));
        }
    }
}
