//! Bridge between fully-determined types and literal constant values.
//!
//! `tv` answers "which single constant does this type denote?" — present
//! exactly when the type is scalar. The counted variants additionally admit
//! types whose only looseness is a counted string/array representation of
//! otherwise static-representable content.

use crate::bits::{ArrKind, Trep};
use crate::data::{Data, KeyStaticness, LegacyMark, MapKey};
use crate::scalar::{ArrConst, ConstKey, ConstVal};
use crate::types::{arr_val, dval, ival, sval, Type};

/// The single constant `t` denotes, when `t` pins one static-representable
/// value.
pub fn tv(t: &Type) -> Option<ConstVal> {
    tv_impl(t, false)
}

/// Like [`tv`], but also admits counted-only string/array bits whose
/// content is static-representable.
pub fn tv_counted(t: &Type) -> Option<ConstVal> {
    tv_impl(t, true)
}

/// Whether [`tv`] is present.
pub fn is_scalar(t: &Type) -> bool {
    tv(t).is_some()
}

/// Whether [`tv_counted`] is present.
pub fn is_scalar_counted(t: &Type) -> bool {
    tv_counted(t).is_some()
}

fn tv_impl(t: &Type, counted: bool) -> Option<ConstVal> {
    let bits = t.bits();
    if bits.is_empty() {
        return None;
    }

    // Kinds that never denote a single constant.
    let opaque = Trep::OBJ
        | Trep::RES
        | Trep::FUNC
        | Trep::CLS
        | Trep::CLS_METH
        | Trep::LAZY_CLS
        | Trep::RECORD;
    if bits.could_be(opaque) {
        return None;
    }

    match &t.data {
        None => {
            if bits.subtype_of(Trep::UNINIT) {
                return Some(ConstVal::Uninit);
            }
            if bits.subtype_of(Trep::INIT_NULL) {
                return Some(ConstVal::Null);
            }
            if bits.subtype_of(Trep::TRUE) {
                return Some(ConstVal::Bool(true));
            }
            if bits.subtype_of(Trep::FALSE) {
                return Some(ConstVal::Bool(false));
            }
            // A single family's empty arrays all denote the one empty
            // array of that family, unless the bits are counted-only and
            // we were not asked for the counted variant.
            for kind in ArrKind::ALL {
                if bits.subtype_of(kind.empty()) {
                    if !counted && bits.subtype_of(kind.empty() & Trep::C_ARR_LIKE) {
                        return None;
                    }
                    return Some(ConstVal::Arr(ArrConst::empty(kind)));
                }
            }
            None
        }
        Some(data) => {
            // The payload must cover all of the bits: a possible null or
            // bool or empty-array alongside it means two distinct values.
            if !bits.subtype_of(data.support_bits()) {
                return None;
            }
            match data {
                Data::Int(i) => Some(ConstVal::Int(*i)),
                Data::Dbl(d) => Some(ConstVal::Dbl(*d)),
                Data::Str(s) => {
                    if !counted && bits.subtype_of(Trep::CSTR) {
                        return None;
                    }
                    Some(ConstVal::Str(*s))
                }
                _ => arr_tv(t, data, counted),
            }
        }
    }
}

fn arr_tv(t: &Type, data: &Data, counted: bool) -> Option<ConstVal> {
    let bits = t.bits();
    // Exactly one family, nonempty only.
    let kind = ArrKind::ALL
        .into_iter()
        .find(|k| bits.arr_like().subtype_of(k.nonempty()))?;
    if !counted && bits.subtype_of(kind.nonempty() & Trep::C_ARR_LIKE) {
        return None;
    }
    // An ambiguous compat mark means two observably different arrays.
    if data.mark() == Some(LegacyMark::Unknown) {
        return None;
    }

    match data {
        Data::ArrVal(v) => Some(ConstVal::Arr(v.val.clone())),
        Data::ArrPacked(p) => {
            let mut vals = Vec::with_capacity(p.elems.len());
            for e in &p.elems {
                vals.push(tv_impl(e, counted)?);
            }
            Some(ConstVal::Arr(match kind {
                ArrKind::Vec => ArrConst::vec(vals),
                ArrKind::VArr => ArrConst::varr(vals),
                ArrKind::Dict => ArrConst::dict(index_keyed(vals)),
                ArrKind::DArr => ArrConst::darr(index_keyed(vals)),
                ArrKind::Keyset => {
                    ArrConst::keyset((0..p.elems.len() as i64).map(ConstKey::Int).collect())
                }
            }))
        }
        Data::ArrMap(m) => {
            if m.has_residual() {
                return None;
            }
            let mut entries = Vec::with_capacity(m.elems.len());
            for (k, e) in &m.elems {
                // A definitely-counted key cannot appear in the static
                // rendering of the array.
                if !counted && e.key_static == KeyStaticness::Counted {
                    return None;
                }
                let key = match k {
                    MapKey::Int(i) => ConstKey::Int(*i),
                    MapKey::Str(s) => ConstKey::Str(*s),
                };
                entries.push((key, tv_impl(&e.ty, counted)?));
            }
            match kind {
                ArrKind::Dict => Some(ConstVal::Arr(ArrConst::dict(entries))),
                ArrKind::DArr => Some(ConstVal::Arr(ArrConst::darr(entries))),
                ArrKind::Keyset => {
                    Some(ConstVal::Arr(ArrConst::keyset(
                        entries.into_iter().map(|(k, _)| k).collect(),
                    )))
                }
                _ => None,
            }
        }
        // Homogeneous shapes never pin a single array.
        _ => None,
    }
}

fn index_keyed(vals: Vec<ConstVal>) -> Vec<(ConstKey, ConstVal)> {
    vals.into_iter()
        .enumerate()
        .map(|(i, v)| (ConstKey::Int(i as i64), v))
        .collect()
}

/// The type of a literal constant. Inverse of [`tv`] up to
/// [`scalarize`]-normalization.
pub fn from_cell(v: ConstVal) -> Type {
    match v {
        ConstVal::Uninit => Type::UNINIT,
        ConstVal::Null => Type::INIT_NULL,
        ConstVal::Bool(true) => Type::TRUE,
        ConstVal::Bool(false) => Type::FALSE,
        ConstVal::Int(i) => ival(i),
        ConstVal::Dbl(d) => dval(d),
        ConstVal::Str(s) => sval(s),
        ConstVal::Arr(a) => arr_val(a),
    }
}

/// Normalize a scalar type to its static form: the type of its [`tv`].
///
/// Calling this on a non-scalar type is an internal-invariant violation.
pub fn scalarize(t: &Type) -> Type {
    match tv_counted(t) {
        Some(v) => from_cell(v),
        None => panic!("scalarize on a non-scalar type"),
    }
}

#[cfg(test)]
#[path = "../tests/tv_tests.rs"]
mod tests;
