//! Array-shape algebra: emptiness, splitting, element lookup, appends and
//! keyed writes, and iteration typing.
//!
//! Operations here take whole lattice values: the array-like part is
//! analyzed and any other bits ride along unchanged (their effect shows up
//! only in the may-throw flags). Domain-infeasible combinations collapse to
//! `Bottom`; they are results, never errors.

use crate::bits::{loosen_array_staticness_bits, loosen_emptiness_bits, ArrKind, Trep};
use crate::data::{Data, KeyStaticness, MapElem, MapElems, MapKey};
use crate::loosen::loosen_string_staticness;
use crate::ops::{intersection_of, union_of};
use crate::scalar::ConstKey;
use crate::types::{
    ival, map_arr_res, map_key_type, mapn_arr, packed_arr, packedn_arr, sval, sval_counted,
    sval_nonstatic, top_key_for, top_val_for, val_as_data, Type,
};
use strata_common::Atom;

// ── Emptiness ──────────────────────────────────────────────────────────

/// Whether a value is statically known falsy, known truthy, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emptiness {
    Empty,
    NonEmpty,
    Maybe,
}

const FALSY_BITS: Trep = Trep::NULL
    .union(Trep::FALSE)
    .union(Trep::ARR_LIKE_E);
const TRUTHY_BITS: Trep = Trep::TRUE
    .union(Trep::ARR_LIKE_N)
    .union(Trep::OBJ)
    .union(Trep::CLS)
    .union(Trep::FUNC)
    .union(Trep::CLS_METH)
    .union(Trep::LAZY_CLS)
    .union(Trep::RECORD)
    .union(Trep::RES);

pub fn emptiness(t: &Type) -> Emptiness {
    let mut falsy = t.bits.could_be(FALSY_BITS);
    let mut truthy = t.bits.could_be(TRUTHY_BITS);
    // Objects are usually truthy but collection-like ones can be falsy; a
    // known wait handle is always truthy.
    if t.bits.could_be(Trep::OBJ) && !t.is_specialized_wait_handle() {
        falsy = true;
    }
    for (kind, is_falsy) in [
        (Trep::INT, matches!(t.data, Some(Data::Int(i)) if i == 0)),
        (Trep::DBL, matches!(t.data, Some(Data::Dbl(d)) if d == 0.0)),
        (
            Trep::STR,
            matches!(t.data, Some(Data::Str(s)) if s.is_empty()),
        ),
    ] {
        if t.bits.could_be(kind) {
            let pinned = t
                .data
                .as_ref()
                .is_some_and(|d| d.support_bits().could_be(kind));
            if pinned {
                if is_falsy {
                    falsy = true;
                } else {
                    truthy = true;
                }
            } else {
                falsy = true;
                truthy = true;
            }
        }
    }
    match (falsy, truthy) {
        (true, true) => Emptiness::Maybe,
        (true, false) => Emptiness::Empty,
        (false, true) => Emptiness::NonEmpty,
        // Bottom: vacuously empty.
        (false, false) => Emptiness::Empty,
    }
}

/// Refine away everything known falsy. Scalar payloads pinning a falsy
/// value collapse their kind.
pub fn assert_nonemptiness(t: Type) -> Type {
    let mut bits = t.bits - FALSY_BITS;
    let falsy_kind = match &t.data {
        Some(Data::Int(i)) if *i == 0 => Some(Trep::INT),
        Some(Data::Dbl(d)) if *d == 0.0 => Some(Trep::DBL),
        Some(Data::Str(s)) if s.is_empty() => Some(Trep::STR),
        _ => None,
    };
    let data = match falsy_kind {
        Some(kind) => {
            bits -= kind;
            None
        }
        None => t.data,
    };
    normalize_after_bits_change(bits, data)
}

/// Refine away everything known truthy. Where a single scalar kind
/// remains, it pins to its falsy value.
pub fn assert_emptiness(t: Type) -> Type {
    let keep = FALSY_BITS | Trep::INT | Trep::DBL | Trep::STR | Trep::OBJ;
    let mut bits = t.bits & keep;
    // Truthy payloads take their kind's bits with them; array payloads die
    // with the nonempty bits; a known wait handle is never falsy.
    let truthy_kind = match &t.data {
        Some(Data::Int(i)) if *i != 0 => Some(Trep::INT),
        Some(Data::Dbl(d)) if *d != 0.0 => Some(Trep::DBL),
        Some(Data::Str(s)) if !s.is_empty() => Some(Trep::STR),
        Some(Data::Obj(o)) if o.wh.is_some() => Some(Trep::OBJ),
        _ => None,
    };
    let drop_data = truthy_kind.is_some()
        || t.data.as_ref().is_some_and(Data::is_array);
    if let Some(kind) = truthy_kind {
        bits -= kind;
    }
    let data = if drop_data { None } else { t.data };
    let mut out = normalize_after_bits_change(bits, data);
    // Pin the falsy value when exactly one refinable kind remains.
    if out.data.is_none() {
        let support = out.bits & Trep::SUPPORT;
        if !support.is_empty() {
            if support.subtype_of(Trep::INT) {
                out = Type::with_data(out.bits, Data::Int(0));
            } else if support.subtype_of(Trep::DBL) {
                out = Type::with_data(out.bits, Data::Dbl(0.0));
            } else if support.subtype_of(Trep::STR) {
                out = Type::with_data(out.bits, Data::Str(Atom::EMPTY));
            }
        }
    }
    out
}

/// Make empty array bits also possibly nonempty, preserving staticness.
pub fn add_nonemptiness(t: Type) -> Type {
    let mut bits = t.bits;
    for kind in ArrKind::ALL {
        for static_half in [Trep::S_ARR_LIKE, Trep::C_ARR_LIKE] {
            let empty_bit = kind.empty() & static_half;
            if bits.could_be(empty_bit) {
                bits |= kind.nonempty() & static_half;
            }
        }
    }
    Type { bits, data: t.data }
}

/// Drop the empty/nonempty distinction on every array family present,
/// preserving staticness. Payloads survive (they only constrain the
/// nonempty part).
pub fn loosen_emptiness(t: Type) -> Type {
    Type {
        bits: loosen_emptiness_bits(t.bits),
        data: t.data,
    }
}

fn normalize_after_bits_change(bits: Trep, data: Option<Data>) -> Type {
    match data {
        Some(d) if bits.could_be(d.support_bits()) => Type { bits, data: Some(d) },
        _ => Type::from_bits(bits),
    }
}

// ── Splitting and removal ──────────────────────────────────────────────

fn split(t: Type, mask: Trep, matches: impl Fn(&Data) -> bool) -> (Type, Type) {
    let m_bits = t.bits & mask;
    let r_bits = t.bits - mask;
    let (m_data, r_data) = match t.data {
        None => (None, None),
        Some(d) => {
            if matches(&d) {
                (Some(d), None)
            } else {
                (None, Some(d))
            }
        }
    };
    let matching = if m_bits.is_empty() {
        Type::BOTTOM
    } else {
        normalize_after_bits_change(m_bits, m_data)
    };
    let rest = if r_bits.is_empty() {
        Type::BOTTOM
    } else {
        normalize_after_bits_change(r_bits, r_data)
    };
    (matching, rest)
}

/// Partition into the object part and everything else.
pub fn split_obj(t: Type) -> (Type, Type) {
    split(t, Trep::OBJ, |d| matches!(d, Data::Obj(_)))
}

/// Partition into the class part and everything else.
pub fn split_cls(t: Type) -> (Type, Type) {
    split(t, Trep::CLS, |d| matches!(d, Data::Cls(_)))
}

/// Partition into the array-like part and everything else.
pub fn split_array_like(t: Type) -> (Type, Type) {
    split(t, Trep::ARR_LIKE, Data::is_array)
}

/// Partition into the string part and everything else.
pub fn split_string(t: Type) -> (Type, Type) {
    split(t, Trep::STR, |d| matches!(d, Data::Str(_)))
}

/// Subtract `mask`, dropping any specialization whose kind the subtraction
/// touched.
pub fn remove_bits(t: Type, mask: Trep) -> Type {
    let bits = t.bits - mask;
    let data = match t.data {
        Some(d) if (t.bits & mask).could_be(d.support_bits()) => None,
        d => d,
    };
    normalize_after_bits_change(bits, data)
}

pub fn remove_int(t: Type) -> Type {
    remove_bits(t, Trep::INT)
}

pub fn remove_double(t: Type) -> Type {
    remove_bits(t, Trep::DBL)
}

pub fn remove_string(t: Type) -> Type {
    remove_bits(t, Trep::STR)
}

pub fn remove_cls(t: Type) -> Type {
    remove_bits(t, Trep::CLS)
}

pub fn remove_obj(t: Type) -> Type {
    remove_bits(t, Trep::OBJ)
}

pub fn remove_keyset(t: Type) -> Type {
    remove_bits(t, Trep::KEYSET)
}

// ── Element lookup ─────────────────────────────────────────────────────

/// A literal array key, when the key type pins one.
enum KeyLit {
    Int(i64),
    Str(Atom),
}

fn key_literal(key: &Type) -> Option<KeyLit> {
    match &key.data {
        Some(Data::Int(i)) => Some(KeyLit::Int(*i)),
        Some(Data::Str(s)) => Some(KeyLit::Str(*s)),
        _ => None,
    }
}

/// Staticness-loosened key compatibility: a static-string key type matches
/// a counted-string key type with the same content.
fn keys_could_match(a: &Type, b: &Type) -> bool {
    loosen_string_staticness(a.clone()).could_be(&loosen_string_staticness(b.clone()))
}

/// The type of reading `key` from `container`, plus whether the read is
/// known to hit exactly one slot.
pub fn array_like_elem(container: &Type, key: &Type) -> (Type, bool) {
    debug_assert!(!key.is_bottom() && key.subtype_of_bits(Trep::ARR_KEY));
    let arr_n = container.bits & Trep::ARR_LIKE_N;
    if arr_n.is_empty() {
        return (Type::BOTTOM, false);
    }
    let (ty, exact) = match container.data.as_ref().filter(|d| d.is_array()) {
        Some(d) => {
            let (ty, exact) = elem_from_data(d, arr_n, key);
            if arr_n.subtype_of(Trep::KEYSET_N) {
                // Keyset values are their keys: reflect the key through.
                (intersection_of(ty, keyset_reflect(arr_n, key)), exact)
            } else {
                (ty, exact)
            }
        }
        None => (elem_from_bits(arr_n, key), false),
    };
    let exact = exact && !container.bits.could_be(Trep::ARR_LIKE_E);
    (ty, exact)
}

/// The value a successful keyset lookup of `key` produces: the key itself,
/// staticness-adjusted to the keyset's staticness.
fn keyset_reflect(keyset: Trep, key: &Type) -> Type {
    if keyset.subtype_of(Trep::S_ARR_LIKE) {
        intersection_of(loosen_string_staticness(key.clone()), Type::UNC_ARR_KEY)
    } else {
        loosen_string_staticness(key.clone())
    }
}

fn elem_from_bits(arr_n: Trep, key: &Type) -> Type {
    let mut out = Type::BOTTOM;
    let vecish = arr_n & Trep::VECISH_N;
    if !vecish.is_empty() && key.could_be_bits(Trep::INT) {
        let negative_only = matches!(key.data, Some(Data::Int(i)) if i < 0);
        if !negative_only {
            out = union_of(out, top_val_for(vecish));
        }
    }
    let dictish = arr_n & Trep::DICTISH_N;
    if !dictish.is_empty() {
        out = union_of(out, top_val_for(dictish));
    }
    let keyset = arr_n & Trep::KEYSET_N;
    if !keyset.is_empty() {
        let val = if keyset.subtype_of(Trep::S_ARR_LIKE) {
            intersection_of(
                loosen_string_staticness(key.clone()),
                Type::UNC_ARR_KEY,
            )
        } else {
            loosen_string_staticness(key.clone())
        };
        out = union_of(out, val);
    }
    out
}

fn elem_from_data(d: &Data, arr_n: Trep, key: &Type) -> (Type, bool) {
    match d {
        Data::ArrVal(v) => {
            let expanded = val_as_data(v);
            elem_from_data(&expanded, arr_n, key)
        }
        Data::ArrPacked(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) => {
                if i >= 0 && (i as usize) < p.elems.len() {
                    (p.elems[i as usize].clone(), true)
                } else {
                    (Type::BOTTOM, false)
                }
            }
            Some(KeyLit::Str(_)) => (Type::BOTTOM, false),
            None => {
                if key.could_be_bits(Trep::INT) {
                    (union_of_iter(p.elems.iter().cloned()), false)
                } else {
                    (Type::BOTTOM, false)
                }
            }
        },
        Data::ArrPackedN(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) if i >= 0 => ((*p.elem).clone(), false),
            Some(_) => (Type::BOTTOM, false),
            None if key.could_be_bits(Trep::INT) => ((*p.elem).clone(), false),
            None => (Type::BOTTOM, false),
        },
        Data::ArrMap(m) => match key_literal(key) {
            Some(lit) => {
                let mk = match lit {
                    KeyLit::Int(i) => MapKey::Int(i),
                    KeyLit::Str(s) => MapKey::Str(s),
                };
                if let Some(e) = m.elems.get(&mk) {
                    return (e.ty.clone(), true);
                }
                if m.has_residual() && keys_could_match(key, &m.opt_key) {
                    ((*m.opt_val).clone(), false)
                } else {
                    (Type::BOTTOM, false)
                }
            }
            None => {
                let mut out = Type::BOTTOM;
                for (k, e) in &m.elems {
                    if keys_could_match(&map_key_type(*k, e), key) {
                        out = union_of(out, e.ty.clone());
                    }
                }
                if m.has_residual() && keys_could_match(key, &m.opt_key) {
                    out = union_of(out, (*m.opt_val).clone());
                }
                (out, false)
            }
        },
        Data::ArrMapN(m) => {
            if keys_could_match(key, &m.key) {
                ((*m.val).clone(), false)
            } else {
                (Type::BOTTOM, false)
            }
        }
        _ => unreachable!("non-array payload in elem_from_data"),
    }
}

fn union_of_iter(types: impl IntoIterator<Item = Type>) -> Type {
    types.into_iter().fold(Type::BOTTOM, union_of)
}

// ── Append ─────────────────────────────────────────────────────────────

/// Result bits of mutating a group: staticness loosened, empties promoted
/// to nonempty.
fn promote_group(group: Trep) -> Trep {
    let loosened = loosen_array_staticness_bits(group);
    let mut out = Trep::empty();
    for kind in ArrKind::ALL {
        if loosened.could_be(kind.bits()) {
            out |= kind.nonempty();
        }
    }
    out
}

/// Restrict an array payload's view to one group's semantics; shared
/// payloads apply to every family their bits cover.
fn group_payload(container: &Type) -> Option<&Data> {
    container.data.as_ref().filter(|d| d.is_array())
}

/// Whether appending to a dict-shaped container with this payload could
/// throw: the next-key counter must be provably below overflow.
fn dict_append_may_throw(payload: Option<&Data>) -> bool {
    let Some(d) = payload else { return true };
    match d {
        Data::ArrVal(_) | Data::ArrPacked(_) | Data::ArrPackedN(_) => false,
        Data::ArrMap(m) => {
            let mut max_int = None::<i64>;
            for (k, _) in &m.elems {
                if let MapKey::Int(i) = k {
                    max_int = Some(max_int.map_or(*i, |m| m.max(*i)));
                }
            }
            if m.has_residual() {
                // Only a literal residual key keeps the next-key counter
                // provably bounded.
                match &m.opt_key.data {
                    Some(Data::Int(i)) => max_int = Some(max_int.map_or(*i, |m| m.max(*i))),
                    Some(Data::Str(_)) => {}
                    _ => return true,
                }
            }
            max_int == Some(i64::MAX)
        }
        Data::ArrMapN(_) => true,
        _ => unreachable!("non-array payload"),
    }
}

/// Append into a known-empty container of a vec/dict-shaped group.
fn newelem_into_empty(out_bits: Trep, v: &Type) -> Type {
    packed_arr(out_bits, vec![v.clone()])
}

/// Append into the nonempty part of a vec/dict-shaped group.
fn newelem_into_nonempty(out_bits: Trep, payload: Option<&Data>, v: &Type) -> Type {
    let Some(d) = payload else {
        return Type::from_bits(out_bits);
    };
    match d {
        Data::ArrVal(val) => newelem_into_nonempty(out_bits, Some(&val_as_data(val)), v),
        Data::ArrPacked(p) => {
            let mut elems: Vec<Type> = p.elems.iter().cloned().collect();
            elems.push(v.clone());
            packed_arr(out_bits, elems)
        }
        Data::ArrPackedN(p) => packedn_arr(out_bits, union_of((*p.elem).clone(), v.clone())),
        Data::ArrMap(m) => {
            if m.has_residual() {
                let opt_key = union_of((*m.opt_key).clone(), Type::INT);
                let opt_val = union_of((*m.opt_val).clone(), v.clone());
                map_arr_res(out_bits, m.elems.clone(), opt_key, opt_val)
            } else {
                let max_int = m
                    .elems
                    .keys()
                    .filter_map(|k| match k {
                        MapKey::Int(i) => Some(*i),
                        MapKey::Str(_) => None,
                    })
                    .max();
                let next = match max_int {
                    None => 0,
                    Some(i64::MAX) => {
                        // Appending would overflow; the array is unchanged.
                        return Type::with_data(out_bits, Data::ArrMap(m.clone()));
                    }
                    Some(i) => i + 1,
                };
                let mut elems = m.elems.clone();
                elems.insert(MapKey::Int(next), MapElem::static_key(v.clone()));
                map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
            }
        }
        Data::ArrMapN(m) => mapn_arr(
            out_bits,
            union_of((*m.key).clone(), Type::INT),
            union_of((*m.val).clone(), v.clone()),
        ),
        _ => unreachable!("non-array payload"),
    }
}

/// The key a value inserts as in a keyset, with the throw flag for
/// non-key or class-like values.
fn keyset_insert_key(v: &Type) -> (Type, bool) {
    let mut key = intersection_of(v.clone(), Type::ARR_KEY);
    let mut throws = !v.subtype_of_bits(Trep::ARR_KEY);
    if v.could_be_bits(Trep::CLS | Trep::LAZY_CLS) {
        // Class-likes weaken to their static-string name, with a notice.
        key = union_of(key, Type::SSTR);
        throws = true;
    }
    (key, throws)
}

/// Insert into a known-empty keyset.
fn keyset_into_empty(out_bits: Trep, key: &Type) -> Type {
    match key_literal(key) {
        Some(KeyLit::Int(0)) => packed_arr(out_bits, vec![ival(0)]),
        Some(KeyLit::Int(i)) => {
            let mut elems = MapElems::default();
            elems.insert(MapKey::Int(i), MapElem::static_key(ival(i)));
            map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
        }
        Some(KeyLit::Str(s)) => {
            let mut elems = MapElems::default();
            elems.insert(MapKey::Str(s), keyset_str_elem(key, s));
            map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
        }
        None => mapn_arr(out_bits, key.clone(), key.clone()),
    }
}

fn keyset_str_elem(key: &Type, s: Atom) -> MapElem {
    if key.subtype_of_bits(Trep::SSTR) {
        MapElem::static_key(sval(s))
    } else if key.subtype_of_bits(Trep::CSTR) {
        MapElem::counted_key(sval_counted(s))
    } else {
        MapElem::any_key(sval_nonstatic(s))
    }
}

/// Insert into the nonempty part of a keyset group.
fn keyset_into_nonempty(out_bits: Trep, payload: Option<&Data>, key: &Type) -> Type {
    let Some(d) = payload else {
        return Type::from_bits(out_bits);
    };
    let keys_summary = |d: &Data| -> Type {
        match d {
            Data::ArrPacked(_) | Data::ArrPackedN(_) => Type::INT,
            Data::ArrMap(m) => {
                let mut out = (*m.opt_key).clone();
                for (k, e) in &m.elems {
                    out = union_of(out, map_key_type(*k, e));
                }
                out
            }
            Data::ArrMapN(m) => (*m.key).clone(),
            _ => top_key_for(out_bits),
        }
    };
    match d {
        Data::ArrVal(val) => keyset_into_nonempty(out_bits, Some(&val_as_data(val)), key),
        Data::ArrPacked(p) => {
            let n = p.elems.len() as i64;
            match key_literal(key) {
                Some(KeyLit::Int(i)) if i >= 0 && i < n => {
                    Type::with_data(out_bits, Data::ArrPacked(p.clone()))
                }
                Some(KeyLit::Int(i)) if i == n => {
                    let mut elems: Vec<Type> = p.elems.iter().cloned().collect();
                    elems.push(ival(n));
                    packed_arr(out_bits, elems)
                }
                Some(lit) => {
                    let mut elems = MapElems::default();
                    for (i, _) in p.elems.iter().enumerate() {
                        elems.insert(MapKey::Int(i as i64), MapElem::static_key(ival(i as i64)));
                    }
                    match lit {
                        KeyLit::Int(i) => {
                            elems.insert(MapKey::Int(i), MapElem::static_key(ival(i)));
                        }
                        KeyLit::Str(s) => {
                            elems.insert(MapKey::Str(s), keyset_str_elem(key, s));
                        }
                    }
                    map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
                }
                None => {
                    let k = union_of(Type::INT, key.clone());
                    mapn_arr(out_bits, k.clone(), k)
                }
            }
        }
        Data::ArrPackedN(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) if i >= 0 => {
                packedn_arr(out_bits, union_of((*p.elem).clone(), ival(i)))
            }
            _ => {
                let k = union_of((*p.elem).clone(), key.clone());
                mapn_arr(out_bits, k.clone(), k)
            }
        },
        Data::ArrMap(m) => match key_literal(key) {
            Some(lit) => {
                let mk = match lit {
                    KeyLit::Int(i) => MapKey::Int(i),
                    KeyLit::Str(s) => MapKey::Str(s),
                };
                if let Some(e) = m.elems.get(&mk) {
                    // Present already; only the key staticness can widen.
                    let mut elems = m.elems.clone();
                    let merged = MapElem {
                        ty: union_of(e.ty.clone(), elem_value_for(&mk, key)),
                        key_static: e.key_static.union(key_staticness_of(&mk, key)),
                    };
                    elems.insert(mk, merged);
                    map_arr_res(
                        out_bits,
                        elems,
                        (*m.opt_key).clone(),
                        (*m.opt_val).clone(),
                    )
                } else if !m.has_residual() {
                    let mut elems = m.elems.clone();
                    elems.insert(mk, keyset_lit_elem(&mk, key));
                    map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
                } else if residual_is_this_literal(&m.opt_key, &mk) {
                    // The only possible extra key is the one being
                    // inserted: pin it.
                    let mut elems = m.elems.clone();
                    let key_static = key_staticness_of(&mk, key)
                        .union(residual_staticness(&m.opt_key));
                    let mut e = keyset_lit_elem(&mk, key);
                    e.key_static = key_static;
                    if let MapKey::Str(s) = mk {
                        e.ty = match key_static {
                            KeyStaticness::Static => sval(s),
                            KeyStaticness::Counted => sval_counted(s),
                            KeyStaticness::Any => sval_nonstatic(s),
                        };
                    }
                    elems.insert(mk, e);
                    map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
                } else {
                    let lit = map_key_lit_type(&mk, key);
                    let opt_key = union_of((*m.opt_key).clone(), lit.clone());
                    let opt_val = union_of((*m.opt_val).clone(), lit);
                    map_arr_res(out_bits, m.elems.clone(), opt_key, opt_val)
                }
            }
            None => {
                let opt_key = union_of((*m.opt_key).clone(), key.clone());
                let opt_val = union_of((*m.opt_val).clone(), key.clone());
                map_arr_res(out_bits, m.elems.clone(), opt_key, opt_val)
            }
        },
        Data::ArrMapN(_) => {
            let k = union_of(keys_summary(d), key.clone());
            mapn_arr(out_bits, k.clone(), k)
        }
        _ => unreachable!("non-array payload"),
    }
}

fn key_staticness_of(mk: &MapKey, key: &Type) -> KeyStaticness {
    match mk {
        MapKey::Int(_) => KeyStaticness::Static,
        MapKey::Str(_) => {
            if key.subtype_of_bits(Trep::SSTR) {
                KeyStaticness::Static
            } else if key.subtype_of_bits(Trep::CSTR) {
                KeyStaticness::Counted
            } else {
                KeyStaticness::Any
            }
        }
    }
}

fn keyset_lit_elem(mk: &MapKey, key: &Type) -> MapElem {
    match mk {
        MapKey::Int(i) => MapElem::static_key(ival(*i)),
        MapKey::Str(s) => keyset_str_elem(key, *s),
    }
}

fn elem_value_for(mk: &MapKey, key: &Type) -> Type {
    keyset_lit_elem(mk, key).ty
}

fn map_key_lit_type(mk: &MapKey, key: &Type) -> Type {
    match mk {
        MapKey::Int(i) => ival(*i),
        MapKey::Str(_) => key.clone(),
    }
}

fn residual_is_this_literal(opt_key: &Type, mk: &MapKey) -> bool {
    match (&opt_key.data, mk) {
        (Some(Data::Int(i)), MapKey::Int(j)) => i == j,
        (Some(Data::Str(s)), MapKey::Str(t)) => s == t,
        _ => false,
    }
}

fn residual_staticness(opt_key: &Type) -> KeyStaticness {
    if opt_key.subtype_of_bits(Trep::SSTR | Trep::INT) {
        KeyStaticness::Static
    } else if opt_key.subtype_of_bits(Trep::CSTR) {
        KeyStaticness::Counted
    } else {
        KeyStaticness::Any
    }
}

/// The type after appending `value`, plus whether the append can throw.
pub fn array_like_newelem(container: &Type, value: &Type) -> (Type, bool) {
    let (arr, rest) = split_array_like(container.clone());
    if arr.is_bottom() {
        return (rest, true);
    }
    let payload = group_payload(&arr);
    let mut out = rest;
    let mut throws = false;

    let kvish = arr.bits & Trep::KVISH;
    for group in [kvish & Trep::VECISH, kvish & Trep::DICTISH] {
        if group.is_empty() {
            continue;
        }
        let out_bits = promote_group(group);
        let mut part = Type::BOTTOM;
        if group.could_be(Trep::ARR_LIKE_E) {
            part = union_of(part, newelem_into_empty(out_bits, value));
        }
        if group.could_be(Trep::ARR_LIKE_N) {
            part = union_of(part, newelem_into_nonempty(out_bits, payload, value));
            if group.could_be(Trep::DICTISH) {
                throws |= dict_append_may_throw(payload);
            }
        }
        out = union_of(out, part);
    }

    let keyset = arr.bits & Trep::KEYSET;
    if !keyset.is_empty() {
        let (key, kthrow) = keyset_insert_key(value);
        throws |= kthrow;
        if !key.is_bottom() {
            let out_bits = promote_group(keyset);
            let mut part = Type::BOTTOM;
            if keyset.could_be(Trep::ARR_LIKE_E) {
                part = union_of(part, keyset_into_empty(out_bits, &key));
            }
            if keyset.could_be(Trep::ARR_LIKE_N) {
                part = union_of(part, keyset_into_nonempty(out_bits, payload, &key));
            }
            out = union_of(out, part);
        }
    }

    (out, throws)
}

// ── Keyed write ────────────────────────────────────────────────────────

/// Write into a known-empty dict-shaped container.
fn set_into_empty(out_bits: Trep, key: &Type, v: &Type) -> Type {
    match key_literal(key) {
        Some(KeyLit::Int(0)) => packed_arr(out_bits, vec![v.clone()]),
        Some(KeyLit::Int(i)) => {
            let mut elems = MapElems::default();
            elems.insert(MapKey::Int(i), MapElem::static_key(v.clone()));
            map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
        }
        Some(KeyLit::Str(s)) => {
            let mut elems = MapElems::default();
            let mut e = MapElem::static_key(v.clone());
            e.key_static = key_staticness_of(&MapKey::Str(s), key);
            elems.insert(MapKey::Str(s), e);
            map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
        }
        None => mapn_arr(out_bits, key.clone(), v.clone()),
    }
}

/// Write into the nonempty part of a dict-shaped group.
fn set_into_nonempty(out_bits: Trep, payload: Option<&Data>, key: &Type, v: &Type) -> Type {
    let Some(d) = payload else {
        return Type::from_bits(out_bits);
    };
    match d {
        Data::ArrVal(val) => set_into_nonempty(out_bits, Some(&val_as_data(val)), key, v),
        Data::ArrPacked(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) if i >= 0 && (i as usize) < p.elems.len() => {
                let mut elems: Vec<Type> = p.elems.iter().cloned().collect();
                elems[i as usize] = v.clone();
                packed_arr(out_bits, elems)
            }
            Some(KeyLit::Int(i)) if i >= 0 && i as usize == p.elems.len() => {
                let mut elems: Vec<Type> = p.elems.iter().cloned().collect();
                elems.push(v.clone());
                packed_arr(out_bits, elems)
            }
            Some(lit) => {
                // Out-of-shape literal: enumerate as a map and append.
                let mut elems = MapElems::default();
                for (i, e) in p.elems.iter().enumerate() {
                    elems.insert(MapKey::Int(i as i64), MapElem::static_key(e.clone()));
                }
                let mk = match lit {
                    KeyLit::Int(i) => MapKey::Int(i),
                    KeyLit::Str(s) => MapKey::Str(s),
                };
                let mut e = MapElem::static_key(v.clone());
                e.key_static = key_staticness_of(&mk, key);
                elems.insert(mk, e);
                map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
            }
            None => {
                let keys = p
                    .elems
                    .iter()
                    .enumerate()
                    .map(|(i, _)| ival(i as i64))
                    .fold(key.clone(), union_of);
                let vals = p.elems.iter().cloned().fold(v.clone(), union_of);
                mapn_arr(out_bits, keys, vals)
            }
        },
        Data::ArrPackedN(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) if (0..=1).contains(&i) => {
                packedn_arr(out_bits, union_of((*p.elem).clone(), v.clone()))
            }
            _ => mapn_arr(
                out_bits,
                union_of(Type::INT, key.clone()),
                union_of((*p.elem).clone(), v.clone()),
            ),
        },
        Data::ArrMap(m) => match key_literal(key) {
            Some(lit) => {
                let mk = match lit {
                    KeyLit::Int(i) => MapKey::Int(i),
                    KeyLit::Str(s) => MapKey::Str(s),
                };
                if let Some(e) = m.elems.get(&mk) {
                    // Definitely present: strong update.
                    let mut elems = m.elems.clone();
                    let key_static = e.key_static.union(key_staticness_of(&mk, key));
                    elems.insert(
                        mk,
                        MapElem {
                            ty: v.clone(),
                            key_static,
                        },
                    );
                    map_arr_res(
                        out_bits,
                        elems,
                        (*m.opt_key).clone(),
                        (*m.opt_val).clone(),
                    )
                } else if !m.has_residual() {
                    let mut elems = m.elems.clone();
                    let mut e = MapElem::static_key(v.clone());
                    e.key_static = key_staticness_of(&mk, key);
                    elems.insert(mk, e);
                    map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
                } else if residual_is_this_literal(&m.opt_key, &mk) {
                    let mut elems = m.elems.clone();
                    let key_static = key_staticness_of(&mk, key)
                        .union(residual_staticness(&m.opt_key));
                    elems.insert(
                        mk,
                        MapElem {
                            ty: v.clone(),
                            key_static,
                        },
                    );
                    map_arr_res(out_bits, elems, Type::BOTTOM, Type::BOTTOM)
                } else {
                    let lit = map_key_lit_type(&mk, key);
                    let opt_key = union_of((*m.opt_key).clone(), lit);
                    let opt_val = union_of((*m.opt_val).clone(), v.clone());
                    map_arr_res(out_bits, m.elems.clone(), opt_key, opt_val)
                }
            }
            None => {
                // Any matching entry may be overwritten.
                let mut elems = MapElems::default();
                for (k, e) in &m.elems {
                    let matches = keys_could_match(&map_key_type(*k, e), key);
                    let ty = if matches {
                        union_of(e.ty.clone(), v.clone())
                    } else {
                        e.ty.clone()
                    };
                    elems.insert(
                        *k,
                        MapElem {
                            ty,
                            key_static: e.key_static,
                        },
                    );
                }
                let opt_key = union_of((*m.opt_key).clone(), key.clone());
                let opt_val = union_of((*m.opt_val).clone(), v.clone());
                map_arr_res(out_bits, elems, opt_key, opt_val)
            }
        },
        Data::ArrMapN(m) => mapn_arr(
            out_bits,
            union_of((*m.key).clone(), key.clone()),
            union_of((*m.val).clone(), v.clone()),
        ),
        _ => unreachable!("non-array payload"),
    }
}

/// The type after writing `value` at `key`, plus whether the write can
/// throw. A write that cannot succeed on any array of the container
/// (keysets, out-of-bounds vec indices) loses that part of the type.
pub fn array_like_set(container: &Type, key: &Type, value: &Type) -> (Type, bool) {
    debug_assert!(!key.is_bottom() && key.subtype_of_bits(Trep::ARR_KEY));
    let (arr, rest) = split_array_like(container.clone());
    if arr.is_bottom() {
        return (rest, true);
    }
    let payload = group_payload(&arr);
    let mut out = rest;
    let mut throws = false;

    let vecish = arr.bits & Trep::VECISH;
    if !vecish.is_empty() {
        // Writes into vec-shaped arrays succeed only on an in-bounds int
        // index of a nonempty array; everything else throws.
        if vecish.could_be(Trep::ARR_LIKE_E) {
            throws = true;
        }
        if !key.could_be_bits(Trep::INT) || !vecish.could_be(Trep::VECISH_N) {
            throws = true;
        } else {
            let out_bits = promote_group(vecish) & Trep::VECISH_N;
            let (part, part_throws) = vecish_set(out_bits, payload, key, value);
            throws |= part_throws;
            out = union_of(out, part);
        }
    }

    let dictish = arr.bits & Trep::DICTISH;
    if !dictish.is_empty() {
        let out_bits = promote_group(dictish) & Trep::DICTISH_N;
        let mut part = Type::BOTTOM;
        if dictish.could_be(Trep::ARR_LIKE_E) {
            part = union_of(part, set_into_empty(out_bits, key, value));
        }
        if dictish.could_be(Trep::ARR_LIKE_N) {
            part = union_of(part, set_into_nonempty(out_bits, payload, key, value));
        }
        out = union_of(out, part);
    }

    if arr.bits.could_be(Trep::KEYSET) {
        // Keysets admit no keyed writes at all.
        throws = true;
    }

    (out, throws)
}

fn vecish_set(out_bits: Trep, payload: Option<&Data>, key: &Type, v: &Type) -> (Type, bool) {
    let Some(d) = payload else {
        return (Type::from_bits(out_bits), true);
    };
    match d {
        Data::ArrVal(val) => vecish_set(out_bits, Some(&val_as_data(val)), key, v),
        Data::ArrPacked(p) => match key_literal(key) {
            Some(KeyLit::Int(i)) if i >= 0 && (i as usize) < p.elems.len() => {
                let mut elems: Vec<Type> = p.elems.iter().cloned().collect();
                elems[i as usize] = v.clone();
                (packed_arr(out_bits, elems), false)
            }
            Some(_) => (Type::BOTTOM, true),
            None => {
                let elems: Vec<Type> = p
                    .elems
                    .iter()
                    .map(|e| union_of(e.clone(), v.clone()))
                    .collect();
                (packed_arr(out_bits, elems), true)
            }
        },
        Data::ArrPackedN(p) => match key_literal(key) {
            Some(KeyLit::Int(0)) => (
                packedn_arr(out_bits, union_of((*p.elem).clone(), v.clone())),
                false,
            ),
            Some(KeyLit::Int(i)) if i > 0 => (
                packedn_arr(out_bits, union_of((*p.elem).clone(), v.clone())),
                true,
            ),
            Some(_) => (Type::BOTTOM, true),
            None => (
                packedn_arr(out_bits, union_of((*p.elem).clone(), v.clone())),
                true,
            ),
        },
        _ => (Type::from_bits(out_bits), true),
    }
}

// ── Iteration ──────────────────────────────────────────────────────────

/// How many iterations a loop over the value can make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterCount {
    /// Always zero.
    Empty,
    /// Zero or one.
    ZeroOrOne,
    /// Exactly one.
    Single,
    /// At least one.
    NonEmpty,
    /// Unknown.
    Any,
}

/// Key/value types and cardinality for iterating a value.
#[derive(Debug, Clone, PartialEq)]
pub struct IterTypes {
    pub key: Type,
    pub value: Type,
    pub count: IterCount,
    pub may_throw_on_init: bool,
    pub may_throw_on_next: bool,
}

pub fn iter_types(t: &Type) -> IterTypes {
    if t.bits.could_be(Trep::OBJ) {
        return IterTypes {
            key: Type::INIT_CELL,
            value: Type::INIT_CELL,
            count: IterCount::Any,
            may_throw_on_init: true,
            may_throw_on_next: true,
        };
    }
    if !t.bits.could_be(Trep::ARR_LIKE) {
        return IterTypes {
            key: Type::BOTTOM,
            value: Type::BOTTOM,
            count: IterCount::Empty,
            may_throw_on_init: true,
            may_throw_on_next: true,
        };
    }
    let other = t.bits - Trep::ARR_LIKE;
    let may_throw_on_init = !other.is_empty();
    if !other.subtype_of(Trep::NULL) {
        // Iterating a non-null non-array base gives up on precision.
        return IterTypes {
            key: Type::INIT_CELL,
            value: Type::INIT_CELL,
            count: IterCount::Any,
            may_throw_on_init: true,
            may_throw_on_next: false,
        };
    }

    let arr = t.bits.arr_like();
    let arr_n = arr & Trep::ARR_LIKE_N;
    if arr_n.is_empty() {
        return IterTypes {
            key: Type::BOTTOM,
            value: Type::BOTTOM,
            count: IterCount::Empty,
            may_throw_on_init,
            may_throw_on_next: false,
        };
    }

    let (key, value) = match t.data.as_ref().filter(|d| d.is_array()) {
        Some(d) => iter_key_value(d),
        None => {
            let mut key = Type::BOTTOM;
            let mut value = Type::BOTTOM;
            let vecish = arr_n & Trep::VECISH_N;
            if !vecish.is_empty() {
                key = union_of(key, Type::INT);
                value = union_of(value, top_val_for(vecish));
            }
            let dictish = arr_n & Trep::DICTISH_N;
            if !dictish.is_empty() {
                key = union_of(key, top_key_for(dictish));
                value = union_of(value, top_val_for(dictish));
            }
            let keyset = arr_n & Trep::KEYSET_N;
            if !keyset.is_empty() {
                let k = top_key_for(keyset);
                key = union_of(key, k.clone());
                value = union_of(value, k);
            }
            (key, value)
        }
    };

    let size_one = matches!(t.arr_size(), Some(1));
    let definitely_nonempty = arr.subtype_of(Trep::ARR_LIKE_N) && other.is_empty();
    let count = if definitely_nonempty {
        if size_one {
            IterCount::Single
        } else {
            IterCount::NonEmpty
        }
    } else if size_one {
        IterCount::ZeroOrOne
    } else {
        IterCount::Any
    };

    IterTypes {
        key,
        value,
        count,
        may_throw_on_init,
        may_throw_on_next: false,
    }
}

fn iter_key_value(d: &Data) -> (Type, Type) {
    match d {
        Data::ArrVal(v) => {
            if v.val.len() == 1 {
                let (k, val) = &v.val.entries[0];
                let key = match k {
                    ConstKey::Int(i) => ival(*i),
                    ConstKey::Str(s) => sval(*s),
                };
                (key, crate::tv::from_cell(val.clone()))
            } else {
                iter_key_value(&val_as_data(v))
            }
        }
        Data::ArrPacked(p) => {
            if p.elems.len() == 1 {
                (ival(0), p.elems[0].clone())
            } else {
                (Type::INT, union_of_iter(p.elems.iter().cloned()))
            }
        }
        Data::ArrPackedN(p) => (Type::INT, (*p.elem).clone()),
        Data::ArrMap(m) => {
            if m.elems.len() == 1 && !m.has_residual() {
                let (k, e) = m.elems.get_index(0).expect("nonempty map");
                (map_key_type(*k, e), e.ty.clone())
            } else {
                let mut key = (*m.opt_key).clone();
                let mut value = (*m.opt_val).clone();
                for (k, e) in &m.elems {
                    key = union_of(key, map_key_type(*k, e));
                    value = union_of(value, e.ty.clone());
                }
                (key, value)
            }
        }
        Data::ArrMapN(m) => ((*m.key).clone(), (*m.val).clone()),
        _ => unreachable!("non-array payload"),
    }
}

#[cfg(test)]
#[path = "../tests/arrays_tests.rs"]
mod tests;
