//! The lattice combinators: union, intersection, widening union.
//!
//! Payload handling follows one rule everywhere: a specialization survives a
//! combinator only when it still says something true and nonvacuous about
//! every value of the result. Unions drop a one-sided payload as soon as the
//! other side could populate the payload's kind; intersections re-project
//! surviving payloads against the narrowed bits.

use crate::bits::Trep;
use crate::data::{
    ClsTag, DArrMap, DArrMapN, DArrPacked, DArrPackedN, DArrVal, DCls, DObj, DRecord, Data,
    KeyStaticness, MapElem, MapElems, MapKey, PackedElems,
};
use crate::hierarchy::ClassRef;
use crate::types::{
    ival, map_arr_res, map_key_type, mapn_arr, packed_arr, packedn_arr, subtype_impl, val_as_data,
    Type,
};
use strata_common::limits::WIDENING_DEPTH;
use tracing::trace;

/// Smallest representable type covering both inputs.
pub fn union_of(a: Type, b: Type) -> Type {
    // The refined order short-circuits most unions and keeps the result as
    // precise as whichever side already covers the other.
    if subtype_impl(&a, &b, true) {
        return b;
    }
    if subtype_impl(&b, &a, true) {
        return a;
    }
    let bits = a.bits | b.bits;
    let data = match (a.data, b.data) {
        (None, None) => None,
        (Some(da), None) => keep_one_sided(da, b.bits),
        (None, Some(db)) => keep_one_sided(db, a.bits),
        (Some(da), Some(db)) => {
            if da.support_bits() == db.support_bits() {
                return union_data(da, db, bits);
            }
            None
        }
    };
    Type { bits, data }
}

/// Union of arbitrarily many types.
pub fn union_all<I>(types: I) -> Type
where
    I: IntoIterator<Item = Type>,
{
    types.into_iter().fold(Type::BOTTOM, union_of)
}

/// Union for fixpoint iteration: the result's nested payloads are capped
/// at the widening budget, so chains of widened types have bounded height
/// and iteration terminates.
pub fn widening_union(a: Type, b: Type) -> Type {
    widen_type(union_of(a, b), WIDENING_DEPTH)
}

/// Collapse array and wait-handle payloads nested deeper than `depth` to
/// their bit-only types. Scalar and identity payloads have no depth to
/// bound.
fn widen_type(t: Type, depth: u32) -> Type {
    let Some(data) = t.data else { return t };
    if !matches!(
        data,
        Data::Obj(DObj { wh: Some(_), .. })
            | Data::ArrPacked(_)
            | Data::ArrPackedN(_)
            | Data::ArrMap(_)
            | Data::ArrMapN(_)
    ) {
        return Type {
            bits: t.bits,
            data: Some(data),
        };
    }
    if depth == 0 {
        trace!("widening union hit its depth budget; collapsing payload");
        return match data {
            Data::Obj(mut o) => {
                o.wh = None;
                Type::with_data(t.bits, Data::Obj(o))
            }
            _ => Type::from_bits(t.bits),
        };
    }
    let data = match data {
        Data::Obj(mut o) => {
            o.wh = o.wh.map(|inner| Box::new(widen_type(*inner, depth - 1)));
            Data::Obj(o)
        }
        Data::ArrPacked(mut p) => {
            for e in p.elems.iter_mut() {
                *e = widen_type(e.clone(), depth - 1);
            }
            Data::ArrPacked(p)
        }
        Data::ArrPackedN(mut p) => {
            *p.elem = widen_type(*p.elem, depth - 1);
            Data::ArrPackedN(p)
        }
        Data::ArrMap(mut m) => {
            let elems = std::mem::take(&mut m.elems);
            m.elems = elems
                .into_iter()
                .map(|(k, e)| {
                    (
                        k,
                        MapElem {
                            ty: widen_type(e.ty, depth - 1),
                            key_static: e.key_static,
                        },
                    )
                })
                .collect();
            *m.opt_key = widen_type(std::mem::replace(&mut *m.opt_key, Type::BOTTOM), depth - 1);
            *m.opt_val = widen_type(std::mem::replace(&mut *m.opt_val, Type::BOTTOM), depth - 1);
            Data::ArrMap(m)
        }
        Data::ArrMapN(mut m) => {
            *m.key = widen_type(std::mem::replace(&mut *m.key, Type::BOTTOM), depth - 1);
            *m.val = widen_type(std::mem::replace(&mut *m.val, Type::BOTTOM), depth - 1);
            Data::ArrMapN(m)
        }
        d => d,
    };
    Type {
        bits: t.bits,
        data: Some(data),
    }
}

/// A one-sided payload survives a union only when the unspecialized side
/// cannot populate any payload-supporting kind.
fn keep_one_sided(data: Data, other_bits: Trep) -> Option<Data> {
    if other_bits.could_be(Trep::SUPPORT) {
        None
    } else {
        Some(data)
    }
}

fn union_data(da: Data, db: Data, bits: Trep) -> Type {
    match (da, db) {
        (Data::Int(x), Data::Int(y)) if x == y => Type::with_data(bits, Data::Int(x)),
        (Data::Dbl(x), Data::Dbl(y)) if x.to_bits() == y.to_bits() => {
            Type::with_data(bits, Data::Dbl(x))
        }
        (Data::Str(x), Data::Str(y)) if x == y => Type::with_data(bits, Data::Str(x)),
        (Data::Obj(x), Data::Obj(y)) => union_obj(x, y, bits),
        (Data::Cls(x), Data::Cls(y)) => {
            match union_clsish(x.tag, &x.cls, y.tag, &y.cls) {
                Some((tag, cls)) => Type::with_data(
                    bits,
                    Data::Cls(DCls {
                        tag,
                        cls,
                        is_ctx: x.is_ctx && y.is_ctx,
                    }),
                ),
                None => Type::from_bits(bits),
            }
        }
        (Data::Record(x), Data::Record(y)) => match union_record(&x, &y) {
            Some(d) => Type::with_data(bits, Data::Record(d)),
            None => Type::from_bits(bits),
        },
        (da, db) if da.is_array() && db.is_array() => union_arr(da, db, bits),
        _ => Type::from_bits(bits),
    }
}

fn drec_subtype_shape(a: &DRecord, b: &DRecord) -> bool {
    match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.rec.same(&b.rec),
        (ClsTag::Exact, ClsTag::Sub) | (ClsTag::Sub, ClsTag::Sub) => a.rec.subtype_of(&b.rec),
        (ClsTag::Sub, ClsTag::Exact) => false,
    }
}

fn union_record(x: &DRecord, y: &DRecord) -> Option<DRecord> {
    if drec_subtype_shape(x, y) {
        return Some(y.clone());
    }
    if drec_subtype_shape(y, x) {
        return Some(x.clone());
    }
    x.rec.common_ancestor(&y.rec).map(|anc| {
        let tag = if anc.is_final() {
            ClsTag::Exact
        } else {
            ClsTag::Sub
        };
        DRecord { tag, rec: anc }
    })
}

/// Shared class/object identity union: subtype short-circuits, then the
/// nearest common ancestor's sub shape, else unspecialized.
fn union_clsish(
    ta: ClsTag,
    ca: &ClassRef,
    tb: ClsTag,
    cb: &ClassRef,
) -> Option<(ClsTag, ClassRef)> {
    let shape_le = |t1: ClsTag, c1: &ClassRef, t2: ClsTag, c2: &ClassRef| match (t1, t2) {
        (ClsTag::Exact, ClsTag::Exact) => c1.same(c2),
        (ClsTag::Exact, ClsTag::Sub) | (ClsTag::Sub, ClsTag::Sub) => c1.subtype_of(c2),
        (ClsTag::Sub, ClsTag::Exact) => false,
    };
    if shape_le(ta, ca, tb, cb) {
        return Some((tb, cb.clone()));
    }
    if shape_le(tb, cb, ta, ca) {
        return Some((ta, ca.clone()));
    }
    ca.common_ancestor(cb).map(|anc| {
        let tag = if anc.no_override() {
            ClsTag::Exact
        } else {
            ClsTag::Sub
        };
        (tag, anc)
    })
}

fn union_obj(a: DObj, b: DObj, bits: Trep) -> Type {
    let is_ctx = a.is_ctx && b.is_ctx;
    if let (Some(ia), Some(ib)) = (&a.wh, &b.wh) {
        // Wait handles union elementwise; a top inner no longer narrows
        // anything, so the specialization degrades to the plain class.
        let inner = union_of((**ia).clone(), (**ib).clone());
        let wh = if inner.strict_subtype_of(&Type::INIT_CELL) {
            Some(Box::new(inner))
        } else {
            None
        };
        return Type::with_data(
            bits,
            Data::Obj(DObj {
                tag: ClsTag::Sub,
                cls: a.cls,
                is_ctx,
                wh,
            }),
        );
    }
    match union_clsish(a.tag, &a.cls, b.tag, &b.cls) {
        Some((tag, cls)) => Type::with_data(
            bits,
            Data::Obj(DObj {
                tag,
                cls,
                is_ctx,
                wh: None,
            }),
        ),
        None => Type::from_bits(bits),
    }
}

/// Key/value summary of an array payload, for degrading into a MapN.
fn mapn_view(d: &Data) -> (Type, Type) {
    match d {
        Data::ArrPacked(p) => {
            let key = if p.elems.len() == 1 { ival(0) } else { Type::INT };
            let val = p
                .elems
                .iter()
                .cloned()
                .reduce(union_of)
                .expect("packed payloads are nonempty");
            (key, val)
        }
        Data::ArrPackedN(p) => (Type::INT, (*p.elem).clone()),
        Data::ArrMap(m) => {
            let mut key = (*m.opt_key).clone();
            let mut val = (*m.opt_val).clone();
            for (k, e) in &m.elems {
                key = union_of(key, map_key_type(*k, e));
                val = union_of(val, e.ty.clone());
            }
            (key, val)
        }
        Data::ArrMapN(m) => ((*m.key).clone(), (*m.val).clone()),
        Data::ArrVal(v) => mapn_view(&val_as_data(v)),
        _ => unreachable!("non-array payload in mapn_view"),
    }
}

fn union_arr(da: Data, db: Data, bits: Trep) -> Type {
    use Data::*;
    let mark = da
        .mark()
        .expect("array payload")
        .union(db.mark().expect("array payload"));
    let mut out = match (da, db) {
        (ArrVal(va), ArrVal(vb)) if va.val == vb.val => {
            Type::with_data(bits, ArrVal(DArrVal { val: va.val, mark }))
        }
        (ArrVal(va), other) => return union_arr(val_as_data(&va), other, bits),
        (other, ArrVal(vb)) => return union_arr(other, val_as_data(&vb), bits),

        (ArrPacked(pa), ArrPacked(pb)) => {
            if pa.elems.len() == pb.elems.len() {
                let elems = pa
                    .elems
                    .into_iter()
                    .zip(pb.elems)
                    .map(|(x, y)| union_of(x, y))
                    .collect();
                packed_arr(bits, elems)
            } else {
                let elem = pa
                    .elems
                    .into_iter()
                    .chain(pb.elems)
                    .reduce(union_of)
                    .expect("packed payloads are nonempty");
                packedn_arr(bits, elem)
            }
        }
        (ArrPacked(pa), ArrPackedN(pb)) | (ArrPackedN(pb), ArrPacked(pa)) => {
            let elem = pa
                .elems
                .into_iter()
                .fold(*pb.elem, union_of);
            packedn_arr(bits, elem)
        }
        (ArrPackedN(pa), ArrPackedN(pb)) => {
            packedn_arr(bits, union_of(*pa.elem, *pb.elem))
        }

        (ArrMap(ma), ArrMap(mb)) => union_map_map(ma, mb, bits),

        (a, b) => {
            let (ka, va) = mapn_view(&a);
            let (kb, vb) = mapn_view(&b);
            mapn_arr(bits, union_of(ka, kb), union_of(va, vb))
        }
    };
    if let Some(d) = out.data.as_mut() {
        d.set_mark(mark);
    }
    out
}

/// Positional prefix union of two enumerated maps. The matched prefix keeps
/// per-key unions; everything after the first key mismatch migrates into the
/// residual; an empty prefix degrades the pair to a homogeneous map.
fn union_map_map(ma: DArrMap, mb: DArrMap, bits: Trep) -> Type {
    let mut prefix = MapElems::default();
    let mut i = 0;
    while let (Some((ka, ea)), Some((kb, eb))) = (ma.elems.get_index(i), mb.elems.get_index(i)) {
        if ka != kb {
            break;
        }
        prefix.insert(
            *ka,
            MapElem {
                ty: union_of(ea.ty.clone(), eb.ty.clone()),
                key_static: ea.key_static.union(eb.key_static),
            },
        );
        i += 1;
    }
    let full_match = i == ma.elems.len() && i == mb.elems.len();

    let mut res_key = union_of((*ma.opt_key).clone(), (*mb.opt_key).clone());
    let mut res_val = union_of((*ma.opt_val).clone(), (*mb.opt_val).clone());
    for m in [&ma, &mb] {
        for (k, e) in m.elems.iter().skip(i) {
            res_key = union_of(res_key, map_key_type(*k, e));
            res_val = union_of(res_val, e.ty.clone());
        }
    }
    debug_assert!(full_match || !res_key.is_bottom());

    if prefix.is_empty() {
        return mapn_arr(bits, res_key, res_val);
    }
    map_arr_res(bits, prefix, res_key, res_val)
}

// ── Intersection ───────────────────────────────────────────────────────

/// Outcome of intersecting two same-kind payloads.
enum Isect {
    /// A narrowed payload.
    Data(Data),
    /// The kind stays possible but no single identity describes it.
    Unspecialized,
    /// No value satisfies both payloads; the kind's bits go away.
    Infeasible,
}

/// Largest representable type covered by both inputs. Infeasible
/// combinations collapse to `Bottom` (or lose the infeasible kind's bits);
/// that is a result, not an error.
pub fn intersection_of(a: Type, b: Type) -> Type {
    if subtype_impl(&a, &b, true) {
        return a;
    }
    if subtype_impl(&b, &a, true) {
        return b;
    }
    let bits = a.bits & b.bits;
    if bits.is_empty() {
        return Type::BOTTOM;
    }
    let (bits, data) = match (a.data, b.data) {
        (None, None) => (bits, None),
        (Some(da), None) | (None, Some(da)) => project_data(bits, da),
        (Some(da), Some(db)) => {
            if da.support_bits() == db.support_bits() {
                let kind = da.support_bits();
                match intersect_data(da, db) {
                    Isect::Data(d) => project_data(bits, d),
                    Isect::Unspecialized => (bits, None),
                    Isect::Infeasible => (bits - kind, None),
                }
            } else {
                (bits, None)
            }
        }
    };
    if bits.is_empty() {
        return Type::BOTTOM;
    }
    match data {
        None => Type::from_bits(bits),
        Some(d) => renormalize(bits, d),
    }
}

/// Rebuild through the normalizing constructors so vacuous payloads drop.
fn renormalize(bits: Trep, data: Data) -> Type {
    match data {
        Data::ArrPackedN(p) => {
            let mut t = packedn_arr(bits, *p.elem);
            if let Some(d) = t.data.as_mut() {
                d.set_mark(p.mark);
            }
            t
        }
        Data::ArrMapN(m) => {
            let mut t = mapn_arr(bits, *m.key, *m.val);
            if let Some(d) = t.data.as_mut() {
                d.set_mark(m.mark);
            }
            t
        }
        d => Type::with_data(bits, d),
    }
}

/// Re-project a payload against narrowed bits. Static-only array bits force
/// uncounted leaves and static key tags; a leaf that cannot be uncounted
/// removes the array bits entirely.
fn project_data(bits: Trep, data: Data) -> (Trep, Option<Data>) {
    if !bits.could_be(data.support_bits()) {
        return (bits, None);
    }
    if !data.is_array() || !bits.arr_like().subtype_of(Trep::S_ARR_LIKE) {
        return (bits, Some(data));
    }

    let fail = (bits - Trep::ARR_LIKE_N, None);
    let project = |t: &Type, top: &Type| -> Option<Type> {
        let p = intersection_of(t.clone(), top.clone());
        if p.is_bottom() { None } else { Some(p) }
    };
    let val_top = Type::INIT_UNC;
    let key_top = Type::UNC_ARR_KEY;

    match data {
        Data::ArrVal(v) => (bits, Some(Data::ArrVal(v))),
        Data::ArrPacked(mut p) => {
            for e in p.elems.iter_mut() {
                match project(e, &val_top) {
                    Some(t) => *e = t,
                    None => return fail,
                }
            }
            (bits, Some(Data::ArrPacked(p)))
        }
        Data::ArrPackedN(mut p) => match project(&p.elem, &val_top) {
            Some(t) => {
                *p.elem = t;
                (bits, Some(Data::ArrPackedN(p)))
            }
            None => fail,
        },
        Data::ArrMapN(mut m) => match (project(&m.key, &key_top), project(&m.val, &val_top)) {
            (Some(k), Some(v)) => {
                *m.key = k;
                *m.val = v;
                (bits, Some(Data::ArrMapN(m)))
            }
            _ => fail,
        },
        Data::ArrMap(mut m) => {
            let mut elems = MapElems::default();
            for (k, e) in m.elems.iter() {
                let key_static = match e.key_static.intersect(KeyStaticness::Static) {
                    Some(s) => s,
                    None => return fail,
                };
                match project(&e.ty, &val_top) {
                    Some(ty) => {
                        elems.insert(*k, MapElem { ty, key_static });
                    }
                    None => return fail,
                }
            }
            m.elems = elems;
            if m.has_residual() {
                match (project(&m.opt_key, &key_top), project(&m.opt_val, &val_top)) {
                    (Some(k), Some(v)) => {
                        *m.opt_key = k;
                        *m.opt_val = v;
                    }
                    _ => {
                        *m.opt_key = Type::BOTTOM;
                        *m.opt_val = Type::BOTTOM;
                    }
                }
            }
            (bits, Some(Data::ArrMap(m)))
        }
        _ => unreachable!("projection only narrows array payloads"),
    }
}

fn intersect_data(da: Data, db: Data) -> Isect {
    let from_opt = |o: Option<Data>| match o {
        Some(d) => Isect::Data(d),
        None => Isect::Infeasible,
    };
    match (da, db) {
        (Data::Int(x), Data::Int(y)) => from_opt((x == y).then_some(Data::Int(x))),
        (Data::Dbl(x), Data::Dbl(y)) => {
            from_opt((x.to_bits() == y.to_bits()).then_some(Data::Dbl(x)))
        }
        (Data::Str(x), Data::Str(y)) => from_opt((x == y).then_some(Data::Str(x))),
        (Data::Obj(x), Data::Obj(y)) => intersect_obj(x, y),
        (Data::Cls(x), Data::Cls(y)) => {
            let is_ctx = x.is_ctx || y.is_ctx;
            match intersect_clsish(x.tag, x.cls, y.tag, y.cls) {
                ClsIsect::Narrowed(tag, cls) => Isect::Data(Data::Cls(DCls { tag, cls, is_ctx })),
                ClsIsect::BothInterfaces => Isect::Unspecialized,
                ClsIsect::Infeasible => Isect::Infeasible,
            }
        }
        (Data::Record(x), Data::Record(y)) => {
            if drec_subtype_shape(&x, &y) {
                Isect::Data(Data::Record(x))
            } else if drec_subtype_shape(&y, &x) {
                Isect::Data(Data::Record(y))
            } else {
                Isect::Infeasible
            }
        }
        (da, db) if da.is_array() && db.is_array() => from_opt(intersect_arr(da, db)),
        _ => Isect::Infeasible,
    }
}

enum ClsIsect {
    Narrowed(ClsTag, ClassRef),
    BothInterfaces,
    Infeasible,
}

/// Class/object identity intersection.
fn intersect_clsish(ta: ClsTag, ca: ClassRef, tb: ClsTag, cb: ClassRef) -> ClsIsect {
    match (ta, tb) {
        (ClsTag::Exact, ClsTag::Exact) => {
            if ca.same(&cb) {
                ClsIsect::Narrowed(ClsTag::Exact, ca)
            } else {
                ClsIsect::Infeasible
            }
        }
        (ClsTag::Exact, ClsTag::Sub) => {
            if ca.subtype_of(&cb) {
                ClsIsect::Narrowed(ClsTag::Exact, ca)
            } else {
                ClsIsect::Infeasible
            }
        }
        (ClsTag::Sub, ClsTag::Exact) => {
            if cb.subtype_of(&ca) {
                ClsIsect::Narrowed(ClsTag::Exact, cb)
            } else {
                ClsIsect::Infeasible
            }
        }
        (ClsTag::Sub, ClsTag::Sub) => {
            if ca.subtype_of(&cb) {
                ClsIsect::Narrowed(ClsTag::Sub, ca)
            } else if cb.subtype_of(&ca) {
                ClsIsect::Narrowed(ClsTag::Sub, cb)
            } else if cb.could_be_interface() && !ca.could_be_interface() {
                // Keep the non-interface side: interface membership does
                // not pin a layout, so the class side already bounds the
                // value set.
                ClsIsect::Narrowed(ClsTag::Sub, ca)
            } else if ca.could_be_interface() && !cb.could_be_interface() {
                ClsIsect::Narrowed(ClsTag::Sub, cb)
            } else if ca.could_be_interface() && cb.could_be_interface() {
                ClsIsect::BothInterfaces
            } else {
                ClsIsect::Infeasible
            }
        }
    }
}

fn intersect_obj(a: DObj, b: DObj) -> Isect {
    let is_ctx = a.is_ctx || b.is_ctx;
    let wh = match (a.wh, b.wh) {
        (Some(ia), Some(ib)) => {
            let inner = intersection_of(*ia, *ib);
            if inner.is_bottom() {
                return Isect::Infeasible;
            }
            Some(Box::new(inner))
        }
        (Some(ia), None) => Some(ia),
        (None, Some(ib)) => Some(ib),
        (None, None) => None,
    };
    match intersect_clsish(a.tag, a.cls, b.tag, b.cls) {
        ClsIsect::Narrowed(tag, cls) => Isect::Data(Data::Obj(DObj {
            tag,
            cls,
            is_ctx,
            wh,
        })),
        ClsIsect::BothInterfaces => Isect::Unspecialized,
        ClsIsect::Infeasible => Isect::Infeasible,
    }
}

fn intersect_map_map(ma: DArrMap, mb: DArrMap) -> Option<Data> {
    let mark = ma.mark.intersect(mb.mark);
    let common = ma.elems.len().min(mb.elems.len());
    let mut elems = MapElems::default();
    for i in 0..common {
        let (ka, ea) = ma.elems.get_index(i).expect("index in range");
        let (kb, eb) = mb.elems.get_index(i).expect("index in range");
        if ka != kb {
            return None;
        }
        let key_static = ea.key_static.intersect(eb.key_static)?;
        let ty = intersection_of(ea.ty.clone(), eb.ty.clone());
        if ty.is_bottom() {
            return None;
        }
        elems.insert(*ka, MapElem { ty, key_static });
    }
    let (longer, shorter) = if ma.elems.len() >= mb.elems.len() {
        (&ma, &mb)
    } else {
        (&mb, &ma)
    };
    for (k, e) in longer.elems.iter().skip(common) {
        // The longer map's definite entries must be admitted by the
        // shorter map's residual.
        let kt = intersection_of(map_key_type(*k, e), (*shorter.opt_key).clone());
        if kt.is_bottom() {
            return None;
        }
        let ty = intersection_of(e.ty.clone(), (*shorter.opt_val).clone());
        if ty.is_bottom() {
            return None;
        }
        elems.insert(
            *k,
            MapElem {
                ty,
                key_static: e.key_static,
            },
        );
    }
    let opt_key = intersection_of((*ma.opt_key).clone(), (*mb.opt_key).clone());
    let opt_val = intersection_of((*ma.opt_val).clone(), (*mb.opt_val).clone());
    let (opt_key, opt_val) = if opt_key.is_bottom() || opt_val.is_bottom() {
        (Type::BOTTOM, Type::BOTTOM)
    } else {
        (opt_key, opt_val)
    };
    Some(Data::ArrMap(DArrMap {
        elems,
        opt_key: Box::new(opt_key),
        opt_val: Box::new(opt_val),
        mark,
    }))
}

fn intersect_arr(da: Data, db: Data) -> Option<Data> {
    use Data::*;
    let mark = da
        .mark()
        .expect("array payload")
        .intersect(db.mark().expect("array payload"));
    let with_mark = |mut d: Data| {
        d.set_mark(mark);
        d
    };
    let isect = |x: &Type, y: &Type| -> Option<Type> {
        let t = intersection_of(x.clone(), y.clone());
        if t.is_bottom() { None } else { Some(t) }
    };
    match (da, db) {
        (ArrVal(va), ArrVal(vb)) => {
            (va.val == vb.val).then(|| with_mark(ArrVal(DArrVal { val: va.val, mark })))
        }
        // A literal intersects anything that admits it, and nothing else.
        (ArrVal(va), other) | (other, ArrVal(va)) => {
            if arr_subtype_shape(&val_as_data(&va), &other) {
                Some(with_mark(ArrVal(DArrVal { val: va.val, mark })))
            } else {
                None
            }
        }

        (ArrPacked(pa), ArrPacked(pb)) => {
            if pa.elems.len() != pb.elems.len() {
                return None;
            }
            let mut elems = PackedElems::new();
            for (x, y) in pa.elems.iter().zip(pb.elems.iter()) {
                elems.push(isect(x, y)?);
            }
            Some(with_mark(ArrPacked(DArrPacked { elems, mark })))
        }
        (ArrPacked(pa), ArrPackedN(pb)) | (ArrPackedN(pb), ArrPacked(pa)) => {
            let mut elems = PackedElems::new();
            for x in pa.elems.iter() {
                elems.push(isect(x, &pb.elem)?);
            }
            Some(with_mark(ArrPacked(DArrPacked { elems, mark })))
        }
        (ArrPackedN(pa), ArrPackedN(pb)) => {
            let elem = isect(&pa.elem, &pb.elem)?;
            Some(with_mark(ArrPackedN(DArrPackedN {
                elem: Box::new(elem),
                mark,
            })))
        }
        (ArrPacked(pa), ArrMapN(mb)) | (ArrMapN(mb), ArrPacked(pa)) => {
            let mut elems = PackedElems::new();
            for (i, x) in pa.elems.iter().enumerate() {
                if !subtype_impl(&ival(i as i64), &mb.key, false) {
                    return None;
                }
                elems.push(isect(x, &mb.val)?);
            }
            Some(with_mark(ArrPacked(DArrPacked { elems, mark })))
        }
        (ArrPackedN(pa), ArrMapN(mb)) | (ArrMapN(mb), ArrPackedN(pa)) => {
            if !(*mb.key).could_be(&Type::INT) {
                return None;
            }
            let elem = isect(&pa.elem, &mb.val)?;
            Some(with_mark(ArrPackedN(DArrPackedN {
                elem: Box::new(elem),
                mark,
            })))
        }
        (ArrPacked(pa), ArrMap(mb)) | (ArrMap(mb), ArrPacked(pa)) => {
            let as_map = packed_to_map(&pa);
            intersect_map_map(as_map, mb).map(|d| match d {
                ArrMap(m) if !m.has_residual() && packed_shaped(&m) => {
                    let elems = m.elems.into_iter().map(|(_, e)| e.ty).collect();
                    with_mark(ArrPacked(DArrPacked { elems, mark }))
                }
                d => with_mark(d),
            })
        }
        (ArrPackedN(pa), ArrMap(mb)) | (ArrMap(mb), ArrPackedN(pa)) => {
            // Definite entries must sit at packed positions.
            let mut elems = MapElems::default();
            for (i, (k, e)) in mb.elems.iter().enumerate() {
                if *k != MapKey::Int(i as i64) {
                    return None;
                }
                let ty = isect(&e.ty, &pa.elem)?;
                elems.insert(
                    *k,
                    MapElem {
                        ty,
                        key_static: e.key_static,
                    },
                );
            }
            let opt_key = intersection_of((*mb.opt_key).clone(), Type::INT);
            let opt_val = intersection_of((*mb.opt_val).clone(), (*pa.elem).clone());
            let (opt_key, opt_val) = if opt_key.is_bottom() || opt_val.is_bottom() {
                (Type::BOTTOM, Type::BOTTOM)
            } else {
                (opt_key, opt_val)
            };
            Some(with_mark(ArrMap(DArrMap {
                elems,
                opt_key: Box::new(opt_key),
                opt_val: Box::new(opt_val),
                mark,
            })))
        }
        (ArrMap(ma), ArrMap(mb)) => intersect_map_map(ma, mb).map(with_mark),
        (ArrMap(ma), ArrMapN(mb)) | (ArrMapN(mb), ArrMap(ma)) => {
            let mut elems = MapElems::default();
            for (k, e) in ma.elems.iter() {
                if !subtype_impl(&map_key_type(*k, e), &mb.key, false) {
                    return None;
                }
                let ty = isect(&e.ty, &mb.val)?;
                elems.insert(
                    *k,
                    MapElem {
                        ty,
                        key_static: e.key_static,
                    },
                );
            }
            let (opt_key, opt_val) = if ma.has_residual() {
                let k = intersection_of((*ma.opt_key).clone(), (*mb.key).clone());
                let v = intersection_of((*ma.opt_val).clone(), (*mb.val).clone());
                if k.is_bottom() || v.is_bottom() {
                    (Type::BOTTOM, Type::BOTTOM)
                } else {
                    (k, v)
                }
            } else {
                (Type::BOTTOM, Type::BOTTOM)
            };
            Some(with_mark(ArrMap(DArrMap {
                elems,
                opt_key: Box::new(opt_key),
                opt_val: Box::new(opt_val),
                mark,
            })))
        }
        (ArrMapN(ma), ArrMapN(mb)) => {
            let key = isect(&ma.key, &mb.key)?;
            let val = isect(&ma.val, &mb.val)?;
            Some(with_mark(ArrMapN(DArrMapN {
                key: Box::new(key),
                val: Box::new(val),
                mark,
            })))
        }
        _ => unreachable!("non-array payload in intersect_arr"),
    }
}

/// Shape-only subtype used by the literal-array intersection: marks are
/// handled by the caller.
fn arr_subtype_shape(a: &Data, b: &Data) -> bool {
    let mut a = a.clone();
    let mut b = b.clone();
    a.set_mark(crate::data::LegacyMark::Unmarked);
    b.set_mark(crate::data::LegacyMark::Unmarked);
    crate::types::arr_data_subtype_pub(&a, &b)
}

fn packed_to_map(p: &DArrPacked) -> DArrMap {
    let mut elems = MapElems::default();
    for (i, e) in p.elems.iter().enumerate() {
        elems.insert(MapKey::Int(i as i64), MapElem::static_key(e.clone()));
    }
    DArrMap {
        elems,
        opt_key: Box::new(Type::BOTTOM),
        opt_val: Box::new(Type::BOTTOM),
        mark: p.mark,
    }
}

fn packed_shaped(m: &DArrMap) -> bool {
    m.elems
        .iter()
        .enumerate()
        .all(|(i, (k, _))| *k == MapKey::Int(i as i64))
}

#[cfg(test)]
#[path = "../tests/ops_tests.rs"]
mod tests;
