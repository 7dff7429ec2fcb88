//! The type value: a bit pattern plus an optional specialized payload.
//!
//! `Type`s are immutable value objects. Every operation builds fresh values;
//! nothing here has identity beyond structural equality, and nothing blocks
//! or allocates shared mutable state, so values are safe to use from any
//! number of threads.
//!
//! Equality is exact representation equality with two deliberate blind
//! spots: the context flag on object/class payloads (observed only by the
//! refinement order) and nothing else. `equivalently_refined` is the
//! semantic equivalence check.

use crate::bits::Trep;
use crate::data::{
    ClsTag, DArrMap, DArrMapN, DArrPacked, DArrPackedN, DArrVal, DCls, DObj, DRecord, Data,
    KeyStaticness, LegacyMark, MapElem, MapElems, MapKey, PackedElems,
};
use crate::hierarchy::{ClassRef, RecordRef};
use crate::scalar::{ArrConst, ConstKey};
use std::sync::Arc;
use strata_common::Atom;

/// A lattice value: which runtime kinds are possible, refined by at most one
/// specialized payload.
#[derive(Clone, PartialEq, Eq)]
pub struct Type {
    pub(crate) bits: Trep,
    pub(crate) data: Option<Data>,
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.data {
            None => write!(f, "Type({:?})", self.bits),
            Some(d) => write!(f, "Type({:?}, {:?})", self.bits, d),
        }
    }
}

impl Type {
    pub const BOTTOM: Type = Type::from_bits(Trep::empty());
    pub const UNINIT: Type = Type::from_bits(Trep::UNINIT);
    pub const INIT_NULL: Type = Type::from_bits(Trep::INIT_NULL);
    pub const NULL: Type = Type::from_bits(Trep::NULL);
    pub const FALSE: Type = Type::from_bits(Trep::FALSE);
    pub const TRUE: Type = Type::from_bits(Trep::TRUE);
    pub const BOOL: Type = Type::from_bits(Trep::BOOL);
    pub const INT: Type = Type::from_bits(Trep::INT);
    pub const DBL: Type = Type::from_bits(Trep::DBL);
    pub const NUM: Type = Type::from_bits(Trep::NUM);
    pub const SSTR: Type = Type::from_bits(Trep::SSTR);
    pub const CSTR: Type = Type::from_bits(Trep::CSTR);
    pub const STR: Type = Type::from_bits(Trep::STR);
    pub const ARR_KEY: Type = Type::from_bits(Trep::ARR_KEY);
    pub const UNC_ARR_KEY: Type = Type::from_bits(Trep::UNC_ARR_KEY);
    pub const FUNC: Type = Type::from_bits(Trep::FUNC);
    pub const OBJ: Type = Type::from_bits(Trep::OBJ);
    pub const RES: Type = Type::from_bits(Trep::RES);
    pub const CLS: Type = Type::from_bits(Trep::CLS);
    pub const CLS_METH: Type = Type::from_bits(Trep::CLS_METH);
    pub const LAZY_CLS: Type = Type::from_bits(Trep::LAZY_CLS);
    pub const RECORD: Type = Type::from_bits(Trep::RECORD);
    pub const PRIM: Type = Type::from_bits(Trep::PRIM);
    pub const INIT_PRIM: Type = Type::from_bits(Trep::INIT_PRIM);
    pub const INIT_UNC: Type = Type::from_bits(Trep::INIT_UNC);
    pub const UNC: Type = Type::from_bits(Trep::UNC);
    pub const ARR_LIKE: Type = Type::from_bits(Trep::ARR_LIKE);
    pub const INIT_CELL: Type = Type::from_bits(Trep::INIT_CELL);
    pub const CELL: Type = Type::from_bits(Trep::CELL);
    pub const TOP: Type = Type::from_bits(Trep::TOP);

    /// An unspecialized type: exactly these bits, no further refinement.
    pub const fn from_bits(bits: Trep) -> Type {
        Type { bits, data: None }
    }

    pub(crate) fn with_data(bits: Trep, data: Data) -> Type {
        debug_assert!(
            bits.could_be(data.support_bits())
                && bits
                    .intersection(Trep::SUPPORT)
                    .subtype_of(data.support_bits()),
            "payload incompatible with bits: {bits:?}"
        );
        Type {
            bits,
            data: Some(data),
        }
    }

    pub fn bits(&self) -> Trep {
        self.bits
    }

    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// Exactly these bits with no payload.
    pub fn is(&self, bits: Trep) -> bool {
        self.bits == bits && self.data.is_none()
    }

    pub fn is_bottom(&self) -> bool {
        self.bits.is_empty()
    }

    // ── Bit-level queries ──────────────────────────────────────────────

    pub fn subtype_of_bits(&self, mask: Trep) -> bool {
        self.bits.subtype_of(mask)
    }

    pub fn could_be_bits(&self, mask: Trep) -> bool {
        self.bits.could_be(mask)
    }

    pub fn subtype_among(&self, sub: Trep, among: Trep) -> bool {
        self.bits.subtype_among(sub, among)
    }

    // ── Relational operators ───────────────────────────────────────────

    /// Every value of `self` is a value of `other`. Context flags are not
    /// observed; use [`Type::more_refined`] for the flag-aware order.
    pub fn subtype_of(&self, other: &Type) -> bool {
        subtype_impl(self, other, false)
    }

    /// `subtype_of` and not equal as a set.
    pub fn strict_subtype_of(&self, other: &Type) -> bool {
        self.subtype_of(other) && !other.subtype_of(self)
    }

    /// Some value is described by both types.
    pub fn could_be(&self, other: &Type) -> bool {
        could_be_impl(self, other)
    }

    /// `self` is at least as specific as `other`, counting context flags.
    pub fn more_refined(&self, other: &Type) -> bool {
        subtype_impl(self, other, true)
    }

    pub fn strictly_more_refined(&self, other: &Type) -> bool {
        self.more_refined(other) && !other.more_refined(self)
    }

    pub fn equivalently_refined(&self, other: &Type) -> bool {
        self.more_refined(other) && other.more_refined(self)
    }

    // ── Payload queries ────────────────────────────────────────────────

    pub fn is_specialized_int(&self) -> bool {
        matches!(self.data, Some(Data::Int(_)))
    }

    pub fn is_specialized_double(&self) -> bool {
        matches!(self.data, Some(Data::Dbl(_)))
    }

    pub fn is_specialized_string(&self) -> bool {
        matches!(self.data, Some(Data::Str(_)))
    }

    pub fn is_specialized_obj(&self) -> bool {
        matches!(self.data, Some(Data::Obj(_)))
    }

    pub fn is_specialized_cls(&self) -> bool {
        matches!(self.data, Some(Data::Cls(_)))
    }

    pub fn is_specialized_record(&self) -> bool {
        matches!(self.data, Some(Data::Record(_)))
    }

    pub fn is_specialized_array_like(&self) -> bool {
        self.data.as_ref().is_some_and(Data::is_array)
    }

    pub fn is_specialized_array_like_arrval(&self) -> bool {
        matches!(self.data, Some(Data::ArrVal(_)))
    }

    pub fn is_specialized_array_like_packed(&self) -> bool {
        matches!(self.data, Some(Data::ArrPacked(_)))
    }

    pub fn is_specialized_array_like_packedn(&self) -> bool {
        matches!(self.data, Some(Data::ArrPackedN(_)))
    }

    pub fn is_specialized_array_like_map(&self) -> bool {
        matches!(self.data, Some(Data::ArrMap(_)))
    }

    pub fn is_specialized_array_like_mapn(&self) -> bool {
        matches!(self.data, Some(Data::ArrMapN(_)))
    }

    pub fn is_specialized_wait_handle(&self) -> bool {
        matches!(&self.data, Some(Data::Obj(o)) if o.wh.is_some())
    }

    /// The exact int this type denotes. Fails fast on anything else.
    pub fn ival_of(&self) -> i64 {
        match self.data {
            Some(Data::Int(i)) => i,
            _ => panic!("ival_of on a non-int-specialized type"),
        }
    }

    /// The exact double this type denotes. Fails fast on anything else.
    pub fn dval_of(&self) -> f64 {
        match self.data {
            Some(Data::Dbl(d)) => d,
            _ => panic!("dval_of on a non-double-specialized type"),
        }
    }

    /// The exact string this type denotes. Fails fast on anything else.
    pub fn sval_of(&self) -> Atom {
        match self.data {
            Some(Data::Str(s)) => s,
            _ => panic!("sval_of on a non-string-specialized type"),
        }
    }

    /// The object payload. Fails fast when not object-specialized.
    pub fn dobj_of(&self) -> &DObj {
        match &self.data {
            Some(Data::Obj(o)) => o,
            _ => panic!("dobj_of on a non-object-specialized type"),
        }
    }

    /// The class payload. Fails fast when not class-specialized.
    pub fn dcls_of(&self) -> &DCls {
        match &self.data {
            Some(Data::Cls(c)) => c,
            _ => panic!("dcls_of on a non-class-specialized type"),
        }
    }

    /// The record payload. Fails fast when not record-specialized.
    pub fn drecord_of(&self) -> &DRecord {
        match &self.data {
            Some(Data::Record(r)) => r,
            _ => panic!("drecord_of on a non-record-specialized type"),
        }
    }

    /// Known element count of the array payload, when the shape pins one.
    pub fn arr_size(&self) -> Option<usize> {
        match &self.data {
            Some(Data::ArrVal(v)) => Some(v.val.len()),
            Some(Data::ArrPacked(p)) => Some(p.elems.len()),
            Some(Data::ArrMap(m)) if !m.has_residual() => Some(m.elems.len()),
            _ => None,
        }
    }
}

// ── Scalar constructors ────────────────────────────────────────────────

/// The type of exactly this int.
pub fn ival(i: i64) -> Type {
    Type::with_data(Trep::INT, Data::Int(i))
}

/// The type of exactly this double.
pub fn dval(d: f64) -> Type {
    Type::with_data(Trep::DBL, Data::Dbl(d))
}

/// The type of exactly this string in its static representation.
pub fn sval(s: Atom) -> Type {
    Type::with_data(Trep::SSTR, Data::Str(s))
}

/// The type of exactly this string, static or counted.
pub fn sval_nonstatic(s: Atom) -> Type {
    Type::with_data(Trep::STR, Data::Str(s))
}

/// The type of exactly this string in a counted representation.
pub fn sval_counted(s: Atom) -> Type {
    Type::with_data(Trep::CSTR, Data::Str(s))
}

/// The static empty string.
pub fn sempty() -> Type {
    sval(Atom::EMPTY)
}

/// The empty string, static or counted.
pub fn sempty_nonstatic() -> Type {
    sval_nonstatic(Atom::EMPTY)
}

// ── Object / class / record constructors ───────────────────────────────

/// An object of exactly this class.
pub fn obj_exact(cls: ClassRef) -> Type {
    Type::with_data(Trep::OBJ, Data::Obj(DObj::new(ClsTag::Exact, cls)))
}

/// An object of this class or any descendant. Classes known to have no
/// overriding subclass normalize to the exact shape.
pub fn sub_obj(cls: ClassRef) -> Type {
    let tag = if cls.no_override() {
        ClsTag::Exact
    } else {
        ClsTag::Sub
    };
    Type::with_data(Trep::OBJ, Data::Obj(DObj::new(tag, cls)))
}

/// Exactly this class value.
pub fn cls_exact(cls: ClassRef) -> Type {
    Type::with_data(Trep::CLS, Data::Cls(DCls::new(ClsTag::Exact, cls)))
}

/// This class or any descendant.
pub fn sub_cls(cls: ClassRef) -> Type {
    let tag = if cls.no_override() {
        ClsTag::Exact
    } else {
        ClsTag::Sub
    };
    Type::with_data(Trep::CLS, Data::Cls(DCls::new(tag, cls)))
}

/// A record of exactly this shape.
pub fn exact_record(rec: RecordRef) -> Type {
    Type::with_data(
        Trep::RECORD,
        Data::Record(DRecord {
            tag: ClsTag::Exact,
            rec,
        }),
    )
}

/// A record of this shape or any descendant. Final records normalize to
/// the exact shape.
pub fn sub_record(rec: RecordRef) -> Type {
    let tag = if rec.is_final() {
        ClsTag::Exact
    } else {
        ClsTag::Sub
    };
    Type::with_data(Trep::RECORD, Data::Record(DRecord { tag, rec }))
}

// ── Optionality ────────────────────────────────────────────────────────

/// `t` or init-null. Idempotent.
pub fn opt(t: Type) -> Type {
    Type {
        bits: t.bits.opt(),
        data: t.data,
    }
}

/// Remove init-null. Exact inverse of [`opt`]; calling it on a type that
/// cannot be null is an internal-invariant violation.
pub fn unopt(t: Type) -> Type {
    assert!(
        t.bits.could_be(Trep::INIT_NULL),
        "unopt on a definitely-non-null type"
    );
    Type {
        bits: t.bits - Trep::INIT_NULL,
        data: t.data,
    }
}

// ── Array constructors ─────────────────────────────────────────────────

/// Widest possible key type for the array part of `bits`.
pub(crate) fn top_key_for(bits: Trep) -> Type {
    let arr = bits.arr_like();
    if arr.subtype_of(Trep::VECISH) {
        return Type::INT;
    }
    if arr.subtype_of(Trep::S_ARR_LIKE) {
        Type::UNC_ARR_KEY
    } else {
        Type::ARR_KEY
    }
}

/// Widest possible value type for the array part of `bits`.
pub(crate) fn top_val_for(bits: Trep) -> Type {
    let arr = bits.arr_like();
    if arr.subtype_of(Trep::KEYSET) {
        return top_key_for(bits);
    }
    if arr.subtype_of(Trep::S_ARR_LIKE) {
        Type::INIT_UNC
    } else {
        Type::INIT_CELL
    }
}

/// An enumerated tuple payload over explicit array bits.
pub fn packed_arr(bits: Trep, elems: Vec<Type>) -> Type {
    debug_assert!(bits.could_be(Trep::ARR_LIKE_N) && !elems.is_empty());
    debug_assert!(
        !bits.arr_like().subtype_of(Trep::KEYSET)
            || elems.iter().enumerate().all(|(i, e)| *e == ival(i as i64)),
        "packed keyset elements must equal their index"
    );
    let elems: PackedElems = elems.into_iter().collect();
    Type::with_data(
        bits,
        Data::ArrPacked(DArrPacked {
            elems,
            mark: LegacyMark::Unmarked,
        }),
    )
}

/// A homogeneous sequence payload over explicit array bits. A sequence of
/// the widest value type on vec-shaped bits carries no information and
/// normalizes away.
pub fn packedn_arr(bits: Trep, elem: Type) -> Type {
    debug_assert!(bits.could_be(Trep::ARR_LIKE_N));
    let arr = bits.arr_like();
    if arr.subtype_of(Trep::VECISH) && elem == top_val_for(bits) {
        return Type::from_bits(bits);
    }
    Type::with_data(
        bits,
        Data::ArrPackedN(DArrPackedN {
            elem: Box::new(elem),
            mark: LegacyMark::Unmarked,
        }),
    )
}

/// An enumerated map payload with no residual.
pub fn map_arr(bits: Trep, elems: MapElems) -> Type {
    map_arr_res(bits, elems, Type::BOTTOM, Type::BOTTOM)
}

/// An enumerated map payload with a residual key/value type for entries not
/// individually listed. A map whose keys are exactly 0..n normalizes to the
/// packed form; keys outside the explicit list being impossible is encoded
/// as a `Bottom` residual.
pub fn map_arr_res(bits: Trep, elems: MapElems, opt_key: Type, opt_val: Type) -> Type {
    debug_assert!(bits.could_be(Trep::ARR_LIKE_N) && !elems.is_empty());
    debug_assert_eq!(opt_key.is_bottom(), opt_val.is_bottom());
    let packed_shaped = elems
        .iter()
        .enumerate()
        .all(|(i, (k, _))| *k == MapKey::Int(i as i64));
    if packed_shaped && opt_key.is_bottom() {
        let elems = elems.into_iter().map(|(_, e)| e.ty).collect();
        return packed_arr(bits, elems);
    }
    mapish_arr(bits, elems, opt_key, opt_val)
}

fn mapish_arr(bits: Trep, elems: MapElems, opt_key: Type, opt_val: Type) -> Type {
    Type::with_data(
        bits,
        Data::ArrMap(DArrMap {
            elems,
            opt_key: Box::new(opt_key),
            opt_val: Box::new(opt_val),
            mark: LegacyMark::Unmarked,
        }),
    )
}

/// A homogeneous map payload. The widest key/value pair for the bits is
/// vacuous and normalizes away; a bottom key or value means no nonempty
/// array exists at all, which callers must handle at the bits level.
pub fn mapn_arr(bits: Trep, key: Type, val: Type) -> Type {
    debug_assert!(bits.could_be(Trep::ARR_LIKE_N));
    debug_assert!(!key.is_bottom() && !val.is_bottom());
    if key == top_key_for(bits) && val == top_val_for(bits) {
        return Type::from_bits(bits);
    }
    Type::with_data(
        bits,
        Data::ArrMapN(DArrMapN {
            key: Box::new(key),
            val: Box::new(val),
            mark: LegacyMark::Unmarked,
        }),
    )
}

/// A literal array payload over explicit (static, nonempty) array bits.
pub fn val_arr(bits: Trep, val: Arc<ArrConst>) -> Type {
    debug_assert!(!val.is_empty());
    debug_assert!(bits.arr_like().subtype_of(val.kind.bits() & Trep::S_ARR_LIKE));
    Type::with_data(
        bits,
        Data::ArrVal(DArrVal {
            val,
            mark: LegacyMark::Unmarked,
        }),
    )
}

/// The type of exactly this literal array. Empty literals are the empty
/// bit of their family; nonempty ones are a static-nonempty literal payload.
pub fn arr_val(val: Arc<ArrConst>) -> Type {
    if val.is_empty() {
        return Type::from_bits(val.kind.static_empty());
    }
    val_arr(val.kind.static_nonempty(), val)
}

/// Counted-or-static nonempty vec of `elems`, position by position.
pub fn vec(elems: Vec<Type>) -> Type {
    packed_arr(Trep::VEC_N, elems)
}

/// Static nonempty vec of `elems`.
pub fn svec(elems: Vec<Type>) -> Type {
    packed_arr(Trep::SVEC_N, elems)
}

/// Nonempty vec with homogeneous element type.
pub fn vec_n(elem: Type) -> Type {
    packedn_arr(Trep::VEC_N, elem)
}

/// Static nonempty vec with homogeneous element type.
pub fn svec_n(elem: Type) -> Type {
    packedn_arr(Trep::SVEC_N, elem)
}

/// Nonempty dict with the given tuple layout.
pub fn dict_packed(elems: Vec<Type>) -> Type {
    packed_arr(Trep::DICT_N, elems)
}

/// Static nonempty dict with the given tuple layout.
pub fn sdict_packed(elems: Vec<Type>) -> Type {
    packed_arr(Trep::SDICT_N, elems)
}

/// Nonempty dict with packed layout and homogeneous element type.
pub fn dict_packedn(elem: Type) -> Type {
    packedn_arr(Trep::DICT_N, elem)
}

/// Static nonempty dict with packed layout and homogeneous element type.
pub fn sdict_packedn(elem: Type) -> Type {
    packedn_arr(Trep::SDICT_N, elem)
}

/// Nonempty dict with homogeneous key/value types.
pub fn dict_n(key: Type, val: Type) -> Type {
    mapn_arr(Trep::DICT_N, key, val)
}

/// Static nonempty dict with homogeneous key/value types.
pub fn sdict_n(key: Type, val: Type) -> Type {
    mapn_arr(Trep::SDICT_N, key, val)
}

/// Nonempty dict with enumerated entries.
pub fn dict_map(elems: MapElems) -> Type {
    map_arr(Trep::DICT_N, elems)
}

/// Nonempty dict with enumerated entries and a residual.
pub fn dict_map_res(elems: MapElems, opt_key: Type, opt_val: Type) -> Type {
    map_arr_res(Trep::DICT_N, elems, opt_key, opt_val)
}

/// Static nonempty dict with enumerated entries.
pub fn sdict_map(elems: MapElems) -> Type {
    map_arr(Trep::SDICT_N, elems)
}

/// Static nonempty dict with enumerated entries and a residual.
pub fn sdict_map_res(elems: MapElems, opt_key: Type, opt_val: Type) -> Type {
    map_arr_res(Trep::SDICT_N, elems, opt_key, opt_val)
}

/// Nonempty keyset of the given element type.
pub fn keyset_n(elem: Type) -> Type {
    mapn_arr(Trep::KEYSET_N, elem.clone(), elem)
}

/// Static nonempty keyset of the given element type.
pub fn skeyset_n(elem: Type) -> Type {
    mapn_arr(Trep::SKEYSET_N, elem.clone(), elem)
}

/// Helper for building map entry lists in insertion order.
pub fn map_elems<I>(entries: I) -> MapElems
where
    I: IntoIterator<Item = (MapKey, MapElem)>,
{
    let mut out = MapElems::default();
    for (k, e) in entries {
        let prev = out.insert(k, e);
        debug_assert!(prev.is_none(), "duplicate map key");
    }
    out
}

/// The literal type of a map entry's key.
pub(crate) fn map_key_type(key: MapKey, elem: &MapElem) -> Type {
    match key {
        MapKey::Int(i) => ival(i),
        MapKey::Str(s) => match elem.key_static {
            KeyStaticness::Static => sval(s),
            KeyStaticness::Counted => sval_counted(s),
            KeyStaticness::Any => sval_nonstatic(s),
        },
    }
}

/// Convert a literal array into its enumerated payload form: packed
/// elements for packed layouts, map entries otherwise. Leaves are exact
/// scalar types.
pub(crate) fn arr_const_elems(val: &ArrConst) -> Result<Vec<Type>, MapElems> {
    if val.is_packed() {
        Ok(val
            .entries
            .iter()
            .map(|(_, v)| crate::tv::from_cell(v.clone()))
            .collect())
    } else {
        let mut elems = MapElems::default();
        for (k, v) in &val.entries {
            let key = match k {
                ConstKey::Int(i) => MapKey::Int(*i),
                ConstKey::Str(s) => MapKey::Str(*s),
            };
            elems.insert(key, MapElem::static_key(crate::tv::from_cell(v.clone())));
        }
        Err(elems)
    }
}

// ── Subtype ────────────────────────────────────────────────────────────

fn ctx_refines(a_ctx: bool, b_ctx: bool) -> bool {
    a_ctx || !b_ctx
}

fn dobj_subtype(a: &DObj, b: &DObj, ctx: bool) -> bool {
    if ctx && !ctx_refines(a.is_ctx, b.is_ctx) {
        return false;
    }
    let cls_ok = match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.cls.same(&b.cls),
        (ClsTag::Exact, ClsTag::Sub) | (ClsTag::Sub, ClsTag::Sub) => a.cls.subtype_of(&b.cls),
        // A sub shape covers descendants the exact shape excludes, unless
        // the class is known override-free, which normalized to Exact.
        (ClsTag::Sub, ClsTag::Exact) => false,
    };
    if !cls_ok {
        return false;
    }
    match (&a.wh, &b.wh) {
        (_, None) => true,
        (Some(ia), Some(ib)) => subtype_impl(ia, ib, ctx),
        // An arbitrary awaitable is not known to wrap what b requires.
        (None, Some(_)) => false,
    }
}

fn dcls_subtype(a: &DCls, b: &DCls, ctx: bool) -> bool {
    if ctx && !ctx_refines(a.is_ctx, b.is_ctx) {
        return false;
    }
    match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.cls.same(&b.cls),
        (ClsTag::Exact, ClsTag::Sub) | (ClsTag::Sub, ClsTag::Sub) => a.cls.subtype_of(&b.cls),
        (ClsTag::Sub, ClsTag::Exact) => false,
    }
}

fn drecord_subtype(a: &DRecord, b: &DRecord) -> bool {
    match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.rec.same(&b.rec),
        (ClsTag::Exact, ClsTag::Sub) | (ClsTag::Sub, ClsTag::Sub) => a.rec.subtype_of(&b.rec),
        (ClsTag::Sub, ClsTag::Exact) => false,
    }
}

/// Positional subtype over map entry lists, shared by map-vs-map and the
/// literal-array conversions.
fn map_subtype(a: &DArrMap, b: &DArrMap, ctx: bool) -> bool {
    if a.elems.len() < b.elems.len() {
        return false;
    }
    for (i, (bk, be)) in b.elems.iter().enumerate() {
        let Some((ak, ae)) = a.elems.get_index(i) else {
            return false;
        };
        if ak != bk || !ae.key_static.subtype_of(be.key_static) {
            return false;
        }
        if !subtype_impl(&ae.ty, &be.ty, ctx) {
            return false;
        }
    }
    for (ak, ae) in a.elems.iter().skip(b.elems.len()) {
        if !subtype_impl(&map_key_type(*ak, ae), &b.opt_key, ctx)
            || !subtype_impl(&ae.ty, &b.opt_val, ctx)
        {
            return false;
        }
    }
    subtype_impl(&a.opt_key, &b.opt_key, ctx) && subtype_impl(&a.opt_val, &b.opt_val, ctx)
}

fn packed_as_map(p: &DArrPacked) -> DArrMap {
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

/// The enumerated form of a literal array payload.
pub(crate) fn val_as_data(v: &DArrVal) -> Data {
    match arr_const_elems(&v.val) {
        Ok(elems) => Data::ArrPacked(DArrPacked {
            elems: elems.into_iter().collect(),
            mark: v.mark,
        }),
        Err(elems) => Data::ArrMap(DArrMap {
            elems,
            opt_key: Box::new(Type::BOTTOM),
            opt_val: Box::new(Type::BOTTOM),
            mark: v.mark,
        }),
    }
}

fn arr_data_subtype(a: &Data, b: &Data, ctx: bool) -> bool {
    use Data::*;
    match (a, b) {
        (ArrVal(va), ArrVal(vb)) => va.val == vb.val && va.mark.subtype_of(vb.mark),
        // A literal denotes one array; expand it and compare structurally.
        (ArrVal(va), _) => arr_data_subtype(&val_as_data(va), b, ctx),
        // A shape is inside a singleton set only if it is that singleton.
        (_, ArrVal(vb)) => {
            let expanded = val_as_data(vb);
            arr_data_subtype(a, &expanded, ctx) && arr_data_subtype(&expanded, a, ctx)
        }

        (ArrPacked(pa), ArrPacked(pb)) => {
            pa.mark.subtype_of(pb.mark)
                && pa.elems.len() == pb.elems.len()
                && pa
                    .elems
                    .iter()
                    .zip(pb.elems.iter())
                    .all(|(x, y)| subtype_impl(x, y, ctx))
        }
        (ArrPacked(pa), ArrPackedN(pb)) => {
            pa.mark.subtype_of(pb.mark)
                && pa.elems.iter().all(|x| subtype_impl(x, &pb.elem, ctx))
        }
        (ArrPackedN(pa), ArrPackedN(pb)) => {
            pa.mark.subtype_of(pb.mark) && subtype_impl(&pa.elem, &pb.elem, ctx)
        }
        (ArrPackedN(_), ArrPacked(_)) => false,

        (ArrPacked(pa), ArrMap(mb)) => {
            pa.mark.subtype_of(mb.mark) && map_subtype(&packed_as_map(pa), mb, ctx)
        }
        (ArrMap(_), ArrPacked(_)) => false,
        (ArrMap(ma), ArrMap(mb)) => ma.mark.subtype_of(mb.mark) && map_subtype(ma, mb, ctx),

        (ArrPacked(pa), ArrMapN(mb)) => {
            pa.mark.subtype_of(mb.mark)
                && pa.elems.iter().enumerate().all(|(i, x)| {
                    subtype_impl(&ival(i as i64), &mb.key, ctx) && subtype_impl(x, &mb.val, ctx)
                })
        }
        (ArrPackedN(pa), ArrMapN(mb)) => {
            pa.mark.subtype_of(mb.mark)
                && subtype_impl(&Type::INT, &mb.key, ctx)
                && subtype_impl(&pa.elem, &mb.val, ctx)
        }
        (ArrMap(ma), ArrMapN(mb)) => {
            ma.mark.subtype_of(mb.mark)
                && ma.elems.iter().all(|(k, e)| {
                    subtype_impl(&map_key_type(*k, e), &mb.key, ctx)
                        && subtype_impl(&e.ty, &mb.val, ctx)
                })
                && subtype_impl(&ma.opt_key, &mb.key, ctx)
                && subtype_impl(&ma.opt_val, &mb.val, ctx)
        }
        (ArrMapN(ma), ArrMapN(mb)) => {
            ma.mark.subtype_of(mb.mark)
                && subtype_impl(&ma.key, &mb.key, ctx)
                && subtype_impl(&ma.val, &mb.val, ctx)
        }
        (ArrMapN(_), ArrMap(_)) | (ArrMapN(_), ArrPacked(_)) | (ArrMapN(_), ArrPackedN(_)) => {
            false
        }
        _ => unreachable!("non-array payload in arr_data_subtype"),
    }
}

/// Shape-level array subtype, exposed for the combinators.
pub(crate) fn arr_data_subtype_pub(a: &Data, b: &Data) -> bool {
    arr_data_subtype(a, b, false)
}

fn data_subtype(a: &Data, b: &Data, ctx: bool) -> bool {
    match (a, b) {
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Dbl(x), Data::Dbl(y)) => x.to_bits() == y.to_bits(),
        (Data::Str(x), Data::Str(y)) => x == y,
        (Data::Obj(x), Data::Obj(y)) => dobj_subtype(x, y, ctx),
        (Data::Cls(x), Data::Cls(y)) => dcls_subtype(x, y, ctx),
        (Data::Record(x), Data::Record(y)) => drecord_subtype(x, y),
        (a, b) if a.is_array() && b.is_array() => arr_data_subtype(a, b, ctx),
        // Payloads of different kinds constrain disjoint bit ranges; the
        // bits check has already ruled on those ranges.
        _ => true,
    }
}

pub(crate) fn subtype_impl(a: &Type, b: &Type, ctx: bool) -> bool {
    if !a.bits.subtype_of(b.bits) {
        return false;
    }
    let Some(db) = &b.data else { return true };
    match &a.data {
        Some(da) => data_subtype(da, db, ctx),
        // Unspecialized `a` escapes b's payload constraint only when its
        // bits avoid the payload's kind entirely.
        None => !a.bits.could_be(db.support_bits()),
    }
}

// ── Could-be ───────────────────────────────────────────────────────────

fn dobj_could_be(a: &DObj, b: &DObj) -> bool {
    let cls_ok = match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.cls.same(&b.cls),
        (ClsTag::Exact, ClsTag::Sub) => a.cls.subtype_of(&b.cls),
        (ClsTag::Sub, ClsTag::Exact) => b.cls.subtype_of(&a.cls),
        (ClsTag::Sub, ClsTag::Sub) => a.cls.could_be(&b.cls),
    };
    if !cls_ok {
        return false;
    }
    match (&a.wh, &b.wh) {
        (Some(ia), Some(ib)) => could_be_impl(ia, ib),
        _ => true,
    }
}

fn dcls_could_be(a: &DCls, b: &DCls) -> bool {
    match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.cls.same(&b.cls),
        (ClsTag::Exact, ClsTag::Sub) => a.cls.subtype_of(&b.cls),
        (ClsTag::Sub, ClsTag::Exact) => b.cls.subtype_of(&a.cls),
        (ClsTag::Sub, ClsTag::Sub) => a.cls.could_be(&b.cls),
    }
}

fn drecord_could_be(a: &DRecord, b: &DRecord) -> bool {
    match (a.tag, b.tag) {
        (ClsTag::Exact, ClsTag::Exact) => a.rec.same(&b.rec),
        (ClsTag::Exact, ClsTag::Sub) => a.rec.subtype_of(&b.rec),
        (ClsTag::Sub, ClsTag::Exact) => b.rec.subtype_of(&a.rec),
        (ClsTag::Sub, ClsTag::Sub) => a.rec.subtype_of(&b.rec) || b.rec.subtype_of(&a.rec),
    }
}

fn map_could_be(a: &DArrMap, b: &DArrMap) -> bool {
    if !a.mark.could_be(b.mark) {
        return false;
    }
    let common = a.elems.len().min(b.elems.len());
    for i in 0..common {
        let (ak, ae) = a.elems.get_index(i).expect("index in range");
        let (bk, be) = b.elems.get_index(i).expect("index in range");
        if ak != bk || !could_be_impl(&ae.ty, &be.ty) {
            return false;
        }
    }
    let (longer, shorter) = if a.elems.len() >= b.elems.len() {
        (a, b)
    } else {
        (b, a)
    };
    for (k, e) in longer.elems.iter().skip(common) {
        if !could_be_impl(&map_key_type(*k, e), &shorter.opt_key)
            || !could_be_impl(&e.ty, &shorter.opt_val)
        {
            return false;
        }
    }
    true
}

fn arr_data_could_be(a: &Data, b: &Data) -> bool {
    use Data::*;
    match (a, b) {
        (ArrVal(va), ArrVal(vb)) => va.val == vb.val && va.mark.could_be(vb.mark),
        (ArrVal(va), _) => arr_data_could_be(&val_as_data(va), b),
        (_, ArrVal(vb)) => arr_data_could_be(a, &val_as_data(vb)),

        (ArrPacked(pa), ArrPacked(pb)) => {
            pa.mark.could_be(pb.mark)
                && pa.elems.len() == pb.elems.len()
                && pa
                    .elems
                    .iter()
                    .zip(pb.elems.iter())
                    .all(|(x, y)| could_be_impl(x, y))
        }
        (ArrPacked(pa), ArrPackedN(pb)) | (ArrPackedN(pb), ArrPacked(pa)) => {
            pa.mark.could_be(pb.mark) && pa.elems.iter().all(|x| could_be_impl(x, &pb.elem))
        }
        (ArrPackedN(pa), ArrPackedN(pb)) => {
            pa.mark.could_be(pb.mark) && could_be_impl(&pa.elem, &pb.elem)
        }

        (ArrPacked(pa), ArrMap(mb)) | (ArrMap(mb), ArrPacked(pa)) => {
            map_could_be(&packed_as_map(pa), mb)
        }
        (ArrMap(ma), ArrMap(mb)) => map_could_be(ma, mb),

        (ArrPacked(pa), ArrMapN(mb)) | (ArrMapN(mb), ArrPacked(pa)) => {
            pa.mark.could_be(mb.mark)
                && pa
                    .elems
                    .iter()
                    .enumerate()
                    .all(|(i, x)| could_be_impl(&ival(i as i64), &mb.key) && could_be_impl(x, &mb.val))
        }
        (ArrPackedN(pa), ArrMapN(mb)) | (ArrMapN(mb), ArrPackedN(pa)) => {
            pa.mark.could_be(mb.mark)
                && could_be_impl(&Type::INT, &mb.key)
                && could_be_impl(&pa.elem, &mb.val)
        }
        (ArrPackedN(pa), ArrMap(mb)) | (ArrMap(mb), ArrPackedN(pa)) => {
            // Every definite entry must sit at its packed position.
            pa.mark.could_be(mb.mark)
                && mb
                    .elems
                    .iter()
                    .enumerate()
                    .all(|(i, (k, e))| *k == MapKey::Int(i as i64) && could_be_impl(&pa.elem, &e.ty))
        }
        (ArrMap(ma), ArrMapN(mb)) | (ArrMapN(mb), ArrMap(ma)) => {
            ma.mark.could_be(mb.mark)
                && ma.elems.iter().all(|(k, e)| {
                    could_be_impl(&map_key_type(*k, e), &mb.key) && could_be_impl(&e.ty, &mb.val)
                })
        }
        (ArrMapN(ma), ArrMapN(mb)) => {
            ma.mark.could_be(mb.mark)
                && could_be_impl(&ma.key, &mb.key)
                && could_be_impl(&ma.val, &mb.val)
        }
        _ => unreachable!("non-array payload in arr_data_could_be"),
    }
}

fn data_could_be(a: &Data, b: &Data) -> bool {
    match (a, b) {
        (Data::Int(x), Data::Int(y)) => x == y,
        (Data::Dbl(x), Data::Dbl(y)) => x.to_bits() == y.to_bits(),
        (Data::Str(x), Data::Str(y)) => x == y,
        (Data::Obj(x), Data::Obj(y)) => dobj_could_be(x, y),
        (Data::Cls(x), Data::Cls(y)) => dcls_could_be(x, y),
        (Data::Record(x), Data::Record(y)) => drecord_could_be(x, y),
        (a, b) if a.is_array() && b.is_array() => arr_data_could_be(a, b),
        _ => true,
    }
}

pub(crate) fn could_be_impl(a: &Type, b: &Type) -> bool {
    let isect = a.bits & b.bits;
    if isect.is_empty() {
        return false;
    }
    match (&a.data, &b.data) {
        (Some(da), Some(db)) if da.support_bits() == db.support_bits() => {
            // Conflicting same-kind payloads only rule the overlap out when
            // the overlap lies entirely inside that kind.
            data_could_be(da, db) || !(isect - da.support_bits()).is_empty()
        }
        _ => true,
    }
}

#[cfg(test)]
#[path = "../tests/types_tests.rs"]
mod tests;
