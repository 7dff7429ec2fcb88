//! Specialized payloads.
//!
//! When a type's bits are narrow enough to support a single shape, it may
//! carry one `Data` payload refining those bits: an exact scalar value, a
//! class/object/record identity, or an array shape. All operations over
//! payloads are closed-form matches on this enum; there is no dispatch
//! hierarchy to extend.

use crate::hierarchy::{ClassRef, RecordRef};
use crate::scalar::ArrConst;
use crate::types::Type;
use crate::Trep;
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use strata_common::Atom;

/// Exactness of a class/object/record identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClsTag {
    /// Precisely this identity.
    Exact,
    /// This identity or any descendant.
    Sub,
}

/// Object payload: identity, context flag, and an optional wait-handle
/// inner type when the object is a known awaitable wrapping a value.
#[derive(Debug, Clone)]
pub struct DObj {
    pub tag: ClsTag,
    pub cls: ClassRef,
    pub is_ctx: bool,
    pub wh: Option<Box<Type>>,
}

impl DObj {
    pub fn new(tag: ClsTag, cls: ClassRef) -> Self {
        DObj {
            tag,
            cls,
            is_ctx: false,
            wh: None,
        }
    }
}

/// Class payload.
#[derive(Debug, Clone)]
pub struct DCls {
    pub tag: ClsTag,
    pub cls: ClassRef,
    pub is_ctx: bool,
}

impl DCls {
    pub fn new(tag: ClsTag, cls: ClassRef) -> Self {
        DCls {
            tag,
            cls,
            is_ctx: false,
        }
    }
}

/// Record payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DRecord {
    pub tag: ClsTag,
    pub rec: RecordRef,
}

/// The migration-compat tri-state carried by array payloads. Orthogonal to
/// the shape algebra; unioning two different known marks is ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyMark {
    Unmarked,
    Marked,
    Unknown,
}

impl LegacyMark {
    pub fn union(self, other: LegacyMark) -> LegacyMark {
        if self == other { self } else { LegacyMark::Unknown }
    }

    /// Over-approximates conflicting known marks to Unknown; the mark is a
    /// compat bit, not part of the value set.
    pub fn intersect(self, other: LegacyMark) -> LegacyMark {
        match (self, other) {
            (a, b) if a == b => a,
            (LegacyMark::Unknown, b) => b,
            (a, LegacyMark::Unknown) => a,
            _ => LegacyMark::Unknown,
        }
    }

    pub fn subtype_of(self, other: LegacyMark) -> bool {
        self == other || other == LegacyMark::Unknown
    }

    pub fn could_be(self, other: LegacyMark) -> bool {
        self == other || self == LegacyMark::Unknown || other == LegacyMark::Unknown
    }
}

/// Staticness constraint on a string map key. Int keys are always static.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStaticness {
    Static,
    Counted,
    Any,
}

impl KeyStaticness {
    pub fn union(self, other: KeyStaticness) -> KeyStaticness {
        if self == other { self } else { KeyStaticness::Any }
    }

    /// None when the constraints admit no common representation.
    pub fn intersect(self, other: KeyStaticness) -> Option<KeyStaticness> {
        match (self, other) {
            (a, b) if a == b => Some(a),
            (KeyStaticness::Any, b) => Some(b),
            (a, KeyStaticness::Any) => Some(a),
            _ => None,
        }
    }

    pub fn subtype_of(self, other: KeyStaticness) -> bool {
        self == other || other == KeyStaticness::Any
    }
}

/// A literal map key. Staticness of string keys lives in [`MapElem`], so
/// keys compare and hash by value alone — the staticness-loosened
/// comparison the lookup rules call for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Str(Atom),
}

/// Per-entry data of an enumerated map payload.
#[derive(Debug, Clone, PartialEq)]
pub struct MapElem {
    pub ty: Type,
    pub key_static: KeyStaticness,
}

impl MapElem {
    /// Entry under an int key or a definitely-static string key.
    pub fn static_key(ty: Type) -> MapElem {
        MapElem {
            ty,
            key_static: KeyStaticness::Static,
        }
    }

    /// Entry under a definitely-counted string key.
    pub fn counted_key(ty: Type) -> MapElem {
        MapElem {
            ty,
            key_static: KeyStaticness::Counted,
        }
    }

    /// Entry under a string key of unknown staticness.
    pub fn any_key(ty: Type) -> MapElem {
        MapElem {
            ty,
            key_static: KeyStaticness::Any,
        }
    }
}

/// Ordered entries of an enumerated map payload. Insertion order is
/// semantic: arrays are ordered containers.
pub type MapElems = IndexMap<MapKey, MapElem, FxBuildHasher>;

/// Inline-capacity vector for packed element lists; most packed payloads
/// hold a couple of elements.
pub type PackedElems = Vec<Type>;

/// A literal array payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DArrVal {
    pub val: Arc<ArrConst>,
    pub mark: LegacyMark,
}

/// Enumerated tuple: element types position by position.
#[derive(Debug, Clone, PartialEq)]
pub struct DArrPacked {
    pub elems: PackedElems,
    pub mark: LegacyMark,
}

/// Homogeneous sequence: every element has one type, length unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct DArrPackedN {
    pub elem: Box<Type>,
    pub mark: LegacyMark,
}

/// Enumerated map: known key→type entries, plus a residual key/value type
/// for everything else (`Bottom` residual = no other entries possible).
#[derive(Debug, Clone, PartialEq)]
pub struct DArrMap {
    pub elems: MapElems,
    pub opt_key: Box<Type>,
    pub opt_val: Box<Type>,
    pub mark: LegacyMark,
}

impl DArrMap {
    pub fn has_residual(&self) -> bool {
        !self.opt_key.is_bottom()
    }
}

/// Homogeneous map: uniform key and value types.
#[derive(Debug, Clone, PartialEq)]
pub struct DArrMapN {
    pub key: Box<Type>,
    pub val: Box<Type>,
    pub mark: LegacyMark,
}

/// A specialized payload.
#[derive(Debug, Clone)]
pub enum Data {
    Int(i64),
    Dbl(f64),
    Str(Atom),
    Obj(DObj),
    Cls(DCls),
    Record(DRecord),
    ArrVal(DArrVal),
    ArrPacked(DArrPacked),
    ArrPackedN(DArrPackedN),
    ArrMap(DArrMap),
    ArrMapN(DArrMapN),
}

impl Data {
    /// The slice of the support mask this payload's kind occupies.
    pub fn support_bits(&self) -> Trep {
        match self {
            Data::Int(_) => Trep::INT,
            Data::Dbl(_) => Trep::DBL,
            Data::Str(_) => Trep::STR,
            Data::Obj(_) => Trep::OBJ,
            Data::Cls(_) => Trep::CLS,
            Data::Record(_) => Trep::RECORD,
            Data::ArrVal(_)
            | Data::ArrPacked(_)
            | Data::ArrPackedN(_)
            | Data::ArrMap(_)
            | Data::ArrMapN(_) => Trep::ARR_LIKE_N,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Data::ArrVal(_)
                | Data::ArrPacked(_)
                | Data::ArrPackedN(_)
                | Data::ArrMap(_)
                | Data::ArrMapN(_)
        )
    }

    pub fn mark(&self) -> Option<LegacyMark> {
        match self {
            Data::ArrVal(a) => Some(a.mark),
            Data::ArrPacked(a) => Some(a.mark),
            Data::ArrPackedN(a) => Some(a.mark),
            Data::ArrMap(a) => Some(a.mark),
            Data::ArrMapN(a) => Some(a.mark),
            _ => None,
        }
    }

    pub fn set_mark(&mut self, mark: LegacyMark) {
        match self {
            Data::ArrVal(a) => a.mark = mark,
            Data::ArrPacked(a) => a.mark = mark,
            Data::ArrPackedN(a) => a.mark = mark,
            Data::ArrMap(a) => a.mark = mark,
            Data::ArrMapN(a) => a.mark = mark,
            _ => {}
        }
    }
}

// Equality ignores the context flag on object/class payloads (it is a modal
// refinement, observed only by the refinement order) and compares doubles
// bitwise so NaN payloads stay reflexive.
impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Data::Int(a), Data::Int(b)) => a == b,
            (Data::Dbl(a), Data::Dbl(b)) => a.to_bits() == b.to_bits(),
            (Data::Str(a), Data::Str(b)) => a == b,
            (Data::Obj(a), Data::Obj(b)) => {
                a.tag == b.tag && a.cls == b.cls && a.wh == b.wh
            }
            (Data::Cls(a), Data::Cls(b)) => a.tag == b.tag && a.cls == b.cls,
            (Data::Record(a), Data::Record(b)) => a == b,
            (Data::ArrVal(a), Data::ArrVal(b)) => a == b,
            (Data::ArrPacked(a), Data::ArrPacked(b)) => a == b,
            (Data::ArrPackedN(a), Data::ArrPackedN(b)) => a == b,
            (Data::ArrMap(a), Data::ArrMap(b)) => a == b,
            (Data::ArrMapN(a), Data::ArrMapN(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Data {}
