//! The bit-set core of the type domain.
//!
//! Every runtime value kind the analyzed language can produce gets one bit:
//! the scalar kinds directly, and the array-like kinds as the cross product
//! of shape family (vec, dict, varray, darray, keyset), staticness (static
//! vs counted) and emptiness (empty vs nonempty). A `Trep` is a union of
//! kinds; subtype and could-be queries over bare bits are plain masking.
//!
//! The named composites below are the vocabulary the rest of the domain is
//! written in. They are closed under the algebra: unioning or intersecting
//! named patterns always lands on a representable bit pattern.

use bitflags::bitflags;

bitflags! {
    /// A union of runtime value kinds.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Trep: u64 {
        const UNINIT    = 1 << 0;
        const INIT_NULL = 1 << 1;
        const FALSE     = 1 << 2;
        const TRUE      = 1 << 3;
        const INT       = 1 << 4;
        const DBL       = 1 << 5;
        const SSTR      = 1 << 6;
        const CSTR      = 1 << 7;
        const FUNC      = 1 << 8;
        const OBJ       = 1 << 9;
        const RES       = 1 << 10;
        const CLS       = 1 << 11;
        const CLS_METH  = 1 << 12;
        const LAZY_CLS  = 1 << 13;
        const RECORD    = 1 << 14;

        const SVEC_E    = 1 << 15;
        const SVEC_N    = 1 << 16;
        const CVEC_E    = 1 << 17;
        const CVEC_N    = 1 << 18;
        const SDICT_E   = 1 << 19;
        const SDICT_N   = 1 << 20;
        const CDICT_E   = 1 << 21;
        const CDICT_N   = 1 << 22;
        const SVARR_E   = 1 << 23;
        const SVARR_N   = 1 << 24;
        const CVARR_E   = 1 << 25;
        const CVARR_N   = 1 << 26;
        const SDARR_E   = 1 << 27;
        const SDARR_N   = 1 << 28;
        const CDARR_E   = 1 << 29;
        const CDARR_N   = 1 << 30;
        const SKEYSET_E = 1 << 31;
        const SKEYSET_N = 1 << 32;
        const CKEYSET_E = 1 << 33;
        const CKEYSET_N = 1 << 34;

        // Scalar composites.
        const NULL = Self::UNINIT.bits() | Self::INIT_NULL.bits();
        const BOOL = Self::FALSE.bits() | Self::TRUE.bits();
        const NUM  = Self::INT.bits() | Self::DBL.bits();
        const STR  = Self::SSTR.bits() | Self::CSTR.bits();
        const UNC_ARR_KEY = Self::INT.bits() | Self::SSTR.bits();
        const ARR_KEY     = Self::INT.bits() | Self::STR.bits();

        // Per-family staticness/emptiness slices.
        const SVEC  = Self::SVEC_E.bits() | Self::SVEC_N.bits();
        const CVEC  = Self::CVEC_E.bits() | Self::CVEC_N.bits();
        const VEC_E = Self::SVEC_E.bits() | Self::CVEC_E.bits();
        const VEC_N = Self::SVEC_N.bits() | Self::CVEC_N.bits();
        const VEC   = Self::SVEC.bits() | Self::CVEC.bits();

        const SDICT  = Self::SDICT_E.bits() | Self::SDICT_N.bits();
        const CDICT  = Self::CDICT_E.bits() | Self::CDICT_N.bits();
        const DICT_E = Self::SDICT_E.bits() | Self::CDICT_E.bits();
        const DICT_N = Self::SDICT_N.bits() | Self::CDICT_N.bits();
        const DICT   = Self::SDICT.bits() | Self::CDICT.bits();

        const SVARR  = Self::SVARR_E.bits() | Self::SVARR_N.bits();
        const CVARR  = Self::CVARR_E.bits() | Self::CVARR_N.bits();
        const VARR_E = Self::SVARR_E.bits() | Self::CVARR_E.bits();
        const VARR_N = Self::SVARR_N.bits() | Self::CVARR_N.bits();
        const VARR   = Self::SVARR.bits() | Self::CVARR.bits();

        const SDARR  = Self::SDARR_E.bits() | Self::SDARR_N.bits();
        const CDARR  = Self::CDARR_E.bits() | Self::CDARR_N.bits();
        const DARR_E = Self::SDARR_E.bits() | Self::CDARR_E.bits();
        const DARR_N = Self::SDARR_N.bits() | Self::CDARR_N.bits();
        const DARR   = Self::SDARR.bits() | Self::CDARR.bits();

        const SKEYSET  = Self::SKEYSET_E.bits() | Self::SKEYSET_N.bits();
        const CKEYSET  = Self::CKEYSET_E.bits() | Self::CKEYSET_N.bits();
        const KEYSET_E = Self::SKEYSET_E.bits() | Self::CKEYSET_E.bits();
        const KEYSET_N = Self::SKEYSET_N.bits() | Self::CKEYSET_N.bits();
        const KEYSET   = Self::SKEYSET.bits() | Self::CKEYSET.bits();

        // Vec-shaped and dict-shaped groupings (vanilla + compat family).
        const VECISH      = Self::VEC.bits() | Self::VARR.bits();
        const VECISH_E    = Self::VEC_E.bits() | Self::VARR_E.bits();
        const VECISH_N    = Self::VEC_N.bits() | Self::VARR_N.bits();
        const S_VECISH    = Self::SVEC.bits() | Self::SVARR.bits();
        const C_VECISH    = Self::CVEC.bits() | Self::CVARR.bits();
        const S_VECISH_E  = Self::SVEC_E.bits() | Self::SVARR_E.bits();
        const S_VECISH_N  = Self::SVEC_N.bits() | Self::SVARR_N.bits();
        const C_VECISH_E  = Self::CVEC_E.bits() | Self::CVARR_E.bits();
        const C_VECISH_N  = Self::CVEC_N.bits() | Self::CVARR_N.bits();

        const DICTISH     = Self::DICT.bits() | Self::DARR.bits();
        const DICTISH_E   = Self::DICT_E.bits() | Self::DARR_E.bits();
        const DICTISH_N   = Self::DICT_N.bits() | Self::DARR_N.bits();
        const S_DICTISH   = Self::SDICT.bits() | Self::SDARR.bits();
        const C_DICTISH   = Self::CDICT.bits() | Self::CDARR.bits();
        const S_DICTISH_E = Self::SDICT_E.bits() | Self::SDARR_E.bits();
        const S_DICTISH_N = Self::SDICT_N.bits() | Self::SDARR_N.bits();
        const C_DICTISH_E = Self::CDICT_E.bits() | Self::CDARR_E.bits();
        const C_DICTISH_N = Self::CDICT_N.bits() | Self::CDARR_N.bits();

        const KVISH = Self::VECISH.bits() | Self::DICTISH.bits();

        // Everything array-like.
        const ARR_LIKE     = Self::KVISH.bits() | Self::KEYSET.bits();
        const ARR_LIKE_E   = Self::VECISH_E.bits() | Self::DICTISH_E.bits()
                           | Self::KEYSET_E.bits();
        const ARR_LIKE_N   = Self::VECISH_N.bits() | Self::DICTISH_N.bits()
                           | Self::KEYSET_N.bits();
        const S_ARR_LIKE   = Self::S_VECISH.bits() | Self::S_DICTISH.bits()
                           | Self::SKEYSET.bits();
        const C_ARR_LIKE   = Self::C_VECISH.bits() | Self::C_DICTISH.bits()
                           | Self::CKEYSET.bits();
        const S_ARR_LIKE_E = Self::S_ARR_LIKE.bits() & Self::ARR_LIKE_E.bits();
        const S_ARR_LIKE_N = Self::S_ARR_LIKE.bits() & Self::ARR_LIKE_N.bits();
        const C_ARR_LIKE_E = Self::C_ARR_LIKE.bits() & Self::ARR_LIKE_E.bits();
        const C_ARR_LIKE_N = Self::C_ARR_LIKE.bits() & Self::ARR_LIKE_N.bits();

        // Scalar groupings.
        const PRIM      = Self::NULL.bits() | Self::BOOL.bits() | Self::NUM.bits();
        const INIT_PRIM = Self::INIT_NULL.bits() | Self::BOOL.bits() | Self::NUM.bits();

        // The uncounted-representable subset. ClsMeth is treated as
        // uncounted here; Res is always counted.
        const INIT_UNC = Self::INIT_PRIM.bits() | Self::SSTR.bits()
                       | Self::S_ARR_LIKE.bits() | Self::FUNC.bits()
                       | Self::CLS.bits() | Self::LAZY_CLS.bits()
                       | Self::CLS_METH.bits();
        const UNC = Self::INIT_UNC.bits() | Self::UNINIT.bits();

        // The whole value domain.
        const CELL = Self::NULL.bits() | Self::BOOL.bits() | Self::NUM.bits()
                   | Self::STR.bits() | Self::FUNC.bits() | Self::OBJ.bits()
                   | Self::RES.bits() | Self::CLS.bits() | Self::CLS_METH.bits()
                   | Self::LAZY_CLS.bits() | Self::RECORD.bits()
                   | Self::ARR_LIKE.bits();
        const INIT_CELL = Self::CELL.bits() & !Self::UNINIT.bits();
        const TOP = Self::CELL.bits();

        // Kinds narrow enough to carry a specialized payload.
        const SUPPORT = Self::STR.bits() | Self::DBL.bits() | Self::INT.bits()
                      | Self::CLS.bits() | Self::OBJ.bits() | Self::RECORD.bits()
                      | Self::ARR_LIKE_N.bits();
    }
}

/// `Trep::empty()` under its lattice name.
pub const BOTTOM: Trep = Trep::empty();

impl Trep {
    /// True when every kind in `self` is also in `mask`.
    #[inline]
    pub const fn subtype_of(self, mask: Trep) -> bool {
        self.difference(mask).is_empty()
    }

    /// True when `self` and `mask` share at least one kind.
    #[inline]
    pub const fn could_be(self, mask: Trep) -> bool {
        !self.intersection(mask).is_empty()
    }

    /// True when the part of `self` inside `among` lies entirely in `sub`.
    ///
    /// `t.subtype_among(Trep::SVEC, Trep::VEC)` asks "are all of t's vecs
    /// static?" without saying anything about t's non-vec kinds.
    #[inline]
    pub const fn subtype_among(self, sub: Trep, among: Trep) -> bool {
        self.intersection(among).subtype_of(sub)
    }

    /// Add the init-null kind.
    #[inline]
    pub const fn opt(self) -> Trep {
        self.union(Trep::INIT_NULL)
    }

    /// The array-like part of this pattern.
    #[inline]
    pub const fn arr_like(self) -> Trep {
        self.intersection(Trep::ARR_LIKE)
    }
}

/// The five array-like shape families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrKind {
    Vec,
    Dict,
    VArr,
    DArr,
    Keyset,
}

impl ArrKind {
    pub const ALL: [ArrKind; 5] = [
        ArrKind::Vec,
        ArrKind::Dict,
        ArrKind::VArr,
        ArrKind::DArr,
        ArrKind::Keyset,
    ];

    /// All bits of this family.
    pub const fn bits(self) -> Trep {
        match self {
            ArrKind::Vec => Trep::VEC,
            ArrKind::Dict => Trep::DICT,
            ArrKind::VArr => Trep::VARR,
            ArrKind::DArr => Trep::DARR,
            ArrKind::Keyset => Trep::KEYSET,
        }
    }

    /// The static-nonempty bit of this family.
    pub const fn static_nonempty(self) -> Trep {
        match self {
            ArrKind::Vec => Trep::SVEC_N,
            ArrKind::Dict => Trep::SDICT_N,
            ArrKind::VArr => Trep::SVARR_N,
            ArrKind::DArr => Trep::SDARR_N,
            ArrKind::Keyset => Trep::SKEYSET_N,
        }
    }

    /// The static-empty bit of this family.
    pub const fn static_empty(self) -> Trep {
        match self {
            ArrKind::Vec => Trep::SVEC_E,
            ArrKind::Dict => Trep::SDICT_E,
            ArrKind::VArr => Trep::SVARR_E,
            ArrKind::DArr => Trep::SDARR_E,
            ArrKind::Keyset => Trep::SKEYSET_E,
        }
    }

    /// The nonempty bits (both staticnesses) of this family.
    pub const fn nonempty(self) -> Trep {
        match self {
            ArrKind::Vec => Trep::VEC_N,
            ArrKind::Dict => Trep::DICT_N,
            ArrKind::VArr => Trep::VARR_N,
            ArrKind::DArr => Trep::DARR_N,
            ArrKind::Keyset => Trep::KEYSET_N,
        }
    }

    /// The empty bits (both staticnesses) of this family.
    pub const fn empty(self) -> Trep {
        match self {
            ArrKind::Vec => Trep::VEC_E,
            ArrKind::Dict => Trep::DICT_E,
            ArrKind::VArr => Trep::VARR_E,
            ArrKind::DArr => Trep::DARR_E,
            ArrKind::Keyset => Trep::KEYSET_E,
        }
    }

    /// Packed layout: keys are exactly 0..n.
    pub const fn is_vec_shaped(self) -> bool {
        matches!(self, ArrKind::Vec | ArrKind::VArr)
    }
}

/// Loosen the static/counted split of the string part of `bits`.
pub(crate) fn loosen_string_staticness_bits(bits: Trep) -> Trep {
    if bits.could_be(Trep::STR) {
        bits | Trep::STR
    } else {
        bits
    }
}

/// Loosen the static/counted split of the array part of `bits`, preserving
/// each family's emptiness.
pub(crate) fn loosen_array_staticness_bits(bits: Trep) -> Trep {
    let mut out = bits;
    for kind in ArrKind::ALL {
        let fam = bits & kind.bits();
        if fam.is_empty() {
            continue;
        }
        if fam.could_be(kind.empty()) {
            out |= kind.empty();
        }
        if fam.could_be(kind.nonempty()) {
            out |= kind.nonempty();
        }
    }
    out
}

/// Loosen the empty/nonempty split of the array part of `bits`, preserving
/// each family's staticness.
pub(crate) fn loosen_emptiness_bits(bits: Trep) -> Trep {
    let mut out = bits;
    for kind in ArrKind::ALL {
        for static_half in [
            kind.bits() & Trep::S_ARR_LIKE,
            kind.bits() & Trep::C_ARR_LIKE,
        ] {
            if bits.could_be(static_half) {
                out |= static_half;
            }
        }
    }
    out
}

#[cfg(test)]
#[path = "../tests/bits_tests.rs"]
mod tests;
