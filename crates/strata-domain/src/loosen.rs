//! The loosening family: monotone widenings that discard one axis of
//! refinement while preserving the bit-level type.
//!
//! Every function here satisfies `t.subtype_of(&loosen_X(t))` and is
//! idempotent along its own axis. They are the analyzer's tools for keeping
//! types stable across operations that may change representation (copies,
//! promotions, compat conversions) without changing the value.

use crate::bits::{loosen_array_staticness_bits, loosen_string_staticness_bits, Trep};
use crate::data::{Data, KeyStaticness, MapElem, MapElems, MapKey};
use crate::ops::union_of;
use crate::types::{map_arr_res, mapn_arr, packed_arr, packedn_arr, val_as_data, Type};

/// Drop the static/counted distinction on the string part.
pub fn loosen_string_staticness(t: Type) -> Type {
    Type {
        bits: loosen_string_staticness_bits(t.bits),
        data: t.data,
    }
}

/// Drop the static/counted distinction on the array part. Literal-array
/// payloads decay to their enumerated shape (the literal pins a static
/// representation); element types are left alone.
pub fn loosen_array_staticness(t: Type) -> Type {
    let bits = loosen_array_staticness_bits(t.bits);
    let data = match t.data {
        Some(Data::ArrVal(v)) if bits != t.bits => Some(val_as_data(&v)),
        d => d,
    };
    Type { bits, data }
}

/// Drop the static/counted distinction everywhere: string and array bits,
/// and recursively through payload leaves, map key tags and wait-handle
/// inner types.
pub fn loosen_staticness(t: Type) -> Type {
    let bits = loosen_string_staticness_bits(loosen_array_staticness_bits(t.bits));
    let Some(data) = t.data else {
        return Type::from_bits(bits);
    };
    let data = match data {
        Data::ArrVal(v) => val_as_data(&v),
        d => d,
    };
    match data {
        Data::Obj(mut o) => {
            if let Some(inner) = o.wh.take() {
                return crate::context::rebuild_wait_handle(bits, o, loosen_staticness(*inner));
            }
            Type {
                bits,
                data: Some(Data::Obj(o)),
            }
        }
        Data::ArrPacked(p) => {
            let mut out = packed_arr(
                bits,
                p.elems.into_iter().map(loosen_staticness).collect(),
            );
            if let Some(d) = out.data.as_mut() {
                d.set_mark(p.mark);
            }
            out
        }
        Data::ArrPackedN(p) => {
            let mut out = packedn_arr(bits, loosen_staticness(*p.elem));
            if let Some(d) = out.data.as_mut() {
                d.set_mark(p.mark);
            }
            out
        }
        Data::ArrMapN(m) => {
            let mut out = mapn_arr(bits, loosen_staticness(*m.key), loosen_staticness(*m.val));
            if let Some(d) = out.data.as_mut() {
                d.set_mark(m.mark);
            }
            out
        }
        Data::ArrMap(m) => {
            let mut elems = MapElems::default();
            for (k, e) in m.elems {
                let key_static = match k {
                    MapKey::Int(_) => KeyStaticness::Static,
                    MapKey::Str(_) => KeyStaticness::Any,
                };
                elems.insert(
                    k,
                    MapElem {
                        ty: loosen_staticness(e.ty),
                        key_static,
                    },
                );
            }
            let (opt_key, opt_val) = if m.opt_key.is_bottom() {
                (Type::BOTTOM, Type::BOTTOM)
            } else {
                (loosen_staticness(*m.opt_key), loosen_staticness(*m.opt_val))
            };
            let mut out = map_arr_res(bits, elems, opt_key, opt_val);
            if let Some(d) = out.data.as_mut() {
                d.set_mark(m.mark);
            }
            out
        }
        d => Type {
            bits,
            data: Some(d),
        },
    }
}

/// Drop literal string refinement, keeping the bit-level type.
pub fn loosen_string_values(t: Type) -> Type {
    match &t.data {
        Some(Data::Str(_)) => Type::from_bits(t.bits),
        _ => t,
    }
}

/// Drop array-shape refinement, keeping the bit-level type.
pub fn loosen_array_values(t: Type) -> Type {
    match &t.data {
        Some(d) if d.is_array() => Type::from_bits(t.bits),
        _ => t,
    }
}

/// Drop all value-level refinement: literal scalars and array shapes go,
/// a known boolean widens to either boolean. Object, class and record
/// identities are not values and survive.
pub fn loosen_values(t: Type) -> Type {
    let bits = if t.bits.could_be(Trep::BOOL) {
        t.bits | Trep::BOOL
    } else {
        t.bits
    };
    match &t.data {
        Some(Data::Int(_)) | Some(Data::Dbl(_)) | Some(Data::Str(_)) => Type::from_bits(bits),
        Some(d) if d.is_array() => Type::from_bits(bits),
        _ => Type { bits, data: t.data },
    }
}

/// Admit the weak encodings class-like values convert to: class and lazy
/// class admit their static-string name, class-method pointers admit their
/// two-element vec-shaped encodings.
pub fn loosen_likeness(t: Type) -> Type {
    let mut extra = Trep::empty();
    if t.bits.could_be(Trep::CLS | Trep::LAZY_CLS) {
        extra |= Trep::SSTR;
    }
    if t.bits.could_be(Trep::CLS_METH) {
        extra |= Trep::VARR_N | Trep::DARR_N;
    }
    if extra.is_empty() {
        t
    } else {
        union_of(t, Type::from_bits(extra))
    }
}

/// [`loosen_likeness`] applied through nested array and wait-handle
/// payloads, with array staticness loosened along the way (the weak
/// encodings need not stay static).
pub fn loosen_likeness_recursively(t: Type) -> Type {
    let bits = loosen_array_staticness_bits(t.bits);
    let rebuilt = match t.data {
        None => Type::from_bits(bits),
        Some(Data::ArrVal(v)) => {
            let t = Type {
                bits,
                data: Some(val_as_data(&v)),
            };
            return loosen_likeness_recursively(t);
        }
        Some(Data::Obj(mut o)) => match o.wh.take() {
            Some(inner) => {
                return crate::context::rebuild_wait_handle(
                    bits,
                    o,
                    loosen_likeness_recursively(*inner),
                )
            }
            None => Type {
                bits,
                data: Some(Data::Obj(o)),
            },
        },
        Some(Data::ArrPacked(p)) => {
            let mut out = packed_arr(
                bits,
                p.elems
                    .into_iter()
                    .map(loosen_likeness_recursively)
                    .collect(),
            );
            if let Some(d) = out.data.as_mut() {
                d.set_mark(p.mark);
            }
            out
        }
        Some(Data::ArrPackedN(p)) => {
            let mut out = packedn_arr(bits, loosen_likeness_recursively(*p.elem));
            if let Some(d) = out.data.as_mut() {
                d.set_mark(p.mark);
            }
            out
        }
        Some(Data::ArrMapN(m)) => {
            let mut out = mapn_arr(
                bits,
                loosen_likeness_recursively(*m.key),
                loosen_likeness_recursively(*m.val),
            );
            if let Some(d) = out.data.as_mut() {
                d.set_mark(m.mark);
            }
            out
        }
        Some(Data::ArrMap(m)) => {
            let mut elems = MapElems::default();
            for (k, e) in m.elems {
                elems.insert(
                    k,
                    MapElem {
                        ty: loosen_likeness_recursively(e.ty),
                        key_static: e.key_static,
                    },
                );
            }
            let (opt_key, opt_val) = if m.opt_key.is_bottom() {
                (Type::BOTTOM, Type::BOTTOM)
            } else {
                (
                    loosen_likeness_recursively(*m.opt_key),
                    loosen_likeness_recursively(*m.opt_val),
                )
            };
            let mut out = map_arr_res(bits, elems, opt_key, opt_val);
            if let Some(d) = out.data.as_mut() {
                d.set_mark(m.mark);
            }
            out
        }
        Some(d) => Type {
            bits,
            data: Some(d),
        },
    };
    loosen_likeness(rebuilt)
}

/// Treat interface-typed object refinements as plain objects: interface
/// membership does not pin an exact runtime layout. Applies through
/// wait-handle inner types.
pub fn loosen_interfaces(t: Type) -> Type {
    match t.data {
        Some(Data::Obj(mut o)) => match o.wh.take() {
            Some(inner) => {
                crate::context::rebuild_wait_handle(t.bits, o, loosen_interfaces(*inner))
            }
            None => {
                if o.cls.could_be_interface() {
                    Type::from_bits(t.bits)
                } else {
                    Type {
                        bits: t.bits,
                        data: Some(Data::Obj(o)),
                    }
                }
            }
        },
        data => Type { bits: t.bits, data },
    }
}

/// Erase the vec-vs-dict and varray-vs-darray distinction, for layout
/// compatibility checks. Any non-keyset array refinement is lost.
pub fn loosen_vecish_or_dictish(t: Type) -> Type {
    if !t.bits.could_be(Trep::KVISH) {
        return t;
    }
    let mut bits = t.bits;
    if bits.could_be(Trep::VEC | Trep::DICT) {
        bits |= Trep::VEC | Trep::DICT;
    }
    if bits.could_be(Trep::VARR | Trep::DARR) {
        bits |= Trep::VARR | Trep::DARR;
    }
    let data = match t.data {
        Some(d) if d.is_array() => None,
        d => d,
    };
    Type { bits, data }
}

#[cfg(test)]
#[path = "../tests/loosen_tests.rs"]
mod tests;
