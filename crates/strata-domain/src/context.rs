//! Hierarchy-derived operations: object/class conversion, wait handles,
//! and context-sensitive ("this"-flagged) refinement.

use crate::bits::Trep;
use crate::data::{ClsTag, DCls, DObj, Data};
use crate::hierarchy::{ClassRef, Hierarchy};
use crate::ops::union_of;
use crate::types::{cls_exact, obj_exact, sub_cls, sub_obj, Type};

/// Convert a class-typed value to the object it instantiates, preserving
/// identity and exactness. The input must be class-typed.
pub fn toobj(t: &Type) -> Type {
    assert!(
        t.subtype_of_bits(Trep::CLS) && !t.is_bottom(),
        "toobj on a non-class type"
    );
    match &t.data {
        Some(Data::Cls(c)) => {
            let mut o = DObj::new(c.tag, c.cls.clone());
            o.is_ctx = c.is_ctx;
            Type::with_data(Trep::OBJ, Data::Obj(o))
        }
        _ => Type::OBJ,
    }
}

/// Convert an object-typed value to its class, preserving identity and
/// exactness. A wait handle's class is its awaitable class. The input must
/// be object-typed.
pub fn objcls(t: &Type) -> Type {
    assert!(
        t.subtype_of_bits(Trep::OBJ) && !t.is_bottom(),
        "objcls on a non-object type"
    );
    match &t.data {
        Some(Data::Obj(o)) => {
            let mut c = DCls::new(o.tag, o.cls.clone());
            c.is_ctx = o.is_ctx;
            Type::with_data(Trep::CLS, Data::Cls(c))
        }
        _ => Type::CLS,
    }
}

/// An awaitable object known to wrap a value of type `inner`.
///
/// Specialization only pays for itself when it narrows something: wrapping
/// the whole value domain degrades to a plain object of the awaitable
/// class.
pub fn wait_handle(hierarchy: &Hierarchy, inner: Type) -> Type {
    assert!(
        inner.subtype_of_bits(Trep::INIT_CELL),
        "wait handle inner must be a value type"
    );
    if !inner.strict_subtype_of(&Type::INIT_CELL) {
        return sub_obj(hierarchy.awaitable_class());
    }
    let mut o = DObj::new(ClsTag::Sub, hierarchy.awaitable_class());
    o.wh = Some(Box::new(inner));
    Type::with_data(Trep::OBJ, Data::Obj(o))
}

/// The wrapped value type of a known wait handle. Calling this on anything
/// else is an internal-invariant violation.
pub fn wait_handle_inner(t: &Type) -> Type {
    match &t.data {
        Some(Data::Obj(o)) => match &o.wh {
            Some(inner) => (**inner).clone(),
            None => panic!("wait_handle_inner on a non-wait-handle object"),
        },
        _ => panic!("wait_handle_inner on a non-object type"),
    }
}

/// Rebuild an object payload around a transformed wait-handle inner type,
/// degrading to the plain class when the inner no longer narrows anything.
pub(crate) fn rebuild_wait_handle(bits: Trep, mut o: DObj, inner: Type) -> Type {
    o.wh = if inner.strict_subtype_of(&Type::INIT_CELL) {
        Some(Box::new(inner))
    } else {
        None
    };
    Type::with_data(bits, Data::Obj(o))
}

/// Flag an object/class specialization as depending on the calling
/// context. No-op on anything else.
pub fn set_ctx(t: Type) -> Type {
    let Type { bits, data } = t;
    let data = match data {
        Some(Data::Obj(mut o)) => {
            o.is_ctx = true;
            Some(Data::Obj(o))
        }
        Some(Data::Cls(mut c)) => {
            c.is_ctx = true;
            Some(Data::Cls(c))
        }
        d => d,
    };
    Type { bits, data }
}

/// Clear the context flag.
pub fn unctx(t: Type) -> Type {
    let Type { bits, data } = t;
    let data = match data {
        Some(Data::Obj(mut o)) => {
            o.is_ctx = false;
            Some(Data::Obj(o))
        }
        Some(Data::Cls(mut c)) => {
            c.is_ctx = false;
            Some(Data::Cls(c))
        }
        d => d,
    };
    Type { bits, data }
}

/// The receiver shape extracted from a context type.
struct Receiver {
    tag: ClsTag,
    cls: ClassRef,
    is_ctx: bool,
}

fn receiver_of(context: &Type) -> Option<Receiver> {
    match &context.data {
        Some(Data::Obj(o)) => Some(Receiver {
            tag: o.tag,
            cls: o.cls.clone(),
            is_ctx: o.is_ctx,
        }),
        Some(Data::Cls(c)) => Some(Receiver {
            tag: c.tag,
            cls: c.cls.clone(),
            is_ctx: c.is_ctx,
        }),
        _ => None,
    }
}

/// Narrow a context-flagged identity against the receiver. None means the
/// combination is impossible.
fn narrow_against(tag: ClsTag, cls: &ClassRef, recv: &Receiver) -> Option<(ClsTag, ClassRef)> {
    match recv.tag {
        ClsTag::Exact => match tag {
            // An exact declared shape admits only the identical receiver.
            ClsTag::Exact => cls.same(&recv.cls).then(|| (ClsTag::Exact, recv.cls.clone())),
            ClsTag::Sub => recv
                .cls
                .subtype_of(cls)
                .then(|| (ClsTag::Exact, recv.cls.clone())),
        },
        ClsTag::Sub => match tag {
            ClsTag::Exact => cls
                .subtype_of(&recv.cls)
                .then(|| (ClsTag::Exact, cls.clone())),
            ClsTag::Sub => {
                if cls.subtype_of(&recv.cls) {
                    Some((ClsTag::Sub, cls.clone()))
                } else if recv.cls.subtype_of(cls) {
                    Some((ClsTag::Sub, recv.cls.clone()))
                } else if cls.could_be_interface() {
                    Some((ClsTag::Sub, recv.cls.clone()))
                } else if recv.cls.could_be_interface() {
                    Some((ClsTag::Sub, cls.clone()))
                } else {
                    None
                }
            }
        },
    }
}

/// Refine a function's declared return type by the receiver of the call.
///
/// Only context-flagged object/class shapes react; everything else passes
/// through untouched. The result keeps the context flag only when the
/// receiver itself is context-flagged.
pub fn return_with_context(t: Type, context: &Type) -> Type {
    let (obj, rest) = crate::arrays::split_obj(t);
    let (cls, rest) = crate::arrays::split_cls(rest);

    let obj = rwc_part(obj, context, true);
    let cls = rwc_part(cls, context, false);
    union_of(union_of(obj, cls), rest)
}

fn rwc_part(part: Type, context: &Type, as_obj: bool) -> Type {
    let flagged = match &part.data {
        Some(Data::Obj(o)) => o.is_ctx,
        Some(Data::Cls(c)) => c.is_ctx,
        _ => false,
    };
    if !flagged {
        return part;
    }
    let (tag, cls) = match &part.data {
        Some(Data::Obj(o)) => (o.tag, o.cls.clone()),
        Some(Data::Cls(c)) => (c.tag, c.cls.clone()),
        _ => unreachable!("flagged payload is object or class"),
    };
    let Some(recv) = receiver_of(context) else {
        // Unknown receiver: the flag cannot refine anything further.
        return unctx(part);
    };
    match narrow_against(tag, &cls, &recv) {
        None => Type::BOTTOM,
        Some((tag, cls)) => {
            let narrowed = match (as_obj, tag) {
                (true, ClsTag::Exact) => obj_exact(cls),
                (true, ClsTag::Sub) => sub_obj(cls),
                (false, ClsTag::Exact) => cls_exact(cls),
                (false, ClsTag::Sub) => sub_cls(cls),
            };
            if recv.is_ctx {
                set_ctx(narrowed)
            } else {
                narrowed
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/context_tests.rs"]
mod tests;
