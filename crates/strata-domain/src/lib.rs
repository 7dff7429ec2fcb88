//! The abstract-interpretation type lattice for the strata whole-program
//! analyzer.
//!
//! A [`Type`] is a bit-packed union of runtime value kinds plus at most one
//! specialized payload refining those bits: an exact scalar value, a
//! class/object/record identity, or an array shape. All operations are pure
//! closed-form matches over that representation:
//!
//! - relational queries: [`Type::subtype_of`], [`Type::could_be`],
//!   [`Type::more_refined`] and friends
//! - combinators: [`union_of`], [`intersection_of`], [`widening_union`]
//! - array algebra: [`array_like_elem`], [`array_like_newelem`],
//!   [`array_like_set`], splitting/removal, emptiness and iteration typing
//! - hierarchy-derived operations against an injected [`Hierarchy`] index:
//!   wait handles, object/class conversion, context-sensitive refinement
//! - the loosening family of monotone widenings
//! - the scalar bridge between fully-determined types and constants
//!
//! Everything is an immutable value; there is no shared mutable state and
//! every function is safe to call concurrently. Domain-infeasible
//! combinations produce the first-class empty type `Bottom`; violating a
//! documented precondition of a narrowing accessor fails fast instead of
//! producing a plausible wrong answer.

pub mod arrays;
pub mod bits;
pub mod context;
pub mod data;
pub mod hierarchy;
pub mod loosen;
pub mod ops;
pub mod scalar;
pub mod tv;
pub mod types;

#[doc(hidden)]
pub mod testing;

pub use arrays::{
    add_nonemptiness, array_like_elem, array_like_newelem, array_like_set, assert_emptiness,
    assert_nonemptiness, emptiness, iter_types, loosen_emptiness, remove_bits, remove_cls,
    remove_double, remove_int, remove_keyset, remove_obj, remove_string, split_array_like,
    split_cls, split_obj, split_string, Emptiness, IterCount, IterTypes,
};
pub use bits::{ArrKind, Trep};
pub use context::{
    objcls, return_with_context, set_ctx, toobj, unctx, wait_handle, wait_handle_inner,
};
pub use data::{ClsTag, KeyStaticness, LegacyMark, MapElem, MapElems, MapKey};
pub use hierarchy::{
    ClassRef, Hierarchy, HierarchyBuilder, HierarchyError, RecordRef, AWAITABLE,
};
pub use loosen::{
    loosen_array_staticness, loosen_array_values, loosen_interfaces, loosen_likeness,
    loosen_likeness_recursively, loosen_staticness, loosen_string_staticness,
    loosen_string_values, loosen_values, loosen_vecish_or_dictish,
};
pub use ops::{intersection_of, union_all, union_of, widening_union};
pub use scalar::{ArrConst, ConstKey, ConstVal};
pub use tv::{from_cell, is_scalar, is_scalar_counted, scalarize, tv, tv_counted};
pub use types::{
    arr_val, cls_exact, dict_map, dict_map_res, dict_n, dict_packed, dict_packedn, dval,
    exact_record, ival, keyset_n, map_arr, map_arr_res, map_elems, mapn_arr, obj_exact, opt,
    packed_arr, packedn_arr, sdict_map, sdict_map_res, sdict_n, sdict_packed, sdict_packedn,
    sempty, sempty_nonstatic, skeyset_n, sub_cls, sub_obj, sub_record, sval, sval_counted,
    sval_nonstatic, svec, svec_n, unopt, val_arr, vec, vec_n, Type,
};
