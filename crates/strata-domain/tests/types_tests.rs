use super::*;
use crate::context::set_ctx;
use crate::ops::{intersection_of, union_of};
use rayon::prelude::*;

#[path = "corpus.rs"]
mod corpus;
use corpus::*;

#[test]
fn lattice_laws_hold_across_the_corpus() {
    for t in all_cases() {
        assert!(t.subtype_of(t), "{t:?} not reflexive");
        assert!(t.more_refined(t));
        assert!(!t.strictly_more_refined(t));
        assert!(t.equivalently_refined(t));
        assert!(t.subtype_of(&Type::TOP));
        assert!(Type::BOTTOM.subtype_of(t));
        assert!(!t.could_be(&Type::BOTTOM));
        assert_eq!(&union_of(t.clone(), Type::BOTTOM), t);
        assert_eq!(intersection_of(t.clone(), Type::BOTTOM), Type::BOTTOM);
        assert_eq!(&union_of(t.clone(), t.clone()), t);
        assert_eq!(&intersection_of(t.clone(), t.clone()), t);
        if !t.is_bottom() {
            assert!(t.could_be(t), "{t:?} should overlap itself");
        }
    }
}

#[test]
fn binary_relations_are_symmetric() {
    let cases = all_cases();
    cases.par_iter().for_each(|a| {
        for b in cases {
            assert_eq!(
                a.could_be(b),
                b.could_be(a),
                "could_be asymmetry: {a:?} vs {b:?}"
            );
            let u1 = union_of(a.clone(), b.clone());
            let u2 = union_of(b.clone(), a.clone());
            assert!(
                u1.equivalently_refined(&u2),
                "union asymmetry: {a:?} vs {b:?}"
            );
            let i1 = intersection_of(a.clone(), b.clone());
            let i2 = intersection_of(b.clone(), a.clone());
            assert!(
                i1.equivalently_refined(&i2),
                "intersection asymmetry: {a:?} vs {b:?}"
            );
        }
    });
}

#[test]
fn union_and_intersection_bound_their_operands() {
    let cases = all_cases();
    cases.par_iter().for_each(|a| {
        for b in cases {
            let u = union_of(a.clone(), b.clone());
            assert!(a.subtype_of(&u), "{a:?} not below union with {b:?}");
            assert!(b.subtype_of(&u));
            let i = intersection_of(a.clone(), b.clone());
            // Intersection may over-approximate (unrelated interfaces keep
            // their object bits), but never escapes the union.
            assert!(i.subtype_of(&u), "{i:?} escapes {a:?} ∩ {b:?}");
            assert!(i.subtype_of_bits(a.bits() & b.bits()));
            if !a.could_be(b) {
                assert!(i.is_bottom(), "no overlap but {i:?} from {a:?} ∩ {b:?}");
            }
            if a.subtype_of(b) {
                assert!(u.equivalently_refined(b) || u.subtype_of(b));
                assert!(i.equivalently_refined(a) || a.subtype_of(&i));
            }
        }
    });
}

#[test]
fn subtype_implies_could_be_for_nonempty() {
    let cases = all_cases();
    cases.par_iter().for_each(|a| {
        for b in cases {
            if !a.is_bottom() && a.subtype_of(b) {
                assert!(a.could_be(b), "{a:?} <= {b:?} but no overlap");
            }
        }
    });
}

#[test]
fn prims() {
    let subtype_true: &[(&Type, Trep)] = &[
        (&Type::INT, Trep::PRIM),
        (&Type::BOOL, Trep::PRIM),
        (&Type::NUM, Trep::PRIM),
        (&Type::INIT_NULL, Trep::PRIM),
        (&Type::DBL, Trep::PRIM),
        (&dval(0.0), Trep::PRIM),
        (&ival(0), Trep::PRIM),
        (&Type::NULL, Trep::PRIM),
        (&Type::INT, Trep::INIT_PRIM),
        (&ival(0), Trep::INIT_PRIM),
    ];
    for (t, b) in subtype_true {
        assert!(t.subtype_of_bits(*b), "{t:?} should be prim");
    }
    let subtype_false: &[(&Type, Trep)] = &[
        (&sval(atom("test")), Trep::PRIM),
        (&Type::SSTR, Trep::PRIM),
        (&Type::NULL, Trep::INIT_PRIM),
        (&Type::PRIM, Trep::BOOL),
        (&Type::PRIM, Trep::NUM),
        (&Type::INIT_PRIM, Trep::NUM),
        (&Type::UNC, Trep::PRIM),
        (&Type::INIT_UNC, Trep::PRIM),
        (&Type::RES, Trep::PRIM),
        (&Type::OBJ, Trep::PRIM),
        (&Type::CLS, Trep::INIT_PRIM),
        (&Type::FUNC, Trep::INIT_PRIM),
        (&Type::CLS_METH, Trep::INIT_PRIM),
    ];
    for (t, b) in subtype_false {
        assert!(!t.subtype_of_bits(*b), "{t:?} should not be prim");
    }
    assert!(!Type::PRIM.could_be_bits(Trep::SSTR));
    assert!(!Type::PRIM.could_be(&sval(atom("test"))));
    assert!(!Type::PRIM.could_be_bits(Trep::OBJ | Trep::RECORD | Trep::RES | Trep::CLS_METH));
    assert!(Type::PRIM.could_be_bits(Trep::INT.opt()));
    assert!(!Type::INIT_PRIM.could_be_bits(Trep::UNINIT));
}

#[test]
fn could_be_values() {
    assert!(!ival(2).could_be(&ival(3)));
    assert!(ival(2).could_be(&ival(2)));
    assert!(dval(2.0).could_be(&dval(2.0)));
    assert!(!dval(2.0).could_be(&dval(3.0)));

    let t = atom("test");
    let a = atom("A");
    assert!(!sval(t).could_be(&sval(a)));
    assert!(sval(t).could_be(&sval(t)));
    assert!(!sval_nonstatic(t).could_be(&sval_nonstatic(a)));
    assert!(sval_nonstatic(t).could_be(&sval_nonstatic(t)));
    assert!(sval(t).could_be(&sval_nonstatic(t)));
    assert!(sval_nonstatic(t).could_be(&sval(t)));
    assert!(!sval(t).could_be(&sval_nonstatic(a)));
}

#[test]
fn str_values() {
    let t1 = sval(atom("test"));
    let t2 = sval_nonstatic(atom("test"));
    let t3 = sval(atom("A"));
    let t5 = sval_nonstatic(atom("A"));

    assert!(t1.subtype_of(&t2));
    assert!(t1.subtype_of(&Type::SSTR));
    assert!(t1.subtype_of(&Type::STR));
    assert!(!t1.subtype_of(&t3));
    assert!(!t2.subtype_of(&t1));
    assert!(!t2.subtype_of(&Type::SSTR));
    assert!(t2.subtype_of(&Type::STR));
    assert!(!t2.subtype_of(&t5));
    assert!(!Type::STR.subtype_of(&t1));
    assert!(!Type::SSTR.subtype_of(&t2));

    assert!(t1.could_be(&t2));
    assert!(!t1.could_be(&t3));
    assert!(Type::SSTR.could_be(&t1));
    assert!(Type::STR.could_be(&t2));

    assert_eq!(union_of(t1.clone(), t1.clone()), t1);
    assert_eq!(union_of(t1.clone(), t2.clone()), t2);
    assert_eq!(union_of(t2.clone(), t1.clone()), t2);
    assert_eq!(union_of(t1.clone(), t3.clone()), Type::SSTR);
    assert_eq!(union_of(t2.clone(), t3.clone()), Type::STR);
    assert_eq!(union_of(t2.clone(), t5.clone()), Type::STR);
}

#[test]
fn dbl_nan_is_reflexive() {
    let nan = dval(f64::NAN);
    assert!(nan.subtype_of(&nan));
    assert!(nan.could_be(&nan));
    assert!(!nan.strict_subtype_of(&nan));
    assert_eq!(nan, nan.clone());
    assert_eq!(union_of(nan.clone(), nan.clone()), nan);
    assert_eq!(intersection_of(nan.clone(), nan.clone()), nan);
}

#[test]
fn option_types() {
    assert!(Type::TRUE.subtype_of_bits(Trep::TRUE.opt()));
    assert!(Type::INIT_NULL.subtype_of_bits(Trep::TRUE.opt()));
    assert!(!Type::UNINIT.subtype_of_bits(Trep::TRUE.opt()));
    assert!(ival(3).subtype_of_bits(Trep::INT.opt()));
    assert!(sval(atom("test")).subtype_of_bits(Trep::SSTR.opt()));
    assert!(sval_nonstatic(atom("test")).subtype_of_bits(Trep::STR.opt()));
    assert!(!Type::STR.subtype_of_bits(Trep::SSTR.opt()));
    assert!(Type::STR.could_be_bits(Trep::SSTR.opt()));
    assert!(Type::ARR_KEY.subtype_of_bits(Trep::ARR_KEY.opt()));

    for t in all_cases() {
        if !t.could_be_bits(Trep::INIT_NULL) || t.subtype_of_bits(Trep::INIT_NULL) {
            continue;
        }
        assert_eq!(&opt(unopt(t.clone())), t, "opt/unopt roundtrip for {t:?}");
    }
    for t in all_cases() {
        if t.could_be_bits(Trep::INIT_NULL) {
            continue;
        }
        assert_eq!(
            opt(t.clone()),
            union_of(t.clone(), Type::INIT_NULL),
            "opt != union with null for {t:?}"
        );
        assert!(t.subtype_of(&opt(t.clone())));
        if !t.is_bottom() {
            assert_eq!(unopt(opt(t.clone())), t.clone());
        }
    }
}

#[test]
#[should_panic(expected = "unopt")]
fn unopt_on_non_nullable_fails_fast() {
    let _ = unopt(Type::INT);
}

#[test]
fn opt_could_be() {
    let true_cases: &[(Type, Type)] = &[
        (opt(sval(atom("test"))), Type::STR),
        (opt(sval(atom("test"))), Type::INIT_NULL),
        (opt(sval(atom("test"))), sval(atom("test"))),
        (opt(sval(atom("test"))), sval_nonstatic(atom("test"))),
        (opt(ival(2)), Type::INT),
        (opt(ival(2)), ival(2)),
        (opt(dval(2.0)), Type::DBL),
        (opt(Type::FALSE), Type::BOOL),
        (opt(Type::DBL), opt(Type::NUM)),
        (Type::NUM, opt(Type::DBL)),
        (opt(Type::INT), Type::NUM),
    ];
    for (a, b) in true_cases {
        assert!(a.could_be(b), "{a:?} should overlap {b:?}");
        assert!(b.could_be(a));
    }
    let false_cases: &[(Type, Type)] = &[
        (opt(ival(2)), Type::DBL),
        (opt(dval(2.0)), Type::INT),
        (opt(Type::FALSE), Type::TRUE),
        (Type::FALSE, opt(Type::NUM)),
    ];
    for (a, b) in false_cases {
        assert!(!a.could_be(b), "{a:?} should not overlap {b:?}");
        assert!(!b.could_be(a));
    }
}

#[test]
fn specialization_queries() {
    assert!(ival(7).is_specialized_int());
    assert_eq!(ival(7).ival_of(), 7);
    assert!(dval(1.5).is_specialized_double());
    assert_eq!(dval(1.5).dval_of(), 1.5);
    assert!(sval(atom("x")).is_specialized_string());
    assert_eq!(sval(atom("x")).sval_of(), atom("x"));
    assert!(sub_obj(cls("A")).is_specialized_obj());
    assert!(cls_exact(cls("A")).is_specialized_cls());
    assert!(exact_record(rec("UniqueRec")).is_specialized_record());
    assert!(vec(vec![Type::INT]).is_specialized_array_like_packed());
    assert!(vec_n(Type::INT).is_specialized_array_like_packedn());
    assert!(dict_n(Type::SSTR, Type::INT).is_specialized_array_like_mapn());
    assert!(!Type::INT.has_data());
    assert!(Type::INT.is(Trep::INT));
    assert!(!ival(1).is(Trep::INT));
}

#[test]
#[should_panic(expected = "ival_of")]
fn scalar_accessor_fails_fast() {
    let _ = Type::INT.ival_of();
}

#[test]
fn context_flags_refine_but_do_not_split_equality() {
    let plain_obj = obj_exact(cls("B"));
    let this_obj = set_ctx(obj_exact(cls("B")));
    let plain_cls = sub_cls(cls("B"));
    let this_cls = set_ctx(sub_cls(cls("B")));

    // Plain equality is blind to the flag.
    assert_eq!(plain_obj, this_obj);
    assert_eq!(plain_cls, this_cls);

    // The refinement order observes it.
    assert!(this_obj.more_refined(&plain_obj));
    assert!(!plain_obj.more_refined(&this_obj));
    assert!(!plain_obj.equivalently_refined(&this_obj));
    assert!(this_obj.equivalently_refined(&this_obj));
    assert!(this_cls.strictly_more_refined(&plain_cls));
    assert!(!this_cls.strictly_more_refined(&this_cls));

    // Unrelated exact identities stay incomparable either way.
    let this_bb = set_ctx(obj_exact(cls("BB")));
    assert!(!this_bb.strictly_more_refined(&this_obj));
    assert!(!this_obj.strictly_more_refined(&this_bb));

    // Sub shapes still nest.
    let this_sub_b = set_ctx(sub_obj(cls("B")));
    let this_sub_bb = set_ctx(sub_obj(cls("BB")));
    assert!(this_sub_bb.strictly_more_refined(&this_sub_b));
}

#[test]
fn specific_examples() {
    assert!(!Type::INT.subtype_of(&ival(1)));
    assert!(Type::INIT_CELL.could_be(&ival(1)));
    assert!(ival(2).subtype_of_bits(Trep::INT));
    assert!(!ival(2).subtype_of_bits(Trep::BOOL));
    assert!(Type::INIT_NULL.subtype_of_bits(Trep::INT.opt()));
    assert!(!Type::NULL.subtype_of_bits(Trep::INT.opt()));
    assert!(Type::NULL.could_be_bits(Trep::INT.opt()));
    assert!(ival(3).subtype_of(&opt(ival(3))));
    assert!(Type::INIT_NULL.subtype_of(&opt(ival(3))));
    assert!(!Type::NULL.subtype_of(&opt(ival(3))));
    assert_eq!(intersection_of(Type::CLS_METH, Type::INIT_UNC), Type::CLS_METH);
}

#[test]
fn disjoint_array_specializations_do_not_overlap() {
    let a = atom("A");
    let b = atom("B");
    let specs = vec![
        dict_packedn(Type::INT),
        dict_packedn(Type::STR),
        dict_packed(vec![Type::DBL]),
        dict_packed(vec![Type::BOOL]),
        dict_n(Type::STR, Type::STR),
        dict_n(Type::STR, Type::INT),
        dict_map(map_elems([
            (MapKey::Str(a), MapElem::static_key(Type::DBL)),
            (MapKey::Str(b), MapElem::static_key(Type::BOOL)),
        ])),
        dict_map(map_elems([
            (MapKey::Str(a), MapElem::static_key(Type::OBJ)),
            (MapKey::Str(b), MapElem::static_key(Type::RES)),
        ])),
    ];
    for (i, t1) in specs.iter().enumerate() {
        for (j, t2) in specs.iter().enumerate() {
            if i == j {
                continue;
            }
            assert!(!t1.could_be(t2), "{t1:?} overlaps {t2:?}");

            let t3 = union_of(t1.clone(), Type::from_bits(Trep::DICT_E));
            let t4 = union_of(t2.clone(), Type::from_bits(Trep::DICT_E));
            assert!(t3.could_be(&t4));
            assert!(!t3.subtype_of(&t4));
            assert_eq!(intersection_of(t3, t4), Type::from_bits(Trep::DICT_E));

            let t5 = opt(t1.clone());
            let t6 = opt(t2.clone());
            assert!(t5.could_be(&t6));
            assert!(!t5.subtype_of(&t6));
            assert_eq!(intersection_of(t5, t6), Type::INIT_NULL);
        }
    }
}
