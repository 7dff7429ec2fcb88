use super::*;

#[test]
fn named_unions_are_closed() {
    assert_eq!(Trep::NULL, Trep::UNINIT | Trep::INIT_NULL);
    assert_eq!(Trep::BOOL, Trep::FALSE | Trep::TRUE);
    assert_eq!(Trep::NUM, Trep::INT | Trep::DBL);
    assert_eq!(Trep::STR, Trep::SSTR | Trep::CSTR);
    assert_eq!(Trep::ARR_KEY, Trep::INT | Trep::STR);
    assert_eq!(Trep::UNC_ARR_KEY, Trep::INT | Trep::SSTR);
    assert_eq!(Trep::VECISH, Trep::VEC | Trep::VARR);
    assert_eq!(Trep::DICTISH, Trep::DICT | Trep::DARR);
    assert_eq!(Trep::KVISH, Trep::VECISH | Trep::DICTISH);
    assert_eq!(Trep::ARR_LIKE, Trep::KVISH | Trep::KEYSET);
    assert_eq!(Trep::ARR_LIKE, Trep::ARR_LIKE_E | Trep::ARR_LIKE_N);
    assert_eq!(Trep::ARR_LIKE, Trep::S_ARR_LIKE | Trep::C_ARR_LIKE);
    assert_eq!(Trep::PRIM, Trep::NULL | Trep::BOOL | Trep::NUM);
    assert_eq!(Trep::UNC, Trep::INIT_UNC | Trep::UNINIT);
    assert_eq!(Trep::INIT_CELL, Trep::CELL - Trep::UNINIT);
    assert_eq!(Trep::TOP, Trep::CELL);
}

#[test]
fn every_single_bit_is_a_cell() {
    assert_eq!(Trep::all() & Trep::CELL, Trep::all());
}

#[test]
fn uncounted_membership() {
    assert!(Trep::INT.subtype_of(Trep::INIT_UNC));
    assert!(Trep::SSTR.subtype_of(Trep::INIT_UNC));
    assert!(!Trep::CSTR.could_be(Trep::INIT_UNC));
    assert!(Trep::S_ARR_LIKE.subtype_of(Trep::INIT_UNC));
    assert!(!Trep::C_ARR_LIKE.could_be(Trep::INIT_UNC));
    assert!(Trep::CLS.subtype_of(Trep::INIT_UNC));
    assert!(Trep::LAZY_CLS.subtype_of(Trep::INIT_UNC));
    assert!(Trep::CLS_METH.subtype_of(Trep::INIT_UNC));
    assert!(!Trep::RES.could_be(Trep::UNC));
    assert!(!Trep::OBJ.could_be(Trep::UNC));
    assert!(!Trep::UNINIT.could_be(Trep::INIT_UNC));
    assert!(Trep::UNINIT.subtype_of(Trep::UNC));
}

#[test]
fn prim_excludes_pointerish_kinds() {
    assert!(!Trep::PRIM.could_be(Trep::STR));
    assert!(!Trep::PRIM.could_be(Trep::ARR_LIKE));
    assert!(!Trep::PRIM.could_be(Trep::OBJ | Trep::CLS | Trep::FUNC | Trep::CLS_METH));
    assert!(Trep::NULL.subtype_of(Trep::PRIM));
    assert!(!Trep::UNINIT.could_be(Trep::INIT_PRIM));
}

#[test]
fn subtype_and_could_be_are_masking() {
    let bits = Trep::INT | Trep::SSTR;
    assert!(bits.subtype_of(Trep::UNC_ARR_KEY));
    assert!(bits.subtype_of(Trep::ARR_KEY));
    assert!(!bits.subtype_of(Trep::INT));
    assert!(bits.could_be(Trep::INT));
    assert!(bits.could_be(Trep::STR));
    assert!(!bits.could_be(Trep::DBL));
}

#[test]
fn subtype_among_scopes_the_question() {
    let t = Trep::SVEC_N | Trep::CDICT_N | Trep::INT;
    assert!(t.subtype_among(Trep::SVEC, Trep::VEC));
    assert!(!t.subtype_among(Trep::SDICT, Trep::DICT));
    assert!(t.subtype_among(Trep::ARR_LIKE_N, Trep::ARR_LIKE));
}

#[test]
fn opt_adds_init_null_only() {
    assert_eq!(Trep::INT.opt(), Trep::INT | Trep::INIT_NULL);
    assert_eq!(Trep::INT.opt().opt(), Trep::INT.opt());
    assert!(!Trep::INT.opt().could_be(Trep::UNINIT));
}

#[test]
fn family_slices_partition() {
    for kind in ArrKind::ALL {
        assert_eq!(kind.bits(), kind.empty() | kind.nonempty());
        assert_eq!(
            kind.bits() & Trep::S_ARR_LIKE,
            kind.static_empty() | kind.static_nonempty()
        );
        assert!(kind.bits().subtype_of(Trep::ARR_LIKE));
    }
    let all: Trep = ArrKind::ALL
        .into_iter()
        .fold(Trep::empty(), |acc, k| acc | k.bits());
    assert_eq!(all, Trep::ARR_LIKE);
}

#[test]
fn support_mask_covers_specializable_kinds() {
    assert!(Trep::SUPPORT.could_be(Trep::STR));
    assert!(Trep::SUPPORT.could_be(Trep::ARR_LIKE_N));
    assert!(!Trep::SUPPORT.could_be(Trep::ARR_LIKE_E));
    assert!(!Trep::SUPPORT.could_be(Trep::NULL | Trep::BOOL | Trep::RES | Trep::FUNC));
}
