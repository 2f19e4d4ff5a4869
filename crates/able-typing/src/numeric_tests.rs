use able_syntax::{FloatKind, IntegerKind};
use num_bigint::BigInt;

use crate::numeric::{
    integer_max, integer_min, literal_fits, promote_floats, promote_integers, range_contains,
};

#[test]
fn same_signedness_keeps_the_wider_operand() {
    assert_eq!(promote_integers(IntegerKind::U8, IntegerKind::U32), Ok(IntegerKind::U32));
    assert_eq!(promote_integers(IntegerKind::I64, IntegerKind::I16), Ok(IntegerKind::I64));
    assert_eq!(promote_integers(IntegerKind::I128, IntegerKind::I128), Ok(IntegerKind::I128));
}

#[test]
fn mixed_signedness_takes_one_extra_bit() {
    assert_eq!(promote_integers(IntegerKind::I8, IntegerKind::U16), Ok(IntegerKind::I32));
    assert_eq!(promote_integers(IntegerKind::U8, IntegerKind::I8), Ok(IntegerKind::I16));
    assert_eq!(promote_integers(IntegerKind::U32, IntegerKind::I64), Ok(IntegerKind::I64));
    assert_eq!(promote_integers(IntegerKind::U64, IntegerKind::I8), Ok(IntegerKind::I128));
}

#[test]
fn widest_unsigned_operand_absorbs_a_narrower_signed_one() {
    assert_eq!(promote_integers(IntegerKind::U128, IntegerKind::I32), Ok(IntegerKind::U128));
    assert_eq!(promote_integers(IntegerKind::I64, IntegerKind::U128), Ok(IntegerKind::U128));
}

#[test]
fn promotion_past_128_bits_is_an_error() {
    let err = promote_integers(IntegerKind::I128, IntegerKind::U64)
        .expect_err("no width holds both operands");
    assert_eq!(err.required_bits, 129);
    insta::assert_snapshot!(
        err.to_string(),
        @"integer operands i128 and u64 require 129 bits, exceeding available widths"
    );
    assert!(promote_integers(IntegerKind::U8, IntegerKind::I128).is_err());
}

#[test]
fn promotion_is_commutative() {
    for left in IntegerKind::ALL {
        for right in IntegerKind::ALL {
            let forward = promote_integers(left, right).ok();
            let backward = promote_integers(right, left).ok();
            assert_eq!(forward, backward, "{left} with {right}");
        }
    }
}

#[test]
fn floats_promote_to_f64_when_either_side_is_f64() {
    assert_eq!(promote_floats(FloatKind::F32, FloatKind::F32), FloatKind::F32);
    assert_eq!(promote_floats(FloatKind::F32, FloatKind::F64), FloatKind::F64);
    assert_eq!(promote_floats(FloatKind::F64, FloatKind::F32), FloatKind::F64);
}

#[test]
fn literal_bounds_follow_the_kind() {
    assert_eq!(integer_min(IntegerKind::I8), BigInt::from(-128));
    assert_eq!(integer_max(IntegerKind::U8), BigInt::from(255));
    assert_eq!(integer_max(IntegerKind::U64), BigInt::from(u64::MAX));
    assert!(literal_fits(&BigInt::from(255), IntegerKind::U8));
    assert!(!literal_fits(&BigInt::from(300), IntegerKind::U8));
    assert!(!literal_fits(&BigInt::from(-1), IntegerKind::U128));
    assert!(literal_fits(&BigInt::from(i128::MIN), IntegerKind::I128));
}

#[test]
fn range_containment_respects_sign() {
    assert!(range_contains(IntegerKind::I16, IntegerKind::U8));
    assert!(!range_contains(IntegerKind::I16, IntegerKind::U16));
    assert!(!range_contains(IntegerKind::U64, IntegerKind::I8));
    assert!(range_contains(IntegerKind::I128, IntegerKind::U64));
}
