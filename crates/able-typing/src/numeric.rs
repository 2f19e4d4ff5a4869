//! Promotion rules for mixed-width arithmetic.

use able_syntax::{FloatKind, IntegerKind};
use num_bigint::BigInt;
use num_traits::{One, Zero};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("integer operands {left} and {right} require {required_bits} bits, exceeding available widths")]
pub struct PromotionError {
    pub left: IntegerKind,
    pub right: IntegerKind,
    pub required_bits: u32,
}

fn smallest_with(signed: bool, bits: u32) -> Option<IntegerKind> {
    IntegerKind::ALL
        .into_iter()
        .filter(|kind| kind.is_signed() == signed && kind.bits() >= bits)
        .min_by_key(|kind| kind.bits())
}

/// Result type of an integer binary operation.
///
/// Same signedness keeps the wider width. Mixed signedness needs one extra bit over the widest
/// operand and takes the smallest signed width that has it. When no signed width is wide enough
/// the unsigned operand is kept if it is at least as wide as the other operand, which only
/// happens for `u128`.
pub fn promote_integers(
    left: IntegerKind,
    right: IntegerKind,
) -> Result<IntegerKind, PromotionError> {
    if left.is_signed() == right.is_signed() {
        let bits = left.bits().max(right.bits());
        return smallest_with(left.is_signed(), bits).ok_or(PromotionError {
            left,
            right,
            required_bits: bits,
        });
    }
    let needed = left.bits().max(right.bits()) + 1;
    if let Some(kind) = smallest_with(true, needed) {
        return Ok(kind);
    }
    let unsigned = if left.is_signed() { right } else { left };
    if unsigned.bits() >= left.bits().max(right.bits()) {
        return Ok(unsigned);
    }
    Err(PromotionError {
        left,
        right,
        required_bits: needed,
    })
}

pub fn promote_floats(left: FloatKind, right: FloatKind) -> FloatKind {
    if left == FloatKind::F64 || right == FloatKind::F64 {
        FloatKind::F64
    } else {
        FloatKind::F32
    }
}

pub fn integer_min(kind: IntegerKind) -> BigInt {
    if kind.is_signed() {
        -(BigInt::one() << (kind.bits() - 1))
    } else {
        BigInt::zero()
    }
}

pub fn integer_max(kind: IntegerKind) -> BigInt {
    if kind.is_signed() {
        (BigInt::one() << (kind.bits() - 1)) - 1
    } else {
        (BigInt::one() << kind.bits()) - 1
    }
}

pub fn literal_fits(value: &BigInt, kind: IntegerKind) -> bool {
    *value >= integer_min(kind) && *value <= integer_max(kind)
}

/// Every value of `narrow` is representable in `wide`.
pub fn range_contains(wide: IntegerKind, narrow: IntegerKind) -> bool {
    integer_min(wide) <= integer_min(narrow) && integer_max(wide) >= integer_max(narrow)
}
