//! The 128-bit floating lane of the constant evaluator.
//!
//! `long double` constants are evaluated on an arbitrary-precision rational
//! significand with an explicit NaN tag. Every operation is total: a NaN on
//! either side, a zero divisor, or a non-finite `f64` entering the lane all
//! produce the NaN state instead of aborting. Comparisons are tri-valued;
//! both orderings against a NaN are false.

use std::cmp::Ordering;

use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::{Signed, ToPrimitive, Zero};

#[derive(Debug, Clone)]
pub struct Float128 {
    /// The exact value, or `None` for the NaN state.
    n: Option<BigRational>,
}

impl Float128 {
    pub fn nan() -> Self {
        Float128 { n: None }
    }

    pub fn zero() -> Self {
        Float128 { n: Some(BigRational::zero()) }
    }

    /// Enter the lane from `f64`. NaN and the infinities have no rational
    /// representation and collapse to the NaN state.
    pub fn from_f64(v: f64) -> Self {
        Float128 { n: BigRational::from_float(v) }
    }

    pub fn from_f32(v: f32) -> Self {
        Self::from_f64(v as f64)
    }

    pub fn from_i64(v: i64) -> Self {
        Float128 { n: Some(BigRational::from_integer(BigInt::from(v))) }
    }

    pub fn from_u64(v: u64) -> Self {
        Float128 { n: Some(BigRational::from_integer(BigInt::from(v))) }
    }

    pub fn is_nan(&self) -> bool {
        self.n.is_none()
    }

    /// Leave the lane toward `f64`, preserving NaN. Values beyond `f64`
    /// range come back as infinities.
    pub fn to_f64(&self) -> f64 {
        match &self.n {
            None => f64::NAN,
            Some(r) => r.to_f64().unwrap_or(f64::NAN),
        }
    }

    /// The exact rational behind a non-NaN value.
    pub fn rational(&self) -> Option<&BigRational> {
        self.n.as_ref()
    }

    /// Truncate toward zero to an integer, if not NaN.
    pub fn trunc(&self) -> Option<BigInt> {
        self.n.as_ref().map(|r| r.trunc().to_integer())
    }

    fn binop(&self, b: &Float128, f: impl FnOnce(&BigRational, &BigRational) -> Option<BigRational>) -> Float128 {
        match (&self.n, &b.n) {
            (Some(x), Some(y)) => Float128 { n: f(x, y) },
            _ => Float128::nan(),
        }
    }

    pub fn add(&self, b: &Float128) -> Float128 {
        self.binop(b, |x, y| Some(x + y))
    }

    pub fn sub(&self, b: &Float128) -> Float128 {
        self.binop(b, |x, y| Some(x - y))
    }

    pub fn mul(&self, b: &Float128) -> Float128 {
        self.binop(b, |x, y| Some(x * y))
    }

    pub fn div(&self, b: &Float128) -> Float128 {
        self.binop(b, |x, y| if y.is_zero() { None } else { Some(x / y) })
    }

    pub fn neg(&self) -> Float128 {
        Float128 { n: self.n.as_ref().map(|x| -x) }
    }

    /// Tri-valued comparison: `None` when either side is NaN.
    pub fn partial_cmp(&self, b: &Float128) -> Option<Ordering> {
        match (&self.n, &b.n) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        matches!(&self.n, Some(r) if r.is_zero())
    }

    pub fn is_non_zero(&self) -> bool {
        matches!(&self.n, Some(r) if !r.is_zero())
    }

    pub fn is_negative(&self) -> bool {
        matches!(&self.n, Some(r) if r.is_negative())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_arithmetic() {
        let a = Float128::from_f64(0.5);
        let b = Float128::from_f64(0.25);
        assert_eq!(a.add(&b).to_f64(), 0.75);
        assert_eq!(a.sub(&b).to_f64(), 0.25);
        assert_eq!(a.mul(&b).to_f64(), 0.125);
        assert_eq!(a.div(&b).to_f64(), 2.0);
        assert_eq!(a.neg().to_f64(), -0.5);
    }

    #[test]
    fn test_nan_propagation() {
        let nan = Float128::from_f64(0.0 / 0.0);
        assert!(nan.is_nan());
        let one = Float128::from_i64(1);
        assert!(nan.add(&one).is_nan());
        assert!(one.sub(&nan).is_nan());
        assert!(nan.mul(&nan).is_nan());
        assert!(one.div(&Float128::zero()).is_nan());
        assert!(nan.neg().is_nan());
        assert!(nan.to_f64().is_nan());
    }

    #[test]
    fn test_tri_valued_comparison() {
        let nan = Float128::nan();
        let one = Float128::from_i64(1);
        let two = Float128::from_i64(2);
        assert_eq!(one.partial_cmp(&two), Some(Ordering::Less));
        assert_eq!(two.partial_cmp(&one), Some(Ordering::Greater));
        assert_eq!(one.partial_cmp(&one), Some(Ordering::Equal));
        assert_eq!(nan.partial_cmp(&one), None);
        assert_eq!(one.partial_cmp(&nan), None);
    }

    #[test]
    fn test_integer_precision_beyond_f64() {
        // 2^64 + 1 is not representable in f64 but is exact here.
        let big = Float128::from_u64(u64::MAX);
        let one = Float128::from_i64(1);
        let sum = big.add(&one);
        let diff = sum.sub(&big);
        assert_eq!(diff.partial_cmp(&one), Some(Ordering::Equal));
    }

    #[test]
    fn test_zero_predicates() {
        assert!(Float128::zero().is_zero());
        assert!(!Float128::zero().is_non_zero());
        assert!(Float128::from_i64(3).is_non_zero());
        let nan = Float128::nan();
        assert!(!nan.is_zero());
        assert!(!nan.is_non_zero());
    }
}
