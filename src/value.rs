//! Typed compile-time values.
//!
//! `Value` is the closed sum over the constant-evaluation lanes. Operations
//! that can fail to produce a value (division by a zero constant) return
//! `None`, which callers treat as "unevaluated"; operations outside a
//! variant's vocabulary (bitwise arithmetic on floats, relational operators
//! on complex values, any arithmetic on initializer lists) are internal
//! invariant violations and panic. The checker only invokes an operation
//! after the usual arithmetic conversions have put both operands in the same
//! lane, shifts excepted: a shift count may arrive in either integer lane.
//!
//! Comparisons return the canonical integer booleans `Int64(1)`/`Int64(0)`.

use std::rc::Rc;

use crate::common::intern::StringId;
use crate::float128::Float128;
use crate::operand::Operand;
use crate::types::Type;

/// An initializer-list constant: the braced components of an aggregate
/// initializer together with the aggregate type.
#[derive(Debug, Clone)]
pub struct InitializerValue {
    pub typ: Type,
    pub items: Rc<Vec<Operand>>,
}

impl InitializerValue {
    pub fn is_zero(&self) -> bool {
        !self.items.iter().any(|op| op.is_non_zero())
    }

    pub fn is_non_zero(&self) -> bool {
        self.items.iter().any(|op| op.is_non_zero())
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Int64(i64),
    Uint64(u64),
    Float32(f32),
    Float64(f64),
    Float128(Float128),
    Complex64 { re: f32, im: f32 },
    Complex128 { re: f64, im: f64 },
    Complex256 { re: Float128, im: Float128 },
    String(StringId),
    WideString(StringId),
    Initializer(InitializerValue),
}

pub fn bool_value(b: bool) -> Value {
    Value::Int64(if b { 1 } else { 0 })
}

/// The right operand of a shift is read as a magnitude; counts at or beyond
/// the lane width saturate (zero fill, or sign fill for signed right
/// shifts).
fn shift_count(b: &Value) -> u64 {
    match b {
        Value::Int64(v) => *v as u64,
        Value::Uint64(v) => *v,
        other => panic!("internal error: shift count {:?}", other),
    }
}

impl Value {
    pub fn add(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x.wrapping_add(*y))),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x.wrapping_add(*y))),
            (Value::Float32(x), Value::Float32(y)) => Some(Value::Float32(x + y)),
            (Value::Float64(x), Value::Float64(y)) => Some(Value::Float64(x + y)),
            (Value::Float128(x), Value::Float128(y)) => Some(Value::Float128(x.add(y))),
            (Value::Complex64 { re: a, im: b_ }, Value::Complex64 { re: c, im: d }) => {
                Some(Value::Complex64 { re: a + c, im: b_ + d })
            }
            (Value::Complex128 { re: a, im: b_ }, Value::Complex128 { re: c, im: d }) => {
                Some(Value::Complex128 { re: a + c, im: b_ + d })
            }
            (Value::Complex256 { re: a, im: b_ }, Value::Complex256 { re: c, im: d }) => {
                Some(Value::Complex256 { re: a.add(c), im: b_.add(d) })
            }
            _ => panic!("internal error: add {:?} {:?}", self, b),
        }
    }

    pub fn sub(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x.wrapping_sub(*y))),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x.wrapping_sub(*y))),
            (Value::Float32(x), Value::Float32(y)) => Some(Value::Float32(x - y)),
            (Value::Float64(x), Value::Float64(y)) => Some(Value::Float64(x - y)),
            (Value::Float128(x), Value::Float128(y)) => Some(Value::Float128(x.sub(y))),
            (Value::Complex64 { re: a, im: b_ }, Value::Complex64 { re: c, im: d }) => {
                Some(Value::Complex64 { re: a - c, im: b_ - d })
            }
            (Value::Complex128 { re: a, im: b_ }, Value::Complex128 { re: c, im: d }) => {
                Some(Value::Complex128 { re: a - c, im: b_ - d })
            }
            (Value::Complex256 { re: a, im: b_ }, Value::Complex256 { re: c, im: d }) => {
                Some(Value::Complex256 { re: a.sub(c), im: b_.sub(d) })
            }
            _ => panic!("internal error: sub {:?} {:?}", self, b),
        }
    }

    pub fn mul(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x.wrapping_mul(*y))),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x.wrapping_mul(*y))),
            (Value::Float32(x), Value::Float32(y)) => Some(Value::Float32(x * y)),
            (Value::Float64(x), Value::Float64(y)) => Some(Value::Float64(x * y)),
            (Value::Float128(x), Value::Float128(y)) => Some(Value::Float128(x.mul(y))),
            (Value::Complex64 { re: a, im: b_ }, Value::Complex64 { re: c, im: d }) => {
                Some(Value::Complex64 { re: a * c - b_ * d, im: a * d + b_ * c })
            }
            (Value::Complex128 { re: a, im: b_ }, Value::Complex128 { re: c, im: d }) => {
                Some(Value::Complex128 { re: a * c - b_ * d, im: a * d + b_ * c })
            }
            (Value::Complex256 { re: a, im: b_ }, Value::Complex256 { re: c, im: d }) => {
                Some(Value::Complex256 {
                    re: a.mul(c).sub(&b_.mul(d)),
                    im: a.mul(d).add(&b_.mul(c)),
                })
            }
            _ => panic!("internal error: mul {:?} {:?}", self, b),
        }
    }

    pub fn div(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => {
                if *y == 0 {
                    return None;
                }
                Some(Value::Int64(x.wrapping_div(*y)))
            }
            (Value::Uint64(x), Value::Uint64(y)) => {
                if *y == 0 {
                    return None;
                }
                Some(Value::Uint64(x / y))
            }
            (Value::Float32(x), Value::Float32(y)) => Some(Value::Float32(x / y)),
            (Value::Float64(x), Value::Float64(y)) => Some(Value::Float64(x / y)),
            (Value::Float128(x), Value::Float128(y)) => Some(Value::Float128(x.div(y))),
            (Value::Complex64 { re: a, im: b_ }, Value::Complex64 { re: c, im: d }) => {
                let denom = c * c + d * d;
                Some(Value::Complex64 {
                    re: (a * c + b_ * d) / denom,
                    im: (b_ * c - a * d) / denom,
                })
            }
            (Value::Complex128 { re: a, im: b_ }, Value::Complex128 { re: c, im: d }) => {
                let denom = c * c + d * d;
                Some(Value::Complex128 {
                    re: (a * c + b_ * d) / denom,
                    im: (b_ * c - a * d) / denom,
                })
            }
            (Value::Complex256 { re: a, im: b_ }, Value::Complex256 { re: c, im: d }) => {
                let denom = c.mul(c).add(&d.mul(d));
                Some(Value::Complex256 {
                    re: a.mul(c).add(&b_.mul(d)).div(&denom),
                    im: b_.mul(c).sub(&a.mul(d)).div(&denom),
                })
            }
            _ => panic!("internal error: div {:?} {:?}", self, b),
        }
    }

    pub fn rem(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => {
                if *y == 0 {
                    return None;
                }
                Some(Value::Int64(x.wrapping_rem(*y)))
            }
            (Value::Uint64(x), Value::Uint64(y)) => {
                if *y == 0 {
                    return None;
                }
                Some(Value::Uint64(x % y))
            }
            _ => panic!("internal error: mod {:?} {:?}", self, b),
        }
    }

    pub fn bit_and(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x & y)),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x & y)),
            _ => panic!("internal error: and {:?} {:?}", self, b),
        }
    }

    pub fn bit_or(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x | y)),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x | y)),
            _ => panic!("internal error: or {:?} {:?}", self, b),
        }
    }

    pub fn bit_xor(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(Value::Int64(x ^ y)),
            (Value::Uint64(x), Value::Uint64(y)) => Some(Value::Uint64(x ^ y)),
            _ => panic!("internal error: xor {:?} {:?}", self, b),
        }
    }

    /// Bitwise complement.
    pub fn cpl(&self) -> Option<Value> {
        match self {
            Value::Int64(x) => Some(Value::Int64(!x)),
            Value::Uint64(x) => Some(Value::Uint64(!x)),
            other => panic!("internal error: cpl {:?}", other),
        }
    }

    pub fn lsh(&self, b: &Value) -> Option<Value> {
        let count = shift_count(b);
        match self {
            Value::Int64(x) => {
                Some(Value::Int64(if count >= 64 { 0 } else { x.wrapping_shl(count as u32) }))
            }
            Value::Uint64(x) => {
                Some(Value::Uint64(if count >= 64 { 0 } else { x.wrapping_shl(count as u32) }))
            }
            other => panic!("internal error: lsh {:?}", other),
        }
    }

    pub fn rsh(&self, b: &Value) -> Option<Value> {
        let count = shift_count(b);
        match self {
            Value::Int64(x) => {
                Some(Value::Int64(if count >= 64 { x >> 63 } else { x >> count }))
            }
            Value::Uint64(x) => {
                Some(Value::Uint64(if count >= 64 { 0 } else { x >> count }))
            }
            other => panic!("internal error: rsh {:?}", other),
        }
    }

    pub fn neg(&self) -> Option<Value> {
        match self {
            Value::Int64(x) => Some(Value::Int64(x.wrapping_neg())),
            Value::Uint64(x) => Some(Value::Uint64(x.wrapping_neg())),
            Value::Float32(x) => Some(Value::Float32(-x)),
            Value::Float64(x) => Some(Value::Float64(-x)),
            Value::Float128(x) => Some(Value::Float128(x.neg())),
            Value::Complex64 { re, im } => Some(Value::Complex64 { re: -re, im: -im }),
            Value::Complex128 { re, im } => Some(Value::Complex128 { re: -re, im: -im }),
            Value::Complex256 { re, im } => {
                Some(Value::Complex256 { re: re.neg(), im: im.neg() })
            }
            other => panic!("internal error: neg {:?}", other),
        }
    }

    pub fn eq(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => Some(bool_value(x == y)),
            (Value::Uint64(x), Value::Uint64(y)) => Some(bool_value(x == y)),
            (Value::Float32(x), Value::Float32(y)) => Some(bool_value(x == y)),
            (Value::Float64(x), Value::Float64(y)) => Some(bool_value(x == y)),
            (Value::Float128(x), Value::Float128(y)) => {
                Some(bool_value(x.partial_cmp(y) == Some(std::cmp::Ordering::Equal)))
            }
            (Value::Complex64 { re: a, im: b_ }, Value::Complex64 { re: c, im: d }) => {
                Some(bool_value(a == c && b_ == d))
            }
            (Value::Complex128 { re: a, im: b_ }, Value::Complex128 { re: c, im: d }) => {
                Some(bool_value(a == c && b_ == d))
            }
            (Value::Complex256 { re: a, im: b_ }, Value::Complex256 { re: c, im: d }) => {
                let eq = a.partial_cmp(c) == Some(std::cmp::Ordering::Equal)
                    && b_.partial_cmp(d) == Some(std::cmp::Ordering::Equal);
                Some(bool_value(eq))
            }
            (Value::String(x), Value::String(y)) => Some(bool_value(x == y)),
            (Value::WideString(x), Value::WideString(y)) => Some(bool_value(x == y)),
            _ => panic!("internal error: eq {:?} {:?}", self, b),
        }
    }

    pub fn neq(&self, b: &Value) -> Option<Value> {
        match (self, b) {
            (Value::Float128(x), Value::Float128(y)) => {
                // NaN on either side: not equal is still delivered as false.
                Some(bool_value(
                    matches!(x.partial_cmp(y), Some(o) if o != std::cmp::Ordering::Equal),
                ))
            }
            _ => match self.eq(b)? {
                Value::Int64(v) => Some(bool_value(v == 0)),
                _ => unreachable!(),
            },
        }
    }

    pub fn lt(&self, b: &Value) -> Option<Value> {
        self.relational(b, "lt", |o| o == std::cmp::Ordering::Less)
    }

    pub fn le(&self, b: &Value) -> Option<Value> {
        self.relational(b, "le", |o| o != std::cmp::Ordering::Greater)
    }

    pub fn gt(&self, b: &Value) -> Option<Value> {
        self.relational(b, "gt", |o| o == std::cmp::Ordering::Greater)
    }

    pub fn ge(&self, b: &Value) -> Option<Value> {
        self.relational(b, "ge", |o| o != std::cmp::Ordering::Less)
    }

    fn relational(
        &self,
        b: &Value,
        op: &str,
        accept: impl Fn(std::cmp::Ordering) -> bool,
    ) -> Option<Value> {
        let ordering = match (self, b) {
            (Value::Int64(x), Value::Int64(y)) => x.partial_cmp(y),
            (Value::Uint64(x), Value::Uint64(y)) => x.partial_cmp(y),
            (Value::Float32(x), Value::Float32(y)) => x.partial_cmp(y),
            (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(y),
            (Value::Float128(x), Value::Float128(y)) => x.partial_cmp(y),
            (Value::String(x), Value::String(y)) => x.resolve().partial_cmp(&y.resolve()),
            (Value::WideString(x), Value::WideString(y)) => {
                x.resolve().partial_cmp(&y.resolve())
            }
            _ => panic!("internal error: {} {:?} {:?}", op, self, b),
        };
        Some(bool_value(ordering.is_some_and(accept)))
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Value::Int64(x) => *x == 0,
            Value::Uint64(x) => *x == 0,
            Value::Float32(x) => *x == 0.0,
            Value::Float64(x) => *x == 0.0,
            Value::Float128(x) => x.is_zero(),
            Value::Complex64 { re, im } => *re == 0.0 && *im == 0.0,
            Value::Complex128 { re, im } => *re == 0.0 && *im == 0.0,
            Value::Complex256 { re, im } => re.is_zero() && im.is_zero(),
            Value::String(_) | Value::WideString(_) => false,
            Value::Initializer(init) => init.is_zero(),
        }
    }

    pub fn is_non_zero(&self) -> bool {
        match self {
            Value::Int64(x) => *x != 0,
            Value::Uint64(x) => *x != 0,
            Value::Float32(x) => *x != 0.0,
            Value::Float64(x) => *x != 0.0,
            Value::Float128(x) => x.is_non_zero(),
            Value::Complex64 { re, im } => *re != 0.0 || *im != 0.0,
            Value::Complex128 { re, im } => *re != 0.0 || *im != 0.0,
            Value::Complex256 { re, im } => re.is_non_zero() || im.is_non_zero(),
            Value::String(_) | Value::WideString(_) => true,
            Value::Initializer(init) => init.is_non_zero(),
        }
    }
}
