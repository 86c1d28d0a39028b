//! Expression operands and the C11 conversion procedures.
//!
//! An `Operand` is what the checker attaches to every expression node: a
//! type, an optional compile-time value, a byte offset, and an optional
//! l-value or function-designator binding into the declarator arena.
//!
//! `normalize` canonicalizes integer values to the declared size and
//! signedness (signed types store `Int64`, unsigned store `Uint64`, upper
//! bits masked or sign-extended). `convert_to` implements the full
//! conversion matrix: integer rewrapping, saturating float-to-integer
//! conversion, NaN-preserving float widening/narrowing through the 128-bit
//! lane, real-to-complex with +0 imaginary, array decay, and pointer
//! round-trips. `usual_arithmetic_conversions` is the C11 6.3.1.8 procedure.

use num::bigint::BigInt;
use num::rational::BigRational;
use num_traits::ToPrimitive;

use crate::common::source::Span;
use crate::context::{Context, DeclId, Linkage};
use crate::float128::Float128;
use crate::types::{conversion_rank, integer_promotion, Kind, Type};
use crate::value::Value;

/// How an operand is bound to a declarator, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Binding {
    #[default]
    None,
    /// An l-value, designating the given declarator when known.
    LValue(Option<DeclId>),
    /// A function designator.
    FuncDesignator(DeclId),
}

#[derive(Debug, Clone)]
pub struct Operand {
    pub typ: Type,
    pub value: Option<Value>,
    pub offset: u64,
    pub binding: Binding,
}

impl Operand {
    /// The no-operand sentinel: type `Invalid`, no value.
    pub fn none() -> Operand {
        Operand { typ: Type::Invalid, value: None, offset: 0, binding: Binding::None }
    }

    pub fn new(typ: Type) -> Operand {
        Operand { typ, value: None, offset: 0, binding: Binding::None }
    }

    pub fn with_value(typ: Type, value: Value) -> Operand {
        Operand { typ, value: Some(value), offset: 0, binding: Binding::None }
    }

    pub fn lvalue(typ: Type, decl: Option<DeclId>) -> Operand {
        Operand { typ, value: None, offset: 0, binding: Binding::LValue(decl) }
    }

    pub fn is_lvalue(&self) -> bool {
        matches!(self.binding, Binding::LValue(_))
    }

    pub fn declarator(&self) -> Option<DeclId> {
        match self.binding {
            Binding::LValue(d) => d,
            Binding::FuncDesignator(d) => Some(d),
            Binding::None => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_zero())
    }

    pub fn is_non_zero(&self) -> bool {
        self.value.as_ref().is_some_and(|v| v.is_non_zero())
    }

    /// A constant operand: it has a value, or it designates something with
    /// linkage or static storage (an address constant).
    pub fn is_const(&self, ctx: &Context) -> bool {
        if self.value.is_some() {
            return true;
        }
        match self.binding {
            Binding::FuncDesignator(_) => true,
            Binding::LValue(Some(d)) => {
                let info = ctx.decl(d);
                info.linkage != Linkage::None || info.is_static()
            }
            _ => false,
        }
    }

    /// Canonicalize the stored value to the operand's type.
    ///
    /// Integer operands are rewrapped into the lane matching the type's
    /// signedness and masked or sign-extended to the declared size. Other
    /// kinds assert their expected lane; the unsupported `_Complex` integer
    /// kinds diagnose and yield the no-operand sentinel.
    pub fn normalize(mut self, ctx: &mut Context, span: Span) -> Operand {
        if self.typ.kind() == Kind::Invalid {
            return self;
        }

        if self.typ.is_integer() {
            self.value = match (self.value.take(), self.typ.is_signed()) {
                (Some(Value::Uint64(x)), true) => Some(Value::Int64(x as i64)),
                (Some(Value::Int64(x)), false) => Some(Value::Uint64(x as u64)),
                (v, _) => v,
            };
            let size = self.typ.size();
            match &mut self.value {
                Some(Value::Int64(x)) => *x = convert_int64(*x, size),
                Some(Value::Uint64(x)) => match size {
                    1 => *x &= 0xff,
                    2 => *x &= 0xffff,
                    4 => *x &= 0xffff_ffff,
                    _ => {}
                },
                Some(Value::Initializer(_)) | None => {}
                Some(other) => panic!("internal error: normalize {:?} as {}", other, self.typ),
            }
            return self;
        }

        match self.typ.kind() {
            Kind::ComplexFloat => match self.value {
                Some(Value::Complex64 { .. }) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::ComplexDouble => match self.value {
                Some(Value::Complex128 { .. }) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::ComplexLongDouble => match self.value {
                Some(Value::Complex256 { .. }) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::Float | Kind::Float16 | Kind::Float32 => match self.value {
                Some(Value::Float32(_)) | Some(Value::Initializer(_)) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::Double | Kind::Float64 => match self.value {
                Some(Value::Float64(_)) | Some(Value::Initializer(_)) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::LongDouble | Kind::Float128 => match self.value {
                Some(Value::Float128(_)) | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::Ptr => match self.value {
                Some(Value::Int64(_))
                | Some(Value::Uint64(_))
                | Some(Value::Initializer(_))
                | Some(Value::String(_))
                | Some(Value::WideString(_))
                | None => self,
                _ => panic!("internal error: normalize {}", self.typ),
            },
            Kind::Array | Kind::Void | Kind::Function | Kind::Struct | Kind::Union => self,
            k if k.is_complex_integer() => {
                ctx.err(span, format!("unsupported type: {}", self.typ));
                Operand::none()
            }
            k => panic!("internal error: normalize kind {}", k),
        }
    }

    /// Integer promotion of this operand (C11 6.3.1.1-2). The operand is
    /// converted only when the promotion changes its kind.
    pub fn integer_promotion(&self, ctx: &mut Context, span: Span) -> Operand {
        let promoted = integer_promotion(&ctx.cfg.abi, &self.typ);
        if promoted.kind() != self.typ.kind() {
            self.convert_to(ctx, span, &promoted)
        } else {
            self.clone()
        }
    }

    /// Convert this operand to type `to`, converting the carried value.
    pub fn convert_to(&self, ctx: &mut Context, span: Span, to: &Type) -> Operand {
        if self.typ.kind() == Kind::Invalid {
            return self.clone();
        }

        let binding = match self.binding {
            Binding::FuncDesignator(d) => Binding::LValue(Some(d)),
            b => b,
        };
        let r = Operand {
            typ: to.clone(),
            value: self.value.clone(),
            offset: self.offset,
            binding,
        };
        if r.value.is_none() {
            return r;
        }
        if self.typ.kind() == to.kind() {
            return r.normalize(ctx, span);
        }
        if self.typ.is_integer() {
            return self.convert_from_int(ctx, span, to, binding);
        }
        if to.is_integer() {
            return self.convert_to_int(ctx, span, to, binding);
        }
        if to.kind() == Kind::Void {
            return Operand { typ: to.clone(), value: None, offset: self.offset, binding };
        }

        if let (Some(from_class), Some(to_class)) =
            (FloatClass::of(self.typ.kind()), FloatClass::of(to.kind()))
        {
            let value = convert_float_value(self.value.as_ref().unwrap(), from_class, to_class);
            return Operand { typ: to.clone(), value: Some(value), offset: self.offset, binding }
                .normalize(ctx, span);
        }

        match (self.typ.kind(), to.kind()) {
            // Array-to-pointer decay: the value is unchanged.
            (Kind::Array, Kind::Ptr) => r,
            (from, into) => panic!("internal error: conversion {} -> {}", from, into),
        }
    }

    /// Conversion of a valued integer operand to any target type.
    fn convert_from_int(&self, ctx: &mut Context, span: Span, to: &Type, binding: Binding) -> Operand {
        let v: u64 = match &self.value {
            Some(Value::Int64(x)) => *x as u64,
            Some(Value::Uint64(x)) => *x,
            _ => {
                ctx.err(span, "conversion of integer: invalid value");
                return Operand::new(to.clone());
            }
        };

        if to.is_integer() {
            // 128-bit integer targets are outside the 64-bit value lanes.
            if to.size() > 8 {
                return Operand::new(to.clone());
            }
            let value =
                if to.is_signed() { Value::Int64(v as i64) } else { Value::Uint64(v) };
            return Operand { typ: to.clone(), value: Some(value), offset: self.offset, binding }
                .normalize(ctx, span);
        }

        let signed_src = self.typ.is_signed();
        let as_f64 = if signed_src { v as i64 as f64 } else { v as f64 };
        let value = match to.kind() {
            Kind::ComplexFloat => Value::Complex64 { re: as_f64 as f32, im: 0.0 },
            Kind::ComplexDouble => Value::Complex128 { re: as_f64, im: 0.0 },
            Kind::ComplexLongDouble => {
                let re = if signed_src {
                    Float128::from_i64(v as i64)
                } else {
                    Float128::from_u64(v)
                };
                Value::Complex256 { re, im: Float128::zero() }
            }
            Kind::Float | Kind::Float16 | Kind::Float32 => Value::Float32(as_f64 as f32),
            Kind::Double | Kind::Float64 => Value::Float64(as_f64),
            Kind::LongDouble | Kind::Float128 => {
                let x = if signed_src {
                    Float128::from_i64(v as i64)
                } else {
                    Float128::from_u64(v)
                };
                Value::Float128(x)
            }
            Kind::Ptr => Value::Uint64(v),
            Kind::Struct | Kind::Union | Kind::Void => return Operand::new(to.clone()),
            k => panic!("internal error: integer conversion to {}", k),
        };
        Operand { typ: to.clone(), value: Some(value), offset: self.offset, binding }
            .normalize(ctx, span)
    }

    /// Conversion of a valued non-integer operand to an integer type.
    /// Float sources saturate per the configured limits; pointers
    /// reinterpret their underlying integer.
    fn convert_to_int(&self, ctx: &mut Context, span: Span, to: &Type, binding: Binding) -> Operand {
        let v = self.value.clone().expect("internal error: convert_to_int without value");
        if to.size() > 8 {
            // 128-bit integer targets are outside the 64-bit value lanes.
            return Operand::new(to.clone());
        }

        match FloatClass::of(self.typ.kind()) {
            Some(FloatClass::F32) | Some(FloatClass::F64) | Some(FloatClass::C64)
            | Some(FloatClass::C128) => {
                let f = match v {
                    Value::Float32(x) => x as f64,
                    Value::Float64(x) => x,
                    // A complex source converts through its real part.
                    Value::Complex64 { re, .. } => re as f64,
                    Value::Complex128 { re, .. } => re,
                    other => panic!("internal error: convert_to_int {:?}", other),
                };
                saturate_f64(ctx, span, f, to)
            }
            Some(FloatClass::F128) | Some(FloatClass::C256) => {
                let x = match v {
                    Value::Float128(x) => x,
                    Value::Complex256 { re, .. } => re,
                    other => panic!("internal error: convert_to_int {:?}", other),
                };
                saturate_f128(ctx, span, &x, to)
            }
            None => match self.typ.kind() {
                Kind::Ptr => {
                    let bits = match v {
                        Value::Int64(x) => x as u64,
                        Value::Uint64(x) => x,
                        Value::Initializer(_) | Value::String(_) | Value::WideString(_) => {
                            return Operand::new(to.clone());
                        }
                        other => panic!("internal error: pointer value {:?}", other),
                    };
                    let value = if to.is_signed() {
                        Value::Int64(bits as i64)
                    } else {
                        Value::Uint64(bits)
                    };
                    Operand { typ: to.clone(), value: Some(value), offset: self.offset, binding }
                        .normalize(ctx, span)
                }
                Kind::Array => Operand::new(to.clone()),
                k => panic!("internal error: conversion {} -> {}", k, to),
            },
        }
    }
}

/// Mask or sign-extend a signed lane value to the declared size. Sizes
/// beyond 8 bytes pass through unchanged.
fn convert_int64(n: i64, size: u64) -> i64 {
    match size {
        1 => {
            if (n as i8) < 0 {
                n | !0xff
            } else {
                n & 0xff
            }
        }
        2 => {
            if (n as i16) < 0 {
                n | !0xffff
            } else {
                n & 0xffff
            }
        }
        4 => {
            if (n as i32) < 0 {
                n | !0xffff_ffff
            } else {
                n & 0xffff_ffff
            }
        }
        _ => n,
    }
}

/// Clamp-and-truncate limits for float-to-signed conversion. `fmin`/`fmax`
/// are the outermost representable doubles strictly inside the integer
/// range; values beyond them clamp to `min`/`max`.
fn signed_limits(size: u64, exact: bool) -> (f64, f64, i64, i64) {
    match size {
        1 => ((i8::MIN as f64).next_up(), (i8::MAX as f64).next_down(), i8::MIN as i64, i8::MAX as i64),
        2 => ((i16::MIN as f64).next_up(), (i16::MAX as f64).next_down(), i16::MIN as i64, i16::MAX as i64),
        4 => ((i32::MIN as f64).next_up(), (i32::MAX as f64).next_down(), i32::MIN as i64, i32::MAX as i64),
        8 => {
            // The size-8 lower clamp is i32::MIN unless exact saturation is
            // configured; see DESIGN.md.
            let min = if exact { i64::MIN } else { i32::MIN as i64 };
            ((i64::MIN as f64).next_up(), (i64::MAX as f64).next_down(), min, i64::MAX)
        }
        _ => panic!("internal error: saturation limits for size {}", size),
    }
}

fn unsigned_limits(size: u64) -> (f64, u64) {
    match size {
        1 => ((u8::MAX as f64).next_down(), u8::MAX as u64),
        2 => ((u16::MAX as f64).next_down(), u16::MAX as u64),
        4 => ((u32::MAX as f64).next_down(), u32::MAX as u64),
        8 => ((u64::MAX as f64).next_down(), u64::MAX),
        _ => panic!("internal error: saturation limits for size {}", size),
    }
}

fn saturate_f64(ctx: &mut Context, span: Span, f: f64, to: &Type) -> Operand {
    let value = if to.is_signed() {
        let (fmin, fmax, min, max) = signed_limits(to.size(), ctx.cfg.exact_float_saturation);
        if f > fmax {
            Value::Int64(max)
        } else if f < fmin {
            Value::Int64(min)
        } else {
            Value::Int64(f as i64)
        }
    } else {
        let (fmax, max) = unsigned_limits(to.size());
        if f > fmax {
            Value::Uint64(max)
        } else if f < 0.0 {
            Value::Uint64(0)
        } else {
            Value::Uint64(f as u64)
        }
    };
    Operand::with_value(to.clone(), value).normalize(ctx, span)
}

/// Saturating conversion from the exact 128-bit lane. NaN yields a
/// value-less operand.
fn saturate_f128(ctx: &mut Context, span: Span, x: &Float128, to: &Type) -> Operand {
    let Some(r) = x.rational() else {
        return Operand::new(to.clone());
    };
    let value = if to.is_signed() {
        let (_, _, min, max) = signed_limits(to.size(), ctx.cfg.exact_float_saturation);
        if *r > BigRational::from_integer(BigInt::from(max)) {
            Value::Int64(max)
        } else if *r < BigRational::from_integer(BigInt::from(min)) {
            Value::Int64(min)
        } else {
            Value::Int64(r.trunc().to_integer().to_i64().unwrap_or(0))
        }
    } else {
        let (_, max) = unsigned_limits(to.size());
        if *r > BigRational::from_integer(BigInt::from(max)) {
            Value::Uint64(max)
        } else if *r < BigRational::from_integer(BigInt::from(0)) {
            Value::Uint64(0)
        } else {
            Value::Uint64(r.trunc().to_integer().to_u64().unwrap_or(0))
        }
    };
    Operand::with_value(to.clone(), value).normalize(ctx, span)
}

/// The value-lane classes of the floating and complex kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FloatClass {
    F32,
    F64,
    F128,
    C64,
    C128,
    C256,
}

impl FloatClass {
    fn of(kind: Kind) -> Option<FloatClass> {
        match kind {
            Kind::Float | Kind::Float16 | Kind::Float32 => Some(FloatClass::F32),
            Kind::Double | Kind::Float64 => Some(FloatClass::F64),
            Kind::LongDouble | Kind::Float128 => Some(FloatClass::F128),
            Kind::ComplexFloat => Some(FloatClass::C64),
            Kind::ComplexDouble => Some(FloatClass::C128),
            Kind::ComplexLongDouble => Some(FloatClass::C256),
            _ => None,
        }
    }
}

/// Convert a float/complex value between lane classes. Complex-to-real
/// takes the real part; real-to-complex sets a +0 imaginary component
/// (except that a NaN in the 128-bit lane makes both components NaN).
/// NaN survives every path; f32/f64 transitions are direct so infinities
/// survive those as well.
fn convert_float_value(v: &Value, _from: FloatClass, to: FloatClass) -> Value {
    let (re64, im64): (f64, f64) = match v {
        Value::Float32(x) => (*x as f64, 0.0),
        Value::Float64(x) => (*x, 0.0),
        Value::Float128(x) => (x.to_f64(), 0.0),
        Value::Complex64 { re, im } => (*re as f64, *im as f64),
        Value::Complex128 { re, im } => (*re, *im),
        Value::Complex256 { re, im } => (re.to_f64(), im.to_f64()),
        other => panic!("internal error: float conversion of {:?}", other),
    };
    let re128 = || match v {
        Value::Float128(x) => x.clone(),
        Value::Complex256 { re, .. } => re.clone(),
        _ => Float128::from_f64(re64),
    };
    let im128 = || match v {
        Value::Complex256 { im, .. } => im.clone(),
        Value::Float128(x) if x.is_nan() => Float128::nan(),
        _ => Float128::from_f64(im64),
    };
    match to {
        FloatClass::F32 => Value::Float32(re64 as f32),
        FloatClass::F64 => Value::Float64(re64),
        FloatClass::F128 => Value::Float128(re128()),
        FloatClass::C64 => Value::Complex64 { re: re64 as f32, im: im64 as f32 },
        FloatClass::C128 => Value::Complex128 { re: re64, im: im64 },
        FloatClass::C256 => Value::Complex256 { re: re128(), im: im128() },
    }
}

/// The usual arithmetic conversions (C11 6.3.1.8): bring two arithmetic
/// operands to a common real type, complex if either operand is complex.
///
/// Panics if either operand is non-arithmetic; the callers only reach this
/// after checking. An `Invalid` operand type on either side turns both
/// results into the no-operand sentinel.
pub fn usual_arithmetic_conversions(
    ctx: &mut Context,
    span: Span,
    a: &Operand,
    b: &Operand,
) -> (Operand, Operand) {
    if a.typ.kind() == Kind::Invalid || b.typ.kind() == Kind::Invalid {
        return (Operand::none(), Operand::none());
    }
    if !a.typ.is_arithmetic() || !b.typ.is_arithmetic() {
        panic!("internal error: usual arithmetic conversions on {} and {}", a.typ, b.typ);
    }

    let a = a.clone().normalize(ctx, span);
    let b = b.clone().normalize(ctx, span);
    if a.typ.kind() == Kind::Invalid || b.typ.kind() == Kind::Invalid {
        return (Operand::none(), Operand::none());
    }

    let cplx = a.typ.is_complex() || b.typ.is_complex();

    // The real-type ladder: long double, then double, then float. Each step
    // converts both operands, staying complex when either side is.
    let float_rung = |k: Kind| match k {
        Kind::LongDouble | Kind::ComplexLongDouble | Kind::Float128 => 3,
        Kind::Double | Kind::ComplexDouble | Kind::Float64 => 2,
        Kind::Float | Kind::ComplexFloat | Kind::Float16 | Kind::Float32 => 1,
        _ => 0,
    };
    let rung = float_rung(a.typ.kind()).max(float_rung(b.typ.kind()));
    if rung > 0 {
        let target = match (rung, cplx) {
            (3, true) => Kind::ComplexLongDouble,
            (3, false) => Kind::LongDouble,
            (2, true) => Kind::ComplexDouble,
            (2, false) => Kind::Double,
            (_, true) => Kind::ComplexFloat,
            (_, false) => Kind::Float,
        };
        let t = ctx.cfg.abi.kind_type(target);
        return (a.convert_to(ctx, span, &t), b.convert_to(ctx, span, &t));
    }

    if !a.typ.is_integer() || !b.typ.is_integer() {
        panic!("internal error: usual arithmetic conversions on {} and {}", a.typ, b.typ);
    }

    // Otherwise, the integer promotions are performed on both operands.
    let a = a.integer_promotion(ctx, span);
    let b = b.integer_promotion(ctx, span);
    let at = a.typ.kind();
    let bt = b.typ.kind();

    // If both operands have the same type, no further conversion is needed.
    if at == bt {
        return (a, b);
    }

    let a_signed = ctx.cfg.abi.is_signed_integer(at);
    let b_signed = ctx.cfg.abi.is_signed_integer(bt);

    // Same signedness: the lesser rank converts to the greater.
    if a_signed == b_signed {
        let t = if conversion_rank(bt) > conversion_rank(at) { b.typ.clone() } else { a.typ.clone() };
        let a = a.convert_to(ctx, span, &t);
        let b = b.convert_to(ctx, span, &t);
        return (a, b);
    }

    // Unsigned side with rank >= signed side: signed converts to unsigned.
    if a_signed {
        if conversion_rank(bt) >= conversion_rank(at) {
            let t = b.typ.clone();
            return (a.convert_to(ctx, span, &t), b);
        }
    } else if conversion_rank(at) >= conversion_rank(bt) {
        let t = a.typ.clone();
        let b = b.convert_to(ctx, span, &t);
        return (a, b);
    }

    // Signed side can represent every unsigned value: unsigned converts.
    let signed_kind = if a_signed { at } else { bt };
    if a_signed {
        if a.typ.size() > b.typ.size() {
            let t = a.typ.clone();
            let b = b.convert_to(ctx, span, &t);
            return (a, b);
        }
    } else if b.typ.size() > a.typ.size() {
        let t = b.typ.clone();
        return (a.convert_to(ctx, span, &t), b);
    }

    // Otherwise both convert to the unsigned counterpart of the signed type.
    let target = match signed_kind {
        Kind::Int | Kind::Enum => Kind::UInt,
        Kind::Long => Kind::ULong,
        Kind::LongLong => Kind::ULongLong,
        k => panic!("internal error: no unsigned counterpart for {}", k),
    };
    let t = ctx.cfg.abi.kind_type(target);
    (a.convert_to(ctx, span, &t), b.convert_to(ctx, span, &t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::context::Config;

    fn ctx() -> Context {
        Context::new(Config::new(Abi::linux_amd64())).unwrap()
    }

    fn int_op(ctx: &Context, kind: Kind, v: i64) -> Operand {
        let typ = ctx.cfg.abi.kind_type(kind);
        if typ.is_signed() {
            Operand::with_value(typ, Value::Int64(v))
        } else {
            Operand::with_value(typ, Value::Uint64(v as u64))
        }
    }

    #[test]
    fn test_uac_int_plus_unsigned() {
        // (1 + 2U) -> unsigned int 3
        let mut ctx = ctx();
        let a = int_op(&ctx, Kind::Int, 1);
        let b = int_op(&ctx, Kind::UInt, 2);
        let (a, b) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
        assert_eq!(a.typ.kind(), Kind::UInt);
        assert_eq!(b.typ.kind(), Kind::UInt);
        let sum = a.value.unwrap().add(&b.value.unwrap());
        assert!(matches!(sum, Some(Value::Uint64(3))));
    }

    #[test]
    fn test_uac_long_plus_unsigned() {
        // (1L + 2U) with 8-byte long, 4-byte unsigned -> long 3
        let mut ctx = ctx();
        let a = int_op(&ctx, Kind::Long, 1);
        let b = int_op(&ctx, Kind::UInt, 2);
        let (a, b) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
        assert_eq!(a.typ.kind(), Kind::Long);
        assert_eq!(b.typ.kind(), Kind::Long);
        let sum = a.value.unwrap().add(&b.value.unwrap());
        assert!(matches!(sum, Some(Value::Int64(3))));
    }

    #[test]
    fn test_uac_unsigned_plus_unsigned_long() {
        // (1U + 2UL) -> unsigned long 3
        let mut ctx = ctx();
        let a = int_op(&ctx, Kind::UInt, 1);
        let b = int_op(&ctx, Kind::ULong, 2);
        let (a, b) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
        assert_eq!(a.typ.kind(), Kind::ULong);
        assert_eq!(b.typ.kind(), Kind::ULong);
        let sum = a.value.unwrap().add(&b.value.unwrap());
        assert!(matches!(sum, Some(Value::Uint64(3))));
    }

    #[test]
    fn test_uac_symmetric_in_kind() {
        let mut ctx = ctx();
        let kinds = [Kind::Char, Kind::Int, Kind::UInt, Kind::Long, Kind::ULong, Kind::LongLong];
        for &ka in &kinds {
            for &kb in &kinds {
                let a = int_op(&ctx, ka, 1);
                let b = int_op(&ctx, kb, 2);
                let (x1, y1) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
                let (x2, y2) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &b, &a);
                assert_eq!(x1.typ.kind(), y2.typ.kind(), "{} vs {}", ka, kb);
                assert_eq!(y1.typ.kind(), x2.typ.kind(), "{} vs {}", ka, kb);
            }
        }
    }

    #[test]
    fn test_uac_float_ladder() {
        let mut ctx = ctx();
        let a = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Float), Value::Float32(1.5));
        let b = int_op(&ctx, Kind::Int, 2);
        let (a, b) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
        assert_eq!(a.typ.kind(), Kind::Float);
        assert_eq!(b.typ.kind(), Kind::Float);
        assert!(matches!(b.value, Some(Value::Float32(v)) if v == 2.0));

        let c = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(0.5));
        let d = Operand::with_value(
            ctx.cfg.abi.kind_type(Kind::ComplexFloat),
            Value::Complex64 { re: 1.0, im: 1.0 },
        );
        let (c, d) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &c, &d);
        assert_eq!(c.typ.kind(), Kind::ComplexDouble);
        assert_eq!(d.typ.kind(), Kind::ComplexDouble);
    }

    #[test]
    fn test_float_to_int_saturation() {
        // (unsigned char)(300.0f) == 255
        let mut ctx = ctx();
        let f = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Float), Value::Float32(300.0));
        let to = ctx.cfg.abi.kind_type(Kind::UChar);
        let r = f.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Uint64(255))));

        // (signed char)(-300.0) == -128
        let d = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(-300.0));
        let to = ctx.cfg.abi.kind_type(Kind::SChar);
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Int64(-128))));

        // (unsigned)(1e20) == 0xFFFFFFFF
        let d = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(1e20));
        let to = ctx.cfg.abi.kind_type(Kind::UInt);
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Uint64(0xffff_ffff))));
    }

    #[test]
    fn test_signed8_saturation_flag() {
        // By default the size-8 signed lower bound clamps to i32::MIN; the
        // exact flag restores i64::MIN.
        let mut ctx = ctx();
        let d = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(-1e30));
        let to = ctx.cfg.abi.kind_type(Kind::Long);
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Int64(v)) if v == i32::MIN as i64));

        ctx.cfg.exact_float_saturation = true;
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Int64(i64::MIN))));
    }

    #[test]
    fn test_truncation_toward_zero() {
        let mut ctx = ctx();
        let to = ctx.cfg.abi.kind_type(Kind::Int);
        let d = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(2.9));
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Int64(2))));
        let d = Operand::with_value(ctx.cfg.abi.kind_type(Kind::Double), Value::Float64(-2.9));
        let r = d.convert_to(&mut ctx, Span::dummy(), &to);
        assert!(matches!(r.value, Some(Value::Int64(-2))));
    }

    #[test]
    fn test_normalize_masks_to_declared_size() {
        let mut ctx = ctx();
        let uchar = ctx.cfg.abi.kind_type(Kind::UChar);
        let op = Operand::with_value(uchar, Value::Uint64(0x1ff)).normalize(&mut ctx, Span::dummy());
        assert!(matches!(op.value, Some(Value::Uint64(0xff))));

        // Signed char sign-extends.
        let schar = ctx.cfg.abi.kind_type(Kind::SChar);
        let op = Operand::with_value(schar, Value::Int64(0xff)).normalize(&mut ctx, Span::dummy());
        assert!(matches!(op.value, Some(Value::Int64(-1))));

        // Lane rewrap: unsigned type holding a signed value.
        let uint = ctx.cfg.abi.kind_type(Kind::UInt);
        let op = Operand::with_value(uint, Value::Int64(-1)).normalize(&mut ctx, Span::dummy());
        assert!(matches!(op.value, Some(Value::Uint64(0xffff_ffff))));
    }

    #[test]
    fn test_normalize_unsupported_complex_integer() {
        let mut ctx = ctx();
        let t = ctx.cfg.abi.kind_type(Kind::ComplexInt);
        let op = Operand::new(t).normalize(&mut ctx, Span::dummy());
        assert_eq!(op.typ.kind(), Kind::Invalid);
        assert!(ctx.diags.has_errors());
        assert!(ctx.diags.diagnostics()[0].message.contains("unsupported type"));
    }

    #[test]
    fn test_int_roundtrip_through_wider_type() {
        // convert_to(convert_to(op, long long), int) recovers the value.
        let mut ctx = ctx();
        let int = ctx.cfg.abi.kind_type(Kind::Int);
        let ll = ctx.cfg.abi.kind_type(Kind::LongLong);
        for v in [-123456789i64, -1, 0, 1, i32::MAX as i64, i32::MIN as i64] {
            let op = Operand::with_value(int.clone(), Value::Int64(v));
            let widened = op.convert_to(&mut ctx, Span::dummy(), &ll);
            let back = widened.convert_to(&mut ctx, Span::dummy(), &int);
            assert!(matches!(back.value, Some(Value::Int64(x)) if x == v), "{}", v);
        }
    }

    #[test]
    fn test_int_to_long_double_exact() {
        let mut ctx = ctx();
        let ll = ctx.cfg.abi.kind_type(Kind::LongLong);
        let ld = ctx.cfg.abi.kind_type(Kind::LongDouble);
        let op = Operand::with_value(ll.clone(), Value::Int64(i64::MAX));
        let wide = op.convert_to(&mut ctx, Span::dummy(), &ld);
        let back = wide.convert_to(&mut ctx, Span::dummy(), &ll);
        assert!(matches!(back.value, Some(Value::Int64(i64::MAX))));
    }

    #[test]
    fn test_nan_preserving_float_conversions() {
        let mut ctx = ctx();
        let double = ctx.cfg.abi.kind_type(Kind::Double);
        let ld = ctx.cfg.abi.kind_type(Kind::LongDouble);
        let nan = Operand::with_value(double.clone(), Value::Float64(f64::NAN));
        let wide = nan.convert_to(&mut ctx, Span::dummy(), &ld);
        match &wide.value {
            Some(Value::Float128(x)) => assert!(x.is_nan()),
            other => panic!("unexpected: {:?}", other),
        }
        let back = wide.convert_to(&mut ctx, Span::dummy(), &double);
        assert!(matches!(back.value, Some(Value::Float64(v)) if v.is_nan()));
    }

    #[test]
    fn test_real_to_complex_zero_imaginary() {
        let mut ctx = ctx();
        let double = ctx.cfg.abi.kind_type(Kind::Double);
        let cd = ctx.cfg.abi.kind_type(Kind::ComplexDouble);
        let op = Operand::with_value(double, Value::Float64(2.5));
        let r = op.convert_to(&mut ctx, Span::dummy(), &cd);
        assert!(matches!(r.value, Some(Value::Complex128 { re, im }) if re == 2.5 && im == 0.0));
    }

    #[test]
    fn test_pointer_int_round_trip() {
        let mut ctx = ctx();
        let int = ctx.cfg.abi.kind_type(Kind::Int);
        let p = ctx.cfg.abi.pointer_to(
            ctx.cfg.abi.kind_type(Kind::Char),
            crate::types::TypeQualifiers::empty(),
        );
        let op = Operand::with_value(int.clone(), Value::Int64(0x1000));
        let as_ptr = op.convert_to(&mut ctx, Span::dummy(), &p);
        assert!(matches!(as_ptr.value, Some(Value::Uint64(0x1000))));
        let ulong = ctx.cfg.abi.kind_type(Kind::ULong);
        let back = as_ptr.convert_to(&mut ctx, Span::dummy(), &ulong);
        assert!(matches!(back.value, Some(Value::Uint64(0x1000))));
    }

    #[test]
    fn test_is_const_through_declarator() {
        use crate::context::{DeclFlags, DeclInfo, Linkage};
        let mut ctx = ctx();
        let int = ctx.cfg.abi.kind_type(Kind::Int);
        let external = ctx.declare(DeclInfo {
            name: crate::common::intern::intern("g"),
            typ: int.clone(),
            linkage: Linkage::External,
            flags: DeclFlags::empty(),
            span: Span::dummy(),
        });
        let local = ctx.declare(DeclInfo {
            name: crate::common::intern::intern("l"),
            typ: int.clone(),
            linkage: Linkage::None,
            flags: DeclFlags::empty(),
            span: Span::dummy(),
        });
        let static_local = ctx.declare(DeclInfo {
            name: crate::common::intern::intern("s"),
            typ: int.clone(),
            linkage: Linkage::None,
            flags: DeclFlags::STATIC,
            span: Span::dummy(),
        });

        assert!(Operand::lvalue(int.clone(), Some(external)).is_const(&ctx));
        assert!(!Operand::lvalue(int.clone(), Some(local)).is_const(&ctx));
        assert!(Operand::lvalue(int.clone(), Some(static_local)).is_const(&ctx));
        // Any valued operand is constant.
        assert!(Operand::with_value(int, Value::Int64(0)).is_const(&ctx));
    }

    #[test]
    fn test_int128_targets_drop_value() {
        let mut ctx = ctx();
        let int = ctx.cfg.abi.kind_type(Kind::Int);
        let i128t = ctx.cfg.abi.kind_type(Kind::Int128);
        let op = Operand::with_value(int, Value::Int64(-1));
        let r = op.convert_to(&mut ctx, Span::dummy(), &i128t);
        assert_eq!(r.typ.kind(), Kind::Int128);
        assert!(r.value.is_none());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_int_kind() -> impl Strategy<Value = Kind> {
            prop::sample::select(vec![
                Kind::Bool,
                Kind::Char,
                Kind::SChar,
                Kind::UChar,
                Kind::Short,
                Kind::UShort,
                Kind::Int,
                Kind::UInt,
                Kind::Long,
                Kind::ULong,
                Kind::LongLong,
                Kind::ULongLong,
            ])
        }

        proptest! {
            // P2: normalize is idempotent.
            #[test]
            fn normalize_idempotent(kind in arb_int_kind(), v in any::<i64>()) {
                let mut ctx = ctx();
                let typ = ctx.cfg.abi.kind_type(kind);
                let op = Operand::with_value(typ, Value::Int64(v));
                let once = op.normalize(&mut ctx, Span::dummy());
                let twice = once.clone().normalize(&mut ctx, Span::dummy());
                match (&once.value, &twice.value) {
                    (Some(Value::Int64(a)), Some(Value::Int64(b))) => prop_assert_eq!(a, b),
                    (Some(Value::Uint64(a)), Some(Value::Uint64(b))) => prop_assert_eq!(a, b),
                    other => prop_assert!(false, "lane change: {:?}", other),
                }
            }

            // P3: the canonical value equals the C-semantic value modulo the
            // declared size.
            #[test]
            fn normalized_value_is_modular(kind in arb_int_kind(), v in any::<i64>()) {
                let mut ctx = ctx();
                let typ = ctx.cfg.abi.kind_type(kind);
                let size = typ.size() as u32;
                let op = Operand::with_value(typ.clone(), Value::Int64(v))
                    .normalize(&mut ctx, Span::dummy());
                match op.value {
                    Some(Value::Int64(x)) => {
                        prop_assert!(typ.is_signed());
                        let bits = 8 * size;
                        if bits < 64 {
                            // Sign-extended reduction of v modulo 2^bits.
                            let expect = (v << (64 - bits)) >> (64 - bits);
                            prop_assert_eq!(x, expect);
                        } else {
                            prop_assert_eq!(x, v);
                        }
                    }
                    Some(Value::Uint64(x)) => {
                        prop_assert!(!typ.is_signed());
                        let bits = 8 * size;
                        let expect = if bits < 64 {
                            (v as u64) & ((1u64 << bits) - 1)
                        } else {
                            v as u64
                        };
                        prop_assert_eq!(x, expect);
                    }
                    ref other => prop_assert!(false, "unexpected {:?}", other),
                }
            }

            // P5: the usual arithmetic conversions are symmetric in kind.
            #[test]
            fn uac_symmetric(ka in arb_int_kind(), kb in arb_int_kind(), x in any::<i64>(), y in any::<i64>()) {
                let mut ctx = ctx();
                let a = Operand::with_value(ctx.cfg.abi.kind_type(ka), Value::Int64(x))
                    .normalize(&mut ctx, Span::dummy());
                let b = Operand::with_value(ctx.cfg.abi.kind_type(kb), Value::Int64(y))
                    .normalize(&mut ctx, Span::dummy());
                let (r1, r2) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &a, &b);
                let (s1, s2) = usual_arithmetic_conversions(&mut ctx, Span::dummy(), &b, &a);
                prop_assert_eq!(r1.typ.kind(), s2.typ.kind());
                prop_assert_eq!(r2.typ.kind(), s1.typ.kind());
                // Both sides land on one common type.
                prop_assert_eq!(r1.typ.kind(), r2.typ.kind());
            }

            // P6: integer promotion is idempotent at the operand level.
            #[test]
            fn promotion_idempotent(kind in arb_int_kind(), v in any::<i64>()) {
                let mut ctx = ctx();
                let op = Operand::with_value(ctx.cfg.abi.kind_type(kind), Value::Int64(v))
                    .normalize(&mut ctx, Span::dummy());
                let once = op.integer_promotion(&mut ctx, Span::dummy());
                let twice = once.integer_promotion(&mut ctx, Span::dummy());
                prop_assert_eq!(once.typ.kind(), twice.typ.kind());
            }
        }
    }
}
