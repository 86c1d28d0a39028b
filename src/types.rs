//! Representation of C types.
//!
//! `Type` is a closed sum over the C11 type categories: scalars carry their
//! ABI-derived size/alignment inline, aggregates share a completion-capable
//! record behind `Rc` (so a tag mentioned before its definition late-binds,
//! including self-referential structs), and qualifiers/bit-fields are thin
//! wrappers that never change the underlying kind.
//!
//! The module also owns the two conversion lattices consumed by the operand
//! layer: integer conversion rank and integer promotion (C11 6.3.1.1).

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use bitflags::bitflags;

use crate::abi::{Abi, AbiType};
use crate::common::intern::StringId;

/// The closed enumeration of C type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
    Float,
    Double,
    LongDouble,
    Float16,
    Float32,
    Float64,
    Float128,
    ComplexFloat,
    ComplexDouble,
    ComplexLongDouble,
    ComplexChar,
    ComplexShort,
    ComplexInt,
    ComplexLong,
    ComplexLongLong,
    ComplexUShort,
    ComplexUInt,
    Ptr,
    Array,
    Function,
    Struct,
    Union,
    Enum,
    Invalid,
}

impl Kind {
    /// Every scalar kind the ABI table must describe.
    pub fn scalars() -> &'static [Kind] {
        use Kind::*;
        &[
            Void, Bool, Char, SChar, UChar, Short, UShort, Int, UInt, Long, ULong,
            LongLong, ULongLong, Int128, UInt128, Float, Double, LongDouble, Float16,
            Float32, Float64, Float128, ComplexFloat, ComplexDouble, ComplexLongDouble,
            ComplexChar, ComplexShort, ComplexInt, ComplexLong, ComplexLongLong,
            ComplexUShort, ComplexUInt, Ptr,
        ]
    }

    pub fn is_integer(self) -> bool {
        use Kind::*;
        matches!(
            self,
            Bool | Char | SChar | UChar | Short | UShort | Int | UInt | Long | ULong
                | LongLong | ULongLong | Int128 | UInt128 | Enum
        )
    }

    pub fn is_floating(self) -> bool {
        use Kind::*;
        matches!(self, Float | Double | LongDouble | Float16 | Float32 | Float64 | Float128)
    }

    pub fn is_complex(self) -> bool {
        use Kind::*;
        matches!(
            self,
            ComplexFloat | ComplexDouble | ComplexLongDouble | ComplexChar | ComplexShort
                | ComplexInt | ComplexLong | ComplexLongLong | ComplexUShort | ComplexUInt
        )
    }

    /// The `_Complex` integer kinds have no value lane; normalize diagnoses them.
    pub fn is_complex_integer(self) -> bool {
        use Kind::*;
        matches!(
            self,
            ComplexChar | ComplexShort | ComplexInt | ComplexLong | ComplexLongLong
                | ComplexUShort | ComplexUInt
        )
    }

    pub fn is_arithmetic(self) -> bool {
        self.is_integer() || self.is_floating() || self.is_complex()
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Kind::Void => "void",
            Kind::Bool => "_Bool",
            Kind::Char => "char",
            Kind::SChar => "signed char",
            Kind::UChar => "unsigned char",
            Kind::Short => "short",
            Kind::UShort => "unsigned short",
            Kind::Int => "int",
            Kind::UInt => "unsigned int",
            Kind::Long => "long",
            Kind::ULong => "unsigned long",
            Kind::LongLong => "long long",
            Kind::ULongLong => "unsigned long long",
            Kind::Int128 => "__int128",
            Kind::UInt128 => "unsigned __int128",
            Kind::Float => "float",
            Kind::Double => "double",
            Kind::LongDouble => "long double",
            Kind::Float16 => "__fp16",
            Kind::Float32 => "_Float32",
            Kind::Float64 => "_Float64",
            Kind::Float128 => "_Float128",
            Kind::ComplexFloat => "float _Complex",
            Kind::ComplexDouble => "double _Complex",
            Kind::ComplexLongDouble => "long double _Complex",
            Kind::ComplexChar => "char _Complex",
            Kind::ComplexShort => "short _Complex",
            Kind::ComplexInt => "int _Complex",
            Kind::ComplexLong => "long _Complex",
            Kind::ComplexLongLong => "long long _Complex",
            Kind::ComplexUShort => "unsigned short _Complex",
            Kind::ComplexUInt => "unsigned int _Complex",
            Kind::Ptr => "pointer",
            Kind::Array => "array",
            Kind::Function => "function",
            Kind::Struct => "struct",
            Kind::Union => "union",
            Kind::Enum => "enum",
            Kind::Invalid => "invalid",
        };
        f.write_str(s)
    }
}

bitflags! {
    /// C type qualifiers. Flags on a base type; they do not change kind,
    /// size, or rank.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const RESTRICT = 1 << 1;
        const VOLATILE = 1 << 2;
        const ATOMIC = 1 << 3;
    }
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: Option<StringId>,
    pub typ: Type,
}

/// A struct or union member, with its computed layout.
///
/// `offset` is bytes from the start of the aggregate. For bit-fields,
/// `bit_field_offset` is the bit position within the storage unit at
/// `offset` and `bit_field_mask` is the width mask already shifted into
/// place. `pad` is the number of trailing padding bytes inserted after this
/// field. `promote` is the type the field yields under integer promotion.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: Option<StringId>,
    pub typ: Type,
    pub is_bit_field: bool,
    pub bit_field_width: u8,
    pub bit_field_offset: u8,
    pub bit_field_mask: u64,
    pub offset: u64,
    pub pad: u64,
    pub promote: Type,
}

impl Field {
    /// A field before layout: only name/type/width are meaningful.
    pub fn new(name: Option<StringId>, typ: Type, bit_field_width: Option<u8>) -> Self {
        Field {
            name,
            promote: typ.clone(),
            typ,
            is_bit_field: bit_field_width.is_some(),
            bit_field_width: bit_field_width.unwrap_or(0),
            bit_field_offset: 0,
            bit_field_mask: 0,
            offset: 0,
            pad: 0,
        }
    }
}

#[derive(Debug, Default)]
struct RecordInner {
    complete: bool,
    fields: Vec<Field>,
    size: u64,
    align: u8,
    field_align: u8,
}

/// A struct or union type. Shared via `Rc` so that a forward-declared tag
/// and every type mentioning it observe the completion.
#[derive(Debug)]
pub struct RecordType {
    pub tag: Option<StringId>,
    pub is_union: bool,
    inner: RefCell<RecordInner>,
}

impl RecordType {
    pub fn new_incomplete(tag: Option<StringId>, is_union: bool) -> Rc<Self> {
        Rc::new(RecordType {
            tag,
            is_union,
            inner: RefCell::new(RecordInner { align: 1, field_align: 1, ..Default::default() }),
        })
    }

    /// Install the member list and computed layout, completing the type.
    pub fn complete(&self, fields: Vec<Field>, size: u64, align: u8, field_align: u8) {
        let mut inner = self.inner.borrow_mut();
        inner.fields = fields;
        inner.size = size;
        inner.align = align;
        inner.field_align = field_align;
        inner.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.inner.borrow().complete
    }

    pub fn size(&self) -> u64 {
        self.inner.borrow().size
    }

    pub fn align(&self) -> u8 {
        self.inner.borrow().align
    }

    pub fn field_align(&self) -> u8 {
        self.inner.borrow().field_align
    }

    pub fn fields(&self) -> Ref<'_, [Field]> {
        Ref::map(self.inner.borrow(), |i| i.fields.as_slice())
    }

    /// Look up a member by name, returning its byte offset from the start of
    /// this aggregate and a copy of the field. Recurses into anonymous
    /// struct/union members.
    pub fn find_field(&self, name: StringId) -> Option<(u64, Field)> {
        let inner = self.inner.borrow();
        for f in &inner.fields {
            if f.name == Some(name) {
                return Some((f.offset, f.clone()));
            }
            if f.name.is_none() && !f.is_bit_field {
                if let Type::Record(rec) = f.typ.base() {
                    if let Some((off, found)) = rec.find_field(name) {
                        return Some((f.offset + off, found));
                    }
                }
            }
        }
        None
    }
}

/// An enumerated type; values have the underlying integer type.
#[derive(Debug)]
pub struct EnumType {
    pub tag: Option<StringId>,
    pub underlying: Type,
}

/// A function type.
#[derive(Debug)]
pub struct FunctionType {
    pub result: Type,
    pub params: Vec<Parameter>,
    pub variadic: bool,
}

/// A C type. Cheap to clone; aggregates and element types are shared.
#[derive(Debug, Clone)]
pub enum Type {
    Invalid,
    Scalar {
        kind: Kind,
        abi: AbiType,
        signed: bool,
    },
    Pointer {
        elem: Rc<Type>,
        abi: AbiType,
        quals: TypeQualifiers,
    },
    Array {
        elem: Rc<Type>,
        len: u64,
        incomplete: bool,
    },
    Function(Rc<FunctionType>),
    Record(Rc<RecordType>),
    Enum(Rc<EnumType>),
    Qualified {
        base: Rc<Type>,
        quals: TypeQualifiers,
    },
    BitField {
        base: Rc<Type>,
        width: u8,
    },
}

impl Type {
    pub fn kind(&self) -> Kind {
        match self {
            Type::Invalid => Kind::Invalid,
            Type::Scalar { kind, .. } => *kind,
            Type::Pointer { .. } => Kind::Ptr,
            Type::Array { .. } => Kind::Array,
            Type::Function(_) => Kind::Function,
            Type::Record(rec) => {
                if rec.is_union {
                    Kind::Union
                } else {
                    Kind::Struct
                }
            }
            Type::Enum(_) => Kind::Enum,
            Type::Qualified { base, .. } => base.kind(),
            Type::BitField { base, .. } => base.kind(),
        }
    }

    /// Size in bytes. Incomplete types report 0.
    pub fn size(&self) -> u64 {
        match self {
            Type::Invalid | Type::Function(_) => 0,
            Type::Scalar { abi, .. } | Type::Pointer { abi, .. } => abi.size,
            Type::Array { elem, len, incomplete } => {
                if *incomplete {
                    0
                } else {
                    elem.size() * len
                }
            }
            Type::Record(rec) => rec.size(),
            Type::Enum(e) => e.underlying.size(),
            Type::Qualified { base, .. } => base.size(),
            Type::BitField { base, .. } => base.size(),
        }
    }

    pub fn align(&self) -> u8 {
        match self {
            Type::Invalid | Type::Function(_) => 1,
            Type::Scalar { abi, .. } | Type::Pointer { abi, .. } => abi.align,
            Type::Array { elem, .. } => elem.align(),
            Type::Record(rec) => rec.align(),
            Type::Enum(e) => e.underlying.align(),
            Type::Qualified { base, .. } => base.align(),
            Type::BitField { base, .. } => base.align(),
        }
    }

    pub fn field_align(&self) -> u8 {
        match self {
            Type::Invalid | Type::Function(_) => 1,
            Type::Scalar { abi, .. } | Type::Pointer { abi, .. } => abi.field_align,
            Type::Array { elem, .. } => elem.field_align(),
            Type::Record(rec) => rec.field_align(),
            Type::Enum(e) => e.underlying.field_align(),
            Type::Qualified { base, .. } => base.field_align(),
            Type::BitField { base, .. } => base.field_align(),
        }
    }

    pub fn is_signed(&self) -> bool {
        match self {
            Type::Scalar { signed, .. } => *signed,
            Type::Enum(e) => e.underlying.is_signed(),
            Type::Qualified { base, .. } => base.is_signed(),
            Type::BitField { base, .. } => base.is_signed(),
            _ => false,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.kind().is_integer()
    }

    pub fn is_floating(&self) -> bool {
        self.kind().is_floating()
    }

    pub fn is_complex(&self) -> bool {
        self.kind().is_complex()
    }

    pub fn is_arithmetic(&self) -> bool {
        self.kind().is_arithmetic()
    }

    pub fn is_bit_field(&self) -> bool {
        match self {
            Type::BitField { .. } => true,
            Type::Qualified { base, .. } => base.is_bit_field(),
            _ => false,
        }
    }

    pub fn bit_field_width(&self) -> u8 {
        match self {
            Type::BitField { width, .. } => *width,
            Type::Qualified { base, .. } => base.bit_field_width(),
            _ => 0,
        }
    }

    /// Element type of a pointer or array.
    ///
    /// Panics on other variants: callers check the kind first, so reaching
    /// this with anything else is an internal invariant violation.
    pub fn elem(&self) -> Type {
        match self {
            Type::Pointer { elem, .. } | Type::Array { elem, .. } => (**elem).clone(),
            Type::Qualified { base, .. } => base.elem(),
            other => panic!("internal error: elem() on {}", other.kind()),
        }
    }

    /// Array length; 0 for incomplete arrays.
    pub fn len(&self) -> u64 {
        match self {
            Type::Array { len, .. } => *len,
            Type::Qualified { base, .. } => base.len(),
            other => panic!("internal error: len() on {}", other.kind()),
        }
    }

    /// Whether this is an incomplete type (void, undefined tag, unsized array).
    pub fn incomplete(&self) -> bool {
        match self {
            Type::Scalar { kind: Kind::Void, .. } => true,
            Type::Array { incomplete, .. } => *incomplete,
            Type::Record(rec) => !rec.is_complete(),
            Type::Qualified { base, .. } => base.incomplete(),
            _ => false,
        }
    }

    /// Strip qualifier wrappers.
    pub fn base(&self) -> Type {
        match self {
            Type::Qualified { base, .. } => base.base(),
            other => other.clone(),
        }
    }

    pub fn qualifiers(&self) -> TypeQualifiers {
        match self {
            Type::Qualified { quals, base } => *quals | base.qualifiers(),
            Type::Pointer { quals, .. } => *quals,
            _ => TypeQualifiers::empty(),
        }
    }

    /// The record behind a struct/union type, if any.
    pub fn record(&self) -> Option<Rc<RecordType>> {
        match self.base() {
            Type::Record(rec) => Some(rec),
            Type::BitField { base, .. } => base.record(),
            _ => None,
        }
    }

    /// The function type behind a function, if any.
    pub fn function(&self) -> Option<Rc<FunctionType>> {
        match self.base() {
            Type::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Wrap in a qualifier layer (no-op for empty qualifiers).
    pub fn qualified(self, quals: TypeQualifiers) -> Type {
        if quals.is_empty() {
            self
        } else {
            Type::Qualified { base: Rc::new(self), quals }
        }
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Invalid, Type::Invalid) => true,
            (Type::Scalar { kind: a, .. }, Type::Scalar { kind: b, .. }) => a == b,
            (Type::Pointer { elem: a, .. }, Type::Pointer { elem: b, .. }) => a == b,
            (
                Type::Array { elem: a, len: la, incomplete: ia },
                Type::Array { elem: b, len: lb, incomplete: ib },
            ) => a == b && la == lb && ia == ib,
            (Type::Function(a), Type::Function(b)) => Rc::ptr_eq(a, b),
            (Type::Record(a), Type::Record(b)) => Rc::ptr_eq(a, b),
            (Type::Enum(a), Type::Enum(b)) => Rc::ptr_eq(a, b),
            (
                Type::Qualified { base: a, quals: qa },
                Type::Qualified { base: b, quals: qb },
            ) => qa == qb && a == b,
            (
                Type::BitField { base: a, width: wa },
                Type::BitField { base: b, width: wb },
            ) => wa == wb && a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Invalid => write!(f, "invalid"),
            Type::Scalar { kind, .. } => write!(f, "{}", kind),
            Type::Pointer { elem, .. } => write!(f, "{}*", elem),
            Type::Array { elem, len, incomplete } => {
                if *incomplete {
                    write!(f, "{}[]", elem)
                } else {
                    write!(f, "{}[{}]", elem, len)
                }
            }
            Type::Function(ft) => write!(f, "function returning {}", ft.result),
            Type::Record(rec) => {
                let kw = if rec.is_union { "union" } else { "struct" };
                match rec.tag {
                    Some(tag) => write!(f, "{} {}", kw, tag),
                    None => write!(f, "{} <anonymous>", kw),
                }
            }
            Type::Enum(e) => match e.tag {
                Some(tag) => write!(f, "enum {}", tag),
                None => write!(f, "enum <anonymous>"),
            },
            Type::Qualified { base, .. } => write!(f, "{}", base),
            Type::BitField { base, width } => write!(f, "{}:{}", base, width),
        }
    }
}

/// Integer conversion rank (C11 6.3.1.1). Consulted only by the usual
/// arithmetic conversions; kinds outside the integer lattice rank 0.
pub fn conversion_rank(kind: Kind) -> u8 {
    use Kind::*;
    match kind {
        Bool => 1,
        Char | SChar | UChar => 2,
        Short | UShort => 3,
        Int | UInt | Enum => 4,
        Long | ULong => 5,
        LongLong | ULongLong => 6,
        Int128 | UInt128 => 7,
        _ => 0,
    }
}

/// Integer promotion (C11 6.3.1.1-2).
///
/// Bit-fields promote to `int` when every value of the field fits: width
/// below `int`'s bit count for unsigned fields, below count minus one for
/// signed fields. Wider bit-fields keep their declared type. Otherwise the
/// narrow kinds promote to `int` and everything else is unchanged.
pub fn integer_promotion(abi: &Abi, t: &Type) -> Type {
    if t.is_bit_field() {
        let int_bits = abi.size_of(Kind::Int) as u32 * 8;
        let width = t.bit_field_width() as u32;
        let fits = if t.is_signed() { width < int_bits - 1 } else { width < int_bits };
        if fits {
            return abi.kind_type(Kind::Int);
        }
        return t.clone();
    }

    match t.kind() {
        Kind::Invalid => t.clone(),
        Kind::Char | Kind::SChar | Kind::UChar | Kind::Short | Kind::UShort => {
            abi.kind_type(Kind::Int)
        }
        _ => t.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;

    fn abi() -> Abi {
        let mut abi = Abi::linux_amd64();
        abi.sanity_check().unwrap();
        abi
    }

    #[test]
    fn test_conversion_rank_ordering() {
        assert!(conversion_rank(Kind::Bool) < conversion_rank(Kind::Char));
        assert!(conversion_rank(Kind::Char) < conversion_rank(Kind::Short));
        assert!(conversion_rank(Kind::Short) < conversion_rank(Kind::Int));
        assert!(conversion_rank(Kind::Int) < conversion_rank(Kind::Long));
        assert!(conversion_rank(Kind::Long) < conversion_rank(Kind::LongLong));
        assert!(conversion_rank(Kind::LongLong) < conversion_rank(Kind::Int128));
        assert_eq!(conversion_rank(Kind::UInt), conversion_rank(Kind::Int));
    }

    #[test]
    fn test_integer_promotion_narrow_kinds() {
        let abi = abi();
        for kind in [Kind::Char, Kind::SChar, Kind::UChar, Kind::Short, Kind::UShort] {
            let t = abi.kind_type(kind);
            assert_eq!(integer_promotion(&abi, &t).kind(), Kind::Int, "{}", kind);
        }
        for kind in [Kind::Int, Kind::UInt, Kind::Long, Kind::ULongLong, Kind::Double] {
            let t = abi.kind_type(kind);
            assert_eq!(integer_promotion(&abi, &t).kind(), kind, "{}", kind);
        }
    }

    #[test]
    fn test_integer_promotion_idempotent() {
        let abi = abi();
        for kind in [Kind::Char, Kind::Short, Kind::Int, Kind::ULong, Kind::Bool] {
            let t = abi.kind_type(kind);
            let once = integer_promotion(&abi, &t);
            let twice = integer_promotion(&abi, &once);
            assert_eq!(once.kind(), twice.kind());
        }
    }

    #[test]
    fn test_bit_field_promotion() {
        let abi = abi();
        let int = abi.kind_type(Kind::Int);
        let uint = abi.kind_type(Kind::UInt);

        // Narrow signed and unsigned bit-fields promote to int.
        let bf = Type::BitField { base: Rc::new(int.clone()), width: 5 };
        assert_eq!(integer_promotion(&abi, &bf).kind(), Kind::Int);
        assert!(!integer_promotion(&abi, &bf).is_bit_field());
        let bf = Type::BitField { base: Rc::new(uint.clone()), width: 31 };
        assert_eq!(integer_promotion(&abi, &bf).kind(), Kind::Int);

        // A signed :31 field cannot hold every int value's sign/magnitude
        // split, so it stays a bit-field; unsigned :32 likewise.
        let bf = Type::BitField { base: Rc::new(int), width: 31 };
        assert!(integer_promotion(&abi, &bf).is_bit_field());
        let bf = Type::BitField { base: Rc::new(uint), width: 32 };
        assert!(integer_promotion(&abi, &bf).is_bit_field());
    }

    #[test]
    fn test_qualified_wrapper_transparent() {
        let abi = abi();
        let t = abi.kind_type(Kind::Int).qualified(TypeQualifiers::CONST);
        assert_eq!(t.kind(), Kind::Int);
        assert_eq!(t.size(), 4);
        assert!(t.is_signed());
        assert_eq!(t.base().qualifiers(), TypeQualifiers::empty());
        assert_eq!(t.qualifiers(), TypeQualifiers::CONST);
    }

    #[test]
    fn test_record_completion_late_binds() {
        let abi = abi();
        let rec = RecordType::new_incomplete(None, false);
        let t = Type::Record(rec.clone());
        assert!(t.incomplete());
        assert_eq!(t.size(), 0);
        let f = Field::new(None, abi.kind_type(Kind::Int), None);
        rec.complete(vec![f], 4, 4, 4);
        assert!(!t.incomplete());
        assert_eq!(t.size(), 4);
        assert_eq!(t.align(), 4);
    }
}
