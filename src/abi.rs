//! Target ABI description and aggregate layout.
//!
//! The `Abi` owns the per-kind size/alignment table, validated once by
//! `sanity_check`, and is read-only afterwards. It also performs struct and
//! union layout, including C bit-field packing, and manufactures pointer
//! types so that every pointer in a translation unit shares `ABI[Ptr]`'s
//! size and alignment.
//!
//! Bit-field allocation, for the example linux/amd64 configuration:
//!
//! ```c
//! struct { int f0:2, f1:3, f2:20, f3:10, f4; } x;
//! ```
//!
//! writing -1 into f0..f3 in turn and reading the first 8 bytes as a
//! little-endian u64 gives 0, 0x3, 0x1f, 0x1ffffff, 0x3ff01ffffff: fields
//! pack from bit 0 upwards and a field that would straddle its storage
//! unit starts a fresh aligned unit.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

use crate::types::{integer_promotion, Field, Kind, Type, TypeQualifiers};

/// Size and alignment of a non-aggregate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbiType {
    pub size: u64,
    pub align: u8,
    pub field_align: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

/// Configuration errors found by `Abi::sanity_check`. These block further
/// work; nothing else in the crate is usable with an invalid ABI.
#[derive(Debug, Error)]
pub enum AbiError {
    #[error("ABI is missing {0}")]
    MissingKind(Kind),
    #[error("invalid ABI type {kind}: size {size}, align {align}, field align {field_align}")]
    InvalidType { kind: Kind, size: u64, align: u8, field_align: u8 },
    #[error("invalid ABI max packed bit-field width: {0}")]
    InvalidMaxPackedBitfieldWidth(u32),
}

/// Explicit failure cases of the layout engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("zero-width bit-field is not supported")]
    ZeroWidthBitField,
    #[error("bit-field member in union is not supported")]
    UnionBitField,
}

/// Computed size and alignment of an aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub size: u64,
    pub align: u8,
    pub field_align: u8,
}

/// Selected parts of the target Application Binary Interface.
#[derive(Debug, Clone)]
pub struct Abi {
    pub byte_order: ByteOrder,
    pub signed_char: bool,
    /// Maximum bit-field width that participates in packing, in bits.
    pub max_packed_bitfield_width: u32,
    types: FxHashMap<Kind, AbiType>,
    /// Canonical scalar types, built by `sanity_check`.
    type_cache: FxHashMap<Kind, Type>,
}

impl Abi {
    pub fn new(
        byte_order: ByteOrder,
        signed_char: bool,
        max_packed_bitfield_width: u32,
        types: FxHashMap<Kind, AbiType>,
    ) -> Self {
        Abi { byte_order, signed_char, max_packed_bitfield_width, types, type_cache: FxHashMap::default() }
    }

    /// The usual 64-bit Linux configuration: little-endian, signed `char`,
    /// 8-byte `long`, 16-byte `long double`.
    pub fn linux_amd64() -> Self {
        use Kind::*;
        let entries: &[(Kind, u64, u8)] = &[
            (Void, 0, 1),
            (Bool, 1, 1),
            (Char, 1, 1),
            (SChar, 1, 1),
            (UChar, 1, 1),
            (Short, 2, 2),
            (UShort, 2, 2),
            (Int, 4, 4),
            (UInt, 4, 4),
            (Long, 8, 8),
            (ULong, 8, 8),
            (LongLong, 8, 8),
            (ULongLong, 8, 8),
            (Int128, 16, 16),
            (UInt128, 16, 16),
            (Float, 4, 4),
            (Double, 8, 8),
            (LongDouble, 16, 16),
            (Float16, 2, 2),
            (Float32, 4, 4),
            (Float64, 8, 8),
            (Float128, 16, 16),
            (ComplexFloat, 8, 4),
            (ComplexDouble, 16, 8),
            (ComplexLongDouble, 32, 16),
            (ComplexChar, 2, 1),
            (ComplexShort, 4, 2),
            (ComplexInt, 8, 4),
            (ComplexLong, 16, 8),
            (ComplexLongLong, 16, 8),
            (ComplexUShort, 4, 2),
            (ComplexUInt, 8, 4),
            (Ptr, 8, 8),
        ];
        let mut types = FxHashMap::default();
        for &(kind, size, align) in entries {
            types.insert(kind, AbiType { size, align, field_align: align });
        }
        Abi::new(ByteOrder::LittleEndian, true, 32, types)
    }

    /// Validate the scalar table and build the canonical type map. Must be
    /// called (successfully) before any other method; the table is read-only
    /// afterwards.
    pub fn sanity_check(&mut self) -> Result<(), AbiError> {
        if self.max_packed_bitfield_width > 64 {
            return Err(AbiError::InvalidMaxPackedBitfieldWidth(self.max_packed_bitfield_width));
        }
        for &kind in Kind::scalars() {
            let Some(&t) = self.types.get(&kind) else {
                return Err(AbiError::MissingKind(kind));
            };
            let size_ok = t.size != 0 || kind == Kind::Void;
            // Integer values canonicalize into 64-bit lanes, so the
            // rank-ordered integer kinds must fit in 8 bytes.
            let lane_ok = !matches!(
                kind,
                Kind::Bool
                    | Kind::Char
                    | Kind::SChar
                    | Kind::UChar
                    | Kind::Short
                    | Kind::UShort
                    | Kind::Int
                    | Kind::UInt
                    | Kind::Long
                    | Kind::ULong
                    | Kind::LongLong
                    | Kind::ULongLong
            ) || t.size <= 8;
            if !size_ok || !lane_ok || t.align == 0 || t.field_align == 0 {
                return Err(AbiError::InvalidType {
                    kind,
                    size: t.size,
                    align: t.align,
                    field_align: t.field_align,
                });
            }
        }
        self.type_cache = self
            .types
            .iter()
            .filter(|(&kind, _)| kind != Kind::Ptr)
            .map(|(&kind, &abi)| {
                (kind, Type::Scalar { kind, abi, signed: self.is_signed_integer(kind) })
            })
            .collect();
        debug!(kinds = self.types.len(), "ABI table validated");
        Ok(())
    }

    /// The table entry for `kind`, if present.
    pub fn get(&self, kind: Kind) -> Option<AbiType> {
        self.types.get(&kind).copied()
    }

    /// Size in bytes of a scalar kind. Only valid after `sanity_check`.
    pub fn size_of(&self, kind: Kind) -> u64 {
        self.types
            .get(&kind)
            .unwrap_or_else(|| panic!("internal error: ABI has no entry for {}", kind))
            .size
    }

    /// The canonical scalar type for `kind`. Only valid after `sanity_check`.
    pub fn kind_type(&self, kind: Kind) -> Type {
        self.type_cache
            .get(&kind)
            .unwrap_or_else(|| panic!("internal error: no canonical type for {}", kind))
            .clone()
    }

    /// Whether `kind` is a signed integer kind under this ABI (plain `char`
    /// signedness is configurable).
    pub fn is_signed_integer(&self, kind: Kind) -> bool {
        match kind {
            Kind::Char => self.signed_char,
            Kind::SChar
            | Kind::Short
            | Kind::Int
            | Kind::Long
            | Kind::LongLong
            | Kind::Int128
            | Kind::Enum => true,
            _ => false,
        }
    }

    /// Manufacture a pointer type to `elem`. All pointers share `ABI[Ptr]`'s
    /// size and alignment; the result is a complete type regardless of the
    /// element.
    pub fn pointer_to(&self, elem: Type, quals: TypeQualifiers) -> Type {
        let abi = self
            .get(Kind::Ptr)
            .unwrap_or_else(|| panic!("internal error: ABI has no entry for {}", Kind::Ptr));
        Type::Pointer { elem: Rc::new(elem), abi, quals }
    }

    /// Lay out a struct: assign field offsets, bit-field positions/masks,
    /// padding, and promoted types, and compute the aggregate shape.
    ///
    /// Bit-fields pack from bit 0 upwards within naturally-aligned storage
    /// units of their declared type; a field that would straddle its unit
    /// starts a fresh unit aligned to the member's field alignment. A
    /// flexible array member as final field keeps its offset but adds
    /// nothing to the size.
    pub fn layout_struct(&self, fields: &mut [Field]) -> Result<RecordLayout, LayoutError> {
        let mut off: u64 = 0;
        let mut align: u8 = 1;
        let mut field_align: u8 = 1;
        let mut last_regular: Option<usize> = None;
        let count = fields.len();

        for i in 0..count {
            let member = fields[i].typ.clone();
            if fields[i].is_bit_field {
                let width = fields[i].bit_field_width as u64;
                if width == 0 {
                    return Err(LayoutError::ZeroWidthBitField);
                }
                let unit_size = member.size();
                let unit_align = member.field_align() as u64;
                let down = off & !(8 * unit_align - 1);
                let bitoff = off - down;
                let down_max = off & !(8 * unit_size - 1);
                if (off - down_max) + width > 8 * unit_size {
                    // Does not fit in the current storage unit.
                    off = round_up_bits(off, 8 * unit_align);
                    fields[i].offset = off / 8;
                    fields[i].bit_field_offset = 0;
                    fields[i].bit_field_mask = width_mask(width);
                    off += width;
                } else {
                    fields[i].offset = down / 8;
                    fields[i].bit_field_offset = bitoff as u8;
                    fields[i].bit_field_mask = width_mask(width) << bitoff;
                    off += width;
                }
                align = align.max(member.align());
                field_align = field_align.max(member.field_align());
                let wrapped =
                    Type::BitField { base: Rc::new(member), width: fields[i].bit_field_width };
                fields[i].promote = integer_promotion(self, &wrapped);
                fields[i].typ = wrapped;
            } else {
                let is_flexible = i == count - 1 && member.base().kind() == Kind::Array
                    && member.incomplete();
                let unit_align = member.field_align() as u64;
                let aligned = round_up_bits(off, 8 * unit_align);
                if aligned != off && i > 0 {
                    fields[i - 1].pad = (aligned - off) / 8;
                }
                off = aligned;
                fields[i].offset = off / 8;
                if !is_flexible {
                    off += 8 * member.size();
                }
                align = align.max(member.align());
                field_align = field_align.max(member.field_align());
                fields[i].promote = if member.is_integer() {
                    integer_promotion(self, &member)
                } else {
                    member
                };
                last_regular = Some(i);
            }
        }

        let total = round_up_bits(off, 8 * align as u64);
        if total != off {
            if let Some(i) = last_regular {
                fields[i].pad = (total - off) / 8;
            }
        }
        let layout = RecordLayout { size: total >> 3, align, field_align };
        debug!(size = layout.size, align = layout.align, fields = count, "struct layout");
        Ok(layout)
    }

    /// Lay out a union: every member at offset 0, size is the largest member
    /// rounded up to the alignment. Bit-field members are not supported; a
    /// flexible array member as final field is skipped.
    pub fn layout_union(&self, fields: &mut [Field]) -> Result<RecordLayout, LayoutError> {
        let mut size: u64 = 0;
        let mut align: u8 = 1;
        let mut field_align: u8 = 1;
        let count = fields.len();

        for i in 0..count {
            if fields[i].is_bit_field {
                return Err(LayoutError::UnionBitField);
            }
            let member = fields[i].typ.clone();
            let is_flexible =
                i == count - 1 && member.base().kind() == Kind::Array && member.incomplete();
            fields[i].offset = 0;
            if !is_flexible {
                size = size.max(member.size());
            }
            align = align.max(member.align());
            field_align = field_align.max(member.field_align());
            fields[i].promote = if member.is_integer() {
                integer_promotion(self, &member)
            } else {
                member
            };
        }

        let layout =
            RecordLayout { size: round_up_bits(size, align as u64), align, field_align };
        debug!(size = layout.size, align = layout.align, fields = count, "union layout");
        Ok(layout)
    }
}

fn round_up_bits(n: u64, to: u64) -> u64 {
    if to == 0 {
        return n;
    }
    n.div_ceil(to) * to
}

fn width_mask(width: u64) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
