//! The checker: a single-threaded post-order walk over the parsed tree.
//!
//! Each node either recurses into its children, resolves a type and attaches
//! it, or computes an operand. Declaration specifiers fold into a base-type
//! accumulator, declarators wrap it (pointers through the ABI), aggregate
//! specifiers run the layout engine, and every expression receives an
//! operand computed with the conversion procedures in `operand`.
//!
//! The constant-expression dialect is governed by the context's mode stack:
//! `sizeof E` / `_Alignof E` clear `INT_CONST_EXPR` around their unevaluated
//! operand, `sizeof(T)` / `_Alignof(T)` additionally permit any arithmetic
//! cast, and a cast `(T)x` keeps integer-constant legality only for integer
//! targets while making floating constants permissible as the immediate
//! operand.

use std::rc::Rc;

use tracing::debug;

use crate::ast::{
    AbstractDeclarator, AlignmentSpecifier, BinaryOp, BlockItem, Declaration,
    DeclarationSpecifier, Declarator, Designator, DirectAbstractDeclarator, DirectDeclarator,
    Enumerator, Expr, ExprKind, ExternalDeclaration, FloatSuffix, ForInit, FunctionDefinition,
    FunctionSpecifierKind, InitDeclarator, Initializer, InitializerItem, IntBase, IntSuffix,
    ParameterDeclaration, SpecifierQualifier, Statement, StorageClassSpecifier, StructDeclaration,
    StructDeclarator, StructOrUnionSpecifier, TranslationUnit, TypeName, TypeQualifierKind,
    TypeSpecifier, UnaryOp,
};
use crate::common::intern::StringId;
use crate::common::scope::Symbol;
use crate::common::source::Span;
use crate::context::{Context, DeclFlags, DeclInfo, Linkage, Mode, TagEntry};
use crate::float128::Float128;
use crate::operand::{usual_arithmetic_conversions, Binding, Operand};
use crate::types::{EnumType, Field, FunctionType, Kind, Parameter, RecordType, Type, TypeQualifiers};
use crate::value::{InitializerValue, Value};

/// Check one translation unit, annotating the tree in place and recording
/// diagnostics, declarators, and struct shapes on the context.
pub fn check_translation_unit(ctx: &mut Context, tu: &mut TranslationUnit) {
    let depth = ctx.mode_depth();
    let mut checker = Checker { ctx };
    for decl in &mut tu.decls {
        match decl {
            ExternalDeclaration::Declaration(d) => checker.check_declaration(d, true),
            ExternalDeclaration::FunctionDefinition(f) => checker.check_function_definition(f),
            ExternalDeclaration::Empty => {}
        }
    }
    debug_assert_eq!(ctx.mode_depth(), depth, "unbalanced mode stack");
    debug!(errors = ctx.diags.error_count(), shapes = ctx.struct_shapes().len(), "checked translation unit");
}

/// Accumulates scalar type-specifier tokens until they resolve to a kind.
#[derive(Debug, Default)]
struct SpecAccumulator {
    void: u8,
    char_: u8,
    short: u8,
    int: u8,
    long: u8,
    float: u8,
    double: u8,
    signed: u8,
    unsigned: u8,
    bool_: u8,
    complex: u8,
    int128: u8,
    float16: u8,
    float32: u8,
    float64: u8,
    float128: u8,
    /// A resolved struct/union/enum/typedef/atomic type, if one appeared.
    other: Option<Type>,
}

impl SpecAccumulator {
    fn has_scalar_tokens(&self) -> bool {
        self.void + self.char_ + self.short + self.int + self.long + self.float + self.double
            + self.signed
            + self.unsigned
            + self.bool_
            + self.complex
            + self.int128
            + self.float16
            + self.float32
            + self.float64
            + self.float128
            > 0
    }
}

struct Checker<'a> {
    ctx: &'a mut Context,
}

/// A binary entry of the value vocabulary, unified to a function pointer so
/// operator selection can pick one in a match.
type ValueBinOp = fn(&Value, &Value) -> Option<Value>;

impl<'a> Checker<'a> {
    // === Declarations ===

    fn check_function_definition(&mut self, f: &mut FunctionDefinition) {
        let (base, flags) = self.check_declaration_specifiers(&mut f.specifiers, f.span);
        let typ = self.check_declarator(&mut f.declarator, base, flags, true);
        self.ctx.symbols.push_scope();
        if let Some(ft) = typ.function() {
            for p in &ft.params {
                if let Some(name) = p.name {
                    let id = self.ctx.declare(DeclInfo {
                        name,
                        typ: p.typ.clone(),
                        linkage: Linkage::None,
                        flags: DeclFlags::empty(),
                        span: f.span,
                    });
                    self.ctx.symbols.declare(name, Symbol::Object { decl: id });
                }
            }
        }
        self.check_block_items(&mut f.body);
        self.ctx.symbols.pop_scope();
    }

    fn check_declaration(&mut self, d: &mut Declaration, file_scope: bool) {
        let (base, flags) = self.check_declaration_specifiers(&mut d.specifiers, d.span);
        for init_decl in &mut d.declarators {
            let InitDeclarator { declarator, initializer } = init_decl;
            let typ = self.check_declarator(declarator, base.clone(), flags, file_scope);
            if let Some(init) = initializer {
                self.check_initializer(init, &typ);
            }
        }
    }

    fn check_declaration_specifiers(
        &mut self,
        specs: &mut [DeclarationSpecifier],
        span: Span,
    ) -> (Type, DeclFlags) {
        let mut flags = DeclFlags::empty();
        let mut quals = TypeQualifiers::empty();
        let mut acc = SpecAccumulator::default();

        for spec in specs.iter_mut() {
            match spec {
                DeclarationSpecifier::StorageClass(sc, sc_span) => {
                    flags |= match sc {
                        StorageClassSpecifier::Typedef => DeclFlags::TYPEDEF,
                        StorageClassSpecifier::Extern => DeclFlags::EXTERN,
                        StorageClassSpecifier::Static => DeclFlags::STATIC,
                        StorageClassSpecifier::Auto => DeclFlags::AUTO,
                        StorageClassSpecifier::Register => DeclFlags::REGISTER,
                        StorageClassSpecifier::ThreadLocal => DeclFlags::THREAD_LOCAL,
                    };
                    let classes = flags.storage_classes();
                    let count = classes.bits().count_ones();
                    // At most one storage class, except that _Thread_local
                    // may accompany static or extern (C11 6.7.1p2).
                    let allowed = count == 1
                        || (count == 2
                            && classes.contains(DeclFlags::THREAD_LOCAL)
                            && classes.intersects(DeclFlags::STATIC | DeclFlags::EXTERN));
                    if !allowed {
                        self.ctx.err(
                            *sc_span,
                            "at most, one storage-class specifier may be given in the \
                             declaration specifiers in a declaration",
                        );
                    }
                }
                DeclarationSpecifier::Type(ts) => self.fold_type_specifier(ts, &mut acc),
                DeclarationSpecifier::Qualifier(q, _) => quals |= qualifier_bit(*q),
                DeclarationSpecifier::Function(fs, _) => {
                    flags |= match fs {
                        FunctionSpecifierKind::Inline => DeclFlags::INLINE,
                        FunctionSpecifierKind::Noreturn => DeclFlags::NORETURN,
                    };
                }
                DeclarationSpecifier::Alignment(a) => self.check_alignment_specifier(a),
            }
        }

        (self.resolve_specifiers(acc, span).qualified(quals), flags)
    }

    fn check_specifier_qualifiers(&mut self, specs: &mut [SpecifierQualifier], span: Span) -> Type {
        let mut quals = TypeQualifiers::empty();
        let mut acc = SpecAccumulator::default();
        for spec in specs.iter_mut() {
            match spec {
                SpecifierQualifier::Type(ts) => self.fold_type_specifier(ts, &mut acc),
                SpecifierQualifier::Qualifier(q, _) => quals |= qualifier_bit(*q),
            }
        }
        self.resolve_specifiers(acc, span).qualified(quals)
    }

    fn check_alignment_specifier(&mut self, a: &mut AlignmentSpecifier) {
        match a {
            AlignmentSpecifier::Type(tn, _) => {
                self.check_type_name(tn);
            }
            AlignmentSpecifier::Expr(e, _) => {
                let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                self.check_const_expr(e, mode);
            }
        }
    }

    fn fold_type_specifier(&mut self, ts: &mut TypeSpecifier, acc: &mut SpecAccumulator) {
        match ts {
            TypeSpecifier::Void(_) => acc.void += 1,
            TypeSpecifier::Char(_) => acc.char_ += 1,
            TypeSpecifier::Short(_) => acc.short += 1,
            TypeSpecifier::Int(_) => acc.int += 1,
            TypeSpecifier::Long(_) => acc.long += 1,
            TypeSpecifier::Float(_) => acc.float += 1,
            TypeSpecifier::Double(_) => acc.double += 1,
            TypeSpecifier::Signed(_) => acc.signed += 1,
            TypeSpecifier::Unsigned(_) => acc.unsigned += 1,
            TypeSpecifier::Bool(_) => acc.bool_ += 1,
            TypeSpecifier::Complex(_) => acc.complex += 1,
            TypeSpecifier::Int128(_) => acc.int128 += 1,
            TypeSpecifier::Float16(_) => acc.float16 += 1,
            TypeSpecifier::Float32(_) => acc.float32 += 1,
            TypeSpecifier::Float64(_) => acc.float64 += 1,
            TypeSpecifier::Float128(_) => acc.float128 += 1,
            TypeSpecifier::StructOrUnion(sou) => {
                let t = self.check_struct_or_union(sou);
                acc.other = Some(t);
            }
            TypeSpecifier::Enum(es) => {
                let t = self.check_enum_specifier(es);
                acc.other = Some(t);
            }
            TypeSpecifier::TypedefName(name, span) => {
                match self.ctx.symbols.lookup(*name).cloned() {
                    Some(Symbol::Typedef { typ }) => acc.other = Some(typ),
                    _ => {
                        self.ctx.err(*span, format!("unknown type name: {}", name));
                        acc.other = Some(Type::Invalid);
                    }
                }
            }
            TypeSpecifier::Atomic(tn, _) => {
                let t = self.check_type_name(tn);
                acc.other = Some(t.qualified(TypeQualifiers::ATOMIC));
            }
        }
    }

    /// Resolve the accumulated specifier tokens to a type.
    fn resolve_specifiers(&mut self, mut acc: SpecAccumulator, span: Span) -> Type {
        if let Some(t) = acc.other.take() {
            if acc.has_scalar_tokens() {
                self.ctx.err(span, "invalid type specifier combination");
            }
            return t;
        }

        let unsigned = acc.unsigned > 0;
        let kind = if acc.complex > 0 {
            // _Complex combinations. The complex integer kinds exist in the
            // data model but normalize rejects their operands.
            if acc.float > 0 {
                Some(Kind::ComplexFloat)
            } else if acc.double > 0 && acc.long > 0 {
                Some(Kind::ComplexLongDouble)
            } else if acc.double > 0 {
                Some(Kind::ComplexDouble)
            } else if acc.char_ > 0 {
                Some(Kind::ComplexChar)
            } else if acc.short > 0 {
                Some(if unsigned { Kind::ComplexUShort } else { Kind::ComplexShort })
            } else if acc.long >= 2 {
                Some(Kind::ComplexLongLong)
            } else if acc.long == 1 {
                Some(Kind::ComplexLong)
            } else if unsigned {
                Some(Kind::ComplexUInt)
            } else if acc.int > 0 || acc.signed > 0 {
                Some(Kind::ComplexInt)
            } else {
                // A bare `_Complex` is `double _Complex`.
                Some(Kind::ComplexDouble)
            }
        } else if acc.void > 0 {
            Some(Kind::Void)
        } else if acc.bool_ > 0 {
            Some(Kind::Bool)
        } else if acc.char_ > 0 {
            Some(if acc.signed > 0 {
                Kind::SChar
            } else if unsigned {
                Kind::UChar
            } else {
                Kind::Char
            })
        } else if acc.int128 > 0 {
            Some(if unsigned { Kind::UInt128 } else { Kind::Int128 })
        } else if acc.float16 > 0 {
            Some(Kind::Float16)
        } else if acc.float32 > 0 {
            Some(Kind::Float32)
        } else if acc.float64 > 0 {
            Some(Kind::Float64)
        } else if acc.float128 > 0 {
            Some(Kind::Float128)
        } else if acc.float > 0 {
            Some(Kind::Float)
        } else if acc.double > 0 {
            Some(if acc.long > 0 { Kind::LongDouble } else { Kind::Double })
        } else if acc.short > 0 {
            Some(if unsigned { Kind::UShort } else { Kind::Short })
        } else if acc.long >= 2 {
            Some(if unsigned { Kind::ULongLong } else { Kind::LongLong })
        } else if acc.long == 1 {
            Some(if unsigned { Kind::ULong } else { Kind::Long })
        } else if acc.int > 0 || acc.signed > 0 || unsigned {
            Some(if unsigned { Kind::UInt } else { Kind::Int })
        } else {
            None
        };

        match kind {
            Some(k) => self.ctx.cfg.abi.kind_type(k),
            None => {
                self.ctx.err(span, "missing type specifier");
                self.ctx.cfg.abi.kind_type(Kind::Int)
            }
        }
    }

    // === Declarators ===

    /// Compute the declarator's type, annotate it, and register the declared
    /// name (object, function, or typedef).
    fn check_declarator(
        &mut self,
        d: &mut Declarator,
        base: Type,
        flags: DeclFlags,
        file_scope: bool,
    ) -> Type {
        let typ = self.declarator_type(d, base);
        d.typ = Some(typ.clone());

        if let Some(name) = d.name() {
            if flags.contains(DeclFlags::TYPEDEF) {
                self.ctx.symbols.declare(name, Symbol::Typedef { typ: typ.clone() });
            } else {
                let is_function = typ.function().is_some();
                let linkage = if is_function || file_scope {
                    if flags.contains(DeclFlags::STATIC) {
                        Linkage::Internal
                    } else {
                        Linkage::External
                    }
                } else if flags.contains(DeclFlags::EXTERN) {
                    Linkage::External
                } else {
                    Linkage::None
                };
                let id = self.ctx.declare(DeclInfo {
                    name,
                    typ: typ.clone(),
                    linkage,
                    flags,
                    span: d.span,
                });
                d.decl = Some(id);
                self.ctx.symbols.declare(name, Symbol::Object { decl: id });
            }
        }
        typ
    }

    /// The declarator's type with no name registration (struct members,
    /// parameters, nested declarators).
    fn declarator_type(&mut self, d: &mut Declarator, mut typ: Type) -> Type {
        for ptr in &d.pointers {
            typ = self.ctx.cfg.abi.pointer_to(typ, qualifier_bits(&ptr.qualifiers));
        }
        let typ = self.check_direct_declarator(&mut d.direct, typ);
        d.typ = Some(typ.clone());
        typ
    }

    fn check_direct_declarator(&mut self, dd: &mut DirectDeclarator, typ: Type) -> Type {
        match dd {
            DirectDeclarator::Ident(..) => typ,
            DirectDeclarator::Paren(inner) => self.declarator_type(inner, typ),
            DirectDeclarator::Array { base, size, span, .. } => {
                let (len, incomplete) = self.check_array_size(size.as_deref_mut(), *span);
                let arr = Type::Array { elem: Rc::new(typ), len, incomplete };
                self.check_direct_declarator(base, arr)
            }
            DirectDeclarator::Function { base, params, variadic, .. } => {
                let params = self.check_parameter_list(params);
                let ft = Type::Function(Rc::new(FunctionType {
                    result: typ,
                    params,
                    variadic: *variadic,
                }));
                self.check_direct_declarator(base, ft)
            }
        }
    }

    /// Array bounds are integer constant expressions in this core.
    fn check_array_size(&mut self, size: Option<&mut Expr>, span: Span) -> (u64, bool) {
        let Some(e) = size else {
            return (0, true);
        };
        let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
        let errors_before = self.ctx.diags.error_count();
        let op = self.check_const_expr(e, mode);
        match op.value {
            Some(Value::Int64(v)) if v >= 0 => (v as u64, false),
            Some(Value::Int64(_)) => {
                self.ctx.err(span, "array has negative size");
                (0, true)
            }
            Some(Value::Uint64(v)) => (v, false),
            _ => {
                // A bound rejected by the mode guard was already diagnosed;
                // anything else unusable gets one error here.
                if self.ctx.diags.error_count() == errors_before {
                    self.ctx.err(span, "invalid array size");
                }
                (0, true)
            }
        }
    }

    fn check_parameter_list(&mut self, params: &mut [ParameterDeclaration]) -> Vec<Parameter> {
        let mut out = Vec::with_capacity(params.len());
        for p in params.iter_mut() {
            let (base, _flags) = self.check_declaration_specifiers(&mut p.specifiers, p.span);
            let (name, typ) = match (&mut p.declarator, &mut p.abstract_declarator) {
                (Some(d), _) => {
                    let t = self.declarator_type(d, base);
                    (d.name(), t)
                }
                (None, Some(ad)) => (None, self.check_abstract_declarator(ad, base)),
                (None, None) => (None, base),
            };
            // Parameters of array or function type adjust to pointers.
            let typ = match typ.base().kind() {
                Kind::Array => self.ctx.cfg.abi.pointer_to(typ.elem(), TypeQualifiers::empty()),
                Kind::Function => self.ctx.cfg.abi.pointer_to(typ, TypeQualifiers::empty()),
                _ => typ,
            };
            out.push(Parameter { name, typ });
        }
        // `(void)` declares no parameters.
        if out.len() == 1 && out[0].name.is_none() && out[0].typ.kind() == Kind::Void {
            out.clear();
        }
        out
    }

    fn check_abstract_declarator(&mut self, ad: &mut AbstractDeclarator, mut typ: Type) -> Type {
        for ptr in &ad.pointers {
            typ = self.ctx.cfg.abi.pointer_to(typ, qualifier_bits(&ptr.qualifiers));
        }
        match &mut ad.direct {
            Some(direct) => self.check_direct_abstract_declarator(direct, typ),
            None => typ,
        }
    }

    fn check_direct_abstract_declarator(
        &mut self,
        dd: &mut DirectAbstractDeclarator,
        typ: Type,
    ) -> Type {
        match dd {
            DirectAbstractDeclarator::Paren(inner) => self.check_abstract_declarator(inner, typ),
            DirectAbstractDeclarator::Array { base, size, span } => {
                let (len, incomplete) = self.check_array_size(size.as_deref_mut(), *span);
                let arr = Type::Array { elem: Rc::new(typ), len, incomplete };
                match base {
                    Some(b) => self.check_direct_abstract_declarator(b, arr),
                    None => arr,
                }
            }
            DirectAbstractDeclarator::Function { base, params, variadic, .. } => {
                let params = self.check_parameter_list(params);
                let ft = Type::Function(Rc::new(FunctionType {
                    result: typ,
                    params,
                    variadic: *variadic,
                }));
                match base {
                    Some(b) => self.check_direct_abstract_declarator(b, ft),
                    None => ft,
                }
            }
        }
    }

    fn check_type_name(&mut self, tn: &mut TypeName) -> Type {
        let typ = self.check_specifier_qualifiers(&mut tn.specifiers, tn.span);
        let typ = match &mut tn.declarator {
            Some(ad) => self.check_abstract_declarator(ad, typ),
            None => typ,
        };
        tn.typ = Some(typ.clone());
        typ
    }

    // === Aggregates and enums ===

    fn check_struct_or_union(&mut self, sou: &mut StructOrUnionSpecifier) -> Type {
        let keyword = if sou.is_union { "union" } else { "struct" };

        let Some(members) = &mut sou.members else {
            // A bare tag reference: reuse or forward-declare.
            let Some(tag) = sou.tag else {
                self.ctx.err(sou.span, format!("anonymous {} without member list", keyword));
                return Type::Invalid;
            };
            return match self.ctx.lookup_tag(tag).cloned() {
                Some(TagEntry::Record(rec)) if rec.is_union == sou.is_union => Type::Record(rec),
                Some(_) => {
                    self.ctx.err(sou.span, format!("tag {} redeclared as a different kind", tag));
                    Type::Invalid
                }
                None => {
                    let rec = RecordType::new_incomplete(Some(tag), sou.is_union);
                    self.ctx.register_tag(tag, TagEntry::Record(rec.clone()));
                    Type::Record(rec)
                }
            };
        };

        let rec = match sou.tag {
            Some(tag) => match self.ctx.lookup_tag(tag).cloned() {
                Some(TagEntry::Record(existing))
                    if existing.is_union == sou.is_union && !existing.is_complete() =>
                {
                    existing
                }
                Some(TagEntry::Record(existing)) if existing.is_union == sou.is_union => {
                    self.ctx.err(sou.span, format!("redefinition of {} {}", keyword, tag));
                    existing
                }
                Some(_) => {
                    self.ctx.err(sou.span, format!("tag {} redeclared as a different kind", tag));
                    let rec = RecordType::new_incomplete(Some(tag), sou.is_union);
                    self.ctx.register_tag(tag, TagEntry::Record(rec.clone()));
                    rec
                }
                None => {
                    let rec = RecordType::new_incomplete(Some(tag), sou.is_union);
                    self.ctx.register_tag(tag, TagEntry::Record(rec.clone()));
                    rec
                }
            },
            None => RecordType::new_incomplete(None, sou.is_union),
        };

        let mut fields: Vec<Field> = Vec::new();
        for member in members.iter_mut() {
            let base = self.check_specifier_qualifiers(&mut member.specifiers, member.span);
            if member.declarators.is_empty() {
                // An anonymous struct/union member.
                if base.record().is_some() {
                    fields.push(Field::new(None, base, None));
                } else {
                    self.ctx.err(member.span, "declaration does not declare anything");
                }
                continue;
            }
            for sdecl in &mut member.declarators {
                let typ = match &mut sdecl.declarator {
                    Some(d) => self.declarator_type(d, base.clone()),
                    None => base.clone(),
                };
                let width = match &mut sdecl.bit_width {
                    Some(e) => self.check_bit_field_width(e, &typ, sdecl.span),
                    None => None,
                };
                let name = sdecl.declarator.as_ref().and_then(|d| d.name());
                fields.push(Field::new(name, typ, width));
            }
        }

        let layout = if sou.is_union {
            self.ctx.cfg.abi.layout_union(&mut fields)
        } else {
            self.ctx.cfg.abi.layout_struct(&mut fields)
        };
        match layout {
            Ok(l) => {
                rec.complete(fields, l.size, l.align, l.field_align);
                self.ctx.record_shape(l.size, l.align);
            }
            Err(e) => {
                self.ctx.err(sou.span, e.to_string());
                rec.complete(Vec::new(), 0, 1, 1);
            }
        }
        Type::Record(rec)
    }

    /// A bit-field width is an integer constant expression bounded by the
    /// declared member type.
    fn check_bit_field_width(&mut self, e: &mut Expr, typ: &Type, span: Span) -> Option<u8> {
        let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
        let op = self.check_const_expr(e, mode);
        let width = match op.value {
            Some(Value::Int64(v)) if v >= 0 => v as u64,
            Some(Value::Uint64(v)) => v,
            _ => {
                self.ctx.err(span, "invalid bit-field width");
                return None;
            }
        };
        if !typ.base().is_integer() || typ.size() > 8 {
            self.ctx.err(span, format!("bit-field has invalid type {}", typ));
            return None;
        }
        if width > 8 * typ.size() {
            self.ctx.err(span, format!("width of bit-field exceeds its type {}", typ));
            return None;
        }
        Some(width as u8)
    }

    fn check_enum_specifier(&mut self, es: &mut crate::ast::EnumSpecifier) -> Type {
        let Some(enumerators) = &mut es.enumerators else {
            let Some(tag) = es.tag else {
                self.ctx.err(es.span, "anonymous enum without enumerator list");
                return Type::Invalid;
            };
            return match self.ctx.lookup_tag(tag).cloned() {
                Some(TagEntry::Enum(e)) => Type::Enum(e),
                Some(_) => {
                    self.ctx.err(es.span, format!("tag {} redeclared as a different kind", tag));
                    Type::Invalid
                }
                None => {
                    let e = Rc::new(EnumType {
                        tag: Some(tag),
                        underlying: self.ctx.cfg.abi.kind_type(Kind::Int),
                    });
                    self.ctx.register_tag(tag, TagEntry::Enum(e.clone()));
                    Type::Enum(e)
                }
            };
        };

        let enum_type = Rc::new(EnumType {
            tag: es.tag,
            underlying: self.ctx.cfg.abi.kind_type(Kind::Int),
        });
        if let Some(tag) = es.tag {
            self.ctx.register_tag(tag, TagEntry::Enum(enum_type.clone()));
        }

        // Enumeration constants have type int and values assigned
        // sequentially from the last explicit integer constant expression.
        let int = self.ctx.cfg.abi.kind_type(Kind::Int);
        let mut next: i64 = 0;
        for Enumerator { name, value, span } in enumerators.iter_mut() {
            if let Some(e) = value {
                let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                let op = self.check_const_expr(e, mode);
                match op.value {
                    Some(Value::Int64(v)) => next = v,
                    Some(Value::Uint64(v)) => next = v as i64,
                    _ => {
                        self.ctx.err(*span, format!("invalid value for enumerator {}", name));
                    }
                }
            }
            self.ctx
                .symbols
                .declare(*name, Symbol::EnumConst { typ: int.clone(), value: next });
            next = next.wrapping_add(1);
        }
        Type::Enum(enum_type)
    }

    // === Initializers ===

    fn check_initializer(&mut self, init: &mut Initializer, typ: &Type) {
        match init {
            Initializer::Expr(e) => {
                self.check_expr(e);
            }
            Initializer::List(items, span) => {
                self.check_initializer_list(items, typ, *span);
            }
        }
    }

    fn check_initializer_list(
        &mut self,
        items: &mut [InitializerItem],
        typ: &Type,
        _span: Span,
    ) -> Operand {
        let mut ops = Vec::with_capacity(items.len());
        for item in items.iter_mut() {
            for d in &mut item.designators {
                if let Designator::Index(e, _) = d {
                    let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                    self.check_const_expr(e, mode);
                }
            }
            match &mut item.initializer {
                Initializer::Expr(e) => ops.push(self.check_expr(e)),
                Initializer::List(sub, s) => {
                    ops.push(self.check_initializer_list(sub, typ, *s));
                }
            }
        }
        let value = Value::Initializer(InitializerValue { typ: typ.clone(), items: Rc::new(ops) });
        Operand::with_value(typ.clone(), value)
    }

    // === Statements ===

    fn check_block_items(&mut self, items: &mut [BlockItem]) {
        for item in items.iter_mut() {
            match item {
                BlockItem::Declaration(d) => self.check_declaration(d, false),
                BlockItem::Statement(s) => self.check_statement(s),
            }
        }
    }

    fn check_statement(&mut self, s: &mut Statement) {
        match s {
            Statement::Labeled { body, .. } | Statement::Default { body, .. } => {
                self.check_statement(body);
            }
            Statement::Case { expr, body, .. } => {
                let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                self.check_const_expr(expr, mode);
                self.check_statement(body);
            }
            Statement::CaseRange { lo, hi, body, .. } => {
                let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                self.check_const_expr(lo, mode);
                let mode = self.ctx.mode() | Mode::INT_CONST_EXPR;
                self.check_const_expr(hi, mode);
                self.check_statement(body);
            }
            Statement::Compound(items, _) => {
                self.ctx.symbols.push_scope();
                self.check_block_items(items);
                self.ctx.symbols.pop_scope();
            }
            Statement::Expr(e, _) => {
                if let Some(e) = e {
                    self.check_expr(e);
                }
            }
            Statement::If { cond, then_branch, else_branch, .. } => {
                self.check_expr(cond);
                self.check_statement(then_branch);
                if let Some(e) = else_branch {
                    self.check_statement(e);
                }
            }
            Statement::Switch { cond, body, .. }
            | Statement::While { cond, body, .. } => {
                self.check_expr(cond);
                self.check_statement(body);
            }
            Statement::DoWhile { body, cond, .. } => {
                self.check_statement(body);
                self.check_expr(cond);
            }
            Statement::For { init, cond, step, body, .. } => {
                self.ctx.symbols.push_scope();
                match init {
                    Some(ForInit::Declaration(d)) => self.check_declaration(d, false),
                    Some(ForInit::Expr(e)) => {
                        self.check_expr(e);
                    }
                    None => {}
                }
                if let Some(e) = cond {
                    self.check_expr(e);
                }
                if let Some(e) = step {
                    self.check_expr(e);
                }
                self.check_statement(body);
                self.ctx.symbols.pop_scope();
            }
            Statement::Goto(..) | Statement::Continue(_) | Statement::Break(_) => {}
            Statement::Return(e, _) => {
                if let Some(e) = e {
                    self.check_expr(e);
                }
            }
        }
    }

    // === Expressions ===

    fn check_const_expr(&mut self, e: &mut Expr, mode: Mode) -> Operand {
        self.ctx.push_mode(mode);
        let op = self.check_expr(e);
        self.ctx.pop_mode();
        op
    }

    fn check_expr(&mut self, e: &mut Expr) -> Operand {
        let span = e.span;
        let op = match &mut e.kind {
            ExprKind::IntLiteral { value, base, suffix } => {
                self.int_literal_operand(*value, *base, *suffix, span)
            }
            ExprKind::FloatLiteral { value, suffix } => {
                if self.ctx.mode().contains(Mode::INT_CONST_EXPR)
                    && !self.ctx.mode().contains(Mode::INT_CONST_EXPR_FLOAT)
                {
                    self.ctx.err(span, "invalid integer constant expression");
                }
                let (kind, v) = match suffix {
                    FloatSuffix::F => (Kind::Float, Value::Float32(*value as f32)),
                    FloatSuffix::None => (Kind::Double, Value::Float64(*value)),
                    FloatSuffix::L => (Kind::LongDouble, Value::Float128(Float128::from_f64(*value))),
                };
                let typ = self.ctx.cfg.abi.kind_type(kind);
                Operand::with_value(typ, v).normalize(self.ctx, span)
            }
            ExprKind::CharLiteral { value } | ExprKind::WideCharLiteral { value } => {
                let typ = self.ctx.cfg.abi.kind_type(Kind::Int);
                Operand::with_value(typ, Value::Int64(*value)).normalize(self.ctx, span)
            }
            ExprKind::StringLiteral { id } => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let len = id.resolve().len() as u64 + 1;
                let elem = self.ctx.cfg.abi.kind_type(Kind::Char);
                let typ = Type::Array { elem: Rc::new(elem), len, incomplete: false };
                Operand::with_value(typ, Value::String(*id))
            }
            ExprKind::WideStringLiteral { id } => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let len = id.resolve().chars().count() as u64 + 1;
                // wchar_t is int on the supported ABIs.
                let elem = self.ctx.cfg.abi.kind_type(Kind::Int);
                let typ = Type::Array { elem: Rc::new(elem), len, incomplete: false };
                Operand::with_value(typ, Value::WideString(*id))
            }
            ExprKind::Ident { name } => self.check_ident(*name, span),
            ExprKind::Paren(inner) => self.check_expr(inner),
            ExprKind::Index { base, index } => {
                let base_op = self.check_expr(base);
                self.check_expr(index);
                let t = base_op.typ.base();
                match t.kind() {
                    Kind::Ptr | Kind::Array => Operand {
                        typ: t.elem(),
                        value: None,
                        offset: base_op.offset,
                        binding: Binding::LValue(base_op.declarator()),
                    },
                    Kind::Invalid => Operand::none(),
                    _ => {
                        self.ctx.err(span, "subscripted value is not an array or pointer");
                        Operand::none()
                    }
                }
            }
            ExprKind::Call { callee, args } => {
                let callee_op = self.check_expr(callee);
                for a in args.iter_mut() {
                    self.check_expr(a);
                }
                let t = callee_op.typ.base();
                let result = match t.kind() {
                    Kind::Function => t.function().map(|f| f.result.clone()),
                    Kind::Ptr => t.elem().function().map(|f| f.result.clone()),
                    Kind::Invalid => Some(Type::Invalid),
                    _ => None,
                };
                match result {
                    Some(Type::Invalid) => Operand::none(),
                    Some(r) => Operand::new(r),
                    None => {
                        self.ctx.err(span, "called object is not a function or function pointer");
                        Operand::none()
                    }
                }
            }
            ExprKind::Member { base, name } => {
                let base_op = self.check_expr(base);
                self.check_member(&base_op, *name, false, span)
            }
            ExprKind::PtrMember { base, name } => {
                let base_op = self.check_expr(base);
                self.check_member(&base_op, *name, true, span)
            }
            ExprKind::PostInc(inner)
            | ExprKind::PostDec(inner)
            | ExprKind::PreInc(inner)
            | ExprKind::PreDec(inner) => {
                let op = self.check_expr(inner);
                Operand::new(op.typ)
            }
            ExprKind::CompoundLiteral { type_name, items } => {
                let typ = self.check_type_name(type_name);
                let mut op = self.check_initializer_list(items, &typ, span);
                op.binding = Binding::LValue(None);
                op
            }
            ExprKind::Unary { op, expr } => self.check_unary(*op, expr, span),
            ExprKind::SizeofExpr(inner) => {
                self.ctx.push_mode(self.ctx.mode() - Mode::INT_CONST_EXPR);
                let op = self.check_expr(inner);
                self.ctx.pop_mode();
                self.size_query_operand(&op.typ, false, span)
            }
            ExprKind::SizeofType(tn) => {
                let mut mode = self.ctx.mode();
                if mode.contains(Mode::INT_CONST_EXPR) {
                    mode |= Mode::INT_CONST_EXPR_ANY_CAST;
                }
                self.ctx.push_mode(mode);
                let typ = self.check_type_name(tn);
                self.ctx.pop_mode();
                self.size_query_operand(&typ, false, span)
            }
            ExprKind::AlignofExpr(inner) => {
                self.ctx.push_mode(self.ctx.mode() - Mode::INT_CONST_EXPR);
                let op = self.check_expr(inner);
                self.ctx.pop_mode();
                self.size_query_operand(&op.typ, true, span)
            }
            ExprKind::AlignofType(tn) => {
                let mut mode = self.ctx.mode();
                if mode.contains(Mode::INT_CONST_EXPR) {
                    mode |= Mode::INT_CONST_EXPR_ANY_CAST;
                }
                self.ctx.push_mode(mode);
                let typ = self.check_type_name(tn);
                self.ctx.pop_mode();
                self.size_query_operand(&typ, true, span)
            }
            ExprKind::LabelAddr { .. } => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let void = self.ctx.cfg.abi.kind_type(Kind::Void);
                Operand::new(self.ctx.cfg.abi.pointer_to(void, TypeQualifiers::empty()))
            }
            ExprKind::Cast { type_name, expr } => {
                let target = self.check_type_name(type_name);
                let mut mode = self.ctx.mode();
                if mode.contains(Mode::INT_CONST_EXPR)
                    && !mode.contains(Mode::INT_CONST_EXPR_ANY_CAST)
                {
                    if target.kind() != Kind::Int {
                        mode -= Mode::INT_CONST_EXPR;
                    }
                    mode |= Mode::INT_CONST_EXPR_FLOAT;
                }
                self.ctx.push_mode(mode);
                let inner = self.check_expr(expr);
                self.ctx.pop_mode();
                self.check_cast(&inner, &target, span)
            }
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, span),
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                let c = self.check_expr(cond);
                let t = self.check_expr(then_expr);
                let f = self.check_expr(else_expr);
                if t.typ.is_arithmetic() && f.typ.is_arithmetic() {
                    let (t, f) = usual_arithmetic_conversions(self.ctx, span, &t, &f);
                    let value = if c.is_non_zero() {
                        t.value.clone()
                    } else if c.is_zero() {
                        f.value.clone()
                    } else {
                        None
                    };
                    Operand { typ: t.typ, value, offset: 0, binding: Binding::None }
                } else if c.is_non_zero() {
                    Operand::new(t.typ)
                } else {
                    Operand::new(f.typ)
                }
            }
            ExprKind::Assign { op: _, lhs, rhs } => {
                let l = self.check_expr(lhs);
                self.check_expr(rhs);
                Operand::new(l.typ.base())
            }
            ExprKind::Comma { lhs, rhs } => {
                self.check_expr(lhs);
                let r = self.check_expr(rhs);
                Operand { typ: r.typ, value: r.value, offset: 0, binding: Binding::None }
            }
            ExprKind::StmtExpr(items, _) => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                self.ctx.symbols.push_scope();
                self.check_block_items(items);
                self.ctx.symbols.pop_scope();
                let typ = items
                    .iter()
                    .rev()
                    .find_map(|item| match item {
                        BlockItem::Statement(Statement::Expr(Some(e), _)) => {
                            e.operand.as_ref().map(|op| op.typ.clone())
                        }
                        _ => None,
                    })
                    .unwrap_or_else(|| self.ctx.cfg.abi.kind_type(Kind::Void));
                Operand::new(typ)
            }
        };
        self.finish(e, span, op)
    }

    fn finish(&mut self, e: &mut Expr, _span: Span, op: Operand) -> Operand {
        e.operand = Some(op.clone());
        op
    }

    fn check_ident(&mut self, name: StringId, span: Span) -> Operand {
        match self.ctx.symbols.lookup(name).cloned() {
            // Enumeration constants are integer constants; no mode violation.
            Some(Symbol::EnumConst { typ, value }) => {
                Operand::with_value(typ, Value::Int64(value)).normalize(self.ctx, span)
            }
            Some(Symbol::Object { decl }) => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let typ = self.ctx.decl(decl).typ.clone();
                if typ.function().is_some() {
                    Operand {
                        typ,
                        value: None,
                        offset: 0,
                        binding: Binding::FuncDesignator(decl),
                    }
                } else {
                    Operand::lvalue(typ, Some(decl))
                }
            }
            Some(Symbol::Typedef { .. }) => {
                self.ctx.err(span, format!("unexpected type name: {}", name));
                Operand::none()
            }
            None => {
                self.ctx.err(span, format!("undefined: {}", name));
                Operand::none()
            }
        }
    }

    fn check_member(&mut self, base: &Operand, name: StringId, through_ptr: bool, span: Span) -> Operand {
        let t = base.typ.base();
        if t.kind() == Kind::Invalid {
            return Operand::none();
        }
        let record_type = if through_ptr {
            match t.kind() {
                Kind::Ptr | Kind::Array => t.elem().base(),
                _ => {
                    self.ctx.err(span, format!("not a pointer: {}", t));
                    return Operand::none();
                }
            }
        } else {
            t
        };
        let Some(rec) = record_type.record() else {
            self.ctx.err(span, format!("request for member {} in non-aggregate {}", name, record_type));
            return Operand::none();
        };
        if !rec.is_complete() {
            self.ctx.err(span, format!("incomplete type {}", record_type));
            return Operand::none();
        }
        match rec.find_field(name) {
            Some((off, field)) => Operand {
                typ: field.typ.clone(),
                value: None,
                offset: base.offset + off,
                binding: Binding::LValue(base.declarator()),
            },
            None => {
                self.ctx.err(span, format!("unknown field: {}", name));
                Operand::none()
            }
        }
    }

    fn check_unary(&mut self, op: UnaryOp, expr: &mut Expr, span: Span) -> Operand {
        match op {
            UnaryOp::AddrOf => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let inner = self.check_expr(expr);
                if inner.typ.kind() == Kind::Invalid {
                    return Operand::none();
                }
                let ptr = self.ctx.cfg.abi.pointer_to(inner.typ, TypeQualifiers::empty());
                Operand { typ: ptr, value: None, offset: inner.offset, binding: Binding::None }
            }
            UnaryOp::Deref => {
                self.ctx.not(span, Mode::INT_CONST_EXPR);
                let inner = self.check_expr(expr);
                let t = inner.typ.base();
                match t.kind() {
                    Kind::Ptr | Kind::Array => Operand {
                        typ: t.elem(),
                        value: None,
                        offset: 0,
                        binding: Binding::LValue(inner.declarator()),
                    },
                    Kind::Invalid => Operand::none(),
                    _ => {
                        self.ctx.err(span, format!("invalid indirection of {}", t));
                        Operand::none()
                    }
                }
            }
            UnaryOp::Plus => {
                let inner = self.check_expr(expr);
                self.arith_unary(inner, span, "unary plus", |v| Some(v.clone()))
            }
            UnaryOp::Minus => {
                let inner = self.check_expr(expr);
                self.arith_unary(inner, span, "unary minus", Value::neg)
            }
            UnaryOp::Cpl => {
                let inner = self.check_expr(expr);
                if inner.typ.kind() == Kind::Invalid {
                    return Operand::none();
                }
                if !inner.typ.is_integer() {
                    self.ctx.err(span, "wrong type argument to bit-complement");
                    return Operand::none();
                }
                let promoted = inner.integer_promotion(self.ctx, span);
                let value = promoted.value.as_ref().and_then(Value::cpl);
                Operand { typ: promoted.typ.clone(), value, offset: 0, binding: Binding::None }
                    .normalize(self.ctx, span)
            }
            UnaryOp::Not => {
                let inner = self.check_expr(expr);
                if inner.typ.kind() == Kind::Invalid {
                    return Operand::none();
                }
                let value = if inner.is_zero() {
                    Some(Value::Int64(1))
                } else if inner.is_non_zero() {
                    Some(Value::Int64(0))
                } else {
                    None
                };
                let int = self.ctx.cfg.abi.kind_type(Kind::Int);
                Operand { typ: int, value, offset: 0, binding: Binding::None }
            }
        }
    }

    fn arith_unary(
        &mut self,
        inner: Operand,
        span: Span,
        what: &str,
        f: impl Fn(&Value) -> Option<Value>,
    ) -> Operand {
        if inner.typ.kind() == Kind::Invalid {
            return Operand::none();
        }
        if !inner.typ.is_arithmetic() {
            self.ctx.err(span, format!("wrong type argument to {}", what));
            return Operand::none();
        }
        let promoted = if inner.typ.is_integer() {
            inner.integer_promotion(self.ctx, span)
        } else {
            inner
        };
        let value = promoted.value.as_ref().and_then(f);
        Operand { typ: promoted.typ.clone(), value, offset: 0, binding: Binding::None }
            .normalize(self.ctx, span)
    }

    /// The result of `sizeof`/`_Alignof`: a `size_t` constant. The reported
    /// size of a flexible array member is its element size.
    fn size_query_operand(&mut self, typ: &Type, alignment: bool, span: Span) -> Operand {
        if typ.kind() == Kind::Invalid {
            return Operand::none();
        }
        let value = if alignment {
            typ.align() as u64
        } else if typ.base().kind() == Kind::Array && typ.incomplete() {
            typ.elem().size()
        } else {
            if typ.incomplete() || typ.base().kind() == Kind::Function {
                self.ctx.err(span, format!("invalid application of sizeof to {}", typ));
            }
            typ.size()
        };
        let size_t = self.ctx.cfg.abi.kind_type(Kind::ULong);
        Operand::with_value(size_t, Value::Uint64(value)).normalize(self.ctx, span)
    }

    fn check_cast(&mut self, inner: &Operand, target: &Type, span: Span) -> Operand {
        if target.kind() == Kind::Invalid || inner.typ.kind() == Kind::Invalid {
            return Operand::none();
        }
        let target_ok = target.is_arithmetic()
            || matches!(target.base().kind(), Kind::Ptr | Kind::Void);
        if !target_ok {
            self.ctx.err(span, format!("conversion to non-scalar type {}", target));
            return Operand::none();
        }
        let source_ok = inner.typ.is_arithmetic()
            || matches!(inner.typ.base().kind(), Kind::Ptr | Kind::Array | Kind::Function | Kind::Void);
        if !source_ok {
            self.ctx.err(span, format!("conversion from non-scalar type {}", inner.typ));
            return Operand::new(target.clone());
        }
        inner.convert_to(self.ctx, span, &target.base())
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &mut Expr, rhs: &mut Expr, span: Span) -> Operand {
        let l = self.check_expr(lhs);
        let r = self.check_expr(rhs);
        if l.typ.kind() == Kind::Invalid || r.typ.kind() == Kind::Invalid {
            return Operand::none();
        }

        let both_arith = l.typ.is_arithmetic() && r.typ.is_arithmetic();
        match op {
            BinaryOp::Add | BinaryOp::Sub => {
                if both_arith {
                    let f: ValueBinOp = if op == BinaryOp::Add { Value::add } else { Value::sub };
                    return self.arith_binary(&l, &r, span, f);
                }
                self.pointer_additive(op, &l, &r, span)
            }
            BinaryOp::Mul | BinaryOp::Div => {
                if !both_arith {
                    self.ctx.err(span, "invalid operands to binary expression");
                    return Operand::none();
                }
                let f: ValueBinOp = if op == BinaryOp::Mul { Value::mul } else { Value::div };
                self.arith_binary(&l, &r, span, f)
            }
            BinaryOp::Mod => {
                if !(l.typ.is_integer() && r.typ.is_integer()) {
                    self.ctx.err(span, "invalid operands to binary expression");
                    return Operand::none();
                }
                self.arith_binary(&l, &r, span, Value::rem)
            }
            BinaryOp::Shl | BinaryOp::Shr => {
                if !(l.typ.is_integer() && r.typ.is_integer()) {
                    self.ctx.err(span, "invalid operands to binary expression");
                    return Operand::none();
                }
                // Shifts promote each operand independently; the result has
                // the promoted left type.
                let l = l.integer_promotion(self.ctx, span);
                let r = r.integer_promotion(self.ctx, span);
                let f: ValueBinOp = if op == BinaryOp::Shl { Value::lsh } else { Value::rsh };
                let value = match (&l.value, &r.value) {
                    (Some(a), Some(b)) => f(a, b),
                    _ => None,
                };
                Operand { typ: l.typ.clone(), value, offset: 0, binding: Binding::None }
                    .normalize(self.ctx, span)
            }
            BinaryOp::BitAnd | BinaryOp::BitXor | BinaryOp::BitOr => {
                if !(l.typ.is_integer() && r.typ.is_integer()) {
                    self.ctx.err(span, "invalid operands to binary expression");
                    return Operand::none();
                }
                let f: ValueBinOp = match op {
                    BinaryOp::BitAnd => Value::bit_and,
                    BinaryOp::BitXor => Value::bit_xor,
                    _ => Value::bit_or,
                };
                self.arith_binary(&l, &r, span, f)
            }
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge | BinaryOp::Eq
            | BinaryOp::Ne => {
                let int = self.ctx.cfg.abi.kind_type(Kind::Int);
                // String constants compare directly: equality by interned
                // id, ordering by canonical text (subject to the wide-string
                // ordering flag).
                let string_pair = matches!(
                    (&l.value, &r.value),
                    (Some(Value::String(_)), Some(Value::String(_)))
                        | (Some(Value::WideString(_)), Some(Value::WideString(_)))
                );
                if string_pair {
                    if !self.wide_ordering_permitted(op, &l, &r, span) {
                        return Operand::new(int);
                    }
                    let f: ValueBinOp = match op {
                        BinaryOp::Lt => Value::lt,
                        BinaryOp::Gt => Value::gt,
                        BinaryOp::Le => Value::le,
                        BinaryOp::Ge => Value::ge,
                        BinaryOp::Eq => Value::eq,
                        _ => Value::neq,
                    };
                    let value = match (&l.value, &r.value) {
                        (Some(x), Some(y)) => f(x, y),
                        _ => None,
                    };
                    return Operand { typ: int, value, offset: 0, binding: Binding::None };
                }
                if both_arith {
                    if op == BinaryOp::Eq || op == BinaryOp::Ne {
                        // Complex operands support equality only.
                    } else if l.typ.is_complex() || r.typ.is_complex() {
                        self.ctx.err(span, "invalid operands to binary expression");
                        return Operand::none();
                    }
                    let (a, b) = usual_arithmetic_conversions(self.ctx, span, &l, &r);
                    let f: ValueBinOp = match op {
                        BinaryOp::Lt => Value::lt,
                        BinaryOp::Gt => Value::gt,
                        BinaryOp::Le => Value::le,
                        BinaryOp::Ge => Value::ge,
                        BinaryOp::Eq => Value::eq,
                        _ => Value::neq,
                    };
                    let value = match (&a.value, &b.value) {
                        (Some(x), Some(y)) => f(x, y),
                        _ => None,
                    };
                    return Operand { typ: int, value, offset: 0, binding: Binding::None };
                }
                // Pointer comparisons type-check to int without a value.
                Operand::new(int)
            }
            BinaryOp::LogicalAnd => {
                let value = if l.is_zero() {
                    Some(Value::Int64(0))
                } else if l.is_non_zero() {
                    if r.is_zero() {
                        Some(Value::Int64(0))
                    } else if r.is_non_zero() {
                        Some(Value::Int64(1))
                    } else {
                        None
                    }
                } else {
                    None
                };
                let int = self.ctx.cfg.abi.kind_type(Kind::Int);
                Operand { typ: int, value, offset: 0, binding: Binding::None }
            }
            BinaryOp::LogicalOr => {
                let value = if l.is_non_zero() {
                    Some(Value::Int64(1))
                } else if l.is_zero() {
                    if r.is_non_zero() {
                        Some(Value::Int64(1))
                    } else if r.is_zero() {
                        Some(Value::Int64(0))
                    } else {
                        None
                    }
                } else {
                    None
                };
                let int = self.ctx.cfg.abi.kind_type(Kind::Int);
                Operand { typ: int, value, offset: 0, binding: Binding::None }
            }
        }
    }

    /// The wide-string ordering feature flag (see DESIGN.md): with text
    /// ordering disabled, relational operators on wide strings diagnose.
    fn wide_ordering_permitted(&mut self, op: BinaryOp, l: &Operand, r: &Operand, span: Span) -> bool {
        if self.ctx.cfg.wide_text_ordering {
            return true;
        }
        let relational = matches!(op, BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge);
        let wide = matches!(l.value, Some(Value::WideString(_)))
            || matches!(r.value, Some(Value::WideString(_)));
        if relational && wide {
            self.ctx.err(span, "ordering of wide string literals is not supported");
            return false;
        }
        true
    }

    fn arith_binary(
        &mut self,
        l: &Operand,
        r: &Operand,
        span: Span,
        f: impl Fn(&Value, &Value) -> Option<Value>,
    ) -> Operand {
        let (a, b) = usual_arithmetic_conversions(self.ctx, span, l, r);
        if a.typ.kind() == Kind::Invalid {
            return Operand::none();
        }
        let value = match (&a.value, &b.value) {
            (Some(x), Some(y)) => f(x, y),
            _ => None,
        };
        Operand { typ: a.typ.clone(), value, offset: 0, binding: Binding::None }
            .normalize(self.ctx, span)
    }

    fn pointer_additive(&mut self, op: BinaryOp, l: &Operand, r: &Operand, span: Span) -> Operand {
        let lk = l.typ.base().kind();
        let rk = r.typ.base().kind();
        let pointerish = |k: Kind| matches!(k, Kind::Ptr | Kind::Array);
        let decay = |me: &mut Self, o: &Operand| {
            let t = o.typ.base();
            if t.kind() == Kind::Array {
                me.ctx.cfg.abi.pointer_to(t.elem(), TypeQualifiers::empty())
            } else {
                t
            }
        };
        match op {
            BinaryOp::Add if pointerish(lk) && r.typ.is_integer() => {
                let t = decay(self, l);
                Operand::new(t)
            }
            BinaryOp::Add if l.typ.is_integer() && pointerish(rk) => {
                let t = decay(self, r);
                Operand::new(t)
            }
            BinaryOp::Sub if pointerish(lk) && r.typ.is_integer() => {
                let t = decay(self, l);
                Operand::new(t)
            }
            BinaryOp::Sub if pointerish(lk) && pointerish(rk) => {
                // ptrdiff_t is long on the supported ABIs.
                Operand::new(self.ctx.cfg.abi.kind_type(Kind::Long))
            }
            _ => {
                self.ctx.err(span, "invalid operands to binary expression");
                Operand::none()
            }
        }
    }

    /// Type an integer literal per C11 6.4.4.1: the first candidate type
    /// that can represent the value, candidates depending on the suffix and
    /// on whether the literal is decimal.
    fn int_literal_operand(
        &mut self,
        value: u64,
        base: IntBase,
        suffix: IntSuffix,
        span: Span,
    ) -> Operand {
        use Kind::*;
        let decimal = base == IntBase::Decimal;
        let candidates: &[Kind] = match (suffix, decimal) {
            (IntSuffix::None, true) => &[Int, Long, LongLong],
            (IntSuffix::None, false) => &[Int, UInt, Long, ULong, LongLong, ULongLong],
            (IntSuffix::U, _) => &[UInt, ULong, ULongLong],
            (IntSuffix::L, true) => &[Long, LongLong],
            (IntSuffix::L, false) => &[Long, ULong, LongLong, ULongLong],
            (IntSuffix::UL, _) => &[ULong, ULongLong],
            (IntSuffix::LL, true) => &[LongLong],
            (IntSuffix::LL, false) => &[LongLong, ULongLong],
            (IntSuffix::ULL, _) => &[ULongLong],
        };
        let kind = {
            let abi = &self.ctx.cfg.abi;
            candidates
                .iter()
                .copied()
                .find(|&k| {
                    let bits = abi.size_of(k) * 8;
                    if abi.is_signed_integer(k) {
                        if bits >= 64 {
                            value <= i64::MAX as u64
                        } else {
                            value < 1u64 << (bits - 1)
                        }
                    } else if bits >= 64 {
                        true
                    } else {
                        value < 1u64 << bits
                    }
                })
                .unwrap_or(*candidates.last().unwrap())
        };
        let typ = self.ctx.cfg.abi.kind_type(kind);
        let v = if typ.is_signed() { Value::Int64(value as i64) } else { Value::Uint64(value) };
        Operand::with_value(typ, v).normalize(self.ctx, span)
    }
}

fn qualifier_bit(q: TypeQualifierKind) -> TypeQualifiers {
    match q {
        TypeQualifierKind::Const => TypeQualifiers::CONST,
        TypeQualifierKind::Restrict => TypeQualifiers::RESTRICT,
        TypeQualifierKind::Volatile => TypeQualifiers::VOLATILE,
        TypeQualifierKind::Atomic => TypeQualifiers::ATOMIC,
    }
}

fn qualifier_bits(quals: &[TypeQualifierKind]) -> TypeQualifiers {
    quals.iter().fold(TypeQualifiers::empty(), |acc, &q| acc | qualifier_bit(q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Abi;
    use crate::common::intern::intern;
    use crate::context::Config;

    fn ctx() -> Context {
        Context::new(Config::new(Abi::linux_amd64())).unwrap()
    }

    fn sp() -> Span {
        Span::dummy()
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, sp())
    }

    fn int_lit(v: u64) -> Expr {
        expr(ExprKind::IntLiteral { value: v, base: IntBase::Decimal, suffix: IntSuffix::None })
    }

    fn uint_lit(v: u64) -> Expr {
        expr(ExprKind::IntLiteral { value: v, base: IntBase::Decimal, suffix: IntSuffix::U })
    }

    fn float_lit(v: f64) -> Expr {
        expr(ExprKind::FloatLiteral { value: v, suffix: FloatSuffix::None })
    }

    fn binary(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        expr(ExprKind::Binary { op, lhs: Box::new(l), rhs: Box::new(r) })
    }

    fn type_name(specs: Vec<TypeSpecifier>) -> TypeName {
        TypeName::new(specs.into_iter().map(SpecifierQualifier::Type).collect(), None, sp())
    }

    fn cast_to(specs: Vec<TypeSpecifier>, e: Expr) -> Expr {
        expr(ExprKind::Cast { type_name: Box::new(type_name(specs)), expr: Box::new(e) })
    }

    fn ident_declarator(name: &str) -> Declarator {
        Declarator::new(Vec::new(), DirectDeclarator::Ident(intern(name), sp()), sp())
    }

    fn array_declarator(name: &str, size: Option<Expr>) -> Declarator {
        Declarator::new(
            Vec::new(),
            DirectDeclarator::Array {
                base: Box::new(DirectDeclarator::Ident(intern(name), sp())),
                qualifiers: Vec::new(),
                size: size.map(Box::new),
                span: sp(),
            },
            sp(),
        )
    }

    fn int_specs() -> Vec<DeclarationSpecifier> {
        vec![DeclarationSpecifier::Type(TypeSpecifier::Int(sp()))]
    }

    fn declaration(specifiers: Vec<DeclarationSpecifier>, d: Declarator) -> Declaration {
        Declaration {
            specifiers,
            declarators: vec![InitDeclarator { declarator: d, initializer: None }],
            span: sp(),
        }
    }

    fn bit_field_member(name: &str, width: u64) -> StructDeclarator {
        StructDeclarator {
            declarator: Some(ident_declarator(name)),
            bit_width: Some(int_lit(width)),
            span: sp(),
        }
    }

    fn int_member(decls: Vec<StructDeclarator>) -> StructDeclaration {
        StructDeclaration {
            specifiers: vec![SpecifierQualifier::Type(TypeSpecifier::Int(sp()))],
            declarators: decls,
            span: sp(),
        }
    }

    #[test]
    fn test_array_size_float_constant_rejected() {
        // int a[1.0];
        let mut ctx = ctx();
        let mut d = declaration(int_specs(), array_declarator("a", Some(float_lit(1.0))));
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert_eq!(ctx.diags.error_count(), 1);
        assert!(ctx.diags.diagnostics()[0]
            .message
            .contains("invalid integer constant expression"));
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_array_size_cast_to_int_accepted() {
        // int a[(int)1.0];
        let mut ctx = ctx();
        let size = cast_to(vec![TypeSpecifier::Int(sp())], float_lit(1.0));
        let mut d = declaration(int_specs(), array_declarator("a", Some(size)));
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        let typ = d.declarators[0].declarator.typ.as_ref().unwrap();
        assert_eq!(typ.kind(), Kind::Array);
        assert_eq!(typ.len(), 1);
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_array_size_cast_to_double_rejected() {
        // int a[(double)1.0]; casts to non-int types leave the integer
        // constant dialect.
        let mut ctx = ctx();
        let size = cast_to(vec![TypeSpecifier::Double(sp())], float_lit(1.0));
        let mut d = declaration(int_specs(), array_declarator("a", Some(size)));
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        // The cast operand itself is fine (float constants become legal),
        // but the resulting double is not an integer constant.
        assert!(ctx.diags.has_errors());
    }

    #[test]
    fn test_identifier_in_integer_constant_expression() {
        // int x; int a[x];
        let mut ctx = ctx();
        let mut dx = declaration(int_specs(), ident_declarator("x"));
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_declaration(&mut dx, true);
        let size = expr(ExprKind::Ident { name: intern("x") });
        let mut da = declaration(int_specs(), array_declarator("a", Some(size)));
        checker.check_declaration(&mut da, true);
        assert!(ctx.diags.diagnostics().iter().any(|d| d
            .message
            .contains("invalid integer constant expression")));
    }

    #[test]
    fn test_sizeof_operand_is_unevaluated() {
        // int x; int a[sizeof x]; -- the identifier under sizeof does not
        // violate the integer-constant mode, and the bound is 4.
        let mut ctx = ctx();
        let mut dx = declaration(int_specs(), ident_declarator("x"));
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_declaration(&mut dx, true);
        let size = expr(ExprKind::SizeofExpr(Box::new(expr(ExprKind::Ident {
            name: intern("x"),
        }))));
        let mut da = declaration(int_specs(), array_declarator("a", Some(size)));
        checker.check_declaration(&mut da, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        let typ = da.declarators[0].declarator.typ.as_ref().unwrap();
        assert_eq!(typ.len(), 4);
    }

    #[test]
    fn test_enum_value_may_use_sizeof() {
        // enum { E = sizeof(double) };
        let mut ctx = ctx();
        let e_name = intern("E");
        let enumerator = Enumerator {
            name: e_name,
            value: Some(expr(ExprKind::SizeofType(Box::new(type_name(vec![
                TypeSpecifier::Double(sp()),
            ]))))),
            span: sp(),
        };
        let spec = crate::ast::EnumSpecifier { tag: None, enumerators: Some(vec![enumerator]), span: sp() };
        let mut d = Declaration {
            specifiers: vec![DeclarationSpecifier::Type(TypeSpecifier::Enum(spec))],
            declarators: Vec::new(),
            span: sp(),
        };
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        match ctx.symbols.lookup(e_name) {
            Some(Symbol::EnumConst { value, .. }) => assert_eq!(*value, 8),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_bit_field_struct_layout_and_registry() {
        // struct { int f0:2, f1:3, f2:20, f3:10, f4; } x;
        let mut ctx = ctx();
        let sou = StructOrUnionSpecifier {
            is_union: false,
            tag: None,
            members: Some(vec![int_member(vec![
                bit_field_member("f0", 2),
                bit_field_member("f1", 3),
                bit_field_member("f2", 20),
                bit_field_member("f3", 10),
                StructDeclarator {
                    declarator: Some(ident_declarator("f4")),
                    bit_width: None,
                    span: sp(),
                },
            ])]),
            span: sp(),
        };
        let specs = vec![DeclarationSpecifier::Type(TypeSpecifier::StructOrUnion(sou))];
        let mut d = declaration(specs, ident_declarator("x"));
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());

        let typ = d.declarators[0].declarator.typ.as_ref().unwrap().clone();
        let rec = typ.record().unwrap();
        assert_eq!(rec.size(), 12);
        assert_eq!(rec.align(), 4);
        {
            let fields = rec.fields();
            assert_eq!(fields[1].bit_field_mask, 0x1c);
            assert_eq!(fields[3].offset, 4);
            assert_eq!(fields[3].bit_field_mask, 0x3ff);
            assert_eq!(fields[4].offset, 8);
        }
        assert!(ctx
            .struct_shapes()
            .contains(&crate::context::StructShape { size: 12, align: 4 }));
    }

    #[test]
    fn test_member_access_offset_and_lvalue() {
        // struct S { char c; int i; }; struct S s; s.i
        let mut ctx = ctx();
        let tag = intern("S");
        let sou = StructOrUnionSpecifier {
            is_union: false,
            tag: Some(tag),
            members: Some(vec![
                StructDeclaration {
                    specifiers: vec![SpecifierQualifier::Type(TypeSpecifier::Char(sp()))],
                    declarators: vec![StructDeclarator {
                        declarator: Some(ident_declarator("c")),
                        bit_width: None,
                        span: sp(),
                    }],
                    span: sp(),
                },
                int_member(vec![StructDeclarator {
                    declarator: Some(ident_declarator("i")),
                    bit_width: None,
                    span: sp(),
                }]),
            ]),
            span: sp(),
        };
        let mut d = declaration(
            vec![DeclarationSpecifier::Type(TypeSpecifier::StructOrUnion(sou))],
            ident_declarator("s"),
        );
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_declaration(&mut d, true);

        let mut e = expr(ExprKind::Member {
            base: Box::new(expr(ExprKind::Ident { name: intern("s") })),
            name: intern("i"),
        });
        let op = checker.check_expr(&mut e);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        assert_eq!(op.typ.kind(), Kind::Int);
        assert_eq!(op.offset, 4);
        assert!(op.is_lvalue());
        assert!(op.declarator().is_some());
    }

    #[test]
    fn test_self_referential_struct() {
        // struct node { struct node *next; int v; };
        let mut ctx = ctx();
        let tag = intern("node");
        let next = Declarator::new(
            vec![crate::ast::PointerDeclarator { qualifiers: Vec::new(), span: sp() }],
            DirectDeclarator::Ident(intern("next"), sp()),
            sp(),
        );
        let sou = StructOrUnionSpecifier {
            is_union: false,
            tag: Some(tag),
            members: Some(vec![
                StructDeclaration {
                    specifiers: vec![SpecifierQualifier::Type(TypeSpecifier::StructOrUnion(
                        StructOrUnionSpecifier {
                            is_union: false,
                            tag: Some(tag),
                            members: None,
                            span: sp(),
                        },
                    ))],
                    declarators: vec![StructDeclarator {
                        declarator: Some(next),
                        bit_width: None,
                        span: sp(),
                    }],
                    span: sp(),
                },
                int_member(vec![StructDeclarator {
                    declarator: Some(ident_declarator("v")),
                    bit_width: None,
                    span: sp(),
                }]),
            ]),
            span: sp(),
        };
        let mut d = Declaration {
            specifiers: vec![DeclarationSpecifier::Type(TypeSpecifier::StructOrUnion(sou))],
            declarators: Vec::new(),
            span: sp(),
        };
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        match ctx.lookup_tag(tag) {
            Some(TagEntry::Record(rec)) => {
                assert!(rec.is_complete());
                assert_eq!(rec.size(), 16);
                assert_eq!(rec.align(), 8);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_typedef_resolution() {
        // typedef int myint; myint x;
        let mut ctx = ctx();
        let mut td = Declaration {
            specifiers: vec![
                DeclarationSpecifier::StorageClass(StorageClassSpecifier::Typedef, sp()),
                DeclarationSpecifier::Type(TypeSpecifier::Int(sp())),
            ],
            declarators: vec![InitDeclarator {
                declarator: ident_declarator("myint"),
                initializer: None,
            }],
            span: sp(),
        };
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_declaration(&mut td, true);
        let mut dx = declaration(
            vec![DeclarationSpecifier::Type(TypeSpecifier::TypedefName(intern("myint"), sp()))],
            ident_declarator("x"),
        );
        checker.check_declaration(&mut dx, true);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        assert_eq!(dx.declarators[0].declarator.typ.as_ref().unwrap().kind(), Kind::Int);
    }

    #[test]
    fn test_storage_class_conflicts() {
        // static extern int x; -- rejected
        let mut ctx = ctx();
        let mut d = declaration(
            vec![
                DeclarationSpecifier::StorageClass(StorageClassSpecifier::Static, sp()),
                DeclarationSpecifier::StorageClass(StorageClassSpecifier::Extern, sp()),
                DeclarationSpecifier::Type(TypeSpecifier::Int(sp())),
            ],
            ident_declarator("x"),
        );
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(ctx.diags.has_errors());

        // _Thread_local static int y; -- accepted
        let mut ctx2 = self::ctx();
        let mut d2 = declaration(
            vec![
                DeclarationSpecifier::StorageClass(StorageClassSpecifier::ThreadLocal, sp()),
                DeclarationSpecifier::StorageClass(StorageClassSpecifier::Static, sp()),
                DeclarationSpecifier::Type(TypeSpecifier::Int(sp())),
            ],
            ident_declarator("y"),
        );
        Checker { ctx: &mut ctx2 }.check_declaration(&mut d2, true);
        assert!(!ctx2.diags.has_errors(), "{:?}", ctx2.diags.diagnostics());
    }

    #[test]
    fn test_unsigned_arithmetic_result() {
        // 1 + 2U has type unsigned int and value 3.
        let mut ctx = ctx();
        let mut e = binary(BinaryOp::Add, int_lit(1), uint_lit(2));
        let op = Checker { ctx: &mut ctx }.check_expr(&mut e);
        assert_eq!(op.typ.kind(), Kind::UInt);
        assert!(matches!(op.value, Some(Value::Uint64(3))));
    }

    #[test]
    fn test_shift_result_has_promoted_left_type() {
        let mut ctx = ctx();
        let mut e = binary(BinaryOp::Shl, int_lit(1), uint_lit(3));
        let op = Checker { ctx: &mut ctx }.check_expr(&mut e);
        assert_eq!(op.typ.kind(), Kind::Int);
        assert!(matches!(op.value, Some(Value::Int64(8))));
    }

    #[test]
    fn test_division_by_zero_constant_is_unevaluated() {
        let mut ctx = ctx();
        let mut e = binary(BinaryOp::Div, int_lit(7), int_lit(0));
        let op = Checker { ctx: &mut ctx }.check_expr(&mut e);
        assert_eq!(op.typ.kind(), Kind::Int);
        assert!(op.value.is_none());
        assert!(!ctx.diags.has_errors());
    }

    #[test]
    fn test_conditional_folds_constant_condition() {
        let mut ctx = ctx();
        let mut e = expr(ExprKind::Conditional {
            cond: Box::new(int_lit(1)),
            then_expr: Box::new(int_lit(2)),
            else_expr: Box::new(int_lit(3)),
        });
        let op = Checker { ctx: &mut ctx }.check_expr(&mut e);
        assert!(matches!(op.value, Some(Value::Int64(2))));
    }

    #[test]
    fn test_long_double_nan_propagation() {
        // (long double)(0.0/0.0) is NaN-tagged; arithmetic keeps the tag and
        // comparisons in either direction are false.
        let mut ctx = ctx();
        let nan = cast_to(
            vec![TypeSpecifier::Long(sp()), TypeSpecifier::Double(sp())],
            binary(BinaryOp::Div, float_lit(0.0), float_lit(0.0)),
        );
        let mut checker = Checker { ctx: &mut ctx };

        let mut sum = binary(BinaryOp::Add, nan.clone(), float_lit(1.0));
        let op = checker.check_expr(&mut sum);
        assert_eq!(op.typ.kind(), Kind::LongDouble);
        match &op.value {
            Some(Value::Float128(x)) => assert!(x.is_nan()),
            other => panic!("unexpected: {:?}", other),
        }

        let mut lt = binary(BinaryOp::Lt, nan.clone(), float_lit(1.0));
        let op = checker.check_expr(&mut lt);
        assert!(matches!(op.value, Some(Value::Int64(0))));
        let mut gt = binary(BinaryOp::Gt, nan, float_lit(1.0));
        let op = checker.check_expr(&mut gt);
        assert!(matches!(op.value, Some(Value::Int64(0))));
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
    }

    #[test]
    fn test_float_saturation_through_casts() {
        // (unsigned char)300.0f == 255, (signed char)-300.0 == -128
        let mut ctx = ctx();
        let mut checker = Checker { ctx: &mut ctx };
        let mut e = cast_to(
            vec![TypeSpecifier::Unsigned(sp()), TypeSpecifier::Char(sp())],
            expr(ExprKind::FloatLiteral { value: 300.0, suffix: FloatSuffix::F }),
        );
        let op = checker.check_expr(&mut e);
        assert!(matches!(op.value, Some(Value::Uint64(255))));

        let neg = expr(ExprKind::Unary {
            op: UnaryOp::Minus,
            expr: Box::new(float_lit(300.0)),
        });
        let mut e = cast_to(vec![TypeSpecifier::Signed(sp()), TypeSpecifier::Char(sp())], neg);
        let op = checker.check_expr(&mut e);
        assert!(matches!(op.value, Some(Value::Int64(-128))));
    }

    #[test]
    fn test_string_literal_type_and_guard() {
        let mut ctx = ctx();
        let mut checker = Checker { ctx: &mut ctx };
        let mut e = expr(ExprKind::StringLiteral { id: intern("hi") });
        let op = checker.check_expr(&mut e);
        assert_eq!(op.typ.kind(), Kind::Array);
        assert_eq!(op.typ.len(), 3);
        assert!(matches!(op.value, Some(Value::String(_))));
        assert!(!ctx.diags.has_errors());

        // In an integer constant expression a string literal is rejected.
        let mut e = expr(ExprKind::StringLiteral { id: intern("hi") });
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_const_expr(&mut e, Mode::INT_CONST_EXPR);
        assert!(ctx.diags.has_errors());
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_function_definition_and_body() {
        // int f(int x) { return x + 1; }
        let mut ctx = ctx();
        let param = ParameterDeclaration {
            specifiers: int_specs(),
            declarator: Some(ident_declarator("x")),
            abstract_declarator: None,
            span: sp(),
        };
        let declarator = Declarator::new(
            Vec::new(),
            DirectDeclarator::Function {
                base: Box::new(DirectDeclarator::Ident(intern("f"), sp())),
                params: vec![param],
                variadic: false,
                span: sp(),
            },
            sp(),
        );
        let ret = Statement::Return(
            Some(binary(
                BinaryOp::Add,
                expr(ExprKind::Ident { name: intern("x") }),
                int_lit(1),
            )),
            sp(),
        );
        let mut f = FunctionDefinition {
            specifiers: int_specs(),
            declarator,
            body: vec![BlockItem::Statement(ret)],
            span: sp(),
        };
        Checker { ctx: &mut ctx }.check_function_definition(&mut f);
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
        match &f.body[0] {
            BlockItem::Statement(Statement::Return(Some(e), _)) => {
                assert_eq!(e.operand.as_ref().unwrap().typ.kind(), Kind::Int);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_union_bit_field_rejected() {
        // union { int f:3; } u;
        let mut ctx = ctx();
        let sou = StructOrUnionSpecifier {
            is_union: true,
            tag: None,
            members: Some(vec![int_member(vec![bit_field_member("f", 3)])]),
            span: sp(),
        };
        let mut d = declaration(
            vec![DeclarationSpecifier::Type(TypeSpecifier::StructOrUnion(sou))],
            ident_declarator("u"),
        );
        Checker { ctx: &mut ctx }.check_declaration(&mut d, true);
        assert!(ctx.diags.diagnostics().iter().any(|d| d.message.contains("bit-field")));
    }

    #[test]
    fn test_flexible_array_member_sizeof() {
        // struct v { long n; int data[]; }; sizeof on the member reports
        // the element size.
        let mut ctx = ctx();
        let tag = intern("v");
        let sou = StructOrUnionSpecifier {
            is_union: false,
            tag: Some(tag),
            members: Some(vec![
                StructDeclaration {
                    specifiers: vec![SpecifierQualifier::Type(TypeSpecifier::Long(sp()))],
                    declarators: vec![StructDeclarator {
                        declarator: Some(ident_declarator("n")),
                        bit_width: None,
                        span: sp(),
                    }],
                    span: sp(),
                },
                int_member(vec![StructDeclarator {
                    declarator: Some(array_declarator("data", None)),
                    bit_width: None,
                    span: sp(),
                }]),
            ]),
            span: sp(),
        };
        let mut d = declaration(
            vec![DeclarationSpecifier::Type(TypeSpecifier::StructOrUnion(sou))],
            ident_declarator("s"),
        );
        let mut checker = Checker { ctx: &mut ctx };
        checker.check_declaration(&mut d, true);

        let member = expr(ExprKind::Member {
            base: Box::new(expr(ExprKind::Ident { name: intern("s") })),
            name: intern("data"),
        });
        let mut e = expr(ExprKind::SizeofExpr(Box::new(member)));
        let op = checker.check_expr(&mut e);
        assert!(matches!(op.value, Some(Value::Uint64(4))));
        assert!(!ctx.diags.has_errors(), "{:?}", ctx.diags.diagnostics());
    }
}
