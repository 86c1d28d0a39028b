//! The parsed-tree data model consumed by the checker.
//!
//! This is input data, not a parser: a grammar-shaped CST whose nodes the
//! surrounding front-end produces. Expression nodes carry a span and an
//! `operand` slot the checker fills in place; `TypeName` and `Declarator`
//! nodes likewise carry their resolved types after checking.

use crate::common::intern::StringId;
use crate::common::source::Span;
use crate::context::DeclId;
use crate::operand::Operand;
use crate::types::Type;

#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub decls: Vec<ExternalDeclaration>,
}

#[derive(Debug, Clone)]
pub enum ExternalDeclaration {
    Declaration(Declaration),
    FunctionDefinition(FunctionDefinition),
    Empty,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub specifiers: Vec<DeclarationSpecifier>,
    pub declarator: Declarator,
    pub body: Vec<BlockItem>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Declaration {
    pub specifiers: Vec<DeclarationSpecifier>,
    pub declarators: Vec<InitDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DeclarationSpecifier {
    StorageClass(StorageClassSpecifier, Span),
    Type(TypeSpecifier),
    Qualifier(TypeQualifierKind, Span),
    Function(FunctionSpecifierKind, Span),
    Alignment(AlignmentSpecifier),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClassSpecifier {
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeQualifierKind {
    Const,
    Restrict,
    Volatile,
    Atomic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionSpecifierKind {
    Inline,
    Noreturn,
}

/// `_Alignas(type-name)` or `_Alignas(constant-expression)`.
#[derive(Debug, Clone)]
pub enum AlignmentSpecifier {
    Type(Box<TypeName>, Span),
    Expr(Box<Expr>, Span),
}

#[derive(Debug, Clone)]
pub enum TypeSpecifier {
    Void(Span),
    Char(Span),
    Short(Span),
    Int(Span),
    Long(Span),
    Float(Span),
    Double(Span),
    Signed(Span),
    Unsigned(Span),
    Bool(Span),
    Complex(Span),
    Int128(Span),
    Float16(Span),
    Float32(Span),
    Float64(Span),
    Float128(Span),
    StructOrUnion(StructOrUnionSpecifier),
    Enum(EnumSpecifier),
    TypedefName(StringId, Span),
    Atomic(Box<TypeName>, Span),
}

impl TypeSpecifier {
    pub fn span(&self) -> Span {
        match self {
            TypeSpecifier::Void(s)
            | TypeSpecifier::Char(s)
            | TypeSpecifier::Short(s)
            | TypeSpecifier::Int(s)
            | TypeSpecifier::Long(s)
            | TypeSpecifier::Float(s)
            | TypeSpecifier::Double(s)
            | TypeSpecifier::Signed(s)
            | TypeSpecifier::Unsigned(s)
            | TypeSpecifier::Bool(s)
            | TypeSpecifier::Complex(s)
            | TypeSpecifier::Int128(s)
            | TypeSpecifier::Float16(s)
            | TypeSpecifier::Float32(s)
            | TypeSpecifier::Float64(s)
            | TypeSpecifier::Float128(s)
            | TypeSpecifier::TypedefName(_, s)
            | TypeSpecifier::Atomic(_, s) => *s,
            TypeSpecifier::StructOrUnion(sou) => sou.span,
            TypeSpecifier::Enum(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StructOrUnionSpecifier {
    pub is_union: bool,
    pub tag: Option<StringId>,
    /// `None` for a bare tag reference, `Some` for a definition.
    pub members: Option<Vec<StructDeclaration>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDeclaration {
    pub specifiers: Vec<SpecifierQualifier>,
    pub declarators: Vec<StructDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum SpecifierQualifier {
    Type(TypeSpecifier),
    Qualifier(TypeQualifierKind, Span),
}

#[derive(Debug, Clone)]
pub struct StructDeclarator {
    /// `None` for an anonymous member or an unnamed bit-field.
    pub declarator: Option<Declarator>,
    pub bit_width: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumSpecifier {
    pub tag: Option<StringId>,
    pub enumerators: Option<Vec<Enumerator>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    pub name: StringId,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InitDeclarator {
    pub declarator: Declarator,
    pub initializer: Option<Initializer>,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub pointers: Vec<PointerDeclarator>,
    pub direct: DirectDeclarator,
    pub span: Span,
    /// Filled by the checker.
    pub typ: Option<Type>,
    /// Filled by the checker: the arena entry for the declared name.
    pub decl: Option<DeclId>,
}

impl Declarator {
    pub fn new(pointers: Vec<PointerDeclarator>, direct: DirectDeclarator, span: Span) -> Self {
        Declarator { pointers, direct, span, typ: None, decl: None }
    }

    /// The declared identifier, if this declarator names one.
    pub fn name(&self) -> Option<StringId> {
        self.direct.name()
    }
}

#[derive(Debug, Clone)]
pub struct PointerDeclarator {
    pub qualifiers: Vec<TypeQualifierKind>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum DirectDeclarator {
    Ident(StringId, Span),
    Paren(Box<Declarator>),
    Array {
        base: Box<DirectDeclarator>,
        qualifiers: Vec<TypeQualifierKind>,
        size: Option<Box<Expr>>,
        span: Span,
    },
    Function {
        base: Box<DirectDeclarator>,
        params: Vec<ParameterDeclaration>,
        variadic: bool,
        span: Span,
    },
}

impl DirectDeclarator {
    pub fn name(&self) -> Option<StringId> {
        match self {
            DirectDeclarator::Ident(name, _) => Some(*name),
            DirectDeclarator::Paren(d) => d.direct.name(),
            DirectDeclarator::Array { base, .. } | DirectDeclarator::Function { base, .. } => {
                base.name()
            }
        }
    }

    pub fn span(&self) -> Span {
        match self {
            DirectDeclarator::Ident(_, s) => *s,
            DirectDeclarator::Paren(d) => d.span,
            DirectDeclarator::Array { span, .. } | DirectDeclarator::Function { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    pub specifiers: Vec<DeclarationSpecifier>,
    pub declarator: Option<Declarator>,
    pub abstract_declarator: Option<AbstractDeclarator>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeName {
    pub specifiers: Vec<SpecifierQualifier>,
    pub declarator: Option<AbstractDeclarator>,
    pub span: Span,
    /// Filled by the checker.
    pub typ: Option<Type>,
}

impl TypeName {
    pub fn new(specifiers: Vec<SpecifierQualifier>, declarator: Option<AbstractDeclarator>, span: Span) -> Self {
        TypeName { specifiers, declarator, span, typ: None }
    }
}

#[derive(Debug, Clone)]
pub struct AbstractDeclarator {
    pub pointers: Vec<PointerDeclarator>,
    pub direct: Option<DirectAbstractDeclarator>,
}

#[derive(Debug, Clone)]
pub enum DirectAbstractDeclarator {
    Paren(Box<AbstractDeclarator>),
    Array {
        base: Option<Box<DirectAbstractDeclarator>>,
        size: Option<Box<Expr>>,
        span: Span,
    },
    Function {
        base: Option<Box<DirectAbstractDeclarator>>,
        params: Vec<ParameterDeclaration>,
        variadic: bool,
        span: Span,
    },
}

#[derive(Debug, Clone)]
pub enum Initializer {
    Expr(Box<Expr>),
    List(Vec<InitializerItem>, Span),
}

#[derive(Debug, Clone)]
pub struct InitializerItem {
    pub designators: Vec<Designator>,
    pub initializer: Initializer,
}

#[derive(Debug, Clone)]
pub enum Designator {
    Index(Box<Expr>, Span),
    Field(StringId, Span),
}

#[derive(Debug, Clone)]
pub enum BlockItem {
    Declaration(Declaration),
    Statement(Statement),
}

#[derive(Debug, Clone)]
pub enum Statement {
    Labeled { name: StringId, body: Box<Statement>, span: Span },
    Case { expr: Expr, body: Box<Statement>, span: Span },
    /// GCC case range: `case lo ... hi:`.
    CaseRange { lo: Expr, hi: Expr, body: Box<Statement>, span: Span },
    Default { body: Box<Statement>, span: Span },
    Compound(Vec<BlockItem>, Span),
    Expr(Option<Expr>, Span),
    If { cond: Expr, then_branch: Box<Statement>, else_branch: Option<Box<Statement>>, span: Span },
    Switch { cond: Expr, body: Box<Statement>, span: Span },
    While { cond: Expr, body: Box<Statement>, span: Span },
    DoWhile { body: Box<Statement>, cond: Expr, span: Span },
    For {
        init: Option<ForInit>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Statement>,
        span: Span,
    },
    Goto(StringId, Span),
    Continue(Span),
    Break(Span),
    Return(Option<Expr>, Span),
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Declaration(Box<Declaration>),
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntBase {
    Decimal,
    Octal,
    Hex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntSuffix {
    None,
    U,
    L,
    UL,
    LL,
    ULL,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatSuffix {
    None,
    F,
    L,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    AddrOf,
    Deref,
    Plus,
    Minus,
    Cpl,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    And,
    Xor,
    Or,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Filled by the checker.
    pub operand: Option<Operand>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span, operand: None }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral { value: u64, base: IntBase, suffix: IntSuffix },
    FloatLiteral { value: f64, suffix: FloatSuffix },
    CharLiteral { value: i64 },
    WideCharLiteral { value: i64 },
    StringLiteral { id: StringId },
    WideStringLiteral { id: StringId },
    Ident { name: StringId },
    Paren(Box<Expr>),
    Index { base: Box<Expr>, index: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    Member { base: Box<Expr>, name: StringId },
    PtrMember { base: Box<Expr>, name: StringId },
    PostInc(Box<Expr>),
    PostDec(Box<Expr>),
    PreInc(Box<Expr>),
    PreDec(Box<Expr>),
    CompoundLiteral { type_name: Box<TypeName>, items: Vec<InitializerItem> },
    Unary { op: UnaryOp, expr: Box<Expr> },
    SizeofExpr(Box<Expr>),
    SizeofType(Box<TypeName>),
    AlignofExpr(Box<Expr>),
    AlignofType(Box<TypeName>),
    /// GCC label address: `&&label`.
    LabelAddr { name: StringId },
    Cast { type_name: Box<TypeName>, expr: Box<Expr> },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Conditional { cond: Box<Expr>, then_expr: Box<Expr>, else_expr: Box<Expr> },
    Assign { op: AssignOp, lhs: Box<Expr>, rhs: Box<Expr> },
    Comma { lhs: Box<Expr>, rhs: Box<Expr> },
    /// GCC statement expression: `({ ... })`.
    StmtExpr(Vec<BlockItem>, Span),
}
