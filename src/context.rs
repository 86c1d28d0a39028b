//! Per-translation-unit checking context.
//!
//! The context threads everything the walk needs: the validated ABI, the
//! diagnostic sink with its error budget, the constant-expression mode
//! stack, the declarator arena, the ordinary-identifier scopes, the tag
//! registry, and the struct-shape registry. One context serves exactly one
//! translation unit and is not shared across threads.

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::abi::{Abi, AbiError};
use crate::common::error::DiagnosticEngine;
use crate::common::intern::StringId;
use crate::common::scope::SymbolTable;
use crate::common::source::Span;
use crate::types::{EnumType, RecordType, Type};

bitflags! {
    /// Constant-expression dialect currently in force (C11 6.6).
    ///
    /// `INT_CONST_EXPR` rejects identifiers, addresses, strings, and
    /// compound statements. `INT_CONST_EXPR_FLOAT` additionally permits
    /// floating constants (they must be immediate operands of casts to
    /// integer types). `INT_CONST_EXPR_ANY_CAST` additionally permits casts
    /// to any arithmetic type, as inside `sizeof(T)` and `_Alignof(T)`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mode: u8 {
        const INT_CONST_EXPR = 1 << 0;
        const INT_CONST_EXPR_FLOAT = 1 << 1;
        const INT_CONST_EXPR_ANY_CAST = 1 << 2;
    }
}

bitflags! {
    /// Storage-class and function-specifier flags folded out of the
    /// declaration specifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeclFlags: u16 {
        const TYPEDEF = 1 << 0;
        const EXTERN = 1 << 1;
        const STATIC = 1 << 2;
        const AUTO = 1 << 3;
        const REGISTER = 1 << 4;
        const THREAD_LOCAL = 1 << 5;
        const INLINE = 1 << 6;
        const NORETURN = 1 << 7;
    }
}

impl DeclFlags {
    /// The mutually-exclusive storage classes (`_Thread_local` aside).
    pub fn storage_classes(self) -> DeclFlags {
        self & (DeclFlags::TYPEDEF
            | DeclFlags::EXTERN
            | DeclFlags::STATIC
            | DeclFlags::AUTO
            | DeclFlags::REGISTER
            | DeclFlags::THREAD_LOCAL)
    }
}

/// Linkage of a declared identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    None,
    Internal,
    External,
}

/// Index into the context's declarator arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u32);

/// What the checker records about a declared identifier. Operand constness
/// and l-value bindings refer back to these entries.
#[derive(Debug, Clone)]
pub struct DeclInfo {
    pub name: StringId,
    pub typ: Type,
    pub linkage: Linkage,
    pub flags: DeclFlags,
    pub span: Span,
}

impl DeclInfo {
    pub fn is_static(&self) -> bool {
        self.flags.contains(DeclFlags::STATIC)
    }
}

/// An observed aggregate shape; the set of these is handed to downstream
/// code emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructShape {
    pub size: u64,
    pub align: u8,
}

/// A registered `struct`/`union`/`enum` tag.
#[derive(Debug, Clone)]
pub enum TagEntry {
    Record(std::rc::Rc<RecordType>),
    Enum(std::rc::Rc<EnumType>),
}

/// Checker configuration.
#[derive(Debug)]
pub struct Config {
    pub abi: Abi,
    /// Maximum number of errors before the sink asks the walk to stop.
    /// Zero means unlimited.
    pub error_limit: usize,
    /// Mode bits in force at the start of the walk.
    pub default_mode: Mode,
    /// When set, size-8 signed float saturation clamps to `i64::MIN`
    /// instead of the default `i32::MIN`.
    pub exact_float_saturation: bool,
    /// When set (the default), wide strings order by their interned text
    /// bytes; when clear, ordering wide strings is diagnosed.
    pub wide_text_ordering: bool,
}

impl Config {
    pub fn new(abi: Abi) -> Self {
        Config {
            abi,
            error_limit: 0,
            default_mode: Mode::empty(),
            exact_float_saturation: false,
            wide_text_ordering: true,
        }
    }
}

/// Mutable state for checking one translation unit.
#[derive(Debug)]
pub struct Context {
    pub cfg: Config,
    pub diags: DiagnosticEngine,
    pub symbols: SymbolTable,
    mode: Mode,
    mode_stack: Vec<Mode>,
    decls: Vec<DeclInfo>,
    tags: FxHashMap<StringId, TagEntry>,
    struct_shapes: FxHashSet<StructShape>,
}

impl Context {
    /// Build a context, validating the ABI first. A failed sanity check
    /// blocks all further work.
    pub fn new(mut cfg: Config) -> Result<Self, AbiError> {
        cfg.abi.sanity_check()?;
        let diags = DiagnosticEngine::new(cfg.error_limit);
        let mode = cfg.default_mode;
        Ok(Context {
            cfg,
            diags,
            symbols: SymbolTable::new(),
            mode,
            mode_stack: Vec::new(),
            decls: Vec::new(),
            tags: FxHashMap::default(),
            struct_shapes: FxHashSet::default(),
        })
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Depth of the mode stack; balanced push/pop means this is unchanged
    /// across any complete `check` call.
    pub fn mode_depth(&self) -> usize {
        self.mode_stack.len()
    }

    pub fn push_mode(&mut self, mode: Mode) {
        self.mode_stack.push(self.mode);
        self.mode = mode;
    }

    pub fn pop_mode(&mut self) {
        self.mode = self.mode_stack.pop().expect("internal error: mode stack underflow");
    }

    /// Report an error; returns `true` while the budget permits continuing.
    pub fn err(&mut self, span: Span, message: impl Into<String>) -> bool {
        self.diags.error(span, message)
    }

    /// Report a mode violation if any of `forbidden` is in force.
    pub fn not(&mut self, span: Span, forbidden: Mode) {
        if self.mode.intersects(forbidden) {
            self.err(span, "invalid integer constant expression");
        }
    }

    pub fn declare(&mut self, info: DeclInfo) -> DeclId {
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(info);
        id
    }

    pub fn decl(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.0 as usize]
    }

    pub fn lookup_tag(&self, tag: StringId) -> Option<&TagEntry> {
        self.tags.get(&tag)
    }

    pub fn register_tag(&mut self, tag: StringId, entry: TagEntry) {
        self.tags.insert(tag, entry);
    }

    /// Record an observed aggregate shape for downstream code emission.
    pub fn record_shape(&mut self, size: u64, align: u8) {
        if self.struct_shapes.insert(StructShape { size, align }) {
            debug!(size, align, "registered struct shape");
        }
    }

    pub fn struct_shapes(&self) -> &FxHashSet<StructShape> {
        &self.struct_shapes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new(Config::new(Abi::linux_amd64())).unwrap()
    }

    #[test]
    fn test_mode_stack_discipline() {
        let mut ctx = ctx();
        assert_eq!(ctx.mode(), Mode::empty());
        ctx.push_mode(Mode::INT_CONST_EXPR);
        assert_eq!(ctx.mode(), Mode::INT_CONST_EXPR);
        ctx.push_mode(ctx.mode() | Mode::INT_CONST_EXPR_FLOAT);
        assert!(ctx.mode().contains(Mode::INT_CONST_EXPR_FLOAT));
        ctx.pop_mode();
        assert_eq!(ctx.mode(), Mode::INT_CONST_EXPR);
        ctx.pop_mode();
        assert_eq!(ctx.mode(), Mode::empty());
        assert_eq!(ctx.mode_depth(), 0);
    }

    #[test]
    fn test_mode_violation_reporting() {
        let mut ctx = ctx();
        ctx.not(Span::dummy(), Mode::INT_CONST_EXPR);
        assert!(!ctx.diags.has_errors());
        ctx.push_mode(Mode::INT_CONST_EXPR);
        ctx.not(Span::dummy(), Mode::INT_CONST_EXPR);
        assert_eq!(ctx.diags.error_count(), 1);
        assert!(ctx.diags.diagnostics()[0]
            .message
            .contains("invalid integer constant expression"));
    }

    #[test]
    fn test_shape_registry_is_a_set() {
        let mut ctx = ctx();
        ctx.record_shape(16, 8);
        ctx.record_shape(16, 8);
        ctx.record_shape(12, 4);
        assert_eq!(ctx.struct_shapes().len(), 2);
    }

    #[test]
    fn test_invalid_abi_blocks_context() {
        let mut abi = Abi::linux_amd64();
        abi.max_packed_bitfield_width = 1000;
        assert!(Context::new(Config::new(abi)).is_err());
    }
}
