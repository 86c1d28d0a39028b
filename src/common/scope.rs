//! Scoped symbol table for the checker.
//!
//! Ordinary identifiers, typedef names, and enumeration constants share one
//! C namespace, so a single table per scope holds all three entry kinds.
//! Tags (`struct`/`union`/`enum` names) live in their own registry on the
//! context, not here.

use rustc_hash::FxHashMap;

use crate::common::intern::StringId;
use crate::context::DeclId;
use crate::types::Type;

/// What a name resolves to.
#[derive(Debug, Clone)]
pub enum Symbol {
    /// An object or function, backed by an entry in the declarator arena.
    Object { decl: DeclId },
    /// A typedef name.
    Typedef { typ: Type },
    /// An enumeration constant and its value.
    EnumConst { typ: Type, value: i64 },
}

#[derive(Debug, Default)]
struct Scope {
    symbols: FxHashMap<StringId, Symbol>,
}

/// Scoped symbol table supporting nested lexical scopes.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![Scope::default()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "popping the file scope");
        self.scopes.pop();
    }

    /// Declare `name` in the innermost scope, shadowing outer entries.
    pub fn declare(&mut self, name: StringId, symbol: Symbol) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.symbols.insert(name, symbol);
        }
    }

    /// Look `name` up, innermost scope first.
    pub fn lookup(&self, name: StringId) -> Option<&Symbol> {
        self.scopes.iter().rev().find_map(|s| s.symbols.get(&name))
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
