//! Semantic-analysis core of a C11 front-end.
//!
//! Given a parsed translation unit, the crate performs type construction,
//! ABI-directed layout of aggregates (including C bit-field packing), the
//! usual arithmetic conversions, and compile-time evaluation of constant
//! expressions. A downstream back-end consumes the annotated tree; the
//! preprocessor, lexer, and parser are external collaborators that produce
//! the `ast` data model this crate checks.
//!
//! ```
//! use csema::abi::Abi;
//! use csema::context::{Config, Context};
//!
//! let mut ctx = Context::new(Config::new(Abi::linux_amd64())).unwrap();
//! let mut tu = csema::ast::TranslationUnit::default();
//! csema::check::check_translation_unit(&mut ctx, &mut tu);
//! assert!(!ctx.diags.has_errors());
//! ```

pub mod abi;
pub mod ast;
pub mod check;
pub mod common;
pub mod context;
pub mod float128;
pub mod operand;
pub mod types;
pub mod value;

pub use abi::{Abi, AbiError, AbiType, ByteOrder};
pub use check::check_translation_unit;
pub use context::{Config, Context, Mode};
pub use operand::{Binding, Operand};
pub use types::{Kind, Type};
pub use value::Value;
