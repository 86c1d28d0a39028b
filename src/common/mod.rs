pub mod error;
pub mod intern;
pub mod scope;
pub mod source;
