//! A type checker and interpreter for a small Racket-like language with
//! Hindley-Milner inference and row-polymorphic records.

pub mod ast;
pub mod driver;
pub mod interp;
pub mod literal;
pub mod parser;
pub mod source_file;
pub mod span;
mod stack;
pub mod stdlib;
pub mod token;
pub mod ty;
pub mod typeck;
pub mod unique;
