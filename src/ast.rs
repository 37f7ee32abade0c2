//! The abstract syntax tree produced by the [parser](crate::parser).
//!
//! # Spanning Data Conventions
//! Every expression is stored as a [`Spanned<Expr>`], and the same holds for
//! parameters, field labels, and type annotations. Where a node has no
//! separately meaningful sub-location (e.g. the `let` keyword itself), only
//! the enclosing node's span is kept.

use std::sync::Arc;

use crate::span::{SpanBox, SpanSeq, Spanned};

pub mod print;

/// An identifier, shared between the AST, the typing context, and the
/// runtime environment.
pub type Name = Arc<str>;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `#t` or `#f`.
    Bool(bool),
    /// A decimal integer literal.
    Int(i64),
    /// A string literal, with its escapes already resolved.
    Str(Arc<str>),
    /// A reference to a local binding or a built-in.
    Var(Name),
    /// `(if <cond> <then> <else>)`
    If {
        cond: SpanBox<Self>,
        then: SpanBox<Self>,
        else_: SpanBox<Self>,
    },
    /// `(let <name> <value> <body>)`, where `name` is in scope in `value`.
    Let {
        name: Spanned<Name>,
        value: SpanBox<Self>,
        body: SpanBox<Self>,
    },
    /// `(lambda (<params>) <body>)`
    Lambda {
        params: SpanSeq<Param>,
        body: SpanBox<Self>,
    },
    /// `(<callee> <args>)`
    App {
        callee: SpanBox<Self>,
        args: SpanSeq<Self>,
    },
    /// `(list <elems>)`
    List(SpanSeq<Self>),
    /// The empty list, `empty`.
    Empty,
    /// `(cons <head> <tail>)`
    Cons {
        head: SpanBox<Self>,
        tail: SpanBox<Self>,
    },
    /// `{<label>: <value> ...}`, a closed record.
    Record(Box<[Field<Self>]>),
    /// `(get-field <record> "<label>")`
    GetField {
        record: SpanBox<Self>,
        label: Spanned<Name>,
    },
    /// `(ref <value>)`
    MakeRef(SpanBox<Self>),
    /// `(get-ref <cell>)`
    GetRef(SpanBox<Self>),
    /// `(set-ref <cell> <value>)`
    SetRef {
        cell: SpanBox<Self>,
        value: SpanBox<Self>,
    },
}

/// A labelled entry in a record literal or a record type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Field<T> {
    pub label: Spanned<Name>,
    pub value: Spanned<T>,
}

/// A lambda parameter with an optional type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Spanned<Name>,
    pub ty: Option<Spanned<TyAst>>,
}

/// A type annotation as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub enum TyAst {
    Bool,
    Int,
    Str,
    Void,
    /// `(Listof <elem>)`
    List(SpanBox<Self>),
    /// `(Refof <elem>)`
    Ref(SpanBox<Self>),
    /// `(-> <domain> <codomain>)`
    Arrow {
        domain: SpanSeq<Self>,
        codomain: SpanBox<Self>,
    },
    /// `{<label>: <ty> ...}`, where a trailing `...` makes the row open.
    Record { fields: Box<[Field<Self>]>, open: bool },
}
