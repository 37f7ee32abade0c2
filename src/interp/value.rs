//! Runtime values.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc, sync::Arc};

use pretty::RcDoc;

use crate::{
    ast::{Expr, Name, Param},
    span::{Span, Spanned},
    stdlib::Builtin,
    ty::print::{DEFAULT_WIDTH, braces, sexp},
};

use super::{EnvId, RuntimeError};

/// A runtime value, borrowing function bodies from the program's AST.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Bool(bool),
    Int(i64),
    Str(Arc<str>),
    Void,
    List(List<'a>),
    Record(Rc<BTreeMap<Name, Value<'a>>>),
    Ref(Rc<RefCell<Value<'a>>>),
    Closure(Rc<Closure<'a>>),
    Builtin(Builtin),
    /// The fixpoint of a functional, as produced by `fix`.
    Fix(Rc<Value<'a>>),
}

#[derive(Debug)]
pub struct Closure<'a> {
    pub params: &'a [Spanned<Param>],
    pub body: &'a Spanned<Expr>,
    pub env: EnvId<'a>,
}

/// A persistent singly linked list.
#[derive(Debug, Clone, Default)]
pub struct List<'a>(Option<Rc<Node<'a>>>);

#[derive(Debug)]
struct Node<'a> {
    head: Value<'a>,
    tail: List<'a>,
}

impl<'a> List<'a> {
    pub fn nil() -> Self {
        Self(None)
    }

    pub fn cons(head: Value<'a>, tail: Self) -> Self {
        Self(Some(Rc::new(Node { head, tail })))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn split(&self) -> Option<(&Value<'a>, &Self)> {
        self.0.as_deref().map(|node| (&node.head, &node.tail))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value<'a>> {
        std::iter::successors(self.split(), |(_, tail)| tail.split())
            .map(|(head, _)| head)
    }
}

impl Drop for List<'_> {
    // unlinks uniquely owned nodes one at a time
    fn drop(&mut self) {
        let mut next = self.0.take();

        while let Some(node) = next {
            next = match Rc::try_unwrap(node) {
                Ok(mut node) => node.tail.0.take(),
                Err(_) => None,
            };
        }
    }
}

impl<'a> FromIterator<Value<'a>> for List<'a> {
    fn from_iter<I: IntoIterator<Item = Value<'a>>>(iter: I) -> Self {
        let values: Vec<_> = iter.into_iter().collect();
        values
            .into_iter()
            .rev()
            .fold(List::nil(), |tail, head| List::cons(head, tail))
    }
}

impl<'a> Value<'a> {
    /// A short description of the kind of `self`, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Str(_) => "string",
            Value::Void => "void",
            Value::List(_) => "list",
            Value::Record(_) => "record",
            Value::Ref(_) => "reference",
            Value::Closure(_) | Value::Builtin(_) | Value::Fix(_) => "procedure",
        }
    }

    pub fn as_bool(&self, span: Span) -> Result<bool, RuntimeError> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.wrong_kind("boolean", span)),
        }
    }

    pub fn as_int(&self, span: Span) -> Result<i64, RuntimeError> {
        match self {
            Value::Int(n) => Ok(*n),
            _ => Err(self.wrong_kind("integer", span)),
        }
    }

    pub fn as_str(&self, span: Span) -> Result<&str, RuntimeError> {
        match self {
            Value::Str(s) => Ok(s),
            _ => Err(self.wrong_kind("string", span)),
        }
    }

    pub fn as_list(&self, span: Span) -> Result<&List<'a>, RuntimeError> {
        match self {
            Value::List(list) => Ok(list),
            _ => Err(self.wrong_kind("list", span)),
        }
    }

    pub fn as_ref_cell(
        &self,
        span: Span,
    ) -> Result<&RefCell<Value<'a>>, RuntimeError> {
        match self {
            Value::Ref(cell) => Ok(cell),
            _ => Err(self.wrong_kind("reference", span)),
        }
    }

    fn wrong_kind(&self, expected: &'static str, span: Span) -> RuntimeError {
        RuntimeError::WrongKind {
            expected,
            found: self.kind(),
            span,
        }
    }

    /// Compares two values structurally, returning `None` if a procedure is
    /// encountered. References are equal only if they are the same cell.
    pub fn structural_eq(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a == b),
            (Value::Int(a), Value::Int(b)) => Some(a == b),
            (Value::Str(a), Value::Str(b)) => Some(a == b),
            (Value::Void, Value::Void) => Some(true),
            (Value::List(a), Value::List(b)) => {
                let (mut a, mut b) = (a.iter(), b.iter());
                loop {
                    match (a.next(), b.next()) {
                        (None, None) => return Some(true),
                        (Some(x), Some(y)) => {
                            if !x.structural_eq(y)? {
                                return Some(false);
                            }
                        }
                        _ => return Some(false),
                    }
                }
            }
            (Value::Record(a), Value::Record(b)) => {
                if !a.keys().eq(b.keys()) {
                    return Some(false);
                }

                for (x, y) in a.values().zip(b.values()) {
                    if !x.structural_eq(y)? {
                        return Some(false);
                    }
                }

                Some(true)
            }
            (Value::Ref(a), Value::Ref(b)) => Some(Rc::ptr_eq(a, b)),
            (
                Value::Closure(_) | Value::Builtin(_) | Value::Fix(_),
                _,
            )
            | (
                _,
                Value::Closure(_) | Value::Builtin(_) | Value::Fix(_),
            ) => None,
            _ => Some(false),
        }
    }

    pub fn to_doc(&self) -> RcDoc<'static, ()> {
        match self {
            Value::Bool(true) => RcDoc::text("#t"),
            Value::Bool(false) => RcDoc::text("#f"),
            Value::Int(n) => RcDoc::as_string(n),
            Value::Str(s) => RcDoc::text(escape(s)),
            Value::Void => RcDoc::text("#<void>"),
            Value::List(list) => {
                sexp("list", list.iter().map(Value::to_doc).collect())
            }
            Value::Record(fields) => braces(
                fields
                    .iter()
                    .map(|(label, value)| {
                        RcDoc::text(label.to_string())
                            .append(RcDoc::text(":"))
                            .append(value.to_doc())
                    })
                    .collect(),
            ),
            Value::Ref(cell) => sexp("ref", vec![cell.borrow().to_doc()]),
            Value::Closure(_) | Value::Fix(_) => RcDoc::text("#<procedure>"),
            Value::Builtin(builtin) => {
                RcDoc::text(format!("#<builtin {}>", builtin.name()))
            }
        }
    }

    pub fn print(&self, width: usize) -> String {
        self.to_doc().pretty(width).to_string()
    }
}

impl std::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.print(DEFAULT_WIDTH))
    }
}

/// Renders `s` as a string literal.
pub fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    escaped.push('"');

    for c in s.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str(r#"\""#),
            '\n' => escaped.push_str(r"\n"),
            '\r' => escaped.push_str(r"\r"),
            '\t' => escaped.push_str(r"\t"),
            '\0' => escaped.push_str(r"\0"),
            c => escaped.push(c),
        }
    }

    escaped.push('"');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record<'a>(fields: impl IntoIterator<Item = (&'static str, Value<'a>)>) -> Value<'a> {
        Value::Record(Rc::new(
            fields
                .into_iter()
                .map(|(label, value)| (Name::from(label), value))
                .collect(),
        ))
    }

    #[test]
    fn print_values() {
        let list = List::from_iter([Value::Int(1), Value::Int(2)]);

        assert_eq!(Value::Bool(true).to_string(), "#t");
        assert_eq!(Value::Int(-4).to_string(), "-4");
        assert_eq!(Value::Str("a\"b\n".into()).to_string(), r#""a\"b\n""#);
        assert_eq!(Value::Void.to_string(), "#<void>");
        assert_eq!(Value::List(list).to_string(), "(list 1 2)");
        assert_eq!(Value::List(List::nil()).to_string(), "(list)");
        assert_eq!(
            record([("b", Value::Str("x".into())), ("a", Value::Int(1))]).to_string(),
            r#"{a:1 b:"x"}"#
        );
        assert_eq!(
            Value::Ref(Rc::new(RefCell::new(Value::Int(1)))).to_string(),
            "(ref 1)"
        );
        assert_eq!(Value::Builtin(Builtin::Add).to_string(), "#<builtin +>");
    }

    #[test]
    fn structural_equality() {
        let a = List::from_iter([Value::Int(1), Value::Int(2)]);
        let b = List::from_iter([Value::Int(1), Value::Int(2)]);
        let c = List::from_iter([Value::Int(1)]);

        assert_eq!(Value::List(a.clone()).structural_eq(&Value::List(b)), Some(true));
        assert_eq!(Value::List(a).structural_eq(&Value::List(c)), Some(false));
        assert_eq!(
            record([("a", Value::Int(1))]).structural_eq(&record([("a", Value::Int(1))])),
            Some(true)
        );
        assert_eq!(
            Value::Builtin(Builtin::Add).structural_eq(&Value::Builtin(Builtin::Add)),
            None
        );
    }

    #[test]
    fn references_compare_by_identity() {
        let cell = Rc::new(RefCell::new(Value::Int(1)));
        let same = Value::Ref(cell.clone());
        let other = Value::Ref(Rc::new(RefCell::new(Value::Int(1))));

        assert_eq!(Value::Ref(cell).structural_eq(&same), Some(true));
        assert_eq!(same.structural_eq(&other), Some(false));
    }
}
