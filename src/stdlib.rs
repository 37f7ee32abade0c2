//! The built-in function registry.
//!
//! Every [`Builtin`] has a type signature, used by the checker, and an
//! implementation, used by the interpreter. Signatures are instantiated
//! afresh on every call to [`Builtin::signature`], which is the only source
//! of polymorphism in the language.

use std::{cell::RefCell, rc::Rc, sync::Arc};

use crate::{
    interp::{
        RuntimeError,
        value::{List, Value},
    },
    span::Span,
    ty::Ty,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Gt,
    Eq,
    And,
    Or,
    Not,
    StringConcat,
    StringLength,
    IntToString,
    Cons,
    Car,
    Cdr,
    IsEmpty,
    Ref,
    GetRef,
    SetRef,
    Fix,
}

impl Builtin {
    pub const ALL: [Builtin; 21] = [
        Builtin::Add,
        Builtin::Sub,
        Builtin::Mul,
        Builtin::Div,
        Builtin::Lt,
        Builtin::Gt,
        Builtin::Eq,
        Builtin::And,
        Builtin::Or,
        Builtin::Not,
        Builtin::StringConcat,
        Builtin::StringLength,
        Builtin::IntToString,
        Builtin::Cons,
        Builtin::Car,
        Builtin::Cdr,
        Builtin::IsEmpty,
        Builtin::Ref,
        Builtin::GetRef,
        Builtin::SetRef,
        Builtin::Fix,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Lt => "<",
            Builtin::Gt => ">",
            Builtin::Eq => "=",
            Builtin::And => "and",
            Builtin::Or => "or",
            Builtin::Not => "not",
            Builtin::StringConcat => "string-concat",
            Builtin::StringLength => "string-length",
            Builtin::IntToString => "int->string",
            Builtin::Cons => "cons",
            Builtin::Car => "car",
            Builtin::Cdr => "cdr",
            Builtin::IsEmpty => "empty?",
            Builtin::Ref => "ref",
            Builtin::GetRef => "get-ref",
            Builtin::SetRef => "set-ref",
            Builtin::Fix => "fix",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::Not
            | Builtin::StringLength
            | Builtin::IntToString
            | Builtin::Car
            | Builtin::Cdr
            | Builtin::IsEmpty
            | Builtin::Ref
            | Builtin::GetRef
            | Builtin::Fix => 1,
            _ => 2,
        }
    }

    /// Returns the type of `self`, with fresh metavariables in place of any
    /// polymorphic parameters.
    pub fn signature(self) -> Arc<Ty> {
        let int2 = || [Ty::int(), Ty::int()];

        match self {
            Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => {
                Ty::arrow(int2(), Ty::int())
            }
            Builtin::Lt | Builtin::Gt => Ty::arrow(int2(), Ty::bool()),
            Builtin::Eq => {
                let a = Ty::fresh();
                Ty::arrow([a.clone(), a], Ty::bool())
            }
            Builtin::And | Builtin::Or => {
                Ty::arrow([Ty::bool(), Ty::bool()], Ty::bool())
            }
            Builtin::Not => Ty::arrow([Ty::bool()], Ty::bool()),
            Builtin::StringConcat => {
                Ty::arrow([Ty::str(), Ty::str()], Ty::str())
            }
            Builtin::StringLength => Ty::arrow([Ty::str()], Ty::int()),
            Builtin::IntToString => Ty::arrow([Ty::int()], Ty::str()),
            Builtin::Cons => {
                let a = Ty::fresh();
                let list = Ty::list(a.clone());
                Ty::arrow([a, list.clone()], list)
            }
            Builtin::Car => {
                let a = Ty::fresh();
                Ty::arrow([Ty::list(a.clone())], a)
            }
            Builtin::Cdr => {
                let list = Ty::list(Ty::fresh());
                Ty::arrow([list.clone()], list)
            }
            Builtin::IsEmpty => Ty::arrow([Ty::list(Ty::fresh())], Ty::bool()),
            Builtin::Ref => {
                let a = Ty::fresh();
                Ty::arrow([a.clone()], Ty::reference(a))
            }
            Builtin::GetRef => {
                let a = Ty::fresh();
                Ty::arrow([Ty::reference(a.clone())], a)
            }
            Builtin::SetRef => {
                let a = Ty::fresh();
                Ty::arrow([Ty::reference(a.clone()), a], Ty::void())
            }
            Builtin::Fix => {
                let f = Ty::arrow([Ty::fresh()], Ty::fresh());
                Ty::arrow([Ty::arrow([f.clone()], f.clone())], f)
            }
        }
    }

    /// Applies `self` to `args`.
    pub fn apply<'a>(
        self,
        args: &[Value<'a>],
        span: Span,
    ) -> Result<Value<'a>, RuntimeError> {
        let overflow = || RuntimeError::Overflow {
            op: self.name(),
            span,
        };

        match (self, args) {
            (Builtin::Add, [a, b]) => {
                let (a, b) = (a.as_int(span)?, b.as_int(span)?);
                a.checked_add(b).map(Value::Int).ok_or_else(overflow)
            }
            (Builtin::Sub, [a, b]) => {
                let (a, b) = (a.as_int(span)?, b.as_int(span)?);
                a.checked_sub(b).map(Value::Int).ok_or_else(overflow)
            }
            (Builtin::Mul, [a, b]) => {
                let (a, b) = (a.as_int(span)?, b.as_int(span)?);
                a.checked_mul(b).map(Value::Int).ok_or_else(overflow)
            }
            (Builtin::Div, [a, b]) => {
                let (a, b) = (a.as_int(span)?, b.as_int(span)?);
                match b {
                    0 => Err(RuntimeError::DivisionByZero { span }),
                    _ => a.checked_div(b).map(Value::Int).ok_or_else(overflow),
                }
            }
            (Builtin::Lt, [a, b]) => {
                Ok(Value::Bool(a.as_int(span)? < b.as_int(span)?))
            }
            (Builtin::Gt, [a, b]) => {
                Ok(Value::Bool(a.as_int(span)? > b.as_int(span)?))
            }
            (Builtin::Eq, [a, b]) => a
                .structural_eq(b)
                .map(Value::Bool)
                .ok_or(RuntimeError::Incomparable { span }),
            (Builtin::And, [a, b]) => {
                Ok(Value::Bool(a.as_bool(span)? && b.as_bool(span)?))
            }
            (Builtin::Or, [a, b]) => {
                Ok(Value::Bool(a.as_bool(span)? || b.as_bool(span)?))
            }
            (Builtin::Not, [a]) => Ok(Value::Bool(!a.as_bool(span)?)),
            (Builtin::StringConcat, [a, b]) => {
                let joined = format!("{}{}", a.as_str(span)?, b.as_str(span)?);
                Ok(Value::Str(joined.into()))
            }
            (Builtin::StringLength, [s]) => {
                let length = s.as_str(span)?.chars().count();
                i64::try_from(length).map(Value::Int).map_err(|_| overflow())
            }
            (Builtin::IntToString, [n]) => {
                Ok(Value::Str(n.as_int(span)?.to_string().into()))
            }
            (Builtin::Cons, [head, tail]) => {
                let tail = tail.as_list(span)?;
                Ok(Value::List(List::cons(head.clone(), tail.clone())))
            }
            (Builtin::Car, [list]) => match list.as_list(span)?.split() {
                Some((head, _)) => Ok(head.clone()),
                None => Err(RuntimeError::EmptyList { op: "car", span }),
            },
            (Builtin::Cdr, [list]) => match list.as_list(span)?.split() {
                Some((_, tail)) => Ok(Value::List(tail.clone())),
                None => Err(RuntimeError::EmptyList { op: "cdr", span }),
            },
            (Builtin::IsEmpty, [list]) => {
                Ok(Value::Bool(list.as_list(span)?.is_empty()))
            }
            (Builtin::Ref, [value]) => {
                Ok(Value::Ref(Rc::new(RefCell::new(value.clone()))))
            }
            (Builtin::GetRef, [cell]) => Ok(cell.as_ref_cell(span)?.borrow().clone()),
            (Builtin::SetRef, [cell, value]) => {
                *cell.as_ref_cell(span)?.borrow_mut() = value.clone();
                Ok(Value::Void)
            }
            (Builtin::Fix, [functional]) => {
                Ok(Value::Fix(Rc::new(functional.clone())))
            }
            _ => Err(RuntimeError::ArityMismatch {
                expected: self.arity(),
                found: args.len(),
                span,
            }),
        }
    }
}
