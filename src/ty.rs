//! Canonical representations of types.
//!
//! Types are immutable trees shared through [`Arc`]. They are never compared
//! structurally; two types are considered equivalent only once the
//! [unifier](crate::typeck::unify) has made them so.

use std::{collections::BTreeMap, sync::Arc};

use crate::{ast::Name, unique::Uid};

pub mod print;

/// A record field label.
pub type Label = Name;

/// A monomorphic type, possibly containing unresolved metavariables.
#[derive(Debug, Clone)]
pub enum Ty {
    /// A primitive type.
    Prim(PrimTy),
    /// A homogeneous linked list.
    List(Arc<Self>),
    /// A mutable reference cell.
    Ref(Arc<Self>),
    /// A record, described by its row.
    Record(Row),
    /// A function type with a domain of arbitrary arity.
    Arrow {
        domain: Box<[Arc<Self>]>,
        codomain: Arc<Self>,
    },
    /// An unresolved metavariable.
    Var(MetaVar),
}

/// A primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimTy {
    Bool,
    Int,
    Str,
    Void,
}

impl PrimTy {
    pub fn name(self) -> &'static str {
        match self {
            PrimTy::Bool => "bool",
            PrimTy::Int => "int",
            PrimTy::Str => "str",
            PrimTy::Void => "void",
        }
    }
}

/// The field set of a record type.
#[derive(Debug, Clone)]
pub struct Row {
    pub fields: BTreeMap<Label, Arc<Ty>>,
    pub tail: RowTail,
}

/// Whether a [`Row`] lists *exactly* its fields, or *at least* its fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowTail {
    Closed,
    Open(RowVar),
}

/// A type metavariable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaVar(Uid);

impl MetaVar {
    pub fn fresh() -> Self {
        Self(Uid::fresh())
    }
}

/// A row variable, standing for the unknown remainder of an open row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RowVar(Uid);

impl RowVar {
    pub fn fresh() -> Self {
        Self(Uid::fresh())
    }
}

/// Either kind of variable, as reported by the occurs check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    Ty(MetaVar),
    Row(RowVar),
}

impl Ty {
    pub fn bool() -> Arc<Self> {
        Arc::new(Ty::Prim(PrimTy::Bool))
    }

    pub fn int() -> Arc<Self> {
        Arc::new(Ty::Prim(PrimTy::Int))
    }

    pub fn str() -> Arc<Self> {
        Arc::new(Ty::Prim(PrimTy::Str))
    }

    pub fn void() -> Arc<Self> {
        Arc::new(Ty::Prim(PrimTy::Void))
    }

    pub fn list(elem: Arc<Self>) -> Arc<Self> {
        Arc::new(Ty::List(elem))
    }

    pub fn reference(inner: Arc<Self>) -> Arc<Self> {
        Arc::new(Ty::Ref(inner))
    }

    pub fn record(row: Row) -> Arc<Self> {
        Arc::new(Ty::Record(row))
    }

    pub fn arrow(
        domain: impl IntoIterator<Item = Arc<Self>>,
        codomain: Arc<Self>,
    ) -> Arc<Self> {
        Arc::new(Ty::Arrow {
            domain: domain.into_iter().collect(),
            codomain,
        })
    }

    /// Returns a fresh metavariable.
    pub fn fresh() -> Arc<Self> {
        Arc::new(Ty::Var(MetaVar::fresh()))
    }

    /// Returns `true` if `self` contains no metavariables or row variables.
    pub fn is_concrete(&self) -> bool {
        match self {
            Ty::Prim(_) => true,
            Ty::List(elem) | Ty::Ref(elem) => elem.is_concrete(),
            Ty::Record(row) => row.is_concrete(),
            Ty::Arrow { domain, codomain } => {
                domain.iter().all(|ty| ty.is_concrete()) && codomain.is_concrete()
            }
            Ty::Var(_) => false,
        }
    }
}

impl Row {
    /// Returns a closed row with exactly the given fields.
    pub fn closed(fields: BTreeMap<Label, Arc<Ty>>) -> Self {
        Self {
            fields,
            tail: RowTail::Closed,
        }
    }

    /// Returns an open row with at least the given fields.
    pub fn open(fields: BTreeMap<Label, Arc<Ty>>, tail: RowVar) -> Self {
        Self {
            fields,
            tail: RowTail::Open(tail),
        }
    }

    /// Returns an open row with no known fields, equivalent to a bare row
    /// variable.
    pub fn var(tail: RowVar) -> Self {
        Self::open(BTreeMap::new(), tail)
    }

    pub fn is_concrete(&self) -> bool {
        self.tail == RowTail::Closed
            && self.fields.values().all(|ty| ty.is_concrete())
    }
}
