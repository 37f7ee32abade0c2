//! Pretty-printing for [`Ty`] values.
//!
//! Metavariables print as `'a`, `'b`, ..., `'z`, `'a1`, `'b1`, ..., named in
//! order of first appearance. Names are only stable within a single
//! [`TyPrinter`], so to print several related types (e.g. both sides of a
//! mismatch) with consistent names, use the same printer for all of them.

use std::collections::HashMap;

use pretty::RcDoc;

use crate::stack;

use super::{MetaVar, Row, RowTail, Ty};

/// The default line width for printed types.
pub const DEFAULT_WIDTH: usize = 80;

/// Renders `ty` with a fresh variable naming.
pub fn print_type(ty: &Ty) -> String {
    TyPrinter::new().print(ty)
}

#[derive(Debug, Default)]
pub struct TyPrinter {
    names: HashMap<MetaVar, String>,
    width: Option<usize>,
}

impl TyPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_width(width: usize) -> Self {
        Self {
            width: Some(width),
            ..Self::default()
        }
    }

    pub fn print(&mut self, ty: &Ty) -> String {
        let width = self.width.unwrap_or(DEFAULT_WIDTH);
        self.doc(ty).pretty(width).to_string()
    }

    pub fn doc(&mut self, ty: &Ty) -> RcDoc<'static, ()> {
        stack::guarded(|| self.doc_layer(ty))
    }

    fn doc_layer(&mut self, ty: &Ty) -> RcDoc<'static, ()> {
        match ty {
            Ty::Prim(prim) => RcDoc::text(prim.name()),
            Ty::List(elem) => sexp("Listof", vec![self.doc(elem)]),
            Ty::Ref(inner) => sexp("Refof", vec![self.doc(inner)]),
            Ty::Record(row) => self.row_doc(row),
            Ty::Arrow { domain, codomain } => {
                let mut docs: Vec<_> =
                    domain.iter().map(|ty| self.doc(ty)).collect();
                docs.push(self.doc(codomain));
                sexp("->", docs)
            }
            Ty::Var(var) => RcDoc::text(self.name(*var)),
        }
    }

    pub fn row_doc(&mut self, row: &Row) -> RcDoc<'static, ()> {
        let mut docs: Vec<_> = row
            .fields
            .iter()
            .map(|(label, ty)| {
                RcDoc::text(label.to_string())
                    .append(RcDoc::text(":"))
                    .append(self.doc(ty))
            })
            .collect();

        if let RowTail::Open(_) = row.tail {
            docs.push(RcDoc::text("..."));
        }

        braces(docs)
    }

    fn name(&mut self, var: MetaVar) -> String {
        let next = self.names.len();
        self.names
            .entry(var)
            .or_insert_with(|| var_name(next))
            .clone()
    }
}

impl std::fmt::Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&print_type(self))
    }
}

/// Returns the name of the `index`-th variable.
fn var_name(index: usize) -> String {
    let letter = char::from(b'a' + (index % 26) as u8);

    match index / 26 {
        0 => format!("'{letter}"),
        round => format!("'{letter}{round}"),
    }
}

/// Lays out `(head item ...)`, breaking between items when it doesn't fit.
pub(crate) fn sexp(
    head: &'static str,
    items: Vec<RcDoc<'static, ()>>,
) -> RcDoc<'static, ()> {
    if items.is_empty() {
        return RcDoc::text(format!("({head})"));
    }

    RcDoc::text("(")
        .append(RcDoc::text(head))
        .append(
            RcDoc::line()
                .append(RcDoc::intersperse(items, RcDoc::line()))
                .nest(2),
        )
        .append(RcDoc::text(")"))
        .group()
}

/// Lays out `{item ...}`.
pub(crate) fn braces(items: Vec<RcDoc<'static, ()>>) -> RcDoc<'static, ()> {
    RcDoc::text("{")
        .append(RcDoc::intersperse(items, RcDoc::line()).nest(1))
        .append(RcDoc::text("}"))
        .group()
}
