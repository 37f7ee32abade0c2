//! Canonical source formatting for parsed programs.

use pretty::RcDoc;
use recursion::{Collapsible, CollapsibleExt, MappableFrame, PartiallyApplied};

use crate::{
    interp::value::escape,
    span::Spanned,
    ty::print::{DEFAULT_WIDTH, braces},
};

use super::{Expr, Field, Param, TyAst};

/// Renders `expr` as source text at the given line width.
pub fn print_expr(expr: &Expr, width: usize) -> String {
    expr_doc(expr).pretty(width).to_string()
}

pub fn expr_doc(expr: &Expr) -> RcDoc<'static, ()> {
    expr.collapse_frames(|frame| frame.into_doc())
}

/// Renders a type annotation as source text.
pub fn print_annotation(ty: &TyAst) -> String {
    annotation_doc(ty).pretty(DEFAULT_WIDTH).to_string()
}

pub fn annotation_doc(ty: &TyAst) -> RcDoc<'static, ()> {
    match ty {
        TyAst::Bool => RcDoc::text("bool"),
        TyAst::Int => RcDoc::text("int"),
        TyAst::Str => RcDoc::text("str"),
        TyAst::Void => RcDoc::text("void"),
        TyAst::List(elem) => {
            form(RcDoc::text("Listof"), vec![annotation_doc(elem)])
        }
        TyAst::Ref(inner) => {
            form(RcDoc::text("Refof"), vec![annotation_doc(inner)])
        }
        TyAst::Arrow { domain, codomain } => {
            let mut docs: Vec<_> =
                domain.iter().map(|ty| annotation_doc(ty)).collect();
            docs.push(annotation_doc(codomain));
            form(RcDoc::text("->"), docs)
        }
        TyAst::Record { fields, open } => {
            let mut docs: Vec<_> = fields
                .iter()
                .map(|Field { label, value }| {
                    field_doc(label, annotation_doc(value))
                })
                .collect();

            if *open {
                docs.push(RcDoc::text("..."));
            }

            braces(docs)
        }
    }
}

/// A single layer of an [`Expr`], with subexpressions replaced by `A`.
#[derive(Debug, Clone)]
pub enum ExprFrame<'a, A> {
    Bool(bool),
    Int(i64),
    Str(&'a str),
    Var(&'a str),
    If {
        cond: A,
        then: A,
        else_: A,
    },
    Let {
        name: &'a str,
        value: A,
        body: A,
    },
    Lambda {
        params: &'a [Spanned<Param>],
        body: A,
    },
    App {
        callee: A,
        args: Vec<A>,
    },
    List(Vec<A>),
    Empty,
    Cons {
        head: A,
        tail: A,
    },
    Record(Vec<(&'a str, A)>),
    GetField {
        record: A,
        label: &'a str,
    },
    MakeRef(A),
    GetRef(A),
    SetRef {
        cell: A,
        value: A,
    },
}

impl<'a> MappableFrame for ExprFrame<'a, PartiallyApplied> {
    type Frame<X> = ExprFrame<'a, X>;

    fn map_frame<A, B>(
        input: Self::Frame<A>,
        mut f: impl FnMut(A) -> B,
    ) -> Self::Frame<B> {
        match input {
            ExprFrame::Bool(b) => ExprFrame::Bool(b),
            ExprFrame::Int(n) => ExprFrame::Int(n),
            ExprFrame::Str(s) => ExprFrame::Str(s),
            ExprFrame::Var(name) => ExprFrame::Var(name),
            ExprFrame::If { cond, then, else_ } => ExprFrame::If {
                cond: f(cond),
                then: f(then),
                else_: f(else_),
            },
            ExprFrame::Let { name, value, body } => ExprFrame::Let {
                name,
                value: f(value),
                body: f(body),
            },
            ExprFrame::Lambda { params, body } => ExprFrame::Lambda {
                params,
                body: f(body),
            },
            ExprFrame::App { callee, args } => ExprFrame::App {
                callee: f(callee),
                args: args.into_iter().map(f).collect(),
            },
            ExprFrame::List(elems) => {
                ExprFrame::List(elems.into_iter().map(f).collect())
            }
            ExprFrame::Empty => ExprFrame::Empty,
            ExprFrame::Cons { head, tail } => ExprFrame::Cons {
                head: f(head),
                tail: f(tail),
            },
            ExprFrame::Record(fields) => ExprFrame::Record(
                fields
                    .into_iter()
                    .map(|(label, value)| (label, f(value)))
                    .collect(),
            ),
            ExprFrame::GetField { record, label } => ExprFrame::GetField {
                record: f(record),
                label,
            },
            ExprFrame::MakeRef(value) => ExprFrame::MakeRef(f(value)),
            ExprFrame::GetRef(cell) => ExprFrame::GetRef(f(cell)),
            ExprFrame::SetRef { cell, value } => ExprFrame::SetRef {
                cell: f(cell),
                value: f(value),
            },
        }
    }
}

impl<'a> Collapsible for &'a Expr {
    type FrameToken = ExprFrame<'a, PartiallyApplied>;

    fn into_frame(self) -> <Self::FrameToken as MappableFrame>::Frame<Self> {
        match self {
            Expr::Bool(b) => ExprFrame::Bool(*b),
            Expr::Int(n) => ExprFrame::Int(*n),
            Expr::Str(s) => ExprFrame::Str(s),
            Expr::Var(name) => ExprFrame::Var(name),
            Expr::If { cond, then, else_ } => ExprFrame::If {
                cond: &cond.item,
                then: &then.item,
                else_: &else_.item,
            },
            Expr::Let { name, value, body } => ExprFrame::Let {
                name: &name.item,
                value: &value.item,
                body: &body.item,
            },
            Expr::Lambda { params, body } => ExprFrame::Lambda {
                params,
                body: &body.item,
            },
            Expr::App { callee, args } => ExprFrame::App {
                callee: &callee.item,
                args: args.iter().map(|arg| &arg.item).collect(),
            },
            Expr::List(elems) => {
                ExprFrame::List(elems.iter().map(|elem| &elem.item).collect())
            }
            Expr::Empty => ExprFrame::Empty,
            Expr::Cons { head, tail } => ExprFrame::Cons {
                head: &head.item,
                tail: &tail.item,
            },
            Expr::Record(fields) => ExprFrame::Record(
                fields
                    .iter()
                    .map(|Field { label, value }| (&*label.item, &value.item))
                    .collect(),
            ),
            Expr::GetField { record, label } => ExprFrame::GetField {
                record: &record.item,
                label: &label.item,
            },
            Expr::MakeRef(value) => ExprFrame::MakeRef(&value.item),
            Expr::GetRef(cell) => ExprFrame::GetRef(&cell.item),
            Expr::SetRef { cell, value } => ExprFrame::SetRef {
                cell: &cell.item,
                value: &value.item,
            },
        }
    }
}

impl ExprFrame<'_, RcDoc<'static, ()>> {
    fn into_doc(self) -> RcDoc<'static, ()> {
        match self {
            ExprFrame::Bool(true) => RcDoc::text("#t"),
            ExprFrame::Bool(false) => RcDoc::text("#f"),
            ExprFrame::Int(n) => RcDoc::as_string(n),
            ExprFrame::Str(s) => RcDoc::text(escape(s)),
            ExprFrame::Var(name) => RcDoc::text(name.to_string()),
            ExprFrame::If { cond, then, else_ } => {
                form(RcDoc::text("if"), vec![cond, then, else_])
            }
            ExprFrame::Let { name, value, body } => form(
                RcDoc::text("let ").append(RcDoc::text(name.to_string())),
                vec![value, body],
            ),
            ExprFrame::Lambda { params, body } => form(
                RcDoc::text("lambda ").append(params_doc(params)),
                vec![body],
            ),
            ExprFrame::App { callee, args } => form(callee, args),
            ExprFrame::List(elems) => form(RcDoc::text("list"), elems),
            ExprFrame::Empty => RcDoc::text("empty"),
            ExprFrame::Cons { head, tail } => {
                form(RcDoc::text("cons"), vec![head, tail])
            }
            ExprFrame::Record(fields) => braces(
                fields
                    .into_iter()
                    .map(|(label, value)| field_doc(label, value))
                    .collect(),
            ),
            ExprFrame::GetField { record, label } => form(
                RcDoc::text("get-field"),
                vec![record, RcDoc::text(escape(label))],
            ),
            ExprFrame::MakeRef(value) => form(RcDoc::text("ref"), vec![value]),
            ExprFrame::GetRef(cell) => form(RcDoc::text("get-ref"), vec![cell]),
            ExprFrame::SetRef { cell, value } => {
                form(RcDoc::text("set-ref"), vec![cell, value])
            }
        }
    }
}

fn params_doc(params: &[Spanned<Param>]) -> RcDoc<'static, ()> {
    let params = params.iter().map(|param| {
        let name = RcDoc::text(param.name.to_string());

        match &param.ty {
            Some(ty) => RcDoc::text("(")
                .append(name)
                .append(RcDoc::text(": "))
                .append(annotation_doc(ty))
                .append(RcDoc::text(")")),
            None => name,
        }
    });

    RcDoc::text("(")
        .append(RcDoc::intersperse(params, RcDoc::text(" ")))
        .append(RcDoc::text(")"))
}

fn field_doc(label: &str, value: RcDoc<'static, ()>) -> RcDoc<'static, ()> {
    RcDoc::text(format!("{label}: ")).append(value)
}

/// Lays out `(head item ...)`, putting each item on its own line when the
/// whole form doesn't fit.
fn form(
    head: RcDoc<'static, ()>,
    items: Vec<RcDoc<'static, ()>>,
) -> RcDoc<'static, ()> {
    if items.is_empty() {
        return RcDoc::text("(").append(head).append(RcDoc::text(")"));
    }

    RcDoc::text("(")
        .append(head)
        .append(
            RcDoc::line()
                .append(RcDoc::intersperse(items, RcDoc::line()))
                .nest(2),
        )
        .append(RcDoc::text(")"))
        .group()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn reformat(source: &str, width: usize) -> String {
        let expr = parse(source).expect("source should parse");
        print_expr(&expr, width)
    }

    #[test]
    fn canonical_spacing() {
        assert_eq!(
            reformat("(  let x   1\n ( +  x\t2 ) )", 80),
            "(let x 1 (+ x 2))"
        );
        assert_eq!(reformat("{ b:1 a :#t}", 80), "{b: 1 a: #t}");
        assert_eq!(reformat("(list)", 80), "(list)");
        assert_eq!(reformat("empty", 80), "empty");
        assert_eq!(reformat("(f)", 80), "(f)");
        assert_eq!(
            reformat(r#"(get-field {s: "a\"b"} "s")"#, 80),
            r#"(get-field {s: "a\"b"} "s")"#
        );
    }

    #[test]
    fn annotations_are_printed() {
        assert_eq!(
            reformat("(lambda (x (r : {a : int ...}) (f : (-> (Listof int) bool))) x)", 80),
            "(lambda (x (r: {a: int ...}) (f: (-> (Listof int) bool))) x)"
        );
    }

    #[test]
    fn reference_forms() {
        assert_eq!(
            reformat("(let c (ref 0) (set-ref c (+ (get-ref c) 1)))", 80),
            "(let c (ref 0) (set-ref c (+ (get-ref c) 1)))"
        );
    }

    #[test]
    fn long_forms_break() {
        insta::assert_snapshot!(
            reformat("(let f (lambda (x) (+ x 1)) (f 41))", 20),
            @r"
        (let f
          (lambda (x)
            (+ x 1))
          (f 41))
        "
        );
    }

    #[test]
    fn formatting_is_idempotent() {
        let source = "(let xs (cons 1 (list 2 3)) {head: (car xs) tail: (cdr xs) n: -7})";

        for width in [10, 30, 80] {
            let once = reformat(source, width);
            assert_eq!(reformat(&once, width), once);
        }
    }
}
