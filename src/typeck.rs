//! Type inference.
//!
//! # Phases
//! Checking a program is broken into three phases,
//! 1. _reconstruction_, which walks the AST and produces a type for it along
//!    with a set of equational [`Constraint`]s (see [`recon`]);
//! 2. _unification_, which solves those constraints into a [`Substitution`]
//!    or fails with a [`TypeError`] (see [`unify`]), and;
//! 3. _substitution_, which applies the solution to the reconstructed type to
//!    obtain the principal type (see [`subst`]).
//!
//! Records are typed with Rémy-style rows: a record type is either _closed_
//! (exactly its fields) or _open_ (at least its fields, plus an unknown tail),
//! which is what allows `get-field` to be typed over any record that merely
//! contains the projected field.
//!
//! There is no let-generalization. A `let`-bound name has one monomorphic type
//! throughout its scope, and only built-in functions from the
//! [`stdlib`](crate::stdlib) are instantiated afresh at each use.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    ast::{Expr, Name},
    span::{Span, Spanned},
    ty::{
        Label, Row, Ty, Var,
        print::{DEFAULT_WIDTH, TyPrinter},
    },
};

pub mod context;
pub mod recon;
pub mod subst;
pub mod unify;

pub use context::Context;
pub use subst::Substitution;

/// An obligation that two terms be made equal.
///
/// The `expected` side is the one imposed by the surrounding context (e.g. the
/// condition of an `if` is expected to be `bool`), while `actual` is the one
/// produced by the subterm itself.
#[derive(Debug, Clone)]
pub enum Constraint {
    TypeEq {
        expected: Arc<Ty>,
        actual: Arc<Ty>,
        span: Span,
    },
    RowEq {
        expected: Row,
        actual: Row,
        span: Span,
    },
}

impl Constraint {
    pub fn span(&self) -> Span {
        match self {
            Constraint::TypeEq { span, .. } | Constraint::RowEq { span, .. } => {
                *span
            }
        }
    }
}

pub type Constraints = Vec<Constraint>;

/// What an [`TypeError::ArityMismatch`] counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Parameters,
    Fields,
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arity::Parameters => write!(f, "parameters"),
            Arity::Fields => write!(f, "fields"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("unbound variable `{name}`")]
    UnboundVariable { name: Name, span: Span },
    #[error("arity mismatch: expected {expected} {what}, found {found}")]
    ArityMismatch {
        what: Arity,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("{}", mismatch_message(.expected, .found))]
    Mismatch {
        expected: Arc<Ty>,
        found: Arc<Ty>,
        span: Span,
    },
    /// The record described by `found` lacks `field`, which `expected`
    /// requires.
    #[error("{}", missing_field_message(.field, .expected, .found))]
    MissingField {
        field: Label,
        expected: Row,
        found: Row,
        span: Span,
    },
    /// Solving a constraint would require `var` to contain itself.
    #[error("{}", circular_message(.var, .ty))]
    Circular { var: Var, ty: Arc<Ty>, span: Span },
}

impl TypeError {
    pub fn span(&self) -> Span {
        match self {
            TypeError::UnboundVariable { span, .. }
            | TypeError::ArityMismatch { span, .. }
            | TypeError::Mismatch { span, .. }
            | TypeError::MissingField { span, .. }
            | TypeError::Circular { span, .. } => *span,
        }
    }
}

fn mismatch_message(expected: &Ty, found: &Ty) -> String {
    let mut printer = TyPrinter::new();
    let expected = printer.print(expected);
    let found = printer.print(found);
    format!("type mismatch: expected {expected}, found {found}")
}

fn missing_field_message(field: &Label, expected: &Row, found: &Row) -> String {
    let mut printer = TyPrinter::new();
    let expected = printer.row_doc(expected).pretty(DEFAULT_WIDTH).to_string();
    let found = printer.row_doc(found).pretty(DEFAULT_WIDTH).to_string();
    format!(
        "missing field `{field}`: expected a record matching {expected}, found {found}"
    )
}

fn circular_message(var: &Var, ty: &Ty) -> String {
    let mut printer = TyPrinter::new();

    match var {
        Var::Ty(var) => {
            let var = printer.print(&Ty::Var(*var));
            let ty = printer.print(ty);
            format!("circular type: {var} occurs in {ty}")
        }
        Var::Row(_) => {
            let ty = printer.print(ty);
            format!("circular record type: {ty} would have to contain itself")
        }
    }
}

/// Infers the principal type of `expr` from an empty context.
pub fn type_check(expr: &Spanned<Expr>) -> Result<Arc<Ty>, TypeError> {
    let (ty, constraints) = recon::recon(&Context::new(), expr)?;
    log::debug!("reconstruction produced {} constraints", constraints.len());

    let mut substitution = unify::unify(constraints)?;
    let ty = substitution.apply(&ty);
    log::debug!("principal type is {ty}");

    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse, ty::print::print_type};

    fn check(source: &str) -> Result<String, TypeError> {
        let expr = parse(source).unwrap();
        type_check(&expr).map(|ty| print_type(&ty))
    }

    fn check_err(source: &str) -> TypeError {
        match check(source) {
            Ok(ty) => panic!("expected {source:?} to fail, but got {ty}"),
            Err(error) => error,
        }
    }

    #[test]
    fn literals_have_fixed_types() {
        assert_eq!(check("#t").unwrap(), "bool");
        assert_eq!(check("42").unwrap(), "int");
        assert_eq!(check(r#""hi""#).unwrap(), "str");
    }

    #[test]
    fn if_branches_unify() {
        assert_eq!(check("(if #t 1 2)").unwrap(), "int");
        assert!(matches!(check_err("(if 1 2 3)"), TypeError::Mismatch { .. }));
        assert!(matches!(
            check_err(r#"(if #t 1 "s")"#),
            TypeError::Mismatch { .. }
        ));
    }

    #[test]
    fn condition_errors_point_at_the_condition() {
        let error = check_err("(if 1 2 3)");
        assert_eq!(error.span(), Span::new(4, 5));
        insta::assert_snapshot!(error, @"type mismatch: expected bool, found int");
    }

    #[test]
    fn self_application_is_circular() {
        let error = check_err("(lambda (x) (x x))");
        assert!(matches!(error, TypeError::Circular { var: Var::Ty(_), .. }));
        insta::assert_snapshot!(error, @"circular type: 'a occurs in (-> 'a 'b)");
    }

    #[test]
    fn record_containing_itself_is_circular() {
        let error = check_err(r#"(lambda (x) (if #t x (get-field x "a")))"#);
        assert!(matches!(error, TypeError::Circular { .. }));
    }

    #[test]
    fn projection_is_row_polymorphic() {
        let get_a = r#"(lambda (x) (get-field x "a"))"#;
        assert_eq!(check(get_a).unwrap(), "(-> {a:'a ...} 'a)");

        let applied = format!(r#"({get_a} {{a: 7 b: "hi"}})"#);
        assert_eq!(check(&applied).unwrap(), "int");

        let missing = format!(r#"({get_a} {{b: "hi"}})"#);
        let error = check_err(&missing);
        assert!(matches!(
            &error,
            TypeError::MissingField { field, .. } if &**field == "a"
        ));
        insta::assert_snapshot!(
            error,
            @"missing field `a`: expected a record matching {a:'a ...}, found {b:str}"
        );
    }

    #[test]
    fn projection_from_a_known_record() {
        assert_eq!(check(r#"(get-field {a: 1 b: "x"} "b")"#).unwrap(), "str");
        assert!(matches!(
            check_err(r#"(get-field {a: 1} "b")"#),
            TypeError::MissingField { .. }
        ));
    }

    #[test]
    fn closed_records_must_match_exactly() {
        assert!(matches!(
            check_err("(if #t {a: 1 b: 2} {a: 1})"),
            TypeError::ArityMismatch {
                what: Arity::Fields,
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert!(matches!(
            check_err("(if #t {a: 1} {b: 1})"),
            TypeError::MissingField { .. }
        ));
        assert_eq!(check("(if #t {a: 1 b: #t} {b: #f a: 2})").unwrap(), "{a:int b:bool}");
    }

    #[test]
    fn open_annotations_accept_supersets() {
        let source = r#"
            (let f (lambda ((r : {a : int ...})) (get-field r "a"))
              (+ (f {a: 1}) (f {a: 2 b: "extra"})))
        "#;
        // `f` is monomorphic, so its row tail is fixed by the first use
        assert!(check(source).is_err());

        let first = r#"((lambda ((r : {a : int ...})) (get-field r "a")) {a: 1})"#;
        let second =
            r#"((lambda ((r : {a : int ...})) (get-field r "a")) {a: 1 b: "x"})"#;
        assert_eq!(check(first).unwrap(), "int");
        assert_eq!(check(second).unwrap(), "int");
    }

    #[test]
    fn open_rows_merge() {
        let source = r#"
            (lambda (r) (if (get-field r "flag") (get-field r "n") 0))
        "#;
        assert_eq!(check(source).unwrap(), "(-> {flag:bool n:int ...} int)");
    }

    #[test]
    fn stdlib_is_instantiated_per_use() {
        assert_eq!(check(r#"(if (= 1 2) (= "a" "b") #f)"#).unwrap(), "bool");
        assert_eq!(
            check("(cons (car (list 1 2)) (cdr (list 1 2)))").unwrap(),
            "(Listof int)"
        );
    }

    #[test]
    fn let_is_monomorphic() {
        let source = r#"(let id (lambda (x) x) (if (id #t) (id 1) 2))"#;
        assert!(matches!(check_err(source), TypeError::Mismatch { .. }));
    }

    #[test]
    fn recursive_let() {
        let fact = "(let f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))) (f 5))";
        assert_eq!(check(fact).unwrap(), "int");

        let fact_fn = "(let f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))) f)";
        assert_eq!(check(fact_fn).unwrap(), "(-> int int)");
    }

    #[test]
    fn checking_is_idempotent() {
        let expr = parse(r#"(lambda (x y) (cons (get-field x "a") y))"#).unwrap();
        let first = print_type(&type_check(&expr).unwrap());
        let second = print_type(&type_check(&expr).unwrap());
        assert_eq!(first, second);
        assert_eq!(first, "(-> {a:'a ...} (Listof 'a) (Listof 'a))");
    }

    #[test]
    fn unbound_variables() {
        let error = check_err("(+ x 1)");
        assert!(matches!(
            &error,
            TypeError::UnboundVariable { name, span } if &**name == "x" && *span == Span::new(3, 4)
        ));
    }

    #[test]
    fn application_arity() {
        assert!(matches!(
            check_err("(+ 1)"),
            TypeError::ArityMismatch {
                what: Arity::Parameters,
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn references() {
        assert_eq!(check("(let r (ref 1) (set-ref r 2))").unwrap(), "void");
        assert_eq!(check("(get-ref (ref \"s\"))").unwrap(), "str");
        assert!(check("(set-ref (ref 1) #t)").is_err());
        assert_eq!(check("(lambda (r) (get-ref r))").unwrap(), "(-> (Refof 'a) 'a)");
    }

    #[test]
    fn lists() {
        assert_eq!(check("(list)").unwrap(), "(Listof 'a)");
        assert_eq!(check("empty").unwrap(), "(Listof 'a)");
        assert_eq!(check("(list 1 2 3)").unwrap(), "(Listof int)");
        assert!(check(r#"(list 1 "two")"#).is_err());
        assert!(check("(cons 1 (list #t))").is_err());
    }

    #[test]
    fn fix_combinator() {
        let source = "((fix (lambda (f) (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))))) 5)";
        assert_eq!(check(source).unwrap(), "int");
    }
}
