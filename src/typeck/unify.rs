//! Constraint solving.
//!
//! Constraints are processed as a worklist. Solving one constraint may
//! decompose it into further constraints (e.g. two arrow types produce one
//! constraint per parameter plus one for the codomain), and these are pushed
//! onto the front of the worklist so that they are solved before anything
//! else. Every constraint is resolved against the current [`Substitution`]
//! before it is inspected, so no rule ever sees a variable that has already
//! been bound.
//!
//! # Rows
//! Given a row constraint between `expected` and `actual`,
//! 1. two rows sharing a tail must have the same fields;
//! 2. an open row with no fields is just a row variable, and is bound to the
//!    other side outright;
//! 3. two closed rows must have exactly the same fields;
//! 4. a closed row against an open row must contain all of the open row's
//!    fields, and the open row's tail is bound to the closed row's remaining
//!    fields;
//! 5. two open rows share whatever fields they have in common, and each tail
//!    is bound to the _other_ row's remaining fields, followed by a fresh
//!    tail common to both.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Arc,
};

use crate::{
    span::Span,
    ty::{Label, MetaVar, Row, RowTail, RowVar, Ty, Var},
};

use super::{Arity, Constraint, Constraints, Substitution, TypeError};

type UnifyResult<T = ()> = Result<T, TypeError>;

/// Solves `constraints`, returning the resulting substitution.
pub fn unify(constraints: Constraints) -> UnifyResult<Substitution> {
    let mut unifier = Unifier {
        substitution: Substitution::new(),
        worklist: constraints.into(),
    };

    let mut steps = 0usize;
    while let Some(constraint) = unifier.worklist.pop_front() {
        unifier.solve(constraint)?;
        steps += 1;
    }

    log::debug!(
        "unification finished after {steps} steps with {} bindings",
        unifier.substitution.len()
    );
    Ok(unifier.substitution)
}

struct Unifier {
    substitution: Substitution,
    worklist: VecDeque<Constraint>,
}

impl Unifier {
    fn solve(&mut self, constraint: Constraint) -> UnifyResult {
        log::trace!("solving constraint at {}", constraint.span());

        match constraint {
            Constraint::TypeEq {
                expected,
                actual,
                span,
            } => self.unify_types(expected, actual, span),
            Constraint::RowEq {
                expected,
                actual,
                span,
            } => self.unify_rows(expected, actual, span),
        }
    }

    fn unify_types(
        &mut self,
        expected: Arc<Ty>,
        actual: Arc<Ty>,
        span: Span,
    ) -> UnifyResult {
        let expected = self.substitution.shallow(&expected);
        let actual = self.substitution.shallow(&actual);

        match (expected.as_ref(), actual.as_ref()) {
            // identical primitives
            (Ty::Prim(p1), Ty::Prim(p2)) if p1 == p2 => Ok(()),

            // variable-variable
            (Ty::Var(v1), Ty::Var(v2)) if v1 == v2 => Ok(()),
            (Ty::Var(v1), Ty::Var(v2)) => {
                log::trace!("unioning {v1:?} with {v2:?}");
                self.substitution.union(*v1, *v2);
                Ok(())
            }

            // variable-value & value-variable
            (Ty::Var(var), _) => self.bind(*var, actual.clone(), span),
            (_, Ty::Var(var)) => self.bind(*var, expected.clone(), span),

            (Ty::List(e), Ty::List(a)) | (Ty::Ref(e), Ty::Ref(a)) => {
                self.defer([type_eq(e, a, span)]);
                Ok(())
            }

            // function-function
            (
                Ty::Arrow {
                    domain: d1,
                    codomain: c1,
                },
                Ty::Arrow {
                    domain: d2,
                    codomain: c2,
                },
            ) => {
                if d1.len() != d2.len() {
                    return Err(TypeError::ArityMismatch {
                        what: Arity::Parameters,
                        expected: d1.len(),
                        found: d2.len(),
                        span,
                    });
                }

                let params = d1.iter().zip(d2).map(|(e, a)| type_eq(e, a, span));
                let constraints: Vec<_> =
                    params.chain([type_eq(c1, c2, span)]).collect();
                self.defer(constraints);
                Ok(())
            }

            (Ty::Record(e), Ty::Record(a)) => {
                self.defer([Constraint::RowEq {
                    expected: e.clone(),
                    actual: a.clone(),
                    span,
                }]);
                Ok(())
            }

            _ => Err(TypeError::Mismatch {
                expected: self.substitution.apply(&expected),
                found: self.substitution.apply(&actual),
                span,
            }),
        }
    }

    fn unify_rows(&mut self, expected: Row, actual: Row, span: Span) -> UnifyResult {
        let expected = self.substitution.resolve_row(&expected);
        let actual = self.substitution.resolve_row(&actual);

        match (expected.tail, actual.tail) {
            // a shared tail leaves no room for differing fields
            (RowTail::Open(r1), RowTail::Open(r2)) if r1 == r2 => {
                if !expected.fields.keys().eq(actual.fields.keys()) {
                    return Err(TypeError::Circular {
                        var: Var::Row(r1),
                        ty: Ty::record(self.substitution.apply_row(&expected)),
                        span,
                    });
                }

                self.defer_common_fields(&expected, &actual, span);
                Ok(())
            }

            // bare row variables
            (RowTail::Open(r1), RowTail::Open(r2))
                if expected.fields.is_empty() && actual.fields.is_empty() =>
            {
                log::trace!("unioning rows {r1:?} with {r2:?}");
                self.substitution.union_rows(r1, r2);
                Ok(())
            }
            (RowTail::Open(var), _) if expected.fields.is_empty() => {
                self.bind_row(var, actual, span)
            }
            (_, RowTail::Open(var)) if actual.fields.is_empty() => {
                self.bind_row(var, expected, span)
            }

            (RowTail::Closed, RowTail::Closed) => {
                if expected.fields.len() != actual.fields.len() {
                    return Err(TypeError::ArityMismatch {
                        what: Arity::Fields,
                        expected: expected.fields.len(),
                        found: actual.fields.len(),
                        span,
                    });
                }

                self.check_subset(&actual, &expected, span)?;
                self.defer_common_fields(&expected, &actual, span);
                Ok(())
            }

            (RowTail::Closed, RowTail::Open(var)) => {
                self.check_subset(&expected, &actual, span)?;
                let rest = remaining_fields(&expected, &actual);
                self.bind_row(var, Row::closed(rest), span)?;
                self.defer_common_fields(&expected, &actual, span);
                Ok(())
            }
            (RowTail::Open(var), RowTail::Closed) => {
                self.check_subset(&actual, &expected, span)?;
                let rest = remaining_fields(&actual, &expected);
                self.bind_row(var, Row::closed(rest), span)?;
                self.defer_common_fields(&expected, &actual, span);
                Ok(())
            }

            (RowTail::Open(r1), RowTail::Open(r2)) => {
                let tail = RowVar::fresh();
                let expected_rest = remaining_fields(&expected, &actual);
                let actual_rest = remaining_fields(&actual, &expected);

                self.bind_row(r1, Row::open(actual_rest, tail), span)?;
                self.bind_row(r2, Row::open(expected_rest, tail), span)?;
                self.defer_common_fields(&expected, &actual, span);
                Ok(())
            }
        }
    }

    /// Checks that every field `required` lists is present in `record`.
    fn check_subset(&mut self, record: &Row, required: &Row, span: Span) -> UnifyResult {
        let missing = required
            .fields
            .keys()
            .find(|label| !record.fields.contains_key(*label));

        match missing {
            None => Ok(()),
            Some(field) => Err(TypeError::MissingField {
                field: field.clone(),
                expected: self.substitution.apply_row(required),
                found: self.substitution.apply_row(record),
                span,
            }),
        }
    }

    fn bind(&mut self, var: MetaVar, ty: Arc<Ty>, span: Span) -> UnifyResult {
        if self.substitution.occurs(Var::Ty(var), &ty) {
            return Err(TypeError::Circular {
                var: Var::Ty(var),
                ty: self.substitution.apply(&ty),
                span,
            });
        }

        log::trace!("binding {var:?} := {ty}");
        self.substitution.bind(var, ty);
        Ok(())
    }

    fn bind_row(&mut self, var: RowVar, row: Row, span: Span) -> UnifyResult {
        if self.substitution.occurs_in_row(Var::Row(var), &row) {
            return Err(TypeError::Circular {
                var: Var::Row(var),
                ty: Ty::record(self.substitution.apply_row(&row)),
                span,
            });
        }

        log::trace!("binding row {var:?} := {}", Ty::Record(row.clone()));
        self.substitution.bind_row(var, row);
        Ok(())
    }

    /// Pushes one constraint per field present in both rows.
    fn defer_common_fields(&mut self, expected: &Row, actual: &Row, span: Span) {
        let constraints: Vec<_> = expected
            .fields
            .iter()
            .filter_map(|(label, e)| {
                actual.fields.get(label).map(|a| type_eq(e, a, span))
            })
            .collect();
        self.defer(constraints);
    }

    /// Pushes `constraints` onto the front of the worklist, preserving their
    /// order.
    fn defer(&mut self, constraints: impl IntoIterator<Item = Constraint>) {
        let constraints: Vec<_> = constraints.into_iter().collect();
        for constraint in constraints.into_iter().rev() {
            self.worklist.push_front(constraint);
        }
    }
}

fn type_eq(expected: &Arc<Ty>, actual: &Arc<Ty>, span: Span) -> Constraint {
    Constraint::TypeEq {
        expected: expected.clone(),
        actual: actual.clone(),
        span,
    }
}

/// Returns the fields of `row` that `other` does not have.
fn remaining_fields(row: &Row, other: &Row) -> BTreeMap<Label, Arc<Ty>> {
    row.fields
        .iter()
        .filter(|(label, _)| !other.fields.contains_key(*label))
        .map(|(label, ty)| (label.clone(), ty.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::print::print_type;

    fn fields(
        fields: impl IntoIterator<Item = (&'static str, Arc<Ty>)>,
    ) -> BTreeMap<Label, Arc<Ty>> {
        fields
            .into_iter()
            .map(|(label, ty)| (Label::from(label), ty))
            .collect()
    }

    fn row_eq(expected: Row, actual: Row) -> Constraint {
        Constraint::RowEq {
            expected,
            actual,
            span: Span::ZERO,
        }
    }

    fn ty_eq(expected: Arc<Ty>, actual: Arc<Ty>) -> Constraint {
        type_eq(&expected, &actual, Span::ZERO)
    }

    #[test]
    fn decomposition_solves_nested_variables() {
        let (a, b) = (Ty::fresh(), Ty::fresh());
        let mut subst = unify(vec![ty_eq(
            Ty::arrow([Ty::list(a.clone())], b.clone()),
            Ty::arrow([Ty::list(Ty::int())], Ty::reference(a.clone())),
        )])
        .unwrap();

        assert_eq!(print_type(&subst.apply(&b)), "(Refof int)");
    }

    #[test]
    fn variable_chains_resolve() {
        let (a, b, c) = (Ty::fresh(), Ty::fresh(), Ty::fresh());
        let mut subst = unify(vec![
            ty_eq(a.clone(), b.clone()),
            ty_eq(b.clone(), c.clone()),
            ty_eq(c, Ty::bool()),
        ])
        .unwrap();

        assert_eq!(print_type(&subst.apply(&a)), "bool");
    }

    #[test]
    fn mismatches_report_resolved_types() {
        let a = Ty::fresh();
        let result = unify(vec![
            ty_eq(a.clone(), Ty::int()),
            ty_eq(Ty::list(a), Ty::list(Ty::str())),
        ]);

        let Err(TypeError::Mismatch { expected, found, .. }) = result else {
            panic!("expected a mismatch");
        };
        assert_eq!(print_type(&expected), "int");
        assert_eq!(print_type(&found), "str");
    }

    #[test]
    fn closed_rows_bind_open_tails() {
        let (a, tail) = (Ty::fresh(), RowVar::fresh());
        let open = Row::open(fields([("a", a.clone())]), tail);
        let closed = Row::closed(fields([("a", Ty::int()), ("b", Ty::str())]));

        let mut subst = unify(vec![row_eq(open.clone(), closed)]).unwrap();
        assert_eq!(print_type(&subst.apply(&a)), "int");
        assert_eq!(
            print_type(&Ty::record(subst.apply_row(&open))),
            "{a:int b:str}"
        );
    }

    #[test]
    fn open_rows_share_a_fresh_tail() {
        let (r1, r2) = (RowVar::fresh(), RowVar::fresh());
        let left = Row::open(fields([("a", Ty::int())]), r1);
        let right = Row::open(fields([("b", Ty::bool())]), r2);

        let mut subst = unify(vec![row_eq(left.clone(), right.clone())]).unwrap();
        let left = subst.apply_row(&left);
        let right = subst.apply_row(&right);

        assert_eq!(print_type(&Ty::record(left.clone())), "{a:int b:bool ...}");
        assert_eq!(print_type(&Ty::record(right.clone())), "{a:int b:bool ...}");
        assert_eq!(left.tail, right.tail);
    }

    #[test]
    fn open_rows_unify_common_fields() {
        let a = Ty::fresh();
        let left = Row::open(fields([("a", a.clone())]), RowVar::fresh());
        let right = Row::open(fields([("a", Ty::str())]), RowVar::fresh());

        let mut subst = unify(vec![row_eq(left, right)]).unwrap();
        assert_eq!(print_type(&subst.apply(&a)), "str");
    }

    #[test]
    fn shared_tails_with_different_fields_are_circular() {
        let tail = RowVar::fresh();
        let left = Row::open(fields([("a", Ty::int())]), tail);
        let right = Row::open(fields([("b", Ty::int())]), tail);

        assert!(matches!(
            unify(vec![row_eq(left, right)]),
            Err(TypeError::Circular { var: Var::Row(_), .. })
        ));
    }

    #[test]
    fn row_variables_are_occurs_checked() {
        let tail = RowVar::fresh();
        let inner = Ty::record(Row::var(tail));

        assert!(matches!(
            unify(vec![row_eq(Row::var(tail), Row::closed(fields([("self", inner)])))]),
            Err(TypeError::Circular { var: Var::Row(_), .. })
        ));
    }

    #[test]
    fn missing_fields_name_both_rows() {
        let open = Row::open(fields([("a", Ty::fresh())]), RowVar::fresh());
        let closed = Row::closed(fields([("b", Ty::int())]));

        let Err(TypeError::MissingField {
            field,
            expected,
            found,
            ..
        }) = unify(vec![row_eq(open, closed)])
        else {
            panic!("expected a missing field error");
        };

        assert_eq!(&*field, "a");
        assert!(expected.fields.contains_key("a"));
        assert!(found.fields.contains_key("b"));
    }
}
