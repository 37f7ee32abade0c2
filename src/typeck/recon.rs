//! Constraint generation.
//!
//! Reconstruction is a single structural pass over the AST. Every subterm is
//! assigned a type, which may mention metavariables, and every point at which
//! two types must agree is recorded as a [`Constraint`] rather than solved on
//! the spot.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    ast::{Expr, Param, TyAst},
    span::{Span, Spanned},
    stack,
    stdlib::Builtin,
    ty::{Row, RowVar, Ty},
};

use super::{Constraint, Constraints, Context, TypeError};

type ReconResult<T = Arc<Ty>> = Result<T, TypeError>;

/// Reconstructs the type of `expr` under `ctx`, returning it together with the
/// constraints it is subject to.
pub fn recon(
    ctx: &Context,
    expr: &Spanned<Expr>,
) -> ReconResult<(Arc<Ty>, Constraints)> {
    let mut recon = Recon::default();
    let ty = recon.infer(ctx, expr)?;
    Ok((ty, recon.constraints))
}

/// Lowers a type annotation, giving every open record row a fresh tail.
pub fn lower_annotation(ty: &TyAst) -> Arc<Ty> {
    match ty {
        TyAst::Bool => Ty::bool(),
        TyAst::Int => Ty::int(),
        TyAst::Str => Ty::str(),
        TyAst::Void => Ty::void(),
        TyAst::List(elem) => Ty::list(lower_annotation(elem)),
        TyAst::Ref(inner) => Ty::reference(lower_annotation(inner)),
        TyAst::Arrow { domain, codomain } => Ty::arrow(
            domain.iter().map(|ty| lower_annotation(ty)),
            lower_annotation(codomain),
        ),
        TyAst::Record { fields, open } => {
            let fields = fields
                .iter()
                .map(|field| {
                    (field.label.item.clone(), lower_annotation(&field.value))
                })
                .collect();

            Ty::record(match open {
                true => Row::open(fields, RowVar::fresh()),
                false => Row::closed(fields),
            })
        }
    }
}

#[derive(Default)]
struct Recon {
    constraints: Constraints,
}

impl Recon {
    fn infer(&mut self, ctx: &Context, expr: &Spanned<Expr>) -> ReconResult {
        stack::guarded(|| self.infer_layer(ctx, expr))
    }

    fn infer_layer(&mut self, ctx: &Context, expr: &Spanned<Expr>) -> ReconResult {
        let span = expr.span;

        match &expr.item {
            Expr::Bool(_) => Ok(Ty::bool()),
            Expr::Int(_) => Ok(Ty::int()),
            Expr::Str(_) => Ok(Ty::str()),
            Expr::Var(name) => ctx
                .lookup(name)
                .or_else(|| Builtin::from_name(name).map(Builtin::signature))
                .ok_or_else(|| TypeError::UnboundVariable {
                    name: name.clone(),
                    span,
                }),
            Expr::If { cond, then, else_ } => {
                let cond_ty = self.infer(ctx, cond)?;
                let then_ty = self.infer(ctx, then)?;
                let else_ty = self.infer(ctx, else_)?;

                self.equate(Ty::bool(), cond_ty, cond.span);
                self.equate(then_ty, else_ty.clone(), else_.span);
                Ok(else_ty)
            }
            Expr::Let { name, value, body } => {
                // bind the name before inferring the value, so the value may
                // refer to itself
                let placeholder = Ty::fresh();
                let inner = ctx.extend(name.item.clone(), placeholder.clone());
                let value_ty = self.infer(&inner, value)?;
                self.equate(placeholder, value_ty.clone(), value.span);

                let body_ctx = ctx.extend(name.item.clone(), value_ty);
                self.infer(&body_ctx, body)
            }
            Expr::Lambda { params, body } => {
                let mut body_ctx = ctx.clone();
                let mut domain = Vec::with_capacity(params.len());

                for Spanned {
                    item: Param { name, ty },
                    ..
                } in params.iter()
                {
                    let param_ty = match ty {
                        Some(annotation) => lower_annotation(annotation),
                        None => Ty::fresh(),
                    };

                    body_ctx = body_ctx.extend(name.item.clone(), param_ty.clone());
                    domain.push(param_ty);
                }

                let codomain = self.infer(&body_ctx, body)?;
                Ok(Ty::arrow(domain, codomain))
            }
            Expr::App { callee, args } => {
                let callee_ty = self.infer(ctx, callee)?;
                let arg_tys = args
                    .iter()
                    .map(|arg| self.infer(ctx, arg))
                    .collect::<ReconResult<Vec<_>>>()?;

                let result = Ty::fresh();
                self.equate(callee_ty, Ty::arrow(arg_tys, result.clone()), span);
                Ok(result)
            }
            Expr::List(elems) => {
                let Some((first, rest)) = elems.split_first() else {
                    return Ok(Ty::list(Ty::fresh()));
                };

                let elem_ty = self.infer(ctx, first)?;
                for elem in rest {
                    let ty = self.infer(ctx, elem)?;
                    self.equate(elem_ty.clone(), ty, elem.span);
                }

                Ok(Ty::list(elem_ty))
            }
            Expr::Empty => Ok(Ty::list(Ty::fresh())),
            Expr::Cons { head, tail } => {
                let head_ty = self.infer(ctx, head)?;
                let tail_ty = self.infer(ctx, tail)?;
                let list_ty = Ty::list(head_ty);

                self.equate(list_ty.clone(), tail_ty, tail.span);
                Ok(list_ty)
            }
            Expr::Record(fields) => {
                let mut row = BTreeMap::new();
                for field in fields {
                    let ty = self.infer(ctx, &field.value)?;
                    row.insert(field.label.item.clone(), ty);
                }

                Ok(Ty::record(Row::closed(row)))
            }
            Expr::GetField { record, label } => {
                let record_ty = self.infer(ctx, record)?;

                // a statically known field needs no constraint
                if let Ty::Record(row) = record_ty.as_ref() {
                    if let Some(ty) = row.fields.get(&label.item) {
                        return Ok(ty.clone());
                    }
                }

                let result = Ty::fresh();
                let fields = BTreeMap::from([(label.item.clone(), result.clone())]);
                let expected = Ty::record(Row::open(fields, RowVar::fresh()));

                self.equate(expected, record_ty, span);
                Ok(result)
            }
            Expr::MakeRef(value) => Ok(Ty::reference(self.infer(ctx, value)?)),
            Expr::GetRef(cell) => {
                let cell_ty = self.infer(ctx, cell)?;
                let result = Ty::fresh();

                self.equate(Ty::reference(result.clone()), cell_ty, cell.span);
                Ok(result)
            }
            Expr::SetRef { cell, value } => {
                let cell_ty = self.infer(ctx, cell)?;
                let value_ty = self.infer(ctx, value)?;

                self.equate(Ty::reference(value_ty), cell_ty, cell.span);
                Ok(Ty::void())
            }
        }
    }

    fn equate(&mut self, expected: Arc<Ty>, actual: Arc<Ty>, span: Span) {
        self.constraints.push(Constraint::TypeEq {
            expected,
            actual,
            span,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser::parse, ty::print::print_type};

    fn recon_str(source: &str) -> (Arc<Ty>, Constraints) {
        let expr = parse(source).unwrap();
        recon(&Context::new(), &expr).unwrap()
    }

    #[test]
    fn literals_produce_no_constraints() {
        for (source, expected) in [("#f", "bool"), ("-3", "int"), (r#""s""#, "str")] {
            let (ty, constraints) = recon_str(source);
            assert_eq!(print_type(&ty), expected);
            assert!(constraints.is_empty());
        }
    }

    #[test]
    fn context_bindings_take_priority_over_builtins() {
        let expr = parse("+").unwrap();
        let ctx = Context::new().extend("+".into(), Ty::str());
        let (ty, _) = recon(&ctx, &expr).unwrap();
        assert_eq!(print_type(&ty), "str");
    }

    #[test]
    fn application_constrains_the_callee() {
        let (ty, constraints) = recon_str("(not #t)");
        assert!(matches!(ty.as_ref(), Ty::Var(_)));

        let [
            Constraint::TypeEq {
                expected, actual, ..
            },
        ] = constraints.as_slice()
        else {
            panic!("expected exactly one constraint");
        };
        assert_eq!(print_type(expected), "(-> bool bool)");
        assert!(matches!(actual.as_ref(), Ty::Arrow { domain, .. } if domain.len() == 1));
    }

    #[test]
    fn builtins_are_instantiated_per_occurrence() {
        let (_, constraints) = recon_str("(= (= 1 2) (= #t #f))");
        let vars: Vec<_> = constraints
            .iter()
            .filter_map(|constraint| match constraint {
                Constraint::TypeEq { expected, .. } => match expected.as_ref() {
                    Ty::Arrow { domain, .. } => match domain[0].as_ref() {
                        Ty::Var(var) => Some(*var),
                        _ => None,
                    },
                    _ => None,
                },
                Constraint::RowEq { .. } => None,
            })
            .collect();

        assert_eq!(vars.len(), 3);
        assert_ne!(vars[0], vars[1]);
        assert_ne!(vars[1], vars[2]);
        assert_ne!(vars[0], vars[2]);
    }

    #[test]
    fn known_fields_are_projected_directly() {
        let (ty, constraints) = recon_str(r#"(get-field {a: 1} "a")"#);
        assert_eq!(print_type(&ty), "int");
        assert!(constraints.is_empty());
    }

    #[test]
    fn open_annotations_get_fresh_tails() {
        let annotation = TyAst::Record {
            fields: Box::new([]),
            open: true,
        };

        let (Ty::Record(a), Ty::Record(b)) = (
            lower_annotation(&annotation).as_ref().clone(),
            lower_annotation(&annotation).as_ref().clone(),
        ) else {
            panic!("expected record types");
        };
        assert_ne!(a.tail, b.tail);
    }
}
