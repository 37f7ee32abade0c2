//! A tree-walking interpreter.
//!
//! # Environments
//! Environments are stored in an [`Arena`] of frames, each holding a single
//! binding and the index of its parent frame. Closures capture the index of
//! the innermost frame in scope when they were created, so a closure may
//! refer to itself through its own environment without a reference cycle.
//!
//! A `let` allocates its frame with an empty slot, evaluates the bound value
//! in the extended environment, and only then fills the slot. Reading the
//! slot before that point (e.g. `(let x x x)`) is a runtime error.

use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use la_arena::{Arena, Idx};
use thiserror::Error;

use crate::{
    ast::{Expr, Name},
    span::{Span, Spanned},
    stack,
    stdlib::Builtin,
};

pub mod value;

use value::{Closure, List, Value};

/// The maximum combined nesting depth of [`Interpreter::eval`] and
/// [`Interpreter::apply`] calls.
///
/// Both grow the stack on demand, so this bounds memory rather than the
/// size of the native stack.
pub const MAX_DEPTH: usize = 10_000;

/// The innermost frame of an environment, or `None` for the empty one.
pub type EnvId<'a> = Option<Idx<Frame<'a>>>;

#[derive(Debug)]
pub struct Frame<'a> {
    name: Name,
    value: Option<Value<'a>>,
    parent: EnvId<'a>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("unbound variable `{name}`")]
    UnboundVariable { name: Name, span: Span },
    #[error("`{name}` was used before its definition was evaluated")]
    Uninitialised { name: Name, span: Span },
    #[error("expected procedure, found {found}")]
    NotAFunction { found: &'static str, span: Span },
    #[error("arity mismatch: expected {expected} arguments, found {found}")]
    ArityMismatch {
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("expected {expected}, found {found}")]
    WrongKind {
        expected: &'static str,
        found: &'static str,
        span: Span,
    },
    #[error("record has no field `{field}`")]
    MissingField { field: Name, span: Span },
    #[error("`{op}` of an empty list")]
    EmptyList { op: &'static str, span: Span },
    #[error("division by zero")]
    DivisionByZero { span: Span },
    #[error("integer overflow in `{op}`")]
    Overflow { op: &'static str, span: Span },
    #[error("procedures cannot be compared")]
    Incomparable { span: Span },
    #[error("maximum evaluation depth of {} exceeded", MAX_DEPTH)]
    DepthExceeded { span: Span },
}

impl RuntimeError {
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UnboundVariable { span, .. }
            | RuntimeError::Uninitialised { span, .. }
            | RuntimeError::NotAFunction { span, .. }
            | RuntimeError::ArityMismatch { span, .. }
            | RuntimeError::WrongKind { span, .. }
            | RuntimeError::MissingField { span, .. }
            | RuntimeError::EmptyList { span, .. }
            | RuntimeError::DivisionByZero { span }
            | RuntimeError::Overflow { span, .. }
            | RuntimeError::Incomparable { span }
            | RuntimeError::DepthExceeded { span } => *span,
        }
    }
}

type EvalResult<'a> = Result<Value<'a>, RuntimeError>;

/// Evaluates `expr` in the empty environment.
pub fn evaluate(expr: &Spanned<Expr>) -> EvalResult<'_> {
    let mut interpreter = Interpreter::new();
    let value = interpreter.eval(None, expr);
    log::debug!("evaluation allocated {} frames", interpreter.frames.len());
    value
}

#[derive(Debug, Default)]
pub struct Interpreter<'a> {
    frames: Arena<Frame<'a>>,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eval(&mut self, env: EnvId<'a>, expr: &'a Spanned<Expr>) -> EvalResult<'a> {
        if self.depth >= MAX_DEPTH {
            return Err(RuntimeError::DepthExceeded { span: expr.span });
        }

        self.depth += 1;
        let value = stack::guarded(|| self.eval_inner(env, expr));
        self.depth -= 1;
        value
    }

    fn eval_inner(&mut self, env: EnvId<'a>, expr: &'a Spanned<Expr>) -> EvalResult<'a> {
        let span = expr.span;

        match &expr.item {
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Var(name) => self.lookup(env, name, span),
            Expr::If { cond, then, else_ } => {
                match self.eval(env, cond)?.as_bool(cond.span)? {
                    true => self.eval(env, then),
                    false => self.eval(env, else_),
                }
            }
            Expr::Let { name, value, body } => {
                let frame = self.frames.alloc(Frame {
                    name: name.item.clone(),
                    value: None,
                    parent: env,
                });

                let value = self.eval(Some(frame), value)?;
                self.frames[frame].value = Some(value);
                self.eval(Some(frame), body)
            }
            Expr::Lambda { params, body } => Ok(Value::Closure(Rc::new(Closure {
                params,
                body,
                env,
            }))),
            Expr::App { callee, args } => {
                let callee = self.eval(env, callee)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(env, arg))
                    .collect::<Result<Vec<_>, _>>()?;

                self.apply(callee, args, span)
            }
            Expr::List(elems) => {
                let values = elems
                    .iter()
                    .map(|elem| self.eval(env, elem))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Value::List(values.into_iter().collect()))
            }
            Expr::Empty => Ok(Value::List(List::nil())),
            Expr::Cons { head, tail } => {
                let head = self.eval(env, head)?;
                let tail = self.eval(env, tail)?;
                Builtin::Cons.apply(&[head, tail], span)
            }
            Expr::Record(fields) => {
                let mut values = BTreeMap::new();
                for field in fields {
                    let value = self.eval(env, &field.value)?;
                    values.insert(field.label.item.clone(), value);
                }

                Ok(Value::Record(Rc::new(values)))
            }
            Expr::GetField { record, label } => match self.eval(env, record)? {
                Value::Record(fields) => {
                    fields.get(&label.item).cloned().ok_or_else(|| {
                        RuntimeError::MissingField {
                            field: label.item.clone(),
                            span,
                        }
                    })
                }
                other => Err(RuntimeError::WrongKind {
                    expected: "record",
                    found: other.kind(),
                    span: record.span,
                }),
            },
            Expr::MakeRef(value) => {
                let value = self.eval(env, value)?;
                Ok(Value::Ref(Rc::new(RefCell::new(value))))
            }
            Expr::GetRef(cell) => {
                let cell = self.eval(env, cell)?;
                Builtin::GetRef.apply(&[cell], span)
            }
            Expr::SetRef { cell, value } => {
                let cell = self.eval(env, cell)?;
                let value = self.eval(env, value)?;
                Builtin::SetRef.apply(&[cell, value], span)
            }
        }
    }

    /// Applies `callee` to `args`, where `span` is the span of the entire
    /// application.
    pub fn apply(
        &mut self,
        callee: Value<'a>,
        args: Vec<Value<'a>>,
        span: Span,
    ) -> EvalResult<'a> {
        // fixpoints unroll through `apply` without passing through `eval`
        if self.depth >= MAX_DEPTH {
            return Err(RuntimeError::DepthExceeded { span });
        }

        self.depth += 1;
        let value = stack::guarded(|| self.apply_inner(callee, args, span));
        self.depth -= 1;
        value
    }

    fn apply_inner(
        &mut self,
        callee: Value<'a>,
        args: Vec<Value<'a>>,
        span: Span,
    ) -> EvalResult<'a> {
        match callee {
            Value::Closure(closure) => {
                if closure.params.len() != args.len() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: closure.params.len(),
                        found: args.len(),
                        span,
                    });
                }

                let mut env = closure.env;
                for (param, arg) in closure.params.iter().zip(args) {
                    env = Some(self.frames.alloc(Frame {
                        name: param.name.item.clone(),
                        value: Some(arg),
                        parent: env,
                    }));
                }

                self.eval(env, closure.body)
            }
            Value::Builtin(builtin) => builtin.apply(&args, span),
            Value::Fix(functional) => {
                // (fix f) x = (f (fix f)) x
                let unrolled = self.apply(
                    (*functional).clone(),
                    vec![Value::Fix(functional)],
                    span,
                )?;
                self.apply(unrolled, args, span)
            }
            other => Err(RuntimeError::NotAFunction {
                found: other.kind(),
                span,
            }),
        }
    }

    fn lookup(&self, env: EnvId<'a>, name: &Name, span: Span) -> EvalResult<'a> {
        let mut current = env;

        while let Some(id) = current {
            let frame = &self.frames[id];

            if frame.name == *name {
                return frame.value.clone().ok_or_else(|| {
                    RuntimeError::Uninitialised {
                        name: name.clone(),
                        span,
                    }
                });
            }

            current = frame.parent;
        }

        Builtin::from_name(name)
            .map(Value::Builtin)
            .ok_or_else(|| RuntimeError::UnboundVariable {
                name: name.clone(),
                span,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(source: &str) -> Result<String, RuntimeError> {
        let expr = parse(source).unwrap();
        evaluate(&expr).map(|value| value.to_string())
    }

    #[test]
    fn literals_evaluate_to_themselves() {
        assert_eq!(run("#t").unwrap(), "#t");
        assert_eq!(run("42").unwrap(), "42");
        assert_eq!(run(r#""hi""#).unwrap(), r#""hi""#);
    }

    #[test]
    fn let_binds_a_value() {
        assert_eq!(run("(let x 1 x)").unwrap(), "1");
        assert_eq!(run("(let x 1 (let x 2 x))").unwrap(), "2");
    }

    #[test]
    fn closures_capture_their_environment() {
        let source = "(let addN (lambda (n) (lambda (x) (+ x n))) ((addN 1) 42))";
        assert_eq!(run(source).unwrap(), "43");

        let shadowed = "(let n 10 (let f (lambda (x) (+ x n)) (let n 100 (f 1))))";
        assert_eq!(run(shadowed).unwrap(), "11");
    }

    #[test]
    fn recursive_let() {
        let fact = "(let f (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))) (f 5))";
        assert_eq!(run(fact).unwrap(), "120");
    }

    #[test]
    fn fix_computes_fixpoints() {
        let fact = "((fix (lambda (f) (lambda (n) (if (= n 0) 1 (* n (f (- n 1))))))) 6)";
        assert_eq!(run(fact).unwrap(), "720");
    }

    #[test]
    fn records_and_projection() {
        assert_eq!(run(r#"{b: "x" a: 1}"#).unwrap(), r#"{a:1 b:"x"}"#);
        assert_eq!(run(r#"(get-field {a: 1 b: "x"} "b")"#).unwrap(), r#""x""#);
        assert!(matches!(
            run(r#"(get-field {a: 1} "b")"#),
            Err(RuntimeError::MissingField { .. })
        ));
    }

    #[test]
    fn lists() {
        assert_eq!(run("(list 1 2 3)").unwrap(), "(list 1 2 3)");
        assert_eq!(run("(cons 0 (list 1))").unwrap(), "(list 0 1)");
        assert_eq!(run("(car (cdr (list 1 2 3)))").unwrap(), "2");
        assert_eq!(run("(empty? empty)").unwrap(), "#t");
        assert!(matches!(run("(car empty)"), Err(RuntimeError::EmptyList { .. })));
    }

    #[test]
    fn references_are_shared() {
        let source = "(let r (ref 1) (let alias r (let _ (set-ref alias 5) (get-ref r))))";
        assert_eq!(run(source).unwrap(), "5");
        assert_eq!(run("(ref (list 1))").unwrap(), "(ref (list 1))");
        assert_eq!(run("(set-ref (ref 1) 2)").unwrap(), "#<void>");
    }

    #[test]
    fn builtins_are_first_class() {
        assert_eq!(run("+").unwrap(), "#<builtin +>");
        assert_eq!(run("((lambda (f) (f 2 3)) *)").unwrap(), "6");
        assert_eq!(run("(lambda (x) x)").unwrap(), "#<procedure>");
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(run("(= (list 1 2) (list 1 2))").unwrap(), "#t");
        assert_eq!(run(r#"(= {a: "x"} {a: "y"})"#).unwrap(), "#f");
        assert_eq!(run("(= (ref 1) (ref 1))").unwrap(), "#f");
        assert!(matches!(
            run("(= + +)"),
            Err(RuntimeError::Incomparable { .. })
        ));
    }

    #[test]
    fn untyped_programs_fail_without_panicking() {
        assert!(matches!(run("(1 2)"), Err(RuntimeError::NotAFunction { .. })));
        assert!(matches!(
            run("((lambda (x) x) 1 2)"),
            Err(RuntimeError::ArityMismatch { expected: 1, found: 2, .. })
        ));
        assert!(matches!(run("(if 1 2 3)"), Err(RuntimeError::WrongKind { .. })));
        assert!(matches!(run("(+ 1 #t)"), Err(RuntimeError::WrongKind { .. })));
        assert!(matches!(run("y"), Err(RuntimeError::UnboundVariable { .. })));
        assert!(matches!(
            run("(let x x x)"),
            Err(RuntimeError::Uninitialised { .. })
        ));
        assert!(matches!(
            run("(+ 9223372036854775807 1)"),
            Err(RuntimeError::Overflow { .. })
        ));
    }

    #[test]
    fn runaway_recursion_is_an_error() {
        let source = "(let loop (lambda (n) (loop n)) (loop 0))";
        assert!(matches!(
            run(source),
            Err(RuntimeError::DepthExceeded { .. })
        ));

        let identity = "((fix (lambda (f) f)) 1)";
        assert!(matches!(
            run(identity),
            Err(RuntimeError::DepthExceeded { .. })
        ));
    }

    #[test]
    fn deep_recursion_fits_under_the_depth_limit() {
        let sum = "(let sum (lambda (n) (if (= n 0) 0 (+ n (sum (- n 1))))) (sum 1000))";
        assert_eq!(run(sum).unwrap(), "500500");
    }

    #[test]
    fn long_lists_are_dropped_without_recursion() {
        let list: List = (0..200_000).map(Value::Int).collect();
        assert_eq!(list.iter().count(), 200_000);
        drop(list);
    }

    #[test]
    fn errors_carry_spans() {
        let error = run("(let x 1 (car x))").unwrap_err();
        assert_eq!(error.span(), Span::new(9, 16));
        assert_eq!(error.to_string(), "expected list, found integer");
    }
}
