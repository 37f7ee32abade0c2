//! Substitutions, represented as union-find tables over metavariables.
//!
//! Each [`MetaVar`] (and [`RowVar`]) seen by the unifier is assigned a key
//! in an [`ena`] unification table. Variables unified with each other share
//! an equivalence class, and a class may additionally be bound to a term;
//! bindings are stored against the class representative, so a binding is
//! never observed through a stale variable.
//!
//! Resolution is lazy: [`Substitution::shallow`] and
//! [`Substitution::resolve_row`] only follow bindings at the root of a term,
//! while [`Substitution::apply`] zonks a term completely.

use std::{collections::HashMap, sync::Arc};

use ena::unify::{InPlace, UnificationTable, UnifyKey};

use crate::{
    stack,
    ty::{MetaVar, Row, RowTail, RowVar, Ty, Var},
};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
struct TyKey(u32);

impl UnifyKey for TyKey {
    type Value = ();

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Self(u)
    }

    fn tag() -> &'static str {
        "TyKey"
    }
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
struct RowKey(u32);

impl UnifyKey for RowKey {
    type Value = ();

    fn index(&self) -> u32 {
        self.0
    }

    fn from_index(u: u32) -> Self {
        Self(u)
    }

    fn tag() -> &'static str {
        "RowKey"
    }
}

#[derive(Default)]
pub struct Substitution {
    /// Equivalence classes of metavariables.
    tys: UnificationTable<InPlace<TyKey>>,
    /// Equivalence classes of row variables.
    rows: UnificationTable<InPlace<RowKey>>,
    /// A mapping from metavariables to their keys.
    ty_keys: HashMap<MetaVar, TyKey>,
    /// A mapping from row variables to their keys.
    row_keys: HashMap<RowVar, RowKey>,
    /// The inverse of `ty_keys`, indexed by key.
    ty_vars: Vec<MetaVar>,
    /// The inverse of `row_keys`, indexed by key.
    row_vars: Vec<RowVar>,
    /// Terms bound to each class of metavariables, by representative.
    ty_bindings: HashMap<TyKey, Arc<Ty>>,
    /// Rows bound to each class of row variables, by representative.
    row_bindings: HashMap<RowKey, Row>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of variables bound to a term.
    pub fn len(&self) -> usize {
        self.ty_bindings.len() + self.row_bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // METAVARIABLES

    /// Returns the representative of the class containing `var`.
    pub fn find(&mut self, var: MetaVar) -> MetaVar {
        let root = self.ty_root(var);
        self.ty_vars[root.index() as usize]
    }

    pub fn lookup(&mut self, var: MetaVar) -> Option<Arc<Ty>> {
        let root = self.ty_root(var);
        self.ty_bindings.get(&root).cloned()
    }

    /// Merges the classes of two unbound metavariables.
    pub fn union(&mut self, a: MetaVar, b: MetaVar) {
        let (a, b) = (self.ty_root(a), self.ty_root(b));
        let bindings = [self.ty_bindings.remove(&a), self.ty_bindings.remove(&b)];

        self.tys.union(a, b);

        let root = self.tys.find(a);
        if let Some(ty) = bindings.into_iter().flatten().next() {
            self.ty_bindings.insert(root, ty);
        }
    }

    /// Binds the class of `var` to `ty`.
    ///
    /// The caller is responsible for the occurs check.
    pub fn bind(&mut self, var: MetaVar, ty: Arc<Ty>) {
        let root = self.ty_root(var);
        self.ty_bindings.insert(root, ty);
    }

    // ROW VARIABLES

    pub fn find_row(&mut self, var: RowVar) -> RowVar {
        let root = self.row_root(var);
        self.row_vars[root.index() as usize]
    }

    pub fn lookup_row(&mut self, var: RowVar) -> Option<Row> {
        let root = self.row_root(var);
        self.row_bindings.get(&root).cloned()
    }

    /// Merges the classes of two unbound row variables.
    pub fn union_rows(&mut self, a: RowVar, b: RowVar) {
        let (a, b) = (self.row_root(a), self.row_root(b));
        let bindings = [self.row_bindings.remove(&a), self.row_bindings.remove(&b)];

        self.rows.union(a, b);

        let root = self.rows.find(a);
        if let Some(row) = bindings.into_iter().flatten().next() {
            self.row_bindings.insert(root, row);
        }
    }

    /// Binds the class of `var` to `row`.
    ///
    /// The caller is responsible for the occurs check.
    pub fn bind_row(&mut self, var: RowVar, row: Row) {
        let root = self.row_root(var);
        self.row_bindings.insert(root, row);
    }

    // RESOLUTION

    /// Follows bindings at the root of `ty` until reaching either a
    /// non-variable term or an unbound variable, which is returned as the
    /// representative of its class.
    pub fn shallow(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        let mut ty = ty.clone();

        loop {
            let var = match ty.as_ref() {
                Ty::Var(var) => *var,
                _ => return ty,
            };

            match self.lookup(var) {
                Some(bound) => ty = bound,
                None => {
                    let repr = self.find(var);
                    return match repr == var {
                        true => ty,
                        false => Arc::new(Ty::Var(repr)),
                    };
                }
            }
        }
    }

    /// Flattens the bound tails of `row` into its field map, leaving either a
    /// closed tail or an unbound representative row variable.
    pub fn resolve_row(&mut self, row: &Row) -> Row {
        let mut fields = row.fields.clone();
        let mut tail = row.tail;

        while let RowTail::Open(var) = tail {
            match self.lookup_row(var) {
                Some(bound) => {
                    for (label, ty) in bound.fields {
                        fields.entry(label).or_insert(ty);
                    }
                    tail = bound.tail;
                }
                None => {
                    tail = RowTail::Open(self.find_row(var));
                    break;
                }
            }
        }

        Row { fields, tail }
    }

    /// Fully applies the substitution to `ty`, replacing every bound variable
    /// with its term.
    pub fn apply(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        stack::guarded(|| self.apply_layer(ty))
    }

    fn apply_layer(&mut self, ty: &Arc<Ty>) -> Arc<Ty> {
        let ty = self.shallow(ty);

        match ty.as_ref() {
            Ty::Prim(_) | Ty::Var(_) => ty,
            Ty::List(elem) => Ty::list(self.apply(elem)),
            Ty::Ref(inner) => Ty::reference(self.apply(inner)),
            Ty::Record(row) => Ty::record(self.apply_row(row)),
            Ty::Arrow { domain, codomain } => {
                let domain: Vec<_> =
                    domain.iter().map(|ty| self.apply(ty)).collect();
                Ty::arrow(domain, self.apply(codomain))
            }
        }
    }

    pub fn apply_row(&mut self, row: &Row) -> Row {
        let Row { fields, tail } = self.resolve_row(row);
        let fields = fields
            .into_iter()
            .map(|(label, ty)| (label, self.apply(&ty)))
            .collect();

        Row { fields, tail }
    }

    /// Returns `true` if and only if the representative variable `var`
    /// occurs in `ty` under this substitution.
    pub fn occurs(&mut self, var: Var, ty: &Arc<Ty>) -> bool {
        stack::guarded(|| self.occurs_layer(var, ty))
    }

    fn occurs_layer(&mut self, var: Var, ty: &Arc<Ty>) -> bool {
        let ty = self.shallow(ty);

        match ty.as_ref() {
            Ty::Prim(_) => false,
            Ty::Var(v) => var == Var::Ty(*v),
            Ty::List(elem) | Ty::Ref(elem) => self.occurs(var, elem),
            Ty::Record(row) => self.occurs_in_row(var, row),
            Ty::Arrow { domain, codomain } => {
                domain.iter().any(|ty| self.occurs(var, ty))
                    || self.occurs(var, codomain)
            }
        }
    }

    pub fn occurs_in_row(&mut self, var: Var, row: &Row) -> bool {
        let row = self.resolve_row(row);

        match row.tail {
            RowTail::Open(tail) if var == Var::Row(tail) => true,
            _ => row.fields.values().any(|ty| self.occurs(var, ty)),
        }
    }

    // KEY CONVERSION METHODS

    /// Returns the root key for `var`, making a new assignment if necessary.
    fn ty_root(&mut self, var: MetaVar) -> TyKey {
        let key = match self.ty_keys.get(&var) {
            Some(&key) => key,
            None => {
                let key = self.tys.new_key(());
                self.ty_keys.insert(var, key);
                self.ty_vars.push(var);
                key
            }
        };

        self.tys.find(key)
    }

    /// Returns the root key for `var`, making a new assignment if necessary.
    fn row_root(&mut self, var: RowVar) -> RowKey {
        let key = match self.row_keys.get(&var) {
            Some(&key) => key,
            None => {
                let key = self.rows.new_key(());
                self.row_keys.insert(var, key);
                self.row_vars.push(var);
                key
            }
        };

        self.rows.find(key)
    }
}
