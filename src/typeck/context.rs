//! Typing contexts.

use std::sync::Arc;

use crate::{ast::Name, ty::Ty};

/// A persistent association from names to types.
///
/// Extending a context never mutates it; the extension shares its tail with
/// the original, so sibling scopes cannot observe each other's bindings.
/// Lookups walk from the most recent binding outward, so inner bindings
/// shadow outer ones.
#[derive(Debug, Clone, Default)]
pub struct Context {
    head: Option<Arc<Binding>>,
}

#[derive(Debug)]
struct Binding {
    name: Name,
    ty: Arc<Ty>,
    next: Option<Arc<Binding>>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn extend(&self, name: Name, ty: Arc<Ty>) -> Self {
        Self {
            head: Some(Arc::new(Binding {
                name,
                ty,
                next: self.head.clone(),
            })),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Ty>> {
        self.iter()
            .find(|(bound, _)| *bound == name)
            .map(|(_, ty)| ty.clone())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<Ty>)> {
        std::iter::successors(self.head.as_deref(), |binding| {
            binding.next.as_deref()
        })
        .map(|binding| (binding.name.as_ref(), &binding.ty))
    }
}
