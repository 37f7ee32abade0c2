//! Types representing spans of source code.
//!
//! Spans are half-open byte ranges into the program text. Every AST node is
//! wrapped in a [`Spanned`], and every diagnostic produced by the later stages
//! points back into the source through one of these.

use std::ops::{Deref, DerefMut};

/// A spanned boxed value of `T`.
pub type SpanBox<T> = Box<Spanned<T>>;

/// A sequence of spanned values of `T`.
pub type SpanSeq<T> = Box<[Spanned<T>]>;

/// A value of `T` together with its [`Span`] in the source.
///
/// This type implements [`Deref`] and [`DerefMut`] for `Target = T`, and so
/// methods on `&T` and `&mut T` can be called transparently on `&Spanned<T>`
/// and `&mut Spanned<T>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.item
    }
}

impl<T> DerefMut for Spanned<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.item
    }
}

/// A half-open byte span in the source code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: SpanIndex,
    pub end: SpanIndex,
}

/// The integer type used for span indices.
type SpanIndex = u32;

impl Span {
    pub const ZERO: Span = Span { start: 0, end: 0 };

    pub fn new(start: SpanIndex, end: SpanIndex) -> Self {
        Self { start, end }
    }

    /// Returns the smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Attaches `self` to `item`.
    pub fn with<T>(self, item: T) -> Spanned<T> {
        Spanned { item, span: self }
    }
}

impl From<std::ops::Range<usize>> for Span {
    fn from(range: std::ops::Range<usize>) -> Self {
        Span {
            start: range.start as SpanIndex,
            end: range.end as SpanIndex,
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
