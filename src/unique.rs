//! Unique-by-construction numeric IDs.
//!
//! # Uniqueness
//! If a pair of [`Uid`] values are equal, then they are guaranteed to be
//! copies of each other: one must have been created by [`Uid::fresh`], and the
//! other must be a copy of that original [`Uid`]. Metavariables and row
//! variables are built on top of this, so two independent type-checking runs
//! can never mint colliding variables, even when they run on different threads.
//!
//! # Practical Implementation
//! Ids are drawn from a single atomic counter. A `u32` gives us a little over
//! four billion ids per process, which is far beyond what any realistic
//! sequence of type-checking runs will consume.

use std::{
    num::NonZeroU32,
    sync::atomic::{AtomicU32, Ordering},
};

static COUNTER: AtomicU32 = AtomicU32::new(1);

/// A unique-by-construction numeric identifier.
#[derive(Hash, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Uid(NonZeroU32);

impl std::fmt::Debug for Uid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "⟨{}⟩", self.0)
    }
}

impl From<Uid> for u32 {
    fn from(value: Uid) -> Self {
        value.0.into()
    }
}

impl Uid {
    /// Returns a new unique [`Uid`].
    pub fn fresh() -> Uid {
        let raw_id = COUNTER.fetch_add(1, Ordering::Relaxed);

        // SAFETY: COUNTER is initialized to 1, and will monotonically increase
        // for the (practical) lifetime of the program; hence raw_id is never 0
        let uid = unsafe { NonZeroU32::new_unchecked(raw_id) };
        Uid(uid)
    }
}
