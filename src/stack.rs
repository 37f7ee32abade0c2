//! Stack growth for the recursive walks over programs and types.

/// The remaining stack below which [`guarded`] switches to a new segment.
const RED_ZONE: usize = 64 * 1024;

/// The size of each newly allocated stack segment.
const STACK_GROWTH: usize = 1024 * 1024;

/// Runs `f`, first moving onto a fresh stack segment if the current one is
/// nearly exhausted.
pub(crate) fn guarded<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_GROWTH, f)
}
