//! Helpers to assert invariants of our code.

/// Infallible integer conversions that `From` does not cover on every
/// platform, e.g. `usize -> u64`.
///
/// We only support targets where `usize` is between 32 and 64 bits wide.
pub(crate) trait CastFrom<T> {
    fn cast_from(from: T) -> Self;
}

static_assertions::const_assert!(usize::BITS >= 32 && usize::BITS <= 64);

#[allow(clippy::as_conversions)]
impl CastFrom<usize> for u64 {
    #[inline(always)]
    fn cast_from(from: usize) -> Self {
        from as u64
    }
}

#[inline(always)]
#[cold]
fn cold_path() {}

/// "Annotation" to hint that a branch of an if-statement is likely to occur.
#[inline(always)]
pub(crate) fn likely(b: bool) -> bool {
    if b {
        true
    } else {
        cold_path();
        false
    }
}

/// "Annotation" to hint that a branch of an if-statement is _not likely_ to occur.
#[inline(always)]
pub(crate) fn unlikely(b: bool) -> bool {
    if b {
        cold_path();
        true
    } else {
        false
    }
}
