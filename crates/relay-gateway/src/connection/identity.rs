//! Session identity generation

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Default length of a generated session id
pub const DEFAULT_ID_LENGTH: usize = 15;

/// Generate a random session id of exactly `length` characters
///
/// Characters are drawn uniformly from `[a-zA-Z0-9]` using the calling
/// thread's OS-seeded generator, so concurrent callers never share state.
/// Uniqueness is probabilistic only.
#[must_use]
pub fn generate_id(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
