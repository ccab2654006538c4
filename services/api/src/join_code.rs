//! Random join codes for groups

use rand::{Rng, distributions::Alphanumeric};

/// Generate a random code of ASCII letters and digits
pub fn generate(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
