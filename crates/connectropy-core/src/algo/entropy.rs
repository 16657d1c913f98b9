//! Shannon entropy over sparse probability vectors.
//!
//! # Definition
//!
//! ```text
//! H(p) = -Σ p_i ln p_i        (nats)
//! ```
//!
//! Entries that are exactly zero are skipped: `p ln p -> 0` as `p -> 0⁺`,
//! while `ln 0` itself is undefined. Undefined entries (`None`) are skipped
//! too, but a vector made *only* of undefined entries has undefined entropy
//! rather than zero: "no edges in this direction" is not the same thing as
//! "all mass on one category".
//!
//! No renormalization happens here. Fingerprint halves and neighborhood
//! averages arrive already summing to 1, and `0 <= H <= ln n` holds for
//! them, where `n` is the number of positive entries.

/// Entropy of a vector whose entries may be undefined.
///
/// Returns `None` when every entry is `None` (including the empty vector).
///
/// # Example
///
/// ```rust
/// use connectropy_core::algo::entropy::shannon_entropy;
///
/// let h = shannon_entropy([Some(0.5), Some(0.5), Some(0.0)]).unwrap();
/// assert!((h - 2f64.ln()).abs() < 1e-12);
///
/// assert_eq!(shannon_entropy([None, None]), None);
/// ```
pub fn shannon_entropy<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut defined = false;
    let mut h = 0.0;
    for p in values.into_iter().flatten() {
        defined = true;
        if p > 0.0 {
            h -= p * p.ln();
        }
    }
    defined.then_some(h)
}

/// Upper bound `ln n` reached by the uniform distribution over `n` entries.
pub fn max_entropy(n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        (n as f64).ln()
    }
}
