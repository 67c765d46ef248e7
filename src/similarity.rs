use std::cmp::Ordering;

use crate::normalize::TermFrequencyVector;

/// Cosine similarity over the union of both vectors' stems, in `[0, 1]`.
///
/// Terms are visited in key order and the magnitudes are combined as
/// `sqrt(|a|² · |b|²)`, so swapping the arguments yields the same bits.
/// A zero-magnitude side scores 0.
pub fn similarity(a: &TermFrequencyVector, b: &TermFrequencyVector) -> f64 {
    let denominator = (a.magnitude_squared() * b.magnitude_squared()).sqrt();
    let denominator = if denominator == 0.0 { 1.0 } else { denominator };
    (dot(a, b) / denominator).clamp(0.0, 1.0)
}

fn dot(a: &TermFrequencyVector, b: &TermFrequencyVector) -> f64 {
    let mut left = a.iter().peekable();
    let mut right = b.iter().peekable();
    let mut sum = 0.0;

    while let (Some(&(left_term, left_count)), Some(&(right_term, right_count))) =
        (left.peek(), right.peek())
    {
        match left_term.cmp(right_term) {
            Ordering::Less => {
                left.next();
            }
            Ordering::Greater => {
                right.next();
            }
            Ordering::Equal => {
                sum += f64::from(*left_count) * f64::from(*right_count);
                left.next();
                right.next();
            }
        }
    }

    sum
}
