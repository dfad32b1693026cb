//! Logarithmic special-ordered-set-2 encodings.
//!
//! Given a simplex of weights λ(0..=m) over m intervals, the SOS2 discipline
//! allows at most two adjacent weights to be nonzero. The logarithmic
//! formulation selects the active interval with only ⌈log₂ m⌉ binary
//! variables by assigning each interval a reflected Gray code.

use crate::expr::{LinearExpr, VarId};
use crate::gray::{ceil_log2, reflected_gray_codes};
use crate::program::Program;

/// Adds the logarithmic SOS2 constraint over the weights `lambda` and
/// returns the Gray-coded binary selector variables, most significant digit
/// first.
///
/// Adds `λ >= 0`, `Σλ = 1`, and for each binary digit the two aggregated
/// bounds that pin every weight incompatible with the selected code to zero.
/// A weight λ(i) is adjacent to intervals `i-1` and `i`; it may be nonzero
/// only if the selector encodes one of those intervals. When the interval
/// count is not a power of two, the spare codes are excluded so the
/// selector always encodes a real interval.
///
/// # Panics
///
/// Panics if fewer than two weights are given.
pub fn add_logarithmic_sos2(prog: &mut Program, lambda: &[VarId]) -> Vec<VarId> {
    assert!(lambda.len() >= 2, "SOS2 needs at least two weights");
    let num_intervals = lambda.len() - 1;
    let digits = ceil_log2(num_intervals);
    let codes = reflected_gray_codes(digits);

    let mut sum = LinearExpr::new();
    for &l in lambda {
        prog.bound(l, 0.0, 1.0);
        sum.add_term(l, 1.0);
    }
    prog.add_equality(sum, 1.0);

    let y = prog.new_binary_vec(digits);

    for (j, &yj) in y.iter().enumerate() {
        // Weights whose adjacent intervals all carry digit 1 (resp. 0) can
        // only be nonzero when y_j = 1 (resp. 0).
        let mut pinned_to_one = LinearExpr::new();
        let mut pinned_to_zero = LinearExpr::new();
        for (i, &li) in lambda.iter().enumerate() {
            let lo = i.saturating_sub(1).min(num_intervals - 1);
            let hi = i.min(num_intervals - 1);
            let neighbors = [lo, hi];
            if neighbors.iter().all(|&t| codes[t][j] == 1) {
                pinned_to_one.add_term(li, 1.0);
            } else if neighbors.iter().all(|&t| codes[t][j] == 0) {
                pinned_to_zero.add_term(li, 1.0);
            }
        }
        pinned_to_one.add_term(yj, -1.0);
        prog.add_linear(pinned_to_one, f64::NEG_INFINITY, 0.0);
        pinned_to_zero.add_term(yj, 1.0);
        prog.add_linear(pinned_to_zero, f64::NEG_INFINITY, 1.0);
    }

    // Spare codes beyond the real interval range must differ from the
    // selector in at least one digit.
    for code in codes.iter().skip(num_intervals) {
        let mut distance = LinearExpr::new();
        for (j, &yj) in y.iter().enumerate() {
            if code[j] == 1 {
                distance.add_constant(1.0);
                distance.add_term(yj, -1.0);
            } else {
                distance.add_term(yj, 1.0);
            }
        }
        prog.add_linear(distance, 1.0, f64::INFINITY);
    }

    y
}
