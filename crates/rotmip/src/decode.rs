//! Lifting a concrete rotation matrix into the envelope's auxiliaries.
//!
//! Given a numeric rotation matrix, this computes SOS2 weights, Gray
//! digits and orthant-cut bounds that satisfy every constraint of
//! [`add_rotation_matrix_mccormick_envelope`]. Solvers use it for warm
//! starts; the test suite uses it to certify that true rotations stay
//! feasible.
//!
//! [`add_rotation_matrix_mccormick_envelope`]:
//! crate::mccormick::add_rotation_matrix_mccormick_envelope

use glam::DMat3;
use rotmip_program::{ceil_log2, reflected_gray_codes};

use crate::mccormick::McCormickEnvelope;
use crate::types::RotationMatrixVars;

/// The full-axis interval of `value` and the SOS2 weight of the interval's
/// lower breakpoint (the upper breakpoint carries the remainder).
///
/// Values on an interior breakpoint land in the interval above it, except
/// `value = 1` which clamps into the last interval.
fn axis_interval(value: f64, num_intervals_per_half_axis: usize) -> (usize, f64) {
    let n = num_intervals_per_half_axis;
    let idx = (((value + 1.0) * n as f64).floor() as isize).clamp(0, 2 * n as isize - 1) as usize;
    let upper_breakpoint = (idx + 1) as f64 / n as f64 - 1.0;
    // (value + 1) * n is a few ulps off for breakpoints like -1/3, which
    // pushes the raw weight just past the simplex bound.
    let weight = ((upper_breakpoint - value) * n as f64).clamp(0.0, 1.0);
    (idx, weight)
}

/// Whether a 3x3 sign-digit pattern satisfies the orthant-disjointness
/// cuts over its column pairs and row pairs.
fn orthant_cuts_hold(signs: &[[u8; 3]; 3]) -> bool {
    for (c0, c1) in [(0, 1), (0, 2), (1, 2)] {
        let mut col_same = 0;
        let mut col_diff = 0;
        let mut row_same = 0;
        let mut row_diff = 0;
        for i in 0..3 {
            if signs[i][c0] == signs[i][c1] {
                col_same += 1;
            } else {
                col_diff += 1;
            }
            if signs[c0][i] == signs[c1][i] {
                row_same += 1;
            } else {
                row_diff += 1;
            }
        }
        if col_same > 2 || col_diff > 2 || row_same > 2 || row_diff > 2 {
            return false;
        }
    }
    true
}

/// Writes a feasible envelope assignment for the rotation matrix `m` into
/// `x`, which must already hold values for any variables outside the
/// envelope (at least the length of the program's variable vector).
///
/// Matrix entries that are exactly zero sit on the sign breakpoint and may
/// take either sign digit; when the orthant-disjointness cut is active the
/// lift searches those free digits for a pattern the cut accepts, so e.g.
/// axis-aligned rotations remain liftable.
pub fn lift_rotation_matrix(
    x: &mut [f64],
    r: &RotationMatrixVars,
    envelope: &McCormickEnvelope,
    m: &DMat3,
    num_intervals_per_half_axis: usize,
) {
    let n = num_intervals_per_half_axis;
    let digits = ceil_log2(2 * n);
    let gray_codes = reflected_gray_codes(digits);

    let mut idx = [[0usize; 3]; 3];
    let mut weight = [[0.0; 3]; 3];
    let mut free = Vec::new();
    for i in 0..3 {
        for j in 0..3 {
            let value = m.col(j)[i];
            let (k, w) = axis_interval(value, n);
            idx[i][j] = k;
            weight[i][j] = w;
            if value == 0.0 {
                // Breakpoint 0 belongs to intervals n-1 and n alike; the
                // weights are the same either way, only the digits differ.
                free.push((i, j));
            }
        }
    }

    if !envelope.orthant_aux.is_empty() {
        // Flip zero entries to the negative-side interval until the sign
        // pattern clears the orthant cuts.
        for mask in 0..(1u32 << free.len()) {
            let mut candidate = idx;
            for (bit, &(i, j)) in free.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    candidate[i][j] = n - 1;
                }
            }
            let signs: [[u8; 3]; 3] = std::array::from_fn(|i| {
                std::array::from_fn(|j| gray_codes[candidate[i][j]][0])
            });
            if orthant_cuts_hold(&signs) {
                for (bit, &(i, j)) in free.iter().enumerate() {
                    if mask & (1 << bit) != 0 {
                        // Interval n-1 puts breakpoint 0 at its upper end,
                        // so the lower-breakpoint weight becomes 0.
                        weight[i][j] = 0.0;
                    }
                }
                idx = candidate;
                break;
            }
        }
    }

    for i in 0..3 {
        for j in 0..3 {
            x[r.entry(i, j).index()] = m.col(j)[i];
            for (k, &l) in envelope.lambda[i][j].iter().enumerate() {
                x[l.index()] = if k == idx[i][j] {
                    weight[i][j]
                } else if k == idx[i][j] + 1 {
                    1.0 - weight[i][j]
                } else {
                    0.0
                };
            }
            for (digit, b) in envelope.binary.iter().enumerate() {
                x[b[i][j].index()] = f64::from(gray_codes[idx[i][j]][digit]);
            }
        }
    }

    if !envelope.orthant_aux.is_empty() {
        let signs: [[f64; 3]; 3] = std::array::from_fn(|i| {
            std::array::from_fn(|j| f64::from(gray_codes[idx[i][j]][0]))
        });
        // Mirror the emission order of the cut: column pairs then row
        // pairs, t digits before s digits.
        let mut aux = envelope.orthant_aux.iter();
        for transpose in [false, true] {
            for (c0, c1) in [(0, 1), (0, 2), (1, 2)] {
                let pick = |i: usize, j: usize| {
                    if transpose {
                        signs[j][i]
                    } else {
                        signs[i][j]
                    }
                };
                for i in 0..3 {
                    if let Some(t) = aux.next() {
                        x[t.index()] = (pick(i, c0) + pick(i, c1) - 1.0).abs();
                    }
                }
                for i in 0..3 {
                    if let Some(s) = aux.next() {
                        x[s.index()] = (pick(i, c0) - pick(i, c1)).abs();
                    }
                }
            }
        }
    }
}
