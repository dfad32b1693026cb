//! Orthant reflection and interval indexing for the axis discretization.
//!
//! Each axis of `[-1, 1]` is split into `2N` intervals with breakpoints
//! `φ(k) = k/N` mirrored around zero. Geometry is computed once in the
//! positive orthant and reflected into the other seven via a sign mask:
//! bit `b` of the orthant index set means axis `b` is negative, so orthant
//! 0 is `(+, +, +)`.

use glam::DVec3;
use rotmip_program::{LinearExpr, VarId};

/// The breakpoint `φ(k) = k/n` of the half-axis discretization.
///
/// Callers index both half-axis and full-axis grids through this function,
/// so it deliberately extrapolates for `k` outside `[0, n]` instead of
/// checking bounds.
pub fn envelope_breakpoint(k: isize, n: usize) -> f64 {
    k as f64 / n as f64
}

/// The per-axis signs of the given orthant, `+1` or `-1` per component.
///
/// # Panics
///
/// Panics if `orthant > 7`.
pub fn orthant_sign_mask(orthant: usize) -> [i32; 3] {
    assert!(orthant < 8, "orthant index out of range");
    let mut mask = [1; 3];
    for (axis, m) in mask.iter_mut().enumerate() {
        if orthant & (1 << axis) != 0 {
            *m = -1;
        }
    }
    mask
}

/// Reflects a positive-orthant vector into the given orthant.
pub fn flip_vector(v: DVec3, orthant: usize) -> DVec3 {
    let mask = orthant_sign_mask(orthant);
    DVec3::new(
        f64::from(mask[0]) * v.x,
        f64::from(mask[1]) * v.y,
        f64::from(mask[2]) * v.z,
    )
}

/// Remaps positive-half-axis interval indices into full-axis indices for
/// the given orthant.
///
/// The full axis has `2n` intervals indexed from `-1` upward; a positive
/// axis maps interval `i` to `i + n`, a negative axis mirrors it to
/// `n - 1 - i`.
pub fn full_axis_interval_index(
    interval_idx: [usize; 3],
    orthant: usize,
    num_intervals_per_half_axis: usize,
) -> [usize; 3] {
    let mask = orthant_sign_mask(orthant);
    let n = num_intervals_per_half_axis;
    let mut full = [0; 3];
    for axis in 0..3 {
        full[axis] = if mask[axis] > 0 {
            interval_idx[axis] + n
        } else {
            n - 1 - interval_idx[axis]
        };
    }
    full
}

/// A non-negative expression over the binary selector variables that is 0
/// exactly when they encode `interval_idx` through the Gray code, and at
/// least 1 for every other assignment.
///
/// One term per digit: `1 - b` where the code digit is 1, `b` where it is
/// 0, so the expression counts the digits on which the assignment differs
/// from the target code.
pub fn interval_selector_expr(
    interval_idx: usize,
    gray_codes: &[Vec<u8>],
    b: &[VarId],
) -> LinearExpr {
    debug_assert_eq!(gray_codes[interval_idx].len(), b.len());
    let mut expr = LinearExpr::new();
    for (digit, &bit_var) in b.iter().enumerate() {
        if gray_codes[interval_idx][digit] == 1 {
            expr.add_constant(1.0);
            expr.add_term(bit_var, -1.0);
        } else {
            expr.add_term(bit_var, 1.0);
        }
    }
    expr
}

/// Numeric twin of [`interval_selector_expr`], counting differing digits of
/// a concrete bit assignment.
pub fn interval_selector_value(interval_idx: usize, gray_codes: &[Vec<u8>], bits: &[u8]) -> u32 {
    debug_assert_eq!(gray_codes[interval_idx].len(), bits.len());
    gray_codes[interval_idx]
        .iter()
        .zip(bits)
        .map(|(code, bit)| u32::from(code != bit))
        .sum()
}

/// The three per-axis selector expressions of one grid cell in one orthant.
///
/// `b_axes[axis]` holds the Gray-digit variables of that axis. All three
/// expressions are 0 iff the binary assignment places every coordinate in
/// this cell's interval for the given orthant.
pub fn box_selector_exprs(
    interval_idx: [usize; 3],
    orthant: usize,
    gray_codes: &[Vec<u8>],
    b_axes: &[Vec<VarId>; 3],
    num_intervals_per_half_axis: usize,
) -> [LinearExpr; 3] {
    let full = full_axis_interval_index(interval_idx, orthant, num_intervals_per_half_axis);
    [
        interval_selector_expr(full[0], gray_codes, &b_axes[0]),
        interval_selector_expr(full[1], gray_codes, &b_axes[1]),
        interval_selector_expr(full[2], gray_codes, &b_axes[2]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotmip_program::{reflected_gray_codes, Program};

    #[test]
    fn test_envelope_breakpoint() {
        assert_eq!(envelope_breakpoint(0, 4), 0.0);
        assert_eq!(envelope_breakpoint(4, 4), 1.0);
        assert_eq!(envelope_breakpoint(6, 4), 1.5);
        assert_eq!(envelope_breakpoint(-2, 4), -0.5);
    }

    #[test]
    fn test_orthant_sign_mask() {
        assert_eq!(orthant_sign_mask(0), [1, 1, 1]);
        assert_eq!(orthant_sign_mask(1), [-1, 1, 1]);
        assert_eq!(orthant_sign_mask(6), [1, -1, -1]);
        assert_eq!(orthant_sign_mask(7), [-1, -1, -1]);
    }

    #[test]
    fn test_flip_vector() {
        let v = DVec3::new(1.0, 2.0, 3.0);
        assert_eq!(flip_vector(v, 0), v);
        assert_eq!(flip_vector(v, 5), DVec3::new(-1.0, 2.0, -3.0));
    }

    #[test]
    fn test_full_axis_interval_index() {
        // Positive axes shift up by N, negative axes mirror.
        assert_eq!(full_axis_interval_index([0, 1, 2], 0, 4), [4, 5, 6]);
        assert_eq!(full_axis_interval_index([0, 1, 2], 7, 4), [3, 2, 1]);
        assert_eq!(full_axis_interval_index([0, 0, 0], 2, 1), [1, 0, 1]);
    }

    #[test]
    fn test_interval_selector_round_trip() {
        let digits = 3;
        let codes = reflected_gray_codes(digits);
        let mut prog = Program::new();
        let b = prog.new_binary_vec(digits);

        for target in 0..codes.len() {
            let expr = interval_selector_expr(target, &codes, &b);
            for assignment in 0..codes.len() {
                let mut x = vec![0.0; prog.num_vars()];
                for (digit, &bv) in b.iter().enumerate() {
                    x[bv.index()] = f64::from(codes[assignment][digit]);
                }
                let value = expr.eval(&x);
                let numeric =
                    interval_selector_value(target, &codes, &codes[assignment]);
                assert_eq!(value as u32, numeric);
                if assignment == target {
                    assert_eq!(value, 0.0);
                } else {
                    assert!(value >= 1.0);
                }
            }
        }
    }
}
