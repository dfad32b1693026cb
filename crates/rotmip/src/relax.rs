//! Convex outer approximations of SO(3) that need no integer variables.
//!
//! These are looser than the McCormick envelope but cheap, and they compose
//! with it: all of them cut the same `R` variables.

use rotmip_program::{LinearExpr, Program, VarId};

use crate::types::{RotationMatrixVars, RpyLimits};

/// Creates the nine entry variables of a rotation matrix.
///
/// Every entry is bounded to `[-1, 1]` and the trace to `[-1, 3]`; for a
/// true rotation `trace(R) = 1 + 2·cos(angle)`, so both bounds are tight
/// over SO(3).
pub fn new_rotation_matrix_vars(prog: &mut Program) -> RotationMatrixVars {
    let entries: [[VarId; 3]; 3] =
        std::array::from_fn(|_| std::array::from_fn(|_| prog.new_continuous(-1.0, 1.0)));
    let r = RotationMatrixVars::from_entries(entries);
    let trace = LinearExpr::var(r.entry(0, 0))
        + LinearExpr::var(r.entry(1, 1))
        + LinearExpr::var(r.entry(2, 2));
    prog.add_linear(trace, -1.0, 3.0);
    r
}

/// Entries of R whose sign is fixed when all flags in the first field hold.
/// An entry appears when every trigonometric factor in its roll-pitch-yaw
/// expansion has known sign under those flags; the bool records whether the
/// entry is then non-negative.
fn rpy_sign_table() -> [(RpyLimits, usize, usize, bool); 7] {
    let cos_pitch_yaw = RpyLimits::PITCH_NEG_PI_2_TO_PI_2;
    let all_but_cos_pitch = RpyLimits::ROLL_NEG_PI_2_TO_PI_2
        | RpyLimits::ROLL_0_TO_PI
        | RpyLimits::PITCH_0_TO_PI
        | RpyLimits::YAW_NEG_PI_2_TO_PI_2
        | RpyLimits::YAW_0_TO_PI;
    [
        // R(0, 0) = cos(pitch)·cos(yaw)
        (cos_pitch_yaw | RpyLimits::YAW_NEG_PI_2_TO_PI_2, 0, 0, true),
        // R(1, 0) = cos(pitch)·sin(yaw)
        (cos_pitch_yaw | RpyLimits::YAW_0_TO_PI, 1, 0, true),
        // R(2, 0) = -sin(pitch)
        (RpyLimits::PITCH_0_TO_PI, 2, 0, false),
        // R(1, 1) = cos(roll)·cos(yaw) + sin(roll)·sin(pitch)·sin(yaw)
        (all_but_cos_pitch, 1, 1, true),
        // R(2, 1) = sin(roll)·cos(pitch)
        (
            RpyLimits::ROLL_0_TO_PI | RpyLimits::PITCH_NEG_PI_2_TO_PI_2,
            2,
            1,
            true,
        ),
        // R(0, 2) = cos(roll)·sin(pitch)·cos(yaw) + sin(roll)·sin(yaw)
        (all_but_cos_pitch, 0, 2, true),
        // R(2, 2) = cos(roll)·cos(pitch)
        (
            RpyLimits::ROLL_NEG_PI_2_TO_PI_2 | RpyLimits::PITCH_NEG_PI_2_TO_PI_2,
            2,
            2,
            true,
        ),
    ]
}

/// Tightens entry bounds of R from half-range roll-pitch-yaw limits.
pub fn add_rpy_limit_bounds(prog: &mut Program, r: &RotationMatrixVars, limits: RpyLimits) {
    for (required, i, j, nonneg) in rpy_sign_table() {
        if limits.contains(required) {
            if nonneg {
                prog.bound(r.entry(i, j), 0.0, 1.0);
            } else {
                prog.bound(r.entry(i, j), -1.0, 0.0);
            }
        }
    }
}

/// Fixes sign digits of the interval selectors from half-range
/// roll-pitch-yaw limits.
///
/// `b0[i][j]` must be the most significant Gray digit of entry R(i, j),
/// where digit 1 means the entry is non-negative.
pub fn add_rpy_limit_bounds_to_binary(
    prog: &mut Program,
    b0: &[[VarId; 3]; 3],
    limits: RpyLimits,
) {
    for (required, i, j, nonneg) in rpy_sign_table() {
        if limits.contains(required) {
            if nonneg {
                prog.bound(b0[i][j], 1.0, 1.0);
            } else {
                prog.bound(b0[i][j], 0.0, 0.0);
            }
        }
    }
}

/// Adds the orthonormality second-order-cone relaxation of R.
///
/// Each column and row gets `‖v‖² <= 1`, and each pair of columns (and of
/// rows) gets the relaxed orthogonality cuts `‖u + v‖ <= √2` and
/// `‖u - v‖ <= √2`, which hold with equality for orthonormal pairs.
pub fn add_orthonormal_socp_relaxation(prog: &mut Program, r: &RotationMatrixVars) {
    let vectors: Vec<[VarId; 3]> = (0..3)
        .map(|i| r.col(i))
        .chain((0..3).map(|i| r.row(i)))
        .collect();
    for v in &vectors {
        let mut z = vec![LinearExpr::constant(1.0), LinearExpr::constant(0.5)];
        z.extend(v.iter().map(|&e| LinearExpr::var(e)));
        prog.add_rotated_second_order_cone(z);
    }
    for group in [&vectors[0..3], &vectors[3..6]] {
        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            let u = group[a];
            let v = group[b];
            for sign in [1.0, -1.0] {
                let mut z = vec![LinearExpr::constant(std::f64::consts::SQRT_2)];
                z.extend(
                    (0..3).map(|axis| {
                        LinearExpr::var(u[axis]) + LinearExpr::var(v[axis]) * sign
                    }),
                );
                prog.add_second_order_cone(z);
            }
        }
    }
}

/// Sparse symmetric 4x4 basis matrix from its upper-triangle entries.
fn basis(entries: &[(usize, usize, f64)]) -> [[f64; 4]; 4] {
    let mut m = [[0.0; 4]; 4];
    for &(i, j, v) in entries {
        m[i][j] = v;
        m[j][i] = v;
    }
    m
}

/// Adds the spectrahedral (LMI) relaxation of R.
///
/// R is a rotation iff the quaternion outer-product matrix
/// `I + Σᵢⱼ R(i, j)·Fᵢⱼ` is positive semidefinite of rank one; dropping the
/// rank condition leaves the tightest convex relaxation of SO(3), its
/// convex hull.
pub fn add_spectrahedral_relaxation(prog: &mut Program, r: &RotationMatrixVars) {
    let f = vec![
        basis(&[(0, 0, 1.0), (1, 1, 1.0), (2, 2, 1.0), (3, 3, 1.0)]),
        // R(0, 0)
        basis(&[(0, 0, -1.0), (1, 1, 1.0), (2, 2, 1.0), (3, 3, -1.0)]),
        // R(1, 0)
        basis(&[(0, 2, -1.0), (1, 3, 1.0)]),
        // R(2, 0)
        basis(&[(0, 1, 1.0), (2, 3, 1.0)]),
        // R(0, 1)
        basis(&[(0, 2, 1.0), (1, 3, 1.0)]),
        // R(1, 1)
        basis(&[(0, 0, -1.0), (1, 1, -1.0), (2, 2, 1.0), (3, 3, 1.0)]),
        // R(2, 1)
        basis(&[(0, 3, 1.0), (1, 2, -1.0)]),
        // R(0, 2)
        basis(&[(0, 1, 1.0), (2, 3, -1.0)]),
        // R(1, 2)
        basis(&[(0, 3, 1.0), (1, 2, 1.0)]),
        // R(2, 2)
        basis(&[(0, 0, 1.0), (1, 1, -1.0), (2, 2, 1.0), (3, 3, -1.0)]),
    ];
    let mut vars = Vec::with_capacity(9);
    for j in 0..3 {
        for i in 0..3 {
            vars.push(r.entry(i, j));
        }
    }
    prog.add_linear_matrix_inequality(f, vars);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotmip_program::VarKind;

    fn assign(prog: &Program, m: [[f64; 3]; 3]) -> Vec<f64> {
        // R entries are the first nine variables, row-major.
        let mut x = vec![0.0; prog.num_vars()];
        for i in 0..3 {
            for j in 0..3 {
                x[i * 3 + j] = m[i][j];
            }
        }
        x
    }

    const IDENTITY: [[f64; 3]; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    #[test]
    fn test_new_rotation_matrix_vars() {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        assert_eq!(prog.kind(r.entry(2, 1)), VarKind::Continuous);
        assert_eq!(prog.bounds(r.entry(0, 0)), (-1.0, 1.0));
        assert!(prog.check_point(&assign(&prog, IDENTITY), 1e-9).is_ok());
        // trace(-I) = -3 < -1.
        let neg = [[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, -1.0]];
        assert!(prog.check_point(&assign(&prog, neg), 1e-9).is_err());
    }

    #[test]
    fn test_rpy_limit_bounds() {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        add_rpy_limit_bounds(
            &mut prog,
            &r,
            RpyLimits::PITCH_0_TO_PI | RpyLimits::PITCH_NEG_PI_2_TO_PI_2
                | RpyLimits::YAW_NEG_PI_2_TO_PI_2,
        );
        // sin(pitch) >= 0 forces R(2, 0) = -sin(pitch) <= 0.
        assert_eq!(prog.bounds(r.entry(2, 0)), (-1.0, 0.0));
        // cos(pitch), cos(yaw) >= 0 force R(0, 0) >= 0.
        assert_eq!(prog.bounds(r.entry(0, 0)), (0.0, 1.0));
        // No flag set touches R(1, 1).
        assert_eq!(prog.bounds(r.entry(1, 1)), (-1.0, 1.0));
    }

    #[test]
    fn test_rpy_limit_bounds_to_binary() {
        let mut prog = Program::new();
        let b0: [[VarId; 3]; 3] =
            std::array::from_fn(|_| std::array::from_fn(|_| prog.new_binary()));
        add_rpy_limit_bounds_to_binary(
            &mut prog,
            &b0,
            RpyLimits::PITCH_NEG_PI_2_TO_PI_2 | RpyLimits::YAW_NEG_PI_2_TO_PI_2,
        );
        assert_eq!(prog.bounds(b0[0][0]), (1.0, 1.0));
        assert_eq!(prog.bounds(b0[2][0]), (0.0, 1.0));
    }

    #[test]
    fn test_orthonormal_socp_relaxation() {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        add_orthonormal_socp_relaxation(&mut prog, &r);
        assert!(prog.check_point(&assign(&prog, IDENTITY), 1e-9).is_ok());
        // A column of norm sqrt(3) breaks the unit-norm cone.
        let ones = [[1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [1.0, 0.0, 1.0]];
        assert!(prog.check_point(&assign(&prog, ones), 1e-9).is_err());
        // Unit columns that are far from orthogonal break the pair cuts.
        let shear = [[1.0, 1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(prog.check_point(&assign(&prog, shear), 1e-9).is_err());
    }

    #[test]
    fn test_spectrahedral_relaxation() {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        add_spectrahedral_relaxation(&mut prog, &r);
        assert!(prog.check_point(&assign(&prog, IDENTITY), 1e-9).is_ok());
        // 90-degree yaw.
        let yaw = [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(prog.check_point(&assign(&prog, yaw), 1e-9).is_ok());
        // An improper rotation (det = -1) is not in the convex hull.
        let reflect = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        assert!(prog.check_point(&assign(&prog, reflect), 1e-9).is_err());
    }
}
