//! End-to-end feasibility checks: every relaxation must accept true
//! rotation matrices, and the McCormick envelope must reject assignments
//! that cheat its coupling constraints.

use glam::{DMat3, DQuat, DVec3};
use rotmip::{
    add_orthonormal_socp_relaxation, add_rotation_matrix_mccormick_envelope, add_rpy_limit_bounds,
    add_spectrahedral_relaxation, box_sphere_intersection_vertices, half_space_relaxation,
    lift_rotation_matrix, new_rotation_matrix_vars, RpyLimits,
};
use rotmip_program::Program;

const TOL: f64 = 1e-6;

/// Uniformly random rotation from the subgroup algorithm over quaternions.
fn sample_rotation<R: rand::Rng>(rng: &mut R) -> DMat3 {
    let u1: f64 = rng.random();
    let u2: f64 = rng.random();
    let u3: f64 = rng.random();
    let two_pi = 2.0 * std::f64::consts::PI;
    let q = DQuat::from_xyzw(
        (1.0 - u1).sqrt() * (two_pi * u2).sin(),
        (1.0 - u1).sqrt() * (two_pi * u2).cos(),
        u1.sqrt() * (two_pi * u3).sin(),
        u1.sqrt() * (two_pi * u3).cos(),
    );
    DMat3::from_quat(q)
}

fn assign_entries(x: &mut [f64], m: &DMat3) {
    // R entries are the first nine program variables, row-major.
    for i in 0..3 {
        for j in 0..3 {
            x[i * 3 + j] = m.col(j)[i];
        }
    }
}

#[test]
fn test_convex_relaxations_accept_random_rotations() {
    let mut prog = Program::new();
    let r = new_rotation_matrix_vars(&mut prog);
    add_orthonormal_socp_relaxation(&mut prog, &r);
    add_spectrahedral_relaxation(&mut prog, &r);

    let mut rng = rand::rng();
    for _ in 0..50 {
        let m = sample_rotation(&mut rng);
        let mut x = vec![0.0; prog.num_vars()];
        assign_entries(&mut x, &m);
        prog.check_point(&x, TOL).unwrap();
    }
}

#[test]
fn test_mccormick_envelope_accepts_random_rotations() {
    let mut rng = rand::rng();
    for n in [1, 2, 4] {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        let envelope =
            add_rotation_matrix_mccormick_envelope(&mut prog, &r, n, RpyLimits::NO_LIMITS)
                .unwrap();
        for _ in 0..10 {
            let m = sample_rotation(&mut rng);
            let mut x = vec![0.0; prog.num_vars()];
            lift_rotation_matrix(&mut x, &r, &envelope, &m, n);
            prog.check_point(&x, TOL).unwrap();
        }
    }
}

#[test]
fn test_mccormick_envelope_accepts_axis_aligned_rotations() {
    // Axis-aligned rotations are full of exact zeros and ones, hitting the
    // sign-digit tie-breaking and the orthant-disjointness cut head on.
    let matrices = [
        DMat3::IDENTITY,
        DMat3::from_rotation_x(std::f64::consts::FRAC_PI_2),
        DMat3::from_rotation_y(std::f64::consts::FRAC_PI_2),
        DMat3::from_rotation_z(std::f64::consts::FRAC_PI_2),
        DMat3::from_rotation_z(std::f64::consts::PI),
        DMat3::from_rotation_x(std::f64::consts::PI)
            * DMat3::from_rotation_z(std::f64::consts::FRAC_PI_2),
    ];
    for n in [1, 2] {
        let mut prog = Program::new();
        let r = new_rotation_matrix_vars(&mut prog);
        let envelope =
            add_rotation_matrix_mccormick_envelope(&mut prog, &r, n, RpyLimits::NO_LIMITS)
                .unwrap();
        for m in &matrices {
            // Snap the near-zero entries of the trigonometric constructors.
            let snapped = DMat3::from_cols_array(
                &m.to_cols_array().map(|v| if v.abs() < 1e-15 { 0.0 } else { v }),
            );
            let mut x = vec![0.0; prog.num_vars()];
            lift_rotation_matrix(&mut x, &r, &envelope, &snapped, n);
            prog.check_point(&x, TOL).unwrap();
        }
    }
}

#[test]
fn test_mccormick_envelope_couples_entries_to_weights() {
    let mut prog = Program::new();
    let r = new_rotation_matrix_vars(&mut prog);
    let envelope =
        add_rotation_matrix_mccormick_envelope(&mut prog, &r, 2, RpyLimits::NO_LIMITS).unwrap();

    let mut rng = rand::rng();
    let m = sample_rotation(&mut rng);
    let mut x = vec![0.0; prog.num_vars()];
    lift_rotation_matrix(&mut x, &r, &envelope, &m, 2);
    prog.check_point(&x, TOL).unwrap();

    // Moving an entry away from its SOS2 reconstruction must be caught.
    x[0] = (x[0] + 0.7).min(1.0) - 0.2;
    assert!(prog.check_point(&x, TOL).is_err());
}

#[test]
fn test_relaxations_reject_rank_deficient_matrix() {
    // A zero second row is far from SO(3): its columns cannot be unit
    // length, so both the SOCP cones and the McCormick unit-length cut
    // must catch it.
    let flat = DMat3::from_cols(
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(0.5, 0.0, 0.5),
    );

    let mut prog = Program::new();
    let r = new_rotation_matrix_vars(&mut prog);
    add_orthonormal_socp_relaxation(&mut prog, &r);
    let mut x = vec![0.0; prog.num_vars()];
    assign_entries(&mut x, &flat);
    assert!(prog.check_point(&x, TOL).is_err());

    let mut prog = Program::new();
    let r = new_rotation_matrix_vars(&mut prog);
    let envelope =
        add_rotation_matrix_mccormick_envelope(&mut prog, &r, 2, RpyLimits::NO_LIMITS).unwrap();
    let mut x = vec![0.0; prog.num_vars()];
    lift_rotation_matrix(&mut x, &r, &envelope, &flat, 2);
    // Row 1 is all zeros, so its SOS2 weights put no mass outside phi = 0
    // and the row's sum-of-squares lower bound cannot reach 1.
    assert!(prog.check_point(&x, TOL).is_err());
}

#[test]
fn test_rpy_limits_accept_compliant_rotation() {
    let all = RpyLimits::ROLL_NEG_PI_2_TO_PI_2
        | RpyLimits::ROLL_0_TO_PI
        | RpyLimits::PITCH_NEG_PI_2_TO_PI_2
        | RpyLimits::PITCH_0_TO_PI
        | RpyLimits::YAW_NEG_PI_2_TO_PI_2
        | RpyLimits::YAW_0_TO_PI;
    // roll, pitch, yaw all strictly inside (0, pi/2): every entry the sign
    // table talks about is strictly signed.
    let m = DMat3::from_rotation_z(0.4) * DMat3::from_rotation_y(0.2) * DMat3::from_rotation_x(0.3);

    let mut prog = Program::new();
    let r = new_rotation_matrix_vars(&mut prog);
    add_rpy_limit_bounds(&mut prog, &r, all);
    let envelope = add_rotation_matrix_mccormick_envelope(&mut prog, &r, 2, all).unwrap();

    let mut x = vec![0.0; prog.num_vars()];
    lift_rotation_matrix(&mut x, &r, &envelope, &m, 2);
    prog.check_point(&x, TOL).unwrap();
}

#[test]
fn test_half_space_aperture_tightens_with_resolution() {
    // The same spherical patch covered at N = 2 and at N = 4: the finer
    // cell supports a larger offset d, i.e. a narrower aperture.
    let coarse = box_sphere_intersection_vertices(
        DVec3::new(0.0, 0.0, 0.5),
        DVec3::new(0.5, 0.5, 1.0),
    )
    .unwrap();
    let fine = box_sphere_intersection_vertices(
        DVec3::new(0.0, 0.0, 0.75),
        DVec3::new(0.25, 0.25, 1.0),
    )
    .unwrap();
    let (_, d_coarse) = half_space_relaxation(&coarse).unwrap();
    let (_, d_fine) = half_space_relaxation(&fine).unwrap();
    assert!(d_fine > d_coarse);
    assert!(d_coarse > 0.5);
    assert!(d_fine < 1.0);
}
