//! The McCormick-envelope mixed-integer relaxation of SO(3).
//!
//! Each entry of R is broken over `2N` intervals with a Gray-coded
//! logarithmic SOS2 encoding. Every positive-orthant grid cell is
//! classified against the unit sphere once, and the resulting convex
//! constraint set is reflected into all eight orthants for each of the six
//! unit vectors of R (three columns and three rows).

use glam::DVec3;
use rotmip_program::{
    add_logarithmic_sos2, ceil_log2, reflected_gray_codes, LinearExpr, Program, VarId,
};

use crate::geometry::{box_sphere_intersection_vertices, half_space_relaxation, inner_facets};
use crate::orthant::{box_selector_exprs, envelope_breakpoint, flip_vector};
use crate::relax::add_rpy_limit_bounds_to_binary;
use crate::types::{RelaxationError, RotationMatrixVars, RpyLimits};

/// Norm tolerance when classifying a grid cell against the sphere: a point
/// whose coordinates are each off by one ulp moves the norm by at most two.
const CLASSIFY_TOL: f64 = 2.0 * f64::EPSILON;

/// Auxiliary variables created by
/// [`add_rotation_matrix_mccormick_envelope`], returned so callers can add
/// problem-specific constraints over them or warm-start a solver.
#[derive(Debug)]
pub struct McCormickEnvelope {
    /// One 3x3 binary matrix per Gray-code digit, most significant first.
    /// `binary[k][i][j]` is digit `k` of the interval selector of R(i, j);
    /// digit 0 reports the sign of the entry.
    pub binary: Vec<[[VarId; 3]; 3]>,
    /// `lambda[i][j]` are the `2N + 1` SOS2 weights reconstructing R(i, j).
    pub lambda: [[Vec<VarId>; 3]; 3],
    /// The `t`/`s` bound variables of the orthant-disjointness cuts, in
    /// creation order; empty when `N` is not a power of two.
    pub orthant_aux: Vec<VarId>,
}

/// Convex relaxation data of one positive-orthant grid cell.
#[derive(Debug, Clone)]
enum CellRelaxation {
    /// The cell does not touch the sphere surface; its interval selection
    /// is forbidden outright.
    Empty,
    /// Exactly one corner of the cell lies on the sphere.
    SinglePoint { u: DVec3 },
    /// A proper intersection region with its half-space aperture and inner
    /// convex-hull facets.
    Region {
        normal: DVec3,
        facets_a: Vec<DVec3>,
        facets_b: Vec<f64>,
        sin_theta: f64,
        sin_half_theta: f64,
    },
}

/// Classifies one grid cell against the unit sphere and precomputes its
/// relaxation geometry.
fn classify_cell(bmin: DVec3, bmax: DVec3) -> Result<CellRelaxation, RelaxationError> {
    let min_norm = bmin.length();
    let max_norm = bmax.length();
    if min_norm > 1.0 + CLASSIFY_TOL || max_norm < 1.0 - CLASSIFY_TOL {
        return Ok(CellRelaxation::Empty);
    }
    if (min_norm - 1.0).abs() < CLASSIFY_TOL || (max_norm - 1.0).abs() < CLASSIFY_TOL {
        let u = if (min_norm - 1.0).abs() < CLASSIFY_TOL {
            bmin / min_norm
        } else {
            bmax / max_norm
        };
        return Ok(CellRelaxation::SinglePoint { u });
    }
    let pts = box_sphere_intersection_vertices(bmin, bmax)?;
    if pts.len() < 3 {
        return Err(RelaxationError::TooFewVertices {
            required: 3,
            actual: pts.len(),
        });
    }
    let (normal, d) = half_space_relaxation(&pts)?;
    let (facets_a, facets_b) = inner_facets(&pts)?;
    // theta is the largest angle between the normal and any sphere point in
    // the cell.
    let theta = d.clamp(-1.0, 1.0).acos();
    Ok(CellRelaxation::Region {
        normal,
        facets_a,
        facets_b,
        sin_theta: theta.sin(),
        sin_half_theta: (theta / 2.0).sin(),
    })
}

/// `Σᵢ c(i)·vars(i)` as an expression.
fn dot_expr(c: DVec3, vars: [VarId; 3]) -> LinearExpr {
    let mut expr = LinearExpr::new();
    for axis in 0..3 {
        expr.add_term(vars[axis], c[axis]);
    }
    expr
}

/// Rows of the skew matrix of `u`, so that `(u × w)(i) = rows(i)·w`.
fn cross_rows(u: DVec3) -> [DVec3; 3] {
    [
        DVec3::new(0.0, -u.z, u.y),
        DVec3::new(u.z, 0.0, -u.x),
        DVec3::new(-u.y, u.x, 0.0),
    ]
}

/// Emits the cell's constraint set for one unit vector `v` of R (with `v1`,
/// `v2` the two other vectors of the same kind), reflected into all eight
/// orthants.
///
/// The gate expression `c_sum` is zero exactly when the binary selectors
/// place `v` in this cell for the orthant at hand, and at least one
/// otherwise; every conditional cut carries a `c_sum` slack large enough to
/// free it whenever the cell is inactive.
#[allow(clippy::too_many_arguments)]
fn add_vector_cell_constraints(
    prog: &mut Program,
    v: [VarId; 3],
    b_axes: &[Vec<VarId>; 3],
    v1: [VarId; 3],
    v2: [VarId; 3],
    interval_idx: [usize; 3],
    cell: &CellRelaxation,
    gray_codes: &[Vec<u8>],
    num_intervals_per_half_axis: usize,
) {
    for orthant in 0..8 {
        let c = box_selector_exprs(
            interval_idx,
            orthant,
            gray_codes,
            b_axes,
            num_intervals_per_half_axis,
        );
        let c_sum = c[0].clone() + c[1].clone() + c[2].clone();

        match cell {
            CellRelaxation::Empty => {
                // No point of this cell lies on the sphere, so the selector
                // may never land here.
                prog.add_linear(c_sum, 1.0, f64::INFINITY);
            }
            CellRelaxation::SinglePoint { u } => {
                let ou = flip_vector(*u, orthant);
                // When active: v = u, v·v1 = v·v2 = 0 and u × v1 = v2.
                for axis in 0..3 {
                    let e = LinearExpr::var(v[axis]) - c_sum.clone() * 2.0;
                    prog.add_linear(e, f64::NEG_INFINITY, ou[axis]);
                    let e = LinearExpr::var(v[axis]) + c_sum.clone() * 2.0;
                    prog.add_linear(e, ou[axis], f64::INFINITY);
                }
                for w in [v1, v2] {
                    let dot = dot_expr(ou, w);
                    prog.add_linear(dot.clone() - c_sum.clone(), f64::NEG_INFINITY, 0.0);
                    prog.add_linear(dot + c_sum.clone(), 0.0, f64::INFINITY);
                }
                let rows = cross_rows(ou);
                for axis in 0..3 {
                    let diff = dot_expr(rows[axis], v1) - LinearExpr::var(v2[axis]);
                    prog.add_linear(
                        diff.clone() - c_sum.clone() * 2.0,
                        f64::NEG_INFINITY,
                        0.0,
                    );
                    prog.add_linear(diff + c_sum.clone() * 2.0, 0.0, f64::INFINITY);
                }
            }
            CellRelaxation::Region {
                normal,
                facets_a,
                facets_b,
                sin_theta,
                sin_half_theta,
            } => {
                let on = flip_vector(*normal, orthant);

                // Inner convex-hull facets, active only when the cell is.
                for (a_row, &b_i) in facets_a.iter().zip(facets_b) {
                    let oa = flip_vector(*a_row, orthant);
                    let e = dot_expr(oa, v) - c_sum.clone() * (1.0 - b_i);
                    prog.add_linear(e, f64::NEG_INFINITY, b_i);
                }

                // Unconditional norm band; odd orthants mirror an even one.
                if orthant % 2 == 0 {
                    prog.add_linear(dot_expr(on, v), -1.0, 1.0);
                }

                // v is within theta of the normal, so any unit vector
                // orthogonal to v is within pi/2 ± theta of it.
                for w in [v1, v2] {
                    let dot = dot_expr(on, w);
                    prog.add_linear(dot.clone() - c_sum.clone(), f64::NEG_INFINITY, *sin_theta);
                    prog.add_linear(dot + c_sum.clone(), -sin_theta, f64::INFINITY);
                }

                // Chord bound: ‖v2 - n × v1‖∞ <= 2 sin(theta / 2).
                let rows = cross_rows(on);
                for axis in 0..3 {
                    let diff = LinearExpr::var(v2[axis]) - dot_expr(rows[axis], v1);
                    prog.add_linear(
                        diff.clone() - c_sum.clone() * 2.0,
                        f64::NEG_INFINITY,
                        2.0 * sin_half_theta,
                    );
                    prog.add_linear(
                        diff + c_sum.clone() * 2.0,
                        -2.0 * sin_half_theta,
                        f64::INFINITY,
                    );
                }
            }
        }
    }
}

/// Forbids two columns of R from sharing an orthant or occupying opposite
/// orthants, which orthogonal unit vectors never do.
///
/// Valid only when the top Gray digit exactly reports each coordinate's
/// sign, i.e. when `N` is a power of two; for other `N` the cut is an
/// optional strengthening and is silently skipped.
fn add_not_in_same_or_opposite_orthant(
    prog: &mut Program,
    b0: &[[VarId; 3]; 3],
    num_intervals_per_half_axis: usize,
    aux: &mut Vec<VarId>,
) {
    let n = num_intervals_per_half_axis;
    if n & (n - 1) != 0 {
        log::debug!("orthant-disjointness cut skipped, N = {n} is not a power of two");
        return;
    }
    for (c0, c1) in [(0, 1), (0, 2), (1, 2)] {
        let t = prog.new_continuous_vec(3, f64::NEG_INFINITY, f64::INFINITY);
        let s = prog.new_continuous_vec(3, f64::NEG_INFINITY, f64::INFINITY);
        let t_sum = t.iter().fold(LinearExpr::new(), |mut e, &v| {
            e.add_term(v, 1.0);
            e
        });
        let s_sum = s.iter().fold(LinearExpr::new(), |mut e, &v| {
            e.add_term(v, 1.0);
            e
        });
        // At most two of three coordinates may agree in sign, and at most
        // two may disagree.
        prog.add_linear(t_sum, f64::NEG_INFINITY, 2.0);
        prog.add_linear(s_sum, f64::NEG_INFINITY, 2.0);
        for i in 0..3 {
            // t(i) >= |B(i, c0) + B(i, c1) - 1|, which is 1 iff the signs
            // agree.
            let same = LinearExpr::var(b0[i][c0]) + LinearExpr::var(b0[i][c1]) - 1.0;
            prog.add_linear(
                same.clone() - LinearExpr::var(t[i]),
                f64::NEG_INFINITY,
                0.0,
            );
            prog.add_linear(same + LinearExpr::var(t[i]), 0.0, f64::INFINITY);
            // s(i) >= |B(i, c0) - B(i, c1)|, which is 1 iff the signs
            // differ.
            let diff = LinearExpr::var(b0[i][c0]) - LinearExpr::var(b0[i][c1]);
            prog.add_linear(
                diff.clone() - LinearExpr::var(s[i]),
                f64::NEG_INFINITY,
                0.0,
            );
            prog.add_linear(diff + LinearExpr::var(s[i]), 0.0, f64::INFINITY);
        }
        aux.extend(t);
        aux.extend(s);
    }
}

/// Adds the linear under-approximation of `x(0)² + x(1)² + x(2)² = 1` over
/// three SOS2-encoded coordinates sharing the breakpoints `phi`.
///
/// Within an interval the chord of the parabola dominates the square, so
/// `Σᵢ Σₖ λᵢ(k)·φ(k)²` is an upper bound of the sum of squares and pinning
/// it above 1 is a valid cut; the `<= 1` side is already implied by each
/// coordinate's own simplex bound.
fn add_unit_length_sos2_cut(
    prog: &mut Program,
    phi: &[f64],
    lambda: [&[VarId]; 3],
) -> Result<(), RelaxationError> {
    for l in lambda {
        if l.len() != phi.len() {
            return Err(RelaxationError::LengthMismatch {
                phi: phi.len(),
                lambda: l.len(),
            });
        }
    }
    let mut expr = LinearExpr::new();
    for (k, &p) in phi.iter().enumerate() {
        for l in lambda {
            expr.add_term(l[k], p * p);
        }
    }
    prog.add_linear(expr, 1.0, f64::INFINITY);
    Ok(())
}

/// Adds the McCormick-envelope mixed-integer relaxation of `R ∈ SO(3)` with
/// `num_intervals_per_half_axis` intervals per half axis, returning the
/// auxiliary variables it created.
///
/// Every positive-orthant grid cell is classified once (the half-space
/// SOCP depends only on the discretization, not on this particular R) and
/// its constraints are emitted for the three columns and three rows of R
/// across all eight orthants. `limits` optionally fixes sign digits from
/// roll/pitch/yaw half-range knowledge.
pub fn add_rotation_matrix_mccormick_envelope(
    prog: &mut Program,
    r: &RotationMatrixVars,
    num_intervals_per_half_axis: usize,
    limits: RpyLimits,
) -> Result<McCormickEnvelope, RelaxationError> {
    let n = num_intervals_per_half_axis;
    if n < 1 {
        return Err(RelaxationError::InvalidResolution);
    }
    let num_lambda = 2 * n + 1;
    let phi_vec: Vec<f64> = (0..num_lambda)
        .map(|k| envelope_breakpoint(k as isize, n) - 1.0)
        .collect();
    let digits = ceil_log2(2 * n);
    let gray_codes = reflected_gray_codes(digits);

    // Per-entry SOS2 weights and their Gray-coded selectors.
    let mut lambda: [[Vec<VarId>; 3]; 3] = Default::default();
    let mut selectors: [[Vec<VarId>; 3]; 3] = Default::default();
    for i in 0..3 {
        for j in 0..3 {
            let l = prog.new_continuous_vec(num_lambda, 0.0, 1.0);
            let y = add_logarithmic_sos2(prog, &l);
            // R(i, j) = Σ_k φ(k)·λ(k).
            let mut recon = LinearExpr::var(r.entry(i, j));
            for (k, &lk) in l.iter().enumerate() {
                recon.add_term(lk, -phi_vec[k]);
            }
            prog.add_equality(recon, 0.0);
            lambda[i][j] = l;
            selectors[i][j] = y;
        }
    }
    let binary: Vec<[[VarId; 3]; 3]> = (0..digits)
        .map(|k| std::array::from_fn(|i| std::array::from_fn(|j| selectors[i][j][k])))
        .collect();

    // The top digit reports the sign of each entry, so pairs of columns
    // (and rows) must not select identical or opposite sign patterns.
    let b0 = binary[0];
    let b0_t: [[VarId; 3]; 3] = std::array::from_fn(|i| std::array::from_fn(|j| b0[j][i]));
    let mut orthant_aux = Vec::new();
    add_not_in_same_or_opposite_orthant(prog, &b0, n, &mut orthant_aux);
    add_not_in_same_or_opposite_orthant(prog, &b0_t, n, &mut orthant_aux);

    // Angle limits toggle whole orthants, so fixing the positive-orthant
    // sign digits is sufficient.
    add_rpy_limit_bounds_to_binary(prog, &b0, limits);

    for i in 0..3 {
        add_unit_length_sos2_cut(
            prog,
            &phi_vec,
            [&lambda[0][i], &lambda[1][i], &lambda[2][i]],
        )?;
        add_unit_length_sos2_cut(
            prog,
            &phi_vec,
            [&lambda[i][0], &lambda[i][1], &lambda[i][2]],
        )?;
    }

    // Classify every positive-orthant cell once; the geometry depends only
    // on N and is shared by all six vectors and all eight orthants.
    let mut cells = Vec::with_capacity(n * n * n);
    let mut empty = 0usize;
    let mut single = 0usize;
    for xi in 0..n {
        for yi in 0..n {
            for zi in 0..n {
                let bmin = DVec3::new(
                    envelope_breakpoint(xi as isize, n),
                    envelope_breakpoint(yi as isize, n),
                    envelope_breakpoint(zi as isize, n),
                );
                let bmax = DVec3::new(
                    envelope_breakpoint(xi as isize + 1, n),
                    envelope_breakpoint(yi as isize + 1, n),
                    envelope_breakpoint(zi as isize + 1, n),
                );
                let cell = classify_cell(bmin, bmax)?;
                match cell {
                    CellRelaxation::Empty => empty += 1,
                    CellRelaxation::SinglePoint { .. } => single += 1,
                    CellRelaxation::Region { .. } => {}
                }
                cells.push(([xi, yi, zi], cell));
            }
        }
    }
    log::debug!(
        "N = {n}: {} cells ({empty} empty, {single} single-point)",
        cells.len()
    );

    for i in 0..3 {
        let col_axes: [Vec<VarId>; 3] = std::array::from_fn(|axis| selectors[axis][i].clone());
        let row_axes: [Vec<VarId>; 3] = std::array::from_fn(|axis| selectors[i][axis].clone());
        for (interval_idx, cell) in &cells {
            add_vector_cell_constraints(
                prog,
                r.col(i),
                &col_axes,
                r.col((i + 1) % 3),
                r.col((i + 2) % 3),
                *interval_idx,
                cell,
                &gray_codes,
                n,
            );
            add_vector_cell_constraints(
                prog,
                r.row(i),
                &row_axes,
                r.row((i + 1) % 3),
                r.row((i + 2) % 3),
                *interval_idx,
                cell,
                &gray_codes,
                n,
            );
        }
    }

    Ok(McCormickEnvelope {
        binary,
        lambda,
        orthant_aux,
    })
}
