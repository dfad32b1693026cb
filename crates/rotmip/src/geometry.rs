//! Geometry of the intersection between an axis-aligned box and the unit
//! sphere, restricted to the positive orthant.
//!
//! Everything here is computed for the positive orthant only; the McCormick
//! emitter reflects the results into the other seven orthants with
//! [`crate::orthant::flip_vector`].

use glam::DVec3;
use rotmip_program::{solve, LinearExpr, Program};

use crate::types::RelaxationError;

/// Vertices that are closer than this to colinear do not define a plane.
const COLINEAR_TOL: f64 = 1e-3;
/// Tolerance for point-on-plane tests.
const COPLANAR_TOL: f64 = 1e-10;

/// Computes all intersection points between the edges of an axis-aligned
/// box in the positive orthant and the unit sphere.
///
/// If the corner of the box closest to (or farthest from) the origin lies
/// exactly on the sphere, that single corner is the whole intersection and
/// is returned alone. Otherwise the result contains every box vertex on the
/// sphere plus one crossing point per edge that straddles the sphere, at
/// most 12 points in total.
///
/// Returns [`RelaxationError::InvalidBox`] unless the box is inside the
/// positive orthant with `bmax > bmin` componentwise and the sphere passes
/// through it (`‖bmin‖ <= 1 <= ‖bmax‖`).
pub fn box_sphere_intersection_vertices(
    bmin: DVec3,
    bmax: DVec3,
) -> Result<Vec<DVec3>, RelaxationError> {
    if bmin.min_element() < 0.0
        || (bmax - bmin).min_element() <= 0.0
        || bmin.length() > 1.0
        || bmax.length() < 1.0
    {
        return Err(RelaxationError::InvalidBox);
    }

    if bmin.length() == 1.0 {
        return Ok(vec![bmin]);
    }
    if bmax.length() == 1.0 {
        return Ok(vec![bmax]);
    }

    let mut intersections = Vec::with_capacity(12);

    // Box vertices that lie exactly on the sphere.
    for i in 0..8 {
        let mut vertex = DVec3::ZERO;
        for axis in 0..3 {
            vertex[axis] = if i & (1 << axis) != 0 {
                bmin[axis]
            } else {
                bmax[axis]
            };
        }
        if vertex.length() == 1.0 {
            intersections.push(vertex);
        }
    }

    // One crossing per edge whose endpoints straddle the sphere. The edge
    // fixes two coordinates; the third is sqrt(1 - x^2 - y^2).
    for axis in 0..3 {
        let fixed1 = (axis + 1) % 3;
        let fixed2 = (axis + 2) % 3;
        for &val1 in &[bmin[fixed1], bmax[fixed1]] {
            for &val2 in &[bmin[fixed2], bmax[fixed2]] {
                let mut closer = DVec3::ZERO;
                closer[axis] = bmin[axis];
                closer[fixed1] = val1;
                closer[fixed2] = val2;
                let mut farther = closer;
                farther[axis] = bmax[axis];
                if closer.length() < 1.0 && farther.length() > 1.0 {
                    let mut crossing = closer;
                    crossing[axis] = (1.0 - val1 * val1 - val2 * val2).sqrt();
                    intersections.push(crossing);
                }
            }
        }
    }
    Ok(intersections)
}

/// Computes the plane through a triangle in the positive orthant, oriented
/// outward from the origin.
///
/// Returns the unit normal `n` (componentwise non-negative) and offset `d`
/// with `n·x = d` on the triangle. Near-colinear vertices are rejected with
/// [`RelaxationError::DegenerateTriangle`]; a normal that cannot be
/// oriented into the positive orthant is an invariant breach and is
/// reported, never clamped.
pub fn triangle_outward_normal(
    p0: DVec3,
    p1: DVec3,
    p2: DVec3,
) -> Result<(DVec3, f64), RelaxationError> {
    debug_assert!(p0.min_element() >= 0.0 && p1.min_element() >= 0.0 && p2.min_element() >= 0.0);
    let cross = (p2 - p0).cross(p1 - p0);
    let norm = cross.length();
    if norm < COLINEAR_TOL {
        return Err(RelaxationError::DegenerateTriangle);
    }
    let mut n = cross / norm;
    if n.element_sum() < 0.0 {
        n = -n;
    }
    let d = p0.dot(n);
    if n.min_element() < 0.0 {
        return Err(RelaxationError::HalfSpaceInvariant {
            n: n.to_array(),
            d,
        });
    }
    Ok((n, d))
}

/// Determines whether all vertices lie on a single plane.
///
/// The plane is taken through the first three vertices; if every other
/// vertex sits on it to tolerance, that plane `(n, d)` is returned.
pub fn are_vertices_coplanar(pts: &[DVec3]) -> Result<Option<(DVec3, f64)>, RelaxationError> {
    if pts.len() < 3 {
        return Err(RelaxationError::TooFewVertices {
            required: 3,
            actual: pts.len(),
        });
    }
    let (n, d) = triangle_outward_normal(pts[0], pts[1], pts[2])?;
    for p in &pts[3..] {
        if (n.dot(*p) - d).abs() > COPLANAR_TOL {
            return Ok(None);
        }
    }
    Ok(Some((n, d)))
}

/// Finds the tightest half space `n·x >= d` containing the intersection
/// region between the box interior and the sphere surface.
///
/// For any fixed normal, the minimum of `n·v` over the curved region is
/// attained at one of the region's vertices: along each arc of the region
/// the inner product is a sinusoid in the free angle, minimized at the arc
/// endpoints. The infinite containment problem therefore reduces to the
/// finite SOCP
///
/// ```text
/// max d   s.t.   n·ptsᵢ >= d  ∀i,   ‖n‖ <= 1
/// ```
///
/// which is skipped entirely when the vertices are coplanar. The resulting
/// normal must be strictly positive with `0 < d < 1`; anything else means a
/// solver or geometry bug and is surfaced as
/// [`RelaxationError::HalfSpaceInvariant`].
pub fn half_space_relaxation(pts: &[DVec3]) -> Result<(DVec3, f64), RelaxationError> {
    if let Some(plane) = are_vertices_coplanar(pts)? {
        return Ok(plane);
    }

    let mut prog = Program::new();
    let n_var = prog.new_continuous_vec(3, f64::NEG_INFINITY, f64::INFINITY);
    let d_var = prog.new_continuous(f64::NEG_INFINITY, f64::INFINITY);
    prog.minimize(-LinearExpr::var(d_var));
    for pt in pts {
        let mut expr = LinearExpr::var(d_var) * -1.0;
        for axis in 0..3 {
            expr.add_term(n_var[axis], pt[axis]);
        }
        prog.add_linear(expr, 0.0, f64::INFINITY);
    }
    prog.add_second_order_cone(vec![
        LinearExpr::constant(1.0),
        LinearExpr::var(n_var[0]),
        LinearExpr::var(n_var[1]),
        LinearExpr::var(n_var[2]),
    ]);

    log::debug!(
        "solving half-space relaxation SOCP over {} vertices",
        pts.len()
    );
    let sol = solve(&prog)?;
    let n = DVec3::new(
        sol[n_var[0].index()],
        sol[n_var[1].index()],
        sol[n_var[2].index()],
    );
    let d = sol[d_var.index()];

    if n.min_element() <= 0.0 || d <= 0.0 || d >= 1.0 {
        return Err(RelaxationError::HalfSpaceInvariant {
            n: n.to_array(),
            d,
        });
    }
    Ok((n, d))
}

/// Enumerates the inward facets of the convex hull of the intersection
/// region, as rows of `A·x <= b`.
///
/// Every 3-subset of the vertices defines a candidate plane; the plane is
/// kept when all remaining vertices satisfy it, which by the vertex-minimum
/// argument in [`half_space_relaxation`] means the whole curved region
/// does. Cubic in the vertex count, which is bounded by 12.
pub fn inner_facets(pts: &[DVec3]) -> Result<(Vec<DVec3>, Vec<f64>), RelaxationError> {
    debug_assert!(pts.iter().all(|p| p.min_element() >= 0.0));
    let mut a = Vec::new();
    let mut b = Vec::new();
    for i in 0..pts.len() {
        for j in (i + 1)..pts.len() {
            for k in (j + 1)..pts.len() {
                let (c, d) = triangle_outward_normal(pts[i], pts[j], pts[k])?;
                let valid = pts
                    .iter()
                    .enumerate()
                    .filter(|&(l, _)| l != i && l != j && l != k)
                    .all(|(_, p)| c.dot(*p) >= d - COPLANAR_TOL);
                if valid {
                    a.push(-c);
                    b.push(-d);
                }
            }
        }
    }
    Ok((a, b))
}
