#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod decode;
mod geometry;
mod mccormick;
mod orthant;
mod relax;
mod types;

pub use crate::decode::lift_rotation_matrix;
pub use crate::geometry::{
    are_vertices_coplanar, box_sphere_intersection_vertices, half_space_relaxation, inner_facets,
    triangle_outward_normal,
};
pub use crate::mccormick::{add_rotation_matrix_mccormick_envelope, McCormickEnvelope};
pub use crate::orthant::{
    box_selector_exprs, envelope_breakpoint, flip_vector, full_axis_interval_index,
    interval_selector_expr, interval_selector_value, orthant_sign_mask,
};
pub use crate::relax::{
    add_orthonormal_socp_relaxation, add_rpy_limit_bounds, add_rpy_limit_bounds_to_binary,
    add_spectrahedral_relaxation, new_rotation_matrix_vars,
};
pub use crate::types::{RelaxationError, RotationMatrixVars, RpyLimits};
