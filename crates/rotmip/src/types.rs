//! Common types shared across the rotation relaxations.

use std::ops::BitOr;

use rotmip_program::{SolveError, VarId};
use thiserror::Error;

/// A 3x3 grid of continuous decision variables standing for a rotation
/// matrix R.
///
/// The variables are not orthogonal by construction; each relaxation adds
/// its own convex approximation of the SO(3) membership constraint.
#[derive(Debug, Clone, Copy)]
pub struct RotationMatrixVars {
    entries: [[VarId; 3]; 3],
}

impl RotationMatrixVars {
    /// Wraps an existing 3x3 variable grid, `entries[i][j]` = R(i, j).
    pub fn from_entries(entries: [[VarId; 3]; 3]) -> Self {
        Self { entries }
    }

    /// The variable for entry R(i, j).
    pub fn entry(&self, i: usize, j: usize) -> VarId {
        self.entries[i][j]
    }

    /// Column `j` of R.
    pub fn col(&self, j: usize) -> [VarId; 3] {
        [self.entries[0][j], self.entries[1][j], self.entries[2][j]]
    }

    /// Row `i` of R.
    pub fn row(&self, i: usize) -> [VarId; 3] {
        self.entries[i]
    }
}

/// Bitmask of half-range limits on the roll, pitch and yaw angles.
///
/// Each flag asserts that one Euler angle stays inside a half range where
/// the sign of its sine or cosine is known, which in turn fixes the sign of
/// specific entries of R.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpyLimits(u32);

impl RpyLimits {
    /// No angle limits.
    pub const NO_LIMITS: Self = Self(0);
    /// roll ∈ [-π/2, π/2], so cos(roll) >= 0.
    pub const ROLL_NEG_PI_2_TO_PI_2: Self = Self(1 << 1);
    /// roll ∈ [0, π], so sin(roll) >= 0.
    pub const ROLL_0_TO_PI: Self = Self(1 << 2);
    /// pitch ∈ [-π/2, π/2], so cos(pitch) >= 0.
    pub const PITCH_NEG_PI_2_TO_PI_2: Self = Self(1 << 3);
    /// pitch ∈ [0, π], so sin(pitch) >= 0.
    pub const PITCH_0_TO_PI: Self = Self(1 << 4);
    /// yaw ∈ [-π/2, π/2], so cos(yaw) >= 0.
    pub const YAW_NEG_PI_2_TO_PI_2: Self = Self(1 << 5);
    /// yaw ∈ [0, π], so sin(yaw) >= 0.
    pub const YAW_0_TO_PI: Self = Self(1 << 6);

    /// Whether every flag in `other` is set in `self`.
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for RpyLimits {
    type Output = RpyLimits;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl Default for RpyLimits {
    fn default() -> Self {
        Self::NO_LIMITS
    }
}

/// Errors raised while constructing a relaxation.
#[derive(Debug, Error)]
pub enum RelaxationError {
    /// Three vertices were too close to colinear to define a plane.
    #[error("triangle vertices are almost colinear")]
    DegenerateTriangle,
    /// An intersection region had fewer vertices than required.
    #[error("expected at least {required} intersection vertices, got {actual}")]
    TooFewVertices {
        /// Minimum vertex count for the operation.
        required: usize,
        /// Vertices actually available.
        actual: usize,
    },
    /// Box bounds violate the positive-orthant sphere-crossing precondition.
    #[error("box does not straddle the unit sphere inside the positive orthant")]
    InvalidBox,
    /// The half-space relaxation produced a normal or offset outside the
    /// range the geometry guarantees.
    #[error("half-space relaxation returned n = {n:?}, d = {d}, outside the valid range")]
    HalfSpaceInvariant {
        /// The computed normal.
        n: [f64; 3],
        /// The computed offset.
        d: f64,
    },
    /// Breakpoint and weight vectors have different lengths.
    #[error("phi has {phi} entries but lambda has {lambda}")]
    LengthMismatch {
        /// Breakpoint count.
        phi: usize,
        /// Weight count.
        lambda: usize,
    },
    /// The discretization needs at least one interval per half axis.
    #[error("num_intervals_per_half_axis must be at least 1")]
    InvalidResolution,
    /// The internal half-space SOCP failed.
    #[error(transparent)]
    Solve(#[from] SolveError),
}
