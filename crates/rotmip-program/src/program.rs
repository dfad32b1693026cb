//! The constraint-collecting optimization problem object.
//!
//! A [`Program`] accumulates decision variables and constraint descriptors.
//! Constraints are plain data (see [`Constraint`]) appended in emission
//! order and never mutated afterwards, so callers can lower them to any
//! solver backend or assert on them directly in tests.

use thiserror::Error;

use crate::expr::{LinearExpr, VarId};

/// Kind of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    /// A real-valued variable.
    Continuous,
    /// A 0/1 variable.
    Binary,
}

/// A constraint descriptor stored by a [`Program`].
#[derive(Debug, Clone)]
pub enum Constraint {
    /// `lb <= expr <= ub`.
    Linear {
        /// The affine row.
        expr: LinearExpr,
        /// Lower bound, `f64::NEG_INFINITY` when one-sided.
        lb: f64,
        /// Upper bound, `f64::INFINITY` when one-sided.
        ub: f64,
    },
    /// `‖z[1..]‖₂ <= z[0]`.
    SecondOrderCone {
        /// Affine entries of the cone vector.
        z: Vec<LinearExpr>,
    },
    /// `‖z[2..]‖₂² <= 2·z[0]·z[1]`, with `z[0], z[1] >= 0`.
    RotatedSecondOrderCone {
        /// Affine entries of the cone vector.
        z: Vec<LinearExpr>,
    },
    /// `F₀ + Σₖ F₍ₖ₊₁₎·x(vars[k])` is positive semidefinite.
    LinearMatrixInequality {
        /// Basis matrices, one more than `vars`.
        f: Vec<[[f64; 4]; 4]>,
        /// The variables multiplying `f[1..]`.
        vars: Vec<VarId>,
    },
}

/// A witness that an assignment does not satisfy a [`Program`].
#[derive(Debug, Error)]
pub enum Violation {
    /// A variable is outside its bounding box.
    #[error("variable {var} = {value} outside [{lb}, {ub}]")]
    Bounds {
        /// Variable index.
        var: usize,
        /// Assigned value.
        value: f64,
        /// Lower bound.
        lb: f64,
        /// Upper bound.
        ub: f64,
    },
    /// A binary variable is not close to 0 or 1.
    #[error("variable {var} = {value} is not binary")]
    NotBinary {
        /// Variable index.
        var: usize,
        /// Assigned value.
        value: f64,
    },
    /// A constraint descriptor is violated.
    #[error("constraint {index} violated by {amount:.3e}")]
    Constraint {
        /// Index of the constraint in emission order.
        index: usize,
        /// Size of the violation.
        amount: f64,
    },
    /// The assignment vector has the wrong length.
    #[error("assignment has {actual} entries, program has {expected} variables")]
    WrongLength {
        /// Entries provided.
        actual: usize,
        /// Variables in the program.
        expected: usize,
    },
}

/// Accumulates decision variables and constraint descriptors.
#[derive(Debug, Default)]
pub struct Program {
    kinds: Vec<VarKind>,
    lower: Vec<f64>,
    upper: Vec<f64>,
    constraints: Vec<Constraint>,
    objective: Option<LinearExpr>,
}

impl Program {
    /// An empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decision variables created so far.
    pub fn num_vars(&self) -> usize {
        self.kinds.len()
    }

    /// The constraint descriptors in emission order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The linear objective to minimize, if one was set.
    pub fn objective(&self) -> Option<&LinearExpr> {
        self.objective.as_ref()
    }

    /// Kind of a variable.
    pub fn kind(&self, v: VarId) -> VarKind {
        self.kinds[v.0]
    }

    /// Bounding box of a variable.
    pub fn bounds(&self, v: VarId) -> (f64, f64) {
        (self.lower[v.0], self.upper[v.0])
    }

    /// Creates a continuous variable with the given bounds.
    pub fn new_continuous(&mut self, lb: f64, ub: f64) -> VarId {
        self.kinds.push(VarKind::Continuous);
        self.lower.push(lb);
        self.upper.push(ub);
        VarId(self.kinds.len() - 1)
    }

    /// Creates `n` continuous variables sharing the same bounds.
    pub fn new_continuous_vec(&mut self, n: usize, lb: f64, ub: f64) -> Vec<VarId> {
        (0..n).map(|_| self.new_continuous(lb, ub)).collect()
    }

    /// Creates a 0/1 variable.
    pub fn new_binary(&mut self) -> VarId {
        self.kinds.push(VarKind::Binary);
        self.lower.push(0.0);
        self.upper.push(1.0);
        VarId(self.kinds.len() - 1)
    }

    /// Creates `n` 0/1 variables.
    pub fn new_binary_vec(&mut self, n: usize) -> Vec<VarId> {
        (0..n).map(|_| self.new_binary()).collect()
    }

    /// Tightens the bounding box of a variable.
    pub fn bound(&mut self, v: VarId, lb: f64, ub: f64) {
        self.lower[v.0] = self.lower[v.0].max(lb);
        self.upper[v.0] = self.upper[v.0].min(ub);
    }

    /// Adds `lb <= expr <= ub`.
    pub fn add_linear(&mut self, expr: LinearExpr, lb: f64, ub: f64) {
        self.constraints.push(Constraint::Linear { expr, lb, ub });
    }

    /// Adds `expr == rhs`.
    pub fn add_equality(&mut self, expr: LinearExpr, rhs: f64) {
        self.add_linear(expr, rhs, rhs);
    }

    /// Adds `‖z[1..]‖ <= z[0]`.
    ///
    /// # Panics
    ///
    /// Panics if `z` has fewer than two entries.
    pub fn add_second_order_cone(&mut self, z: Vec<LinearExpr>) {
        assert!(z.len() >= 2, "second-order cone needs at least two entries");
        self.constraints.push(Constraint::SecondOrderCone { z });
    }

    /// Adds `‖z[2..]‖² <= 2·z[0]·z[1]`.
    ///
    /// # Panics
    ///
    /// Panics if `z` has fewer than three entries.
    pub fn add_rotated_second_order_cone(&mut self, z: Vec<LinearExpr>) {
        assert!(
            z.len() >= 3,
            "rotated second-order cone needs at least three entries"
        );
        self.constraints.push(Constraint::RotatedSecondOrderCone { z });
    }

    /// Adds the LMI `f[0] + Σₖ f[k+1]·x(vars[k]) ⪰ 0`.
    ///
    /// # Panics
    ///
    /// Panics if `f.len() != vars.len() + 1`.
    pub fn add_linear_matrix_inequality(&mut self, f: Vec<[[f64; 4]; 4]>, vars: Vec<VarId>) {
        assert_eq!(f.len(), vars.len() + 1, "one basis matrix per variable plus F0");
        self.constraints
            .push(Constraint::LinearMatrixInequality { f, vars });
    }

    /// Sets the linear objective to minimize.
    pub fn minimize(&mut self, expr: LinearExpr) {
        self.objective = Some(expr);
    }

    /// Checks whether `x` satisfies every bound and constraint to tolerance
    /// `tol`, returning the first violation found.
    pub fn check_point(&self, x: &[f64], tol: f64) -> Result<(), Violation> {
        if x.len() != self.num_vars() {
            return Err(Violation::WrongLength {
                actual: x.len(),
                expected: self.num_vars(),
            });
        }
        for (i, &v) in x.iter().enumerate() {
            if v < self.lower[i] - tol || v > self.upper[i] + tol {
                return Err(Violation::Bounds {
                    var: i,
                    value: v,
                    lb: self.lower[i],
                    ub: self.upper[i],
                });
            }
            if self.kinds[i] == VarKind::Binary && v.abs() > tol && (v - 1.0).abs() > tol {
                return Err(Violation::NotBinary { var: i, value: v });
            }
        }
        for (index, c) in self.constraints.iter().enumerate() {
            let amount = match c {
                Constraint::Linear { expr, lb, ub } => {
                    let v = expr.eval(x);
                    (lb - v).max(v - ub)
                }
                Constraint::SecondOrderCone { z } => {
                    let z0 = z[0].eval(x);
                    let norm = z[1..]
                        .iter()
                        .map(|e| e.eval(x).powi(2))
                        .sum::<f64>()
                        .sqrt();
                    norm - z0
                }
                Constraint::RotatedSecondOrderCone { z } => {
                    let z0 = z[0].eval(x);
                    let z1 = z[1].eval(x);
                    let sq = z[2..].iter().map(|e| e.eval(x).powi(2)).sum::<f64>();
                    (-z0).max(-z1).max(sq - 2.0 * z0 * z1)
                }
                Constraint::LinearMatrixInequality { f, vars } => {
                    let mut m = f[0];
                    for (k, v) in vars.iter().enumerate() {
                        let xv = x[v.index()];
                        for r in 0..4 {
                            for s in 0..4 {
                                m[r][s] += f[k + 1][r][s] * xv;
                            }
                        }
                    }
                    -min_principal_minor(&m)
                }
            };
            if amount > tol {
                return Err(Violation::Constraint { index, amount });
            }
        }
        Ok(())
    }
}

/// Smallest principal minor of a symmetric 4x4 matrix. The matrix is
/// positive semidefinite iff every principal minor is non-negative, which is
/// an exact test at this fixed size.
fn min_principal_minor(m: &[[f64; 4]; 4]) -> f64 {
    let mut min = f64::INFINITY;
    for subset in 1u32..16 {
        let idx: Vec<usize> = (0..4).filter(|i| subset & (1 << i) != 0).collect();
        let k = idx.len();
        let mut sub = [[0.0; 4]; 4];
        for r in 0..k {
            for c in 0..k {
                sub[r][c] = m[idx[r]][idx[c]];
            }
        }
        min = min.min(det(&sub, k));
    }
    min
}

/// Determinant of the leading `k x k` block by cofactor expansion.
fn det(m: &[[f64; 4]; 4], k: usize) -> f64 {
    match k {
        1 => m[0][0],
        2 => m[0][0] * m[1][1] - m[0][1] * m[1][0],
        _ => {
            let mut acc = 0.0;
            let mut sign = 1.0;
            for col in 0..k {
                let mut minor = [[0.0; 4]; 4];
                for r in 1..k {
                    let mut cc = 0;
                    for c in 0..k {
                        if c != col {
                            minor[r - 1][cc] = m[r][c];
                            cc += 1;
                        }
                    }
                }
                acc += sign * m[0][col] * det(&minor, k - 1);
                sign = -sign;
            }
            acc
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bounds_and_linear() {
        let mut prog = Program::new();
        let x = prog.new_continuous(-1.0, 1.0);
        let y = prog.new_continuous(-1.0, 1.0);
        let expr = LinearExpr::var(x) + LinearExpr::var(y);
        prog.add_linear(expr, -0.5, 0.5);

        assert!(prog.check_point(&[0.25, 0.25], 1e-9).is_ok());
        assert!(matches!(
            prog.check_point(&[0.5, 0.5], 1e-9),
            Err(Violation::Constraint { .. })
        ));
        assert!(matches!(
            prog.check_point(&[2.0, -1.5], 1e-9),
            Err(Violation::Bounds { .. })
        ));
    }

    #[test]
    fn test_binary_check() {
        let mut prog = Program::new();
        prog.new_binary();
        assert!(prog.check_point(&[1.0], 1e-9).is_ok());
        assert!(matches!(
            prog.check_point(&[0.4], 1e-9),
            Err(Violation::NotBinary { .. })
        ));
    }

    #[test]
    fn test_second_order_cones() {
        let mut prog = Program::new();
        let x = prog.new_continuous(f64::NEG_INFINITY, f64::INFINITY);
        let y = prog.new_continuous(f64::NEG_INFINITY, f64::INFINITY);
        prog.add_second_order_cone(vec![
            LinearExpr::constant(1.0),
            LinearExpr::var(x),
            LinearExpr::var(y),
        ]);
        assert!(prog.check_point(&[0.6, 0.8], 1e-9).is_ok());
        assert!(prog.check_point(&[0.7, 0.8], 1e-9).is_err());

        prog.add_rotated_second_order_cone(vec![
            LinearExpr::constant(1.0),
            LinearExpr::constant(1.0),
            LinearExpr::var(x),
            LinearExpr::var(y),
        ]);
        // x^2 + y^2 <= 2
        assert!(prog.check_point(&[0.6, 0.8], 1e-9).is_ok());
    }

    #[test]
    fn test_lmi_psd_check() {
        let mut prog = Program::new();
        let x = prog.new_continuous(f64::NEG_INFINITY, f64::INFINITY);
        let mut f0 = [[0.0; 4]; 4];
        let mut f1 = [[0.0; 4]; 4];
        for i in 0..4 {
            f0[i][i] = 1.0;
            f1[i][i] = -1.0;
        }
        // I - x*I is PSD iff x <= 1.
        prog.add_linear_matrix_inequality(vec![f0, f1], vec![x]);
        assert!(prog.check_point(&[1.0], 1e-9).is_ok());
        assert!(prog.check_point(&[0.5], 1e-9).is_ok());
        assert!(prog.check_point(&[1.5], 1e-9).is_err());
    }

    #[test]
    fn test_det() {
        let m = [
            [2.0, 0.0, 0.0, 0.0],
            [0.0, 3.0, 0.0, 0.0],
            [0.0, 0.0, 4.0, 0.0],
            [0.0, 0.0, 0.0, 5.0],
        ];
        assert_relative_eq!(det(&m, 4), 120.0);
        assert_relative_eq!(min_principal_minor(&m), 2.0);
    }
}
