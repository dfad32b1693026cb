//! Sparse affine expressions over program decision variables.

use std::ops::{Add, Mul, Neg, Sub};

/// Identifier of a decision variable inside a [`crate::Program`].
///
/// The identifier doubles as the index of the variable in any full
/// assignment vector handed to [`crate::Program::check_point`] or returned
/// by [`crate::solve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of this variable in the program's assignment vector.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A sparse affine expression `Σᵢ cᵢ·xᵢ + k` over decision variables.
///
/// Constraint rows are stated as explicit coefficient lists rather than a
/// symbolic expression tree, so emitted constraints can be inspected and
/// evaluated without any algebra engine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    /// The zero expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// A constant expression with no variable terms.
    pub fn constant(k: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: k,
        }
    }

    /// The expression `1·x` for a single variable.
    pub fn var(v: VarId) -> Self {
        Self {
            terms: vec![(v, 1.0)],
            constant: 0.0,
        }
    }

    /// Adds `coeff·v` to the expression, merging with an existing term for
    /// the same variable.
    pub fn add_term(&mut self, v: VarId, coeff: f64) {
        if let Some(t) = self.terms.iter_mut().find(|t| t.0 == v) {
            t.1 += coeff;
        } else {
            self.terms.push((v, coeff));
        }
    }

    /// Adds a constant offset to the expression.
    pub fn add_constant(&mut self, k: f64) {
        self.constant += k;
    }

    /// The `(variable, coefficient)` terms of the expression.
    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    /// The constant offset of the expression.
    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Evaluates the expression at a full assignment vector.
    pub fn eval(&self, x: &[f64]) -> f64 {
        let mut acc = self.constant;
        for &(v, c) in &self.terms {
            acc += c * x[v.0];
        }
        acc
    }
}

impl From<VarId> for LinearExpr {
    fn from(v: VarId) -> Self {
        LinearExpr::var(v)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: LinearExpr) -> LinearExpr {
        for (v, c) in rhs.terms {
            self.add_term(v, c);
        }
        self.constant += rhs.constant;
        self
    }
}

impl Add<f64> for LinearExpr {
    type Output = LinearExpr;

    fn add(mut self, rhs: f64) -> LinearExpr {
        self.constant += rhs;
        self
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: LinearExpr) -> LinearExpr {
        for (v, c) in rhs.terms {
            self.add_term(v, -c);
        }
        self.constant -= rhs.constant;
        self
    }
}

impl Sub<f64> for LinearExpr {
    type Output = LinearExpr;

    fn sub(mut self, rhs: f64) -> LinearExpr {
        self.constant -= rhs;
        self
    }
}

impl Mul<f64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(mut self, rhs: f64) -> LinearExpr {
        for t in &mut self.terms {
            t.1 *= rhs;
        }
        self.constant *= rhs;
        self
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        self * -1.0
    }
}
