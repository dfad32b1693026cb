//! Lowers a continuous program to Clarabel and returns the primal solution.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettings, DefaultSolver, IPSolver, SolverStatus, SupportedConeT,
};
use thiserror::Error;

use crate::expr::LinearExpr;
use crate::program::{Constraint, Program, VarKind};

/// Failure of the conic bridge.
#[derive(Debug, Error)]
pub enum SolveError {
    /// The program contains a feature the bridge cannot lower.
    #[error("program cannot be lowered to a continuous conic form: {0}")]
    Unsupported(&'static str),
    /// The solver reported the program infeasible.
    #[error("conic solver reported the program infeasible")]
    Infeasible,
    /// The solver stopped without an optimal solution.
    #[error("conic solver failed with status {0}")]
    SolverFailure(String),
}

/// Solves a continuous program with linear rows and second-order cones,
/// minimizing its linear objective, and returns the optimal assignment.
///
/// Binary variables, rotated cones and LMI rows are not lowered here; they
/// only appear in the mixed-integer relaxations, which are solved by an
/// external branch-and-bound wrapper.
pub fn solve(prog: &Program) -> Result<Vec<f64>, SolveError> {
    let n = prog.num_vars();
    let mut q = vec![0.0; n];
    if let Some(obj) = prog.objective() {
        for &(v, c) in obj.terms() {
            q[v.index()] += c;
        }
    }

    // Rows are assembled in cone order: zero cone (equalities), nonnegative
    // cone (inequalities and variable bounds), then one second-order cone
    // per conic constraint.
    let mut triplets: Vec<(usize, usize, f64)> = Vec::new();
    let mut b: Vec<f64> = Vec::new();
    let mut row = 0usize;

    let push_row = |triplets: &mut Vec<(usize, usize, f64)>,
                    b: &mut Vec<f64>,
                    row: &mut usize,
                    expr: &LinearExpr,
                    scale: f64,
                    rhs: f64| {
        for &(v, c) in expr.terms() {
            triplets.push((*row, v.index(), scale * c));
        }
        b.push(rhs - scale * expr.constant_term());
        *row += 1;
    };

    let mut num_eq = 0usize;
    for c in prog.constraints() {
        match c {
            Constraint::Linear { expr, lb, ub } if lb == ub => {
                push_row(&mut triplets, &mut b, &mut row, expr, 1.0, *lb);
                num_eq += 1;
            }
            Constraint::Linear { .. } | Constraint::SecondOrderCone { .. } => {}
            Constraint::RotatedSecondOrderCone { .. } => {
                return Err(SolveError::Unsupported("rotated second-order cone"));
            }
            Constraint::LinearMatrixInequality { .. } => {
                return Err(SolveError::Unsupported("linear matrix inequality"));
            }
        }
    }

    let mut num_ineq = 0usize;
    for c in prog.constraints() {
        if let Constraint::Linear { expr, lb, ub } = c {
            if lb == ub {
                continue;
            }
            if ub.is_finite() {
                push_row(&mut triplets, &mut b, &mut row, expr, 1.0, *ub);
                num_ineq += 1;
            }
            if lb.is_finite() {
                push_row(&mut triplets, &mut b, &mut row, expr, -1.0, -lb);
                num_ineq += 1;
            }
        }
    }
    for i in 0..n {
        if prog.kind(crate::VarId(i)) == VarKind::Binary {
            return Err(SolveError::Unsupported("binary variable"));
        }
        let (lb, ub) = prog.bounds(crate::VarId(i));
        if ub.is_finite() {
            triplets.push((row, i, 1.0));
            b.push(ub);
            row += 1;
            num_ineq += 1;
        }
        if lb.is_finite() {
            triplets.push((row, i, -1.0));
            b.push(-lb);
            row += 1;
            num_ineq += 1;
        }
    }

    let mut cones: Vec<SupportedConeT<f64>> = Vec::new();
    if num_eq > 0 {
        cones.push(SupportedConeT::ZeroConeT(num_eq));
    }
    if num_ineq > 0 {
        cones.push(SupportedConeT::NonnegativeConeT(num_ineq));
    }
    for c in prog.constraints() {
        if let Constraint::SecondOrderCone { z } = c {
            for e in z {
                push_row(&mut triplets, &mut b, &mut row, e, -1.0, 0.0);
            }
            cones.push(SupportedConeT::SecondOrderConeT(z.len()));
        }
    }

    let a = csc_from_triplets(row, n, &mut triplets);
    let p = CscMatrix::zeros((n, n));
    let settings = DefaultSettings {
        verbose: false,
        ..DefaultSettings::default()
    };

    log::debug!(
        "lowering program with {} vars, {} rows, {} cones to clarabel",
        n,
        row,
        cones.len()
    );
    let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, settings);
    solver.solve();
    match solver.solution.status {
        SolverStatus::Solved | SolverStatus::AlmostSolved => Ok(solver.solution.x.clone()),
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            Err(SolveError::Infeasible)
        }
        status => Err(SolveError::SolverFailure(format!("{status:?}"))),
    }
}

/// Builds a compressed-sparse-column matrix from unordered triplets.
fn csc_from_triplets(
    nrows: usize,
    ncols: usize,
    triplets: &mut Vec<(usize, usize, f64)>,
) -> CscMatrix<f64> {
    triplets.sort_by_key(|&(r, c, _)| (c, r));
    let mut merged: Vec<(usize, usize, f64)> = Vec::with_capacity(triplets.len());
    for &(r, c, v) in triplets.iter() {
        match merged.last_mut() {
            Some(last) if last.0 == r && last.1 == c => last.2 += v,
            _ => merged.push((r, c, v)),
        }
    }
    let mut colptr = vec![0usize; ncols + 1];
    for &(_, c, _) in &merged {
        colptr[c + 1] += 1;
    }
    for c in 0..ncols {
        colptr[c + 1] += colptr[c];
    }
    let rowval = merged.iter().map(|t| t.0).collect();
    let nzval = merged.iter().map(|t| t.2).collect();
    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
