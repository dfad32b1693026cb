#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

mod expr;
mod gray;
mod program;
mod solve;
mod sos2;

pub use expr::{LinearExpr, VarId};
pub use gray::{ceil_log2, reflected_gray_codes};
pub use program::{Constraint, Program, VarKind, Violation};
pub use solve::{solve, SolveError};
pub use sos2::add_logarithmic_sos2;
