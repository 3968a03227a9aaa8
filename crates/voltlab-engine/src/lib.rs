//! Simulation engine for Voltlab.
//!
//! This crate provides:
//! - dense LU solving with partial pivoting and cached factorization
//! - the Newton-style nonlinear iteration controller
//! - the interactive time-step driver with adaptive step halving

pub mod error;
pub mod linear;
pub mod newton;
pub mod stepper;

pub use error::{Error, Result};
pub use linear::{LuCache, solve_dense};
pub use newton::{Tolerances, converge};
pub use stepper::{ElementId, SimConfig, Simulation, StepReport};
