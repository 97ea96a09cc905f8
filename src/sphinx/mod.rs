//! S/PHI/nX adapter
//!
//! The solver has no machine-readable output; everything here scrapes its
//! text files with fixed anchors and regular expressions. Any anchor that is
//! missing is an extraction error, there is no partial recovery.

mod energy;
mod log;
mod runner;
mod spin;
mod structure;


pub use energy::{parse_final_energy, parse_smearing_error, read_final_energy};
pub use log::{
    parse_convergence, parse_final_spin_and_nu, read_convergence, read_final_spin_and_nu,
    ConstraintOutcome, ConvergenceStatus, CONVERGED_MARKER, STEP_LIMIT_MARKER,
};
pub use runner::{Solver, SphinxBinary, VERSION_SIGNATURE};
pub use spin::{
    check_constraint, expand_collinear, read_spins, write_spin_inputs, write_spins,
    CONSTRAINT_TOLERANCE,
};
pub use structure::{parse_forces, parse_structure, read_forces, Species, Structure};

/// Solver input template, copied into the working directory
pub const INPUT_FILE: &str = "input.sx";
pub const STRUCTURE_FILE: &str = "structure.sx";
pub const SPIN_CONSTRAINT_FILE: &str = "spin-constraint.sx";
pub const SPIN_INITIAL_FILE: &str = "spin-initial.sx";
/// Captured stdout of the solver
pub const LOG_FILE: &str = "output.sx";
pub const ENERGY_FILE: &str = "energy.dat";
pub const FORCES_FILE: &str = "forces.sx";

/// Leftovers of earlier runs that must not leak into a new batch
pub const STALE_FILES: [&str; 4] = ["relaxedStr.sx", "relaxHist.sx", FORCES_FILE, LOG_FILE];
pub const STALE_EXTENSIONS: [&str; 2] = ["dat", "sxb"];
