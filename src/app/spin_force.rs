use crate::sphinx::{
    check_constraint, expand_collinear, read_final_energy, read_final_spin_and_nu, read_spins,
    write_spin_inputs, Solver, ENERGY_FILE, LOG_FILE, SPIN_CONSTRAINT_FILE,
};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use std::path::Path;
use tracing::{info, info_span};

/// Spin force on one atom, from the constraint multiplier and from a central
/// difference of total energies
#[derive(Debug, Clone, PartialEq)]
pub struct SpinForceReport {
    pub atom: usize,
    pub interval: f64,
    pub hellmann_feynman: f64,
    pub finite_difference: f64,
}

/// Compare the multiplier of `atom` with `(E(s + d/2) - E(s - d/2)) / d`,
/// starting from the spins already in `spin-constraint.sx`. The baseline
/// spins are written back afterwards.
pub fn check_spin_force<S: Solver + ?Sized>(
    solver: &S,
    working_dir: &Path,
    atom: usize,
    interval: f64,
) -> Result<SpinForceReport> {
    let span = info_span!("spin_force", atom);
    let _enter = span.enter();

    if !interval.is_finite() || interval <= 0.0 {
        bail!("Spin interval must be positive, got {}", interval);
    }

    let baseline = read_spins(working_dir.join(SPIN_CONSTRAINT_FILE))
        .wrap_err("Unable to read the baseline spin constraints")?;
    if atom >= baseline.len() {
        bail!(
            "Atom {} out of range, the spin file lists {} atoms",
            atom,
            baseline.len()
        );
    }

    info!("Running baseline calculation");
    let (_, multipliers) = run_constrained(solver, working_dir, &baseline)?;
    let hellmann_feynman = multipliers[atom];

    let mut plus = baseline.clone();
    plus[atom] += interval / 2.0;
    info!("Running calculation with spin {} on atom {}", plus[atom], atom);
    let (energy_plus, _) = run_constrained(solver, working_dir, &plus)?;

    let mut minus = baseline.clone();
    minus[atom] -= interval / 2.0;
    info!("Running calculation with spin {} on atom {}", minus[atom], atom);
    let (energy_minus, _) = run_constrained(solver, working_dir, &minus)?;

    write_spin_inputs(working_dir, &baseline)?;

    Ok(SpinForceReport {
        atom,
        interval,
        hellmann_feynman,
        finite_difference: (energy_plus - energy_minus) / interval,
    })
}

/// One solver run that must meet its constraint. Returns the final energy and
/// the constraint multipliers.
fn run_constrained<S: Solver + ?Sized>(
    solver: &S,
    working_dir: &Path,
    spins: &[f64],
) -> Result<(f64, Vec<f64>)> {
    write_spin_inputs(working_dir, spins)?;
    solver.run(working_dir)?;

    let outcome = read_final_spin_and_nu(working_dir.join(LOG_FILE), spins.len())?;
    if !check_constraint(&expand_collinear(spins), &expand_collinear(&outcome.spins)) {
        return Err(eyre!(
            "Incomplete constraint: requested {:?}, reached {:?}",
            spins,
            outcome.spins
        ));
    }

    let energy = read_final_energy(working_dir.join(ENERGY_FILE))?;
    Ok((energy, outcome.multipliers))
}
