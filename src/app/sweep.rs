use crate::app::batch::TagFiles;
use crate::app::workspace::SolverWorkspace;
use crate::config::SpinConstraint;
use crate::dataset::{DpWriter, Frame};
use crate::sampling::SpinGrid;
use crate::sphinx::{
    check_constraint, expand_collinear, parse_final_energy, parse_smearing_error,
    read_convergence, read_final_spin_and_nu, read_forces, read_spins, write_spin_inputs,
    ConvergenceStatus, Solver, Structure, ENERGY_FILE, FORCES_FILE, LOG_FILE,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use periodic_table_on_an_enum::Element;
use rand::Rng;
use std::fs;
use std::path::Path;
use tracing::{debug, info, info_span, warn, Span};

/// What happens to the result of one solver run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    /// Constraint met although the SCF did not converge
    AcceptedUnconverged { steps_over: bool },
    Rejected { steps_over: bool },
}

impl Verdict {
    pub fn judge(status: &ConvergenceStatus, constraint_reached: bool) -> Self {
        if status.converged {
            Verdict::Accepted
        } else if constraint_reached {
            Verdict::AcceptedUnconverged {
                steps_over: status.steps_over,
            }
        } else {
            Verdict::Rejected {
                steps_over: status.steps_over,
            }
        }
    }

    pub fn is_accepted(&self) -> bool {
        !matches!(self, Verdict::Rejected { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub accepted: usize,
    pub rejected: usize,
}

/// Runs every spin configuration of one tag through the solver.
pub struct SweepTask<'a, S: Solver + ?Sized> {
    files: &'a TagFiles,
    constraint: SpinConstraint,
    workspace: &'a SolverWorkspace,
    input_template: &'a Path,
    solver: &'a S,
    span: Span,
}

impl<'a, S: Solver + ?Sized> SweepTask<'a, S> {
    pub fn new(
        files: &'a TagFiles,
        constraint: SpinConstraint,
        workspace: &'a SolverWorkspace,
        input_template: &'a Path,
        solver: &'a S,
    ) -> Self {
        Self {
            files,
            constraint,
            workspace,
            input_template,
            solver,
            span: info_span!("sweep", tag = files.tag),
        }
    }

    pub fn run<R: Rng + ?Sized>(&self, writer: &mut DpWriter, rng: &mut R) -> Result<SweepOutcome> {
        let _enter = self.span.enter();
        let tag = self.files.tag;
        info!("Task for Tag {} begins", tag);
        info!("Atomic structure read from {}", self.files.structure.display());
        info!("Spin read from {}", self.files.spin.display());

        self.workspace
            .stage_inputs(self.input_template, &self.files.structure)
            .wrap_err("Unable to stage solver inputs")?;
        let structure = Structure::from_file(&self.files.structure)?;
        log_species(&structure);

        let mut spins = read_spins(&self.files.spin)?;
        if spins.len() != structure.n_atoms() {
            return Err(eyre!(
                "{} lists {} spins but the structure has {} atoms",
                self.files.spin.display(),
                spins.len(),
                structure.n_atoms()
            ));
        }

        self.constraint.validate(structure.n_atoms())?;
        info!("Using collinear spin calculation and constraints for Tag {}", tag);
        let grid = SpinGrid::from_constraint(&self.constraint, rng)?;
        info!(
            "Indices of spin-varied atoms in this tag: {:?}, {} variant(s)",
            grid.indices(),
            grid.len()
        );

        let mut outcome = SweepOutcome::default();
        for variant in 0..grid.len() {
            info!("Calculation begins for Tag {} Variant {}", tag, variant);
            grid.apply(variant, &mut spins);
            let accepted = self
                .run_variant(variant, &spins, &structure, writer)
                .wrap_err_with(|| format!("Tag {} Variant {} failed", tag, variant))?;
            if accepted {
                outcome.accepted += 1;
            } else {
                outcome.rejected += 1;
            }
        }

        info!(
            "Tag {} done: {} frame(s) accepted, {} rejected",
            tag, outcome.accepted, outcome.rejected
        );
        Ok(outcome)
    }

    fn run_variant(
        &self,
        variant: usize,
        spins: &[f64],
        structure: &Structure,
        writer: &mut DpWriter,
    ) -> Result<bool> {
        let tag = self.files.tag;
        let dir = self.workspace.dir();
        write_spin_inputs(dir, spins)?;
        let requested = expand_collinear(spins);

        info!("All files prepared, running SPHInX ...");
        self.solver.run(dir)?;

        let log = self.workspace.path(LOG_FILE);
        let status = read_convergence(&log)?;
        let reached = read_final_spin_and_nu(&log, structure.n_atoms())?;
        let final_spins = expand_collinear(&reached.spins);
        let multipliers = expand_collinear(&reached.multipliers);
        let constraint_reached = check_constraint(&requested, &final_spins);

        let verdict = Verdict::judge(&status, constraint_reached);
        match verdict {
            Verdict::Accepted => {}
            Verdict::AcceptedUnconverged { steps_over } => {
                if steps_over {
                    warn!(
                        "Convergence not yet reached within {} steps in Tag {} Variant {}, spin constraints are met so the frame is kept",
                        status.steps, tag, variant
                    );
                } else {
                    warn!(
                        "Solver stopped after {} steps without converging in Tag {} Variant {}, spin constraints are met so the frame is kept",
                        status.steps, tag, variant
                    );
                }
            }
            Verdict::Rejected { steps_over } => {
                if steps_over {
                    warn!(
                        "Convergence not yet reached within {} steps in Tag {} Variant {}, this frame won't be written to DP raw files!",
                        status.steps, tag, variant
                    );
                } else {
                    warn!(
                        "Incomplete spin constraints within {} steps in Tag {} Variant {}, this frame won't be written to DP raw files!",
                        status.steps, tag, variant
                    );
                }
            }
        }
        if !verdict.is_accepted() {
            warn!("Current spin constraints is {:?}", spins);
            return Ok(false);
        }

        let forces = read_forces(self.workspace.path(FORCES_FILE))?;
        let energy_path = self.workspace.path(ENERGY_FILE);
        let energy_content = fs::read_to_string(&energy_path)?;
        let energy = parse_final_energy(&energy_content, &energy_path)?;
        match parse_smearing_error(&energy_content, &energy_path) {
            Ok(ev) => debug!("Smearing error of the final energy: {:.6} eV", ev),
            Err(e) => debug!("No smearing estimate: {}", e),
        }

        let frame = Frame {
            cell: structure.cell,
            coords: structure.positions(),
            atom_types: structure.atom_types(),
            type_count: structure.species.len(),
            spins: requested,
            energy,
            forces,
            multipliers,
        };
        writer.write_frame(&frame)?;

        info!(
            "Calculation successfully finished within {} steps for Tag {} Variant {}",
            status.steps, tag, variant
        );
        info!("Current spin constraints is {:?}", spins);
        Ok(true)
    }
}

fn log_species(structure: &Structure) {
    for (t, species) in structure.species.iter().enumerate() {
        match Element::from_symbol(&species.element) {
            Some(element) => info!(
                "Type {}: {} (Z = {}), {} atom(s)",
                t,
                species.element,
                element.get_atomic_number(),
                species.records.len()
            ),
            None => warn!(
                "Type {}: unknown element symbol '{}', {} atom(s)",
                t,
                species.element,
                species.records.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(converged: bool, steps_over: bool) -> ConvergenceStatus {
        ConvergenceStatus {
            converged,
            steps_over,
            steps: 12,
        }
    }

    #[test]
    fn test_converged_is_accepted() {
        assert_eq!(Verdict::judge(&status(true, false), true), Verdict::Accepted);
        assert_eq!(Verdict::judge(&status(true, false), false), Verdict::Accepted);
    }

    #[test]
    fn test_unconverged_with_constraint_is_kept() {
        let verdict = Verdict::judge(&status(false, true), true);
        assert_eq!(verdict, Verdict::AcceptedUnconverged { steps_over: true });
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_unconverged_without_constraint_is_rejected() {
        let verdict = Verdict::judge(&status(false, true), false);
        assert_eq!(verdict, Verdict::Rejected { steps_over: true });
        assert!(!verdict.is_accepted());

        let verdict = Verdict::judge(&status(false, false), false);
        assert_eq!(verdict, Verdict::Rejected { steps_over: false });
    }
}
