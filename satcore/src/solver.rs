//! Boolean satisfiability solver.
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use partial_ref::{IntoPartialRef, IntoPartialRefMut, PartialRef};

use log::info;

use satcore_dimacs::DimacsParser;

use crate::cnf::CnfFormula;
use crate::config::{SolverConfig, SolverConfigUpdate};
use crate::context::{config_changed, ensure_var_count, AssignmentP, Context, SolverConfigP, SolverStateP};
use crate::error::SolverError;
use crate::incremental::set_assumptions;
use crate::lbool::LBool;
use crate::lit::{Lit, Var};
use crate::load::load_clause;
use crate::schedule::schedule_step;
use crate::state::SatState;

/// A boolean satisfiability solver.
///
/// `Solver` owns a [`Context`] and drives it through [`schedule_step`](crate::schedule::schedule_step)
/// to perform restarts and clause database reductions alongside the core CDCL search. Unlike the
/// lower level functions in [`cdcl`](crate::cdcl), this is the crate's public entry point: it
/// doesn't expose `partial_ref` borrows to callers.
pub struct Solver {
    ctx: Box<Context>,
    interrupt: Arc<AtomicBool>,
}

impl Default for Solver {
    fn default() -> Solver {
        Solver {
            ctx: Box::default(),
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Solver {
    /// Create a new solver.
    pub fn new() -> Solver {
        Solver::default()
    }

    /// Add a single new variable and return it.
    pub fn new_var(&mut self) -> Var {
        let index = self.ctx.assignment.assignment().len();
        self.new_vars(index + 1);
        Var::from_index(index)
    }

    /// Ensure the solver knows about at least `count` variables.
    pub fn new_vars(&mut self, count: usize) {
        let mut ctx = self.ctx.into_partial_ref_mut();
        ensure_var_count(ctx.borrow(), count);
    }

    /// Add a clause to the current formula.
    ///
    /// Returns `false` once the empty clause has been derived, i.e. once the formula is known to
    /// be unsatisfiable independently of any assumptions. The solver keeps accepting (and
    /// ignoring) further clauses after that point rather than panicking.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        let max_var = lits.iter().map(|lit| lit.var().index() + 1).max().unwrap_or(0);
        self.new_vars(max_var);

        let mut ctx = self.ctx.into_partial_ref_mut();
        load_clause(ctx.borrow(), lits);
        ctx.part(SolverStateP).ok
    }

    /// Add every clause of a formula to the solver.
    pub fn add_formula(&mut self, formula: &CnfFormula) {
        self.new_vars(formula.var_count());
        let mut ctx = self.ctx.into_partial_ref_mut();
        for clause in formula.iter() {
            load_clause(ctx.borrow(), clause);
        }
    }

    /// Read and add a formula in DIMACS CNF format.
    ///
    /// Using this avoids creating a temporary [`CnfFormula`] for the whole input.
    pub fn add_dimacs_cnf(&mut self, input: impl io::Read) -> Result<(), SolverError> {
        use io::BufRead;

        let mut buffer = io::BufReader::new(input);
        let mut parser = DimacsParser::new();

        (|| -> Result<(), anyhow::Error> {
            loop {
                let data = buffer.fill_buf()?;
                if data.is_empty() {
                    break;
                }
                parser.parse_chunk(data)?;
                let len = data.len();
                buffer.consume(len);

                self.add_formula(&parser.take_formula());
            }
            parser.eof()?;
            self.add_formula(&parser.take_formula());
            parser.check_header()?;
            Ok(())
        })()
        .map_err(SolverError::Fatal)?;

        info!(
            "parsed formula with {} variables and {} clauses",
            parser.var_count(),
            parser.clause_count()
        );

        Ok(())
    }

    /// Update the solver's configuration.
    pub fn set_config(&mut self, update: &SolverConfigUpdate) -> Result<(), SolverError> {
        let mut ctx = self.ctx.into_partial_ref_mut();

        let mut config = ctx.part(SolverConfigP).clone();
        update.apply(&mut config)?;
        *ctx.part_mut(SolverConfigP) = config;

        config_changed(ctx.borrow(), update);

        Ok(())
    }

    /// The solver's current configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.ctx.solver_config
    }

    /// Set the logging verbosity level.
    pub fn set_verbosity(&mut self, verbosity: u8) {
        self.ctx.solver_state.verbosity = verbosity;
    }

    /// A handle that can be used to asynchronously interrupt a running [`solve`](Solver::solve)
    /// call from another thread, e.g. in response to a time limit or a user requested abort.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupt.clone()
    }

    /// Check the satisfiability of the current formula under the given assumptions.
    ///
    /// If `confl_budget` is `Some`, the search stops (returning [`LBool::Undef`]) once that many
    /// additional conflicts have been found without reaching a conclusive result. The search can
    /// also be stopped early by setting the [`interrupt_handle`](Solver::interrupt_handle)'s flag.
    pub fn solve(&mut self, assumptions: &[Lit], confl_budget: Option<u64>) -> LBool {
        let max_var = assumptions
            .iter()
            .map(|lit| lit.var().index() + 1)
            .max()
            .unwrap_or(0);
        self.new_vars(max_var);

        let mut ctx = self.ctx.into_partial_ref_mut();

        set_assumptions(ctx.borrow(), assumptions);

        let start_conflicts = ctx.part(SolverStateP).conflicts;

        self.interrupt.store(false, Ordering::Relaxed);

        while ctx.part(SolverStateP).sat_state == SatState::Unknown {
            if self.interrupt.load(Ordering::Relaxed) {
                break;
            }
            if let Some(budget) = confl_budget {
                if ctx.part(SolverStateP).conflicts - start_conflicts >= budget {
                    break;
                }
            }
            schedule_step(ctx.borrow());
        }

        match ctx.part(SolverStateP).sat_state {
            SatState::Unknown => LBool::Undef,
            SatState::Sat => LBool::True,
            SatState::Unsat | SatState::UnsatUnderAssumptions => LBool::False,
        }
    }

    /// The full assignment found by the most recent successful [`solve`](Solver::solve) call.
    ///
    /// Returns `None` unless the solver's state is currently satisfiable.
    pub fn model(&self) -> Option<Vec<LBool>> {
        let mut ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            Some(
                ctx.part(AssignmentP)
                    .assignment()
                    .iter()
                    .map(|&value| LBool::from_option(value))
                    .collect(),
            )
        } else {
            None
        }
    }

    /// The value assigned to a single variable, if the solver's state is currently satisfiable.
    pub fn value(&self, var: Var) -> LBool {
        let mut ctx = self.ctx.into_partial_ref();
        if ctx.part(SolverStateP).sat_state == SatState::Sat {
            LBool::from_option(ctx.part(AssignmentP).assignment()[var.index()])
        } else {
            LBool::Undef
        }
    }

    /// A subset of the assumptions passed to the most recent [`solve`](Solver::solve) call that is
    /// sufficient to make the formula unsatisfiable.
    ///
    /// Only meaningful right after a call to `solve` returned [`LBool::False`] due to the
    /// assumptions (as opposed to the formula itself being unconditionally unsatisfiable).
    pub fn failed_core(&self) -> &[Lit] {
        self.ctx.incremental.failed_core()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use satcore_dimacs::write_dimacs;

    use crate::test::{sat_formula, sgen_unsat_formula};

    proptest! {
        #[test]
        fn sgen_unsat(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(&[], None), LBool::False);
        }

        #[test]
        fn sat(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            solver.add_formula(&formula);

            prop_assert_eq!(solver.solve(&[], None), LBool::True);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| model[lit.var().index()].as_option() == Some(!lit.is_negative())));
            }
        }

        #[test]
        fn sat_via_dimacs(formula in sat_formula(4..20usize, 10..100usize, 0.05..0.2, 0.9..1.0)) {
            let mut solver = Solver::new();

            let mut dimacs = vec![];

            write_dimacs(&mut dimacs, &formula).unwrap();

            solver.add_dimacs_cnf(&mut &dimacs[..]).unwrap();

            prop_assert_eq!(solver.solve(&[], None), LBool::True);

            let model = solver.model().unwrap();

            for clause in formula.iter() {
                prop_assert!(clause.iter().any(|&lit| model[lit.var().index()].as_option() == Some(!lit.is_negative())));
            }
        }

        #[test]
        fn sgen_unsat_incremental_clauses(formula in sgen_unsat_formula(1..7usize)) {
            let mut solver = Solver::new();

            let mut last_state = LBool::True;

            for clause in formula.iter() {
                let single_clause = CnfFormula::from(Some(clause));
                solver.add_formula(&single_clause);

                let state = solver.solve(&[], None);
                if state != last_state {
                    prop_assert_eq!(state, LBool::False);
                    prop_assert_eq!(last_state, LBool::True);
                    last_state = state;
                }
            }

            prop_assert_eq!(last_state, LBool::False);
        }
    }
}
