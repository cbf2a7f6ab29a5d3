//! Miscellaneous solver state.

/// Satisfiability state.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum SatState {
    Unknown,
    Sat,
    Unsat,
    UnsatUnderAssumptions,
}

impl Default for SatState {
    fn default() -> SatState {
        SatState::Unknown
    }
}

/// Miscellaneous solver state.
///
/// Anything larger or any larger group of related state variables should be moved into a separate
/// part of [`Context`](crate::context::Context).
pub struct SolverState {
    pub sat_state: SatState,
    /// Once an empty clause is derived the formula stays unsatisfiable forever, even across
    /// `add_clause` calls that would otherwise let the solver forget about it. This sticks once
    /// set to false and is never reset.
    pub ok: bool,
    /// Total number of conflicts found so far, across all `solve` calls on this solver.
    ///
    /// Used both to schedule restarts/reductions and as the "current time" fed to the clause
    /// predictor's age-based features ([`clause::predictor`](crate::clause::predictor)).
    pub conflicts: u64,
    /// Glue of the clause learned from the most recent conflict, consumed and cleared by
    /// [`schedule::schedule_step`](crate::schedule::schedule_step) to feed the restart policy's
    /// moving averages.
    pub last_conflict_glue: Option<usize>,
    /// Verbosity level set through [`Solver::set_verbosity`](crate::solver::Solver::set_verbosity).
    pub verbosity: u8,
}

impl Default for SolverState {
    fn default() -> SolverState {
        SolverState {
            sat_state: SatState::Unknown,
            ok: true,
            conflicts: 0,
            last_conflict_glue: None,
            verbosity: 0,
        }
    }
}
