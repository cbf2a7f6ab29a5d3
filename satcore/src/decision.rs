//! Decision heuristics.

use partial_ref::{partial, PartialRef};

use crate::context::{AssignmentP, Context, ImplGraphP, RandomP, SolverConfigP, TrailP, VsidsP};
use crate::lit::{Lit, Var};
use crate::prop::{enqueue_assignment, Reason};

pub mod random;
pub mod vsids;

/// Make a decision and enqueue it.
///
/// Picks a variable from the VSIDS order heap, occasionally substituting a uniformly random
/// unassigned variable (`random_var_freq`). The polarity is the last saved phase unless
/// `use_phase_saving` is off or a `random_pol_freq` roll picks a random one.
///
/// Returns `false` if no decision was made because all variables are assigned.
pub fn make_decision(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut RandomP,
        mut TrailP,
        mut VsidsP,
        SolverConfigP,
    ),
) -> bool {
    let decision_var = loop {
        let random_var_freq = ctx.part(SolverConfigP).random_var_freq;

        let from_random = random_var_freq > 0.0 && ctx.part_mut(RandomP).ratio() < random_var_freq;

        let candidate = if from_random {
            random_unassigned_var(ctx.borrow())
        } else {
            None
        };

        let candidate = match candidate {
            Some(var) => Some(var),
            None => ctx.part_mut(VsidsP).next(),
        };

        match candidate {
            Some(var) => {
                if ctx.part(AssignmentP).var_value(var).is_none() {
                    break var;
                }
                // Variables popped from the heap are always unassigned by construction, but a
                // random pick above might coincide with one that's already assigned -- retry.
            }
            None => return false,
        }
    };

    let polarity = decision_polarity(ctx.borrow(), decision_var);

    let decision = Lit::from_var(decision_var, polarity);

    ctx.part_mut(TrailP).new_decision_level();

    enqueue_assignment(ctx.borrow(), decision, Reason::Unit);

    true
}

/// Pick the polarity for a new decision on `var`.
fn decision_polarity(
    mut ctx: partial!(Context, mut RandomP, AssignmentP, SolverConfigP),
    var: Var,
) -> bool {
    let config = ctx.part(SolverConfigP);
    let random_pol_freq = config.random_pol_freq;
    let use_phase_saving = config.use_phase_saving;

    if random_pol_freq > 0.0 && ctx.part_mut(RandomP).ratio() < random_pol_freq {
        ctx.part_mut(RandomP).bool()
    } else if use_phase_saving {
        ctx.part(AssignmentP).last_var_value(var)
    } else {
        false
    }
}

/// Pick a uniformly random currently unassigned variable, if any exist.
fn random_unassigned_var(mut ctx: partial!(Context, mut RandomP, AssignmentP)) -> Option<Var> {
    let (assignment, mut ctx) = ctx.split_part(AssignmentP);
    let assignment = assignment.assignment();
    let count = assignment.len();
    if count == 0 {
        return None;
    }

    let start = ctx.part_mut(RandomP).below(count);

    (0..count)
        .map(|offset| (start + offset) % count)
        .find(|&index| assignment[index].is_none())
        .map(Var::from_index)
}

/// Make a variable available for future decisions.
///
/// Called whenever a variable becomes unassigned, so it re-enters the VSIDS order heap.
pub fn make_available(mut ctx: partial!(Context, mut VsidsP), var: Var) {
    ctx.part_mut(VsidsP).make_available(var);
}
