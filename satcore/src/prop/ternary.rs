//! Propagation of ternary clauses.
use partial_ref::{partial, PartialRef};

use satcore_formula::Lit;

use crate::context::{AssignmentP, Context, ImplGraphP, TernaryClausesP, TrailP};

use super::enqueue_assignment;
use super::{Conflict, Reason};

/// Propagate all literals implied by the given literal via ternary clauses.
///
/// On conflict return the ternary clause propagating the conflicting assignment.
pub fn propagate_ternary(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ImplGraphP,
        mut TrailP,
        TernaryClausesP,
    ),
    lit: Lit,
) -> Result<(), Conflict> {
    let (ternary_clauses, mut ctx) = ctx.split_part(TernaryClausesP);

    for &[a, b] in ternary_clauses.containing_negation(lit) {
        let assignment = ctx.part(AssignmentP);

        if assignment.lit_is_true(a) || assignment.lit_is_true(b) {
            continue;
        } else if assignment.lit_is_false(a) && assignment.lit_is_false(b) {
            return Err(Conflict::Ternary([!lit, a, b]));
        } else if assignment.lit_is_false(a) {
            enqueue_assignment(ctx.borrow(), b, Reason::Ternary([!lit, a]));
        } else if assignment.lit_is_false(b) {
            enqueue_assignment(ctx.borrow(), a, Reason::Ternary([!lit, b]));
        }
    }

    Ok(())
}
