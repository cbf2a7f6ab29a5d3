//! Unit propagation.
use partial_ref::{partial, PartialRef};

use crate::context::{
    AssignmentP, BinaryClausesP, ClauseAllocP, Context, ImplGraphP, TernaryClausesP, TrailP,
    WatchlistsP,
};

pub mod assignment;
pub mod binary;
pub mod graph;
pub mod long;
pub mod ternary;
pub mod watch;

pub use assignment::{backtrack, enqueue_assignment, full_restart, restart, Assignment, Trail};
pub use binary::propagate_binary;
pub use graph::{Conflict, ImplGraph, ImplNode, Reason};
pub use long::propagate_long;
pub use ternary::propagate_ternary;
pub use watch::{Watch, Watchlists};

/// Propagate all currently enqueued assignments to a fixed point.
///
/// Processes the trail in order, propagating each newly assigned literal through the binary,
/// ternary and long clause databases. Stops and returns the conflicting clause as soon as one is
/// found, leaving any remaining enqueued assignments unprocessed.
pub fn propagate(
    mut ctx: partial!(
        Context,
        mut AssignmentP,
        mut ClauseAllocP,
        mut ImplGraphP,
        mut TrailP,
        mut WatchlistsP,
        BinaryClausesP,
        TernaryClausesP,
    ),
) -> Result<(), Conflict> {
    while let Some(lit) = ctx.part(TrailP).queue_head() {
        propagate_binary(ctx.borrow(), lit)?;
        propagate_ternary(ctx.borrow(), lit)?;
        propagate_long(ctx.borrow(), lit)?;

        ctx.part_mut(TrailP).pop_queue();
    }

    Ok(())
}
