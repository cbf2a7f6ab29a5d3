//! Scheduling of restarts and clause database reductions.
use std::collections::VecDeque;

use log::info;

use partial_ref::{partial, PartialRef};

use crate::cdcl::conflict_step;
use crate::clause::gc::collect_garbage_now;
use crate::clause::reduce::run_reduction;
use crate::clause::Tier;
use crate::config::{RestartStrategy, SolverConfig};
use crate::context::{
    AnalyzeConflictP, AssignmentP, BinaryClausesP, ClauseActivityP, ClauseAllocP, ClauseDbP,
    Context, ImplGraphP, IncrementalP, RandomP, ScheduleP, SolverConfigP, SolverStateP,
    TernaryClausesP, TmpDataP, TrailP, VsidsP, WatchlistsP,
};
use crate::prop::restart;
use crate::state::SatState;

mod luby;

use luby::LubySequence;

/// A fixed-size moving average over a window of recent samples, paired with a running average
/// over every sample ever seen.
#[derive(Default)]
struct RunningAverages {
    window: VecDeque<u64>,
    window_sum: u64,
    window_cap: usize,
    long_sum: u64,
    long_count: u64,
}

impl RunningAverages {
    fn record(&mut self, value: u64, window_cap: usize) {
        self.window_cap = window_cap.max(1);
        self.window.push_back(value);
        self.window_sum += value;
        while self.window.len() > self.window_cap {
            self.window_sum -= self.window.pop_front().unwrap();
        }
        self.long_sum += value;
        self.long_count += 1;
    }

    fn short_avg(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.window_sum as f64 / self.window.len() as f64
        }
    }

    fn long_avg(&self) -> f64 {
        if self.long_count == 0 {
            0.0
        } else {
            self.long_sum as f64 / self.long_count as f64
        }
    }

    fn full(&self) -> bool {
        self.window.len() >= self.window_cap
    }
}

/// Scheduling of restarts and clause database reductions.
#[derive(Default)]
pub struct Schedule {
    conflicts: u64,
    restarts: u64,
    luby: LubySequence,
    next_luby_restart: u64,
    next_reduce: u64,
    reduce_rounds: u64,
    glue: RunningAverages,
    trail: RunningAverages,
}

impl Schedule {
    /// Total number of conflicts processed through the schedule so far.
    pub fn conflicts(&self) -> u64 {
        self.conflicts
    }

    /// Record the glue and trail length of a just-analyzed conflict.
    fn record_conflict(&mut self, glue: usize, trail_len: usize, glue_window: usize) {
        self.conflicts += 1;
        self.glue.record(glue as u64, glue_window);
        // The trail average only needs to smooth out noise, it isn't a tuning knob exposed
        // through config.
        self.trail.record(trail_len as u64, 5000);
    }

    /// Whether a restart should happen now, given the current glue/trail statistics.
    fn should_restart(&self, config: &SolverConfig) -> bool {
        match config.restart_strategy {
            RestartStrategy::Luby => self.conflicts >= self.next_luby_restart,
            RestartStrategy::Glucose => {
                if !self.glue.full() {
                    return false;
                }
                let triggered = self.glue.short_avg() * f64::from(config.glucose_restart_margin)
                    > self.glue.long_avg();
                if !triggered {
                    return false;
                }
                // Blocked restart: an unusually long trail compared to its own history means the
                // search is making progress, so skip this restart despite the glue trigger.
                let blocked = self.trail.long_count > 0
                    && self.trail.short_avg()
                        > self.trail.long_avg() * f64::from(config.glucose_restart_block_margin);
                !blocked
            }
        }
    }

    fn advance_restart(&mut self, config: &SolverConfig) {
        self.restarts += 1;
        if config.restart_strategy == RestartStrategy::Luby {
            self.next_luby_restart =
                self.conflicts + config.luby_restart_interval_scale * self.luby.advance();
        }
    }

    fn due_for_reduce(&self) -> bool {
        self.conflicts >= self.next_reduce
    }

    fn advance_reduce(&mut self, config: &SolverConfig) {
        self.reduce_rounds += 1;
        self.next_reduce =
            self.conflicts + config.reduce_base + config.reduce_inc * self.reduce_rounds;
    }
}

/// Perform one step of the schedule: a restart and/or a clause database reduction if either is
/// due, followed by one conflict-driven search step.
pub fn schedule_step(
    mut ctx: partial!(
        Context,
        mut AnalyzeConflictP,
        mut AssignmentP,
        mut BinaryClausesP,
        mut ClauseActivityP,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut IncrementalP,
        mut RandomP,
        mut ScheduleP,
        mut SolverStateP,
        mut TernaryClausesP,
        mut TmpDataP,
        mut TrailP,
        mut VsidsP,
        mut WatchlistsP,
        SolverConfigP,
    ),
) {
    if ctx.part(SolverStateP).sat_state != SatState::Unknown {
        return;
    }

    {
        let config = *ctx.part(SolverConfigP);
        let (schedule, mut ctx) = ctx.split_part_mut(ScheduleP);

        if schedule.conflicts > 0 && schedule.conflicts % 5000 == 0 {
            let units = ctx.part(TrailP).top_level_assignment_count();
            let db = ctx.part(ClauseDbP);
            info!(
                "confl: {}k rest: {} reduce: {} vars: {} bin: {} irred: {} core: {} mid: {} local: {}",
                schedule.conflicts / 1000,
                schedule.restarts,
                schedule.reduce_rounds,
                ctx.part(AssignmentP).assignment().len() - units,
                ctx.part(BinaryClausesP).count(),
                db.count_by_tier(Tier::Irred),
                db.count_by_tier(Tier::Core),
                db.count_by_tier(Tier::Mid),
                db.count_by_tier(Tier::Local)
            );
        }

        if schedule.should_restart(&config) {
            restart(ctx.borrow());
            schedule.advance_restart(&config);
        }

        if schedule.due_for_reduce() {
            schedule.advance_reduce(&config);
            run_reduction(ctx.borrow(), schedule.conflicts, &config);
            collect_garbage_if_due(ctx.borrow(), &config);
        }
    }

    conflict_step(ctx.borrow());

    let glue_window = ctx.part(SolverConfigP).glucose_restart_window;
    if let Some(glue) = ctx.part_mut(SolverStateP).last_conflict_glue.take() {
        let trail_len = ctx.part(TrailP).trail().len();
        ctx.part_mut(ScheduleP)
            .record_conflict(glue, trail_len, glue_window);
    }
}

/// Consolidate the clause arena when fragmentation or size crosses the configured thresholds.
fn collect_garbage_if_due(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        mut ImplGraphP,
        mut WatchlistsP,
        TrailP,
    ),
    config: &SolverConfig,
) {
    let alloc = ctx.part(ClauseAllocP);
    let db = ctx.part(ClauseDbP);

    let frag = if alloc.buffer_size() == 0 {
        0.0
    } else {
        db.garbage_size() as f32 / alloc.buffer_size() as f32
    };

    // Call the unconditional collector directly: `collect_garbage` re-gates on its own hardcoded
    // 50%-garbage threshold, which would silently override `consolidate_when_frag` and make
    // `max_arena_bytes` unable to ever force a consolidation on a large, low-fragmentation arena.
    if frag >= config.consolidate_when_frag || alloc.buffer_size() >= config.max_arena_bytes / 4 {
        collect_garbage_now(ctx.borrow());
    }
}
