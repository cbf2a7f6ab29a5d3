//! Clause database reduction.
use partial_ref::{partial, PartialRef};

use crate::config::SolverConfig;
use crate::context::{AssignmentP, ClauseAllocP, ClauseDbP, Context, ImplGraphP};
use crate::lit::Lit;
use crate::prop::Reason;
use crate::vec_mut_scan::VecMutScan;

use super::db::{set_clause_tier, try_delete_clause, Tier};
use super::predictor::{
    build_feature_row, ClauseFeatureInput, ClausePredictor, HeuristicPredictor, FEATURE_COUNT,
};
use super::ClauseRef;

/// Remove deleted and duplicate entries from the by_tier clause lists.
///
/// This has the side effect of setting the mark bit on all clauses of the tier.
pub fn dedup_and_mark_by_tier(
    mut ctx: partial!(Context, mut ClauseAllocP, mut ClauseDbP),
    tier: Tier,
) {
    let (alloc, mut ctx) = ctx.split_part_mut(ClauseAllocP);
    let by_tier = &mut ctx.part_mut(ClauseDbP).by_tier[tier as usize];

    by_tier.retain(|&cref| {
        let header = alloc.header_mut(cref);
        let retain = !header.deleted() && !header.mark() && header.tier() == tier;
        if retain {
            header.set_mark(true);
        }
        retain
    })
}

/// Clear the mark bit set by `dedup_and_mark_by_tier` on every entry of a (already deduped)
/// tier list.
fn clear_marks(mut ctx: partial!(Context, mut ClauseAllocP), crefs: &[ClauseRef]) {
    for &cref in crefs {
        ctx.part_mut(ClauseAllocP).header_mut(cref).set_mark(false);
    }
}

/// Whether a clause is currently the reason for an assigned literal, and thus can't be deleted.
fn is_locked(ctx: partial!(Context, ClauseAllocP, AssignmentP, ImplGraphP), cref: ClauseRef) -> bool {
    let clause = ctx.part(ClauseAllocP).clause(cref);
    let asserted_lit: Lit = clause.lits()[0];

    ctx.part(AssignmentP).lit_value(asserted_lit) == Some(true)
        && *ctx.part(ImplGraphP).reason(asserted_lit.var()) == Reason::Long(cref)
}

/// Cross-tier score thresholds used to promote/demote clauses between tiers (spec module G
/// step 4). Chosen to straddle the heuristic predictor's ~0.5 neutral point with a gap between
/// the promote and demote thresholds, so a clause has to clearly earn a tier change rather than
/// flapping back and forth every round.
const PROMOTE_TO_MID_THRESHOLD: f32 = 0.6;
const PROMOTE_TO_CORE_THRESHOLD: f32 = 0.65;
const DEMOTE_TO_MID_THRESHOLD: f32 = 0.4;

/// Index into [`SolverConfig::tier_keep_ratios`] and into a [`super::predictor::PredictedScores`]
/// for a given redundant tier.
fn keep_ratio(config: &SolverConfig, tier: Tier) -> f32 {
    match tier {
        Tier::Local => config.tier_keep_ratios[0],
        Tier::Mid => config.tier_keep_ratios[1],
        Tier::Core => config.tier_keep_ratios[2],
        Tier::Irred => 1.0,
    }
}

/// Rank each value in `values`, normalized to `[0, 1]` with `1.0` for the largest value.
///
/// Used to turn raw, unboundedly-scaled counters (activity, usage counts) into features on a
/// comparable scale across clauses of wildly different ages.
fn normalized_ranks(values: &[f32]) -> Vec<f32> {
    let n = values.len();
    if n <= 1 {
        return vec![1.0; n];
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap());

    let mut ranks = vec![0.0; n];
    for (rank, &index) in order.iter().enumerate() {
        ranks[index] = rank as f32 / (n - 1) as f32;
    }
    ranks
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    sorted[sorted.len() / 2]
}

/// Score the clauses of one redundant tier with the clause predictor, promote/demote clauses
/// whose cross-tier score crosses this tier's threshold, and delete the lowest-scoring fraction
/// of whatever remains, protecting clauses currently in use as a propagation reason.
fn reduce_tier(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        AssignmentP,
        ImplGraphP
    ),
    tier: Tier,
    now: u64,
    config: &SolverConfig,
) {
    dedup_and_mark_by_tier(ctx.borrow(), tier);

    let crefs = std::mem::replace(&mut ctx.part_mut(ClauseDbP).by_tier[tier as usize], vec![]);
    clear_marks(ctx.borrow(), &crefs);

    let n = crefs.len();
    if n == 0 {
        ctx.part_mut(ClauseDbP).count_by_tier[tier as usize] = 0;
        ctx.part_mut(ClauseDbP).by_tier[tier as usize] = crefs;
        return;
    }

    let mut activity = Vec::with_capacity(n);
    let mut uip1_used = Vec::with_capacity(n);
    let mut props_made = Vec::with_capacity(n);
    let mut uip1_per_time = Vec::with_capacity(n);
    let mut props_per_time = Vec::with_capacity(n);
    let mut locked = Vec::with_capacity(n);

    for &cref in &crefs {
        let header = ctx.part_mut(ClauseAllocP).header_mut(cref);

        // Sample the interval counters into the running sums before scoring, so the predictor
        // sees a rate averaged over the clause's whole life rather than just this round.
        let sum_props_made = header.sum_props_made() + header.props_made() as f32;
        let sum_uip1_used = header.sum_uip1_used() + header.uip1_used() as f32;
        header.set_sum_props_made(sum_props_made);
        header.set_sum_uip1_used(sum_uip1_used);

        let age = now.saturating_sub(u64::from(header.introduced_at())) as f32;

        activity.push(header.activity());
        uip1_used.push(header.uip1_used() as f32);
        props_made.push(header.props_made() as f32);
        uip1_per_time.push(if age > 0.0 { sum_uip1_used / age } else { 0.0 });
        props_per_time.push(if age > 0.0 {
            sum_props_made / age
        } else {
            0.0
        });

        locked.push(is_locked(ctx.borrow(), cref));
    }

    let rank_activity = normalized_ranks(&activity);
    let rank_uip1_used = normalized_ranks(&uip1_used);
    let rank_props_made = normalized_ranks(&props_made);
    let rank_sum_uip1_per_time = normalized_ranks(&uip1_per_time);
    let rank_sum_props_per_time = normalized_ranks(&props_per_time);

    let tier_median_activity = median(&activity);
    let tier_median_props_made = median(&props_made);
    let tier_median_uip1_used = median(&uip1_used);

    let mut features = vec![0.0f32; n * FEATURE_COUNT];

    for (i, &cref) in crefs.iter().enumerate() {
        let header = ctx.part(ClauseAllocP).header(cref);

        let input = ClauseFeatureInput {
            len: header.len(),
            glue: header.glue(),
            orig_glue: header.orig_glue(),
            activity: header.activity(),
            introduced_at: header.introduced_at(),
            last_touched: header.last_touched(),
            props_made: header.props_made(),
            uip1_used: header.uip1_used(),
            sum_props_made: header.sum_props_made(),
            sum_uip1_used: header.sum_uip1_used(),
            is_locked: locked[i],
            rank_activity: rank_activity[i],
            rank_uip1_used: rank_uip1_used[i],
            rank_props_made: rank_props_made[i],
            rank_sum_uip1_per_time: rank_sum_uip1_per_time[i],
            rank_sum_props_per_time: rank_sum_props_per_time[i],
            tier_median_activity,
            tier_median_props_made,
            tier_median_uip1_used,
        };

        build_feature_row(now, &input, &mut features[i * FEATURE_COUNT..(i + 1) * FEATURE_COUNT]);
    }

    let predictor = HeuristicPredictor::default();
    let scores = predictor.predict(&features);

    // Promote/demote clauses whose cross-tier score crosses this tier's threshold (spec module G
    // step 4). A clause that moves is excluded from this round's keep-ratio deletion below -- it
    // gets re-scored against its new tier's own keep ratio starting next round.
    let mut new_tier = vec![tier; n];
    for (i, &cref) in crefs.iter().enumerate() {
        if locked[i] {
            continue;
        }

        new_tier[i] = match tier {
            Tier::Local => {
                if scores.long[i] >= PROMOTE_TO_MID_THRESHOLD {
                    Tier::Mid
                } else {
                    Tier::Local
                }
            }
            Tier::Mid => {
                if scores.forever[i] >= PROMOTE_TO_CORE_THRESHOLD {
                    Tier::Core
                } else if !ctx.part(ClauseAllocP).header(cref).active() {
                    // Hasn't propagated anything since the last time this tier was reduced.
                    Tier::Local
                } else {
                    Tier::Mid
                }
            }
            Tier::Core => {
                if scores.forever[i] < DEMOTE_TO_MID_THRESHOLD {
                    Tier::Mid
                } else {
                    Tier::Core
                }
            }
            Tier::Irred => Tier::Irred,
        };
    }

    if tier == Tier::Mid {
        // Reset the activity window now that every mid-tier clause has been checked against it.
        for &cref in &crefs {
            ctx.part_mut(ClauseAllocP).header_mut(cref).set_active(false);
        }
    }

    let own_scores = match tier {
        Tier::Local => &scores.short,
        Tier::Mid => &scores.long,
        Tier::Core | Tier::Irred => &scores.forever,
    };

    let staying: Vec<usize> = (0..n).filter(|&i| new_tier[i] == tier).collect();

    let mut order = staying.clone();
    order.sort_by(|&a, &b| own_scores[b].partial_cmp(&own_scores[a]).unwrap());

    let keep = ((staying.len() as f32) * keep_ratio(config, tier)).round() as usize;

    let mut delete = vec![false; n];
    for &index in order.iter().skip(keep) {
        if !locked[index] {
            delete[index] = true;
        }
    }

    for (i, &cref) in crefs.iter().enumerate() {
        if new_tier[i] != tier {
            set_clause_tier(ctx.borrow(), cref, new_tier[i]);
        }
    }

    let mut crefs = crefs;
    let mut scan = VecMutScan::new(&mut crefs);
    let mut index = 0;
    while let Some(cref) = scan.next() {
        if new_tier[index] != tier {
            // Already relocated to its new tier's by_tier list by set_clause_tier above.
            cref.remove();
        } else if delete[index] && try_delete_clause(ctx.borrow(), *cref) {
            cref.remove();
        }
        index += 1;
    }
    drop(scan);

    ctx.part_mut(ClauseDbP).count_by_tier[tier as usize] = crefs.len();
    ctx.part_mut(ClauseDbP).by_tier[tier as usize] = crefs;
}

/// Run one full clause database reduction round across all redundant tiers.
///
/// Scores every redundant clause with the configured predictor, promotes/demotes clauses across
/// tiers where the score warrants it, and keeps the top `config.tier_keep_ratios` fraction of
/// whatever remains in each tier, always protecting clauses that are currently the reason for an
/// assigned literal.
pub fn run_reduction(
    mut ctx: partial!(
        Context,
        mut ClauseAllocP,
        mut ClauseDbP,
        AssignmentP,
        ImplGraphP
    ),
    now: u64,
    config: &SolverConfig,
) {
    reduce_tier(ctx.borrow(), Tier::Local, now, config);
    reduce_tier(ctx.borrow(), Tier::Mid, now, config);
    reduce_tier(ctx.borrow(), Tier::Core, now, config);
}
