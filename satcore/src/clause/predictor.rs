//! ML-guided scoring of learnt clauses.
//!
//! The reducer ([`reduce`](super::reduce)) hands a predictor a row-major `N x FEATURE_COUNT`
//! matrix built from each candidate clause's online statistics and gets back three `N`-long score
//! vectors -- one per tier -- estimating how useful the clause would still be if kept in the
//! short/long/forever pool for the next window of conflicts. The reducer does not care how the
//! scores are produced: a gradient-boosted-tree evaluator, a linear model loaded from a file, or
//! the hand-tuned [`HeuristicPredictor`] below are all valid implementations of
//! [`ClausePredictor`]. This crate ships only the heuristic fallback; no particular model file
//! format is part of the interface.

/// Number of columns in a single clause's feature row.
pub const FEATURE_COUNT: usize = 22;

/// Per-clause statistics used to build one feature row.
///
/// Combines the raw counters stored in [`ClauseHeader`](super::ClauseHeader) with the tier-wide
/// ranking context ([`reduce::reduce_tier`](super::reduce)) computes once per reduction round.
#[derive(Clone, Copy, Default)]
pub struct ClauseFeatureInput {
    pub len: usize,
    pub glue: usize,
    pub orig_glue: usize,
    pub activity: f32,
    pub introduced_at: u32,
    pub last_touched: u32,
    pub props_made: u32,
    pub uip1_used: u32,
    pub sum_props_made: f32,
    pub sum_uip1_used: f32,
    pub is_locked: bool,
    pub rank_activity: f32,
    pub rank_uip1_used: f32,
    pub rank_props_made: f32,
    pub rank_sum_uip1_per_time: f32,
    pub rank_sum_props_per_time: f32,
    pub tier_median_activity: f32,
    pub tier_median_props_made: f32,
    pub tier_median_uip1_used: f32,
}

/// Fills `out` (which must have exactly [`FEATURE_COUNT`] entries) with the feature row for one
/// clause, given the current conflict counter `now`.
///
/// Columns whose denominator (the clause's age in conflicts) is zero are set to `NaN`, the
/// "missing value" convention used throughout the rest of this construction -- see the open
/// question about this in the design notes.
pub fn build_feature_row(now: u64, input: &ClauseFeatureInput, out: &mut [f32]) {
    assert_eq!(out.len(), FEATURE_COUNT);

    let age = now.saturating_sub(u64::from(input.introduced_at)) as f32;
    let recency = now.saturating_sub(u64::from(input.last_touched)) as f32;

    let props_per_time = if age > 0.0 {
        input.sum_props_made / age
    } else {
        f32::NAN
    };
    let uip1_per_time = if age > 0.0 {
        input.sum_uip1_used / age
    } else {
        f32::NAN
    };

    out[0] = input.len as f32;
    out[1] = input.glue as f32;
    out[2] = input.orig_glue as f32;
    out[3] = input.activity;
    out[4] = age;
    out[5] = recency;
    out[6] = input.props_made as f32;
    out[7] = input.uip1_used as f32;
    out[8] = input.sum_props_made;
    out[9] = input.sum_uip1_used;
    out[10] = props_per_time;
    out[11] = uip1_per_time;
    out[12] = input.rank_activity;
    out[13] = input.rank_uip1_used;
    out[14] = input.rank_props_made;
    out[15] = input.rank_sum_uip1_per_time;
    out[16] = input.rank_sum_props_per_time;
    out[17] = input.tier_median_activity;
    out[18] = input.tier_median_props_made;
    out[19] = input.tier_median_uip1_used;
    out[20] = if input.len > 0 {
        input.glue as f32 / input.len as f32
    } else {
        0.0
    };
    out[21] = if input.is_locked { 1.0 } else { 0.0 };
}

/// Scores produced by a [`ClausePredictor`] for a batch of clauses, one vector per tier.
#[derive(Default)]
pub struct PredictedScores {
    pub short: Vec<f32>,
    pub long: Vec<f32>,
    pub forever: Vec<f32>,
}

/// A model that scores learnt clauses for the reducer.
///
/// `features` is row-major with [`FEATURE_COUNT`] columns; the returned vectors each have
/// `features.len() / FEATURE_COUNT` entries, in the same clause order as the input.
pub trait ClausePredictor {
    fn predict(&self, features: &[f32]) -> PredictedScores;
}

/// Hand-tuned linear-weighted heuristic used when no trained model is configured.
///
/// Each score is a weighted sum of the feature row run through a logistic squashing function.
/// `NaN` features are treated as a zero contribution rather than poisoning the whole row. The
/// weights favor the rank-based and tier-median columns (which are already normalized to
/// comparable scales) over the raw counters, which can vary by orders of magnitude across a run.
#[derive(Default)]
pub struct HeuristicPredictor;

impl HeuristicPredictor {
    fn score_row(row: &[f32], weights: &[f32; FEATURE_COUNT]) -> f32 {
        let mut acc = 0.0f32;
        for (&w, &f) in weights.iter().zip(row.iter()) {
            if !f.is_nan() {
                acc += w * f;
            }
        }
        1.0 / (1.0 + (-acc).exp())
    }
}

// Column order: len, glue, orig_glue, activity, age, recency, props_made, uip1_used,
// sum_props_made, sum_uip1_used, props_per_time, uip1_per_time, rank_activity, rank_uip1_used,
// rank_props_made, rank_sum_uip1_per_time, rank_sum_props_per_time, tier_median_activity,
// tier_median_props_made, tier_median_uip1_used, glue_over_len, is_locked.

/// Weighted toward recent usage; the short-tier pool has to earn survival every round.
const SHORT_WEIGHTS: [f32; FEATURE_COUNT] = [
    0.0, -0.05, 0.0, 0.002, -0.0008, -0.0015, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.8, 0.9, 0.9, 0.5, 0.5,
    0.1, 0.1, 0.1, -0.6, 2.0,
];

/// Weighted toward sustained per-conflict usage rates rather than raw recency.
const LONG_WEIGHTS: [f32; FEATURE_COUNT] = [
    0.0, -0.03, 0.0, 0.001, -0.0003, -0.0006, 0.0, 0.0, 0.0002, 0.0002, 0.3, 0.3, 0.6, 0.6, 0.6,
    0.8, 0.8, 0.3, 0.3, 0.3, -0.3, 2.0,
];

/// Weighted toward tier-wide standing; the forever pool should only shed clauses that have
/// clearly fallen behind their peers.
const FOREVER_WEIGHTS: [f32; FEATURE_COUNT] = [
    0.0, -0.02, 0.0, 0.0005, -0.0001, -0.0002, 0.0, 0.0, 0.0003, 0.0003, 0.4, 0.4, 0.4, 0.4, 0.4,
    1.0, 1.0, 0.5, 0.5, 0.5, -0.1, 3.0,
];

impl ClausePredictor for HeuristicPredictor {
    fn predict(&self, features: &[f32]) -> PredictedScores {
        assert_eq!(features.len() % FEATURE_COUNT, 0);
        let n = features.len() / FEATURE_COUNT;

        let mut short = Vec::with_capacity(n);
        let mut long = Vec::with_capacity(n);
        let mut forever = Vec::with_capacity(n);

        for row in features.chunks_exact(FEATURE_COUNT) {
            short.push(Self::score_row(row, &SHORT_WEIGHTS));
            long.push(Self::score_row(row, &LONG_WEIGHTS));
            forever.push(Self::score_row(row, &FOREVER_WEIGHTS));
        }

        PredictedScores {
            short,
            long,
            forever,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_age_yields_nan_rate_features() {
        let input = ClauseFeatureInput {
            introduced_at: 10,
            ..ClauseFeatureInput::default()
        };
        let mut row = [0.0f32; FEATURE_COUNT];
        build_feature_row(10, &input, &mut row);
        assert!(row[10].is_nan());
        assert!(row[11].is_nan());
    }

    #[test]
    fn heuristic_scores_are_bounded_probabilities() {
        let input = ClauseFeatureInput {
            len: 5,
            glue: 3,
            orig_glue: 4,
            activity: 12.0,
            introduced_at: 0,
            last_touched: 50,
            props_made: 7,
            uip1_used: 2,
            sum_props_made: 20.0,
            sum_uip1_used: 5.0,
            is_locked: false,
            rank_activity: 0.9,
            rank_uip1_used: 0.8,
            rank_props_made: 0.7,
            rank_sum_uip1_per_time: 0.6,
            rank_sum_props_per_time: 0.6,
            tier_median_activity: 4.0,
            tier_median_props_made: 3.0,
            tier_median_uip1_used: 1.0,
        };
        let mut row = [0.0f32; FEATURE_COUNT];
        build_feature_row(100, &input, &mut row);

        let predictor = HeuristicPredictor::default();
        let scores = predictor.predict(&row);

        for score in scores
            .short
            .iter()
            .chain(scores.long.iter())
            .chain(scores.forever.iter())
        {
            assert!(*score >= 0.0 && *score <= 1.0);
        }
    }

    #[test]
    fn high_rank_clause_beats_low_rank_clause() {
        let high = ClauseFeatureInput {
            len: 5,
            glue: 2,
            rank_activity: 1.0,
            rank_uip1_used: 1.0,
            rank_props_made: 1.0,
            rank_sum_uip1_per_time: 1.0,
            rank_sum_props_per_time: 1.0,
            ..ClauseFeatureInput::default()
        };
        let low = ClauseFeatureInput {
            len: 5,
            glue: 2,
            rank_activity: 0.0,
            rank_uip1_used: 0.0,
            rank_props_made: 0.0,
            rank_sum_uip1_per_time: 0.0,
            rank_sum_props_per_time: 0.0,
            ..ClauseFeatureInput::default()
        };

        let mut rows = [0.0f32; FEATURE_COUNT * 2];
        build_feature_row(10, &high, &mut rows[..FEATURE_COUNT]);
        build_feature_row(10, &low, &mut rows[FEATURE_COUNT..]);

        let predictor = HeuristicPredictor::default();
        let scores = predictor.predict(&rows);

        assert!(scores.short[0] > scores.short[1]);
        assert!(scores.long[0] > scores.long[1]);
        assert!(scores.forever[0] > scores.forever[1]);
    }
}
