//! Solver configuration.
use serde::Deserialize;

use crate::error::SolverError;

/// Which restart policy schedules the search's restarts.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum RestartStrategy {
    /// Reluctant doubling (Luby sequence) restarts, scaled by a fixed number of conflicts.
    Luby,
    /// Glucose-style restarts based on a moving average of recent learned clause glue values.
    Glucose,
}

impl Default for RestartStrategy {
    fn default() -> RestartStrategy {
        RestartStrategy::Glucose
    }
}

/// Configurable parameters used during solving.
///
/// Unlike the upstream solver this is derived from, there's no code-generated `Default` here
/// (the macro that produced one isn't part of this crate's dependency graph), so the defaults
/// below are maintained by hand. Keep this in sync with [`SolverConfigUpdate`].
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Multiplicative decay for the VSIDS decision heuristic. (Default: 0.95)
    pub vsids_decay: f32,

    /// Multiplicative decay for clause activities. (Default: 0.999)
    pub clause_activity_decay: f32,

    /// Which restart policy to use. (Default: glucose)
    pub restart_strategy: RestartStrategy,

    /// Scaling factor for Luby sequence based restarts (number of conflicts). (Default: 128)
    pub luby_restart_interval_scale: u64,

    /// Glucose restart margin `K`: a restart is triggered when the moving average of recent
    /// glue values exceeds the long term average by this factor. (Default: 0.8, i.e. restart
    /// when recent average < 0.8 * global average would *not* trigger -- see [`schedule`]
    /// for the exact comparison.)
    ///
    /// [`schedule`]: crate::schedule
    pub glucose_restart_margin: f32,

    /// Number of recent conflicts used for the glucose restart moving average. (Default: 50)
    pub glucose_restart_window: usize,

    /// Blocks a glucose restart when the short-term moving average of trail lengths exceeds the
    /// long-term average by this factor: a long trail suggests the search is making progress, so
    /// restarting now would likely throw that away. (Default: 1.4)
    pub glucose_restart_block_margin: f32,

    /// Base number of conflicts between clause database reductions. (Default: 4000)
    pub reduce_base: u64,

    /// Growth of the reduction interval after each reduction. (Default: 300)
    pub reduce_inc: u64,

    /// Fraction of decisions that pick a uniformly random variable instead of following VSIDS.
    /// (Default: 0.0)
    pub random_var_freq: f32,

    /// Fraction of decisions that pick a random polarity instead of the saved phase.
    /// (Default: 0.0)
    pub random_pol_freq: f32,

    /// Seed for the random number generator used for random decisions. (Default: 0xdead_beef)
    pub random_seed: u64,

    /// Fraction of each tier kept alive by the ML-guided reducer on a reduction round, as
    /// `[short, long, forever]`. (Default: `[0.5, 0.5, 1.0]`, i.e. the `forever` tier is never
    /// reduced by score, only by explicit promotion/demotion.)
    pub tier_keep_ratios: [f32; 3],

    /// Arena size, in bytes, above which `consolidate` is forced even if fragmentation is low.
    /// (Default: 1 GiB)
    pub max_arena_bytes: usize,

    /// Fraction of garbage words in the arena above which a reduction round also consolidates
    /// the arena. (Default: 0.25)
    pub consolidate_when_frag: f32,

    /// Whether to reuse the saved polarity of a variable when it becomes a decision again.
    /// When disabled, decisions always use the negative polarity. (Default: true)
    pub use_phase_saving: bool,
}

impl Default for SolverConfig {
    fn default() -> SolverConfig {
        SolverConfig {
            vsids_decay: 0.95,
            clause_activity_decay: 0.999,
            restart_strategy: RestartStrategy::Glucose,
            luby_restart_interval_scale: 128,
            glucose_restart_margin: 0.8,
            glucose_restart_window: 50,
            glucose_restart_block_margin: 1.4,
            reduce_base: 4000,
            reduce_inc: 300,
            random_var_freq: 0.0,
            random_pol_freq: 0.0,
            random_seed: 0xdead_beef,
            tier_keep_ratios: [0.5, 0.5, 1.0],
            max_arena_bytes: 1 << 30,
            consolidate_when_frag: 0.25,
            use_phase_saving: true,
        }
    }
}

/// A partial update to a [`SolverConfig`].
///
/// Deserialized from TOML, either from a config file or from a single `key = value` command line
/// option. Fields left out are left unchanged when [`apply`](SolverConfigUpdate::apply)ed.
#[derive(Default, Debug, Deserialize)]
#[serde(default)]
pub struct SolverConfigUpdate {
    pub vsids_decay: Option<f32>,
    pub clause_activity_decay: Option<f32>,
    pub restart_strategy: Option<String>,
    pub luby_restart_interval_scale: Option<u64>,
    pub glucose_restart_margin: Option<f32>,
    pub glucose_restart_window: Option<usize>,
    pub glucose_restart_block_margin: Option<f32>,
    pub reduce_base: Option<u64>,
    pub reduce_inc: Option<u64>,
    pub random_var_freq: Option<f32>,
    pub random_pol_freq: Option<f32>,
    pub random_seed: Option<u64>,
    pub tier_keep_ratios: Option<[f32; 3]>,
    pub max_arena_bytes: Option<usize>,
    pub consolidate_when_frag: Option<f32>,
    pub use_phase_saving: Option<bool>,
}

macro_rules! merge_field {
    ($self:ident, $other:ident, $field:ident) => {
        if $other.$field.is_some() {
            $self.$field = $other.$field;
        }
    };
}

impl SolverConfigUpdate {
    /// Merge another (later) update on top of this one, letting later values win.
    pub fn merge(&mut self, other: SolverConfigUpdate) {
        merge_field!(self, other, vsids_decay);
        merge_field!(self, other, clause_activity_decay);
        merge_field!(self, other, restart_strategy);
        merge_field!(self, other, luby_restart_interval_scale);
        merge_field!(self, other, glucose_restart_margin);
        merge_field!(self, other, glucose_restart_window);
        merge_field!(self, other, glucose_restart_block_margin);
        merge_field!(self, other, reduce_base);
        merge_field!(self, other, reduce_inc);
        merge_field!(self, other, random_var_freq);
        merge_field!(self, other, random_pol_freq);
        merge_field!(self, other, random_seed);
        merge_field!(self, other, tier_keep_ratios);
        merge_field!(self, other, max_arena_bytes);
        merge_field!(self, other, consolidate_when_frag);
        merge_field!(self, other, use_phase_saving);
    }

    /// Apply this update to a config, validating any enum-like string fields.
    pub fn apply(&self, config: &mut SolverConfig) -> Result<(), SolverError> {
        if let Some(v) = self.vsids_decay {
            config.vsids_decay = v;
        }
        if let Some(v) = self.clause_activity_decay {
            config.clause_activity_decay = v;
        }
        if let Some(ref s) = self.restart_strategy {
            config.restart_strategy = match s.as_str() {
                "luby" => RestartStrategy::Luby,
                "glucose" => RestartStrategy::Glucose,
                _ => {
                    return Err(SolverError::ApiMisuse(
                        "unknown restart_strategy, expected \"luby\" or \"glucose\"",
                    ))
                }
            };
        }
        if let Some(v) = self.luby_restart_interval_scale {
            config.luby_restart_interval_scale = v;
        }
        if let Some(v) = self.glucose_restart_margin {
            config.glucose_restart_margin = v;
        }
        if let Some(v) = self.glucose_restart_window {
            config.glucose_restart_window = v;
        }
        if let Some(v) = self.glucose_restart_block_margin {
            config.glucose_restart_block_margin = v;
        }
        if let Some(v) = self.reduce_base {
            config.reduce_base = v;
        }
        if let Some(v) = self.reduce_inc {
            config.reduce_inc = v;
        }
        if let Some(v) = self.random_var_freq {
            config.random_var_freq = v;
        }
        if let Some(v) = self.random_pol_freq {
            config.random_pol_freq = v;
        }
        if let Some(v) = self.random_seed {
            config.random_seed = v;
        }
        if let Some(v) = self.tier_keep_ratios {
            config.tier_keep_ratios = v;
        }
        if let Some(v) = self.max_arena_bytes {
            config.max_arena_bytes = v;
        }
        if let Some(v) = self.consolidate_when_frag {
            config.consolidate_when_frag = v;
        }
        if let Some(v) = self.use_phase_saving {
            config.use_phase_saving = v;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_an_empty_update() {
        let mut config = SolverConfig::default();
        let update = SolverConfigUpdate::default();
        update.apply(&mut config).unwrap();
        assert_eq!(config, SolverConfig::default());
    }

    #[test]
    fn rejects_unknown_restart_strategy() {
        let mut config = SolverConfig::default();
        let update = SolverConfigUpdate {
            restart_strategy: Some("bogus".to_owned()),
            ..SolverConfigUpdate::default()
        };
        assert!(update.apply(&mut config).is_err());
    }
}
