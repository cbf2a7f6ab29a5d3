//! Shared proptest generators used by the unit tests throughout this crate.
//!
//! The actual formula generators live in `satcore-formula`, which is pulled in here as a
//! dev-dependency with its `internal-testing` feature enabled.
pub use satcore_formula::test::{conditional_pigeon_hole, sat_formula, sgen_unsat_formula};
