//! Errors reported by the solver's public API.
use thiserror::Error;

/// Errors the solver can report to its caller.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The caller used the API in a way that's not allowed, e.g. an out of range literal or an
    /// unknown configuration option.
    #[error("solver api misuse: {0}")]
    ApiMisuse(&'static str),

    /// An error while reading input, such as a malformed DIMACS file.
    #[error("error loading input: {0}")]
    Fatal(#[from] anyhow::Error),
}
