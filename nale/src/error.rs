use thiserror::Error;

/// The four error kinds a single `(query, target)` work context can
/// surface. See spec.md §7: every recoverable error stays local to one
/// pair and never escalates to process-wide state.
#[derive(Error, Debug)]
pub enum NaleError {
    #[error("bad input: {0}")]
    BadInput(String),

    #[error("allocation precondition violated: {0}")]
    Alloc(String),

    #[error("non-finite score encountered in {stage}")]
    Numeric { stage: &'static str },
}
