use thiserror::Error;

/// Domain failures surfaced by the store and the growth/streak flows.
/// The binary edge collects these into `anyhow` for display.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("storage failure")]
    Persistence(#[from] sqlx::Error),
}
