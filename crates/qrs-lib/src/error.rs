use thiserror::Error;

/// Library failure taxonomy. Degenerate inputs that still have a meaningful
/// domain answer (too few beats for statistics, empty sets in the scorer)
/// produce zero-valued results instead of an error.
#[derive(Debug, Error)]
pub enum QrsError {
    /// A caller-supplied parameter is outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Too few samples to perform the requested transform.
    #[error("insufficient data: {0}")]
    InsufficientData(String),
}
