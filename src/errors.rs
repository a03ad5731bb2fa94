use thiserror::Error;

///
/// Coarse classification of an [`SGError`]. Configuration, capacity and format
/// errors are raised before any state is touched; structural errors abort the
/// operation in flight.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorCategory
{
    Configuration,
    Structural,
    State,
    Capacity,
    Format,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SGError
{
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("vector of length {values} does not match grid with {points} points")]
    NumberOfPointsAndValuesMismatch { points: usize, values: usize },
    #[error("invalid grid point {point}: {reason}")]
    InvalidPoint { point: String, reason: &'static str },
    #[error("unknown kernel `{0}`")]
    UnknownKernel(String),
    #[error("level limits need one entry per dimension (expected {expected}, found {found})")]
    InvalidLevelLimits { expected: usize, found: usize },
    #[error("sequence number {seq} is out of range for a store with {len} points")]
    InvalidIndex { seq: usize, len: usize },
    #[error("unsupported grid: {0}")]
    UnsupportedGrid(&'static str),
    #[error("sweep along dimension {dim} reached {point}, which is not in the store")]
    MissingPoint { dim: usize, point: String },
    #[error("operator cache not built: call {0} first")]
    CacheNotBuilt(&'static str),
    #[error("dense operator matrix needs {required} bytes but the limit is {limit}")]
    CapacityExceeded { required: u64, limit: u64 },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("failed to write buffer: {0}")]
    WriteBufferFailed(String),
    #[error("failed to read buffer: {0}")]
    ReadBufferFailed(String),
}

impl SGError
{
    pub fn category(&self) -> ErrorCategory
    {
        match self
        {
            SGError::DimensionMismatch { .. }
            | SGError::NumberOfPointsAndValuesMismatch { .. }
            | SGError::InvalidPoint { .. }
            | SGError::UnknownKernel(_)
            | SGError::InvalidLevelLimits { .. }
            | SGError::InvalidIndex { .. }
            | SGError::UnsupportedGrid(_) => ErrorCategory::Configuration,
            SGError::MissingPoint { .. } => ErrorCategory::Structural,
            SGError::CacheNotBuilt(_) => ErrorCategory::State,
            SGError::CapacityExceeded { .. } => ErrorCategory::Capacity,
            SGError::Parse { .. }
            | SGError::WriteBufferFailed(_)
            | SGError::ReadBufferFailed(_) => ErrorCategory::Format,
        }
    }
}

#[test]
fn check_error_categories()
{
    assert_eq!(SGError::UnknownKernel("foo".into()).category(), ErrorCategory::Configuration);
    assert_eq!(SGError::MissingPoint { dim: 0, point: "[(1,1)]".into() }.category(), ErrorCategory::Structural);
    assert_eq!(SGError::CacheNotBuilt("prepare").category(), ErrorCategory::State);
    assert_eq!(SGError::CapacityExceeded { required: 8, limit: 4 }.category(), ErrorCategory::Capacity);
    let message = SGError::DimensionMismatch { expected: 2, found: 3 }.to_string();
    assert!(message.contains("expected 2"));
}
