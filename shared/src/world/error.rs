use thiserror::Error;

/// Errors that can occur while allocating network ids
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdPoolError {
    /// Every root block in the range is in use
    #[error("Network id pool exhausted: no free root block left in {start}..={end}")]
    PoolExhausted { start: u32, end: u32 },
}
