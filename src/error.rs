use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipListError {
    /// The sentinel marks both ends of every chain and can never be removed.
    #[error("operation not permitted on the sentinel node")]
    InvalidSentinelOperation,

    #[error("node is not linked into this skip list")]
    NodeNotFound,

    #[error("promotion probability must be in (0, 1], got {0}")]
    InvalidProbability(f64),
}

pub type Result<T> = std::result::Result<T, SkipListError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SkipListError::InvalidSentinelOperation.to_string(),
            "operation not permitted on the sentinel node"
        );
        assert_eq!(
            SkipListError::NodeNotFound.to_string(),
            "node is not linked into this skip list"
        );
        assert_eq!(
            SkipListError::InvalidProbability(1.5).to_string(),
            "promotion probability must be in (0, 1], got 1.5"
        );
    }
}
