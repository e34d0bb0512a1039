use crate::Op;

/// Failure of a logical lock operation.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Neither the primary nor the backup answered. The client stays usable;
    /// trying again is a new operation with a new request number.
    #[error("lock service unavailable: {op} {lockname:?} (request {req_id}) reached neither primary nor backup")]
    Unavailable {
        /// Operation that failed.
        op: Op,
        /// Lock it was for.
        lockname: String,
        /// Request number it consumed.
        req_id: i64,
    },
}

/// Result of a logical lock operation.
pub type Result<T> = std::result::Result<T, Error>;
