use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Failure taxonomy of the document store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection, transport or server-selection failure. Fatal: the
    /// remaining catalog is aborted.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected a filter or pipeline. Unreachable with the fixed
    /// catalog; a programming defect, fatal.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// An insert was rejected by store-side schema or uniqueness rules.
    /// Fatal for that step only.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored document or aggregation row did not decode into the
    /// expected shape.
    #[error("malformed document: {0}")]
    Decode(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A catalog step that failed, with the underlying cause.
#[derive(Error, Debug)]
#[error("step '{step}': {error}")]
pub struct StepFailure {
    pub step: &'static str,
    pub error: StoreError,
}

impl Serialize for StepFailure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StepFailure", 2)?;
        state.serialize_field("step", self.step)?;
        state.serialize_field("error", &self.error.to_string())?;
        state.end()
    }
}
