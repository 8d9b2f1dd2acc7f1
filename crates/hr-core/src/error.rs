use thiserror::Error;

/// Common error the crate-specific errors convert into.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HrError {
    #[error("Invariant violated: {what}")]
    Invariant { what: String },
}
