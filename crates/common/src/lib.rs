//! Common types, protocol definitions, and errors shared across collector crates.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
