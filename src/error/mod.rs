//! Error types

mod types;

pub use types::{DeliveryError, ResolverError};
