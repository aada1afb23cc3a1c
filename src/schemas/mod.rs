//! Schema module
//!
//! Contains the input descriptors the resolver consumes.

pub mod target;

pub use target::{load_targets, DeliveryTarget};
