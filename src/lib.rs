//! Destination service resolver library
//!
//! Caches assumed-role credential sessions and pools per-destination clients
//! so repeated deliveries skip re-authentication and client construction.

// Public modules
pub mod config;
pub mod error;
pub mod logging;
pub mod schemas;
pub mod services;

// Re-export commonly used types
pub use config::{ResolverConfig, Settings};
pub use error::{DeliveryError, ResolverError};
pub use schemas::DeliveryTarget;
pub use services::{Adapter, AdapterRegistry, ClientHandle, ServiceResolver};
