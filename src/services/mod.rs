//! Services module
//!
//! Contains the resolver, the adapter contract and the STS integration.

pub mod adapter;
pub mod resolver;
pub mod sts;

pub use adapter::{
    merge_settings, Adapter, AdapterRegistry, AdapterRegistryBuilder, AdapterSettings,
    ConnectOptions, PublishLimits,
};
pub use resolver::{
    ClientHandle, ClientPool, CredentialCache, PoolKey, ResolverStats, RoleSession,
    ServiceResolver, NO_ROLE,
};
pub use sts::{AssumeRoleRequest, RoleAssumer, StsRoleAssumer};
