//! Destination Service Resolver
//!
//! Hands out ready-to-use clients for delivery targets. Two caches sit behind
//! [`ServiceResolver::get`]:
//!
//! - a credential cache holding one [`RoleSession`] per assumed role, refreshed
//!   through STS shortly before the credentials run out
//! - per-session client pools keyed by region, destination type and endpoint,
//!   so a client built once is reused for later deliveries to the same place
//!
//! # Example
//! ```ignore
//! let resolver = ServiceResolver::new(config, assumer, registry);
//!
//! let handle = resolver.get(&target).await?;
//! handle.send(&target, &records).await?;
//! handle.dispose();
//! ```

mod handle;
mod pool;
mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use handle::ClientHandle;
pub use pool::{ClientPool, PoolKey};
pub use session::{normalize_role_arn, CredentialCache, RoleSession, NO_ROLE};

use crate::config::{create_sts_client, ResolverConfig, Settings};
use crate::error::ResolverError;
use crate::schemas::DeliveryTarget;
use crate::services::adapter::{Adapter, AdapterRegistry, ConnectOptions};
use crate::services::sts::{RoleAssumer, StsRoleAssumer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Lock a mutex, carrying on past poisoning. Pool and session maps stay
/// consistent across a panic since every critical section is a single
/// insert, remove or pop.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverStats {
    /// Cached role sessions, including the anonymous one
    pub sessions: usize,
    pub pools: usize,
    pub idle_clients: usize,
}

/// Resolves delivery targets to pooled clients.
///
/// Construct once and share by reference (or `Arc`). All state lives in the
/// instance; [`ServiceResolver::reset`] clears it.
pub struct ServiceResolver<C: Send + Sync + 'static> {
    config: ResolverConfig,
    credentials: CredentialCache<C>,
    registry: RwLock<AdapterRegistry<C>>,
}

impl<C: Send + Sync + 'static> ServiceResolver<C> {
    pub fn new(
        config: ResolverConfig,
        assumer: Arc<dyn RoleAssumer>,
        registry: AdapterRegistry<C>,
    ) -> Self {
        Self {
            credentials: CredentialCache::new(config.clone(), assumer),
            config,
            registry: RwLock::new(registry),
        }
    }

    /// Build a resolver that assumes roles through the real STS endpoint
    pub async fn from_settings(settings: &Settings, registry: AdapterRegistry<C>) -> Self {
        let assumer = StsRoleAssumer::new(create_sts_client(settings).await);
        Self::new(settings.resolver_config(), Arc::new(assumer), registry)
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Check out a client for `target`.
    ///
    /// Suspends only to assume the target's role on a credential cache miss
    /// and to construct a client on a pool miss. Nothing is retried; failed
    /// role assumptions are not remembered, so the next call tries again.
    pub async fn get(&self, target: &DeliveryTarget) -> Result<ClientHandle<C>, ResolverError> {
        let adapter = self
            .adapter(&target.destination_type)
            .ok_or_else(|| ResolverError::UnknownDestinationType(target.destination_type.clone()))?;

        let session = self
            .credentials
            .resolve(target.role(), target.external_id())
            .await?;

        let key = self.pool_key(target);

        if let Some((pool, client)) = session.checkout(&key) {
            tracing::debug!(
                target_id = %target.id,
                pool_key = %key,
                role_arn = %session.role_arn(),
                "Reusing pooled client"
            );
            return Ok(ClientHandle::new(adapter, client, pool, session.role_arn()));
        }

        let options = ConnectOptions {
            region: self.region_for(target).to_string(),
            credentials: session.credentials().cloned(),
        };

        tracing::debug!(
            target_id = %target.id,
            pool_key = %key,
            role_arn = %session.role_arn(),
            "Constructing client"
        );

        let client = adapter.connect(target, &options).await.map_err(|source| {
            ResolverError::ClientConstruction {
                destination_type: target.destination_type.clone(),
                source,
            }
        })?;

        Ok(ClientHandle::new(
            adapter,
            client,
            session.pool(&key),
            session.role_arn(),
        ))
    }

    /// Credential session for a role, assuming it if needed
    pub async fn resolve_session(
        &self,
        role_arn: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Arc<RoleSession<C>>, ResolverError> {
        self.credentials.resolve(role_arn, external_id).await
    }

    pub fn pool_key(&self, target: &DeliveryTarget) -> PoolKey {
        PoolKey::new(
            self.region_for(target),
            &target.destination_type,
            target.endpoint(),
        )
    }

    fn region_for<'a>(&'a self, target: &'a DeliveryTarget) -> &'a str {
        target.region().unwrap_or(&self.config.default_region)
    }

    /// Current adapter for a destination type
    pub fn adapter(&self, destination_type: &str) -> Option<Arc<dyn Adapter<C>>> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(destination_type)
    }

    /// Add or replace an adapter. Later checkouts, pooled or not, use it.
    pub fn register_adapter(
        &self,
        destination_type: impl Into<String>,
        adapter: Arc<dyn Adapter<C>>,
    ) {
        let destination_type = destination_type.into();
        tracing::info!(destination_type = %destination_type, "Registering adapter");
        self.registry
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .register(destination_type, adapter);
    }

    /// Apply the registered adapter's normalization hook to a target
    pub fn prepare_target(&self, target: &mut DeliveryTarget) -> Result<(), ResolverError> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .prepare_target(target)
    }

    pub fn adapter_types(&self) -> Vec<String> {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .types()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Forget every session and pooled client
    pub fn reset(&self) {
        self.credentials.reset();
        tracing::debug!("Resolver caches reset");
    }

    pub fn stats(&self) -> ResolverStats {
        let sessions = self.credentials.sessions();
        ResolverStats {
            sessions: sessions.len(),
            pools: sessions.iter().map(|s| s.pool_count()).sum(),
            idle_clients: sessions.iter().map(|s| s.idle_clients()).sum(),
        }
    }
}
