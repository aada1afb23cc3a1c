//! Leased clients

use super::pool::{ClientPool, PoolKey};
use crate::error::DeliveryError;
use crate::schemas::DeliveryTarget;
use crate::services::adapter::Adapter;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A client checked out of a pool.
///
/// The client goes back to the pool it came from when the handle is disposed
/// or dropped. If that pool belongs to a session that has since been
/// replaced, the return is harmless and the client is simply lost with the
/// old session.
pub struct ClientHandle<C: Send + Sync + 'static> {
    adapter: Arc<dyn Adapter<C>>,
    // Some until the handle is consumed
    client: Option<C>,
    pool: Arc<ClientPool<C>>,
    role_arn: String,
}

impl<C: Send + Sync + 'static> ClientHandle<C> {
    pub(crate) fn new(
        adapter: Arc<dyn Adapter<C>>,
        client: C,
        pool: Arc<ClientPool<C>>,
        role_arn: &str,
    ) -> Self {
        Self {
            adapter,
            client: Some(client),
            pool,
            role_arn: role_arn.to_string(),
        }
    }

    pub fn client(&self) -> &C {
        self.client
            .as_ref()
            .expect("client is present until the handle is consumed")
    }

    pub fn adapter(&self) -> &Arc<dyn Adapter<C>> {
        &self.adapter
    }

    pub fn pool_key(&self) -> &PoolKey {
        self.pool.key()
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    /// Deliver records through this handle's adapter and client
    pub async fn send(
        &self,
        target: &DeliveryTarget,
        records: &[Value],
    ) -> Result<(), DeliveryError> {
        self.adapter.send(self.client(), target, records).await
    }

    /// Return the client to its pool
    pub fn dispose(self) {
        drop(self);
    }

    /// Drop the client instead of returning it, for clients known to be broken
    pub fn discard(mut self) {
        if self.client.take().is_some() {
            tracing::debug!(pool_key = %self.pool.key(), "Discarded pooled client");
        }
    }
}

impl<C: Send + Sync + 'static> Drop for ClientHandle<C> {
    fn drop(&mut self) {
        if let Some(client) = self.client.take() {
            self.pool.release(client);
        }
    }
}

impl<C: Send + Sync + 'static> fmt::Debug for ClientHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientHandle")
            .field("pool_key", self.pool.key())
            .field("role_arn", &self.role_arn)
            .finish()
    }
}
