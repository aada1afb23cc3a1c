//! Adapter contract and registration table
//!
//! An adapter knows how to build a client for one destination type and how to
//! push records through it. The resolver only ever constructs clients and hands
//! them back out; everything protocol-specific lives behind [`Adapter`].
//!
//! Adapters are registered into an [`AdapterRegistryBuilder`], configured once
//! with merged global and per-type settings, and frozen into an
//! [`AdapterRegistry`]. The registry can still be extended at runtime with
//! already-configured adapters.

use crate::error::{DeliveryError, ResolverError};
use crate::schemas::DeliveryTarget;
use async_trait::async_trait;
use aws_credential_types::Credentials;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Settings handed to [`Adapter::configure`]
pub type AdapterSettings = Map<String, Value>;

// ============================================================================
// Adapter Contract
// ============================================================================

/// Options passed to client construction
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub region: String,
    /// `None` when the target does not assume a role
    pub credentials: Option<Credentials>,
}

/// Per-call publication ceilings, enforced by the batching layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishLimits {
    pub max_records: usize,
    pub max_bytes: usize,
}

/// Per-destination-type implementation
#[async_trait]
pub trait Adapter<C>: Send + Sync
where
    C: Send + Sync + 'static,
{
    /// Receive merged global and per-type settings
    fn configure(&mut self, _settings: &AdapterSettings) -> anyhow::Result<()> {
        Ok(())
    }

    fn limits(&self) -> Option<PublishLimits> {
        None
    }

    /// Check the destination string of a target; returns a reason on failure
    fn validate_destination(&self, _destination: &str) -> Result<(), String> {
        Ok(())
    }

    /// Force derived settings onto a target (e.g. a fixed collapse mode)
    fn normalize_target(&self, _target: &mut DeliveryTarget) {}

    /// Build a client. Assumed expensive; the resolver pools the result.
    async fn connect(
        &self,
        target: &DeliveryTarget,
        options: &ConnectOptions,
    ) -> anyhow::Result<C>;

    async fn send(
        &self,
        client: &C,
        target: &DeliveryTarget,
        records: &[Value],
    ) -> Result<(), DeliveryError>;
}

// ============================================================================
// Registry
// ============================================================================

/// Collects adapters at startup before they are shared
pub struct AdapterRegistryBuilder<C: Send + Sync + 'static> {
    adapters: Vec<(String, Box<dyn Adapter<C>>)>,
}

impl<C: Send + Sync + 'static> Default for AdapterRegistryBuilder<C> {
    fn default() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }
}

impl<C: Send + Sync + 'static> AdapterRegistryBuilder<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under a destination type, replacing any earlier one
    pub fn register(
        mut self,
        destination_type: impl Into<String>,
        adapter: impl Adapter<C> + 'static,
    ) -> Self {
        let destination_type = destination_type.into();
        self.adapters.retain(|(name, _)| *name != destination_type);
        self.adapters.push((destination_type, Box::new(adapter)));
        self
    }

    /// Run every adapter's configuration hook.
    ///
    /// `global` is applied first and `per_type[destination_type]` on top of
    /// it. Non-object values are ignored.
    pub fn configure(
        mut self,
        global: &Value,
        per_type: &HashMap<String, Value>,
    ) -> Result<Self, ResolverError> {
        for (destination_type, adapter) in self.adapters.iter_mut() {
            let settings = merge_settings(global, per_type.get(destination_type.as_str()));
            adapter
                .configure(&settings)
                .map_err(|source| ResolverError::AdapterConfiguration {
                    destination_type: destination_type.clone(),
                    source,
                })?;
            tracing::debug!(destination_type = %destination_type, "Adapter configured");
        }
        Ok(self)
    }

    pub fn build(self) -> AdapterRegistry<C> {
        AdapterRegistry {
            adapters: self
                .adapters
                .into_iter()
                .map(|(name, adapter)| (name, Arc::from(adapter)))
                .collect(),
        }
    }
}

/// Destination type to adapter mapping
pub struct AdapterRegistry<C: Send + Sync + 'static> {
    adapters: HashMap<String, Arc<dyn Adapter<C>>>,
}

impl<C: Send + Sync + 'static> Default for AdapterRegistry<C> {
    fn default() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }
}

impl<C: Send + Sync + 'static> AdapterRegistry<C> {
    pub fn builder() -> AdapterRegistryBuilder<C> {
        AdapterRegistryBuilder::new()
    }

    pub fn get(&self, destination_type: &str) -> Option<Arc<dyn Adapter<C>>> {
        self.adapters.get(destination_type).cloned()
    }

    pub fn contains(&self, destination_type: &str) -> bool {
        self.adapters.contains_key(destination_type)
    }

    /// Registered destination types, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Add or replace an already-configured adapter
    pub fn register(
        &mut self,
        destination_type: impl Into<String>,
        adapter: Arc<dyn Adapter<C>>,
    ) -> Option<Arc<dyn Adapter<C>>> {
        self.adapters.insert(destination_type.into(), adapter)
    }

    /// Apply the adapter's normalization hook to a target
    pub fn prepare_target(&self, target: &mut DeliveryTarget) -> Result<(), ResolverError> {
        let adapter = self
            .get(&target.destination_type)
            .ok_or_else(|| ResolverError::UnknownDestinationType(target.destination_type.clone()))?;
        adapter.normalize_target(target);
        Ok(())
    }
}

/// Overlay per-type settings on the global ones
pub fn merge_settings(global: &Value, per_type: Option<&Value>) -> AdapterSettings {
    let mut merged = global.as_object().cloned().unwrap_or_default();
    if let Some(Value::Object(overrides)) = per_type {
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}
