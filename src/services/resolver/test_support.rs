//! Test doubles for the resolver

use crate::error::DeliveryError;
use crate::schemas::DeliveryTarget;
use crate::services::adapter::{Adapter, ConnectOptions};
use crate::services::sts::{AssumeRoleRequest, RoleAssumer};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

/// Records every request; hands out numbered credentials
#[derive(Default)]
pub struct MockAssumer {
    requests: Mutex<Vec<AssumeRoleRequest>>,
    failures_left: AtomicUsize,
    rendezvous: Option<Barrier>,
}

impl MockAssumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `failures` calls
    pub fn failing(failures: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(failures),
            ..Self::default()
        }
    }

    /// Hold every call until `n` calls are in flight together
    pub fn with_rendezvous(n: usize) -> Self {
        Self {
            rendezvous: Some(Barrier::new(n)),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<AssumeRoleRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RoleAssumer for MockAssumer {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> anyhow::Result<Credentials> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            anyhow::bail!("AccessDenied: not authorized to perform sts:AssumeRole");
        }

        Ok(Credentials::new(
            format!("ASIAMOCK{}", call),
            "mock-secret",
            Some("mock-token".to_string()),
            None,
            "mock",
        ))
    }
}

/// What a [`CountingAdapter`] builds
#[derive(Debug)]
pub struct TestClient {
    pub id: usize,
    pub region: String,
    pub access_key_id: Option<String>,
}

/// Builds a fresh numbered client on every connect and counts sends
#[derive(Default)]
pub struct CountingAdapter {
    pub built: Arc<AtomicUsize>,
    pub sent: Arc<AtomicUsize>,
    pub fail_connect: bool,
}

impl CountingAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl Adapter<TestClient> for CountingAdapter {
    async fn connect(
        &self,
        target: &DeliveryTarget,
        options: &ConnectOptions,
    ) -> anyhow::Result<TestClient> {
        if self.fail_connect {
            anyhow::bail!("cannot reach {}", target.destination);
        }
        let id = self.built.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(TestClient {
            id,
            region: options.region.clone(),
            access_key_id: options
                .credentials
                .as_ref()
                .map(|c| c.access_key_id().to_string()),
        })
    }

    async fn send(
        &self,
        _client: &TestClient,
        target: &DeliveryTarget,
        records: &[Value],
    ) -> Result<(), DeliveryError> {
        if target.destination == "unreachable" {
            return Err(DeliveryError::new(&target.destination_type, "connection refused"));
        }
        self.sent.fetch_add(records.len(), Ordering::SeqCst);
        Ok(())
    }
}
