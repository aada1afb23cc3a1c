//! Role assumption through AWS STS
//!
//! The resolver talks to the impersonation service only through the
//! [`RoleAssumer`] trait, so tests and alternative providers can stand in for
//! STS.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_sts::Client as StsSdkClient;
use std::time::SystemTime;

/// Provider name stamped on credentials obtained from STS
const PROVIDER_NAME: &str = "DestinationResolverAssumeRole";

/// Parameters of a single `AssumeRole` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssumeRoleRequest {
    pub role_arn: String,
    pub role_session_name: String,
    pub duration_seconds: i32,
    pub external_id: Option<String>,
}

/// Something that can trade the caller's identity for temporary credentials
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<Credentials>;
}

/// [`RoleAssumer`] backed by the AWS STS SDK client
#[derive(Clone)]
pub struct StsRoleAssumer {
    client: StsSdkClient,
}

impl StsRoleAssumer {
    pub fn new(client: StsSdkClient) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying AWS SDK client
    pub fn client(&self) -> &StsSdkClient {
        &self.client
    }
}

#[async_trait]
impl RoleAssumer for StsRoleAssumer {
    async fn assume_role(&self, request: &AssumeRoleRequest) -> Result<Credentials> {
        tracing::debug!(
            role_arn = %request.role_arn,
            session_name = %request.role_session_name,
            duration_seconds = request.duration_seconds,
            external_id = request.external_id.is_some(),
            "Calling AWS STS AssumeRole"
        );

        let response = self
            .client
            .assume_role()
            .role_arn(&request.role_arn)
            .role_session_name(&request.role_session_name)
            .duration_seconds(request.duration_seconds)
            .set_external_id(request.external_id.clone())
            .send()
            .await
            .context("AWS STS AssumeRole call failed")?;

        let sts_creds = response
            .credentials()
            .context("AWS STS returned no credentials")?;

        let expiry = SystemTime::try_from(*sts_creds.expiration()).ok();

        Ok(Credentials::new(
            sts_creds.access_key_id(),
            sts_creds.secret_access_key(),
            Some(sts_creds.session_token().to_string()),
            expiry,
            PROVIDER_NAME,
        ))
    }
}
