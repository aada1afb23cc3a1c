//! AWS SDK configuration
//!
//! Builds the shared SDK configuration and the STS client used for role
//! assumption, supporting a custom STS endpoint for local testing.

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::Client as StsSdkClient;

use crate::config::Settings;

/// AWS configuration builder
///
/// Creates AWS SDK configuration with support for:
/// - Custom regions
/// - Credential providers (environment, instance profile, etc.)
/// - Custom endpoint URLs for local testing
pub struct AwsConfigBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AwsConfigBuilder<'a> {
    /// Create a new AWS configuration builder
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Build the base AWS SDK configuration
    ///
    /// The credentials resolved here are the caller's own identity, the one
    /// that performs `AssumeRole` on behalf of delivery targets.
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(Region::new(self.settings.aws_region.clone()))
                .or_default_provider();

        aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await
    }

    /// Create an STS client with optional custom endpoint
    ///
    /// If `STS_ENDPOINT_URL` is set in settings, the client will use that
    /// endpoint (useful for LocalStack or moto).
    pub async fn build_sts_client(&self) -> StsSdkClient {
        let sdk_config = self.build_sdk_config().await;

        if let Some(endpoint_url) = &self.settings.sts_endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom STS endpoint");

            let sts_config = aws_sdk_sts::config::Builder::from(&sdk_config)
                .endpoint_url(endpoint_url)
                .build();

            StsSdkClient::from_conf(sts_config)
        } else {
            StsSdkClient::new(&sdk_config)
        }
    }
}

/// Build AWS SDK config from settings (convenience function)
pub async fn build_aws_config(settings: &Settings) -> SdkConfig {
    AwsConfigBuilder::new(settings).build_sdk_config().await
}

/// Create an STS client from settings (convenience function)
pub async fn create_sts_client(settings: &Settings) -> StsSdkClient {
    AwsConfigBuilder::new(settings).build_sts_client().await
}
