//! Resolver error types

use thiserror::Error;

/// Errors surfaced by the service resolver.
///
/// Each error is scoped to the single call that produced it; nothing here is
/// cached, so the next call starts from a clean slate.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Unknown service type: {0}")]
    UnknownDestinationType(String),

    /// The provider-side cause is logged where it happens and deliberately not
    /// carried here.
    #[error("Failed to assume role {role_arn}")]
    RoleAssumption { role_arn: String },

    #[error("Failed to construct {destination_type} client: {source}")]
    ClientConstruction {
        destination_type: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Invalid configuration for {destination_type} adapter: {source}")]
    AdapterConfiguration {
        destination_type: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ResolverError {
    /// Role ARN this error refers to, if any
    pub fn role_arn(&self) -> Option<&str> {
        match self {
            ResolverError::RoleAssumption { role_arn } => Some(role_arn),
            _ => None,
        }
    }

    /// Destination type this error refers to, if any
    pub fn destination_type(&self) -> Option<&str> {
        match self {
            ResolverError::UnknownDestinationType(t) => Some(t),
            ResolverError::ClientConstruction {
                destination_type, ..
            }
            | ResolverError::AdapterConfiguration {
                destination_type, ..
            } => Some(destination_type),
            ResolverError::RoleAssumption { .. } => None,
        }
    }
}

/// Transport failure reported by an adapter's send operation.
///
/// Adapters collapse whatever their SDK returns into this single shape, with a
/// message specific to the destination type. The resolver passes it through
/// untouched.
#[derive(Error, Debug)]
#[error("{destination_type} delivery failed: {message}")]
pub struct DeliveryError {
    pub destination_type: String,
    pub message: String,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl DeliveryError {
    pub fn new(destination_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            destination_type: destination_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying transport error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_names_the_type() {
        let err = ResolverError::UnknownDestinationType("nonexistent-xyz".to_string());
        assert!(err.to_string().contains("nonexistent-xyz"));
        assert_eq!(err.destination_type(), Some("nonexistent-xyz"));
        assert_eq!(err.role_arn(), None);
    }

    #[test]
    fn test_role_assumption_names_the_role() {
        let err = ResolverError::RoleAssumption {
            role_arn: "arn:aws:iam::123456789012:role/delivery".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to assume role arn:aws:iam::123456789012:role/delivery"
        );
        assert_eq!(err.role_arn(), Some("arn:aws:iam::123456789012:role/delivery"));
    }

    #[test]
    fn test_delivery_error_message() {
        let err = DeliveryError::new("queueSvc", "queue does not exist")
            .with_source(anyhow::anyhow!("AWS.SimpleQueueService.NonExistentQueue"));
        assert_eq!(err.to_string(), "queueSvc delivery failed: queue does not exist");
        assert!(err.source.is_some());
    }
}
