//! Credential sessions
//!
//! One [`RoleSession`] per role ARN, each owning the client pools built with
//! its credentials. A session is replaced wholesale when it expires; the pools
//! of the replaced session go with it.

use super::lock;
use super::pool::{ClientPool, PoolKey};
use crate::config::ResolverConfig;
use crate::error::ResolverError;
use crate::services::sts::{AssumeRoleRequest, RoleAssumer};
use aws_credential_types::Credentials;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Role ARN sentinel for targets that do not impersonate anyone
pub const NO_ROLE: &str = "none";

/// Map an absent or empty role ARN to [`NO_ROLE`]
pub fn normalize_role_arn(role_arn: Option<&str>) -> &str {
    match role_arn {
        Some(arn) if !arn.is_empty() => arn,
        _ => NO_ROLE,
    }
}

// ============================================================================
// Role Session
// ============================================================================

pub struct RoleSession<C> {
    role_arn: String,
    credentials: Option<Credentials>,
    /// `None` never expires
    expires_at: Option<Instant>,
    pools: Mutex<HashMap<PoolKey, Arc<ClientPool<C>>>>,
}

impl<C> RoleSession<C> {
    /// The permanent session used without impersonation
    pub(crate) fn anonymous() -> Self {
        Self {
            role_arn: NO_ROLE.to_string(),
            credentials: None,
            expires_at: None,
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn assumed(role_arn: &str, credentials: Credentials, expires_at: Instant) -> Self {
        Self {
            role_arn: role_arn.to_string(),
            credentials: Some(credentials),
            expires_at: Some(expires_at),
            pools: Mutex::new(HashMap::new()),
        }
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Time left before a refresh is forced; `None` for sessions that never
    /// expire
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Pop an idle client for `key` together with the pool it came from
    pub(crate) fn checkout(&self, key: &PoolKey) -> Option<(Arc<ClientPool<C>>, C)> {
        let pool = lock(&self.pools).get(key).cloned()?;
        let client = pool.checkout()?;
        Some((pool, client))
    }

    /// The pool for `key`, created on first use
    pub(crate) fn pool(&self, key: &PoolKey) -> Arc<ClientPool<C>> {
        lock(&self.pools)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(ClientPool::new(key.clone())))
            .clone()
    }

    pub fn pool_count(&self) -> usize {
        lock(&self.pools).len()
    }

    pub fn idle_clients(&self) -> usize {
        lock(&self.pools).values().map(|pool| pool.idle_count()).sum()
    }
}

impl<C> std::fmt::Debug for RoleSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleSession")
            .field("role_arn", &self.role_arn)
            .field("has_credentials", &self.credentials.is_some())
            .field("expires_at", &self.expires_at)
            .field("pools", &self.pool_count())
            .finish()
    }
}

// ============================================================================
// Credential Cache
// ============================================================================

/// Role ARN to session map, refreshed through a [`RoleAssumer`].
///
/// This is a best-effort cache, not single-flight: concurrent misses for the
/// same role each call the assumer, and whichever response lands last keeps
/// the slot. Failures are never cached.
pub struct CredentialCache<C> {
    config: ResolverConfig,
    assumer: Arc<dyn RoleAssumer>,
    sessions: Mutex<HashMap<String, Arc<RoleSession<C>>>>,
}

impl<C> CredentialCache<C> {
    pub fn new(config: ResolverConfig, assumer: Arc<dyn RoleAssumer>) -> Self {
        let cache = Self {
            config,
            assumer,
            sessions: Mutex::new(HashMap::new()),
        };
        cache.reset();
        cache
    }

    /// Session for `role_arn`, assuming the role if nothing valid is cached.
    ///
    /// Only a cache miss suspends.
    pub async fn resolve(
        &self,
        role_arn: Option<&str>,
        external_id: Option<&str>,
    ) -> Result<Arc<RoleSession<C>>, ResolverError> {
        let role_arn = normalize_role_arn(role_arn);

        if role_arn == NO_ROLE {
            return Ok(self.anonymous());
        }

        if let Some(session) = self.cached(role_arn) {
            return Ok(session);
        }

        let request = AssumeRoleRequest {
            role_arn: role_arn.to_string(),
            role_session_name: self.config.role_session_name.clone(),
            duration_seconds: self.config.session_duration_seconds,
            external_id: external_id.filter(|id| !id.is_empty()).map(str::to_string),
        };

        // Measured before the call so expiry can only come early
        let assumed_at = Instant::now();
        let credentials = match self.assumer.assume_role(&request).await {
            Ok(credentials) => credentials,
            Err(err) => {
                tracing::warn!(role_arn = %role_arn, error = ?err, "Role assumption failed");
                return Err(ResolverError::RoleAssumption {
                    role_arn: role_arn.to_string(),
                });
            }
        };

        let session = Arc::new(RoleSession::assumed(
            role_arn,
            credentials,
            assumed_at + self.config.session_lifetime(),
        ));

        let previous = lock(&self.sessions).insert(role_arn.to_string(), session.clone());

        tracing::info!(
            role_arn = %role_arn,
            lifetime_secs = self.config.session_lifetime().as_secs(),
            "Assumed role"
        );
        if let Some(previous) = previous {
            tracing::debug!(
                role_arn = %role_arn,
                discarded_clients = previous.idle_clients(),
                "Replaced role session"
            );
        }

        Ok(session)
    }

    /// Valid cached session for `role_arn`, if any
    pub fn cached(&self, role_arn: &str) -> Option<Arc<RoleSession<C>>> {
        lock(&self.sessions)
            .get(role_arn)
            .filter(|session| !session.is_expired())
            .cloned()
    }

    fn anonymous(&self) -> Arc<RoleSession<C>> {
        lock(&self.sessions)
            .entry(NO_ROLE.to_string())
            .or_insert_with(|| Arc::new(RoleSession::anonymous()))
            .clone()
    }

    /// Drop every session and pool, leaving only a fresh anonymous session
    pub fn reset(&self) {
        let mut sessions = lock(&self.sessions);
        sessions.clear();
        sessions.insert(NO_ROLE.to_string(), Arc::new(RoleSession::anonymous()));
    }

    pub fn sessions(&self) -> Vec<Arc<RoleSession<C>>> {
        lock(&self.sessions).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.sessions).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::resolver::test_support::MockAssumer;

    const ROLE: &str = "arn:aws:iam::123456789012:role/delivery";

    fn cache(assumer: Arc<MockAssumer>) -> CredentialCache<()> {
        CredentialCache::new(ResolverConfig::default(), assumer)
    }

    #[test]
    fn test_normalize_role_arn() {
        assert_eq!(normalize_role_arn(None), NO_ROLE);
        assert_eq!(normalize_role_arn(Some("")), NO_ROLE);
        assert_eq!(normalize_role_arn(Some(ROLE)), ROLE);
    }

    #[tokio::test]
    async fn test_no_role_needs_no_assumption() {
        let assumer = Arc::new(MockAssumer::new());
        let cache = cache(assumer.clone());

        let first = cache.resolve(None, None).await.unwrap();
        let second = cache.resolve(Some(""), Some("ignored")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.role_arn(), NO_ROLE);
        assert!(first.credentials().is_none());
        assert!(first.remaining().is_none());
        assert_eq!(assumer.calls(), 0);
    }

    #[tokio::test]
    async fn test_request_carries_configured_values() {
        let assumer = Arc::new(MockAssumer::new());
        let cache = CredentialCache::<()>::new(
            ResolverConfig {
                role_session_name: "Delivery".to_string(),
                session_duration_seconds: 3600,
                ..ResolverConfig::default()
            },
            assumer.clone(),
        );

        cache.resolve(Some(ROLE), Some("ext-Id/42")).await.unwrap();

        let requests = assumer.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0],
            AssumeRoleRequest {
                role_arn: ROLE.to_string(),
                role_session_name: "Delivery".to_string(),
                duration_seconds: 3600,
                external_id: Some("ext-Id/42".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_external_id_is_omitted() {
        let assumer = Arc::new(MockAssumer::new());
        let cache = cache(assumer.clone());

        cache.resolve(Some(ROLE), Some("")).await.unwrap();
        assert_eq!(assumer.requests()[0].external_id, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration_is_five_seconds_early() {
        let assumer = Arc::new(MockAssumer::new());
        let cache = cache(assumer.clone());

        let session = cache.resolve(Some(ROLE), None).await.unwrap();
        assert_eq!(session.remaining(), Some(Duration::from_secs(895)));
        assert_eq!(
            session.credentials().unwrap().access_key_id(),
            "ASIAMOCK1"
        );

        tokio::time::advance(Duration::from_secs(894)).await;
        let cached = cache.resolve(Some(ROLE), None).await.unwrap();
        assert!(Arc::ptr_eq(&session, &cached));
        assert_eq!(assumer.calls(), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(session.is_expired());
        let refreshed = cache.resolve(Some(ROLE), None).await.unwrap();
        assert!(!Arc::ptr_eq(&session, &refreshed));
        assert_eq!(assumer.calls(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached() {
        let assumer = Arc::new(MockAssumer::failing(1));
        let cache = cache(assumer.clone());

        let err = cache.resolve(Some(ROLE), None).await.unwrap_err();
        assert_eq!(err.role_arn(), Some(ROLE));
        assert!(!err.to_string().contains("AccessDenied"));
        assert!(cache.cached(ROLE).is_none());
        assert_eq!(cache.len(), 1);

        let session = cache.resolve(Some(ROLE), None).await.unwrap();
        assert_eq!(session.role_arn(), ROLE);
        assert_eq!(assumer.calls(), 2);
    }

    #[tokio::test]
    async fn test_reset_drops_sessions() {
        let assumer = Arc::new(MockAssumer::new());
        let cache = cache(assumer.clone());

        let anonymous = cache.resolve(None, None).await.unwrap();
        cache.resolve(Some(ROLE), None).await.unwrap();
        assert_eq!(cache.len(), 2);

        cache.reset();
        assert_eq!(cache.len(), 1);
        assert!(cache.cached(ROLE).is_none());

        let fresh = cache.resolve(None, None).await.unwrap();
        assert!(!Arc::ptr_eq(&anonymous, &fresh));
    }
}
