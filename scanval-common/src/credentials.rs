//! Expiring credential holder
//!
//! Caches one bearer token issued by a [`TokenSource`]. Expiry is checked on
//! every [`TokenHolder::token`] call; there is no background refresh timer.

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::time::Duration as StdDuration;
use tokio::sync::Mutex;
use tracing::debug;

/// Tokens are refreshed this long before their reported expiry
const DEFAULT_EXPIRY_SKEW: StdDuration = StdDuration::from_secs(60);

/// Longest lifetime honored for a cached token, whatever the issuer reports
const MAX_TOKEN_LIFETIME: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// Token returned by a token endpoint
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Bearer token value
    pub access_token: String,
    /// Lifetime reported by the issuer
    pub valid_for: StdDuration,
}

/// Issuer of bearer tokens (e.g. an OAuth client-credentials endpoint)
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn issue(&self) -> Result<IssuedToken>;
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// Injectable holder for a single expiring credential
pub struct TokenHolder<S: TokenSource> {
    source: S,
    skew: Duration,
    current: Mutex<Option<CachedToken>>,
}

impl<S: TokenSource> TokenHolder<S> {
    pub fn new(source: S) -> Self {
        Self::with_skew(source, DEFAULT_EXPIRY_SKEW)
    }

    pub fn with_skew(source: S, skew: StdDuration) -> Self {
        Self {
            source,
            skew: Duration::from_std(skew).unwrap_or_else(|_| Duration::zero()),
            current: Mutex::new(None),
        }
    }

    /// Return a valid token, refreshing it first if expired or missing
    ///
    /// Concurrent callers wait on the same refresh rather than issuing their own.
    pub async fn token(&self) -> Result<String> {
        let mut current = self.current.lock().await;
        let now = Utc::now();

        if let Some(cached) = current.as_ref() {
            if cached.expires_at - self.skew > now {
                return Ok(cached.value.clone());
            }
            debug!("Cached token expired, refreshing");
        }

        let issued = self.source.issue().await?;
        let lifetime = Duration::from_std(issued.valid_for.min(MAX_TOKEN_LIFETIME))
            .unwrap_or_else(|_| Duration::zero());
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| Error::Credential("Token lifetime out of range".to_string()))?;
        *current = Some(CachedToken {
            value: issued.access_token.clone(),
            expires_at,
        });

        Ok(issued.access_token)
    }

    /// Drop the cached token so the next call refreshes (e.g. after a 401)
    pub async fn invalidate(&self) {
        *self.current.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingSource {
        issued: Arc<AtomicUsize>,
        valid_for: StdDuration,
        fail: bool,
    }

    #[async_trait]
    impl TokenSource for CountingSource {
        async fn issue(&self) -> Result<IssuedToken> {
            if self.fail {
                return Err(Error::Credential("token endpoint rejected client".to_string()));
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedToken {
                access_token: format!("token-{}", n),
                valid_for: self.valid_for,
            })
        }
    }

    fn holder(valid_for: StdDuration) -> (TokenHolder<CountingSource>, Arc<AtomicUsize>) {
        let issued = Arc::new(AtomicUsize::new(0));
        let source = CountingSource {
            issued: Arc::clone(&issued),
            valid_for,
            fail: false,
        };
        (TokenHolder::new(source), issued)
    }

    #[tokio::test]
    async fn test_token_reused_while_valid() {
        let (holder, issued) = holder(StdDuration::from_secs(3600));

        assert_eq!(holder.token().await.unwrap(), "token-1");
        assert_eq!(holder.token().await.unwrap(), "token-1");
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_token_refreshed_on_use() {
        // Lifetime shorter than the skew margin counts as already expired
        let (holder, issued) = holder(StdDuration::from_secs(30));

        assert_eq!(holder.token().await.unwrap(), "token-1");
        assert_eq!(holder.token().await.unwrap(), "token-2");
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_huge_reported_lifetime_is_capped() {
        let (holder, issued) = holder(StdDuration::from_secs(10_000_000_000_000));

        assert_eq!(holder.token().await.unwrap(), "token-1");
        assert_eq!(holder.token().await.unwrap(), "token-1");
        assert_eq!(issued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let (holder, issued) = holder(StdDuration::from_secs(3600));

        holder.token().await.unwrap();
        holder.invalidate().await;
        assert_eq!(holder.token().await.unwrap(), "token-2");
        assert_eq!(issued.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_issue_failure_propagates() {
        let source = CountingSource {
            issued: Arc::new(AtomicUsize::new(0)),
            valid_for: StdDuration::from_secs(3600),
            fail: true,
        };
        let holder = TokenHolder::new(source);

        assert!(matches!(holder.token().await, Err(Error::Credential(_))));
    }
}
