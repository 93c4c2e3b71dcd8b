//! Resolves an inbound request to a `(Principal, Quota)` pair (§4.1
//! AuthResolver): an authenticated API key with its stored quota, or an
//! anonymous IP-derived principal with the process default quota.

mod error;
mod principal;

pub use error::AuthError;
pub use principal::{Principal, Quota};

/// The outcome of [`AuthResolver::resolve`], carried as a request extension
/// from the auth middleware through to the rate limiter.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub principal: Principal,
    pub quota: Quota,
}

use sidecar_kvstore::KvStore;

/// Resolves principals against a `"<blockchain>/api_keys"` hash in the
/// shared KV store.
#[derive(Clone)]
pub struct AuthResolver<S> {
    store: S,
    api_key_hash: String,
    default_quota: Quota,
}

impl<S: KvStore> AuthResolver<S> {
    /// `api_key_hash` is the KV hash name (e.g. `"ethereum/api_keys"`);
    /// `default_quota` is used for every anonymous principal.
    pub fn new(store: S, api_key_hash: impl Into<String>, default_quota: Quota) -> Self {
        Self {
            store,
            api_key_hash: api_key_hash.into(),
            default_quota,
        }
    }

    /// Resolves a request's credentials.
    ///
    /// `query_api_key` and `bearer_token` mirror the two places a key can
    /// arrive; the query parameter wins if both are present. `client_ip` is
    /// the caller's best-effort client address (`x-real-ip` header, falling
    /// back to the transport peer address) and is only consulted when no key
    /// is presented.
    pub async fn resolve(
        &self,
        query_api_key: Option<&str>,
        bearer_token: Option<&str>,
        client_ip: &str,
    ) -> Result<(Principal, Quota), AuthError> {
        let key = query_api_key.filter(|k| !k.is_empty()).or(bearer_token);

        let Some(key) = key else {
            return Ok((Principal::anonymous(client_ip), self.default_quota));
        };

        let stored = self
            .store
            .hget(&self.api_key_hash, key)
            .await
            .map_err(AuthError::Store)?;

        let Some(raw) = stored else {
            #[cfg(feature = "tracing")]
            tracing::debug!(hash = %self.api_key_hash, "api key not found");
            return Err(AuthError::Unauthorized);
        };

        let text = String::from_utf8(raw).map_err(|_| AuthError::MalformedQuota)?;
        let quota = Quota::parse(&text).ok_or(AuthError::MalformedQuota)?;

        Ok((Principal::authenticated(key), quota))
    }
}
