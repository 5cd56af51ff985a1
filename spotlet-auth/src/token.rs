//! Token endpoint response and persisted credential

use crate::error::{AuthError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use spotlet_common::store::{
    CredentialStore, ACCESS_TOKEN_KEY, EXPIRATION_DATE_KEY, REFRESH_TOKEN_KEY,
};
use spotlet_common::Error;

/// Body of a successful code exchange or refresh
///
/// Providers may omit `refresh_token` on refresh; the previous one then
/// stays valid.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub scope: String,
    pub token_type: String,
}

/// Snapshot of the persisted credential
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry; `None` when never recorded
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    /// True when `now + threshold` reaches the expiry instant
    ///
    /// A credential without a recorded expiry never asks for a refresh.
    pub fn needs_refresh(&self, now: DateTime<Utc>, threshold: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now
                .checked_add_signed(threshold)
                .map_or(true, |horizon| horizon >= expires_at),
            None => false,
        }
    }

    /// Read the credential; `None` when no access token is stored
    pub fn load(store: &dyn CredentialStore) -> Result<Option<Self>> {
        let Some(access_token) = store.get(ACCESS_TOKEN_KEY)? else {
            return Ok(None);
        };
        let refresh_token = store.get(REFRESH_TOKEN_KEY)?;
        let expires_at = store
            .get(EXPIRATION_DATE_KEY)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| {
                        Error::InvalidInput(format!("stored expiration date {:?}: {}", raw, e))
                    })
            })
            .transpose()?;

        Ok(Some(Self {
            access_token,
            refresh_token,
            expires_at,
        }))
    }

    /// Persist a token response received at `now`
    ///
    /// All keys are written in one store call. A missing `refresh_token`
    /// leaves the stored one untouched. Nothing is written when the
    /// lifetime puts the expiry out of range.
    pub fn store_response(
        store: &dyn CredentialStore,
        response: &TokenResponse,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let expires_at = Self::expiry_from(now, response.expires_in)?.to_rfc3339();

        let mut pairs = vec![
            (ACCESS_TOKEN_KEY, response.access_token.as_str()),
            (EXPIRATION_DATE_KEY, expires_at.as_str()),
        ];
        if let Some(refresh_token) = response.refresh_token.as_deref() {
            pairs.push((REFRESH_TOKEN_KEY, refresh_token));
        }

        store.set_many(&pairs)?;
        Ok(())
    }

    fn expiry_from(now: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
        Duration::try_seconds(expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                AuthError::InvalidResponse(format!("expires_in {} out of range", expires_in))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlet_common::MemoryStore;

    fn response(refresh_token: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "access".to_string(),
            expires_in: 3600,
            refresh_token: refresh_token.map(str::to_string),
            scope: "user-read-private".to_string(),
            token_type: "Bearer".to_string(),
        }
    }

    #[test]
    fn test_decode_without_refresh_token() {
        let body = r#"{"access_token":"a","expires_in":3600,"scope":"s","token_type":"Bearer"}"#;
        let decoded: TokenResponse = serde_json::from_str(body).unwrap();
        assert_eq!(decoded.refresh_token, None);
        assert_eq!(decoded.expires_in, 3600);
    }

    #[test]
    fn test_decode_rejects_missing_access_token() {
        let body = r#"{"expires_in":3600,"scope":"s","token_type":"Bearer"}"#;
        assert!(serde_json::from_str::<TokenResponse>(body).is_err());
    }

    #[test]
    fn test_threshold_boundary() {
        let now = Utc::now();
        let threshold = Duration::seconds(300);
        let credential = |secs: i64| Credential {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(now + Duration::seconds(secs)),
        };

        assert!(!credential(301).needs_refresh(now, threshold));
        assert!(credential(300).needs_refresh(now, threshold));
        assert!(credential(299).needs_refresh(now, threshold));
        assert!(credential(-10).needs_refresh(now, threshold));
    }

    #[test]
    fn test_missing_expiry_never_refreshes() {
        let credential = Credential {
            access_token: "a".to_string(),
            refresh_token: Some("r".to_string()),
            expires_at: None,
        };
        assert!(!credential.needs_refresh(Utc::now(), Duration::seconds(300)));
    }

    #[test]
    fn test_store_response_keeps_previous_refresh_token() {
        let store = MemoryStore::new();
        let now = Utc::now();

        Credential::store_response(&store, &response(Some("first")), now).unwrap();
        Credential::store_response(&store, &response(None), now).unwrap();

        let credential = Credential::load(&store).unwrap().unwrap();
        assert_eq!(credential.refresh_token.as_deref(), Some("first"));
        let expected = now + Duration::seconds(3600);
        let stored = credential.expires_at.unwrap();
        assert!((stored - expected).num_seconds().abs() <= 1);
    }

    #[test]
    fn test_out_of_range_lifetime_is_not_stored() {
        let store = MemoryStore::new();
        let mut huge = response(Some("r"));
        huge.expires_in = i64::MAX;

        let result = Credential::store_response(&store, &huge, Utc::now());

        assert!(matches!(result, Err(AuthError::InvalidResponse(_))));
        assert_eq!(Credential::load(&store).unwrap(), None);
        assert_eq!(store.get(REFRESH_TOKEN_KEY).unwrap(), None);
    }

    #[test]
    fn test_unbounded_threshold_means_stale() {
        let credential = Credential {
            access_token: "a".to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::days(365)),
        };
        assert!(credential.needs_refresh(Utc::now(), Duration::MAX));
    }

    #[test]
    fn test_load_signed_out() {
        let store = MemoryStore::new();
        assert_eq!(Credential::load(&store).unwrap(), None);
    }
}
