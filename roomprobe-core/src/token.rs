//! Capability-token issuance for the room service
//!
//! Tokens are HS256 JWTs scoped to a (room, identity) pair with a fixed
//! grant set. Issuance is pure: no network call, no caching, and two calls
//! with the same arguments produce two independently valid tokens.

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(6 * 60 * 60);

/// Capability grants encoded into an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSet {
    /// Room the grants are scoped to
    pub room: String,
    /// Allow creating the room
    pub room_create: bool,
    /// Allow joining the room
    pub room_join: bool,
    /// Allow recording the room
    pub room_record: bool,
    /// Allow publishing media tracks
    pub can_publish: bool,
    /// Allow publishing data messages
    pub can_publish_data: bool,
    /// Allow subscribing to tracks
    pub can_subscribe: bool,
    /// Allow subscribing to metrics
    pub can_subscribe_metrics: bool,
}

impl GrantSet {
    /// The full grant set the harness issues for every participant
    pub fn full(room: &str) -> Self {
        Self {
            room: room.to_string(),
            room_create: true,
            room_join: true,
            room_record: true,
            can_publish: true,
            can_publish_data: true,
            can_subscribe: true,
            can_subscribe_metrics: true,
        }
    }
}

/// Claims carried by an issued access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer, the API key the token was signed with
    pub iss: String,
    /// Subject, the participant identity
    pub sub: String,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiration, seconds since the epoch
    pub exp: i64,
    /// Capability grants
    pub video: GrantSet,
}

/// Signs access tokens for the room service
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    api_key: String,
    api_secret: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Build an issuer from configuration
    ///
    /// Fails if either signing credential is absent; this is the only point
    /// where missing credentials surface, so configuration loading itself
    /// stays infallible with respect to them.
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProbeError::MissingConfiguration {
                field: "API_KEY".to_string(),
            })?;
        let api_secret =
            config
                .api_secret
                .clone()
                .ok_or_else(|| ProbeError::MissingConfiguration {
                    field: "API_SECRET".to_string(),
                })?;
        Ok(Self {
            api_key,
            api_secret,
            ttl: DEFAULT_TOKEN_TTL,
        })
    }

    /// Build an issuer from explicit credentials
    pub fn new(api_key: &str, api_secret: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            ttl: DEFAULT_TOKEN_TTL,
        }
    }

    /// Issue a signed token for `identity` in `room` carrying the full grant set
    pub fn issue(&self, room: &str, identity: &str) -> Result<String, ProbeError> {
        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
            video: GrantSet::full(room),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.api_secret.as_bytes()),
        )
        .map_err(|e| ProbeError::TokenIssuance {
            reason: e.to_string(),
        })
    }

    /// Decode and verify a token issued with these credentials
    pub fn decode(&self, token: &str) -> Result<TokenClaims, ProbeError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.api_key]);
        decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.api_secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| ProbeError::TokenIssuance {
            reason: format!("token failed verification: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_issuer() -> TokenIssuer {
        TokenIssuer::new("probe-key", "probe-secret-probe-secret")
    }

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let issuer = test_issuer();
        let token = issuer.issue("probe-room", "human").unwrap();

        let claims = issuer.decode(&token).unwrap();
        assert_eq!(claims.iss, "probe-key");
        assert_eq!(claims.sub, "human");
        assert_eq!(claims.video.room, "probe-room");
        assert!(claims.video.room_create);
        assert!(claims.video.can_subscribe_metrics);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_two_issuances_are_independent_with_identical_grants() {
        let issuer = test_issuer();
        let first = issuer.issue("probe-room", "server").unwrap();
        let second = issuer.issue("probe-room", "server").unwrap();

        // Each token decodes on its own and carries the same grant set.
        let first_claims = issuer.decode(&first).unwrap();
        let second_claims = issuer.decode(&second).unwrap();
        assert_eq!(first_claims.video, second_claims.video);
        assert_eq!(first_claims.sub, second_claims.sub);
    }

    #[test]
    fn test_missing_credentials_fail_issuance() {
        let config = ProbeConfig {
            service_url: "wss://rooms.example.com".to_string(),
            api_key: None,
            api_secret: None,
            room_name: "probe-room".to_string(),
            identity: "server".to_string(),
            sample_every: 200,
            memory_report_secs: 30,
            snapshot_dir: None,
            audio_enabled: false,
            wait_secs: None,
        };

        let err = TokenIssuer::from_config(&config).unwrap_err();
        assert_eq!(err.error_code(), "MISSING_CONFIGURATION");
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let issuer = test_issuer();
        let token = issuer.issue("probe-room", "human").unwrap();

        let other = TokenIssuer::new("probe-key", "another-secret-entirely");
        assert!(other.decode(&token).is_err());
    }

    #[test]
    fn test_grant_set_serializes_camel_case() {
        let grants = GrantSet::full("probe-room");
        let json = serde_json::to_string(&grants).unwrap();
        assert!(json.contains("roomCreate"));
        assert!(json.contains("canPublishData"));
        assert!(json.contains("canSubscribeMetrics"));
    }
}
