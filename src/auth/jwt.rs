use std::sync::Arc;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    auth::{claims::Claims, repo::CredentialStore, repo_types::User},
    config::{ConfigError, JwtConfig},
    error::AuthError,
    state::AppState,
};

/// Holds JWT signing and verification keys with config data.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: TimeDuration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Result<Self, ConfigError> {
        if cfg.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        if cfg.ttl_minutes <= 0 {
            return Err(ConfigError::Invalid {
                var: "JWT_TTL_MINUTES",
                value: cfg.ttl_minutes.to_string(),
            });
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: TimeDuration::minutes(cfg.ttl_minutes),
        })
    }

    #[cfg(test)]
    pub fn ttl(&self) -> TimeDuration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.issue_at(user_id, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, now: OffsetDateTime) -> anyhow::Result<String> {
        let exp = now + self.ttl;
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id = %user_id, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    /// Checks structure, signature, issuer/audience and expiry, in that order.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub", "iss", "aud"]);
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let mapped = match e.kind() {
                ErrorKind::InvalidSignature
                | ErrorKind::InvalidIssuer
                | ErrorKind::InvalidAudience
                | ErrorKind::InvalidAlgorithm => AuthError::InvalidSignature,
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::MalformedToken,
            };
            debug!(error = %e, "jwt rejected");
            mapped
        })?;

        // jsonwebtoken accepts exp == now; a token is only valid strictly before exp
        if data.claims.exp <= OffsetDateTime::now_utc().unix_timestamp() {
            return Err(AuthError::TokenExpired);
        }
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

/// Resolves a bearer token to an active user.
#[derive(Clone)]
pub struct TokenValidator {
    keys: Arc<JwtKeys>,
    store: Arc<dyn CredentialStore>,
}

impl TokenValidator {
    pub fn new(keys: Arc<JwtKeys>, store: Arc<dyn CredentialStore>) -> Self {
        Self { keys, store }
    }

    /// Read-only: repeated calls with the same token give the same answer
    /// until the token expires or the account is deleted.
    pub async fn validate(&self, token: &str) -> Result<User, AuthError> {
        let claims = self.keys.verify(token)?;
        match self.store.find_by_id(claims.sub).await? {
            Some(user) if user.is_active() => Ok(user),
            Some(_) => {
                warn!(user_id = %claims.sub, "token for deleted account");
                Err(AuthError::UserNotFound)
            }
            None => {
                warn!(user_id = %claims.sub, "token for unknown user");
                Err(AuthError::UserNotFound)
            }
        }
    }
}

impl FromRef<AppState> for TokenValidator {
    fn from_ref(state: &AppState) -> Self {
        TokenValidator::new(state.keys.clone(), state.store.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemoryCredentialStore;
    use crate::auth::repo_types::NewUser;

    fn jwt_config(secret: &str, issuer: &str, audience: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 5,
        }
    }

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&jwt_config(secret, issuer, audience)).expect("keys")
    }

    fn flip_signature(token: &str) -> String {
        let (head, sig) = token.rsplit_once('.').expect("three segments");
        let mut sig: Vec<char> = sig.chars().collect();
        sig[0] = if sig[0] == 'A' { 'B' } else { 'A' };
        format!("{head}.{}", sig.into_iter().collect::<String>())
    }

    async fn store_with_user() -> (Arc<InMemoryCredentialStore>, User) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let user = store
            .insert(NewUser {
                email: "grace@example.com".into(),
                password_hash: "$argon2id$stub".into(),
                full_name: "Grace Hopper".into(),
                college_name: None,
                program: None,
                year_of_study: None,
            })
            .await
            .unwrap();
        (store, user)
    }

    #[test]
    fn empty_secret_is_a_configuration_error() {
        let err = JwtKeys::new(&jwt_config("", "iss", "aud")).err().expect("must fail");
        assert!(matches!(err, ConfigError::MissingSecret));
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let issued = OffsetDateTime::now_utc() - keys.ttl() - TimeDuration::seconds(1);
        let token = keys.issue_at(Uuid::new_v4(), issued).unwrap();
        assert!(matches!(keys.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn flipped_signature_byte_is_rejected() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let token = keys.issue(Uuid::new_v4()).unwrap();
        let tampered = flip_signature(&token);
        assert_ne!(token, tampered);
        assert!(matches!(keys.verify(&tampered), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn other_secret_is_rejected() {
        let ours = make_keys("secret-a", "iss", "aud");
        let theirs = make_keys("secret-b", "iss", "aud");
        let token = theirs.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(ours.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn wrong_issuer_or_audience_is_rejected() {
        let good = make_keys("same-secret", "good-iss", "good-aud");
        let bad = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(bad.verify(&token), Err(AuthError::InvalidSignature)));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys("dev-secret", "iss", "aud");
        for token in ["", "not-a-jwt", "a.b.c", "a.b"] {
            assert!(
                matches!(keys.verify(token), Err(AuthError::MalformedToken)),
                "{token:?}"
            );
        }
    }

    #[tokio::test]
    async fn validator_resolves_user_idempotently() {
        let (store, user) = store_with_user().await;
        let keys = Arc::new(make_keys("dev-secret", "iss", "aud"));
        let validator = TokenValidator::new(keys.clone(), store);
        let token = keys.issue(user.id).unwrap();

        let first = validator.validate(&token).await.unwrap();
        let second = validator.validate(&token).await.unwrap();
        assert_eq!(first.id, user.id);
        assert_eq!(second.id, user.id);
    }

    #[tokio::test]
    async fn validator_rejects_unknown_and_deleted_users() {
        let (store, user) = store_with_user().await;
        let keys = Arc::new(make_keys("dev-secret", "iss", "aud"));
        let validator = TokenValidator::new(keys.clone(), store.clone());

        let stranger = keys.issue(Uuid::new_v4()).unwrap();
        assert!(matches!(validator.validate(&stranger).await, Err(AuthError::UserNotFound)));

        let token = keys.issue(user.id).unwrap();
        store.soft_delete(user.id).await.unwrap();
        assert!(matches!(validator.validate(&token).await, Err(AuthError::UserNotFound)));
    }
}
