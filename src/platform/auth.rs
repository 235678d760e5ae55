use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task;
use utoipa::ToSchema;

use crate::{
    domain::roles::Role,
    platform::{app_error::AppError, config::AuthConfig},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password hashing failed")]
    HashingError,
    #[error("Password verification failed")]
    VerificationError,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Token creation failed")]
    TokenCreationError,
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::InvalidOrExpiredToken => {
                AppError::Unauthorized(err.to_string())
            }
            err => AppError::Other(err.into()),
        }
    }
}

/// The resolved actor attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuthUser {
    /// Absent for the built-in admin and owner accounts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub email: String,
    #[schema(value_type = Object)]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// JWT payload. Claims are frozen at login and never refreshed from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionClaims {
    #[serde(flatten)]
    pub user: AuthUser,
    pub iat: i64,
    pub exp: i64,
}

pub struct TokenService<'a> {
    config: &'a AuthConfig,
}

impl<'a> TokenService<'a> {
    pub fn new(config: &'a AuthConfig) -> Self {
        Self { config }
    }

    pub fn issue(&self, user: AuthUser) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = SessionClaims {
            user,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.token_ttl_hours)).timestamp(),
        };

        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|err| {
            tracing::error!("Token creation error: {:?}", err);
            AuthError::TokenCreationError
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        jsonwebtoken::decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!("Token rejected: {:?}", err);
            AuthError::InvalidOrExpiredToken
        })
    }
}

/// Checks the two configured built-in accounts. No store lookup happens for them.
pub fn match_builtin_account(config: &AuthConfig, email: &str, password: &str) -> Option<AuthUser> {
    [(&config.admin, Role::Admin), (&config.owner, Role::Owner)]
        .into_iter()
        .find(|(account, _)| account.email.eq_ignore_ascii_case(email) && account.password == password)
        .map(|(account, role)| AuthUser {
            id: None,
            email: account.email.clone(),
            role,
            name: None,
        })
}

pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_string();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::HashingError)
    })
    .await
    .map_err(|_| AuthError::HashingError)?
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_string();
    let hash = hash.to_string();

    task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&hash).map_err(|_| AuthError::VerificationError)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(AuthError::VerificationError),
        }
    })
    .await
    .map_err(|_| AuthError::VerificationError)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::config::BuiltinAccount;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 24,
            admin: BuiltinAccount {
                email: "admin@gmail.com".into(),
                password: "123".into(),
            },
            owner: BuiltinAccount {
                email: "owner@gmail.com".into(),
                password: "123".into(),
            },
        }
    }

    fn buyer() -> AuthUser {
        AuthUser {
            id: Some(42),
            email: "b@x.com".into(),
            role: Role::Buyer,
            name: Some("Bea".into()),
        }
    }

    #[test]
    fn issued_token_verifies_to_same_claims() {
        let config = config();
        let tokens = TokenService::new(&config);

        let token = tokens.issue(buyer()).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.user, buyer());
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let config = config();
        let mut other = config.clone();
        other.jwt_secret = "another-secret".into();

        let token = TokenService::new(&other).issue(buyer()).unwrap();
        assert!(matches!(
            TokenService::new(&config).verify(&token),
            Err(AuthError::InvalidOrExpiredToken)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = config();
        let claims = SessionClaims {
            user: buyer(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert!(TokenService::new(&config).verify(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let config = config();
        assert!(TokenService::new(&config).verify("not.a.jwt").is_err());
    }

    #[test]
    fn builtin_accounts_match_exact_password_only() {
        let config = config();

        let admin = match_builtin_account(&config, "admin@gmail.com", "123").unwrap();
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.id, None);

        let owner = match_builtin_account(&config, "OWNER@gmail.com", "123").unwrap();
        assert_eq!(owner.role, Role::Owner);

        assert!(match_builtin_account(&config, "admin@gmail.com", "1234").is_none());
        assert!(match_builtin_account(&config, "b@x.com", "123").is_none());
    }

    #[test]
    fn builtin_claims_serialize_without_id() {
        let config = config();
        let admin = match_builtin_account(&config, "admin@gmail.com", "123").unwrap();
        let value = serde_json::to_value(admin).unwrap();
        assert_eq!(value["role"], "admin");
        assert!(value.get("id").is_none());
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password("secret1").await.unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).await.unwrap());
        assert!(!verify_password("secret2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_a_verification_error() {
        assert!(matches!(
            verify_password("secret1", "plaintext").await,
            Err(AuthError::VerificationError)
        ));
    }
}
