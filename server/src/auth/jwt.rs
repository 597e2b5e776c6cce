use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use super::{AuthError, Identity, IdentityProvider};

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Uuid,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies HS256 access tokens signed by the hosted auth provider.
pub struct JwtIdentityProvider {
    key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityProvider {
    pub fn new(secret: &str, audience: Option<&str>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        match audience {
            Some(aud) => validation.set_audience(&[aud]),
            None => validation.validate_aud = false,
        }
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn resolve(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            AuthError::InvalidToken
        })?;
        Ok(Identity {
            user_id: data.claims.sub,
            email: data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct TestClaims {
        sub: Uuid,
        exp: usize,
        aud: String,
    }

    fn token(secret: &str, sub: Uuid, expires_in: Duration) -> String {
        let claims = TestClaims {
            sub,
            exp: (Utc::now() + expires_in).timestamp() as usize,
            aud: "authenticated".to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let user = Uuid::new_v4();
        let provider = JwtIdentityProvider::new("secret", Some("authenticated"));
        let identity = provider
            .resolve(&token("secret", user, Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(identity.user_id, user);
    }

    #[tokio::test]
    async fn rejects_wrong_signature() {
        let provider = JwtIdentityProvider::new("secret", None);
        let result = provider
            .resolve(&token("other", Uuid::new_v4(), Duration::hours(1)))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn rejects_expired_token() {
        let provider = JwtIdentityProvider::new("secret", None);
        let result = provider
            .resolve(&token("secret", Uuid::new_v4(), Duration::hours(-2)))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }
}
