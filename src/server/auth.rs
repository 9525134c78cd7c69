//! Bearer authentication.
//!
//! A bearer token is first looked up as an API key issued by `amal-admin`.
//! When a JWT secret is configured, anything else is verified as an HS256
//! JWT with audience `authenticated`, and the caller's profile is created on
//! first use.

use amal_core::Profile;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::AppState;
use crate::db::Store;
use crate::error::AppError;

/// The authenticated caller, added to request extensions after auth.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub metadata: Value,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingHeader,
    #[error("Authorization header must use Bearer scheme")]
    InvalidScheme,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Store(e) => AppError::Store(e),
            other => AppError::Unauthorized(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&["authenticated"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims = data.claims;
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(Identity {
            id: claims.sub,
            email: claims.email.unwrap_or_default(),
            metadata: claims.user_metadata,
        })
    }
}

/// Resolves bearer tokens to identities.
#[derive(Clone)]
pub struct IdentityProvider {
    store: Store,
    jwt: Option<JwtVerifier>,
}

impl IdentityProvider {
    pub fn new(store: Store, jwt_secret: Option<&str>) -> Self {
        Self {
            store,
            jwt: jwt_secret.map(JwtVerifier::new),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if let Some(owner) = self.store.api_keys.lookup(token).await? {
            return Ok(Identity {
                id: owner.user_id,
                email: owner.email,
                metadata: Value::Null,
            });
        }

        let Some(jwt) = &self.jwt else {
            return Err(AuthError::InvalidToken);
        };
        let identity = jwt.verify(token)?;
        self.ensure_profile(&identity).await?;
        Ok(identity)
    }

    async fn ensure_profile(&self, identity: &Identity) -> Result<(), sqlx::Error> {
        if self.store.profiles.get(&identity.id).await?.is_some() {
            return Ok(());
        }

        let mut profile = Profile::new(&identity.id, &identity.email);
        if let Some(name) = identity.metadata.get("name").and_then(Value::as_str) {
            profile = profile.with_name(name.trim());
        }
        let stored = self.store.profiles.create_if_missing(&profile).await?;
        if stored.created_at == profile.created_at {
            tracing::info!(user_id = %identity.id, "created profile for new JWT user");
        }
        Ok(())
    }
}

fn bearer_token(request: &Request) -> Result<&str, AuthError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::InvalidScheme)
}

/// Authentication middleware
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = bearer_token(&request).map(str::to_owned);
    let verified = match token {
        Ok(token) => state.identity.verify(&token).await,
        Err(e) => Err(e),
    };

    match verified {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => AppError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{seed_user, setup};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "test-secret";

    fn token(claims: Value, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn far_future() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_jwt_verify() {
        let verifier = JwtVerifier::new(SECRET);
        let jwt = token(
            json!({"sub": "u-1", "email": "j@example.com", "aud": "authenticated", "exp": far_future(), "user_metadata": {"name": "J"}}),
            SECRET,
        );

        let identity = verifier.verify(&jwt).unwrap();
        assert_eq!(identity.id, "u-1");
        assert_eq!(identity.email, "j@example.com");
        assert_eq!(identity.metadata, json!({"name": "J"}));
    }

    #[test]
    fn test_jwt_rejects_wrong_secret_and_audience() {
        let verifier = JwtVerifier::new(SECRET);

        let wrong_secret = token(
            json!({"sub": "u-1", "aud": "authenticated", "exp": far_future()}),
            "other",
        );
        assert!(matches!(verifier.verify(&wrong_secret), Err(AuthError::InvalidToken)));

        let wrong_audience = token(json!({"sub": "u-1", "aud": "anon", "exp": far_future()}), SECRET);
        assert!(matches!(verifier.verify(&wrong_audience), Err(AuthError::InvalidToken)));

        let expired = token(json!({"sub": "u-1", "aud": "authenticated", "exp": 1_000}), SECRET);
        assert!(matches!(verifier.verify(&expired), Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_api_key_identity() {
        let ctx = setup().await;
        let user = seed_user(&ctx.store, "key@example.com").await;
        let key = ctx.store.api_keys.issue(&user.id, None).await.unwrap();

        let provider = IdentityProvider::new(ctx.store.clone(), None);
        let identity = provider.verify(&key).await.unwrap();
        assert_eq!(identity.id, user.id);
        assert_eq!(identity.email, "key@example.com");

        assert!(matches!(
            provider.verify("garbage").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_jwt_user_gets_profile() {
        let ctx = setup().await;
        let provider = IdentityProvider::new(ctx.store.clone(), Some(SECRET));
        let jwt = token(
            json!({"sub": "jwt-user", "email": "new@example.com", "aud": "authenticated", "exp": far_future(), "user_metadata": {"name": " Bilol "}}),
            SECRET,
        );

        provider.verify(&jwt).await.unwrap();
        // second call finds the existing profile
        provider.verify(&jwt).await.unwrap();

        let profile = ctx.store.profiles.get("jwt-user").await.unwrap().unwrap();
        assert_eq!(profile.email, "new@example.com");
        assert_eq!(profile.name, "Bilol");
        assert_eq!(profile.xp, 50);
    }

    #[tokio::test]
    async fn test_jwt_users_without_email() {
        let ctx = setup().await;
        let provider = IdentityProvider::new(ctx.store.clone(), Some(SECRET));

        for sub in ["phone-user-1", "phone-user-2"] {
            let jwt = token(
                json!({"sub": sub, "aud": "authenticated", "exp": far_future()}),
                SECRET,
            );
            let identity = provider.verify(&jwt).await.unwrap();
            assert_eq!(identity.id, sub);
            assert_eq!(identity.email, "");
        }

        assert!(ctx.store.profiles.get("phone-user-1").await.unwrap().is_some());
        assert!(ctx.store.profiles.get("phone-user-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_jwt_user_sharing_an_admin_email() {
        let ctx = setup().await;
        let admin_created = seed_user(&ctx.store, "shared@example.com").await;
        let provider = IdentityProvider::new(ctx.store.clone(), Some(SECRET));
        let jwt = token(
            json!({"sub": "jwt-shared", "email": "shared@example.com", "aud": "authenticated", "exp": far_future()}),
            SECRET,
        );

        let identity = provider.verify(&jwt).await.unwrap();
        assert_eq!(identity.id, "jwt-shared");
        assert!(ctx.store.profiles.get("jwt-shared").await.unwrap().is_some());

        let by_email = ctx.store.profiles.get_by_email("shared@example.com").await.unwrap();
        assert_eq!(by_email.map(|p| p.id), Some(admin_created.id));
    }

    #[tokio::test]
    async fn test_concurrent_first_requests() {
        let ctx = setup().await;
        let provider = IdentityProvider::new(ctx.store.clone(), Some(SECRET));
        let jwt = token(
            json!({"sub": "racer", "email": "racer@example.com", "aud": "authenticated", "exp": far_future()}),
            SECRET,
        );

        let (first, second) = tokio::join!(provider.verify(&jwt), provider.verify(&jwt));
        assert_eq!(first.unwrap().id, "racer");
        assert_eq!(second.unwrap().id, "racer");
        assert_eq!(ctx.store.profiles.list().await.unwrap().len(), 1);
    }
}
