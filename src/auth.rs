use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use once_cell::sync::Lazy;

use crate::errors::AppError;
use crate::routes::Claims;

static VALIDATION: Lazy<Validation> = Lazy::new(|| Validation::new(Algorithm::HS256));

/// A signed-in user, extracted from the `Authorization: Bearer <token>`
/// header. Absence of the header rejects with 401, a bad or expired token
/// with 403.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

/// Like [`AuthUser`] but tolerates anonymous requests; a present-but-invalid
/// token is still rejected with 403.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<AuthUser>);

#[tracing::instrument(name = "Decode bearer token", skip(token))]
pub fn decode_token(token: &str) -> Result<Claims, AppError> {
    let key = std::env::var("SECRET_TOKEN")
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("SECRET_TOKEN env var not set")))?;

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &VALIDATION,
    )
    .map_err(|e| {
        tracing::warn!("Token rejected: {:?}", e.kind());
        AppError::Forbidden("Invalid or expired token".to_string())
    })?;

    Ok(data.claims)
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            AppError::Authentication(anyhow::anyhow!("Missing bearer token"))
        })?;

        let claims = decode_token(&token)?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none() {
            return Ok(MaybeAuthUser(None));
        }

        let user = AuthUser::from_request_parts(parts, state).await?;
        Ok(MaybeAuthUser(Some(user)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::generate_token;

    fn set_secret() {
        std::env::set_var("SECRET_TOKEN", "test-secret");
    }

    #[test]
    fn token_round_trips_claims() {
        set_secret();
        let token = generate_token("ada@modaflix.test", "user-1").unwrap();
        let claims = decode_token(&token).unwrap();
        assert_eq!(claims.sub, "ada@modaflix.test");
        assert_eq!(claims.user_id, "user-1");
    }

    #[test]
    fn garbage_token_is_forbidden() {
        set_secret();
        let err = decode_token("not-a-jwt").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn token_signed_with_other_secret_is_forbidden() {
        set_secret();
        let claims = Claims {
            sub: "ada@modaflix.test".to_string(),
            user_id: "user-1".to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"another-secret"),
        )
        .unwrap();
        let err = decode_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn expired_token_is_forbidden() {
        set_secret();
        let claims = Claims {
            sub: "ada@modaflix.test".to_string(),
            user_id: "user-1".to_string(),
            exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp() as usize,
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();
        let err = decode_token(&token).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
