use crate::authentication::{validate_credentials, AuthError, Credentials};
use crate::errors::AppError;
use crate::routes::create_user;
use crate::InnerState;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: String,
    pub exp: usize,
}

/// Wire payload for register/login. Both fields are optional so that a body
/// with one missing still reaches the handler and comes back as a 400, not
/// a deserialization rejection.
#[derive(Deserialize)]
pub struct CredentialsPayload {
    email: Option<String>,
    password: Option<String>,
}

impl CredentialsPayload {
    fn require(self) -> Result<Credentials, AppError> {
        match (self.email, self.password) {
            (Some(email), Some(password))
                if !email.trim().is_empty() && !password.is_empty() =>
            {
                Ok(Credentials { email, password })
            }
            _ => Err(AppError::Validation(
                "Email and password are required".to_string(),
            )),
        }
    }
}

#[tracing::instrument(name = "Register user", skip(inner, payload))]
pub async fn register_user(
    State(inner): State<InnerState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let InnerState { db, .. } = inner;

    let form = payload.require()?;

    let user = create_user(&db, &form.email, &form.password).await?;

    tracing::info!("Registered new user {:?}", user.id);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "user": { "id": user.id, "email": user.email } })),
    ))
}

#[tracing::instrument(name = "Login user", skip(inner, payload))]
pub async fn login_user(
    State(inner): State<InnerState>,
    Json(payload): Json<CredentialsPayload>,
) -> Result<Json<Value>, AppError> {
    let InnerState { db, .. } = inner;

    let form = payload.require()?;

    let user_id = validate_credentials(&form, &db)
        .await
        .map_err(|auth_error| match auth_error {
            AuthError::InvalidCredentials(e) => {
                AppError::Authentication(e.context("Invalid credentials supplied"))
            }
            AuthError::UnexpectedError(e) => {
                AppError::Unexpected(e.context("Credential validation failed"))
            }
        })?;

    let token = generate_token(&form.email, &user_id)?;

    Ok(Json(json!({ "token": token })))
}

pub fn generate_token(email: &str, user_id: &str) -> Result<String, AppError> {
    let key = std::env::var("SECRET_TOKEN")
        .map_err(|e| AppError::Unexpected(anyhow::anyhow!(e).context("SECRET_TOKEN env var not set")))?;

    let claims = Claims {
        sub: email.to_owned(),
        user_id: user_id.to_owned(),
        exp: (chrono::Utc::now() + chrono::Duration::days(1)).timestamp() as usize,
    };
    let header = Header::new(Algorithm::HS256);
    encode(&header, &claims, &EncodingKey::from_secret(key.as_bytes()))
        .map_err(|e| AppError::Unexpected(anyhow::Error::new(e).context("Failed to encode JWT token")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_a_validation_error() {
        // `{}` must deserialize so the handler can answer 400 itself.
        let payload: CredentialsPayload = serde_json::from_str("{}").unwrap();
        let err = payload.require().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_password_is_a_validation_error() {
        let payload: CredentialsPayload =
            serde_json::from_str(r#"{"email":"ada@modaflix.test"}"#).unwrap();
        assert!(matches!(
            payload.require().unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn blank_fields_are_a_validation_error() {
        let payload: CredentialsPayload =
            serde_json::from_str(r#"{"email":"  ","password":""}"#).unwrap();
        assert!(matches!(
            payload.require().unwrap_err(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn complete_payload_passes_through() {
        let payload: CredentialsPayload =
            serde_json::from_str(r#"{"email":"ada@modaflix.test","password":"pw"}"#).unwrap();
        let credentials = payload.require().unwrap();
        assert_eq!(credentials.email, "ada@modaflix.test");
        assert_eq!(credentials.password, "pw");
    }
}
