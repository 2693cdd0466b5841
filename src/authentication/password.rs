use crate::errors::AppError;
use crate::routes::get_stored_credentials;

use anyhow::Context;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials.")]
    InvalidCredentials(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

#[tracing::instrument(name = "Validate user credentials", skip(credentials, pool), fields(email = %credentials.email))]
pub async fn validate_credentials(
    credentials: &Credentials,
    pool: &PgPool,
) -> Result<String, AuthError> {
    let mut user_id = None;

    // Dummy hash keeps verification work constant when the email is unknown.
    let mut expected_password_hash = String::from(
        "$argon2id$v=19$m=15000,t=2,p=1$\
        gZiV/M1gPc22ElAH/Jh1Hw$\
        CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno",
    );

    match get_stored_credentials(&credentials.email, pool).await {
        Ok(user) => {
            user_id = user.id;
            expected_password_hash = user.password_hash;
        }
        Err(error) => {
            tracing::warn!("Failed to retrieve stored credentials: {:?}", error);
        }
    }

    verify_password_hash(&expected_password_hash, &credentials.password)?;

    match user_id {
        Some(id) => Ok(id),
        None => Err(AuthError::InvalidCredentials(anyhow::anyhow!(
            "Unknown username."
        ))),
    }
}

#[tracing::instrument(name = "Verify password hash", skip(expected_password_hash, password_candidate))]
fn verify_password_hash(
    expected_password_hash: &str,
    password_candidate: &str,
) -> Result<(), AuthError> {
    let expected_password_hash = PasswordHash::new(expected_password_hash)
        .context("Failed to parse hash in PHC string format.")?;

    Argon2::default()
        .verify_password(password_candidate.as_bytes(), &expected_password_hash)
        .context("Invalid password.")
        .map_err(AuthError::InvalidCredentials)
}

#[tracing::instrument(name = "Compute password hash", skip(password))]
pub fn compute_password_hash(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());

    let params = Params::new(15000, 2, 1, None).map_err(|e| {
        AppError::Unexpected(anyhow::Error::new(e).context("Failed to create Argon2 params"))
    })?;

    let hasher = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let password_hash = hasher
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            AppError::Unexpected(anyhow::Error::new(e).context("Failed to hash password"))
        })?
        .to_string();

    Ok(password_hash)
}
