use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use rand::Rng;

use crate::{
    audit::log_audit,
    dto::auth::{
        ChangePasswordRequest, Claims, LoginRequest, LoginResponse, RegisterRequest,
        UpdateProfileRequest, WithdrawalAccountRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    remote::{NewUser, ProfileUpdate},
    response::{ApiResponse, Meta},
    session::Session,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        phone,
        password,
        invited_by,
    } = payload;
    let phone = phone.trim().to_string();
    if phone.is_empty() {
        return Err(AppError::bad_request("Phone number is required"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.store.find_user_by_phone(&phone).await?.is_some() {
        return Err(AppError::bad_request("Phone number is already registered"));
    }

    let is_admin = state
        .config
        .admin_phone
        .as_deref()
        .is_some_and(|admin| admin == phone);
    let user = state
        .store
        .insert_user(NewUser {
            phone,
            password_hash: hash_password(&password)?,
            is_admin,
            verification_code: verification_code(),
            invited_by: invited_by
                .map(|code| code.trim().to_ascii_uppercase())
                .filter(|code| !code.is_empty()),
        })
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "is_admin": user.is_admin })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    tracing::info!(user_id = %user.id, "user registered");
    Ok(ApiResponse::success("User created", user, None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest { phone, password } = payload;
    let record = state
        .store
        .find_user_by_phone(phone.trim())
        .await?
        .ok_or_else(|| AppError::bad_request("Invalid phone number or password"))?;

    if !verify_password(&password, &record.password_hash)? {
        return Err(AppError::bad_request("Invalid phone number or password"));
    }

    let user = record.user;
    let token = issue_token(&user, &state.config.jwt_secret, state.config.token_ttl_hours)?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {token}"),
            user,
        },
        Some(Meta::empty()),
    ))
}

pub async fn current_user(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let session = Session::load(state.store.as_ref(), user).await?;
    Ok(ApiResponse::success("OK", session.user, None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let clean = |value: Option<String>| value.map(|v| v.trim().to_string());
    let updated = state
        .store
        .update_profile(
            user.user_id,
            ProfileUpdate {
                full_name: clean(payload.full_name),
                bio: clean(payload.bio),
                avatar_url: clean(payload.avatar_url).filter(|url| !url.is_empty()),
            },
        )
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "profile_update",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success("Profile updated", updated, None))
}

pub async fn upload_avatar(
    state: &AppState,
    user: &AuthUser,
    file_name: &str,
    bytes: &[u8],
) -> AppResult<ApiResponse<User>> {
    if bytes.is_empty() {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }
    let url = state.objects.put(file_name, bytes).await?;
    update_profile(
        state,
        user,
        UpdateProfileRequest {
            full_name: None,
            bio: None,
            avatar_url: Some(url),
        },
    )
    .await
}

pub async fn set_withdrawal_account(
    state: &AppState,
    user: &AuthUser,
    payload: WithdrawalAccountRequest,
) -> AppResult<ApiResponse<User>> {
    let account = payload.account.trim();
    if account.is_empty() {
        return Err(AppError::bad_request("Withdrawal account is required"));
    }
    let updated = state
        .store
        .set_withdrawal_account(user.user_id, account.to_string())
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "withdrawal_account_update",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success("Withdrawal account saved", updated, None))
}

pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let record = state
        .store
        .find_user_record(user.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if !verify_password(&payload.current_password, &record.password_hash)? {
        return Err(AppError::bad_request("Current password is incorrect"));
    }
    state
        .store
        .set_password_hash(user.user_id, hash_password(&payload.new_password)?)
        .await?;

    if let Err(err) = log_audit(
        state.store.as_ref(),
        Some(user.user_id),
        "password_change",
        Some("users"),
        None,
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user.id.to_string(),
        role: user.role().to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

/// Six-character referral code shown on the profile page.
fn verification_code() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| char::from(CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_codes_are_upper_alphanumeric() {
        let code = verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
    }

    #[test]
    fn password_hash_verifies() -> anyhow::Result<()> {
        let hash = hash_password("secret-pass")?;
        assert!(verify_password("secret-pass", &hash)?);
        assert!(!verify_password("wrong-pass", &hash)?);
        Ok(())
    }
}
