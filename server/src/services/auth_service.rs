use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::config::Config;
use crate::models::user::{LoginRequest, RegisterRequest, UpdateProfileRequest, User, UserRole};
use crate::utils::error::{AppError, AppResult};
use crate::utils::validation::{validate_email, validate_length, validate_password, validate_phone};

/// Checks a registration payload without touching the database.
pub fn validate_registration(req: &RegisterRequest) -> AppResult<()> {
    validate_length("Name", &req.name, 2, 80)?;
    validate_email(req.email.trim())?;
    validate_password(&req.password)?;
    if let Some(phone) = req.phone.as_deref() {
        validate_phone(phone.trim())?;
    }
    Ok(())
}

pub async fn register(pool: &PgPool, config: &Config, req: RegisterRequest) -> AppResult<User> {
    validate_registration(&req)?;
    let email = req.email.trim().to_lowercase();

    let taken: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = $1)")
            .bind(&email)
            .fetch_one(pool)
            .await?;
    if taken {
        return Err(AppError::Conflict("This email is already registered".to_string()));
    }

    let role = if config.is_admin_email(&email) {
        UserRole::Admin
    } else {
        UserRole::User
    };
    let password_hash = hash_password(&req.password)?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, email, phone, password_hash, role)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.name.trim())
    .bind(&email)
    .bind(req.phone.as_deref().map(str::trim))
    .bind(&password_hash)
    .bind(role)
    .fetch_one(pool)
    .await
    .map_err(|e| match e.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            AppError::Conflict("This email is already registered".to_string())
        }
        _ => AppError::DatabaseError(e),
    })?;

    info!(action = "register_success", user_id = %user.id, role = ?user.role);
    Ok(user)
}

pub async fn login(pool: &PgPool, req: LoginRequest) -> AppResult<User> {
    let invalid = || AppError::AuthError("Invalid email or password".to_string());

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = $1")
        .bind(req.email.trim().to_lowercase())
        .fetch_optional(pool)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash)? {
        info!(action = "login_failed", user_id = %user.id);
        return Err(invalid());
    }
    if !user.is_active {
        return Err(AppError::AuthError("This account has been deactivated".to_string()));
    }

    info!(action = "login_success", user_id = %user.id);
    Ok(user)
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> AppResult<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User '{}' was not found", id)))
}

pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    req: UpdateProfileRequest,
) -> AppResult<User> {
    if let Some(name) = req.name.as_deref() {
        validate_length("Name", name, 2, 80)?;
    }
    if let Some(phone) = req.phone.as_deref() {
        validate_phone(phone.trim())?;
    }

    sqlx::query_as::<_, User>(
        "UPDATE users SET
             name = COALESCE($2, name),
             phone = COALESCE($3, phone),
             avatar_url = COALESCE($4, avatar_url),
             updated_at = NOW()
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.phone.as_deref().map(str::trim))
    .bind(req.avatar_url)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User '{}' was not found", id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            phone: None,
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&request("Ada", "ada@fira.events", "tickets42")).is_ok());
        assert!(validate_registration(&request("A", "ada@fira.events", "tickets42")).is_err());
        assert!(validate_registration(&request("Ada", "ada", "tickets42")).is_err());
        assert!(validate_registration(&request("Ada", "ada@fira.events", "weak")).is_err());

        let mut with_phone = request("Ada", "ada@fira.events", "tickets42");
        with_phone.phone = Some("call me".to_string());
        assert!(validate_registration(&with_phone).is_err());
    }
}
