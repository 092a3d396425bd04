//! First-run admin account.

use clinicops_core::roles::ROLE_ADMIN;
use clinicops_db::models::user::{CreateUser, User};
use clinicops_db::repositories::UserRepo;
use clinicops_db::DbPool;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};

/// Create an admin account from `email`/`password` when the `users` table
/// is empty. Returns the created user, or `None` when users already exist.
pub async fn ensure_admin(pool: &DbPool, email: &str, password: &str) -> AppResult<Option<User>> {
    if UserRepo::count_all(pool).await? > 0 {
        return Ok(None);
    }

    validate_password_strength(password, MIN_PASSWORD_LENGTH).map_err(AppError::validation)?;
    let password_hash = hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.trim().to_lowercase(),
            password_hash,
            full_name: "Administrator".into(),
            role: ROLE_ADMIN.into(),
            position: None,
            department: None,
            phone: None,
        },
    )
    .await?;

    tracing::info!(user_id = user.id, email = %user.email, "Initial admin account created");
    Ok(Some(user))
}
