//! # User Repository
//!
//! Staff accounts and login.
//!
//! ## Login
//! ```text
//! username ──► lookup ──┬── unknown ──► verify dummy hash ──► InvalidCredentials
//!                       │
//!                       └── found ────► verify hash ──┬── mismatch ──► InvalidCredentials
//!                                                     ├── inactive ──► AccountDeactivated
//!                                                     └── ok ────────► User
//! ```
//! Every outcome writes an `auth` activity row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};
use uuid::Uuid;

use koperasi_core::input::{CreateUserInput, UpdateUserInput};
use koperasi_core::{ActivityAction, CoreError, Module, NewActivity, User, ValidationError};

use super::activity::record;
use crate::credentials::{dummy_hash, hash_password, verify_password};
use crate::error::{DbError, DbResult};

const USER_SELECT: &str = r#"
    SELECT id, username, email, full_name, password_hash, role, is_active, created_at, updated_at
    FROM users
"#;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE id = ?1", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Usernames are stored lowercase; the lookup normalizes its input.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("{} WHERE username = ?1", USER_SELECT))
            .bind(username.trim().to_ascii_lowercase())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!("{} ORDER BY username", USER_SELECT))
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Creates an account. `actor_id` is `None` when bootstrapping.
    pub async fn create(&self, input: &CreateUserInput, actor_id: Option<&str>) -> DbResult<User> {
        input.validate()?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: input.username.trim().to_ascii_lowercase(),
            email: input.email.trim().to_string(),
            full_name: input.full_name.trim().to_string(),
            password_hash: hash_password(&input.password)?,
            role: input.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(username = %user.username, role = %user.role, "Creating user");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, full_name, password_hash,
                role, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_value(e.into(), &user))?;

        record(
            &mut tx,
            &NewActivity {
                user_id: actor_id.map(str::to_string),
                module: Module::Users,
                action: ActivityAction::Create,
                description: format!("Created user '{}' ({})", user.username, user.role),
            },
        )
        .await?;

        tx.commit().await?;

        info!(username = %user.username, "User created");
        Ok(user)
    }

    /// Updates profile and role; resets the password when one is given.
    pub async fn update(
        &self,
        id: &str,
        input: &UpdateUserInput,
        actor_id: &str,
    ) -> DbResult<User> {
        input.validate()?;

        let existing = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let password_hash = match input.password.as_deref().filter(|p| !p.is_empty()) {
            Some(password) => hash_password(password)?,
            None => existing.password_hash.clone(),
        };

        let user = User {
            email: input.email.trim().to_string(),
            full_name: input.full_name.trim().to_string(),
            role: input.role,
            password_hash,
            updated_at: Utc::now(),
            ..existing
        };

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = ?2, full_name = ?3, role = ?4, password_hash = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_value(e.into(), &user))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        let mut description = format!("Updated user '{}' ({})", user.username, user.role);
        if input.password.as_deref().is_some_and(|p| !p.is_empty()) {
            description.push_str(", password reset");
        }
        record(
            &mut tx,
            &NewActivity::new(actor_id, Module::Users, ActivityAction::Update, description),
        )
        .await?;

        tx.commit().await?;
        Ok(user)
    }

    /// Activates or deactivates an account. Accounts are never deleted, and
    /// nobody can deactivate themselves.
    pub async fn set_active(&self, id: &str, is_active: bool, actor_id: &str) -> DbResult<User> {
        if !is_active && id == actor_id {
            return Err(CoreError::from(ValidationError::InvalidFormat {
                field: "isActive".to_string(),
                reason: "you cannot deactivate your own account".to_string(),
            })
            .into());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let username: Option<String> = sqlx::query_scalar(
            "UPDATE users SET is_active = ?2, updated_at = ?3 WHERE id = ?1 RETURNING username",
        )
        .bind(id)
        .bind(is_active)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(username) = username else {
            return Err(DbError::not_found("User", id));
        };

        let (action, verb) = if is_active {
            (ActivityAction::Activate, "Activated")
        } else {
            (ActivityAction::Deactivate, "Deactivated")
        };
        record(
            &mut tx,
            &NewActivity::new(
                actor_id,
                Module::Users,
                action,
                format!("{} user '{}'", verb, username),
            ),
        )
        .await?;

        tx.commit().await?;

        info!(user_id = %id, is_active, "User activation changed");
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Checks a username/password pair and records the attempt.
    ///
    /// Unknown usernames and wrong passwords fail identically.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<User> {
        let user = self.get_by_username(username).await?;
        let activity = super::activity::ActivityRepository::new(self.pool.clone());

        let user = match user {
            None => {
                verify_password(password, dummy_hash());
                warn!(username = %username, "Login failed: unknown user");
                activity
                    .append(&NewActivity::anonymous(
                        Module::Auth,
                        ActivityAction::LoginFailed,
                        format!("Failed login for '{}'", username.trim()),
                    ))
                    .await?;
                return Err(CoreError::InvalidCredentials.into());
            }
            Some(user) => user,
        };

        if !verify_password(password, &user.password_hash) {
            warn!(username = %user.username, "Login failed: wrong password");
            activity
                .append(&NewActivity::new(
                    &user.id,
                    Module::Auth,
                    ActivityAction::LoginFailed,
                    format!("Failed login for '{}'", user.username),
                ))
                .await?;
            return Err(CoreError::InvalidCredentials.into());
        }

        if !user.is_active {
            warn!(username = %user.username, "Login refused: account deactivated");
            activity
                .append(&NewActivity::new(
                    &user.id,
                    Module::Auth,
                    ActivityAction::LoginFailed,
                    format!("Login refused for deactivated account '{}'", user.username),
                ))
                .await?;
            return Err(CoreError::AccountDeactivated.into());
        }

        activity
            .append(&NewActivity::new(
                &user.id,
                Module::Auth,
                ActivityAction::Login,
                format!("'{}' logged in", user.username),
            ))
            .await?;

        info!(username = %user.username, role = %user.role, "Login succeeded");
        Ok(user)
    }

    pub async fn record_logout(&self, user_id: &str, username: &str) -> DbResult<()> {
        super::activity::ActivityRepository::new(self.pool.clone())
            .append(&NewActivity::new(
                user_id,
                Module::Auth,
                ActivityAction::Logout,
                format!("'{}' logged out", username),
            ))
            .await
    }
}

fn duplicate_value(err: DbError, user: &User) -> DbError {
    match &err {
        DbError::UniqueViolation { field, .. } if field == "email" => err.with_value(&user.email),
        DbError::UniqueViolation { .. } => err.with_value(&user.username),
        _ => err,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
