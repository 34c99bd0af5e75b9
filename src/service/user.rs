//! User Service Implementation
//!
//! Core business logic for accounts and their profiles. Every write that
//! touches a user also provisions or persists its profile inside the same
//! transaction, so a user never exists without exactly one profile.

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::{
    NewUser, Profile, ProfileChanges, User, UserChanges, UserWithPassword,
};
use crate::utils::{
    error::AppError,
    security::{
        fits_bcrypt_input, hash_password_with_cost, session_auth_hash, verify_password,
        DEFAULT_BCRYPT_COST,
    },
    validation::{messages, normalize_email, resolve_username, validate_email},
};

const USER_COLUMNS: &str = "id, username, email, created_at, updated_at, last_login";
const USER_WITH_PASSWORD_COLUMNS: &str =
    "id, username, email, password_hash, created_at, updated_at, last_login";
const PROFILE_COLUMNS: &str = "id, user_id, first_name, last_name, bio";

/// Custom error types for the user service
#[derive(Error, Debug)]
pub enum UserServiceError {
    /// User with the specified identifier was not found
    #[error("User not found")]
    UserNotFound,

    /// Another account already uses the email
    #[error("Email already exists")]
    EmailAlreadyExists,

    /// Invalid login credentials provided
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Input validation failed with detailed error message
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// Password hashing operation failed
    #[error("Password hashing error: {0}")]
    HashingError(#[from] bcrypt::BcryptError),
}

impl From<UserServiceError> for AppError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::UserNotFound => AppError::NotFound("User not found".to_string()),
            UserServiceError::EmailAlreadyExists => {
                AppError::Conflict("Email already exists".to_string())
            }
            UserServiceError::InvalidCredentials => {
                AppError::Authentication("Invalid credentials".to_string())
            }
            UserServiceError::ValidationError(msg) => AppError::Validation(msg),
            UserServiceError::DatabaseError(e) => AppError::Database(e),
            UserServiceError::HashingError(e) => AppError::HashingError(e),
        }
    }
}

/// Result type for user service operations
pub type UserServiceResult<T> = Result<T, UserServiceError>;

/// A user together with the session-auth hash of its current credential
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub auth_hash: String,
}

impl From<UserWithPassword> for AuthenticatedUser {
    fn from(row: UserWithPassword) -> Self {
        let auth_hash = session_auth_hash(&row.password_hash);
        Self {
            user: row.into(),
            auth_hash,
        }
    }
}

/// Maps write failures, turning the email uniqueness constraint into a domain error
fn map_write_error(e: sqlx::Error) -> UserServiceError {
    match e {
        sqlx::Error::RowNotFound => UserServiceError::UserNotFound,
        sqlx::Error::Database(ref db_err)
            if db_err.is_unique_violation() && db_err.message().contains("users.email") =>
        {
            UserServiceError::EmailAlreadyExists
        }
        _ => UserServiceError::DatabaseError(e),
    }
}

/// Refuses passwords whose tail bcrypt would drop
fn check_password_length(password: &str) -> UserServiceResult<()> {
    if fits_bcrypt_input(password) {
        Ok(())
    } else {
        Err(UserServiceError::ValidationError(
            messages::PASSWORD_TOO_LONG.to_string(),
        ))
    }
}

fn map_read_error(e: sqlx::Error) -> UserServiceError {
    match e {
        sqlx::Error::RowNotFound => UserServiceError::UserNotFound,
        _ => UserServiceError::DatabaseError(e),
    }
}

/// Account and profile persistence
#[derive(Clone)]
pub struct UserService {
    /// Database connection pool
    db_pool: SqlitePool,

    /// bcrypt cost factor for password hashing (higher = more secure but slower)
    bcrypt_cost: u32,
}

impl UserService {
    /// Creates a new UserService instance with the provided database connection pool
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            db_pool,
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }

    /// Overrides the bcrypt cost used for new hashes
    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    /// Creates a user and its empty profile in one transaction.
    ///
    /// The display name falls back to the email's local part when absent.
    pub async fn create_user_with_profile(&self, request: NewUser) -> UserServiceResult<User> {
        let email = normalize_email(&request.email);
        if !validate_email(&email) {
            return Err(UserServiceError::ValidationError(format!(
                "Invalid email address: {}",
                request.email
            )));
        }
        if request.password.is_empty() {
            return Err(UserServiceError::ValidationError(
                "Password cannot be empty".to_string(),
            ));
        }
        check_password_length(&request.password)?;

        let username = resolve_username(request.username.as_deref(), &email);
        let password_hash = hash_password_with_cost(&request.password, self.bcrypt_cost)?;
        let now = Utc::now();

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&username)
        .bind(&email)
        .bind(&password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        sqlx::query("INSERT INTO profiles (user_id) VALUES (?)")
            .bind(user.id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        log::debug!("Created user {} with profile", user.id);
        Ok(user)
    }

    /// Retrieves a user by their unique ID
    pub async fn get_user_by_id(&self, user_id: Uuid) -> UserServiceResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(user_id)
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_read_error)
    }

    /// Retrieves a user by their email address
    pub async fn get_user_by_email(&self, email: &str) -> UserServiceResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(normalize_email(email))
            .fetch_one(&self.db_pool)
            .await
            .map_err(map_read_error)
    }

    /// Lists every account, oldest first
    pub async fn list_users(&self) -> UserServiceResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, rowid"
        ))
        .fetch_all(&self.db_pool)
        .await?;

        Ok(users)
    }

    /// Loads a user with the hash needed to validate its sessions.
    ///
    /// Returns `None` for unknown ids so that stale sessions can be dropped quietly.
    pub async fn session_user(&self, user_id: Uuid) -> UserServiceResult<Option<AuthenticatedUser>> {
        let row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_WITH_PASSWORD_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(row.map(AuthenticatedUser::from))
    }

    /// Checks an email/password pair and records the login time
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> UserServiceResult<AuthenticatedUser> {
        let mut row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_WITH_PASSWORD_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.db_pool)
        .await?
        .ok_or(UserServiceError::InvalidCredentials)?;

        // bcrypt would compare only the leading bytes of an oversized password
        if !fits_bcrypt_input(password) || !verify_password(password, &row.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login = ? WHERE id = ?")
            .bind(now)
            .bind(row.id)
            .execute(&self.db_pool)
            .await?;
        row.last_login = Some(now);

        Ok(row.into())
    }

    /// Returns the user's profile, creating an empty one if it is missing
    pub async fn get_or_create_profile(&self, user_id: Uuid) -> UserServiceResult<Profile> {
        let mut tx = self.db_pool.begin().await?;
        let profile = Self::ensure_profile(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(profile)
    }

    /// Whether an account other than `exclude` already uses `email`
    pub async fn email_taken_by_other(
        &self,
        email: &str,
        exclude: Uuid,
    ) -> UserServiceResult<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE email = ? AND id <> ?)",
        )
        .bind(normalize_email(email))
        .bind(exclude)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(taken)
    }

    /// Persists user and profile fields from the profile edit form atomically
    pub async fn update_user_and_profile(
        &self,
        user_id: Uuid,
        user_changes: UserChanges,
        profile_changes: ProfileChanges,
    ) -> UserServiceResult<(User, Profile)> {
        let email = normalize_email(&user_changes.email);
        let username = resolve_username(user_changes.username.as_deref(), &email);

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = ?, username = ?, updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&email)
        .bind(&username)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        let profile = sqlx::query_as::<_, Profile>(&format!(
            "INSERT INTO profiles (user_id, first_name, last_name, bio)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (user_id) DO UPDATE SET
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 bio = excluded.bio
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&profile_changes.first_name)
        .bind(&profile_changes.last_name)
        .bind(&profile_changes.bio)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok((user, profile))
    }

    /// Overwrites the user's email
    pub async fn change_email(&self, user_id: Uuid, new_email: &str) -> UserServiceResult<User> {
        let email = normalize_email(new_email);
        if !validate_email(&email) {
            return Err(UserServiceError::ValidationError(format!(
                "Invalid email address: {}",
                new_email
            )));
        }

        let mut tx = self.db_pool.begin().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = ?, updated_at = ?
             WHERE id = ?
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&email)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        Self::ensure_profile(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Rotates the password after checking the current one.
    ///
    /// The returned hash belongs to the new credential, so the caller can
    /// re-issue its session.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        old_password: &str,
        new_password: &str,
    ) -> UserServiceResult<AuthenticatedUser> {
        let current = sqlx::query_as::<_, UserWithPassword>(&format!(
            "SELECT {USER_WITH_PASSWORD_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await
        .map_err(map_read_error)?;

        if !verify_password(old_password, &current.password_hash)? {
            return Err(UserServiceError::InvalidCredentials);
        }
        check_password_length(new_password)?;

        let password_hash = hash_password_with_cost(new_password, self.bcrypt_cost)?;

        let mut tx = self.db_pool.begin().await?;

        let row = sqlx::query_as::<_, UserWithPassword>(&format!(
            "UPDATE users SET password_hash = ?, updated_at = ?
             WHERE id = ?
             RETURNING {USER_WITH_PASSWORD_COLUMNS}"
        ))
        .bind(&password_hash)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_write_error)?;

        Self::ensure_profile(&mut tx, user_id).await?;
        tx.commit().await?;

        Ok(row.into())
    }

    /// Deletes a user; the profile goes with it through the foreign key cascade
    pub async fn delete_user(&self, user_id: Uuid) -> UserServiceResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(user_id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserServiceError::UserNotFound);
        }

        Ok(())
    }

    /// Database connectivity check
    pub async fn health_check(&self) -> UserServiceResult<()> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }

    async fn ensure_profile(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        user_id: Uuid,
    ) -> UserServiceResult<Profile> {
        sqlx::query("INSERT OR IGNORE INTO profiles (user_id) VALUES (?)")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .map_err(map_write_error)?;

        sqlx::query_as::<_, Profile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?"
        ))
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_read_error)
    }
}
