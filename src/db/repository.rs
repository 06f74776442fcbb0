//! User repository.

use sqlx::SqliteConnection;

use super::user::{NewUser, Role, User};
use super::DbPool;
use crate::{ArchiveError, Result};

const USER_COLUMNS: &str = "id, email, first_name, last_name, role, department_id, professor_id,
                            is_active, created_at";

/// Repository for user rows.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (email, first_name, last_name, role, department_id, professor_id)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&new_user.email)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(new_user.role.as_str())
        .bind(new_user.department_id)
        .bind(&new_user.professor_id)
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| ArchiveError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(user)
    }

    /// List active professors, optionally restricted to one department,
    /// ordered by name.
    pub async fn list_active_professors(&self, department_id: Option<i64>) -> Result<Vec<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE role = ? AND is_active = 1 AND (? IS NULL OR department_id = ?)
             ORDER BY first_name COLLATE NOCASE, last_name COLLATE NOCASE, id"
        );
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(Role::Professor.as_str())
            .bind(department_id)
            .bind(department_id)
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    /// List every user of a department regardless of role or status.
    pub async fn list_by_department(&self, department_id: i64) -> Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE department_id = ? ORDER BY id");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(department_id)
            .fetch_all(self.pool)
            .await?;
        Ok(users)
    }

    /// Delete a user row inside a caller-owned transaction.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
