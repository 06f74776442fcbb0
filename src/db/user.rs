//! User model.
//!
//! Users are provisioned by the surrounding system; the archive only needs
//! their role, department and, for professors, the stable external id that
//! is embedded in folder paths.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of roles known to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// System administrator.
    Admin,
    /// Dean's office. Sees and manages everything.
    Deanship,
    /// Head of department.
    Hod,
    /// Teaching staff; owns folders.
    Professor,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Deanship => "deanship",
            Role::Hod => "hod",
            Role::Professor => "professor",
        }
    }

    /// Whether the role has archive-wide read and write access.
    pub fn is_global(&self) -> bool {
        matches!(self, Role::Admin | Role::Deanship)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    /// Accepts the database form as well as the `ROLE_` prefixed token form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.strip_prefix("role_").unwrap_or(&lower) {
            "admin" => Ok(Role::Admin),
            "deanship" => Ok(Role::Deanship),
            "hod" => Ok(Role::Hod),
            "professor" => Ok(Role::Professor),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A user row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login email (unique).
    pub email: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Role.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Department, if any. Deanship and admin accounts usually have none.
    pub department_id: Option<i64>,
    /// External professor id (e.g. `PROF007`). Immutable once assigned.
    pub professor_id: Option<String>,
    /// Whether the account is active.
    pub is_active: bool,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// Full display name.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Whether this user is a professor.
    pub fn is_professor(&self) -> bool {
        self.role == Role::Professor
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub department_id: Option<i64>,
    pub professor_id: Option<String>,
}

impl NewUser {
    /// Create a new user with minimal required fields.
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role,
            department_id: None,
            professor_id: None,
        }
    }

    /// Set the department.
    pub fn with_department(mut self, department_id: i64) -> Self {
        self.department_id = Some(department_id);
        self
    }

    /// Set the external professor id.
    pub fn with_professor_id(mut self, professor_id: impl Into<String>) -> Self {
        self.professor_id = Some(professor_id.into());
        self
    }
}
