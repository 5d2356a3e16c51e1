use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    #[default]
    Student,
    Faculty,
    Admin,
}

impl UserRole {
    /// Faculty and admins author and preview quizzes.
    pub fn is_staff(&self) -> bool {
        matches!(self, UserRole::Faculty | UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STUDENT" => Ok(UserRole::Student),
            "FACULTY" => Ok(UserRole::Faculty),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(AppError::Unauthorized(format!("Unknown role '{}'", other))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserRole::Student => "STUDENT",
            UserRole::Faculty => "FACULTY",
            UserRole::Admin => "ADMIN",
        };
        f.write_str(name)
    }
}
