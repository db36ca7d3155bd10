//! User model
//!
//! Users are either doctors (who write posts) or patients (who read them).
//! The role is fixed at registration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Path of the profile picture relative to the static root
    pub profile_picture: Option<String>,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2 PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub address: Address,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Full display name
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_doctor(&self) -> bool {
        self.role == UserRole::Doctor
    }

    pub fn is_patient(&self) -> bool {
        self.role == UserRole::Patient
    }
}

/// Postal address collected at signup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

/// User role for access control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    /// Writes blog posts
    Doctor,
    /// Reads published blog posts
    Patient,
}

impl UserRole {
    /// Path of the dashboard this role lands on after login
    pub fn dashboard_path(&self) -> &'static str {
        match self {
            UserRole::Doctor => "/doctor_dashboard",
            UserRole::Patient => "/patient_dashboard",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Doctor => write!(f, "Doctor"),
            UserRole::Patient => write!(f, "Patient"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "doctor" => Ok(UserRole::Doctor),
            "patient" => Ok(UserRole::Patient),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

/// Input for inserting a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub first_name: String,
    pub last_name: String,
    pub profile_picture: Option<String>,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub address: Address,
    pub role: UserRole,
}
