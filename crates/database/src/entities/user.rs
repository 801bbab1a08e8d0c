//! User entity definitions

use serde::{Deserialize, Serialize};

/// User entity representing a marketplace participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub role: UserRole,
    pub professional_title: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Vec<String>,
    pub location: Option<String>,
    pub company_name: Option<String>,
    pub onboarding_completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub role: UserRole,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

/// Request for updating an existing user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub professional_title: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Option<Vec<String>>,
    pub location: Option<String>,
    pub company_name: Option<String>,
    pub onboarding_completed: Option<bool>,
}

/// User role enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserRole {
    Client,
    Freelancer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "client",
            UserRole::Freelancer => "freelancer",
        }
    }
}

impl From<&str> for UserRole {
    fn from(s: &str) -> Self {
        match s {
            "freelancer" => UserRole::Freelancer,
            _ => UserRole::Client,
        }
    }
}

impl ToString for UserRole {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
