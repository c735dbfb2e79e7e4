use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Minimum accepted password length for new accounts
pub const MIN_PASSWORD_LEN: usize = 8;

/// A registered user. Every user owns exactly one public profile.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub handle: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub description: String,
    pub image: String,
    /// JSON-encoded list of links, stored opaquely
    pub links: String,
    pub created_at: i64,
}

impl User {
    pub fn public_profile(&self) -> PublicProfile {
        PublicProfile {
            handle: self.handle.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            image: self.image.clone(),
            links: self.links.clone(),
        }
    }
}

/// What anyone may see about a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicProfile {
    pub handle: String,
    pub name: String,
    pub description: String,
    pub image: String,
    pub links: String,
}

/// Row of the public profile listing
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileSummary {
    #[serde(skip_serializing)]
    pub id: i64,
    pub handle: String,
    pub name: String,
    pub description: String,
    pub image: String,
}

/// Account ready to be persisted; the handle is already normalized and the
/// password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub handle: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub handle: String,
    pub description: String,
    pub links: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CreateAccountRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.handle.trim().is_empty() {
            errors.push("handle must not be empty".to_string());
        }
        if self.name.trim().is_empty() {
            errors.push("name must not be empty".to_string());
        }
        if !is_valid_email(&self.email) {
            errors.push("email is not valid".to_string());
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            errors.push(format!(
                "password is too short, minimum {MIN_PASSWORD_LEN} characters"
            ));
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if !is_valid_email(&self.email) {
            errors.push("email is not valid".to_string());
        }
        if self.password.is_empty() {
            errors.push("password is required".to_string());
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_links")]
    pub links: String,
}

fn default_links() -> String {
    "[]".to_string()
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.handle.trim().is_empty() {
            errors.push("handle must not be empty".to_string());
        }
        into_result(errors)
    }
}

#[derive(Debug, Deserialize)]
pub struct HandleSearchRequest {
    #[serde(default)]
    pub handle: String,
}

fn into_result(errors: Vec<String>) -> Result<(), Vec<String>> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Normalize a user-supplied handle into its stored form.
///
/// Handles are lowercase ASCII letters and digits; everything else
/// (whitespace, punctuation, non-ASCII) is dropped.
pub fn normalize_handle(raw: &str) -> String {
    raw.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Structural email check: one `@`, non-empty local part, dotted domain.
pub fn is_valid_email(raw: &str) -> bool {
    let email = raw.trim();
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
