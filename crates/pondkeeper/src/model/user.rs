//! Application users and password hashing.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{new_id, required_text, Record};
use crate::error::{Error, Result};
use crate::store::EntityKey;

/// What a user may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access, including reports and settings.
    Owner,
    /// Floor staff.
    Staff,
}

impl Role {
    /// The stored string form.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Staff => "staff",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "staff" => Ok(Self::Staff),
            other => Err(Error::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A person who can log in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUser {
    /// Record id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Login name; unique ignoring case.
    pub username: String,
    /// Hex SHA-256 of the password.
    pub password_hash: String,
    /// Access level.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl Record for AppUser {
    const KEY: EntityKey = EntityKey::Users;
    const ENTITY: &'static str = "user";

    fn id(&self) -> &str {
        &self.id
    }

    fn check(&self) -> Result<()> {
        required_text("name", &self.name)?;
        required_text("username", &self.username)?;
        Ok(())
    }
}

/// Input for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Login name.
    pub username: String,
    /// Plain-text password; only its hash is kept.
    pub password: String,
    /// Access level.
    pub role: Role,
}

/// Partial update of a user; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New login name.
    pub username: Option<String>,
    /// New plain-text password.
    pub password: Option<String>,
    /// New access level.
    pub role: Option<Role>,
}

/// Hex-encoded SHA-256 digest of `password`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn username_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]{3,50}$").expect("static regex"))
}

/// Trim and check a login name for a new or renamed account.
///
/// Stored accounts only need a non-blank username, so older accounts with
/// other characters keep loading.
///
/// # Errors
///
/// Returns a validation error if the name has the wrong length or characters.
pub fn validate_username(username: &str) -> Result<String> {
    let trimmed = username.trim();
    if !username_pattern().is_match(trimmed) {
        return Err(Error::validation(format!(
            "username must be 3-50 letters, digits, '.', '_' or '-': {trimmed:?}"
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(Error::validation("password is required"));
    }
    Ok(())
}

impl AppUser {
    /// Build a user with a fresh id, hashing the password.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, a bad username or an
    /// empty password.
    pub fn new(input: NewUser, now: DateTime<Utc>) -> Result<Self> {
        validate_password(&input.password)?;
        Ok(Self {
            id: new_id(),
            name: required_text("name", &input.name)?,
            username: validate_username(&input.username)?,
            password_hash: hash_password(&input.password),
            role: input.role,
            created_at: now,
        })
    }

    /// Whether `password` matches the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        self.password_hash.eq_ignore_ascii_case(&hash_password(password))
    }

    /// Whether this user's login name equals `username`, ignoring case.
    #[must_use]
    pub fn has_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username.trim())
    }

    /// Apply a partial update. The user is unchanged if any field is invalid.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an invalid field.
    pub fn apply(&mut self, update: UserUpdate) -> Result<()> {
        let name = update
            .name
            .map(|n| required_text("name", &n))
            .transpose()?;
        let username = update
            .username
            .map(|u| validate_username(&u))
            .transpose()?;
        if let Some(password) = &update.password {
            validate_password(password)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(username) = username {
            self.username = username;
        }
        if let Some(password) = update.password {
            self.password_hash = hash_password(&password);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
        Ok(())
    }
}

/// The accounts created on a fresh install.
#[must_use]
pub fn seed_users() -> Vec<NewUser> {
    vec![
        NewUser {
            name: "Owner".to_string(),
            username: "owner".to_string(),
            password: "admin123".to_string(),
            role: Role::Owner,
        },
        NewUser {
            name: "Staff".to_string(),
            username: "staff".to_string(),
            password: "staff123".to_string(),
            role: Role::Staff,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budi() -> AppUser {
        AppUser::new(
            NewUser {
                name: "Budi".to_string(),
                username: "Budi.S".to_string(),
                password: "rahasia".to_string(),
                role: Role::Staff,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_hash_password_known_value() {
        assert_eq!(
            hash_password("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_verify_password() {
        let user = budi();
        assert!(user.verify_password("rahasia"));
        assert!(!user.verify_password("Rahasia"));
        assert_eq!(user.password_hash.len(), 64);
    }

    #[test]
    fn test_username_rules() {
        assert_eq!(validate_username(" kasir_1 ").unwrap(), "kasir_1");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
    }

    #[test]
    fn test_stored_username_only_needs_text() {
        let mut user = budi();
        user.username = "kasir 1".to_string();
        assert!(user.check().is_ok());

        user.username = "  ".to_string();
        assert!(user.check().is_err());
    }

    #[test]
    fn test_has_username_ignores_case() {
        let user = budi();
        assert!(user.has_username("budi.s"));
        assert!(user.has_username("BUDI.S"));
        assert!(!user.has_username("budi"));
    }

    #[test]
    fn test_apply_rehashes_password() {
        let mut user = budi();
        user.apply(UserUpdate {
            password: Some("baru".to_string()),
            role: Some(Role::Owner),
            ..UserUpdate::default()
        })
        .unwrap();
        assert!(user.verify_password("baru"));
        assert_eq!(user.role, Role::Owner);
    }

    #[test]
    fn test_apply_invalid_leaves_user() {
        let mut user = budi();
        let before = user.clone();
        assert!(user
            .apply(UserUpdate {
                name: Some("Budi Santoso".to_string()),
                username: Some("x".to_string()),
                ..UserUpdate::default()
            })
            .is_err());
        assert_eq!(user, before);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(budi()).unwrap();
        assert_eq!(json["username"], "Budi.S");
        assert_eq!(json["role"], "staff");
        assert!(json["passwordHash"].is_string());
        assert!(json["createdAt"].is_string());
    }
}
